use std::fmt;

use serde::Serialize;

/// Well-known resource names used for cache keys and invalidation.
///
/// Mutations invalidate by resource name, which hits every filter
/// variant of a listing at once.
pub mod keys {
    pub const AVAILABLE_CAMPS: &str = "available-camps";
    pub const CAMP_DETAILS: &str = "camp-details";
    pub const ORGANIZER_REGISTRATIONS: &str = "organizer-registrations";
    pub const PARTICIPANT_REGISTRATIONS: &str = "participant-registrations";
    pub const PROFILE: &str = "profile";
}

/// Cache key: a resource name plus its canonicalized filter parameters.
///
/// Two reads with identical filters produce identical keys and share
/// one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    resource: String,
    params: String,
}

impl CacheKey {
    /// Key for an unparameterized resource.
    ///
    /// Panics if `resource` is empty; that is a malformed descriptor,
    /// not a runtime condition.
    pub fn new(resource: &str) -> Self {
        assert!(!resource.is_empty(), "cache key resource must not be empty");
        Self {
            resource: resource.to_string(),
            params: String::new(),
        }
    }

    /// Key for a resource plus filter parameters. Parameters are
    /// rendered to canonical JSON, so struct field order keeps keys
    /// stable across call sites.
    pub fn with_params<P: Serialize>(resource: &str, params: &P) -> Self {
        let mut key = Self::new(resource);
        key.params =
            serde_json::to_string(params).expect("cache key params must serialize to JSON");
        key
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn matches_resource(&self, resource: &str) -> bool {
        self.resource == resource
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}?{}", self.resource, self.params)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CampQuery;

    #[test]
    fn test_identical_params_produce_identical_keys() {
        let a = CacheKey::with_params(keys::AVAILABLE_CAMPS, &CampQuery::default());
        let b = CacheKey::with_params(keys::AVAILABLE_CAMPS, &CampQuery::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_params_produce_different_keys() {
        let a = CacheKey::with_params(keys::AVAILABLE_CAMPS, &CampQuery::default());
        let mut query = CampQuery::default();
        query.page = 2;
        let b = CacheKey::with_params(keys::AVAILABLE_CAMPS, &query);
        assert_ne!(a, b);
    }

    #[test]
    fn test_matches_resource_ignores_params() {
        let key = CacheKey::with_params(keys::ORGANIZER_REGISTRATIONS, &("search", 1));
        assert!(key.matches_resource(keys::ORGANIZER_REGISTRATIONS));
        assert!(!key.matches_resource(keys::AVAILABLE_CAMPS));
    }

    #[test]
    fn test_display_includes_params() {
        let bare = CacheKey::new(keys::PROFILE);
        assert_eq!(bare.to_string(), "profile");

        let keyed = CacheKey::with_params(keys::CAMP_DETAILS, &"c1");
        assert_eq!(keyed.to_string(), "camp-details?\"c1\"");
    }

    #[test]
    #[should_panic(expected = "resource must not be empty")]
    fn test_empty_resource_is_rejected() {
        let _ = CacheKey::new("");
    }
}
