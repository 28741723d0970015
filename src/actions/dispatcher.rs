//! Authenticated write operations against the MediCamp API.
//!
//! The dispatcher performs a single mutation and, on success,
//! invalidates the cache resources the operation affects so dependent
//! views refetch. There are no optimistic writes: on failure the cache
//! is left untouched and the extracted error message is returned.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError};
use crate::auth::Session;
use crate::cache::{keys, QueryCache};
use crate::models::{CampForm, FeedbackForm, ProfileForm, RegistrationForm, Role};

/// A single write operation with everything the dispatcher needs:
/// method, path, body, and the cache resources it invalidates.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Participant joins a camp.
    RegisterForCamp {
        camp_id: String,
        form: RegistrationForm,
    },
    /// Organizer confirms a pending registration.
    ConfirmRegistration { registration_id: String },
    /// Cancel a registration that is still pending or unpaid.
    CancelRegistration { registration_id: String },
    /// Participant leaves feedback on a camp.
    SubmitFeedback { form: FeedbackForm },
    /// Organizer creates a camp. The form carries the storage key of a
    /// completed image upload.
    CreateCamp { form: CampForm },
    /// Update the signed-in account's profile.
    UpdateProfile { form: ProfileForm },
}

impl Operation {
    /// Cache resources this operation invalidates on success.
    pub fn invalidates(&self) -> &'static [&'static str] {
        match self {
            Operation::RegisterForCamp { .. } => &[
                keys::AVAILABLE_CAMPS,
                keys::CAMP_DETAILS,
                keys::PARTICIPANT_REGISTRATIONS,
            ],
            Operation::ConfirmRegistration { .. } => &[keys::ORGANIZER_REGISTRATIONS],
            Operation::CancelRegistration { .. } => &[
                keys::ORGANIZER_REGISTRATIONS,
                keys::PARTICIPANT_REGISTRATIONS,
            ],
            Operation::SubmitFeedback { .. } => &[keys::CAMP_DETAILS],
            Operation::CreateCamp { .. } => &[keys::AVAILABLE_CAMPS],
            Operation::UpdateProfile { .. } => &[keys::PROFILE],
        }
    }

    /// Role the operation is restricted to, if any.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Operation::RegisterForCamp { .. } | Operation::SubmitFeedback { .. } => {
                Some(Role::Participant)
            }
            Operation::ConfirmRegistration { .. } | Operation::CreateCamp { .. } => {
                Some(Role::Organizer)
            }
            Operation::CancelRegistration { .. } | Operation::UpdateProfile { .. } => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Operation::RegisterForCamp { .. } => "register-for-camp",
            Operation::ConfirmRegistration { .. } => "confirm-registration",
            Operation::CancelRegistration { .. } => "cancel-registration",
            Operation::SubmitFeedback { .. } => "submit-feedback",
            Operation::CreateCamp { .. } => "create-camp",
            Operation::UpdateProfile { .. } => "update-profile",
        }
    }

    /// Validate the operation and render it to request parts.
    fn request_parts(&self) -> Result<(Method, String, Option<serde_json::Value>), ApiError> {
        match self {
            Operation::RegisterForCamp { camp_id, form } => {
                require_id(camp_id, "Camp id")?;
                form.validate().map_err(ApiError::Validation)?;
                Ok((
                    Method::POST,
                    format!("/registrations/register-camp/{}", camp_id),
                    Some(encode_body(form)?),
                ))
            }
            Operation::ConfirmRegistration { registration_id } => {
                require_id(registration_id, "Registration id")?;
                Ok((
                    Method::PATCH,
                    format!(
                        "/registrations/organizer/confirm-registration/{}",
                        registration_id
                    ),
                    None,
                ))
            }
            Operation::CancelRegistration { registration_id } => {
                require_id(registration_id, "Registration id")?;
                Ok((
                    Method::DELETE,
                    format!("/registrations/cancel-registration/{}", registration_id),
                    None,
                ))
            }
            Operation::SubmitFeedback { form } => {
                form.validate().map_err(ApiError::Validation)?;
                Ok((
                    Method::POST,
                    "/feedback/add-feedback".to_string(),
                    Some(encode_body(form)?),
                ))
            }
            Operation::CreateCamp { form } => {
                form.validate().map_err(ApiError::Validation)?;
                Ok((
                    Method::POST,
                    "/camps/add-camp".to_string(),
                    Some(encode_body(form)?),
                ))
            }
            Operation::UpdateProfile { form } => {
                if form.is_empty() {
                    return Err(ApiError::Validation(
                        "Profile update must change at least one field".to_string(),
                    ));
                }
                Ok((
                    Method::PATCH,
                    "/users/profile".to_string(),
                    Some(encode_body(form)?),
                ))
            }
        }
    }
}

fn require_id(id: &str, what: &str) -> Result<(), ApiError> {
    if id.trim().is_empty() {
        Err(ApiError::Validation(format!("{} is required", what)))
    } else {
        Ok(())
    }
}

fn encode_body<T: serde::Serialize>(form: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(form)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))
}

/// Performs authenticated mutations and keeps the cache coherent.
/// Clone is cheap - the client, cache, and session handle are shared.
#[derive(Clone)]
pub struct MutationDispatcher {
    api: ApiClient,
    cache: QueryCache,
    session: Arc<RwLock<Session>>,
}

impl MutationDispatcher {
    pub fn new(api: ApiClient, cache: QueryCache, session: Arc<RwLock<Session>>) -> Self {
        Self {
            api,
            cache,
            session,
        }
    }

    /// Perform a mutation and return the envelope's `data` payload.
    ///
    /// Fails fast with `AuthRequired` when no usable session exists and
    /// with `AccessDenied` when the session's role is not permitted to
    /// perform the operation; neither case touches the network.
    pub async fn mutate(&self, operation: Operation) -> Result<serde_json::Value, ApiError> {
        let token = self.authorize(&operation).await?;
        let (method, path, body) = operation.request_parts()?;

        debug!(op = operation.describe(), %method, path = %path, "Dispatching mutation");
        let data = self
            .api
            .execute_envelope(method, &path, body.as_ref(), Some(&token))
            .await?;

        self.apply_invalidations(&operation);
        info!(op = operation.describe(), "Mutation succeeded");
        Ok(data)
    }

    /// Perform a mutation and decode the `data` payload into `T`.
    pub async fn mutate_as<T: DeserializeOwned>(&self, operation: Operation) -> Result<T, ApiError> {
        let value = self.mutate(operation).await?;
        serde_json::from_value(value).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to decode mutation result: {}", e))
        })
    }

    /// Check the session and role gate, returning the bearer token.
    async fn authorize(&self, operation: &Operation) -> Result<String, ApiError> {
        let session = self.session.read().await;
        let data = session
            .data
            .as_ref()
            .filter(|d| !d.is_expired())
            .ok_or(ApiError::AuthRequired)?;

        if let Some(required) = operation.required_role() {
            if data.role != required {
                return Err(ApiError::AccessDenied(format!(
                    "{} requires the {} role",
                    operation.describe(),
                    required
                )));
            }
        }

        Ok(data.token.clone())
    }

    /// Mark every resource the operation affects stale.
    pub(crate) fn apply_invalidations(&self, operation: &Operation) {
        for resource in operation.invalidates() {
            self.cache.invalidate(resource);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionData;
    use crate::cache::CacheKey;
    use crate::models::Gender;
    use chrono::{Duration, Utc};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn session_with(data: Option<SessionData>) -> Arc<RwLock<Session>> {
        let mut session = Session::new(PathBuf::from("./cache"));
        if let Some(data) = data {
            session.update(data);
        }
        Arc::new(RwLock::new(session))
    }

    fn session_data(role: Role) -> SessionData {
        SessionData {
            token: "token".to_string(),
            user_id: "u1".to_string(),
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            role,
            created_at: Utc::now(),
        }
    }

    fn dispatcher(session: Arc<RwLock<Session>>) -> (MutationDispatcher, QueryCache) {
        let api = ApiClient::new("http://localhost:9").expect("client should build");
        let cache = QueryCache::new();
        (MutationDispatcher::new(api, cache.clone(), session), cache)
    }

    fn registration_form() -> RegistrationForm {
        RegistrationForm {
            age: 28,
            phone: "+880 1234-567890".to_string(),
            gender: Gender::Male,
            emergency_contact: "+880 9876-543210".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mutation_without_session_fails_fast() {
        let (dispatcher, _cache) = dispatcher(session_with(None));

        let result = dispatcher
            .mutate(Operation::RegisterForCamp {
                camp_id: "c1".to_string(),
                form: registration_form(),
            })
            .await;

        assert!(matches!(result, Err(ApiError::AuthRequired)));
    }

    #[tokio::test]
    async fn test_mutation_with_expired_session_fails_fast() {
        let mut data = session_data(Role::Participant);
        data.created_at = Utc::now() - Duration::days(11);
        let (dispatcher, _cache) = dispatcher(session_with(Some(data)));

        let result = dispatcher
            .mutate(Operation::RegisterForCamp {
                camp_id: "c1".to_string(),
                form: registration_form(),
            })
            .await;

        assert!(matches!(result, Err(ApiError::AuthRequired)));
    }

    #[tokio::test]
    async fn test_participant_cannot_confirm_registrations() {
        let (dispatcher, _cache) = dispatcher(session_with(Some(session_data(Role::Participant))));

        let result = dispatcher
            .mutate(Operation::ConfirmRegistration {
                registration_id: "r1".to_string(),
            })
            .await;

        match result {
            Err(ApiError::AccessDenied(message)) => {
                assert!(message.contains("organizer"), "message was: {}", message)
            }
            other => panic!("expected AccessDenied, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_invalid_form_rejected_before_network() {
        let (dispatcher, _cache) = dispatcher(session_with(Some(session_data(Role::Participant))));

        let result = dispatcher
            .mutate(Operation::SubmitFeedback {
                form: FeedbackForm {
                    camp_id: "c1".to_string(),
                    rating: 0,
                    comment: String::new(),
                },
            })
            .await;

        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_invalidation_declarations() {
        let confirm = Operation::ConfirmRegistration {
            registration_id: "r1".to_string(),
        };
        assert_eq!(confirm.invalidates(), &[keys::ORGANIZER_REGISTRATIONS][..]);

        let cancel = Operation::CancelRegistration {
            registration_id: "r1".to_string(),
        };
        assert!(cancel.invalidates().contains(&keys::ORGANIZER_REGISTRATIONS));
        assert!(cancel
            .invalidates()
            .contains(&keys::PARTICIPANT_REGISTRATIONS));

        let register = Operation::RegisterForCamp {
            camp_id: "c1".to_string(),
            form: registration_form(),
        };
        assert!(register.invalidates().contains(&keys::AVAILABLE_CAMPS));
    }

    #[tokio::test]
    async fn test_confirm_invalidation_forces_registration_refetch() {
        let (dispatcher, cache) = dispatcher(session_with(Some(session_data(Role::Organizer))));

        // Prime the organizer-registrations cache
        let key = CacheKey::new(keys::ORGANIZER_REGISTRATIONS);
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        cache
            .read(&key, move || async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<usize, ApiError>(1)
            })
            .await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // A successful confirm marks the resource stale...
        dispatcher.apply_invalidations(&Operation::ConfirmRegistration {
            registration_id: "r1".to_string(),
        });

        // ...so the next read issues a new network call
        let c = counter.clone();
        cache
            .read(&key, move || async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<usize, ApiError>(2)
            })
            .await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancel_requires_registration_id() {
        let (dispatcher, _cache) = dispatcher(session_with(Some(session_data(Role::Participant))));

        let result = dispatcher
            .mutate(Operation::CancelRegistration {
                registration_id: "  ".to_string(),
            })
            .await;

        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
