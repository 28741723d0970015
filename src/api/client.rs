//! API client for communicating with the MediCamp REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests to fetch camps, registrations, and profile data, and for the
//! credential/OAuth sign-in exchange.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use crate::auth::SessionData;
use crate::models::{
    Camp, CampQuery, CampWithRegistrations, Paginated, Pagination, ParticipantRegistration,
    RegistrationQuery, Role, UserProfile,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the MediCamp backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<String>,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client against the given base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::new(base_url.into()),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Drop the bearer token, e.g. after sign-out
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    /// This is more efficient than creating a new client for each request.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    fn join_url(base: &str, path: &str) -> String {
        format!("{}{}", base.trim_end_matches('/'), path)
    }

    fn url(&self, path: &str) -> String {
        Self::join_url(&self.base_url, path)
    }

    // ===== Request Plumbing =====

    /// Send a request, retrying on 429 with exponential backoff, and
    /// return the successful response.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&serde_json::Value>,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.url(path);
        let bearer = token.or(self.token.as_deref());

        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self.client.request(method.clone(), &url);
            if let Some(query) = query {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            if let Some(bearer) = bearer {
                request = request.bearer_auth(bearer);
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status.as_u16() == 429 {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(url = %url, retry = retries, backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2; // Exponential backoff
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &text));
        }
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&serde_json::Value>,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let response = self.execute(method, path, query, body, token).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            debug!(path, error = %e, "Failed to decode response body");
            ApiError::InvalidResponse(format!("Failed to decode response from {}: {}", path, e))
        })
    }

    /// Send a mutating request and unwrap the `{success, data}` envelope,
    /// returning the raw `data` payload.
    pub(crate) async fn execute_envelope(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        token: Option<&str>,
    ) -> Result<serde_json::Value, ApiError> {
        let envelope: Envelope<serde_json::Value> =
            self.request_json(method, path, None, body, token).await?;
        envelope.into_data()
    }

    // ===== Camps =====

    /// Fetch the public camps listing with search/sort/pagination
    pub async fn fetch_available_camps(&self, query: &CampQuery) -> Result<Vec<Camp>, ApiError> {
        let pairs = query.to_query_pairs();
        let envelope: Envelope<CampsData> = self
            .request_json(Method::GET, "/camps/get-all-camps", Some(&pairs), None, None)
            .await?;
        Ok(envelope.into_data()?.camps)
    }

    /// Fetch a single camp's detail record
    pub async fn fetch_camp(&self, camp_id: &str) -> Result<Camp, ApiError> {
        if camp_id.trim().is_empty() {
            return Err(ApiError::Validation("Camp id is required".to_string()));
        }
        let path = format!("/camps/get-camp/{}", camp_id);
        let envelope: Envelope<CampDetailData> = self
            .request_json(Method::GET, &path, None, None, None)
            .await?;
        Ok(envelope.into_data()?.camp)
    }

    // ===== Registrations =====

    /// Fetch registrations across the organizer's camps, grouped per camp
    pub async fn fetch_organizer_registrations(
        &self,
        query: &RegistrationQuery,
    ) -> Result<Paginated<CampWithRegistrations>, ApiError> {
        let pairs = query.to_query_pairs();
        let envelope: PagedEnvelope<CampWithRegistrations> = self
            .request_json(
                Method::GET,
                "/registrations/organizer/get-all-registrations",
                Some(&pairs),
                None,
                None,
            )
            .await?;
        Ok(envelope.into_paginated())
    }

    /// Fetch the signed-in participant's own registrations
    pub async fn fetch_participant_registrations(
        &self,
        query: &RegistrationQuery,
    ) -> Result<Paginated<ParticipantRegistration>, ApiError> {
        let pairs = query.to_query_pairs();
        let envelope: PagedEnvelope<ParticipantRegistration> = self
            .request_json(
                Method::GET,
                "/registrations/participant/get-my-registrations",
                Some(&pairs),
                None,
                None,
            )
            .await?;
        Ok(envelope.into_paginated())
    }

    // ===== Account =====

    /// Fetch the signed-in account's profile
    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        let envelope: Envelope<ProfileData> = self
            .request_json(Method::GET, "/users/profile", None, None, None)
            .await?;
        Ok(envelope.into_data()?.user)
    }

    /// Exchange credentials for an API token and session identity
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionData, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let envelope: Envelope<AuthData> = self
            .request_json(Method::POST, "/users/signin", None, Some(&body), None)
            .await?;
        Ok(envelope.into_data()?.into_session())
    }

    /// Create an account and sign in with one round trip
    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<SessionData, ApiError> {
        let body = serde_json::json!({ "name": name, "email": email, "password": password });
        let envelope: Envelope<AuthData> = self
            .request_json(Method::POST, "/users/signup", None, Some(&body), None)
            .await?;
        Ok(envelope.into_data()?.into_session())
    }

    /// Exchange an already-verified OAuth profile for an API token.
    /// The OAuth handshake itself happens outside this client.
    pub async fn sign_up_oauth(
        &self,
        name: &str,
        email: &str,
        image: Option<&str>,
    ) -> Result<SessionData, ApiError> {
        let body = serde_json::json!({ "name": name, "email": email, "image": image });
        let envelope: Envelope<AuthData> = self
            .request_json(Method::POST, "/users/signup-oauth", None, Some(&body), None)
            .await?;
        Ok(envelope.into_data()?.into_session())
    }
}

// ============================================================================
// Internal API response types for parsing
// ============================================================================

fn default_true() -> bool {
    true
}

/// Standard `{success, data}` response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "default_true")]
    success: bool,
    data: T,
    #[serde(default)]
    message: Option<String>,
}

impl<T> Envelope<T> {
    /// A 2xx body with `success: false` is still a failure.
    fn into_data(self) -> Result<T, ApiError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ApiError::Validation(
                self.message
                    .unwrap_or_else(|| "Request was rejected".to_string()),
            ))
        }
    }
}

/// Listing envelope carrying pagination beside the data array.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct PagedEnvelope<T> {
    #[serde(default = "default_true")]
    #[allow(dead_code)]
    success: bool,
    #[serde(default)]
    data: Vec<T>,
    #[serde(default)]
    pagination: Pagination,
}

impl<T> PagedEnvelope<T> {
    fn into_paginated(self) -> Paginated<T> {
        Paginated {
            items: self.data,
            pagination: self.pagination,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CampsData {
    #[serde(default)]
    camps: Vec<Camp>,
}

#[derive(Debug, Deserialize)]
struct CampDetailData {
    camp: Camp,
}

#[derive(Debug, Deserialize)]
struct ProfileData {
    user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct AuthData {
    user: AuthUser,
    token: String,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    role: Role,
}

impl AuthData {
    fn into_session(self) -> SessionData {
        SessionData {
            token: self.token,
            user_id: self.user.id,
            name: self.user.name,
            email: self.user.email,
            role: self.user.role,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_normalizes_trailing_slash() {
        assert_eq!(
            ApiClient::join_url("https://api.medicamp.app/", "/camps/get-all-camps"),
            "https://api.medicamp.app/camps/get-all-camps"
        );
        assert_eq!(
            ApiClient::join_url("https://api.medicamp.app", "/users/profile"),
            "https://api.medicamp.app/users/profile"
        );
    }

    #[test]
    fn test_parse_sign_in_response() {
        let json = r#"{
            "success": true,
            "data": {
                "user": {
                    "_id": "665f1c2ab8d24a0012345678",
                    "name": "Sarah Smith",
                    "email": "sarah@example.com",
                    "role": "organizer"
                },
                "token": "eyJhbGciOiJIUzI1NiJ9.token"
            }
        }"#;

        let envelope: Envelope<AuthData> =
            serde_json::from_str(json).expect("sign-in response should parse");
        let session = envelope.into_data().unwrap().into_session();
        assert_eq!(session.user_id, "665f1c2ab8d24a0012345678");
        assert_eq!(session.role, Role::Organizer);
        assert_eq!(session.token, "eyJhbGciOiJIUzI1NiJ9.token");
    }

    #[test]
    fn test_envelope_success_defaults_to_true() {
        let json = r#"{"data": {"camps": []}}"#;
        let envelope: Envelope<CampsData> = serde_json::from_str(json).unwrap();
        assert!(envelope.into_data().is_ok());
    }

    #[test]
    fn test_envelope_rejects_explicit_failure() {
        let json = r#"{"success": false, "data": null, "message": "Duplicate registration"}"#;
        let envelope: Envelope<serde_json::Value> = serde_json::from_str(json).unwrap();
        match envelope.into_data() {
            Err(ApiError::Validation(message)) => assert_eq!(message, "Duplicate registration"),
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_paged_registrations_envelope() {
        let json = r#"{
            "success": true,
            "data": [{
                "_id": "c1",
                "name": "Dental Care Camp",
                "fees": 300,
                "location": "Chittagong",
                "professional": "Dr. K. Das",
                "registrations": []
            }],
            "pagination": {"page": 1, "limit": 10, "total": 1, "pages": 1}
        }"#;

        let envelope: PagedEnvelope<CampWithRegistrations> =
            serde_json::from_str(json).expect("paged envelope should parse");
        let page = envelope.into_paginated();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.pagination.total, 1);
    }
}
