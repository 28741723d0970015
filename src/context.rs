//! Explicitly passed application context.
//!
//! `SyncContext` wires the configuration, API client, query cache, and
//! session handle together and exposes the typed read helpers the
//! presentation layer consumes. There is no hidden global state: a
//! client owns exactly one context and passes it where it is needed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::actions::MutationDispatcher;
use crate::api::{ApiClient, ApiError};
use crate::auth::{Session, SessionData};
use crate::cache::{keys, CacheKey, QueryCache, QueryState, ReadOptions};
use crate::config::Config;
use crate::models::{
    Camp, CampQuery, CampWithRegistrations, Paginated, ParticipantRegistration,
    RegistrationQuery, UserProfile,
};
use crate::upload::UploadCoordinator;

/// Shared application context for one MediCamp client.
pub struct SyncContext {
    config: Config,
    api: ApiClient,
    cache: QueryCache,
    uploader: UploadCoordinator,
    session: Arc<RwLock<Session>>,
}

impl SyncContext {
    /// Build a context from configuration, restoring a persisted
    /// session when one exists.
    pub fn new(config: Config) -> Result<Self> {
        let cache_dir = config
            .cache_dir()
            .unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(?cache_dir, "Session directory configured");

        let mut session = Session::new(cache_dir);
        match session.load() {
            Ok(restored) => debug!(restored, "Session load attempted"),
            Err(e) => warn!(error = %e, "Failed to load persisted session"),
        }

        let mut api = ApiClient::new(config.api_base_url.clone())?;
        if let Some(token) = session.token() {
            api.set_token(token.to_string());
            debug!("Restored session token set on API client");
        }

        let uploader = UploadCoordinator::new(config.upload_base_url.clone())?;

        Ok(Self {
            config,
            api,
            cache: QueryCache::new(),
            uploader,
            session: Arc::new(RwLock::new(session)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn session_handle(&self) -> Arc<RwLock<Session>> {
        self.session.clone()
    }

    /// Dispatcher sharing this context's client, cache, and session.
    pub fn dispatcher(&self) -> MutationDispatcher {
        MutationDispatcher::new(self.api.clone(), self.cache.clone(), self.session.clone())
    }

    pub fn uploader(&self) -> UploadCoordinator {
        self.uploader.clone()
    }

    // ===== Session Lifecycle =====

    /// Exchange credentials for a session and persist it.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionData, ApiError> {
        let data = self.api.sign_in(email, password).await?;
        self.install_session(data.clone()).await;
        Ok(data)
    }

    /// Create an account and sign in.
    pub async fn register_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<SessionData, ApiError> {
        let data = self.api.sign_up(name, email, password).await?;
        self.install_session(data.clone()).await;
        Ok(data)
    }

    /// Exchange an externally verified OAuth profile for a session.
    pub async fn login_oauth_profile(
        &self,
        name: &str,
        email: &str,
        image: Option<&str>,
    ) -> Result<SessionData, ApiError> {
        let data = self.api.sign_up_oauth(name, email, image).await?;
        self.install_session(data.clone()).await;
        Ok(data)
    }

    async fn install_session(&self, data: SessionData) {
        let mut session = self.session.write().await;
        session.update(data);
        if let Err(e) = session.save() {
            warn!(error = %e, "Failed to persist session");
        }
    }

    /// Drop the session and its persisted file.
    pub async fn logout(&self) {
        let mut session = self.session.write().await;
        if let Err(e) = session.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_valid()
    }

    async fn bearer(&self) -> Option<String> {
        self.session
            .read()
            .await
            .token()
            .map(|token| token.to_string())
    }

    // ===== Cached Reads =====

    /// Public camps listing. No session required.
    pub async fn available_camps(&self, query: &CampQuery) -> QueryState<Vec<Camp>> {
        let key = CacheKey::with_params(keys::AVAILABLE_CAMPS, query);
        let api = self.api.clone();
        let query = query.clone();
        let options = ReadOptions {
            staleness: Some(self.config.camps_staleness()),
            ..ReadOptions::default()
        };
        self.cache
            .read_with(
                &key,
                move || async move { api.fetch_available_camps(&query).await },
                options,
            )
            .await
    }

    /// Detail record for one camp. Requires a session.
    pub async fn camp_details(&self, camp_id: &str) -> QueryState<Camp> {
        let Some(token) = self.bearer().await else {
            return QueryState::from_error(ApiError::AuthRequired);
        };

        let key = CacheKey::with_params(keys::CAMP_DETAILS, &camp_id);
        let api = self.api.with_token(token);
        let camp_id = camp_id.to_string();
        let options = ReadOptions {
            staleness: Some(self.config.camps_staleness()),
            ..ReadOptions::default()
        };
        self.cache
            .read_with(
                &key,
                move || async move { api.fetch_camp(&camp_id).await },
                options,
            )
            .await
    }

    /// Registrations across the organizer's camps. Requires a session.
    pub async fn organizer_registrations(
        &self,
        query: &RegistrationQuery,
    ) -> QueryState<Paginated<CampWithRegistrations>> {
        let Some(token) = self.bearer().await else {
            return QueryState::from_error(ApiError::AuthRequired);
        };

        let key = CacheKey::with_params(keys::ORGANIZER_REGISTRATIONS, query);
        let api = self.api.with_token(token);
        let query = query.clone();
        let options = ReadOptions {
            staleness: Some(self.config.registrations_staleness()),
            ..ReadOptions::default()
        };
        self.cache
            .read_with(
                &key,
                move || async move { api.fetch_organizer_registrations(&query).await },
                options,
            )
            .await
    }

    /// The signed-in participant's registrations. Requires a session.
    pub async fn participant_registrations(
        &self,
        query: &RegistrationQuery,
    ) -> QueryState<Paginated<ParticipantRegistration>> {
        let Some(token) = self.bearer().await else {
            return QueryState::from_error(ApiError::AuthRequired);
        };

        let key = CacheKey::with_params(keys::PARTICIPANT_REGISTRATIONS, query);
        let api = self.api.with_token(token);
        let query = query.clone();
        let options = ReadOptions {
            staleness: Some(self.config.registrations_staleness()),
            ..ReadOptions::default()
        };
        self.cache
            .read_with(
                &key,
                move || async move { api.fetch_participant_registrations(&query).await },
                options,
            )
            .await
    }

    /// The signed-in account's profile. Requires a session.
    pub async fn profile(&self) -> QueryState<UserProfile> {
        let Some(token) = self.bearer().await else {
            return QueryState::from_error(ApiError::AuthRequired);
        };

        let key = CacheKey::new(keys::PROFILE);
        let api = self.api.with_token(token);
        self.cache
            .read(&key, move || async move { api.fetch_profile().await })
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================
