//! MediCamp client core.
//!
//! This crate is the data-synchronization layer shared by MediCamp
//! clients: it mediates between cached list/detail views and the
//! mutating actions (registration, confirmation, cancellation, image
//! upload) performed against the external MediCamp REST API.
//!
//! The pieces:
//!
//! - [`cache::QueryCache`]: process-wide keyed cache with configurable
//!   staleness, single-flight fetch sharing, and resource invalidation
//! - [`actions::MutationDispatcher`]: authenticated writes that
//!   invalidate the cache resources they affect
//! - [`upload::UploadCoordinator`]: camp image uploads through the
//!   presigned-URL proxy, with progress reporting
//! - [`api::ApiClient`]: the REST client and error taxonomy
//! - [`auth::Session`]: bearer-token session persistence
//! - [`context::SyncContext`]: the explicitly passed application
//!   context tying the above together
//!
//! All network operations are async and require a Tokio runtime.
//! Failures surface as [`api::ApiError`] values; nothing in this crate
//! panics into the presentation layer.

pub mod actions;
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod models;
pub mod upload;

pub use actions::{MutationDispatcher, Operation};
pub use api::{ApiClient, ApiError};
pub use auth::{CredentialStore, Session, SessionData};
pub use cache::{keys, CacheKey, QueryCache, QueryState, QueryStatus, ReadOptions};
pub use config::Config;
pub use context::SyncContext;
pub use models::{
    Camp, CampForm, CampQuery, CampSortColumn, CampWithRegistrations, ConfirmationStatus,
    Feedback, FeedbackForm, Gender, Paginated, Pagination, Participant, ParticipantRegistration,
    PaymentStatus, ProfileForm, RegistrationDetail, RegistrationForm, RegistrationQuery, Role,
    StatusFilter, UserProfile,
};
pub use upload::{ProgressSender, UploadCoordinator, UploadSlot};
