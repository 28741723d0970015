//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `Session`: bearer-token session management with expiry tracking
//! - `CredentialStore`: secure OS-level credential storage via keyring
//!
//! Sessions are persisted to disk; the API token they carry is opaque
//! to this crate and attached verbatim to outbound requests.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData};
