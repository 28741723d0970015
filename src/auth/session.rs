use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Session lifetime in days, matching the backend's token maxAge.
const SESSION_EXPIRY_DAYS: i64 = 10;

/// Identity and credential issued by the authentication collaborator.
///
/// The token is opaque; this crate only stores it and attaches it as a
/// bearer credential to outbound requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn is_expired(&self) -> bool {
        let expiry = self.created_at + Duration::days(SESSION_EXPIRY_DAYS);
        Utc::now() > expiry
    }

    pub fn time_until_expiry(&self) -> Duration {
        let expiry = self.created_at + Duration::days(SESSION_EXPIRY_DAYS);
        expiry - Utc::now()
    }

    /// Days remaining until expiry (for display)
    pub fn days_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_days().max(0)
    }
}

pub struct Session {
    cache_dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load session from disk. Returns true when a non-expired session
    /// was found.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents =
                std::fs::read_to_string(&path).context("Failed to read session file")?;
            let data: SessionData =
                serde_json::from_str(&contents).context("Failed to parse session file")?;

            if !data.is_expired() {
                self.data = Some(data);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Clear session data and remove the session file
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Update session with new data
    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    /// Get the bearer token if session is valid
    pub fn token(&self) -> Option<&str> {
        self.data
            .as_ref()
            .filter(|d| !d.is_expired())
            .map(|d| d.token.as_str())
    }

    /// Get the account role if session exists
    pub fn role(&self) -> Option<Role> {
        self.data.as_ref().map(|d| d.role)
    }

    /// Get the user id if session exists
    pub fn user_id(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.user_id.as_str())
    }

    /// Check if session is valid (exists and not expired)
    pub fn is_valid(&self) -> bool {
        self.data.as_ref().map(|d| !d.is_expired()).unwrap_or(false)
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn session_data() -> SessionData {
        SessionData {
            token: "token".to_string(),
            user_id: "u1".to_string(),
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            role: Role::Participant,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_fresh_session_is_valid() {
        let data = session_data();
        assert!(!data.is_expired());
        assert!(data.days_until_expiry() >= 9);
    }

    #[test]
    fn test_session_expires_after_window() {
        let mut data = session_data();
        data.created_at = Utc::now() - Duration::days(SESSION_EXPIRY_DAYS + 1);
        assert!(data.is_expired());
        assert_eq!(data.days_until_expiry(), 0);
    }

    #[test]
    fn test_expired_session_yields_no_token() {
        let mut session = Session::new(PathBuf::from("./cache"));
        let mut data = session_data();
        data.created_at = Utc::now() - Duration::days(SESSION_EXPIRY_DAYS + 1);
        session.update(data);

        assert!(!session.is_valid());
        assert!(session.token().is_none());
        // Identity fields stay readable for display
        assert_eq!(session.user_id(), Some("u1"));
    }

    #[test]
    fn test_valid_session_exposes_token_and_role() {
        let mut session = Session::new(PathBuf::from("./cache"));
        session.update(session_data());

        assert!(session.is_valid());
        assert_eq!(session.token(), Some("token"));
        assert_eq!(session.role(), Some(Role::Participant));
    }
}
