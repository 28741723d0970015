use serde::{Deserialize, Serialize};

/// Account role. The API only knows these two; role-conditional logic
/// dispatches on this enum rather than on raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Role {
    Participant,
    Organizer,
}

impl Role {
    pub fn is_organizer(&self) -> bool {
        matches!(self, Role::Organizer)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Participant => write!(f, "participant"),
            Role::Organizer => write!(f, "organizer"),
        }
    }
}

/// Account profile as returned by `/users/profile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub image: Option<String>,
}

/// Partial profile update payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProfileForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ProfileForm {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.image.is_none()
    }
}
