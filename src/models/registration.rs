use serde::{Deserialize, Serialize};

use super::Camp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ConfirmationStatus {
    Pending,
    Confirmed,
}

impl ConfirmationStatus {
    /// Confirmation only ever moves pending -> confirmed. Re-applying the
    /// current status is a no-op, never an error.
    pub fn can_transition_to(self, next: ConfirmationStatus) -> bool {
        match (self, next) {
            (ConfirmationStatus::Pending, ConfirmationStatus::Confirmed) => true,
            (a, b) => a == b,
        }
    }
}

impl std::fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfirmationStatus::Pending => write!(f, "Pending"),
            ConfirmationStatus::Confirmed => write!(f, "Confirmed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Participant summary embedded in a registration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Participant {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub age: i64,
}

/// A participant's enrollment record for a camp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RegistrationDetail {
    #[serde(rename = "_id")]
    pub id: String,
    pub participant: Participant,
    pub age: i64,
    pub phone: String,
    pub gender: Gender,
    #[serde(rename = "emergencyContact")]
    pub emergency_contact: String,
    #[serde(rename = "paymentStatus")]
    pub payment_status: PaymentStatus,
    #[serde(rename = "confirmationStatus")]
    pub confirmation_status: ConfirmationStatus,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
}

impl RegistrationDetail {
    /// A paid AND confirmed registration is terminal: no further client
    /// mutation is permitted against it.
    pub fn is_locked(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
            && self.confirmation_status == ConfirmationStatus::Confirmed
    }

    /// Cancellation is permitted while the registration is still pending
    /// or still unpaid.
    pub fn can_cancel(&self) -> bool {
        !self.is_locked()
    }

    pub fn can_confirm(&self) -> bool {
        self.confirmation_status
            .can_transition_to(ConfirmationStatus::Confirmed)
    }
}

/// A camp together with its registrations, as returned by the organizer
/// registrations endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CampWithRegistrations {
    #[serde(flatten)]
    pub camp: Camp,
    #[serde(default)]
    pub registrations: Vec<RegistrationDetail>,
}

impl CampWithRegistrations {
    pub fn pending_count(&self) -> usize {
        self.registrations
            .iter()
            .filter(|r| r.confirmation_status == ConfirmationStatus::Pending)
            .count()
    }

    pub fn unpaid_count(&self) -> usize {
        self.registrations
            .iter()
            .filter(|r| r.payment_status == PaymentStatus::Unpaid)
            .count()
    }
}

/// A participant-side registration with its camp populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ParticipantRegistration {
    #[serde(rename = "_id")]
    pub id: String,
    pub camp: Camp,
    #[serde(default)]
    pub age: i64,
    #[serde(default)]
    pub phone: String,
    #[serde(rename = "paymentStatus")]
    pub payment_status: PaymentStatus,
    #[serde(rename = "confirmationStatus")]
    pub confirmation_status: ConfirmationStatus,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
}

impl ParticipantRegistration {
    pub fn can_cancel(&self) -> bool {
        !(self.payment_status == PaymentStatus::Paid
            && self.confirmation_status == ConfirmationStatus::Confirmed)
    }
}

/// Payload a participant submits when joining a camp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RegistrationForm {
    pub age: i64,
    pub phone: String,
    pub gender: Gender,
    #[serde(rename = "emergencyContact")]
    pub emergency_contact: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<(), String> {
        if self.age <= 0 {
            return Err("Age must be a positive number".to_string());
        }
        if self.phone.trim().is_empty() {
            return Err("Phone number is required".to_string());
        }
        if self.emergency_contact.trim().is_empty() {
            return Err("Emergency contact is required".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Listing filters and pagination
// ============================================================================

/// Status filter for registration listings. Wire values match the live
/// endpoint: `all | paid-confirmed | paid-pending | unpaid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum StatusFilter {
    #[default]
    All,
    PaidConfirmed,
    PaidPending,
    Unpaid,
}

impl StatusFilter {
    pub fn as_param(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::PaidConfirmed => "paid-confirmed",
            StatusFilter::PaidPending => "paid-pending",
            StatusFilter::Unpaid => "unpaid",
        }
    }

    /// Client-side counterpart of the server filter, for filtering rows
    /// already in hand.
    pub fn matches(&self, registration: &RegistrationDetail) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::PaidConfirmed => {
                registration.payment_status == PaymentStatus::Paid
                    && registration.confirmation_status == ConfirmationStatus::Confirmed
            }
            StatusFilter::PaidPending => {
                registration.payment_status == PaymentStatus::Paid
                    && registration.confirmation_status == ConfirmationStatus::Pending
            }
            StatusFilter::Unpaid => registration.payment_status == PaymentStatus::Unpaid,
        }
    }
}

/// Filter parameters for registration listings; doubles as the
/// cache-key parameter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationQuery {
    pub search: Option<String>,
    pub status: StatusFilter,
    pub page: i64,
    pub limit: i64,
}

impl Default for RegistrationQuery {
    fn default() -> Self {
        Self {
            search: None,
            status: StatusFilter::All,
            page: 1,
            limit: 10,
        }
    }
}

impl RegistrationQuery {
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("status", self.status.as_param().to_string()),
        ];
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Pagination {
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub pages: i64,
}

/// A page of results plus the server's pagination envelope.
#[derive(Debug, Clone)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

// ============================================================================
// Tests
// ============================================================================
