//! Data models for MediCamp entities.
//!
//! This module contains all the data structures exchanged with the
//! MediCamp REST API:
//!
//! - `Camp`, `CampForm`: scheduled medical camps and their creation payload
//! - `RegistrationDetail`, `CampWithRegistrations`, `ParticipantRegistration`:
//!   enrollment records with payment/confirmation status
//! - `UserProfile`, `Role`: accounts and the participant/organizer split
//! - `Feedback`: post-camp participant feedback
//! - Listing filters (`CampQuery`, `RegistrationQuery`, `StatusFilter`)
//!   and pagination (`Paginated`, `Pagination`)
//!
//! Field names follow the live API (`_id`, `dateTime`, `participantCount`).

pub mod camp;
pub mod feedback;
pub mod registration;
pub mod user;

pub use camp::{Camp, CampForm, CampQuery, CampSortColumn};
pub use feedback::{Feedback, FeedbackForm, MAX_RATING, MIN_RATING};
pub use registration::{
    CampWithRegistrations, ConfirmationStatus, Gender, Paginated, Pagination, Participant,
    ParticipantRegistration, PaymentStatus, RegistrationDetail, RegistrationForm,
    RegistrationQuery, StatusFilter,
};
pub use user::{ProfileForm, Role, UserProfile};
