//! REST API client module for the MediCamp backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! external MediCamp API to fetch camps, registrations, and profile
//! data, and the `ApiError` taxonomy every layer above reports.
//!
//! Authenticated routes use JWT bearer tokens obtained through the
//! `/users/signin` (or OAuth exchange) endpoints.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
