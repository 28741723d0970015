//! Mutation dispatch for authenticated write operations.
//!
//! This module provides the `MutationDispatcher` and the `Operation`
//! descriptors for every write the application performs: registering
//! for a camp, confirming or cancelling a registration, submitting
//! feedback, creating a camp, and updating the profile.
//!
//! Successful mutations invalidate the cache resources they affect;
//! failed ones leave the cache untouched.

pub mod dispatcher;

pub use dispatcher::{MutationDispatcher, Operation};
