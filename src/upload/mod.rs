//! Object-storage upload coordination.
//!
//! This module provides the `UploadCoordinator` for moving camp images
//! to object storage through the presigned-URL proxy: reserve a slot,
//! stream the binary with progress reporting, and release abandoned
//! slots.

pub mod coordinator;

pub use coordinator::{ProgressSender, UploadCoordinator, UploadSlot};
