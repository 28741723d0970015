//! Client-side query cache for server-fetched collections.
//!
//! This module provides the `QueryCache`, a process-wide keyed cache
//! with configurable staleness, single-flight fetch sharing, and
//! resource-level invalidation. Data is kept in memory and considered
//! stale after the configured window (60 seconds by default).
//!
//! Cached resources include:
//! - Available camps listings and camp details
//! - Organizer and participant registration listings
//! - The signed-in account profile

pub mod key;
pub mod store;

pub use key::{keys, CacheKey};
pub use store::{QueryCache, QueryState, QueryStatus, ReadOptions};
