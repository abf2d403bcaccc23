//! # Fixture Store
//!
//! Idempotent creation, update and removal of fixture data inside a
//! persistent, externally-owned collection. Repeated setup/teardown runs
//! never duplicate records, and mutations are reported as one aggregated
//! count per collection instead of one line per write.
//!
//! ## Core Concepts
//!
//! - **Identity**: each fixture has a logical identity, either an explicit
//!   key or a content hash of its payload
//! - **Registry**: a persistent map from identity to the document it
//!   produced, consulted before every create
//! - **Debounced reporting**: bursts of add/change/remove events coalesce
//!   into one report per collection name after a quiet period
//! - **Facade**: a scoped API per target collection, with optional
//!   overrides for create/update/remove
//!
//! ## Example
//!
//! ```ignore
//! use fixture_store::{
//!     FixtureRegistry, FixtureSet, LogReportSink, MemoryCollection, MutationCounter,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(FixtureRegistry::open("./fixtures.reg")?);
//! let counter = Arc::new(MutationCounter::new(Arc::new(LogReportSink)));
//! let collection = Arc::new(MemoryCollection::new());
//!
//! let users = FixtureSet::builder("users", collection, registry, counter).build();
//!
//! // First run creates the document, later runs are no-ops
//! users.insert_keyed("admin", &json!({"name": "admin", "role": "root"}))?;
//!
//! users.flush()?; // teardown: remove everything this set created
//! ```

pub mod collection;
pub mod counter;
pub mod error;
pub mod facade;
pub mod registry;
pub mod types;

// Re-exports
pub use collection::{MemoryCollection, TargetCollection};
pub use counter::{
    ChannelReportSink, LogReportSink, MutationCounter, ReportSink, DEFAULT_QUIET_PERIOD,
};
pub use error::{FixtureError, Result};
pub use facade::{CreateFn, FixtureRef, FixtureSet, FixtureSetBuilder, RemoveFn, UpdateFn};
pub use registry::FixtureRegistry;
pub use types::*;
