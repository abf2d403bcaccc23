//! Fixture registry: persistent mapping from (owning collection, identity)
//! to the target document each fixture produced.
//!
//! The registry is what makes repeated setup runs idempotent: before creating
//! a document, a facade asks the registry whether the identity already
//! produced one. Records are registered only after the target document is
//! confirmed created, and unregistered only after it is confirmed removed.

mod store;

pub use store::FixtureRegistry;
