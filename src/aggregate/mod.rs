//! Vote aggregation.
//!
//! The [`Aggregator`] owns the member roster and the event store for a run
//! and materializes them into the flattened export table.

pub mod aggregator;
pub mod roster;

pub use aggregator::{Aggregator, Ingest};
pub use roster::Roster;
