//! Table export.
//!
//! Writes the materialized vote table as CSV (the spreadsheet artifact) or
//! as JSON.

pub mod writer;

pub use writer::*;
