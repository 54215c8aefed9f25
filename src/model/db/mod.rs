//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - Timestamps are serialised as MongoDB datetimes (millisecond precision).
//! - Optional fields are tolerated when missing, so older documents still load.

use chrono::{DateTime, Utc};

pub mod candidate;
pub mod center;
pub mod election;
pub mod office;
pub mod result;

/// The current time, truncated to the millisecond precision that survives a
/// round trip through the database.
pub fn now() -> DateTime<Utc> {
    mongodb::bson::DateTime::now().to_chrono()
}
