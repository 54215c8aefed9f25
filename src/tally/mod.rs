//! Vote tally submission, aggregation and export.

pub mod aggregate;
pub mod geo;
pub mod realtime;
pub mod snapshot;
pub mod submission;
