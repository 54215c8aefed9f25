//! Types exchanged with API clients.

pub mod candidate;
pub mod center;
pub mod dump;
pub mod election;
pub mod geojson;
pub mod id;
pub mod office;
pub mod results;
pub mod tally;
pub mod validation;
