use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the Election lifecycle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionStatus {
    /// Under construction.
    #[default]
    Draft,
    /// Scheduled, not yet open.
    Upcoming,
    /// Polls are open or results are coming in.
    Active,
    /// All results are in.
    Completed,
    /// Called off.
    Cancelled,
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
