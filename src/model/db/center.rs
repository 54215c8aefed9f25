use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::{CenterId, ElectionId};

/// A voting center, grouping the offices of one election at one site.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct VotingCenter {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: CenterId,
    /// The election this center serves.
    pub election_id: ElectionId,
    /// Center name, unique within the election.
    pub name: String,
    pub address: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}
