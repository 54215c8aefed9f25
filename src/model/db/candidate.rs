use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::{candidate::CandidateStatus, CandidateId, ElectionId, UserId};

/// A candidate standing in one election, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: CandidateId,
    /// The election this candidate stands in.
    pub election_id: ElectionId,
    pub first_name: String,
    pub last_name: String,
    /// Party name or campaign code name.
    pub party: String,
    /// Reference to the party logo in external file storage.
    #[serde(default)]
    pub party_logo: Option<String>,
    /// Reference to the candidate photo in external file storage.
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    /// Approval status.
    pub status: CandidateStatus,
    /// User who registered the candidate.
    pub created_by: UserId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}
