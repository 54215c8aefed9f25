use chrono::{DateTime, Utc};
use mongodb::bson::{serde_helpers::chrono_datetime_as_bson_datetime, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use crate::model::common::{
    office::{Geometry, SubmissionStatus},
    CenterId, OfficeId, UserId,
};

/// A voting office (bureau), as stored in the database.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct VotingOffice {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: OfficeId,
    /// The center this office belongs to.
    pub center_id: CenterId,
    /// Office name, unique within the center.
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub commune: Option<String>,
    /// Number of voters registered at this office.
    #[serde(default)]
    pub registered_voters: u32,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    /// Where the office is, as a GeoJSON geometry.
    #[serde(default)]
    pub location: Option<Geometry>,
    /// Whether the office is in use.
    pub active: bool,
    /// The most recently submitted tally counters; missing until results arrive.
    #[serde(flatten)]
    pub tally: OfficeTally,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Office-level tally counters and the workflow state of the submission.
///
/// The counters are recorded as submitted; nothing reconciles them with the
/// per-candidate result rows or with the registered voter count.
#[derive(Debug, Default, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct OfficeTally {
    #[serde(default)]
    pub total_voters: Option<u32>,
    #[serde(default)]
    pub blank_votes: Option<u32>,
    #[serde(default)]
    pub null_votes: Option<u32>,
    #[serde(default)]
    pub submission_status: SubmissionStatus,
    #[serde(default)]
    pub submitted_by: Option<UserId>,
    #[serde(default)]
    pub submitted_at: Option<BsonDateTime>,
    #[serde(default)]
    pub remarks: Option<String>,
}
