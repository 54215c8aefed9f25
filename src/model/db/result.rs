use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{CandidateId, OfficeId},
    mongodb::Id,
};

/// Core per-candidate tally at one office.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct VotingResultCore {
    pub office_id: OfficeId,
    pub candidate_id: CandidateId,
    pub votes: u32,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// A voting result without an ID.
pub type NewVotingResult = VotingResultCore;

/// A voting result from the database, with its unique ID.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct VotingResult {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub result: VotingResultCore,
}

impl Deref for VotingResult {
    type Target = VotingResultCore;

    fn deref(&self) -> &Self::Target {
        &self.result
    }
}

impl DerefMut for VotingResult {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.result
    }
}
