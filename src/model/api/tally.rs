use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::{
    api::{id::ApiId, validation::unique_candidates},
    common::{office::SubmissionStatus, CandidateId, OfficeId},
    db::result::VotingResult,
};

/// Votes cast for one candidate at one office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidateTally {
    pub candidate_id: CandidateId,
    pub votes: u32,
}

/// Tallies submitted for one office.
///
/// Every field is optional: how missing fields are treated depends on the
/// submission policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ResultSubmission {
    pub total_voters: Option<u32>,
    pub blank_votes: Option<u32>,
    pub null_votes: Option<u32>,
    #[validate(custom = "unique_candidates")]
    pub results: Option<Vec<CandidateTally>>,
}

/// Explicit move of an office's submission through the review workflow.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SubmissionStatusUpdate {
    pub status: SubmissionStatus,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
}

/// API-friendly description of a per-candidate result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingResultDescription {
    pub id: ApiId,
    pub office_id: OfficeId,
    pub candidate_id: CandidateId,
    pub votes: u32,
    pub updated_at: DateTime<Utc>,
}

impl From<VotingResult> for VotingResultDescription {
    fn from(result: VotingResult) -> Self {
        Self {
            id: result.id.into(),
            office_id: result.office_id,
            candidate_id: result.candidate_id,
            votes: result.votes,
            updated_at: result.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::serde::json::serde_json::{self, json};

    use crate::model::api::validation::FieldErrors;

    #[test]
    fn everything_optional() {
        let submission: ResultSubmission = serde_json::from_value(json!({})).unwrap();
        assert_eq!(submission, ResultSubmission::default());
        assert!(submission.validate().is_ok());
    }

    #[test]
    fn malformed_tallies_rejected() {
        // Negative counts.
        assert!(serde_json::from_value::<ResultSubmission>(json!({"blank_votes": -1})).is_err());
        // Missing candidate.
        assert!(serde_json::from_value::<ResultSubmission>(json!({
            "results": [{"votes": 3}],
        }))
        .is_err());
        // Wrong type.
        assert!(serde_json::from_value::<ResultSubmission>(json!({
            "results": [{"candidate_id": 1, "votes": "three"}],
        }))
        .is_err());
        // Unknown key.
        assert!(serde_json::from_value::<ResultSubmission>(json!({"turnout": 12})).is_err());
    }

    #[test]
    fn repeated_candidate_rejected() {
        let submission: ResultSubmission = serde_json::from_value(json!({
            "results": [
                {"candidate_id": 1, "votes": 3},
                {"candidate_id": 1, "votes": 4},
            ],
        }))
        .unwrap();
        let errors = FieldErrors::from(submission.validate().unwrap_err()).into_inner();
        assert_eq!(
            errors["results"],
            vec!["candidate 1 listed more than once".to_string()]
        );
    }
}
