use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::{
    api::validation::not_blank,
    common::{candidate::CandidateStatus, CandidateId, ElectionId, UserId},
    db::{candidate::Candidate, now},
};

/// A candidate registration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CandidateSpec {
    #[validate(custom = "not_blank", length(max = 100))]
    pub first_name: String,
    #[validate(custom = "not_blank", length(max = 100))]
    pub last_name: String,
    /// Party name or campaign code name.
    #[validate(custom = "not_blank", length(max = 100))]
    pub party: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub party_logo: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub photo: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
}

impl CandidateSpec {
    /// Convert this spec into a pending candidate of the given election.
    pub fn into_candidate(
        self,
        id: CandidateId,
        election_id: ElectionId,
        created_by: UserId,
    ) -> Candidate {
        let created_at = now();
        Candidate {
            id,
            election_id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            party: self.party.trim().to_string(),
            party_logo: self.party_logo,
            photo: self.photo,
            biography: self.biography,
            status: CandidateStatus::Pending,
            created_by,
            created_at,
            updated_at: created_at,
        }
    }
}

/// A partial update to a candidate. The owning election and the approval
/// status cannot be changed here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CandidatePatch {
    #[validate(custom = "not_blank", length(max = 100))]
    pub first_name: Option<String>,
    #[validate(custom = "not_blank", length(max = 100))]
    pub last_name: Option<String>,
    #[validate(custom = "not_blank", length(max = 100))]
    pub party: Option<String>,
    #[validate(length(max = 255))]
    pub party_logo: Option<String>,
    #[validate(length(max = 255))]
    pub photo: Option<String>,
    pub biography: Option<String>,
}

impl CandidatePatch {
    pub fn apply_to(self, candidate: &mut Candidate) {
        if let Some(first_name) = self.first_name {
            candidate.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = self.last_name {
            candidate.last_name = last_name.trim().to_string();
        }
        if let Some(party) = self.party {
            candidate.party = party.trim().to_string();
        }
        if let Some(party_logo) = self.party_logo {
            candidate.party_logo = Some(party_logo);
        }
        if let Some(photo) = self.photo {
            candidate.photo = Some(photo);
        }
        if let Some(biography) = self.biography {
            candidate.biography = Some(biography);
        }
        candidate.updated_at = now();
    }
}

/// Approval decision on a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CandidateStatusUpdate {
    pub status: CandidateStatus,
}

/// API-friendly description of a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: CandidateId,
    pub election_id: ElectionId,
    pub first_name: String,
    pub last_name: String,
    pub party: String,
    pub party_logo: Option<String>,
    pub photo: Option<String>,
    pub biography: Option<String>,
    pub status: CandidateStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            election_id: candidate.election_id,
            first_name: candidate.first_name,
            last_name: candidate.last_name,
            party: candidate.party,
            party_logo: candidate.party_logo,
            photo: candidate.photo,
            biography: candidate.biography,
            status: candidate.status,
            created_by: candidate.created_by,
            created_at: candidate.created_at,
            updated_at: candidate.updated_at,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CandidateSpec {
        pub fn example1() -> Self {
            Self {
                first_name: "Awa".to_string(),
                last_name: "Ndong".to_string(),
                party: "Union Progressiste".to_string(),
                party_logo: None,
                photo: None,
                biography: None,
            }
        }

        pub fn example2() -> Self {
            Self {
                first_name: "Jean".to_string(),
                last_name: "Mba".to_string(),
                party: "Renouveau".to_string(),
                party_logo: Some("logos/renouveau.png".to_string()),
                photo: None,
                biography: Some("Mayor since 2019.".to_string()),
            }
        }
    }
}
