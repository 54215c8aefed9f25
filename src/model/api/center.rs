use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::{
    api::validation::not_blank,
    common::{CenterId, ElectionId},
    db::{center::VotingCenter, now},
};

/// A new voting center for an election.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CenterSpec {
    #[validate(custom = "not_blank", length(max = 100))]
    pub name: String,
    #[validate(custom = "not_blank", length(max = 255))]
    pub address: String,
}

impl CenterSpec {
    pub fn into_center(self, id: CenterId, election_id: ElectionId) -> VotingCenter {
        let created_at = now();
        VotingCenter {
            id,
            election_id,
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            created_at,
            updated_at: created_at,
        }
    }
}

/// A partial update to a voting center.
///
/// Setting `election_id` moves the center, and all its offices, to another election.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CenterPatch {
    #[validate(custom = "not_blank", length(max = 100))]
    pub name: Option<String>,
    #[validate(custom = "not_blank", length(max = 255))]
    pub address: Option<String>,
    pub election_id: Option<ElectionId>,
}

impl CenterPatch {
    pub fn apply_to(self, center: &mut VotingCenter) {
        if let Some(name) = self.name {
            center.name = name.trim().to_string();
        }
        if let Some(address) = self.address {
            center.address = address.trim().to_string();
        }
        if let Some(election_id) = self.election_id {
            center.election_id = election_id;
        }
        center.updated_at = now();
    }
}

/// API-friendly description of a voting center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterDescription {
    pub id: CenterId,
    pub election_id: ElectionId,
    pub name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VotingCenter> for CenterDescription {
    fn from(center: VotingCenter) -> Self {
        Self {
            id: center.id,
            election_id: center.election_id,
            name: center.name,
            address: center.address,
            created_at: center.created_at,
            updated_at: center.updated_at,
        }
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl CenterSpec {
        pub fn example1() -> Self {
            Self {
                name: "Lycée National".to_string(),
                address: "Boulevard Triomphal".to_string(),
            }
        }

        pub fn example2() -> Self {
            Self {
                name: "École Montagne Sainte".to_string(),
                address: "Quartier Louis".to_string(),
            }
        }
    }
}
