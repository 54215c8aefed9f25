use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::model::{
    api::validation::not_blank,
    common::{
        election::{ElectionStatus, ElectionType},
        ElectionId, UserId,
    },
    db::{election::Election, now},
};

/// An election specification, as submitted to create an election.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "spec_window", skip_on_field_errors = false))]
pub struct ElectionSpec {
    /// Election title.
    #[validate(custom = "not_blank", length(max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// What is being elected.
    pub election_type: ElectionType,
    /// Initial status; drafts by default.
    #[serde(default)]
    pub status: ElectionStatus,
    /// Polls open.
    pub start_time: DateTime<Utc>,
    /// Polls close.
    pub end_time: DateTime<Utc>,
}

impl ElectionSpec {
    /// Convert this spec into a stored election with the given unique ID.
    pub fn into_election(self, id: ElectionId, created_by: UserId) -> Election {
        let created_at = now();
        Election {
            id,
            title: self.title.trim().to_string(),
            description: self.description,
            election_type: self.election_type,
            status: self.status,
            start_time: self.start_time,
            end_time: self.end_time,
            created_by,
            created_at,
            updated_at: created_at,
        }
    }
}

/// A partial update to an election. Only the listed fields may be changed;
/// any other key is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ElectionPatch {
    #[validate(custom = "not_blank", length(max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub election_type: Option<ElectionType>,
    pub status: Option<ElectionStatus>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl ElectionPatch {
    /// Apply the provided fields to `election`, then check the resulting
    /// polling window is still coherent.
    pub fn apply_to(self, election: &mut Election) -> Result<(), ValidationError> {
        if let Some(title) = self.title {
            election.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            election.description = Some(description);
        }
        if let Some(election_type) = self.election_type {
            election.election_type = election_type;
        }
        if let Some(status) = self.status {
            election.status = status;
        }
        if let Some(start_time) = self.start_time {
            election.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            election.end_time = end_time;
        }
        check_window(&election.start_time, &election.end_time)?;
        election.updated_at = now();
        Ok(())
    }
}

/// Polls must close after they open.
pub fn check_window(start: &DateTime<Utc>, end: &DateTime<Utc>) -> Result<(), ValidationError> {
    if end <= start {
        let mut error = ValidationError::new("window");
        error.message = Some("end_time must be after start_time".into());
        return Err(error);
    }
    Ok(())
}

fn spec_window(spec: &ElectionSpec) -> Result<(), ValidationError> {
    check_window(&spec.start_time, &spec.end_time)
}

/// API-friendly description of an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    pub id: ElectionId,
    pub title: String,
    pub description: Option<String>,
    pub election_type: ElectionType,
    pub status: ElectionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        Self {
            id: election.id,
            title: election.title,
            description: election.description,
            election_type: election.election_type,
            status: election.status,
            start_time: election.start_time,
            end_time: election.end_time,
            created_by: election.created_by,
            created_at: election.created_at,
            updated_at: election.updated_at,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use chrono::{Duration, TimeZone};

    impl ElectionSpec {
        pub fn example() -> Self {
            let start_time = Utc.with_ymd_and_hms(2026, 3, 1, 7, 0, 0).unwrap();
            Self {
                title: "Legislative 2026".to_string(),
                description: Some("First round".to_string()),
                election_type: ElectionType::Legislative,
                status: ElectionStatus::Upcoming,
                start_time,
                end_time: start_time + Duration::hours(11),
            }
        }
    }
}
