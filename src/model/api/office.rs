use chrono::{DateTime, Utc};
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::{
    api::{tally::VotingResultDescription, validation::not_blank},
    common::{
        office::{Geometry, SubmissionStatus},
        CenterId, OfficeId, UserId,
    },
    db::{
        now,
        office::{OfficeTally, VotingOffice},
    },
};

fn default_active() -> bool {
    true
}

/// A new voting office (bureau) within a center.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OfficeSpec {
    #[validate(custom = "not_blank", length(max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub region: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub commune: Option<String>,
    #[serde(default)]
    pub registered_voters: u32,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub contact_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub location: Option<Geometry>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl OfficeSpec {
    /// Convert this spec into a stored office with no tallies yet.
    pub fn into_office(self, id: OfficeId, center_id: CenterId) -> VotingOffice {
        let created_at = now();
        VotingOffice {
            id,
            center_id,
            name: self.name.trim().to_string(),
            address: self.address,
            region: self.region,
            department: self.department,
            commune: self.commune,
            registered_voters: self.registered_voters,
            contact_name: self.contact_name,
            contact_phone: self.contact_phone,
            location: self.location,
            active: self.active,
            tally: OfficeTally::default(),
            created_at,
            updated_at: created_at,
        }
    }
}

/// A partial update to an office's descriptive fields.
///
/// Tally counters and workflow state are only changed through result submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OfficePatch {
    #[validate(custom = "not_blank", length(max = 100))]
    pub name: Option<String>,
    pub center_id: Option<CenterId>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub region: Option<String>,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[validate(length(max = 100))]
    pub commune: Option<String>,
    pub registered_voters: Option<u32>,
    #[validate(length(max = 100))]
    pub contact_name: Option<String>,
    #[validate(length(max = 20))]
    pub contact_phone: Option<String>,
    pub location: Option<Geometry>,
    pub active: Option<bool>,
}

impl OfficePatch {
    /// The fields to `$set` on the stored office: only those present in the
    /// patch, plus the modification time. Tallies are never touched.
    pub fn into_update(self) -> Document {
        let mut set = doc! { "updated_at": BsonDateTime::from_chrono(now()) };
        if let Some(name) = self.name {
            set.insert("name", name.trim());
        }
        if let Some(center_id) = self.center_id {
            set.insert("center_id", center_id);
        }
        let descriptive = [
            ("address", self.address),
            ("region", self.region),
            ("department", self.department),
            ("commune", self.commune),
            ("contact_name", self.contact_name),
            ("contact_phone", self.contact_phone),
        ];
        for (key, value) in descriptive {
            if let Some(value) = value {
                set.insert(key, value);
            }
        }
        if let Some(registered_voters) = self.registered_voters {
            set.insert("registered_voters", registered_voters);
        }
        if let Some(location) = self.location {
            set.insert("location", location);
        }
        if let Some(active) = self.active {
            set.insert("active", active);
        }
        set
    }
}

/// API-friendly description of a voting office, including its latest tallies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficeDescription {
    pub id: OfficeId,
    pub center_id: CenterId,
    pub name: String,
    pub address: Option<String>,
    pub region: Option<String>,
    pub department: Option<String>,
    pub commune: Option<String>,
    pub registered_voters: u32,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub location: Option<Geometry>,
    pub active: bool,
    pub total_voters: Option<u32>,
    pub blank_votes: Option<u32>,
    pub null_votes: Option<u32>,
    pub submission_status: SubmissionStatus,
    pub submitted_by: Option<UserId>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VotingOffice> for OfficeDescription {
    fn from(office: VotingOffice) -> Self {
        let tally = office.tally;
        Self {
            id: office.id,
            center_id: office.center_id,
            name: office.name,
            address: office.address,
            region: office.region,
            department: office.department,
            commune: office.commune,
            registered_voters: office.registered_voters,
            contact_name: office.contact_name,
            contact_phone: office.contact_phone,
            location: office.location,
            active: office.active,
            total_voters: tally.total_voters,
            blank_votes: tally.blank_votes,
            null_votes: tally.null_votes,
            submission_status: tally.submission_status,
            submitted_by: tally.submitted_by,
            submitted_at: tally.submitted_at.map(|at| at.to_chrono()),
            remarks: tally.remarks,
            created_at: office.created_at,
            updated_at: office.updated_at,
        }
    }
}

/// An office together with its per-candidate result rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficeResults {
    pub office: OfficeDescription,
    pub results: Vec<VotingResultDescription>,
}

#[cfg(test)]
mod examples {
    use super::*;

    impl OfficeSpec {
        pub fn example1() -> Self {
            Self {
                name: "Bureau 1".to_string(),
                address: Some("Salle A".to_string()),
                region: Some("Estuaire".to_string()),
                department: Some("Libreville".to_string()),
                commune: Some("1er arrondissement".to_string()),
                registered_voters: 150,
                contact_name: Some("M. Obame".to_string()),
                contact_phone: Some("+241 01 23 45 67".to_string()),
                location: Some(Geometry::Point {
                    coordinates: vec![9.4673, 0.4162],
                }),
                active: true,
            }
        }

        pub fn example2() -> Self {
            Self {
                name: "Bureau 2".to_string(),
                address: None,
                region: None,
                department: None,
                commune: None,
                registered_voters: 120,
                contact_name: None,
                contact_phone: None,
                location: None,
                active: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::serde::json::serde_json::{self, json};

    #[test]
    fn defaults() {
        let spec: OfficeSpec = serde_json::from_value(json!({"name": "Bureau 9"})).unwrap();
        assert!(spec.active);
        assert_eq!(spec.registered_voters, 0);

        let office = spec.into_office(9, 2);
        assert_eq!(office.tally, OfficeTally::default());
        assert_eq!(office.tally.submission_status, SubmissionStatus::Draft);
    }

    #[test]
    fn negative_registered_voters_rejected() {
        let spec = serde_json::from_value::<OfficeSpec>(json!({
            "name": "Bureau 9",
            "registered_voters": -3,
        }));
        assert!(spec.is_err());
    }

    #[test]
    fn patch_cannot_touch_tallies() {
        let patch = serde_json::from_value::<OfficePatch>(json!({"total_voters": 10}));
        assert!(patch.is_err());

        let patch: OfficePatch = serde_json::from_value(json!({
            "name": " Bureau 1 bis ",
            "active": false,
            "contact_phone": "+241 07 65 43 21",
        }))
        .unwrap();
        let set = patch.into_update();
        let mut keys: Vec<&str> = set.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["active", "contact_phone", "name", "updated_at"]);
        assert_eq!(set.get_str("name").unwrap(), "Bureau 1 bis");
        assert!(!set.get_bool("active").unwrap());
    }

    #[test]
    fn patch_location_is_geojson() {
        let patch = OfficePatch {
            location: Some(Geometry::Point {
                coordinates: vec![9.45, 0.39],
            }),
            ..Default::default()
        };
        let set = patch.into_update();
        let location = set.get_document("location").unwrap();
        assert_eq!(location.get_str("type").unwrap(), "Point");
        assert_eq!(location.get_array("coordinates").unwrap().len(), 2);
    }

    #[test]
    fn description_exposes_tallies() {
        let mut office = OfficeSpec::example2().into_office(4, 1);
        office.tally.total_voters = Some(80);
        let description = OfficeDescription::from(office);
        assert_eq!(description.total_voters, Some(80));
        assert_eq!(description.blank_votes, None);
        assert_eq!(description.submitted_at, None);
    }
}
