use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Workflow state of the tallies submitted for one voting office.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Nothing submitted yet.
    #[default]
    Draft,
    /// Tallies submitted, awaiting review.
    Submitted,
    /// Tallies checked and accepted.
    Validated,
    /// Tallies sent back for correction.
    Rejected,
}

impl SubmissionStatus {
    /// Can the workflow move from `self` to `next` through an explicit status change?
    ///
    /// Submitting tallies always moves the office to [`SubmissionStatus::Submitted`],
    /// whatever the current state.
    pub fn can_become(self, next: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        matches!(
            (self, next),
            (Draft, Submitted)
                | (Submitted, Validated)
                | (Submitted, Rejected)
                | (Rejected, Submitted)
                | (Validated, Submitted)
        )
    }
}

impl From<SubmissionStatus> for Bson {
    fn from(status: SubmissionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// A GeoJSON position: longitude, latitude and optionally altitude.
/// Coordinates are stored verbatim and never range-checked.
pub type Position = Vec<f64>;

/// The geometries a bureau location may be recorded as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    Polygon { coordinates: Vec<Vec<Position>> },
}

impl Geometry {
    /// The position of this geometry, if it is a single point.
    pub fn as_point(&self) -> Option<&Position> {
        match self {
            Self::Point { coordinates } => Some(coordinates),
            _ => None,
        }
    }
}

impl From<Geometry> for Bson {
    fn from(geometry: Geometry) -> Self {
        to_bson(&geometry).expect("Serialisation is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::serde::json::serde_json::{self, json};

    #[test]
    fn workflow_transitions() {
        use SubmissionStatus::*;

        assert!(Draft.can_become(Submitted));
        assert!(Submitted.can_become(Validated));
        assert!(Submitted.can_become(Rejected));
        assert!(Rejected.can_become(Submitted));
        assert!(Validated.can_become(Submitted));

        assert!(!Draft.can_become(Validated));
        assert!(!Draft.can_become(Rejected));
        assert!(!Rejected.can_become(Validated));
        assert!(!Validated.can_become(Rejected));
        assert!(!Submitted.can_become(Draft));
        assert!(!Submitted.can_become(Submitted));
    }

    #[test]
    fn geometry_is_geojson() {
        let point = Geometry::Point {
            coordinates: vec![9.4536, 0.3901],
        };
        assert_eq!(
            serde_json::to_value(&point).unwrap(),
            json!({"type": "Point", "coordinates": [9.4536, 0.3901]})
        );
        assert_eq!(point.as_point(), Some(&vec![9.4536, 0.3901]));

        let polygon: Geometry = serde_json::from_value(json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
        }))
        .unwrap();
        assert!(polygon.as_point().is_none());
    }
}
