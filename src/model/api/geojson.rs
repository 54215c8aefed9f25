//! GeoJSON projection of voting offices.

use serde::{Deserialize, Serialize};

use crate::model::common::{office::Geometry, OfficeId};

const FEATURE_COLLECTION: &str = "FeatureCollection";
const FEATURE: &str = "Feature";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: FEATURE_COLLECTION.to_string(),
            features,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: Geometry,
    pub properties: BureauProperties,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: BureauProperties) -> Self {
        Self {
            kind: FEATURE.to_string(),
            geometry,
            properties,
        }
    }
}

/// The bureau fields carried by each feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BureauProperties {
    pub id: OfficeId,
    pub name: String,
    pub address: Option<String>,
    pub region: Option<String>,
    pub department: Option<String>,
    pub commune: Option<String>,
    pub registered_voters: u32,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub active: bool,
}
