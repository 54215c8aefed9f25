use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// The kind of office being elected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionType {
    Legislative,
    Municipal,
    Local,
    Presidential,
    Regional,
}

impl From<ElectionType> for Bson {
    fn from(kind: ElectionType) -> Self {
        to_bson(&kind).expect("Serialisation is infallible")
    }
}
