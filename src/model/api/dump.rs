use serde::{Deserialize, Serialize};

use crate::model::api::{
    candidate::CandidateDescription, center::CenterDescription, election::ElectionDescription,
    office::OfficeDescription, results::ElectionResults, tally::VotingResultDescription,
};

/// Everything recorded for one election, read from a single snapshot,
/// alongside the aggregate the server computed from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionDump {
    pub election: ElectionDescription,
    pub candidates: Vec<CandidateDescription>,
    pub centers: Vec<CenterDescription>,
    pub offices: Vec<OfficeDescription>,
    pub results: Vec<VotingResultDescription>,
    pub aggregate: ElectionResults,
}
