use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{
    api::{center::CenterDescription, election::ElectionDescription},
    common::CandidateId,
};

/// Summed office-level counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtotals {
    pub total_voters: u64,
    pub blank_votes: u64,
    pub null_votes: u64,
}

impl Subtotals {
    /// Add one office's counters; a counter that was never submitted counts as zero.
    pub fn add(&mut self, total_voters: Option<u32>, blank_votes: Option<u32>, null_votes: Option<u32>) {
        self.total_voters += u64::from(total_voters.unwrap_or(0));
        self.blank_votes += u64::from(blank_votes.unwrap_or(0));
        self.null_votes += u64::from(null_votes.unwrap_or(0));
    }
}

impl std::ops::AddAssign for Subtotals {
    fn add_assign(&mut self, other: Self) {
        self.total_voters += other.total_voters;
        self.blank_votes += other.blank_votes;
        self.null_votes += other.null_votes;
    }
}

/// Flat election totals, as returned by the real-time endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionTotals {
    #[serde(flatten)]
    pub subtotals: Subtotals,
    /// Votes per candidate. Candidates without any result row are absent.
    pub candidate_results: BTreeMap<CandidateId, u64>,
}

/// One center's share of the election totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterTotals {
    #[serde(flatten)]
    pub center: CenterDescription,
    #[serde(flatten)]
    pub subtotals: Subtotals,
}

/// Full election aggregate with a per-center breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub election: ElectionDescription,
    pub total_voters: u64,
    pub blank_votes: u64,
    pub null_votes: u64,
    /// Votes per candidate. Candidates without any result row are absent.
    pub candidate_results: BTreeMap<CandidateId, u64>,
    pub centers: Vec<CenterTotals>,
}

impl ElectionResults {
    /// The election-wide counters, without the breakdown.
    pub fn totals(&self) -> ElectionTotals {
        ElectionTotals {
            subtotals: Subtotals {
                total_voters: self.total_voters,
                blank_votes: self.blank_votes,
                null_votes: self.null_votes,
            },
            candidate_results: self.candidate_results.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::serde::json::serde_json::{self, json};

    #[test]
    fn totals_json_shape() {
        let mut totals = ElectionTotals::default();
        totals.subtotals.add(Some(100), None, Some(2));
        totals.candidate_results.insert(1, 80);
        assert_eq!(
            serde_json::to_value(&totals).unwrap(),
            json!({
                "total_voters": 100,
                "blank_votes": 0,
                "null_votes": 2,
                "candidate_results": {"1": 80},
            })
        );
    }
}
