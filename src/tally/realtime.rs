//! Election totals summed by the database itself, without reading every row.
//!
//! Unlike the full aggregate these reads are not taken from one snapshot, so
//! a submission landing in between may be half counted.

use log::debug;
use mongodb::{
    bson::{doc, Bson, Document},
    Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    api::results::{ElectionTotals, Subtotals},
    common::{CandidateId, ElectionId},
    db::{center::VotingCenter, election::Election, office::VotingOffice, result::VotingResult},
    mongodb::{u32_id_filter, Coll},
};

pub async fn realtime_totals(db: &Database, election_id: ElectionId) -> Result<ElectionTotals> {
    let elections = Coll::<Election>::from_db(db);
    if elections
        .count_documents(u32_id_filter(election_id), None)
        .await?
        == 0
    {
        return Err(Error::not_found(format!("Election with ID '{election_id}'")));
    }

    let center_ids = Coll::<VotingCenter>::from_db(db)
        .distinct("_id", doc! { "election_id": election_id }, None)
        .await?;

    let office_pipeline = vec![
        doc! { "$match": { "center_id": { "$in": center_ids } } },
        doc! { "$group": {
            "_id": Bson::Null,
            "total_voters": { "$sum": "$total_voters" },
            "blank_votes": { "$sum": "$blank_votes" },
            "null_votes": { "$sum": "$null_votes" },
            "office_ids": { "$push": "$_id" },
        } },
    ];
    let office_group: Option<Document> = Coll::<VotingOffice>::from_db(db)
        .aggregate(office_pipeline, None)
        .await?
        .try_next()
        .await?;
    let Some(office_group) = office_group else {
        // No offices, so no result rows either.
        return Ok(ElectionTotals::default());
    };

    let office_ids = office_group
        .get_array("office_ids")
        .cloned()
        .unwrap_or_default();
    let result_pipeline = vec![
        doc! { "$match": { "office_id": { "$in": office_ids } } },
        doc! { "$group": { "_id": "$candidate_id", "votes": { "$sum": "$votes" } } },
    ];
    let candidate_groups: Vec<Document> = Coll::<VotingResult>::from_db(db)
        .aggregate(result_pipeline, None)
        .await?
        .try_collect()
        .await?;
    debug!(
        "Election {election_id}: summed {} candidate groups",
        candidate_groups.len()
    );

    Ok(ElectionTotals {
        subtotals: subtotals(&office_group),
        candidate_results: candidate_groups.iter().filter_map(candidate_votes).collect(),
    })
}

/// Read a `$sum` result, whichever numeric type the server chose for it.
fn count(doc: &Document, key: &str) -> u64 {
    match doc.get(key) {
        Some(Bson::Int32(n)) => u64::try_from(*n).unwrap_or(0),
        Some(Bson::Int64(n)) => u64::try_from(*n).unwrap_or(0),
        Some(Bson::Double(n)) if *n > 0.0 => *n as u64,
        _ => 0,
    }
}

fn subtotals(group: &Document) -> Subtotals {
    Subtotals {
        total_voters: count(group, "total_voters"),
        blank_votes: count(group, "blank_votes"),
        null_votes: count(group, "null_votes"),
    }
}

fn candidate_votes(group: &Document) -> Option<(CandidateId, u64)> {
    let candidate_id = match group.get("_id")? {
        Bson::Int32(id) => CandidateId::try_from(*id).ok()?,
        Bson::Int64(id) => CandidateId::try_from(*id).ok()?,
        _ => return None,
    };
    Some((candidate_id, count(group, "votes")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_any_numeric_sum() {
        let group = doc! {
            "_id": Bson::Null,
            "total_voters": 180_i32,
            "blank_votes": 5_000_000_000_i64,
            "null_votes": 3.0,
        };
        assert_eq!(
            subtotals(&group),
            Subtotals {
                total_voters: 180,
                blank_votes: 5_000_000_000,
                null_votes: 3,
            }
        );
        assert_eq!(subtotals(&doc! {}), Subtotals::default());
    }

    #[test]
    fn candidate_groups() {
        assert_eq!(candidate_votes(&doc! { "_id": 2_i64, "votes": 80_i32 }), Some((2, 80)));
        assert_eq!(candidate_votes(&doc! { "_id": 3_i32, "votes": 0_i32 }), Some((3, 0)));
        assert_eq!(candidate_votes(&doc! { "_id": Bson::Null, "votes": 8_i32 }), None);
        assert_eq!(candidate_votes(&doc! { "_id": -1_i32, "votes": 8_i32 }), None);
    }
}
