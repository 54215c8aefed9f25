use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    api::{
        office::{OfficeDescription, OfficeResults},
        tally::{CandidateTally, ResultSubmission, SubmissionStatusUpdate, VotingResultDescription},
    },
    common::{office::SubmissionStatus, CandidateId, OfficeId, UserId},
    db::{
        candidate::Candidate,
        center::VotingCenter,
        now,
        office::{OfficeTally, VotingOffice},
        result::{NewVotingResult, VotingResult},
    },
    mongodb::{u32_id_filter, Coll, Id, Transaction},
};

/// How a submission is combined with the tallies already recorded for an office.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPolicy {
    /// The submission is the complete new state: missing counters become zero
    /// and every existing result row is replaced by the submitted set.
    Replace,
    /// Only what is provided changes: existing rows of other candidates and
    /// counters left out of the submission are kept.
    Merge,
}

/// Office-level counters to overwrite. `None` leaves the stored value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterUpdate {
    pub total_voters: Option<u32>,
    pub blank_votes: Option<u32>,
    pub null_votes: Option<u32>,
}

impl CounterUpdate {
    /// The counters as they will be after this update.
    pub fn applied_to(&self, tally: &OfficeTally) -> CounterUpdate {
        CounterUpdate {
            total_voters: self.total_voters.or(tally.total_voters),
            blank_votes: self.blank_votes.or(tally.blank_votes),
            null_votes: self.null_votes.or(tally.null_votes),
        }
    }

    fn set_fields(&self, set: &mut Document) {
        if let Some(total_voters) = self.total_voters {
            set.insert("total_voters", total_voters);
        }
        if let Some(blank_votes) = self.blank_votes {
            set.insert("blank_votes", blank_votes);
        }
        if let Some(null_votes) = self.null_votes {
            set.insert("null_votes", null_votes);
        }
    }
}

/// The storage changes needed to apply one submission to one office.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TallyPlan {
    pub counters: CounterUpdate,
    /// Existing result rows to remove.
    pub delete: Vec<Id>,
    /// Existing result rows whose vote count is overwritten.
    pub update: Vec<(Id, u32)>,
    /// New result rows.
    pub insert: Vec<CandidateTally>,
}

impl TallyPlan {
    /// Plan a submission against the office's current result rows.
    ///
    /// `submission` must already have passed validation, so no candidate
    /// appears twice.
    pub fn new(policy: SubmissionPolicy, submission: &ResultSubmission, existing: &[VotingResult]) -> Self {
        let tallies = submission.results.as_deref().unwrap_or_default();
        match policy {
            SubmissionPolicy::Replace => Self {
                counters: CounterUpdate {
                    total_voters: Some(submission.total_voters.unwrap_or(0)),
                    blank_votes: Some(submission.blank_votes.unwrap_or(0)),
                    null_votes: Some(submission.null_votes.unwrap_or(0)),
                },
                delete: existing.iter().map(|row| row.id).collect(),
                update: Vec::new(),
                insert: tallies.to_vec(),
            },
            SubmissionPolicy::Merge => {
                let by_candidate: BTreeMap<CandidateId, Id> = existing
                    .iter()
                    .map(|row| (row.candidate_id, row.id))
                    .collect();
                let mut plan = Self {
                    counters: CounterUpdate {
                        total_voters: submission.total_voters,
                        blank_votes: submission.blank_votes,
                        null_votes: submission.null_votes,
                    },
                    ..Default::default()
                };
                for tally in tallies {
                    match by_candidate.get(&tally.candidate_id) {
                        Some(id) => plan.update.push((*id, tally.votes)),
                        None => plan.insert.push(*tally),
                    }
                }
                plan
            }
        }
    }

    /// Per-candidate votes at the office once this plan has been applied.
    pub fn outcome(&self, existing: &[VotingResult]) -> BTreeMap<CandidateId, u32> {
        let deleted: BTreeSet<Id> = self.delete.iter().copied().collect();
        let updated: BTreeMap<Id, u32> = self.update.iter().copied().collect();
        let mut votes: BTreeMap<CandidateId, u32> = existing
            .iter()
            .filter(|row| !deleted.contains(&row.id))
            .map(|row| {
                let count = updated.get(&row.id).copied().unwrap_or(row.votes);
                (row.candidate_id, count)
            })
            .collect();
        votes.extend(self.insert.iter().map(|tally| (tally.candidate_id, tally.votes)));
        votes
    }
}

/// Record tallies for an office, in a single transaction.
///
/// Every submitted candidate must stand in the election the office belongs
/// to. On success the office's workflow returns to `submitted`, attributed to
/// `submitted_by`.
pub async fn submit(
    db_client: &Client,
    db: &Database,
    policy: SubmissionPolicy,
    office_id: OfficeId,
    submission: &ResultSubmission,
    submitted_by: UserId,
) -> Result<OfficeResults> {
    let mut transaction = Transaction::begin(db_client).await?;
    let outcome = apply(&mut transaction, db, policy, office_id, submission, submitted_by).await;
    let results = transaction.finish(outcome).await?;
    info!(
        "Recorded {policy:?} submission for office {office_id} by user {submitted_by} ({} result rows)",
        results.results.len()
    );
    Ok(results)
}

async fn apply(
    transaction: &mut Transaction,
    db: &Database,
    policy: SubmissionPolicy,
    office_id: OfficeId,
    submission: &ResultSubmission,
    submitted_by: UserId,
) -> Result<OfficeResults> {
    let offices = Coll::<VotingOffice>::from_db(db);
    let centers = Coll::<VotingCenter>::from_db(db);
    let candidates = Coll::<Candidate>::from_db(db);
    let results = Coll::<VotingResult>::from_db(db);
    let new_results = Coll::<NewVotingResult>::from_db(db);

    let office = offices
        .find_one_with_session(u32_id_filter(office_id), None, transaction)
        .await?
        .ok_or_else(|| Error::not_found(format!("Office with ID '{office_id}'")))?;
    let center = centers
        .find_one_with_session(u32_id_filter(office.center_id), None, transaction)
        .await?
        .ok_or_else(|| {
            Error::Conflict(format!(
                "Office {office_id} belongs to missing center {}",
                office.center_id
            ))
        })?;

    // Every candidate must belong to the office's election.
    let submitted: BTreeSet<CandidateId> = submission
        .results
        .iter()
        .flatten()
        .map(|tally| tally.candidate_id)
        .collect();
    if !submitted.is_empty() {
        let filter = doc! {
            "_id": { "$in": submitted.iter().copied().collect::<Vec<_>>() },
            "election_id": center.election_id,
        };
        let known: BTreeSet<CandidateId> = candidates
            .find_with_session(filter, None, transaction)
            .await?
            .stream(transaction)
            .map_ok(|candidate| candidate.id)
            .try_collect()
            .await?;
        let foreign: Vec<String> = submitted
            .difference(&known)
            .map(ToString::to_string)
            .collect();
        if !foreign.is_empty() {
            return Err(Error::Conflict(format!(
                "Candidates [{}] do not stand in election {}",
                foreign.join(", "),
                center.election_id
            )));
        }
    }

    let existing: Vec<VotingResult> = results
        .find_with_session(doc! { "office_id": office_id }, None, transaction)
        .await?
        .stream(transaction)
        .try_collect()
        .await?;
    let plan = TallyPlan::new(policy, submission, &existing);
    debug!(
        "Office {office_id}: deleting {}, updating {}, inserting {} result rows",
        plan.delete.len(),
        plan.update.len(),
        plan.insert.len()
    );

    // Counters and workflow metadata.
    let updated_at = BsonDateTime::from_chrono(now());
    let mut set = doc! {
        "submission_status": SubmissionStatus::Submitted,
        "submitted_by": submitted_by,
        "submitted_at": updated_at,
        "updated_at": updated_at,
    };
    plan.counters.set_fields(&mut set);
    offices
        .update_one_with_session(
            u32_id_filter(office_id),
            doc! { "$set": set },
            None,
            transaction,
        )
        .await?;

    // Result rows. Deletions go first so replaced candidates never collide
    // with the (office, candidate) unique index.
    if !plan.delete.is_empty() {
        results
            .delete_many_with_session(
                doc! { "_id": { "$in": plan.delete.iter().map(|id| **id).collect::<Vec<_>>() } },
                None,
                transaction,
            )
            .await?;
    }
    for &(id, votes) in &plan.update {
        results
            .update_one_with_session(
                id.as_doc(),
                doc! { "$set": { "votes": votes, "updated_at": updated_at } },
                None,
                transaction,
            )
            .await?;
    }
    if !plan.insert.is_empty() {
        let rows: Vec<NewVotingResult> = plan
            .insert
            .iter()
            .map(|tally| NewVotingResult {
                office_id,
                candidate_id: tally.candidate_id,
                votes: tally.votes,
                updated_at: updated_at.to_chrono(),
            })
            .collect();
        new_results
            .insert_many_with_session(rows, None, transaction)
            .await?;
    }

    // Recorded, not rejected.
    let counters = plan.counters.applied_to(&office.tally);
    let cast: u64 = plan.outcome(&existing).values().map(|votes| u64::from(*votes)).sum::<u64>()
        + u64::from(counters.blank_votes.unwrap_or(0))
        + u64::from(counters.null_votes.unwrap_or(0));
    if cast > u64::from(office.registered_voters) {
        warn!(
            "Office {office_id} now records {cast} ballots for {} registered voters",
            office.registered_voters
        );
    }

    let office = offices
        .find_one_with_session(u32_id_filter(office_id), None, transaction)
        .await?
        .ok_or_else(|| Error::not_found(format!("Office with ID '{office_id}'")))?;
    let rows = office_rows(&results, office_id, transaction).await?;
    Ok(OfficeResults {
        office: office.into(),
        results: rows,
    })
}

/// All result rows of an office, by candidate.
async fn office_rows(
    results: &Coll<VotingResult>,
    office_id: OfficeId,
    transaction: &mut Transaction,
) -> Result<Vec<VotingResultDescription>> {
    let options = FindOptions::builder()
        .sort(doc! { "candidate_id": 1 })
        .build();
    let rows: Vec<VotingResult> = results
        .find_with_session(doc! { "office_id": office_id }, options, transaction)
        .await?
        .stream(transaction)
        .try_collect()
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Move an office's submission through the review workflow.
///
/// The change only applies if nobody else changed the status in between.
pub async fn change_status(
    offices: &Coll<VotingOffice>,
    office_id: OfficeId,
    update: SubmissionStatusUpdate,
) -> Result<OfficeDescription> {
    let office = offices
        .find_one(u32_id_filter(office_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Office with ID '{office_id}'")))?;
    let current = office.tally.submission_status;
    if !current.can_become(update.status) {
        return Err(Error::Conflict(format!(
            "Office {office_id} results cannot go from {current:?} to {:?}",
            update.status
        )));
    }

    let mut set = doc! {
        "submission_status": update.status,
        "updated_at": BsonDateTime::from_chrono(now()),
    };
    if let Some(remarks) = update.remarks {
        set.insert("remarks", remarks);
    }
    let filter = doc! {
        "_id": office_id,
        "submission_status": current,
    };
    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let office = offices
        .find_one_and_update(filter, doc! { "$set": set }, options)
        .await?
        .ok_or_else(|| {
            Error::Conflict(format!(
                "Office {office_id} results changed status concurrently"
            ))
        })?;
    info!(
        "Office {office_id} results moved from {current:?} to {:?}",
        office.tally.submission_status
    );
    Ok(office.into())
}
