use log::info;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, ClientSession, Database,
};
use rocket::{
    futures::TryStreamExt,
    serde::json::{Error as JsonError, Json},
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::candidate::{
            CandidateDescription, CandidatePatch, CandidateSpec, CandidateStatusUpdate,
        },
        auth::AuthToken,
        common::{CandidateId, ElectionId},
        db::{candidate::Candidate, election::Election, now, result::VotingResult},
        mongodb::{u32_id_filter, Coll, Counter, Transaction, CANDIDATE_ID_COUNTER_ID},
    },
};

use super::common::{get_election, parse_body};

pub fn routes() -> Vec<Route> {
    routes![
        create_candidate,
        get_candidates,
        get_candidate,
        modify_candidate,
        set_candidate_status,
        delete_candidate,
    ]
}

async fn find_candidate(candidates: &Coll<Candidate>, candidate_id: CandidateId) -> Result<Candidate> {
    candidates
        .find_one(u32_id_filter(candidate_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate with ID '{candidate_id}'")))
}

#[post("/elections/<election_id>/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    token: AuthToken,
    election_id: ElectionId,
    spec: std::result::Result<Json<CandidateSpec>, JsonError<'_>>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    counters: Coll<Counter>,
) -> Result<Json<CandidateDescription>> {
    let spec = parse_body(spec)?;
    get_election(&elections, election_id).await?;
    let id = Counter::next(&counters, CANDIDATE_ID_COUNTER_ID).await?;
    let candidate = spec.into_candidate(id, election_id, token.user_id());
    candidates.insert_one(&candidate, None).await?;
    info!("Registered candidate {id} in election {election_id}");
    Ok(Json(candidate.into()))
}

#[get("/elections/<election_id>/candidates")]
async fn get_candidates(
    _token: AuthToken,
    election_id: ElectionId,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<CandidateDescription>>> {
    get_election(&elections, election_id).await?;
    let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let candidates: Vec<Candidate> = candidates
        .find(doc! { "election_id": election_id }, options)
        .await?
        .try_collect()
        .await?;
    Ok(Json(candidates.into_iter().map(Into::into).collect()))
}

#[get("/candidates/<candidate_id>")]
async fn get_candidate(
    _token: AuthToken,
    candidate_id: CandidateId,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    Ok(Json(find_candidate(&candidates, candidate_id).await?.into()))
}

#[put("/candidates/<candidate_id>", data = "<patch>", format = "json")]
async fn modify_candidate(
    _token: AuthToken,
    candidate_id: CandidateId,
    patch: std::result::Result<Json<CandidatePatch>, JsonError<'_>>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let patch = parse_body(patch)?;
    let mut candidate = find_candidate(&candidates, candidate_id).await?;
    patch.apply_to(&mut candidate);
    candidates
        .replace_one(u32_id_filter(candidate_id), &candidate, None)
        .await?;
    Ok(Json(candidate.into()))
}

#[put("/candidates/<candidate_id>/status", data = "<update>", format = "json")]
async fn set_candidate_status(
    token: AuthToken,
    candidate_id: CandidateId,
    update: std::result::Result<Json<CandidateStatusUpdate>, JsonError<'_>>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateDescription>> {
    let update = parse_body(update)?;
    let update = doc! {
        "$set": {
            "status": update.status,
            "updated_at": BsonDateTime::from_chrono(now()),
        }
    };
    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let candidate = candidates
        .find_one_and_update(u32_id_filter(candidate_id), update, options)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate with ID '{candidate_id}'")))?;
    info!(
        "User {} set candidate {candidate_id} to {:?}",
        token.user_id(),
        candidate.status
    );
    Ok(Json(candidate.into()))
}

/// Delete a candidate, unless votes have been recorded for them.
#[delete("/candidates/<candidate_id>")]
async fn delete_candidate(
    _token: AuthToken,
    candidate_id: CandidateId,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<()> {
    let mut transaction = Transaction::begin(db_client).await?;
    let outcome = delete_unused(&mut transaction, db, candidate_id).await;
    transaction.finish(outcome).await
}

async fn delete_unused(session: &mut ClientSession, db: &Database, candidate_id: CandidateId) -> Result<()> {
    let recorded = Coll::<VotingResult>::from_db(db)
        .count_documents_with_session(doc! { "candidate_id": candidate_id }, None, session)
        .await?;
    if recorded > 0 {
        return Err(Error::Conflict(format!(
            "Candidate {candidate_id} has recorded results"
        )));
    }
    let deleted = Coll::<Candidate>::from_db(db)
        .delete_one_with_session(u32_id_filter(candidate_id), None, session)
        .await?;
    if deleted.deleted_count == 0 {
        return Err(Error::not_found(format!("Candidate with ID '{candidate_id}'")));
    }
    Ok(())
}
