use log::info;
use mongodb::{
    bson::{doc, Bson},
    options::FindOptions,
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
        api::election::{ElectionDescription, ElectionPatch, ElectionSpec},
        auth::AuthToken,
        common::ElectionId,
        db::{
            candidate::Candidate, center::VotingCenter, election::Election, office::VotingOffice,
            result::VotingResult,
        },
        mongodb::{u32_id_filter, Coll, Counter, Transaction, ELECTION_ID_COUNTER_ID},
    },
};

use super::common::{get_election, parse_body};

pub fn routes() -> Vec<Route> {
    routes![
        create_election,
        get_elections,
        get_election_by_id,
        modify_election,
        delete_election,
    ]
}

#[post("/elections", data = "<spec>", format = "json")]
async fn create_election(
    token: AuthToken,
    spec: std::result::Result<Json<ElectionSpec>, JsonError<'_>>,
    elections: Coll<Election>,
    counters: Coll<Counter>,
) -> Result<Json<ElectionDescription>> {
    let spec = parse_body(spec)?;
    let id = Counter::next(&counters, ELECTION_ID_COUNTER_ID).await?;
    let election = spec.into_election(id, token.user_id());
    elections.insert_one(&election, None).await?;
    info!("User {} created election {id}", token.user_id());
    Ok(Json(election.into()))
}

#[get("/elections")]
async fn get_elections(
    _token: AuthToken,
    elections: Coll<Election>,
) -> Result<Json<Vec<ElectionDescription>>> {
    let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let elections: Vec<Election> = elections.find(None, options).await?.try_collect().await?;
    Ok(Json(elections.into_iter().map(Into::into).collect()))
}

#[get("/elections/<election_id>")]
async fn get_election_by_id(
    _token: AuthToken,
    election_id: ElectionId,
    elections: Coll<Election>,
) -> Result<Json<ElectionDescription>> {
    Ok(Json(get_election(&elections, election_id).await?.into()))
}

#[put("/elections/<election_id>", data = "<patch>", format = "json")]
async fn modify_election(
    _token: AuthToken,
    election_id: ElectionId,
    patch: std::result::Result<Json<ElectionPatch>, JsonError<'_>>,
    elections: Coll<Election>,
) -> Result<Json<ElectionDescription>> {
    let patch = parse_body(patch)?;
    let mut election = get_election(&elections, election_id).await?;
    patch.apply_to(&mut election).map_err(|err| {
        Error::invalid_field(
            "__all__",
            err.message.map(|msg| msg.to_string()).unwrap_or_else(|| err.code.to_string()),
        )
    })?;
    elections
        .replace_one(u32_id_filter(election_id), &election, None)
        .await?;
    Ok(Json(election.into()))
}

/// Delete an election together with its candidates, centers and offices.
///
/// Refused while any result row has been recorded under the election.
#[delete("/elections/<election_id>")]
async fn delete_election(
    token: AuthToken,
    election_id: ElectionId,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<()> {
    let mut transaction = Transaction::begin(db_client).await?;
    let outcome = delete_hierarchy(&mut transaction, db, election_id).await;
    transaction.finish(outcome).await?;
    info!("User {} deleted election {election_id}", token.user_id());
    Ok(())
}

async fn delete_hierarchy(
    session: &mut ClientSession,
    db: &Database,
    election_id: ElectionId,
) -> Result<()> {
    let elections = Coll::<Election>::from_db(db);
    let candidates = Coll::<Candidate>::from_db(db);
    let centers = Coll::<VotingCenter>::from_db(db);
    let offices = Coll::<VotingOffice>::from_db(db);
    let results = Coll::<VotingResult>::from_db(db);

    if elections
        .count_documents_with_session(u32_id_filter(election_id), None, session)
        .await?
        == 0
    {
        return Err(Error::not_found(format!("Election with ID '{election_id}'")));
    }

    let center_ids: Vec<Bson> = centers
        .distinct_with_session("_id", doc! { "election_id": election_id }, None, session)
        .await?;
    let office_ids: Vec<Bson> = offices
        .distinct_with_session(
            "_id",
            doc! { "center_id": { "$in": center_ids.clone() } },
            None,
            session,
        )
        .await?;
    let recorded = results
        .count_documents_with_session(
            doc! { "office_id": { "$in": office_ids.clone() } },
            None,
            session,
        )
        .await?;
    if recorded > 0 {
        return Err(Error::Conflict(format!(
            "Election {election_id} has {recorded} recorded results"
        )));
    }

    offices
        .delete_many_with_session(doc! { "_id": { "$in": office_ids } }, None, session)
        .await?;
    centers
        .delete_many_with_session(doc! { "_id": { "$in": center_ids } }, None, session)
        .await?;
    candidates
        .delete_many_with_session(doc! { "election_id": election_id }, None, session)
        .await?;
    elections
        .delete_one_with_session(u32_id_filter(election_id), None, session)
        .await?;
    Ok(())
}
