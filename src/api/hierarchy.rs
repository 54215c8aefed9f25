//! Voting centers and the offices (bureaus) inside them.

use log::info;
use mongodb::{
    bson::doc,
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
        api::{
            center::{CenterDescription, CenterPatch, CenterSpec},
            office::{OfficeDescription, OfficePatch, OfficeSpec},
        },
        auth::AuthToken,
        common::{CenterId, ElectionId, OfficeId},
        db::{center::VotingCenter, election::Election, office::VotingOffice, result::VotingResult},
        mongodb::{
            u32_id_filter, Coll, Counter, Transaction, CENTER_ID_COUNTER_ID, OFFICE_ID_COUNTER_ID,
        },
    },
};

use super::common::{get_center, get_election, get_office, parse_body, require_parent_election};

pub fn routes() -> Vec<Route> {
    routes![
        create_center,
        get_centers,
        get_center_by_id,
        modify_center,
        delete_center,
        create_office,
        get_offices,
        get_office_by_id,
        modify_office,
        delete_office,
    ]
}

#[post("/elections/<election_id>/centers", data = "<spec>", format = "json")]
async fn create_center(
    _token: AuthToken,
    election_id: ElectionId,
    spec: std::result::Result<Json<CenterSpec>, JsonError<'_>>,
    elections: Coll<Election>,
    centers: Coll<VotingCenter>,
    counters: Coll<Counter>,
) -> Result<Json<CenterDescription>> {
    let spec = parse_body(spec)?;
    get_election(&elections, election_id).await?;
    let id = Counter::next(&counters, CENTER_ID_COUNTER_ID).await?;
    let center = spec.into_center(id, election_id);
    // Duplicate names within the election trip the unique index.
    centers.insert_one(&center, None).await?;
    info!("Created center {id} '{}' in election {election_id}", center.name);
    Ok(Json(center.into()))
}

#[get("/elections/<election_id>/centers")]
async fn get_centers(
    _token: AuthToken,
    election_id: ElectionId,
    elections: Coll<Election>,
    centers: Coll<VotingCenter>,
) -> Result<Json<Vec<CenterDescription>>> {
    get_election(&elections, election_id).await?;
    let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let centers: Vec<VotingCenter> = centers
        .find(doc! { "election_id": election_id }, options)
        .await?
        .try_collect()
        .await?;
    Ok(Json(centers.into_iter().map(Into::into).collect()))
}

#[get("/centers/<center_id>")]
async fn get_center_by_id(
    _token: AuthToken,
    center_id: CenterId,
    centers: Coll<VotingCenter>,
) -> Result<Json<CenterDescription>> {
    Ok(Json(get_center(&centers, center_id).await?.into()))
}

/// Update a center. Moving it to another election is refused once any of
/// its offices has recorded results, as those name the old election's candidates.
#[put("/centers/<center_id>", data = "<patch>", format = "json")]
async fn modify_center(
    _token: AuthToken,
    center_id: CenterId,
    patch: std::result::Result<Json<CenterPatch>, JsonError<'_>>,
    elections: Coll<Election>,
    centers: Coll<VotingCenter>,
    offices: Coll<VotingOffice>,
    results: Coll<VotingResult>,
) -> Result<Json<CenterDescription>> {
    let patch = parse_body(patch)?;
    let mut center = get_center(&centers, center_id).await?;
    if let Some(election_id) = patch.election_id.filter(|id| *id != center.election_id) {
        require_parent_election(&elections, election_id).await?;
        let office_ids: Vec<OfficeId> = offices
            .find(doc! { "center_id": center_id }, None)
            .await?
            .map_ok(|office| office.id)
            .try_collect()
            .await?;
        if results
            .count_documents(doc! { "office_id": { "$in": office_ids } }, None)
            .await?
            > 0
        {
            return Err(Error::Conflict(format!(
                "Center {center_id} has recorded results and cannot change election"
            )));
        }
    }
    patch.apply_to(&mut center);
    centers
        .replace_one(u32_id_filter(center_id), &center, None)
        .await?;
    Ok(Json(center.into()))
}

/// Delete an empty center.
#[delete("/centers/<center_id>")]
async fn delete_center(
    _token: AuthToken,
    center_id: CenterId,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<()> {
    let mut transaction = Transaction::begin(db_client).await?;
    let outcome = delete_empty(&mut transaction, db, center_id).await;
    transaction.finish(outcome).await
}

async fn delete_empty(session: &mut ClientSession, db: &Database, center_id: CenterId) -> Result<()> {
    let remaining = Coll::<VotingOffice>::from_db(db)
        .count_documents_with_session(doc! { "center_id": center_id }, None, session)
        .await?;
    if remaining > 0 {
        return Err(Error::Conflict(format!(
            "Center {center_id} still has {remaining} offices"
        )));
    }
    let deleted = Coll::<VotingCenter>::from_db(db)
        .delete_one_with_session(u32_id_filter(center_id), None, session)
        .await?;
    if deleted.deleted_count == 0 {
        return Err(Error::not_found(format!("Center with ID '{center_id}'")));
    }
    Ok(())
}

#[post("/centers/<center_id>/offices", data = "<spec>", format = "json")]
async fn create_office(
    _token: AuthToken,
    center_id: CenterId,
    spec: std::result::Result<Json<OfficeSpec>, JsonError<'_>>,
    centers: Coll<VotingCenter>,
    offices: Coll<VotingOffice>,
    counters: Coll<Counter>,
) -> Result<Json<OfficeDescription>> {
    let spec = parse_body(spec)?;
    get_center(&centers, center_id).await?;
    let id = Counter::next(&counters, OFFICE_ID_COUNTER_ID).await?;
    let office = spec.into_office(id, center_id);
    offices.insert_one(&office, None).await?;
    info!("Created office {id} '{}' in center {center_id}", office.name);
    Ok(Json(office.into()))
}

#[get("/centers/<center_id>/offices")]
async fn get_offices(
    _token: AuthToken,
    center_id: CenterId,
    centers: Coll<VotingCenter>,
    offices: Coll<VotingOffice>,
) -> Result<Json<Vec<OfficeDescription>>> {
    get_center(&centers, center_id).await?;
    let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let offices: Vec<VotingOffice> = offices
        .find(doc! { "center_id": center_id }, options)
        .await?
        .try_collect()
        .await?;
    Ok(Json(offices.into_iter().map(Into::into).collect()))
}

#[get("/offices/<office_id>")]
async fn get_office_by_id(
    _token: AuthToken,
    office_id: OfficeId,
    offices: Coll<VotingOffice>,
) -> Result<Json<OfficeDescription>> {
    Ok(Json(get_office(&offices, office_id).await?.into()))
}

/// Update an office's descriptive fields. Moving it into a center of another
/// election is refused once it has recorded results.
#[put("/offices/<office_id>", data = "<patch>", format = "json")]
async fn modify_office(
    _token: AuthToken,
    office_id: OfficeId,
    patch: std::result::Result<Json<OfficePatch>, JsonError<'_>>,
    centers: Coll<VotingCenter>,
    offices: Coll<VotingOffice>,
    results: Coll<VotingResult>,
) -> Result<Json<OfficeDescription>> {
    let patch = parse_body(patch)?;
    let office = get_office(&offices, office_id).await?;
    if let Some(center_id) = patch.center_id.filter(|id| *id != office.center_id) {
        let target = centers
            .find_one(u32_id_filter(center_id), None)
            .await?
            .ok_or_else(|| Error::Conflict(format!("No center with ID '{center_id}'")))?;
        let current = get_center(&centers, office.center_id).await?;
        if target.election_id != current.election_id
            && results
                .count_documents(doc! { "office_id": office_id }, None)
                .await?
                > 0
        {
            return Err(Error::Conflict(format!(
                "Office {office_id} has recorded results and cannot change election"
            )));
        }
    }
    // Only the patched fields are written; tallies are left alone.
    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let office = offices
        .find_one_and_update(
            u32_id_filter(office_id),
            doc! { "$set": patch.into_update() },
            options,
        )
        .await?
        .ok_or_else(|| Error::not_found(format!("Office with ID '{office_id}'")))?;
    Ok(Json(office.into()))
}

/// Delete an office together with its result rows.
#[delete("/offices/<office_id>")]
async fn delete_office(
    token: AuthToken,
    office_id: OfficeId,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<()> {
    let mut transaction = Transaction::begin(db_client).await?;
    let outcome = delete_with_results(&mut transaction, db, office_id).await;
    let removed = transaction.finish(outcome).await?;
    info!(
        "User {} deleted office {office_id} and {removed} result rows",
        token.user_id()
    );
    Ok(())
}

async fn delete_with_results(
    session: &mut ClientSession,
    db: &Database,
    office_id: OfficeId,
) -> Result<u64> {
    let deleted = Coll::<VotingOffice>::from_db(db)
        .delete_one_with_session(u32_id_filter(office_id), None, session)
        .await?;
    if deleted.deleted_count == 0 {
        return Err(Error::not_found(format!("Office with ID '{office_id}'")));
    }
    let removed = Coll::<VotingResult>::from_db(db)
        .delete_many_with_session(doc! { "office_id": office_id }, None, session)
        .await?;
    Ok(removed.deleted_count)
}
