use mongodb::{bson::doc, options::FindOptions, Client, Database};
use rocket::{
    futures::TryStreamExt,
    serde::json::{Error as JsonError, Json},
    Route, State,
};

use crate::{
    error::Result,
    model::{
        api::{
            dump::ElectionDump,
            office::{OfficeDescription, OfficeResults},
            results::{ElectionResults, ElectionTotals},
            tally::{ResultSubmission, SubmissionStatusUpdate},
        },
        auth::AuthToken,
        common::{ElectionId, OfficeId},
        db::{office::VotingOffice, result::VotingResult},
        mongodb::Coll,
    },
    tally::{
        realtime::realtime_totals,
        snapshot::ElectionSnapshot,
        submission::{change_status, submit, SubmissionPolicy},
    },
};

use super::common::{get_office, parse_body};

pub fn routes() -> Vec<Route> {
    routes![
        submit_results,
        update_results,
        get_office_results,
        set_results_status,
        get_election_results,
        get_realtime_results,
        get_election_dump,
    ]
}

/// Record an office's complete tallies, replacing whatever was there.
#[post("/offices/<office_id>/results", data = "<submission>", format = "json")]
async fn submit_results(
    token: AuthToken,
    office_id: OfficeId,
    submission: std::result::Result<Json<ResultSubmission>, JsonError<'_>>,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<Json<OfficeResults>> {
    let submission = parse_body(submission)?;
    let results = submit(
        db_client,
        db,
        SubmissionPolicy::Replace,
        office_id,
        &submission,
        token.user_id(),
    )
    .await?;
    Ok(Json(results))
}

/// Correct some of an office's tallies, keeping the rest.
#[put("/offices/<office_id>/results", data = "<submission>", format = "json")]
async fn update_results(
    token: AuthToken,
    office_id: OfficeId,
    submission: std::result::Result<Json<ResultSubmission>, JsonError<'_>>,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<Json<OfficeResults>> {
    let submission = parse_body(submission)?;
    let results = submit(
        db_client,
        db,
        SubmissionPolicy::Merge,
        office_id,
        &submission,
        token.user_id(),
    )
    .await?;
    Ok(Json(results))
}

#[get("/offices/<office_id>/results")]
async fn get_office_results(
    _token: AuthToken,
    office_id: OfficeId,
    offices: Coll<VotingOffice>,
    results: Coll<VotingResult>,
) -> Result<Json<OfficeResults>> {
    let office = get_office(&offices, office_id).await?;
    let options = FindOptions::builder()
        .sort(doc! { "candidate_id": 1 })
        .build();
    let rows: Vec<VotingResult> = results
        .find(doc! { "office_id": office_id }, options)
        .await?
        .try_collect()
        .await?;
    Ok(Json(OfficeResults {
        office: office.into(),
        results: rows.into_iter().map(Into::into).collect(),
    }))
}

#[put("/offices/<office_id>/results/status", data = "<update>", format = "json")]
async fn set_results_status(
    _token: AuthToken,
    office_id: OfficeId,
    update: std::result::Result<Json<SubmissionStatusUpdate>, JsonError<'_>>,
    offices: Coll<VotingOffice>,
) -> Result<Json<OfficeDescription>> {
    let update = parse_body(update)?;
    Ok(Json(change_status(&offices, office_id, update).await?))
}

#[get("/elections/<election_id>/results")]
async fn get_election_results(
    _token: AuthToken,
    election_id: ElectionId,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<Json<ElectionResults>> {
    let snapshot = ElectionSnapshot::load(db_client, db, election_id).await?;
    Ok(Json(snapshot.aggregate()))
}

#[get("/elections/<election_id>/results/realtime")]
async fn get_realtime_results(
    _token: AuthToken,
    election_id: ElectionId,
    db: &State<Database>,
) -> Result<Json<ElectionTotals>> {
    Ok(Json(realtime_totals(db, election_id).await?))
}

#[get("/elections/<election_id>/dump")]
async fn get_election_dump(
    _token: AuthToken,
    election_id: ElectionId,
    db_client: &State<Client>,
    db: &State<Database>,
) -> Result<Json<ElectionDump>> {
    let snapshot = ElectionSnapshot::load(db_client, db, election_id).await?;
    Ok(Json(snapshot.into_dump()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::serde_json::{self, json},
    };

    use crate::auth_header;
    use crate::model::{
        api::{
            candidate::CandidateSpec, center::CenterSpec, election::ElectionSpec,
            office::OfficeSpec,
        },
        common::office::SubmissionStatus,
        db::{candidate::Candidate, center::VotingCenter, election::Election},
    };
    use crate::tally::aggregate::recompute;

    use super::*;

    /// Election 1 with candidates 1 and 2, center 1 holding offices 1 and 2,
    /// and election 2 with candidate 3.
    async fn populate(
        elections: &Coll<Election>,
        candidates: &Coll<Candidate>,
        centers: &Coll<VotingCenter>,
        offices: &Coll<VotingOffice>,
    ) {
        elections
            .insert_many(
                vec![
                    ElectionSpec::example().into_election(1, 1),
                    ElectionSpec::example().into_election(2, 1),
                ],
                None,
            )
            .await
            .unwrap();
        candidates
            .insert_many(
                vec![
                    CandidateSpec::example1().into_candidate(1, 1, 1),
                    CandidateSpec::example2().into_candidate(2, 1, 1),
                    CandidateSpec::example1().into_candidate(3, 2, 1),
                ],
                None,
            )
            .await
            .unwrap();
        centers
            .insert_one(CenterSpec::example1().into_center(1, 1), None)
            .await
            .unwrap();
        offices
            .insert_many(
                vec![
                    OfficeSpec::example1().into_office(1, 1),
                    OfficeSpec::example2().into_office(2, 1),
                ],
                None,
            )
            .await
            .unwrap();
    }

    async fn post(
        client: &Client,
        office_id: OfficeId,
        body: serde_json::Value,
    ) -> LocalResponse<'_> {
        client
            .post(uri!(submit_results(office_id)))
            .header(ContentType::JSON)
            .header(auth_header(client, 7))
            .body(body.to_string())
            .dispatch()
            .await
    }

    async fn put(
        client: &Client,
        office_id: OfficeId,
        body: serde_json::Value,
    ) -> LocalResponse<'_> {
        client
            .put(uri!(update_results(office_id)))
            .header(ContentType::JSON)
            .header(auth_header(client, 7))
            .body(body.to_string())
            .dispatch()
            .await
    }

    async fn set_status(client: &Client, status: &str) -> Status {
        client
            .put(uri!(set_results_status(1)))
            .header(ContentType::JSON)
            .header(auth_header(client, 3))
            .body(json!({ "status": status }).to_string())
            .dispatch()
            .await
            .status()
    }

    fn votes(results: &OfficeResults) -> BTreeMap<u32, u32> {
        results
            .results
            .iter()
            .map(|row| (row.candidate_id, row.votes))
            .collect()
    }

    #[backend_test]
    async fn replace_then_merge(
        client: Client,
        elections: Coll<Election>,
        candidates: Coll<Candidate>,
        centers: Coll<VotingCenter>,
        offices: Coll<VotingOffice>,
    ) {
        populate(&elections, &candidates, &centers, &offices).await;

        let response = post(
            &client,
            1,
            json!({
                "total_voters": 100,
                "blank_votes": 5,
                "results": [
                    {"candidate_id": 1, "votes": 50},
                    {"candidate_id": 2, "votes": 45},
                ],
            }),
        )
        .await;
        assert_eq!(Status::Ok, response.status());
        let recorded: OfficeResults = response.into_json().await.unwrap();
        assert_eq!(votes(&recorded), BTreeMap::from([(1, 50), (2, 45)]));
        assert_eq!(recorded.office.total_voters, Some(100));
        assert_eq!(recorded.office.null_votes, Some(0));
        assert_eq!(recorded.office.submission_status, SubmissionStatus::Submitted);
        assert_eq!(recorded.office.submitted_by, Some(7));
        assert!(recorded.office.submitted_at.is_some());

        // Merge keeps candidate 1 and the counters left out.
        let response = put(
            &client,
            1,
            json!({"null_votes": 2, "results": [{"candidate_id": 2, "votes": 43}]}),
        )
        .await;
        assert_eq!(Status::Ok, response.status());
        let merged: OfficeResults = response.into_json().await.unwrap();
        assert_eq!(votes(&merged), BTreeMap::from([(1, 50), (2, 43)]));
        assert_eq!(merged.office.total_voters, Some(100));
        assert_eq!(merged.office.blank_votes, Some(5));
        assert_eq!(merged.office.null_votes, Some(2));

        // Replace leaves exactly the submitted set.
        let response = post(&client, 1, json!({"results": [{"candidate_id": 2, "votes": 1}]})).await;
        let replaced: OfficeResults = response.into_json().await.unwrap();
        assert_eq!(votes(&replaced), BTreeMap::from([(2, 1)]));
        assert_eq!(replaced.office.total_voters, Some(0));

        let response = client
            .get(uri!(get_office_results(1)))
            .header(auth_header(&client, 7))
            .dispatch()
            .await;
        let fetched: OfficeResults = response.into_json().await.unwrap();
        assert_eq!(fetched, replaced);
    }

    #[backend_test]
    async fn rejected_submissions(
        client: Client,
        elections: Coll<Election>,
        candidates: Coll<Candidate>,
        centers: Coll<VotingCenter>,
        offices: Coll<VotingOffice>,
        results: Coll<VotingResult>,
    ) {
        populate(&elections, &candidates, &centers, &offices).await;

        // Unknown office.
        let response = post(&client, 99, json!({"total_voters": 1})).await;
        assert_eq!(Status::NotFound, response.status());

        // Candidate of another election.
        let response = post(
            &client,
            1,
            json!({
                "total_voters": 10,
                "results": [{"candidate_id": 1, "votes": 4}, {"candidate_id": 3, "votes": 6}],
            }),
        )
        .await;
        assert_eq!(Status::Conflict, response.status());

        // Same candidate twice.
        let response = put(
            &client,
            1,
            json!({"results": [{"candidate_id": 1, "votes": 4}, {"candidate_id": 1, "votes": 6}]}),
        )
        .await;
        assert_eq!(Status::UnprocessableEntity, response.status());
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert!(body["errors"]["results"].is_array());

        // Negative count.
        let response = post(&client, 1, json!({"total_voters": -4})).await;
        assert_eq!(Status::UnprocessableEntity, response.status());

        // Nothing was written, not even the counters.
        assert_eq!(results.count_documents(None, None).await.unwrap(), 0);
        let office = offices.find_one(doc! { "_id": 1 }, None).await.unwrap().unwrap();
        assert_eq!(office.tally.total_voters, None);
        assert_eq!(office.tally.submission_status, SubmissionStatus::Draft);
    }

    #[backend_test]
    async fn review_workflow(
        client: Client,
        elections: Coll<Election>,
        candidates: Coll<Candidate>,
        centers: Coll<VotingCenter>,
        offices: Coll<VotingOffice>,
    ) {
        populate(&elections, &candidates, &centers, &offices).await;

        // Nothing submitted yet.
        assert_eq!(Status::Conflict, set_status(&client, "validated").await);

        post(&client, 1, json!({"total_voters": 12})).await;
        let response = client
            .put(uri!(set_results_status(1)))
            .header(ContentType::JSON)
            .header(auth_header(&client, 3))
            .body(json!({"status": "rejected", "remarks": "recount"}).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let office: OfficeDescription = response.into_json().await.unwrap();
        assert_eq!(office.submission_status, SubmissionStatus::Rejected);
        assert_eq!(office.remarks.as_deref(), Some("recount"));

        // Resubmitting puts it back up for review.
        let response = put(&client, 1, json!({"total_voters": 13})).await;
        let recorded: OfficeResults = response.into_json().await.unwrap();
        assert_eq!(recorded.office.submission_status, SubmissionStatus::Submitted);
        assert_eq!(Status::Ok, set_status(&client, "validated").await);
    }

    #[backend_test]
    async fn aggregates(
        client: Client,
        elections: Coll<Election>,
        candidates: Coll<Candidate>,
        centers: Coll<VotingCenter>,
        offices: Coll<VotingOffice>,
    ) {
        populate(&elections, &candidates, &centers, &offices).await;
        post(
            &client,
            1,
            json!({
                "total_voters": 100,
                "blank_votes": 1,
                "results": [{"candidate_id": 1, "votes": 50}, {"candidate_id": 2, "votes": 42}],
            }),
        )
        .await;
        post(
            &client,
            2,
            json!({
                "total_voters": 80,
                "null_votes": 3,
                "results": [{"candidate_id": 1, "votes": 30}, {"candidate_id": 2, "votes": 38}],
            }),
        )
        .await;

        let response = client
            .get(uri!(get_election_results(1)))
            .header(auth_header(&client, 1))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let full: ElectionResults = response.into_json().await.unwrap();
        assert_eq!(full.total_voters, 180);
        assert_eq!(full.blank_votes, 1);
        assert_eq!(full.null_votes, 3);
        assert_eq!(full.candidate_results, BTreeMap::from([(1, 80), (2, 80)]));
        assert_eq!(full.centers.len(), 1);
        assert_eq!(full.centers[0].subtotals.total_voters, 180);

        let response = client
            .get(uri!(get_realtime_results(1)))
            .header(auth_header(&client, 1))
            .dispatch()
            .await;
        let realtime: ElectionTotals = response.into_json().await.unwrap();
        assert_eq!(realtime, full.totals());

        // The other election has no centers.
        let response = client
            .get(uri!(get_election_results(2)))
            .header(auth_header(&client, 1))
            .dispatch()
            .await;
        let empty: ElectionResults = response.into_json().await.unwrap();
        assert_eq!(empty.total_voters, 0);
        assert!(empty.candidate_results.is_empty());
        let response = client
            .get(uri!(get_realtime_results(2)))
            .header(auth_header(&client, 1))
            .dispatch()
            .await;
        assert_eq!(response.into_json::<ElectionTotals>().await.unwrap(), ElectionTotals::default());

        let response = client
            .get(uri!(get_election_results(9)))
            .header(auth_header(&client, 1))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
        let response = client
            .get(uri!(get_realtime_results(9)))
            .header(auth_header(&client, 1))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn dump_is_self_consistent(
        client: Client,
        elections: Coll<Election>,
        candidates: Coll<Candidate>,
        centers: Coll<VotingCenter>,
        offices: Coll<VotingOffice>,
    ) {
        populate(&elections, &candidates, &centers, &offices).await;
        post(
            &client,
            2,
            json!({"total_voters": 20, "results": [{"candidate_id": 2, "votes": 19}]}),
        )
        .await;

        let response = client
            .get(uri!(get_election_dump(1)))
            .header(auth_header(&client, 1))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let dump: ElectionDump = response.into_json().await.unwrap();
        assert_eq!(dump.candidates.len(), 2);
        assert_eq!(dump.offices.len(), 2);
        assert_eq!(dump.results.len(), 1);
        assert_eq!(recompute(&dump), dump.aggregate);
    }
}
