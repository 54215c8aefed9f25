use mongodb::{
    bson::{doc, Document},
    options::FindOptions,
    Client, ClientSession, Database,
};
use rocket::futures::TryStreamExt;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::model::{
    api::{
        candidate::CandidateDescription, center::CenterDescription, dump::ElectionDump,
        election::ElectionDescription, office::OfficeDescription, results::ElectionResults,
        tally::VotingResultDescription,
    },
    common::ElectionId,
    db::{
        candidate::Candidate, center::VotingCenter, election::Election, office::VotingOffice,
        result::VotingResult,
    },
    mongodb::{snapshot_session, u32_id_filter, Coll, MongoCollection},
};

use super::aggregate::aggregate;

/// Everything recorded under one election, as of a single point in time.
#[derive(Debug, Clone)]
pub struct ElectionSnapshot {
    pub election: ElectionDescription,
    pub candidates: Vec<CandidateDescription>,
    pub centers: Vec<CenterDescription>,
    pub offices: Vec<OfficeDescription>,
    pub results: Vec<VotingResultDescription>,
}

impl ElectionSnapshot {
    /// Read the whole election hierarchy from one snapshot session.
    pub async fn load(db_client: &Client, db: &Database, election_id: ElectionId) -> Result<Self> {
        let mut session = snapshot_session(db_client).await?;

        let election: Election = Coll::<Election>::from_db(db)
            .find_one_with_session(u32_id_filter(election_id), None, &mut session)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))?;

        let candidates: Vec<Candidate> =
            find_all(db, doc! { "election_id": election_id }, &mut session).await?;
        let centers: Vec<VotingCenter> =
            find_all(db, doc! { "election_id": election_id }, &mut session).await?;
        let center_ids: Vec<u32> = centers.iter().map(|center| center.id).collect();
        let offices: Vec<VotingOffice> =
            find_all(db, doc! { "center_id": { "$in": center_ids } }, &mut session).await?;
        let office_ids: Vec<u32> = offices.iter().map(|office| office.id).collect();
        let results: Vec<VotingResult> =
            find_all(db, doc! { "office_id": { "$in": office_ids } }, &mut session).await?;

        Ok(Self {
            election: election.into(),
            candidates: candidates.into_iter().map(Into::into).collect(),
            centers: centers.into_iter().map(Into::into).collect(),
            offices: offices.into_iter().map(Into::into).collect(),
            results: results.into_iter().map(Into::into).collect(),
        })
    }

    pub fn aggregate(&self) -> ElectionResults {
        aggregate(
            self.election.clone(),
            &self.centers,
            &self.offices,
            &self.results,
        )
    }

    /// Bundle the snapshot with its aggregate, for offline checking.
    pub fn into_dump(self) -> ElectionDump {
        let aggregate = self.aggregate();
        ElectionDump {
            election: self.election,
            candidates: self.candidates,
            centers: self.centers,
            offices: self.offices,
            results: self.results,
            aggregate,
        }
    }
}

/// All documents of a collection matching `filter`, in ID order.
async fn find_all<T>(db: &Database, filter: Document, session: &mut ClientSession) -> Result<Vec<T>>
where
    T: MongoCollection + DeserializeOwned + Unpin + Send + Sync,
{
    let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    Ok(Coll::<T>::from_db(db)
        .find_with_session(filter, options, session)
        .await?
        .stream(session)
        .try_collect()
        .await?)
}
