use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    candidate::Candidate,
    center::VotingCenter,
    election::Election,
    office::VotingOffice,
    result::{NewVotingResult, VotingResult},
};

use super::counter::Counter;

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// Election collection
const ELECTIONS: &str = "elections";
impl MongoCollection for Election {
    const NAME: &'static str = ELECTIONS;
}

// Candidate collection
const CANDIDATES: &str = "candidates";
impl MongoCollection for Candidate {
    const NAME: &'static str = CANDIDATES;
}

// Voting center collection
const CENTERS: &str = "voting_centers";
impl MongoCollection for VotingCenter {
    const NAME: &'static str = CENTERS;
}

// Voting office collection
const OFFICES: &str = "voting_offices";
impl MongoCollection for VotingOffice {
    const NAME: &'static str = OFFICES;
}

// Voting result collections
const RESULTS: &str = "voting_results";
impl MongoCollection for VotingResult {
    const NAME: &'static str = RESULTS;
}
impl MongoCollection for NewVotingResult {
    const NAME: &'static str = RESULTS;
}

// Counter collection
const COUNTERS: &str = "counters";
impl MongoCollection for Counter {
    const NAME: &'static str = COUNTERS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Candidate collection.
    let candidate_index = IndexModel::builder()
        .keys(doc! {"election_id": 1})
        .build();
    Coll::<Candidate>::from_db(db)
        .create_index(candidate_index, None)
        .await?;

    // Voting center collection: names are unique within an election.
    let center_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "name": 1})
        .options(unique.clone())
        .build();
    Coll::<VotingCenter>::from_db(db)
        .create_index(center_index, None)
        .await?;

    // Voting office collection: names are unique within a center.
    let office_index = IndexModel::builder()
        .keys(doc! {"center_id": 1, "name": 1})
        .options(unique.clone())
        .build();
    Coll::<VotingOffice>::from_db(db)
        .create_index(office_index, None)
        .await?;

    // Voting result collection: one row per candidate per office.
    let result_index = IndexModel::builder()
        .keys(doc! {"office_id": 1, "candidate_id": 1})
        .options(unique)
        .build();
    Coll::<VotingResult>::from_db(db)
        .create_index(result_index, None)
        .await?;

    Ok(())
}
