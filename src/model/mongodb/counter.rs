use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Coll;

/// Counter IDs for every collection that uses auto-increment integer IDs.
pub const ELECTION_ID_COUNTER_ID: &str = "election_id";
pub const CANDIDATE_ID_COUNTER_ID: &str = "candidate_id";
pub const CENTER_ID_COUNTER_ID: &str = "center_id";
pub const OFFICE_ID_COUNTER_ID: &str = "office_id";

const ALL_COUNTERS: [&str; 4] = [
    ELECTION_ID_COUNTER_ID,
    CANDIDATE_ID_COUNTER_ID,
    CENTER_ID_COUNTER_ID,
    OFFICE_ID_COUNTER_ID,
];

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Create a new `Counter` starting at the given value.
    pub fn new(id: impl Into<String>, start: u32) -> Self {
        Self {
            id: id.into(),
            next: start,
        }
    }

    /// Atomically retrieve the next value of the counter with the given ID.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u32> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options: FindOneAndUpdateOptions = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(doc! { "_id": id }, update, options)
            .await?
            .ok_or_else(|| Error::not_found(format!("Counter '{id}'")))?;
        Ok(counter.next)
    }
}

/// Ensure every ID counter exists, starting at 1.
///
/// This operation is idempotent: existing counters are left untouched.
pub async fn ensure_id_counters_exist(counters: &Coll<Counter>) -> std::result::Result<(), DbError> {
    let upsert = UpdateOptions::builder().upsert(true).build();
    for id in ALL_COUNTERS {
        let update = doc! {
            "$setOnInsert": { "next": 1_u32 }
        };
        counters
            .update_one(doc! { "_id": id }, update, upsert.clone())
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use mongodb::Database;

    #[backend_test]
    async fn counter_increment(db: Database) {
        const START: u32 = 5;

        // Create a counter and insert it.
        let counter = Counter::new("test_counter", START);
        let counters = Coll::<Counter>::from_db(&db);
        counters.insert_one(counter, None).await.unwrap();

        // Get the next value.
        let next = Counter::next(&counters, "test_counter").await.unwrap();
        assert_eq!(next, START);

        // Check the counter was incremented.
        let counter = counters
            .find_one(doc! { "_id": "test_counter" }, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(counter.next, START + 1);
    }

    #[backend_test]
    async fn counters_bootstrapped(db: Database) {
        let counters = Coll::<Counter>::from_db(&db);

        // The launch fairing already created them; running again must not reset them.
        assert_eq!(Counter::next(&counters, ELECTION_ID_COUNTER_ID).await.unwrap(), 1);
        ensure_id_counters_exist(&counters).await.unwrap();
        assert_eq!(Counter::next(&counters, ELECTION_ID_COUNTER_ID).await.unwrap(), 2);
        assert_eq!(Counter::next(&counters, OFFICE_ID_COUNTER_ID).await.unwrap(), 1);
    }
}
