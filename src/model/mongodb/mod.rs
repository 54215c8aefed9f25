mod bson;
mod collection;
mod counter;
mod errors;
mod transaction;

pub use bson::{u32_id_filter, Id};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{
    ensure_id_counters_exist, Counter, CANDIDATE_ID_COUNTER_ID, CENTER_ID_COUNTER_ID,
    ELECTION_ID_COUNTER_ID, OFFICE_ID_COUNTER_ID,
};
pub use errors::is_duplicate_key_error;
pub use transaction::{snapshot_session, Transaction};
