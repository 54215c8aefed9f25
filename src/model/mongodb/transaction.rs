use std::ops::{Deref, DerefMut};

use log::warn;
use mongodb::{
    options::{Acknowledgment, ReadConcern, SessionOptions, TransactionOptions, WriteConcern},
    Client, ClientSession,
};

use crate::error::Result;

/// An explicit unit of work: one multi-document transaction, finished
/// exactly once by [`Transaction::finish`].
///
/// Dropping an unfinished transaction aborts it on the server.
pub struct Transaction {
    session: ClientSession,
}

impl Transaction {
    /// Open a session and start a transaction on it.
    pub async fn begin(client: &Client) -> Result<Self> {
        let mut session = client.start_session(None).await?;
        let options = TransactionOptions::builder()
            .read_concern(ReadConcern::snapshot())
            .write_concern(WriteConcern::builder().w(Acknowledgment::Majority).build())
            .build();
        session.start_transaction(options).await?;
        Ok(Self { session })
    }

    /// Commit if the work succeeded, abort otherwise, and hand back the outcome.
    /// A failed commit turns a successful outcome into an error.
    pub async fn finish<T>(mut self, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.session.commit_transaction().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(abort_err) = self.session.abort_transaction().await {
                    warn!("Failed to abort transaction after error ({err}): {abort_err}");
                }
                Err(err)
            }
        }
    }
}

impl Deref for Transaction {
    type Target = ClientSession;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl DerefMut for Transaction {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

/// Open a session that reads from a single consistent snapshot.
pub async fn snapshot_session(client: &Client) -> Result<ClientSession> {
    let options = SessionOptions::builder().snapshot(true).build();
    Ok(client.start_session(Some(options)).await?)
}
