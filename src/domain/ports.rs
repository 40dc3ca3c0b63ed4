use crate::domain::model::{Record, Revision};
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetches the record for `id`. Not-found yields an empty canonical
    /// record and no revision; any other failure is a read error.
    async fn fetch(&self, id: &str) -> Result<(Record, Option<Revision>)>;

    /// Writes `record` for `id`, conditioned on `base` when present.
    /// Returns the location URL of the written file. A stale `base` yields
    /// a write-conflict error when the backend rejects it.
    async fn commit(
        &self,
        id: &str,
        record: &Record,
        base: Option<&Revision>,
        commit_message: &str,
    ) -> Result<String>;
}
