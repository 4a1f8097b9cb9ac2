use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    AggregationOp, BootstrapOutcome, FactQuery, FactRange, FieldSet, RawRecord, ReconcileOutcome,
    ResolvedRow, Signal, SignalId, StoredFact, VentoResult, WriteReport,
};

#[async_trait]
pub trait SignalDimensionApi: Send + Sync {
    async fn list_signals(&self) -> VentoResult<Vec<Signal>>;

    async fn count_signals(&self) -> VentoResult<u64>;

    /// Populate an empty dimension; a non-empty one is left untouched.
    async fn bootstrap_signals(
        &self,
        fields: &FieldSet,
        operations: &[AggregationOp],
    ) -> VentoResult<BootstrapOutcome>;

    /// Insert configured pairs that are missing, keeping existing ids.
    async fn reconcile_signals(
        &self,
        fields: &FieldSet,
        operations: &[AggregationOp],
    ) -> VentoResult<ReconcileOutcome>;

    /// Delete one signal together with its facts. Returns false if absent.
    async fn delete_signal(&self, id: SignalId) -> VentoResult<bool>;
}

#[async_trait]
pub trait FactWriteApi: Send + Sync {
    /// Append resolved rows in one transaction; rows without a value are skipped.
    async fn append_facts(&self, rows: &[ResolvedRow]) -> VentoResult<WriteReport>;

    /// Delete facts of the rows' signals inside `range`, then append, atomically.
    async fn replace_facts(&self, range: FactRange, rows: &[ResolvedRow])
        -> VentoResult<WriteReport>;
}

#[async_trait]
pub trait FactReadApi: Send + Sync {
    async fn count_facts(&self) -> VentoResult<u64>;

    async fn count_facts_by_signal(&self) -> VentoResult<Vec<(SignalId, u64)>>;

    /// Facts in insertion order (ascending surrogate id).
    async fn list_facts(&self, query: FactQuery) -> VentoResult<Vec<StoredFact>>;
}

#[async_trait]
pub trait SourceApi: Send + Sync {
    fn name(&self) -> &str;

    /// Raw records of one calendar day projected onto `fields`.
    ///
    /// An empty result is an `EmptyDataset` error, never an empty vector.
    async fn fetch_day(&self, date: NaiveDate, fields: &FieldSet) -> VentoResult<Vec<RawRecord>>;
}
