use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{debug, info};
use sea_orm::sea_query::{
    Alias, Expr, Func, Iden, MysqlQueryBuilder, Order, PostgresQueryBuilder, Query,
    QueryStatementWriter, SqliteQueryBuilder,
};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection,
    DatabaseTransaction, QueryResult, Statement, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;

use vento_core::{
    enumerate_signals, plan_reconcile, prepare_facts, AggregationOp, BootstrapOutcome,
    FactQuery, FactRange, FactReadApi, FactRow, FactWriteApi, FieldSet, ReconcileOutcome,
    ResolvedRow, Signal, SignalDimensionApi, SignalId, StoredFact, VentoError, VentoResult,
    WriteReport,
};

use crate::db::*;
use crate::migration::Migrator;
use crate::{DatabaseConfig, VentoConfig};

/// Rows per multi-row INSERT statement.
const INSERT_CHUNK_ROWS: usize = 1_000;

/// Handle on the dimension and fact tables.
///
/// Construct one per pipeline run and pass it in; the pool is released
/// when the handle is dropped or [`SignalStore::close`] is awaited.
#[derive(Clone)]
pub struct SignalStore {
    conn: DatabaseConnection,
}

impl SignalStore {
    pub async fn connect(config: &VentoConfig, base_dir: &Path) -> VentoResult<Self> {
        let url = build_connection_url(config, base_dir)?;
        let mut options = ConnectOptions::new(url);
        options.sqlx_logging(false);
        if let Some(pool) = &config.pool {
            if let Some(max) = pool.max_connections {
                options.max_connections(max);
            }
            if let Some(min) = pool.min_connections {
                options.min_connections(min);
            }
            if let Some(timeout_ms) = pool.connect_timeout_ms {
                options.connect_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.acquire_timeout_ms {
                options.acquire_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.idle_timeout_ms {
                options.idle_timeout(Duration::from_millis(timeout_ms));
            }
        }
        let backend = config.backend_name();
        let conn = Database::connect(options)
            .await
            .map_err(|err| VentoError::storage(format!("connect to {backend} store: {err}")))?;
        let store = Self { conn };
        Migrator::up(&store.conn, None).await.map_err(|err| {
            VentoError::storage(format!("migrate signal and fact tables on {backend}: {err}"))
        })?;
        info!("store: connected to {backend} backend");
        Ok(store)
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub async fn close(self) -> VentoResult<()> {
        self.conn.close().await.map_err(VentoError::from)
    }

    async fn insert_signals(&self, tx: &DatabaseTransaction, signals: &[Signal]) -> VentoResult<()> {
        if signals.is_empty() {
            return Ok(());
        }
        let mut insert = Query::insert()
            .into_table(DimSignal::Table)
            .columns([DimSignal::Id, DimSignal::Name, DimSignal::Operation])
            .to_owned();
        for signal in signals {
            insert.values_panic([
                signal.id.into(),
                signal.name.clone().into(),
                signal.operation.clone().into(),
            ]);
        }
        exec(tx, &insert).await?;
        Ok(())
    }

    async fn insert_facts(&self, tx: &DatabaseTransaction, facts: &[FactRow]) -> VentoResult<()> {
        for chunk in facts.chunks(INSERT_CHUNK_ROWS) {
            let mut insert = Query::insert()
                .into_table(FactData::Table)
                .columns([FactData::SignalId, FactData::Timestamp, FactData::Value])
                .to_owned();
            for fact in chunk {
                insert.values_panic([
                    fact.signal_id.into(),
                    fact.timestamp.into(),
                    fact.value.into(),
                ]);
            }
            exec(tx, &insert).await?;
        }
        Ok(())
    }

    async fn delete_facts_in_range(
        &self,
        tx: &DatabaseTransaction,
        range: FactRange,
        signal_ids: &[SignalId],
    ) -> VentoResult<u64> {
        if signal_ids.is_empty() {
            return Ok(0);
        }
        let delete = Query::delete()
            .from_table(FactData::Table)
            .and_where(Expr::col(FactData::SignalId).is_in(signal_ids.iter().copied()))
            .and_where(Expr::col(FactData::Timestamp).gte(range.first))
            .and_where(Expr::col(FactData::Timestamp).lte(range.last))
            .to_owned();
        exec_count(tx, &delete).await
    }

    /// Insert `facts` in one transaction, optionally clearing a range first.
    async fn write_facts(
        &self,
        replace: Option<(FactRange, Vec<SignalId>)>,
        facts: &[FactRow],
    ) -> VentoResult<u64> {
        let tx = self.conn.begin().await?;
        let mut replaced = 0;
        if let Some((range, signal_ids)) = replace {
            replaced = self.delete_facts_in_range(&tx, range, &signal_ids).await?;
        }
        self.insert_facts(&tx, facts).await?;
        tx.commit().await?;
        Ok(replaced)
    }
}

#[async_trait]
impl SignalDimensionApi for SignalStore {
    async fn list_signals(&self) -> VentoResult<Vec<Signal>> {
        list_signals_in(&self.conn).await
    }

    async fn count_signals(&self) -> VentoResult<u64> {
        count_rows(&self.conn, DimSignal::Table, DimSignal::Id).await
    }

    async fn bootstrap_signals(
        &self,
        fields: &FieldSet,
        operations: &[AggregationOp],
    ) -> VentoResult<BootstrapOutcome> {
        let tx = self.conn.begin().await?;
        let existing = count_rows(&tx, DimSignal::Table, DimSignal::Id).await?;
        if existing > 0 {
            info!("store: signal table holds {existing} rows; bootstrap skipped");
            return Ok(BootstrapOutcome::Skipped {
                existing: existing as usize,
            });
        }
        let signals = enumerate_signals(fields, operations);
        self.insert_signals(&tx, &signals).await?;
        tx.commit().await?;
        info!("store: signal table populated with {} rows", signals.len());
        Ok(BootstrapOutcome::Populated {
            inserted: signals.len(),
        })
    }

    async fn reconcile_signals(
        &self,
        fields: &FieldSet,
        operations: &[AggregationOp],
    ) -> VentoResult<ReconcileOutcome> {
        let tx = self.conn.begin().await?;
        let existing = list_signals_in(&tx).await?;
        let missing = plan_reconcile(&existing, fields, operations);
        self.insert_signals(&tx, &missing).await?;
        tx.commit().await?;
        for signal in &missing {
            info!(
                "store: registered signal {} ({}, {})",
                signal.id, signal.name, signal.operation
            );
        }
        Ok(ReconcileOutcome {
            inserted: missing,
            existing: existing.len(),
        })
    }

    async fn delete_signal(&self, id: SignalId) -> VentoResult<bool> {
        let delete = Query::delete()
            .from_table(DimSignal::Table)
            .and_where(Expr::col(DimSignal::Id).eq(id))
            .to_owned();
        let affected = exec_count(&self.conn, &delete).await?;
        Ok(affected > 0)
    }
}

#[async_trait]
impl FactWriteApi for SignalStore {
    async fn append_facts(&self, rows: &[ResolvedRow]) -> VentoResult<WriteReport> {
        let (facts, skipped_missing) = prepare_facts(rows);
        self.write_facts(None, &facts).await.map_err(write_failure)?;
        debug!(
            "store: appended {} facts, skipped {} without value",
            facts.len(),
            skipped_missing
        );
        Ok(WriteReport {
            inserted: facts.len(),
            skipped_missing,
            replaced: 0,
        })
    }

    async fn replace_facts(
        &self,
        range: FactRange,
        rows: &[ResolvedRow],
    ) -> VentoResult<WriteReport> {
        let signal_ids: Vec<SignalId> = rows
            .iter()
            .map(|row| row.signal_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let (facts, skipped_missing) = prepare_facts(rows);
        let replaced = self
            .write_facts(Some((range, signal_ids)), &facts)
            .await
            .map_err(write_failure)?;
        debug!(
            "store: replaced {} facts in [{}, {}] with {}",
            replaced,
            range.first,
            range.last,
            facts.len()
        );
        Ok(WriteReport {
            inserted: facts.len(),
            skipped_missing,
            replaced,
        })
    }
}

#[async_trait]
impl FactReadApi for SignalStore {
    async fn count_facts(&self) -> VentoResult<u64> {
        count_rows(&self.conn, FactData::Table, FactData::Id).await
    }

    async fn count_facts_by_signal(&self) -> VentoResult<Vec<(SignalId, u64)>> {
        let select = Query::select()
            .column(FactData::SignalId)
            .expr_as(Func::count(Expr::col(FactData::Id)), Alias::new("count"))
            .from(FactData::Table)
            .group_by_col(FactData::SignalId)
            .order_by(FactData::SignalId, Order::Asc)
            .to_owned();
        let rows = query_all(&self.conn, &select).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let signal_id: SignalId = row.try_get("", &col_name(FactData::SignalId))?;
            let count: i64 = row.try_get("", "count")?;
            out.push((signal_id, count.max(0) as u64));
        }
        Ok(out)
    }

    async fn list_facts(&self, query: FactQuery) -> VentoResult<Vec<StoredFact>> {
        let mut select = Query::select()
            .columns([
                FactData::Id,
                FactData::SignalId,
                FactData::Timestamp,
                FactData::Value,
            ])
            .from(FactData::Table)
            .order_by(FactData::Id, Order::Asc)
            .to_owned();
        if let Some(signal_id) = query.signal_id {
            select.and_where(Expr::col(FactData::SignalId).eq(signal_id));
        }
        if let Some(from) = query.from {
            select.and_where(Expr::col(FactData::Timestamp).gte(from));
        }
        if let Some(to) = query.to {
            select.and_where(Expr::col(FactData::Timestamp).lt(to));
        }
        if let Some(limit) = query.limit {
            select.limit(limit);
        }
        let rows = query_all(&self.conn, &select).await?;
        rows.iter().map(read_fact).collect()
    }
}

fn read_fact(row: &QueryResult) -> VentoResult<StoredFact> {
    Ok(StoredFact {
        id: row.try_get("", &col_name(FactData::Id))?,
        signal_id: row.try_get("", &col_name(FactData::SignalId))?,
        timestamp: row.try_get::<NaiveDateTime>("", &col_name(FactData::Timestamp))?,
        value: row.try_get("", &col_name(FactData::Value))?,
    })
}

async fn list_signals_in<C: ConnectionTrait>(conn: &C) -> VentoResult<Vec<Signal>> {
    let select = Query::select()
        .columns([DimSignal::Id, DimSignal::Name, DimSignal::Operation])
        .from(DimSignal::Table)
        .order_by(DimSignal::Id, Order::Asc)
        .to_owned();
    let rows = query_all(conn, &select).await?;
    let mut signals = Vec::with_capacity(rows.len());
    for row in rows {
        signals.push(Signal {
            id: row.try_get("", &col_name(DimSignal::Id))?,
            name: row.try_get("", &col_name(DimSignal::Name))?,
            operation: row.try_get("", &col_name(DimSignal::Operation))?,
        });
    }
    Ok(signals)
}

async fn count_rows<C, T, K>(conn: &C, table: T, column: K) -> VentoResult<u64>
where
    C: ConnectionTrait,
    T: Iden + 'static,
    K: Iden + 'static,
{
    let select = Query::select()
        .expr_as(Func::count(Expr::col(column)), Alias::new("count"))
        .from(table)
        .to_owned();
    let count: i64 = match query_one(conn, &select).await? {
        Some(row) => row.try_get("", "count")?,
        None => 0,
    };
    Ok(count.max(0) as u64)
}

/// A failed fact write is reported as such, whatever layer raised it.
fn write_failure(err: VentoError) -> VentoError {
    match err {
        VentoError::Storage { message } => VentoError::write(message),
        other => other,
    }
}

fn col_name(column: impl Iden) -> String {
    column.to_string()
}

fn build_stmt<S: QueryStatementWriter>(
    backend: DatabaseBackend,
    stmt: &S,
) -> (String, sea_orm::sea_query::Values) {
    match backend {
        DatabaseBackend::Sqlite => stmt.build(SqliteQueryBuilder),
        DatabaseBackend::Postgres => stmt.build(PostgresQueryBuilder),
        DatabaseBackend::MySql => stmt.build(MysqlQueryBuilder),
    }
}

async fn exec<C, S>(conn: &C, stmt: &S) -> VentoResult<()>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    exec_count(conn, stmt).await.map(|_| ())
}

async fn exec_count<C, S>(conn: &C, stmt: &S) -> VentoResult<u64>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let result = conn
        .execute(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(result.rows_affected())
}

async fn query_all<C, S>(conn: &C, stmt: &S) -> VentoResult<Vec<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let rows = conn
        .query_all(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(rows)
}

async fn query_one<C, S>(conn: &C, stmt: &S) -> VentoResult<Option<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let row = conn
        .query_one(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(row)
}

fn build_connection_url(config: &VentoConfig, base_dir: &Path) -> VentoResult<String> {
    match &config.database {
        DatabaseConfig::Sqlite { .. } => {
            let path = config.sqlite_path(base_dir)?;
            Ok(format!("sqlite://{}?mode=rwc", path.display()))
        }
        DatabaseConfig::Postgres { url } => Ok(url.clone()),
        DatabaseConfig::Mysql { url } => Ok(url.clone()),
    }
}
