//! Execution adapter.
//!
//! A built [`Stmt`] is run through an [`Executor`]: anything that can send
//! SQL text plus a flat argument list to a database. Implementations are
//! provided for `tokio_postgres` clients and transactions, and for
//! `deadpool_postgres` clients with the `pool` feature.
//!
//! Row-returning operations scan each row into the statement's destinations
//! (see [`Stmt::to`] and [`Stmt::bind`]) before handing the row to the
//! caller's callback.

use crate::error::{SqlError, SqlResult};
use crate::stmt::Stmt;
use crate::value::Value;
use std::borrow::Cow;
use std::future::Future;
use tokio_postgres::types::ToSql;

/// SQL logged at debug level is cut to this many bytes.
const MAX_LOGGED_SQL: usize = 200;

/// Read access to one result row.
pub trait ScanRow {
    /// Number of columns.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode the column at `idx`.
    fn value(&self, idx: usize) -> SqlResult<Value>;

    /// Column name, used in decode errors.
    fn column_name(&self, idx: usize) -> Option<&str> {
        let _ = idx;
        None
    }
}

impl ScanRow for tokio_postgres::Row {
    fn len(&self) -> usize {
        tokio_postgres::Row::len(self)
    }

    fn value(&self, idx: usize) -> SqlResult<Value> {
        self.try_get::<_, Value>(idx).map_err(|e| {
            let column = ScanRow::column_name(self, idx).unwrap_or("?");
            SqlError::decode(column, e.to_string())
        })
    }

    fn column_name(&self, idx: usize) -> Option<&str> {
        self.columns().get(idx).map(|c| c.name())
    }
}

/// In-memory rows, mostly useful for tests and custom executors.
impl ScanRow for Vec<Value> {
    fn len(&self) -> usize {
        <[Value]>::len(self)
    }

    fn value(&self, idx: usize) -> SqlResult<Value> {
        self.get(idx)
            .cloned()
            .ok_or_else(|| SqlError::decode(idx.to_string(), "column index out of range"))
    }
}

/// Something that can run SQL with positional arguments.
///
/// Cancellation and timeouts belong to the implementation: dropping the
/// returned future abandons the call.
pub trait Executor: Send + Sync {
    type Row: ScanRow + Send;

    /// Run a query and return all rows.
    fn query(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = SqlResult<Vec<Self::Row>>> + Send;

    /// Run a query and return the first row, if any.
    ///
    /// The default implementation calls [`Executor::query`] and keeps the
    /// first row.
    fn query_opt(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = SqlResult<Option<Self::Row>>> + Send {
        async move {
            let rows = self.query(sql, args).await?;
            Ok(rows.into_iter().next())
        }
    }

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str, args: &[Value]) -> impl Future<Output = SqlResult<u64>> + Send;
}

fn params_ref(args: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

impl Executor for tokio_postgres::Client {
    type Row = tokio_postgres::Row;

    async fn query(&self, sql: &str, args: &[Value]) -> SqlResult<Vec<Self::Row>> {
        let params = params_ref(args);
        Ok(tokio_postgres::Client::query(self, sql, &params).await?)
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> SqlResult<u64> {
        let params = params_ref(args);
        Ok(tokio_postgres::Client::execute(self, sql, &params).await?)
    }
}

impl Executor for tokio_postgres::Transaction<'_> {
    type Row = tokio_postgres::Row;

    async fn query(&self, sql: &str, args: &[Value]) -> SqlResult<Vec<Self::Row>> {
        let params = params_ref(args);
        Ok(tokio_postgres::Transaction::query(self, sql, &params).await?)
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> SqlResult<u64> {
        let params = params_ref(args);
        Ok(tokio_postgres::Transaction::execute(self, sql, &params).await?)
    }
}

// ===== deadpool-postgres support =====

#[cfg(feature = "pool")]
impl Executor for deadpool_postgres::Client {
    type Row = tokio_postgres::Row;

    async fn query(&self, sql: &str, args: &[Value]) -> SqlResult<Vec<Self::Row>> {
        // Delegate to the deref target.
        let client: &tokio_postgres::Client = self;
        Executor::query(client, sql, args).await
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> SqlResult<u64> {
        let client: &tokio_postgres::Client = self;
        Executor::execute(client, sql, args).await
    }
}

#[cfg(feature = "pool")]
impl Executor for deadpool_postgres::Transaction<'_> {
    type Row = tokio_postgres::Row;

    async fn query(&self, sql: &str, args: &[Value]) -> SqlResult<Vec<Self::Row>> {
        let tx: &tokio_postgres::Transaction<'_> = self;
        Executor::query(tx, sql, args).await
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> SqlResult<u64> {
        let tx: &tokio_postgres::Transaction<'_> = self;
        Executor::execute(tx, sql, args).await
    }
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

impl Stmt<'_> {
    /// Run the statement and call `on_row` for every result row.
    ///
    /// Registered destinations are filled from each row right before
    /// `on_row` sees it.
    pub async fn query<E, F>(&mut self, executor: &E, mut on_row: F) -> SqlResult<()>
    where
        E: Executor,
        F: FnMut(&E::Row) -> SqlResult<()>,
    {
        let sql = self.rendered();
        self.log_execution("query", &sql);
        let rows = executor.query(&sql, self.args()).await?;
        for row in &rows {
            self.scan(row)?;
            on_row(row)?;
        }
        Ok(())
    }

    /// Run the statement and scan its first row into the destinations.
    ///
    /// Returns [`SqlError::NotFound`] when the query yields no rows.
    pub async fn query_row<E: Executor>(&mut self, executor: &E) -> SqlResult<E::Row> {
        let sql = self.rendered();
        self.log_execution("query_row", &sql);
        let row = executor
            .query_opt(&sql, self.args())
            .await?
            .ok_or_else(|| SqlError::not_found("query returned no rows"))?;
        self.scan(&row)?;
        Ok(row)
    }

    /// Run the statement and return the number of affected rows.
    pub async fn exec<E: Executor>(&self, executor: &E) -> SqlResult<u64> {
        let sql = self.rendered();
        self.log_execution("exec", &sql);
        executor.execute(&sql, self.args()).await
    }

    /// [`query`](Stmt::query), then release the statement.
    pub async fn query_and_close<E, F>(mut self, executor: &E, on_row: F) -> SqlResult<()>
    where
        E: Executor,
        F: FnMut(&E::Row) -> SqlResult<()>,
    {
        self.query(executor, on_row).await
    }

    /// [`query_row`](Stmt::query_row), then release the statement.
    pub async fn query_row_and_close<E: Executor>(mut self, executor: &E) -> SqlResult<E::Row> {
        self.query_row(executor).await
    }

    /// [`exec`](Stmt::exec), then release the statement.
    pub async fn exec_and_close<E: Executor>(self, executor: &E) -> SqlResult<u64> {
        self.exec(executor).await
    }

    fn scan<R: ScanRow>(&mut self, row: &R) -> SqlResult<()> {
        if self.dest.is_empty() {
            return Ok(());
        }
        if row.len() != self.dest.len() {
            return Err(SqlError::decode(
                "*",
                format!(
                    "row has {} column(s) but {} destination(s) are registered",
                    row.len(),
                    self.dest.len()
                ),
            ));
        }
        for (idx, dest) in self.dest.iter_mut().enumerate() {
            let value = row.value(idx)?;
            dest.assign(value).map_err(|e| {
                let column = row
                    .column_name(idx)
                    .map_or_else(|| idx.to_string(), str::to_owned);
                SqlError::decode(column, e.to_string())
            })?;
        }
        Ok(())
    }

    fn log_execution(&self, op: &'static str, sql: &str) {
        let shown: Cow<'_, str> = if sql.len() > MAX_LOGGED_SQL {
            format!("{}...", truncate_sql_bytes(sql, MAX_LOGGED_SQL)).into()
        } else {
            sql.into()
        };
        tracing::debug!(
            target: "sqlweave.sql",
            op,
            dialect = %self.dialect().name(),
            args = self.args().len(),
            sql = %shown,
            "executing statement"
        );
    }
}
