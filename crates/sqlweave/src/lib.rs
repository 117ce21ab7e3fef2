//! # sqlweave
//!
//! A SQL statement assembler for Rust.
//!
//! ## Features
//!
//! - **Any call order**: clauses render in SQL clause order no matter which
//!   builder method ran first
//! - **Aligned arguments**: the argument list always matches the placeholders
//!   of the rendered text, including arguments of embedded sub-queries
//! - **Dialects**: `?` placeholders stay as-is or become `$1, $2, ...` for Postgres
//! - **Render cache**: repeated statement shapes skip re-rendering
//! - **Pooled buffers**: statements reuse their text buffers and argument lists
//! - **Thin execution layer**: run statements through `tokio-postgres` (or any
//!   [`Executor`]) and scan rows into plain `&mut` destinations
//!
//! ## Example
//!
//! ```
//! use sqlweave::Dialect;
//!
//! let pg = Dialect::postgres();
//!
//! let active = pg.from("sessions").select("user_id").where_("expires_at > now()", ());
//! let q = pg
//!     .from("users")
//!     .select("id, email")
//!     .where_("status = ?", ["active"])
//!     .sub_query("id IN (", ")", active)
//!     .order_by("id")
//!     .limit(50);
//!
//! assert_eq!(
//!     q.sql(),
//!     "SELECT id, email FROM users \
//!      WHERE status = $1 AND id IN (SELECT user_id FROM sessions WHERE expires_at > now()) \
//!      ORDER BY id LIMIT $2"
//! );
//! assert_eq!(q.args().len(), 2);
//! ```
//!
//! Statements built with the crate-level functions ([`from`], [`select`], ...)
//! use [`Dialect::no_dialect`]. To target a database, keep a [`Dialect`] value
//! and call its factories instead.

pub mod bind;
pub mod cache;
pub mod dialect;
pub mod error;
pub mod exec;
pub mod pool;
pub mod position;
pub mod stmt;
pub mod value;

pub use bind::{Collect, Dest, Field, Record};
pub use cache::CacheStats;
pub use dialect::{Dialect, DialectConfig, Placeholders};
pub use error::{SqlError, SqlResult};
pub use exec::{Executor, ScanRow};
pub use pool::{PoolConfig, PoolStats};
pub use position::Position;
pub use stmt::{Row, Stmt};
pub use value::{FromValue, IntoArgs, TypeMismatch, Value};

/// Start a statement with a raw verb, e.g. `TRUNCATE TABLE t`.
pub fn new_stmt<'d>(verb: &str, args: impl IntoArgs) -> Stmt<'d> {
    Dialect::no_dialect().new_stmt(verb, args)
}

/// Start a SELECT statement from `table`.
pub fn from<'d>(table: &str) -> Stmt<'d> {
    Dialect::no_dialect().from(table)
}

/// Start a SELECT statement with a column list.
pub fn select<'d>(expr: &str) -> Stmt<'d> {
    Dialect::no_dialect().select(expr)
}

pub fn insert_into<'d>(table: &str) -> Stmt<'d> {
    Dialect::no_dialect().insert_into(table)
}

pub fn update<'d>(table: &str) -> Stmt<'d> {
    Dialect::no_dialect().update(table)
}

pub fn delete_from<'d>(table: &str) -> Stmt<'d> {
    Dialect::no_dialect().delete_from(table)
}

/// Start a statement with a common table expression `name AS (query)`.
pub fn with<'d>(name: &str, query: Stmt<'_>) -> Stmt<'d> {
    Dialect::no_dialect().with(name, query)
}
