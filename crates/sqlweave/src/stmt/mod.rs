//! Statement builder.
//!
//! A [`Stmt`] is checked out from a [`Dialect`] and records clauses in any
//! order; rendering always lists them in SQL clause order. Arguments are kept
//! aligned with the placeholders of the rendered text.
//!
//! ```
//! use sqlweave::Dialect;
//!
//! let q = Dialect::postgres()
//!     .from("orders")
//!     .where_("region = ?", ["EU"])
//!     .select("id, total")
//!     .order_by("id DESC")
//!     .limit(10);
//!
//! assert_eq!(
//!     q.sql(),
//!     "SELECT id, total FROM orders WHERE region = $1 ORDER BY id DESC LIMIT $2"
//! );
//! assert_eq!(q.args().len(), 2);
//! ```

mod chunk;
mod insert;

#[cfg(test)]
mod tests;

pub(crate) use chunk::Chunk;
pub use insert::Row;

use crate::bind::Dest;
use crate::dialect::{Dialect, Placeholders};
use crate::pool::{self, StmtParts};
use crate::position::Position;
use crate::value::{IntoArgs, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A SQL statement under construction.
///
/// The lifetime `'d` bounds the destinations registered with
/// [`to`](Stmt::to) and [`bind`](Stmt::bind).
///
/// Dropping a statement (or calling [`close`](Stmt::close)) returns its
/// buffers to the process-wide pools.
#[must_use]
pub struct Stmt<'d> {
    dialect: Dialect,
    name: Option<String>,
    /// Position of the most recent clause call; sub-queries attach here.
    pos: Position,
    parts: StmtParts,
    buf: String,
    pub(crate) dest: Vec<Box<dyn Dest + 'd>>,
    sql: OnceLock<Arc<str>>,
}

impl<'d> Stmt<'d> {
    /// Take a statement from the pool.
    pub(crate) fn checkout(dialect: Dialect) -> Self {
        Self {
            dialect,
            name: None,
            pos: Position::START,
            parts: pool::STATEMENTS.get(),
            buf: pool::BUFFERS.get(),
            dest: Vec::new(),
            sql: OnceLock::new(),
        }
    }

    /// Release the statement back to the pool.
    ///
    /// Equivalent to dropping it.
    pub fn close(self) {}

    /// The rendered SQL text.
    ///
    /// Rendering goes through the dialect's cache and is memoized until the
    /// statement is modified.
    pub fn sql(&self) -> &str {
        self.rendered_ref()
    }

    pub(crate) fn rendered(&self) -> Arc<str> {
        self.rendered_ref().clone()
    }

    fn rendered_ref(&self) -> &Arc<str> {
        self.sql.get_or_init(|| {
            self.dialect
                .render(self.name.as_deref(), &self.buf, &self.parts.chunks)
        })
    }

    /// Arguments in placeholder order.
    pub fn args(&self) -> &[Value] {
        &self.parts.args
    }

    /// Registered destinations in column order.
    pub fn dest(&self) -> &[Box<dyn Dest + 'd>] {
        &self.dest
    }

    /// The explicit cache key, if one was set.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Use `name` as this statement's render cache key.
    ///
    /// Statements sharing a name under one dialect must have the same shape:
    /// the first render stored under the name is reused as-is.
    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self.invalidate();
        self
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Render this statement with another dialect.
    pub fn set_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self.invalidate();
        self
    }

    /// Forget the memoized render.
    pub fn invalidate(&mut self) {
        self.sql.take();
    }

    // ==================== Clauses ====================

    pub fn select(self, expr: &str) -> Self {
        self.select_expr(expr, ())
    }

    /// Add a SELECT expression carrying arguments.
    pub fn select_expr(mut self, expr: &str, args: impl IntoArgs) -> Self {
        self.add_chunk(Position::SELECT, "SELECT", expr, args, ", ");
        self
    }

    pub fn from(self, expr: &str) -> Self {
        self.from_expr(expr, ())
    }

    /// Add a FROM item carrying arguments (e.g. a table function call).
    pub fn from_expr(mut self, expr: &str, args: impl IntoArgs) -> Self {
        self.add_chunk(Position::FROM, "FROM", expr, args, ", ");
        self
    }

    /// Add a WHERE condition. Repeated calls are joined with `AND`.
    pub fn where_(mut self, expr: &str, args: impl IntoArgs) -> Self {
        self.add_chunk(Position::WHERE, "WHERE", expr, args, " AND ");
        self
    }

    pub fn group_by(mut self, expr: &str) -> Self {
        self.add_chunk(Position::GROUP_BY, "GROUP BY", expr, (), ", ");
        self
    }

    /// Add a HAVING condition. Repeated calls are joined with `AND`.
    pub fn having(mut self, expr: &str, args: impl IntoArgs) -> Self {
        self.add_chunk(Position::HAVING, "HAVING", expr, args, " AND ");
        self
    }

    pub fn order_by(mut self, expr: &str) -> Self {
        self.add_chunk(Position::ORDER_BY, "ORDER BY", expr, (), ", ");
        self
    }

    /// Set `LIMIT ?`. Calling it again replaces the value.
    pub fn limit(mut self, limit: impl Into<Value>) -> Self {
        self.add_chunk(Position::LIMIT, "LIMIT ?", "", [limit.into()], "");
        self
    }

    /// Set `OFFSET ?`. Calling it again replaces the value.
    pub fn offset(mut self, offset: impl Into<Value>) -> Self {
        self.add_chunk(Position::OFFSET, "OFFSET ?", "", [offset.into()], "");
        self
    }

    /// Page-based LIMIT/OFFSET. Pages start at 1; smaller values are treated as 1.
    pub fn paginate(self, page: i64, page_size: i64) -> Self {
        let q = self.limit(page_size);
        if page > 1 {
            q.offset((page - 1) * page_size)
        } else {
            q
        }
    }

    pub fn returning(mut self, expr: &str) -> Self {
        self.add_chunk(Position::RETURNING, "RETURNING", expr, (), ", ");
        self
    }

    pub fn update(mut self, table: &str) -> Self {
        self.add_chunk(Position::UPDATE, "UPDATE", table, (), ", ");
        self
    }

    pub fn delete_from(mut self, table: &str) -> Self {
        self.add_chunk(Position::DELETE, "DELETE FROM", table, (), ", ");
        self
    }

    /// Append a free-form clause after everything added so far.
    ///
    /// # Panics
    ///
    /// Each call takes the slot 10 past the last chunk. The tenth clause
    /// chained after `RETURNING` would reach [`Position::END`] and panics.
    pub fn clause(mut self, expr: &str, args: impl IntoArgs) -> Self {
        let pos = self
            .last_pos()
            .map_or(Position::START, |last| last.after(10));
        self.add_chunk(pos, expr, "", args, ", ");
        self
    }

    /// Append an expression to the most recently added clause, separated by `, `.
    pub fn expr(mut self, expr: &str, args: impl IntoArgs) -> Self {
        let pos = self.pos;
        self.add_chunk(pos, "", expr, args, ", ");
        self
    }

    /// Append ` IN (?, ?, ...)` to the most recent clause.
    ///
    /// An empty list renders `IN (NULL)`, which matches nothing.
    pub fn in_list(mut self, values: impl IntoArgs) -> Self {
        let values: Vec<Value> = values.into_args().collect();
        let n = values.len();
        let mut expr = String::with_capacity(6 + n * 3);
        expr.push_str("IN (");
        if n == 0 {
            expr.push_str("NULL");
        }
        for i in 0..n {
            if i > 0 {
                expr.push_str(", ");
            }
            expr.push('?');
        }
        expr.push(')');
        let pos = self.pos;
        self.add_chunk(pos, "", &expr, values, " ");
        self
    }

    // ==================== Joins ====================

    pub fn join(self, table: &str, on: &str) -> Self {
        self.join_kind("JOIN ", table, on)
    }

    pub fn left_join(self, table: &str, on: &str) -> Self {
        self.join_kind("LEFT JOIN ", table, on)
    }

    pub fn right_join(self, table: &str, on: &str) -> Self {
        self.join_kind("RIGHT JOIN ", table, on)
    }

    pub fn full_join(self, table: &str, on: &str) -> Self {
        self.join_kind("FULL JOIN ", table, on)
    }

    fn join_kind(mut self, kind: &str, table: &str, on: &str) -> Self {
        let mut expr = String::with_capacity(kind.len() + table.len() + on.len() + 6);
        expr.push_str(kind);
        expr.push_str(table);
        expr.push_str(" ON (");
        expr.push_str(on);
        expr.push(')');
        // Joins live in their own slot right after the FROM list, so they
        // render after it whichever was called first.
        self.add_chunk(Position::FROM.after(50), "", &expr, (), " ");
        self
    }

    // ==================== Composition ====================

    /// Embed `query` as `prefix` + its SQL + `suffix` in the most recent clause.
    ///
    /// The inner statement is rendered without placeholder rewriting (the outer
    /// statement rewrites the combined text), its arguments are spliced into
    /// this statement at the matching offset, and it is released.
    pub fn sub_query(mut self, prefix: &str, suffix: &str, mut query: Stmt<'_>) -> Self {
        let sep = if self.pos == Position::WHERE {
            " AND "
        } else {
            ", "
        };
        let pos = self.pos;
        let args = std::mem::take(&mut query.parts.args);
        let index = self.place(pos, "", prefix, args, sep, true);
        self.splice_inner(index, &mut query, suffix);
        self
    }

    /// Append `UNION query` (or `UNION ALL query`).
    ///
    /// Each union gets its own slot after the previous one, so ORDER BY and
    /// LIMIT still apply to the combined result.
    pub fn union(mut self, all: bool, mut query: Stmt<'_>) -> Self {
        let pos = self
            .parts
            .chunks
            .iter()
            .rev()
            .map(|c| c.pos)
            .find(|p| (Position::UNION..Position::ORDER_BY).contains(p))
            .map_or(Position::UNION, |last| last.after(1));
        let keyword = if all { "UNION ALL" } else { "UNION" };
        let args = std::mem::take(&mut query.parts.args);
        let index = self.place(pos, keyword, "", args, "", true);
        self.splice_inner(index, &mut query, "");
        self
    }

    /// Add a common table expression `name AS (query)`.
    pub fn with(mut self, name: &str, query: Stmt<'_>) -> Self {
        self.add_chunk(Position::WITH, "WITH", "", (), ", ");
        let mut prefix = String::with_capacity(name.len() + 5);
        prefix.push_str(name);
        prefix.push_str(" AS (");
        self.sub_query(&prefix, ")", query)
    }

    /// Write the neutral render of `query` plus `suffix` into the chunk at `index`.
    fn splice_inner(&mut self, index: usize, query: &mut Stmt<'_>, suffix: &str) {
        if query.dialect.placeholders() == Placeholders::Dollar {
            query.dialect = Dialect::no_dialect();
            query.invalidate();
        }
        self.buf.push_str(query.sql());
        self.buf.push_str(suffix);
        let chunk = &mut self.parts.chunks[index];
        chunk.end = self.buf.len();
        chunk.has_expr = true;
        self.invalidate();
    }
}

impl Clone for Stmt<'_> {
    /// Copy chunks, arguments, text and any memoized render into a freshly
    /// checked-out statement.
    ///
    /// Destinations are exclusive borrows and are not copied; the clone
    /// starts with none.
    fn clone(&self) -> Self {
        let mut parts = pool::STATEMENTS.get();
        parts.chunks.extend_from_slice(&self.parts.chunks);
        parts.args.extend_from_slice(&self.parts.args);
        let mut buf = pool::BUFFERS.get();
        buf.push_str(&self.buf);
        Self {
            dialect: self.dialect.clone(),
            name: self.name.clone(),
            pos: self.pos,
            parts,
            buf,
            dest: Vec::new(),
            sql: self.sql.clone(),
        }
    }
}

impl Drop for Stmt<'_> {
    fn drop(&mut self) {
        pool::STATEMENTS.put(std::mem::take(&mut self.parts));
        pool::BUFFERS.put(std::mem::take(&mut self.buf));
    }
}

impl fmt::Display for Stmt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

impl fmt::Debug for Stmt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stmt")
            .field("dialect", &self.dialect.name())
            .field("name", &self.name)
            .field("sql", &self.sql.get().map(|s| &**s))
            .field("args", &self.parts.args)
            .field("dest", &self.dest.len())
            .finish()
    }
}
