//! Dialects: placeholder style, render cache and statement factories.
//!
//! A [`Dialect`] is a cheap, clonable handle. The three built-in dialects are
//! process-wide singletons, and [`Dialect::new`] creates independent instances
//! with their own cache. Identical statements rendered under different
//! dialects never share a cache entry.
//!
//! # Example
//!
//! ```
//! use sqlweave::Dialect;
//!
//! let pg = Dialect::postgres();
//! let q = pg.from("users").select("id, name").where_("status = ?", ["active"]);
//! assert_eq!(q.sql(), "SELECT id, name FROM users WHERE status = $1");
//! ```

use crate::cache::{CacheStats, RenderCache};
use crate::position::Position;
use crate::stmt::{Chunk, Stmt};
use crate::value::IntoArgs;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// How `?` placeholders are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Placeholders {
    /// Leave `?` untouched.
    #[default]
    Question,
    /// Rewrite `?` to `$1`, `$2`, ... across the whole statement.
    /// `\?` renders as a literal `?` and does not take a number.
    Dollar,
    /// SQL Server style. Named parameters are passed as
    /// [`Value::Named`](crate::Value::Named) arguments and the text is left
    /// untouched.
    Named,
}

/// Settings for a caller-constructed [`Dialect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectConfig {
    /// Name shown in logs and `Debug` output.
    pub name: String,
    pub placeholders: Placeholders,
    /// Maximum number of cached renders. When reached, the cache is flushed
    /// before the next insert. `None` means unbounded.
    pub cache_limit: Option<usize>,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self {
            name: "custom".to_string(),
            placeholders: Placeholders::Question,
            cache_limit: None,
        }
    }
}

impl DialectConfig {
    pub fn new(name: impl Into<String>, placeholders: Placeholders) -> Self {
        Self {
            name: name.into(),
            placeholders,
            cache_limit: None,
        }
    }

    /// Bound the render cache to `limit` entries.
    pub fn cache_limit(mut self, limit: usize) -> Self {
        self.cache_limit = Some(limit);
        self
    }
}

struct DialectInner {
    name: String,
    placeholders: Placeholders,
    cache: RenderCache,
}

/// A rendering strategy together with its render cache.
#[derive(Clone)]
pub struct Dialect {
    inner: Arc<DialectInner>,
}

static NO_DIALECT: LazyLock<Dialect> =
    LazyLock::new(|| Dialect::new(DialectConfig::new("none", Placeholders::Question)));
static POSTGRES: LazyLock<Dialect> =
    LazyLock::new(|| Dialect::new(DialectConfig::new("postgres", Placeholders::Dollar)));
static SQL_SERVER: LazyLock<Dialect> =
    LazyLock::new(|| Dialect::new(DialectConfig::new("sqlserver", Placeholders::Named)));

impl Dialect {
    /// Create an independent dialect with its own render cache.
    pub fn new(config: DialectConfig) -> Self {
        Self {
            inner: Arc::new(DialectInner {
                cache: RenderCache::new(config.cache_limit),
                name: config.name,
                placeholders: config.placeholders,
            }),
        }
    }

    /// The shared dialect that leaves `?` placeholders untouched.
    pub fn no_dialect() -> Self {
        NO_DIALECT.clone()
    }

    /// The shared Postgres dialect (`$1, $2, ...`).
    pub fn postgres() -> Self {
        POSTGRES.clone()
    }

    /// The shared SQL Server dialect.
    pub fn sql_server() -> Self {
        SQL_SERVER.clone()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn placeholders(&self) -> Placeholders {
        self.inner.placeholders
    }

    /// Whether both handles point at the same dialect instance (and cache).
    pub fn ptr_eq(&self, other: &Dialect) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Drop every cached render of this dialect.
    pub fn clear_cache(&self) {
        let dropped = self.inner.cache.clear();
        tracing::debug!(
            target: "sqlweave.sql",
            dialect = %self.name(),
            dropped,
            "render cache cleared"
        );
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Start a statement with a raw verb, e.g. `TRUNCATE TABLE t`.
    pub fn new_stmt<'d>(&self, verb: &str, args: impl IntoArgs) -> Stmt<'d> {
        Stmt::checkout(self.clone()).clause(verb, args)
    }

    /// Start a SELECT statement from `table`.
    pub fn from<'d>(&self, table: &str) -> Stmt<'d> {
        Stmt::checkout(self.clone()).from(table)
    }

    /// Start a SELECT statement with a column list.
    pub fn select<'d>(&self, expr: &str) -> Stmt<'d> {
        Stmt::checkout(self.clone()).select(expr)
    }

    pub fn insert_into<'d>(&self, table: &str) -> Stmt<'d> {
        Stmt::checkout(self.clone()).insert_into(table)
    }

    pub fn update<'d>(&self, table: &str) -> Stmt<'d> {
        Stmt::checkout(self.clone()).update(table)
    }

    pub fn delete_from<'d>(&self, table: &str) -> Stmt<'d> {
        Stmt::checkout(self.clone()).delete_from(table)
    }

    /// Start a statement with a common table expression `name AS (query)`.
    pub fn with<'d>(&self, name: &str, query: Stmt<'_>) -> Stmt<'d> {
        Stmt::checkout(self.clone()).with(name, query)
    }

    /// Render a statement, going through the cache.
    ///
    /// The key is the explicit statement name when there is one, otherwise
    /// the raw buffer. The lookup borrows the key; only a miss copies it.
    pub(crate) fn render(&self, name: Option<&str>, buf: &str, chunks: &[Chunk]) -> Arc<str> {
        let key = name.unwrap_or(buf);
        if let Some(sql) = self.inner.cache.get(key) {
            return sql;
        }
        tracing::trace!(
            target: "sqlweave.sql",
            dialect = %self.name(),
            key_len = key.len(),
            "render cache miss"
        );
        let sql = build_sql(self.placeholders(), buf, chunks);
        self.inner.cache.insert(key, Arc::from(sql))
    }
}

impl fmt::Debug for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialect")
            .field("name", &self.inner.name)
            .field("placeholders", &self.inner.placeholders)
            .finish_non_exhaustive()
    }
}

/// Walk the sorted chunk list once and produce the final SQL.
///
/// A space separates chunks of different positions. Chunks that extend the
/// same position already carry their own separator.
fn build_sql(placeholders: Placeholders, buf: &str, chunks: &[Chunk]) -> String {
    let mut out = String::with_capacity(buf.len() + chunks.len() + 16);
    let mut next_arg = 1usize;
    let mut prev: Option<Position> = None;

    for chunk in chunks {
        if prev.is_some_and(|p| p != chunk.pos) {
            out.push(' ');
        }
        prev = Some(chunk.pos);

        let text = &buf[chunk.range()];
        if placeholders == Placeholders::Dollar && chunk.args > 0 {
            next_arg = rewrite_dollar(text, next_arg, &mut out);
        } else {
            out.push_str(text);
        }
    }

    let leading = out.len() - out.trim_start().len();
    if leading > 0 {
        out.drain(..leading);
    }
    out
}

/// Copy `text` into `out`, replacing each `?` with `$n` starting at `next`.
/// `\?` is copied as `?` without consuming a number.
///
/// Returns the next unused number.
pub(crate) fn rewrite_dollar(text: &str, mut next: usize, out: &mut String) -> usize {
    let mut rest = text;
    while let Some(i) = rest.find('?') {
        let before = &rest[..i];
        match before.strip_suffix('\\') {
            Some(unescaped) => {
                out.push_str(unescaped);
                out.push('?');
            }
            None => {
                out.push_str(before);
                out.push('$');
                push_usize(out, next);
                next += 1;
            }
        }
        rest = &rest[i + 1..];
    }
    out.push_str(rest);
    next
}

// Write a usize as decimal digits into `out` without going through fmt.
#[inline]
fn push_usize(out: &mut String, mut n: usize) {
    if n < 10 {
        out.push(char::from(b'0' + n as u8));
        return;
    }
    let mut digits = [0u8; 20];
    let mut pos = digits.len();
    while n > 0 {
        pos -= 1;
        digits[pos] = b'0' + (n % 10) as u8;
        n /= 10;
    }
    out.extend(digits[pos..].iter().map(|&d| char::from(d)));
}
