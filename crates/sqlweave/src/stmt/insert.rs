//! INSERT / UPDATE field assignment and multi-row inserts.

use super::Stmt;
use crate::position::Position;
use crate::value::{IntoArgs, Value};

impl<'d> Stmt<'d> {
    /// Start `INSERT INTO table (...) VALUES (...)`.
    ///
    /// Fields and values are added with [`set`](Stmt::set) or, for several
    /// rows, with [`new_row`](Stmt::new_row).
    pub fn insert_into(mut self, table: &str) -> Self {
        self.add_chunk(Position::INSERT, "INSERT INTO", table, (), "");
        self.add_chunk(Position::INSERT_FIELDS.before(1), "(", "", (), "");
        self.add_chunk(Position::VALUES.before(1), ") VALUES (", "", (), "");
        self.add_chunk(Position::VALUES.after(1), ")", "", (), "");
        self.pos = Position::INSERT_FIELDS;
        self
    }

    /// Assign `value` to `field`: a column/value pair for INSERT, or
    /// `field = ?` for UPDATE.
    pub fn set(self, field: &str, value: impl Into<Value>) -> Self {
        self.set_expr(field, "?", [value.into()])
    }

    /// Assign a SQL expression to `field`.
    ///
    /// # Panics
    ///
    /// Panics when the statement is neither an INSERT nor an UPDATE.
    pub fn set_expr(mut self, field: &str, expr: &str, args: impl IntoArgs) -> Self {
        self.assign(field, expr, args);
        self
    }

    fn assign(&mut self, field: &str, expr: &str, args: impl IntoArgs) {
        if self.has_chunk_at(Position::INSERT) {
            self.add_chunk(Position::INSERT_FIELDS, "", field, (), ", ");
            self.add_chunk(Position::VALUES, "", expr, args, ", ");
        } else if self.has_chunk_at(Position::UPDATE) {
            let mut pair = String::with_capacity(field.len() + expr.len() + 3);
            pair.push_str(field);
            pair.push_str(" = ");
            pair.push_str(expr);
            self.add_chunk(Position::SET, "SET", &pair, args, ", ");
        } else {
            panic!("set requires an INSERT INTO or UPDATE statement");
        }
    }

    /// Start a new row of a multi-row INSERT.
    ///
    /// Field names are taken from the first row only; later rows must set
    /// their values in the same order.
    ///
    /// ```
    /// use sqlweave::insert_into;
    ///
    /// let mut q = insert_into("users");
    /// for (name, age) in [("ann", 30), ("bob", 41)] {
    ///     q.new_row().set("name", name).set("age", age);
    /// }
    /// assert_eq!(
    ///     q.sql(),
    ///     "INSERT INTO users ( name, age ) VALUES ( ?, ? ), ( ?, ? )"
    /// );
    /// ```
    ///
    /// # Panics
    ///
    /// Panics when the statement is not an INSERT.
    pub fn new_row(&mut self) -> Row<'_, 'd> {
        assert!(
            self.has_chunk_at(Position::INSERT),
            "new_row requires an INSERT INTO statement"
        );
        let first = !self.has_chunk_at(Position::VALUES);
        if !first {
            self.add_chunk(Position::VALUES, "", "), (", (), " ");
        }
        Row {
            stmt: self,
            first,
            started: false,
        }
    }
}

/// One row of a multi-row INSERT, returned by [`Stmt::new_row`].
pub struct Row<'s, 'd> {
    stmt: &'s mut Stmt<'d>,
    first: bool,
    started: bool,
}

impl Row<'_, '_> {
    pub fn set(self, field: &str, value: impl Into<Value>) -> Self {
        self.set_expr(field, "?", [value.into()])
    }

    pub fn set_expr(mut self, field: &str, expr: &str, args: impl IntoArgs) -> Self {
        if self.first {
            self.stmt.assign(field, expr, args);
        } else {
            let sep = if self.started { ", " } else { " " };
            self.stmt.add_chunk(Position::VALUES, "", expr, args, sep);
        }
        self.started = true;
        self
    }
}
