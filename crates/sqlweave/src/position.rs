//! Clause positions.
//!
//! Every chunk of a statement is tagged with a [`Position`]. Chunks are kept
//! sorted by position, so the rendered SQL always lists clauses in the order
//! below no matter which builder method was called first.
//!
//! Named slots are spaced 100 apart. The gaps are used by [`Stmt::clause`]
//! (which places free-form clauses 10 after the last chunk), by
//! [`Stmt::union`] (1 after the previous union), by joins (`FROM + 50`) and
//! by the INSERT decoration chunks (`(`, `) VALUES (`, `)`), which sit 1
//! before/after their slot.
//!
//! [`Stmt::clause`]: crate::Stmt::clause
//! [`Stmt::union`]: crate::Stmt::union

use std::fmt;

/// Logical slot of a clause inside a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position(u16);

impl Position {
    pub const START: Position = Position(0);
    pub const WITH: Position = Position(100);
    pub const INSERT: Position = Position(200);
    pub const INSERT_FIELDS: Position = Position(300);
    pub const VALUES: Position = Position(400);
    pub const DELETE: Position = Position(500);
    pub const UPDATE: Position = Position(600);
    pub const SET: Position = Position(700);
    pub const SELECT: Position = Position(800);
    pub const FROM: Position = Position(900);
    pub const WHERE: Position = Position(1000);
    pub const GROUP_BY: Position = Position(1100);
    pub const HAVING: Position = Position(1200);
    pub const UNION: Position = Position(1300);
    pub const ORDER_BY: Position = Position(1400);
    pub const LIMIT: Position = Position(1500);
    pub const OFFSET: Position = Position(1600);
    pub const RETURNING: Position = Position(1700);
    /// Exclusive upper bound. No chunk may be placed here or beyond.
    pub const END: Position = Position(1800);

    /// Build a position from a raw index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`Position::END`].
    pub fn new(index: u16) -> Self {
        assert!(
            index < Self::END.0,
            "clause position {index} is out of range (must be below {})",
            Self::END.0
        );
        Position(index)
    }

    /// Raw index of this position.
    pub const fn index(self) -> u16 {
        self.0
    }

    /// Position `delta` slots after `self`.
    ///
    /// # Panics
    ///
    /// Panics if the result is not below [`Position::END`].
    pub fn after(self, delta: u16) -> Self {
        Position::new(self.0.saturating_add(delta))
    }

    /// Position `delta` slots before `self` (saturating at [`Position::START`]).
    pub const fn before(self, delta: u16) -> Self {
        Position(self.0.saturating_sub(delta))
    }

    /// Name of the named slot this position falls into.
    pub fn slot_name(self) -> &'static str {
        match self.0 / 100 {
            0 => "START",
            1 => "WITH",
            2 => "INSERT",
            3 => "INSERT_FIELDS",
            4 => "VALUES",
            5 => "DELETE",
            6 => "UPDATE",
            7 => "SET",
            8 => "SELECT",
            9 => "FROM",
            10 => "WHERE",
            11 => "GROUP_BY",
            12 => "HAVING",
            13 => "UNION",
            14 => "ORDER_BY",
            15 => "LIMIT",
            16 => "OFFSET",
            _ => "RETURNING",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.slot_name(), self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_slots_follow_sql_clause_order() {
        let order = [
            Position::START,
            Position::WITH,
            Position::INSERT,
            Position::INSERT_FIELDS,
            Position::VALUES,
            Position::DELETE,
            Position::UPDATE,
            Position::SET,
            Position::SELECT,
            Position::FROM,
            Position::WHERE,
            Position::GROUP_BY,
            Position::HAVING,
            Position::UNION,
            Position::ORDER_BY,
            Position::LIMIT,
            Position::OFFSET,
            Position::RETURNING,
            Position::END,
        ];
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn offsets_stay_inside_their_slot() {
        assert_eq!(Position::WHERE.after(10).slot_name(), "WHERE");
        assert_eq!(Position::VALUES.before(1).slot_name(), "INSERT_FIELDS");
        assert_eq!(Position::START.before(5), Position::START);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn rejects_positions_past_the_end() {
        let _ = Position::RETURNING.after(100);
    }
}
