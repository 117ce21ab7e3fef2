//! Chunk ordering engine.
//!
//! A statement's text lives in one shared buffer. Each clause fragment is a
//! [`Chunk`] pointing at a byte range of that buffer, and the chunk list is
//! kept sorted by [`Position`]. Arguments live in one flat list whose order
//! always matches the left-to-right order of placeholders in the final render.

use super::Stmt;
use crate::position::Position;
use crate::value::IntoArgs;
use std::ops::Range;

/// One rendered fragment of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Chunk {
    pub(crate) pos: Position,
    pub(crate) start: usize,
    pub(crate) end: usize,
    /// Number of arguments introduced by this chunk's text.
    pub(crate) args: usize,
    /// False while the chunk holds only its clause keyword.
    pub(crate) has_expr: bool,
}

impl Chunk {
    pub(crate) fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Where a new piece of text goes.
enum Placement {
    /// A chunk exists at the position and there is no expression: only its
    /// arguments are replaced.
    Refresh(usize),
    /// The chunk at this index ends at the buffer tail and can grow in place.
    Extend(usize),
    /// A chunk exists at the position but other text was written after it:
    /// a continuation chunk is inserted at this index.
    Continue(usize),
    /// No chunk at the position: a new one is inserted at this index.
    Insert(usize),
}

impl Stmt<'_> {
    /// Add `expr` (and its arguments) at `pos`.
    ///
    /// The clause keyword is written only when the position has no chunk yet.
    /// When it does, `expr` is appended after `sep` (or a single space if the
    /// existing chunk is a bare keyword). An empty `expr` at an existing
    /// position only replaces that chunk's arguments, which makes repeated
    /// `LIMIT`/`OFFSET` calls overwrite each other.
    ///
    /// Returns the index of the chunk that received the text.
    pub(crate) fn add_chunk(
        &mut self,
        pos: Position,
        clause: &str,
        expr: &str,
        args: impl IntoArgs,
        sep: &str,
    ) -> usize {
        self.place(pos, clause, expr, args, sep, !expr.is_empty())
    }

    /// Like [`add_chunk`](Self::add_chunk), but the caller decides whether the
    /// text counts as an expression. Sub-queries pass `true` with a possibly
    /// empty prefix because they append the inner statement right after.
    pub(crate) fn place(
        &mut self,
        pos: Position,
        clause: &str,
        expr: &str,
        args: impl IntoArgs,
        sep: &str,
        has_expr: bool,
    ) -> usize {
        assert!(
            pos < Position::END,
            "clause position {} is out of range",
            pos.index()
        );
        self.pos = pos;

        let args = args.into_args();
        let arg_len = args.len();
        let (placement, arg_tail) = self.locate(pos, has_expr);
        let chunks = &mut self.parts.chunks;

        let index = match placement {
            Placement::Refresh(i) => {
                if arg_len > 0 {
                    let chunk = &chunks[i];
                    assert_eq!(
                        chunk.args,
                        arg_len,
                        "clause at {pos} expects {} argument(s), got {arg_len}",
                        chunk.args
                    );
                    let end = self.parts.args.len() - arg_tail;
                    let start = end - arg_len;
                    self.parts.args.splice(start..end, args);
                }
                self.invalidate();
                return i;
            }
            Placement::Extend(i) => {
                let chunk = &mut chunks[i];
                self.buf.push_str(if chunk.has_expr { sep } else { " " });
                self.buf.push_str(expr);
                chunk.end = self.buf.len();
                chunk.args += arg_len;
                chunk.has_expr = true;
                i
            }
            Placement::Continue(i) => {
                let start = self.buf.len();
                self.buf
                    .push_str(if chunks[i - 1].has_expr { sep } else { " " });
                self.buf.push_str(expr);
                chunks.insert(
                    i,
                    Chunk {
                        pos,
                        start,
                        end: self.buf.len(),
                        args: arg_len,
                        has_expr: true,
                    },
                );
                i
            }
            Placement::Insert(i) => {
                let start = self.buf.len();
                if !clause.is_empty() {
                    self.buf.push_str(clause);
                    if has_expr {
                        self.buf.push(' ');
                    }
                }
                self.buf.push_str(expr);
                chunks.insert(
                    i,
                    Chunk {
                        pos,
                        start,
                        end: self.buf.len(),
                        args: arg_len,
                        has_expr,
                    },
                );
                i
            }
        };

        if arg_len > 0 {
            let at = self.parts.args.len() - arg_tail;
            self.parts.args.splice(at..at, args);
        }
        self.invalidate();
        index
    }

    /// Scan chunks from the end to find where text for `pos` belongs.
    ///
    /// Also returns how many arguments belong to chunks that follow the
    /// placement, i.e. how far from the end of the flat argument list the new
    /// arguments must be inserted.
    fn locate(&self, pos: Position, has_expr: bool) -> (Placement, usize) {
        let mut arg_tail = 0;
        for (i, chunk) in self.parts.chunks.iter().enumerate().rev() {
            if chunk.pos == pos {
                let placement = if !has_expr {
                    Placement::Refresh(i)
                } else if chunk.end == self.buf.len() {
                    Placement::Extend(i)
                } else {
                    Placement::Continue(i + 1)
                };
                return (placement, arg_tail);
            }
            if chunk.pos < pos {
                return (Placement::Insert(i + 1), arg_tail);
            }
            arg_tail += chunk.args;
        }
        (Placement::Insert(0), arg_tail)
    }

    /// Position of the last chunk in clause order.
    pub(crate) fn last_pos(&self) -> Option<Position> {
        self.parts.chunks.last().map(|c| c.pos)
    }

    pub(crate) fn has_chunk_at(&self, pos: Position) -> bool {
        self.parts.chunks.iter().any(|c| c.pos == pos)
    }
}
