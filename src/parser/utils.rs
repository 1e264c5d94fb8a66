//! Backtracking and list helpers shared by the parser rules.

use std::ops::{Deref, DerefMut};

use crate::ast::*;
use crate::cursor::Mark;
use crate::diagnostic::ParseError;

use super::Parser;

/// Speculative parse: unless committed, dropping the transaction rewinds the cursor
/// and forgets any declarations pushed meanwhile.
pub(crate) struct ParserTransaction<'a, 'src> {
    parser: &'a mut Parser<'src>,
    mark: Mark,
    decl_count: usize,
    committed: bool,
}

impl<'a, 'src> ParserTransaction<'a, 'src> {
    pub(crate) fn new(parser: &'a mut Parser<'src>) -> Self {
        let mark = parser.mark();
        let decl_count = parser.ast.len();
        Self {
            parser,
            mark,
            decl_count,
            committed: false,
        }
    }

    pub(crate) fn commit(mut self) {
        self.committed = true;
    }
}

impl<'src> Deref for ParserTransaction<'_, 'src> {
    type Target = Parser<'src>;

    fn deref(&self) -> &Self::Target {
        self.parser
    }
}

impl DerefMut for ParserTransaction<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.parser
    }
}

impl Drop for ParserTransaction<'_, '_> {
    fn drop(&mut self) {
        if !self.committed {
            self.parser.reset(self.mark);
            self.parser.ast.truncate(self.decl_count);
        }
    }
}

impl Parser<'_> {
    /// Comma-separated values up to (not including) `close`. An immediate `close`
    /// yields an empty list.
    pub(crate) fn value_list(&mut self, close: &str) -> Result<Vec<Expr>, ParseError> {
        let mut values = Vec::new();
        if self.cursor.looking_at(close)? {
            return Ok(values);
        }
        loop {
            values.push(self.require_value("value")?);
            if !self.cursor.eat_text(",")? {
                break;
            }
        }
        Ok(values)
    }

    /// `( values )`; the opening parenthesis is already consumed.
    pub(crate) fn closing_list(&mut self, close: &str) -> Result<Vec<Expr>, ParseError> {
        let values = self.value_list(close)?;
        self.expect_text(close)?;
        Ok(values)
    }
}
