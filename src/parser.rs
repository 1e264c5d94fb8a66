//! Recursive-descent parser for Object Pascal units.
//!
//! The parser reads preprocessed text straight through a [`Cursor`]; there is no
//! separate token stream. Each `has_*` rule either consumes its construct and returns
//! `Some`, or restores the cursor and returns `None`, so alternatives can be tried in
//! order. `require`-style helpers turn a missing construct into a fatal [`ParseError`].
//!
//! - [`declarations`]: sections, types, classes, routines, properties
//! - [`statements`]: statement forms
//! - [`expressions`]: operand chains and precedence slicing

use log::debug;

use crate::ast::*;
use crate::cursor::{Cursor, Mark};
use crate::diagnostic::ParseError;
use crate::source::Position;

pub mod declarations;
pub mod expressions;
pub mod statements;
pub mod utils;

#[cfg(test)]
mod tests_parser;

/// Words that can never be used as plain identifiers. Kept sorted for binary search.
pub const RESERVED_WORDS: &[&str] = &[
    "and",
    "array",
    "as",
    "asm",
    "begin",
    "case",
    "class",
    "const",
    "constructor",
    "destructor",
    "dispinterface",
    "div",
    "do",
    "downto",
    "else",
    "end",
    "except",
    "exports",
    "file",
    "finalization",
    "finally",
    "for",
    "function",
    "goto",
    "if",
    "implementation",
    "in",
    "inherited",
    "initialization",
    "inline",
    "interface",
    "is",
    "label",
    "library",
    "mod",
    "nil",
    "not",
    "object",
    "of",
    "or",
    "out",
    "packed",
    "procedure",
    "program",
    "property",
    "raise",
    "record",
    "repeat",
    "resourcestring",
    "set",
    "shl",
    "shr",
    "string",
    "then",
    "threadvar",
    "to",
    "try",
    "type",
    "unit",
    "until",
    "uses",
    "var",
    "while",
    "with",
    "xor",
];

pub fn is_reserved(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    RESERVED_WORDS.binary_search(&lower.as_str()).is_ok()
}

/// Parser limits
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Maximum nesting of statements, expressions and types. Operators of a flat run
    /// and suffixes of a chain each count as one level, so this also bounds the height
    /// of every expression tree.
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig { max_depth: 256 }
    }
}

pub struct Parser<'src> {
    pub(crate) cursor: Cursor<'src>,
    pub(crate) ast: Ast,
    config: ParserConfig,
    depth: usize,
    /// Deepest level reached since the last [`Parser::begin_height`].
    peak: usize,
}

/// Parses a whole unit (or program) from preprocessed text.
pub fn parse_unit(text: &str, config: &ParserConfig) -> Result<Ast, ParseError> {
    Parser::new(text, config.clone()).parse_unit()
}

impl<'src> Parser<'src> {
    pub fn new(text: &'src str, config: ParserConfig) -> Self {
        Parser {
            cursor: Cursor::new(text),
            ast: Ast::new(),
            config,
            depth: 0,
            peak: 0,
        }
    }

    /// Gives back the declarations built so far; used by tests that parse fragments.
    pub fn into_ast(self) -> Ast {
        self.ast
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// `unit Name; interface ... implementation ... end.` or `program Name; ... begin ... end.`
    pub fn parse_unit(mut self) -> Result<Ast, ParseError> {
        let start = self.position()?;
        let kind = match self.cursor.eat_any_word(&["unit", "program"])? {
            Some(0) => UnitKind::Unit,
            Some(_) => UnitKind::Program,
            None => return Err(self.error("expecting 'unit' or 'program'")),
        };
        let name = self.expect_qualified_ident("unit name")?;
        debug!("parsing {:?} '{}'", kind, name);
        self.expect_text(";")?;

        let mut unit = UnitDecl {
            kind,
            ..UnitDecl::default()
        };

        match kind {
            UnitKind::Unit => {
                self.expect_word("interface")?;
                unit.interface_uses = self.uses_clause()?;
                self.parse_decls(&mut unit.interface, false, Visibility::Public)?;
                self.expect_word("implementation")?;
                unit.implementation_uses = self.uses_clause()?;
                self.parse_decls(&mut unit.implementation, true, Visibility::Private)?;

                if self.cursor.eat_word("begin")? {
                    unit.initialization = self.parse_stmts()?;
                } else {
                    if self.cursor.eat_word("initialization")? {
                        unit.initialization = self.parse_stmts()?;
                    }
                    if self.cursor.eat_word("finalization")? {
                        unit.finalization = self.parse_stmts()?;
                    }
                }
            }
            UnitKind::Program => {
                unit.implementation_uses = self.uses_clause()?;
                self.parse_decls(&mut unit.implementation, true, Visibility::Private)?;
                self.expect_word("begin")?;
                unit.initialization = self.parse_stmts()?;
            }
        }

        self.expect_word("end")?;
        self.expect_text(".")?;

        reconcile_forward_classes(&self.ast, &mut unit.interface);
        reconcile_forward_classes(&self.ast, &mut unit.implementation);

        let root = self.ast.push(Decl::new(name, DeclKind::Unit(unit), start));
        self.ast.set_root(root);
        Ok(self.ast)
    }

    /// `uses A, B in 'b.pas', C.D;`
    fn uses_clause(&mut self) -> Result<Vec<String>, ParseError> {
        let mut units = Vec::new();
        if !self.cursor.eat_word("uses")? {
            return Ok(units);
        }
        loop {
            units.push(self.expect_qualified_ident("unit name")?);
            if self.cursor.eat_word("in")? {
                self.require_value("file name")?;
            }
            if !self.cursor.eat_text(",")? {
                break;
            }
        }
        self.expect_text(";")?;
        Ok(units)
    }

    // ---- error helpers ----

    pub(crate) fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            message: message.into(),
            location: self.cursor.position(),
            line_text: self.cursor.current_line().to_string(),
        }
    }

    pub(crate) fn require<T>(&self, value: Option<T>, what: &str) -> Result<T, ParseError> {
        value.ok_or_else(|| self.error(format!("expecting {}", what)))
    }

    /// Position of the next significant character.
    pub(crate) fn position(&mut self) -> Result<Position, ParseError> {
        self.cursor.skip_trivia()?;
        Ok(self.cursor.position())
    }

    pub(crate) fn mark(&self) -> Mark {
        self.cursor.mark()
    }

    pub(crate) fn reset(&mut self, mark: Mark) {
        self.cursor.reset(mark);
    }

    // ---- token helpers ----

    pub(crate) fn expect_text(&mut self, text: &str) -> Result<(), ParseError> {
        if self.cursor.eat_text(text)? {
            Ok(())
        } else {
            Err(self.error(format!("expecting '{}'", text)))
        }
    }

    pub(crate) fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        if self.cursor.eat_word(word)? {
            Ok(())
        } else {
            Err(self.error(format!("expecting '{}'", word)))
        }
    }

    /// `;` is optional in several places (before `end`, after the last section).
    pub(crate) fn eat_semi(&mut self) -> Result<bool, ParseError> {
        self.cursor.eat_text(";")
    }

    /// An identifier that is not a reserved word.
    pub(crate) fn ident(&mut self) -> Result<Option<String>, ParseError> {
        let mark = self.mark();
        match self.cursor.any_word()? {
            Some(word) if !is_reserved(word) => Ok(Some(word.to_string())),
            _ => {
                self.reset(mark);
                Ok(None)
            }
        }
    }

    pub(crate) fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        let ident = self.ident()?;
        self.require(ident, what)
    }

    /// Dotted identifier such as `System.SysUtils`.
    pub(crate) fn expect_qualified_ident(&mut self, what: &str) -> Result<String, ParseError> {
        let mut name = self.expect_ident(what)?;
        loop {
            let mark = self.mark();
            if self.cursor.eat_text(".")? && !self.cursor.looking_at(".")? {
                if let Some(part) = self.ident()? {
                    name.push('.');
                    name.push_str(&part);
                    continue;
                }
            }
            self.reset(mark);
            return Ok(name);
        }
    }

    /// Comma-separated identifier list, at least one.
    pub(crate) fn ident_list(&mut self) -> Result<Option<Vec<String>>, ParseError> {
        let Some(first) = self.ident()? else {
            return Ok(None);
        };
        let mut names = vec![first];
        while self.cursor.eat_text(",")? {
            names.push(self.expect_ident("identifier")?);
        }
        Ok(Some(names))
    }

    /// Runs `f` one nesting level deeper, failing once `max_depth` is exceeded.
    pub(crate) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        self.enter_level()?;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Takes one nesting level. The caller gives it back by lowering `depth`.
    pub(crate) fn enter_level(&mut self) -> Result<(), ParseError> {
        if self.depth >= self.config.max_depth {
            return Err(ParseError::NestingTooDeep {
                limit: self.config.max_depth,
                location: self.cursor.position(),
                line_text: self.cursor.current_line().to_string(),
            });
        }
        self.depth += 1;
        self.peak = self.peak.max(self.depth);
        Ok(())
    }

    /// Starts measuring how deep the next subtree goes. Returns the outer peak for
    /// [`Parser::end_height`].
    pub(crate) fn begin_height(&mut self) -> usize {
        std::mem::replace(&mut self.peak, self.depth)
    }

    /// Raises `depth` to the deepest level the measured subtree reached, so levels
    /// taken next stack on top of it. Returns the number of levels raised.
    pub(crate) fn stack_on_peak(&mut self) -> usize {
        let lift = self.peak.saturating_sub(self.depth);
        self.depth += lift;
        lift
    }

    pub(crate) fn end_height(&mut self, outer_peak: usize) {
        self.peak = self.peak.max(outer_peak);
    }
}
