//! Expression parsing.
//!
//! Parsing is two-layered. [`Parser::complex`] reads one operand: an optional prefix
//! operator, a primitive, then any number of suffixes (`.member`, `(args)`, `[index]`,
//! `^`). [`Parser::value`] reads a flat run of operands separated by binary operators
//! and turns it into a tree with [`slice`], which splits at the loosest operator.

use crate::ast::*;
use crate::diagnostic::ParseError;
use crate::source::Position;

use super::Parser;

/// One element of a flat operand/operator run.
#[derive(Debug)]
pub(crate) enum Item {
    Operand(Expr),
    Operator(BinaryOp, Position),
}

const WORD_OPERATORS: &[(&str, BinaryOp)] = &[
    ("and", BinaryOp::And),
    ("or", BinaryOp::Or),
    ("xor", BinaryOp::Xor),
    ("is", BinaryOp::Is),
    ("in", BinaryOp::In),
    ("div", BinaryOp::IntDiv),
    ("mod", BinaryOp::Mod),
    ("shl", BinaryOp::Shl),
    ("shr", BinaryOp::Shr),
    ("as", BinaryOp::As),
];

// longer spellings first so `<=` is never read as `<`
const SYMBOL_OPERATORS: &[(&str, BinaryOp)] = &[
    (">=", BinaryOp::GreaterEqual),
    ("<=", BinaryOp::LessEqual),
    ("<>", BinaryOp::NotEqual),
    ("+", BinaryOp::Add),
    ("-", BinaryOp::Subtract),
    ("*", BinaryOp::Multiply),
    ("/", BinaryOp::Divide),
    ("<", BinaryOp::Less),
    (">", BinaryOp::Greater),
    ("=", BinaryOp::Equal),
    ("..", BinaryOp::Interval),
];

/// Reduces `items[start..=end]` to one expression by splitting at the loosest
/// operator. Among operators of equal precedence the rightmost one is split first, so
/// chains like `a - b - c` group from the left.
pub(crate) fn slice(items: &mut [Option<Item>], start: usize, end: usize, at: &ErrorSite) -> Result<Expr, ParseError> {
    let mut split: Option<(usize, u8)> = None;
    for (i, item) in items.iter().enumerate().take(end + 1).skip(start) {
        if let Some(Item::Operator(op, _)) = item {
            let prec = op.precedence();
            if split.is_none_or(|(_, best)| prec >= best) {
                split = Some((i, prec));
            }
        }
    }

    let Some((index, _)) = split else {
        if start != end {
            return Err(at.error("not a value"));
        }
        return match items[start].take() {
            Some(Item::Operand(expr)) => Ok(expr),
            _ => Err(at.error("not a value")),
        };
    };

    if index == start || index == end {
        return Err(at.error("not an unary operator"));
    }

    let lhs = slice(items, start, index - 1, at)?;
    let rhs = slice(items, index + 1, end, at)?;
    let Some(Item::Operator(op, location)) = items[index].take() else {
        return Err(at.error("not a value"));
    };
    Ok(Expr::new(
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        location,
    ))
}

/// Where a slicing error is reported.
pub(crate) struct ErrorSite {
    location: Position,
    line_text: String,
}

impl ErrorSite {
    fn error(&self, message: &str) -> ParseError {
        ParseError::Syntax {
            message: message.to_string(),
            location: self.location,
            line_text: self.line_text.clone(),
        }
    }
}

impl Parser<'_> {
    /// A full expression, or `None` when no operand starts here.
    pub fn value(&mut self) -> Result<Option<Expr>, ParseError> {
        self.nested(|p| {
            let mark = p.mark();
            let site = ErrorSite {
                location: p.position()?,
                line_text: p.cursor.current_line().to_string(),
            };
            let outer_peak = p.begin_height();
            let result = match p.complex() {
                Ok(Some(first)) => {
                    // operators nest on top of the first operand's tree
                    let mut levels = p.stack_on_peak();
                    let run = p.operator_run(first, &mut levels);
                    p.depth -= levels;
                    run.and_then(|mut items| {
                        let end = items.len() - 1;
                        slice(&mut items, 0, end, &site).map(Some)
                    })
                }
                Ok(None) => {
                    p.reset(mark);
                    Ok(None)
                }
                Err(e) => Err(e),
            };
            p.end_height(outer_peak);
            result
        })
    }

    /// Operators and operands following `first`. Each operator takes one nesting
    /// level, counted in `levels`.
    fn operator_run(&mut self, first: Expr, levels: &mut usize) -> Result<Vec<Option<Item>>, ParseError> {
        let mut items = vec![Some(Item::Operand(first))];
        while let Some((op, location)) = self.binary_operator()? {
            self.enter_level()?;
            *levels += 1;
            items.push(Some(Item::Operator(op, location)));
            let operand = self.complex()?;
            let operand = self.require(operand, "binary operand")?;
            items.push(Some(Item::Operand(operand)));
        }
        Ok(items)
    }

    pub fn require_value(&mut self, what: &str) -> Result<Expr, ParseError> {
        let value = self.value()?;
        self.require(value, what)
    }

    fn binary_operator(&mut self) -> Result<Option<(BinaryOp, Position)>, ParseError> {
        let location = self.position()?;
        let words: Vec<&str> = WORD_OPERATORS.iter().map(|(w, _)| *w).collect();
        if let Some(idx) = self.cursor.eat_any_word(&words)? {
            return Ok(Some((WORD_OPERATORS[idx].1, location)));
        }
        for &(text, op) in SYMBOL_OPERATORS {
            if self.cursor.eat_text(text)? {
                return Ok(Some((op, location)));
            }
        }
        Ok(None)
    }

    fn unary_operator(&mut self) -> Result<Option<UnaryOp>, ParseError> {
        if self.cursor.eat_word("not")? {
            return Ok(Some(UnaryOp::Not));
        }
        for (text, op) in [("+", UnaryOp::Positive), ("-", UnaryOp::Negative), ("@", UnaryOp::AddressOf)] {
            if self.cursor.eat_text(text)? {
                return Ok(Some(op));
            }
        }
        Ok(None)
    }

    /// One operand with its prefix operator and suffix chain.
    pub fn complex(&mut self) -> Result<Option<Expr>, ParseError> {
        self.nested(|p| {
            let location = p.position()?;
            if let Some(op) = p.unary_operator()? {
                let operand = p.complex()?;
                let operand = p.require(operand, "unary argument")?;
                return Ok(Some(Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    location,
                )));
            }

            let outer_peak = p.begin_height();
            let result = match p.primitive() {
                Ok(Some(base)) => {
                    let mut levels = p.stack_on_peak();
                    let chain = p.suffix_chain(base, &mut levels);
                    p.depth -= levels;
                    chain.map(Some)
                }
                other => other,
            };
            p.end_height(outer_peak);
            result
        })
    }

    /// Applies suffixes until none follows. Each applied suffix takes one nesting
    /// level, counted in `levels`.
    fn suffix_chain(&mut self, mut expr: Expr, levels: &mut usize) -> Result<Expr, ParseError> {
        loop {
            match self.suffix(expr)? {
                Ok(next) => {
                    self.enter_level()?;
                    *levels += 1;
                    expr = next;
                }
                Err(done) => return Ok(done),
            }
        }
    }

    /// Applies one suffix to `base`, or hands `base` back unchanged as `Err`.
    fn suffix(&mut self, base: Expr) -> Result<Result<Expr, Expr>, ParseError> {
        let location = self.position()?;
        let mark = self.mark();

        if self.cursor.eat_text(".")? {
            if self.cursor.looking_at(".")? {
                self.reset(mark);
                return Ok(Err(base));
            }
            let member = self.cursor.any_word()?;
            let member = self.require(member, "dot member")?;
            return Ok(Ok(Expr::new(
                ExprKind::Member {
                    base: Box::new(base),
                    name: Ref::named(member),
                },
                location,
            )));
        }
        if self.cursor.eat_text("(")? {
            let args = self.closing_list(")")?;
            return Ok(Ok(Expr::new(
                ExprKind::Call {
                    base: Box::new(base),
                    args,
                },
                location,
            )));
        }
        if self.cursor.eat_text("[")? {
            let args = self.closing_list("]")?;
            return Ok(Ok(Expr::new(
                ExprKind::Index {
                    base: Box::new(base),
                    args,
                },
                location,
            )));
        }
        if self.cursor.eat_text("^")? {
            return Ok(Ok(Expr::new(ExprKind::Deref { base: Box::new(base) }, location)));
        }
        Ok(Err(base))
    }

    /// Literal, identifier, special symbol or grouped value.
    fn primitive(&mut self) -> Result<Option<Expr>, ParseError> {
        let location = self.position()?;

        if self.cursor.eat_text("(")? {
            let mut items = vec![self.require_value("value")?];
            while self.cursor.eat_text(",")? {
                items.push(self.require_value("value")?);
            }
            self.expect_text(")")?;
            return Ok(Some(Expr::new(ExprKind::Paren(items), location)));
        }
        if self.cursor.eat_text("[")? {
            let items = self.closing_list("]")?;
            return Ok(Some(Expr::new(ExprKind::Brackets(items), location)));
        }
        if let Some(text) = self.string_literal()? {
            return Ok(Some(Expr::new(ExprKind::Str(text), location)));
        }
        if let Some(kind) = self.number_literal()? {
            return Ok(Some(Expr::new(kind, location)));
        }
        let symbols = ["nil", "true", "false", "null"];
        if let Some(idx) = self.cursor.eat_any_word(&symbols)? {
            let symbol = match idx {
                0 => SpecialSymbol::Nil,
                1 => SpecialSymbol::True,
                2 => SpecialSymbol::False,
                _ => SpecialSymbol::Null,
            };
            return Ok(Some(Expr::new(ExprKind::Symbol(symbol), location)));
        }
        if let Some(name) = self.ident()? {
            return Ok(Some(Expr::new(ExprKind::Name(Ref::named(name)), location)));
        }
        Ok(None)
    }

    /// `'it''s'#13#$0A'x'`: quoted pieces and character codes run together.
    fn string_literal(&mut self) -> Result<Option<String>, ParseError> {
        self.cursor.skip_trivia()?;
        let mut bytes = Vec::new();
        let mut pieces = 0;
        loop {
            match self.cursor.peek() {
                Some(b'\'') => {
                    self.cursor.bump();
                    loop {
                        match self.cursor.bump() {
                            Some(b'\'') if self.cursor.peek() == Some(b'\'') => {
                                self.cursor.bump();
                                bytes.push(b'\'');
                            }
                            Some(b'\'') => break,
                            Some(b'\n') | None => return Err(self.error("unterminated string")),
                            Some(b) => bytes.push(b),
                        }
                    }
                }
                Some(b'#') => {
                    self.cursor.bump();
                    let code = self.integer_digits()?;
                    let (code, _) = self.require(code, "character code")?;
                    let ch = u32::try_from(code)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| self.error("character code out of range"))?;
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                }
                _ => break,
            }
            pieces += 1;
        }
        Ok((pieces > 0).then(|| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// `$FF` or decimal digits, returning the value and whether it was hex.
    fn integer_digits(&mut self) -> Result<Option<(i64, bool)>, ParseError> {
        let hex = self.cursor.peek() == Some(b'$');
        if hex {
            self.cursor.bump();
        }
        let start = self.cursor.offset();
        while let Some(b) = self.cursor.peek() {
            let ok = if hex { b.is_ascii_hexdigit() } else { b.is_ascii_digit() };
            if !ok {
                break;
            }
            self.cursor.bump();
        }
        let digits = self.cursor.slice(start, self.cursor.offset());
        if digits.is_empty() {
            if hex {
                return Err(self.error("expecting hex"));
            }
            return Ok(None);
        }
        let radix = if hex { 16 } else { 10 };
        let value = i64::from_str_radix(digits, radix).map_err(|_| ParseError::InvalidNumber {
            text: digits.to_string(),
            location: self.cursor.position(),
            line_text: self.cursor.current_line().to_string(),
        })?;
        Ok(Some((value, hex)))
    }

    /// Integer, hex or float literal. A `.` after the digits makes a float unless it
    /// starts a `..` interval.
    fn number_literal(&mut self) -> Result<Option<ExprKind>, ParseError> {
        self.cursor.skip_trivia()?;
        let mark = self.mark();
        let start = self.cursor.offset();
        let Some((value, hex)) = self.integer_digits()? else {
            self.reset(mark);
            return Ok(None);
        };
        if hex {
            return Ok(Some(ExprKind::Hex(value)));
        }

        let is_fraction = self.cursor.peek() == Some(b'.') && self.cursor.peek_at(1).is_some_and(|b| b.is_ascii_digit());
        let is_exponent = matches!(self.cursor.peek(), Some(b'e' | b'E'))
            && self
                .cursor
                .peek_at(1)
                .is_some_and(|b| b.is_ascii_digit() || b == b'+' || b == b'-');
        if !is_fraction && !is_exponent {
            return Ok(Some(ExprKind::Int(value)));
        }

        if is_fraction {
            self.cursor.bump();
            while self.cursor.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.cursor.bump();
            }
        }
        if matches!(self.cursor.peek(), Some(b'e' | b'E')) {
            self.cursor.bump();
            if matches!(self.cursor.peek(), Some(b'+' | b'-')) {
                self.cursor.bump();
            }
            if !self.cursor.peek().is_some_and(|b| b.is_ascii_digit()) {
                return Err(self.error("expecting exponent digits"));
            }
            while self.cursor.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.cursor.bump();
            }
        }
        let text = self.cursor.slice(start, self.cursor.offset());
        let value: f64 = text.parse().map_err(|_| ParseError::InvalidNumber {
            text: text.to_string(),
            location: self.cursor.position(),
            line_text: self.cursor.current_line().to_string(),
        })?;
        Ok(Some(ExprKind::Float(value)))
    }
}
