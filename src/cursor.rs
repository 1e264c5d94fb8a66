//! Character-level cursor over clean (preprocessed) source text.
//!
//! The cursor tracks offset, line and column, skips whitespace and the three
//! Pascal comment forms, and recognises words and punctuation case-insensitively.
//! Every `eat_*` helper restores the cursor when it does not match, which is what
//! lets the parser backtrack freely between alternatives.

use crate::diagnostic::ParseError;
use crate::source::Position;

/// Saved cursor state, restored with [`Cursor::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pos: usize,
    line: u32,
    line_start: usize,
}

pub fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

pub fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Whitespace includes the DOS end-of-file marker some old units still carry.
pub fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x1a)
}

#[derive(Debug, Clone)]
pub struct Cursor<'src> {
    text: &'src str,
    bytes: &'src [u8],
    pos: usize,
    line: u32,
    line_start: usize,
}

impl<'src> Cursor<'src> {
    pub fn new(text: &'src str) -> Self {
        Cursor {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            line: 1,
            line_start: 0,
        }
    }

    pub fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            line_start: self.line_start,
        }
    }

    pub fn reset(&mut self, mark: Mark) {
        self.pos = mark.pos;
        self.line = mark.line;
        self.line_start = mark.line_start;
    }

    pub fn offset(&self) -> usize {
        self.pos
    }

    pub fn position(&self) -> Position {
        Position::new(self.pos as u32, self.line, (self.pos - self.line_start) as u32 + 1)
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    pub fn peek_at(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.pos + n).copied()
    }

    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.line_start = self.pos;
        }
        Some(b)
    }

    /// Source text between two offsets.
    pub fn slice(&self, start: usize, end: usize) -> &'src str {
        self.text.get(start..end).unwrap_or("")
    }

    /// The whole line the cursor currently sits on.
    pub fn current_line(&self) -> &'src str {
        let end = self.bytes[self.line_start..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|n| self.line_start + n)
            .unwrap_or(self.bytes.len());
        self.slice(self.line_start, end).trim_end_matches('\r')
    }

    pub fn skip_spaces(&mut self) {
        while let Some(b) = self.peek() {
            if !is_space(b) {
                break;
            }
            self.bump();
        }
    }

    /// Skips whitespace and `//`, `{ }` and `(* *)` comments.
    pub fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            self.skip_spaces();
            match (self.peek(), self.peek_at(1)) {
                (Some(b'/'), Some(b'/')) => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some(b'{'), _) => {
                    let start = self.position();
                    let line_text = self.current_line().to_string();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some(b'}') => break,
                            Some(_) => {}
                            None => return Err(ParseError::UnterminatedComment { location: start, line_text }),
                        }
                    }
                }
                (Some(b'('), Some(b'*')) => {
                    let start = self.position();
                    let line_text = self.current_line().to_string();
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some(b'*'), Some(b')')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => {
                                return Err(ParseError::UnterminatedComment { location: start, line_text });
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Reads an identifier-shaped word after trivia, without any reserved-word filtering.
    pub fn any_word(&mut self) -> Result<Option<&'src str>, ParseError> {
        let mark = self.mark();
        self.skip_trivia()?;
        match self.peek() {
            Some(b) if is_ident_start(b) => {
                let start = self.pos;
                while let Some(b) = self.peek() {
                    if !is_ident_continue(b) {
                        break;
                    }
                    self.bump();
                }
                Ok(Some(self.slice(start, self.pos)))
            }
            _ => {
                self.reset(mark);
                Ok(None)
            }
        }
    }

    /// Matches a whole word case-insensitively.
    pub fn eat_word(&mut self, word: &str) -> Result<bool, ParseError> {
        let mark = self.mark();
        match self.any_word()? {
            Some(found) if found.eq_ignore_ascii_case(word) => Ok(true),
            _ => {
                self.reset(mark);
                Ok(false)
            }
        }
    }

    /// Matches the first of `words` that is present, returning its index.
    pub fn eat_any_word(&mut self, words: &[&str]) -> Result<Option<usize>, ParseError> {
        let mark = self.mark();
        if let Some(found) = self.any_word()?
            && let Some(idx) = words.iter().position(|w| found.eq_ignore_ascii_case(w))
        {
            return Ok(Some(idx));
        }
        self.reset(mark);
        Ok(None)
    }

    /// Matches punctuation text such as `:=` or `..` after trivia.
    pub fn eat_text(&mut self, text: &str) -> Result<bool, ParseError> {
        let mark = self.mark();
        self.skip_trivia()?;
        for expected in text.bytes() {
            match self.peek() {
                Some(b) if b.eq_ignore_ascii_case(&expected) => {
                    self.bump();
                }
                _ => {
                    self.reset(mark);
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Peeks at punctuation without consuming it.
    pub fn looking_at(&mut self, text: &str) -> Result<bool, ParseError> {
        let mark = self.mark();
        let found = self.eat_text(text)?;
        self.reset(mark);
        Ok(found)
    }

    /// Peeks at a whole word without consuming it.
    pub fn looking_at_word(&mut self, word: &str) -> Result<bool, ParseError> {
        let mark = self.mark();
        let found = self.eat_word(word)?;
        self.reset(mark);
        Ok(found)
    }
}
