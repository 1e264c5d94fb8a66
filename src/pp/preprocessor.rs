use hashbrown::HashSet;
use log::{debug, trace};
use thiserror::Error;

use crate::diagnostic::{Diagnostic, DiagnosticLevel};
use crate::source::{LineIndex, Position};

/// Default define set, matching a Delphi Win32 build.
pub const DEFAULT_DEFINES: &str = "DELPHI;MSWINDOWS;WIN32;CONDITIONALEXPRESSIONS";

/// Preprocessor configuration
#[derive(Debug, Clone)]
pub struct PPConfig {
    pub defines: Vec<String>,
    pub max_depth: usize,
}

impl Default for PPConfig {
    fn default() -> Self {
        PPConfig {
            defines: Vec::new(),
            max_depth: 256,
        }
    }
}

impl PPConfig {
    /// Builds a config from a semicolon-separated define list such as `"DEBUG;WIN32"`.
    pub fn from_define_list(list: &str) -> Self {
        let mut config = PPConfig::default();
        config.add_define_list(list);
        config
    }

    pub fn add_define_list(&mut self, list: &str) {
        self.defines.extend(
            list.split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
    }
}

/// Directive errors. All of them abort the run before parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PPError {
    #[error("incomplete directive, missing '}}'")]
    UnterminatedDirective { location: Position },
    #[error("{{$else}} without {{$ifdef}}")]
    ElseWithoutIf { location: Position },
    #[error("{{$endif}} without {{$ifdef}}")]
    EndifWithoutIf { location: Position },
    #[error("duplicate {{$else}} in conditional block")]
    DuplicateElse { location: Position },
    #[error("{{${directive}}} is not closed by {{$endif}}")]
    UnterminatedConditional { directive: String, location: Position },
    #[error("{{${directive}}} needs a symbol")]
    MissingSymbol { directive: String, location: Position },
    #[error("unsupported conditional expression '{expr}'")]
    UnsupportedCondition { expr: String, location: Position },
    #[error("conditional directives nested deeper than {limit} levels")]
    NestingTooDeep { limit: usize, location: Position },
}

impl PPError {
    pub fn location(&self) -> Position {
        match self {
            PPError::UnterminatedDirective { location }
            | PPError::ElseWithoutIf { location }
            | PPError::EndifWithoutIf { location }
            | PPError::DuplicateElse { location }
            | PPError::UnterminatedConditional { location, .. }
            | PPError::MissingSymbol { location, .. }
            | PPError::UnsupportedCondition { location, .. }
            | PPError::NestingTooDeep { location, .. } => *location,
        }
    }
}

impl From<PPError> for Diagnostic {
    fn from(error: PPError) -> Self {
        Diagnostic {
            level: DiagnosticLevel::Error,
            message: error.to_string(),
            location: Some(error.location()),
            hints: Vec::new(),
        }
    }
}

/// One `{$...}` occurrence, with the byte range it covers.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveNode {
    Define { symbol: String, start: usize, end: usize },
    Undefine { symbol: String, start: usize, end: usize },
    /// Compiler switches and anything else this tool does not interpret; stripped from output.
    Switch { start: usize, end: usize },
    Conditional(Conditional),
}

impl DirectiveNode {
    fn start(&self) -> usize {
        match self {
            DirectiveNode::Define { start, .. }
            | DirectiveNode::Undefine { start, .. }
            | DirectiveNode::Switch { start, .. } => *start,
            DirectiveNode::Conditional(cond) => cond.start,
        }
    }
}

/// An `ifdef`/`ifndef` block and the directives nested in each of its branches.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub symbol: String,
    /// `true` for `ifdef`, `false` for `ifndef`.
    pub when_defined: bool,
    pub start: usize,
    pub then_start: usize,
    pub then_branch: Vec<DirectiveNode>,
    /// Byte range of the `{$else}` marker, if any.
    pub else_marker: Option<(usize, usize)>,
    pub else_branch: Vec<DirectiveNode>,
    pub end_start: usize,
    pub end_end: usize,
}

/// A conditional still waiting for its `{$endif}` while scanning
#[derive(Debug)]
struct PPConditionalInfo {
    directive: String,
    symbol: String,
    when_defined: bool,
    start: usize,
    then_start: usize,
    then_branch: Vec<DirectiveNode>,
    else_marker: Option<(usize, usize)>,
    else_branch: Vec<DirectiveNode>,
}

impl PPConditionalInfo {
    fn current_branch(&mut self) -> &mut Vec<DirectiveNode> {
        if self.else_marker.is_some() {
            &mut self.else_branch
        } else {
            &mut self.then_branch
        }
    }
}

/// Raw directive text split into its lowercase name and argument.
struct RawDirective<'a> {
    name: String,
    argument: &'a str,
    start: usize,
    end: usize,
}

/// Conditional-compilation preprocessor.
///
/// Works in two passes: [`Preprocessor::scan`] collects every directive into a tree of
/// nested conditionals, then the replay walks that tree against the active define set and
/// copies only the text of the branches that are taken.
pub struct Preprocessor<'a> {
    config: &'a PPConfig,
    defines: HashSet<String>,
    conditional_stack: Vec<PPConditionalInfo>,
    lines: Option<LineIndex>,
}

impl<'a> Preprocessor<'a> {
    pub fn new(config: &'a PPConfig) -> Self {
        let defines = config.defines.iter().map(|d| d.to_ascii_lowercase()).collect();
        Preprocessor {
            config,
            defines,
            conditional_stack: Vec::new(),
            lines: None,
        }
    }

    pub fn is_defined(&self, symbol: &str) -> bool {
        self.defines.contains(&symbol.to_ascii_lowercase())
    }

    /// Strips directives and inactive branches from `text`.
    pub fn process(&mut self, text: &str) -> Result<String, PPError> {
        self.lines = Some(LineIndex::new(text));
        let tree = self.scan(text)?;
        debug!("preprocessor: {} top-level directives", tree.len());

        let mut out = String::with_capacity(text.len());
        self.replay(text, &tree, 0, text.len(), &mut out);
        Ok(out)
    }

    /// First pass: builds the directive tree without evaluating anything.
    pub fn scan(&mut self, text: &str) -> Result<Vec<DirectiveNode>, PPError> {
        if self.lines.is_none() {
            self.lines = Some(LineIndex::new(text));
        }
        self.conditional_stack.clear();
        let mut top_level = Vec::new();
        let mut pos = 0;

        while let Some(raw) = self.next_directive(text, &mut pos)? {
            trace!("directive '{}' at {}", raw.name, raw.start);
            match raw.name.as_str() {
                "ifdef" | "ifndef" | "if" => self.handle_if(raw)?,
                "else" => self.handle_else(raw)?,
                "endif" | "ifend" => {
                    let node = self.handle_endif(raw)?;
                    self.push_node(&mut top_level, node);
                }
                "define" | "undef" => {
                    let symbol = Self::first_word(raw.argument).ok_or_else(|| PPError::MissingSymbol {
                        directive: raw.name.clone(),
                        location: self.position(raw.start),
                    })?;
                    let symbol = symbol.to_ascii_lowercase();
                    let node = if raw.name == "define" {
                        DirectiveNode::Define {
                            symbol,
                            start: raw.start,
                            end: raw.end,
                        }
                    } else {
                        DirectiveNode::Undefine {
                            symbol,
                            start: raw.start,
                            end: raw.end,
                        }
                    };
                    self.push_node(&mut top_level, node);
                }
                _ => {
                    let node = DirectiveNode::Switch {
                        start: raw.start,
                        end: raw.end,
                    };
                    self.push_node(&mut top_level, node);
                }
            }
        }

        if let Some(open) = self.conditional_stack.last() {
            return Err(PPError::UnterminatedConditional {
                directive: open.directive.clone(),
                location: self.position(open.start),
            });
        }

        Ok(top_level)
    }

    fn push_node(&mut self, top_level: &mut Vec<DirectiveNode>, node: DirectiveNode) {
        match self.conditional_stack.last_mut() {
            Some(open) => open.current_branch().push(node),
            None => top_level.push(node),
        }
    }

    fn handle_if(&mut self, raw: RawDirective<'_>) -> Result<(), PPError> {
        if self.conditional_stack.len() >= self.config.max_depth {
            return Err(PPError::NestingTooDeep {
                limit: self.config.max_depth,
                location: self.position(raw.start),
            });
        }

        let (symbol, when_defined) = match raw.name.as_str() {
            "ifdef" | "ifndef" => {
                let symbol = Self::first_word(raw.argument).ok_or_else(|| PPError::MissingSymbol {
                    directive: raw.name.clone(),
                    location: self.position(raw.start),
                })?;
                (symbol.to_ascii_lowercase(), raw.name == "ifdef")
            }
            _ => self.parse_defined_condition(&raw)?,
        };

        self.conditional_stack.push(PPConditionalInfo {
            directive: raw.name,
            symbol,
            when_defined,
            start: raw.start,
            then_start: raw.end,
            then_branch: Vec::new(),
            else_marker: None,
            else_branch: Vec::new(),
        });
        Ok(())
    }

    /// `{$if defined(X)}` and `{$if not defined(X)}`, the only expression forms accepted.
    fn parse_defined_condition(&self, raw: &RawDirective<'_>) -> Result<(String, bool), PPError> {
        let unsupported = || PPError::UnsupportedCondition {
            expr: raw.argument.to_string(),
            location: self.position(raw.start),
        };

        let expr = raw.argument.trim();
        let lower = expr.to_ascii_lowercase();
        let (rest, when_defined) = match lower.strip_prefix("not ") {
            Some(rest) => (rest.trim_start(), false),
            None => (lower.as_str(), true),
        };
        let inner = rest
            .strip_prefix("defined")
            .map(str::trim_start)
            .and_then(|r| r.strip_prefix('('))
            .and_then(|r| r.strip_suffix(')'))
            .map(str::trim)
            .ok_or_else(unsupported)?;
        if inner.is_empty() || !inner.bytes().all(crate::cursor::is_ident_continue) {
            return Err(unsupported());
        }
        Ok((inner.to_string(), when_defined))
    }

    fn handle_else(&mut self, raw: RawDirective<'_>) -> Result<(), PPError> {
        let location = self.position(raw.start);
        let current = self
            .conditional_stack
            .last_mut()
            .ok_or(PPError::ElseWithoutIf { location })?;
        if current.else_marker.is_some() {
            return Err(PPError::DuplicateElse { location });
        }
        current.else_marker = Some((raw.start, raw.end));
        Ok(())
    }

    fn handle_endif(&mut self, raw: RawDirective<'_>) -> Result<DirectiveNode, PPError> {
        let info = self.conditional_stack.pop().ok_or(PPError::EndifWithoutIf {
            location: self.position(raw.start),
        })?;
        Ok(DirectiveNode::Conditional(Conditional {
            symbol: info.symbol,
            when_defined: info.when_defined,
            start: info.start,
            then_start: info.then_start,
            then_branch: info.then_branch,
            else_marker: info.else_marker,
            else_branch: info.else_branch,
            end_start: raw.start,
            end_end: raw.end,
        }))
    }

    /// Second pass: copies `text[read_pos..stop]`, replaying the directives in `nodes`.
    /// Defines take effect in scan order, so later conditionals see them.
    fn replay(&mut self, text: &str, nodes: &[DirectiveNode], mut read_pos: usize, stop: usize, out: &mut String) {
        for node in nodes {
            out.push_str(&text[read_pos..node.start()]);
            match node {
                DirectiveNode::Define { symbol, end, .. } => {
                    self.defines.insert(symbol.clone());
                    read_pos = *end;
                }
                DirectiveNode::Undefine { symbol, end, .. } => {
                    self.defines.remove(symbol);
                    read_pos = *end;
                }
                DirectiveNode::Switch { end, .. } => {
                    read_pos = *end;
                }
                DirectiveNode::Conditional(cond) => {
                    let taken = self.defines.contains(&cond.symbol) == cond.when_defined;
                    trace!("conditional '{}' taken={}", cond.symbol, taken);
                    if taken {
                        let then_end = cond.else_marker.map(|(start, _)| start).unwrap_or(cond.end_start);
                        self.replay(text, &cond.then_branch, cond.then_start, then_end, out);
                    } else if let Some((_, else_end)) = cond.else_marker {
                        self.replay(text, &cond.else_branch, else_end, cond.end_start, out);
                    }
                    read_pos = cond.end_end;
                }
            }
        }
        out.push_str(&text[read_pos..stop]);
    }

    /// Finds the next `{$...}` marker, stepping over string literals and ordinary comments.
    fn next_directive<'t>(&self, text: &'t str, pos: &mut usize) -> Result<Option<RawDirective<'t>>, PPError> {
        let bytes = text.as_bytes();
        while *pos < bytes.len() {
            match bytes[*pos] {
                b'\'' => {
                    *pos += 1;
                    while *pos < bytes.len() && bytes[*pos] != b'\'' && bytes[*pos] != b'\n' {
                        *pos += 1;
                    }
                    *pos += 1;
                }
                b'/' if bytes.get(*pos + 1) == Some(&b'/') => {
                    while *pos < bytes.len() && bytes[*pos] != b'\n' {
                        *pos += 1;
                    }
                }
                b'(' if bytes.get(*pos + 1) == Some(&b'*') => {
                    *pos = text[*pos + 2..].find("*)").map(|n| *pos + 2 + n + 2).unwrap_or(bytes.len());
                }
                b'{' if bytes.get(*pos + 1) == Some(&b'$') => {
                    let start = *pos;
                    let close = text[start..].find('}').ok_or(PPError::UnterminatedDirective {
                        location: self.position(start),
                    })?;
                    let end = start + close + 1;
                    let body = text[start + 2..end - 1].trim();
                    let (name, argument) = match body.find(char::is_whitespace) {
                        Some(split) => (&body[..split], body[split..].trim()),
                        None => (body, ""),
                    };
                    *pos = end;
                    return Ok(Some(RawDirective {
                        name: name.to_ascii_lowercase(),
                        argument,
                        start,
                        end,
                    }));
                }
                b'{' => {
                    // plain comment; an unterminated one is left for the parser to report
                    *pos = text[*pos..].find('}').map(|n| *pos + n + 1).unwrap_or(bytes.len());
                }
                _ => *pos += 1,
            }
        }
        Ok(None)
    }

    fn first_word(argument: &str) -> Option<&str> {
        argument.split_whitespace().next()
    }

    fn position(&self, offset: usize) -> Position {
        self.lines
            .as_ref()
            .map(|lines| lines.position_at(offset))
            .unwrap_or_default()
    }
}

/// Convenience wrapper: preprocess `text` with the given define symbols.
pub fn preprocess(text: &str, defines: &[&str]) -> Result<String, PPError> {
    let config = PPConfig {
        defines: defines.iter().map(|d| d.to_string()).collect(),
        ..PPConfig::default()
    };
    Preprocessor::new(&config).process(text)
}
