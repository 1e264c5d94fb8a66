//! Text-level idiom rewriting of emitted expressions.
//!
//! The emitter renders every expression structurally and then hands the text to an
//! [`IdiomRewriter`]. The default [`TableRewriter`] turns calls to well-known runtime
//! routines into their C# equivalents (`Length(s)` into `s.Length`, `Inc(i)` into
//! `i++`) and renames library class names. Rewriting is purely textual and never
//! touches string literals.

use std::sync::LazyLock;

use regex::Regex;

/// Rewrites one rendered expression. Must be total; returning the input unchanged is
/// always valid.
pub trait IdiomRewriter {
    fn rewrite(&self, text: &str) -> String;
}

/// Leaves every expression as rendered.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRewriter;

impl IdiomRewriter for IdentityRewriter {
    fn rewrite(&self, text: &str) -> String {
        text.to_string()
    }
}

type CallRewrite = fn(&[String]) -> Option<String>;

/// Rewrites a call `Name(args)` given its already rewritten arguments.
struct CallRule {
    name: &'static str,
    rewrite: CallRewrite,
}

/// A regex substitution over the code parts of the text.
struct TextRule {
    pattern: Regex,
    replacement: &'static str,
}

/// Ordered rewrite table. For calls, the first rule naming the routine wins; text rules
/// are then applied in order.
pub struct TableRewriter {
    calls: Vec<CallRule>,
    texts: Vec<TextRule>,
}

impl std::fmt::Debug for TableRewriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRewriter")
            .field("calls", &self.calls.iter().map(|r| r.name).collect::<Vec<_>>())
            .field("texts", &self.texts.iter().map(|r| r.pattern.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

fn replace_call(args: &[String]) -> Option<String> {
    match args {
        [s, from, to] | [s, from, to, _] => Some(format!("{}.Replace({}, {})", s, from, to)),
        _ => None,
    }
}

fn same_text(args: &[String]) -> Option<String> {
    match args {
        [a, b] => Some(format!("{}.Equals({}, StringComparison.OrdinalIgnoreCase)", a, b)),
        _ => None,
    }
}

fn if_then(args: &[String]) -> Option<String> {
    match args {
        [cond, yes, no] => Some(format!("({} ? {} : {})", cond, yes, no)),
        _ => None,
    }
}

fn starts_text(args: &[String]) -> Option<String> {
    match args {
        [sub, text] => Some(format!("{}.StartsWith({}, StringComparison.OrdinalIgnoreCase)", text, sub)),
        _ => None,
    }
}

fn ends_text(args: &[String]) -> Option<String> {
    match args {
        [sub, text] => Some(format!("{}.EndsWith({}, StringComparison.OrdinalIgnoreCase)", text, sub)),
        _ => None,
    }
}

fn copy(args: &[String]) -> Option<String> {
    match args {
        [s, start, count] => Some(format!("{}.Substring({} - 1, {})", s, start, count)),
        _ => None,
    }
}

fn length(args: &[String]) -> Option<String> {
    match args {
        [s] => Some(format!("{}.Length", s)),
        _ => None,
    }
}

fn inc(args: &[String]) -> Option<String> {
    match args {
        [x] => Some(format!("{}++", x)),
        [x, n] => Some(format!("{} += {}", x, n)),
        _ => None,
    }
}

fn dec(args: &[String]) -> Option<String> {
    match args {
        [x] => Some(format!("{}--", x)),
        [x, n] => Some(format!("{} -= {}", x, n)),
        _ => None,
    }
}

fn abs(args: &[String]) -> Option<String> {
    match args {
        [x] => Some(format!("Math.Abs({})", x)),
        _ => None,
    }
}

fn size_of(args: &[String]) -> Option<String> {
    match args {
        [x] => Some(format!("sizeof({})", x)),
        _ => None,
    }
}

fn release(args: &[String]) -> Option<String> {
    match args {
        [x] => Some(format!("{} = null", x)),
        _ => None,
    }
}

fn get_mem(args: &[String]) -> Option<String> {
    match args {
        [p, n] => Some(format!("{} = new byte[{}]", p, n)),
        _ => None,
    }
}

fn int_to_str(args: &[String]) -> Option<String> {
    match args {
        [x] => Some(format!("{}.ToString()", x)),
        _ => None,
    }
}

fn str_proc(args: &[String]) -> Option<String> {
    match args {
        [value, target] => Some(format!("{} = {}.ToString().Replace(',', '.')", target, value)),
        _ => None,
    }
}

fn trim(args: &[String]) -> Option<String> {
    match args {
        [s] => Some(format!("{}.Trim()", s)),
        _ => None,
    }
}

fn upper_case(args: &[String]) -> Option<String> {
    match args {
        [s] => Some(format!("{}.ToUpper()", s)),
        _ => None,
    }
}

fn lower_case(args: &[String]) -> Option<String> {
    match args {
        [s] => Some(format!("{}.ToLower()", s)),
        _ => None,
    }
}

const CALL_RULES: &[(&str, CallRewrite)] = &[
    ("StringReplace", replace_call),
    ("SameText", same_text),
    ("AnsiSameText", same_text),
    ("IfThen", if_then),
    ("AnsiStartsText", starts_text),
    ("AnsiEndsText", ends_text),
    ("Copy", copy),
    ("Length", length),
    ("Inc", inc),
    ("Dec", dec),
    ("Abs", abs),
    ("SizeOf", size_of),
    ("FreeAndNil", release),
    ("FreeMem", release),
    ("GetMem", get_mem),
    ("IntToStr", int_to_str),
    ("Str", str_proc),
    ("Trim", trim),
    ("UpperCase", upper_case),
    ("LowerCase", lower_case),
];

const TEXT_RULES: &[(&str, &str)] = &[
    (r"^(?P<x>.+)\.(?i:free)(?:\(\))?$", "$x = null"),
    (r"!!", ""),
    (r"\bnew (?:TFileStream|System\.IO\.FileStream)\((?P<f>[^,()]+), fmCreate\)", "System.IO.File.Create($f)"),
    (r"\b(?i:self)\b", "this"),
    (r"\bTStringList\b", "List<string>"),
    (r"\bTObjectList\b", "List<object>"),
    (r"\bTList\b", "List<object>"),
    (r"\bTMemoryStream\b", "MemoryStream"),
    (r"\bTFileStream\b", "System.IO.FileStream"),
    (r"\bTStream\b", "System.IO.Stream"),
];

static DEFAULT_TEXT_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    TEXT_RULES
        .iter()
        .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, *replacement)))
        .collect()
});

impl Default for TableRewriter {
    fn default() -> Self {
        TableRewriter {
            calls: CALL_RULES
                .iter()
                .map(|&(name, rewrite)| CallRule { name, rewrite })
                .collect(),
            texts: DEFAULT_TEXT_RULES
                .iter()
                .map(|(pattern, replacement)| TextRule {
                    pattern: pattern.clone(),
                    replacement,
                })
                .collect(),
        }
    }
}

impl TableRewriter {
    /// An empty table; rules are added with [`Self::with_call`] and [`Self::with_text`].
    pub fn empty() -> Self {
        TableRewriter {
            calls: Vec::new(),
            texts: Vec::new(),
        }
    }

    /// Appends a call rule. Rules added earlier take precedence.
    pub fn with_call(mut self, name: &'static str, rewrite: CallRewrite) -> Self {
        self.calls.push(CallRule { name, rewrite });
        self
    }

    /// Appends a text rule.
    pub fn with_text(mut self, pattern: Regex, replacement: &'static str) -> Self {
        self.texts.push(TextRule { pattern, replacement });
        self
    }

    fn call_rule(&self, name: &str) -> Option<&CallRule> {
        self.calls.iter().find(|rule| rule.name.eq_ignore_ascii_case(name))
    }

    /// Rewrites known calls anywhere in `text`, innermost arguments first.
    fn rewrite_calls(&self, text: &str) -> String {
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            if c == b'"' || c == b'\'' {
                let end = skip_literal(bytes, i);
                out.push_str(&text[i..end]);
                i = end;
                continue;
            }
            let starts_word = (c.is_ascii_alphabetic() || c == b'_')
                && (i == 0 || !is_word_byte(bytes[i - 1]) && bytes[i - 1] != b'.');
            if !starts_word {
                // copy one whole character
                let len = text[i..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&text[i..i + len]);
                i += len;
                continue;
            }
            let mut end = i;
            while end < bytes.len() && is_word_byte(bytes[end]) {
                end += 1;
            }
            let name = &text[i..end];
            if let Some(rule) = self.call_rule(name)
                && bytes.get(end) == Some(&b'(')
                && let Some(close) = matching_paren(bytes, end)
            {
                let args: Vec<String> = split_params(&text[end + 1..close])
                    .iter()
                    .map(|arg| self.rewrite_calls(arg))
                    .collect();
                match (rule.rewrite)(&args) {
                    Some(rewritten) => out.push_str(&rewritten),
                    None => {
                        out.push_str(name);
                        out.push('(');
                        out.push_str(&args.join(", "));
                        out.push(')');
                    }
                }
                i = close + 1;
                continue;
            }
            out.push_str(name);
            i = end;
        }
        out
    }

    /// Applies the text rules to the parts of `text` outside string literals.
    fn rewrite_text(&self, text: &str) -> String {
        let mut current = text.to_string();
        for rule in &self.texts {
            current = map_code(&current, |code| {
                rule.pattern.replace_all(code, rule.replacement).into_owned()
            });
        }
        current
    }
}

impl IdiomRewriter for TableRewriter {
    fn rewrite(&self, text: &str) -> String {
        let calls = self.rewrite_calls(text);
        self.rewrite_text(&calls)
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Index just past the literal starting at `start`, honouring backslash escapes.
fn skip_literal(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Index of the `)` closing the `(` at `open`.
fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_literal(bytes, i);
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return (bytes[i] == b')').then_some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Splits an argument list on top-level commas, respecting quotes and nesting.
pub fn split_params(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut params = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_literal(bytes, i);
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                params.push(text[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    let last = text[start..].trim();
    if !last.is_empty() || !params.is_empty() {
        params.push(last.to_string());
    }
    params
}

/// Applies `f` to each run of text outside string literals.
fn map_code(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut code_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'"' || bytes[i] == b'\'' {
            out.push_str(&f(&text[code_start..i]));
            let end = skip_literal(bytes, i);
            out.push_str(&text[i..end]);
            i = end;
            code_start = end;
            continue;
        }
        i += 1;
    }
    if code_start == 0 {
        return f(text);
    }
    out.push_str(&f(&text[code_start..]));
    out
}
