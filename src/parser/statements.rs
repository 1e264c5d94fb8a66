//! Statement parsing module
//!
//! Statements are dispatched on their leading keyword; anything else is tried as an
//! assignment and then as a bare call.

use log::trace;

use crate::ast::*;
use crate::diagnostic::ParseError;

use super::Parser;
use super::utils::ParserTransaction;

const STATEMENT_KEYWORDS: &[&str] = &[
    "begin",
    "if",
    "for",
    "while",
    "repeat",
    "case",
    "try",
    "raise",
    "with",
    "inherited",
    "var",
];

/// Parse a statement, or return `None` when nothing statement-shaped starts here.
pub fn parse_statement(parser: &mut Parser) -> Result<Option<Stmt>, ParseError> {
    parser.nested(|parser| {
        let location = parser.position()?;
        let Some(keyword) = parser.cursor.eat_any_word(STATEMENT_KEYWORDS)? else {
            return parse_simple_statement(parser);
        };
        trace!("statement '{}' at {}", STATEMENT_KEYWORDS[keyword], location);

        let kind = match keyword {
            0 => parse_compound_statement(parser)?,
            1 => parse_if_statement(parser)?,
            2 => parse_for_statement(parser)?,
            3 => parse_while_statement(parser)?,
            4 => parse_repeat_statement(parser)?,
            5 => parse_case_statement(parser)?,
            6 => parse_try_statement(parser)?,
            7 => parse_raise_statement(parser)?,
            8 => parse_with_statement(parser)?,
            9 => StmtKind::Inherited(parser.value()?),
            _ => parse_inline_var(parser, location)?,
        };
        Ok(Some(Stmt::new(kind, location)))
    })
}

/// `stmt; stmt; ...`. Empty statements between separators are skipped.
pub fn parse_statement_list(parser: &mut Parser) -> Result<Vec<Stmt>, ParseError> {
    let mut stmts = Vec::new();
    loop {
        if let Some(stmt) = parse_statement(parser)? {
            stmts.push(stmt);
        }
        if !parser.eat_semi()? {
            break;
        }
    }
    Ok(stmts)
}

/// The single (possibly absent) statement after `then`, `else` or `do`.
fn parse_branch(parser: &mut Parser) -> Result<Vec<Stmt>, ParseError> {
    Ok(parse_statement(parser)?.into_iter().collect())
}

/// `begin stmts end`, with `begin` already consumed.
fn parse_compound_statement(parser: &mut Parser) -> Result<StmtKind, ParseError> {
    let body = parse_statement_list(parser)?;
    parser.expect_word("end")?;
    Ok(StmtKind::Block(body))
}

fn parse_if_statement(parser: &mut Parser) -> Result<StmtKind, ParseError> {
    let cond = parser.require_value("condition")?;
    parser.expect_word("then")?;
    let then_branch = parse_branch(parser)?;
    let else_branch = if parser.cursor.eat_word("else")? {
        parse_branch(parser)?
    } else {
        Vec::new()
    };
    Ok(StmtKind::If {
        cond,
        then_branch,
        else_branch,
    })
}

/// `for i := a to|downto b do stmt`
fn parse_for_statement(parser: &mut Parser) -> Result<StmtKind, ParseError> {
    let location = parser.position()?;
    let name = parser.expect_ident("loop variable")?;
    let var = Expr::new(ExprKind::Name(Ref::named(name)), location);
    parser.expect_text(":=")?;
    let from = parser.require_value("start value")?;
    let direction = match parser.cursor.eat_any_word(&["to", "downto"])? {
        Some(0) => ForDirection::Up,
        Some(_) => ForDirection::Down,
        None => return Err(parser.error("expecting 'to' or 'downto'")),
    };
    let to = parser.require_value("end value")?;
    parser.expect_word("do")?;
    let body = parse_branch(parser)?;
    Ok(StmtKind::For {
        var,
        from,
        to,
        direction,
        body,
    })
}

fn parse_while_statement(parser: &mut Parser) -> Result<StmtKind, ParseError> {
    let cond = parser.require_value("condition")?;
    parser.expect_word("do")?;
    let body = parse_branch(parser)?;
    Ok(StmtKind::While { cond, body })
}

fn parse_repeat_statement(parser: &mut Parser) -> Result<StmtKind, ParseError> {
    let body = parse_statement_list(parser)?;
    parser.expect_word("until")?;
    let until = parser.require_value("exit condition")?;
    Ok(StmtKind::Repeat { body, until })
}

/// `case x of v1, v2: stmt; lo..hi: stmt; else stmts end`
fn parse_case_statement(parser: &mut Parser) -> Result<StmtKind, ParseError> {
    let subject = parser.require_value("case subject")?;
    parser.expect_word("of")?;

    let mut arms = Vec::new();
    while let Some(arm) = parse_case_arm(parser)? {
        arms.push(arm);
        if !parser.eat_semi()? {
            break;
        }
    }
    if arms.is_empty() {
        return Err(parser.error("expecting case items"));
    }

    let default = if parser.cursor.eat_word("else")? {
        parse_statement_list(parser)?
    } else {
        Vec::new()
    };
    parser.expect_word("end")?;
    Ok(StmtKind::Case { subject, arms, default })
}

fn parse_case_arm(parser: &mut Parser) -> Result<Option<CaseArm>, ParseError> {
    let mut tx = ParserTransaction::new(parser);
    let Some(first) = tx.value()? else {
        return Ok(None);
    };
    let mut values = vec![first];
    while tx.cursor.eat_text(",")? {
        values.push(tx.require_value("case value")?);
    }
    if !tx.cursor.eat_text(":")? {
        return Ok(None);
    }
    let body = parse_branch(&mut tx)?;
    tx.commit();
    Ok(Some(CaseArm { values, body }))
}

/// `try stmts except [on handlers] [else stmts] | stmts [finally stmts] end`
fn parse_try_statement(parser: &mut Parser) -> Result<StmtKind, ParseError> {
    let body = parse_statement_list(parser)?;
    let mut handlers = Vec::new();
    let mut else_handler = None;
    let mut untyped_handler = None;
    let mut finally = None;

    if parser.cursor.eat_word("except")? {
        while let Some(handler) = parse_except_handler(parser)? {
            handlers.push(handler);
            if !parser.eat_semi()? {
                break;
            }
        }
        if parser.cursor.eat_word("else")? {
            else_handler = Some(parse_statement_list(parser)?);
        } else if handlers.is_empty() {
            untyped_handler = Some(parse_statement_list(parser)?);
        }
    }
    if parser.cursor.eat_word("finally")? {
        finally = Some(parse_statement_list(parser)?);
    }
    parser.expect_word("end")?;

    Ok(StmtKind::Try {
        body,
        handlers,
        else_handler,
        untyped_handler,
        finally,
    })
}

/// `on [E:] EType do stmt`
fn parse_except_handler(parser: &mut Parser) -> Result<Option<ExceptHandler>, ParseError> {
    if !parser.cursor.eat_word("on")? {
        return Ok(None);
    }
    let first = parser.expect_ident("exception type")?;
    let (var_name, type_name) = if parser.cursor.eat_text(":")? {
        (Some(first), parser.expect_qualified_ident("exception type")?)
    } else {
        (None, first)
    };
    parser.expect_word("do")?;
    let body = parse_branch(parser)?;
    Ok(Some(ExceptHandler {
        var_name,
        exception_type: Ref::named(type_name),
        body,
    }))
}

/// `raise [expr [at addr]]`
fn parse_raise_statement(parser: &mut Parser) -> Result<StmtKind, ParseError> {
    let value = parser.value()?;
    if value.is_some() && parser.cursor.eat_word("at")? {
        parser.require_value("raise address")?;
    }
    Ok(StmtKind::Raise(value))
}

/// `with a, b do stmt`
fn parse_with_statement(parser: &mut Parser) -> Result<StmtKind, ParseError> {
    let mut subjects = vec![parser.require_value("with subject")?];
    while parser.cursor.eat_text(",")? {
        subjects.push(parser.require_value("with subject")?);
    }
    parser.expect_word("do")?;
    let body = parse_branch(parser)?;
    Ok(StmtKind::With { subjects, body })
}

/// `var x[: T] := v` inside a statement list.
fn parse_inline_var(parser: &mut Parser, location: crate::source::Position) -> Result<StmtKind, ParseError> {
    let name = parser.expect_ident("variable name")?;
    let type_ref = if parser.cursor.eat_text(":")? {
        parser.type_ref()?
    } else {
        Ref::default()
    };
    let initial = if parser.cursor.eat_text(":=")? {
        Some(parser.require_value("initial value")?)
    } else {
        None
    };
    let decl = Decl::new(
        name,
        DeclKind::Var(VarDecl {
            type_ref,
            initial,
            inline: true,
        }),
        location,
    );
    Ok(StmtKind::LocalVar(parser.ast.push(decl)))
}

/// Assignment `target := value`, or a call statement.
fn parse_simple_statement(parser: &mut Parser) -> Result<Option<Stmt>, ParseError> {
    let location = parser.position()?;
    let Some(target) = parser.complex()? else {
        return Ok(None);
    };
    let kind = if parser.cursor.eat_text(":=")? {
        let value = parser.require_value("assigned value")?;
        StmtKind::Assign { target, value }
    } else {
        StmtKind::Call(target)
    };
    Ok(Some(Stmt::new(kind, location)))
}

impl Parser<'_> {
    pub(crate) fn parse_stmts(&mut self) -> Result<Vec<Stmt>, ParseError> {
        parse_statement_list(self)
    }
}
