//! Statement lowering.
//!
//! Mostly structural. The exceptions are `with`, which becomes a fresh local followed
//! by its body; `exit`, which returns the result holder; and `inherited`, whose shape
//! depends on the kind of routine it appears in. A `Break` inside a `case` inside a
//! loop jumps to a label after the loop, since a C# `break` would only leave the
//! switch.

use log::trace;

use crate::ast::*;
use crate::target::*;

use super::{Breakable, Lowerer};

impl Lowerer<'_> {
    pub(crate) fn lower_stmts(&mut self, stmts: &[Stmt], out: &mut Vec<CsStmt>) {
        for stmt in stmts {
            self.lower_stmt(stmt, out);
        }
    }

    fn lower_block(&mut self, stmts: &[Stmt]) -> Vec<CsStmt> {
        let mut out = Vec::with_capacity(stmts.len());
        self.lower_stmts(stmts, &mut out);
        out
    }

    fn lower_stmt(&mut self, stmt: &Stmt, out: &mut Vec<CsStmt>) {
        let lowered = match &stmt.kind {
            StmtKind::Block(stmts) => CsStmt::Block(self.lower_block(stmts)),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => CsStmt::If {
                cond: self.lower_expr(cond),
                then_branch: self.lower_block(then_branch),
                else_branch: self.lower_block(else_branch),
            },
            StmtKind::While { cond, body } => {
                let cond = self.lower_expr(cond);
                let (body, exit) = self.lower_loop_body(body);
                self.push_loop(CsStmt::While { cond, body }, exit, out);
                return;
            }
            StmtKind::For {
                var,
                from,
                to,
                direction,
                body,
            } => {
                let var = self.lower_expr(var);
                let from = self.lower_expr(from);
                let to = self.lower_expr(to);
                let (body, exit) = self.lower_loop_body(body);
                let lowered = CsStmt::For {
                    var,
                    from,
                    to,
                    down: *direction == ForDirection::Down,
                    body,
                };
                self.push_loop(lowered, exit, out);
                return;
            }
            StmtKind::Repeat { body, until } => {
                let (body, exit) = self.lower_loop_body(body);
                let cond = CsExpr::Unary {
                    op: CsUnaryOp::Not,
                    operand: Box::new(self.lower_expr(until)),
                };
                self.push_loop(CsStmt::DoWhile { body, cond }, exit, out);
                return;
            }
            StmtKind::Case {
                subject,
                arms,
                default,
            } => {
                let subject = self.lower_expr(subject);
                self.breakables.push(Breakable::Switch);
                let cases = arms
                    .iter()
                    .map(|arm| CsCase {
                        labels: arm.values.iter().map(|v| self.lower_expr(v)).collect(),
                        body: self.lower_block(&arm.body),
                    })
                    .collect();
                let default = self.lower_block(default);
                self.breakables.pop();
                CsStmt::Switch {
                    subject,
                    cases,
                    default,
                }
            }
            StmtKind::Assign { target, value } => CsStmt::Assign {
                target: self.lower_assign_target(target),
                value: self.lower_expr(value),
            },
            StmtKind::Try {
                body,
                handlers,
                else_handler,
                untyped_handler,
                finally,
            } => {
                let catches = handlers
                    .iter()
                    .map(|handler| CsCatch {
                        ty: self
                            .lower_type_ref(&handler.exception_type)
                            .unwrap_or_else(|| CsType::named("Exception")),
                        var: handler.var_name.clone(),
                        body: self.lower_block(&handler.body),
                    })
                    .collect();
                CsStmt::Try {
                    body: self.lower_block(body),
                    catches,
                    catch_all: else_handler
                        .as_ref()
                        .or(untyped_handler.as_ref())
                        .map(|stmts| self.lower_block(stmts)),
                    finally: finally.as_ref().map(|stmts| self.lower_block(stmts)),
                }
            }
            StmtKind::With { subjects, body } => {
                self.lower_with(subjects, body, out);
                return;
            }
            StmtKind::Raise(value) => CsStmt::Throw(value.as_ref().map(|v| self.lower_expr(v))),
            StmtKind::Call(call) => self.lower_call_stmt(call),
            StmtKind::Inherited(call) => match self.lower_inherited(call.as_ref(), stmt) {
                Some(lowered) => lowered,
                None => return,
            },
            StmtKind::LocalVar(id) => {
                let ast = self.ast;
                let DeclKind::Var(var) = &ast.get(*id).kind else {
                    return;
                };
                self.lower_local_var(*id, var)
            }
        };
        out.push(lowered);
    }

    /// Lowers a loop body. Also returns the exit label when a `Break` in the body
    /// needed one.
    fn lower_loop_body(&mut self, body: &[Stmt]) -> (Vec<CsStmt>, Option<String>) {
        self.breakables.push(Breakable::Loop { exit: None });
        let body = self.lower_block(body);
        let exit = match self.breakables.pop() {
            Some(Breakable::Loop { exit }) => exit,
            _ => None,
        };
        (body, exit)
    }

    fn push_loop(&mut self, lowered: CsStmt, exit: Option<String>, out: &mut Vec<CsStmt>) {
        out.push(lowered);
        if let Some(label) = exit {
            out.push(CsStmt::Label(label));
        }
    }

    /// `Break` leaves the innermost loop. Between that loop and here a `case` turns
    /// it into a jump to the loop's exit label.
    fn lower_break(&mut self) -> CsStmt {
        let Some(index) = self
            .breakables
            .iter()
            .rposition(|b| matches!(b, Breakable::Loop { .. }))
        else {
            return CsStmt::Break;
        };
        if index + 1 == self.breakables.len() {
            return CsStmt::Break;
        }
        if let Breakable::Loop { exit: Some(label) } = &self.breakables[index] {
            return CsStmt::Goto(label.clone());
        }
        let label = self.next_exit_label();
        self.breakables[index] = Breakable::Loop {
            exit: Some(label.clone()),
        };
        CsStmt::Goto(label)
    }

    /// `with a, b do body` becomes `var with1 = a; var with2 = b;` followed by the body.
    /// Names inside the body are not redirected to the locals.
    fn lower_with(&mut self, subjects: &[Expr], body: &[Stmt], out: &mut Vec<CsStmt>) {
        for subject in subjects {
            let name = self.next_with_name();
            trace!("with subject -> {}", name);
            let ty = self.lower_expr_type(subject.ty);
            out.push(CsStmt::Local {
                name,
                ty,
                value: Some(self.lower_expr(subject)),
            });
        }
        match body {
            [
                Stmt {
                    kind: StmtKind::Block(inner),
                    ..
                },
            ] => self.lower_stmts(inner, out),
            _ => self.lower_stmts(body, out),
        }
    }

    /// Assigning to the enclosing function's own name sets its result.
    fn lower_assign_target(&mut self, target: &Expr) -> CsExpr {
        if let ExprKind::Name(r) = &target.kind
            && let Some(id) = r.decl
            && self.routine.as_ref().is_some_and(|ctx| ctx.is_self(id))
        {
            return CsExpr::name("Result");
        }
        self.lower_expr(target)
    }

    /// A call statement; `Exit`, `Break` and `Continue` become control flow.
    fn lower_call_stmt(&mut self, call: &Expr) -> CsStmt {
        let (callee, args) = match &call.kind {
            ExprKind::Call { base, args } => (base.as_ref(), args.as_slice()),
            _ => (call, &[][..]),
        };
        if callee.decl().is_none() {
            if callee.is_name("Exit") {
                let value = match args.first() {
                    Some(value) => Some(self.lower_expr(value)),
                    None => self.result_holder(),
                };
                return CsStmt::Return(value);
            }
            if callee.is_name("Break") && args.is_empty() {
                return self.lower_break();
            }
            if callee.is_name("Continue") && args.is_empty() {
                return CsStmt::Continue;
            }
        }
        CsStmt::Expr(self.lower_expr(call))
    }

    /// `Result` inside a function, nothing elsewhere.
    fn result_holder(&self) -> Option<CsExpr> {
        self.routine
            .as_ref()
            .filter(|ctx| ctx.returns_value)
            .map(|_| CsExpr::name("Result"))
    }

    /// `inherited` in a constructor becomes its base initializer and produces no
    /// statement; in a destructor it is dropped; elsewhere it calls the base method.
    fn lower_inherited(&mut self, call: Option<&Expr>, stmt: &Stmt) -> Option<CsStmt> {
        let Some(ctx) = self.routine.as_ref() else {
            self.gap("inherited outside a method", stmt.location);
            return None;
        };
        let approach = ctx.approach;
        let (name, args) = match call.map(|c| &c.kind) {
            None => {
                let name = ctx.name.clone();
                let args = ctx.params.iter().map(CsExpr::name).collect();
                (name, args)
            }
            Some(ExprKind::Call { base, args }) => {
                let name = base.ident().map_or_else(|| ctx.name.clone(), str::to_string);
                (name, args.iter().map(|a| self.lower_expr(a)).collect())
            }
            Some(_) => {
                let name = call.and_then(Expr::ident).map_or_else(|| ctx.name.clone(), str::to_string);
                (name, Vec::new())
            }
        };
        match approach {
            Approach::Constructor => {
                if let Some(ctx) = self.routine.as_mut() {
                    ctx.base_call = Some(args);
                }
                None
            }
            Approach::Destructor => None,
            Approach::Procedure | Approach::Function => {
                Some(CsStmt::Expr(CsExpr::call(CsExpr::member(CsExpr::Base, name), args)))
            }
        }
    }
}
