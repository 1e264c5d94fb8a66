//! AST Dumper module
//!
//! Renders the source tree as indented text. Expressions print in prefix form,
//! `(op lhs rhs)`, so operator grouping is visible at a glance.

use std::fmt::Write;

use super::*;

/// Renders an expression in fully grouped prefix form.
pub fn expr_to_string(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

fn write_list(out: &mut String, items: &[Expr]) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expr(out, item);
    }
}

fn write_expr(out: &mut String, expr: &Expr) {
    match &expr.kind {
        ExprKind::Paren(items) => {
            out.push_str("(paren ");
            write_list(out, items);
            out.push(')');
        }
        ExprKind::Brackets(items) => {
            out.push('[');
            write_list(out, items);
            out.push(']');
        }
        ExprKind::Int(v) => {
            let _ = write!(out, "{}", v);
        }
        ExprKind::Hex(v) => {
            let _ = write!(out, "${:X}", v);
        }
        ExprKind::Str(s) => {
            let _ = write!(out, "'{}'", s.replace('\'', "''"));
        }
        ExprKind::Float(v) => {
            let _ = write!(out, "{:?}", v);
        }
        ExprKind::Name(r) => out.push_str(&r.name),
        ExprKind::Member { base, name } => {
            write_expr(out, base);
            out.push('.');
            out.push_str(&name.name);
        }
        ExprKind::Call { base, args } => {
            write_expr(out, base);
            out.push('(');
            write_list(out, args);
            out.push(')');
        }
        ExprKind::Index { base, args } => {
            write_expr(out, base);
            out.push('[');
            write_list(out, args);
            out.push(']');
        }
        ExprKind::Deref { base } => {
            write_expr(out, base);
            out.push('^');
        }
        ExprKind::Unary { op, operand } => {
            let op = match op {
                UnaryOp::Not => "not",
                UnaryOp::Positive => "+",
                UnaryOp::Negative => "-",
                UnaryOp::AddressOf => "@",
            };
            let _ = write!(out, "({} ", op);
            write_expr(out, operand);
            out.push(')');
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let _ = write!(out, "({} ", op.as_str());
            write_expr(out, lhs);
            out.push(' ');
            write_expr(out, rhs);
            out.push(')');
        }
        ExprKind::Symbol(sym) => out.push_str(match sym {
            SpecialSymbol::Nil => "nil",
            SpecialSymbol::True => "true",
            SpecialSymbol::False => "false",
            SpecialSymbol::Null => "null",
        }),
    }
}

/// Dumper for the source tree
pub struct AstDumper<'a> {
    ast: &'a Ast,
    out: String,
    show_bindings: bool,
}

impl<'a> AstDumper<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        AstDumper {
            ast,
            out: String::new(),
            show_bindings: false,
        }
    }

    /// Appends `-> #id` to every reference the resolver has bound.
    pub fn with_bindings(mut self) -> Self {
        self.show_bindings = true;
        self
    }

    pub fn dump(mut self) -> String {
        if let Some(root) = self.ast.root() {
            self.dump_decl(root, 0);
        }
        self.out
    }

    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn ref_text(&self, r: &Ref) -> String {
        let name = if r.name.is_empty() {
            r.decl.map(|d| self.inline_type_text(d)).unwrap_or_default()
        } else {
            r.name.clone()
        };
        match (self.show_bindings, r.decl) {
            (true, Some(id)) if !r.name.is_empty() => format!("{} -> {}", name, id),
            _ => name,
        }
    }

    fn inline_type_text(&self, id: DeclId) -> String {
        let decl = self.ast.get(id);
        if !decl.name.is_empty() {
            return decl.name.clone();
        }
        match &decl.kind {
            DeclKind::Type(TypeDecl::Array { item, .. }) => format!("array of {}", self.ref_text(item)),
            DeclKind::Type(TypeDecl::Set { item }) => format!("set of {}", self.ref_text(item)),
            DeclKind::Type(TypeDecl::Pointer { target }) => format!("^{}", self.ref_text(target)),
            DeclKind::Type(TypeDecl::StringAlias { .. }) => "string".to_string(),
            DeclKind::Type(TypeDecl::Enum { consts }) => {
                let names: Vec<_> = consts.iter().map(|&c| self.ast.name_of(c)).collect();
                format!("({})", names.join(", "))
            }
            DeclKind::Type(TypeDecl::Record { .. }) => "record".to_string(),
            DeclKind::Type(TypeDecl::ProcedureType(_)) => "procedure type".to_string(),
            _ => "?".to_string(),
        }
    }

    fn params_text(&self, params: &[DeclId]) -> String {
        let parts: Vec<String> = params
            .iter()
            .map(|&p| {
                let decl = self.ast.get(p);
                let DeclKind::Param(param) = &decl.kind else {
                    return decl.name.clone();
                };
                let mode = match param.binding {
                    ParamBinding::Copy => "",
                    ParamBinding::Const => "const ",
                    ParamBinding::Var => "var ",
                    ParamBinding::In => "in ",
                    ParamBinding::Out => "out ",
                };
                match &param.type_ref {
                    Some(t) => format!("{}{}: {}", mode, decl.name, self.ref_text(t)),
                    None => format!("{}{}", mode, decl.name),
                }
            })
            .collect();
        parts.join("; ")
    }

    fn dump_decls(&mut self, decls: &[DeclId], depth: usize) {
        for &id in decls {
            self.dump_decl(id, depth);
        }
    }

    fn dump_decl(&mut self, id: DeclId, depth: usize) {
        let decl = self.ast.get(id);
        let name = decl.name.clone();
        match &decl.kind {
            DeclKind::Unit(unit) => {
                let keyword = match unit.kind {
                    UnitKind::Unit => "unit",
                    UnitKind::Program => "program",
                };
                self.line(depth, &format!("{} {}", keyword, name));
                self.line(depth + 1, "interface");
                if !unit.interface_uses.is_empty() {
                    self.line(depth + 2, &format!("uses {}", unit.interface_uses.join(", ")));
                }
                self.dump_decls(&unit.interface, depth + 2);
                self.line(depth + 1, "implementation");
                if !unit.implementation_uses.is_empty() {
                    self.line(depth + 2, &format!("uses {}", unit.implementation_uses.join(", ")));
                }
                self.dump_decls(&unit.implementation, depth + 2);
                if !unit.initialization.is_empty() {
                    self.line(depth + 1, "initialization");
                    self.dump_stmts(&unit.initialization, depth + 2);
                }
                if !unit.finalization.is_empty() {
                    self.line(depth + 1, "finalization");
                    self.dump_stmts(&unit.finalization, depth + 2);
                }
            }
            DeclKind::Type(ty) => self.dump_type(&name, ty, depth),
            DeclKind::Var(var) => {
                let ty = self.ref_text(&var.type_ref);
                let mut text = if ty.is_empty() {
                    format!("var {}", name)
                } else {
                    format!("var {}: {}", name, ty)
                };
                if let Some(init) = &var.initial {
                    text.push_str(&format!(" = {}", expr_to_string(init)));
                }
                self.line(depth, &text);
            }
            DeclKind::Const(c) => {
                let text = match &c.type_ref {
                    Some(t) => format!("const {}: {} = {}", name, self.ref_text(t), expr_to_string(&c.value)),
                    None => format!("const {} = {}", name, expr_to_string(&c.value)),
                };
                self.line(depth, &text);
            }
            DeclKind::Param(_) => {
                let text = format!("param {}", self.params_text(&[id]));
                self.line(depth, &text);
            }
            DeclKind::Procedure(proc) => {
                let keyword = match proc.approach {
                    Approach::Procedure => "procedure",
                    Approach::Function => "function",
                    Approach::Constructor => "constructor",
                    Approach::Destructor => "destructor",
                };
                let mut text = match &proc.in_class {
                    Some(class) => format!("{} {}.{}", keyword, self.ref_text(class), name),
                    None => format!("{} {}", keyword, name),
                };
                text.push_str(&format!("({})", self.params_text(&proc.params)));
                if let Some(ret) = &proc.return_type {
                    text.push_str(&format!(": {}", self.ref_text(ret)));
                }
                if !proc.modifiers.is_empty() {
                    let flags: Vec<String> = proc
                        .modifiers
                        .iter_names()
                        .map(|(flag, _)| flag.to_ascii_lowercase())
                        .collect();
                    text.push_str(&format!(" [{}]", flags.join(" ")));
                }
                self.line(depth, &text);
                let locals = proc.decls.clone();
                let body = proc.body.clone();
                self.dump_decls(&locals, depth + 1);
                if let Some(body) = body {
                    self.line(depth + 1, "begin");
                    self.dump_stmts(&body, depth + 2);
                }
            }
            DeclKind::Property(prop) => {
                let mut text = format!("property {}", name);
                if !prop.index_params.is_empty() {
                    text.push_str(&format!("[{}]", self.params_text(&prop.index_params)));
                }
                if let Some(t) = &prop.type_ref {
                    text.push_str(&format!(": {}", self.ref_text(t)));
                }
                if let Some(r) = &prop.reader {
                    text.push_str(&format!(" read {}", expr_to_string(r)));
                }
                if let Some(w) = &prop.writer {
                    text.push_str(&format!(" write {}", expr_to_string(w)));
                }
                if prop.is_default {
                    text.push_str(" default");
                }
                self.line(depth, &text);
            }
            DeclKind::EnumConst { .. } => self.line(depth, &format!("enumconst {}", name)),
        }
    }

    fn dump_type(&mut self, name: &str, ty: &TypeDecl, depth: usize) {
        match ty {
            TypeDecl::Class(class) => {
                let keyword = if class.is_interface { "interface" } else { "class" };
                let mut heritage: Vec<String> = class.ancestor.iter().map(|a| self.ref_text(a)).collect();
                heritage.extend(class.interfaces.iter().map(|i| self.ref_text(i)));
                let mut text = format!("type {} = {}", name, keyword);
                if !heritage.is_empty() {
                    text.push_str(&format!("({})", heritage.join(", ")));
                }
                if class.forward {
                    text.push_str(" forward");
                }
                self.line(depth, &text);
                let members = class.members.clone();
                self.dump_decls(&members, depth + 1);
            }
            TypeDecl::Record { packed, fields } => {
                let keyword = if *packed { "packed record" } else { "record" };
                self.line(depth, &format!("type {} = {}", name, keyword));
                let fields = fields.clone();
                self.dump_decls(&fields, depth + 1);
            }
            TypeDecl::Enum { consts } => {
                let names: Vec<_> = consts.iter().map(|&c| self.ast.name_of(c)).collect();
                self.line(depth, &format!("type {} = ({})", name, names.join(", ")));
            }
            TypeDecl::Array { ranges, item, .. } => {
                let ranges: Vec<_> = ranges.iter().map(expr_to_string).collect();
                let text = if ranges.is_empty() {
                    format!("type {} = array of {}", name, self.ref_text(item))
                } else {
                    format!("type {} = array[{}] of {}", name, ranges.join(", "), self.ref_text(item))
                };
                self.line(depth, &text);
            }
            TypeDecl::Set { item } => {
                let text = format!("type {} = set of {}", name, self.ref_text(item));
                self.line(depth, &text);
            }
            TypeDecl::Pointer { target } => {
                let text = format!("type {} = ^{}", name, self.ref_text(target));
                self.line(depth, &text);
            }
            TypeDecl::StringAlias { max_len } => {
                let text = match max_len {
                    Some(len) => format!("type {} = string[{}]", name, expr_to_string(len)),
                    None => format!("type {} = string", name),
                };
                self.line(depth, &text);
            }
            TypeDecl::Alias { target } => {
                let text = format!("type {} = {}", name, self.ref_text(target));
                self.line(depth, &text);
            }
            TypeDecl::ProcedureType(sig) => {
                let mut text = format!("type {} = procedure({})", name, self.params_text(&sig.params));
                if let Some(ret) = &sig.return_type {
                    text.push_str(&format!(": {}", self.ref_text(ret)));
                }
                if sig.of_object {
                    text.push_str(" of object");
                }
                self.line(depth, &text);
            }
            TypeDecl::Metaclass { class } => {
                let text = format!("type {} = class of {}", name, self.ref_text(class));
                self.line(depth, &text);
            }
        }
    }

    fn dump_stmts(&mut self, stmts: &[Stmt], depth: usize) {
        for stmt in stmts {
            self.dump_stmt(stmt, depth);
        }
    }

    fn dump_stmt(&mut self, stmt: &Stmt, depth: usize) {
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                self.line(depth, "begin");
                self.dump_stmts(stmts, depth + 1);
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.line(depth, &format!("if {}", expr_to_string(cond)));
                self.dump_stmts(then_branch, depth + 1);
                if !else_branch.is_empty() {
                    self.line(depth, "else");
                    self.dump_stmts(else_branch, depth + 1);
                }
            }
            StmtKind::While { cond, body } => {
                self.line(depth, &format!("while {}", expr_to_string(cond)));
                self.dump_stmts(body, depth + 1);
            }
            StmtKind::For {
                var,
                from,
                to,
                direction,
                body,
            } => {
                let dir = match direction {
                    ForDirection::Up => "to",
                    ForDirection::Down => "downto",
                };
                self.line(
                    depth,
                    &format!(
                        "for {} := {} {} {}",
                        expr_to_string(var),
                        expr_to_string(from),
                        dir,
                        expr_to_string(to)
                    ),
                );
                self.dump_stmts(body, depth + 1);
            }
            StmtKind::Repeat { body, until } => {
                self.line(depth, "repeat");
                self.dump_stmts(body, depth + 1);
                self.line(depth, &format!("until {}", expr_to_string(until)));
            }
            StmtKind::Case { subject, arms, default } => {
                self.line(depth, &format!("case {}", expr_to_string(subject)));
                for arm in arms {
                    let values: Vec<_> = arm.values.iter().map(expr_to_string).collect();
                    self.line(depth + 1, &format!("{}:", values.join(", ")));
                    self.dump_stmts(&arm.body, depth + 2);
                }
                if !default.is_empty() {
                    self.line(depth + 1, "else");
                    self.dump_stmts(default, depth + 2);
                }
            }
            StmtKind::Assign { target, value } => {
                self.line(
                    depth,
                    &format!("{} := {}", expr_to_string(target), expr_to_string(value)),
                );
            }
            StmtKind::Try {
                body,
                handlers,
                else_handler,
                untyped_handler,
                finally,
            } => {
                self.line(depth, "try");
                self.dump_stmts(body, depth + 1);
                for handler in handlers {
                    let ty = self.ref_text(&handler.exception_type);
                    let text = match &handler.var_name {
                        Some(var) => format!("on {}: {}", var, ty),
                        None => format!("on {}", ty),
                    };
                    self.line(depth, &text);
                    self.dump_stmts(&handler.body, depth + 1);
                }
                if let Some(stmts) = else_handler {
                    self.line(depth, "else");
                    self.dump_stmts(stmts, depth + 1);
                }
                if let Some(stmts) = untyped_handler {
                    self.line(depth, "except");
                    self.dump_stmts(stmts, depth + 1);
                }
                if let Some(stmts) = finally {
                    self.line(depth, "finally");
                    self.dump_stmts(stmts, depth + 1);
                }
            }
            StmtKind::With { subjects, body } => {
                let subjects: Vec<_> = subjects.iter().map(expr_to_string).collect();
                self.line(depth, &format!("with {}", subjects.join(", ")));
                self.dump_stmts(body, depth + 1);
            }
            StmtKind::Raise(value) => match value {
                Some(v) => self.line(depth, &format!("raise {}", expr_to_string(v))),
                None => self.line(depth, "raise"),
            },
            StmtKind::Call(call) => self.line(depth, &format!("call {}", expr_to_string(call))),
            StmtKind::Inherited(call) => match call {
                Some(c) => self.line(depth, &format!("inherited {}", expr_to_string(c))),
                None => self.line(depth, "inherited"),
            },
            StmtKind::LocalVar(id) => self.dump_decl(*id, depth),
        }
    }
}
