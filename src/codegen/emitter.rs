//! Renders a [`CsTree`] as C# source text.
//!
//! The emitter walks the tree from its root namespace and writes into a `String`
//! buffer. Statement lists are written through [`Emitter::codes`], whose
//! [`CodesStyle`] decides whether a list gets braces and whether its statements are
//! indented. Every rendered expression and type name passes through the configured
//! [`IdiomRewriter`] before it reaches the buffer.

use std::fmt::{self, Write};

use log::{debug, trace};
use thiserror::Error;

use crate::target::*;

use super::idiom::{IdiomRewriter, TableRewriter};

/// Layout of a statement list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodesStyle {
    /// Always braced and indented.
    Block,
    /// Braces for several statements; a single statement goes on an indented line.
    BlockOrIndentedLine,
    /// Braces for several statements; a single statement stays at the current depth.
    BlockOrUnindentedLine,
    /// Never braced, never indented.
    LinesOnly,
}

/// Emitter settings.
pub struct EmitConfig {
    /// One level of indentation.
    pub indent: String,
    pub rewriter: Box<dyn IdiomRewriter>,
}

impl Default for EmitConfig {
    fn default() -> Self {
        EmitConfig {
            indent: "    ".to_string(),
            rewriter: Box::new(TableRewriter::default()),
        }
    }
}

impl fmt::Debug for EmitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmitConfig")
            .field("indent", &self.indent)
            .finish_non_exhaustive()
    }
}

impl EmitConfig {
    pub fn with_rewriter(mut self, rewriter: impl IdiomRewriter + 'static) -> Self {
        self.rewriter = Box::new(rewriter);
        self
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }
}

/// Emission failures. These indicate a malformed tree, not a problem in the input unit.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("the tree has no root namespace")]
    MissingRoot,
    #[error("{found} '{name}' cannot appear {context}")]
    Unexpected {
        name: String,
        found: &'static str,
        context: &'static str,
    },
    #[error("formatting failed")]
    Fmt(#[from] fmt::Error),
}

fn kind_name(kind: &CsDeclKind) -> &'static str {
    match kind {
        CsDeclKind::Namespace(_) => "namespace",
        CsDeclKind::Enum { .. } => "enum",
        CsDeclKind::EnumConst => "enum constant",
        CsDeclKind::Alias { .. } => "alias",
        CsDeclKind::Class(_) => "class",
        CsDeclKind::Delegate { .. } => "delegate",
        CsDeclKind::Method(_) => "method",
        CsDeclKind::Param(_) => "parameter",
        CsDeclKind::Field(_) => "field",
        CsDeclKind::Property(_) => "property",
    }
}

fn unexpected(decl: &CsDecl, context: &'static str) -> EmitError {
    EmitError::Unexpected {
        name: decl.name.clone(),
        found: kind_name(&decl.kind),
        context,
    }
}

fn visibility_prefix(visibility: CsVisibility) -> String {
    visibility.keyword().map(|k| format!("{} ", k)).unwrap_or_default()
}

fn modifiers(flags: MemberFlags) -> String {
    let mut text = String::new();
    for (flag, keyword) in [
        (MemberFlags::STATIC, "static "),
        (MemberFlags::ABSTRACT, "abstract "),
        (MemberFlags::OVERRIDE, "override "),
        (MemberFlags::VIRTUAL, "virtual "),
        (MemberFlags::EXTERN, "extern "),
    ] {
        if flags.contains(flag) {
            text.push_str(keyword);
        }
    }
    text
}

fn is_create(name: &str) -> bool {
    name.eq_ignore_ascii_case("Create")
}

/// Whether control cannot fall out of the end of `stmts`.
fn ends_in_jump(stmts: &[CsStmt]) -> bool {
    match stmts.last() {
        Some(CsStmt::Return(_) | CsStmt::Throw(_) | CsStmt::Break | CsStmt::Continue | CsStmt::Goto(_)) => true,
        Some(CsStmt::Block(inner)) => ends_in_jump(inner),
        _ => false,
    }
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        let code = c as u32;
        if code > 0xFFFF {
            out.push_str(&format!("\\U{:08X}", code));
        } else if !(32..=126).contains(&code) || c == '"' || c == '\\' {
            out.push_str(&format!("\\x{:04X}", code));
        } else {
            out.push(c);
        }
    }
    out.push('"');
    out
}

/// A C# double literal. Integral values keep a fraction or an exponent so they never
/// read as integer literals.
fn float_text(value: f64) -> String {
    if value.is_nan() {
        "double.NaN".to_string()
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "Positive" } else { "Negative" };
        format!("double.{}Infinity", sign)
    } else if value.fract() != 0.0 {
        format!("{}", value)
    } else if value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{:e}", value)
    }
}

fn binding(expr: &CsExpr) -> u8 {
    match expr {
        CsExpr::Binary { op, .. } => op.precedence(),
        CsExpr::Unary { .. } | CsExpr::Cast { .. } => 13,
        _ => 14,
    }
}

/// Renders `tree` with `config`.
pub fn emit(tree: &CsTree, config: &EmitConfig) -> Result<String, EmitError> {
    Emitter::new(tree, config).emit()
}

pub struct Emitter<'a> {
    tree: &'a CsTree,
    config: &'a EmitConfig,
    out: String,
    depth: usize,
    /// Name and kind of the class whose members are being written.
    class: Option<(String, ClassKind)>,
}

impl<'a> Emitter<'a> {
    pub fn new(tree: &'a CsTree, config: &'a EmitConfig) -> Self {
        Emitter {
            tree,
            config,
            out: String::new(),
            depth: 0,
            class: None,
        }
    }

    pub fn emit(mut self) -> Result<String, EmitError> {
        let root = self.tree.root().ok_or(EmitError::MissingRoot)?;
        self.namespace(root)?;
        debug!("emitted {} bytes of C#", self.out.len());
        Ok(self.out)
    }

    /// Text written so far.
    pub fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, text: impl AsRef<str>) -> Result<(), EmitError> {
        for _ in 0..self.depth {
            self.out.push_str(&self.config.indent);
        }
        writeln!(self.out, "{}", text.as_ref())?;
        Ok(())
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Runs `f` against an empty buffer at `depth` and returns what it wrote. The
    /// outer buffer and depth are restored whether or not `f` succeeds.
    fn capture(
        &mut self,
        depth: usize,
        f: impl FnOnce(&mut Self) -> Result<(), EmitError>,
    ) -> Result<String, EmitError> {
        let saved_out = std::mem::take(&mut self.out);
        let saved_depth = std::mem::replace(&mut self.depth, depth);
        let result = f(self);
        let captured = std::mem::replace(&mut self.out, saved_out);
        self.depth = saved_depth;
        result.map(|()| captured)
    }

    fn namespace(&mut self, id: TargetDeclId) -> Result<(), EmitError> {
        let tree = self.tree;
        let decl = tree.get(id);
        let CsDeclKind::Namespace(ns) = &decl.kind else {
            return Err(unexpected(decl, "as the root"));
        };
        debug!("emitting namespace {}", decl.name);
        self.line(format!("namespace {}", decl.name))?;
        self.line("{")?;
        self.depth += 1;

        let mut header = false;
        for using in &ns.usings {
            self.line(format!("using {};", using))?;
            header = true;
        }
        let mut body = Vec::with_capacity(ns.members.len());
        for &member in &ns.members {
            let member_decl = tree.get(member);
            match &member_decl.kind {
                CsDeclKind::Alias { target } => {
                    let target = self.type_text(target);
                    self.line(format!("using {} = {};", member_decl.name, target))?;
                    header = true;
                }
                _ => body.push(member),
            }
        }
        if header && !body.is_empty() {
            self.blank();
        }
        for (i, &member) in body.iter().enumerate() {
            if i > 0 {
                self.blank();
            }
            self.type_decl(member)?;
        }

        self.depth -= 1;
        self.line("}")
    }

    fn type_decl(&mut self, id: TargetDeclId) -> Result<(), EmitError> {
        let tree = self.tree;
        let decl = tree.get(id);
        trace!("emitting {} {}", kind_name(&decl.kind), decl.name);
        let visibility = visibility_prefix(decl.visibility);
        match &decl.kind {
            CsDeclKind::Enum { consts } => {
                let mut names = Vec::with_capacity(consts.len());
                for &c in consts {
                    let item = tree.get(c);
                    if !matches!(item.kind, CsDeclKind::EnumConst) {
                        return Err(unexpected(item, "in an enum"));
                    }
                    names.push(item.name.as_str());
                }
                self.line(format!("{}enum {} {{ {} }}", visibility, decl.name, names.join(", ")))
            }
            CsDeclKind::Class(class) => self.class(decl, class),
            CsDeclKind::Delegate { params, return_type } => {
                let ret = self.return_text(return_type.as_ref());
                let params = self.params(params)?;
                self.line(format!("{}delegate {} {}({});", visibility, ret, decl.name, params))
            }
            _ => Err(unexpected(decl, "in a namespace")),
        }
    }

    fn class(&mut self, decl: &CsDecl, class: &CsClass) -> Result<(), EmitError> {
        let keyword = match class.kind {
            ClassKind::Class => "class",
            ClassKind::Struct => "struct",
            ClassKind::Interface => "interface",
            ClassKind::Static => "static class",
        };
        let mut header = format!("{}{} {}", visibility_prefix(decl.visibility), keyword, decl.name);
        if !class.bases.is_empty() {
            let bases: Vec<String> = class.bases.iter().map(|b| self.type_text(b)).collect();
            header.push_str(" : ");
            header.push_str(&bases.join(", "));
        }
        self.line(header)?;
        self.line("{")?;
        self.depth += 1;
        let saved = self.class.replace((decl.name.clone(), class.kind));

        let tree = self.tree;
        for (i, &member) in class.members.iter().enumerate() {
            let spaced = match &tree.get(member).kind {
                CsDeclKind::Method(method) => method.body.is_some(),
                CsDeclKind::Class(_) | CsDeclKind::Enum { .. } | CsDeclKind::Delegate { .. } => true,
                _ => false,
            };
            if i > 0 && spaced {
                self.blank();
            }
            self.member(member)?;
        }

        self.class = saved;
        self.depth -= 1;
        self.line("}")
    }

    fn member(&mut self, id: TargetDeclId) -> Result<(), EmitError> {
        let tree = self.tree;
        let decl = tree.get(id);
        match &decl.kind {
            CsDeclKind::Field(field) => self.field(decl, field),
            CsDeclKind::Property(property) => self.property(decl, property),
            CsDeclKind::Method(method) => self.method(decl, method),
            CsDeclKind::Class(_) | CsDeclKind::Enum { .. } | CsDeclKind::Delegate { .. } => self.type_decl(id),
            _ => Err(unexpected(decl, "in a class")),
        }
    }

    fn in_interface(&self) -> bool {
        matches!(self.class, Some((_, ClassKind::Interface)))
    }

    fn field(&mut self, decl: &CsDecl, field: &CsField) -> Result<(), EmitError> {
        let mut text = visibility_prefix(decl.visibility);
        if field.flags.contains(MemberFlags::CONST) {
            text.push_str("const ");
        } else if field.flags.contains(MemberFlags::STATIC) {
            text.push_str("static ");
        }
        text.push_str(&self.type_or(field.ty.as_ref(), "object"));
        text.push(' ');
        text.push_str(&decl.name);
        if let Some(initial) = &field.initial {
            text.push_str(" = ");
            text.push_str(&self.expr(initial));
        }
        text.push(';');
        self.line(text)
    }

    fn property(&mut self, decl: &CsDecl, property: &CsProperty) -> Result<(), EmitError> {
        let mut text = String::new();
        if !self.in_interface() {
            text.push_str(&visibility_prefix(decl.visibility));
            if property.flags.contains(MemberFlags::STATIC) {
                text.push_str("static ");
            }
        }
        text.push_str(&self.type_or(property.ty.as_ref(), "object"));
        text.push(' ');
        if property.params.is_empty() {
            text.push_str(&decl.name);
        } else {
            text.push_str(&format!("this[{}]", self.params(&property.params)?));
        }

        let mut accessors = Vec::new();
        if let Some(getter) = &property.getter {
            accessors.push(format!("get {{ return {}; }}", self.expr(getter)));
        }
        if let Some(setter) = &property.setter {
            accessors.push(format!("set {{ {} }}", self.inline_stmt(setter)?));
        }
        if accessors.is_empty() {
            text.push_str(" { get; set; }");
        } else {
            text.push_str(&format!(" {{ {} }}", accessors.join(" ")));
        }
        self.line(text)
    }

    fn method(&mut self, decl: &CsDecl, method: &CsMethod) -> Result<(), EmitError> {
        let class_name = self
            .class
            .as_ref()
            .map_or_else(|| decl.name.clone(), |(name, _)| name.clone());
        let params = self.params(&method.params)?;
        let visibility = visibility_prefix(decl.visibility);

        let header = match method.kind {
            MethodKind::Normal => {
                let ret = self.return_text(method.return_type.as_ref());
                if self.in_interface() {
                    format!("{} {}({})", ret, decl.name, params)
                } else {
                    if method.flags.contains(MemberFlags::EXTERN)
                        && let Some(lib) = &method.extern_lib
                    {
                        self.line(format!("[DllImport({})]", quote(lib)))?;
                    }
                    format!("{}{}{} {}({})", visibility, modifiers(method.flags), ret, decl.name, params)
                }
            }
            MethodKind::Constructor => {
                let mut header = format!("{}{}({})", visibility, class_name, params);
                if let Some(args) = &method.base_call {
                    header.push_str(&format!(" : base({})", self.args(args)));
                }
                header
            }
            MethodKind::Destructor => format!("~{}()", class_name),
            MethodKind::StaticConstructor => format!("static {}()", class_name),
            MethodKind::Main => "static void Main()".to_string(),
        };

        match &method.body {
            None => self.line(format!("{};", header)),
            Some(body) => {
                self.line(header)?;
                self.codes(body, CodesStyle::Block)
            }
        }
    }

    fn params(&self, ids: &[TargetDeclId]) -> Result<String, EmitError> {
        let mut params = Vec::with_capacity(ids.len());
        for &id in ids {
            let decl = self.tree.get(id);
            let CsDeclKind::Param(param) = &decl.kind else {
                return Err(unexpected(decl, "in a parameter list"));
            };
            let mut text = String::new();
            if param.mode == ParamMode::Ref {
                text.push_str("ref ");
            }
            text.push_str(&self.type_or(param.ty.as_ref(), "object"));
            text.push(' ');
            text.push_str(&decl.name);
            if let Some(default) = &param.default {
                text.push_str(" = ");
                text.push_str(&self.expr(default));
            }
            params.push(text);
        }
        Ok(params.join(", "))
    }

    /// Writes a statement list in `style`.
    pub fn codes(&mut self, stmts: &[CsStmt], style: CodesStyle) -> Result<(), EmitError> {
        if let [CsStmt::Block(inner)] = stmts {
            self.line("{")?;
            self.depth += 1;
            self.codes(inner, CodesStyle::LinesOnly)?;
            self.depth -= 1;
            return self.line("}");
        }

        let single = stmts.len() <= 1;
        let (braced, indented) = if single {
            (
                style == CodesStyle::Block,
                matches!(style, CodesStyle::Block | CodesStyle::BlockOrIndentedLine),
            )
        } else {
            (style != CodesStyle::LinesOnly, style != CodesStyle::LinesOnly)
        };

        if braced {
            self.line("{")?;
        }
        if indented {
            self.depth += 1;
        }
        if stmts.is_empty() && !braced {
            self.line(";")?;
        }
        for stmt in stmts {
            self.stmt(stmt)?;
        }
        if indented {
            self.depth -= 1;
        }
        if braced {
            self.line("}")?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &CsStmt) -> Result<(), EmitError> {
        match stmt {
            CsStmt::Block(inner) => {
                self.line("{")?;
                self.depth += 1;
                self.codes(inner, CodesStyle::LinesOnly)?;
                self.depth -= 1;
                self.line("}")
            }
            CsStmt::Expr(expr) => self.line(format!("{};", self.expr(expr))),
            CsStmt::Assign { target, value } => {
                self.line(format!("{} = {};", self.expr(target), self.expr(value)))
            }
            CsStmt::Local { name, ty, value } => {
                let ty = match (ty, value) {
                    (Some(ty), _) => self.type_text(ty),
                    (None, Some(_)) => "var".to_string(),
                    (None, None) => "object".to_string(),
                };
                match value {
                    Some(value) => self.line(format!("{} {} = {};", ty, name, self.expr(value))),
                    None => self.line(format!("{} {};", ty, name)),
                }
            }
            CsStmt::LocalFunction {
                name,
                params,
                return_type,
                body,
            } => self.local_function(name, params, return_type.as_ref(), body),
            CsStmt::If {
                cond,
                then_branch,
                else_branch,
            } => self.if_stmt(cond, then_branch, else_branch, ""),
            CsStmt::While { cond, body } => {
                self.line(format!("while ({})", self.expr(cond)))?;
                self.codes(body, CodesStyle::BlockOrIndentedLine)
            }
            CsStmt::DoWhile { body, cond } => {
                self.line("do")?;
                self.codes(body, CodesStyle::Block)?;
                self.line(format!("while ({});", self.expr(cond)))
            }
            CsStmt::For {
                var,
                from,
                to,
                down,
                body,
            } => {
                let var = self.expr(var);
                let (compare, step) = if *down { (">=", "--") } else { ("<=", "++") };
                self.line(format!(
                    "for ({var} = {}; {var} {compare} {}; {var}{step})",
                    self.expr(from),
                    self.expr(to)
                ))?;
                self.codes(body, CodesStyle::BlockOrIndentedLine)
            }
            CsStmt::Switch {
                subject,
                cases,
                default,
            } => self.switch(subject, cases, default),
            CsStmt::Try {
                body,
                catches,
                catch_all,
                finally,
            } => self.try_stmt(body, catches, catch_all.as_deref(), finally.as_deref()),
            CsStmt::Throw(Some(value)) => self.line(format!("throw {};", self.expr(value))),
            CsStmt::Throw(None) => self.line("throw;"),
            CsStmt::Return(Some(value)) => self.line(format!("return {};", self.expr(value))),
            CsStmt::Return(None) => self.line("return;"),
            CsStmt::Break => self.line("break;"),
            CsStmt::Continue => self.line("continue;"),
            CsStmt::Goto(label) => self.line(format!("goto {};", label)),
            CsStmt::Label(label) => self.line(format!("{}: ;", label)),
        }
    }

    /// Renders `stmt` on a single line, for property accessors.
    fn inline_stmt(&mut self, stmt: &CsStmt) -> Result<String, EmitError> {
        let text = self.capture(0, |e| e.stmt(stmt))?;
        Ok(text.lines().map(str::trim).filter(|l| !l.is_empty()).collect::<Vec<_>>().join(" "))
    }

    fn if_stmt(
        &mut self,
        cond: &CsExpr,
        then_branch: &[CsStmt],
        else_branch: &[CsStmt],
        prefix: &str,
    ) -> Result<(), EmitError> {
        self.line(format!("{}if ({})", prefix, self.expr(cond)))?;
        // a lone inner `if` would capture our `else`
        let then_style = match then_branch {
            [CsStmt::If { else_branch: inner, .. }] if inner.is_empty() && !else_branch.is_empty() => {
                CodesStyle::Block
            }
            _ => CodesStyle::BlockOrIndentedLine,
        };
        self.codes(then_branch, then_style)?;
        match else_branch {
            [] => Ok(()),
            [
                CsStmt::If {
                    cond,
                    then_branch,
                    else_branch,
                },
            ] => self.if_stmt(cond, then_branch, else_branch, "else "),
            _ => {
                self.line("else")?;
                self.codes(else_branch, CodesStyle::BlockOrIndentedLine)
            }
        }
    }

    fn switch(&mut self, subject: &CsExpr, cases: &[CsCase], default: &[CsStmt]) -> Result<(), EmitError> {
        self.line(format!("switch ({})", self.expr(subject)))?;
        self.line("{")?;
        for case in cases {
            for label in &case.labels {
                let label = match label {
                    CsExpr::Range { lo, hi } => format!(">= {} and <= {}", self.expr(lo), self.expr(hi)),
                    other => self.expr(other),
                };
                self.line(format!("case {}:", label))?;
            }
            self.case_body(&case.body)?;
        }
        if !default.is_empty() {
            self.line("default:")?;
            self.case_body(default)?;
        }
        self.line("}")
    }

    fn case_body(&mut self, body: &[CsStmt]) -> Result<(), EmitError> {
        self.depth += 1;
        self.codes(body, CodesStyle::BlockOrUnindentedLine)?;
        if !ends_in_jump(body) {
            self.line("break;")?;
        }
        self.depth -= 1;
        Ok(())
    }

    fn try_stmt(
        &mut self,
        body: &[CsStmt],
        catches: &[CsCatch],
        catch_all: Option<&[CsStmt]>,
        finally: Option<&[CsStmt]>,
    ) -> Result<(), EmitError> {
        self.line("try")?;
        self.codes(body, CodesStyle::Block)?;
        for catch in catches {
            let ty = self.type_text(&catch.ty);
            match &catch.var {
                Some(var) => self.line(format!("catch ({} {})", ty, var))?,
                None => self.line(format!("catch ({})", ty))?,
            }
            self.codes(&catch.body, CodesStyle::Block)?;
        }
        if let Some(handler) = catch_all {
            self.line("catch")?;
            self.codes(handler, CodesStyle::Block)?;
        }
        let finally = finally.unwrap_or_default();
        // a try needs at least one handler
        if !finally.is_empty() || (catches.is_empty() && catch_all.is_none()) {
            self.line("finally")?;
            self.codes(finally, CodesStyle::Block)?;
        }
        Ok(())
    }

    /// A nested routine becomes a delegate-typed local holding a lambda.
    fn local_function(
        &mut self,
        name: &str,
        params: &[TargetDeclId],
        return_type: Option<&CsType>,
        body: &[CsStmt],
    ) -> Result<(), EmitError> {
        let mut types = Vec::with_capacity(params.len() + 1);
        for &id in params {
            let decl = self.tree.get(id);
            let CsDeclKind::Param(param) = &decl.kind else {
                return Err(unexpected(decl, "in a parameter list"));
            };
            types.push(self.type_or(param.ty.as_ref(), "object"));
        }
        let delegate = match return_type {
            Some(ret) => {
                types.push(self.type_text(ret));
                format!("Func<{}>", types.join(", "))
            }
            None if types.is_empty() => "Action".to_string(),
            None => format!("Action<{}>", types.join(", ")),
        };
        let params = self.params(params)?;
        let lambda = self.capture(self.depth, |e| e.codes(body, CodesStyle::Block))?;

        self.line(format!("{} {} = ({}) =>", delegate, name, params))?;
        self.out.push_str(lambda.trim_end_matches('\n'));
        self.out.push_str(";\n");
        Ok(())
    }

    fn type_text(&self, ty: &CsType) -> String {
        self.config.rewriter.rewrite(&self.tree.type_name(ty))
    }

    fn type_or(&self, ty: Option<&CsType>, fallback: &str) -> String {
        ty.map_or_else(|| fallback.to_string(), |ty| self.type_text(ty))
    }

    fn return_text(&self, ty: Option<&CsType>) -> String {
        self.type_or(ty, "void")
    }

    /// A whole expression, after idiom rewriting.
    fn expr(&self, expr: &CsExpr) -> String {
        self.config.rewriter.rewrite(&self.render(expr))
    }

    fn args(&self, args: &[CsExpr]) -> String {
        args.iter().map(|arg| self.render(arg)).collect::<Vec<_>>().join(", ")
    }

    /// Renders `expr`, parenthesised when it binds looser than `min`.
    fn operand(&self, expr: &CsExpr, min: u8) -> String {
        let text = self.render(expr);
        if binding(expr) < min {
            format!("({})", text)
        } else {
            text
        }
    }

    fn render(&self, expr: &CsExpr) -> String {
        match expr {
            CsExpr::Int(v) => v.to_string(),
            CsExpr::Hex(v) => format!("0x{:X}", v),
            CsExpr::Float(v) => float_text(*v),
            CsExpr::Str(s) => quote(s),
            CsExpr::Bool(b) => b.to_string(),
            CsExpr::Null => "null".to_string(),
            CsExpr::This => "this".to_string(),
            CsExpr::Base => "base".to_string(),
            CsExpr::Name(name) => name.clone(),
            CsExpr::Member { base, name } if is_create(name) && !matches!(**base, CsExpr::This | CsExpr::Base) => {
                format!("new {}()", self.render(base))
            }
            CsExpr::Member { base, name } => format!("{}.{}", self.operand(base, 14), name),
            CsExpr::Call { callee, args } => match callee.as_ref() {
                CsExpr::Member { base, name }
                    if is_create(name) && !matches!(**base, CsExpr::This | CsExpr::Base) =>
                {
                    format!("new {}({})", self.render(base), self.args(args))
                }
                _ => format!("{}({})", self.operand(callee, 14), self.args(args)),
            },
            CsExpr::New { ty, args } => format!("new {}({})", self.tree.type_name(ty), self.args(args)),
            CsExpr::Cast { ty, value } => format!("({}){}", self.tree.type_name(ty), self.operand(value, 14)),
            CsExpr::Index { base, args } => format!("{}[{}]", self.operand(base, 14), self.args(args)),
            CsExpr::Unary { op, operand } => {
                let symbol = match op {
                    CsUnaryOp::Not => "!",
                    CsUnaryOp::BitNot => "~",
                    CsUnaryOp::Plus => "+",
                    CsUnaryOp::Minus => "-",
                };
                let mut text = self.operand(operand, 13);
                // keep `- -x` from reading as a decrement
                if text.starts_with(['-', '+']) && matches!(op, CsUnaryOp::Minus | CsUnaryOp::Plus) {
                    text = format!("({})", text);
                }
                format!("{}{}", symbol, text)
            }
            CsExpr::Binary { op, lhs, rhs } => {
                let precedence = op.precedence();
                format!(
                    "{} {} {}",
                    self.operand(lhs, precedence),
                    op.as_str(),
                    self.operand(rhs, precedence + 1)
                )
            }
            CsExpr::TypeName(ty) => self.tree.type_name(ty),
            CsExpr::Range { lo, hi } => format!("Range({}, {})", self.render(lo), self.render(hi)),
            CsExpr::Belongs { value, set } => format!("Belongs({}, {})", self.render(value), self.render(set)),
            CsExpr::SetOf(items) => format!("Set({})", self.args(items)),
            CsExpr::Tuple(items) => format!("({})", self.args(items)),
        }
    }
}
