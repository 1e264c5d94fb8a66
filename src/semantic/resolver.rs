//! Name resolution pass
//!
//! The [`Resolver`] walks the parsed unit twice. The first walk binds every type
//! reference in declarations and headers; the second walks routine bodies, binding
//! names in statements and inferring expression types along the way. Scopes are kept
//! on an explicit stack that is pushed through [`Resolver::enter`] and popped when the
//! returned guard is dropped.
//!
//! A name that fails to bind is not an error. It is recorded as a [`ResolveGap`] and
//! the reference stays unbound; later stages render it by name.

use std::fmt;
use std::ops::{Deref, DerefMut};

use hashbrown::HashSet;
use log::{debug, trace};

use crate::ast::*;
use crate::source::Position;

use super::scope::*;
use super::type_inference::{binary_type, literal_type, unary_type};

/// What kind of reference failed to bind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapKind {
    Name,
    Member,
    Type,
}

/// A reference the resolver could not bind. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveGap {
    pub name: String,
    pub location: Position,
    pub kind: GapKind,
}

impl fmt::Display for ResolveGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            GapKind::Name => "name",
            GapKind::Member => "member",
            GapKind::Type => "type",
        };
        write!(f, "unresolved {} '{}'", what, self.name)
    }
}

/// One entry of the scope stack.
#[derive(Debug)]
struct Frame {
    decl: DeclId,
    /// Inline `var` declarations met so far in the body.
    locals: Vec<DeclId>,
    /// Names bound by the statement itself, such as `on E: T do`.
    bound: Vec<(String, Option<ExprType>)>,
}

/// Result of a scope-stack lookup
#[derive(Debug, Clone, Copy)]
enum Binding {
    Decl(DeclId),
    Bound(Option<ExprType>),
}

/// Binds references across one unit.
#[derive(Debug, Default)]
pub struct Resolver {
    scopes: Vec<Frame>,
    resolved: HashSet<DeclId>,
    /// Names listed in `uses` clauses; qualifying by them never reports a gap.
    units: Vec<String>,
    gaps: Vec<ResolveGap>,
}

/// Keeps a scope pushed for as long as it lives.
pub struct ScopeGuard<'r> {
    resolver: &'r mut Resolver,
}

impl Deref for ScopeGuard<'_> {
    type Target = Resolver;

    fn deref(&self) -> &Resolver {
        &*self.resolver
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Resolver {
        &mut *self.resolver
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.resolver.scopes.pop();
    }
}

/// Stand-in left in the arena while a declaration's payload is being resolved.
fn placeholder() -> DeclKind {
    DeclKind::Type(TypeDecl::Alias { target: Ref::default() })
}

/// Layout of a declaration, read before deciding how to detach it from the arena.
enum Shape {
    Unit,
    Class,
    Members(Vec<DeclId>),
    Procedure,
    Leaf,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gaps(&self) -> &[ResolveGap] {
        &self.gaps
    }

    pub fn into_gaps(self) -> Vec<ResolveGap> {
        self.gaps
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Pushes the scope owned by `decl`; it is popped when the guard goes away.
    pub fn enter(&mut self, decl: DeclId) -> ScopeGuard<'_> {
        self.scopes.push(Frame {
            decl,
            locals: Vec::new(),
            bound: Vec::new(),
        });
        ScopeGuard { resolver: self }
    }

    /// Resolves the whole unit rooted at `ast.root()`.
    pub fn resolve(&mut self, ast: &mut Ast) {
        let Some(root) = ast.root() else {
            return;
        };
        reconcile_sections(ast);
        let Some(unit) = ast.unit_mut() else {
            return;
        };
        let decls: Vec<DeclId> = unit.interface.iter().chain(&unit.implementation).copied().collect();
        self.units = unit
            .interface_uses
            .iter()
            .chain(&unit.implementation_uses)
            .cloned()
            .collect();
        let mut initialization = std::mem::take(&mut unit.initialization);
        let mut finalization = std::mem::take(&mut unit.finalization);
        self.resolved.insert(root);

        {
            let mut scope = self.enter(root);
            for &id in &decls {
                scope.resolve_decl(ast, id);
            }
            for &id in &decls {
                scope.resolve_body(ast, id);
            }
            scope.resolve_stmts(ast, &mut initialization);
            scope.resolve_stmts(ast, &mut finalization);
        }

        if let Some(unit) = ast.unit_mut() {
            unit.initialization = initialization;
            unit.finalization = finalization;
        }
        debug!("resolved {} declarations, {} gaps", self.resolved.len(), self.gaps.len());
    }

    fn gap(&mut self, name: &str, location: Position, kind: GapKind) {
        if is_well_known(name) || self.units.iter().any(|u| u.eq_ignore_ascii_case(name)) {
            return;
        }
        trace!("unresolved {:?} '{}' at {}", kind, name, location);
        self.gaps.push(ResolveGap {
            name: name.to_string(),
            location,
            kind,
        });
    }

    /// Walks the scope stack from the innermost frame outwards.
    fn lookup(&self, ast: &Ast, name: &str, want_type: bool) -> Option<Binding> {
        for frame in self.scopes.iter().rev() {
            if !want_type
                && let Some((_, ty)) = frame.bound.iter().rev().find(|(n, _)| n.eq_ignore_ascii_case(name))
            {
                return Some(Binding::Bound(*ty));
            }
            let found = ast
                .find_in(&frame.locals, name)
                .or_else(|| local_find(ast, frame.decl, name))
                .or_else(|| context_find(ast, frame.decl, name));
            if let Some(id) = found.filter(|&id| !want_type || ast.get(id).is_type()) {
                return Some(Binding::Decl(prefer_full_class(ast, id)));
            }
        }
        None
    }

    /// Innermost routine being resolved.
    fn current_routine(&self, ast: &Ast) -> Option<DeclId> {
        self.scopes
            .iter()
            .rev()
            .map(|frame| frame.decl)
            .find(|&id| ast.get(id).as_procedure().is_some())
    }

    /// Class that `Self` denotes at this point.
    fn current_class(&self, ast: &Ast) -> Option<DeclId> {
        self.scopes.iter().rev().find_map(|frame| {
            let decl = ast.get(frame.decl);
            match &decl.kind {
                DeclKind::Procedure(proc) => proc.in_class.as_ref().and_then(|c| c.decl),
                DeclKind::Type(TypeDecl::Class(_)) => Some(frame.decl),
                _ => None,
            }
        })
    }

    /// Binds a type reference, or resolves the anonymous type it points at.
    fn resolve_type_ref(&mut self, ast: &mut Ast, r: &mut Ref, location: Position) {
        if let Some(id) = r.decl {
            self.resolve_decl(ast, id);
            return;
        }
        if r.name.is_empty() {
            return;
        }
        let key = r.name.rsplit('.').next().unwrap_or(&r.name).to_string();
        match self.lookup(ast, &key, true) {
            Some(Binding::Decl(id)) => {
                trace!("type '{}' -> {}", r.name, id);
                r.decl = Some(id);
            }
            _ if BuiltinType::from_name(&key).is_some() => {}
            _ => self.gap(&r.name, location, GapKind::Type),
        }
    }

    /// Signature pass over one declaration: types, headers, initial values.
    pub fn resolve_decl(&mut self, ast: &mut Ast, id: DeclId) {
        if !self.resolved.insert(id) {
            return;
        }
        let location = ast.get(id).location;
        let shape = match &ast.get(id).kind {
            DeclKind::Unit(_) => Shape::Unit,
            DeclKind::Type(TypeDecl::Class(_)) => Shape::Class,
            DeclKind::Type(TypeDecl::Record { fields, .. }) => Shape::Members(fields.clone()),
            DeclKind::Type(TypeDecl::Enum { consts }) => {
                let consts = consts.clone();
                self.resolved.extend(consts);
                return;
            }
            DeclKind::EnumConst { .. } => return,
            DeclKind::Procedure(_) => Shape::Procedure,
            _ => Shape::Leaf,
        };

        match shape {
            Shape::Unit => {}
            Shape::Class => self.resolve_class(ast, id, location),
            Shape::Members(members) => {
                let mut scope = self.enter(id);
                for member in members {
                    scope.resolve_decl(ast, member);
                }
            }
            Shape::Procedure => self.resolve_routine(ast, id, location),
            Shape::Leaf => {
                let mut kind = std::mem::replace(&mut ast.get_mut(id).kind, placeholder());
                self.resolve_leaf(ast, &mut kind, location);
                ast.get_mut(id).kind = kind;
            }
        }
    }

    fn resolve_leaf(&mut self, ast: &mut Ast, kind: &mut DeclKind, location: Position) {
        match kind {
            DeclKind::Var(var) => {
                self.resolve_type_ref(ast, &mut var.type_ref, location);
                if let Some(initial) = &mut var.initial {
                    self.resolve_expr(ast, initial);
                }
            }
            DeclKind::Const(c) => {
                if let Some(type_ref) = &mut c.type_ref {
                    self.resolve_type_ref(ast, type_ref, location);
                }
                self.resolve_expr(ast, &mut c.value);
            }
            DeclKind::Param(param) => {
                if let Some(type_ref) = &mut param.type_ref {
                    self.resolve_type_ref(ast, type_ref, location);
                }
                if let Some(default) = &mut param.default {
                    self.resolve_expr(ast, default);
                }
            }
            DeclKind::Property(prop) => {
                if let Some(type_ref) = &mut prop.type_ref {
                    self.resolve_type_ref(ast, type_ref, location);
                }
                for &param in &prop.index_params {
                    self.resolve_decl(ast, param);
                }
                let accessors = [&mut prop.reader, &mut prop.writer, &mut prop.default_value, &mut prop.stored];
                for accessor in accessors.into_iter().flatten() {
                    self.resolve_expr(ast, accessor);
                }
            }
            DeclKind::Type(ty) => match ty {
                TypeDecl::Array { ranges, item, .. } => {
                    for range in ranges {
                        self.resolve_expr(ast, range);
                    }
                    self.resolve_type_ref(ast, item, location);
                }
                TypeDecl::Set { item } => self.resolve_type_ref(ast, item, location),
                TypeDecl::Pointer { target } | TypeDecl::Alias { target } => {
                    self.resolve_type_ref(ast, target, location)
                }
                TypeDecl::Metaclass { class } => self.resolve_type_ref(ast, class, location),
                TypeDecl::StringAlias { max_len } => {
                    if let Some(max_len) = max_len {
                        self.resolve_expr(ast, max_len);
                    }
                }
                TypeDecl::ProcedureType(sig) => {
                    for &param in &sig.params {
                        self.resolve_decl(ast, param);
                    }
                    if let Some(ret) = &mut sig.return_type {
                        self.resolve_type_ref(ast, ret, location);
                    }
                }
                TypeDecl::Enum { .. } | TypeDecl::Record { .. } | TypeDecl::Class(_) => {}
            },
            DeclKind::Unit(_) | DeclKind::Procedure(_) | DeclKind::EnumConst { .. } => {}
        }
    }

    /// Heritage first, outside the class; then the members with the class in scope.
    fn resolve_class(&mut self, ast: &mut Ast, id: DeclId, location: Position) {
        let (mut ancestor, mut interfaces, members) = match &mut ast.get_mut(id).kind {
            DeclKind::Type(TypeDecl::Class(class)) => (
                class.ancestor.take(),
                std::mem::take(&mut class.interfaces),
                class.members.clone(),
            ),
            _ => return,
        };
        if let Some(ancestor) = &mut ancestor {
            self.resolve_type_ref(ast, ancestor, location);
        }
        for interface in &mut interfaces {
            self.resolve_type_ref(ast, interface, location);
        }
        if let DeclKind::Type(TypeDecl::Class(class)) = &mut ast.get_mut(id).kind {
            class.ancestor = ancestor;
            class.interfaces = interfaces;
        }

        let mut scope = self.enter(id);
        for member in members {
            scope.resolve_decl(ast, member);
        }
    }

    /// Owning class and result type, then parameters and local declarations.
    fn resolve_routine(&mut self, ast: &mut Ast, id: DeclId, location: Position) {
        let (mut in_class, mut return_type, params, decls) = match &mut ast.get_mut(id).kind {
            DeclKind::Procedure(proc) => (
                proc.in_class.take(),
                proc.return_type.take(),
                proc.params.clone(),
                proc.decls.clone(),
            ),
            _ => return,
        };
        if let Some(class) = &mut in_class {
            self.resolve_type_ref(ast, class, location);
        }
        if let Some(ret) = &mut return_type {
            self.resolve_type_ref(ast, ret, location);
        }
        if let DeclKind::Procedure(proc) = &mut ast.get_mut(id).kind {
            proc.in_class = in_class;
            proc.return_type = return_type;
        }

        let mut scope = self.enter(id);
        for param in params {
            scope.resolve_decl(ast, param);
        }
        for decl in decls {
            scope.resolve_decl(ast, decl);
        }
    }

    /// Body pass: statements of a routine and of the routines nested in it.
    pub fn resolve_body(&mut self, ast: &mut Ast, id: DeclId) {
        let Some(proc) = ast.get(id).as_procedure() else {
            return;
        };
        let nested: Vec<DeclId> = proc
            .decls
            .iter()
            .copied()
            .filter(|&d| ast.get(d).as_procedure().is_some())
            .collect();

        let mut scope = self.enter(id);
        for routine in nested {
            scope.resolve_body(ast, routine);
        }
        let body = match &mut ast.get_mut(id).kind {
            DeclKind::Procedure(proc) => proc.body.take(),
            _ => None,
        };
        if let Some(mut body) = body {
            scope.resolve_stmts(ast, &mut body);
            if let DeclKind::Procedure(proc) = &mut ast.get_mut(id).kind {
                proc.body = Some(body);
            }
        }
    }

    pub fn resolve_stmts(&mut self, ast: &mut Ast, stmts: &mut [Stmt]) {
        for stmt in stmts {
            self.resolve_stmt(ast, stmt);
        }
    }

    fn resolve_stmt(&mut self, ast: &mut Ast, stmt: &mut Stmt) {
        let location = stmt.location;
        match &mut stmt.kind {
            StmtKind::Block(body) => self.resolve_stmts(ast, body),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(ast, cond);
                self.resolve_stmts(ast, then_branch);
                self.resolve_stmts(ast, else_branch);
            }
            StmtKind::While { cond, body } => {
                self.resolve_expr(ast, cond);
                self.resolve_stmts(ast, body);
            }
            StmtKind::For { var, from, to, body, .. } => {
                self.resolve_expr(ast, var);
                self.resolve_expr(ast, from);
                self.resolve_expr(ast, to);
                self.resolve_stmts(ast, body);
            }
            StmtKind::Repeat { body, until } => {
                self.resolve_stmts(ast, body);
                self.resolve_expr(ast, until);
            }
            StmtKind::Case { subject, arms, default } => {
                self.resolve_expr(ast, subject);
                for arm in arms {
                    for value in &mut arm.values {
                        self.resolve_expr(ast, value);
                    }
                    self.resolve_stmts(ast, &mut arm.body);
                }
                self.resolve_stmts(ast, default);
            }
            StmtKind::Assign { target, value } => {
                self.resolve_expr(ast, target);
                self.resolve_expr(ast, value);
            }
            StmtKind::Try {
                body,
                handlers,
                else_handler,
                untyped_handler,
                finally,
            } => {
                self.resolve_stmts(ast, body);
                for handler in handlers {
                    self.resolve_type_ref(ast, &mut handler.exception_type, location);
                    let ty = ref_domain(&handler.exception_type);
                    let bound = handler.var_name.clone();
                    if let (Some(name), Some(frame)) = (&bound, self.scopes.last_mut()) {
                        frame.bound.push((name.clone(), ty));
                    }
                    self.resolve_stmts(ast, &mut handler.body);
                    if bound.is_some()
                        && let Some(frame) = self.scopes.last_mut()
                    {
                        frame.bound.pop();
                    }
                }
                for part in [else_handler, untyped_handler, finally].into_iter().flatten() {
                    self.resolve_stmts(ast, part);
                }
            }
            StmtKind::With { subjects, body } => {
                for subject in subjects {
                    self.resolve_expr(ast, subject);
                }
                self.resolve_stmts(ast, body);
            }
            StmtKind::Raise(value) | StmtKind::Inherited(value) => {
                if let Some(value) = value {
                    self.resolve_expr(ast, value);
                }
            }
            StmtKind::Call(expr) => {
                self.resolve_expr(ast, expr);
            }
            StmtKind::LocalVar(id) => {
                let id = *id;
                self.resolve_decl(ast, id);
                if let Some(frame) = self.scopes.last_mut() {
                    frame.locals.push(id);
                }
            }
        }
    }

    /// Binds the names in `expr` and returns its inferred type, also stored in `expr.ty`.
    pub fn resolve_expr(&mut self, ast: &Ast, expr: &mut Expr) -> Option<ExprType> {
        let location = expr.location;
        let literal = literal_type(&expr.kind);
        let ty = match &mut expr.kind {
            ExprKind::Int(_) | ExprKind::Hex(_) | ExprKind::Float(_) | ExprKind::Str(_) | ExprKind::Symbol(_) => {
                literal
            }
            ExprKind::Paren(items) => {
                let types: Vec<_> = items.iter_mut().map(|item| self.resolve_expr(ast, item)).collect();
                match types.as_slice() {
                    [single] => *single,
                    _ => None,
                }
            }
            ExprKind::Brackets(items) => {
                for item in items {
                    self.resolve_expr(ast, item);
                }
                None
            }
            ExprKind::Name(r) => self.bind_name(ast, r, location),
            ExprKind::Member { base, name } => {
                let base_ty = self.resolve_expr(ast, base);
                self.bind_member(ast, base_ty, name, location)
            }
            ExprKind::Call { base, args } => {
                for arg in args {
                    self.resolve_expr(ast, arg);
                }
                let callee = self.resolve_expr(ast, base);
                call_result(ast, base, callee)
            }
            ExprKind::Index { base, args } => {
                for arg in args {
                    self.resolve_expr(ast, arg);
                }
                let base_ty = self.resolve_expr(ast, base);
                index_result(ast, base, base_ty)
            }
            ExprKind::Deref { base } => {
                let base_ty = self.resolve_expr(ast, base);
                deref_result(ast, base_ty)
            }
            ExprKind::Unary { op, operand } => {
                let operand_ty = self.resolve_expr(ast, operand);
                unary_type(ast, *op, operand_ty)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_ty = self.resolve_expr(ast, lhs);
                let rhs_ty = self.resolve_expr(ast, rhs);
                binary_type(ast, *op, lhs_ty, rhs_ty)
            }
        };
        expr.ty = ty;
        ty
    }

    fn bind_name(&mut self, ast: &Ast, r: &mut Ref, location: Position) -> Option<ExprType> {
        if let Some(id) = r.decl {
            return domain_of(ast, id);
        }
        if r.name.eq_ignore_ascii_case("Result")
            && let Some(routine) = self.current_routine(ast)
        {
            return routine_result(ast, routine);
        }
        if r.name.eq_ignore_ascii_case("Self")
            && let Some(class) = self.current_class(ast)
        {
            return Some(ExprType::Decl(class));
        }

        match self.lookup(ast, &r.name, false) {
            Some(Binding::Decl(id)) => {
                trace!("name '{}' -> {}", r.name, id);
                r.decl = Some(id);
                domain_of(ast, id)
            }
            Some(Binding::Bound(ty)) => ty,
            None => {
                self.gap(&r.name, location, GapKind::Name);
                BuiltinType::from_name(&r.name)
                    .or_else(|| builtin_result(&r.name))
                    .map(ExprType::Builtin)
            }
        }
    }

    /// `base.name`: looks the member up in the base's type. An unknown base type
    /// leaves the member unbound without reporting it.
    fn bind_member(
        &mut self,
        ast: &Ast,
        base_ty: Option<ExprType>,
        name: &mut Ref,
        location: Position,
    ) -> Option<ExprType> {
        let ExprType::Decl(owner) = unalias(ast, base_ty?) else {
            return None;
        };
        match dot_find(ast, owner, &name.name) {
            Some(id) => {
                let id = prefer_full_class(ast, id);
                trace!("member '{}' -> {}", name.name, id);
                name.decl = Some(id);
                match ast.get(id).as_procedure() {
                    Some(proc) if proc.approach == Approach::Constructor => Some(ExprType::Decl(owner)),
                    _ => domain_of(ast, id),
                }
            }
            None => {
                if matches!(
                    ast.get(owner).kind,
                    DeclKind::Type(TypeDecl::Class(_) | TypeDecl::Record { .. } | TypeDecl::Enum { .. })
                ) {
                    self.gap(&name.name, location, GapKind::Member);
                }
                None
            }
        }
    }
}

/// Type of `base(args)`: a cast when `base` names a type, the routine's result when it
/// names a routine, and the signature's result for a procedural value.
fn call_result(ast: &Ast, base: &Expr, callee: Option<ExprType>) -> Option<ExprType> {
    if let Some(id) = base.decl() {
        match &ast.get(id).kind {
            DeclKind::Type(_) | DeclKind::Procedure(_) => return callee,
            _ => {}
        }
    }
    match callee.map(|ty| unalias(ast, ty)) {
        Some(ExprType::Decl(ty)) => match &ast.get(ty).kind {
            DeclKind::Type(TypeDecl::ProcedureType(sig)) => sig.return_type.as_ref().and_then(ref_domain),
            _ => callee,
        },
        _ => callee,
    }
}

/// Type of `base[args]`.
fn index_result(ast: &Ast, base: &Expr, base_ty: Option<ExprType>) -> Option<ExprType> {
    if let Some(id) = base.decl()
        && let DeclKind::Property(prop) = &ast.get(id).kind
        && !prop.index_params.is_empty()
    {
        return base_ty;
    }
    match unalias(ast, base_ty?) {
        ExprType::Builtin(BuiltinType::String) => Some(ExprType::Builtin(BuiltinType::Char)),
        ExprType::Builtin(_) => None,
        ExprType::Decl(ty) => match &ast.get(ty).kind {
            DeclKind::Type(TypeDecl::Array { item, .. }) => ref_domain(item),
            DeclKind::Type(TypeDecl::StringAlias { .. }) => Some(ExprType::Builtin(BuiltinType::Char)),
            DeclKind::Type(TypeDecl::Pointer { target }) => ref_domain(target),
            DeclKind::Type(TypeDecl::Class(_)) => default_property(ast, ty).and_then(|prop| domain_of(ast, prop)),
            _ => None,
        },
    }
}

fn deref_result(ast: &Ast, base_ty: Option<ExprType>) -> Option<ExprType> {
    match unalias(ast, base_ty?) {
        ExprType::Decl(ty) => match &ast.get(ty).kind {
            DeclKind::Type(TypeDecl::Pointer { target }) => ref_domain(target),
            _ => None,
        },
        ExprType::Builtin(_) => None,
    }
}

/// Swaps a forward class stub for the full class of the same name anywhere in the unit.
fn prefer_full_class(ast: &Ast, id: DeclId) -> DeclId {
    if !ast.get(id).is_forward_class() {
        return id;
    }
    let Some(unit) = ast.unit() else {
        return id;
    };
    let name = &ast.get(id).name;
    unit.interface
        .iter()
        .chain(&unit.implementation)
        .copied()
        .find(|&other| {
            let decl = ast.get(other);
            decl.as_class().is_some() && !decl.is_forward_class() && decl.name.eq_ignore_ascii_case(name)
        })
        .unwrap_or(id)
}

/// Drops interface forward stubs completed in the implementation section.
fn reconcile_sections(ast: &mut Ast) {
    let Some(unit) = ast.unit() else {
        return;
    };
    let completed: Vec<DeclId> = unit
        .interface
        .iter()
        .copied()
        .filter(|&id| ast.get(id).is_forward_class() && prefer_full_class(ast, id) != id)
        .collect();
    if completed.is_empty() {
        return;
    }
    debug!("{} forward class(es) completed in the implementation", completed.len());
    if let Some(unit) = ast.unit_mut() {
        unit.interface.retain(|id| !completed.contains(id));
    }
}

/// Resolves `ast` in place and returns the references that could not be bound.
pub fn resolve_unit(ast: &mut Ast) -> Vec<ResolveGap> {
    let mut resolver = Resolver::new();
    resolver.resolve(ast);
    resolver.into_gaps()
}
