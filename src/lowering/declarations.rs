//! Declaration lowering: unit members, type declarations, class members.

use log::trace;

use crate::ast::*;
use crate::semantic::scope::header_of;
use crate::target::*;

use super::types::object_type;
use super::{Lowerer, RoutineContext};

fn member_visibility(visibility: Visibility) -> CsVisibility {
    match visibility {
        Visibility::Default => CsVisibility::Default,
        Visibility::Private => CsVisibility::Private,
        Visibility::Protected => CsVisibility::Protected,
        Visibility::Public | Visibility::Published => CsVisibility::Public,
    }
}

/// Namespace-level types cannot be private; implementation-only types become internal.
fn type_visibility(visibility: Visibility) -> CsVisibility {
    match visibility {
        Visibility::Public | Visibility::Published => CsVisibility::Public,
        _ => CsVisibility::Default,
    }
}

fn method_flags(modifiers: ProcModifiers) -> MemberFlags {
    let mut flags = MemberFlags::empty();
    if modifiers.contains(ProcModifiers::STATIC) {
        flags |= MemberFlags::STATIC;
    }
    if modifiers.contains(ProcModifiers::ABSTRACT) {
        flags |= MemberFlags::ABSTRACT;
    } else if modifiers.intersects(ProcModifiers::VIRTUAL | ProcModifiers::DYNAMIC) {
        flags |= MemberFlags::VIRTUAL;
    }
    if modifiers.contains(ProcModifiers::OVERRIDE) {
        flags |= MemberFlags::OVERRIDE;
    }
    if modifiers.contains(ProcModifiers::EXTERNAL) {
        flags |= MemberFlags::EXTERN | MemberFlags::STATIC;
    }
    flags
}

/// Whether a constant's value can be a C# `const`.
fn is_constant_value(value: &Expr) -> bool {
    match &value.kind {
        ExprKind::Int(_) | ExprKind::Hex(_) | ExprKind::Float(_) | ExprKind::Str(_) | ExprKind::Symbol(_) => true,
        ExprKind::Unary { operand, .. } => is_constant_value(operand),
        ExprKind::Binary { lhs, rhs, .. } => is_constant_value(lhs) && is_constant_value(rhs),
        ExprKind::Name(_) => true,
        _ => false,
    }
}

impl Lowerer<'_> {
    /// One declaration of the interface or implementation section.
    pub(crate) fn lower_unit_decl(&mut self, id: DeclId) {
        let ast = self.ast;
        let decl = ast.get(id);
        match &decl.kind {
            DeclKind::Type(ty) => {
                if let Some(target) = self.lower_type_decl(id, ty) {
                    self.namespace_members.push(target);
                }
            }
            DeclKind::Var(var) => {
                let field = self.lower_field(id, var, MemberFlags::STATIC, CsVisibility::Public);
                self.add_to_unit_class(field);
            }
            DeclKind::Const(c) => {
                let field = self.lower_const(id, c, CsVisibility::Public);
                self.add_to_unit_class(field);
            }
            DeclKind::Procedure(proc) => self.lower_unit_routine(id, proc),
            DeclKind::Unit(_) | DeclKind::Param(_) | DeclKind::Property(_) | DeclKind::EnumConst { .. } => {}
        }
    }

    /// Headers become static methods of the unit class; bodies merge into their header.
    fn lower_unit_routine(&mut self, id: DeclId, proc: &ProcedureDecl) {
        let ast = self.ast;
        let decl = ast.get(id);
        let header = header_of(ast, id).and_then(|h| self.association.get(&h).copied());

        if let Some(class) = proc.in_class.as_ref() {
            match header {
                Some(method) => {
                    self.associate(id, method);
                    self.attach_body(id, method);
                }
                None => {
                    let what = format!("method {}.{} with no declaration in its class", class.name, decl.name);
                    self.gap(what, decl.location);
                }
            }
            return;
        }
        if let Some(method) = header
            && proc.body.is_some()
        {
            self.associate(id, method);
            self.attach_body(id, method);
            return;
        }

        let method = self.lower_method_header(id, proc, MemberFlags::STATIC, member_visibility(decl.visibility));
        self.add_to_unit_class(method);
        if proc.body.is_some() {
            self.attach_body(id, method);
        }
    }

    /// A type declaration. Returns `None` for types with no C# declaration.
    pub(crate) fn lower_type_decl(&mut self, id: DeclId, ty: &TypeDecl) -> Option<TargetDeclId> {
        let ast = self.ast;
        let decl = ast.get(id);
        let kind = match ty {
            TypeDecl::Enum { consts } => {
                let consts = consts
                    .iter()
                    .map(|&c| {
                        let target = self.tree.push(CsDecl::new(ast.name_of(c), CsDeclKind::EnumConst));
                        self.associate(c, target);
                        target
                    })
                    .collect();
                CsDeclKind::Enum { consts }
            }
            TypeDecl::Set { item } => CsDeclKind::Alias {
                target: self.set_type(item),
            },
            TypeDecl::Record { fields, .. } => {
                let members = fields
                    .iter()
                    .filter_map(|&f| match &ast.get(f).kind {
                        DeclKind::Var(var) => {
                            Some(self.lower_field(f, var, MemberFlags::empty(), CsVisibility::Public))
                        }
                        _ => None,
                    })
                    .collect();
                CsDeclKind::Class(CsClass {
                    kind: ClassKind::Struct,
                    bases: Vec::new(),
                    members,
                })
            }
            TypeDecl::Pointer { target } | TypeDecl::Alias { target } => CsDeclKind::Alias {
                target: self.lower_type_ref(target).unwrap_or_else(object_type),
            },
            TypeDecl::StringAlias { .. } => CsDeclKind::Alias {
                target: CsType::named("string"),
            },
            TypeDecl::ProcedureType(sig) => CsDeclKind::Delegate {
                params: self.lower_params(&sig.params),
                return_type: sig.return_type.as_ref().and_then(|r| self.lower_type_ref(r)),
            },
            TypeDecl::Class(class) if class.forward => {
                self.gap(format!("forward class {} with no full declaration", decl.name), decl.location);
                return None;
            }
            TypeDecl::Class(class) => CsDeclKind::Class(self.lower_class(class)),
            TypeDecl::Array { .. } => {
                self.gap(format!("array type {}", decl.name), decl.location);
                return None;
            }
            TypeDecl::Metaclass { .. } => {
                self.gap(format!("metaclass {}", decl.name), decl.location);
                return None;
            }
        };
        let target = self
            .tree
            .push(CsDecl::new(decl.name.clone(), kind).with_visibility(type_visibility(decl.visibility)));
        trace!("type '{}' -> {:?}", decl.name, target);
        self.associate(id, target);
        Some(target)
    }

    fn lower_class(&mut self, class: &ClassDecl) -> CsClass {
        let mut bases = Vec::new();
        if let Some(ancestor) = class.ancestor.as_ref()
            && let Some(ty) = self.lower_type_ref(ancestor)
            && ty != object_type()
        {
            bases.push(ty);
        }
        for interface in &class.interfaces {
            bases.extend(self.lower_type_ref(interface));
        }
        let members = class.members.iter().filter_map(|&m| self.lower_member(m)).collect();
        CsClass {
            kind: if class.is_interface {
                ClassKind::Interface
            } else {
                ClassKind::Class
            },
            bases,
            members,
        }
    }

    fn lower_member(&mut self, id: DeclId) -> Option<TargetDeclId> {
        let ast = self.ast;
        let decl = ast.get(id);
        let visibility = member_visibility(decl.visibility);
        let target = match &decl.kind {
            DeclKind::Var(var) => self.lower_field(id, var, MemberFlags::empty(), visibility),
            DeclKind::Const(c) => self.lower_const(id, c, visibility),
            DeclKind::Procedure(proc) => self.lower_method_header(id, proc, MemberFlags::empty(), visibility),
            DeclKind::Property(prop) => self.lower_property(id, prop, visibility),
            DeclKind::Type(ty) => {
                let nested = self.lower_type_decl(id, ty)?;
                self.namespace_members.push(nested);
                return None;
            }
            DeclKind::Unit(_) | DeclKind::Param(_) | DeclKind::EnumConst { .. } => return None,
        };
        Some(target)
    }

    pub(crate) fn lower_field(
        &mut self,
        id: DeclId,
        var: &VarDecl,
        flags: MemberFlags,
        visibility: CsVisibility,
    ) -> TargetDeclId {
        let field = CsField {
            flags,
            ty: self.lower_type_ref(&var.type_ref),
            initial: var.initial.as_ref().map(|e| self.lower_expr(e)),
        };
        let target = self
            .tree
            .push(CsDecl::new(self.ast.name_of(id), CsDeclKind::Field(field)).with_visibility(visibility));
        self.associate(id, target);
        target
    }

    /// Constants are `const` fields when their value allows it, else static fields.
    pub(crate) fn lower_const(&mut self, id: DeclId, c: &ConstDecl, visibility: CsVisibility) -> TargetDeclId {
        let ty = match c.type_ref.as_ref() {
            Some(r) => self.lower_type_ref(r),
            None => self.lower_expr_type(c.value.ty),
        };
        let flags = if is_constant_value(&c.value) {
            MemberFlags::CONST
        } else {
            MemberFlags::STATIC
        };
        let field = CsField {
            flags,
            ty,
            initial: Some(self.lower_expr(&c.value)),
        };
        let target = self
            .tree
            .push(CsDecl::new(self.ast.name_of(id), CsDeclKind::Field(field)).with_visibility(visibility));
        self.associate(id, target);
        target
    }

    pub(crate) fn lower_params(&mut self, params: &[DeclId]) -> Vec<TargetDeclId> {
        let ast = self.ast;
        params
            .iter()
            .filter_map(|&p| {
                let DeclKind::Param(param) = &ast.get(p).kind else {
                    return None;
                };
                let mode = match param.binding {
                    ParamBinding::Copy | ParamBinding::Const | ParamBinding::In => ParamMode::Value,
                    ParamBinding::Var | ParamBinding::Out => ParamMode::Ref,
                };
                let lowered = CsParam {
                    mode,
                    ty: param.type_ref.as_ref().and_then(|r| self.lower_type_ref(r)),
                    default: param.default.as_ref().map(|e| self.lower_expr(e)),
                };
                let target = self.tree.push(CsDecl::new(ast.name_of(p), CsDeclKind::Param(lowered)));
                self.associate(p, target);
                Some(target)
            })
            .collect()
    }

    /// A method without its body; bodies are attached by [`Self::attach_body`].
    pub(crate) fn lower_method_header(
        &mut self,
        id: DeclId,
        proc: &ProcedureDecl,
        flags: MemberFlags,
        visibility: CsVisibility,
    ) -> TargetDeclId {
        let kind = match proc.approach {
            Approach::Constructor => MethodKind::Constructor,
            Approach::Destructor => MethodKind::Destructor,
            Approach::Procedure | Approach::Function => MethodKind::Normal,
        };
        let params = self.lower_params(&proc.params);
        let mut return_type = proc.return_type.as_ref().and_then(|r| self.lower_type_ref(r));
        if return_type.is_none() && proc.is_function() {
            return_type = Some(object_type());
        }
        let method = CsMethod {
            kind,
            flags: flags | method_flags(proc.modifiers),
            params,
            return_type,
            base_call: None,
            extern_lib: proc.external_lib.clone(),
            body: None,
        };
        let target = self
            .tree
            .push(CsDecl::new(self.ast.name_of(id), CsDeclKind::Method(method)).with_visibility(visibility));
        self.associate(id, target);
        target
    }

    /// Lowers the body of `implementation` into the already converted `method`.
    pub(crate) fn attach_body(&mut self, implementation: DeclId, method: TargetDeclId) {
        let ast = self.ast;
        let decl = ast.get(implementation);
        let Some(proc) = decl.as_procedure() else {
            return;
        };
        let Some(target) = self.tree.get(method).as_method() else {
            return;
        };
        if target.body.is_some() {
            self.gap(format!("a second body for {}", decl.name), decl.location);
            return;
        }
        let result_type = target.return_type.clone();
        let header = header_of(ast, implementation);
        let (body, base_call) = self.lower_routine_body(implementation, proc, header, result_type);

        if let CsDeclKind::Method(target) = &mut self.tree.get_mut(method).kind {
            target.body = Some(body);
            if base_call.is_some() {
                target.base_call = base_call;
            }
        }
    }

    /// Local declarations and statements of a routine, with the result holder when the
    /// routine is a function. Also returns the constructor's base call, if any.
    pub(crate) fn lower_routine_body(
        &mut self,
        id: DeclId,
        proc: &ProcedureDecl,
        header: Option<DeclId>,
        result_type: Option<CsType>,
    ) -> (Vec<CsStmt>, Option<Vec<CsExpr>>) {
        let ast = self.ast;
        let header_proc = header.and_then(|h| ast.get(h).as_procedure());
        let returns_value = proc.is_function() || header_proc.is_some_and(ProcedureDecl::is_function);
        let approach = match header_proc {
            Some(h) => h.approach,
            None => proc.approach,
        };
        let context = RoutineContext {
            decl: id,
            header,
            name: ast.name_of(id).to_string(),
            approach,
            returns_value,
            params: proc.params.iter().map(|&p| ast.name_of(p).to_string()).collect(),
            base_call: None,
        };
        let saved = self.routine.replace(context);
        // a nested routine cannot break out of the caller's loops
        let saved_breakables = std::mem::take(&mut self.breakables);

        let mut body = Vec::new();
        if returns_value {
            body.push(CsStmt::Local {
                name: "Result".to_string(),
                ty: Some(result_type.unwrap_or_else(object_type)),
                value: Some(CsExpr::name("default")),
            });
        }
        self.lower_local_decls(&proc.decls, &mut body);
        if let Some(stmts) = proc.body.as_ref() {
            self.lower_stmts(stmts, &mut body);
        }
        if returns_value && !matches!(body.last(), Some(CsStmt::Return(_))) {
            body.push(CsStmt::Return(Some(CsExpr::name("Result"))));
        }

        self.breakables = saved_breakables;
        let context = std::mem::replace(&mut self.routine, saved);
        (body, context.and_then(|c| c.base_call))
    }

    /// Local vars and consts become locals, nested routines local functions. Local
    /// types are hoisted to the namespace.
    fn lower_local_decls(&mut self, decls: &[DeclId], out: &mut Vec<CsStmt>) {
        let ast = self.ast;
        for &id in decls {
            let decl = ast.get(id);
            match &decl.kind {
                DeclKind::Var(var) => {
                    let stmt = self.lower_local_var(id, var);
                    out.push(stmt);
                }
                DeclKind::Const(c) => {
                    let ty = match c.type_ref.as_ref() {
                        Some(r) => self.lower_type_ref(r),
                        None => self.lower_expr_type(c.value.ty),
                    };
                    out.push(CsStmt::Local {
                        name: decl.name.clone(),
                        ty,
                        value: Some(self.lower_expr(&c.value)),
                    });
                }
                DeclKind::Type(ty) => {
                    if let Some(target) = self.lower_type_decl(id, ty) {
                        self.namespace_members.push(target);
                    }
                }
                DeclKind::Procedure(proc) => {
                    let params = self.lower_params(&proc.params);
                    let return_type = proc.return_type.as_ref().and_then(|r| self.lower_type_ref(r));
                    let (body, _) = self.lower_routine_body(id, proc, None, return_type.clone());
                    out.push(CsStmt::LocalFunction {
                        name: decl.name.clone(),
                        params,
                        return_type,
                        body,
                    });
                }
                DeclKind::Unit(_) | DeclKind::Param(_) | DeclKind::Property(_) | DeclKind::EnumConst { .. } => {}
            }
        }
    }

    pub(crate) fn lower_local_var(&mut self, id: DeclId, var: &VarDecl) -> CsStmt {
        CsStmt::Local {
            name: self.ast.name_of(id).to_string(),
            ty: self.lower_type_ref(&var.type_ref),
            value: var.initial.as_ref().map(|e| self.lower_expr(e)),
        }
    }

    /// Properties keep their reader and writer as member references. Routine
    /// accessors are called, fields are read and assigned directly.
    fn lower_property(&mut self, id: DeclId, prop: &PropertyDecl, visibility: CsVisibility) -> TargetDeclId {
        let ast = self.ast;
        let ty = prop.type_ref.as_ref().and_then(|r| self.lower_type_ref(r));
        let params = self.lower_params(&prop.index_params);
        let index_args: Vec<CsExpr> = prop
            .index_params
            .iter()
            .map(|&p| CsExpr::name(ast.name_of(p)))
            .collect();

        let getter = prop.reader.as_ref().map(|reader| {
            let accessor = CsExpr::name(reader.ident().unwrap_or_default());
            if self.is_routine(reader) {
                CsExpr::call(accessor, index_args.clone())
            } else if index_args.is_empty() {
                self.lower_expr(reader)
            } else {
                CsExpr::Index {
                    base: Box::new(accessor),
                    args: index_args.clone(),
                }
            }
        });
        let setter = prop.writer.as_ref().map(|writer| {
            let accessor = CsExpr::name(writer.ident().unwrap_or_default());
            let stmt = if self.is_routine(writer) {
                let mut args = index_args.clone();
                args.push(CsExpr::name("value"));
                CsStmt::Expr(CsExpr::call(accessor, args))
            } else {
                let target = if index_args.is_empty() {
                    self.lower_expr(writer)
                } else {
                    CsExpr::Index {
                        base: Box::new(accessor),
                        args: index_args.clone(),
                    }
                };
                CsStmt::Assign {
                    target,
                    value: CsExpr::name("value"),
                }
            };
            Box::new(stmt)
        });

        let property = CsProperty {
            flags: MemberFlags::empty(),
            ty,
            params,
            getter,
            setter,
        };
        let target = self
            .tree
            .push(CsDecl::new(ast.name_of(id), CsDeclKind::Property(property)).with_visibility(visibility));
        self.associate(id, target);
        target
    }
}
