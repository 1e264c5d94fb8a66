//! Scope queries over the source tree.
//!
//! These are pure lookups: they read the [`Ast`] and never bind anything. The
//! [`Resolver`](super::Resolver) combines them with its scope stack.

use crate::ast::*;

/// Ancestor chains and alias chains longer than this are treated as cycles.
const MAX_CHAIN: usize = 64;

/// Routines and values every unit can use without declaring them. A name on this
/// list that fails to bind is not reported as a resolution gap.
pub const WELL_KNOWN: &[&str] = &[
    "Abs",
    "Assert",
    "Assigned",
    "Break",
    "Chr",
    "Continue",
    "Copy",
    "Dec",
    "Delete",
    "Exception",
    "Exit",
    "FillChar",
    "Format",
    "FreeAndNil",
    "FreeMem",
    "GetMem",
    "High",
    "Inc",
    "Insert",
    "IntToStr",
    "Length",
    "Low",
    "LowerCase",
    "Move",
    "Ord",
    "Pos",
    "Pred",
    "Result",
    "Round",
    "Self",
    "SetLength",
    "SizeOf",
    "Str",
    "StrToInt",
    "Succ",
    "TObject",
    "Trim",
    "Trunc",
    "UpperCase",
    "Write",
    "Writeln",
];

/// Result type of the well-known routines whose result is fixed.
pub fn builtin_result(name: &str) -> Option<BuiltinType> {
    let ty = match name.to_ascii_lowercase().as_str() {
        "length" | "ord" | "pos" | "round" | "trunc" | "strtoint" | "sizeof" | "high" | "low" => BuiltinType::Integer,
        "inttostr" | "copy" | "format" | "trim" | "uppercase" | "lowercase" => BuiltinType::String,
        "chr" => BuiltinType::Char,
        "assigned" => BuiltinType::Boolean,
        _ => return None,
    };
    Some(ty)
}

pub fn is_well_known(name: &str) -> bool {
    WELL_KNOWN.iter().any(|w| w.eq_ignore_ascii_case(name)) || BuiltinType::from_name(name).is_some()
}

/// Looks `name` up among the declarations a scope owns directly: a unit's interface
/// and implementation, a routine's parameters and locals, a type's members.
pub fn local_find(ast: &Ast, scope: DeclId, name: &str) -> Option<DeclId> {
    match &ast.get(scope).kind {
        DeclKind::Unit(unit) => ast
            .find_in(&unit.interface, name)
            .or_else(|| ast.find_in(&unit.implementation, name)),
        DeclKind::Procedure(proc) => ast
            .find_in(&proc.params, name)
            .or_else(|| ast.find_in(&proc.decls, name)),
        DeclKind::Type(TypeDecl::ProcedureType(sig)) => ast.find_in(&sig.params, name),
        DeclKind::Property(prop) => ast
            .find_in(&prop.index_params, name)
            .or_else(|| dot_find(ast, scope, name)),
        _ => dot_find(ast, scope, name),
    }
}

/// Member lookup for `a.b`: finds `b` inside the type `scope`, following ancestors,
/// aliases, pointers and metaclasses. A value declaration is searched through its type.
pub fn dot_find(ast: &Ast, scope: DeclId, name: &str) -> Option<DeclId> {
    let mut current = scope;
    for _ in 0..MAX_CHAIN {
        let next = match &ast.get(current).kind {
            DeclKind::Unit(unit) => return ast.find_in(&unit.interface, name),
            DeclKind::Type(TypeDecl::Class(class)) => {
                if let Some(found) = ast.find_in(&class.members, name) {
                    return Some(found);
                }
                class.ancestor.as_ref().and_then(|a| a.decl)
            }
            DeclKind::Type(TypeDecl::Record { fields, .. }) => return ast.find_in(fields, name),
            DeclKind::Type(TypeDecl::Enum { consts }) => return ast.find_in(consts, name),
            DeclKind::Type(TypeDecl::Alias { target }) | DeclKind::Type(TypeDecl::Pointer { target }) => target.decl,
            DeclKind::Type(TypeDecl::Metaclass { class }) => class.decl,
            DeclKind::Type(_) | DeclKind::EnumConst { .. } => None,
            _ => match domain_of(ast, current) {
                Some(ExprType::Decl(ty)) if ty != current => Some(ty),
                _ => None,
            },
        };
        current = next?;
    }
    None
}

/// Fallback lookup for plain identifiers: inside a `TClass.Method` body the owning
/// class's members (and its ancestors') are visible.
pub fn context_find(ast: &Ast, scope: DeclId, name: &str) -> Option<DeclId> {
    let proc = ast.get(scope).as_procedure()?;
    let class = proc.in_class.as_ref()?.decl?;
    dot_find(ast, class, name)
}

/// The type a type reference denotes: a declaration when bound, else a built-in.
pub fn ref_domain(r: &Ref) -> Option<ExprType> {
    match r.decl {
        Some(id) => Some(ExprType::Decl(id)),
        None => BuiltinType::from_name(&r.name).map(ExprType::Builtin),
    }
}

/// The static type of a declaration when used as a value: a variable's declared
/// type, a function's result type, an enum constant's enum. A type is its own domain.
pub fn domain_of(ast: &Ast, id: DeclId) -> Option<ExprType> {
    match &ast.get(id).kind {
        DeclKind::Type(_) => Some(ExprType::Decl(id)),
        DeclKind::EnumConst { owner } => Some(ExprType::Decl(*owner)),
        DeclKind::Var(var) => ref_domain(&var.type_ref).or_else(|| var.initial.as_ref().and_then(|e| e.ty)),
        DeclKind::Param(param) => param.type_ref.as_ref().and_then(ref_domain),
        DeclKind::Const(c) => c.type_ref.as_ref().and_then(ref_domain).or(c.value.ty),
        DeclKind::Property(prop) => prop.type_ref.as_ref().and_then(ref_domain),
        DeclKind::Procedure(proc) => proc.return_type.as_ref().and_then(ref_domain),
        DeclKind::Unit(_) => None,
    }
}

/// Follows alias declarations to the type they finally name.
pub fn unalias(ast: &Ast, ty: ExprType) -> ExprType {
    let mut current = ty;
    for _ in 0..MAX_CHAIN {
        let ExprType::Decl(id) = current else {
            return current;
        };
        let DeclKind::Type(TypeDecl::Alias { target }) = &ast.get(id).kind else {
            return current;
        };
        match ref_domain(target) {
            Some(next) => current = next,
            None => return current,
        }
    }
    current
}

/// The built-in a type finally reduces to, if any.
pub fn builtin_of(ast: &Ast, ty: Option<ExprType>) -> Option<BuiltinType> {
    match unalias(ast, ty?) {
        ExprType::Builtin(builtin) => Some(builtin),
        ExprType::Decl(id) => match &ast.get(id).kind {
            DeclKind::Type(TypeDecl::StringAlias { .. }) => Some(BuiltinType::String),
            _ => None,
        },
    }
}

/// Whether `id` is a member of `class` or one of its ancestors.
pub fn is_member_of(ast: &Ast, class: DeclId, id: DeclId) -> bool {
    let mut current = Some(class);
    for _ in 0..MAX_CHAIN {
        let Some(c) = current else {
            return false;
        };
        let Some(decl) = ast.get(c).as_class() else {
            return false;
        };
        if decl.members.contains(&id) {
            return true;
        }
        current = decl.ancestor.as_ref().and_then(|a| a.decl);
    }
    false
}

/// The default array property of a class, searching ancestors too.
pub fn default_property(ast: &Ast, class: DeclId) -> Option<DeclId> {
    let mut current = Some(class);
    for _ in 0..MAX_CHAIN {
        let decl = ast.get(current?).as_class()?;
        let found = decl.members.iter().copied().find(|&m| {
            matches!(&ast.get(m).kind, DeclKind::Property(prop) if prop.is_default)
        });
        if found.is_some() {
            return found;
        }
        current = decl.ancestor.as_ref().and_then(|a| a.decl);
    }
    None
}

/// The header an implementation body belongs to: the method declared in its class for
/// `TClass.Method`, or the interface (or `forward`) declaration of a unit-level routine.
pub fn header_of(ast: &Ast, implementation: DeclId) -> Option<DeclId> {
    let decl = ast.get(implementation);
    let proc = decl.as_procedure()?;
    let found = match proc.in_class.as_ref() {
        Some(class) => dot_find(ast, class.decl?, &decl.name)?,
        None => {
            let unit = ast.unit()?;
            ast.find_in(&unit.interface, &decl.name).or_else(|| {
                unit.implementation.iter().copied().find(|&other| {
                    let candidate = ast.get(other);
                    other != implementation
                        && candidate.name.eq_ignore_ascii_case(&decl.name)
                        && candidate
                            .as_procedure()
                            .is_some_and(|p| p.modifiers.contains(ProcModifiers::FORWARD))
                })
            })?
        }
    };
    (found != implementation && ast.get(found).as_procedure().is_some()).then_some(found)
}

/// Result type of a routine, taken from its header when the implementation omits it.
pub fn routine_result(ast: &Ast, routine: DeclId) -> Option<ExprType> {
    let proc = ast.get(routine).as_procedure()?;
    match proc.return_type.as_ref() {
        Some(r) => ref_domain(r),
        None => header_of(ast, routine).and_then(|header| domain_of(ast, header)),
    }
}
