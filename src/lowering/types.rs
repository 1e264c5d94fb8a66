//! Type references and primitive type renaming.

use crate::ast::*;
use crate::target::*;

use super::Lowerer;

/// Alias chains longer than this are cut off.
const MAX_ALIAS_DEPTH: usize = 64;

/// Source primitive type names (lowercase) and their C# spelling.
const PRIMITIVES: &[(&str, &str)] = &[
    ("ansichar", "char"),
    ("ansistring", "string"),
    ("boolean", "bool"),
    ("byte", "byte"),
    ("cardinal", "uint"),
    ("char", "char"),
    ("currency", "decimal"),
    ("double", "double"),
    ("extended", "double"),
    ("int64", "long"),
    ("integer", "int"),
    ("int32", "int"),
    ("longint", "int"),
    ("longword", "uint"),
    ("pointer", "object"),
    ("real", "double"),
    ("shortint", "sbyte"),
    ("shortstring", "string"),
    ("single", "float"),
    ("smallint", "short"),
    ("string", "string"),
    ("tobject", "object"),
    ("uint64", "ulong"),
    ("unicodestring", "string"),
    ("variant", "object"),
    ("widechar", "char"),
    ("widestring", "string"),
    ("word", "ushort"),
];

/// The C# name of a primitive source type, if `name` is one.
pub fn primitive_name(name: &str) -> Option<&'static str> {
    let key = name.to_ascii_lowercase();
    PRIMITIVES.iter().find(|(from, _)| *from == key).map(|(_, to)| *to)
}

/// Renames a type written by name: primitives through the table, anything else as is.
pub fn rename_type(name: &str) -> String {
    primitive_name(name).map_or_else(|| name.to_string(), str::to_string)
}

fn builtin_name(ty: BuiltinType) -> &'static str {
    match ty {
        BuiltinType::Boolean => "bool",
        BuiltinType::Char => "char",
        BuiltinType::Integer => "int",
        BuiltinType::Int64 => "long",
        BuiltinType::Double => "double",
        BuiltinType::String => "string",
    }
}

pub(crate) fn object_type() -> CsType {
    CsType::named("object")
}

impl Lowerer<'_> {
    /// Lowers a type reference.
    ///
    /// Aliases, pointers and string types are looked through so the C# text names the
    /// final type. A named declaration becomes a pending slot; an anonymous one (an
    /// inline `array of T`, `set of T` or procedure type) is lowered in place.
    pub(crate) fn lower_type_ref(&mut self, r: &Ref) -> Option<CsType> {
        self.lower_type_ref_at(r, 0)
    }

    fn lower_type_ref_at(&mut self, r: &Ref, depth: usize) -> Option<CsType> {
        let Some(id) = r.decl else {
            if r.name.is_empty() {
                return None;
            }
            return Some(CsType::Named(rename_type(&r.name)));
        };
        if depth >= MAX_ALIAS_DEPTH {
            return Some(object_type());
        }
        let ast = self.ast;
        let decl = ast.get(id);
        let DeclKind::Type(ty) = &decl.kind else {
            return Some(CsType::Named(rename_type(&decl.name)));
        };
        match ty {
            TypeDecl::Alias { target } | TypeDecl::Pointer { target } => {
                Some(self.lower_type_ref_at(target, depth + 1).unwrap_or_else(object_type))
            }
            TypeDecl::StringAlias { .. } => Some(CsType::named("string")),
            _ if decl.name.is_empty() => Some(self.lower_anonymous_type(ty, decl.location)),
            _ => Some(self.slot_for(id)),
        }
    }

    /// A pending reference to the target of `id`.
    pub(crate) fn slot_for(&mut self, id: DeclId) -> CsType {
        let slot = self.tree.new_slot(self.ast.name_of(id));
        self.pending.push((slot, id));
        CsType::Slot(slot)
    }

    fn lower_anonymous_type(&mut self, ty: &TypeDecl, location: crate::source::Position) -> CsType {
        match ty {
            TypeDecl::Array { item, .. } => {
                let item = self.lower_type_ref(item).unwrap_or_else(object_type);
                CsType::Array(Box::new(item))
            }
            TypeDecl::Set { item } => self.set_type(item),
            TypeDecl::ProcedureType(sig) => self.delegate_type(sig),
            _ => {
                self.gap("an anonymous structured type", location);
                object_type()
            }
        }
    }

    /// `set of T` as `HashSet<T>`.
    pub(crate) fn set_type(&mut self, item: &Ref) -> CsType {
        let item = self.lower_type_ref(item).unwrap_or_else(object_type);
        CsType::Generic {
            name: "HashSet".to_string(),
            args: vec![item],
        }
    }

    /// An inline procedure type as `Action<...>` or `Func<..., R>`.
    fn delegate_type(&mut self, sig: &ProcedureSignature) -> CsType {
        let ast = self.ast;
        let mut args: Vec<CsType> = sig
            .params
            .iter()
            .map(|&p| match &ast.get(p).kind {
                DeclKind::Param(param) => param.type_ref.as_ref().and_then(|r| self.lower_type_ref(r)),
                _ => None,
            })
            .map(|ty| ty.unwrap_or_else(object_type))
            .collect();
        let name = match sig.return_type.as_ref() {
            Some(ret) => {
                args.push(self.lower_type_ref(ret).unwrap_or_else(object_type));
                "Func"
            }
            None => "Action",
        };
        if args.is_empty() {
            CsType::named(name)
        } else {
            CsType::Generic {
                name: name.to_string(),
                args,
            }
        }
    }

    /// C# type of an inferred expression type.
    pub(crate) fn lower_expr_type(&mut self, ty: Option<ExprType>) -> Option<CsType> {
        match ty? {
            ExprType::Builtin(builtin) => Some(CsType::named(builtin_name(builtin))),
            ExprType::Decl(id) => self.lower_type_ref(&Ref::to(id)),
        }
    }
}
