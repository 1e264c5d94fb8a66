//! Declaration parsing module
//!
//! Handles declaration sections (`type`, `var`, `const`), every type constructor,
//! class bodies, routine headers with their bodies, and properties.

use log::debug;

use crate::ast::*;
use crate::diagnostic::ParseError;
use crate::source::Position;

use super::Parser;
use super::utils::ParserTransaction;

const MODIFIERS: &[(&str, ProcModifiers)] = &[
    ("virtual", ProcModifiers::VIRTUAL),
    ("abstract", ProcModifiers::ABSTRACT),
    ("override", ProcModifiers::OVERRIDE),
    ("dynamic", ProcModifiers::DYNAMIC),
    ("stdcall", ProcModifiers::STDCALL),
    ("cdecl", ProcModifiers::CDECL),
    ("overload", ProcModifiers::OVERLOAD),
    ("reintroduce", ProcModifiers::REINTRODUCE),
    ("forward", ProcModifiers::FORWARD),
    ("external", ProcModifiers::EXTERNAL),
    ("static", ProcModifiers::STATIC),
    ("inline", ProcModifiers::INLINE),
];

impl Parser<'_> {
    /// Repeats declaration sections and routines until none matches, then drops
    /// forward class stubs whose full declaration appeared in the same list.
    pub(crate) fn parse_decls(
        &mut self,
        decls: &mut Vec<DeclId>,
        allow_impl: bool,
        visibility: Visibility,
    ) -> Result<(), ParseError> {
        loop {
            let found = self.type_section(decls)?
                || self.var_section(decls, visibility)?
                || self.const_section(decls, visibility)?
                || self.label_section()?
                || self.procedure(decls, allow_impl, visibility, ProcModifiers::empty())?;
            if !found {
                break;
            }
            self.eat_semi()?;
        }
        reconcile_forward_classes(&self.ast, decls);
        Ok(())
    }

    /// `type T = ...; U = ...;`
    fn type_section(&mut self, decls: &mut Vec<DeclId>) -> Result<bool, ParseError> {
        if !self.cursor.eat_word("type")? {
            return Ok(false);
        }
        let first = self.named_type()?;
        decls.push(self.require(first, "a type declaration")?);
        while self.eat_semi()? {
            match self.named_type()? {
                Some(id) => decls.push(id),
                None => break,
            }
        }
        Ok(true)
    }

    /// `var a, b: T = v;` (also `threadvar`)
    fn var_section(&mut self, decls: &mut Vec<DeclId>, visibility: Visibility) -> Result<bool, ParseError> {
        if self.cursor.eat_any_word(&["var", "threadvar"])?.is_none() {
            return Ok(false);
        }
        let first = self.vars_and_type(decls, visibility)?;
        self.require(first.then_some(()), "a var declaration")?;
        while self.eat_semi()? {
            if !self.vars_and_type(decls, visibility)? {
                break;
            }
        }
        Ok(true)
    }

    /// `const A = 1; B: T = v;` (also `resourcestring`)
    fn const_section(&mut self, decls: &mut Vec<DeclId>, visibility: Visibility) -> Result<bool, ParseError> {
        if self.cursor.eat_any_word(&["const", "resourcestring"])?.is_none() {
            return Ok(false);
        }
        let first = self.const_and_value(decls, visibility)?;
        self.require(first.then_some(()), "a const declaration")?;
        while self.eat_semi()? {
            if !self.const_and_value(decls, visibility)? {
                break;
            }
        }
        Ok(true)
    }

    /// `label 10, done;` declares goto targets, which have no translation.
    fn label_section(&mut self) -> Result<bool, ParseError> {
        if !self.cursor.eat_word("label")? {
            return Ok(false);
        }
        loop {
            self.require_value("label")?;
            if !self.cursor.eat_text(",")? {
                break;
            }
        }
        Ok(true)
    }

    fn named_type(&mut self) -> Result<Option<DeclId>, ParseError> {
        let mut tx = ParserTransaction::new(self);
        let location = tx.position()?;
        let Some(name) = tx.ident()? else {
            return Ok(None);
        };
        if !tx.cursor.eat_text("=")? {
            return Ok(None);
        }
        tx.cursor.eat_word("type")?;
        let id = tx.type_decl(name, location)?;
        let id = tx.require(id, "type")?;
        tx.commit();
        Ok(Some(id))
    }

    fn vars_and_type(&mut self, decls: &mut Vec<DeclId>, visibility: Visibility) -> Result<bool, ParseError> {
        let mut tx = ParserTransaction::new(self);
        let location = tx.position()?;
        let Some(names) = tx.ident_list()? else {
            return Ok(false);
        };
        if !tx.cursor.eat_text(":")? {
            return Ok(false);
        }
        let type_ref = tx.type_ref()?;
        let initial = if tx.cursor.eat_text("=")? {
            Some(tx.require_value("initial value")?)
        } else {
            None
        };
        for name in names {
            let var = VarDecl {
                type_ref: type_ref.clone(),
                initial: initial.clone(),
                inline: false,
            };
            let decl = Decl::new(name, DeclKind::Var(var), location).with_visibility(visibility);
            decls.push(tx.ast.push(decl));
        }
        tx.commit();
        Ok(true)
    }

    fn const_and_value(&mut self, decls: &mut Vec<DeclId>, visibility: Visibility) -> Result<bool, ParseError> {
        let location = self.position()?;
        let Some(name) = self.ident()? else {
            return Ok(false);
        };
        let type_ref = if self.cursor.eat_text(":")? {
            Some(self.type_ref()?)
        } else {
            None
        };
        self.expect_text("=")?;
        let value = self.require_value("constant value")?;
        let decl = Decl::new(name, DeclKind::Const(ConstDecl { type_ref, value }), location).with_visibility(visibility);
        decls.push(self.ast.push(decl));
        Ok(true)
    }

    // ---- types ----

    /// A type used in a declaration. Plain names stay unresolved [`Ref`]s; inline type
    /// constructors become anonymous declarations referenced by id.
    pub(crate) fn type_ref(&mut self) -> Result<Ref, ParseError> {
        let found = self.has_type_ref()?;
        self.require(found, "type")
    }

    fn has_type_ref(&mut self) -> Result<Option<Ref>, ParseError> {
        let mark = self.mark();
        let simple = match self.cursor.eat_any_word(&["string", "file"])? {
            Some(0) => Some("string".to_string()),
            Some(_) => Some("file".to_string()),
            None => self.ident()?,
        };
        if let Some(name) = simple {
            if !self.cursor.looking_at("[")? && !self.cursor.looking_at("..")? {
                let mut full = name;
                while self.cursor.eat_text(".")? {
                    full.push('.');
                    full.push_str(&self.expect_ident("type name")?);
                }
                return Ok(Some(Ref::named(full)));
            }
            self.reset(mark);
        }
        let location = self.position()?;
        Ok(self.type_decl(String::new(), location)?.map(Ref::to))
    }

    /// Any type constructor, pushed as a declaration named `name`.
    pub(crate) fn type_decl(&mut self, name: String, location: Position) -> Result<Option<DeclId>, ParseError> {
        self.nested(|p| {
            if p.cursor.looking_at("(")? {
                return p.enum_type(name, location).map(Some);
            }
            let kind = if let Some(kind) = p.class_type()? {
                kind
            } else if let Some(kind) = p.record_or_array_type()? {
                kind
            } else if p.cursor.eat_text("^")? {
                TypeDecl::Pointer { target: p.type_ref()? }
            } else if p.cursor.eat_word("set")? {
                p.expect_word("of")?;
                TypeDecl::Set { item: p.type_ref()? }
            } else if let Some(kind) = p.procedure_type()? {
                kind
            } else if let Some(kind) = p.string_type()? {
                kind
            } else if let Some(kind) = p.subrange_type()? {
                kind
            } else if let Some(target) = p.ident()? {
                let mut full = target;
                while p.cursor.eat_text(".")? {
                    full.push('.');
                    full.push_str(&p.expect_ident("type name")?);
                }
                TypeDecl::Alias {
                    target: Ref::named(full),
                }
            } else {
                return Ok(None);
            };
            debug!("type '{}' at {}", name, location);
            Ok(Some(p.ast.push(Decl::new(name, DeclKind::Type(kind), location))))
        })
    }

    /// `(a, b = 2, c)`. The type is pushed before its constants so each constant can
    /// point at its owner.
    fn enum_type(&mut self, name: String, location: Position) -> Result<DeclId, ParseError> {
        self.expect_text("(")?;
        let owner = self
            .ast
            .push(Decl::new(name, DeclKind::Type(TypeDecl::Enum { consts: Vec::new() }), location));
        let mut consts = Vec::new();
        loop {
            let at = self.position()?;
            let const_name = self.expect_ident("enum constant")?;
            if self.cursor.eat_text("=")? {
                self.require_value("enum value")?;
            }
            consts.push(self.ast.push(Decl::new(const_name, DeclKind::EnumConst { owner }, at)));
            if !self.cursor.eat_text(",")? {
                break;
            }
        }
        self.expect_text(")")?;
        if let DeclKind::Type(TypeDecl::Enum { consts: slot }) = &mut self.ast.get_mut(owner).kind {
            *slot = consts;
        }
        Ok(owner)
    }

    /// `class of T`, `class;`, `class(Base, IIntf) ... end`, `interface ... end`
    fn class_type(&mut self) -> Result<Option<TypeDecl>, ParseError> {
        let is_interface = match self.cursor.eat_any_word(&["class", "interface", "dispinterface"])? {
            Some(0) => false,
            Some(_) => true,
            None => return Ok(None),
        };
        if !is_interface && self.cursor.eat_word("of")? {
            return Ok(Some(TypeDecl::Metaclass { class: self.type_ref()? }));
        }

        let mut class = ClassDecl {
            is_interface,
            ..ClassDecl::default()
        };
        if self.cursor.looking_at(";")? {
            class.forward = true;
            return Ok(Some(TypeDecl::Class(class)));
        }

        if self.cursor.eat_text("(")? {
            if let Some(ancestor) = self.ident()? {
                class.ancestor = Some(Ref::named(ancestor));
                while self.cursor.eat_text(",")? {
                    class.interfaces.push(Ref::named(self.expect_qualified_ident("interface name")?));
                }
            }
            self.expect_text(")")?;
            // `class(TBase);` is a complete, empty class
            if self.cursor.looking_at(";")? {
                return Ok(Some(TypeDecl::Class(class)));
            }
        }
        if is_interface && self.cursor.eat_text("[")? {
            self.require_value("interface guid")?;
            self.expect_text("]")?;
        }

        let mut visibility = Visibility::Default;
        loop {
            if let Some(found) = self.visibility()? {
                visibility = found;
                continue;
            }
            let is_static = {
                let mark = self.mark();
                if self.cursor.eat_word("class")? && self.looking_at_member()? {
                    true
                } else {
                    self.reset(mark);
                    false
                }
            };
            let modifiers = if is_static {
                ProcModifiers::STATIC
            } else {
                ProcModifiers::empty()
            };
            let found = self.var_section(&mut class.members, visibility)?
                || self.const_section(&mut class.members, visibility)?
                || self.vars_and_type(&mut class.members, visibility)?
                || self.procedure(&mut class.members, false, visibility, modifiers)?
                || self.property(&mut class.members, visibility)?;
            if !found {
                break;
            }
            self.eat_semi()?;
        }
        self.expect_word("end")?;
        Ok(Some(TypeDecl::Class(class)))
    }

    fn looking_at_member(&mut self) -> Result<bool, ParseError> {
        for word in ["procedure", "function", "property", "var", "constructor", "destructor"] {
            if self.cursor.looking_at_word(word)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn visibility(&mut self) -> Result<Option<Visibility>, ParseError> {
        self.cursor.eat_word("strict")?;
        let found = match self.cursor.eat_any_word(&["private", "protected", "public", "published"])? {
            Some(0) => Visibility::Private,
            Some(1) => Visibility::Protected,
            Some(2) => Visibility::Public,
            Some(_) => Visibility::Published,
            None => return Ok(None),
        };
        Ok(Some(found))
    }

    /// `[packed] record fields end` or `[packed] array [ranges] of T`
    fn record_or_array_type(&mut self) -> Result<Option<TypeDecl>, ParseError> {
        let mut tx = ParserTransaction::new(self);
        let packed = tx.cursor.eat_word("packed")?;

        if tx.cursor.eat_word("record")? {
            let mut fields = Vec::new();
            while tx.vars_and_type(&mut fields, Visibility::Default)? {
                if !tx.eat_semi()? {
                    break;
                }
            }
            tx.expect_word("end")?;
            tx.commit();
            return Ok(Some(TypeDecl::Record { packed, fields }));
        }

        if tx.cursor.eat_word("array")? {
            let ranges = if tx.cursor.eat_text("[")? {
                let ranges = tx.closing_list("]")?;
                if ranges.is_empty() {
                    return Err(tx.error("expecting an interval"));
                }
                ranges
            } else {
                Vec::new()
            };
            tx.expect_word("of")?;
            let item = if tx.cursor.eat_word("const")? {
                Ref::named("const")
            } else {
                tx.type_ref()?
            };
            tx.commit();
            return Ok(Some(TypeDecl::Array { packed, ranges, item }));
        }

        Ok(None)
    }

    /// `procedure(params) [of object] [; stdcall]` or the `function` form with a result.
    fn procedure_type(&mut self) -> Result<Option<TypeDecl>, ParseError> {
        let Some(approach) = self.approach()? else {
            return Ok(None);
        };
        let mut signature = ProcedureSignature::default();
        if self.cursor.eat_text("(")? {
            self.params(&mut signature.params, ")")?;
            self.expect_text(")")?;
        }
        if approach == Approach::Function {
            self.expect_text(":")?;
            signature.return_type = Some(self.type_ref()?);
        }
        if self.cursor.eat_word("of")? {
            self.expect_word("object")?;
            signature.of_object = true;
        }
        loop {
            let mark = self.mark();
            if self.eat_semi()?
                && let Some(idx) = self.cursor.eat_any_word(&["stdcall", "cdecl", "overload"])?
            {
                signature.stdcall |= idx == 0;
                continue;
            }
            self.reset(mark);
            break;
        }
        Ok(Some(TypeDecl::ProcedureType(signature)))
    }

    /// `string`, `string[40]`, `AnsiString`, `WideString`
    fn string_type(&mut self) -> Result<Option<TypeDecl>, ParseError> {
        let mark = self.mark();
        let found = self.cursor.eat_word("string")? || {
            match self.cursor.any_word()? {
                Some(w) if w.eq_ignore_ascii_case("ansistring") || w.eq_ignore_ascii_case("widestring") => true,
                _ => {
                    self.reset(mark);
                    false
                }
            }
        };
        if !found {
            return Ok(None);
        }
        let max_len = if self.cursor.eat_text("[")? {
            let len = self.require_value("maximum length")?;
            self.expect_text("]")?;
            Some(len)
        } else {
            None
        };
        Ok(Some(TypeDecl::StringAlias { max_len }))
    }

    /// `0..255` or `'a'..'z'`: a subrange becomes an alias of its bound type.
    fn subrange_type(&mut self) -> Result<Option<TypeDecl>, ParseError> {
        let mut tx = ParserTransaction::new(self);
        let Some(range) = tx.value()? else {
            return Ok(None);
        };
        let ExprKind::Binary {
            op: BinaryOp::Interval,
            lhs,
            ..
        } = &range.kind
        else {
            return Ok(None);
        };
        let bound = match &lhs.kind {
            ExprKind::Str(_) => "Char",
            ExprKind::Name(r) => {
                // enum subrange; the constants' owner is found by the resolver
                let target = r.name.clone();
                tx.commit();
                return Ok(Some(TypeDecl::Alias {
                    target: Ref::named(target),
                }));
            }
            _ => "Integer",
        };
        tx.commit();
        Ok(Some(TypeDecl::Alias {
            target: Ref::named(bound),
        }))
    }

    // ---- routines ----

    fn approach(&mut self) -> Result<Option<Approach>, ParseError> {
        let found = match self
            .cursor
            .eat_any_word(&["procedure", "function", "constructor", "destructor"])?
        {
            Some(0) => Approach::Procedure,
            Some(1) => Approach::Function,
            Some(2) => Approach::Constructor,
            Some(3) => Approach::Destructor,
            _ => return Ok(None),
        };
        Ok(Some(found))
    }

    /// Parameter groups separated by `;` until `close`.
    pub(crate) fn params(&mut self, params: &mut Vec<DeclId>, close: &str) -> Result<bool, ParseError> {
        let mut count = 0;
        while !self.cursor.looking_at(close)? && self.param_group(params)? {
            count += 1;
            if !self.eat_semi()? {
                break;
            }
        }
        Ok(count > 0)
    }

    /// `[const|var|in|out] a, b [: T] [= default]`
    fn param_group(&mut self, params: &mut Vec<DeclId>) -> Result<bool, ParseError> {
        let mut tx = ParserTransaction::new(self);
        let location = tx.position()?;
        let binding = match tx.cursor.eat_any_word(&["const", "var", "in", "out"])? {
            Some(0) => ParamBinding::Const,
            Some(1) => ParamBinding::Var,
            Some(2) => ParamBinding::In,
            Some(3) => ParamBinding::Out,
            _ => ParamBinding::Copy,
        };
        let Some(names) = tx.ident_list()? else {
            return Ok(false);
        };
        let type_ref = if tx.cursor.eat_text(":")? {
            Some(tx.type_ref()?)
        } else {
            None
        };
        let default = if tx.cursor.eat_text("=")? {
            Some(tx.require_value("default value")?)
        } else {
            None
        };
        for name in names {
            let param = ParamDecl {
                binding,
                type_ref: type_ref.clone(),
                default: default.clone(),
            };
            params.push(tx.ast.push(Decl::new(name, DeclKind::Param(param), location)));
        }
        tx.commit();
        Ok(true)
    }

    /// A routine header, its directives and, when `allow_impl`, its body.
    pub(crate) fn procedure(
        &mut self,
        decls: &mut Vec<DeclId>,
        allow_impl: bool,
        visibility: Visibility,
        modifiers: ProcModifiers,
    ) -> Result<bool, ParseError> {
        let location = self.position()?;
        let Some(approach) = self.approach()? else {
            return Ok(false);
        };
        let mut name = self.expect_ident("routine name")?;
        let mut in_class = None;
        while self.cursor.eat_text(".")? {
            let owner = std::mem::replace(&mut name, self.expect_ident("method name")?);
            in_class = Some(Ref::named(owner));
        }

        let mut proc = ProcedureDecl {
            approach,
            params: Vec::new(),
            return_type: None,
            modifiers,
            external_lib: None,
            in_class,
            decls: Vec::new(),
            body: None,
        };
        if self.cursor.eat_text("(")? {
            self.params(&mut proc.params, ")")?;
            self.expect_text(")")?;
        }
        // implementation headers may omit the result of a function declared earlier
        if self.cursor.eat_text(":")? {
            proc.return_type = Some(self.type_ref()?);
        } else if approach == Approach::Function && !allow_impl {
            return Err(self.error("expecting ':'"));
        }
        self.procedure_modifiers(&mut proc)?;

        let is_header_only = proc.modifiers.intersects(ProcModifiers::FORWARD | ProcModifiers::EXTERNAL);
        if allow_impl && !is_header_only {
            self.expect_text(";")?;
            let mut locals = Vec::new();
            self.parse_decls(&mut locals, true, Visibility::Default)?;
            proc.decls = locals;
            if self.cursor.eat_word("asm")? {
                return Err(self.error("assembler blocks are not supported"));
            }
            self.expect_word("begin")?;
            proc.body = Some(self.parse_stmts()?);
            self.expect_word("end")?;
        }

        debug!("routine '{}' ({:?}) at {}", name, approach, location);
        let decl = Decl::new(name, DeclKind::Procedure(proc), location).with_visibility(visibility);
        decls.push(self.ast.push(decl));
        Ok(true)
    }

    /// `; virtual; abstract; external 'lib' name 'x'` and friends. A `;` not followed
    /// by a directive is left for the caller.
    fn procedure_modifiers(&mut self, proc: &mut ProcedureDecl) -> Result<(), ParseError> {
        let words: Vec<&str> = MODIFIERS.iter().map(|(w, _)| *w).collect();
        loop {
            let mark = self.mark();
            if !self.eat_semi()? {
                return Ok(());
            }
            let Some(idx) = self.cursor.eat_any_word(&words)? else {
                self.reset(mark);
                return Ok(());
            };
            let flag = MODIFIERS[idx].1;
            proc.modifiers |= flag;
            if flag == ProcModifiers::EXTERNAL {
                proc.external_lib = match self.value()? {
                    Some(Expr {
                        kind: ExprKind::Str(lib), ..
                    }) => Some(lib),
                    Some(other) => other.ident().map(str::to_string),
                    None => None,
                };
                if self.cursor.eat_word("name")? {
                    self.require_value("external name")?;
                }
            }
        }
    }

    /// `property P[i: Integer]: T read R write W default D stored S; default`
    fn property(&mut self, decls: &mut Vec<DeclId>, visibility: Visibility) -> Result<bool, ParseError> {
        let location = self.position()?;
        if !self.cursor.eat_word("property")? {
            return Ok(false);
        }
        let name = self.expect_ident("property name")?;
        let mut prop = PropertyDecl::default();
        if self.cursor.eat_text("[")? {
            let found = self.params(&mut prop.index_params, "]")?;
            self.require(found.then_some(()), "index params")?;
            self.expect_text("]")?;
        }
        if self.cursor.eat_text(":")? {
            prop.type_ref = Some(self.type_ref()?);
        }
        if self.cursor.eat_word("index")? {
            self.require_value("property index")?;
        }
        if self.cursor.eat_word("read")? {
            prop.reader = Some(self.require_value("reader")?);
        }
        if self.cursor.eat_word("write")? {
            prop.writer = Some(self.require_value("writer")?);
        }
        if self.cursor.eat_word("stored")? {
            prop.stored = Some(self.require_value("stored condition")?);
        }
        if self.cursor.eat_word("default")? {
            prop.default_value = Some(self.require_value("default value")?);
        }
        if self.cursor.eat_word("nodefault")? {
            prop.default_value = None;
        }
        let mark = self.mark();
        if self.eat_semi()? && self.cursor.eat_word("default")? {
            prop.is_default = true;
        } else {
            self.reset(mark);
        }
        let decl = Decl::new(name, DeclKind::Property(prop), location).with_visibility(visibility);
        decls.push(self.ast.push(decl));
        Ok(true)
    }
}
