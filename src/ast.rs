//! Source tree for one Object Pascal unit.
//!
//! Declarations live in a flat arena owned by [`Ast`] and are addressed by [`DeclId`];
//! statements and expressions are owned recursively by the declaration (or statement)
//! that contains them. Name references are [`Ref`]s that start as a bare name and are
//! bound to a `DeclId` by the resolver.
//!
//! - [`nodes`]: declaration, statement and expression variants
//! - [`dumper`]: stable text rendering used by `--dump-ast` and the tests

use std::num::NonZeroU32;

use crate::source::Position;

pub mod dumper;
pub mod nodes;

pub use nodes::*;

/// Index of a declaration in the [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(NonZeroU32);

impl DeclId {
    fn from_index(index: usize) -> Self {
        DeclId(NonZeroU32::MIN.saturating_add(index as u32))
    }

    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl std::fmt::Display for DeclId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A lazy name-to-declaration binding.
///
/// The parser fills `name`; the resolver fills `decl`. A `Ref` built directly from an
/// inline (anonymous) type declaration carries only `decl`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ref {
    pub name: String,
    pub decl: Option<DeclId>,
}

impl Ref {
    pub fn named(name: impl Into<String>) -> Self {
        Ref {
            name: name.into(),
            decl: None,
        }
    }

    pub fn to(decl: DeclId) -> Self {
        Ref {
            name: String::new(),
            decl: Some(decl),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.decl.is_some()
    }
}

/// Arena of every declaration in a unit, plus the unit root.
#[derive(Debug, Default, Clone)]
pub struct Ast {
    decls: Vec<Decl>,
    root: Option<DeclId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, decl: Decl) -> DeclId {
        self.decls.push(decl);
        DeclId::from_index(self.decls.len() - 1)
    }

    pub fn get(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    pub fn get_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.index()]
    }

    /// Drops declarations pushed after `len`; used when the parser backtracks.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.decls.truncate(len);
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = DeclId> + use<> {
        (0..self.decls.len()).map(DeclId::from_index)
    }

    pub fn set_root(&mut self, id: DeclId) {
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<DeclId> {
        self.root
    }

    /// The unit payload of the root declaration.
    pub fn unit(&self) -> Option<&UnitDecl> {
        match &self.get(self.root?).kind {
            DeclKind::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn unit_mut(&mut self) -> Option<&mut UnitDecl> {
        let root = self.root?;
        match &mut self.get_mut(root).kind {
            DeclKind::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn name_of(&self, id: DeclId) -> &str {
        &self.get(id).name
    }

    /// Finds a declaration by case-insensitive name in `list`, also looking inside
    /// enum types for their constants.
    pub fn find_in(&self, list: &[DeclId], name: &str) -> Option<DeclId> {
        for &id in list {
            let decl = self.get(id);
            if decl.name.eq_ignore_ascii_case(name) && !decl.is_forward_class() {
                return Some(id);
            }
            if let DeclKind::Type(TypeDecl::Enum { consts }) = &decl.kind
                && let Some(found) = consts.iter().find(|&&c| self.get(c).name.eq_ignore_ascii_case(name))
            {
                return Some(*found);
            }
        }
        // a forward stub is only an answer when nothing better exists
        list.iter()
            .copied()
            .find(|&id| self.get(id).name.eq_ignore_ascii_case(name))
    }
}

/// A declaration with its name, position and visibility.
#[derive(Debug, Clone)]
pub struct Decl {
    pub name: String,
    pub kind: DeclKind,
    pub location: Position,
    pub visibility: Visibility,
}

impl Decl {
    pub fn new(name: impl Into<String>, kind: DeclKind, location: Position) -> Self {
        Decl {
            name: name.into(),
            kind,
            location,
            visibility: Visibility::Default,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn is_forward_class(&self) -> bool {
        matches!(&self.kind, DeclKind::Type(TypeDecl::Class(class)) if class.forward)
    }

    pub fn is_type(&self) -> bool {
        matches!(self.kind, DeclKind::Type(_))
    }

    pub fn as_procedure(&self) -> Option<&ProcedureDecl> {
        match &self.kind {
            DeclKind::Procedure(proc) => Some(proc),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassDecl> {
        match &self.kind {
            DeclKind::Type(TypeDecl::Class(class)) => Some(class),
            _ => None,
        }
    }
}

/// Removes forward class stubs that have a full declaration of the same name in `decls`.
pub fn reconcile_forward_classes(ast: &Ast, decls: &mut Vec<DeclId>) {
    let snapshot = decls.clone();
    decls.retain(|&id| {
        let decl = ast.get(id);
        if !decl.is_forward_class() {
            return true;
        }
        !snapshot.iter().any(|&other| {
            other != id && {
                let candidate = ast.get(other);
                candidate.as_class().is_some()
                    && !candidate.is_forward_class()
                    && candidate.name.eq_ignore_ascii_case(&decl.name)
            }
        })
    });
}
