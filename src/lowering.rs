//! Lowering of a resolved source tree into the C# target tree.
//!
//! The [`Lowerer`] walks the unit once, converting each declaration into a target
//! declaration and recording the pair in its association table. A type reference to a
//! declaration becomes a [`RefSlot`](crate::target::RefSlot) and is queued on the
//! pending list; after the whole unit is converted a single sweep fills every slot from
//! the association table. Slots whose declaration was never converted (metaclasses,
//! named array types) stay empty and render by name.
//!
//! - [`declarations`]: unit members, classes, records, methods and properties
//! - [`types`]: type references and the primitive rename table
//! - [`statements`]: statement lowering, `with` desugaring, result holders
//! - [`expressions`]: operators, calls and name references

use std::fmt;

use hashbrown::HashMap;
use indexmap::IndexMap;
use log::{debug, trace};

use crate::ast::*;
use crate::source::Position;
use crate::target::*;

pub mod declarations;
pub mod expressions;
pub mod statements;
pub mod types;

#[cfg(test)]
mod tests_lowering;

/// A source construct with no C# counterpart. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoweringGap {
    pub what: String,
    pub location: Position,
}

impl fmt::Display for LoweringGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no translation for {}", self.what)
    }
}

/// Result of lowering one unit.
#[derive(Debug, Clone, Default)]
pub struct Lowered {
    pub tree: CsTree,
    pub gaps: Vec<LoweringGap>,
}

/// The routine whose body is being lowered.
#[derive(Debug, Clone)]
pub(crate) struct RoutineContext {
    /// The declaration holding the body.
    pub decl: DeclId,
    /// Its header, for `TClass.Method` and interface routines.
    pub header: Option<DeclId>,
    pub name: String,
    pub approach: Approach,
    pub returns_value: bool,
    pub params: Vec<String>,
    /// Arguments of an `inherited` call met inside a constructor.
    pub base_call: Option<Vec<CsExpr>>,
}

impl RoutineContext {
    /// Whether `id` names this routine, so assigning to it sets the result.
    pub fn is_self(&self, id: DeclId) -> bool {
        id == self.decl || self.header == Some(id)
    }
}

/// A statement a source `Break` can leave.
#[derive(Debug, Clone)]
pub(crate) enum Breakable {
    /// `exit` labels the point after the loop, once a `Break` inside a nested `case`
    /// needed it.
    Loop { exit: Option<String> },
    /// A `case`. A C# `break` here would leave the switch, not the loop.
    Switch,
}

/// Converts one resolved unit into a [`CsTree`].
pub struct Lowerer<'a> {
    ast: &'a Ast,
    tree: CsTree,
    /// Source declaration to the target declaration it became.
    association: HashMap<DeclId, TargetDeclId>,
    /// Slots waiting for the target of a source declaration.
    pending: Vec<(RefId, DeclId)>,
    gaps: Vec<LoweringGap>,
    namespace_members: Vec<TargetDeclId>,
    unit_class: Option<TargetDeclId>,
    unit_name: String,
    with_counter: usize,
    label_counter: usize,
    routine: Option<RoutineContext>,
    /// Enclosing loops and `case` statements of the body being lowered, innermost last.
    breakables: Vec<Breakable>,
}

impl<'a> Lowerer<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Lowerer {
            ast,
            tree: CsTree::new(),
            association: HashMap::new(),
            pending: Vec::new(),
            gaps: Vec::new(),
            namespace_members: Vec::new(),
            unit_class: None,
            unit_name: String::new(),
            with_counter: 0,
            label_counter: 0,
            routine: None,
            breakables: Vec::new(),
        }
    }

    /// Lowers the whole unit and solves every pending reference.
    pub fn lower(mut self) -> Lowered {
        let ast = self.ast;
        let (Some(root), Some(unit)) = (ast.root(), ast.unit()) else {
            return Lowered {
                tree: self.tree,
                gaps: self.gaps,
            };
        };
        self.unit_name = ast.name_of(root).to_string();
        debug!("lowering unit '{}'", self.unit_name);

        let mut usings: IndexMap<String, String> = IndexMap::new();
        for name in unit.interface_uses.iter().chain(&unit.implementation_uses) {
            usings.entry(name.to_ascii_lowercase()).or_insert_with(|| name.clone());
        }

        for &id in unit.interface.iter().chain(&unit.implementation) {
            self.lower_unit_decl(id);
        }
        self.lower_unit_body(unit, ast.get(root).location);
        self.solve_pending();

        let namespace = CsNamespace {
            usings: usings.into_values().collect(),
            members: std::mem::take(&mut self.namespace_members),
        };
        let root = self
            .tree
            .push(CsDecl::new(self.unit_name.clone(), CsDeclKind::Namespace(namespace)));
        self.tree.set_root(root);
        debug!(
            "lowered into {} target declarations, {} gaps",
            self.tree.len(),
            self.gaps.len()
        );
        Lowered {
            tree: self.tree,
            gaps: self.gaps,
        }
    }

    /// `initialization` becomes a static constructor; a program body becomes `Main`.
    fn lower_unit_body(&mut self, unit: &UnitDecl, location: Position) {
        if !unit.initialization.is_empty() {
            let mut body = Vec::new();
            self.lower_stmts(&unit.initialization, &mut body);
            let (name, kind) = match unit.kind {
                UnitKind::Unit => (self.unit_name.clone(), MethodKind::StaticConstructor),
                UnitKind::Program => ("Main".to_string(), MethodKind::Main),
            };
            let method = CsMethod {
                kind,
                flags: MemberFlags::STATIC,
                params: Vec::new(),
                return_type: None,
                base_call: None,
                extern_lib: None,
                body: Some(body),
            };
            let id = self.tree.push(CsDecl::new(name, CsDeclKind::Method(method)));
            self.add_to_unit_class(id);
        }
        if !unit.finalization.is_empty() {
            self.gap("a finalization section", location);
        }
    }

    /// Fills every pending slot from the association table.
    fn solve_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        let mut unsolved = 0;
        for (slot, decl) in pending {
            let target = self.association.get(&decl).copied();
            if target.is_none() {
                trace!("slot '{}' has no target", self.tree.slot(slot).hint);
                unsolved += 1;
            }
            self.tree.solve(slot, target);
        }
        debug!("solved pending references, {} left empty", unsolved);
    }

    pub(crate) fn associate(&mut self, source: DeclId, target: TargetDeclId) {
        self.association.insert(source, target);
    }

    pub(crate) fn gap(&mut self, what: impl Into<String>, location: Position) {
        let what = what.into();
        trace!("lowering gap at {}: {}", location, what);
        self.gaps.push(LoweringGap { what, location });
    }

    /// The static class holding the unit's free-standing members, created on first use.
    pub(crate) fn unit_class(&mut self) -> TargetDeclId {
        if let Some(id) = self.unit_class {
            return id;
        }
        let class = CsClass {
            kind: ClassKind::Static,
            bases: Vec::new(),
            members: Vec::new(),
        };
        let id = self.tree.push(
            CsDecl::new(self.unit_name.clone(), CsDeclKind::Class(class)).with_visibility(CsVisibility::Public),
        );
        self.namespace_members.push(id);
        self.unit_class = Some(id);
        id
    }

    pub(crate) fn add_to_unit_class(&mut self, member: TargetDeclId) {
        let class = self.unit_class();
        if let CsDeclKind::Class(class) = &mut self.tree.get_mut(class).kind {
            class.members.push(member);
        }
    }

    /// A local name for the next `with` subject, unique within the unit.
    pub(crate) fn next_with_name(&mut self) -> String {
        self.with_counter += 1;
        format!("with{}", self.with_counter)
    }

    /// A label name for the next loop exit, unique within the unit.
    pub(crate) fn next_exit_label(&mut self) -> String {
        self.label_counter += 1;
        format!("break{}", self.label_counter)
    }
}

/// Lowers a resolved unit.
pub fn lower_unit(ast: &Ast) -> Lowered {
    Lowerer::new(ast).lower()
}
