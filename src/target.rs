//! C# target tree.
//!
//! Lowering builds this tree and the emitter renders it. Declarations live in an arena
//! addressed by [`TargetDeclId`], the same way the source tree stores its declarations.
//! Type references to other declarations go through [`RefSlot`]s: lowering may need to
//! point at a declaration it has not converted yet, so it allocates a slot holding only
//! a name hint and fills the slot in once the whole unit has been converted.

use std::num::NonZeroU32;

pub mod nodes;

pub use nodes::*;

/// Index of a declaration in the [`CsTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetDeclId(NonZeroU32);

impl TargetDeclId {
    fn from_index(index: usize) -> Self {
        TargetDeclId(NonZeroU32::MIN.saturating_add(index as u32))
    }

    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// Index of a [`RefSlot`] in the [`CsTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefId(u32);

impl RefId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A reference to a target declaration that may be filled in late.
#[derive(Debug, Clone, PartialEq)]
pub struct RefSlot {
    /// Name to render while (or if) the slot stays empty.
    pub hint: String,
    pub target: Option<TargetDeclId>,
}

/// Arena of target declarations plus the namespace root.
#[derive(Debug, Default, Clone)]
pub struct CsTree {
    decls: Vec<CsDecl>,
    slots: Vec<RefSlot>,
    root: Option<TargetDeclId>,
}

impl CsTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, decl: CsDecl) -> TargetDeclId {
        self.decls.push(decl);
        TargetDeclId::from_index(self.decls.len() - 1)
    }

    pub fn get(&self, id: TargetDeclId) -> &CsDecl {
        &self.decls[id.index()]
    }

    pub fn get_mut(&mut self, id: TargetDeclId) -> &mut CsDecl {
        &mut self.decls[id.index()]
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn set_root(&mut self, id: TargetDeclId) {
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<TargetDeclId> {
        self.root
    }

    /// Allocates an empty slot that renders as `hint` until it is solved.
    pub fn new_slot(&mut self, hint: impl Into<String>) -> RefId {
        self.slots.push(RefSlot {
            hint: hint.into(),
            target: None,
        });
        RefId(self.slots.len() as u32 - 1)
    }

    pub fn slot(&self, id: RefId) -> &RefSlot {
        &self.slots[id.index()]
    }

    pub fn solve(&mut self, id: RefId, target: Option<TargetDeclId>) {
        self.slots[id.index()].target = target;
    }

    pub fn slots(&self) -> &[RefSlot] {
        &self.slots
    }

    /// Display name of a type reference: the target's name once solved, else the hint.
    pub fn type_name(&self, ty: &CsType) -> String {
        match ty {
            CsType::Named(name) => name.clone(),
            CsType::Slot(id) => {
                let slot = self.slot(*id);
                match slot.target {
                    Some(target) => self.get(target).name.clone(),
                    None => slot.hint.clone(),
                }
            }
            CsType::Generic { name, args } => {
                let args: Vec<String> = args.iter().map(|arg| self.type_name(arg)).collect();
                format!("{}<{}>", name, args.join(", "))
            }
            CsType::Array(item) => format!("{}[]", self.type_name(item)),
        }
    }
}
