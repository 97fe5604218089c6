//! Diff nodes: one per compared pair of artifacts.
//!
//! A [`DiffNode`] records the comparison of one (first, second) subject pair. The
//! nodes of one comparison live in the arena of a
//! [`crate::diff::DiffContext`] and reference each other through [`DiffId`]
//! handles, mirroring how the type graph itself references types through
//! [`TypeId`] handles. Diff graphs inherit the cycles of the type graphs they
//! compare, so the engine allocates a node (and memoizes its pair) *before*
//! descending into children; the payload is filled in afterwards. That is why
//! the payload sits behind a `RefCell` and starts out as
//! [`DiffPayload::Pending`].
//!
//! Category bitmasks, the has-changes verdict and the canonical-diff link are
//! `Cell`s: they are refined by the filter pass after construction while the
//! node graph itself stays frozen.

use std::cell::{Cell, RefCell};
use std::fmt;

use crate::diff::category::DiffCategory;
use crate::diff::context::DiffContext;
use crate::ir::{
    BaseSpec, DataMember, Enumerator, FnParameter, FunctionDeclRc, MemberFunction, TypeId,
    VariableDeclRc,
};

/// A stable handle to a [`DiffNode`] owned by a [`crate::diff::DiffContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiffId(u32);

impl DiffId {
    pub(crate) fn new(index: u32) -> Self {
        DiffId(index)
    }

    /// The raw index value of this handle.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for DiffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "diff:0x{:08X}", self.0)
    }
}

/// A data member present in both versions with something about it changed.
#[derive(Debug, Clone)]
pub struct DataMemberChange {
    /// The member as seen in the first version
    pub first: DataMember,
    /// The member as seen in the second version
    pub second: DataMember,
    /// Diff node over the member's type
    pub type_diff: DiffId,
}

/// A member function present in both versions with something about it changed.
#[derive(Debug, Clone)]
pub struct MemberFnChange {
    /// The function as seen in the first version
    pub first: MemberFunction,
    /// The function as seen in the second version
    pub second: MemberFunction,
    /// Diff node over the function's type
    pub type_diff: DiffId,
}

/// A base class present in both versions with its edge changed.
#[derive(Debug, Clone)]
pub struct BaseChange {
    /// The inheritance edge as seen in the first version
    pub first: BaseSpec,
    /// The inheritance edge as seen in the second version
    pub second: BaseSpec,
    /// Diff node over the base class type
    pub type_diff: DiffId,
}

/// A function parameter present at the same position in both versions with its
/// type changed.
#[derive(Debug, Clone)]
pub struct ParamChange {
    /// Zero-based parameter position
    pub index: usize,
    /// The parameter as seen in the first version
    pub first: FnParameter,
    /// The parameter as seen in the second version
    pub second: FnParameter,
    /// Diff node over the parameter's type
    pub type_diff: DiffId,
}

/// Changes between two class, struct or union types, as keyed edit scripts.
///
/// Data members and member functions are keyed by name, so a member moving
/// within the declaration list shows up as a change in place (or not at all),
/// never as a spurious deletion plus insertion.
#[derive(Debug, Default)]
pub struct ClassDiff {
    /// Members only the second version has
    pub inserted_members: Vec<DataMember>,
    /// Members only the first version has
    pub deleted_members: Vec<DataMember>,
    /// Members present in both with offset, access, staticness or type changed
    pub changed_members: Vec<DataMemberChange>,
    /// Base classes only the second version has
    pub inserted_bases: Vec<BaseSpec>,
    /// Base classes only the first version has
    pub deleted_bases: Vec<BaseSpec>,
    /// Base classes present in both with the edge or the base type changed
    pub changed_bases: Vec<BaseChange>,
    /// Member functions only the second version has
    pub inserted_member_fns: Vec<MemberFunction>,
    /// Member functions only the first version has
    pub deleted_member_fns: Vec<MemberFunction>,
    /// Member functions present in both with something changed
    pub changed_member_fns: Vec<MemberFnChange>,
}

/// Changes between two enum types.
#[derive(Debug, Default)]
pub struct EnumDiff {
    /// Diff node over the underlying integral type, when both versions have one
    pub underlying: Option<DiffId>,
    /// Enumerators only the second version has
    pub inserted: Vec<Enumerator>,
    /// Enumerators only the first version has
    pub deleted: Vec<Enumerator>,
    /// Enumerators present in both with the value changed
    pub changed: Vec<(Enumerator, Enumerator)>,
}

/// Changes between two function types. Parameters are keyed by position.
#[derive(Debug, Default)]
pub struct FnTypeDiff {
    /// Diff node over the return type, when it changed structurally
    pub return_diff: Option<DiffId>,
    /// Parameters present at the same position in both with the type changed
    pub changed_params: Vec<ParamChange>,
    /// Trailing parameters only the second version has
    pub inserted_params: Vec<FnParameter>,
    /// Trailing parameters only the first version has
    pub deleted_params: Vec<FnParameter>,
    /// Whether the variadic marker was added or removed
    pub variadic_changed: bool,
}

/// The kind-specific detail of a type diff.
#[derive(Debug)]
pub enum TypeDiffKind {
    /// A leaf comparison: fundamentals, `void`, the variadic marker, or a pair
    /// involving a declaration-only type. Any difference is carried by the
    /// node's has-changes verdict alone.
    Basic,
    /// The two types are of entirely different kinds.
    Distinct,
    /// Two typedefs; the change, if any, lives in the aliased type.
    Typedef {
        /// Diff node over the aliased type
        underlying: DiffId,
    },
    /// Two pointers; the change, if any, lives in the pointee.
    Pointer {
        /// Diff node over the pointed-to type
        pointee: DiffId,
    },
    /// Two CV-qualified types.
    Qualified {
        /// Diff node over the underlying type
        underlying: DiffId,
        /// Whether the qualifier sets differ
        quals_changed: bool,
    },
    /// Two array types.
    Array {
        /// Diff node over the element type
        element: DiffId,
        /// Whether the dimension lists differ
        subranges_changed: bool,
    },
    /// Two enum types.
    Enum(EnumDiff),
    /// Two class, struct or union types.
    Class(Box<ClassDiff>),
    /// Two function types.
    FunctionType(FnTypeDiff),
}

/// The comparison of two types.
#[derive(Debug)]
pub struct TypeDiff {
    /// Handle of the first version, in the context's first environment
    pub first: TypeId,
    /// Handle of the second version, in the context's second environment
    pub second: TypeId,
    /// Kind-specific detail
    pub kind: TypeDiffKind,
}

/// The comparison of two function declarations sharing an exported name.
#[derive(Debug)]
pub struct FunctionDiff {
    /// The declaration in the first corpus
    pub first: FunctionDeclRc,
    /// The declaration in the second corpus
    pub second: FunctionDeclRc,
    /// Diff node over the function type
    pub type_diff: DiffId,
}

/// The comparison of two variable declarations sharing an exported name.
#[derive(Debug)]
pub struct VariableDiff {
    /// The declaration in the first corpus
    pub first: VariableDeclRc,
    /// The declaration in the second corpus
    pub second: VariableDeclRc,
    /// Diff node over the variable type
    pub type_diff: DiffId,
}

/// The comparison of two corpora: the root of a diff graph.
#[derive(Debug, Default)]
pub struct CorpusDiff {
    /// Whether the sonames differ
    pub soname_changed: bool,
    /// Whether the architecture strings differ
    pub architecture_changed: bool,
    /// Exported functions only the second corpus has
    pub added_functions: Vec<FunctionDeclRc>,
    /// Exported functions only the first corpus has
    pub removed_functions: Vec<FunctionDeclRc>,
    /// Function diffs that carry changes, sorted by qualified name
    pub changed_functions: Vec<DiffId>,
    /// Exported variables only the second corpus has
    pub added_variables: Vec<VariableDeclRc>,
    /// Exported variables only the first corpus has
    pub removed_variables: Vec<VariableDeclRc>,
    /// Variable diffs that carry changes, sorted by qualified name
    pub changed_variables: Vec<DiffId>,
    /// Unreferenced function symbols only the second corpus has
    pub added_function_symbols: Vec<crate::ir::ElfSymbolRc>,
    /// Unreferenced function symbols only the first corpus has
    pub removed_function_symbols: Vec<crate::ir::ElfSymbolRc>,
    /// Unreferenced variable symbols only the second corpus has
    pub added_variable_symbols: Vec<crate::ir::ElfSymbolRc>,
    /// Unreferenced variable symbols only the first corpus has
    pub removed_variable_symbols: Vec<crate::ir::ElfSymbolRc>,
}

/// What a diff node compares.
#[derive(Debug)]
pub enum DiffPayload {
    /// Placeholder while the engine is still computing the children. Only ever
    /// observed through back edges of cyclic type graphs, and replaced before
    /// the engine returns.
    Pending,
    /// Two types
    Type(TypeDiff),
    /// Two function declarations
    Function(FunctionDiff),
    /// Two variable declarations
    Variable(VariableDiff),
    /// Two corpora
    Corpus(CorpusDiff),
}

impl DiffPayload {
    /// The child diff nodes, in reporting order.
    pub(crate) fn children(&self) -> Vec<DiffId> {
        match self {
            DiffPayload::Pending => Vec::new(),
            DiffPayload::Type(type_diff) => match &type_diff.kind {
                TypeDiffKind::Basic | TypeDiffKind::Distinct => Vec::new(),
                TypeDiffKind::Typedef { underlying }
                | TypeDiffKind::Qualified { underlying, .. } => vec![*underlying],
                TypeDiffKind::Pointer { pointee } => vec![*pointee],
                TypeDiffKind::Array { element, .. } => vec![*element],
                TypeDiffKind::Enum(enum_diff) => enum_diff.underlying.into_iter().collect(),
                TypeDiffKind::Class(class_diff) => {
                    let mut children = Vec::new();
                    children.extend(class_diff.changed_bases.iter().map(|c| c.type_diff));
                    children.extend(class_diff.changed_members.iter().map(|c| c.type_diff));
                    children.extend(class_diff.changed_member_fns.iter().map(|c| c.type_diff));
                    children
                }
                TypeDiffKind::FunctionType(fn_diff) => {
                    let mut children = Vec::new();
                    children.extend(fn_diff.return_diff);
                    children.extend(fn_diff.changed_params.iter().map(|c| c.type_diff));
                    children
                }
            },
            DiffPayload::Function(fn_diff) => vec![fn_diff.type_diff],
            DiffPayload::Variable(var_diff) => vec![var_diff.type_diff],
            DiffPayload::Corpus(corpus_diff) => {
                let mut children = corpus_diff.changed_functions.clone();
                children.extend(&corpus_diff.changed_variables);
                children
            }
        }
    }
}

/// One node of a diff graph.
pub struct DiffNode {
    /// The handle this node is registered under
    pub id: DiffId,
    /// Categories assigned to this node itself
    local: Cell<DiffCategory>,
    /// Categories propagated up from the children
    inherited: Cell<DiffCategory>,
    /// The representative node of this node's canonical subject pair, when the
    /// subjects are canonicalized types
    canonical_diff: Cell<Option<DiffId>>,
    /// Whether the subjects differ at all
    has_changes: Cell<bool>,
    payload: RefCell<DiffPayload>,
}

impl DiffNode {
    pub(crate) fn new(id: DiffId) -> Self {
        DiffNode {
            id,
            local: Cell::new(DiffCategory::empty()),
            inherited: Cell::new(DiffCategory::empty()),
            canonical_diff: Cell::new(None),
            has_changes: Cell::new(false),
            payload: RefCell::new(DiffPayload::Pending),
        }
    }

    /// Borrow the payload. Panics if called re-entrantly while the engine is
    /// installing it, which no traversal does.
    pub fn payload(&self) -> std::cell::Ref<'_, DiffPayload> {
        self.payload.borrow()
    }

    pub(crate) fn set_payload(&self, payload: DiffPayload) {
        *self.payload.borrow_mut() = payload;
    }

    /// The child diff nodes, in reporting order.
    #[must_use]
    pub fn children(&self) -> Vec<DiffId> {
        self.payload.borrow().children()
    }

    /// Whether the compared subjects differ at all, before any filtering.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.has_changes.get()
    }

    pub(crate) fn set_has_changes(&self, value: bool) {
        self.has_changes.set(value);
    }

    /// The categories assigned to this node itself.
    #[must_use]
    pub fn local_category(&self) -> DiffCategory {
        self.local.get()
    }

    /// The categories propagated up from the children.
    #[must_use]
    pub fn inherited_category(&self) -> DiffCategory {
        self.inherited.get()
    }

    /// The effective category: local plus inherited.
    #[must_use]
    pub fn category(&self) -> DiffCategory {
        self.local.get() | self.inherited.get()
    }

    /// OR categories into the local mask. Bits are never cleared.
    pub fn add_to_local_category(&self, category: DiffCategory) {
        self.local.set(self.local.get() | category);
    }

    /// OR categories into the inherited mask. Bits are never cleared.
    pub fn add_to_inherited_category(&self, category: DiffCategory) {
        self.inherited.set(self.inherited.get() | category);
    }

    /// The representative diff node of this node's canonical subject pair.
    #[must_use]
    pub fn canonical_diff(&self) -> Option<DiffId> {
        self.canonical_diff.get()
    }

    pub(crate) fn set_canonical_diff(&self, id: DiffId) {
        self.canonical_diff.set(Some(id));
    }

    /// Whether this node should appear in a report, given the context's
    /// visibility toggles and the categories the filter pass assigned.
    ///
    /// A node with changes but no category bits is always reported; categories
    /// only ever *remove* nodes from the report.
    #[must_use]
    pub fn to_be_reported(&self, ctx: &DiffContext) -> bool {
        if !self.has_changes() {
            return false;
        }
        let category = self.category();
        if category.intersects(DiffCategory::SUPPRESSED | DiffCategory::PRIVATE_TYPE) {
            return false;
        }
        if category.contains(DiffCategory::REDUNDANT) && !ctx.show_redundant_changes() {
            return false;
        }
        let substance = category & DiffCategory::inheritable();
        if substance.is_only_harmless() && !ctx.show_harmless_changes() {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_accumulation_is_monotonic() {
        let node = DiffNode::new(DiffId::new(0));
        node.add_to_local_category(DiffCategory::ACCESS_CHANGE);
        node.add_to_local_category(DiffCategory::SIZE_OR_OFFSET_CHANGE);
        assert!(node.local_category().contains(DiffCategory::ACCESS_CHANGE));
        assert!(node
            .category()
            .contains(DiffCategory::SIZE_OR_OFFSET_CHANGE));
        assert!(node.inherited_category().is_empty());
    }

    #[test]
    fn test_pending_payload_has_no_children() {
        let node = DiffNode::new(DiffId::new(0));
        assert!(node.children().is_empty());
    }

    #[test]
    fn test_diff_id_display() {
        assert_eq!(DiffId::new(0x2A).to_string(), "diff:0x0000002A");
    }
}
