//! Comparison-scoped arena and policy holder for one diff computation.
//!
//! A [`DiffContext`] owns every [`DiffNode`] of one corpus comparison, the
//! (first, second) pair memo that guarantees one node per compared pair, the
//! canonical-pair cache behind diff node sharing, the visited set that makes
//! traversal terminate on cyclic diff graphs, the report-time suppression
//! specifications and the visibility toggles.
//!
//! # Sharing Model
//!
//! Two type pairs whose members are canonically equal describe the same change.
//! The context keeps one *canonical diff node* per canonical pair; every other
//! node over an equivalent pair links to it. Category bits assigned to any node
//! of the class are copied onto the canonical node, and nodes skipped by the
//! cycle guard pick the bits back up from there, so categorization is stable
//! regardless of which occurrence a traversal reaches first.
//!
//! # Thread Safety
//!
//! A context is single-threaded by design; batch comparisons get one context
//! (and one environment) per task, never a shared one.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::diff::node::{DiffId, DiffNode};
use crate::ir::{canon, Environment, TypeId};
use crate::suppression::{SuppressionAction, SuppressionSpec};

/// Arena, caches and policy for one comparison.
pub struct DiffContext {
    /// Every diff node of this comparison, append-only
    nodes: boxcar::Vec<DiffNode>,
    /// Environment owning the first corpus's types
    env_first: Arc<Environment>,
    /// Environment owning the second corpus's types
    env_second: Arc<Environment>,
    /// One diff node per compared (first, second) type pair
    type_pair_memo: RefCell<HashMap<(TypeId, TypeId), DiffId>>,
    /// The representative diff node per *canonical* (first, second) pair
    canonical_pair_memo: RefCell<HashMap<(TypeId, TypeId), DiffId>>,
    /// Nodes already visited by the current (or, in corpus-wide mode, any)
    /// traversal
    visited: RefCell<HashSet<DiffId>>,
    /// When set, a traversal clears the visited set on entry and skips into
    /// already-visited nodes, firing only their end hook
    forbid_visiting_a_node_twice: Cell<bool>,
    /// Report harmless-only changes
    show_harmless: Cell<bool>,
    /// Report changes already reported through another node of the same
    /// equivalence class
    show_redundant: Cell<bool>,
    /// Report leaf changes only; implies showing redundant changes and skips
    /// impact analysis
    leaf_changes_only: Cell<bool>,
    /// Report-time suppression specifications
    suppressions: Vec<SuppressionSpec>,
    /// Type diff node -> names of exported interfaces whose reachable type
    /// graph contains that change
    impacted: RefCell<HashMap<DiffId, BTreeSet<String>>>,
}

impl DiffContext {
    /// Create a context comparing types of `env_first` against types of
    /// `env_second`. The two are usually the same environment; corpus pairs
    /// built for one comparison task share it.
    #[must_use]
    pub fn new(env_first: Arc<Environment>, env_second: Arc<Environment>) -> Self {
        DiffContext {
            nodes: boxcar::Vec::new(),
            env_first,
            env_second,
            type_pair_memo: RefCell::new(HashMap::new()),
            canonical_pair_memo: RefCell::new(HashMap::new()),
            visited: RefCell::new(HashSet::new()),
            forbid_visiting_a_node_twice: Cell::new(false),
            show_harmless: Cell::new(false),
            show_redundant: Cell::new(false),
            leaf_changes_only: Cell::new(false),
            suppressions: Vec::new(),
            impacted: RefCell::new(HashMap::new()),
        }
    }

    /// The environment of first-version subjects.
    #[must_use]
    pub fn env_first(&self) -> &Arc<Environment> {
        &self.env_first
    }

    /// The environment of second-version subjects.
    #[must_use]
    pub fn env_second(&self) -> &Arc<Environment> {
        &self.env_second
    }

    /// Allocate a fresh, empty diff node.
    pub(crate) fn alloc_node(&self) -> DiffId {
        let index = self.nodes.count();
        let id = DiffId::new(u32::try_from(index).expect("diff arena overflow"));
        self.nodes.push(DiffNode::new(id));
        id
    }

    /// Resolve a handle to its node.
    #[must_use]
    pub fn node(&self, id: DiffId) -> &DiffNode {
        self.nodes
            .get(id.index() as usize)
            .expect("diff handle from a foreign context")
    }

    /// Number of nodes allocated so far.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.count()
    }

    /// The memoized node for a compared type pair, if the engine built one.
    pub(crate) fn lookup_type_pair(&self, first: TypeId, second: TypeId) -> Option<DiffId> {
        self.type_pair_memo.borrow().get(&(first, second)).copied()
    }

    /// Memoize the node for a compared type pair. Must happen before the engine
    /// descends into the pair's children, or cyclic graphs would recurse
    /// forever.
    pub(crate) fn memoize_type_pair(&self, first: TypeId, second: TypeId, id: DiffId) {
        self.type_pair_memo.borrow_mut().insert((first, second), id);
    }

    /// Link `id` to the representative node of its canonical pair, registering
    /// it as the representative if the pair has none yet.
    ///
    /// No-op for pairs that cannot be canonically keyed (different
    /// environments, or a side not yet canonicalized).
    pub(crate) fn link_canonical_diff(&self, first: TypeId, second: TypeId, id: DiffId) {
        let Some(key) = self.canonical_pair(first, second) else {
            return;
        };
        let representative = *self
            .canonical_pair_memo
            .borrow_mut()
            .entry(key)
            .or_insert(id);
        self.node(id).set_canonical_diff(representative);
    }

    /// The canonical key of a type pair, when both sides live in the same
    /// environment and are canonicalized.
    fn canonical_pair(&self, first: TypeId, second: TypeId) -> Option<(TypeId, TypeId)> {
        if !Arc::ptr_eq(&self.env_first, &self.env_second) {
            return None;
        }
        Some((
            self.env_first.canonical(first)?,
            self.env_first.canonical(second)?,
        ))
    }

    /// Whether two subject types are equal: canonical handle comparison when
    /// both sides are canonicalized in a shared environment, deep structural
    /// comparison otherwise.
    #[must_use]
    pub fn types_equal(&self, first: TypeId, second: TypeId) -> bool {
        if Arc::ptr_eq(&self.env_first, &self.env_second)
            && self.env_first.canonical(first).is_some()
            && self.env_first.canonical(second).is_some()
        {
            return self.env_first.canonical_eq(first, second);
        }
        canon::structural_eq(&self.env_first, first, &self.env_second, second)
    }

    /// When set, traversals clear the visited set on entry and fire only the
    /// end hook on nodes reached a second time. Subtree re-traversals (filters,
    /// impact analysis) set this; the corpus-wide walk leaves it unset so every
    /// node is visited exactly once across the whole walk.
    #[must_use]
    pub fn visiting_a_node_twice_is_forbidden(&self) -> bool {
        self.forbid_visiting_a_node_twice.get()
    }

    /// Set or clear the visit-once-per-traversal mode.
    pub fn forbid_visiting_a_node_twice(&self, forbid: bool) {
        self.forbid_visiting_a_node_twice.set(forbid);
    }

    pub(crate) fn clear_visited(&self) {
        self.visited.borrow_mut().clear();
    }

    pub(crate) fn mark_visited(&self, id: DiffId) -> bool {
        self.visited.borrow_mut().insert(id)
    }

    pub(crate) fn is_visited(&self, id: DiffId) -> bool {
        self.visited.borrow().contains(&id)
    }

    /// Whether harmless-only changes are reported.
    #[must_use]
    pub fn show_harmless_changes(&self) -> bool {
        self.show_harmless.get()
    }

    /// Toggle reporting of harmless-only changes.
    pub fn set_show_harmless_changes(&self, show: bool) {
        self.show_harmless.set(show);
    }

    /// Whether redundant changes are reported. Leaf-changes-only mode implies
    /// they are.
    #[must_use]
    pub fn show_redundant_changes(&self) -> bool {
        self.show_redundant.get() || self.leaf_changes_only.get()
    }

    /// Toggle reporting of redundant changes.
    pub fn set_show_redundant_changes(&self, show: bool) {
        self.show_redundant.set(show);
    }

    /// Whether only leaf changes are reported.
    #[must_use]
    pub fn leaf_changes_only(&self) -> bool {
        self.leaf_changes_only.get()
    }

    /// Toggle leaf-changes-only mode. Implies showing redundant changes and
    /// disables impact analysis.
    pub fn set_leaf_changes_only(&self, leaf_only: bool) {
        self.leaf_changes_only.set(leaf_only);
    }

    /// Whether the engine records which exported interfaces reach each type
    /// change.
    #[must_use]
    pub fn perform_impact_analysis(&self) -> bool {
        !self.leaf_changes_only.get()
    }

    /// Install a report-time suppression specification.
    ///
    /// Specifications with the drop-from-IR action belong on the corpus, not
    /// here; they are ignored.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidSuppression`] when the specification has
    /// no match predicate; configuration errors surface before the comparison
    /// runs.
    pub fn add_suppression(&mut self, spec: SuppressionSpec) -> crate::Result<()> {
        spec.ensure_valid()?;
        if spec.action() == SuppressionAction::SuppressReport {
            self.suppressions.push(spec);
        }
        Ok(())
    }

    /// The installed report-time suppression specifications.
    #[must_use]
    pub fn suppressions(&self) -> &[SuppressionSpec] {
        &self.suppressions
    }

    pub(crate) fn record_impacted_interface(&self, type_diff: DiffId, interface: &str) {
        self.impacted
            .borrow_mut()
            .entry(type_diff)
            .or_default()
            .insert(interface.to_string());
    }

    /// The exported interfaces whose reachable type graph contains the change
    /// a diff node describes, sorted by name. Empty when impact analysis was
    /// disabled or the node describes no type change.
    #[must_use]
    pub fn impacted_interfaces(&self, type_diff: DiffId) -> Vec<String> {
        self.impacted
            .borrow()
            .get(&type_diff)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::factories::TestEnv;

    #[test]
    fn test_leaf_changes_only_implies_redundant() {
        let env = TestEnv::new();
        let ctx = DiffContext::new(env.env_rc(), env.env_rc());
        assert!(!ctx.show_redundant_changes());
        ctx.set_leaf_changes_only(true);
        assert!(ctx.show_redundant_changes());
        assert!(!ctx.perform_impact_analysis());
    }

    #[test]
    fn test_types_equal_via_canonical_handles() {
        let env = TestEnv::new();
        let a = env.simple_struct("S", &[("x", 32)]);
        let b = env.simple_struct("S", &[("x", 32)]);
        env.env().canonicalize_pending();

        let ctx = DiffContext::new(env.env_rc(), env.env_rc());
        assert!(ctx.types_equal(a, b));
    }

    #[test]
    fn test_types_equal_falls_back_to_structural() {
        let env_a = TestEnv::new();
        let env_b = TestEnv::new();
        let a = env_a.simple_struct("S", &[("x", 32)]);
        let b = env_b.simple_struct("S", &[("x", 32)]);

        let ctx = DiffContext::new(env_a.env_rc(), env_b.env_rc());
        assert!(ctx.types_equal(a, b));
    }

    #[test]
    fn test_canonical_diff_linking_shares_one_representative() {
        let env = TestEnv::new();
        let a = env.simple_struct("S", &[("x", 32)]);
        let b = env.simple_struct("T", &[("x", 64)]);
        env.env().canonicalize_pending();

        let ctx = DiffContext::new(env.env_rc(), env.env_rc());
        let first = ctx.alloc_node();
        let second = ctx.alloc_node();
        ctx.link_canonical_diff(a, b, first);
        ctx.link_canonical_diff(a, b, second);

        assert_eq!(ctx.node(first).canonical_diff(), Some(first));
        assert_eq!(ctx.node(second).canonical_diff(), Some(first));
    }
}
