//! Categorization of diff nodes.
//!
//! Filters are visitors that walk a freshly computed diff graph and OR category
//! bits into its nodes; they never delete nodes and never clear bits, so the
//! outcome is independent of filter order. Every category assigned to a node is
//! also copied onto the node's canonical diff node, and every node picks the
//! inheritable categories of its canonical node back up in its end hook. That
//! closes the loop for occurrences the cycle guard skips: whichever occurrence
//! of an equivalence class a traversal reaches first, all occurrences end up
//! with the same substance bits.
//!
//! [`categorize`] is the entry point: it runs the harmless filter, the harmful
//! filter, suppression evaluation and redundancy marking, one subtree-mode
//! traversal each.
//!
//! # Notable Predicates
//!
//! - *Virtual member change* compares the vtable layout maps (slot offset to
//!   function names) of the two classes. A function deleted from one
//!   declaration slot and re-inserted at the same vtable offset leaves the map
//!   unchanged and is not flagged; changing the set of functions at any offset
//!   is.
//! - *ODR divergence*: subjects with different canonical representatives that
//!   still compare structurally equal are an artifact of independently
//!   canonicalized duplicate definitions, flagged harmless.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use crate::diff::category::DiffCategory;
use crate::diff::context::DiffContext;
use crate::diff::engine::symbols_differ;
use crate::diff::node::{DiffId, DiffNode, DiffPayload, TypeDiff, TypeDiffKind};
use crate::diff::traverse::{self, DiffVisitor};
use crate::ir::{canon, ClassPayload, ElfSymbolRc, Environment, TypeId, TypeKind};

/// Run every categorization pass over the graph rooted at `root`.
///
/// Suppression runs first: category propagation skips suppressed subtrees, and
/// a node whose every change is hidden inside suppressed children becomes
/// suppressed itself, so a change hidden by a specification never raises a
/// parent's alarm anywhere up the graph.
pub fn categorize(ctx: &DiffContext, root: DiffId) {
    apply_filter(ctx, root, &mut SuppressionFilter);
    apply_filter(ctx, root, &mut HarmlessFilter);
    apply_filter(ctx, root, &mut HarmfulFilter);
    apply_filter(ctx, root, &mut RedundancyFilter::default());
}

/// Run one filter over the graph rooted at `root`, in subtree traversal mode.
pub fn apply_filter(ctx: &DiffContext, root: DiffId, filter: &mut dyn DiffVisitor) {
    let was_forbidden = ctx.visiting_a_node_twice_is_forbidden();
    ctx.forbid_visiting_a_node_twice(true);
    traverse::traverse(ctx, root, filter);
    ctx.forbid_visiting_a_node_twice(was_forbidden);
    ctx.clear_visited();
}

/// OR categories into a node and mirror them onto its canonical diff node.
fn assign_category(ctx: &DiffContext, node: &DiffNode, category: DiffCategory) {
    if category.is_empty() {
        return;
    }
    node.add_to_local_category(category);
    if let Some(canonical) = node.canonical_diff() {
        if canonical != node.id {
            ctx.node(canonical).add_to_local_category(category);
        }
    }
}

/// End-hook bookkeeping shared by all filters: pick substance bits back up from
/// the canonical node and fold the children's categories into the inherited
/// mask.
fn propagate_categories(ctx: &DiffContext, node: &DiffNode) {
    if let Some(canonical) = node.canonical_diff() {
        if canonical != node.id {
            node.add_to_local_category(
                ctx.node(canonical).local_category() & DiffCategory::inheritable(),
            );
        }
    }
    let mut inherited = DiffCategory::empty();
    for child in node.children() {
        let child_node = ctx.node(child);
        // Suppressed or private subtrees are invisible to their parents.
        if child_node
            .local_category()
            .intersects(DiffCategory::SUPPRESSED | DiffCategory::PRIVATE_TYPE)
        {
            continue;
        }
        inherited |= (child_node.local_category() | child_node.inherited_category())
            & DiffCategory::inheritable();
    }
    node.add_to_inherited_category(inherited);
}

/// Assigns the categories that cannot break the ABI.
pub struct HarmlessFilter;

impl DiffVisitor for HarmlessFilter {
    fn visit_begin(&mut self, ctx: &DiffContext, node: &DiffNode) {
        if !node.has_changes() {
            return;
        }
        let category = match &*node.payload() {
            DiffPayload::Type(diff) => harmless_type_categories(ctx, diff),
            DiffPayload::Function(diff) => symbol_alias_only_change(
                ctx,
                diff.type_diff,
                diff.first.name == diff.second.name
                    && diff.first.linkage_name == diff.second.linkage_name,
                &diff.first.symbol,
                &diff.second.symbol,
            ),
            DiffPayload::Variable(diff) => symbol_alias_only_change(
                ctx,
                diff.type_diff,
                diff.first.name == diff.second.name
                    && diff.first.linkage_name == diff.second.linkage_name,
                &diff.first.symbol,
                &diff.second.symbol,
            ),
            DiffPayload::Corpus(_) | DiffPayload::Pending => DiffCategory::empty(),
        };
        assign_category(ctx, node, category);
    }

    fn visit_end(&mut self, ctx: &DiffContext, node: &DiffNode) {
        propagate_categories(ctx, node);
    }
}

fn harmless_type_categories(ctx: &DiffContext, diff: &TypeDiff) -> DiffCategory {
    let mut category = DiffCategory::empty();
    let Some(ta) = ctx.env_first().type_of(diff.first) else {
        return category;
    };
    let Some(tb) = ctx.env_second().type_of(diff.second) else {
        return category;
    };

    if is_odr_divergence(ctx, diff.first, diff.second) {
        category |= DiffCategory::HARMLESS_ODR_CHANGE;
    }
    if ta.name != tb.name && same_kind(&ta.kind, &tb.kind) {
        category |= DiffCategory::HARMLESS_DECL_NAME_CHANGE;
    }
    if compatible_through_typedefs(ctx, diff.first, diff.second) {
        category |= DiffCategory::COMPATIBLE_TYPE_CHANGE;
    }

    match &diff.kind {
        TypeDiffKind::Enum(enum_diff) => {
            if enum_diff.deleted.is_empty()
                && enum_diff.changed.is_empty()
                && !enum_diff.inserted.is_empty()
                && ta.size_in_bits == tb.size_in_bits
            {
                category |= DiffCategory::HARMLESS_ENUM_CHANGE;
            }
        }
        TypeDiffKind::Class(class_diff) => {
            let access_changed = class_diff
                .changed_members
                .iter()
                .any(|m| m.first.access != m.second.access)
                || class_diff
                    .changed_member_fns
                    .iter()
                    .any(|f| f.first.access != f.second.access)
                || class_diff
                    .changed_bases
                    .iter()
                    .any(|b| b.first.access != b.second.access);
            if access_changed {
                category |= DiffCategory::ACCESS_CHANGE;
            }

            let static_member_touched = class_diff
                .inserted_members
                .iter()
                .chain(class_diff.deleted_members.iter())
                .any(|m| m.is_static)
                || class_diff
                    .changed_members
                    .iter()
                    .any(|m| m.first.is_static || m.second.is_static);
            if static_member_touched {
                category |= DiffCategory::STATIC_DATA_MEMBER_CHANGE;
            }

            let non_virtual_fn_touched = class_diff
                .inserted_member_fns
                .iter()
                .chain(class_diff.deleted_member_fns.iter())
                .any(|f| !f.is_virtual)
                || class_diff
                    .changed_member_fns
                    .iter()
                    .any(|f| !f.first.is_virtual && !f.second.is_virtual);
            if non_virtual_fn_touched {
                category |= DiffCategory::NON_VIRT_MEM_FUN_CHANGE;
            }
        }
        _ => {}
    }
    category
}

fn same_kind(a: &TypeKind, b: &TypeKind) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

/// Canonically different yet structurally equal: duplicate definitions that
/// were canonicalized independently.
fn is_odr_divergence(ctx: &DiffContext, first: TypeId, second: TypeId) -> bool {
    if !Arc::ptr_eq(ctx.env_first(), ctx.env_second()) {
        return false;
    }
    let env = ctx.env_first();
    let (Some(ca), Some(cb)) = (env.canonical(first), env.canonical(second)) else {
        return false;
    };
    ca != cb && canon::structural_eq(env, first, env, second)
}

/// Whether the two types become equal once typedef layers are peeled off both.
fn compatible_through_typedefs(ctx: &DiffContext, first: TypeId, second: TypeId) -> bool {
    let peeled_first = peel_typedefs(ctx.env_first(), first);
    let peeled_second = peel_typedefs(ctx.env_second(), second);
    if peeled_first == first && peeled_second == second {
        return false;
    }
    ctx.types_equal(peeled_first, peeled_second)
}

fn peel_typedefs(env: &Environment, mut id: TypeId) -> TypeId {
    // Typedef chains in well-formed IR are finite; the arena cannot express a
    // typedef cycle without a pointer in between.
    while let Some(ty) = env.type_of(id) {
        match &ty.kind {
            TypeKind::Typedef { underlying } => id = *underlying,
            _ => break,
        }
    }
    id
}

fn symbol_alias_only_change(
    ctx: &DiffContext,
    type_diff: DiffId,
    names_equal: bool,
    first: &Option<ElfSymbolRc>,
    second: &Option<ElfSymbolRc>,
) -> DiffCategory {
    if !names_equal || ctx.node(type_diff).has_changes() {
        return DiffCategory::empty();
    }
    match (first, second) {
        (Some(sa), Some(sb)) if sa.id_string() == sb.id_string() && sa.aliases != sb.aliases => {
            DiffCategory::HARMLESS_SYMBOL_ALIAS_CHANGE
        }
        _ => DiffCategory::empty(),
    }
}

/// Assigns the categories that do break the ABI.
pub struct HarmfulFilter;

impl DiffVisitor for HarmfulFilter {
    fn visit_begin(&mut self, ctx: &DiffContext, node: &DiffNode) {
        if !node.has_changes() {
            return;
        }
        let category = match &*node.payload() {
            DiffPayload::Type(diff) => harmful_type_categories(ctx, diff),
            _ => DiffCategory::empty(),
        };
        assign_category(ctx, node, category);
    }

    fn visit_end(&mut self, ctx: &DiffContext, node: &DiffNode) {
        propagate_categories(ctx, node);
    }
}

fn harmful_type_categories(ctx: &DiffContext, diff: &TypeDiff) -> DiffCategory {
    let mut category = DiffCategory::empty();
    let Some(ta) = ctx.env_first().type_of(diff.first) else {
        return category;
    };
    let Some(tb) = ctx.env_second().type_of(diff.second) else {
        return category;
    };

    // Declaration-only types carry no meaningful size.
    let both_defined = !ta.is_declaration_only() && !tb.is_declaration_only();
    if both_defined && ta.size_in_bits != tb.size_in_bits {
        category |= DiffCategory::SIZE_OR_OFFSET_CHANGE;
    }

    if let TypeDiffKind::Class(class_diff) = &diff.kind {
        let offset_moved = class_diff.changed_members.iter().any(|m| {
            !m.first.is_static
                && !m.second.is_static
                && m.first.offset_in_bits != m.second.offset_in_bits
        });
        if offset_moved {
            category |= DiffCategory::SIZE_OR_OFFSET_CHANGE;
        }
        if let (Some(pa), Some(pb)) = (ta.as_class(), tb.as_class()) {
            if vtable_maps_differ(pa, pb) {
                category |= DiffCategory::VIRTUAL_MEMBER_CHANGE;
            }
        }
    }
    category
}

/// The vtable layout of a class: slot offset to the functions occupying it.
/// Virtual functions without a known slot are keyed under `None`.
fn vtable_map(payload: &ClassPayload) -> BTreeMap<Option<u64>, BTreeSet<String>> {
    let mut map: BTreeMap<Option<u64>, BTreeSet<String>> = BTreeMap::new();
    for function in payload.virtual_member_fns() {
        map.entry(function.vtable_offset)
            .or_default()
            .insert(function.name.clone());
    }
    map
}

fn vtable_maps_differ(pa: &ClassPayload, pb: &ClassPayload) -> bool {
    vtable_map(pa) != vtable_map(pb)
}

/// Marks nodes matched by the context's report-time suppression specifications,
/// then folds the marks upward: a node whose every changed child is suppressed,
/// and which carries no change of its own, is suppressed with them.
pub struct SuppressionFilter;

impl DiffVisitor for SuppressionFilter {
    fn visit_begin(&mut self, ctx: &DiffContext, node: &DiffNode) {
        if !node.has_changes() {
            return;
        }
        let mut category = DiffCategory::empty();
        match &*node.payload() {
            DiffPayload::Type(diff) => {
                for spec in ctx.suppressions() {
                    if spec.matches_type(ctx.env_first(), diff.first)
                        || spec.matches_type(ctx.env_second(), diff.second)
                    {
                        log::debug!("suppression '{}' hides {}", spec.label(), node.id);
                        category |= if spec.is_private_type_policy() {
                            DiffCategory::PRIVATE_TYPE
                        } else {
                            DiffCategory::SUPPRESSED
                        };
                    }
                }
            }
            DiffPayload::Function(diff) => {
                for spec in ctx.suppressions() {
                    if spec.matches_function(&diff.first) || spec.matches_function(&diff.second) {
                        log::debug!("suppression '{}' hides {}", spec.label(), node.id);
                        category |= DiffCategory::SUPPRESSED;
                    }
                }
            }
            DiffPayload::Variable(diff) => {
                for spec in ctx.suppressions() {
                    if spec.matches_variable(&diff.first) || spec.matches_variable(&diff.second) {
                        log::debug!("suppression '{}' hides {}", spec.label(), node.id);
                        category |= DiffCategory::SUPPRESSED;
                    }
                }
            }
            DiffPayload::Corpus(_) | DiffPayload::Pending => {}
        }
        // Direct matches are per-node; they are deliberately not mirrored onto
        // the canonical diff node.
        node.add_to_local_category(category);
    }

    fn visit_end(&mut self, ctx: &DiffContext, node: &DiffNode) {
        // A node whose only changes live in suppressed (or private) children
        // has nothing left to report; it is hidden along with them. Post-order
        // makes this fold reach the corpus root.
        if !node.has_changes()
            || node
                .local_category()
                .intersects(DiffCategory::SUPPRESSED | DiffCategory::PRIVATE_TYPE)
        {
            return;
        }
        let mut changed_children = 0usize;
        for child in node.children() {
            let child_node = ctx.node(child);
            if !child_node.has_changes() {
                continue;
            }
            changed_children += 1;
            if !child_node
                .local_category()
                .intersects(DiffCategory::SUPPRESSED | DiffCategory::PRIVATE_TYPE)
            {
                return;
            }
        }
        if changed_children > 0 && !carries_own_change(ctx, node) {
            node.add_to_local_category(DiffCategory::SUPPRESSED);
        }
    }
}

/// Whether a node changes in some way its child diffs do not account for.
///
/// Only a node that changes *exclusively* through its children may be folded
/// into their suppression.
fn carries_own_change(ctx: &DiffContext, node: &DiffNode) -> bool {
    match &*node.payload() {
        DiffPayload::Pending => false,
        DiffPayload::Type(diff) => type_carries_own_change(ctx, diff),
        DiffPayload::Function(diff) => {
            diff.first.name != diff.second.name
                || diff.first.linkage_name != diff.second.linkage_name
                || symbols_differ(&diff.first.symbol, &diff.second.symbol)
        }
        DiffPayload::Variable(diff) => {
            diff.first.name != diff.second.name
                || diff.first.linkage_name != diff.second.linkage_name
                || symbols_differ(&diff.first.symbol, &diff.second.symbol)
        }
        DiffPayload::Corpus(diff) => {
            diff.soname_changed
                || diff.architecture_changed
                || !diff.added_functions.is_empty()
                || !diff.removed_functions.is_empty()
                || !diff.added_variables.is_empty()
                || !diff.removed_variables.is_empty()
                || !diff.added_function_symbols.is_empty()
                || !diff.removed_function_symbols.is_empty()
                || !diff.added_variable_symbols.is_empty()
                || !diff.removed_variable_symbols.is_empty()
        }
    }
}

fn type_carries_own_change(ctx: &DiffContext, diff: &TypeDiff) -> bool {
    let (Some(ta), Some(tb)) = (
        ctx.env_first().type_of(diff.first),
        ctx.env_second().type_of(diff.second),
    ) else {
        return true;
    };
    if ta.name != tb.name || ta.size_in_bits != tb.size_in_bits {
        return true;
    }
    match &diff.kind {
        // Leaf diffs have no children to carry the change for them.
        TypeDiffKind::Basic | TypeDiffKind::Distinct => true,
        TypeDiffKind::Typedef { .. } | TypeDiffKind::Pointer { .. } => false,
        TypeDiffKind::Qualified { quals_changed, .. } => *quals_changed,
        TypeDiffKind::Array {
            subranges_changed, ..
        } => *subranges_changed,
        TypeDiffKind::Enum(enum_diff) => {
            !enum_diff.inserted.is_empty()
                || !enum_diff.deleted.is_empty()
                || !enum_diff.changed.is_empty()
        }
        TypeDiffKind::Class(class_diff) => {
            !class_diff.inserted_members.is_empty()
                || !class_diff.deleted_members.is_empty()
                || !class_diff.inserted_bases.is_empty()
                || !class_diff.deleted_bases.is_empty()
                || !class_diff.inserted_member_fns.is_empty()
                || !class_diff.deleted_member_fns.is_empty()
                || class_diff.changed_members.iter().any(|m| {
                    m.first.offset_in_bits != m.second.offset_in_bits
                        || m.first.access != m.second.access
                        || m.first.is_static != m.second.is_static
                })
                || class_diff.changed_bases.iter().any(|b| {
                    b.first.offset_in_bits != b.second.offset_in_bits
                        || b.first.is_virtual != b.second.is_virtual
                        || b.first.access != b.second.access
                })
                || class_diff.changed_member_fns.iter().any(|f| {
                    f.first.access != f.second.access
                        || f.first.is_virtual != f.second.is_virtual
                        || f.first.vtable_offset != f.second.vtable_offset
                        || f.first.is_static != f.second.is_static
                })
        }
        TypeDiffKind::FunctionType(fn_diff) => {
            fn_diff.variadic_changed
                || !fn_diff.inserted_params.is_empty()
                || !fn_diff.deleted_params.is_empty()
        }
    }
}

/// Marks every occurrence of an equivalence class after the first as redundant.
#[derive(Default)]
pub struct RedundancyFilter {
    seen_canonicals: HashSet<DiffId>,
}

impl DiffVisitor for RedundancyFilter {
    fn visit_begin(&mut self, _ctx: &DiffContext, node: &DiffNode) {
        if !node.has_changes() || !matches!(&*node.payload(), DiffPayload::Type(_)) {
            return;
        }
        if let Some(canonical) = node.canonical_diff() {
            if !self.seen_canonicals.insert(canonical) {
                node.add_to_local_category(DiffCategory::REDUNDANT);
            }
        }
    }
}
