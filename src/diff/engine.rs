//! Diff computation over corpora, declarations and types.
//!
//! The engine walks two versions of an artifact in lockstep and produces the
//! diff graph described in [`crate::diff::node`]. Its contract:
//!
//! - **One node per pair**: every compared (first, second) type pair maps to
//!   exactly one diff node, memoized before recursion so cyclic type graphs
//!   terminate.
//! - **Canonical fast path**: canonically equal subjects produce a leaf node
//!   with no changes; the engine never descends into equal pairs.
//! - **Keyed edit scripts**: members and enumerators are matched by name,
//!   function parameters by position, so reordering does not fabricate
//!   deletion/insertion pairs.
//! - **Determinism**: all lists are built in sorted or declaration order, so
//!   two runs over the same corpora produce identical reports.
//!
//! Categorization is not done here; a freshly computed graph carries only
//! has-changes verdicts until [`crate::diff::filter::categorize`] runs.

use std::collections::HashMap;

use crate::diff::category::DiffExitCode;
use crate::diff::context::DiffContext;
use crate::diff::node::{
    BaseChange, ClassDiff, CorpusDiff, DataMemberChange, DiffId, DiffNode, DiffPayload, EnumDiff,
    FnTypeDiff, FunctionDiff, MemberFnChange, ParamChange, TypeDiff, TypeDiffKind, VariableDiff,
};
use crate::diff::traverse::{self, DiffVisitor};
use crate::ir::{
    Corpus, CorpusGroup, ElfSymbolRc, Enumerator, FunctionDeclRc, Type, TypeId, TypeKind,
    VariableDeclRc,
};
use crate::{Error, Result};

/// Compare two corpora and return the root of the diff graph.
///
/// Exported functions and variables are matched by qualified name; unmatched
/// ones land in the added/removed lists, matched ones get declaration diffs of
/// which only the changed ones become children of the root. Unreferenced
/// symbols are matched by `name@version` id. When impact analysis is enabled on
/// the context, every type change reachable from a changed interface is
/// attributed to that interface.
pub fn compute_corpus_diff(ctx: &DiffContext, first: &Corpus, second: &Corpus) -> Result<DiffId> {
    let id = ctx.alloc_node();
    let mut diff = CorpusDiff {
        soname_changed: first.soname != second.soname,
        architecture_changed: first.architecture != second.architecture,
        ..CorpusDiff::default()
    };

    let fns_first = first.exported_functions();
    let fns_second = second.exported_functions();
    let fn_index: HashMap<String, &FunctionDeclRc> = fns_second
        .iter()
        .map(|f| (f.qualified_name(), f))
        .collect();
    for fa in &fns_first {
        match fn_index.get(&fa.qualified_name()) {
            None => diff.removed_functions.push(fa.clone()),
            Some(fb) => {
                let fn_diff = compute_function_diff(ctx, fa, fb)?;
                if ctx.node(fn_diff).has_changes() {
                    if ctx.perform_impact_analysis() {
                        record_impact(ctx, &fa.qualified_name(), fn_diff);
                    }
                    diff.changed_functions.push(fn_diff);
                }
            }
        }
    }
    let known: std::collections::HashSet<String> =
        fns_first.iter().map(|f| f.qualified_name()).collect();
    for fb in &fns_second {
        if !known.contains(&fb.qualified_name()) {
            diff.added_functions.push(fb.clone());
        }
    }

    let vars_first = first.exported_variables();
    let vars_second = second.exported_variables();
    let var_index: HashMap<String, &VariableDeclRc> = vars_second
        .iter()
        .map(|v| (v.qualified_name(), v))
        .collect();
    for va in &vars_first {
        match var_index.get(&va.qualified_name()) {
            None => diff.removed_variables.push(va.clone()),
            Some(vb) => {
                let var_diff = compute_variable_diff(ctx, va, vb)?;
                if ctx.node(var_diff).has_changes() {
                    if ctx.perform_impact_analysis() {
                        record_impact(ctx, &va.qualified_name(), var_diff);
                    }
                    diff.changed_variables.push(var_diff);
                }
            }
        }
    }
    let known: std::collections::HashSet<String> =
        vars_first.iter().map(|v| v.qualified_name()).collect();
    for vb in &vars_second {
        if !known.contains(&vb.qualified_name()) {
            diff.added_variables.push(vb.clone());
        }
    }

    let (added, removed) = symbol_set_diff(
        &first.unreferenced_function_symbols(),
        &second.unreferenced_function_symbols(),
    );
    diff.added_function_symbols = added;
    diff.removed_function_symbols = removed;
    let (added, removed) = symbol_set_diff(
        &first.unreferenced_variable_symbols(),
        &second.unreferenced_variable_symbols(),
    );
    diff.added_variable_symbols = added;
    diff.removed_variable_symbols = removed;

    let has_changes = diff.soname_changed
        || diff.architecture_changed
        || !diff.added_functions.is_empty()
        || !diff.removed_functions.is_empty()
        || !diff.changed_functions.is_empty()
        || !diff.added_variables.is_empty()
        || !diff.removed_variables.is_empty()
        || !diff.changed_variables.is_empty()
        || !diff.added_function_symbols.is_empty()
        || !diff.removed_function_symbols.is_empty()
        || !diff.added_variable_symbols.is_empty()
        || !diff.removed_variable_symbols.is_empty();

    let node = ctx.node(id);
    node.set_has_changes(has_changes);
    node.set_payload(DiffPayload::Corpus(diff));
    log::debug!(
        "corpus diff {} vs {}: {} nodes, changes: {}",
        first.path,
        second.path,
        ctx.node_count(),
        has_changes
    );
    Ok(id)
}

/// The comparison of two corpus groups.
///
/// Member corpora are paired by soname (path when the soname is empty); each
/// pair present in both groups contributes one corpus diff root. Unmatched
/// members are additions or removals of whole binaries.
#[derive(Debug, Default)]
pub struct CorpusGroupDiff {
    /// Roots of the member corpus diffs that carry changes, in first-group order
    pub corpus_diffs: Vec<DiffId>,
    /// Sonames (or paths) of corpora only the second group has
    pub added_corpora: Vec<String>,
    /// Sonames (or paths) of corpora only the first group has
    pub removed_corpora: Vec<String>,
}

impl CorpusGroupDiff {
    /// Whether any member changed or the group membership itself did.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.corpus_diffs.is_empty()
            || !self.added_corpora.is_empty()
            || !self.removed_corpora.is_empty()
    }
}

fn group_member_key(corpus: &Corpus) -> String {
    if corpus.soname.is_empty() {
        corpus.path.clone()
    } else {
        corpus.soname.clone()
    }
}

/// Compare two corpus groups, e.g. a kernel image plus its modules, as one
/// unit.
///
/// Every member corpus must live in the context's environments. The member
/// corpus diffs share the context's caches, so a type changed in several
/// members is still diffed once.
pub fn compute_corpus_group_diff(
    ctx: &DiffContext,
    first: &CorpusGroup,
    second: &CorpusGroup,
) -> Result<CorpusGroupDiff> {
    let mut diff = CorpusGroupDiff::default();
    for ca in first.corpora() {
        let key = group_member_key(ca);
        match second.corpus_for(&key) {
            None => diff.removed_corpora.push(key),
            Some(cb) => {
                let root = compute_corpus_diff(ctx, ca, cb)?;
                if ctx.node(root).has_changes() {
                    diff.corpus_diffs.push(root);
                }
            }
        }
    }
    for cb in second.corpora() {
        let key = group_member_key(cb);
        if first.corpus_for(&key).is_none() {
            diff.added_corpora.push(key);
        }
    }
    log::debug!(
        "corpus group diff {} vs {}: {} changed, {} removed, {} added members",
        first.path,
        second.path,
        diff.corpus_diffs.len(),
        diff.removed_corpora.len(),
        diff.added_corpora.len()
    );
    Ok(diff)
}

/// Derive the exit status of a whole group comparison from its categorized
/// member diffs: the union of the member exit codes, plus removal/addition
/// bits for binaries that left or joined the group.
pub fn group_exit_code(ctx: &DiffContext, diff: &CorpusGroupDiff) -> DiffExitCode {
    let mut code = DiffExitCode::empty();
    for &root in &diff.corpus_diffs {
        code |= exit_code(ctx, root);
    }
    if !diff.removed_corpora.is_empty() {
        code |= DiffExitCode::ABI_CHANGE | DiffExitCode::ABI_INCOMPATIBLE_CHANGE;
    }
    if !diff.added_corpora.is_empty() {
        code |= DiffExitCode::ABI_CHANGE;
    }
    code
}

/// Compare two function declarations sharing an exported name.
pub fn compute_function_diff(
    ctx: &DiffContext,
    first: &FunctionDeclRc,
    second: &FunctionDeclRc,
) -> Result<DiffId> {
    require_function_type(ctx.env_first(), first)?;
    require_function_type(ctx.env_second(), second)?;
    let id = ctx.alloc_node();
    let type_diff = compute_type_diff(ctx, first.type_id, second.type_id)?;
    let has_changes = ctx.node(type_diff).has_changes()
        || first.name != second.name
        || first.linkage_name != second.linkage_name
        || symbols_differ(&first.symbol, &second.symbol);
    let node = ctx.node(id);
    node.set_has_changes(has_changes);
    node.set_payload(DiffPayload::Function(FunctionDiff {
        first: first.clone(),
        second: second.clone(),
        type_diff,
    }));
    Ok(id)
}

/// Compare two variable declarations sharing an exported name.
pub fn compute_variable_diff(
    ctx: &DiffContext,
    first: &VariableDeclRc,
    second: &VariableDeclRc,
) -> Result<DiffId> {
    let id = ctx.alloc_node();
    let type_diff = compute_type_diff(ctx, first.type_id, second.type_id)?;
    let has_changes = ctx.node(type_diff).has_changes()
        || first.name != second.name
        || first.linkage_name != second.linkage_name
        || symbols_differ(&first.symbol, &second.symbol);
    let node = ctx.node(id);
    node.set_has_changes(has_changes);
    node.set_payload(DiffPayload::Variable(VariableDiff {
        first: first.clone(),
        second: second.clone(),
        type_diff,
    }));
    Ok(id)
}

/// Compare two types and return their (memoized) diff node.
///
/// The pair is memoized *before* recursing into children; a back edge of a
/// cyclic type graph finds the mid-construction node and returns its handle,
/// which is what makes the recursion terminate.
pub fn compute_type_diff(ctx: &DiffContext, first: TypeId, second: TypeId) -> Result<DiffId> {
    if let Some(id) = ctx.lookup_type_pair(first, second) {
        return Ok(id);
    }
    let id = ctx.alloc_node();
    ctx.memoize_type_pair(first, second, id);
    ctx.link_canonical_diff(first, second, id);

    let equal = ctx.types_equal(first, second);
    ctx.node(id).set_has_changes(!equal);

    let ta = ctx
        .env_first()
        .type_of(first)
        .ok_or(Error::TypeNotFound(first))?;
    let tb = ctx
        .env_second()
        .type_of(second)
        .ok_or(Error::TypeNotFound(second))?;

    // Equal pairs get a leaf payload; there is nothing to descend into.
    let kind = if equal {
        TypeDiffKind::Basic
    } else {
        type_diff_kind(ctx, &ta, &tb)?
    };
    ctx.node(id)
        .set_payload(DiffPayload::Type(TypeDiff { first, second, kind }));
    Ok(id)
}

fn type_diff_kind(ctx: &DiffContext, ta: &Type, tb: &Type) -> Result<TypeDiffKind> {
    // A declaration-only side has no structure to descend into.
    if ta.is_declaration_only() || tb.is_declaration_only() {
        return Ok(TypeDiffKind::Basic);
    }
    let kind = match (&ta.kind, &tb.kind) {
        (TypeKind::Void, TypeKind::Void)
        | (TypeKind::Variadic, TypeKind::Variadic)
        | (TypeKind::Fundamental, TypeKind::Fundamental) => TypeDiffKind::Basic,
        (TypeKind::Typedef { underlying: ua }, TypeKind::Typedef { underlying: ub }) => {
            TypeDiffKind::Typedef {
                underlying: compute_type_diff(ctx, *ua, *ub)?,
            }
        }
        (TypeKind::Pointer { pointee: pa }, TypeKind::Pointer { pointee: pb }) => {
            TypeDiffKind::Pointer {
                pointee: compute_type_diff(ctx, *pa, *pb)?,
            }
        }
        (
            TypeKind::Qualified {
                quals: qa,
                underlying: ua,
            },
            TypeKind::Qualified {
                quals: qb,
                underlying: ub,
            },
        ) => TypeDiffKind::Qualified {
            underlying: compute_type_diff(ctx, *ua, *ub)?,
            quals_changed: qa != qb,
        },
        (
            TypeKind::Array {
                element: ea,
                subranges: sa,
            },
            TypeKind::Array {
                element: eb,
                subranges: sb,
            },
        ) => TypeDiffKind::Array {
            element: compute_type_diff(ctx, *ea, *eb)?,
            subranges_changed: sa != sb,
        },
        (
            TypeKind::Enum {
                underlying: ua,
                enumerators: ea,
            },
            TypeKind::Enum {
                underlying: ub,
                enumerators: eb,
            },
        ) => TypeDiffKind::Enum(enum_diff(ctx, *ua, *ub, ea, eb)?),
        (TypeKind::Class(pa), TypeKind::Class(pb)) => {
            TypeDiffKind::Class(Box::new(class_diff(ctx, pa, pb)?))
        }
        (
            TypeKind::FunctionType {
                return_type: ra,
                parameters: pa,
                is_variadic: va,
            },
            TypeKind::FunctionType {
                return_type: rb,
                parameters: pb,
                is_variadic: vb,
            },
        ) => TypeDiffKind::FunctionType(fn_type_diff(ctx, *ra, *rb, pa, pb, *va != *vb)?),
        _ => {
            debug_assert_ne!(
                std::mem::discriminant(&ta.kind),
                std::mem::discriminant(&tb.kind)
            );
            TypeDiffKind::Distinct
        }
    };
    Ok(kind)
}

fn enum_diff(
    ctx: &DiffContext,
    underlying_a: Option<TypeId>,
    underlying_b: Option<TypeId>,
    enums_a: &[Enumerator],
    enums_b: &[Enumerator],
) -> Result<EnumDiff> {
    let mut diff = EnumDiff::default();
    if let (Some(ua), Some(ub)) = (underlying_a, underlying_b) {
        if !ctx.types_equal(ua, ub) {
            diff.underlying = Some(compute_type_diff(ctx, ua, ub)?);
        }
    }
    let index_b: HashMap<&str, &Enumerator> =
        enums_b.iter().map(|e| (e.name.as_str(), e)).collect();
    for ea in enums_a {
        match index_b.get(ea.name.as_str()) {
            None => diff.deleted.push(ea.clone()),
            Some(eb) => {
                if ea.value != eb.value {
                    diff.changed.push((ea.clone(), (*eb).clone()));
                }
            }
        }
    }
    let known: std::collections::HashSet<&str> = enums_a.iter().map(|e| e.name.as_str()).collect();
    for eb in enums_b {
        if !known.contains(eb.name.as_str()) {
            diff.inserted.push(eb.clone());
        }
    }
    Ok(diff)
}

fn class_diff(
    ctx: &DiffContext,
    pa: &crate::ir::ClassPayload,
    pb: &crate::ir::ClassPayload,
) -> Result<ClassDiff> {
    let mut diff = ClassDiff::default();

    // Data members, keyed by name.
    let index_b: HashMap<&str, &crate::ir::DataMember> = pb
        .members
        .iter()
        .map(|(_, m)| (m.name.as_str(), m))
        .collect();
    for (_, ma) in pa.members.iter() {
        match index_b.get(ma.name.as_str()) {
            None => diff.deleted_members.push(ma.clone()),
            Some(mb) => {
                let type_changed = !ctx.types_equal(ma.type_id, mb.type_id);
                if type_changed
                    || ma.offset_in_bits != mb.offset_in_bits
                    || ma.access != mb.access
                    || ma.is_static != mb.is_static
                {
                    diff.changed_members.push(DataMemberChange {
                        first: ma.clone(),
                        second: (*mb).clone(),
                        type_diff: compute_type_diff(ctx, ma.type_id, mb.type_id)?,
                    });
                }
            }
        }
    }
    let known: std::collections::HashSet<&str> =
        pa.members.iter().map(|(_, m)| m.name.as_str()).collect();
    for (_, mb) in pb.members.iter() {
        if !known.contains(mb.name.as_str()) {
            diff.inserted_members.push(mb.clone());
        }
    }

    // Base classes, keyed by the base type's name.
    let base_key = |env: &crate::ir::Environment, base: &crate::ir::BaseSpec| -> Result<String> {
        let ty = env
            .type_of(base.type_id)
            .ok_or(Error::TypeNotFound(base.type_id))?;
        Ok(ty.name.clone().unwrap_or_else(|| base.type_id.to_string()))
    };
    let mut bases_b: HashMap<String, crate::ir::BaseSpec> = HashMap::new();
    for (_, base) in pb.bases.iter() {
        bases_b.insert(base_key(ctx.env_second(), base)?, base.clone());
    }
    let mut bases_a_keys = std::collections::HashSet::new();
    for (_, base) in pa.bases.iter() {
        let key = base_key(ctx.env_first(), base)?;
        bases_a_keys.insert(key.clone());
        match bases_b.get(&key) {
            None => diff.deleted_bases.push(base.clone()),
            Some(other) => {
                let type_changed = !ctx.types_equal(base.type_id, other.type_id);
                if type_changed
                    || base.offset_in_bits != other.offset_in_bits
                    || base.is_virtual != other.is_virtual
                    || base.access != other.access
                {
                    diff.changed_bases.push(BaseChange {
                        first: base.clone(),
                        second: other.clone(),
                        type_diff: compute_type_diff(ctx, base.type_id, other.type_id)?,
                    });
                }
            }
        }
    }
    for (_, base) in pb.bases.iter() {
        if !bases_a_keys.contains(&base_key(ctx.env_second(), base)?) {
            diff.inserted_bases.push(base.clone());
        }
    }

    // Member functions, keyed by linkage name (plain name when unmangled).
    let fn_key = |f: &crate::ir::MemberFunction| -> String {
        if f.linkage_name.is_empty() {
            f.name.clone()
        } else {
            f.linkage_name.clone()
        }
    };
    let fns_b: HashMap<String, &crate::ir::MemberFunction> = pb
        .member_fns
        .iter()
        .map(|(_, f)| (fn_key(f), f))
        .collect();
    for (_, fa) in pa.member_fns.iter() {
        match fns_b.get(&fn_key(fa)) {
            None => diff.deleted_member_fns.push(fa.clone()),
            Some(fb) => {
                let type_changed = !ctx.types_equal(fa.type_id, fb.type_id);
                if type_changed
                    || fa.access != fb.access
                    || fa.is_virtual != fb.is_virtual
                    || fa.vtable_offset != fb.vtable_offset
                    || fa.is_static != fb.is_static
                {
                    diff.changed_member_fns.push(MemberFnChange {
                        first: fa.clone(),
                        second: (*fb).clone(),
                        type_diff: compute_type_diff(ctx, fa.type_id, fb.type_id)?,
                    });
                }
            }
        }
    }
    let known: std::collections::HashSet<String> =
        pa.member_fns.iter().map(|(_, f)| fn_key(f)).collect();
    for (_, fb) in pb.member_fns.iter() {
        if !known.contains(&fn_key(fb)) {
            diff.inserted_member_fns.push(fb.clone());
        }
    }

    Ok(diff)
}

fn fn_type_diff(
    ctx: &DiffContext,
    return_a: Option<TypeId>,
    return_b: Option<TypeId>,
    params_a: &[crate::ir::FnParameter],
    params_b: &[crate::ir::FnParameter],
    variadic_changed: bool,
) -> Result<FnTypeDiff> {
    let mut diff = FnTypeDiff {
        variadic_changed,
        ..FnTypeDiff::default()
    };

    // An absent return type means void.
    let ra = return_a.unwrap_or_else(|| ctx.env_first().void_type());
    let rb = return_b.unwrap_or_else(|| ctx.env_second().void_type());
    if !ctx.types_equal(ra, rb) {
        diff.return_diff = Some(compute_type_diff(ctx, ra, rb)?);
    }

    // Parameters are positional; renaming one is not an ABI change.
    let common = params_a.len().min(params_b.len());
    for index in 0..common {
        let pa = &params_a[index];
        let pb = &params_b[index];
        if !ctx.types_equal(pa.type_id, pb.type_id) {
            diff.changed_params.push(ParamChange {
                index,
                first: pa.clone(),
                second: pb.clone(),
                type_diff: compute_type_diff(ctx, pa.type_id, pb.type_id)?,
            });
        }
    }
    diff.deleted_params = params_a[common..].to_vec();
    diff.inserted_params = params_b[common..].to_vec();

    Ok(diff)
}

fn require_function_type(env: &crate::ir::Environment, decl: &FunctionDeclRc) -> Result<()> {
    let ty = env
        .type_of(decl.type_id)
        .ok_or(Error::TypeNotFound(decl.type_id))?;
    if !matches!(ty.kind, TypeKind::FunctionType { .. }) {
        return Err(malformed_error!(
            "function '{}' declared with non-function type {}",
            decl.qualified_name(),
            decl.type_id
        ));
    }
    Ok(())
}

pub(crate) fn symbols_differ(a: &Option<ElfSymbolRc>, b: &Option<ElfSymbolRc>) -> bool {
    match (a, b) {
        (None, None) => false,
        (Some(sa), Some(sb)) => sa.id_string() != sb.id_string() || sa.aliases != sb.aliases,
        _ => true,
    }
}

fn symbol_set_diff(
    first: &[ElfSymbolRc],
    second: &[ElfSymbolRc],
) -> (Vec<ElfSymbolRc>, Vec<ElfSymbolRc>) {
    let ids_first: std::collections::HashSet<String> =
        first.iter().map(|s| s.id_string()).collect();
    let ids_second: std::collections::HashSet<String> =
        second.iter().map(|s| s.id_string()).collect();
    let added = second
        .iter()
        .filter(|s| !ids_first.contains(&s.id_string()))
        .cloned()
        .collect();
    let removed = first
        .iter()
        .filter(|s| !ids_second.contains(&s.id_string()))
        .cloned()
        .collect();
    (added, removed)
}

struct ImpactVisitor<'a> {
    interface: &'a str,
}

impl DiffVisitor for ImpactVisitor<'_> {
    fn visit_begin(&mut self, ctx: &DiffContext, node: &DiffNode) {
        if node.has_changes() && matches!(&*node.payload(), DiffPayload::Type(_)) {
            ctx.record_impacted_interface(node.id, self.interface);
        }
    }
}

/// Attribute every changed type node reachable from `root` to `interface`.
fn record_impact(ctx: &DiffContext, interface: &str, root: DiffId) {
    let was_forbidden = ctx.visiting_a_node_twice_is_forbidden();
    ctx.forbid_visiting_a_node_twice(true);
    let mut visitor = ImpactVisitor { interface };
    traverse::traverse(ctx, root, &mut visitor);
    ctx.forbid_visiting_a_node_twice(was_forbidden);
    ctx.clear_visited();
}

struct ExitCodeVisitor {
    reported: bool,
    incompatible: bool,
}

impl DiffVisitor for ExitCodeVisitor {
    fn visit_begin(&mut self, ctx: &DiffContext, node: &DiffNode) {
        if node.to_be_reported(ctx) {
            self.reported = true;
            if node.category().is_harmful() {
                self.incompatible = true;
            }
        }
    }
}

/// Derive the process exit status from a categorized corpus diff.
///
/// Any reportable change sets the ABI-change bit. Harmful, unsuppressed
/// categories and removed interfaces or symbols additionally set the
/// incompatible bit; pure additions never do.
pub fn exit_code(ctx: &DiffContext, root: DiffId) -> DiffExitCode {
    let mut visitor = ExitCodeVisitor {
        reported: false,
        incompatible: false,
    };
    let was_forbidden = ctx.visiting_a_node_twice_is_forbidden();
    ctx.forbid_visiting_a_node_twice(true);
    traverse::traverse(ctx, root, &mut visitor);
    ctx.forbid_visiting_a_node_twice(was_forbidden);
    ctx.clear_visited();

    if let DiffPayload::Corpus(corpus_diff) = &*ctx.node(root).payload() {
        if !corpus_diff.removed_functions.is_empty()
            || !corpus_diff.removed_variables.is_empty()
            || !corpus_diff.removed_function_symbols.is_empty()
            || !corpus_diff.removed_variable_symbols.is_empty()
        {
            visitor.reported = true;
            visitor.incompatible = true;
        }
        if !corpus_diff.added_functions.is_empty()
            || !corpus_diff.added_variables.is_empty()
            || !corpus_diff.added_function_symbols.is_empty()
            || !corpus_diff.added_variable_symbols.is_empty()
        {
            visitor.reported = true;
        }
    }

    let mut code = DiffExitCode::empty();
    if visitor.reported {
        code |= DiffExitCode::ABI_CHANGE;
    }
    if visitor.incompatible {
        code |= DiffExitCode::ABI_INCOMPATIBLE_CHANGE;
    }
    code
}
