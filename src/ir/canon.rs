//! Type canonicalization: one representative per structural-equivalence class.
//!
//! ABI type graphs are cyclic and massively duplicated (the same `struct stat`
//! appears in thousands of translation units). This module deduplicates
//! structurally-equivalent types into a single canonical representative per
//! environment, which serves two purposes: memory economy, and turning deep
//! structural equality into a handle comparison everywhere downstream.
//!
//! # Algorithm
//!
//! 1. Compute the [structural hash](crate::ir::hash) of the candidate type to
//!    select a bucket of canonical candidates.
//! 2. Run the cycle-safe deep structural comparison against each candidate in the
//!    bucket. The comparison carries the set of `(a, b)` pairs currently being
//!    compared; re-entering a pair mid-comparison means the cycle closed without
//!    finding a difference, and is treated as equal (coinductive equality).
//! 3. On a hit, record the candidate as the type's canonical representative (a
//!    lookup relation in the environment, not an ownership edge).
//! 4. On a miss, the type becomes its own canonical representative and joins the
//!    bucket.
//!
//! # Deferred Batching
//!
//! Canonicalization is deferred: readers *schedule* types while wiring the graph
//! and the batch pass runs once a translation unit (or corpus) finishes. Early
//! canonicalization could observe a half-built type and make a wrong decision on
//! self-referential structures. The batch pass is idempotent; re-running it on an
//! already-canonical set changes nothing.
//!
//! # Identity Policy
//!
//! - Anonymous types compare purely structurally; their (absent) name does not
//!   participate.
//! - Named types must agree on the name in addition to structure.
//! - Declaration-only types are interchangeable only with another declaration-only
//!   type of the same name. They are never unified with a complete definition,
//!   which would mask missing-member changes.
//! - A typedef naming an anonymous class/enum/union records itself as that type's
//!   naming typedef when it gets canonicalized; the relation is carried on the
//!   named type and excluded from identity.

use std::collections::HashSet;

use crate::ir::{hash::hash_type, Environment, TypeId, TypeKind};

/// Make `id` its own canonical representative and add it to its hash bucket.
pub(crate) fn register_as_canonical(env: &Environment, id: TypeId) {
    let hash = hash_type(env, id);
    env.canonical.insert(id, id);
    env.buckets.entry(hash).or_default().push(id);
}

/// Run one batch canonicalization pass over every scheduled type.
pub(crate) fn canonicalize_pending(env: &Environment) {
    let pending: Vec<TypeId> = {
        let mut guard = env
            .pending
            .lock()
            .expect("canonicalization schedule poisoned");
        std::mem::take(&mut *guard)
    };

    let mut reused = 0usize;
    let mut registered = 0usize;
    for id in pending {
        // Idempotence: a type that already has a representative is left alone.
        if env.canonical.contains_key(&id) {
            continue;
        }
        let canonical = canonicalize(env, id);
        if canonical == id {
            registered += 1;
        } else {
            reused += 1;
        }
    }

    log::debug!(
        "canonicalization batch: {registered} new representatives, {reused} deduplicated, {} total types",
        env.type_count()
    );
}

/// Canonicalize one fully constructed type and return its representative.
///
/// Looks the type up in its hash bucket, deep-comparing against each candidate;
/// registers the type as a new representative when nothing matches.
pub fn canonicalize(env: &Environment, id: TypeId) -> TypeId {
    if let Some(canonical) = env.canonical(id) {
        return canonical;
    }

    maybe_record_naming_typedef(env, id);

    let hash = hash_type(env, id);
    let candidates: Vec<TypeId> = env
        .buckets
        .get(&hash)
        .map(|entry| entry.value().clone())
        .unwrap_or_default();

    for candidate in candidates {
        let mut in_flight = HashSet::new();
        if structural_eq_guarded(env, id, env, candidate, &mut in_flight) {
            env.canonical.insert(id, candidate);
            return candidate;
        }
    }

    env.canonical.insert(id, id);
    env.buckets.entry(hash).or_default().push(id);
    id
}

/// When `id` is a typedef over an anonymous class/enum/union, record the typedef
/// as the naming typedef of that type. First writer wins; the relation is set at
/// most once.
fn maybe_record_naming_typedef(env: &Environment, id: TypeId) {
    let Some(ty) = env.type_of(id) else { return };
    let TypeKind::Typedef { underlying } = ty.kind else {
        return;
    };
    let Some(underlying_ty) = env.type_of(underlying) else {
        return;
    };
    if !underlying_ty.is_anonymous() {
        return;
    }
    if matches!(underlying_ty.kind, TypeKind::Class(_) | TypeKind::Enum { .. }) {
        let _ = underlying_ty.naming_typedef.set(id);
    }
}

/// Deep structural equality between two types, possibly from different
/// environments.
///
/// This is the slow path used inside canonicalization buckets and by the
/// One-Definition-Rule check of the diff filter; everywhere else canonical
/// handle equality substitutes for it.
#[must_use]
pub fn structural_eq(env_a: &Environment, a: TypeId, env_b: &Environment, b: TypeId) -> bool {
    let mut in_flight = HashSet::new();
    structural_eq_guarded(env_a, a, env_b, b, &mut in_flight)
}

/// The cycle-safe comparison worker.
///
/// `in_flight` holds the handle pairs currently being compared; re-entering a pair
/// means the comparison cycled back without finding a difference, which is treated
/// as equal so that the recursion terminates on cyclic graphs.
fn structural_eq_guarded(
    env_a: &Environment,
    a: TypeId,
    env_b: &Environment,
    b: TypeId,
    in_flight: &mut HashSet<(TypeId, TypeId)>,
) -> bool {
    if std::ptr::eq(env_a, env_b) && a == b {
        return true;
    }
    if !in_flight.insert((a, b)) {
        // Coinductive: this pair is already being compared further up the stack.
        return true;
    }

    let result = structural_eq_inner(env_a, a, env_b, b, in_flight);
    in_flight.remove(&(a, b));
    result
}

fn structural_eq_inner(
    env_a: &Environment,
    a: TypeId,
    env_b: &Environment,
    b: TypeId,
    in_flight: &mut HashSet<(TypeId, TypeId)>,
) -> bool {
    let (Some(ta), Some(tb)) = (env_a.type_of(a), env_b.type_of(b)) else {
        panic!(
            "{}:{}: unresolvable type handle in structural comparison ({a}, {b})",
            file!(),
            line!()
        );
    };

    if ta.kind.discriminant() != tb.kind.discriminant() {
        return false;
    }

    // Opaque types only ever unify with opaque types of the same name.
    if ta.is_declaration_only() || tb.is_declaration_only() {
        return ta.is_declaration_only() == tb.is_declaration_only() && ta.name == tb.name;
    }

    if ta.is_anonymous() != tb.is_anonymous() {
        return false;
    }
    // For named types the name is part of the identity; anonymous types compare
    // purely structurally.
    if !ta.is_anonymous() && ta.name != tb.name {
        return false;
    }
    if ta.size_in_bits != tb.size_in_bits {
        return false;
    }

    match (&ta.kind, &tb.kind) {
        (TypeKind::Void, TypeKind::Void)
        | (TypeKind::Variadic, TypeKind::Variadic)
        | (TypeKind::Fundamental, TypeKind::Fundamental) => true,

        (TypeKind::Typedef { underlying: ua }, TypeKind::Typedef { underlying: ub }) => {
            structural_eq_guarded(env_a, *ua, env_b, *ub, in_flight)
        }

        (TypeKind::Pointer { pointee: pa }, TypeKind::Pointer { pointee: pb }) => {
            structural_eq_guarded(env_a, *pa, env_b, *pb, in_flight)
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
        ) => qa == qb && structural_eq_guarded(env_a, *ua, env_b, *ub, in_flight),

        (
            TypeKind::Array {
                element: ea,
                subranges: sa,
            },
            TypeKind::Array {
                element: eb,
                subranges: sb,
            },
        ) => sa == sb && structural_eq_guarded(env_a, *ea, env_b, *eb, in_flight),

        (
            TypeKind::Enum {
                underlying: ua,
                enumerators: ea,
            },
            TypeKind::Enum {
                underlying: ub,
                enumerators: eb,
            },
        ) => {
            if ea != eb {
                return false;
            }
            match (ua, ub) {
                (None, None) => true,
                (Some(ua), Some(ub)) => structural_eq_guarded(env_a, *ua, env_b, *ub, in_flight),
                _ => false,
            }
        }

        (TypeKind::Class(pa), TypeKind::Class(pb)) => {
            if pa.kind != pb.kind
                || pa.members.count() != pb.members.count()
                || pa.bases.count() != pb.bases.count()
                || pa.member_fns.count() != pb.member_fns.count()
            {
                return false;
            }
            for ((_, ma), (_, mb)) in pa.members.iter().zip(pb.members.iter()) {
                if ma.name != mb.name
                    || ma.offset_in_bits != mb.offset_in_bits
                    || ma.access != mb.access
                    || ma.is_static != mb.is_static
                    || !structural_eq_guarded(env_a, ma.type_id, env_b, mb.type_id, in_flight)
                {
                    return false;
                }
            }
            for ((_, ba), (_, bb)) in pa.bases.iter().zip(pb.bases.iter()) {
                if ba.offset_in_bits != bb.offset_in_bits
                    || ba.is_virtual != bb.is_virtual
                    || ba.access != bb.access
                    || !structural_eq_guarded(env_a, ba.type_id, env_b, bb.type_id, in_flight)
                {
                    return false;
                }
            }
            for ((_, fa), (_, fb)) in pa.member_fns.iter().zip(pb.member_fns.iter()) {
                if fa.name != fb.name
                    || fa.access != fb.access
                    || fa.is_virtual != fb.is_virtual
                    || fa.vtable_offset != fb.vtable_offset
                    || fa.is_static != fb.is_static
                    || !structural_eq_guarded(env_a, fa.type_id, env_b, fb.type_id, in_flight)
                {
                    return false;
                }
            }
            true
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
        ) => {
            if va != vb || pa.len() != pb.len() {
                return false;
            }
            match (ra, rb) {
                (None, None) => {}
                (Some(ra), Some(rb)) => {
                    if !structural_eq_guarded(env_a, *ra, env_b, *rb, in_flight) {
                        return false;
                    }
                }
                _ => return false,
            }
            // Parameter names are not part of a function type's identity.
            pa.iter().zip(pb.iter()).all(|(x, y)| {
                x.is_artificial == y.is_artificial
                    && structural_eq_guarded(env_a, x.type_id, env_b, y.type_id, in_flight)
            })
        }

        // The discriminant check above makes a kind mismatch unreachable here.
        _ => unreachable!(
            "{}:{}: unhandled type kind combination in structural comparison",
            file!(),
            line!()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::factories::TestEnv;
    use crate::ir::{TypeFlags, TypeSpec};

    #[test]
    fn test_soundness_independent_builds_share_canonical() {
        let env = TestEnv::new();
        let a = env.simple_struct("P", &[("x", 32)]);
        let b = env.simple_struct("P", &[("x", 32)]);
        env.env().canonicalize_pending();

        assert_eq!(env.env().canonical(a), env.env().canonical(b));
        assert!(env.env().canonical_eq(a, b));
    }

    #[test]
    fn test_structurally_different_types_stay_apart() {
        let env = TestEnv::new();
        let a = env.simple_struct("P", &[("x", 32)]);
        let b = env.simple_struct("P", &[("x", 32), ("y", 32)]);
        env.env().canonicalize_pending();

        assert!(!env.env().canonical_eq(a, b));
    }

    #[test]
    fn test_idempotence() {
        let env = TestEnv::new();
        let a = env.simple_struct("P", &[("x", 32)]);
        let b = env.simple_struct("P", &[("x", 32)]);
        env.env().canonicalize_pending();

        let canonical_before = env.env().canonical_count();
        let mapping_before = (env.env().canonical(a), env.env().canonical(b));

        env.env().schedule_canonicalization(a);
        env.env().schedule_canonicalization(b);
        env.env().canonicalize_pending();

        assert_eq!(env.env().canonical_count(), canonical_before);
        assert_eq!(
            (env.env().canonical(a), env.env().canonical(b)),
            mapping_before
        );
    }

    #[test]
    fn test_cycle_safety_self_referential() {
        let env = TestEnv::new();
        let a = env.self_referential_struct("S");
        let b = env.self_referential_struct("S");
        env.env().canonicalize_pending();

        assert!(env.env().canonical_eq(a, b));
    }

    #[test]
    fn test_mutually_recursive_structs() {
        let env = TestEnv::new();
        let (a1, _a2) = env.mutually_recursive_pair("A", "B");
        let (b1, _b2) = env.mutually_recursive_pair("A", "B");
        env.env().canonicalize_pending();

        assert!(env.env().canonical_eq(a1, b1));
    }

    #[test]
    fn test_declaration_only_never_unifies_with_definition() {
        let env = TestEnv::new();
        let complete = env.simple_struct("S", &[("x", 32)]);
        let opaque = env.env().add_type(
            TypeSpec::named(
                "S",
                crate::ir::TypeKind::Class(crate::ir::ClassPayload::new(
                    crate::ir::ClassKind::Struct,
                )),
            )
            .with_flags(TypeFlags::DECLARATION_ONLY),
        );
        env.env().schedule_canonicalization(opaque);
        env.env().canonicalize_pending();

        assert!(!env.env().canonical_eq(complete, opaque));
    }

    #[test]
    fn test_declaration_only_same_name_unifies() {
        let env = TestEnv::new();
        let mk = || {
            env.env().add_type(
                TypeSpec::named(
                    "S",
                    crate::ir::TypeKind::Class(crate::ir::ClassPayload::new(
                        crate::ir::ClassKind::Struct,
                    )),
                )
                .with_flags(TypeFlags::DECLARATION_ONLY),
            )
        };
        let a = mk();
        let b = mk();
        env.env().schedule_canonicalization(a);
        env.env().schedule_canonicalization(b);
        env.env().canonicalize_pending();

        assert!(env.env().canonical_eq(a, b));
    }

    #[test]
    fn test_anonymous_types_compare_structurally() {
        let env = TestEnv::new();
        let int_id = env.fundamental("int", 32);
        let mk = |env: &TestEnv| {
            let payload = crate::ir::ClassPayload::new(crate::ir::ClassKind::Struct);
            payload.members.push(crate::ir::DataMember {
                name: "x".to_string(),
                type_id: int_id,
                offset_in_bits: 0,
                access: crate::ir::Access::Public,
                is_static: false,
            });
            let id = env
                .env()
                .add_type(TypeSpec::anonymous(crate::ir::TypeKind::Class(payload)).with_size(32));
            env.env().schedule_canonicalization(id);
            id
        };
        let a = mk(&env);
        let b = mk(&env);
        env.env().canonicalize_pending();

        assert!(env.env().canonical_eq(a, b));
    }

    #[test]
    fn test_naming_typedef_recorded() {
        let env = TestEnv::new();
        let int_id = env.fundamental("int", 32);
        let payload = crate::ir::ClassPayload::new(crate::ir::ClassKind::Struct);
        payload.members.push(crate::ir::DataMember {
            name: "x".to_string(),
            type_id: int_id,
            offset_in_bits: 0,
            access: crate::ir::Access::Public,
            is_static: false,
        });
        let anon = env
            .env()
            .add_type(TypeSpec::anonymous(crate::ir::TypeKind::Class(payload)).with_size(32));
        let typedef = env.env().add_type(
            TypeSpec::named("foo", crate::ir::TypeKind::Typedef { underlying: anon }).with_size(32),
        );
        env.env().schedule_canonicalization(anon);
        env.env().schedule_canonicalization(typedef);
        env.env().canonicalize_pending();

        let anon_ty = env.env().type_of(anon).unwrap();
        assert_eq!(anon_ty.naming_typedef(), Some(typedef));
    }

    #[test]
    fn test_naming_typedef_recorded_for_anonymous_enum() {
        let env = TestEnv::new();
        let anon = env.env().add_type(
            TypeSpec::anonymous(crate::ir::TypeKind::Enum {
                underlying: None,
                enumerators: vec![crate::ir::Enumerator {
                    name: "red".to_string(),
                    value: 0,
                }],
            })
            .with_size(32),
        );
        let typedef = env.env().add_type(
            TypeSpec::named("color", crate::ir::TypeKind::Typedef { underlying: anon })
                .with_size(32),
        );
        env.env().schedule_canonicalization(anon);
        env.env().schedule_canonicalization(typedef);
        env.env().canonicalize_pending();

        let anon_ty = env.env().type_of(anon).unwrap();
        assert_eq!(anon_ty.naming_typedef(), Some(typedef));
    }
}
