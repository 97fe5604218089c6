//! Analysis-scoped arena owning every type of a run.
//!
//! This module provides the [`Environment`], the single owner of all [`Type`]
//! instances created during one analysis run and of the canonical-type table that
//! makes structural equality a pointer-sized comparison.
//!
//! # Registry Architecture
//!
//! The environment uses a multi-index layout:
//!
//! - **Handle-based storage**: Primary ordered store mapping [`TypeId`] to the
//!   shared [`Type`] (`SkipMap`)
//! - **Canonical map**: `TypeId -> TypeId` lookup relation pointing every type at
//!   the single representative of its structural-equivalence class (`DashMap`).
//!   This is explicitly a lookup relation, never an ownership edge, so
//!   canonicalization cannot create ownership cycles.
//! - **Hash buckets**: structural-hash -> candidate canonical types, probed by the
//!   canonicalizer (`DashMap`)
//! - **Interned primitives**: the `void` and variadic-marker types, created once
//!   per environment
//!
//! # Lifetime and Ownership
//!
//! The environment lives for the whole analysis; every type reachable from a corpus
//! belongs to exactly one environment, and all handles are invalidated when it is
//! dropped. Declarations and diff nodes refer to types by handle and never own them.
//!
//! # Thread Safety
//!
//! The storage structures are concurrent (matching the registry layout this design
//! is derived from), but the canonicalization *protocol* is single-threaded per
//! environment: the canonical table must never be mutated from two comparison tasks,
//! which is why each task owns its own environment instance.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, Mutex, OnceLock,
};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;

use crate::ir::{canon, Type, TypeFlags, TypeId, TypeKind, TypeRc};

/// All the information needed to register a new type with an [`Environment`].
///
/// The environment allocates the handle; everything else is supplied here.
#[derive(Debug)]
pub struct TypeSpec {
    /// Type name; `None` for anonymous types
    pub name: Option<String>,
    /// Size of the type in bits; 0 for declaration-only types
    pub size_in_bits: u64,
    /// Alignment of the type in bits; 0 when unknown
    pub alignment_in_bits: u64,
    /// Anonymous / declaration-only / artificial flags
    pub flags: TypeFlags,
    /// The structural kind and payload
    pub kind: TypeKind,
    /// Source file the type was declared in, when known
    pub source_location: Option<String>,
}

impl TypeSpec {
    /// A spec with the given name and kind and everything else defaulted.
    #[must_use]
    pub fn named(name: &str, kind: TypeKind) -> Self {
        TypeSpec {
            name: Some(name.to_string()),
            size_in_bits: 0,
            alignment_in_bits: 0,
            flags: TypeFlags::empty(),
            kind,
            source_location: None,
        }
    }

    /// An anonymous spec with the given kind.
    #[must_use]
    pub fn anonymous(kind: TypeKind) -> Self {
        TypeSpec {
            name: None,
            size_in_bits: 0,
            alignment_in_bits: 0,
            flags: TypeFlags::ANONYMOUS,
            kind,
            source_location: None,
        }
    }

    /// Set the size in bits.
    #[must_use]
    pub fn with_size(mut self, size_in_bits: u64) -> Self {
        self.size_in_bits = size_in_bits;
        self
    }

    /// Set the alignment in bits.
    #[must_use]
    pub fn with_alignment(mut self, alignment_in_bits: u64) -> Self {
        self.alignment_in_bits = alignment_in_bits;
        self
    }

    /// Add flags on top of the present ones.
    #[must_use]
    pub fn with_flags(mut self, flags: TypeFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Set the declaring source file.
    #[must_use]
    pub fn with_location(mut self, location: &str) -> Self {
        self.source_location = Some(location.to_string());
        self
    }
}

/// Process/analysis-scoped arena owning every type and the canonical-type table.
pub struct Environment {
    /// Primary ordered storage, handle -> type
    pub(crate) types: SkipMap<TypeId, TypeRc>,
    /// Next handle to allocate
    next_id: AtomicU32,
    /// Canonical map: every canonicalized type -> its canonical representative
    pub(crate) canonical: DashMap<TypeId, TypeId>,
    /// Structural-hash buckets of canonical candidates
    pub(crate) buckets: DashMap<u64, Vec<TypeId>>,
    /// Types scheduled for the next batch canonicalization pass, in schedule order
    pub(crate) pending: Mutex<Vec<TypeId>>,
    /// The interned `void` type
    void_id: TypeId,
    /// The interned variadic-marker type
    variadic_id: TypeId,
}

impl Environment {
    /// Create a fresh environment with its interned primitive types.
    #[must_use]
    pub fn new() -> Self {
        let env = Environment {
            types: SkipMap::new(),
            next_id: AtomicU32::new(0),
            canonical: DashMap::new(),
            buckets: DashMap::new(),
            pending: Mutex::new(Vec::new()),
            void_id: TypeId::new(0),
            variadic_id: TypeId::new(0),
        };

        let void_id = env.add_type(TypeSpec::named("void", TypeKind::Void));
        let variadic_id = env.add_type(TypeSpec::named("variadic parameter type", TypeKind::Variadic));

        // Interned primitives are their own canonical representative from the start.
        canon::register_as_canonical(&env, void_id);
        canon::register_as_canonical(&env, variadic_id);

        Environment {
            void_id,
            variadic_id,
            ..env
        }
    }

    /// The interned `void` type of this environment.
    #[must_use]
    pub fn void_type(&self) -> TypeId {
        self.void_id
    }

    /// The interned variadic-marker type of this environment.
    #[must_use]
    pub fn variadic_type(&self) -> TypeId {
        self.variadic_id
    }

    /// Register a new type and return its handle.
    ///
    /// The type is *not* canonicalized yet; call [`Environment::schedule_canonicalization`]
    /// once its structure is complete, then [`Environment::canonicalize_pending`] when the
    /// translation unit (or corpus) is done. Early canonicalization of a mid-construction
    /// type would make an incorrect decision on self-referential structures.
    pub fn add_type(&self, spec: TypeSpec) -> TypeId {
        let id = TypeId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let ty = Arc::new(Type {
            id,
            name: spec.name,
            size_in_bits: spec.size_in_bits,
            alignment_in_bits: spec.alignment_in_bits,
            flags: spec.flags,
            kind: spec.kind,
            source_location: spec.source_location,
            naming_typedef: OnceLock::new(),
        });
        self.types.insert(id, ty);
        id
    }

    /// Resolve a handle to its type.
    #[must_use]
    pub fn type_of(&self, id: TypeId) -> Option<TypeRc> {
        self.types.get(&id).map(|entry| entry.value().clone())
    }

    /// Number of types registered in this environment.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// The canonical representative of a type, if it has been canonicalized.
    #[must_use]
    pub fn canonical(&self, id: TypeId) -> Option<TypeId> {
        self.canonical.get(&id).map(|entry| *entry.value())
    }

    /// Whether a type is its own canonical representative.
    #[must_use]
    pub fn is_canonical(&self, id: TypeId) -> bool {
        self.canonical(id) == Some(id)
    }

    /// Number of distinct canonical representatives registered so far.
    #[must_use]
    pub fn canonical_count(&self) -> usize {
        self.buckets
            .iter()
            .map(|entry| entry.value().len())
            .sum()
    }

    /// Canonical equality: the substitute for deep structural equality once
    /// canonicalization has completed.
    ///
    /// Returns `false` for types that have not been canonicalized yet; callers
    /// comparing mid-construction types must use the deep structural check instead.
    #[must_use]
    pub fn canonical_eq(&self, a: TypeId, b: TypeId) -> bool {
        match (self.canonical(a), self.canonical(b)) {
            (Some(ca), Some(cb)) => ca == cb,
            _ => false,
        }
    }

    /// Schedule a fully constructed type for the next batch canonicalization pass.
    ///
    /// Scheduling the same type twice is fine; the batch pass skips types that
    /// already have a canonical representative.
    pub fn schedule_canonicalization(&self, id: TypeId) {
        self.pending
            .lock()
            .expect("canonicalization schedule poisoned")
            .push(id);
    }

    /// Run one batch canonicalization pass over every scheduled type, in schedule
    /// order.
    ///
    /// Idempotent: re-running on an already-canonicalized set is a no-op. See
    /// [`crate::ir::canon`] for the algorithm.
    pub fn canonicalize_pending(&self) {
        canon::canonicalize_pending(self);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interned_primitives() {
        let env = Environment::new();
        let void = env.type_of(env.void_type()).unwrap();
        assert!(matches!(void.kind, TypeKind::Void));
        assert!(env.is_canonical(env.void_type()));
        assert!(env.is_canonical(env.variadic_type()));
    }

    #[test]
    fn test_add_and_resolve() {
        let env = Environment::new();
        let id = env.add_type(TypeSpec::named("int", TypeKind::Fundamental).with_size(32));
        let ty = env.type_of(id).unwrap();
        assert_eq!(ty.name.as_deref(), Some("int"));
        assert_eq!(ty.size_in_bits, 32);
        assert_eq!(ty.id, id);
    }

    #[test]
    fn test_unregistered_type_has_no_canonical() {
        let env = Environment::new();
        let id = env.add_type(TypeSpec::named("int", TypeKind::Fundamental).with_size(32));
        assert_eq!(env.canonical(id), None);
        assert!(!env.canonical_eq(id, id));
    }

    #[test]
    fn test_handles_are_distinct() {
        let env = Environment::new();
        let a = env.add_type(TypeSpec::named("int", TypeKind::Fundamental).with_size(32));
        let b = env.add_type(TypeSpec::named("int", TypeKind::Fundamental).with_size(32));
        assert_ne!(a, b);
    }
}
