//! Structural hashing of types for canonicalization bucket selection.
//!
//! This module provides [`StructuralHash`], a collision-resistant hash over the
//! *structure* of a type: kind, size, and a recursive but depth-bounded hash of its
//! immediate children. The canonicalizer uses it to pick the bucket of candidate
//! types that a freshly built type is then deep-compared against.
//!
//! # Hash Design
//!
//! The hash uses FNV-1a inspired sequential mixing rather than XOR combination, so
//! it is order-sensitive and does not self-cancel on repeated components. Because
//! type graphs are cyclic, child recursion is bounded: past [`MAX_HASH_DEPTH`]
//! levels only the child's kind discriminant is mixed in. A shallow hash is fine
//! here; equal types must hash equal, unequal types merely *should* hash unequal,
//! and the deep structural comparison within a bucket is the actual decision maker.
//!
//! # Identity Rules
//!
//! - Names participate for named types only; anonymous types hash purely
//!   structurally, so two anonymous structs with the same shape land in the same
//!   bucket (names are not part of their identity).
//! - Declaration-only types hash by kind and name alone, since their structure is
//!   unknown.

use std::hash::{DefaultHasher, Hash, Hasher};

use crate::ir::{Environment, TypeId, TypeKind};

/// Maximum child-recursion depth of the structural hash.
pub(crate) const MAX_HASH_DEPTH: usize = 8;

/// High-quality hash builder for type structure using FNV-1a inspired mixing.
///
/// Each component is mixed into the hash state sequentially with multiplication,
/// which preserves order and prevents self-cancellation.
pub struct StructuralHash {
    /// Current hash state using FNV-1a algorithm principles
    state: u64,
}

impl StructuralHash {
    /// Create a new structural hash builder.
    ///
    /// Initializes with the FNV-1a offset basis for good hash distribution.
    #[must_use]
    pub fn new() -> Self {
        StructuralHash {
            state: 0xcbf2_9ce4_8422_2325_u64, // FNV-1a 64-bit offset basis
        }
    }

    /// Mix a 64-bit value into the hash state.
    ///
    /// FNV-1a step followed by additional mixing for better avalanche properties.
    fn mix(&mut self, value: u64) {
        self.state ^= value;
        self.state = self.state.wrapping_mul(0x0100_0000_01b3_u64); // FNV-1a 64-bit prime

        self.state ^= self.state >> 33;
        self.state = self.state.wrapping_mul(0xff51_afd7_ed55_8ccd_u64);
        self.state ^= self.state >> 33;
    }

    /// Add any hashable component to the hash.
    #[must_use]
    pub fn add_component<T: Hash + ?Sized>(mut self, component: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        component.hash(&mut hasher);
        self.mix(hasher.finish());
        self
    }

    /// Finalize the hash and return the computed value.
    #[must_use]
    pub fn finalize(self) -> u64 {
        self.state
    }
}

impl Default for StructuralHash {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the structural hash of a registered type.
///
/// # Panics
/// Panics if `id` does not resolve in `env`; presenting a foreign handle is a
/// programming error, not an input condition.
#[must_use]
pub fn hash_type(env: &Environment, id: TypeId) -> u64 {
    hash_type_at_depth(env, id, 0)
}

fn hash_type_at_depth(env: &Environment, id: TypeId, depth: usize) -> u64 {
    let ty = env
        .type_of(id)
        .unwrap_or_else(|| panic!("{}:{}: unresolvable type handle {id}", file!(), line!()));

    let mut hash = StructuralHash::new().add_component(&ty.kind.discriminant());

    // Declaration-only types have no structure to look at. Their identity is
    // their kind and name, which is also the only thing they may be unified on.
    if ty.is_declaration_only() {
        return hash
            .add_component(&1u8)
            .add_component(&ty.name.as_deref().unwrap_or(""))
            .finalize();
    }

    hash = hash.add_component(&ty.size_in_bits);
    if !ty.is_anonymous() {
        if let Some(name) = &ty.name {
            hash = hash.add_component(name);
        }
    }

    if depth >= MAX_HASH_DEPTH {
        return hash.finalize();
    }

    match &ty.kind {
        TypeKind::Void | TypeKind::Variadic | TypeKind::Fundamental => {}
        TypeKind::Typedef { underlying } => {
            hash = hash.add_component(&hash_type_at_depth(env, *underlying, depth + 1));
        }
        TypeKind::Pointer { pointee } => {
            hash = hash.add_component(&hash_type_at_depth(env, *pointee, depth + 1));
        }
        TypeKind::Qualified { quals, underlying } => {
            hash = hash
                .add_component(&quals.bits())
                .add_component(&hash_type_at_depth(env, *underlying, depth + 1));
        }
        TypeKind::Array { element, subranges } => {
            hash = hash.add_component(&hash_type_at_depth(env, *element, depth + 1));
            for subrange in subranges {
                hash = hash.add_component(subrange);
            }
        }
        TypeKind::Enum {
            underlying,
            enumerators,
        } => {
            if let Some(underlying) = underlying {
                hash = hash.add_component(&hash_type_at_depth(env, *underlying, depth + 1));
            }
            for enumerator in enumerators {
                hash = hash.add_component(enumerator);
            }
        }
        TypeKind::Class(payload) => {
            hash = hash.add_component(&payload.kind.to_string());
            for (_, member) in payload.members.iter() {
                hash = hash
                    .add_component(&member.name)
                    .add_component(&member.offset_in_bits)
                    .add_component(&hash_type_at_depth(env, member.type_id, depth + 1));
            }
            for (_, base) in payload.bases.iter() {
                hash = hash
                    .add_component(&base.offset_in_bits)
                    .add_component(&hash_type_at_depth(env, base.type_id, depth + 1));
            }
            for (_, mem_fn) in payload.member_fns.iter() {
                hash = hash
                    .add_component(&mem_fn.name)
                    .add_component(&mem_fn.is_virtual);
            }
        }
        TypeKind::FunctionType {
            return_type,
            parameters,
            is_variadic,
        } => {
            if let Some(return_type) = return_type {
                hash = hash.add_component(&hash_type_at_depth(env, *return_type, depth + 1));
            }
            for parameter in parameters {
                hash = hash.add_component(&hash_type_at_depth(env, parameter.type_id, depth + 1));
            }
            hash = hash.add_component(is_variadic);
        }
    }

    hash.finalize()
}
