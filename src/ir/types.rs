//! Core type representation for ABI analysis.
//!
//! This module defines the building blocks of the ABI intermediate representation:
//! [`TypeId`] handles, the [`Type`] structure and the closed [`TypeKind`] sum over
//! every type shape that can appear in the ABI of a compiled binary.
//!
//! # Key Components
//!
//! - [`TypeId`] - Stable handle into an [`crate::ir::Environment`] arena
//! - [`Type`] - Size, alignment, flags and kind of one type
//! - [`TypeKind`] - Closed sum over all supported type shapes
//! - [`DataMember`], [`BaseSpec`], [`MemberFunction`] - Class structure
//! - [`Enumerator`], [`Subrange`], [`FnParameter`] - Enum, array and function structure
//!
//! # Design
//!
//! Type graphs in real binaries are cyclic (a struct containing a pointer to itself,
//! mutually referencing structs) and massively shared (the same type referenced from
//! thousands of declarations). Every cross-type reference is therefore a [`TypeId`]
//! handle resolved through the owning environment, never a direct ownership edge.
//! Traversal and comparison routines carry explicit visited/in-flight sets keyed by
//! handle pairs, which is what makes recursion over the graph terminate.
//!
//! Class payloads use `boxcar::Vec` for their member lists so that members can still
//! be appended through a shared reference while the type is mid-construction. This is
//! required for self-referential structs: the class must be registered (to obtain its
//! handle) before the member that points back at it can be built. Once the type has
//! been canonicalized it is structurally frozen by convention.

use std::fmt;
use std::sync::{Arc, OnceLock};

use bitflags::bitflags;
use strum::Display;

/// A stable handle to a [`Type`] owned by an [`crate::ir::Environment`].
///
/// Handles are plain 32-bit indices and are only meaningful within the environment
/// that issued them. Handle equality is *identity* equality; structural equality
/// goes through canonicalization (see [`crate::ir::Environment::canonical_eq`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    /// Create a handle from a raw index.
    #[must_use]
    pub(crate) fn new(index: u32) -> Self {
        TypeId(index)
    }

    /// The raw index value of this handle.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type:0x{:08X}", self.0)
    }
}

bitflags! {
    /// Flags that qualify a type independently of its kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypeFlags: u8 {
        /// The type has no name of its own (e.g. an unnamed struct inside a typedef).
        const ANONYMOUS = 0x01;
        /// The type is known only by forward declaration; its layout is unknown and
        /// its size is meaningless (0).
        const DECLARATION_ONLY = 0x02;
        /// The type was synthesized by the compiler or the reader rather than
        /// written in source.
        const ARTIFICIAL = 0x04;
    }
}

bitflags! {
    /// CV-ness of a [`TypeKind::Qualified`] type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CvQualifiers: u8 {
        /// `const`
        const CONST = 0x01;
        /// `volatile`
        const VOLATILE = 0x02;
        /// `restrict`
        const RESTRICT = 0x04;
    }
}

/// Member access specifier, in decreasing order of visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Access {
    /// Accessible from everywhere
    Public,
    /// Accessible from the class and its descendants
    Protected,
    /// Accessible from the class only
    Private,
}

/// Kind of aggregate a [`TypeKind::Class`] payload describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ClassKind {
    /// A `struct`
    Struct,
    /// A `class`
    Class,
    /// A `union`; all data members are at offset 0
    Union,
}

/// One dimension of an array type.
///
/// Arrays carry one subrange per dimension; an unknown length models the
/// flexible-array-member / incomplete-array case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Subrange {
    /// Lowest valid index of this dimension
    pub lower_bound: u64,
    /// Number of elements, or `None` if the dimension length is unknown
    pub length: Option<u64>,
}

/// A named constant of an enum type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Enumerator {
    /// Enumerator name as written in source
    pub name: String,
    /// Enumerator value
    pub value: i64,
}

/// A data member of a class, struct or union.
#[derive(Debug, Clone)]
pub struct DataMember {
    /// Member name
    pub name: String,
    /// Handle to the member's type
    pub type_id: TypeId,
    /// Offset of the member within the containing type, in bits.
    ///
    /// Static data members carry no layout; their offset is 0 and not meaningful.
    pub offset_in_bits: u64,
    /// Access specifier of the member
    pub access: Access,
    /// Whether the member is static (lives outside the instance layout)
    pub is_static: bool,
}

/// A direct base class of a class type.
#[derive(Debug, Clone)]
pub struct BaseSpec {
    /// Handle to the base class type
    pub type_id: TypeId,
    /// Offset of the base subobject within the derived class, in bits
    pub offset_in_bits: u64,
    /// Whether the inheritance is virtual
    pub is_virtual: bool,
    /// Access specifier of the inheritance edge
    pub access: Access,
}

/// A member function of a class type.
#[derive(Debug, Clone)]
pub struct MemberFunction {
    /// Function name as written in source
    pub name: String,
    /// Mangled linkage name
    pub linkage_name: String,
    /// Handle to the function's [`TypeKind::FunctionType`]
    pub type_id: TypeId,
    /// Access specifier of the member function
    pub access: Access,
    /// Whether the function is virtual
    pub is_virtual: bool,
    /// Offset of the function's slot in the vtable, in bytes; `None` for
    /// non-virtual functions
    pub vtable_offset: Option<u64>,
    /// Whether the function is static
    pub is_static: bool,
}

/// A parameter of a [`TypeKind::FunctionType`].
#[derive(Debug, Clone)]
pub struct FnParameter {
    /// Parameter name, if the debug info recorded one
    pub name: Option<String>,
    /// Handle to the parameter's type
    pub type_id: TypeId,
    /// Whether the parameter was synthesized (e.g. an implicit `this`)
    pub is_artificial: bool,
}

/// Structural payload of a class, struct or union type.
///
/// Member lists are append-only (`boxcar::Vec`) so that a self-referential type can
/// be registered first and have members pointing back at it appended afterwards,
/// before its first canonicalization request.
#[derive(Debug)]
pub struct ClassPayload {
    /// Whether this is a struct, class or union
    pub kind: ClassKind,
    /// Non-static and static data members, in declaration order
    pub members: boxcar::Vec<DataMember>,
    /// Direct base classes, in declaration order
    pub bases: boxcar::Vec<BaseSpec>,
    /// Member functions, in declaration order
    pub member_fns: boxcar::Vec<MemberFunction>,
}

impl ClassPayload {
    /// Create an empty payload of the given aggregate kind.
    #[must_use]
    pub fn new(kind: ClassKind) -> Self {
        ClassPayload {
            kind,
            members: boxcar::Vec::new(),
            bases: boxcar::Vec::new(),
            member_fns: boxcar::Vec::new(),
        }
    }

    /// The virtual member functions of this class, in declaration order.
    pub fn virtual_member_fns(&self) -> impl Iterator<Item = &MemberFunction> {
        self.member_fns.iter().map(|(_, f)| f).filter(|f| f.is_virtual)
    }
}

/// The closed sum over every type shape the IR can represent.
///
/// Exhaustive matches over this enum are how the canonical-equality check, the diff
/// engine and the categorization predicates guarantee full kind coverage: adding a
/// variant fails compilation at every algorithm site until it is handled.
#[derive(Debug, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum TypeKind {
    /// The `void` type. Interned once per environment.
    Void,
    /// The variadic-parameter marker (`...`). Interned once per environment.
    Variadic,
    /// An integral or floating point base type; identified by name and size.
    Fundamental,
    /// A named alias for another type.
    Typedef {
        /// Handle to the aliased type
        underlying: TypeId,
    },
    /// A pointer type.
    Pointer {
        /// Handle to the pointed-to type
        pointee: TypeId,
    },
    /// A CV-qualified view of another type.
    Qualified {
        /// The qualifiers applied
        quals: CvQualifiers,
        /// Handle to the underlying type
        underlying: TypeId,
    },
    /// An array type with one subrange per dimension.
    Array {
        /// Handle to the element type
        element: TypeId,
        /// One entry per dimension, outermost first
        subranges: Vec<Subrange>,
    },
    /// An enum type.
    Enum {
        /// Handle to the underlying integral type, when known
        underlying: Option<TypeId>,
        /// The enumerators, in declaration order
        enumerators: Vec<Enumerator>,
    },
    /// A class, struct or union.
    Class(ClassPayload),
    /// A function type: return type, parameters, variadic flag.
    FunctionType {
        /// Handle to the return type; `None` means `void`
        return_type: Option<TypeId>,
        /// The parameters, in positional order
        parameters: Vec<FnParameter>,
        /// Whether the function takes variadic arguments
        is_variadic: bool,
    },
}

impl TypeKind {
    /// A small stable discriminant used by the structural hash. Two types of
    /// different kinds can never be structurally equal.
    #[must_use]
    pub(crate) fn discriminant(&self) -> u8 {
        match self {
            TypeKind::Void => 0,
            TypeKind::Variadic => 1,
            TypeKind::Fundamental => 2,
            TypeKind::Typedef { .. } => 3,
            TypeKind::Pointer { .. } => 4,
            TypeKind::Qualified { .. } => 5,
            TypeKind::Array { .. } => 6,
            TypeKind::Enum { .. } => 7,
            TypeKind::Class(_) => 8,
            TypeKind::FunctionType { .. } => 9,
        }
    }
}

/// One type of the ABI intermediate representation.
///
/// A `Type` is created by a reader, registered with its [`crate::ir::Environment`]
/// (which hands out the [`TypeId`]), optionally extended with members while the
/// reader is still wiring the graph, and finally scheduled for canonicalization.
/// After canonicalization it must not change structurally.
#[derive(Debug)]
pub struct Type {
    /// The handle this type is registered under
    pub id: TypeId,
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
    /// Path of the source file this type was declared in, when known.
    /// Used by location-based suppression specifications.
    pub source_location: Option<String>,
    /// The typedef that gives this type its name, when the type itself is an
    /// anonymous class or enum (`typedef struct {...} foo;`). Set at most once,
    /// after the typedef is seen; excluded from structural identity.
    pub(crate) naming_typedef: OnceLock<TypeId>,
}

/// Reference-counted shared pointer to a [`Type`]; the environment's arena owns
/// one of these per registered type.
pub type TypeRc = Arc<Type>;

impl Type {
    /// Whether this type is only known by forward declaration.
    #[must_use]
    pub fn is_declaration_only(&self) -> bool {
        self.flags.contains(TypeFlags::DECLARATION_ONLY)
    }

    /// Whether this type has no name of its own.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.flags.contains(TypeFlags::ANONYMOUS)
    }

    /// Whether this type was synthesized rather than written in source.
    #[must_use]
    pub fn is_artificial(&self) -> bool {
        self.flags.contains(TypeFlags::ARTIFICIAL)
    }

    /// The class payload of this type, if it is a class, struct or union.
    #[must_use]
    pub fn as_class(&self) -> Option<&ClassPayload> {
        match &self.kind {
            TypeKind::Class(payload) => Some(payload),
            _ => None,
        }
    }

    /// The name of this type; `None` for anonymous types. An anonymous class
    /// or enum named through a typedef stays `None` here; the typedef handle
    /// is available from [`Type::naming_typedef`] and resolves through the
    /// environment.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The typedef that names this otherwise anonymous class or enum, when one
    /// has been recorded.
    #[must_use]
    pub fn naming_typedef(&self) -> Option<TypeId> {
        self.naming_typedef.get().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let flags = TypeFlags::ANONYMOUS | TypeFlags::DECLARATION_ONLY;
        assert!(flags.contains(TypeFlags::ANONYMOUS));
        assert!(!flags.contains(TypeFlags::ARTIFICIAL));
    }

    #[test]
    fn test_kind_discriminants_unique() {
        let kinds = [
            TypeKind::Void,
            TypeKind::Variadic,
            TypeKind::Fundamental,
            TypeKind::Typedef {
                underlying: TypeId::new(0),
            },
            TypeKind::Pointer {
                pointee: TypeId::new(0),
            },
            TypeKind::Qualified {
                quals: CvQualifiers::CONST,
                underlying: TypeId::new(0),
            },
            TypeKind::Array {
                element: TypeId::new(0),
                subranges: vec![],
            },
            TypeKind::Enum {
                underlying: None,
                enumerators: vec![],
            },
            TypeKind::Class(ClassPayload::new(ClassKind::Struct)),
            TypeKind::FunctionType {
                return_type: None,
                parameters: vec![],
                is_variadic: false,
            },
        ];

        let mut seen = std::collections::HashSet::new();
        for kind in &kinds {
            assert!(seen.insert(kind.discriminant()), "duplicate discriminant");
        }
    }

    #[test]
    fn test_class_payload_append_through_shared_ref() {
        let payload = ClassPayload::new(ClassKind::Struct);
        payload.members.push(DataMember {
            name: "next".to_string(),
            type_id: TypeId::new(42),
            offset_in_bits: 0,
            access: Access::Public,
            is_static: false,
        });
        assert_eq!(payload.members.count(), 1);
    }

    #[test]
    fn test_type_id_display() {
        assert_eq!(TypeId::new(0x10).to_string(), "type:0x00000010");
    }
}
