//! IR factories shared by the unit tests.
//!
//! [`TestEnv`] wraps an [`Environment`] with helpers that build the small type
//! graphs the tests need: fundamentals, flat structs, self-referential and
//! mutually recursive structs, function types. Everything built here is scheduled
//! for canonicalization; tests decide when to run the batch pass.

use std::sync::Arc;

use dashmap::DashMap;

use crate::ir::{
    Access, ClassKind, ClassPayload, DataMember, Environment, FnParameter, TypeFlags, TypeId,
    TypeKind, TypeSpec,
};

/// An environment plus construction helpers for tests.
pub struct TestEnv {
    env: Arc<Environment>,
    /// Cache of fundamentals by (name, size)
    fundamentals: DashMap<(String, u64), TypeId>,
}

impl TestEnv {
    pub fn new() -> Self {
        TestEnv {
            env: Arc::new(Environment::new()),
            fundamentals: DashMap::new(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_rc(&self) -> Arc<Environment> {
        self.env.clone()
    }

    /// A fundamental type with the given name and bit size, cached per TestEnv.
    pub fn fundamental(&self, name: &str, size_in_bits: u64) -> TypeId {
        *self
            .fundamentals
            .entry((name.to_string(), size_in_bits))
            .or_insert_with(|| {
                let id = self.env.add_type(
                    TypeSpec::named(name, TypeKind::Fundamental)
                        .with_size(size_in_bits)
                        .with_alignment(size_in_bits),
                );
                self.env.schedule_canonicalization(id);
                id
            })
    }

    /// The name the factory picks for a member of the given bit width.
    fn int_for_bits(&self, bits: u64) -> TypeId {
        match bits {
            8 => self.fundamental("char", 8),
            16 => self.fundamental("short int", 16),
            64 => self.fundamental("long int", 64),
            _ => self.fundamental("int", bits),
        }
    }

    /// A named struct with consecutively laid out integral members, scheduled
    /// for canonicalization.
    pub fn simple_struct(&self, name: &str, members: &[(&str, u64)]) -> TypeId {
        let payload = ClassPayload::new(ClassKind::Struct);
        let mut offset = 0u64;
        for (member_name, bits) in members {
            payload.members.push(DataMember {
                name: (*member_name).to_string(),
                type_id: self.int_for_bits(*bits),
                offset_in_bits: offset,
                access: Access::Public,
                is_static: false,
            });
            offset += bits;
        }
        let id = self.env.add_type(
            TypeSpec::named(name, TypeKind::Class(payload))
                .with_size(offset)
                .with_alignment(32),
        );
        self.env.schedule_canonicalization(id);
        id
    }

    /// `struct <name> { struct <name>* next; }`, scheduled for canonicalization.
    pub fn self_referential_struct(&self, name: &str) -> TypeId {
        let id = self.env.add_type(
            TypeSpec::named(name, TypeKind::Class(ClassPayload::new(ClassKind::Struct)))
                .with_size(64)
                .with_alignment(64),
        );
        let pointer = self.pointer_to(id);
        let ty = self.env.type_of(id).unwrap();
        let payload = ty.as_class().unwrap();
        payload.members.push(DataMember {
            name: "next".to_string(),
            type_id: pointer,
            offset_in_bits: 0,
            access: Access::Public,
            is_static: false,
        });
        self.env.schedule_canonicalization(id);
        id
    }

    /// Two structs pointing at each other:
    /// `struct A { B* b; }` and `struct B { A* a; }`.
    pub fn mutually_recursive_pair(&self, name_a: &str, name_b: &str) -> (TypeId, TypeId) {
        let a = self.env.add_type(
            TypeSpec::named(name_a, TypeKind::Class(ClassPayload::new(ClassKind::Struct)))
                .with_size(64)
                .with_alignment(64),
        );
        let b = self.env.add_type(
            TypeSpec::named(name_b, TypeKind::Class(ClassPayload::new(ClassKind::Struct)))
                .with_size(64)
                .with_alignment(64),
        );
        let ptr_b = self.pointer_to(b);
        let ptr_a = self.pointer_to(a);

        let ty_a = self.env.type_of(a).unwrap();
        ty_a.as_class().unwrap().members.push(DataMember {
            name: "b".to_string(),
            type_id: ptr_b,
            offset_in_bits: 0,
            access: Access::Public,
            is_static: false,
        });
        let ty_b = self.env.type_of(b).unwrap();
        ty_b.as_class().unwrap().members.push(DataMember {
            name: "a".to_string(),
            type_id: ptr_a,
            offset_in_bits: 0,
            access: Access::Public,
            is_static: false,
        });

        self.env.schedule_canonicalization(a);
        self.env.schedule_canonicalization(b);
        (a, b)
    }

    /// A 64-bit pointer to the given type, scheduled for canonicalization.
    pub fn pointer_to(&self, pointee: TypeId) -> TypeId {
        let id = self.env.add_type(
            TypeSpec::anonymous(TypeKind::Pointer { pointee })
                .with_size(64)
                .with_alignment(64),
        );
        self.env.schedule_canonicalization(id);
        id
    }

    /// A `void ()` function type, scheduled for canonicalization.
    pub fn void_fn_type(&self) -> TypeId {
        self.fn_type(None, &[])
    }

    /// A function type with the given return type and parameter types, scheduled
    /// for canonicalization.
    pub fn fn_type(&self, return_type: Option<TypeId>, params: &[TypeId]) -> TypeId {
        let parameters = params
            .iter()
            .map(|type_id| FnParameter {
                name: None,
                type_id: *type_id,
                is_artificial: false,
            })
            .collect();
        let id = self.env.add_type(TypeSpec::anonymous(TypeKind::FunctionType {
            return_type,
            parameters,
            is_variadic: false,
        }));
        self.env.schedule_canonicalization(id);
        id
    }

    /// A declaration-only (opaque) struct with the given name.
    pub fn opaque_struct(&self, name: &str) -> TypeId {
        let id = self.env.add_type(
            TypeSpec::named(name, TypeKind::Class(ClassPayload::new(ClassKind::Struct)))
                .with_flags(TypeFlags::DECLARATION_ONLY),
        );
        self.env.schedule_canonicalization(id);
        id
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
