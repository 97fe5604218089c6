//! Canonicalization throughput over synthetic type populations.
//!
//! Two workloads bracket the interesting behavior: a population of structurally
//! identical structs (every candidate after the first hits the dedup fast
//! path) and a population of distinct structs (every candidate registers a new
//! canonical representative).

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use abiscope::ir::{
    Access, ClassKind, ClassPayload, DataMember, Environment, TypeId, TypeKind, TypeSpec,
};

fn add_struct(env: &Environment, name: &str, int: TypeId, member_bits: &[u64]) -> TypeId {
    let payload = ClassPayload::new(ClassKind::Struct);
    let mut offset = 0;
    for (index, bits) in member_bits.iter().enumerate() {
        payload.members.push(DataMember {
            name: format!("m{index}"),
            type_id: int,
            offset_in_bits: offset,
            access: Access::Public,
            is_static: false,
        });
        offset += bits;
    }
    let id = env.add_type(
        TypeSpec::named(name, TypeKind::Class(payload))
            .with_size(offset)
            .with_alignment(32),
    );
    env.schedule_canonicalization(id);
    id
}

/// `count` copies of the same two-member struct: maximal dedup pressure.
fn identical_population(count: usize) -> Arc<Environment> {
    let env = Arc::new(Environment::new());
    let int = env.add_type(
        TypeSpec::named("int", TypeKind::Fundamental)
            .with_size(32)
            .with_alignment(32),
    );
    env.schedule_canonicalization(int);
    for _ in 0..count {
        add_struct(&env, "S", int, &[32, 32]);
    }
    env
}

/// `count` structs that all differ in name and member count: no dedup at all.
fn distinct_population(count: usize) -> Arc<Environment> {
    let env = Arc::new(Environment::new());
    let int = env.add_type(
        TypeSpec::named("int", TypeKind::Fundamental)
            .with_size(32)
            .with_alignment(32),
    );
    env.schedule_canonicalization(int);
    for index in 0..count {
        let member_bits = vec![32; 1 + index % 8];
        add_struct(&env, &format!("S{index}"), int, &member_bits);
    }
    env
}

/// `count` self-referential list nodes: the cycle-safe comparison path.
fn recursive_population(count: usize) -> Arc<Environment> {
    let env = Arc::new(Environment::new());
    let int = env.add_type(
        TypeSpec::named("int", TypeKind::Fundamental)
            .with_size(32)
            .with_alignment(32),
    );
    env.schedule_canonicalization(int);
    for _ in 0..count {
        let node = env.add_type(
            TypeSpec::named("list", TypeKind::Class(ClassPayload::new(ClassKind::Struct)))
                .with_size(128)
                .with_alignment(64),
        );
        let pointer = env.add_type(
            TypeSpec::anonymous(TypeKind::Pointer { pointee: node })
                .with_size(64)
                .with_alignment(64),
        );
        env.schedule_canonicalization(pointer);
        let ty = env.type_of(node).expect("freshly registered type");
        let payload = ty.as_class().expect("registered as a class");
        payload.members.push(DataMember {
            name: "next".to_string(),
            type_id: pointer,
            offset_in_bits: 0,
            access: Access::Public,
            is_static: false,
        });
        payload.members.push(DataMember {
            name: "value".to_string(),
            type_id: int,
            offset_in_bits: 64,
            access: Access::Public,
            is_static: false,
        });
        env.schedule_canonicalization(node);
    }
    env
}

fn bench_canonicalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonicalize");
    for count in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("identical", count), &count, |b, &count| {
            b.iter_batched(
                || identical_population(count),
                |env| env.canonicalize_pending(),
                criterion::BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("distinct", count), &count, |b, &count| {
            b.iter_batched(
                || distinct_population(count),
                |env| env.canonicalize_pending(),
                criterion::BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("recursive", count), &count, |b, &count| {
            b.iter_batched(
                || recursive_population(count),
                |env| env.canonicalize_pending(),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_canonicalize);
criterion_main!(benches);
