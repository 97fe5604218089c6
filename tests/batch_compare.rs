//! Batch comparison: many corpus pairs compared concurrently, one environment
//! and one diff context per task.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use abiscope::prelude::*;

/// Compares two versions of one library and publishes the resulting exit
/// status.
struct CompareTask {
    /// Extra members the second version's struct gains
    extra_members: u64,
    /// Where the verdict goes, shared with the test body
    verdicts: Arc<Mutex<Vec<(u64, DiffExitCode)>>>,
}

impl CompareTask {
    fn build_struct(env: &Arc<Environment>, member_count: u64) -> TypeId {
        let int = env.add_type(
            TypeSpec::named("int", TypeKind::Fundamental)
                .with_size(32)
                .with_alignment(32),
        );
        env.schedule_canonicalization(int);
        let payload = ClassPayload::new(ClassKind::Struct);
        for index in 0..member_count {
            payload.members.push(DataMember {
                name: format!("m{index}"),
                type_id: int,
                offset_in_bits: index * 32,
                access: Access::Public,
                is_static: false,
            });
        }
        let id = env.add_type(
            TypeSpec::named("S", TypeKind::Class(payload)).with_size(member_count * 32),
        );
        env.schedule_canonicalization(id);
        id
    }

    fn build_corpus(env: &Arc<Environment>, path: &str, member_count: u64) -> Corpus {
        let s = Self::build_struct(env, member_count);
        let pointer =
            env.add_type(TypeSpec::anonymous(TypeKind::Pointer { pointee: s }).with_size(64));
        env.schedule_canonicalization(pointer);
        let fn_type = env.add_type(TypeSpec::anonymous(TypeKind::FunctionType {
            return_type: None,
            parameters: vec![FnParameter {
                name: Some("s".to_string()),
                type_id: pointer,
                is_artificial: false,
            }],
            is_variadic: false,
        }));
        env.schedule_canonicalization(fn_type);
        env.canonicalize_pending();

        let mut corpus = Corpus::new(env.clone(), CorpusOrigin::Artificial, path);
        let symbol = Arc::new(ElfSymbol::public("use_s", SymbolKind::Function));
        corpus.add_symbol(symbol.clone());
        let unit = TranslationUnit::new("s.c");
        unit.add_function(Arc::new(FunctionDecl::new("use_s", fn_type).with_symbol(symbol)));
        corpus.add(unit);
        corpus
    }
}

impl Task for CompareTask {
    fn perform(&mut self) {
        // Each task owns its environment and context; nothing is shared
        // between comparisons.
        let env = Arc::new(Environment::new());
        let old_version = Self::build_corpus(&env, "libs.so.1", 2);
        let new_version = Self::build_corpus(&env, "libs.so.2", 2 + self.extra_members);

        let ctx = DiffContext::new(env.clone(), env);
        let root = compute_corpus_diff(&ctx, &old_version, &new_version)
            .unwrap_or_else(|e| panic!("diff computation failed: {e}"));
        categorize(&ctx, root);

        if let Ok(mut verdicts) = self.verdicts.lock() {
            verdicts.push((self.extra_members, exit_code(&ctx, root)));
        }
    }
}

#[test]
fn concurrent_comparisons_reach_independent_verdicts() {
    let verdicts = Arc::new(Mutex::new(Vec::new()));
    let mut queue = Queue::with_workers(4);
    // Even-numbered tasks compare identical versions, odd ones grow the
    // struct by one member.
    for index in 0..16u64 {
        let scheduled = queue.schedule_task(Box::new(CompareTask {
            extra_members: index % 2,
            verdicts: Arc::clone(&verdicts),
        }));
        assert!(scheduled);
    }
    queue.wait_for_workers_to_complete();
    assert_eq!(queue.get_completed_tasks().unwrap().len(), 16);

    let verdicts = verdicts.lock().unwrap();
    assert_eq!(verdicts.len(), 16);
    for (extra_members, exit) in verdicts.iter() {
        if *extra_members == 0 {
            assert!(exit.is_empty(), "identical versions reported a change");
        } else {
            assert!(exit.contains(DiffExitCode::ABI_CHANGE));
            assert!(exit.contains(DiffExitCode::ABI_INCOMPATIBLE_CHANGE));
        }
    }
}

#[test]
fn notifier_observes_every_comparison() {
    let seen = Arc::new(AtomicUsize::new(0));
    let verdicts = Arc::new(Mutex::new(Vec::new()));
    let mut queue = Queue::with_workers(3);
    {
        let seen = Arc::clone(&seen);
        queue.set_tasks_done_notify(Arc::new(move |_task| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
    }
    for index in 0..9u64 {
        queue.schedule_task(Box::new(CompareTask {
            extra_members: index % 3,
            verdicts: Arc::clone(&verdicts),
        }));
    }
    queue.wait_for_workers_to_complete();

    assert_eq!(seen.load(Ordering::SeqCst), 9);
    assert_eq!(verdicts.lock().unwrap().len(), 9);
}
