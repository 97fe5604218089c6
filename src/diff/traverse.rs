//! Depth-first traversal over diff graphs.
//!
//! Diff graphs are cyclic whenever the compared type graphs are, so every walk
//! runs against the context's visited set. Two modes exist, selected by
//! [`crate::diff::DiffContext::forbid_visiting_a_node_twice`]:
//!
//! - **Corpus-wide mode** (flag unset): the visited set persists across
//!   [`traverse`] calls, so a walker firing one traversal per changed interface
//!   still reaches every node exactly once over the whole corpus.
//! - **Subtree mode** (flag set): the visited set is cleared at the start of
//!   every traversal; filters and impact analysis use this to re-walk subtrees
//!   that a previous pass already covered.
//!
//! In both modes a node reached a second time fires only its end hook. Filters
//! rely on that to pick categories back up from the node's canonical diff even
//! when the cycle guard skips the subtree.

use crate::diff::context::DiffContext;
use crate::diff::node::{DiffId, DiffNode};

/// Pre/post hooks fired while walking a diff graph.
///
/// Both hooks default to doing nothing so visitors implement only the side
/// they care about.
pub trait DiffVisitor {
    /// Fired before a node's children are walked. Not fired for nodes the
    /// visited set skips.
    fn visit_begin(&mut self, _ctx: &DiffContext, _node: &DiffNode) {}

    /// Fired after a node's children were walked, and as the *only* hook on a
    /// node reached a second time.
    fn visit_end(&mut self, _ctx: &DiffContext, _node: &DiffNode) {}
}

/// Walk the graph rooted at `root` depth-first, firing the visitor's hooks.
pub fn traverse(ctx: &DiffContext, root: DiffId, visitor: &mut dyn DiffVisitor) {
    if ctx.visiting_a_node_twice_is_forbidden() {
        ctx.clear_visited();
    }
    traverse_node(ctx, root, visitor);
}

fn traverse_node(ctx: &DiffContext, id: DiffId, visitor: &mut dyn DiffVisitor) {
    let node = ctx.node(id);
    if ctx.is_visited(id) {
        visitor.visit_end(ctx, node);
        return;
    }
    ctx.mark_visited(id);
    visitor.visit_begin(ctx, node);
    for child in node.children() {
        traverse_node(ctx, child, visitor);
    }
    visitor.visit_end(ctx, node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::engine::compute_type_diff;
    use crate::test::factories::TestEnv;

    #[derive(Default)]
    struct CountingVisitor {
        begins: usize,
        ends: usize,
    }

    impl DiffVisitor for CountingVisitor {
        fn visit_begin(&mut self, _ctx: &DiffContext, _node: &DiffNode) {
            self.begins += 1;
        }

        fn visit_end(&mut self, _ctx: &DiffContext, _node: &DiffNode) {
            self.ends += 1;
        }
    }

    fn changed_struct_diff(env: &TestEnv) -> (DiffContext, crate::diff::DiffId) {
        let a = env.simple_struct("S", &[("x", 32)]);
        let b = env.simple_struct("S", &[("x", 64)]);
        env.env().canonicalize_pending();
        let ctx = DiffContext::new(env.env_rc(), env.env_rc());
        let diff = compute_type_diff(&ctx, a, b).unwrap();
        (ctx, diff)
    }

    #[test]
    fn test_every_node_gets_both_hooks() {
        let env = TestEnv::new();
        let (ctx, diff) = changed_struct_diff(&env);

        let mut visitor = CountingVisitor::default();
        traverse(&ctx, diff, &mut visitor);
        assert!(visitor.begins >= 2, "parent and member type node expected");
        assert_eq!(visitor.begins, visitor.ends);
    }

    #[test]
    fn test_corpus_mode_visits_once_across_traversals() {
        let env = TestEnv::new();
        let (ctx, diff) = changed_struct_diff(&env);
        ctx.forbid_visiting_a_node_twice(false);

        let mut visitor = CountingVisitor::default();
        traverse(&ctx, diff, &mut visitor);
        let first_pass = visitor.begins;
        traverse(&ctx, diff, &mut visitor);
        // Second traversal finds everything visited: end hooks only.
        assert_eq!(visitor.begins, first_pass);
        assert!(visitor.ends > first_pass);
    }

    #[test]
    fn test_subtree_mode_revisits_after_clearing() {
        let env = TestEnv::new();
        let (ctx, diff) = changed_struct_diff(&env);
        ctx.forbid_visiting_a_node_twice(true);

        let mut visitor = CountingVisitor::default();
        traverse(&ctx, diff, &mut visitor);
        let first_pass = visitor.begins;
        traverse(&ctx, diff, &mut visitor);
        assert_eq!(visitor.begins, 2 * first_pass);
    }

    #[test]
    fn test_cyclic_graph_terminates() {
        use crate::ir::{Access, ClassKind, ClassPayload, DataMember, TypeKind, TypeSpec};

        // `struct list { list* next; T payload; }` where T differs between the
        // versions, so the engine descends through the cycle.
        let env = TestEnv::new();
        let recursive_list = |payload_bits: u64| {
            let id = env.env().add_type(
                TypeSpec::named("list", TypeKind::Class(ClassPayload::new(ClassKind::Struct)))
                    .with_size(64 + payload_bits),
            );
            let pointer = env.pointer_to(id);
            let ty = env.env().type_of(id).unwrap();
            let class = ty.as_class().unwrap();
            class.members.push(DataMember {
                name: "next".to_string(),
                type_id: pointer,
                offset_in_bits: 0,
                access: Access::Public,
                is_static: false,
            });
            class.members.push(DataMember {
                name: "payload".to_string(),
                type_id: env.fundamental("int", payload_bits),
                offset_in_bits: 64,
                access: Access::Public,
                is_static: false,
            });
            env.env().schedule_canonicalization(id);
            id
        };
        let a = recursive_list(32);
        let b = recursive_list(64);
        env.env().canonicalize_pending();

        let ctx = DiffContext::new(env.env_rc(), env.env_rc());
        let diff = compute_type_diff(&ctx, a, b).unwrap();
        assert!(ctx.node(diff).has_changes());

        let mut visitor = CountingVisitor::default();
        traverse(&ctx, diff, &mut visitor);
        // Class, pointer and payload diff: one begin each. The back edge into
        // the class node fires one extra end hook.
        assert_eq!(visitor.begins, 3);
        assert_eq!(visitor.ends, visitor.begins + 1);
    }
}
