//! ABI comparison: diff graphs, categorization, traversal.
//!
//! This module turns two corpora into a categorized diff graph:
//!
//! 1. [`engine::compute_corpus_diff`] builds the graph (one node per compared
//!    pair, memoized, cycle safe, deterministic),
//! 2. [`filter::categorize`] assigns harmless/harmful/suppression/redundancy
//!    categories,
//! 3. [`engine::exit_code`] condenses the categorized graph into the bitwise
//!    exit status of a comparison tool.
//!
//! # Key Components
//!
//! - [`DiffContext`] - Arena, caches, suppressions and visibility toggles of one comparison
//! - [`DiffNode`], [`DiffId`] - The diff graph and its handles
//! - [`DiffCategory`], [`DiffExitCode`] - Category bitmasks and exit status
//! - [`traverse`] - Visitor-based walks with the two visited-set modes
//! - [`filter`] - The categorization passes
//!
//! Reporting (rendering a categorized graph as text) is out of scope; the
//! categorized graph plus [`DiffNode::to_be_reported`] is the product.

pub mod category;
pub mod context;
pub mod engine;
pub mod filter;
pub mod node;
pub mod traverse;

pub use category::{DiffCategory, DiffExitCode};
pub use context::DiffContext;
pub use node::{
    BaseChange, ClassDiff, CorpusDiff, DataMemberChange, DiffId, DiffNode, DiffPayload, EnumDiff,
    FnTypeDiff, FunctionDiff, MemberFnChange, ParamChange, TypeDiff, TypeDiffKind, VariableDiff,
};
pub use traverse::{traverse, DiffVisitor};
