//! # abiscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! and traits of the library. Import it to get quick access to everything a
//! typical comparison needs.
//!
//! # Example
//!
//! ```rust
//! use abiscope::prelude::*;
//! use std::sync::Arc;
//!
//! let env = Arc::new(Environment::new());
//! let ctx = DiffContext::new(env.clone(), env);
//! assert_eq!(ctx.node_count(), 0);
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all abiscope operations
pub use crate::Error;

/// The result type used throughout abiscope
pub use crate::Result;

// ================================================================================================
// Intermediate Representation
// ================================================================================================

/// The analysis-scoped arena owning every type
pub use crate::ir::Environment;

/// Registration payload for new types
pub use crate::ir::TypeSpec;

/// The type graph and its handles
pub use crate::ir::{Type, TypeFlags, TypeId, TypeKind, TypeRc};

/// Class, enum, array and function structure
pub use crate::ir::{
    Access, BaseSpec, ClassKind, ClassPayload, CvQualifiers, DataMember, Enumerator, FnParameter,
    MemberFunction, Subrange,
};

/// Declarations bound to exported symbols
pub use crate::ir::{FunctionDecl, FunctionDeclRc, VariableDecl, VariableDeclRc};

/// ELF symbols, versions and alias chains
pub use crate::ir::{ElfSymbol, ElfSymbolRc, SymbolBinding, SymbolKind, SymbolVersion, SymbolVisibility};

/// The per-binary containers
pub use crate::ir::{Corpus, CorpusGroup, CorpusOrigin, TopLevelDecl, TranslationUnit};

// ================================================================================================
// Readers
// ================================================================================================

/// The corpus-producer contract and its status bitmask
pub use crate::reader::{ArtificialReader, CorpusReader, ReadStatus};

// ================================================================================================
// Diffing
// ================================================================================================

/// The comparison-scoped arena and policy holder
pub use crate::diff::DiffContext;

/// The diff graph and its handles
pub use crate::diff::{DiffId, DiffNode, DiffPayload};

/// Category bitmasks and exit status
pub use crate::diff::{DiffCategory, DiffExitCode};

/// Diff computation entry points
pub use crate::diff::engine::{
    compute_corpus_diff, compute_corpus_group_diff, compute_function_diff, compute_type_diff,
    compute_variable_diff, exit_code, group_exit_code, CorpusGroupDiff,
};

/// Categorization entry point
pub use crate::diff::filter::categorize;

/// Visitor-based traversal
pub use crate::diff::{traverse, DiffVisitor};

// ================================================================================================
// Suppressions
// ================================================================================================

/// Suppression specifications and their action
pub use crate::suppression::{
    FunctionSuppression, SuppressionAction, SuppressionSpec, TypeSuppression, VariableSuppression,
};

// ================================================================================================
// Batch Comparison
// ================================================================================================

/// The worker-thread task queue
pub use crate::workers::{Queue, Task, TaskDoneNotify};
