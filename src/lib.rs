// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # abiscope
//!
//! A framework for modeling the ABI of compiled binaries and computing semantic
//! differences between two versions of it. `abiscope` represents an ABI as a
//! cyclic, shared graph of types and declarations, deduplicates structurally
//! equal types through canonicalization, and turns two such models into a
//! categorized diff graph a comparison tool can report from.
//!
//! ## Features
//!
//! - **Complete ABI model** - Types, declarations, ELF symbols with versions and
//!   alias chains, translation units, corpora and corpus groups
//! - **Type canonicalization** - Cycle-safe structural equality collapsed into
//!   one representative per equivalence class, making later comparisons a
//!   handle check
//! - **Semantic diffing** - Keyed edit scripts (no spurious delete/insert pairs
//!   on reorder), one diff node per compared pair, cycle-safe traversal
//! - **Change categorization** - Harmless/harmful classification with the vtable
//!   layout and size/offset predicates an ABI checker needs
//! - **Suppression specifications** - Declarative rules that drop artifacts from
//!   the model or hide their diffs from the report
//! - **Batch comparison** - A worker-thread task queue with exactly-once
//!   delivery for comparing many binary pairs concurrently
//!
//! ## Quick Start
//!
//! Add `abiscope` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! abiscope = "0.2"
//! ```
//!
//! ### Comparing two corpora
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use abiscope::diff::{engine, filter, DiffContext};
//! use abiscope::ir::{
//!     Corpus, CorpusOrigin, ElfSymbol, Environment, FunctionDecl, SymbolKind,
//!     TranslationUnit, TypeKind, TypeSpec,
//! };
//!
//! // One environment per comparison; both corpora live in it.
//! let env = Arc::new(Environment::new());
//! let int = env.add_type(TypeSpec::named("int", TypeKind::Fundamental).with_size(32));
//! let fn_type = env.add_type(TypeSpec::anonymous(TypeKind::FunctionType {
//!     return_type: Some(int),
//!     parameters: vec![],
//!     is_variadic: false,
//! }));
//! env.schedule_canonicalization(int);
//! env.schedule_canonicalization(fn_type);
//! env.canonicalize_pending();
//!
//! let corpus = |path: &str| {
//!     let mut corpus = Corpus::new(env.clone(), CorpusOrigin::Artificial, path);
//!     let symbol = Arc::new(ElfSymbol::public("get_x", SymbolKind::Function));
//!     corpus.add_symbol(symbol.clone());
//!     let unit = TranslationUnit::new("x.c");
//!     unit.add_function(Arc::new(FunctionDecl::new("get_x", fn_type).with_symbol(symbol)));
//!     corpus.add(unit);
//!     corpus
//! };
//! let old_version = corpus("libx.so.1");
//! let new_version = corpus("libx.so.2");
//!
//! let ctx = DiffContext::new(env.clone(), env.clone());
//! let root = engine::compute_corpus_diff(&ctx, &old_version, &new_version)?;
//! filter::categorize(&ctx, root);
//!
//! // Identical ABIs: the exit status is the empty mask.
//! assert!(engine::exit_code(&ctx, root).is_empty());
//! # Ok::<(), abiscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! The crate is organized in layers, each building on the previous:
//!
//! 1. **IR** ([`ir`]): the environment arena owning every type, handle-based
//!    type graphs, declarations, symbols, corpora, and the canonicalization
//!    algorithm.
//! 2. **Readers** ([`reader`]): the contract under which corpora are produced,
//!    with partial failure reported through a status bitmask.
//! 3. **Suppressions** ([`suppression`]): user rules evaluated at corpus
//!    construction (drop) or report time (hide).
//! 4. **Diffing** ([`diff`]): the diff graph, its computation, traversal and
//!    categorization.
//! 5. **Workers** ([`workers`]): the task queue for batch comparisons.
//!
//! ## Thread Safety
//!
//! Environments and corpora use concurrent storage internally, but the
//! canonicalization protocol and the diff context are single-threaded per
//! comparison. The supported concurrency model is one environment plus one
//! diff context per [`workers::Task`], with nothing shared between tasks.
//!
//! ## Testing
//!
//! ```bash
//! cargo test
//! cargo bench  # canonicalization throughput
//! ```

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

pub mod diff;
pub mod ir;
pub mod prelude;
pub mod reader;
pub mod suppression;
pub mod workers;

/// `abiscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used throughout the library for all fallible operations.
///
/// # Example
///
/// ```rust,no_run
/// use abiscope::{ir::Corpus, reader::CorpusReader, Result};
///
/// fn load(reader: &mut dyn CorpusReader) -> Result<Corpus> {
///     let (corpus, _status) = reader.read_corpus()?;
///     Ok(corpus)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for all fallible operations of this library.
///
/// # Example
///
/// ```rust
/// use abiscope::Error;
///
/// fn describe(error: &Error) -> String {
///     match error {
///         Error::TypeNotFound(id) => format!("dangling type handle {id}"),
///         other => other.to_string(),
///     }
/// }
/// ```
pub use error::Error;
