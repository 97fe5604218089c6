//! ABI intermediate representation.
//!
//! This module implements the in-memory model of a binary's ABI: the cyclic,
//! shared, structurally-typed graph of types and declarations, the environment
//! arena that owns all of it, and the canonicalization algorithm that deduplicates
//! structurally-equivalent types into one representative per equivalence class.
//!
//! # Key Components
//!
//! - [`Environment`] - Analysis-scoped arena owning every type and the canonical table
//! - [`Type`], [`TypeKind`], [`TypeId`] - The type graph and its handles
//! - [`FunctionDecl`], [`VariableDecl`] - Declarations referencing types by handle
//! - [`ElfSymbol`] - Symbol names, versions and alias chains
//! - [`TranslationUnit`], [`Corpus`], [`CorpusGroup`] - The per-binary containers
//! - [`canon`] - Cycle-safe structural equality and batch canonicalization
//! - [`hash`] - Structural hashing for canonicalization bucket selection
//!
//! # Construction Protocol
//!
//! Readers create types through [`Environment::add_type`], append members to
//! mid-construction classes, schedule each finished type for canonicalization and
//! finally run [`Environment::canonicalize_pending`] once a translation unit (or
//! the whole corpus) is complete. From then on, canonical handle equality
//! substitutes for deep structural equality everywhere.

pub mod canon;
mod corpus;
mod decls;
mod environment;
pub mod hash;
mod symbols;
mod tunit;
mod types;

pub use corpus::{Corpus, CorpusGroup, CorpusOrigin, ExportedDeclsBuilder};
pub use decls::{FunctionDecl, FunctionDeclRc, VariableDecl, VariableDeclRc};
pub use environment::{Environment, TypeSpec};
pub use symbols::{
    ElfSymbol, ElfSymbolRc, SymbolBinding, SymbolKind, SymbolVersion, SymbolVisibility,
};
pub use tunit::{TopLevelDecl, TranslationUnit};
pub use types::{
    Access, BaseSpec, ClassKind, ClassPayload, CvQualifiers, DataMember, Enumerator, FnParameter,
    MemberFunction, Subrange, Type, TypeFlags, TypeId, TypeKind, TypeRc,
};
