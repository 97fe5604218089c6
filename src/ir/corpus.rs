//! ABI corpus: the complete modeled ABI of one binary.
//!
//! A [`Corpus`] owns the translation units produced by a reader, the ELF symbol
//! tables, and the machinery that decides which declarations are part of the
//! externally visible ABI: the [`ExportedDeclsBuilder`] with its regex keep/drop
//! lists and explicit symbol-id keep lists.
//!
//! # Key Components
//!
//! - [`Corpus`] - One binary's ABI: units, symbols, exported decl sets
//! - [`CorpusOrigin`] - Where the IR came from (DWARF, CTF, BTF, ELF-only, artificial)
//! - [`ExportedDeclsBuilder`] - Membership decisions for the exported sets, cached
//! - [`CorpusGroup`] - An ordered collection of corpora diffed as one unit
//!
//! # Failure Semantics
//!
//! Corpus construction is best effort: a declaration that cannot be resolved is
//! dropped with a warning and the rest of the corpus proceeds. Only corpus-level
//! conditions (no symbol table at all) surface to the caller, who decides whether
//! to treat them as fatal.

use std::sync::Arc;

use dashmap::DashMap;
use regex::Regex;
use strum::Display;

use crate::ir::{
    canon, ElfSymbolRc, Environment, FunctionDeclRc, SymbolKind, TranslationUnit, TypeId,
    VariableDeclRc,
};
use crate::suppression::{SuppressionAction, SuppressionSpec};
use crate::{Error, Result};

/// The kind of artifact a corpus was modeled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum CorpusOrigin {
    /// Built from DWARF debug info
    Dwarf,
    /// Built from CTF debug info
    Ctf,
    /// Built from BTF debug info
    Btf,
    /// Built from the ELF symbol table only, without debug info
    ElfOnly,
    /// Built programmatically, e.g. by tests
    Artificial,
}

/// Decides, per candidate declaration, whether it belongs to the externally
/// visible ABI.
///
/// The decision combines three inputs, in precedence order:
///
/// 1. explicit symbol-id keep lists (user overrides, always win),
/// 2. regex drop lists,
/// 3. regex keep lists (when non-empty, only matching symbols are kept).
///
/// plus the baseline requirement of a public, defined ELF symbol. Every decision
/// is cached in two qualified-name maps so repeated queries are O(1).
#[derive(Debug, Default)]
pub struct ExportedDeclsBuilder {
    /// Patterns of symbol names to keep even when a drop pattern matches
    keep_regexps: Vec<Regex>,
    /// Patterns of symbol names to drop
    drop_regexps: Vec<Regex>,
    /// Exact `name@version` ids to keep, highest precedence
    keep_symbol_ids: Vec<String>,
    /// Qualified-name cache of exported functions
    pub(crate) fn_cache: DashMap<String, FunctionDeclRc>,
    /// Qualified-name cache of exported variables
    pub(crate) var_cache: DashMap<String, VariableDeclRc>,
}

impl ExportedDeclsBuilder {
    /// Add a keep pattern: symbols matching it survive the drop patterns.
    pub fn add_keep_regex(&mut self, pattern: Regex) {
        self.keep_regexps.push(pattern);
    }

    /// Add a drop pattern: matching symbols leave the exported sets.
    pub fn add_drop_regex(&mut self, pattern: Regex) {
        self.drop_regexps.push(pattern);
    }

    /// Add an exact symbol id (`name` or `name@version`) to keep. Explicit ids
    /// take precedence over every pattern.
    pub fn add_keep_symbol_id(&mut self, id: &str) {
        self.keep_symbol_ids.push(id.to_string());
    }

    /// Whether a symbol with the given name/id passes the keep/drop lists.
    fn symbol_is_wanted(&self, name: &str, id: &str) -> bool {
        if self.keep_symbol_ids.iter().any(|k| k == id || k == name) {
            return true;
        }
        if self.drop_regexps.iter().any(|re| re.is_match(name)) {
            // Explicit keep patterns override regex suppression.
            return self.keep_regexps.iter().any(|re| re.is_match(name));
        }
        if !self.keep_regexps.is_empty() {
            return self.keep_regexps.iter().any(|re| re.is_match(name));
        }
        true
    }

    /// Decide membership for a function declaration and cache the result.
    ///
    /// Returns `true` when the declaration joined (or already was in) the
    /// exported set.
    pub fn maybe_add_function(&self, decl: &FunctionDeclRc) -> bool {
        let key = decl.qualified_name();
        if self.fn_cache.contains_key(&key) {
            return true;
        }
        let Some(symbol) = decl.symbol.as_ref() else {
            return false;
        };
        if !(symbol.is_public && symbol.is_defined) {
            return false;
        }
        if !self.symbol_is_wanted(&symbol.name, &symbol.id_string()) {
            return false;
        }
        self.fn_cache.insert(key, decl.clone());
        true
    }

    /// Decide membership for a variable declaration and cache the result.
    pub fn maybe_add_variable(&self, decl: &VariableDeclRc) -> bool {
        let key = decl.qualified_name();
        if self.var_cache.contains_key(&key) {
            return true;
        }
        let Some(symbol) = decl.symbol.as_ref() else {
            return false;
        };
        if !(symbol.is_public && symbol.is_defined) {
            return false;
        }
        if !self.symbol_is_wanted(&symbol.name, &symbol.id_string()) {
            return false;
        }
        self.var_cache.insert(key, decl.clone());
        true
    }
}

/// The ABI of one binary.
///
/// Identity: a corpus is uniquely identified by its origin plus its path (or
/// soname). The environment owning every type reachable from the corpus is held
/// by the corpus itself; each comparison task builds its corpora in a private
/// environment.
pub struct Corpus {
    /// The environment owning every type of this corpus
    env: Arc<Environment>,
    /// Where the IR came from
    pub origin: CorpusOrigin,
    /// Path of the binary
    pub path: String,
    /// `DT_SONAME`, empty when absent
    pub soname: String,
    /// Architecture string, e.g. `elf-amd-x86_64`
    pub architecture: String,
    /// `DT_NEEDED` entries, in file order
    pub needed: Vec<String>,
    /// The translation units, in addition order
    tunits: Vec<Arc<TranslationUnit>>,
    /// All function symbols of the binary
    fn_symbols: Vec<ElfSymbolRc>,
    /// All variable symbols of the binary
    var_symbols: Vec<ElfSymbolRc>,
    /// The exported-set membership oracle
    exported_decls_builder: ExportedDeclsBuilder,
    /// Suppression specifications with the drop-from-IR action
    drop_suppressions: Vec<SuppressionSpec>,
}

impl Corpus {
    /// Create an empty corpus over the given environment.
    #[must_use]
    pub fn new(env: Arc<Environment>, origin: CorpusOrigin, path: &str) -> Self {
        Corpus {
            env,
            origin,
            path: path.to_string(),
            soname: String::new(),
            architecture: String::new(),
            needed: Vec::new(),
            tunits: Vec::new(),
            fn_symbols: Vec::new(),
            var_symbols: Vec::new(),
            exported_decls_builder: ExportedDeclsBuilder::default(),
            drop_suppressions: Vec::new(),
        }
    }

    /// The environment owning this corpus's types.
    #[must_use]
    pub fn env(&self) -> &Arc<Environment> {
        &self.env
    }

    /// Install suppression specifications to be applied at construction time.
    ///
    /// Only specifications whose action is [`SuppressionAction::DropFromIr`] take
    /// effect here; report-time specifications belong on the diff context.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidSuppression`] when a specification has no
    /// match predicate; configuration errors surface before any unit is added.
    pub fn set_drop_suppressions(&mut self, specs: Vec<SuppressionSpec>) -> Result<()> {
        for spec in &specs {
            spec.ensure_valid()?;
        }
        self.drop_suppressions = specs
            .into_iter()
            .filter(|s| s.action() == SuppressionAction::DropFromIr)
            .collect();
        Ok(())
    }

    /// Check that the corpus carries at least one ELF symbol.
    ///
    /// # Errors
    /// Returns [`crate::Error::NoSymbols`] when both symbol tables are empty. A
    /// corpus without symbols has no observable ABI; whether that is fatal is
    /// the caller's decision.
    pub fn require_symbols(&self) -> Result<()> {
        if self.fn_symbols.is_empty() && self.var_symbols.is_empty() {
            return Err(Error::NoSymbols);
        }
        Ok(())
    }

    /// Register an ELF symbol with the corpus symbol tables.
    pub fn add_symbol(&mut self, symbol: ElfSymbolRc) {
        match symbol.kind {
            SymbolKind::Function => self.fn_symbols.push(symbol),
            SymbolKind::Variable => self.var_symbols.push(symbol),
        }
    }

    /// Append a translation unit; O(1) plus exported-set bookkeeping per decl.
    ///
    /// Declarations and file-scope types matched by a drop suppression are
    /// removed from the IR here, which is the cheapest point to do it: the
    /// stored unit holds only the surviving decls. Declarations whose type
    /// handle does not resolve are dropped with a warning; corpus construction
    /// is best effort.
    pub fn add(&mut self, unit: TranslationUnit) {
        let mut kept = TranslationUnit::new(&unit.path);
        kept.language = unit.language.clone();
        for (_, decl) in unit.decls.iter() {
            match decl {
                crate::ir::TopLevelDecl::Function(f) => {
                    if self.env.type_of(f.type_id).is_none() {
                        log::warn!(
                            "dropping function '{}' with unresolvable type {}",
                            f.qualified_name(),
                            f.type_id
                        );
                        continue;
                    }
                    if self.decl_is_dropped_fn(f) {
                        continue;
                    }
                    self.exported_decls_builder.maybe_add_function(f);
                    kept.add_function(f.clone());
                }
                crate::ir::TopLevelDecl::Variable(v) => {
                    if self.env.type_of(v.type_id).is_none() {
                        log::warn!(
                            "dropping variable '{}' with unresolvable type {}",
                            v.qualified_name(),
                            v.type_id
                        );
                        continue;
                    }
                    if self.decl_is_dropped_var(v) {
                        continue;
                    }
                    self.exported_decls_builder.maybe_add_variable(v);
                    kept.add_variable(v.clone());
                }
                crate::ir::TopLevelDecl::Type(id) => {
                    if self.type_is_dropped(*id) {
                        continue;
                    }
                    kept.add_type(*id);
                }
            }
        }
        self.tunits.push(Arc::new(kept));
    }

    fn decl_is_dropped_fn(&self, decl: &FunctionDeclRc) -> bool {
        let dropped = self
            .drop_suppressions
            .iter()
            .any(|spec| spec.matches_function(decl));
        if dropped {
            log::debug!("suppression drops function '{}' from the IR", decl.qualified_name());
        }
        dropped
    }

    fn decl_is_dropped_var(&self, decl: &VariableDeclRc) -> bool {
        let dropped = self
            .drop_suppressions
            .iter()
            .any(|spec| spec.matches_variable(decl));
        if dropped {
            log::debug!("suppression drops variable '{}' from the IR", decl.qualified_name());
        }
        dropped
    }

    fn type_is_dropped(&self, id: TypeId) -> bool {
        let dropped = self
            .drop_suppressions
            .iter()
            .any(|spec| spec.matches_type(&self.env, id));
        if dropped {
            log::debug!("suppression drops type {id} from the IR");
        }
        dropped
    }

    /// The exported-set membership oracle, for configuring keep/drop lists.
    pub fn exported_decls_builder(&mut self) -> &mut ExportedDeclsBuilder {
        &mut self.exported_decls_builder
    }

    /// The translation units, in addition order.
    #[must_use]
    pub fn translation_units(&self) -> &[Arc<TranslationUnit>] {
        &self.tunits
    }

    /// The exported function declarations, sorted by qualified name so diff
    /// construction is deterministic.
    #[must_use]
    pub fn exported_functions(&self) -> Vec<FunctionDeclRc> {
        let mut fns: Vec<FunctionDeclRc> = self
            .exported_decls_builder
            .fn_cache
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        fns.sort_by_key(|f| f.qualified_name());
        fns
    }

    /// The exported variable declarations, sorted by qualified name.
    #[must_use]
    pub fn exported_variables(&self) -> Vec<VariableDeclRc> {
        let mut vars: Vec<VariableDeclRc> = self
            .exported_decls_builder
            .var_cache
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        vars.sort_by_key(|v| v.qualified_name());
        vars
    }

    /// Exported function symbols that no declaration refers to, sorted by name.
    ///
    /// These surface in a diff as raw symbol additions/removals when a binary has
    /// symbols without matching debug info.
    #[must_use]
    pub fn unreferenced_function_symbols(&self) -> Vec<ElfSymbolRc> {
        let referenced: std::collections::HashSet<String> = self
            .exported_decls_builder
            .fn_cache
            .iter()
            .filter_map(|e| e.value().symbol.as_ref().map(|s| s.id_string()))
            .collect();
        let mut unreferenced: Vec<ElfSymbolRc> = self
            .fn_symbols
            .iter()
            .filter(|s| s.is_public && s.is_defined && !referenced.contains(&s.id_string()))
            .cloned()
            .collect();
        unreferenced.sort_by(|a, b| a.id_string().cmp(&b.id_string()));
        unreferenced
    }

    /// Exported variable symbols that no declaration refers to, sorted by name.
    #[must_use]
    pub fn unreferenced_variable_symbols(&self) -> Vec<ElfSymbolRc> {
        let referenced: std::collections::HashSet<String> = self
            .exported_decls_builder
            .var_cache
            .iter()
            .filter_map(|e| e.value().symbol.as_ref().map(|s| s.id_string()))
            .collect();
        let mut unreferenced: Vec<ElfSymbolRc> = self
            .var_symbols
            .iter()
            .filter(|s| s.is_public && s.is_defined && !referenced.contains(&s.id_string()))
            .cloned()
            .collect();
        unreferenced.sort_by(|a, b| a.id_string().cmp(&b.id_string()));
        unreferenced
    }

    /// Look up a function symbol by name, searching alias chains too.
    #[must_use]
    pub fn lookup_function_symbol(&self, name: &str) -> Option<ElfSymbolRc> {
        self.fn_symbols.iter().find(|s| s.has_name(name)).cloned()
    }

    /// Look up a function symbol by name and version, searching alias chains too.
    #[must_use]
    pub fn lookup_function_symbol_by_version(&self, name: &str, version: &str) -> Option<ElfSymbolRc> {
        self.fn_symbols
            .iter()
            .find(|s| s.matches_name_and_version(name, version))
            .cloned()
    }

    /// Look up a variable symbol by name, searching alias chains too.
    #[must_use]
    pub fn lookup_variable_symbol(&self, name: &str) -> Option<ElfSymbolRc> {
        self.var_symbols.iter().find(|s| s.has_name(name)).cloned()
    }

    /// Look up a variable symbol by name and version, searching alias chains too.
    #[must_use]
    pub fn lookup_variable_symbol_by_version(&self, name: &str, version: &str) -> Option<ElfSymbolRc> {
        self.var_symbols
            .iter()
            .find(|s| s.matches_name_and_version(name, version))
            .cloned()
    }

    /// Look up a function symbol through the alias chain of an existing symbol:
    /// the first function symbol sharing any name with `symbol`.
    #[must_use]
    pub fn lookup_function_symbol_aliases(&self, symbol: &ElfSymbolRc) -> Option<ElfSymbolRc> {
        std::iter::once(&symbol.name)
            .chain(symbol.aliases.iter())
            .find_map(|name| self.lookup_function_symbol(name))
    }

    /// Look up a variable symbol through the alias chain of an existing symbol:
    /// the first variable symbol sharing any name with `symbol`.
    #[must_use]
    pub fn lookup_variable_symbol_aliases(&self, symbol: &ElfSymbolRc) -> Option<ElfSymbolRc> {
        std::iter::once(&symbol.name)
            .chain(symbol.aliases.iter())
            .find_map(|name| self.lookup_variable_symbol(name))
    }

    /// Types declared at file scope across all units, in declaration order.
    /// Drop-suppressed types are absent; see [`Corpus::add`].
    pub fn file_scope_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.tunits.iter().flat_map(|unit| {
            unit.decls.iter().filter_map(|(_, decl)| match decl {
                crate::ir::TopLevelDecl::Type(id) => Some(*id),
                _ => None,
            })
        })
    }
}

impl PartialEq for Corpus {
    /// Deep corpus equality: the fast short-circuit consulted before running the
    /// diff engine. Two corpora are equal iff soname, architecture, needed list,
    /// exported symbol sets and every translation unit compare equal, with decl
    /// types compared structurally across the two environments.
    fn eq(&self, other: &Self) -> bool {
        if self.soname != other.soname
            || self.architecture != other.architecture
            || self.needed != other.needed
        {
            return false;
        }

        let symbol_ids = |symbols: &[ElfSymbolRc]| -> Vec<String> {
            let mut ids: Vec<String> = symbols
                .iter()
                .filter(|s| s.is_public && s.is_defined)
                .map(|s| s.id_string())
                .collect();
            ids.sort();
            ids
        };
        if symbol_ids(&self.fn_symbols) != symbol_ids(&other.fn_symbols)
            || symbol_ids(&self.var_symbols) != symbol_ids(&other.var_symbols)
        {
            return false;
        }

        if self.tunits.len() != other.tunits.len() {
            return false;
        }
        for (ua, ub) in self.tunits.iter().zip(other.tunits.iter()) {
            if ua.path != ub.path || ua.decls.count() != ub.decls.count() {
                return false;
            }
        }

        let fns_a = self.exported_functions();
        let fns_b = other.exported_functions();
        if fns_a.len() != fns_b.len() {
            return false;
        }
        for (fa, fb) in fns_a.iter().zip(fns_b.iter()) {
            if fa.qualified_name() != fb.qualified_name()
                || fa.linkage_name != fb.linkage_name
                || !canon::structural_eq(&self.env, fa.type_id, &other.env, fb.type_id)
            {
                return false;
            }
        }

        let vars_a = self.exported_variables();
        let vars_b = other.exported_variables();
        if vars_a.len() != vars_b.len() {
            return false;
        }
        for (va, vb) in vars_a.iter().zip(vars_b.iter()) {
            if va.qualified_name() != vb.qualified_name()
                || va.linkage_name != vb.linkage_name
                || !canon::structural_eq(&self.env, va.type_id, &other.env, vb.type_id)
            {
                return false;
            }
        }

        true
    }
}

/// An ordered collection of corpora representing one logical product, e.g. a
/// kernel image plus its modules; diffed as a unit.
#[derive(Default)]
pub struct CorpusGroup {
    /// Path or name identifying the group
    pub path: String,
    /// The member corpora, in addition order
    corpora: Vec<Arc<Corpus>>,
}

impl CorpusGroup {
    /// Create an empty group.
    #[must_use]
    pub fn new(path: &str) -> Self {
        CorpusGroup {
            path: path.to_string(),
            corpora: Vec::new(),
        }
    }

    /// Append a corpus to the group.
    pub fn add_corpus(&mut self, corpus: Arc<Corpus>) {
        self.corpora.push(corpus);
    }

    /// The member corpora, in addition order.
    #[must_use]
    pub fn corpora(&self) -> &[Arc<Corpus>] {
        &self.corpora
    }

    /// Find a member corpus by soname or path.
    #[must_use]
    pub fn corpus_for(&self, soname_or_path: &str) -> Option<&Arc<Corpus>> {
        self.corpora
            .iter()
            .find(|c| c.soname == soname_or_path || c.path == soname_or_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ElfSymbol, FunctionDecl, SymbolKind};
    use crate::suppression::{FunctionSuppression, TypeSuppression};
    use crate::test::factories::TestEnv;

    fn corpus_with_fn(env: &TestEnv, name: &str) -> Corpus {
        let mut corpus = Corpus::new(env.env_rc(), CorpusOrigin::Artificial, "test.so");
        let fn_type = env.void_fn_type();
        let symbol = Arc::new(ElfSymbol::public(name, SymbolKind::Function));
        corpus.add_symbol(symbol.clone());
        let unit = TranslationUnit::new("a.c");
        unit.add_function(Arc::new(FunctionDecl::new(name, fn_type).with_symbol(symbol)));
        corpus.add(unit);
        corpus
    }

    #[test]
    fn test_exported_membership_requires_public_symbol() {
        let env = TestEnv::new();
        let mut corpus = Corpus::new(env.env_rc(), CorpusOrigin::Artificial, "test.so");
        let fn_type = env.void_fn_type();

        let unit = TranslationUnit::new("a.c");
        // No symbol bound: not exported.
        unit.add_function(Arc::new(FunctionDecl::new("internal", fn_type)));
        corpus.add(unit);

        assert!(corpus.exported_functions().is_empty());
    }

    #[test]
    fn test_exported_membership_cached() {
        let env = TestEnv::new();
        let corpus = corpus_with_fn(&env, "f");
        assert_eq!(corpus.exported_functions().len(), 1);
        assert_eq!(corpus.exported_functions()[0].name, "f");
    }

    #[test]
    fn test_drop_regex_removes_symbol() {
        let env = TestEnv::new();
        let mut corpus = Corpus::new(env.env_rc(), CorpusOrigin::Artificial, "test.so");
        corpus
            .exported_decls_builder()
            .add_drop_regex(Regex::new("^__private_").unwrap());

        let fn_type = env.void_fn_type();
        let symbol = Arc::new(ElfSymbol::public("__private_f", SymbolKind::Function));
        corpus.add_symbol(symbol.clone());
        let unit = TranslationUnit::new("a.c");
        unit.add_function(Arc::new(
            FunctionDecl::new("__private_f", fn_type).with_symbol(symbol),
        ));
        corpus.add(unit);

        assert!(corpus.exported_functions().is_empty());
    }

    #[test]
    fn test_explicit_keep_overrides_drop_regex() {
        let env = TestEnv::new();
        let mut corpus = Corpus::new(env.env_rc(), CorpusOrigin::Artificial, "test.so");
        {
            let builder = corpus.exported_decls_builder();
            builder.add_drop_regex(Regex::new("^__private_").unwrap());
            builder.add_keep_symbol_id("__private_keep_me");
        }

        let fn_type = env.void_fn_type();
        let symbol = Arc::new(ElfSymbol::public("__private_keep_me", SymbolKind::Function));
        corpus.add_symbol(symbol.clone());
        let unit = TranslationUnit::new("a.c");
        unit.add_function(Arc::new(
            FunctionDecl::new("__private_keep_me", fn_type).with_symbol(symbol),
        ));
        corpus.add(unit);

        assert_eq!(corpus.exported_functions().len(), 1);
    }

    #[test]
    fn test_drop_suppression_removes_type_from_unit() {
        let env = TestEnv::new();
        let secret = env.simple_struct("Secret", &[("x", 32)]);
        let visible = env.simple_struct("Visible", &[("x", 32)]);
        let mut corpus = Corpus::new(env.env_rc(), CorpusOrigin::Artificial, "test.so");
        corpus
            .set_drop_suppressions(vec![SuppressionSpec::Type(
                TypeSuppression::new("drop-secret")
                    .with_name("Secret")
                    .with_action(SuppressionAction::DropFromIr),
            )])
            .unwrap();

        let unit = TranslationUnit::new("a.c");
        unit.add_type(secret);
        unit.add_type(visible);
        corpus.add(unit);

        let kept: Vec<TypeId> = corpus.file_scope_types().collect();
        assert_eq!(kept, [visible]);
    }

    #[test]
    fn test_drop_suppression_removes_function_decl() {
        let env = TestEnv::new();
        let mut corpus = Corpus::new(env.env_rc(), CorpusOrigin::Artificial, "test.so");
        corpus
            .set_drop_suppressions(vec![SuppressionSpec::Function(
                FunctionSuppression::new("drop-f")
                    .with_name("f")
                    .with_action(SuppressionAction::DropFromIr),
            )])
            .unwrap();

        let fn_type = env.void_fn_type();
        let symbol = Arc::new(ElfSymbol::public("f", SymbolKind::Function));
        corpus.add_symbol(symbol.clone());
        let unit = TranslationUnit::new("a.c");
        unit.add_function(Arc::new(FunctionDecl::new("f", fn_type).with_symbol(symbol)));
        corpus.add(unit);

        assert!(corpus.exported_functions().is_empty());
        // The stored unit holds only the surviving decls.
        assert_eq!(corpus.translation_units()[0].functions().count(), 0);
    }

    #[test]
    fn test_predicate_less_drop_suppression_is_rejected() {
        let env = TestEnv::new();
        let mut corpus = Corpus::new(env.env_rc(), CorpusOrigin::Artificial, "test.so");
        let result = corpus.set_drop_suppressions(vec![SuppressionSpec::Type(
            TypeSuppression::new("empty").with_action(SuppressionAction::DropFromIr),
        )]);
        assert!(matches!(result, Err(Error::InvalidSuppression(_))));
    }

    #[test]
    fn test_symbol_less_corpus_has_no_observable_abi() {
        let env = TestEnv::new();
        let empty = Corpus::new(env.env_rc(), CorpusOrigin::Artificial, "empty.so");
        assert!(matches!(empty.require_symbols(), Err(Error::NoSymbols)));

        let populated = corpus_with_fn(&env, "f");
        assert!(populated.require_symbols().is_ok());
    }

    #[test]
    fn test_symbol_lookup_through_alias() {
        let env = TestEnv::new();
        let mut corpus = Corpus::new(env.env_rc(), CorpusOrigin::Artificial, "test.so");
        corpus.add_symbol(Arc::new(
            ElfSymbol::public("malloc", SymbolKind::Function).with_alias("__libc_malloc"),
        ));

        assert!(corpus.lookup_function_symbol("__libc_malloc").is_some());
        assert!(corpus.lookup_function_symbol("calloc").is_none());
    }

    #[test]
    fn test_variable_symbol_lookup_through_alias_chain() {
        let env = TestEnv::new();
        let mut corpus = Corpus::new(env.env_rc(), CorpusOrigin::Artificial, "test.so");
        corpus.add_symbol(Arc::new(ElfSymbol::public("environ", SymbolKind::Variable)));

        let foreign = Arc::new(
            ElfSymbol::public("__environ", SymbolKind::Variable).with_alias("environ"),
        );
        let found = corpus.lookup_variable_symbol_aliases(&foreign).unwrap();
        assert_eq!(found.name, "environ");

        let unrelated = Arc::new(ElfSymbol::public("stdout", SymbolKind::Variable));
        assert!(corpus.lookup_variable_symbol_aliases(&unrelated).is_none());
    }

    #[test]
    fn test_corpus_equality_short_circuit() {
        let env_a = TestEnv::new();
        let env_b = TestEnv::new();
        let a = corpus_with_fn(&env_a, "f");
        let b = corpus_with_fn(&env_b, "f");
        assert!(a == b);

        let c = corpus_with_fn(&env_b, "g");
        assert!(a != c);
    }

    #[test]
    fn test_unreferenced_symbols() {
        let env = TestEnv::new();
        let mut corpus = corpus_with_fn(&env, "f");
        corpus.add_symbol(Arc::new(ElfSymbol::public("orphan", SymbolKind::Function)));

        let unreferenced = corpus.unreferenced_function_symbols();
        assert_eq!(unreferenced.len(), 1);
        assert_eq!(unreferenced[0].name, "orphan");
    }

    #[test]
    fn test_corpus_group_lookup() {
        let env = TestEnv::new();
        let mut corpus = corpus_with_fn(&env, "f");
        corpus.soname = "libfoo.so.1".to_string();
        let mut group = CorpusGroup::new("image");
        group.add_corpus(Arc::new(corpus));

        assert!(group.corpus_for("libfoo.so.1").is_some());
        assert!(group.corpus_for("libbar.so.1").is_none());
    }
}
