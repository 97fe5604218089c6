//! User-authored suppression specifications.
//!
//! A suppression specification is a conjunction of match predicates (type name or
//! name pattern, source location, symbol name/version, declaration-only flag,
//! size range) plus an action: drop the matched artifact from the IR at
//! construction time, or merely hide its diff from the report. A corpus or diff
//! context holds an ordered list of specifications; a match on any one of them
//! suppresses the artifact.
//!
//! Construction-time drops are the cheapest form (they shrink all downstream
//! work) and are applied by [`crate::ir::Corpus::add`]; report-time suppression
//! is applied by the filter pass, which marks matching diff nodes with the
//! `SUPPRESSED` category without altering the underlying IR.
//!
//! The public-headers policy is expressed as a synthesized whitelist: a type
//! suppression listing the header files that make up the public surface matches
//! (and therefore hides) every type *not* declared in one of them.

use std::ops::RangeInclusive;
use std::path::Path;

use regex::Regex;
use strum::Display;

use crate::ir::{Environment, FunctionDeclRc, TypeId, VariableDeclRc};
use crate::{Error, Result};

/// What a matching specification does to the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SuppressionAction {
    /// Remove the artifact from the IR while the corpus is being built
    DropFromIr,
    /// Keep the IR intact, hide the diff from the report
    SuppressReport,
}

/// A suppression matching types.
#[derive(Debug)]
pub struct TypeSuppression {
    /// Section label, used in logs
    pub label: String,
    name: Option<String>,
    name_regex: Option<Regex>,
    source_location_regex: Option<Regex>,
    is_declaration_only: Option<bool>,
    size_in_bytes: Option<RangeInclusive<u64>>,
    /// Non-empty means: a type is matched when it is *not* declared in one of
    /// these files (the public-headers whitelist).
    allowed_locations: Vec<String>,
    action: SuppressionAction,
}

impl TypeSuppression {
    /// An empty specification with the given label; matches nothing until a
    /// predicate is added.
    #[must_use]
    pub fn new(label: &str) -> Self {
        TypeSuppression {
            label: label.to_string(),
            name: None,
            name_regex: None,
            source_location_regex: None,
            is_declaration_only: None,
            size_in_bytes: None,
            allowed_locations: Vec::new(),
            action: SuppressionAction::SuppressReport,
        }
    }

    /// Synthesize the private-types-invisible policy from the header files found
    /// in a directory: any type not declared in one of them is suppressed.
    /// Subdirectories are not descended into; location matching is by file name.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] when the directory cannot be read.
    pub fn from_public_headers_dir(label: &str, dir: &Path) -> Result<Self> {
        let mut spec = TypeSuppression::new(label);
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                spec.allowed_locations
                    .push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(spec)
    }

    /// Synthesize the private-types-invisible policy from a set of public header
    /// files: any type not declared in one of them is suppressed.
    #[must_use]
    pub fn from_public_headers(label: &str, headers: &[&str]) -> Self {
        let mut spec = TypeSuppression::new(label);
        spec.allowed_locations = headers
            .iter()
            .map(|h| {
                Path::new(h)
                    .file_name()
                    .map_or_else(|| (*h).to_string(), |f| f.to_string_lossy().into_owned())
            })
            .collect();
        spec
    }

    /// Match types with this exact name.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Match types whose name matches this pattern.
    ///
    /// # Errors
    /// Returns [`crate::Error::RegexError`] for a malformed pattern; configuration
    /// errors surface before any expensive computation begins.
    pub fn with_name_regex(mut self, pattern: &str) -> Result<Self> {
        self.name_regex = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Match types declared in files matching this pattern.
    ///
    /// # Errors
    /// Returns [`crate::Error::RegexError`] for a malformed pattern.
    pub fn with_source_location_regex(mut self, pattern: &str) -> Result<Self> {
        self.source_location_regex = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Match only declaration-only (or only fully defined) types.
    #[must_use]
    pub fn with_declaration_only(mut self, value: bool) -> Self {
        self.is_declaration_only = Some(value);
        self
    }

    /// Match types whose size in bytes falls in the given range.
    #[must_use]
    pub fn with_size_in_bytes(mut self, range: RangeInclusive<u64>) -> Self {
        self.size_in_bytes = Some(range);
        self
    }

    /// Set the action taken on match.
    #[must_use]
    pub fn with_action(mut self, action: SuppressionAction) -> Self {
        self.action = action;
        self
    }

    fn has_predicate(&self) -> bool {
        self.name.is_some()
            || self.name_regex.is_some()
            || self.source_location_regex.is_some()
            || self.is_declaration_only.is_some()
            || self.size_in_bytes.is_some()
            || !self.allowed_locations.is_empty()
    }

    /// Whether this specification expresses the public-headers whitelist, i.e.
    /// matched types are private rather than individually suppressed.
    #[must_use]
    pub fn is_private_type_policy(&self) -> bool {
        !self.allowed_locations.is_empty()
    }

    /// Whether this specification matches the given type. All set predicates
    /// must agree (conjunction); a specification without predicates matches
    /// nothing.
    #[must_use]
    pub fn matches_type(&self, env: &Environment, id: TypeId) -> bool {
        if !self.has_predicate() {
            return false;
        }
        let Some(ty) = env.type_of(id) else {
            return false;
        };

        if let Some(name) = &self.name {
            if ty.name.as_deref() != Some(name.as_str()) {
                return false;
            }
        }
        if let Some(re) = &self.name_regex {
            match &ty.name {
                Some(n) if re.is_match(n) => {}
                _ => return false,
            }
        }
        if let Some(re) = &self.source_location_regex {
            match &ty.source_location {
                Some(loc) if re.is_match(loc) => {}
                _ => return false,
            }
        }
        if let Some(decl_only) = self.is_declaration_only {
            if ty.is_declaration_only() != decl_only {
                return false;
            }
        }
        if let Some(range) = &self.size_in_bytes {
            if !range.contains(&(ty.size_in_bits / 8)) {
                return false;
            }
        }
        if !self.allowed_locations.is_empty() {
            let in_public_header = ty.source_location.as_deref().is_some_and(|loc| {
                let file = Path::new(loc)
                    .file_name()
                    .map_or_else(|| loc.to_string(), |f| f.to_string_lossy().into_owned());
                self.allowed_locations.iter().any(|h| *h == file)
            });
            // The whitelist matches (suppresses) everything outside it.
            if in_public_header {
                return false;
            }
        }
        true
    }
}

/// A suppression matching function declarations.
#[derive(Debug)]
pub struct FunctionSuppression {
    /// Section label, used in logs
    pub label: String,
    name: Option<String>,
    name_regex: Option<Regex>,
    symbol_name_regex: Option<Regex>,
    symbol_version_regex: Option<Regex>,
    action: SuppressionAction,
}

impl FunctionSuppression {
    /// An empty specification with the given label; matches nothing until a
    /// predicate is added.
    #[must_use]
    pub fn new(label: &str) -> Self {
        FunctionSuppression {
            label: label.to_string(),
            name: None,
            name_regex: None,
            symbol_name_regex: None,
            symbol_version_regex: None,
            action: SuppressionAction::SuppressReport,
        }
    }

    /// Match functions with this exact name.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Match functions whose name matches this pattern.
    ///
    /// # Errors
    /// Returns [`crate::Error::RegexError`] for a malformed pattern.
    pub fn with_name_regex(mut self, pattern: &str) -> Result<Self> {
        self.name_regex = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Match functions whose ELF symbol name matches this pattern.
    ///
    /// # Errors
    /// Returns [`crate::Error::RegexError`] for a malformed pattern.
    pub fn with_symbol_name_regex(mut self, pattern: &str) -> Result<Self> {
        self.symbol_name_regex = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Match functions whose ELF symbol version matches this pattern.
    ///
    /// # Errors
    /// Returns [`crate::Error::RegexError`] for a malformed pattern.
    pub fn with_symbol_version_regex(mut self, pattern: &str) -> Result<Self> {
        self.symbol_version_regex = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Set the action taken on match.
    #[must_use]
    pub fn with_action(mut self, action: SuppressionAction) -> Self {
        self.action = action;
        self
    }

    fn has_predicate(&self) -> bool {
        self.name.is_some()
            || self.name_regex.is_some()
            || self.symbol_name_regex.is_some()
            || self.symbol_version_regex.is_some()
    }

    /// Whether this specification matches the given function declaration.
    #[must_use]
    pub fn matches(&self, decl: &FunctionDeclRc) -> bool {
        if !self.has_predicate() {
            return false;
        }
        if let Some(name) = &self.name {
            if decl.qualified_name() != *name {
                return false;
            }
        }
        if let Some(re) = &self.name_regex {
            if !re.is_match(&decl.qualified_name()) {
                return false;
            }
        }
        if let Some(re) = &self.symbol_name_regex {
            match &decl.symbol {
                Some(s) if re.is_match(&s.name) => {}
                _ => return false,
            }
        }
        if let Some(re) = &self.symbol_version_regex {
            match decl.symbol.as_ref().and_then(|s| s.version.as_ref()) {
                Some(v) if re.is_match(&v.name) => {}
                _ => return false,
            }
        }
        true
    }
}

/// A suppression matching variable declarations.
#[derive(Debug)]
pub struct VariableSuppression {
    /// Section label, used in logs
    pub label: String,
    name: Option<String>,
    name_regex: Option<Regex>,
    symbol_name_regex: Option<Regex>,
    action: SuppressionAction,
}

impl VariableSuppression {
    /// An empty specification with the given label; matches nothing until a
    /// predicate is added.
    #[must_use]
    pub fn new(label: &str) -> Self {
        VariableSuppression {
            label: label.to_string(),
            name: None,
            name_regex: None,
            symbol_name_regex: None,
            action: SuppressionAction::SuppressReport,
        }
    }

    /// Match variables with this exact name.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Match variables whose name matches this pattern.
    ///
    /// # Errors
    /// Returns [`crate::Error::RegexError`] for a malformed pattern.
    pub fn with_name_regex(mut self, pattern: &str) -> Result<Self> {
        self.name_regex = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Match variables whose ELF symbol name matches this pattern.
    ///
    /// # Errors
    /// Returns [`crate::Error::RegexError`] for a malformed pattern.
    pub fn with_symbol_name_regex(mut self, pattern: &str) -> Result<Self> {
        self.symbol_name_regex = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Set the action taken on match.
    #[must_use]
    pub fn with_action(mut self, action: SuppressionAction) -> Self {
        self.action = action;
        self
    }

    fn has_predicate(&self) -> bool {
        self.name.is_some() || self.name_regex.is_some() || self.symbol_name_regex.is_some()
    }

    /// Whether this specification matches the given variable declaration.
    #[must_use]
    pub fn matches(&self, decl: &VariableDeclRc) -> bool {
        if !self.has_predicate() {
            return false;
        }
        if let Some(name) = &self.name {
            if decl.qualified_name() != *name {
                return false;
            }
        }
        if let Some(re) = &self.name_regex {
            if !re.is_match(&decl.qualified_name()) {
                return false;
            }
        }
        if let Some(re) = &self.symbol_name_regex {
            match &decl.symbol {
                Some(s) if re.is_match(&s.name) => {}
                _ => return false,
            }
        }
        true
    }
}

/// One suppression specification of any kind.
#[derive(Debug)]
pub enum SuppressionSpec {
    /// Matches types
    Type(TypeSuppression),
    /// Matches function declarations
    Function(FunctionSuppression),
    /// Matches variable declarations
    Variable(VariableSuppression),
}

impl SuppressionSpec {
    /// The action taken on match.
    #[must_use]
    pub fn action(&self) -> SuppressionAction {
        match self {
            SuppressionSpec::Type(s) => s.action,
            SuppressionSpec::Function(s) => s.action,
            SuppressionSpec::Variable(s) => s.action,
        }
    }

    /// The section label of the specification.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            SuppressionSpec::Type(s) => &s.label,
            SuppressionSpec::Function(s) => &s.label,
            SuppressionSpec::Variable(s) => &s.label,
        }
    }

    /// Whether this spec matches the given type.
    #[must_use]
    pub fn matches_type(&self, env: &Environment, id: TypeId) -> bool {
        match self {
            SuppressionSpec::Type(s) => s.matches_type(env, id),
            _ => false,
        }
    }

    /// Whether this spec expresses the public-headers whitelist.
    #[must_use]
    pub fn is_private_type_policy(&self) -> bool {
        match self {
            SuppressionSpec::Type(s) => s.is_private_type_policy(),
            _ => false,
        }
    }

    /// Whether this spec matches the given function declaration.
    #[must_use]
    pub fn matches_function(&self, decl: &FunctionDeclRc) -> bool {
        match self {
            SuppressionSpec::Function(s) => s.matches(decl),
            _ => false,
        }
    }

    /// Whether this spec matches the given variable declaration.
    #[must_use]
    pub fn matches_variable(&self, decl: &VariableDeclRc) -> bool {
        match self {
            SuppressionSpec::Variable(s) => s.matches(decl),
            _ => false,
        }
    }

    /// Reject a specification that carries no match predicate. Such a section
    /// matches nothing, which is always a configuration mistake.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidSuppression`] naming the offending section.
    pub fn ensure_valid(&self) -> Result<()> {
        let valid = match self {
            SuppressionSpec::Type(s) => s.has_predicate(),
            SuppressionSpec::Function(s) => s.has_predicate(),
            SuppressionSpec::Variable(s) => s.has_predicate(),
        };
        if valid {
            Ok(())
        } else {
            Err(Error::InvalidSuppression(format!(
                "section '{}' has no match predicate",
                self.label()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FunctionDecl;
    use crate::test::factories::TestEnv;
    use std::sync::Arc;

    #[test]
    fn test_empty_spec_matches_nothing() {
        let env = TestEnv::new();
        let id = env.simple_struct("Foo", &[("x", 32)]);
        let spec = TypeSuppression::new("empty");
        assert!(!spec.matches_type(env.env(), id));
    }

    #[test]
    fn test_type_name_match() {
        let env = TestEnv::new();
        let id = env.simple_struct("Foo", &[("x", 32)]);
        let spec = TypeSuppression::new("by-name").with_name("Foo");
        assert!(spec.matches_type(env.env(), id));
        assert!(!spec.with_name("Bar").matches_type(env.env(), id));
    }

    #[test]
    fn test_conjunction_of_predicates() {
        let env = TestEnv::new();
        let id = env.simple_struct("Foo", &[("x", 32)]);
        // Name matches but declaration-only does not: the conjunction fails.
        let spec = TypeSuppression::new("conj")
            .with_name("Foo")
            .with_declaration_only(true);
        assert!(!spec.matches_type(env.env(), id));
    }

    #[test]
    fn test_size_range() {
        let env = TestEnv::new();
        let id = env.simple_struct("Foo", &[("x", 32), ("y", 32)]); // 8 bytes
        let hit = TypeSuppression::new("size").with_size_in_bytes(4..=16);
        let miss = TypeSuppression::new("size").with_size_in_bytes(16..=32);
        assert!(hit.matches_type(env.env(), id));
        assert!(!miss.matches_type(env.env(), id));
    }

    #[test]
    fn test_public_headers_whitelist() {
        let env = TestEnv::new();
        let public = env.env().add_type(
            crate::ir::TypeSpec::named("PublicType", crate::ir::TypeKind::Fundamental)
                .with_size(32)
                .with_location("include/public.h"),
        );
        let private = env.env().add_type(
            crate::ir::TypeSpec::named("PrivateType", crate::ir::TypeKind::Fundamental)
                .with_size(32)
                .with_location("src/private.h"),
        );

        let spec = TypeSuppression::from_public_headers("public-api", &["public.h"]);
        assert!(!spec.matches_type(env.env(), public));
        assert!(spec.matches_type(env.env(), private));
    }

    #[test]
    fn test_function_symbol_version_regex() {
        let env = TestEnv::new();
        let fn_type = env.void_fn_type();
        let symbol = Arc::new(
            crate::ir::ElfSymbol::public("f", crate::ir::SymbolKind::Function)
                .with_version("PRIVATE_1.0", true),
        );
        let decl = Arc::new(FunctionDecl::new("f", fn_type).with_symbol(symbol));

        let spec = FunctionSuppression::new("private-versions")
            .with_symbol_version_regex("^PRIVATE_")
            .unwrap();
        assert!(spec.matches(&decl));
    }

    #[test]
    fn test_bad_regex_is_config_error() {
        assert!(TypeSuppression::new("bad").with_name_regex("(").is_err());
    }

    #[test]
    fn test_predicate_less_spec_is_invalid() {
        let empty = SuppressionSpec::Type(TypeSuppression::new("empty"));
        assert!(matches!(
            empty.ensure_valid(),
            Err(crate::Error::InvalidSuppression(_))
        ));

        let named = SuppressionSpec::Function(FunctionSuppression::new("named").with_name("f"));
        assert!(named.ensure_valid().is_ok());
    }

    #[test]
    fn test_public_headers_dir_missing_is_a_file_error() {
        let result =
            TypeSuppression::from_public_headers_dir("api", Path::new("/nonexistent/include"));
        assert!(matches!(result, Err(crate::Error::FileError(_))));
    }

    #[test]
    fn test_public_headers_dir_lists_files() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
        let spec = TypeSuppression::from_public_headers_dir("api", &dir).unwrap();
        assert!(spec.is_private_type_policy());
    }
}
