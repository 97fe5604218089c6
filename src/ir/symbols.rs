//! ELF symbol modeling for ABI corpora.
//!
//! A corpus describes the externally visible surface of a binary in terms of its
//! ELF symbols. This module provides [`ElfSymbol`] together with the alias and
//! version machinery that symbol lookup has to honor: one address in a binary can
//! have several names bound to it (aliases), and one name can exist in several
//! versions (`symbol@VERSION`).
//!
//! # Key Components
//!
//! - [`ElfSymbol`] - One symbol: name, optional version, kind, binding, visibility
//! - [`SymbolKind`], [`SymbolBinding`], [`SymbolVisibility`] - Closed classification enums
//! - [`SymbolVersion`] - A version name plus its default-version flag

use std::fmt;
use std::sync::Arc;

use strum::Display;

/// Whether a symbol names a function or a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SymbolKind {
    /// A function symbol (`STT_FUNC`)
    Function,
    /// An object/variable symbol (`STT_OBJECT`)
    Variable,
}

/// Linkage binding of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SymbolBinding {
    /// `STB_LOCAL`
    Local,
    /// `STB_GLOBAL`
    Global,
    /// `STB_WEAK`
    Weak,
}

/// ELF visibility of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SymbolVisibility {
    /// `STV_DEFAULT`
    Default,
    /// `STV_HIDDEN`
    Hidden,
    /// `STV_PROTECTED`
    Protected,
    /// `STV_INTERNAL`
    Internal,
}

/// A symbol version (`name@VERSION` / `name@@VERSION`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolVersion {
    /// The version string, e.g. `GLIBC_2.2.5`
    pub name: String,
    /// Whether this is the default version of the symbol (`@@`)
    pub is_default: bool,
}

/// One ELF symbol of a corpus.
///
/// Symbols are shared between the corpus symbol tables and the declarations that
/// carry them, hence the [`ElfSymbolRc`] alias.
#[derive(Debug, Clone)]
pub struct ElfSymbol {
    /// Symbol name
    pub name: String,
    /// Symbol version, when the binary is versioned
    pub version: Option<SymbolVersion>,
    /// Function or variable
    pub kind: SymbolKind,
    /// Local/global/weak binding
    pub binding: SymbolBinding,
    /// ELF visibility
    pub visibility: SymbolVisibility,
    /// Whether the symbol is defined in this binary (vs undefined/imported)
    pub is_defined: bool,
    /// Whether the symbol is publicly exported
    pub is_public: bool,
    /// Other names bound to the same address. The alias chain is searched by
    /// the corpus symbol lookups.
    pub aliases: Vec<String>,
}

/// Reference-counted shared pointer to an [`ElfSymbol`].
pub type ElfSymbolRc = Arc<ElfSymbol>;

impl ElfSymbol {
    /// Create a defined, public, default-visibility global symbol; the common
    /// case for exported ABI surface.
    #[must_use]
    pub fn public(name: &str, kind: SymbolKind) -> Self {
        ElfSymbol {
            name: name.to_string(),
            version: None,
            kind,
            binding: SymbolBinding::Global,
            visibility: SymbolVisibility::Default,
            is_defined: true,
            is_public: true,
            aliases: Vec::new(),
        }
    }

    /// Set the symbol version.
    #[must_use]
    pub fn with_version(mut self, version: &str, is_default: bool) -> Self {
        self.version = Some(SymbolVersion {
            name: version.to_string(),
            is_default,
        });
        self
    }

    /// Add an alias name bound to the same address.
    #[must_use]
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// Whether `name` is this symbol's main name or one of its aliases.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|alias| alias == name)
    }

    /// Whether this symbol matches the given name and version. An empty version
    /// string matches an unversioned symbol or the default version.
    #[must_use]
    pub fn matches_name_and_version(&self, name: &str, version: &str) -> bool {
        if !self.has_name(name) {
            return false;
        }
        match &self.version {
            None => version.is_empty(),
            Some(v) => v.name == version || (version.is_empty() && v.is_default),
        }
    }

    /// The `name@version` form used in reports and keep lists.
    #[must_use]
    pub fn id_string(&self) -> String {
        match &self.version {
            Some(v) => format!("{}@{}", self.name, v.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ElfSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id_string(), self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_chain_lookup() {
        let sym = ElfSymbol::public("malloc", SymbolKind::Function)
            .with_alias("__libc_malloc")
            .with_alias("__malloc");

        assert!(sym.has_name("malloc"));
        assert!(sym.has_name("__libc_malloc"));
        assert!(sym.has_name("__malloc"));
        assert!(!sym.has_name("free"));
    }

    #[test]
    fn test_versioned_matching() {
        let sym =
            ElfSymbol::public("pthread_create", SymbolKind::Function).with_version("GLIBC_2.34", true);

        assert!(sym.matches_name_and_version("pthread_create", "GLIBC_2.34"));
        // Empty version matches the default version.
        assert!(sym.matches_name_and_version("pthread_create", ""));
        assert!(!sym.matches_name_and_version("pthread_create", "GLIBC_2.2.5"));
    }

    #[test]
    fn test_non_default_version_not_matched_by_empty() {
        let sym =
            ElfSymbol::public("pthread_create", SymbolKind::Function).with_version("GLIBC_2.2.5", false);
        assert!(!sym.matches_name_and_version("pthread_create", ""));
    }

    #[test]
    fn test_id_string() {
        let sym = ElfSymbol::public("f", SymbolKind::Function).with_version("V1", true);
        assert_eq!(sym.id_string(), "f@V1");
    }
}
