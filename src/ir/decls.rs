//! Function and variable declarations.
//!
//! Declarations are the entry points of the ABI surface: an exported function or
//! variable, its linkage name, its scope and the ELF symbol it is bound to. A
//! declaration references its type by [`TypeId`] handle; types are owned by the
//! environment, never by declarations.

use std::sync::Arc;

use crate::ir::{ElfSymbolRc, TypeId};

/// A function declaration.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    /// Source-level name
    pub name: String,
    /// Mangled linkage name; equals `name` for C
    pub linkage_name: String,
    /// Enclosing scope (namespace/class path), empty for global scope
    pub scope: String,
    /// Handle to the function's [`crate::ir::TypeKind::FunctionType`]
    pub type_id: TypeId,
    /// The ELF symbol this declaration is bound to, when it has one
    pub symbol: Option<ElfSymbolRc>,
}

/// A variable declaration.
#[derive(Debug, Clone)]
pub struct VariableDecl {
    /// Source-level name
    pub name: String,
    /// Mangled linkage name; equals `name` for C
    pub linkage_name: String,
    /// Enclosing scope (namespace/class path), empty for global scope
    pub scope: String,
    /// Handle to the variable's type
    pub type_id: TypeId,
    /// The ELF symbol this declaration is bound to, when it has one
    pub symbol: Option<ElfSymbolRc>,
}

/// Reference-counted shared pointer to a [`FunctionDecl`].
pub type FunctionDeclRc = Arc<FunctionDecl>;
/// Reference-counted shared pointer to a [`VariableDecl`].
pub type VariableDeclRc = Arc<VariableDecl>;

impl FunctionDecl {
    /// A global-scope function with `linkage_name == name` and no symbol.
    #[must_use]
    pub fn new(name: &str, type_id: TypeId) -> Self {
        FunctionDecl {
            name: name.to_string(),
            linkage_name: name.to_string(),
            scope: String::new(),
            type_id,
            symbol: None,
        }
    }

    /// Bind an ELF symbol to the declaration.
    #[must_use]
    pub fn with_symbol(mut self, symbol: ElfSymbolRc) -> Self {
        self.symbol = Some(symbol);
        self
    }

    /// The scope-qualified name used as the stable diff key.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.scope, self.name)
        }
    }

    /// Whether this declaration is bound to a public, defined ELF symbol.
    #[must_use]
    pub fn has_public_symbol(&self) -> bool {
        self.symbol
            .as_ref()
            .is_some_and(|s| s.is_public && s.is_defined)
    }
}

impl VariableDecl {
    /// A global-scope variable with `linkage_name == name` and no symbol.
    #[must_use]
    pub fn new(name: &str, type_id: TypeId) -> Self {
        VariableDecl {
            name: name.to_string(),
            linkage_name: name.to_string(),
            scope: String::new(),
            type_id,
            symbol: None,
        }
    }

    /// Bind an ELF symbol to the declaration.
    #[must_use]
    pub fn with_symbol(mut self, symbol: ElfSymbolRc) -> Self {
        self.symbol = Some(symbol);
        self
    }

    /// The scope-qualified name used as the stable diff key.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.scope, self.name)
        }
    }

    /// Whether this declaration is bound to a public, defined ELF symbol.
    #[must_use]
    pub fn has_public_symbol(&self) -> bool {
        self.symbol
            .as_ref()
            .is_some_and(|s| s.is_public && s.is_defined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ElfSymbol, SymbolKind};

    #[test]
    fn test_qualified_name() {
        let mut decl = FunctionDecl::new("run", TypeId::new(0));
        assert_eq!(decl.qualified_name(), "run");
        decl.scope = "ns::Widget".to_string();
        assert_eq!(decl.qualified_name(), "ns::Widget::run");
    }

    #[test]
    fn test_public_symbol_detection() {
        let decl = FunctionDecl::new("f", TypeId::new(0));
        assert!(!decl.has_public_symbol());

        let decl = decl.with_symbol(Arc::new(ElfSymbol::public("f", SymbolKind::Function)));
        assert!(decl.has_public_symbol());
    }
}
