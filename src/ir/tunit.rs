//! Translation units: the per-compilation-unit grouping of declarations.
//!
//! A [`TranslationUnit`] is an ordered sequence of top-level declarations and types
//! for one logical compilation unit. Units are owned by their corpus; their decl
//! lists are append-only so readers can keep wiring the graph while earlier decls
//! are already visible.

use crate::ir::{FunctionDeclRc, TypeId, VariableDeclRc};

/// One top-level entry of a translation unit.
#[derive(Debug, Clone)]
pub enum TopLevelDecl {
    /// A function declaration
    Function(FunctionDeclRc),
    /// A variable declaration
    Variable(VariableDeclRc),
    /// A type declared at file scope
    Type(TypeId),
}

/// One logical compilation unit of a corpus.
#[derive(Debug)]
pub struct TranslationUnit {
    /// Path of the source file this unit was compiled from
    pub path: String,
    /// Source language tag, e.g. `C89`, `C++14`; empty when unknown
    pub language: String,
    /// The top-level declarations, in declaration order
    pub decls: boxcar::Vec<TopLevelDecl>,
}

impl TranslationUnit {
    /// Create an empty unit for the given source path.
    #[must_use]
    pub fn new(path: &str) -> Self {
        TranslationUnit {
            path: path.to_string(),
            language: String::new(),
            decls: boxcar::Vec::new(),
        }
    }

    /// Append a function declaration.
    pub fn add_function(&self, decl: FunctionDeclRc) {
        self.decls.push(TopLevelDecl::Function(decl));
    }

    /// Append a variable declaration.
    pub fn add_variable(&self, decl: VariableDeclRc) {
        self.decls.push(TopLevelDecl::Variable(decl));
    }

    /// Append a file-scope type.
    pub fn add_type(&self, type_id: TypeId) {
        self.decls.push(TopLevelDecl::Type(type_id));
    }

    /// The function declarations of this unit, in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDeclRc> {
        self.decls.iter().filter_map(|(_, decl)| match decl {
            TopLevelDecl::Function(f) => Some(f),
            _ => None,
        })
    }

    /// The variable declarations of this unit, in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = &VariableDeclRc> {
        self.decls.iter().filter_map(|(_, decl)| match decl {
            TopLevelDecl::Variable(v) => Some(v),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FunctionDecl;
    use std::sync::Arc;

    #[test]
    fn test_decl_order_preserved() {
        let unit = TranslationUnit::new("a.c");
        unit.add_function(Arc::new(FunctionDecl::new("f", TypeId::new(0))));
        unit.add_function(Arc::new(FunctionDecl::new("g", TypeId::new(0))));

        let names: Vec<_> = unit.functions().map(|f| f.name.clone()).collect();
        assert_eq!(names, ["f", "g"]);
    }
}
