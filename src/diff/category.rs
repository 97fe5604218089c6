//! Diff node categorization bitmasks and process exit codes.
//!
//! Every diff node carries a [`DiffCategory`] bitmask assigned by the filter pass:
//! harmless bits (changes that cannot break the ABI), harmful bits (size/offset
//! and vtable layout changes), and bookkeeping bits (suppressed, redundant,
//! private type). Category bits are monotonic within one traversal: once set they
//! are never cleared, only copied between a node and its canonical diff node.
//!
//! [`DiffExitCode`] is the bit-OR exit status a comparison tool derives from a
//! categorized corpus diff.

use bitflags::bitflags;

bitflags! {
    /// The categories a diff node can fall into.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DiffCategory: u32 {
        /// A member's access specifier changed (harmless for the ABI)
        const ACCESS_CHANGE = 1;
        /// A type changed into a layout-compatible type, e.g. through a typedef
        const COMPATIBLE_TYPE_CHANGE = 1 << 1;
        /// Only the name of a declaration changed
        const HARMLESS_DECL_NAME_CHANGE = 1 << 2;
        /// A non-virtual member function changed
        const NON_VIRT_MEM_FUN_CHANGE = 1 << 3;
        /// A static data member was added, removed or changed
        const STATIC_DATA_MEMBER_CHANGE = 1 << 4;
        /// An enum gained enumerators without changing size
        const HARMLESS_ENUM_CHANGE = 1 << 5;
        /// Only the alias list of an ELF symbol changed
        const HARMLESS_SYMBOL_ALIAS_CHANGE = 1 << 6;
        /// The subjects are canonically different yet structurally equal: a
        /// One-Definition-Rule violation artifact, flagged harmless
        const HARMLESS_ODR_CHANGE = 1 << 7;
        /// The size of a type or the offset of a member changed
        const SIZE_OR_OFFSET_CHANGE = 1 << 8;
        /// The vtable layout changed for at least one individual function
        const VIRTUAL_MEMBER_CHANGE = 1 << 9;
        /// A suppression specification matched this node
        const SUPPRESSED = 1 << 10;
        /// The node concerns a type outside the public-headers whitelist
        const PRIVATE_TYPE = 1 << 11;
        /// The same change is already reported through another diff node of the
        /// same equivalence class
        const REDUNDANT = 1 << 12;
    }
}

impl DiffCategory {
    /// The union of all harmless categories.
    #[must_use]
    pub fn harmless() -> Self {
        DiffCategory::ACCESS_CHANGE
            | DiffCategory::COMPATIBLE_TYPE_CHANGE
            | DiffCategory::HARMLESS_DECL_NAME_CHANGE
            | DiffCategory::NON_VIRT_MEM_FUN_CHANGE
            | DiffCategory::STATIC_DATA_MEMBER_CHANGE
            | DiffCategory::HARMLESS_ENUM_CHANGE
            | DiffCategory::HARMLESS_SYMBOL_ALIAS_CHANGE
            | DiffCategory::HARMLESS_ODR_CHANGE
    }

    /// The union of all harmful categories.
    #[must_use]
    pub fn harmful() -> Self {
        DiffCategory::SIZE_OR_OFFSET_CHANGE | DiffCategory::VIRTUAL_MEMBER_CHANGE
    }

    /// The categories that propagate from children to parents. Suppression,
    /// redundancy and privacy are per-node properties and stay local.
    #[must_use]
    pub(crate) fn inheritable() -> Self {
        DiffCategory::harmless() | DiffCategory::harmful()
    }

    /// Whether the mask contains at least one harmful bit.
    #[must_use]
    pub fn is_harmful(&self) -> bool {
        self.intersects(DiffCategory::harmful())
    }

    /// Whether the mask is non-empty and contains only harmless bits.
    #[must_use]
    pub fn is_only_harmless(&self) -> bool {
        !self.is_empty() && DiffCategory::harmless().contains(*self)
    }
}

bitflags! {
    /// Bitwise-OR exit status of an ABI comparison; the empty mask means "OK,
    /// no change".
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DiffExitCode: u32 {
        /// An unspecified error occurred
        const ERROR = 1;
        /// The tool was used incorrectly
        const USAGE_ERROR = 1 << 1;
        /// The compared ABIs differ
        const ABI_CHANGE = 1 << 2;
        /// The compared ABIs differ incompatibly
        const ABI_INCOMPATIBLE_CHANGE = 1 << 3;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harmless_and_harmful_disjoint() {
        assert!((DiffCategory::harmless() & DiffCategory::harmful()).is_empty());
    }

    #[test]
    fn test_only_harmless() {
        let cat = DiffCategory::ACCESS_CHANGE | DiffCategory::HARMLESS_ENUM_CHANGE;
        assert!(cat.is_only_harmless());
        assert!(!(cat | DiffCategory::SIZE_OR_OFFSET_CHANGE).is_only_harmless());
        assert!(!DiffCategory::empty().is_only_harmless());
    }

    #[test]
    fn test_exit_code_combination() {
        let code = DiffExitCode::ABI_CHANGE | DiffExitCode::ABI_INCOMPATIBLE_CHANGE;
        assert_eq!(code.bits(), 4 | 8);
        assert_eq!(DiffExitCode::default().bits(), 0);
    }
}
