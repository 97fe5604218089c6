use thiserror::Error;

use crate::ir::TypeId;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers the error conditions that can occur while building ABI corpora,
/// canonicalizing type graphs and computing diffs. Each variant provides specific context
/// about the failure mode to enable appropriate error handling.
///
/// Note that *programming* errors (an unhandled type-kind combination inside the diff
/// engine, a violated canonicalization invariant) are deliberately **not** represented
/// here. Those are bugs in this library, not conditions a caller can recover from, and
/// they abort with a panic that names the call site instead.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - Corrupted or inconsistent input IR
/// - [`Error::NoSymbols`] - A corpus without any ELF symbol table
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// ## Type System Errors
/// - [`Error::TypeNotFound`] - A type handle that does not resolve in its environment
///
/// ## Configuration Errors
/// - [`Error::InvalidSuppression`] - A suppression specification that cannot be evaluated
/// - [`Error::RegexError`] - A malformed pattern in a suppression or keep/drop list
///
/// ## Concurrency Errors
/// - [`Error::LockError`] - Thread synchronization failure in the task queue
#[derive(Error, Debug)]
pub enum Error {
    /// The input IR is damaged or internally inconsistent.
    ///
    /// This error indicates that a reader handed over IR that violates a structural
    /// expectation, such as a declaration whose type handle belongs to a different
    /// environment. The error includes the source location where the malformation
    /// was detected for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The corpus carries no ELF symbol table at all.
    ///
    /// A corpus without symbols has no observable ABI. Whether this is fatal is the
    /// caller's decision; corpus construction itself reports it and stops processing
    /// that one corpus.
    #[error("No ELF symbols found in the corpus")]
    NoSymbols,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while resolving suppression files
    /// or public-header directories.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Failed to resolve a type handle in its environment.
    ///
    /// The associated [`TypeId`] identifies the handle that did not resolve. This
    /// occurs when a handle from one environment is presented to another, which
    /// violates the single-environment ownership invariant.
    #[error("Failed to resolve type handle in the environment - {0}")]
    TypeNotFound(TypeId),

    /// A suppression specification cannot be evaluated.
    ///
    /// User configuration errors are reported before any expensive computation
    /// begins; no partially-computed corpus or diff is left behind.
    #[error("Invalid suppression specification: {0}")]
    InvalidSuppression(String),

    /// A malformed regular expression in a suppression specification or a corpus
    /// keep/drop list.
    #[error("{0}")]
    RegexError(#[from] regex::Error),

    /// Failed to lock target.
    ///
    /// This error occurs when thread synchronization fails, typically when a
    /// worker thread panicked while holding the completed-task list.
    #[error("Failed to lock target")]
    LockError,

    /// Generic error for miscellaneous failures.
    ///
    /// Used for errors that don't fit into other categories.
    #[error("{0}")]
    Error(String),
}
