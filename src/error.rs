//! Error types for loading and reporting on a GnuCash book.

use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that abort a load or a report.
///
/// Everything here is fatal. Problems that only affect a single split or
/// event are recorded as [`Diagnostic`](crate::diagnostics::Diagnostic)s
/// instead.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Failed to open, read or decompress a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Not well-formed XML, or XML that is not a GnuCash book
    #[error("Malformed document: {reason}")]
    MalformedDocument { reason: String },

    /// No account without a parent
    #[error("No root account found")]
    NoRoot,

    /// More than one account without a parent
    #[error("Multiple root accounts: {first} and {second}")]
    MultipleRoots { first: String, second: String },

    /// Parent id that does not resolve to an account in the book
    #[error("Account {account} references unknown parent {parent}")]
    DanglingParent { account: String, parent: String },

    /// Parent chain that loops back on itself
    #[error("Account {account} is part of a cycle in the account hierarchy")]
    CyclicHierarchy { account: String },

    /// Two accounts sharing one id
    #[error("Duplicate account id {account}")]
    DuplicateAccount { account: String },

    /// No account with the requested name
    #[error("Unknown account: {name}")]
    UnknownAccount { name: String },

    /// Missing input file argument
    #[error("Missing input file argument. Usage: gnucash-ledger <book.gnucash> [--xml] [--every-account] [--summary <year> | --register <account>]")]
    MissingArgument,

    /// Bad command line argument
    #[error("Invalid argument {argument}: {message}")]
    InvalidArgument { argument: String, message: String },
}

impl LedgerError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        LedgerError::MalformedDocument {
            reason: reason.into(),
        }
    }
}

/// Errors from parsing a monetary amount.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount {0:?}")]
    Invalid(String),

    #[error("zero denominator in amount {0:?}")]
    ZeroDenominator(String),

    #[error("amount {0:?} is out of range")]
    OutOfRange(String),
}
