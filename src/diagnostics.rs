//! Recoverable problems found while loading a book.
//!
//! A [`Diagnostics`] collector travels with the load and ends up on the
//! [`Ledger`](crate::Ledger), so callers can inspect what was skipped
//! without scraping the log. Every entry is also forwarded to `log`.

use log::{info, warn};
use std::fmt;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Expected in real files, e.g. tags this crate does not model.
    Info,
    /// Data was dropped or a heuristic could not be applied.
    Warning,
}

/// A single recoverable problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Element this crate does not model. Tolerated for forward compatibility.
    UnknownElement { context: &'static str, tag: String },

    /// Split whose value could not be parsed. The split is kept without a value.
    SplitValueParse {
        transaction: String,
        split: String,
        text: String,
        reason: String,
    },

    /// No other split in the transaction touches a different account.
    MissingMatchingAccount { transaction: String, split: String },

    /// Split pointing at an account that is not in the book.
    UnknownSplitAccount {
        transaction: String,
        split: String,
        account: String,
    },

    /// Transaction without a usable posting date. The transaction is dropped.
    InvalidDate { transaction: String, text: String },

    /// A `gnc:book` after the first one. Only the first book is loaded.
    IgnoredBook { book: String },

    /// Two direct children of the root share a type; the later one wins.
    DuplicateCategory {
        account_type: String,
        replaced: String,
        by: String,
    },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::UnknownElement { .. } => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownElement { context, tag } => {
                write!(f, "{}: unknown element {}", context, tag)
            }
            Diagnostic::SplitValueParse {
                transaction,
                split,
                text,
                reason,
            } => write!(
                f,
                "Transaction {}: split {} has unparseable value {:?} ({})",
                transaction, split, text, reason
            ),
            Diagnostic::MissingMatchingAccount { transaction, split } => write!(
                f,
                "Transaction {}: no matching account for split {}",
                transaction, split
            ),
            Diagnostic::UnknownSplitAccount {
                transaction,
                split,
                account,
            } => write!(
                f,
                "Transaction {}: split {} references unknown account {}",
                transaction, split, account
            ),
            Diagnostic::InvalidDate { transaction, text } => write!(
                f,
                "Transaction {}: invalid posting date {:?}, transaction dropped",
                transaction, text
            ),
            Diagnostic::IgnoredBook { book } => {
                write!(f, "Book {}: only the first book is loaded, book ignored", book)
            }
            Diagnostic::DuplicateCategory {
                account_type,
                replaced,
                by,
            } => write!(
                f,
                "Category {}: account {} hidden by account {}",
                account_type, replaced, by
            ),
        }
    }
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    /// Records a diagnostic and logs it at its severity.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity() {
            Severity::Info => info!("{}", diagnostic),
            Severity::Warning => warn!("{}", diagnostic),
        }
        self.entries.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity() == Severity::Warning)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_filter_out_info() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::UnknownElement {
            context: "Book",
            tag: "gnc:budget".to_string(),
        });
        diagnostics.push(Diagnostic::MissingMatchingAccount {
            transaction: "t1".to_string(),
            split: "s1".to_string(),
        });

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.warnings().count(), 1);
    }

    #[test]
    fn test_display_names_the_offender() {
        let d = Diagnostic::SplitValueParse {
            transaction: "t1".to_string(),
            split: "s9".to_string(),
            text: "lots".to_string(),
            reason: "invalid amount".to_string(),
        };
        let text = d.to_string();
        assert!(text.contains("t1"));
        assert!(text.contains("s9"));
        assert!(text.contains("\"lots\""));
    }
}
