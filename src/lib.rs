//! # GnuCash Ledger
//!
//! Rebuilds a GnuCash book (compressed XML) into an account tree with
//! chronological, balance-tracked events per account.
//!
//! ## Design Principles
//!
//! - **Exact arithmetic**: split values are rationals converted to `rust_decimal`
//! - **Arena tree**: accounts are owned by the ledger, edges are account ids
//! - **Fail fast on structure**: a broken hierarchy aborts the load
//! - **Isolate bad data**: a bad split or date is dropped and reported as a
//!   [`Diagnostic`], the rest of the book still loads
//! - **Deterministic**: stable date ordering, ties keep document order
//!
//! ## Example
//!
//! ```no_run
//! use gnucash_ledger::{source, Ledger};
//! use std::path::Path;
//!
//! let xml = source::read_book(Path::new("household.gnucash"), false).unwrap();
//! let ledger = Ledger::parse(&xml).unwrap();
//! let income = ledger.category("INCOME").unwrap();
//! for event in ledger.all_events(income) {
//!     println!("{}", event);
//! }
//! ```

pub mod account;
pub mod amount;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod ledger;
mod parser;
pub mod report;
pub mod source;
pub mod transaction;
mod tree;

pub use account::{Account, AccountId, AccountType, Commodity};
pub use amount::Amount;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{AmountError, LedgerError, Result};
pub use event::Event;
pub use ledger::{BalancePolicy, Ledger, LedgerOptions};
pub use transaction::{Split, Transaction};
