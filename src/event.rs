//! Per-account events and running balances.
//!
//! An [`Event`] is a split seen from its owning account: the transaction's
//! date and description, the split's value, the account on the other side
//! and, once balances are computed, the running balance after it.

use crate::account::{Account, AccountId};
use crate::amount::Amount;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::transaction::{Split, Transaction};
use chrono::NaiveDate;
use log::debug;
use std::collections::HashMap;
use std::fmt;

/// A split projected into its owning account's timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub date: NaiveDate,
    pub description: String,
    pub value: Amount,

    /// Account that owns this event.
    pub account: AccountId,

    /// First other split's account that differs from `account`.
    ///
    /// For transactions with more than two legs this is only one of several
    /// counterparts; check `match_candidates` before relying on it.
    pub matching_account: Option<AccountId>,

    /// Number of other splits whose account differs from `account`.
    pub match_candidates: usize,

    pub transaction_id: String,
    pub split_id: String,

    /// Position in the global projection order. Breaks date ties when
    /// events of several accounts are merged.
    pub sequence: usize,

    /// Running balance after this event. `None` when the balance policy
    /// does not cover the owning account.
    pub balance: Option<Amount>,
}

impl Event {
    fn from_split(tx: &Transaction, split: &Split, value: Amount, sequence: usize) -> Self {
        let (matching_account, match_candidates) = matching_account(tx, split);
        Event {
            date: tx.date_posted,
            description: tx.description.clone(),
            value,
            account: split.account.clone(),
            matching_account,
            match_candidates,
            transaction_id: tx.id.clone(),
            split_id: split.id.clone(),
            sequence,
            balance: None,
        }
    }

    /// Positive (or zero) values are debits.
    pub fn is_debit(&self) -> bool {
        !self.value.is_negative()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self.date.format("%d/%m/%Y");
        if self.value.is_negative() {
            write!(f, "{}: {:60} {:>12}            ", date, self.description, self.value.to_fixed(2))
        } else {
            write!(f, "{}: {:60}             {:>12}", date, self.description, self.value.to_fixed(2))
        }
    }
}

/// Picks the first other split on a different account, and counts how many
/// such splits exist.
fn matching_account(tx: &Transaction, split: &Split) -> (Option<AccountId>, usize) {
    let mut candidates = tx
        .splits()
        .iter()
        .filter(|other| other.account != split.account);
    match candidates.next() {
        Some(first) => (Some(first.account.clone()), 1 + candidates.count()),
        None => (None, 0),
    }
}

/// Appends one event per valued split to its owning account.
///
/// Transactions are visited in ascending posting date; equal dates keep
/// their document order. Splits keep their order within a transaction.
pub(crate) fn project_events(
    accounts: &mut [Account],
    index: &HashMap<AccountId, usize>,
    transactions: &[Transaction],
    diagnostics: &mut Diagnostics,
) {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|tx| tx.date_posted);

    let mut sequence = 0;
    for tx in ordered {
        for split in tx.splits() {
            let Some(value) = split.value else {
                debug!("Transaction {}: split {} has no value, no event", tx.id, split.id);
                continue;
            };

            let Some(&slot) = index.get(&split.account) else {
                diagnostics.push(Diagnostic::UnknownSplitAccount {
                    transaction: tx.id.clone(),
                    split: split.id.clone(),
                    account: split.account.to_string(),
                });
                continue;
            };

            let event = Event::from_split(tx, split, value, sequence);
            if event.matching_account.is_none() {
                diagnostics.push(Diagnostic::MissingMatchingAccount {
                    transaction: tx.id.clone(),
                    split: split.id.clone(),
                });
            }
            accounts[slot].events.push(event);
            sequence += 1;
        }
    }
}

/// Assigns `balance[i] = balance[i - 1] + value[i]`, starting from zero.
pub(crate) fn fold_running_balance(events: &mut [Event]) {
    let mut balance = Amount::ZERO;
    for event in events {
        balance += event.value;
        event.balance = Some(balance);
    }
}
