//! Transactions and their splits.

use crate::account::{AccountId, Commodity};
use crate::amount::Amount;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

/// One leg of a transaction.
#[derive(Debug, Clone)]
pub struct Split {
    pub id: String,

    /// Account this leg posts to.
    pub account: AccountId,

    /// Value in the transaction currency. `None` when the source text could
    /// not be parsed; such a split contributes nothing to any balance.
    pub value: Option<Amount>,

    /// Quantity in the account's commodity, when present and parseable.
    pub quantity: Option<Amount>,

    pub memo: Option<String>,
    pub action: Option<String>,

    /// `n`, `c`, `y`, `f` or `v` as written by GnuCash.
    pub reconciled_state: Option<String>,
}

impl Split {
    pub fn new(id: impl Into<String>, account: impl Into<AccountId>, value: Option<Amount>) -> Self {
        Split {
            id: id.into(),
            account: account.into(),
            value,
            quantity: None,
            memo: None,
            action: None,
            reconciled_state: None,
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(
                f,
                "Split ID {}. Account ID {}. Amount {}",
                self.id, self.account, value
            ),
            None => write!(f, "Split ID {}. Account ID {}. Amount ?", self.id, self.account),
        }
    }
}

/// A dated posting made of splits.
///
/// Splits ideally sum to zero. That is not checked.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: String,
    pub date_posted: NaiveDate,
    pub date_entered: Option<NaiveDate>,
    pub description: String,
    pub num: Option<String>,
    pub currency: Option<Commodity>,
    pub slots: BTreeMap<String, String>,
    splits: Vec<Split>,
}

impl Transaction {
    pub fn new(id: impl Into<String>, date_posted: NaiveDate, description: impl Into<String>) -> Self {
        Transaction {
            id: id.into(),
            date_posted,
            date_entered: None,
            description: description.into(),
            num: None,
            currency: None,
            slots: BTreeMap::new(),
            splits: Vec::new(),
        }
    }

    /// Builder-style split append, used while parsing and in tests.
    pub fn with_split(mut self, split: Split) -> Self {
        self.splits.push(split);
        self
    }

    pub(crate) fn push_split(&mut self, split: Split) {
        self.splits.push(split);
    }

    /// Splits in document order.
    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    /// Looks up a split by id.
    pub fn split(&self, id: &str) -> Option<&Split> {
        self.splits.iter().find(|s| s.id == id)
    }

    /// Sum of all parseable split values. Zero for a balanced transaction.
    pub fn imbalance(&self) -> Amount {
        self.splits.iter().filter_map(|s| s.value).sum()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id: {}; description: {}; dateposted: {}; num: {}",
            self.id,
            self.description,
            self.date_posted,
            self.num.as_deref().unwrap_or("")
        )
    }
}
