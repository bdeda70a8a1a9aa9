//! Chart-of-accounts model.
//!
//! Accounts are parsed as flat records that only know their parent's id.
//! The [`tree`](crate::tree) builder later fills in `level` and `children`,
//! and the event projector fills in `events`.

use crate::amount::Amount;
use crate::event::Event;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// GnuCash account GUID.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        AccountId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for AccountId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        AccountId(id.to_string())
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        AccountId(id)
    }
}

/// Account type as written in `act:type`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccountType {
    Root,
    Bank,
    Cash,
    Credit,
    Asset,
    Liability,
    Stock,
    Mutual,
    Currency,
    Income,
    Expense,
    Equity,
    Receivable,
    Payable,
    Trading,
    /// A type this crate does not know, kept verbatim (upper-cased).
    Other(String),
}

impl AccountType {
    pub fn as_str(&self) -> &str {
        match self {
            AccountType::Root => "ROOT",
            AccountType::Bank => "BANK",
            AccountType::Cash => "CASH",
            AccountType::Credit => "CREDIT",
            AccountType::Asset => "ASSET",
            AccountType::Liability => "LIABILITY",
            AccountType::Stock => "STOCK",
            AccountType::Mutual => "MUTUAL",
            AccountType::Currency => "CURRENCY",
            AccountType::Income => "INCOME",
            AccountType::Expense => "EXPENSE",
            AccountType::Equity => "EQUITY",
            AccountType::Receivable => "RECEIVABLE",
            AccountType::Payable => "PAYABLE",
            AccountType::Trading => "TRADING",
            AccountType::Other(name) => name,
        }
    }
}

impl FromStr for AccountType {
    type Err = std::convert::Infallible;

    /// Case-insensitive; never fails.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_uppercase();
        Ok(match name.as_str() {
            "ROOT" => AccountType::Root,
            "BANK" => AccountType::Bank,
            "CASH" => AccountType::Cash,
            "CREDIT" => AccountType::Credit,
            "ASSET" => AccountType::Asset,
            "LIABILITY" => AccountType::Liability,
            "STOCK" => AccountType::Stock,
            "MUTUAL" => AccountType::Mutual,
            "CURRENCY" => AccountType::Currency,
            "INCOME" => AccountType::Income,
            "EXPENSE" => AccountType::Expense,
            "EQUITY" => AccountType::Equity,
            "RECEIVABLE" => AccountType::Receivable,
            "PAYABLE" => AccountType::Payable,
            "TRADING" => AccountType::Trading,
            _ => AccountType::Other(name),
        })
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commodity reference, e.g. `CURRENCY`/`GBP`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commodity {
    pub space: String,
    pub id: String,
}

/// A node in the chart of accounts.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub account_type: AccountType,
    pub description: Option<String>,
    pub commodity: Option<Commodity>,
    pub commodity_scu: Option<u32>,

    /// GUID of the parent. `None` only for the root.
    pub parent_id: Option<AccountId>,

    /// `slot:key` → `slot:value` for string-valued slots.
    pub slots: BTreeMap<String, String>,

    /// Text of `act:` elements not modelled above, keyed by local tag name.
    pub extras: BTreeMap<String, String>,

    pub(crate) level: usize,
    pub(crate) children: Vec<AccountId>,
    pub(crate) events: Vec<Event>,
}

impl Account {
    pub fn new(id: impl Into<AccountId>, name: impl Into<String>, account_type: AccountType) -> Self {
        Account {
            id: id.into(),
            name: name.into(),
            account_type,
            description: None,
            commodity: None,
            commodity_scu: None,
            parent_id: None,
            slots: BTreeMap::new(),
            extras: BTreeMap::new(),
            level: 0,
            children: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Builder-style parent assignment.
    pub fn with_parent(mut self, parent_id: impl Into<AccountId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Depth below the root (root = 0).
    pub fn level(&self) -> usize {
        self.level
    }

    /// Ids of the direct children, in document order.
    pub fn children(&self) -> &[AccountId] {
        &self.children
    }

    /// This account's own events in chronological order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Sum of the values of this account's own events.
    pub fn total(&self) -> Amount {
        self.events.iter().map(|e| e.value).sum()
    }

    /// Running balance after the last event, if balances were computed for
    /// this account.
    pub fn final_balance(&self) -> Option<Amount> {
        self.events.last().and_then(|e| e.balance)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name: {}; id: {}; description: {}; type: {}; level: {}",
            self.name,
            self.id,
            self.description.as_deref().unwrap_or(""),
            self.account_type,
            self.level
        )
    }
}
