//! The book: accounts, transactions and the derived event streams.
//!
//! Loading runs strictly in sequence: parse, link the tree, map the
//! categories, project events in date order, then fold running balances.
//! The ledger is read-only afterwards.

use crate::account::{Account, AccountId, AccountType};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::event::{fold_running_balance, project_events, Event};
use crate::parser::parse_book;
use crate::transaction::Transaction;
use crate::tree;
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Which accounts get running balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BalancePolicy {
    /// Direct children of each category (level 2) only. Deeper accounts
    /// are left to explicit roll-ups over [`Ledger::all_events`].
    #[default]
    CategoryChildren,

    /// Every account folds its own events. Still no roll-up across levels.
    EveryAccount,
}

/// Options for [`Ledger::parse_with`].
#[derive(Debug, Clone, Default)]
pub struct LedgerOptions {
    pub balance_policy: BalancePolicy,
}

/// A fully linked GnuCash book.
///
/// # Invariants
///
/// - Exactly one account has no parent and every parent chain ends there
/// - `level(root) == 0` and `level(child) == level(parent) + 1`
/// - Each account's own events are in ascending date order
#[derive(Debug)]
pub struct Ledger {
    book_id: Option<String>,

    /// Arena of all accounts, in document order.
    accounts: Vec<Account>,

    /// Account id → slot in `accounts`.
    index: HashMap<AccountId, usize>,

    root: usize,

    /// Type of each direct child of the root → its slot.
    categories: BTreeMap<AccountType, usize>,

    /// Transactions in document order.
    transactions: Vec<Transaction>,

    diagnostics: Diagnostics,
}

impl Ledger {
    /// Builds a ledger from decompressed XML with default options.
    pub fn parse(xml: &str) -> Result<Self> {
        Self::parse_with(xml, &LedgerOptions::default())
    }

    /// Builds a ledger from decompressed XML.
    ///
    /// Structural problems (bad document, broken hierarchy) fail the whole
    /// load. Data problems are collected in [`Ledger::diagnostics`].
    pub fn parse_with(xml: &str, options: &LedgerOptions) -> Result<Self> {
        let mut diagnostics = Diagnostics::new();
        let parsed = parse_book(xml, &mut diagnostics)?;
        let tree = tree::build(parsed.accounts)?;
        let categories = tree::categories(&tree, &mut diagnostics);

        let mut ledger = Ledger {
            book_id: parsed.book_id,
            accounts: tree.accounts,
            index: tree.index,
            root: tree.root,
            categories,
            transactions: parsed.transactions,
            diagnostics,
        };

        project_events(
            &mut ledger.accounts,
            &ledger.index,
            &ledger.transactions,
            &mut ledger.diagnostics,
        );
        ledger.compute_balances(options.balance_policy);

        info!("{}", ledger);
        Ok(ledger)
    }

    fn compute_balances(&mut self, policy: BalancePolicy) {
        match policy {
            BalancePolicy::CategoryChildren => {
                let mut slots = Vec::new();
                for (account_type, &category) in &self.categories {
                    debug!("Calculating running balances for category {}", account_type);
                    slots.extend(self.accounts[category].children.iter().map(|id| self.index[id]));
                }
                for slot in slots {
                    fold_running_balance(&mut self.accounts[slot].events);
                }
            }
            BalancePolicy::EveryAccount => {
                for account in &mut self.accounts {
                    fold_running_balance(&mut account.events);
                }
            }
        }
    }

    pub fn book_id(&self) -> Option<&str> {
        self.book_id.as_deref()
    }

    pub fn root(&self) -> &Account {
        &self.accounts[self.root]
    }

    /// Looks up an account by GUID.
    pub fn account(&self, id: &str) -> Option<&Account> {
        self.index.get(id).map(|&slot| &self.accounts[slot])
    }

    /// All accounts in document order, root included.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    pub fn parent(&self, account: &Account) -> Option<&Account> {
        account.parent_id.as_ref().and_then(|id| self.account(id.as_str()))
    }

    pub fn children<'a>(&'a self, account: &'a Account) -> impl Iterator<Item = &'a Account> + 'a {
        account
            .children
            .iter()
            .map(move |id| &self.accounts[self.index[id]])
    }

    /// Every account below `account`, depth first, children in document order.
    pub fn descendants<'a>(&'a self, account: &'a Account) -> Vec<&'a Account> {
        let mut out = Vec::new();
        let mut stack: Vec<&Account> = self.children(account).collect();
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut children: Vec<&Account> = self.children(next).collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Category account for a type name such as `"INCOME"` (any case).
    pub fn category(&self, name: &str) -> Option<&Account> {
        let account_type = AccountType::from_str(name).ok()?;
        self.categories
            .get(&account_type)
            .map(|&slot| &self.accounts[slot])
    }

    /// Categories ordered by type.
    pub fn categories(&self) -> impl Iterator<Item = (&AccountType, &Account)> {
        self.categories
            .iter()
            .map(|(account_type, &slot)| (account_type, &self.accounts[slot]))
    }

    /// Colon-separated path below the root, e.g. `Expenses:Groceries`.
    /// Empty for the root itself.
    pub fn full_name(&self, account: &Account) -> String {
        let mut names = Vec::with_capacity(account.level);
        let mut current = account;
        while let Some(parent) = self.parent(current) {
            names.push(current.name.as_str());
            current = parent;
        }
        names.reverse();
        names.join(":")
    }

    /// Resolves a colon-separated path as produced by [`Ledger::full_name`].
    pub fn find_account(&self, path: &str) -> Option<&Account> {
        let mut current = self.root();
        for segment in path.split(':') {
            current = self.children(current).find(|child| child.name == segment)?;
        }
        Some(current)
    }

    /// Transactions in document order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Events of `account` and all its descendants, oldest first.
    ///
    /// Equal dates keep the order in which the events were projected.
    /// Nothing is mutated, so calling again yields the same sequence.
    pub fn all_events<'a>(&'a self, account: &'a Account) -> impl Iterator<Item = &'a Event> + 'a {
        let mut events: Vec<&Event> = account.events.iter().collect();
        for descendant in self.descendants(account) {
            events.extend(descendant.events.iter());
        }
        events.sort_by_key(|e| (e.date, e.sequence));
        events.into_iter()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} accounts. {} transactions.",
            self.accounts.len(),
            self.transactions.len()
        )
    }
}
