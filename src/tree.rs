//! Builds the account hierarchy from flat, parent-referencing records.
//!
//! Accounts live in one arena (`Vec<Account>`) with an id → slot index.
//! Tree edges are account ids resolved through that index, so the arena
//! is the only owner of any account.

use crate::account::{Account, AccountId, AccountType};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{LedgerError, Result};
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Linked accounts with levels assigned.
#[derive(Debug)]
pub(crate) struct Tree {
    pub accounts: Vec<Account>,
    pub index: HashMap<AccountId, usize>,
    pub root: usize,
}

/// Links every account to its parent and assigns levels.
///
/// Fails on duplicate ids, zero or several roots, unknown parents and
/// cycles. Nothing is returned on failure.
pub(crate) fn build(mut accounts: Vec<Account>) -> Result<Tree> {
    let mut index = HashMap::with_capacity(accounts.len());
    for (slot, account) in accounts.iter().enumerate() {
        if index.insert(account.id.clone(), slot).is_some() {
            return Err(LedgerError::DuplicateAccount {
                account: account.id.to_string(),
            });
        }
    }

    let mut root: Option<usize> = None;
    let mut links = Vec::with_capacity(accounts.len());
    for (slot, account) in accounts.iter().enumerate() {
        match &account.parent_id {
            None => {
                if let Some(first) = root {
                    return Err(LedgerError::MultipleRoots {
                        first: accounts[first].id.to_string(),
                        second: account.id.to_string(),
                    });
                }
                root = Some(slot);
            }
            Some(parent_id) => {
                let parent = index
                    .get(parent_id)
                    .ok_or_else(|| LedgerError::DanglingParent {
                        account: account.id.to_string(),
                        parent: parent_id.to_string(),
                    })?;
                links.push((*parent, account.id.clone()));
            }
        }
    }
    let root = root.ok_or(LedgerError::NoRoot)?;

    for (parent, child) in links {
        accounts[parent].children.push(child);
    }

    assign_levels(&mut accounts, &index, root)?;

    Ok(Tree {
        accounts,
        index,
        root,
    })
}

/// Breadth-first from the root: root = 0, child = parent + 1.
///
/// With a single root and every parent resolved, any account the walk
/// does not reach hangs off a cycle.
fn assign_levels(accounts: &mut [Account], index: &HashMap<AccountId, usize>, root: usize) -> Result<()> {
    let mut visited = vec![false; accounts.len()];
    let mut queue = VecDeque::from([(root, 0usize)]);
    visited[root] = true;

    while let Some((slot, level)) = queue.pop_front() {
        accounts[slot].level = level;
        debug!(
            "Setting level for account {} to {} ({} children)",
            accounts[slot].name,
            level,
            accounts[slot].children.len()
        );
        for child in &accounts[slot].children {
            let child = index[child];
            if visited[child] {
                return Err(LedgerError::CyclicHierarchy {
                    account: accounts[child].id.to_string(),
                });
            }
            visited[child] = true;
            queue.push_back((child, level + 1));
        }
    }

    match visited.iter().position(|seen| !seen) {
        Some(unreached) => Err(LedgerError::CyclicHierarchy {
            account: cycle_member(accounts, index, unreached).to_string(),
        }),
        None => Ok(()),
    }
}

/// Follows parent links from `start` until a slot repeats.
fn cycle_member<'a>(accounts: &'a [Account], index: &HashMap<AccountId, usize>, start: usize) -> &'a AccountId {
    let mut seen = HashSet::new();
    let mut slot = start;
    while seen.insert(slot) {
        match accounts[slot].parent_id.as_ref().and_then(|p| index.get(p)) {
            Some(&parent) => slot = parent,
            None => break,
        }
    }
    &accounts[slot].id
}

/// Maps each direct child of the root by its type.
///
/// When two children share a type the later one wins and a
/// [`Diagnostic::DuplicateCategory`] is recorded.
pub(crate) fn categories(tree: &Tree, diagnostics: &mut Diagnostics) -> BTreeMap<AccountType, usize> {
    let mut categories = BTreeMap::new();
    for child in &tree.accounts[tree.root].children {
        let slot = tree.index[child];
        let account = &tree.accounts[slot];
        if let Some(previous) = categories.insert(account.account_type.clone(), slot) {
            diagnostics.push(Diagnostic::DuplicateCategory {
                account_type: account.account_type.to_string(),
                replaced: tree.accounts[previous].id.to_string(),
                by: account.id.to_string(),
            });
        }
    }
    categories
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Account {
        Account::new("root", "Root Account", AccountType::Root)
    }

    fn child(id: &str, parent: &str, account_type: AccountType) -> Account {
        Account::new(id, id, account_type).with_parent(parent)
    }

    #[test]
    fn test_levels_and_children() {
        let tree = build(vec![
            child("salary", "income", AccountType::Income),
            root(),
            child("income", "root", AccountType::Income),
            child("bonus", "salary", AccountType::Income),
        ])
        .unwrap();

        let level = |id: &str| tree.accounts[tree.index[id]].level();
        assert_eq!(tree.accounts[tree.root].id.as_str(), "root");
        assert_eq!(level("root"), 0);
        assert_eq!(level("income"), 1);
        assert_eq!(level("salary"), 2);
        assert_eq!(level("bonus"), 3);
        assert_eq!(
            tree.accounts[tree.index["income"]].children(),
            &[AccountId::from("salary")]
        );
    }

    #[test]
    fn test_no_root() {
        let err = build(vec![child("a", "b", AccountType::Asset), child("b", "a", AccountType::Asset)])
            .unwrap_err();
        assert!(matches!(err, LedgerError::NoRoot));
    }

    #[test]
    fn test_multiple_roots() {
        let err = build(vec![root(), Account::new("other", "Other", AccountType::Root)]).unwrap_err();
        match err {
            LedgerError::MultipleRoots { first, second } => {
                assert_eq!(first, "root");
                assert_eq!(second, "other");
            }
            other => panic!("Expected MultipleRoots, got {:?}", other),
        }
    }

    #[test]
    fn test_dangling_parent() {
        let err = build(vec![root(), child("a", "nowhere", AccountType::Asset)]).unwrap_err();
        match err {
            LedgerError::DanglingParent { account, parent } => {
                assert_eq!(account, "a");
                assert_eq!(parent, "nowhere");
            }
            other => panic!("Expected DanglingParent, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_is_reported_not_looped() {
        let err = build(vec![
            root(),
            child("a", "root", AccountType::Asset),
            child("x", "y", AccountType::Asset),
            child("y", "z", AccountType::Asset),
            child("z", "x", AccountType::Asset),
            child("w", "x", AccountType::Asset),
        ])
        .unwrap_err();
        match err {
            LedgerError::CyclicHierarchy { account } => {
                assert!(["x", "y", "z"].contains(&account.as_str()), "{}", account);
            }
            other => panic!("Expected CyclicHierarchy, got {:?}", other),
        }
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let err = build(vec![root(), child("a", "a", AccountType::Asset)]).unwrap_err();
        assert!(matches!(err, LedgerError::CyclicHierarchy { account } if account == "a"));
    }

    #[test]
    fn test_duplicate_ids() {
        let err = build(vec![root(), child("a", "root", AccountType::Asset), child("a", "root", AccountType::Bank)])
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateAccount { account } if account == "a"));
    }

    #[test]
    fn test_duplicate_category_last_wins_with_warning() {
        let tree = build(vec![
            root(),
            child("exp1", "root", AccountType::Expense),
            child("inc", "root", AccountType::Income),
            child("exp2", "root", AccountType::Expense),
        ])
        .unwrap();
        let mut diagnostics = Diagnostics::new();
        let categories = categories(&tree, &mut diagnostics);

        assert_eq!(categories.len(), 2);
        assert_eq!(tree.accounts[categories[&AccountType::Expense]].id.as_str(), "exp2");
        assert_eq!(diagnostics.warnings().count(), 1);
    }
}
