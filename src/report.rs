//! CSV renderers over the ledger's query surface.
//!
//! Nothing here changes the ledger. Roll-ups across levels are computed
//! from [`Ledger::all_events`] at render time.

use crate::account::Account;
use crate::amount::Amount;
use crate::error::Result;
use crate::ledger::Ledger;
use chrono::Datelike;
use serde::Serialize;
use std::io::Write;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Serialize)]
struct AccountRow<'a> {
    account: String,
    #[serde(rename = "type")]
    account_type: &'a str,
    level: usize,
    events: usize,
    balance: Option<Amount>,
    total: Amount,
}

/// One row per account below the root, depth first.
///
/// `balance` is the account's own running balance (empty when the balance
/// policy skipped it); `total` rolls up the account and its descendants.
pub fn write_accounts<W: Write>(ledger: &Ledger, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    for account in ledger.descendants(ledger.root()) {
        csv_writer.serialize(AccountRow {
            account: ledger.full_name(account),
            account_type: account.account_type.as_str(),
            level: account.level(),
            events: account.events().len(),
            balance: account.final_balance(),
            total: ledger.all_events(account).map(|e| e.value).sum(),
        })?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Category × month matrix for `year`.
///
/// One row per direct child of each category; each cell sums that child's
/// events and its descendants' events for the month.
pub fn write_summary<W: Write>(ledger: &Ledger, year: i32, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["category", "account"];
    header.extend(MONTHS);
    header.push("total");
    csv_writer.write_record(&header)?;

    for (account_type, category) in ledger.categories() {
        for child in ledger.children(category) {
            let mut months = [Amount::ZERO; 12];
            for event in ledger.all_events(child).filter(|e| e.date.year() == year) {
                months[event.date.month0() as usize] += event.value;
            }
            let total: Amount = months.iter().sum();

            let mut record = vec![account_type.to_string(), child.name.clone()];
            record.extend(months.iter().map(|m| m.to_fixed(2)));
            record.push(total.to_fixed(2));
            csv_writer.write_record(&record)?;
        }
    }

    csv_writer.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RegisterRow {
    date: String,
    description: String,
    category: String,
    debit: Option<Amount>,
    credit: Option<Amount>,
    balance: Amount,
}

/// Transaction register for `account` and its descendants.
///
/// Positive values go in `Debit`, negative ones in `Credit` as absolute
/// values. `Category` is the matching account's full name. `Balance` is the
/// cumulative sum of the merged stream.
pub fn write_register<W: Write>(ledger: &Ledger, account: &Account, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut balance = Amount::ZERO;

    for event in ledger.all_events(account) {
        balance += event.value;
        let category = event
            .matching_account
            .as_ref()
            .and_then(|id| ledger.account(id.as_str()))
            .map(|matching| ledger.full_name(matching))
            .unwrap_or_default();
        let (debit, credit) = if event.is_debit() {
            (Some(event.value), None)
        } else {
            (None, Some(event.value.abs()))
        };

        csv_writer.serialize(RegisterRow {
            date: event.date.format("%Y-%m-%d").to_string(),
            description: event.description.clone(),
            category,
            debit,
            credit,
            balance,
        })?;
    }

    csv_writer.flush()?;
    Ok(())
}
