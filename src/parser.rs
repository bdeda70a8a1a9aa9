//! Reads a decompressed GnuCash v2 XML document into flat records.
//!
//! Only the shape of the document is checked here. Linking accounts into a
//! tree and projecting events happen later, in [`Ledger`](crate::Ledger).

use crate::account::{Account, AccountId, AccountType, Commodity};
use crate::amount::Amount;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{LedgerError, Result};
use crate::transaction::{Split, Transaction};
use chrono::NaiveDate;
use log::debug;
use regex::Regex;
use roxmltree::{Document, Node};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;

const GNC: &str = "http://www.gnucash.org/XML/gnc";
const BOOK: &str = "http://www.gnucash.org/XML/book";
const ACT: &str = "http://www.gnucash.org/XML/act";
const TRN: &str = "http://www.gnucash.org/XML/trn";
const SPLIT: &str = "http://www.gnucash.org/XML/split";
const TS: &str = "http://www.gnucash.org/XML/ts";
const CMDTY: &str = "http://www.gnucash.org/XML/cmdty";

/// Flat contents of a `gnc:book`.
#[derive(Debug)]
pub(crate) struct ParsedBook {
    pub book_id: Option<String>,
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
}

/// Parses the whole document.
///
/// Fails if the XML is not well-formed, the root element is not `gnc-v2`,
/// there is no book, or an account/split lacks an identifying field.
/// Unknown elements, unparseable split values and any book after the
/// first are only recorded in `diagnostics`.
pub(crate) fn parse_book(xml: &str, diagnostics: &mut Diagnostics) -> Result<ParsedBook> {
    let doc = Document::parse(xml)
        .map_err(|e| LedgerError::malformed(format!("not well-formed XML: {}", e)))?;
    let root = doc.root_element();
    if root.tag_name().name() != "gnc-v2" {
        return Err(LedgerError::malformed(format!(
            "unexpected root element {}, is this a GnuCash file?",
            qualified(root)
        )));
    }

    let mut books = root.children().filter(|n| is(*n, GNC, "book"));
    let book = books
        .next()
        .ok_or_else(|| LedgerError::malformed("can't find GnuCash book"))?;
    for (position, extra) in books.enumerate() {
        let book = child(extra, BOOK, "id")
            .and_then(non_empty)
            .map(|id| id.trim().to_string())
            .unwrap_or_else(|| format!("#{}", position + 2));
        diagnostics.push(Diagnostic::IgnoredBook { book });
    }

    let mut parsed = ParsedBook {
        book_id: None,
        accounts: Vec::new(),
        transactions: Vec::new(),
    };

    for child in book.children().filter(Node::is_element) {
        if is(child, GNC, "account") {
            parsed.accounts.push(parse_account(child, diagnostics)?);
        } else if is(child, GNC, "transaction") {
            if let Some(tx) = parse_transaction(child, diagnostics)? {
                parsed.transactions.push(tx);
            }
        } else if is(child, BOOK, "id") {
            parsed.book_id = Some(text(child).trim().to_string());
        } else {
            diagnostics.push(Diagnostic::UnknownElement {
                context: "Book",
                tag: qualified(child),
            });
        }
    }

    debug!(
        "Parsed {} accounts and {} transactions",
        parsed.accounts.len(),
        parsed.transactions.len()
    );
    Ok(parsed)
}

fn is(node: Node<'_, '_>, namespace: &str, name: &str) -> bool {
    node.is_element() && node.tag_name().namespace() == Some(namespace) && node.tag_name().name() == name
}

fn in_namespace(node: Node<'_, '_>, namespace: &str) -> bool {
    node.tag_name().namespace() == Some(namespace)
}

/// `prefix:name` as written in the file, for messages.
fn qualified(node: Node<'_, '_>) -> String {
    let name = node.tag_name().name();
    match node.tag_name().namespace().and_then(|ns| node.lookup_prefix(ns)) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, name),
        _ => name.to_string(),
    }
}

fn text<'a>(node: Node<'a, '_>) -> &'a str {
    node.text().unwrap_or("")
}

fn non_empty(node: Node<'_, '_>) -> Option<String> {
    let value = text(node);
    (!value.trim().is_empty()).then(|| value.to_string())
}

fn child<'a, 'input>(node: Node<'a, 'input>, namespace: &str, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is(*n, namespace, name))
}

fn parse_commodity(node: Node<'_, '_>) -> Option<Commodity> {
    let space = child(node, CMDTY, "space").map(text)?;
    let id = child(node, CMDTY, "id").map(text)?;
    Some(Commodity {
        space: space.trim().to_string(),
        id: id.trim().to_string(),
    })
}

/// Flattens `<slot>` key/value pairs; frame slots nest as `outer/inner`.
fn parse_slots(node: Node<'_, '_>) -> BTreeMap<String, String> {
    let mut slots = BTreeMap::new();
    collect_slots(node, "", &mut slots);
    slots
}

fn collect_slots(node: Node<'_, '_>, prefix: &str, slots: &mut BTreeMap<String, String>) {
    for slot in node.children().filter(|n| n.is_element() && n.tag_name().name() == "slot") {
        let key = slot
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == "key")
            .map(text)
            .unwrap_or_default();
        let Some(value) = slot
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == "value")
        else {
            continue;
        };
        let key = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", prefix, key)
        };
        if value.attribute("type") == Some("frame") {
            collect_slots(value, &key, slots);
        } else {
            slots.insert(key, text(value).to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Default)]
struct AccountFields {
    id: Option<String>,
    name: Option<String>,
    account_type: Option<AccountType>,
    description: Option<String>,
    commodity: Option<Commodity>,
    commodity_scu: Option<u32>,
    parent: Option<String>,
    slots: BTreeMap<String, String>,
    extras: BTreeMap<String, String>,
}

type AccountSetter = for<'a, 'input> fn(&mut AccountFields, Node<'a, 'input>);

/// Known `act:` elements and where they go. Anything else lands in `extras`
/// and is reported as an unknown element.
const ACCOUNT_FIELDS: &[(&str, AccountSetter)] = &[
    ("id", set_account_id),
    ("name", set_account_name),
    ("type", set_account_type),
    ("description", set_account_description),
    ("commodity", set_account_commodity),
    ("commodity-scu", set_account_commodity_scu),
    ("parent", set_account_parent),
    ("slots", set_account_slots),
];

fn set_account_id(fields: &mut AccountFields, node: Node<'_, '_>) {
    fields.id = non_empty(node).map(|id| id.trim().to_string());
}

fn set_account_name(fields: &mut AccountFields, node: Node<'_, '_>) {
    fields.name = Some(text(node).to_string());
}

fn set_account_type(fields: &mut AccountFields, node: Node<'_, '_>) {
    fields.account_type = non_empty(node).and_then(|t| AccountType::from_str(&t).ok());
}

fn set_account_description(fields: &mut AccountFields, node: Node<'_, '_>) {
    fields.description = non_empty(node);
}

fn set_account_commodity(fields: &mut AccountFields, node: Node<'_, '_>) {
    fields.commodity = parse_commodity(node);
}

fn set_account_commodity_scu(fields: &mut AccountFields, node: Node<'_, '_>) {
    fields.commodity_scu = text(node).trim().parse().ok();
}

fn set_account_parent(fields: &mut AccountFields, node: Node<'_, '_>) {
    fields.parent = non_empty(node).map(|id| id.trim().to_string());
}

fn set_account_slots(fields: &mut AccountFields, node: Node<'_, '_>) {
    fields.slots = parse_slots(node);
}

fn parse_account(node: Node<'_, '_>, diagnostics: &mut Diagnostics) -> Result<Account> {
    let mut fields = AccountFields::default();

    for element in node.children().filter(Node::is_element) {
        if !in_namespace(element, ACT) {
            diagnostics.push(Diagnostic::UnknownElement {
                context: "Account",
                tag: qualified(element),
            });
            continue;
        }
        let name = element.tag_name().name();
        match ACCOUNT_FIELDS.iter().find(|(tag, _)| *tag == name) {
            Some((_, setter)) => setter(&mut fields, element),
            None => {
                diagnostics.push(Diagnostic::UnknownElement {
                    context: "Account",
                    tag: qualified(element),
                });
                fields.extras.insert(name.to_string(), text(element).to_string());
            }
        }
    }

    let id = fields
        .id
        .ok_or_else(|| LedgerError::malformed("account without act:id"))?;
    let name = fields
        .name
        .ok_or_else(|| LedgerError::malformed(format!("account {} without act:name", id)))?;
    let account_type = fields
        .account_type
        .ok_or_else(|| LedgerError::malformed(format!("account {} without act:type", id)))?;

    let mut account = Account::new(id, name, account_type);
    account.description = fields.description;
    account.commodity = fields.commodity;
    account.commodity_scu = fields.commodity_scu;
    account.parent_id = fields.parent.map(AccountId::from);
    account.slots = fields.slots;
    account.extras = fields.extras;
    Ok(account)
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

fn date_prefix() -> &'static Regex {
    static DATE: OnceLock<Regex> = OnceLock::new();
    DATE.get_or_init(|| Regex::new(r"^\s*(\d{4}-\d{2}-\d{2})").expect("static regex"))
}

/// Extracts the `YYYY-MM-DD` prefix of a `ts:date`, ignoring time and zone.
pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    let captures = date_prefix().captures(text)?;
    NaiveDate::parse_from_str(&captures[1], "%Y-%m-%d").ok()
}

fn timestamp_text<'a>(node: Node<'a, '_>) -> &'a str {
    child(node, TS, "date").map(text).unwrap_or("")
}

fn parse_transaction(node: Node<'_, '_>, diagnostics: &mut Diagnostics) -> Result<Option<Transaction>> {
    let mut id = None;
    let mut description = String::new();
    let mut num = None;
    let mut currency = None;
    let mut slots = BTreeMap::new();
    let mut posted: Option<&str> = None;
    let mut entered = None;
    let mut split_nodes = Vec::new();

    for element in node.children().filter(Node::is_element) {
        if !in_namespace(element, TRN) {
            diagnostics.push(Diagnostic::UnknownElement {
                context: "Transaction",
                tag: qualified(element),
            });
            continue;
        }
        match element.tag_name().name() {
            "id" => id = non_empty(element).map(|id| id.trim().to_string()),
            "description" => description = text(element).to_string(),
            "num" => num = non_empty(element),
            "currency" => currency = parse_commodity(element),
            "date-posted" => posted = Some(timestamp_text(element)),
            "date-entered" => entered = parse_date(timestamp_text(element)),
            "slots" => slots = parse_slots(element),
            "splits" => split_nodes.extend(element.children().filter(|n| is(*n, TRN, "split"))),
            _ => diagnostics.push(Diagnostic::UnknownElement {
                context: "Transaction",
                tag: qualified(element),
            }),
        }
    }

    let id = id.ok_or_else(|| LedgerError::malformed("transaction without trn:id"))?;

    let Some(date_posted) = posted.and_then(parse_date) else {
        diagnostics.push(Diagnostic::InvalidDate {
            transaction: id,
            text: posted.unwrap_or("").to_string(),
        });
        return Ok(None);
    };

    let mut tx = Transaction::new(id, date_posted, description);
    tx.date_entered = entered;
    tx.num = num;
    tx.currency = currency;
    tx.slots = slots;
    for split in split_nodes {
        let split = parse_split(split, &tx.id, diagnostics)?;
        tx.push_split(split);
    }
    Ok(Some(tx))
}

fn parse_split(node: Node<'_, '_>, transaction: &str, diagnostics: &mut Diagnostics) -> Result<Split> {
    let mut id = None;
    let mut account = None;
    let mut value_text = None;
    let mut quantity = None;
    let mut memo = None;
    let mut action = None;
    let mut reconciled_state = None;

    for element in node.children().filter(Node::is_element) {
        if !in_namespace(element, SPLIT) {
            diagnostics.push(Diagnostic::UnknownElement {
                context: "Split",
                tag: qualified(element),
            });
            continue;
        }
        match element.tag_name().name() {
            "id" => id = non_empty(element).map(|id| id.trim().to_string()),
            "account" => account = non_empty(element).map(|id| id.trim().to_string()),
            "value" => value_text = Some(text(element)),
            "quantity" => quantity = Amount::from_str(text(element)).ok(),
            "memo" => memo = non_empty(element),
            "action" => action = non_empty(element),
            "reconciled-state" => reconciled_state = non_empty(element),
            "reconcile-date" | "slots" | "lot" => {}
            _ => diagnostics.push(Diagnostic::UnknownElement {
                context: "Split",
                tag: qualified(element),
            }),
        }
    }

    let id = id.ok_or_else(|| {
        LedgerError::malformed(format!("split without split:id in transaction {}", transaction))
    })?;
    let account = account.ok_or_else(|| {
        LedgerError::malformed(format!("split {} without split:account in transaction {}", id, transaction))
    })?;

    let raw = value_text.unwrap_or("");
    let value = match Amount::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            diagnostics.push(Diagnostic::SplitValueParse {
                transaction: transaction.to_string(),
                split: id.clone(),
                text: raw.to_string(),
                reason: e.to_string(),
            });
            None
        }
    };

    let mut split = Split::new(id, account, value);
    split.quantity = quantity;
    split.memo = memo;
    split.action = action;
    split.reconciled_state = reconciled_state;
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<gnc-v2
     xmlns:gnc="http://www.gnucash.org/XML/gnc"
     xmlns:act="http://www.gnucash.org/XML/act"
     xmlns:book="http://www.gnucash.org/XML/book"
     xmlns:cd="http://www.gnucash.org/XML/cd"
     xmlns:cmdty="http://www.gnucash.org/XML/cmdty"
     xmlns:slot="http://www.gnucash.org/XML/slot"
     xmlns:split="http://www.gnucash.org/XML/split"
     xmlns:trn="http://www.gnucash.org/XML/trn"
     xmlns:ts="http://www.gnucash.org/XML/ts">"#;

    fn book(body: &str) -> String {
        format!(
            "{}\n<gnc:book version=\"2.0.0\">\n<book:id type=\"guid\">b1</book:id>\n{}\n</gnc:book>\n</gnc-v2>",
            HEADER, body
        )
    }

    fn parse(xml: &str) -> (Result<ParsedBook>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let parsed = parse_book(xml, &mut diagnostics);
        (parsed, diagnostics)
    }

    const ACCOUNT: &str = r#"
<gnc:account version="2.0.0">
  <act:name>Groceries</act:name>
  <act:id type="guid">acc1</act:id>
  <act:type>EXPENSE</act:type>
  <act:commodity>
    <cmdty:space>CURRENCY</cmdty:space>
    <cmdty:id>GBP</cmdty:id>
  </act:commodity>
  <act:commodity-scu>100</act:commodity-scu>
  <act:description>Food shopping</act:description>
  <act:slots>
    <slot>
      <slot:key>notes</slot:key>
      <slot:value type="string">weekly</slot:value>
    </slot>
    <slot>
      <slot:key>import</slot:key>
      <slot:value type="frame">
        <slot>
          <slot:key>source</slot:key>
          <slot:value type="string">bank</slot:value>
        </slot>
      </slot:value>
    </slot>
  </act:slots>
  <act:parent type="guid">exp</act:parent>
  <act:lots/>
</gnc:account>"#;

    fn transaction(value: &str) -> String {
        format!(
            r#"
<gnc:transaction version="2.0.0">
  <trn:id type="guid">tx1</trn:id>
  <trn:currency>
    <cmdty:space>CURRENCY</cmdty:space>
    <cmdty:id>GBP</cmdty:id>
  </trn:currency>
  <trn:num>42</trn:num>
  <trn:date-posted>
    <ts:date>2023-01-05 10:59:00 +0000</ts:date>
  </trn:date-posted>
  <trn:date-entered>
    <ts:date>2023-01-06 08:00:00 +0000</ts:date>
  </trn:date-entered>
  <trn:description>Tesco</trn:description>
  <trn:splits>
    <trn:split>
      <split:id type="guid">s1</split:id>
      <split:reconciled-state>n</split:reconciled-state>
      <split:value>{}</split:value>
      <split:quantity>4250/100</split:quantity>
      <split:account type="guid">acc1</split:account>
    </trn:split>
    <trn:split>
      <split:id type="guid">s2</split:id>
      <split:memo>card</split:memo>
      <split:reconciled-state>c</split:reconciled-state>
      <split:value>-4250/100</split:value>
      <split:quantity>-4250/100</split:quantity>
      <split:account type="guid">bank</split:account>
    </trn:split>
  </trn:splits>
</gnc:transaction>"#,
            value
        )
    }

    #[test]
    fn test_account_fields() {
        let (parsed, diagnostics) = parse(&book(ACCOUNT));
        let parsed = parsed.unwrap();
        assert_eq!(parsed.book_id.as_deref(), Some("b1"));

        let account = &parsed.accounts[0];
        assert_eq!(account.id.as_str(), "acc1");
        assert_eq!(account.name, "Groceries");
        assert_eq!(account.account_type, AccountType::Expense);
        assert_eq!(account.description.as_deref(), Some("Food shopping"));
        assert_eq!(account.parent_id, Some(AccountId::from("exp")));
        assert_eq!(account.commodity_scu, Some(100));
        assert_eq!(
            account.commodity,
            Some(Commodity {
                space: "CURRENCY".to_string(),
                id: "GBP".to_string()
            })
        );
        assert_eq!(account.slots.get("notes").map(String::as_str), Some("weekly"));
        assert_eq!(account.slots.get("import/source").map(String::as_str), Some("bank"));
        assert!(account.extras.contains_key("lots"));
        let unknown: Vec<_> = diagnostics.iter().collect();
        assert_eq!(
            unknown,
            vec![&Diagnostic::UnknownElement {
                context: "Account",
                tag: "act:lots".to_string()
            }]
        );
        assert_eq!(diagnostics.warnings().count(), 0);
    }

    #[test]
    fn test_transaction_fields() {
        let (parsed, diagnostics) = parse(&book(&transaction("4250/100")));
        let parsed = parsed.unwrap();
        let tx = &parsed.transactions[0];

        assert_eq!(tx.id, "tx1");
        assert_eq!(tx.description, "Tesco");
        assert_eq!(tx.num.as_deref(), Some("42"));
        assert_eq!(tx.date_posted, NaiveDate::from_ymd_opt(2023, 1, 5).unwrap());
        assert_eq!(tx.date_entered, NaiveDate::from_ymd_opt(2023, 1, 6));
        assert_eq!(tx.splits().len(), 2);

        let s1 = tx.split("s1").unwrap();
        assert_eq!(s1.account.as_str(), "acc1");
        assert_eq!(s1.value, Some(Amount::from_str("42.50").unwrap()));
        assert_eq!(s1.reconciled_state.as_deref(), Some("n"));
        assert_eq!(tx.split("s2").unwrap().memo.as_deref(), Some("card"));
        assert_eq!(tx.imbalance(), Amount::ZERO);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_bad_split_value_is_isolated() {
        let (parsed, diagnostics) = parse(&book(&transaction("forty-two")));
        let parsed = parsed.unwrap();
        let tx = &parsed.transactions[0];

        assert_eq!(tx.split("s1").unwrap().value, None);
        assert!(tx.split("s2").unwrap().value.is_some());
        assert!(diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::SplitValueParse { split, text, .. } if split == "s1" && text == "forty-two"
        )));
    }

    #[test]
    fn test_unknown_book_elements_are_tolerated() {
        let body = format!(
            "<gnc:count-data cd:type=\"account\">1</gnc:count-data>\n<gnc:budget/>\n{}",
            ACCOUNT
        );
        let (parsed, diagnostics) = parse(&book(&body));
        assert_eq!(parsed.unwrap().accounts.len(), 1);

        let tags: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::UnknownElement { context: "Book", tag } => Some(tag.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(tags, vec!["gnc:count-data", "gnc:budget"]);
        assert_eq!(diagnostics.warnings().count(), 0);
    }

    #[test]
    fn test_wrong_root_is_malformed() {
        let (parsed, _) = parse("<gnc-v3><gnc:book xmlns:gnc=\"http://www.gnucash.org/XML/gnc\"/></gnc-v3>");
        assert!(matches!(parsed, Err(LedgerError::MalformedDocument { .. })));
    }

    #[test]
    fn test_missing_book_is_malformed() {
        let (parsed, _) = parse(&format!("{}</gnc-v2>", HEADER));
        match parsed {
            Err(LedgerError::MalformedDocument { reason }) => assert!(reason.contains("book")),
            other => panic!("Expected MalformedDocument, got {:?}", other),
        }
    }

    #[test]
    fn test_not_xml() {
        let (parsed, _) = parse("this is not xml");
        assert!(matches!(parsed, Err(LedgerError::MalformedDocument { .. })));
    }

    #[test]
    fn test_unclosed_element_is_malformed() {
        let (parsed, _) = parse("<gnc-v2><unclosed></gnc-v2>");
        match parsed {
            Err(LedgerError::MalformedDocument { reason }) => assert!(reason.contains("XML")),
            other => panic!("Expected MalformedDocument, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_books_are_reported() {
        let second = "<gnc:book version=\"2.0.0\"><book:id type=\"guid\">b2</book:id></gnc:book>\n\
                      <gnc:book version=\"2.0.0\"/>";
        let xml = book(ACCOUNT).replace("</gnc-v2>", &format!("{}\n</gnc-v2>", second));
        let (parsed, diagnostics) = parse(&xml);

        let parsed = parsed.unwrap();
        assert_eq!(parsed.book_id.as_deref(), Some("b1"));
        assert_eq!(parsed.accounts.len(), 1);
        let ignored: Vec<_> = diagnostics
            .warnings()
            .filter_map(|d| match d {
                Diagnostic::IgnoredBook { book } => Some(book.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ignored, vec!["b2", "#3"]);
    }

    #[test]
    fn test_missing_post_date_drops_transaction() {
        let tx = transaction("1/1").replace("2023-01-05 10:59:00 +0000", "sometime");
        let (parsed, diagnostics) = parse(&book(&tx));
        assert!(parsed.unwrap().transactions.is_empty());
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::InvalidDate { transaction, .. } if transaction == "tx1")));
    }

    #[test]
    fn test_parse_date_ignores_time_and_zone() {
        assert_eq!(
            parse_date("2017-12-02 00:00:00 +0000"),
            NaiveDate::from_ymd_opt(2017, 12, 2)
        );
        assert_eq!(parse_date("2017-12-02T10:00:00Z"), NaiveDate::from_ymd_opt(2017, 12, 2));
        assert_eq!(parse_date("2017-13-02"), None);
        assert_eq!(parse_date("02/12/2017"), None);
    }
}
