//! GnuCash Ledger CLI
//!
//! Loads a GnuCash book and writes a CSV report to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- household.gnucash > accounts.csv
//! cargo run -- household.gnucash --summary 2023 > summary.csv
//! cargo run -- household.gnucash --register "Assets:Current Account" > register.csv
//! ```
//!
//! # Options
//!
//! - `--xml`: also write the decompressed document to `<book>.xml`
//! - `--every-account`: compute running balances for every account
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `info` for more detail (default `warn`)

use gnucash_ledger::{report, source, BalancePolicy, Ledger, LedgerError, LedgerOptions, Result};
use std::env;
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(Debug)]
enum Output {
    Accounts,
    Summary(i32),
    Register(String),
}

#[derive(Debug)]
struct Args {
    input: PathBuf,
    dump_xml: bool,
    every_account: bool,
    output: Output,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<Args> {
    let mut input = None;
    let mut dump_xml = false;
    let mut every_account = false;
    let mut output = Output::Accounts;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--xml" => dump_xml = true,
            "--every-account" => every_account = true,
            "--summary" => {
                let year = args.next().ok_or_else(|| invalid(&arg, "expected a year"))?;
                let year = year.parse().map_err(|_| invalid(&arg, "year must be a number"))?;
                output = Output::Summary(year);
            }
            "--register" => {
                let account = args.next().ok_or_else(|| invalid(&arg, "expected an account name"))?;
                output = Output::Register(account);
            }
            flag if flag.starts_with("--") => return Err(invalid(flag, "unknown option")),
            _ if input.is_none() => input = Some(PathBuf::from(&arg)),
            _ => return Err(invalid(&arg, "only one input file is accepted")),
        }
    }

    Ok(Args {
        input: input.ok_or(LedgerError::MissingArgument)?,
        dump_xml,
        every_account,
        output,
    })
}

fn invalid(argument: &str, message: &str) -> LedgerError {
    LedgerError::InvalidArgument {
        argument: argument.to_string(),
        message: message.to_string(),
    }
}

fn run() -> Result<()> {
    let args = parse_args(env::args().skip(1))?;

    let xml = source::read_book(&args.input, args.dump_xml)?;
    let options = LedgerOptions {
        balance_policy: if args.every_account {
            BalancePolicy::EveryAccount
        } else {
            BalancePolicy::CategoryChildren
        },
    };
    let ledger = Ledger::parse_with(&xml, &options)?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    match &args.output {
        Output::Accounts => report::write_accounts(&ledger, handle)?,
        Output::Summary(year) => report::write_summary(&ledger, *year, handle)?,
        Output::Register(name) => {
            let account = ledger
                .find_account(name)
                .ok_or_else(|| LedgerError::UnknownAccount { name: name.clone() })?;
            report::write_register(&ledger, account, handle)?;
        }
    }

    Ok(())
}
