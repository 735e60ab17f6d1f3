use std::io::Write;

use serde::Serialize;

use crate::domain::{AccountStore, Error, Money};

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    account: &'a str,
    role: &'static str,
    credit_limit: Money,
    available_credit: Money,
    current_balance: Money,
    points_balance: u64,
    lifetime_points: u64,
    entries: usize,
    pending: usize,
}

/// Writes one CSV row per registered account, ordered by account number.
pub fn write_summary<S, W>(store: &S, out: W) -> Result<(), Error>
where
    S: AccountStore + ?Sized,
    W: Write,
{
    let mut writer = csv::Writer::from_writer(out);
    for number in store.account_numbers()? {
        // a record replaced or removed mid-report is skipped
        let Some(account) = store.lookup(&number)? else {
            continue;
        };
        writer
            .serialize(SummaryRow {
                account: &number,
                role: account.role.as_str(),
                credit_limit: account.credit_limit,
                available_credit: account.available_credit,
                current_balance: account.current_balance,
                points_balance: account.points_balance,
                lifetime_points: account.lifetime_points,
                entries: account.history.len(),
                pending: account.pending_count(),
            })
            .map_err(std::io::Error::from)?;
    }
    writer.flush()?;
    Ok(())
}
