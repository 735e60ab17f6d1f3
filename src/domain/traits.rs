use chrono::{DateTime, Utc};
use futures::Stream;

use crate::domain::{Account, BridgeCommand, Error, LedgerEntry};

pub trait CommandStream {
    type CmdStream: Stream<Item = Result<BridgeCommand, Error>> + Send + Unpin + 'static;
    fn stream(&mut self) -> Self::CmdStream;
}

pub trait DeadLetterQueue {
    fn report(&self, error: &Error);
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Account records keyed by the account number of their linked payment
/// source. Reads return owned snapshots; every write bumps `version`.
pub trait AccountStore: Send + Sync {
    /// Inserts or replaces the record. Fails if the account has no
    /// payment source to key it by.
    fn register(&self, account: Account) -> Result<(), Error>;

    fn lookup(&self, account_number: &str) -> Result<Option<Account>, Error>;

    /// Prepends `entry` to the account's history without touching balances.
    fn append(&self, account_number: &str, entry: LedgerEntry) -> Result<(), Error>;

    /// Replaces the record only if its version still equals
    /// `expected_version`, otherwise returns `Error::Conflict`.
    fn compare_and_swap(
        &self,
        account_number: &str,
        expected_version: u64,
        account: Account,
    ) -> Result<(), Error>;

    fn account_numbers(&self) -> Result<Vec<String>, Error>;
}
