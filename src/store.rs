use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard, RwLock};

use crate::domain::{Account, AccountStore, Error, LedgerEntry};

/// Process-local store. The map lock is only taken exclusively to add or
/// replace a record; debits against different accounts share it.
#[derive(Default, Debug)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<String, Mutex<Account>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
        }
    }

    fn with_slot<T>(
        &self,
        account_number: &str,
        f: impl FnOnce(&mut Account) -> Result<T, Error>,
    ) -> Result<Option<T>, Error> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| Error::Store("account map lock poisoned".to_string()))?;
        match accounts.get(account_number) {
            Some(slot) => {
                let mut account = lock_slot(slot, account_number)?;
                f(&mut account).map(Some)
            }
            None => Ok(None),
        }
    }
}

fn lock_slot<'a>(
    slot: &'a Mutex<Account>,
    account_number: &str,
) -> Result<MutexGuard<'a, Account>, Error> {
    slot.lock()
        .map_err(|_| Error::Store(format!("account {} lock poisoned", account_number)))
}

impl AccountStore for InMemoryAccountStore {
    fn register(&self, mut account: Account) -> Result<(), Error> {
        let key = account
            .lookup_key()
            .ok_or(Error::MissingPaymentSource(account.id))?
            .to_string();

        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| Error::Store("account map lock poisoned".to_string()))?;
        match accounts.entry(key) {
            Entry::Vacant(e) => {
                e.insert(Mutex::new(account));
            }
            Entry::Occupied(mut e) => {
                // invalidate swaps prepared against the old record
                let previous = lock_slot(e.get(), e.key())?.version;
                account.version = account.version.max(previous + 1);
                e.insert(Mutex::new(account));
            }
        }
        Ok(())
    }

    fn lookup(&self, account_number: &str) -> Result<Option<Account>, Error> {
        self.with_slot(account_number, |account| Ok(account.clone()))
    }

    fn append(&self, account_number: &str, entry: LedgerEntry) -> Result<(), Error> {
        self.with_slot(account_number, |account| {
            account.history.push_front(entry);
            account.version += 1;
            Ok(())
        })?
        .ok_or_else(|| Error::AccountNotFound(account_number.to_string()))
    }

    fn compare_and_swap(
        &self,
        account_number: &str,
        expected_version: u64,
        mut updated: Account,
    ) -> Result<(), Error> {
        self.with_slot(account_number, |current| {
            if current.version != expected_version {
                return Err(Error::Conflict(account_number.to_string()));
            }
            updated.version = expected_version + 1;
            *current = updated;
            Ok(())
        })?
        .ok_or_else(|| Error::AccountNotFound(account_number.to_string()))
    }

    fn account_numbers(&self) -> Result<Vec<String>, Error> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| Error::Store("account map lock poisoned".to_string()))?;
        let mut numbers: Vec<String> = accounts.keys().cloned().collect();
        numbers.sort();
        Ok(numbers)
    }
}
