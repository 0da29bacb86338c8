//! In-process ledger store.
//!
//! Used by tests and as a no-persistence fallback when no database path is
//! configured. All state lives behind a single mutex, which also provides the
//! per-row serialization the `LedgerStore` contract requires.

use std::{
    collections::HashMap,
    sync::Mutex,
};

use crate::{
    domain::{Account, UserId},
    ports::{DebitOutcome, LedgerStore},
    Error, Result,
};

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<i64, Account>,
    pending: HashMap<String, i64>,
    counters: HashMap<String, i64>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked<T>(&self, f: impl FnOnce(&mut MemoryState) -> Result<T>) -> Result<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::Storage("memory store mutex poisoned".to_string()))?;
        f(&mut state)
    }
}

impl LedgerStore for MemoryStore {
    fn create_account_if_missing(&self, account: &Account) -> Result<bool> {
        self.locked(|s| {
            if s.accounts.contains_key(&account.user_id.0) {
                return Ok(false);
            }
            s.accounts.insert(account.user_id.0, account.clone());
            Ok(true)
        })
    }

    fn account(&self, user: UserId) -> Result<Option<Account>> {
        self.locked(|s| Ok(s.accounts.get(&user.0).cloned()))
    }

    fn account_by_handle(&self, handle: &str) -> Result<Option<Account>> {
        self.locked(|s| {
            Ok(s.accounts
                .values()
                .find(|a| !a.handle.is_empty() && a.handle == handle)
                .cloned())
        })
    }

    fn accounts(&self) -> Result<Vec<Account>> {
        self.locked(|s| {
            let mut all: Vec<Account> = s.accounts.values().cloned().collect();
            all.sort_by_key(|a| a.user_id.0);
            Ok(all)
        })
    }

    fn count_accounts(&self) -> Result<i64> {
        self.locked(|s| Ok(s.accounts.len() as i64))
    }

    fn add_balance(&self, user: UserId, amount: i64) -> Result<()> {
        self.locked(|s| match s.accounts.get_mut(&user.0) {
            Some(acc) => {
                acc.balance += amount;
                Ok(())
            }
            None => Err(Error::NotFound(user.0)),
        })
    }

    fn debit_if_at_least(&self, user: UserId, cost: i64) -> Result<DebitOutcome> {
        self.locked(|s| match s.accounts.get_mut(&user.0) {
            Some(acc) if acc.balance >= cost => {
                acc.balance -= cost;
                Ok(DebitOutcome::Debited)
            }
            Some(acc) => Ok(DebitOutcome::Insufficient {
                current: acc.balance,
            }),
            None => Err(Error::NotFound(user.0)),
        })
    }

    fn add_pending_grant(&self, handle: &str, amount: i64) -> Result<()> {
        self.locked(|s| {
            *s.pending.entry(handle.to_string()).or_insert(0) += amount;
            Ok(())
        })
    }

    fn take_pending_grant(&self, handle: &str) -> Result<Option<i64>> {
        self.locked(|s| Ok(s.pending.remove(handle)))
    }

    fn increment_counter(&self, key: &str, by: i64) -> Result<()> {
        self.locked(|s| {
            *s.counters.entry(key.to_string()).or_insert(0) += by;
            Ok(())
        })
    }

    fn counter(&self, key: &str) -> Result<i64> {
        self.locked(|s| Ok(s.counters.get(key).copied().unwrap_or(0)))
    }
}
