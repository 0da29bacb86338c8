//! SQLite adapter for the ledger store port.
//!
//! Schema matches the source bot's database (`users`, `stats`,
//! `pending_credits`), so an existing `groupbot.db` keeps working. The whole
//! connection sits behind one mutex; combined with conditional UPDATEs that
//! gives every `LedgerStore` primitive the per-row atomicity the contract
//! asks for.

use std::{path::Path, sync::Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use gib_core::{
    domain::{Account, UserId},
    ports::{DebitOutcome, LedgerStore},
    Error, Result,
};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path).map_err(storage_err)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(storage_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                username TEXT,
                first_name TEXT,
                credits INTEGER,
                created_at INTEGER
            );
            CREATE TABLE IF NOT EXISTS stats (
                key TEXT PRIMARY KEY,
                value INTEGER
            );
            CREATE TABLE IF NOT EXISTS pending_credits (
                username TEXT PRIMARY KEY,
                credits INTEGER DEFAULT 0
            );
            INSERT OR IGNORE INTO stats(key, value) VALUES ('total_searches', 0);",
        )
        .map_err(storage_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn locked<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::Storage("sqlite connection mutex poisoned".to_string()))?;
        f(&conn).map_err(storage_err)
    }
}

fn storage_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        user_id: UserId(row.get(0)?),
        handle: row.get(1)?,
        display_name: row.get(2)?,
        balance: row.get(3)?,
        created_at: row.get(4)?,
    })
}

const ACCOUNT_COLS: &str = "user_id, username, first_name, credits, created_at";

impl LedgerStore for SqliteStore {
    fn create_account_if_missing(&self, account: &Account) -> Result<bool> {
        self.locked(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO users(user_id, username, first_name, credits, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    account.user_id.0,
                    account.handle,
                    account.display_name,
                    account.balance,
                    account.created_at
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    fn account(&self, user: UserId) -> Result<Option<Account>> {
        self.locked(|conn| {
            conn.query_row(
                &format!("SELECT {ACCOUNT_COLS} FROM users WHERE user_id = ?1"),
                params![user.0],
                row_to_account,
            )
            .optional()
        })
    }

    fn account_by_handle(&self, handle: &str) -> Result<Option<Account>> {
        self.locked(|conn| {
            conn.query_row(
                &format!("SELECT {ACCOUNT_COLS} FROM users WHERE username = ?1 AND username != ''"),
                params![handle],
                row_to_account,
            )
            .optional()
        })
    }

    fn accounts(&self) -> Result<Vec<Account>> {
        self.locked(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {ACCOUNT_COLS} FROM users ORDER BY user_id"))?;
            let rows = stmt.query_map([], row_to_account)?;
            rows.collect()
        })
    }

    fn count_accounts(&self) -> Result<i64> {
        self.locked(|conn| conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0)))
    }

    fn add_balance(&self, user: UserId, amount: i64) -> Result<()> {
        let updated = self.locked(|conn| {
            conn.execute(
                "UPDATE users SET credits = credits + ?1 WHERE user_id = ?2",
                params![amount, user.0],
            )
        })?;
        if updated == 0 {
            return Err(Error::NotFound(user.0));
        }
        Ok(())
    }

    fn debit_if_at_least(&self, user: UserId, cost: i64) -> Result<DebitOutcome> {
        // Check-and-decrement in one statement; the WHERE clause is what
        // keeps two racing debits from both passing.
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::Storage("sqlite connection mutex poisoned".to_string()))?;
        let updated = conn
            .execute(
                "UPDATE users SET credits = credits - ?1
                 WHERE user_id = ?2 AND credits >= ?1",
                params![cost, user.0],
            )
            .map_err(storage_err)?;
        if updated == 1 {
            return Ok(DebitOutcome::Debited);
        }
        let current: Option<i64> = conn
            .query_row(
                "SELECT credits FROM users WHERE user_id = ?1",
                params![user.0],
                |r| r.get(0),
            )
            .optional()
            .map_err(storage_err)?;
        match current {
            Some(current) => Ok(DebitOutcome::Insufficient { current }),
            None => Err(Error::NotFound(user.0)),
        }
    }

    fn add_pending_grant(&self, handle: &str, amount: i64) -> Result<()> {
        self.locked(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO pending_credits(username, credits) VALUES (?1, 0)",
                params![handle],
            )?;
            conn.execute(
                "UPDATE pending_credits SET credits = credits + ?1 WHERE username = ?2",
                params![amount, handle],
            )?;
            Ok(())
        })
    }

    fn take_pending_grant(&self, handle: &str) -> Result<Option<i64>> {
        self.locked(|conn| {
            let amount: Option<i64> = conn
                .query_row(
                    "SELECT credits FROM pending_credits WHERE username = ?1",
                    params![handle],
                    |r| r.get(0),
                )
                .optional()?;
            if amount.is_some() {
                conn.execute(
                    "DELETE FROM pending_credits WHERE username = ?1",
                    params![handle],
                )?;
            }
            Ok(amount)
        })
    }

    fn increment_counter(&self, key: &str, by: i64) -> Result<()> {
        self.locked(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO stats(key, value) VALUES (?1, 0)",
                params![key],
            )?;
            conn.execute(
                "UPDATE stats SET value = value + ?1 WHERE key = ?2",
                params![by, key],
            )?;
            Ok(())
        })
    }

    fn counter(&self, key: &str) -> Result<i64> {
        self.locked(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM stats WHERE key = ?1",
                    params![key],
                    |r| r.get(0),
                )
                .optional()?
                .unwrap_or(0))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gib_core::ledger::CreditLedger;
    use std::sync::Arc;

    fn account(id: i64, handle: &str, balance: i64) -> Account {
        Account {
            user_id: UserId(id),
            handle: handle.to_string(),
            display_name: format!("user{id}"),
            balance,
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn create_is_insert_or_ignore() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.create_account_if_missing(&account(1, "a", 10)).unwrap());
        assert!(!store.create_account_if_missing(&account(1, "a", 99)).unwrap());
        assert_eq!(store.account(UserId(1)).unwrap().unwrap().balance, 10);
        assert_eq!(store.count_accounts().unwrap(), 1);
    }

    #[test]
    fn conditional_debit_is_atomic_at_the_statement() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_account_if_missing(&account(1, "a", 10)).unwrap();

        assert_eq!(
            store.debit_if_at_least(UserId(1), 7).unwrap(),
            DebitOutcome::Debited
        );
        assert_eq!(
            store.debit_if_at_least(UserId(1), 7).unwrap(),
            DebitOutcome::Insufficient { current: 3 }
        );
        assert!(matches!(
            store.debit_if_at_least(UserId(2), 1),
            Err(Error::NotFound(2))
        ));
    }

    #[test]
    fn pending_grants_accumulate_and_are_taken_once() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_pending_grant("alice", 3).unwrap();
        store.add_pending_grant("alice", 4).unwrap();
        assert_eq!(store.take_pending_grant("alice").unwrap(), Some(7));
        assert_eq!(store.take_pending_grant("alice").unwrap(), None);
    }

    #[test]
    fn counters_start_at_zero_and_accumulate() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.counter("total_searches").unwrap(), 0);
        store.increment_counter("total_searches", 1).unwrap();
        store.increment_counter("total_searches", 2).unwrap();
        assert_eq!(store.counter("total_searches").unwrap(), 3);
    }

    #[test]
    fn lookup_by_handle_skips_empty_handles() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_account_if_missing(&account(1, "", 10)).unwrap();
        store.create_account_if_missing(&account(2, "bob", 10)).unwrap();
        assert!(store.account_by_handle("").unwrap().is_none());
        assert_eq!(
            store.account_by_handle("bob").unwrap().unwrap().user_id,
            UserId(2)
        );
    }

    // The ledger over sqlite behaves like the ledger over memory.
    #[test]
    fn ledger_pending_merge_over_sqlite() {
        let ledger = CreditLedger::new(Arc::new(SqliteStore::open_in_memory().unwrap()), 10);
        ledger.grant_pending("@carol", 7).unwrap();
        let acc = ledger.ensure_account(UserId(5), Some("carol"), "Carol").unwrap();
        assert_eq!(acc.balance, 17);
        let again = ledger.ensure_account(UserId(5), Some("carol"), "Carol").unwrap();
        assert_eq!(again.balance, 17);
    }
}
