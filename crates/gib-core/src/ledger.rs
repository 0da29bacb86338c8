//! Credit ledger: per-user balances, pending grants, usage counters.
//!
//! All balance mutations go through this component. Atomicity lives in the
//! `LedgerStore` primitives; the ledger composes them and enforces the
//! product rules (default starting credits, pending-grant merge at account
//! creation, debit-then-refund on failed searches).
//!
//! Known gap, kept on purpose: a refund is not transactional with the debit
//! it reverses. A crash between debit and refund leaves the balance
//! transiently low. The source system has the same at-least-once weakness;
//! we document it instead of inventing semantics it never promised.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    domain::{Account, UserId},
    ports::{DebitOutcome, LedgerStore},
    Error, Result,
};

pub const TOTAL_SEARCHES: &str = "total_searches";

pub struct CreditLedger {
    store: Arc<dyn LedgerStore>,
    default_credits: i64,
}

impl CreditLedger {
    pub fn new(store: Arc<dyn LedgerStore>, default_credits: i64) -> Self {
        Self {
            store,
            default_credits,
        }
    }

    /// Create the account with the default starting balance if absent;
    /// return the existing account unchanged otherwise.
    ///
    /// On first creation only, a pending grant for the supplied handle is
    /// merged into the balance and deleted.
    pub fn ensure_account(
        &self,
        user: UserId,
        handle: Option<&str>,
        display_name: &str,
    ) -> Result<Account> {
        let handle = handle.unwrap_or("").trim_start_matches('@').to_string();
        let fresh = Account {
            user_id: user,
            handle: handle.clone(),
            display_name: display_name.to_string(),
            balance: self.default_credits,
            created_at: Utc::now().timestamp(),
        };

        let created = self.store.create_account_if_missing(&fresh)?;
        if created && !handle.is_empty() {
            if let Some(amount) = self.store.take_pending_grant(&handle)? {
                self.store.add_balance(user, amount)?;
            }
        }

        self.store
            .account(user)?
            .ok_or(Error::NotFound(user.0))
    }

    /// Unconditionally add credits to an existing account.
    pub fn grant(&self, user: UserId, amount: i64) -> Result<()> {
        check_amount(amount)?;
        self.store.add_balance(user, amount)
    }

    /// Add credits for a handle that has no account yet. Applied exactly
    /// once, when an account is first created for that handle.
    pub fn grant_pending(&self, handle: &str, amount: i64) -> Result<()> {
        check_amount(amount)?;
        let handle = handle.trim_start_matches('@');
        if handle.is_empty() {
            return Err(Error::EmptyInput);
        }
        self.store.add_pending_grant(handle, amount)
    }

    /// Atomically debit `cost` if the balance covers it, bumping the search
    /// counter. Two concurrent debits for the same user never both succeed
    /// past the balance; the store serializes them.
    ///
    /// The returned guard refunds the debit when dropped, unless
    /// [`DebitGuard::disarm`] was called. Abandoning a request mid-pipeline
    /// therefore takes the refund path automatically.
    pub fn try_debit(&self, user: UserId, cost: i64) -> Result<DebitGuard<'_>> {
        check_amount(cost)?;
        match self.store.debit_if_at_least(user, cost)? {
            DebitOutcome::Debited => {
                self.store.increment_counter(TOTAL_SEARCHES, 1)?;
                Ok(DebitGuard {
                    ledger: self,
                    user,
                    amount: cost,
                    armed: true,
                })
            }
            DebitOutcome::Insufficient { current } => {
                Err(Error::InsufficientBalance { current })
            }
        }
    }

    /// Reverse a previous debit.
    pub fn refund(&self, user: UserId, amount: i64) -> Result<()> {
        check_amount(amount)?;
        self.store.add_balance(user, amount)
    }

    pub fn balance(&self, user: UserId) -> Result<i64> {
        self.store
            .account(user)?
            .map(|a| a.balance)
            .ok_or(Error::NotFound(user.0))
    }

    pub fn account(&self, user: UserId) -> Result<Option<Account>> {
        self.store.account(user)
    }

    pub fn account_by_handle(&self, handle: &str) -> Result<Option<Account>> {
        self.store.account_by_handle(handle.trim_start_matches('@'))
    }

    pub fn accounts(&self) -> Result<Vec<Account>> {
        self.store.accounts()
    }

    pub fn total_users(&self) -> Result<i64> {
        self.store.count_accounts()
    }

    pub fn total_searches(&self) -> Result<i64> {
        self.store.counter(TOTAL_SEARCHES)
    }
}

fn check_amount(amount: i64) -> Result<()> {
    if amount < 0 {
        return Err(Error::External(format!("negative amount: {amount}")));
    }
    Ok(())
}

/// Receipt for a successful debit. Refunds on drop unless disarmed.
#[must_use = "dropping the guard refunds the debit"]
pub struct DebitGuard<'a> {
    ledger: &'a CreditLedger,
    user: UserId,
    amount: i64,
    armed: bool,
}

impl DebitGuard<'_> {
    /// Keep the debit: the paid-for operation succeeded.
    pub fn disarm(mut self) {
        self.armed = false;
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }
}

impl Drop for DebitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            // Best-effort; see the module note on the debit/refund gap.
            let _ = self.ledger.refund(self.user, self.amount);
        }
    }
}
