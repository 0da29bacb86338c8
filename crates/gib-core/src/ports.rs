use async_trait::async_trait;

use crate::{
    domain::{Account, NormalizedRef, UserId},
    Result,
};

/// A directory service's raw view of a group/channel entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    pub id: i64,
    pub title: Option<String>,
    /// The platform's channel-like marker (supergroups and channels).
    pub channel_like: bool,
    /// One-way broadcast channel.
    pub broadcast: bool,
    /// Participant count embedded on the entity itself, if the directory
    /// included one. The extended profile is preferred when available.
    pub member_count: Option<i64>,
}

impl Entity {
    /// Display title, falling back to a synthetic representation.
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("entity {}", self.id))
    }
}

/// Extended profile for channel-like entities.
#[derive(Clone, Debug, Default)]
pub struct FullProfile {
    pub member_count: Option<i64>,
}

/// Timestamp of a single retrievable message.
#[derive(Clone, Copy, Debug)]
pub struct MessageStamp {
    /// Unix seconds.
    pub date: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Participant {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub is_bot: bool,
}

impl Participant {
    /// Display name: first+last if present, else handle, else `id<N>`.
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return full;
        }
        if let Some(u) = &self.username {
            if !u.is_empty() {
                return u.clone();
            }
        }
        format!("id{}", self.id)
    }
}

/// External directory service the resolver and enrichment pipeline consult.
///
/// Telegram Bot API is the first implementation (`gib-telegram`); an MTProto
/// user client would fit behind the same interface and fill in the methods
/// the Bot API cannot serve (`oldest_message`, `list_participants`).
#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolve a normalized reference to a raw entity.
    async fn lookup(&self, reference: &NormalizedRef) -> Result<Entity>;

    /// Extended profile for a channel-like entity.
    async fn full_profile(&self, entity: &Entity) -> Result<FullProfile>;

    /// The oldest retrievable message in the group, if any.
    async fn oldest_message(&self, entity: &Entity) -> Result<Option<MessageStamp>>;

    /// Administrator-flagged participants, in directory order.
    async fn list_admins(&self, entity: &Entity) -> Result<Vec<Participant>>;

    /// Plain participant listing, used as a degraded fallback when the
    /// admin-filtered query fails.
    async fn list_participants(&self, entity: &Entity, limit: usize) -> Result<Vec<Participant>>;
}

/// Channel-membership gate.
#[async_trait]
pub trait ChatMembership: Send + Sync {
    /// Whether the user is a member (or admin/owner) of the gate channel.
    async fn is_member(&self, channel: &str, user: UserId) -> bool;
}

/// Outcome of an atomic conditional debit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebitOutcome {
    Debited,
    Insufficient { current: i64 },
}

/// Storage port for the credit ledger.
///
/// Each method is an atomic primitive: the store serializes concurrent calls
/// touching the same row (a single mutex in `MemoryStore`, a mutexed
/// connection with conditional UPDATEs in the sqlite adapter). The ledger
/// composes these without adding locking of its own.
pub trait LedgerStore: Send + Sync {
    /// Insert the account if absent. Returns true when a row was created.
    fn create_account_if_missing(&self, account: &Account) -> Result<bool>;

    fn account(&self, user: UserId) -> Result<Option<Account>>;
    fn account_by_handle(&self, handle: &str) -> Result<Option<Account>>;
    fn accounts(&self) -> Result<Vec<Account>>;
    fn count_accounts(&self) -> Result<i64>;

    /// Unconditionally add to an existing account's balance.
    /// Fails with `NotFound` when the account does not exist.
    fn add_balance(&self, user: UserId, amount: i64) -> Result<()>;

    /// Decrement balance by `cost` only if `balance >= cost`, atomically.
    fn debit_if_at_least(&self, user: UserId, cost: i64) -> Result<DebitOutcome>;

    /// Add to (creating if absent) the pending grant for a handle.
    fn add_pending_grant(&self, handle: &str, amount: i64) -> Result<()>;

    /// Remove and return the pending grant amount for a handle, if any.
    fn take_pending_grant(&self, handle: &str) -> Result<Option<i64>>;

    fn increment_counter(&self, key: &str, by: i64) -> Result<()>;
    fn counter(&self, key: &str) -> Result<i64>;
}
