use serde::{Deserialize, Serialize};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// A ledger account. Rows are owned exclusively by the ledger; the balance
/// never goes negative and is mutated only through ledger operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: UserId,
    /// Handle without the leading `@`, empty if the user has none.
    pub handle: String,
    pub display_name: String,
    pub balance: i64,
    /// Unix seconds at account creation.
    pub created_at: i64,
}

/// Credits promised to a handle that has not yet created an account.
/// At most one row per handle; merged into the account exactly once, at
/// account creation time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingGrant {
    pub handle: String,
    pub amount: i64,
}

/// A user-supplied group reference after normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NormalizedRef {
    /// Signed numeric id, including `-100...` supergroup/broadcast ids.
    Numeric(i64),
    /// Canonical `@handle` (the `@` is always present).
    Handle(String),
    /// An invite link, passed through verbatim.
    Invite(String),
    /// Unrecognized text, passed through for best-effort lookup.
    Raw(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Group,
    Supergroup,
    Channel,
}

impl GroupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKind::Group => "group",
            GroupKind::Supergroup => "supergroup",
            GroupKind::Channel => "channel",
        }
    }
}

/// How a creation-date estimate was derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimateMethod {
    OldestMessage,
    IdHeuristic,
    Unknown,
}

impl EstimateMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimateMethod::OldestMessage => "Oldest Visible Message",
            EstimateMethod::IdHeuristic => "Group ID Estimate",
            EstimateMethod::Unknown => "Unknown",
        }
    }
}

/// A creation-date estimate labeled with its derivation so callers can judge
/// confidence. Never a guaranteed truth.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedEstimate {
    pub value: String,
    pub method: EstimateMethod,
    pub note: String,
}

impl Default for CreatedEstimate {
    fn default() -> Self {
        Self {
            value: "Unknown".to_string(),
            method: EstimateMethod::Unknown,
            note: String::new(),
        }
    }
}

/// Best-effort group info record. Built fresh per request, never cached.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupDescriptor {
    pub title: String,
    pub id: Option<i64>,
    pub kind: GroupKind,
    pub member_count: Option<i64>,
    pub created: CreatedEstimate,
    /// First admin name in directory order. Heuristic, not a verified
    /// ownership claim: directory APIs frequently order admins arbitrarily.
    pub owner_guess: String,
    pub admins: Vec<String>,
}

impl GroupDescriptor {
    pub fn base(title: String, id: Option<i64>, kind: GroupKind) -> Self {
        Self {
            title,
            id,
            kind,
            member_count: None,
            created: CreatedEstimate::default(),
            owner_guess: "Unknown".to_string(),
            admins: Vec::new(),
        }
    }
}
