/// Core error type for the bot.
///
/// Adapter crates map their specific errors into this type so the core can
/// handle failures consistently (user-facing message vs absorbed-and-degraded).
/// Only `EmptyInput`, `InsufficientBalance` and `Unresolvable` are meant to
/// reach end users as messages; everything else is an internal failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("empty input")]
    EmptyInput,

    #[error("not enough credits, current balance {current}")]
    InsufficientBalance { current: i64 },

    #[error("no account for user {0}")]
    NotFound(i64),

    #[error("could not resolve group: {0}")]
    Unresolvable(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
