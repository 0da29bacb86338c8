use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration for the bot, loaded from the environment
/// (with `.env` support for local runs).
#[derive(Clone, Debug)]
pub struct Config {
    /// BotFather token.
    pub telegram_bot_token: String,
    /// Channel users must join before searching, `@name` form.
    pub channel_username: String,
    /// Admin handle without the leading `@`.
    pub admin_username: String,
    /// SQLite path; empty means in-memory only.
    pub database: String,

    pub default_credits: i64,
    pub cost_per_search: i64,
    pub referral_reward: i64,

    /// Budget for each external directory call.
    pub directory_timeout: Duration,
    /// Participant-listing cap for the degraded admin fallback.
    pub admin_fallback_limit: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("BOT_TOKEN").and_then(non_empty).ok_or_else(|| {
            Error::Config("BOT_TOKEN environment variable is required".to_string())
        })?;
        let channel_username = env_str("CHANNEL_USERNAME")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("CHANNEL_USERNAME environment variable is required".to_string())
            })?;
        let channel_username = if channel_username.starts_with('@') {
            channel_username
        } else {
            format!("@{channel_username}")
        };
        let admin_username = env_str("ADMIN_USERNAME")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("ADMIN_USERNAME environment variable is required".to_string())
            })?
            .trim_start_matches('@')
            .to_string();

        let database = env_str("DATABASE").unwrap_or_else(|| "groupbot.db".to_string());

        Ok(Self {
            telegram_bot_token,
            channel_username,
            admin_username,
            database,
            default_credits: env_i64("DEFAULT_CREDITS", 10)?,
            cost_per_search: env_i64("COST_PER_SEARCH", 5)?,
            referral_reward: env_i64("REFERRAL_REWARD", 10)?,
            directory_timeout: Duration::from_secs(env_i64("DIRECTORY_TIMEOUT_SECS", 15)? as u64),
            admin_fallback_limit: env_i64("ADMIN_FALLBACK_LIMIT", 50)? as usize,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn non_empty(s: String) -> Option<String> {
    let t = s.trim().to_string();
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}

fn env_i64(key: &str, default: i64) -> Result<i64> {
    match env_str(key).and_then(non_empty) {
        Some(v) => v
            .parse::<i64>()
            .map_err(|_| Error::Config(format!("{key} must be an integer, got {v:?}"))),
        None => Ok(default),
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        let key = k.trim();
        if key.is_empty() || env::var_os(key).is_some() {
            continue; // never override existing env
        }

        let mut val = v.trim().to_string();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }
        env::set_var(key, val);
    }
}
