use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode},
};

use gib_core::{
    domain::{Account, UserId},
    formatting::{escape_html, format_group_info},
    Error,
};

use crate::router::AppState;

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

/// `/addcredit` and `/usercredits` accept either `@handle` or a numeric id.
#[derive(Debug, PartialEq, Eq)]
enum Target {
    Handle(String),
    Id(i64),
}

fn parse_target(text: &str) -> Option<Target> {
    if let Some(handle) = text.strip_prefix('@') {
        if !handle.is_empty() {
            return Some(Target::Handle(handle.to_string()));
        }
        return None;
    }
    text.parse::<i64>().ok().map(Target::Id)
}

pub fn join_keyboard(channel: &str) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    let url = format!("https://t.me/{}", channel.trim_start_matches('@'));
    if let Ok(url) = url.parse() {
        rows.push(vec![InlineKeyboardButton::url("Join Channel ✅", url)]);
    }
    rows.push(vec![InlineKeyboardButton::callback(
        "Verify Join",
        "verify_join",
    )]);
    InlineKeyboardMarkup::new(rows)
}

fn is_admin(state: &AppState, user: &teloxide::types::User) -> bool {
    user.username.as_deref() == Some(state.cfg.admin_username.as_str())
}

fn ensure_account(state: &AppState, user: &teloxide::types::User) -> Option<Account> {
    match state.ledger.ensure_account(
        UserId(user.id.0 as i64),
        user.username.as_deref(),
        &user.first_name,
    ) {
        Ok(acc) => Some(acc),
        Err(e) => {
            eprintln!("ensure_account failed for {}: {e}", user.id);
            None
        }
    }
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let (cmd, args) = parse_command(msg.text().unwrap_or(""));
    match cmd.as_str() {
        "start" => handle_start(bot, msg, state, args).await,
        "check" => handle_check(bot, msg, state, args).await,
        "credits" => handle_credits(bot, msg, state).await,
        "help" => handle_help(bot, msg, state).await,
        "addcredit" => handle_addcredit(bot, msg, state, args).await,
        "usercredits" => handle_usercredits(bot, msg, state, args).await,
        "stats" => handle_stats(bot, msg, state).await,
        "export" => handle_export(bot, msg, state).await,
        _ => Ok(()),
    }
}

async fn handle_start(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    args: String,
) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    ensure_account(&state, user);

    // Deep-link referral payload: `/start ref<id>` rewards the referrer,
    // who must already have an account and must not be the new user.
    if let Some(referrer) = args
        .split_whitespace()
        .next()
        .and_then(|a| a.strip_prefix("ref"))
        .and_then(|id| id.parse::<i64>().ok())
    {
        if referrer != user.id.0 as i64 {
            let known = matches!(state.ledger.account(UserId(referrer)), Ok(Some(_)));
            if known {
                if let Err(e) = state.ledger.grant(UserId(referrer), state.cfg.referral_reward) {
                    eprintln!("referral grant failed for {referrer}: {e}");
                }
            }
        }
    }

    bot.send_message(
        msg.chat.id,
        "👋 Hi! To use this bot you must join our channel first.\n\n\
         After joining, press Verify. You get default credits when first starting.",
    )
    .reply_markup(join_keyboard(&state.cfg.channel_username))
    .await?;
    Ok(())
}

pub async fn handle_check(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    args: String,
) -> ResponseResult<()> {
    let Some(user) = msg.from().cloned() else {
        return Ok(());
    };
    ensure_account(&state, &user);

    if args.is_empty() {
        bot.send_message(msg.chat.id, "Usage: /check <group_link_or_username_or_id>")
            .await?;
        return Ok(());
    }

    let user_id = UserId(user.id.0 as i64);
    if !state
        .membership
        .is_member(&state.cfg.channel_username, user_id)
        .await
    {
        bot.send_message(
            msg.chat.id,
            format!("❌ You must join {} first.", state.cfg.channel_username),
        )
        .reply_markup(join_keyboard(&state.cfg.channel_username))
        .await?;
        return Ok(());
    }

    let guard = match state.ledger.try_debit(user_id, state.cfg.cost_per_search) {
        Ok(guard) => guard,
        Err(Error::InsufficientBalance { current }) => {
            bot.send_message(
                msg.chat.id,
                format!(
                    "Not enough credits. You have {current} credits.\n\
                     Contact admin to add credits → @{}",
                    state.cfg.admin_username
                ),
            )
            .await?;
            return Ok(());
        }
        Err(e) => {
            eprintln!("debit failed for {}: {e}", user_id.0);
            bot.send_message(msg.chat.id, "Internal error, try again later.")
                .await?;
            return Ok(());
        }
    };

    bot.send_message(msg.chat.id, "🔍 Fetching group info... please wait a few seconds.")
        .await?;

    match state.info.lookup_group_info(&args).await {
        Ok(info) => {
            guard.disarm();
            bot.send_message(msg.chat.id, format_group_info(&info))
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Err(e) => {
            // Guard drop refunds the debit.
            drop(guard);
            bot.send_message(
                msg.chat.id,
                format!("⚠️ Error fetching info: {e}\nYour credit has been refunded."),
            )
            .await?;
        }
    }
    Ok(())
}

async fn handle_credits(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(acc) = ensure_account(&state, user) else {
        bot.send_message(msg.chat.id, "Internal error, try again later.")
            .await?;
        return Ok(());
    };
    bot.send_message(
        msg.chat.id,
        format!("💰 You have {} credits.", acc.balance),
    )
    .await?;
    Ok(())
}

async fn handle_help(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    bot.send_message(
        msg.chat.id,
        format!(
            "Commands:\n\
             /check <group> - look up group info ({} credits per search)\n\
             /credits - your balance\n\
             /start - register and verify channel join\n\n\
             Group references: @name, t.me/name, numeric id, or invite link.",
            state.cfg.cost_per_search
        ),
    )
    .await?;
    Ok(())
}

async fn handle_addcredit(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    args: String,
) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    if !is_admin(&state, user) {
        bot.send_message(msg.chat.id, "Not authorized.").await?;
        return Ok(());
    }

    let mut parts = args.split_whitespace();
    let (target, amount) = match (
        parts.next().and_then(parse_target),
        parts.next().and_then(|a| a.parse::<i64>().ok()),
    ) {
        (Some(t), Some(a)) if a >= 0 => (t, a),
        _ => {
            bot.send_message(
                msg.chat.id,
                "Usage: /addcredit @username amount OR /addcredit user_id amount",
            )
            .await?;
            return Ok(());
        }
    };

    let reply = match target {
        Target::Handle(handle) => match state.ledger.account_by_handle(&handle) {
            Ok(Some(acc)) => match state.ledger.grant(acc.user_id, amount) {
                Ok(()) => format!("✅ Added {amount} credits to @{handle} (id {}).", acc.user_id.0),
                Err(e) => format!("Grant failed: {e}"),
            },
            Ok(None) => match state.ledger.grant_pending(&handle, amount) {
                Ok(()) => format!(
                    "✅ @{handle} has no account yet. Pending {amount} credits will be \
                     applied when they start the bot."
                ),
                Err(e) => format!("Pending grant failed: {e}"),
            },
            Err(e) => format!("Lookup failed: {e}"),
        },
        Target::Id(id) => match state.ledger.grant(UserId(id), amount) {
            Ok(()) => format!("✅ Added {amount} credits to id {id}."),
            Err(Error::NotFound(_)) => "User id not found.".to_string(),
            Err(e) => format!("Grant failed: {e}"),
        },
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_usercredits(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
    args: String,
) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    if !is_admin(&state, user) {
        bot.send_message(msg.chat.id, "Not authorized.").await?;
        return Ok(());
    }

    let Some(target) = args.split_whitespace().next().and_then(parse_target) else {
        bot.send_message(msg.chat.id, "Usage: /usercredits <@username_or_id>")
            .await?;
        return Ok(());
    };

    let account = match &target {
        Target::Handle(handle) => state.ledger.account_by_handle(handle),
        Target::Id(id) => state.ledger.account(UserId(*id)),
    };
    let reply = match account {
        Ok(Some(acc)) => format!(
            "id {} (@{}) has {} credits.",
            acc.user_id.0,
            if acc.handle.is_empty() { "-" } else { &acc.handle },
            acc.balance
        ),
        Ok(None) => "No such user.".to_string(),
        Err(e) => format!("Lookup failed: {e}"),
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_stats(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    if !is_admin(&state, user) {
        bot.send_message(msg.chat.id, "Not authorized.").await?;
        return Ok(());
    }

    let users = state.ledger.total_users().unwrap_or(0);
    let searches = state.ledger.total_searches().unwrap_or(0);
    bot.send_message(
        msg.chat.id,
        format!("📊 Users: {users}\nTotal searches: {searches}"),
    )
    .await?;
    Ok(())
}

async fn handle_export(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    if !is_admin(&state, user) {
        bot.send_message(msg.chat.id, "Not authorized.").await?;
        return Ok(());
    }

    let accounts = match state.ledger.accounts() {
        Ok(accounts) => accounts,
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Export failed: {e}"))
                .await?;
            return Ok(());
        }
    };
    let csv = users_csv(&accounts);
    bot.send_document(msg.chat.id, InputFile::memory(csv.into_bytes()).file_name("users.csv"))
        .await?;
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn users_csv(accounts: &[Account]) -> String {
    let mut out = String::from("user_id,username,first_name,credits,created_at\n");
    for acc in accounts {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            acc.user_id.0,
            csv_field(&acc.handle),
            csv_field(&acc.display_name),
            acc.balance,
            acc.created_at
        ));
    }
    out
}

// Inline result text reuses the same card; keep the helper here so the
// inline module stays thin.
pub fn no_credits_text(state: &AppState, current: i64) -> String {
    format!(
        "Not enough credits. You have {current} credits.\n\
         Contact admin to add credits → @{}",
        escape_html(&state.cfg.admin_username)
    )
}
