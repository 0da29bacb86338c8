//! Telegram update handlers.
//!
//! Three entry points, one per update kind the bot cares about: commands in
//! private chat, the `verify_join` callback button, and inline queries. Each
//! handler ensures the account exists, gates on channel membership, and
//! leaves cost accounting to the debit-guard flow in `commands`/`inline`.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, InlineQuery, Message},
};

use crate::router::AppState;

mod callback;
mod commands;
mod inline;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    callback::handle_callback(bot, q, state).await
}

pub async fn handle_inline_query(
    bot: Bot,
    q: InlineQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    inline::handle_inline_query(bot, q, state).await
}

/// Where a text message goes: the command table, or (in private chat) the
/// bare-query path that treats the text like `/check <text>`.
enum Route {
    Command,
    Query(String),
}

fn route_text(text: &str) -> Route {
    if text.starts_with('/') {
        Route::Command
    } else {
        Route::Query(text.trim().to_string())
    }
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    match route_text(text) {
        Route::Command => commands::handle_command(bot, msg, state).await,
        Route::Query(query) if msg.chat.is_private() => {
            commands::handle_check(bot, msg, state, query).await
        }
        Route::Query(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_text_routes_to_the_command_table() {
        assert!(matches!(route_text("/check @foo"), Route::Command));
        assert!(matches!(route_text("/start"), Route::Command));
    }

    #[test]
    fn bare_text_becomes_an_owned_trimmed_query() {
        match route_text("  https://t.me/foo  ") {
            Route::Query(q) => assert_eq!(q, "https://t.me/foo"),
            Route::Command => panic!("expected query route"),
        }
    }
}
