use std::sync::Arc;

use teloxide::prelude::*;

use gib_core::domain::UserId;

use crate::handlers::commands::join_keyboard;
use crate::router::AppState;

/// `verify_join`: re-check channel membership after the user claims to have
/// joined, and register the account on success.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let cb_id = q.id.clone();
    let data = q.data.as_deref().unwrap_or("");
    let Some(chat_id) = q.message.as_ref().map(|m| m.chat.id) else {
        bot.answer_callback_query(cb_id).await?;
        return Ok(());
    };

    if data != "verify_join" {
        bot.answer_callback_query(cb_id).await?;
        return Ok(());
    }

    let user = q.from.clone();
    bot.answer_callback_query(cb_id).await?;

    let member = state
        .membership
        .is_member(&state.cfg.channel_username, UserId(user.id.0 as i64))
        .await;

    if member {
        if let Err(e) = state.ledger.ensure_account(
            UserId(user.id.0 as i64),
            user.username.as_deref(),
            &user.first_name,
        ) {
            eprintln!("ensure_account failed for {}: {e}", user.id);
        }
        bot.send_message(
            chat_id,
            "✅ Verified! You can now use inline queries or /check <group_link>.",
        )
        .await?;
    } else {
        bot.send_message(
            chat_id,
            format!(
                "❌ Still not a member of {}. Please join and retry.",
                state.cfg.channel_username
            ),
        )
        .reply_markup(join_keyboard(&state.cfg.channel_username))
        .await?;
    }
    Ok(())
}
