use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{
        InlineQueryResult, InlineQueryResultArticle, InputMessageContent, InputMessageContentText,
        ParseMode,
    },
};

use gib_core::{
    domain::UserId,
    formatting::{format_group_info, format_group_summary},
    Error,
};

use crate::handlers::commands::no_credits_text;
use crate::router::AppState;

fn article(id: &str, title: &str, text: String, description: &str) -> InlineQueryResult {
    InlineQueryResult::Article(
        InlineQueryResultArticle::new(
            id.to_string(),
            title.to_string(),
            InputMessageContent::Text(InputMessageContentText::new(text)),
        )
        .description(description.to_string()),
    )
}

fn html_article(id: &str, title: &str, html: String, description: &str) -> InlineQueryResult {
    InlineQueryResult::Article(
        InlineQueryResultArticle::new(
            id.to_string(),
            title.to_string(),
            InputMessageContent::Text(
                InputMessageContentText::new(html).parse_mode(ParseMode::Html),
            ),
        )
        .description(description.to_string()),
    )
}

/// Inline flow mirrors `/check`: ensure account, membership gate, debit,
/// lookup, refund on failure. Each outcome is rendered as an inline article.
pub async fn handle_inline_query(
    bot: Bot,
    q: InlineQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let user = q.from.clone();
    let user_id = UserId(user.id.0 as i64);
    let query_text = q.query.trim().to_string();

    if let Err(e) =
        state
            .ledger
            .ensure_account(user_id, user.username.as_deref(), &user.first_name)
    {
        eprintln!("ensure_account failed for {}: {e}", user.id);
    }

    if query_text.is_empty() {
        let hint = "Type a group link or username: @groupname or https://t.me/groupname";
        bot.answer_inline_query(
            q.id,
            vec![article("hint", "Group Info Finder", hint.to_string(), hint)],
        )
        .cache_time(10)
        .await?;
        return Ok(());
    }

    if !state
        .membership
        .is_member(&state.cfg.channel_username, user_id)
        .await
    {
        let channel = &state.cfg.channel_username;
        bot.answer_inline_query(
            q.id,
            vec![article(
                "must_join",
                "Join required",
                format!("You must join {channel} to use this bot. Open bot chat to verify."),
                &format!("Join {channel} and verify in bot chat."),
            )],
        )
        .cache_time(5)
        .switch_pm_text(format!("Join {channel} to use"))
        .switch_pm_parameter("verify".to_string())
        .await?;
        return Ok(());
    }

    let guard = match state.ledger.try_debit(user_id, state.cfg.cost_per_search) {
        Ok(guard) => guard,
        Err(Error::InsufficientBalance { current }) => {
            bot.answer_inline_query(
                q.id,
                vec![article(
                    "no_credits",
                    "No credits",
                    no_credits_text(&state, current),
                    "You don't have enough credits.",
                )],
            )
            .cache_time(5)
            .await?;
            return Ok(());
        }
        Err(e) => {
            eprintln!("debit failed for {}: {e}", user_id.0);
            return Ok(());
        }
    };

    match state.info.lookup_group_info(&query_text).await {
        Ok(info) => {
            guard.disarm();
            let title = format_group_summary(&info);
            let description = format!("Created: {}", info.created.value);
            bot.answer_inline_query(
                q.id,
                vec![html_article("res", &title, format_group_info(&info), &description)],
            )
            .cache_time(5)
            .await?;
        }
        Err(e) => {
            drop(guard); // refund
            bot.answer_inline_query(
                q.id,
                vec![article(
                    "err",
                    "Error",
                    format!("Error fetching info: {e} (credits refunded)"),
                    "Could not fetch group info.",
                )],
            )
            .cache_time(5)
            .await?;
        }
    }
    Ok(())
}
