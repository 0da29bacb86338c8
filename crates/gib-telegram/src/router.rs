use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use gib_core::{
    config::Config,
    enrich::EnrichOptions,
    ledger::CreditLedger,
    lookup::GroupInfoService,
    ports::ChatMembership,
};

use crate::{handlers, TelegramDirectory, TelegramGate};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub ledger: Arc<CreditLedger>,
    pub info: Arc<GroupInfoService>,
    pub membership: Arc<dyn ChatMembership>,
}

pub async fn run_polling(cfg: Arc<Config>, ledger: Arc<CreditLedger>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        println!("group info bot started: @{}", me.username());
    }
    println!("Gate channel: {}", cfg.channel_username);
    println!("Cost per search: {} credits", cfg.cost_per_search);

    let info = Arc::new(GroupInfoService::new(
        Arc::new(TelegramDirectory::new(bot.clone())),
        EnrichOptions {
            admin_fallback_limit: cfg.admin_fallback_limit,
            call_timeout: cfg.directory_timeout,
            ..Default::default()
        },
    ));

    let state = Arc::new(AppState {
        cfg,
        ledger,
        info,
        membership: Arc::new(TelegramGate::new(bot.clone())),
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_inline_query().endpoint(handlers::handle_inline_query))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
