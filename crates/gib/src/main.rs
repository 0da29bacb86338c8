use std::sync::Arc;

use gib_core::{config::Config, ledger::CreditLedger, ports::LedgerStore, store::MemoryStore};
use gib_store::SqliteStore;

#[tokio::main]
async fn main() -> Result<(), gib_core::Error> {
    gib_core::logging::init("gib")?;

    let cfg = Arc::new(Config::load()?);

    let store: Arc<dyn LedgerStore> = if cfg.database.is_empty() {
        eprintln!("DATABASE is empty; balances will not survive restarts");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(SqliteStore::open(&cfg.database)?)
    };
    let ledger = Arc::new(CreditLedger::new(store, cfg.default_credits));

    gib_telegram::router::run_polling(cfg, ledger)
        .await
        .map_err(|e| gib_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
