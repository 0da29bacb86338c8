use crate::Result;

/// Initialize tracing for the bot process.
///
/// Compiled to a no-op unless the `tracing` feature is on, so offline builds
/// of the core stay dependency-light while the public API holds still.
pub fn init(service_name: &str) -> Result<()> {
    let _ = service_name;

    #[cfg(feature = "tracing")]
    {
        use tracing_subscriber::{fmt, EnvFilter};

        // `RUST_LOG` wins; otherwise info for our crates.
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("info,gib_core=info,gib_telegram=info,{service_name}=info"))
        });

        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(true)
            .init();
    }

    Ok(())
}
