use std::sync::Arc;

use estate_intake::channels::{CliChannel, TelegramChannel};
use estate_intake::config::BotConfig;
use estate_intake::flow::{FlowEngine, SessionStore, spawn_sweep_task};
use estate_intake::lead::{LeadFinalizer, ListingsLookup, StubListings};
use estate_intake::registry::AnswerRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;

    let registry = Arc::new(AnswerRegistry::standard());
    let store = SessionStore::new();
    let listings: Arc<dyn ListingsLookup> = Arc::new(StubListings);
    let finalizer = LeadFinalizer::new(
        Arc::clone(&registry),
        Arc::clone(&listings),
        config.lookup_timeout,
    );
    let engine = Arc::new(FlowEngine::new(
        Arc::clone(&registry),
        Arc::clone(&store),
        finalizer,
    ));

    eprintln!("🏠 Estate Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Steps: {}", registry.steps().len());
    eprintln!(
        "   Sessions: TTL {}s, sweep every {}s",
        config.session_ttl.as_secs(),
        config.sweep_interval.as_secs()
    );
    eprintln!(
        "   Listings: {} (timeout {}s)",
        listings.source(),
        config.lookup_timeout.as_secs()
    );

    let _sweep_handle = spawn_sweep_task(
        Arc::clone(&store),
        config.session_ttl,
        config.sweep_interval,
    );

    match config.bot_token {
        Some(token) => {
            eprintln!("   Channel: telegram\n");
            TelegramChannel::new(token).run(engine).await?;
        }
        None => {
            eprintln!("   Channel: cli (set TELEGRAM_BOT_TOKEN for Telegram)");
            eprintln!("   Type /start and press Enter. Ctrl-D to exit.\n");
            CliChannel::new().run(engine).await?;
        }
    }

    Ok(())
}
