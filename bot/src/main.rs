use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use estella_bot::config::BotConfig;
use estella_bot::db::pool::{create_pool, run_migrations};
use estella_bot::engine::avatar_cache::AvatarCache;
use estella_bot::engine::error_sink::{ErrorSink, TracingErrorSink, WebhookErrorSink};
use estella_bot::engine::server_cache::ServerAssignmentCache;
use estella_bot::platform::crafthead::CraftheadClient;
use estella_bot::platform::emoji_api::EmojiApiClient;
use estella_bot::state::BotState;

#[derive(Parser)]
#[command(version, about = "Minecraft server companion bot")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "estella.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = BotConfig::load(&cli.config)?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    let pool = create_pool(&config.database.url)
        .await
        .context("failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;

    let http = reqwest::Client::new();

    let errors: Arc<dyn ErrorSink> = match &config.logging.error_webhook {
        Some(url) => Arc::new(WebhookErrorSink::new(http.clone(), url.clone())),
        None => Arc::new(TracingErrorSink),
    };

    let avatars = Arc::new(AvatarCache::new(
        pool.clone(),
        Arc::new(CraftheadClient::new(
            http.clone(),
            config.avatars.source_url.clone(),
        )),
        Arc::new(EmojiApiClient::new(
            http,
            config.bot.api_base_url.clone(),
            config.bot.application_id,
            config.bot.token.clone(),
        )),
        errors,
        config.avatar_settings(),
    ));

    // Preload existing heads before any command can create new ones.
    avatars
        .populate()
        .await
        .context("failed to load player heads")?;

    let state = Arc::new(BotState {
        servers: ServerAssignmentCache::new(pool.clone()),
        avatars,
        db: pool,
    });

    info!(
        application_id = config.bot.application_id,
        cached_heads = state.avatars.len(),
        "Estella ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("Cleaning up...");
    state.db.close().await;
    info!("Exiting.");
    Ok(())
}
