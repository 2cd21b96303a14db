//! Chatflow SLA worker.
//!
//! Connects PostgreSQL, Redis and the messaging gateway, then runs the SLA
//! processor until Ctrl-C.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use chatflow::adapters::postgres::{
    PostgresChatbotSessionRepository, PostgresContactRepository, PostgresOutboundMessageRepository,
    PostgresSlaSettingsRepository, PostgresTransferRepository,
};
use chatflow::adapters::redis::RedisBroadcaster;
use chatflow::adapters::transport::{HttpMessageSender, HttpSenderConfig};
use chatflow::application::{SlaProcessor, SlaProcessorConfig, SlaProcessorDeps, SlaSettingsCache};
use chatflow::config::{AppConfig, RuntimeConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.runtime);

    tracing::info!(environment = ?config.runtime.environment, "Starting chatflow");

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Migrations applied");
    }

    let broadcaster = RedisBroadcaster::connect(&config.redis.url).await?;
    let sender = HttpMessageSender::new(
        HttpSenderConfig::new(
            config.transport.gateway_url.clone(),
            config.transport.api_token.clone(),
        )
        .with_timeout(config.transport.send_timeout()),
    )?;

    let settings = Arc::new(SlaSettingsCache::new(
        Arc::new(PostgresSlaSettingsRepository::new(pool.clone())),
        config.sla.settings_cache_ttl(),
    ));

    let processor = Arc::new(SlaProcessor::new(
        SlaProcessorDeps {
            settings,
            transfers: Arc::new(PostgresTransferRepository::new(pool.clone())),
            contacts: Arc::new(PostgresContactRepository::new(pool.clone())),
            sessions: Arc::new(PostgresChatbotSessionRepository::new(pool.clone())),
            outbound: Arc::new(PostgresOutboundMessageRepository::new(pool.clone())),
            sender: Arc::new(sender),
            broadcaster: Arc::new(broadcaster),
        },
        SlaProcessorConfig::default()
            .with_tick_interval(config.sla.tick_interval())
            .with_send_timeout(config.transport.send_timeout()),
    ));

    let handle = processor.start();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    handle.stop().await;
    pool.close().await;

    Ok(())
}

fn init_tracing(runtime: &RuntimeConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(runtime.log_level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    if runtime.json_logs() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}
