//! Application bootstrap: configuration, storage/pub-sub backend selection,
//! and the wiring the `main` binary drives.

use std::sync::Arc;

use anyhow::Result;

use crate::api::ApiServer;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::{AppConfig, DatabaseBackend, PubSubBackend as PubSubBackendKind};
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::memory::new_memory_store;
use crate::data::postgres::repositories::new_postgres_store;
use crate::data::postgres::PostgresService;
use crate::data::pubsub::{MemoryPubSub, PubSubBackend, RedisPubSub};
use crate::domain::chat::Controller;

pub struct ChatApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub controller: Arc<Controller>,
}

impl ChatApp {
    /// Run the application with CLI argument parsing.
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("application starting");

        let (cli_config, command) = cli::parse();
        match command {
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let shutdown = ShutdownService::new();

        let store = match config.database.backend {
            DatabaseBackend::Memory => {
                tracing::debug!(backend = "memory", "chat store initialized");
                new_memory_store()
            }
            DatabaseBackend::Postgres => {
                let pg_config = config
                    .database
                    .postgres
                    .as_ref()
                    .expect("AppConfig::load guarantees postgres config when backend=postgres");
                let service = Arc::new(PostgresService::init(pg_config).await?);
                tracing::debug!(backend = "postgres", "chat store initialized");

                let health_task = PostgresService::start_health_check_task(
                    service.pool().clone(),
                    shutdown.subscribe(),
                );
                shutdown.register(health_task).await;

                let closer_service = service.clone();
                shutdown
                    .register_closer(async move { closer_service.close().await })
                    .await;

                new_postgres_store(service.pool().clone())
            }
        };

        let pubsub: Arc<dyn PubSubBackend> = match config.pubsub.backend {
            PubSubBackendKind::Memory => {
                tracing::debug!(backend = "memory", "pub/sub initialized");
                Arc::new(MemoryPubSub::new())
            }
            PubSubBackendKind::Redis => {
                let redis_config = config
                    .pubsub
                    .redis
                    .as_ref()
                    .expect("AppConfig::load guarantees redis config when pubsub backend=redis");
                let backend = RedisPubSub::new(&redis_config.url).await?;
                tracing::debug!(backend = "redis", "pub/sub initialized");
                Arc::new(backend)
            }
        };

        let closer_pubsub = pubsub.clone();
        shutdown
            .register_closer(async move { closer_pubsub.shutdown().await })
            .await;

        let controller = Arc::new(Controller::new(store, pubsub, config.clone()));

        Ok(Self {
            shutdown,
            config,
            controller,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=debug", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        app.shutdown.install_signal_handlers();

        crate::core::banner::print_banner(&app.config.server.host, app.config.server.port);

        let server = ApiServer::new(app);
        let app = server.start().await?;

        app.controller.shutdown_all_rooms().await;
        app.shutdown.shutdown().await;

        Ok(())
    }
}
