//! Core application

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::api::ApiServer;
use crate::broker::{Broker, DeadlineSweeper, ProcessStats, PushDeliverer};
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownCoordinator;
use crate::data::datastore;

pub struct CoreApp {
    pub shutdown: ShutdownCoordinator,
    pub config: AppConfig,
    pub broker: Arc<Broker>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Broker starting");

        let (cli_config, command) = cli::parse();
        match command {
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let store = datastore::from_config(&config.datastore)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to initialize datastore: {}", e))?;
        tracing::debug!(backend = store.backend_name(), "Datastore initialized");

        let broker = Arc::new(Broker::new(store, Arc::new(ProcessStats::new())));
        let shutdown = ShutdownCoordinator::new();

        Ok(Self {
            shutdown,
            config,
            broker,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

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
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.spawn_signal_listener();

        app.start_background_tasks().await;

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.drain().await;

        Ok(())
    }

    pub async fn start_background_tasks(&self) {
        let sweep_interval = Duration::from_millis(self.config.sweeper.interval_ms);
        self.shutdown
            .track(DeadlineSweeper::start(
                Arc::clone(&self.broker),
                sweep_interval,
                self.shutdown.watch(),
            ))
            .await;
        tracing::debug!(interval_ms = self.config.sweeper.interval_ms, "Deadline sweeper started");

        if self.config.push.enabled {
            let deliverer =
                PushDeliverer::new(Arc::clone(&self.broker), self.config.push.batch_size);
            self.shutdown
                .track(deliverer.start(
                    Duration::from_millis(self.config.push.interval_ms),
                    self.shutdown.watch(),
                ))
                .await;
            tracing::debug!(
                interval_ms = self.config.push.interval_ms,
                batch = self.config.push.batch_size,
                "Push deliverer started"
            );
        } else {
            tracing::debug!("Push delivery disabled by config");
        }
    }
}
