//! Server Implementation
//!
//! HTTP 服务器启动和后台任务编排

use std::sync::Arc;
use std::time::Duration;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, ServerState};
use crate::orders::ReofferSweeper;
use crate::routes;

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state (tests, embedded use)
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await,
        };

        // Background tasks: re-offer sweeper
        let mut tasks = BackgroundTasks::new();
        let sweeper = ReofferSweeper::new(
            Arc::clone(&state.lifecycle),
            Duration::from_secs(self.config.sweep_interval_hours * 3600),
            tasks.shutdown_token(),
        );
        tasks.spawn("reoffer_sweeper", TaskKind::Periodic, sweeper.run());

        let app = routes::build_app().with_state(state.clone());

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        tracing::info!("Buyback server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down...");
            })
            .await?;

        tasks.shutdown().await;
        Ok(())
    }
}
