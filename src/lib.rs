//! conn_watch library: live dashboard of established TCP connections
//!
//! The server side harvests the established connections of a monitored port
//! from inside the host network namespace and serves them as JSON, together
//! with a cached geolocation lookup per remote address. The client side polls
//! that API and keeps a terminal table up to date, filling in locations as
//! they arrive.
//!
//! # Example
//!
//! ```no_run
//! use conn_watch::{run_server, ServerConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig {
//!     monitored_port: 8443,
//!     ..Default::default()
//! };
//! run_server(config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Harvesting shells out to `nsenter`
//! and `ss`, so the server needs the privileges to enter the target namespace.

pub mod config;
pub mod error_handling;
pub mod geoip;
pub mod harvest;
pub mod initialization;
pub mod poller;
pub mod server;

// Re-export public API
pub use config::{LogFormat, LogLevel, ServerConfig, WatchConfig};
pub use run::{run_server, run_watch};

mod run {
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use log::info;
    use strum::IntoEnumIterator;
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    use crate::config::{ServerConfig, WatchConfig};
    use crate::error_handling::{ErrorType, InfoType, ProcessingStats, WarningType};
    use crate::poller::{ApiClient, Poller, TerminalView};
    use crate::server::{serve, AppState};

    /// Runs the connection API until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration, when the HTTP client cannot be
    /// built, or when the listener cannot be bound.
    pub async fn run_server(config: ServerConfig) -> Result<()> {
        config.validate().context("Invalid server configuration")?;

        let state = AppState::from_config(&config)
            .context("Failed to initialize server state")?;
        let stats = state.stats.clone();

        let listener = TcpListener::bind(config.bind)
            .await
            .with_context(|| format!("Failed to bind {}", config.bind))?;

        info!(
            "Monitoring established connections on port {} (namespace of pid {})",
            config.monitored_port, config.nsenter_target_pid
        );
        serve(listener, state, shutdown_signal()).await?;

        log_statistics(&stats);
        Ok(())
    }

    /// Polls the API and redraws the terminal table until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration or when the HTTP client cannot be built.
    pub async fn run_watch(config: WatchConfig) -> Result<()> {
        config.validate().context("Invalid watch configuration")?;

        let client = ApiClient::new(&config).context("Failed to initialize API client")?;
        let poller = Poller::new(client, Arc::new(TerminalView::new()), config.interval);

        let cancel = CancellationToken::new();
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            signal_cancel.cancel();
        });

        info!(
            "Polling {} every {}s",
            config.api_url,
            config.interval.as_secs_f64()
        );
        poller.run(cancel).await;
        Ok(())
    }

    async fn shutdown_signal() {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
    }

    fn log_statistics(stats: &ProcessingStats) {
        info!(
            "Service totals: {} error(s), {} warning(s), {} event(s)",
            stats.total_errors(),
            stats.total_warnings(),
            stats.total_info()
        );
        for error_type in ErrorType::iter() {
            let count = stats.get_error_count(error_type);
            if count > 0 {
                info!("  {}: {}", error_type, count);
            }
        }
        for warning_type in WarningType::iter() {
            let count = stats.get_warning_count(warning_type);
            if count > 0 {
                info!("  {}: {}", warning_type.metric_label(), count);
            }
        }
        for info_type in InfoType::iter() {
            let count = stats.get_info_count(info_type);
            if count > 0 {
                info!("  {}: {}", info_type.metric_label(), count);
            }
        }
    }
}
