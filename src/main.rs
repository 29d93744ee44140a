use std::sync::Arc;

use aledger::config::{CliArgs, Config, LoggingConfig};
use aledger::{http, LedgerService};
use axum::routing::get;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();
    let config = Config::load(&cli);
    init_tracing(&config.logging);

    let service = Arc::new(LedgerService::in_memory());
    let mut app = http::router(service);

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            app = app.route("/metrics", get(move || std::future::ready(handle.render())));
        }
        Err(e) => tracing::warn!(error = %e, "Metrics recorder not installed"),
    }

    let addr = match config.listen_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(host = %config.server.host, port = config.server.port, error = %e, "Invalid listen address");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "API listening");

    if let Err(e) = axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
