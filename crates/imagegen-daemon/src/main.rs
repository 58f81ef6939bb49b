mod environment;
mod error;
mod generator;
mod http;
mod images;
mod log_layer;
mod log_queue;

use std::sync::Arc;

use anyhow::Context;
use imagegen_proto::config::Config;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::environment::Environment;
use crate::generator::Generator;
use crate::log_layer::{InstallLogLayer, INSTALL_LOG};
use crate::log_queue::LogQueue;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Queue first so the logging layer can feed it
    let log_queue = Arc::new(LogQueue::new());

    let data_dir = imagegen_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("daemon.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(InstallLogLayer::new(Arc::clone(&log_queue)))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,imagegen_daemon=debug,tower_http=debug")
            }),
        )
        .init();

    info!("Log file: {:?}", log_path);

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());
    info!(target: INSTALL_LOG, "Image generator daemon starting");

    let cancel = CancellationToken::new();
    let env = Arc::new(Environment::new());
    let generator = Arc::new(Generator::new(Arc::clone(&env), &config.generator));

    let probe = tokio::spawn(environment::run_probe_loop(
        Arc::clone(&env),
        config.generator.clone(),
        cancel.clone(),
    ));

    let desktop_dir = config.paths.resolved_desktop_dir();
    if desktop_dir.is_none() {
        warn!("no desktop directory found, saving to desktop will fail");
    }

    let addr = format!("{}:{}", config.daemon.bind_address, config.daemon.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let server = http::start_server(
        listener,
        http::HttpState {
            env,
            generator,
            log_queue,
            desktop_dir,
        },
        cancel.clone(),
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutdown requested");
    cancel.cancel();

    let _ = probe.await;
    let _ = server.await;
    info!("daemon stopped");
    Ok(())
}
