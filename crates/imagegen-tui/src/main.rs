mod app;
mod components;
mod focus;
mod theme;
mod widgets;

use std::sync::Arc;

use imagegen_core::{Engine, HttpBackend, Timings, WatchPresenter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = imagegen_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("tui.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; keep HTTP client internals quiet by default.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("imagegen log: {}", log_path.display());

    tracing::info!("imagegen starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = imagegen_proto::config::Config::load().unwrap_or_default();
    let base_url = config.daemon.base_url();
    tracing::info!("daemon at {}", base_url);

    // ── Engine ───────────────────────────────────────────────────────────────
    let (presenter, session_rx) = WatchPresenter::new();
    let (engine, handle) = Engine::new(
        Arc::new(HttpBackend::new(base_url)),
        Box::new(presenter),
        Timings::default(),
    );
    let engine_task = tokio::spawn(engine.run());

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let result = app::App::new(handle, session_rx).run().await;
    if let Err(e) = engine_task.await {
        tracing::error!("engine task failed: {}", e);
    }
    result
}
