mod cli;
mod config;
mod html;
mod logging;
mod pages;
mod routes;

use crate::cli::Args;
use crate::config::load_service_config;
use crate::logging::init_tracing;
use crate::routes::{build_router, AppState};
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use translator::Translator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = init_tracing(args.log_dir.as_deref(), args.log_to_stderr)?;

    let config = load_service_config(args.config.as_deref(), args.listen_addr.as_deref())
        .context("failed to load config")?;
    info!(
        listen_addr = %config.listen_addr,
        program = %config.translator.program,
        args = ?config.translator.args,
        timeout_ms = config.translator.timeout.as_millis() as u64,
        max_output_bytes = config.translator.max_output_bytes,
        max_question_chars = config.max_question_chars,
        "nl2cq-web starting"
    );

    let translator = Translator::new(config.translator.clone()).context("invalid translator")?;
    let app = build_router(AppState {
        translator: Arc::new(translator),
        max_question_chars: config.max_question_chars,
    });

    let shutdown = CancellationToken::new();
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "nl2cq-web listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown.clone()))
        .await?;
    info!("nl2cq-web shutting down");
    Ok(())
}

async fn wait_for_shutdown(shutdown: CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}
