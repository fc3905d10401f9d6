//! `clqy` binary entry point.
//!
//! Parses CLI arguments, initializes tracing, wires the application
//! state, and dispatches to the chat loop or the HTTP server.

mod cli;
mod http;
mod push;
mod state;

use clap::{CommandFactory, Parser};
use clap_complete::generate;

use colloquy_core::push::SharedPusher;

use crate::cli::{Cli, Commands};
use crate::push::{ConsolePusher, LogPusher};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,colloquy=debug",
        _ => "trace",
    };
    colloquy_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Completions need no state; handle them before touching the database.
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        generate(*shell, &mut cmd, "clqy", &mut std::io::stdout());
        return Ok(());
    }

    // Scheduled pushes surface on the terminal when chatting, in the log
    // when serving.
    let pusher = match &cli.command {
        Commands::Chat { .. } => SharedPusher::new(ConsolePusher),
        _ => SharedPusher::new(LogPusher),
    };

    let state = AppState::init(pusher).await?;

    match cli.command {
        Commands::Chat { user } => {
            cli::chat::loop_runner::run_chat_loop(&state, &user).await?;
        }

        Commands::Serve { host, port } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Colloquy API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state.clone());

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    state.shutdown().await;
    colloquy_observe::tracing_setup::shutdown_tracing();
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
