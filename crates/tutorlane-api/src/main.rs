//! tutorlane CLI and REST API entry point.
//!
//! Parses CLI arguments, loads configuration, builds the turn pipeline, then
//! dispatches to the command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;
use tutorlane_observe::tracing_setup::{LogFormat, init_tracing, shutdown_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (format, otel) = match &cli.command {
        Commands::Serve { log_json, otel, .. } => {
            (if *log_json { LogFormat::Json } else { LogFormat::Pretty }, *otel)
        }
        _ => (LogFormat::Pretty, false),
    };
    init_tracing(cli::log_filter(cli.quiet, cli.verbose), format, otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions and answer checks don't need the pipeline
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(*shell, &mut cmd, "tutorlane", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Check {
            answer,
            expected,
            question_type,
            options,
        } => {
            return cli::check::check(answer, expected, question_type, options, cli.json);
        }
        _ => {}
    }

    let state = AppState::init(cli.config.clone()).await?;

    match cli.command {
        Commands::Serve { port, host, .. } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} tutorlane API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let maintenance = state.spawn_maintenance();
            let router = http::router::build_router(state.clone());

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            state.pipeline.shutdown();
            maintenance.abort();
            println!("\n  Server stopped.");
        }

        Commands::Ask {
            message,
            session,
            lesson,
            duration_ms,
            confidence,
        } => {
            let args = cli::ask::AskArgs {
                message,
                session,
                lesson,
                duration_ms,
                confidence,
            };
            cli::ask::ask(&state, args, cli.json, cli.quiet).await?;
        }

        Commands::Config => cli::config::show(&state, cli.json)?,

        Commands::Completions { .. } | Commands::Check { .. } => {}
    }

    state.flush_telemetry().await;
    shutdown_tracing();
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
