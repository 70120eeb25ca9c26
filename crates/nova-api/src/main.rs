//! Nova CLI and REST API entry point.
//!
//! Binary name: `nova`
//!
//! Parses CLI arguments, initializes database and services, then either
//! provisions a user or starts the REST API server.

mod http;
mod state;

use clap::{Parser, Subcommand};
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use nova_core::profile::repository::ProfileRepository;
use nova_types::error::RepositoryError;
use nova_types::user::UserProfile;

use state::AppState;

#[derive(Parser)]
#[command(name = "nova", about = "Nova AI chat service", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, default_value_t = 3000, env = "NOVA_PORT")]
        port: u16,

        /// Export spans via OpenTelemetry (stdout exporter)
        #[arg(long)]
        otel: bool,
    },

    /// Provision a user and print their API key
    CreateUser {
        /// Email address of the new user
        email: String,
    },

    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "nova", &mut std::io::stdout());
        return Ok(());
    }

    match cli.command {
        Commands::Serve { host, port, otel } => {
            nova_observe::tracing_setup::init_tracing(otel)
                .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

            let state = AppState::init(true).await?;

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Nova API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            nova_observe::tracing_setup::shutdown_tracing();
            println!("\n  Server stopped.");
        }

        Commands::CreateUser { email } => {
            // Set up tracing based on verbosity
            let filter = match cli.verbose {
                0 if cli.quiet => "error",
                0 => "warn",
                1 => "info,nova=debug",
                _ => "trace",
            };
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new(filter))
                .with_target(false)
                .init();

            let email = email.trim().to_lowercase();
            if !email.contains('@') {
                anyhow::bail!("'{email}' does not look like an email address");
            }

            let state = AppState::init(false).await?;

            let profile = UserProfile::new(email.clone());
            match state.profiles.create(&profile).await {
                Ok(()) => {}
                Err(RepositoryError::Conflict(msg)) => anyhow::bail!(msg),
                Err(e) => return Err(e.into()),
            }

            let api_key = http::extractors::auth::create_api_key(&state, &profile.id).await?;

            println!();
            println!(
                "  {} User {} created",
                console::style("✓").green(),
                console::style(&email).cyan()
            );
            println!();
            println!(
                "  {} API key (save this -- it won't be shown again):",
                console::style("🔑").bold()
            );
            println!();
            println!("  {}", console::style(&api_key).yellow().bold());
            println!();
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

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
