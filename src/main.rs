use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paisadrive::cli::{Cli, Commands};
use paisadrive::config::Config;
use paisadrive::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Ensure data directory exists
    std::fs::create_dir_all(&config.server.data_dir)?;

    // Initialize database
    let db = paisadrive::db::init(&config.server.data_dir).await?;

    if let Some(command) = cli.command {
        return run_command(command, &config, &db).await;
    }

    tracing::info!("Starting PaisaDrive v{}", env!("CARGO_PKG_VERSION"));

    // Ensure default admin user exists
    paisadrive::api::auth::ensure_admin_user(
        &db,
        &config.auth.admin_email,
        &config.auth.admin_password,
    )
    .await?;

    // Seed demo listings on a fresh database
    if config.site.seed_demo_cars {
        paisadrive::db::seed_demo_cars(&db).await?;
    }

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), db.clone()));

    // Sweep abandoned wizard sessions so the maps stay bounded
    let sweep_state = state.clone();
    let wizard_ttl = std::time::Duration::from_secs(config.site.wizard_ttl_minutes * 60);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            interval.tick().await;
            sweep_state.evict_stale_wizards(wizard_ttl);
        }
    });

    // Server-rendered site plus the JSON API
    let app = paisadrive::ui::create_router()
        .with_state(state.clone())
        .merge(paisadrive::api::create_router(state));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn run_command(command: Commands, config: &Config, db: &paisadrive::DbPool) -> Result<()> {
    match command {
        Commands::Sitemap { output, base_url } => {
            let base = base_url.as_deref().unwrap_or(&config.site.public_url);
            paisadrive::sitemap::write_to_file(db, base, &output).await?;
            println!("Sitemap written to {}", output.display());
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
