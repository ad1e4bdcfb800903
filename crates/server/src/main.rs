mod state;
mod sync;
mod webhook;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use roost_host::{BotLifecycleManager, ExtensionRegistry};
use roost_reload::ReloadOrchestrator;

use crate::state::AppState;
use crate::sync::GitSync;

#[derive(Parser, Debug)]
#[command(name = "roost-server", version, about)]
struct Cli {
    /// Path to the project configuration file.
    #[arg(long, default_value = "project.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    roost_core::config::load_dotenv();
    let config = roost_core::Config::load(&cli.config)?;
    config.log_summary();
    let config = config.config;

    match roost_gitver::resolve(
        &config.repo_root,
        &config.git_branch,
        &config.start_commit,
        config.base_version,
    )
    .await
    {
        Ok(version) => info!(
            "roost v{} ({}) @ {}",
            version.semantic, version.commit, version.timestamp
        ),
        Err(e) => warn!("version resolution failed: {e}"),
    }

    // Bring up every enabled bot.
    let registry = Arc::new(ExtensionRegistry::discover(&config.repo_root));
    let manager = Arc::new(BotLifecycleManager::new(config.clone(), registry));
    manager.start_all().await?;

    // Webhook gate.
    let sync = Arc::new(GitSync::new(config.repo_root.clone(), config.git_branch.clone()));
    let app = webhook::build_router(Arc::new(AppState::new(config.github_secret.clone(), sync)));
    let addr = format!("{}:{}", config.webhook_host, config.webhook_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("webhook listening on {addr}");
    tokio::spawn(async move {
        if let Err(e) =
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await
        {
            error!("webhook server failed: {e}");
        }
    });

    // Change monitor. A fatal change terminates the process; the external
    // supervisor restarts it with the new framework code.
    let orchestrator =
        ReloadOrchestrator::new(manager, config.repo_root.clone(), config.live_reload);
    if let Some(fatal) = orchestrator.run().await? {
        info!(path = %fatal.path, "severe change; exiting for supervisor restart");
        std::process::exit(0);
    }

    // Live reload disabled: nothing left to drive here, keep serving the
    // webhook and the bot run loops.
    std::future::pending::<()>().await;
    Ok(())
}
