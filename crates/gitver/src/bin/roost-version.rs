//! roost-version — prints the resolved deployment version.
//!
//! Reads `project.toml` for the tracked branch and replay parameters, then
//! resolves the semantic version, commit hashes, and head timestamp.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "roost-version", version, about)]
struct Cli {
    /// Path to the project configuration file.
    #[arg(long, default_value = "project.toml")]
    config: String,

    /// Emit the full tuple as JSON instead of one line of text.
    #[arg(long)]
    json: bool,
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
    let config = roost_core::Config::load(&cli.config)?.config;

    let version = roost_gitver::resolve(
        &config.repo_root,
        &config.git_branch,
        &config.start_commit,
        config.base_version,
    )
    .await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&version)?);
    } else {
        println!(
            "v{} ({} / {}) @ {}",
            version.semantic, version.commit, version.commit_full, version.timestamp
        );
    }
    Ok(())
}
