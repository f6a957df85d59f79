// ABOUTME: Entry point for pilot, a chat agent that inspects and manages a Linux host.
// ABOUTME: Parses CLI args, loads config and secrets, sets up logging, and launches the app.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hostpilot::app::App;
use hostpilot::config::Config;

#[derive(Parser, Debug)]
#[command(name = "pilot", about = "Chat with an agent that manages a Linux host")]
struct Cli {
    /// Config file (defaults to ~/.hostpilot/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model name, overriding config
    #[arg(long)]
    model: Option<String>,

    /// OpenAI-compatible API base URL, overriding config
    #[arg(long)]
    base_url: Option<String>,

    /// Run commands on this host over ssh instead of locally
    #[arg(long)]
    host: Option<String>,

    /// Tool rounds allowed per turn before the model must answer
    #[arg(long)]
    max_iterations: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    dotenvy::from_path(Config::secrets_env_path()).ok();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env();

    if let Some(model) = cli.model {
        config.llm.model = model;
    }
    if let Some(base_url) = cli.base_url {
        config.llm.base_url = base_url;
    }
    if let Some(host) = cli.host {
        config.target.ssh_host = Some(host);
    }
    if let Some(max_iterations) = cli.max_iterations {
        config.agent.max_iterations = max_iterations;
    }

    // Logs go to stderr so they never interleave with the streamed reply.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    App::new(config).run().await
}
