use anyhow::{Context, Result};
use clap::Parser;
use docgist::{config, env_loader, server};

#[derive(Parser)]
#[command(
    name = "docgist",
    version,
    about = "LLM document summarization and grounded Q&A service"
)]
struct Cli {
    /// Bind address, overriding the configured host.
    #[arg(long)]
    host: Option<String>,
    /// Bind port, overriding the configured port.
    #[arg(long)]
    port: Option<u16>,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("docgist=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = config::load_config()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if config.completion.api_key.is_empty() {
        tracing::warn!("no completion API key configured; upstream calls will be rejected");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = server::AppState::from_config(config)?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "docgist listening");
    axum::serve(listener, server::build_router(state))
        .await
        .context("server terminated")?;
    Ok(())
}

#[tokio::main]
async fn main() {
    env_loader::load_dotenv();
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
