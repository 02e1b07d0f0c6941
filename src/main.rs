use anyhow::Result;
use clap::Parser;
use painel::{loader, server};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 8050;

#[derive(Parser, Debug)]
#[command(name = "painel")]
#[command(about = "Interactive analytics dashboard over an e-commerce product CSV", long_about = None)]
struct Args {
    /// Path to the product dataset
    #[arg(long, default_value = "ecommerce_estatistica.csv")]
    data: PathBuf,

    /// Bind host
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Bind port (falls back to the PORT env var, then 8050)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load is a one-shot startup operation; a missing dataset is fatal
    // before anything is served.
    let table = match loader::load_and_clean(&args.data) {
        Ok(table) => table,
        Err(err) => {
            eprintln!("ERRO: {err:#}");
            std::process::exit(1);
        }
    };
    tracing::info!(rows = table.len(), "dataset cleaned");

    let state = server::AppState::new(table)?;

    let port = args
        .port
        .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
        .unwrap_or(DEFAULT_PORT);
    let addr = format!("{}:{}", args.host, port);

    server::serve(state, &addr).await
}
