//! Precis server - style-conditioned webpage summarisation
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments, wiring the components together, and handling
//! top-level errors.

use clap::Parser;
use precis::backend;
use precis::config::Config;
use precis::extract::WebExtractor;
use precis::history::HistoryStore;
use precis::pipeline::Pipeline;
use precis::server::{self, AppState};
use precis::style::StyleStore;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "precis")]
#[command(author, version, about = "Web article summarisation service", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides configuration)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "precis=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let port = cli.port.unwrap_or(config.server.port);

    let db = sled::open(&config.storage.path)?;
    let styles = Arc::new(StyleStore::open(&db)?);
    styles.seed_defaults()?;
    let history = Arc::new(HistoryStore::open(&db)?);

    let extractor = Arc::new(WebExtractor::new()?);
    let backend = backend::from_config(&config, styles.clone())?;

    let pipeline = Arc::new(Pipeline::new(
        extractor,
        styles.clone(),
        history.clone(),
        backend,
        config.pipeline.default_style.clone(),
    ));

    let state = AppState {
        pipeline,
        styles,
        history,
    };
    server::serve(state, port).await
}
