//! `faq`: search and maintain the FAQ knowledge base.
//!
//! Usage:
//!   faq search "lupa password" --tag OPD
//!   faq ask "@faq cara cetak SEP"
//!   faq add --tag ED --title "Triage" --answer "Lihat [GAMBAR 1]" --images ./images/ED/triage.jpg
//!   faq failed list

use anyhow::Result;
use clap::Parser;
use faq_cli::{App, Cli, FaqConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine; the key may come from the real environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = FaqConfig::load(cli.config.as_deref())?;
    let app = App::open(config).await?;
    app.run(cli.command).await
}
