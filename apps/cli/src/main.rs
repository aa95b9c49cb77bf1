//! DocCapture CLI: capture a documentation SPA as portable Markdown.
//!
//! Walks the site's navigation in a real browser, saves each page's content
//! region, downloads its images, and writes a localized copy alongside.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
