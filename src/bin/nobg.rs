//! nobg command line tool
//!
//! Removes the background from an image and writes the standard and HD PNG
//! downloads.

use nobg::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}
