//! Builds the initial cell dataset from a raw coordinate export.
//!
//! Reads a JSON array of `{row, col}` records and writes every cell as
//! `inactive` with no modification time, in the pretty-printed layout the
//! server's file store uses.

use std::path::PathBuf;

use clap::Parser;
use hexgrid_store::{JsonFileStore, read_coordinates, seed_cells};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "hexgrid-seed", about = "Seed the hexagon dataset from raw coordinates")]
struct Args {
    /// Raw coordinate export.
    #[arg(long, default_value = "data.json")]
    input: PathBuf,

    /// Dataset file to write (replaced if it exists).
    #[arg(long, default_value = "dataWithStatus.json")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let coordinates = read_coordinates(&args.input).await?;
    let cells = seed_cells(&coordinates)?;
    let store = JsonFileStore::create(&args.output, &cells).await?;

    info!(
        input = %args.input.display(),
        output = %store.path().display(),
        cells = cells.len(),
        "Seeded hexagon dataset"
    );
    Ok(())
}
