use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use graph::{render, summarize, GraphOptions};
use tracing::{info, Level};

/// Plot logged drowsiness scores over time.
#[derive(Parser)]
#[command(name = "drowsiness-graph")]
struct Cli {
    /// Score log written by the detection service.
    #[arg(default_value = "logs/drowsiness_log.csv")]
    log: PathBuf,

    /// Output PNG file.
    #[arg(short, long, default_value = "drowsiness_graph.png")]
    output: PathBuf,

    /// Image width in pixels.
    #[arg(long, default_value = "1800")]
    width: u32,

    /// Image height in pixels.
    #[arg(long, default_value = "900")]
    height: u32,

    /// Open the rendered chart in the system image viewer.
    #[arg(long)]
    show: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
    let cli = Cli::parse();

    let records = storage::read_records(&cli.log)
        .with_context(|| format!("failed to read score log {}", cli.log.display()))?;
    let summary = summarize(&records)
        .with_context(|| format!("nothing to plot in {}", cli.log.display()))?;
    info!(
        "{} records ({} drowsy), scores {} to {}",
        summary.records, summary.drowsy, summary.min_score, summary.max_score
    );

    let options = GraphOptions {
        width: cli.width,
        height: cli.height,
        ..Default::default()
    };
    render(&records, &cli.output, &options)
        .with_context(|| format!("failed to render {}", cli.output.display()))?;
    info!("Graph saved to {}", cli.output.display());

    if cli.show {
        open::that(&cli.output)
            .with_context(|| format!("failed to open {}", cli.output.display()))?;
    }

    Ok(())
}
