mod app;
mod config;
mod corpus;
mod lens;
mod util;

use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::Parser;
use env_logger::Env;

use crate::config::LensConfig;
use crate::corpus::GraphSource;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Semantic graph JSON file. Without it a synthetic demo graph is shown.
    #[arg(long)]
    graph: Option<PathBuf>,

    /// Keyword count of the demo graph.
    #[arg(long, default_value_t = 1200)]
    demo_keywords: usize,

    /// Lens configuration JSON file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Topic clustering resolution; higher values give more, smaller topics.
    #[arg(long)]
    resolution: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => LensConfig::load(path)?,
        None => LensConfig::default(),
    };
    if let Some(resolution) = args.resolution {
        config.topics.resolution = resolution;
        config.validate().context("invalid --resolution")?;
    }

    let source = match args.graph {
        Some(path) => GraphSource::File(path),
        None => GraphSource::Demo {
            keywords: args.demo_keywords,
        },
    };
    log::info!("starting viewer for {}", source.describe());

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "semantic-lens",
        options,
        Box::new(move |cc| Ok(Box::new(app::LensApp::new(cc, source, config)))),
    )
    .map_err(|error| anyhow!("viewer failed: {error}"))
}
