use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use eframe::egui;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use nn_dashboard::client::SourceClient;
use nn_dashboard::{Dashboard, DashboardApp, DashboardConfig, MockApi};

#[derive(Debug, Parser)]
#[command(name = "nn-dashboard", about = "Interactive neural network dashboard")]
struct Cli {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Network id to fetch
    #[arg(long)]
    network: Option<String>,

    /// Where exports are written
    #[arg(long)]
    export_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = DashboardConfig::load(cli.config.as_deref()).context("loading config")?;
    if let Some(network) = cli.network {
        config.network_id = network;
    }
    if let Some(dir) = cli.export_dir {
        config.export_dir = dir;
    }
    config.validate()?;
    info!("starting dashboard for {}", config.network_id);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .build()
        .context("building tokio runtime")?;

    let client = SourceClient::new(MockApi::new(&config), runtime.handle().clone(), config.network_id.clone());
    let dashboard = Dashboard::new(&config, client, StdRng::from_entropy());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native(
        "NN Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(DashboardApp::new(dashboard)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe failed: {e}"))?;

    // runtime lives until the window closes
    drop(runtime);
    Ok(())
}
