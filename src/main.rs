mod app;
mod config;
mod data;
mod layout;
mod projection;
mod scale;
mod session;
mod util;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use env_logger::Env;
use log::{info, trace, warn};
use serde::Serialize;

use crate::config::Config;
use crate::projection::AlbersUsa;
use crate::session::{LayoutSession, Metric};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// GeoJSON collection of state centroids
    #[arg(long, default_value = "data/us-states-centroids.json")]
    shapes: PathBuf,
    /// CSV with `id`, `toal_pop` and `median_income` columns
    #[arg(long, default_value = "data/acs_pop_income.csv")]
    table: PathBuf,
    /// Optional JSON file overriding the built-in configuration
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Metric::Population)]
    metric: Metric,
    /// Run the layout to convergence and print it as JSON instead of opening a window
    #[arg(long)]
    headless: bool,
    #[arg(long, default_value_t = 10_000)]
    max_ticks: u64,
}

#[derive(Serialize)]
struct SettledLayout<'a> {
    metric: Metric,
    ticks: u64,
    nodes: Vec<SettledNode<'a>>,
}

#[derive(Serialize)]
struct SettledNode<'a> {
    id: &'a str,
    name: &'a str,
    x: f32,
    y: f32,
    x0: f32,
    y0: f32,
    r: f32,
    value: f64,
}

impl<'a> SettledLayout<'a> {
    fn from_session(session: &'a LayoutSession) -> Self {
        Self {
            metric: session.metric(),
            ticks: session.simulation().ticks(),
            nodes: session
                .nodes()
                .iter()
                .map(|node| SettledNode {
                    id: &node.id,
                    name: &node.name,
                    x: node.position.x,
                    y: node.position.y,
                    x0: node.anchor().x,
                    y0: node.anchor().y,
                    r: node.radius,
                    value: node.value,
                })
                .collect(),
        }
    }
}

fn print_settled(session: &mut LayoutSession, max_ticks: u64) -> Result<()> {
    let ticks = session.run_to_convergence(max_ticks, |event| {
        trace!(
            "tick {} alpha {:.4} across {} nodes",
            event.tick,
            event.alpha,
            event.nodes.len()
        );
    });
    if session.is_settling() {
        warn!("layout still moving after {ticks} ticks");
    }

    let layout = SettledLayout::from_session(session);
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &layout).context("failed to write layout")?;
    writeln!(stdout).context("failed to write layout")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    let regions = data::load_regions(&args.shapes, &args.table)?;
    let projection = AlbersUsa::from_config(&config.projection);
    let mut session = LayoutSession::new(
        regions,
        |lon, lat| projection.project(lon, lat),
        &config,
        args.metric,
    )?;

    if args.headless {
        return print_settled(&mut session, args.max_ticks);
    }

    info!("opening viewer");
    let viewer = config.viewer;
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([viewer.width, viewer.height]),
        ..Default::default()
    };

    eframe::run_native(
        "cartogram",
        options,
        Box::new(move |cc| Ok(Box::new(app::CartogramApp::new(cc, session, viewer)))),
    )
    .map_err(|error| anyhow!("viewer exited with an error: {error}"))
}
