// src/main.rs
mod config;
mod console;
mod drivers;
mod engine;
mod gui;
mod recorder;
mod simulator;
mod types;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::channel;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use eframe::egui;

use crate::config::RunConfig;
use crate::drivers::plot::MAX_DPI;
use crate::drivers::{FigureSurface, OutputPaths};
use crate::engine::{RunPlan, RunSummary};
use crate::types::ConnectionMode;

#[derive(Parser, Debug)]
#[command(
    name = "emg-recorder",
    about = "Record two-channel EMG gestures from an ESP32 into CSV tables and charts"
)]
struct Cli {
    /// Serial port the ESP32 is attached to
    #[arg(short, long, default_value = "COM5")]
    port: String,
    #[arg(short, long, default_value_t = 115_200)]
    baud: u32,
    /// JSON file overriding timing, calibration and the gesture list
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "data_raw")]
    data_dir: PathBuf,
    #[arg(long, default_value = "graphs")]
    graph_dir: PathBuf,
    /// Resolution of the saved charts
    #[arg(long, default_value_t = 200)]
    dpi: u32,
    /// Use a synthetic signal instead of the serial port
    #[arg(long)]
    simulate: bool,
    /// Lines per second produced by --simulate
    #[arg(long, default_value_t = simulator::DEFAULT_SAMPLE_RATE_HZ)]
    sample_rate: f64,
    /// No live window; charts are still saved
    #[arg(long)]
    headless: bool,
    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<RunConfig> {
        let config = match &self.config {
            Some(path) => RunConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => RunConfig::default(),
        };
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    fn into_plan(self, config: RunConfig) -> anyhow::Result<RunPlan> {
        if self.dpi == 0 || self.dpi > MAX_DPI {
            return Err(anyhow!("--dpi must be between 1 and {MAX_DPI}"));
        }
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(anyhow!("--sample-rate must be > 0"));
        }
        let mode = if self.simulate {
            ConnectionMode::Simulation
        } else {
            ConnectionMode::Hardware
        };
        Ok(RunPlan {
            config,
            paths: OutputPaths {
                data_dir: self.data_dir,
                graph_dir: self.graph_dir,
            },
            dpi: self.dpi,
            mode,
            port: self.port,
            baud_rate: self.baud,
            sample_rate_hz: self.sample_rate,
        })
    }
}

// 第一次 Ctrl-C 让采集正常收尾, 第二次直接退出
fn install_signal_handler() -> anyhow::Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(&shutdown))
            .with_context(|| format!("failed to register forced exit for signal {signal}"))?;
        signal_hook::flag::register(signal, Arc::clone(&shutdown))
            .with_context(|| format!("failed to register handler for signal {signal}"))?;
    }
    Ok(shutdown)
}

fn report(summary: &RunSummary) {
    if summary.interrupted {
        log::warn!(
            "interrupted; {} gesture(s) recorded, {} samples kept",
            summary.gestures.len(),
            summary.total_samples()
        );
    }
    let empty = summary.empty_gestures();
    if !empty.is_empty() {
        log::warn!("no data captured for: {}", empty.join(", "));
    }
}

// 入口函数
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = cli.load_config()?;
    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }
    let headless = cli.headless;
    let plan = cli.into_plan(config)?;
    let shutdown = install_signal_handler()?;

    if headless {
        let summary = engine::execute(&plan, &mut FigureSurface::new(), shutdown)?;
        report(&summary);
        return Ok(());
    }

    // 采集在后台线程, 窗口必须在主线程
    let (tx, rx) = channel();
    let worker = engine::spawn_thread(plan, tx, shutdown);
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 600.0])
            .with_min_inner_size([640.0, 400.0])
            .with_title("EMG Recording"),
        ..Default::default()
    };
    if let Err(e) = eframe::run_native(
        "EMG Recorder",
        options,
        Box::new(|_cc| Box::new(gui::EmgViewerApp::new(rx))),
    ) {
        log::warn!("live window unavailable ({e}); recording continues in the terminal");
    }
    let summary = worker
        .join()
        .map_err(|_| anyhow!("recording thread panicked"))??;
    report(&summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_bench_setup() {
        let cli = Cli::parse_from(["emg-recorder"]);
        assert_eq!(cli.port, "COM5");
        assert_eq!(cli.baud, 115_200);
        assert_eq!(cli.dpi, 200);
        assert!(!cli.simulate && !cli.headless);
        let plan = cli.into_plan(RunConfig::default()).unwrap();
        assert_eq!(plan.mode, ConnectionMode::Hardware);
        assert_eq!(plan.paths.table_path("fist"), PathBuf::from("data_raw").join("fist.csv"));
    }

    #[test]
    fn signal_flag_starts_lowered() {
        let shutdown = install_signal_handler().unwrap();
        assert!(!shutdown.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn rejects_out_of_range_dpi() {
        let cli = Cli::parse_from(["emg-recorder", "--simulate", "--dpi", "0"]);
        assert!(cli.into_plan(RunConfig::default()).is_err());
    }
}
