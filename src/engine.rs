// src/engine.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Context;

use crate::config::RunConfig;
use crate::console::{OperatorConsole, TerminalConsole};
use crate::drivers::{
    AcquisitionError, AcquisitionSession, Clock, ExportOutcome, Exporter, LineTransport,
    OutputPaths, RecordedGesture, RenderSurface, SerialTransport, SessionStats, SystemClock,
    TransportGuard,
};
use crate::gui::LiveSurface;
use crate::simulator::{SimulatedTransport, SimulationProfile};
use crate::types::*;

/// What happened to one gesture of the catalog.
#[derive(Debug)]
pub struct GestureReport {
    pub key: String,
    pub samples: usize,
    /// Sample count per repetition, index 0 is repetition 1.
    pub per_repetition: Vec<usize>,
    pub stats: SessionStats,
    pub outcome: ExportOutcome,
}

impl GestureReport {
    fn new(recorded: &RecordedGesture, repetitions: u32, outcome: ExportOutcome) -> Self {
        Self {
            key: recorded.gesture.key.clone(),
            samples: recorded.buffer.len(),
            per_repetition: recorded.buffer.repetition_counts(repetitions),
            stats: recorded.stats.clone(),
            outcome,
        }
    }

    fn log(&self) {
        log::info!(
            "'{}': {} samples, per repetition {:?}",
            self.key,
            self.samples,
            self.per_repetition
        );
        let stats = &self.stats;
        log::debug!(
            "'{}': {} lines read, {} unparseable, {} read faults, {} live updates, {} window faults",
            self.key,
            stats.lines_read,
            stats.parse_failures,
            stats.read_faults,
            stats.live_publishes,
            stats.surface_faults
        );
        if let Some(rep) = self.per_repetition.iter().position(|n| *n == 0) {
            log::warn!("'{}': repetition {} captured no samples", self.key, rep + 1);
        }
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub gestures: Vec<GestureReport>,
    /// Stopped by the shutdown flag; later gestures never ran.
    pub interrupted: bool,
}

impl RunSummary {
    pub fn total_samples(&self) -> usize {
        self.gestures.iter().map(|g| g.samples).sum()
    }

    pub fn empty_gestures(&self) -> Vec<&str> {
        self.gestures
            .iter()
            .filter(|g| g.outcome == ExportOutcome::Empty)
            .map(|g| g.key.as_str())
            .collect()
    }
}

/// Runs every gesture of the catalog, in order, over one transport.
pub struct Orchestrator<'a> {
    config: &'a RunConfig,
    paths: &'a OutputPaths,
    dpi: u32,
    shutdown: Arc<AtomicBool>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a RunConfig, paths: &'a OutputPaths, dpi: u32) -> Self {
        Self {
            config,
            paths,
            dpi,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop at the next loop turn once `flag` is set (SIGINT/SIGTERM).
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Opening the transport is the only failure that aborts the run; it is
    /// closed exactly once afterwards, whichever way this returns. A raised
    /// shutdown flag ends the run early, after exporting what the current
    /// gesture captured.
    pub fn run<T, F, C, S, O>(
        &self,
        open: F,
        clock: &C,
        surface: &mut S,
        console: &mut O,
    ) -> Result<RunSummary, AcquisitionError>
    where
        F: FnOnce() -> Result<T, AcquisitionError>,
        T: LineTransport,
        C: Clock + ?Sized,
        S: RenderSurface + ?Sized,
        O: OperatorConsole + ?Sized,
    {
        self.config.validate()?;
        console.notify("🔌 Connecting to the EMG source...");
        let opened = match open() {
            Ok(opened) => opened,
            Err(e) => {
                console.warn(&format!("❌ Could not open the EMG source: {e}"));
                return Err(e);
            }
        };
        console.notify("✅ Connected.");
        let mut transport = TransportGuard::new(opened);
        let session_config = &self.config.session;
        let exporter = Exporter::new(session_config, self.paths, self.dpi);
        let mut summary = RunSummary::default();

        for gesture in &self.config.gestures {
            if self.stopping() {
                summary.interrupted = true;
                break;
            }
            let Some(link) = transport.get_mut() else {
                return Err(AcquisitionError::TransportClosed);
            };
            let recorded = AcquisitionSession::new(gesture, session_config)
                .with_shutdown(Arc::clone(&self.shutdown))
                .run(link, clock, surface, console);
            let outcome = exporter.export(&recorded.buffer, &gesture.key, surface, console);
            let report = GestureReport::new(&recorded, session_config.repetitions, outcome);
            report.log();
            summary.gestures.push(report);
            if recorded.interrupted {
                summary.interrupted = true;
                break;
            }
        }

        transport.close();
        if summary.interrupted {
            console.warn("Recording interrupted; remaining gestures skipped.");
            log::warn!(
                "run interrupted after {} of {} gestures",
                summary.gestures.len(),
                self.config.gestures.len()
            );
            return Ok(summary);
        }
        console.notify(&format!(
            "\n🎉 All recordings complete! Files saved in '{}/' and graphs in '{}/'.\n",
            self.paths.data_dir.display(),
            self.paths.graph_dir.display()
        ));
        log::info!(
            "run finished: {} gestures, {} samples",
            summary.gestures.len(),
            summary.total_samples()
        );
        Ok(summary)
    }
}

/// Everything the binary decided before recording starts.
#[derive(Clone, Debug)]
pub struct RunPlan {
    pub config: RunConfig,
    pub paths: OutputPaths,
    pub dpi: u32,
    pub mode: ConnectionMode,
    pub port: String,
    pub baud_rate: u32,
    pub sample_rate_hz: f64,
}

impl RunPlan {
    fn source_name(&self) -> String {
        match self.mode {
            ConnectionMode::Hardware => format!("{} @ {} baud", self.port, self.baud_rate),
            ConnectionMode::Simulation => "simulated source".to_owned(),
        }
    }
}

fn open_transport(
    plan: &RunPlan,
    clock: SystemClock,
) -> Result<Box<dyn LineTransport>, AcquisitionError> {
    match plan.mode {
        ConnectionMode::Hardware => Ok(Box::new(SerialTransport::open(
            &plan.port,
            plan.baud_rate,
        )?)),
        ConnectionMode::Simulation => {
            let profile = SimulationProfile::for_session(&plan.config.session, plan.sample_rate_hz);
            Ok(Box::new(SimulatedTransport::new(clock, profile)))
        }
    }
}

/// Runs the whole catalog against the terminal console and the wall clock.
pub fn execute<S>(
    plan: &RunPlan,
    surface: &mut S,
    shutdown: Arc<AtomicBool>,
) -> anyhow::Result<RunSummary>
where
    S: RenderSurface + ?Sized,
{
    let clock = SystemClock::new();
    let mut console = TerminalConsole::stdin();
    let orchestrator =
        Orchestrator::new(&plan.config, &plan.paths, plan.dpi).with_shutdown(shutdown);
    let summary = orchestrator
        .run(|| open_transport(plan, clock), &clock, surface, &mut console)
        .with_context(|| format!("recording run on {} failed", plan.source_name()))?;
    Ok(summary)
}

// 后台采集线程, 实时数据通过 tx 发给界面
pub fn spawn_thread(
    plan: RunPlan,
    tx: Sender<ViewerMessage>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<anyhow::Result<RunSummary>> {
    thread::spawn(move || {
        let mut surface = LiveSurface::new(tx);
        execute(&plan, &mut surface, shutdown)
    })
}
