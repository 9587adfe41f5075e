use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use crate::config::SessionConfig;
use crate::console::{repetition_banner, OperatorConsole};
use crate::drivers::{
    parse_dual_channel, repetition_for, Clock, FrozenBuffer, LineTransport, LiveSink,
    RenderSurface, SampleBuffer,
};
use crate::types::{GestureDefinition, Sample, SessionState};
/// Pause between loop iterations so the transport and the window get a turn.
pub const LOOP_YIELD: Duration = Duration::from_millis(1);
/// Counters describing how one recording went.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub lines_read: usize,
    pub parse_failures: usize,
    pub read_faults: usize,
    pub live_publishes: usize,
    pub surface_faults: usize,
}
/// Output of a completed session, ready for export.
#[derive(Debug)]
pub struct RecordedGesture {
    pub gesture: GestureDefinition,
    pub buffer: FrozenBuffer,
    pub stats: SessionStats,
    /// The shutdown flag was raised before the window ran out.
    pub interrupted: bool,
}
/// Records one gesture: waits for the operator, then reads the transport for
/// exactly `total_duration` seconds, tagging each sample with its repetition.
///
/// `Idle → AwaitingStart → Recording → Draining → Complete`
pub struct AcquisitionSession<'a> {
    gesture: &'a GestureDefinition,
    config: &'a SessionConfig,
    state: SessionState,
    buffer: SampleBuffer,
    live: LiveSink,
    current_rep: u32,
    stats: SessionStats,
    last_fault: Option<String>,
    shutdown: Option<Arc<AtomicBool>>,
    stopped_early: bool,
}
impl<'a> AcquisitionSession<'a> {
    pub fn new(gesture: &'a GestureDefinition, config: &'a SessionConfig) -> Self {
        Self {
            gesture,
            config,
            state: SessionState::Idle,
            buffer: SampleBuffer::new(),
            live: LiveSink::new(config.refresh_interval, config.total_duration()),
            current_rep: 1,
            stats: SessionStats::default(),
            last_fault: None,
            shutdown: None,
            stopped_early: false,
        }
    }
    /// Stops recording early once `flag` is set (SIGINT/SIGTERM).
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }
    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.state
    }
    fn enter(&mut self, next: SessionState) {
        log::trace!("'{}': {:?} -> {:?}", self.gesture.key, self.state, next);
        self.state = next;
    }
    fn interrupted(&self) -> bool {
        self.shutdown
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::SeqCst))
    }
    /// Runs the whole state machine. Nothing in here aborts early: read
    /// faults, unparseable lines and surface errors are absorbed.
    pub fn run<T, C, S, O>(
        mut self,
        transport: &mut T,
        clock: &C,
        surface: &mut S,
        console: &mut O,
    ) -> RecordedGesture
    where
        T: LineTransport + ?Sized,
        C: Clock + ?Sized,
        S: RenderSurface + ?Sized,
        O: OperatorConsole + ?Sized,
    {
        self.announce(surface, console);
        let start = self.await_start(transport, clock, console);
        self.record(transport, clock, surface, console, start);
        self.drain(clock, surface, console, start);
        self.complete()
    }
    fn announce<S, O>(&mut self, surface: &mut S, console: &mut O)
    where
        S: RenderSurface + ?Sized,
        O: OperatorConsole + ?Sized,
    {
        console.notify(&format!(
            "\n=== Gesture: {} ===",
            self.gesture.key.to_uppercase()
        ));
        console.notify(&format!("Meaning: {}", self.gesture.description));
        if let Err(e) = surface.set_title(&chart_title(&self.gesture.key, self.config)) {
            log::debug!("could not set chart title: {e}");
        }
    }
    /// Blocks on the operator, then flushes stale input and fixes the start time.
    fn await_start<T, C, O>(&mut self, transport: &mut T, clock: &C, console: &mut O) -> f64
    where
        T: LineTransport + ?Sized,
        C: Clock + ?Sized,
        O: OperatorConsole + ?Sized,
    {
        self.enter(SessionState::AwaitingStart);
        let cfg = self.config;
        console.await_ready(&format!(
            "\n👉 Prepare for '{}'. Press Enter to start continuous recording ({} reps × {}s = {}s)...",
            self.gesture.key,
            cfg.repetitions,
            cfg.duration_per_repetition,
            cfg.total_duration()
        ));
        console.notify(&format!(
            "Starting continuous recording for gesture '{}' ({}s total)...",
            self.gesture.key,
            cfg.total_duration()
        ));
        if let Err(e) = transport.clear_input() {
            log::warn!("could not clear stale input before '{}': {e}", self.gesture.key);
        }
        let start = clock.now_seconds();
        self.enter(SessionState::Recording);
        self.current_rep = 1;
        console.notify(&repetition_banner(
            1,
            cfg.repetitions,
            cfg.duration_per_repetition,
        ));
        log::info!(
            "recording '{}' for {}s",
            self.gesture.key,
            cfg.total_duration()
        );
        start
    }
    fn record<T, C, S, O>(
        &mut self,
        transport: &mut T,
        clock: &C,
        surface: &mut S,
        console: &mut O,
        start: f64,
    ) where
        T: LineTransport + ?Sized,
        C: Clock + ?Sized,
        S: RenderSurface + ?Sized,
        O: OperatorConsole + ?Sized,
    {
        let total = self.config.total_duration();
        while clock.now_seconds() - start < total {
            if self.interrupted() {
                self.stopped_early = true;
                log::warn!(
                    "'{}' interrupted after {:.3}s",
                    self.gesture.key,
                    clock.now_seconds() - start
                );
                break;
            }
            self.drain_available(transport, clock, console, start);
            self.live
                .maybe_publish(surface, &self.buffer, clock.now_seconds());
            clock.pause(LOOP_YIELD);
        }
        self.enter(SessionState::Draining);
    }
    /// Reads every line that is already waiting, stopping at the deadline.
    fn drain_available<T, C, O>(&mut self, transport: &mut T, clock: &C, console: &mut O, start: f64)
    where
        T: LineTransport + ?Sized,
        C: Clock + ?Sized,
        O: OperatorConsole + ?Sized,
    {
        let total = self.config.total_duration();
        while clock.now_seconds() - start < total && !self.interrupted() {
            match transport.bytes_available() {
                Ok(true) => {}
                Ok(false) => return,
                Err(e) => {
                    self.report_fault(console, format!("Error while polling serial data: {e}"));
                    return;
                }
            }
            match transport.read_line() {
                Ok(Some(line)) => {
                    self.stats.lines_read += 1;
                    let elapsed = clock.now_seconds() - start;
                    self.ingest(&line, elapsed, console);
                }
                Ok(None) => return,
                Err(e) => {
                    self.report_fault(console, format!("Error while reading serial data: {e}"));
                    return;
                }
            }
        }
    }
    fn ingest<O>(&mut self, line: &str, elapsed: f64, console: &mut O)
    where
        O: OperatorConsole + ?Sized,
    {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        let Some((channel1_raw, channel2_raw)) = parse_dual_channel(line) else {
            self.stats.parse_failures += 1;
            log::trace!("skipping unparseable line {line:?}");
            return;
        };
        let elapsed = match self.buffer.last() {
            Some(prev) => elapsed.max(prev.elapsed_seconds),
            None => elapsed.max(0.0),
        };
        let cfg = self.config;
        let repetition = repetition_for(elapsed, cfg.duration_per_repetition, cfg.repetitions);
        if repetition != self.current_rep {
            self.current_rep = repetition;
            console.repetition_changed(repetition, cfg.repetitions, cfg.duration_per_repetition);
        }
        self.buffer.push(Sample {
            elapsed_seconds: elapsed,
            channel1_raw,
            channel2_raw,
            repetition,
        });
    }
    /// Identical consecutive faults (an unplugged cable) are only logged.
    fn report_fault<O>(&mut self, console: &mut O, message: String)
    where
        O: OperatorConsole + ?Sized,
    {
        self.stats.read_faults += 1;
        if self.last_fault.as_deref() == Some(message.as_str()) {
            log::debug!("{message} (repeated)");
            return;
        }
        console.warn(&message);
        self.last_fault = Some(message);
    }
    fn drain<C, S, O>(&mut self, clock: &C, surface: &mut S, console: &mut O, start: f64)
    where
        C: Clock + ?Sized,
        S: RenderSurface + ?Sized,
        O: OperatorConsole + ?Sized,
    {
        self.live
            .publish_final(surface, &self.buffer.snapshot(), clock.now_seconds());
        self.stats.live_publishes = self.live.publishes();
        self.stats.surface_faults = self.live.surface_faults();
        if self.stopped_early {
            console.warn("Recording interrupted; keeping what was captured for this gesture.");
        } else {
            console.notify("Done. Continuous recording finished for this gesture.");
        }
        log::info!(
            "'{}' finished after {:.3}s: {} samples, {} lines, {} unparseable, {} read faults",
            self.gesture.key,
            clock.now_seconds() - start,
            self.buffer.len(),
            self.stats.lines_read,
            self.stats.parse_failures,
            self.stats.read_faults
        );
    }
    fn complete(mut self) -> RecordedGesture {
        self.enter(SessionState::Complete);
        RecordedGesture {
            gesture: self.gesture.clone(),
            buffer: self.buffer.freeze(),
            stats: self.stats,
            interrupted: self.stopped_early,
        }
    }
}
/// Title shown on the live window and the saved chart.
pub fn chart_title(key: &str, config: &SessionConfig) -> String {
    format!(
        "EMG Recording — {key} — {} reps × {}s = {}s",
        config.repetitions,
        config.duration_per_repetition,
        config.total_duration()
    )
}
