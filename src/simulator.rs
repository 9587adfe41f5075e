// src/simulator.rs
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::SessionConfig;
use crate::drivers::{AcquisitionError, Clock, LineTransport};

pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 500.0;
/// A real UART FIFO overflows too; older lines past this are dropped.
const MAX_BACKLOG: u64 = 2048;

// 模拟信号参数
#[derive(Clone, Debug)]
pub struct SimulationProfile {
    pub sample_rate_hz: f64,
    pub duration_per_repetition: f64,
    pub adc_resolution: u32,
    pub noise: f64,
    pub burst: f64,
}

impl SimulationProfile {
    pub fn for_session(config: &SessionConfig, sample_rate_hz: f64) -> Self {
        let full_scale = config.adc_resolution as f64;
        Self {
            sample_rate_hz,
            duration_per_repetition: config.duration_per_repetition,
            adc_resolution: config.adc_resolution,
            noise: full_scale * 0.01,
            burst: full_scale * 0.25,
        }
    }

    fn baseline(&self) -> f64 {
        self.adc_resolution as f64 / 2.0
    }

    /// The first half of every repetition window is the "contract" phase.
    fn is_active(&self, t: f64) -> bool {
        let d = self.duration_per_repetition;
        d > 0.0 && (t % d) < d / 2.0
    }
}

/// Stands in for the ESP32: emits `EMG1:<n> EMG2:<n>` lines on a fixed
/// timeline driven by the clock.
pub struct SimulatedTransport<C: Clock> {
    clock: C,
    profile: SimulationProfile,
    rng: StdRng,
    origin: f64,
    emitted: u64,
    closed: bool,
}

impl<C: Clock> SimulatedTransport<C> {
    pub fn new(clock: C, profile: SimulationProfile) -> Self {
        Self::with_rng(clock, profile, StdRng::from_entropy())
    }

    pub fn seeded(clock: C, profile: SimulationProfile, seed: u64) -> Self {
        Self::with_rng(clock, profile, StdRng::seed_from_u64(seed))
    }

    fn with_rng(clock: C, profile: SimulationProfile, rng: StdRng) -> Self {
        let origin = clock.now_seconds();
        log::info!(
            "simulated EMG source at {} Hz (no hardware)",
            profile.sample_rate_hz
        );
        Self {
            clock,
            profile,
            rng,
            origin,
            emitted: 0,
            closed: false,
        }
    }

    /// Number of lines the timeline has produced so far.
    fn due(&self) -> u64 {
        let elapsed = (self.clock.now_seconds() - self.origin).max(0.0);
        (elapsed * self.profile.sample_rate_hz).floor() as u64
    }

    fn ensure_open(&self) -> Result<(), AcquisitionError> {
        if self.closed {
            return Err(AcquisitionError::TransportClosed);
        }
        Ok(())
    }

    fn sample_at(&mut self, t: f64) -> (u32, u32) {
        let p = &self.profile;
        let baseline = p.baseline();
        let amplitude = if p.is_active(t) { p.burst } else { 0.0 };
        let noise = p.noise.max(f64::MIN_POSITIVE);
        let max = p.adc_resolution as f64;
        let mut channel = |gain: f64| {
            let burst = if amplitude > 0.0 {
                self.rng.gen_range(-amplitude..amplitude) * gain
            } else {
                0.0
            };
            let value = baseline + burst + self.rng.gen_range(-noise..noise);
            value.round().clamp(0.0, max) as u32
        };
        let ch1 = channel(1.0);
        let ch2 = channel(0.6);
        (ch1, ch2)
    }
}

impl<C: Clock> LineTransport for SimulatedTransport<C> {
    fn bytes_available(&mut self) -> Result<bool, AcquisitionError> {
        self.ensure_open()?;
        Ok(self.due() > self.emitted)
    }

    fn read_line(&mut self) -> Result<Option<String>, AcquisitionError> {
        self.ensure_open()?;
        let due = self.due();
        if due <= self.emitted {
            return Ok(None);
        }
        if due - self.emitted > MAX_BACKLOG {
            log::debug!("simulator dropped {} stale lines", due - self.emitted - MAX_BACKLOG);
            self.emitted = due - MAX_BACKLOG;
        }
        let t = self.emitted as f64 / self.profile.sample_rate_hz;
        self.emitted += 1;
        let (ch1, ch2) = self.sample_at(t);
        Ok(Some(format!("EMG1:{ch1} EMG2:{ch2}")))
    }

    // 重新开始时间轴, 让第一个重复窗口与会话对齐
    fn clear_input(&mut self) -> Result<(), AcquisitionError> {
        self.ensure_open()?;
        self.origin = self.clock.now_seconds();
        self.emitted = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<(), AcquisitionError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::clock::ManualClock;
    use crate::drivers::parse_dual_channel;
    use std::time::Duration;

    fn profile() -> SimulationProfile {
        SimulationProfile::for_session(
            &SessionConfig {
                duration_per_repetition: 1.0,
                ..SessionConfig::default()
            },
            100.0,
        )
    }

    fn drain(transport: &mut SimulatedTransport<ManualClock>) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        while let Some(line) = transport.read_line().unwrap() {
            out.push(parse_dual_channel(&line).unwrap());
        }
        out
    }

    #[test]
    fn emits_parseable_lines_at_the_configured_rate() {
        let clock = ManualClock::with_step(Duration::from_millis(1));
        let mut transport = SimulatedTransport::seeded(clock.clone(), profile(), 7);
        assert!(!transport.bytes_available().unwrap());
        clock.advance(Duration::from_millis(55));
        assert!(transport.bytes_available().unwrap());
        let samples = drain(&mut transport);
        assert_eq!(samples.len(), 5);
        assert!(samples.iter().all(|&(a, b)| a <= 4095 && b <= 4095));
        assert!(!transport.bytes_available().unwrap());
    }

    #[test]
    fn bursts_only_in_the_active_half() {
        let clock = ManualClock::with_step(Duration::from_millis(1));
        let mut transport = SimulatedTransport::seeded(clock.clone(), profile(), 11);
        clock.advance(Duration::from_secs(1));
        let samples = drain(&mut transport);
        assert_eq!(samples.len(), 100);
        let spread = |part: &[(u32, u32)]| {
            part.iter()
                .map(|(a, _)| (*a as f64 - 2047.5).abs())
                .fold(0.0, f64::max)
        };
        // Rest half stays within the noise band (1 % of full scale).
        assert!(spread(&samples[50..]) <= 42.0);
        assert!(spread(&samples[..50]) > 100.0);
    }

    #[test]
    fn backlog_is_bounded_and_clear_restarts_the_timeline() {
        let clock = ManualClock::with_step(Duration::from_millis(1));
        let mut transport = SimulatedTransport::seeded(clock.clone(), profile(), 3);
        clock.advance(Duration::from_secs(100));
        assert_eq!(drain(&mut transport).len(), MAX_BACKLOG as usize);
        clock.advance(Duration::from_secs(5));
        transport.clear_input().unwrap();
        assert!(!transport.bytes_available().unwrap());
        clock.advance(Duration::from_millis(25));
        assert_eq!(drain(&mut transport).len(), 2);
    }

    #[test]
    fn reads_fail_after_close() {
        let clock = ManualClock::with_step(Duration::from_millis(1));
        let mut transport = SimulatedTransport::seeded(clock.clone(), profile(), 1);
        transport.close().unwrap();
        clock.advance(Duration::from_secs(1));
        assert!(matches!(
            transport.read_line(),
            Err(AcquisitionError::TransportClosed)
        ));
    }
}
