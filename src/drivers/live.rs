use crate::drivers::{AcquisitionError, RenderSurface, SampleBuffer, TimeSeriesFrame};
use crate::types::Channel;
/// Rate limiter between the acquisition loop and the rendering surface.
///
/// Samples can arrive at several hundred per second while a redraw costs far
/// more than one sample, so snapshots go out at most once per
/// `refresh_interval` seconds. The X axis stays pinned to the whole recording
/// window; Y follows the data.
#[derive(Debug)]
pub struct LiveSink {
    refresh_interval: f64,
    x_max: f64,
    last_publish: Option<f64>,
    publishes: usize,
    surface_faults: usize,
}
impl LiveSink {
    pub fn new(refresh_interval: f64, total_duration: f64) -> Self {
        Self {
            refresh_interval: refresh_interval.max(0.0),
            x_max: total_duration,
            last_publish: None,
            publishes: 0,
            surface_faults: 0,
        }
    }
    /// Publishes when at least `refresh_interval` has passed since the
    /// previous publish (the first call always publishes).
    pub fn maybe_publish<S>(&mut self, surface: &mut S, buffer: &SampleBuffer, now: f64) -> bool
    where
        S: RenderSurface + ?Sized,
    {
        if let Some(last) = self.last_publish {
            if now - last < self.refresh_interval {
                return false;
            }
        }
        self.publish(surface, &buffer.snapshot(), now);
        true
    }
    /// Unconditional publish, used for the terminal snapshot.
    pub fn publish_final<S>(&mut self, surface: &mut S, frame: &TimeSeriesFrame, now: f64)
    where
        S: RenderSurface + ?Sized,
    {
        self.publish(surface, frame, now);
    }
    pub fn publishes(&self) -> usize {
        self.publishes
    }
    pub fn surface_faults(&self) -> usize {
        self.surface_faults
    }
    fn publish<S>(&mut self, surface: &mut S, frame: &TimeSeriesFrame, now: f64)
    where
        S: RenderSurface + ?Sized,
    {
        self.last_publish = Some(now);
        self.publishes += 1;
        if let Err(e) = push_frame(surface, frame, self.x_max) {
            self.surface_faults += 1;
            // A closed window must not cost us samples; report once.
            if self.surface_faults == 1 {
                log::warn!("live plot update failed, continuing without it: {e}");
            } else {
                log::debug!("live plot update failed: {e}");
            }
        }
    }
}
/// Loads a frame into the surface and asks for a redraw.
pub fn push_frame<S>(
    surface: &mut S,
    frame: &TimeSeriesFrame,
    x_max: f64,
) -> Result<(), AcquisitionError>
where
    S: RenderSurface + ?Sized,
{
    surface.set_x_limits(0.0, x_max)?;
    surface.set_line_data(Channel::Emg1, &frame.times, &frame.channel1)?;
    surface.set_line_data(Channel::Emg2, &frame.times, &frame.channel2)?;
    surface.redraw()
}
