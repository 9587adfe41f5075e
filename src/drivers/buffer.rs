use crate::types::Sample;
/// Column view of the buffer at one point in time, ready to plot.
#[derive(Clone, Debug, Default)]
pub struct TimeSeriesFrame {
    pub times: Vec<f64>,
    pub channel1: Vec<f64>,
    pub channel2: Vec<f64>,
}
impl TimeSeriesFrame {
    pub fn len(&self) -> usize {
        self.times.len()
    }
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}
/// Append-only store for one gesture's samples, in arrival order.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
}
impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }
    pub fn snapshot(&self) -> TimeSeriesFrame {
        frame_of(&self.samples)
    }
    /// Ends acquisition; the result is read-only.
    pub fn freeze(self) -> FrozenBuffer {
        FrozenBuffer {
            samples: self.samples,
        }
    }
}
/// Completed recording handed to the exporter.
#[derive(Debug, Default)]
pub struct FrozenBuffer {
    samples: Vec<Sample>,
}
impl FrozenBuffer {
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn snapshot(&self) -> TimeSeriesFrame {
        frame_of(&self.samples)
    }
    /// Sample count per repetition, index 0 being repetition 1.
    pub fn repetition_counts(&self, repetitions: u32) -> Vec<usize> {
        let mut counts = vec![0usize; repetitions as usize];
        for sample in &self.samples {
            if let Some(slot) = (sample.repetition as usize)
                .checked_sub(1)
                .and_then(|idx| counts.get_mut(idx))
            {
                *slot += 1;
            }
        }
        counts
    }
}
fn frame_of(samples: &[Sample]) -> TimeSeriesFrame {
    let mut frame = TimeSeriesFrame {
        times: Vec::with_capacity(samples.len()),
        channel1: Vec::with_capacity(samples.len()),
        channel2: Vec::with_capacity(samples.len()),
    };
    for s in samples {
        frame.times.push(s.elapsed_seconds);
        frame.channel1.push(s.channel1_raw as f64);
        frame.channel2.push(s.channel2_raw as f64);
    }
    frame
}
#[cfg(test)]
mod tests {
    use super::*;
    fn sample(t: f64, a: u32, b: u32, rep: u32) -> Sample {
        Sample {
            elapsed_seconds: t,
            channel1_raw: a,
            channel2_raw: b,
            repetition: rep,
        }
    }
    #[test]
    fn snapshot_keeps_arrival_order() {
        let mut buffer = SampleBuffer::new();
        buffer.push(sample(0.1, 10, 20, 1));
        buffer.push(sample(0.2, 11, 21, 1));
        buffer.push(sample(3.5, 12, 22, 2));
        let frame = buffer.snapshot();
        assert_eq!(frame.times, vec![0.1, 0.2, 3.5]);
        assert_eq!(frame.channel1, vec![10.0, 11.0, 12.0]);
        assert_eq!(frame.channel2, vec![20.0, 21.0, 22.0]);
        assert_eq!(buffer.last().map(|s| s.repetition), Some(2));
    }
    #[test]
    fn frozen_buffer_counts_repetitions() {
        let mut buffer = SampleBuffer::new();
        for (t, rep) in [(0.5, 1), (3.5, 2), (5.9, 2)] {
            buffer.push(sample(t, 100, 200, rep));
        }
        let frozen = buffer.freeze();
        assert_eq!(frozen.len(), 3);
        assert_eq!(frozen.repetition_counts(2), vec![1, 2]);
        assert_eq!(frozen.repetition_counts(3), vec![1, 2, 0]);
    }
    #[test]
    fn empty_snapshot() {
        let frozen = SampleBuffer::new().freeze();
        assert!(frozen.is_empty());
        assert!(frozen.snapshot().is_empty());
    }
}
