/// 1-based repetition index for `elapsed` seconds into a recording made of
/// `repetitions` windows of `duration_per_rep` seconds each.
///
/// Time at or past the end of the last window stays in the last repetition, so
/// samples that arrive just before the loop notices the deadline are kept.
/// Negative or non-finite input maps to the first repetition.
pub fn repetition_for(elapsed: f64, duration_per_rep: f64, repetitions: u32) -> u32 {
    let last = repetitions.max(1);
    if elapsed.is_nan() || elapsed <= 0.0 || duration_per_rep.is_nan() || duration_per_rep <= 0.0 {
        return 1;
    }
    let window = (elapsed / duration_per_rep).floor();
    if !window.is_finite() || window >= last as f64 {
        return last;
    }
    (window as u32 + 1).min(last)
}
