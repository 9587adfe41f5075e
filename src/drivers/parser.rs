//! Two-channel reading extraction from one line of serial text.
//!
//! Firmware variants print `512,478`, `512 478` or `EMG1:512 EMG2:478`; all of
//! them reduce to "the first two integers in the line". Digits that are part of
//! a channel label (`EMG1:`, `ch2=`) are not readings and are skipped.

/// Returns the first two readings of `line`, or `None` when fewer than two
/// integers are present or either one overflows `u32`.
pub fn parse_dual_channel(line: &str) -> Option<(u32, u32)> {
    let mut runs = digit_runs(line);
    let first = runs.next()?.parse().ok()?;
    let second = runs.next()?.parse().ok()?;
    Some((first, second))
}

/// Maximal ASCII digit runs of `line` that are not label indices.
fn digit_runs(line: &str) -> impl Iterator<Item = &str> {
    let bytes = line.as_bytes();
    let mut pos = 0;
    std::iter::from_fn(move || {
        while pos < bytes.len() {
            if !bytes[pos].is_ascii_digit() {
                pos += 1;
                continue;
            }
            let start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if is_label_index(bytes, start, pos) {
                continue;
            }
            return Some(&line[start..pos]);
        }
        None
    })
}

fn is_label_index(bytes: &[u8], start: usize, end: usize) -> bool {
    let after_letter = start > 0 && bytes[start - 1].is_ascii_alphabetic();
    let before_separator = matches!(bytes.get(end), Some(b':') | Some(b'='));
    after_letter && before_separator
}
