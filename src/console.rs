// src/console.rs
use std::io::{self, BufRead, Write};

/// Operator-facing side of a recording run.
pub trait OperatorConsole {
    /// Status text for the operator.
    fn notify(&mut self, message: &str);
    /// Blocks until the operator is ready. Returns exactly once per call.
    fn await_ready(&mut self, prompt: &str);
    /// The recording moved into a new repetition window.
    fn repetition_changed(&mut self, repetition: u32, repetitions: u32, seconds_per_rep: f64) {
        self.notify(&repetition_banner(repetition, repetitions, seconds_per_rep));
    }
    /// Non-fatal problem the operator should know about.
    fn warn(&mut self, message: &str) {
        self.notify(&format!("⚠️ {message}"));
    }
}

pub fn repetition_banner(repetition: u32, repetitions: u32, seconds_per_rep: f64) -> String {
    format!("Recording repetition {repetition} of {repetitions} ({seconds_per_rep}s)...")
}

// 终端交互: stdout 输出, stdin 回车开始
pub struct TerminalConsole<R: BufRead = io::StdinLock<'static>> {
    input: R,
}

impl TerminalConsole {
    pub fn stdin() -> Self {
        Self {
            input: io::stdin().lock(),
        }
    }
}

impl<R: BufRead> TerminalConsole<R> {
    pub fn with_input(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> OperatorConsole for TerminalConsole<R> {
    fn notify(&mut self, message: &str) {
        log::debug!("operator: {message}");
        println!("{message}");
    }

    fn await_ready(&mut self, prompt: &str) {
        print!("{prompt}");
        io::stdout().flush().ok();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => log::warn!("stdin closed; starting without operator confirmation"),
            Ok(_) => {}
            Err(e) => log::warn!("could not read operator input ({e}); starting anyway"),
        }
    }

    fn warn(&mut self, message: &str) {
        log::warn!("{message}");
        println!("⚠️ {message}");
    }
}

#[cfg(test)]
pub use recording::{ConsoleEvent, RecordingConsole};
