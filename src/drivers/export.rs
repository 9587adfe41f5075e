use std::fs;
use std::path::{Path, PathBuf};
use crate::config::SessionConfig;
use crate::console::OperatorConsole;
use crate::drivers::live::push_frame;
use crate::drivers::session::chart_title;
use crate::drivers::{adc_to_volts, AcquisitionError, FrozenBuffer, RenderSurface};
use crate::recorder::write_table;
use crate::types::{ExportRow, Sample};
/// Output trees: one CSV per gesture under `data_dir`, one PNG under `graph_dir`.
#[derive(Clone, Debug)]
pub struct OutputPaths {
    pub data_dir: PathBuf,
    pub graph_dir: PathBuf,
}
impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data_raw"),
            graph_dir: PathBuf::from("graphs"),
        }
    }
}
impl OutputPaths {
    pub fn table_path(&self, gesture_key: &str) -> PathBuf {
        self.data_dir.join(format!("{gesture_key}.csv"))
    }
    pub fn chart_path(&self, gesture_key: &str) -> PathBuf {
        self.graph_dir.join(format!("{gesture_key}.png"))
    }
}
#[derive(Clone, Debug, PartialEq)]
pub enum ArtifactStatus {
    Written(PathBuf),
    Failed(String),
}
impl ArtifactStatus {
    #[cfg(test)]
    pub fn is_written(&self) -> bool {
        matches!(self, ArtifactStatus::Written(_))
    }
}
#[derive(Clone, Debug, PartialEq)]
pub enum ExportOutcome {
    /// Nothing was captured; no files were written.
    Empty,
    Exported {
        rows: usize,
        table: ArtifactStatus,
        chart: ArtifactStatus,
    },
}
/// Calibrated row for one sample.
pub fn to_row(sample: &Sample, config: &SessionConfig) -> ExportRow {
    let vref = config.reference_voltage;
    let resolution = config.adc_resolution;
    ExportRow {
        elapsed_ms: (sample.elapsed_seconds.max(0.0) * 1000.0).round() as u64,
        ch1_raw: sample.channel1_raw,
        ch1_volts: adc_to_volts(sample.channel1_raw, vref, resolution),
        ch2_raw: sample.channel2_raw,
        ch2_volts: adc_to_volts(sample.channel2_raw, vref, resolution),
        repetition: sample.repetition,
    }
}
pub fn to_rows(samples: &[Sample], config: &SessionConfig) -> Vec<ExportRow> {
    samples.iter().map(|s| to_row(s, config)).collect()
}
/// Persists a finished recording as a CSV table and a chart image.
pub struct Exporter<'a> {
    config: &'a SessionConfig,
    paths: &'a OutputPaths,
    dpi: u32,
}
impl<'a> Exporter<'a> {
    pub fn new(config: &'a SessionConfig, paths: &'a OutputPaths, dpi: u32) -> Self {
        Self { config, paths, dpi }
    }
    /// The table and the chart are independent: either may fail without
    /// affecting the other. Failures become operator warnings.
    pub fn export<S, O>(
        &self,
        buffer: &FrozenBuffer,
        gesture_key: &str,
        surface: &mut S,
        console: &mut O,
    ) -> ExportOutcome
    where
        S: RenderSurface + ?Sized,
        O: OperatorConsole + ?Sized,
    {
        console.notify("Recording complete! Saving all data...");
        if buffer.is_empty() {
            console.warn("No data was captured for this gesture.");
            return ExportOutcome::Empty;
        }
        let rows = to_rows(buffer.samples(), self.config);
        let table = match self.write_rows(&rows, gesture_key) {
            Ok(path) => {
                console.notify(&format!("Saving data to: {}", path.display()));
                ArtifactStatus::Written(path)
            }
            Err(e) => {
                console.warn(&format!("Could not save data for '{gesture_key}': {e}"));
                ArtifactStatus::Failed(e.to_string())
            }
        };
        let chart = match self.save_chart(buffer, gesture_key, surface) {
            Ok(path) => {
                console.notify(&format!("Saved plot to: {}", path.display()));
                ArtifactStatus::Written(path)
            }
            Err(e) => {
                console.warn(&format!("Could not save plot for '{gesture_key}': {e}"));
                ArtifactStatus::Failed(e.to_string())
            }
        };
        ExportOutcome::Exported {
            rows: rows.len(),
            table,
            chart,
        }
    }
    fn write_rows(&self, rows: &[ExportRow], gesture_key: &str) -> Result<PathBuf, AcquisitionError> {
        ensure_dir(&self.paths.data_dir)?;
        let path = self.paths.table_path(gesture_key);
        write_table(&path, rows)?;
        Ok(path)
    }
    fn save_chart<S>(
        &self,
        buffer: &FrozenBuffer,
        gesture_key: &str,
        surface: &mut S,
    ) -> Result<PathBuf, AcquisitionError>
    where
        S: RenderSurface + ?Sized,
    {
        ensure_dir(&self.paths.graph_dir)?;
        surface.set_title(&chart_title(gesture_key, self.config))?;
        push_frame(surface, &buffer.snapshot(), self.config.total_duration())?;
        let path = self.paths.chart_path(gesture_key);
        surface.save_figure(&path, self.dpi)?;
        Ok(path)
    }
}
fn ensure_dir(dir: &Path) -> Result<(), AcquisitionError> {
    fs::create_dir_all(dir)?;
    Ok(())
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::RecordingConsole;
    use crate::drivers::{FigureSurface, SampleBuffer};
    use crate::types::Channel;
    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "emg-recorder-export-{name}-{}",
            std::process::id()
        ));
        fs::remove_dir_all(&dir).ok();
        dir
    }
    fn paths_in(dir: &Path) -> OutputPaths {
        OutputPaths {
            data_dir: dir.join("data_raw"),
            graph_dir: dir.join("graphs"),
        }
    }
    fn recorded(samples: &[(f64, u32, u32, u32)]) -> FrozenBuffer {
        let mut buffer = SampleBuffer::new();
        for &(t, a, b, rep) in samples {
            buffer.push(Sample {
                elapsed_seconds: t,
                channel1_raw: a,
                channel2_raw: b,
                repetition: rep,
            });
        }
        buffer.freeze()
    }
    #[test]
    fn rows_follow_samples_one_to_one() {
        let config = SessionConfig::default();
        let buffer = recorded(&[(0.0004, 0, 4095, 1), (0.0016, 2048, 1, 1), (3.2496, 7, 8, 2)]);
        let rows = to_rows(buffer.samples(), &config);
        assert_eq!(rows.len(), 3);
        let ms: Vec<u64> = rows.iter().map(|r| r.elapsed_ms).collect();
        assert_eq!(ms, vec![0, 2, 3250]);
        for (row, sample) in rows.iter().zip(buffer.samples()) {
            assert_eq!(row.ch1_raw, sample.channel1_raw);
            assert_eq!(row.ch2_raw, sample.channel2_raw);
            assert_eq!(row.repetition, sample.repetition);
            assert_eq!(row.ch1_volts, adc_to_volts(sample.channel1_raw, 3.3, 4095));
            assert_eq!(row.ch2_volts, adc_to_volts(sample.channel2_raw, 3.3, 4095));
        }
        assert_eq!(rows[0].ch1_volts, 0.0);
        assert!((rows[0].ch2_volts - 3.3).abs() < 1e-12);
    }
    #[test]
    fn empty_buffer_writes_nothing_and_warns() {
        let dir = scratch_dir("empty");
        let paths = paths_in(&dir);
        let config = SessionConfig::default();
        let exporter = Exporter::new(&config, &paths, 50);
        let mut console = RecordingConsole::default();
        let outcome = exporter.export(
            &SampleBuffer::new().freeze(),
            "rest",
            &mut FigureSurface::new(),
            &mut console,
        );
        assert_eq!(outcome, ExportOutcome::Empty);
        assert!(!paths.table_path("rest").exists());
        assert!(!paths.chart_path("rest").exists());
        // Directories only appear once there is something to put in them.
        assert!(!paths.data_dir.exists());
        assert!(!paths.graph_dir.exists());
        assert_eq!(console.warnings(), vec!["No data was captured for this gesture."]);
    }
    #[test]
    fn table_matches_buffer_and_is_reproducible() {
        let dir = scratch_dir("table");
        let paths = paths_in(&dir);
        let config = SessionConfig::default();
        let exporter = Exporter::new(&config, &paths, 50);
        let buffer = recorded(&[(0.5, 100, 200, 1), (3.5, 101, 201, 2), (5.9, 102, 202, 2)]);
        let mut console = RecordingConsole::default();
        let first = exporter.export(&buffer, "fist", &mut FigureSurface::new(), &mut console);
        let table = paths.table_path("fist");
        let bytes_first = fs::read(&table).unwrap();
        exporter.export(&buffer, "fist", &mut FigureSurface::new(), &mut console);
        let bytes_second = fs::read(&table).unwrap();
        assert_eq!(bytes_first, bytes_second);
        match first {
            ExportOutcome::Exported { rows, table: status, .. } => {
                assert_eq!(rows, 3);
                assert_eq!(status, ArtifactStatus::Written(table.clone()));
            }
            ExportOutcome::Empty => panic!("expected an export"),
        }
        let text = String::from_utf8(bytes_first).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(crate::recorder::CSV_HEADER));
        let body: Vec<Vec<String>> = lines
            .map(|l| l.split(',').map(str::to_string).collect())
            .collect();
        assert_eq!(body.len(), 3);
        for (cols, sample) in body.iter().zip(buffer.samples()) {
            let row = to_row(sample, &config);
            assert_eq!(cols[0].parse::<u64>().unwrap(), row.elapsed_ms);
            assert_eq!(cols[1].parse::<u32>().unwrap(), sample.channel1_raw);
            assert_eq!(cols[2].parse::<f64>().unwrap(), row.ch1_volts);
            assert_eq!(cols[3].parse::<u32>().unwrap(), sample.channel2_raw);
            assert_eq!(cols[4].parse::<f64>().unwrap(), row.ch2_volts);
            assert_eq!(cols[5].parse::<u32>().unwrap(), sample.repetition);
        }
        assert_eq!(body[1][0], "3500");
        fs::remove_dir_all(&dir).ok();
    }
    #[test]
    fn chart_failure_does_not_block_the_table() {
        struct NoSave(FigureSurface);
        impl RenderSurface for NoSave {
            fn set_title(&mut self, title: &str) -> Result<(), AcquisitionError> {
                self.0.set_title(title)
            }
            fn set_x_limits(&mut self, min: f64, max: f64) -> Result<(), AcquisitionError> {
                self.0.set_x_limits(min, max)
            }
            fn set_line_data(
                &mut self,
                channel: Channel,
                xs: &[f64],
                ys: &[f64],
            ) -> Result<(), AcquisitionError> {
                self.0.set_line_data(channel, xs, ys)
            }
            fn redraw(&mut self) -> Result<(), AcquisitionError> {
                self.0.redraw()
            }
            fn save_figure(&mut self, _: &Path, _: u32) -> Result<(), AcquisitionError> {
                Err(AcquisitionError::Plot("disk full".into()))
            }
        }
        let dir = scratch_dir("nochart");
        let paths = paths_in(&dir);
        let config = SessionConfig::default();
        let exporter = Exporter::new(&config, &paths, 50);
        let buffer = recorded(&[(0.1, 1, 2, 1)]);
        let mut surface = NoSave(FigureSurface::new());
        let mut console = RecordingConsole::default();
        let outcome = exporter.export(&buffer, "open", &mut surface, &mut console);
        match outcome {
            ExportOutcome::Exported { table, chart, .. } => {
                assert!(table.is_written());
                assert!(!chart.is_written());
            }
            ExportOutcome::Empty => panic!("expected an export"),
        }
        assert!(paths.table_path("open").exists());
        assert_eq!(console.warnings().len(), 1);
        // The final figure still carries the whole buffer.
        assert_eq!(surface.0.figure().line(Channel::Emg2), &[(0.1, 2.0)]);
        assert_eq!(surface.0.figure().x_limits, (0.0, 45.0));
        fs::remove_dir_all(&dir).ok();
    }
    #[test]
    fn table_failure_does_not_block_the_chart() {
        let dir = scratch_dir("notable");
        fs::create_dir_all(&dir).unwrap();
        // A plain file where the data directory should be.
        fs::write(dir.join("data_raw"), b"not a directory").unwrap();
        let paths = paths_in(&dir);
        let config = SessionConfig::default();
        let exporter = Exporter::new(&config, &paths, 50);
        let buffer = recorded(&[(0.1, 1, 2, 1), (0.2, 3, 4, 1)]);
        let mut surface = FigureSurface::new();
        let mut console = RecordingConsole::default();
        let outcome = exporter.export(&buffer, "open", &mut surface, &mut console);
        match outcome {
            ExportOutcome::Exported { table, .. } => assert!(!table.is_written()),
            ExportOutcome::Empty => panic!("expected an export"),
        }
        assert!(console.warnings()[0].contains("Could not save data"));
        // Chart rendering was still attempted with the full buffer.
        assert_eq!(surface.figure().line(Channel::Emg1).len(), 2);
        fs::remove_dir_all(&dir).ok();
    }
    #[test]
    fn output_paths_use_gesture_key() {
        let paths = OutputPaths::default();
        assert_eq!(paths.table_path("fist"), PathBuf::from("data_raw/fist.csv"));
        assert_eq!(paths.chart_path("fist"), PathBuf::from("graphs/fist.png"));
    }
}
