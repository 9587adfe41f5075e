// src/drivers/mod.rs
// 声明同级目录下的子模块文件
pub mod buffer;
pub mod calibration;
pub mod clock;
pub mod error;
pub mod export;
pub mod live;
pub mod parser;
pub mod plot;
pub mod segmenter;
pub mod session;
pub mod source;
// 公开导出这些模块里的结构体，方便外部调用
pub use buffer::{FrozenBuffer, SampleBuffer, TimeSeriesFrame};
pub use calibration::adc_to_volts;
pub use clock::{Clock, SystemClock};
pub use error::AcquisitionError;
pub use export::{ExportOutcome, Exporter, OutputPaths};
pub use live::LiveSink;
pub use parser::parse_dual_channel;
pub use plot::{FigureSurface, RenderSurface};
pub use segmenter::repetition_for;
pub use session::{AcquisitionSession, RecordedGesture, SessionStats};
pub use source::{LineTransport, SerialTransport, TransportGuard};
