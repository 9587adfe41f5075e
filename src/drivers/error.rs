use thiserror::Error;
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("serial transport error: {0}")]
    Transport(#[from] serialport::Error),
    #[error("transport is closed")]
    TransportClosed,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to parse configuration: {0}")]
    ConfigFormat(#[from] serde_json::Error),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for AcquisitionError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        AcquisitionError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for AcquisitionError {
    fn from(value: image::ImageError) -> Self {
        AcquisitionError::Plot(value.to_string())
    }
}
