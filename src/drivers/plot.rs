use std::fs;
use std::io::Cursor;
use std::path::Path;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use crate::drivers::AcquisitionError;
use crate::types::Channel;
/// Figure size in inches; pixel size is this times the DPI.
pub const FIGURE_INCHES: (f64, f64) = (10.0, 6.0);
pub const MAX_DPI: u32 = 600;
/// Chart the acquisition core draws into.
///
/// Implementations must tolerate being called at the live refresh rate; none
/// of these calls may block on user interaction.
pub trait RenderSurface {
    fn set_title(&mut self, title: &str) -> Result<(), AcquisitionError>;
    fn set_x_limits(&mut self, min: f64, max: f64) -> Result<(), AcquisitionError>;
    /// Replaces the full line for `channel`; Y limits follow the data.
    fn set_line_data(
        &mut self,
        channel: Channel,
        xs: &[f64],
        ys: &[f64],
    ) -> Result<(), AcquisitionError>;
    fn redraw(&mut self) -> Result<(), AcquisitionError>;
    fn save_figure(&mut self, path: &Path, dpi: u32) -> Result<(), AcquisitionError>;
}
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub background: RGBColor,
    pub foreground: RGBColor,
    pub palette: [RGBColor; 2],
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            background: WHITE,
            foreground: BLACK,
            palette: [RGBColor(31, 119, 180), RGBColor(255, 127, 14)],
        }
    }
}
/// Everything needed to draw the two-panel chart.
#[derive(Clone, Debug)]
pub struct ChartFigure {
    pub title: String,
    pub x_limits: (f64, f64),
    pub lines: [Vec<(f64, f64)>; 2],
}
impl Default for ChartFigure {
    fn default() -> Self {
        Self {
            title: String::new(),
            x_limits: (0.0, 1.0),
            lines: [Vec::new(), Vec::new()],
        }
    }
}
impl ChartFigure {
    pub fn line(&self, channel: Channel) -> &[(f64, f64)] {
        &self.lines[channel.index()]
    }
    /// Y range covering the channel's data with a 5 % margin.
    pub fn y_bounds(&self, channel: Channel) -> (f64, f64) {
        let (min, max) = self
            .line(channel)
            .iter()
            .map(|(_, y)| *y)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if !min.is_finite() || !max.is_finite() {
            return (0.0, 1.0);
        }
        let span = max - min;
        if span.abs() < f64::EPSILON {
            return (min - 1.0, max + 1.0);
        }
        let pad = span * 0.05;
        (min - pad, max + pad)
    }
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }
}
pub fn pixel_size(dpi: u32) -> (u32, u32) {
    let dpi = dpi.clamp(1, MAX_DPI) as f64;
    (
        (FIGURE_INCHES.0 * dpi).round() as u32,
        (FIGURE_INCHES.1 * dpi).round() as u32,
    )
}
pub fn render_figure_png(
    figure: &ChartFigure,
    style: &PlotStyle,
    dpi: u32,
) -> Result<Vec<u8>, AcquisitionError> {
    if figure.is_empty() {
        return Err(AcquisitionError::Plot("figure has no samples".into()));
    }
    let (width, height) = pixel_size(dpi);
    // Font sizes are in points; scale them with the resolution.
    let scale = dpi.clamp(1, MAX_DPI) as f64 / 72.0;
    let title_font = font(14.0 * scale, &style.foreground);
    let label_font = font(10.0 * scale, &style.foreground);
    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&style.background)?;
        let root = root.titled(&figure.title, title_font)?;
        let panels = root.split_evenly((2, 1));
        let (x_min, x_max) = figure.x_limits;
        for (panel, channel) in panels.iter().zip([Channel::Emg1, Channel::Emg2]) {
            let color = style.palette[channel.index()];
            let (y_min, y_max) = figure.y_bounds(channel);
            let mut chart = ChartBuilder::on(panel)
                .margin((8.0 * scale) as u32)
                .set_label_area_size(LabelAreaPosition::Left, (45.0 * scale) as u32)
                .set_label_area_size(LabelAreaPosition::Bottom, (30.0 * scale) as u32)
                .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
            let mut mesh = chart.configure_mesh();
            mesh.light_line_style(&style.foreground.mix(0.08))
                .label_style(label_font.clone())
                .y_desc(format!("{} Signal (ADC)", channel.label()));
            if channel == Channel::Emg2 {
                mesh.x_desc("Time (s)");
            }
            mesh.draw()?;
            chart
                .draw_series(LineSeries::new(
                    figure.line(channel).iter().copied(),
                    &color,
                ))?
                .label(channel.label())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .label_font(label_font.clone())
                .border_style(&style.foreground.mix(0.3))
                .background_style(&style.background.mix(0.8))
                .draw()?;
        }
        root.present()?;
    }
    encode_png(&buffer, width, height)
}
fn font(size: f64, color: &RGBColor) -> TextStyle<'static> {
    FontDesc::new(FontFamily::SansSerif, size, FontStyle::Normal).color(color)
}
pub fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, AcquisitionError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| AcquisitionError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
/// Off-screen surface: keeps the figure in memory and renders it with
/// plotters only when saved. Used headless and behind the live window.
#[derive(Clone, Debug, Default)]
pub struct FigureSurface {
    figure: ChartFigure,
    style: PlotStyle,
    redraws: usize,
}
impl FigureSurface {
    pub fn new() -> Self {
        Self::default()
    }
    #[cfg(test)]
    pub fn figure(&self) -> &ChartFigure {
        &self.figure
    }
    #[cfg(test)]
    pub fn redraws(&self) -> usize {
        self.redraws
    }
}
impl RenderSurface for FigureSurface {
    fn set_title(&mut self, title: &str) -> Result<(), AcquisitionError> {
        self.figure.title = title.to_string();
        Ok(())
    }
    fn set_x_limits(&mut self, min: f64, max: f64) -> Result<(), AcquisitionError> {
        if min.is_nan() || max.is_nan() || min >= max {
            return Err(AcquisitionError::Plot(format!(
                "invalid x limits {min}..{max}"
            )));
        }
        self.figure.x_limits = (min, max);
        Ok(())
    }
    fn set_line_data(
        &mut self,
        channel: Channel,
        xs: &[f64],
        ys: &[f64],
    ) -> Result<(), AcquisitionError> {
        if xs.len() != ys.len() {
            return Err(AcquisitionError::Plot(format!(
                "line length mismatch: {} x values, {} y values",
                xs.len(),
                ys.len()
            )));
        }
        let line = &mut self.figure.lines[channel.index()];
        line.clear();
        line.extend(xs.iter().copied().zip(ys.iter().copied()));
        Ok(())
    }
    fn redraw(&mut self) -> Result<(), AcquisitionError> {
        self.redraws += 1;
        Ok(())
    }
    fn save_figure(&mut self, path: &Path, dpi: u32) -> Result<(), AcquisitionError> {
        log::debug!(
            "saving chart after {} redraws to {}",
            self.redraws,
            path.display()
        );
        let png = render_figure_png(&self.figure, &self.style, dpi)?;
        fs::write(path, png)?;
        Ok(())
    }
}
