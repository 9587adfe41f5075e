// src/gui.rs
use std::path::Path;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::time::Duration;

use eframe::egui;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoints};

use crate::drivers::{AcquisitionError, FigureSurface, RenderSurface};
use crate::types::*;

const REPAINT_INTERVAL: Duration = Duration::from_millis(30);
// 每帧最多处理的消息数, 防止界面卡死
const MAX_MESSAGES_PER_FRAME: usize = 256;

pub struct EmgViewerApp {
    title: String,
    x_limits: (f64, f64),
    // 后台逐通道发来的数据, 收到 Redraw 才显示
    pending: [Vec<[f64; 2]>; 2],
    lines: [Vec<[f64; 2]>; 2],
    finished: bool,
    title_dirty: bool,
    rx: Receiver<ViewerMessage>,
}

impl EmgViewerApp {
    pub fn new(rx: Receiver<ViewerMessage>) -> Self {
        Self {
            title: "EMG Recording".to_owned(),
            x_limits: (0.0, 1.0),
            pending: [Vec::new(), Vec::new()],
            lines: [Vec::new(), Vec::new()],
            finished: false,
            title_dirty: false,
            rx,
        }
    }

    fn apply(&mut self, msg: ViewerMessage) {
        match msg {
            ViewerMessage::Title(title) => {
                self.title = title;
                self.title_dirty = true;
            }
            ViewerMessage::XLimits(min, max) => self.x_limits = (min, max),
            ViewerMessage::Lines { channel, points } => self.pending[channel.index()] = points,
            ViewerMessage::Redraw => self.lines = self.pending.clone(),
            ViewerMessage::Finished => self.finished = true,
        }
    }

    fn drain_messages(&mut self) {
        for _ in 0..MAX_MESSAGES_PER_FRAME {
            match self.rx.try_recv() {
                Ok(msg) => self.apply(msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.finished = true;
                    break;
                }
            }
        }
    }

    fn draw_channel(&self, ui: &mut egui::Ui, channel: Channel, height: f32) {
        let color = match channel {
            Channel::Emg1 => Color32::from_rgb(31, 119, 180),
            Channel::Emg2 => Color32::from_rgb(255, 127, 14),
        };
        let (x_min, x_max) = self.x_limits;
        let mut plot = Plot::new(channel.label())
            .height(height)
            .include_x(x_min)
            .include_x(x_max)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .legend(Legend::default())
            .y_axis_label(format!("{} Signal (ADC)", channel.label()));
        if channel == Channel::Emg2 {
            plot = plot.x_axis_label("Time (s)");
        }
        plot.show(ui, |plot_ui| {
            let points: PlotPoints = self.lines[channel.index()].iter().copied().collect();
            plot_ui.line(Line::new(points).name(channel.label()).color(color));
        });
    }
}

impl eframe::App for EmgViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_messages();
        if self.finished {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }
        if self.title_dirty {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(self.title.clone()));
            self.title_dirty = false;
        }

        egui::TopBottomPanel::top("title_bar").show(ctx, |ui| {
            ui.heading(self.title.as_str());
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            let height = ((ui.available_height() - ui.spacing().item_spacing.y) / 2.0).max(50.0);
            self.draw_channel(ui, Channel::Emg1, height);
            self.draw_channel(ui, Channel::Emg2, height);
        });

        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}

/// Render surface behind the live window.
///
/// Keeps an off-screen figure for `save_figure` and forwards every update to
/// the window over the channel. Once the window is gone, updates only reach
/// the off-screen figure.
pub struct LiveSurface {
    tx: Sender<ViewerMessage>,
    figure: FigureSurface,
    detached: bool,
}

impl LiveSurface {
    pub fn new(tx: Sender<ViewerMessage>) -> Self {
        Self {
            tx,
            figure: FigureSurface::new(),
            detached: false,
        }
    }

    #[cfg(test)]
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    fn forward(&mut self, msg: ViewerMessage) {
        if self.detached {
            return;
        }
        if self.tx.send(msg).is_err() {
            log::warn!("live window closed; recording continues without it");
            self.detached = true;
        }
    }
}

impl RenderSurface for LiveSurface {
    fn set_title(&mut self, title: &str) -> Result<(), AcquisitionError> {
        self.figure.set_title(title)?;
        self.forward(ViewerMessage::Title(title.to_owned()));
        Ok(())
    }

    fn set_x_limits(&mut self, min: f64, max: f64) -> Result<(), AcquisitionError> {
        self.figure.set_x_limits(min, max)?;
        self.forward(ViewerMessage::XLimits(min, max));
        Ok(())
    }

    fn set_line_data(
        &mut self,
        channel: Channel,
        xs: &[f64],
        ys: &[f64],
    ) -> Result<(), AcquisitionError> {
        self.figure.set_line_data(channel, xs, ys)?;
        let points = xs.iter().zip(ys).map(|(x, y)| [*x, *y]).collect();
        self.forward(ViewerMessage::Lines { channel, points });
        Ok(())
    }

    fn redraw(&mut self) -> Result<(), AcquisitionError> {
        self.figure.redraw()?;
        self.forward(ViewerMessage::Redraw);
        Ok(())
    }

    fn save_figure(&mut self, path: &Path, dpi: u32) -> Result<(), AcquisitionError> {
        self.figure.save_figure(path, dpi)
    }
}

impl Drop for LiveSurface {
    fn drop(&mut self) {
        self.forward(ViewerMessage::Finished);
    }
}
