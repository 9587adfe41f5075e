// src/types.rs
use serde::{Deserialize, Serialize};

// 连接模式
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum ConnectionMode {
    Simulation,
    Hardware,
}

/// One parsed two-channel reading, tagged with its repetition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub elapsed_seconds: f64,
    pub channel1_raw: u32,
    pub channel2_raw: u32,
    pub repetition: u32,
}

/// Catalog entry: file-safe key plus the meaning shown to the operator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureDefinition {
    pub key: String,
    pub description: String,
}

impl GestureDefinition {
    pub fn new(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
        }
    }
}

/// Calibrated CSV row derived from a [`Sample`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportRow {
    pub elapsed_ms: u64,
    pub ch1_raw: u32,
    pub ch1_volts: f64,
    pub ch2_raw: u32,
    pub ch2_volts: f64,
    pub repetition: u32,
}

// 图表通道
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum Channel {
    Emg1,
    Emg2,
}

impl Channel {
    pub fn index(self) -> usize {
        match self {
            Channel::Emg1 => 0,
            Channel::Emg2 => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Channel::Emg1 => "EMG Sensor 1",
            Channel::Emg2 => "EMG Sensor 2",
        }
    }
}

// 采集会话状态
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum SessionState {
    Idle,
    AwaitingStart,
    Recording,
    Draining,
    Complete,
}

// 后台发给实时窗口的消息
#[derive(Clone, Debug, PartialEq)]
pub enum ViewerMessage {
    Title(String),
    /// Fixed X extent of the recording window.
    XLimits(f64, f64),
    /// Full line data for one channel.
    Lines { channel: Channel, points: Vec<[f64; 2]> },
    Redraw,
    Finished,
}
