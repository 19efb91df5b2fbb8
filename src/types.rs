// src/types.rs
use std::time::{SystemTime, UNIX_EPOCH};

use crate::drivers::ParsedLine;

// 连接模式
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum ConnectionMode {
    Simulation,
    Hardware,
}

// GUI 发给后台的命令
#[derive(Clone, Debug, PartialEq)]
pub enum GuiCommand {
    Connect { mode: ConnectionMode, port: String },
    Disconnect,
    StartContinuous,
    StopContinuous,
    Shutdown,
}

// 后台发给 GUI 的消息
#[derive(Clone, Debug)]
pub enum DaqMessage {
    Log(String),
    Status(bool),     // 连接状态
    Continuous(bool), // 连续采集状态
    ConnectFailed { port: String, reason: String },
    Reading(Reading),
}

/// One line from the device, stamped when it was read.
#[derive(Clone, Debug)]
pub struct Reading {
    pub received_at: SystemTime,
    pub line: ParsedLine,
}

impl Reading {
    pub fn timestamp_secs(&self) -> f64 {
        unix_seconds(self.received_at)
    }
}

pub fn unix_seconds(at: SystemTime) -> f64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
