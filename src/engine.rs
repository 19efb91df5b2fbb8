// src/engine.rs
use crate::config::AppConfig;
use crate::drivers::{parse_line, DaqError, DeviceCommand, DeviceLink, SerialSession, SimulatedDevice};
use crate::types::*;
use std::ops::ControlFlow;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

// 单次轮询最多读取的行数，避免 GUI 命令被饿死
const MAX_LINES_PER_POLL: usize = 64;
const MAX_COMMANDS_PER_POLL: usize = 10;

/// Background reader: owns the device link and reports to the GUI over `tx`.
pub struct Engine {
    tx: Sender<DaqMessage>,
    config: AppConfig,
    link: Option<Box<dyn DeviceLink>>,
    continuous: bool,
}

impl Engine {
    pub fn new(tx: Sender<DaqMessage>, config: AppConfig) -> Self {
        Self { tx, config, link: None, continuous: false }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    fn log(&self, msg: impl Into<String>) {
        let msg = msg.into();
        log::info!("{msg}");
        self.tx.send(DaqMessage::Log(msg)).ok();
    }

    fn open_link(&self, mode: ConnectionMode, port: &str) -> Result<Box<dyn DeviceLink>, DaqError> {
        match mode {
            ConnectionMode::Hardware => Ok(Box::new(SerialSession::open(port, &self.config)?)),
            ConnectionMode::Simulation => Ok(Box::new(SimulatedDevice::new(
                self.config.channel_count,
                self.config.sim_interval(),
            ))),
        }
    }

    /// Takes ownership of an already opened link.
    pub fn attach(&mut self, link: Box<dyn DeviceLink>) {
        self.log(format!("✅ Connected to {}", link.describe()));
        self.link = Some(link);
        self.continuous = false;
        self.tx.send(DaqMessage::Status(true)).ok();
    }

    pub fn handle_command(&mut self, cmd: GuiCommand) -> ControlFlow<()> {
        match cmd {
            GuiCommand::Connect { mode, port } => {
                if self.link.is_some() {
                    self.log("Already connected");
                    return ControlFlow::Continue(());
                }
                match self.open_link(mode, &port) {
                    Ok(link) => self.attach(link),
                    Err(e) => {
                        log::error!("failed to connect to {port}: {e}");
                        self.tx
                            .send(DaqMessage::ConnectFailed { port, reason: e.to_string() })
                            .ok();
                    }
                }
            }
            GuiCommand::Disconnect => self.close_link(),
            GuiCommand::StartContinuous => self.set_continuous(true),
            GuiCommand::StopContinuous => self.set_continuous(false),
            GuiCommand::Shutdown => {
                self.close_link();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn set_continuous(&mut self, on: bool) {
        let Some(link) = self.link.as_mut() else {
            self.log("Connect first.");
            return;
        };
        let command = if on { DeviceCommand::StartContinuous } else { DeviceCommand::StopContinuous };
        match link.send_command(command) {
            Ok(()) => {
                self.continuous = on;
                self.tx.send(DaqMessage::Continuous(on)).ok();
                self.log(if on { "🌊 Continuous Started" } else { "🛑 Continuous Stopped" });
            }
            Err(e) => self.drop_link(&e),
        }
    }

    /// Stops streaming if needed, then releases the port.
    fn close_link(&mut self) {
        let Some(mut link) = self.link.take() else {
            return;
        };
        if self.continuous {
            if let Err(e) = link.send_command(DeviceCommand::StopContinuous) {
                log::warn!("could not stop continuous mode on {}: {e}", link.describe());
            }
            self.continuous = false;
            self.tx.send(DaqMessage::Continuous(false)).ok();
        }
        let name = link.describe();
        drop(link);
        self.tx.send(DaqMessage::Status(false)).ok();
        self.log(format!("Disconnected from {name}"));
    }

    fn drop_link(&mut self, err: &DaqError) {
        if let Some(link) = self.link.take() {
            log::error!("link to {} failed: {err}", link.describe());
            self.tx.send(DaqMessage::Log(format!("❌ Link lost: {err}"))).ok();
        }
        if self.continuous {
            self.continuous = false;
            self.tx.send(DaqMessage::Continuous(false)).ok();
        }
        self.tx.send(DaqMessage::Status(false)).ok();
    }

    /// Forwards every line that is ready; returns how many were read.
    pub fn poll_link(&mut self) -> usize {
        let mut count = 0;
        while count < MAX_LINES_PER_POLL {
            let Some(link) = self.link.as_mut() else {
                break;
            };
            match link.next_line() {
                Ok(Some(text)) => {
                    count += 1;
                    let line = parse_line(&text);
                    if line.is_empty() {
                        continue;
                    }
                    let reading = Reading { received_at: SystemTime::now(), line };
                    self.tx.send(DaqMessage::Reading(reading)).ok();
                }
                Ok(None) => break,
                Err(e) => {
                    self.drop_link(&e);
                    break;
                }
            }
        }
        count
    }
}

pub fn spawn_thread(tx: Sender<DaqMessage>, rx_cmd: Receiver<GuiCommand>, config: AppConfig) -> JoinHandle<()> {
    thread::spawn(move || {
        let idle = config.poll_interval();
        let mut engine = Engine::new(tx, config);
        log::info!("DAQ engine ready");

        loop {
            // 1. 处理 GUI 发来的命令
            for _ in 0..MAX_COMMANDS_PER_POLL {
                let cmd = match rx_cmd.try_recv() {
                    Ok(cmd) => cmd,
                    Err(TryRecvError::Empty) => break,
                    // GUI 已退出
                    Err(TryRecvError::Disconnected) => GuiCommand::Shutdown,
                };
                if engine.handle_command(cmd).is_break() {
                    log::info!("DAQ engine stopped");
                    return;
                }
            }

            // 2. 读取串口数据
            if !engine.is_connected() || engine.poll_link() == 0 {
                thread::sleep(idle);
            }
        }
    })
}
