// src/gui.rs
use anyhow::{Context, Result};
use eframe::egui;
use egui::{Color32, RichText};
use egui_plot::{Legend, Line, Plot, PlotPoints};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::SystemTime;

use crate::config::AppConfig;
use crate::drivers::{self, render_waveform_png, PlotStyle};
use crate::engine;
use crate::monitor::MonitorLog;
use crate::types::*;
use crate::waveform::{TimeWindow, WaveformPipeline};

// 每帧最多处理的后台消息数
const MAX_MESSAGES_PER_FRAME: usize = 500;
const MAX_STATUS_LINES: usize = 50;

const CHANNEL_COLORS: [Color32; 4] = [
    Color32::from_rgb(220, 50, 47),
    Color32::from_rgb(38, 139, 210),
    Color32::from_rgb(133, 153, 0),
    Color32::from_rgb(211, 54, 130),
];

pub struct ArduDaqApp {
    config: AppConfig,

    // 连接状态
    connection_mode: ConnectionMode,
    available_ports: Vec<String>,
    selected_port: String,
    is_connected: bool,
    is_connecting: bool,
    is_continuous: bool,

    // 数据与绘图
    pipeline: WaveformPipeline,
    monitor: MonitorLog,
    show_plot: bool,

    // 界面日志
    log_messages: Vec<String>,
    connect_error: Option<String>,

    // 通讯管道
    rx: Receiver<DaqMessage>,
    tx_cmd: Sender<GuiCommand>,
    engine: Option<JoinHandle<()>>,
}

impl ArduDaqApp {
    pub fn new(config: AppConfig) -> Self {
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();

        // 启动后台读取线程
        let engine = engine::spawn_thread(tx, rx_cmd, config.clone());

        let window = config
            .time_windows_secs
            .first()
            .copied()
            .map(TimeWindow::new)
            .unwrap_or_default();

        let mut app = Self {
            pipeline: WaveformPipeline::new(config.channel_count, window),
            monitor: MonitorLog::new(config.max_log_lines),
            connection_mode: ConnectionMode::Hardware,
            available_ports: Vec::new(),
            selected_port: String::new(),
            is_connected: false,
            is_connecting: false,
            is_continuous: false,
            show_plot: false,
            log_messages: vec!["ArduDAQ desktop V0.1 Ready.".to_owned()],
            connect_error: None,
            rx,
            tx_cmd,
            engine: Some(engine),
            config,
        };
        app.refresh_ports();
        app
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > MAX_STATUS_LINES {
            self.log_messages.remove(0);
        }
    }

    fn send(&mut self, cmd: GuiCommand) {
        if self.tx_cmd.send(cmd).is_err() {
            log::error!("DAQ engine is not running");
            self.log("❌ Engine stopped");
        }
    }

    // 刷新端口列表
    fn refresh_ports(&mut self) {
        self.available_ports = drivers::list_ports();
        if !self.available_ports.contains(&self.selected_port) {
            self.selected_port = self.available_ports.first().cloned().unwrap_or_default();
        }
        let msg = format!("Ports: {:?}", self.available_ports);
        self.log(&msg);
    }

    fn connect(&mut self) {
        if self.connection_mode == ConnectionMode::Hardware && self.selected_port.is_empty() {
            self.connect_error = Some("No serial port selected.".to_owned());
            return;
        }
        self.is_connecting = true;
        self.send(GuiCommand::Connect {
            mode: self.connection_mode,
            port: self.selected_port.clone(),
        });
    }

    fn handle_messages(&mut self) {
        for _ in 0..MAX_MESSAGES_PER_FRAME {
            let Ok(msg) = self.rx.try_recv() else {
                break;
            };
            match msg {
                DaqMessage::Log(s) => self.log(&s),
                DaqMessage::Status(b) => {
                    self.is_connected = b;
                    self.is_connecting = false;
                    if !b {
                        self.is_continuous = false;
                    }
                }
                DaqMessage::Continuous(b) => self.is_continuous = b,
                DaqMessage::ConnectFailed { port, reason } => {
                    self.is_connecting = false;
                    self.connect_error = Some(format!("Failed to connect to {port}: {reason}"));
                }
                DaqMessage::Reading(reading) => {
                    let enabled = self.pipeline.enabled_mask();
                    self.monitor
                        .push_reading(reading.received_at, &reading.line, &enabled);
                    self.pipeline.ingest(reading.timestamp_secs(), &reading.line);
                }
            }
        }
    }

    fn export_plot(&self) -> Result<String> {
        let now = SystemTime::now();
        let view = self.pipeline.view(unix_seconds(now));
        let png = render_waveform_png(&view, PlotStyle::default())?;
        let path = format!("ardudaq_plot_{}.png", unix_seconds(now) as u64);
        std::fs::write(&path, png).with_context(|| format!("failed to write {path}"))?;
        Ok(path)
    }

    fn port_row(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let locked = self.is_connected || self.is_connecting;
            ui.add_enabled_ui(!locked, |ui| {
                ui.selectable_value(&mut self.connection_mode, ConnectionMode::Hardware, "REAL");
                ui.selectable_value(&mut self.connection_mode, ConnectionMode::Simulation, "SIM");
                ui.label("Select Port:");
                egui::ComboBox::from_id_source("port_select")
                    .selected_text(self.selected_port.clone())
                    .width(220.0)
                    .show_ui(ui, |ui| {
                        for p in &self.available_ports {
                            ui.selectable_value(&mut self.selected_port, p.clone(), p.as_str());
                        }
                    });
            });

            let btn_txt = if self.is_connected {
                "Disconnect"
            } else if self.is_connecting {
                "Connecting…"
            } else {
                "Connect"
            };
            if ui.add_enabled(!self.is_connecting, egui::Button::new(btn_txt)).clicked() {
                if self.is_connected {
                    self.send(GuiCommand::Disconnect);
                } else {
                    self.connect();
                }
            }
            if ui.add_enabled(!locked, egui::Button::new("Refresh Ports")).clicked() {
                self.refresh_ports();
            }
        });
    }

    fn control_row(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            for i in 0..self.pipeline.channel_count() {
                let mut on = self.pipeline.is_channel_enabled(i);
                if ui.checkbox(&mut on, format!("Channel {}", i + 1)).changed() {
                    self.pipeline.set_channel_enabled(i, on);
                }
            }
            ui.separator();

            let stream_btn = if self.is_continuous { "Stop Continuous" } else { "Start Continuous" };
            if ui.add_enabled(self.is_connected, egui::Button::new(stream_btn)).clicked() {
                if self.is_continuous {
                    self.send(GuiCommand::StopContinuous);
                } else {
                    self.send(GuiCommand::StartContinuous);
                }
            }

            if ui.button("Clear Text").clicked() {
                self.monitor.clear();
            }

            let plot_btn = if self.show_plot { "Hide Plot" } else { "Show Plot" };
            if ui.button(plot_btn).clicked() {
                self.show_plot = !self.show_plot;
            }

            ui.label("Time Window:");
            let current = self.pipeline.time_window().seconds;
            let mut selected = current;
            egui::ComboBox::from_id_source("time_window")
                .selected_text(format!("{current}"))
                .width(48.0)
                .show_ui(ui, |ui| {
                    for &secs in &self.config.time_windows_secs {
                        ui.selectable_value(&mut selected, secs, format!("{secs}"));
                    }
                });
            ui.label("s");
            if selected != current {
                self.pipeline.set_time_window(TimeWindow::new(selected));
            }
        });
    }

    fn plot_panel(&mut self, ui: &mut egui::Ui) {
        let view = self.pipeline.view(unix_seconds(SystemTime::now()));
        ui.horizontal(|ui| {
            ui.heading("Voltage vs Time");
            for ch in &view.channels {
                let col = CHANNEL_COLORS[ch.index % CHANNEL_COLORS.len()];
                ui.label(RichText::new(format!("CH{} {:.3} V", ch.index + 1, ch.latest)).color(col));
            }
            if ui.button("Clear Plot").clicked() {
                self.pipeline.clear();
            }
            if ui.button("Export PNG").clicked() {
                match self.export_plot() {
                    Ok(path) => self.log(&format!("💾 Plot saved to {path}")),
                    Err(e) => {
                        log::error!("plot export failed: {e:#}");
                        self.log(&format!("❌ Export failed: {e}"));
                    }
                }
            }
        });

        Plot::new("voltage_plot")
            .legend(Legend::default())
            .x_axis_label("Time (s)")
            .y_axis_label("Voltage (V)")
            .include_x(0.0)
            .include_x(view.window_secs)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                for ch in &view.channels {
                    let col = CHANNEL_COLORS[ch.index % CHANNEL_COLORS.len()];
                    plot_ui.line(
                        Line::new(PlotPoints::new(ch.points()))
                            .name(format!("Channel {}", ch.index + 1))
                            .color(col),
                    );
                }
            });
    }

    fn error_dialog(&mut self, ctx: &egui::Context) {
        let Some(msg) = self.connect_error.clone() else {
            return;
        };
        let mut close = false;
        egui::Window::new("Connection Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(RichText::new(msg).color(Color32::RED));
                if ui.button("OK").clicked() {
                    close = true;
                }
            });
        if close {
            self.connect_error = None;
        }
    }
}

impl eframe::App for ArduDaqApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. 消息处理
        self.handle_messages();

        // 2. UI 绘制
        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(4.0);
            self.port_row(ui);
            self.control_row(ui);
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .max_height(80.0)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for m in &self.log_messages {
                        ui.monospace(m);
                    }
                });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let monitor_height = if self.show_plot { 160.0 } else { f32::INFINITY };
            egui::ScrollArea::vertical()
                .id_source("monitor")
                .max_height(monitor_height)
                .auto_shrink([false, true])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for line in self.monitor.lines() {
                        ui.monospace(line);
                    }
                });
            if self.show_plot {
                ui.separator();
                self.plot_panel(ui);
            }
        });

        self.error_dialog(ctx);

        // 3. 定时刷新
        ctx.request_repaint_after(self.config.refresh_interval());
    }
}

impl Drop for ArduDaqApp {
    fn drop(&mut self) {
        // 通知后台线程停止采集并关闭串口，再等待其退出
        self.tx_cmd.send(GuiCommand::Shutdown).ok();
        if let Some(handle) = self.engine.take() {
            if handle.join().is_err() {
                log::error!("DAQ engine thread panicked");
            }
        }
    }
}
