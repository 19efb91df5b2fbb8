// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod config;
mod drivers;
mod engine;
mod gui;
mod monitor;
mod types;
mod waveform;

use config::AppConfig;
use eframe::egui;

// 未设置 RUST_LOG 时也要输出解析警告
const DEFAULT_LOG_FILTER: &str = "info";

fn logger(filter_env: &str) -> env_logger::Builder {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or(filter_env, DEFAULT_LOG_FILTER))
}

// 入口函数
fn main() -> eframe::Result<()> {
    logger("RUST_LOG").init();
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("{e:#}; falling back to default settings");
        AppConfig::default()
    });
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([960.0, 720.0])
        .with_min_inner_size([760.0, 480.0])
        .with_title("ArduDAQ desktop V0.1");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "ArduDAQ",
        options,
        Box::new(move |_cc| Box::new(gui::ArduDaqApp::new(config))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;

    #[test]
    fn warnings_are_shown_without_an_env_filter() {
        let logger = logger("ARDUDAQ_TEST_UNSET_FILTER").build();
        assert_eq!(logger.filter(), LevelFilter::Info);
    }

    #[test]
    fn env_filter_overrides_the_default() {
        std::env::set_var("ARDUDAQ_TEST_ERROR_FILTER", "error");
        let logger = logger("ARDUDAQ_TEST_ERROR_FILTER").build();
        assert_eq!(logger.filter(), LevelFilter::Error);
    }
}
