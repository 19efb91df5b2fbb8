// src/config.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 指向 JSON 配置文件的环境变量
pub const CONFIG_ENV: &str = "ARDUDAQ_CONFIG";

const MIN_INTERVAL_MS: u64 = 1;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    /// The board resets when the port opens; wait this long before talking to it.
    pub settle_ms: u64,
    pub poll_interval_ms: u64,
    pub refresh_interval_ms: u64,
    pub channel_count: usize,
    pub time_windows_secs: Vec<f64>,
    pub max_log_lines: usize,
    pub sim_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout_ms: 1000,
            settle_ms: 2000,
            poll_interval_ms: 100,
            refresh_interval_ms: 50,
            channel_count: 4,
            time_windows_secs: vec![10.0, 20.0, 30.0],
            max_log_lines: 500,
            sim_interval_ms: 100,
        }
    }
}

impl AppConfig {
    /// 读取 `ARDUDAQ_CONFIG`；未设置时使用默认值
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(text)?;
        config.sanitize();
        Ok(config)
    }

    fn sanitize(&mut self) {
        self.channel_count = self.channel_count.max(1);
        self.time_windows_secs.retain(|s| s.is_finite() && *s > 0.0);
        if self.time_windows_secs.is_empty() {
            self.time_windows_secs = Self::default().time_windows_secs;
        }
        self.max_log_lines = self.max_log_lines.max(1);
        // 0 ms 会让后台线程空转
        self.poll_interval_ms = self.poll_interval_ms.max(MIN_INTERVAL_MS);
        self.sim_interval_ms = self.sim_interval_ms.max(MIN_INTERVAL_MS);
        self.refresh_interval_ms = self.refresh_interval_ms.max(MIN_INTERVAL_MS);
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn sim_interval(&self) -> Duration {
        Duration::from_millis(self.sim_interval_ms)
    }
}
