// src/monitor.rs
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::time::SystemTime;

use crate::drivers::ParsedLine;

/// `[HH:MM:SS]` in local time, the prefix of every monitor line.
pub fn clock_stamp(at: SystemTime) -> String {
    DateTime::<Local>::from(at).format("[%H:%M:%S]").to_string()
}

/// 把一行读数格式化为显示文本；只保留已勾选的通道
///
/// Tokens that failed to parse are still shown; they are only left out of the plot.
pub fn format_reading(stamp: &str, line: &ParsedLine, enabled: &[bool]) -> Option<String> {
    let shown: Vec<&str> = line
        .tokens
        .iter()
        .filter(|t| enabled.get(t.position).copied().unwrap_or(false))
        .map(|t| t.raw.as_str())
        .collect();
    if shown.is_empty() {
        return None;
    }
    Some(format!("{} {}", stamp, shown.join(" | ")))
}

/// Scrollback of the text monitor.
pub struct MonitorLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl MonitorLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn push_reading(&mut self, at: SystemTime, line: &ParsedLine, enabled: &[bool]) -> bool {
        match format_reading(&clock_stamp(at), line, enabled) {
            Some(text) => {
                self.push(text);
                true
            }
            None => false,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::parse_line;

    #[test]
    fn shows_only_enabled_channels() {
        let line = parse_line("CH_0: 1.2345V, CH_1: 0.5V, CH_2: 3.3V");
        let text = format_reading("[12:00:00]", &line, &[true, false, true, false]);
        assert_eq!(text.as_deref(), Some("[12:00:00] CH_0: 1.2345V | CH_2: 3.3V"));
    }

    #[test]
    fn nothing_enabled_means_no_line() {
        let line = parse_line("CH_0: 1V, CH_1: 2V");
        assert_eq!(format_reading("[00:00:00]", &line, &[false; 4]), None);
        assert_eq!(format_reading("[00:00:00]", &line, &[]), None);
    }

    #[test]
    fn malformed_tokens_are_still_displayed() {
        let line = parse_line("CH_0: ???V, CH_1: 2V");
        let text = format_reading("[00:00:01]", &line, &[true, true]).unwrap();
        assert_eq!(text, "[00:00:01] CH_0: ???V | CH_1: 2V");
    }

    #[test]
    fn scrollback_is_bounded() {
        let mut log = MonitorLog::new(3);
        for i in 0..5 {
            log.push(format!("line {i}"));
        }
        let kept: Vec<&str> = log.lines().collect();
        assert_eq!(kept, vec!["line 2", "line 3", "line 4"]);
        log.clear();
        assert_eq!(log.lines().count(), 0);
    }

    #[test]
    fn stamped_reading_has_clock_prefix() {
        let mut log = MonitorLog::new(10);
        let line = parse_line("CH_0: 1V");
        assert!(log.push_reading(SystemTime::now(), &line, &[true]));
        assert!(!log.push_reading(SystemTime::now(), &line, &[false]));
        let first = log.lines().next().unwrap();
        assert!(first.starts_with('['));
        assert_eq!(&first[9..], "] CH_0: 1V");
    }
}
