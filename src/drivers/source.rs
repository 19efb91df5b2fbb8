use crate::drivers::error::DaqError;
use crate::drivers::protocol::DeviceCommand;
use rand::{rngs::StdRng, Rng, SeedableRng};
#[cfg(test)]
use std::collections::VecDeque;
#[cfg(test)]
use std::io;
#[cfg(test)]
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Anything the engine can read reading lines from and send commands to.
pub trait DeviceLink: Send {
    fn send_command(&mut self, command: DeviceCommand) -> Result<(), DaqError>;
    /// Next complete line, or `None` if nothing is ready yet. Never blocks for long.
    fn next_line(&mut self) -> Result<Option<String>, DaqError>;
    fn describe(&self) -> String;
}

/// In-memory link useful for tests and deterministic playback.
#[cfg(test)]
pub struct ManualLink {
    lines: VecDeque<String>,
    sent: Arc<Mutex<Vec<DeviceCommand>>>,
    hang_up_when_drained: bool,
}

#[cfg(test)]
impl ManualLink {
    pub fn new(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            sent: Arc::new(Mutex::new(Vec::new())),
            hang_up_when_drained: false,
        }
    }

    /// Report an I/O error once the scripted lines run out, like an unplugged cable.
    pub fn hang_up_when_drained(mut self) -> Self {
        self.hang_up_when_drained = true;
        self
    }

    /// Shared handle to the commands written so far.
    pub fn sent_commands(&self) -> Arc<Mutex<Vec<DeviceCommand>>> {
        Arc::clone(&self.sent)
    }
}

#[cfg(test)]
impl DeviceLink for ManualLink {
    fn send_command(&mut self, command: DeviceCommand) -> Result<(), DaqError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(command);
        }
        Ok(())
    }

    fn next_line(&mut self) -> Result<Option<String>, DaqError> {
        match self.lines.pop_front() {
            Some(line) => Ok(Some(line)),
            None if self.hang_up_when_drained => Err(DaqError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device disconnected",
            ))),
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        "manual".to_owned()
    }
}

/// Stand-in board that speaks the same line protocol as the real firmware.
///
/// Lines are only produced while continuous mode is on, one every `interval`.
pub struct SimulatedDevice {
    channel_count: usize,
    interval: Duration,
    continuous: bool,
    next_due: Instant,
    phase: f64,
    rng: StdRng,
}

impl SimulatedDevice {
    pub fn new(channel_count: usize, interval: Duration) -> Self {
        Self {
            channel_count,
            interval,
            continuous: false,
            next_due: Instant::now(),
            phase: 0.0,
            rng: StdRng::from_entropy(),
        }
    }

    fn render_line(&mut self) -> String {
        self.phase += self.interval.as_secs_f64();
        let mut parts = Vec::with_capacity(self.channel_count);
        for ch in 0..self.channel_count {
            let freq = 0.2 + ch as f64 * 0.15;
            let base = 2.5 + 2.0 * (std::f64::consts::TAU * freq * self.phase + ch as f64).sin();
            let noise: f64 = self.rng.gen_range(-0.05..0.05);
            let volts = (base + noise).clamp(0.0, 5.0);
            parts.push(format!("CH_{ch}: {volts:.4}V"));
        }
        parts.join(", ")
    }
}

impl DeviceLink for SimulatedDevice {
    fn send_command(&mut self, command: DeviceCommand) -> Result<(), DaqError> {
        match command {
            DeviceCommand::StartContinuous => {
                self.continuous = true;
                self.next_due = Instant::now();
            }
            DeviceCommand::StopContinuous => self.continuous = false,
        }
        Ok(())
    }

    fn next_line(&mut self) -> Result<Option<String>, DaqError> {
        if !self.continuous || Instant::now() < self.next_due {
            return Ok(None);
        }
        self.next_due += self.interval;
        Ok(Some(self.render_line()))
    }

    fn describe(&self) -> String {
        "simulator".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::protocol::parse_line;

    #[test]
    fn simulator_is_silent_until_started() {
        let mut sim = SimulatedDevice::new(4, Duration::ZERO);
        assert!(sim.next_line().unwrap().is_none());
        sim.send_command(DeviceCommand::StartContinuous).unwrap();
        let line = sim.next_line().unwrap().unwrap();
        let parsed = parse_line(&line);
        assert_eq!(parsed.voltages().count(), 4);
        assert!(parsed.voltages().all(|(_, v)| (0.0..=5.0).contains(&v)));
        sim.send_command(DeviceCommand::StopContinuous).unwrap();
        assert!(sim.next_line().unwrap().is_none());
    }

    #[test]
    fn manual_link_records_commands_and_hangs_up() {
        let mut link = ManualLink::new(["CH_0: 1V"]).hang_up_when_drained();
        let sent = link.sent_commands();
        link.send_command(DeviceCommand::StartContinuous).unwrap();
        assert_eq!(link.next_line().unwrap().as_deref(), Some("CH_0: 1V"));
        assert!(link.next_line().is_err());
        assert_eq!(*sent.lock().unwrap(), vec![DeviceCommand::StartContinuous]);
    }
}
