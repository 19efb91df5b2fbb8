use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::thread;
use serialport::SerialPort;
use crate::config::AppConfig;
use crate::drivers::error::DaqError;
use crate::drivers::protocol::DeviceCommand;
use crate::drivers::source::DeviceLink;

/// Names of the serial ports currently visible to the OS.
pub fn list_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            log::warn!("failed to enumerate serial ports: {e}");
            Vec::new()
        }
    }
}

/// Rebuilds `\n`-terminated lines from a reader that may time out mid-line.
#[derive(Default)]
struct LineAssembler {
    // bytes of a line whose terminator has not arrived yet
    pending: Vec<u8>,
}

impl LineAssembler {
    /// One read. `Some` only for a complete, non-blank line, decoded lossily and trimmed.
    fn read_from<R: BufRead>(&mut self, reader: &mut R) -> io::Result<Option<String>> {
        match reader.read_until(b'\n', &mut self.pending) {
            Ok(_) if self.pending.ends_with(b"\n") => {
                let bytes = std::mem::take(&mut self.pending);
                let line = String::from_utf8_lossy(&bytes).trim().to_string();
                Ok((!line.is_empty()).then_some(line))
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Line-oriented session with the acquisition board over a serial port.
pub struct SerialSession {
    port_name: String,
    reader: BufReader<Box<dyn SerialPort>>,
    lines: LineAssembler,
}

impl SerialSession {
    /// Opens the port and waits for the board to come out of reset.
    pub fn open(port_name: &str, config: &AppConfig) -> Result<Self, DaqError> {
        let port = serialport::new(port_name, config.baud_rate)
            .timeout(config.read_timeout())
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()?;
        log::info!("opened {port_name} at {} baud", config.baud_rate);
        thread::sleep(config.settle_delay());
        Ok(Self {
            port_name: port_name.to_string(),
            reader: BufReader::new(port),
            lines: LineAssembler::default(),
        })
    }

    fn has_input(&self) -> Result<bool, DaqError> {
        if !self.reader.buffer().is_empty() {
            return Ok(true);
        }
        Ok(self.reader.get_ref().bytes_to_read()? > 0)
    }
}

impl DeviceLink for SerialSession {
    fn send_command(&mut self, command: DeviceCommand) -> Result<(), DaqError> {
        let port = self.reader.get_mut();
        port.write_all(command.as_bytes())?;
        port.flush()?;
        log::info!("sent {command} to {}", self.port_name);
        Ok(())
    }

    fn next_line(&mut self) -> Result<Option<String>, DaqError> {
        while self.has_input()? {
            if let Some(line) = self.lines.read_from(&mut self.reader)? {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn describe(&self) -> String {
        self.port_name.clone()
    }
}
