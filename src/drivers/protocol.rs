use std::fmt;
use std::num::ParseFloatError;
use thiserror::Error;

const TOKEN_SEPARATOR: &str = ", ";
const VALUE_SEPARATOR: &str = ": ";

/// Plaintext commands understood by the acquisition firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceCommand {
    StartContinuous,
    StopContinuous,
}

impl DeviceCommand {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            DeviceCommand::StartContinuous => b"START_CONTINUOUS\n",
            DeviceCommand::StopContinuous => b"STOP_CONTINUOUS\n",
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceCommand::StartContinuous => f.write_str("START_CONTINUOUS"),
            DeviceCommand::StopContinuous => f.write_str("STOP_CONTINUOUS"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("token {token:?} has no \": \" separator")]
    MissingSeparator { token: String },
    #[error("invalid voltage {value:?}: {source}")]
    InvalidVoltage {
        value: String,
        source: ParseFloatError,
    },
}

/// One `CH_<n>: <value>V` fragment of a reading line.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelToken {
    /// Position of the token in the line; this is the channel index.
    pub position: usize,
    pub raw: String,
    pub voltage: Result<f64, ProtocolError>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedLine {
    pub tokens: Vec<ChannelToken>,
}

impl ParsedLine {
    pub fn voltages(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.tokens
            .iter()
            .filter_map(|t| t.voltage.as_ref().ok().map(|v| (t.position, *v)))
    }

    pub fn errors(&self) -> impl Iterator<Item = (usize, &str, &ProtocolError)> + '_ {
        self.tokens.iter().filter_map(|t| match &t.voltage {
            Err(e) => Some((t.position, t.raw.as_str(), e)),
            Ok(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Splits a reading line into per-channel tokens.
///
/// A malformed token is kept with its error so the remaining channels of the
/// same line still parse.
pub fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim();
    if line.is_empty() {
        return ParsedLine::default();
    }
    let tokens = line
        .split(TOKEN_SEPARATOR)
        .enumerate()
        .map(|(position, raw)| parse_token(position, raw))
        .collect();
    ParsedLine { tokens }
}

fn parse_token(position: usize, raw: &str) -> ChannelToken {
    // 取第一个与第二个 ": " 之间的字段
    let voltage = match raw.split(VALUE_SEPARATOR).nth(1) {
        Some(value) => parse_voltage(value),
        None => Err(ProtocolError::MissingSeparator {
            token: raw.to_string(),
        }),
    };
    ChannelToken {
        position,
        raw: raw.to_string(),
        voltage,
    }
}

fn parse_voltage(value: &str) -> Result<f64, ProtocolError> {
    let cleaned = value.trim().trim_end_matches(',').trim_end();
    let cleaned = cleaned.strip_suffix('V').unwrap_or(cleaned).trim();
    cleaned
        .parse::<f64>()
        .map_err(|source| ProtocolError::InvalidVoltage {
            value: value.trim().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_channel_line() {
        let parsed = parse_line("CH_0: 1.2345V, CH_1: 0.5V");
        let values: Vec<_> = parsed.voltages().collect();
        assert_eq!(values, vec![(0, 1.2345), (1, 0.5)]);
        assert_eq!(parsed.tokens[1].raw, "CH_1: 0.5V");
        assert_eq!(parsed.errors().count(), 0);
    }

    #[test]
    fn handles_trailing_comma_and_newline() {
        let parsed = parse_line("CH_0: 3.3V, CH_1: -0.25V, CH_2: 0V, CH_3: 4.99V,\r\n");
        let values: Vec<_> = parsed.voltages().collect();
        assert_eq!(values, vec![(0, 3.3), (1, -0.25), (2, 0.0), (3, 4.99)]);
    }

    #[test]
    fn malformed_token_does_not_poison_line() {
        let parsed = parse_line("CH_0: 1.0V, garbage, CH_2: abcV, CH_3: 2.5V");
        let values: Vec<_> = parsed.voltages().collect();
        assert_eq!(values, vec![(0, 1.0), (3, 2.5)]);
        let errors: Vec<_> = parsed.errors().map(|(pos, raw, _)| (pos, raw)).collect();
        assert_eq!(errors, vec![(1, "garbage"), (2, "CH_2: abcV")]);
        assert!(matches!(
            parsed.tokens[1].voltage,
            Err(ProtocolError::MissingSeparator { .. })
        ));
        assert!(matches!(
            parsed.tokens[2].voltage,
            Err(ProtocolError::InvalidVoltage { .. })
        ));
    }

    #[test]
    fn value_stops_at_second_separator() {
        let parsed = parse_line("CH_0: 1.0: xV, CH_1: 2.5V");
        let values: Vec<_> = parsed.voltages().collect();
        assert_eq!(values, vec![(0, 1.0), (1, 2.5)]);
    }

    #[test]
    fn empty_line_has_no_tokens() {
        assert!(parse_line("   \n").is_empty());
    }

    #[test]
    fn commands_are_newline_terminated() {
        assert_eq!(DeviceCommand::StartContinuous.as_bytes(), b"START_CONTINUOUS\n");
        assert_eq!(DeviceCommand::StopContinuous.as_bytes(), b"STOP_CONTINUOUS\n");
        assert_eq!(DeviceCommand::StopContinuous.to_string(), "STOP_CONTINUOUS");
    }
}
