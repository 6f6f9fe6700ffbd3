//! State codec: short text form of device state and write-command decoding.

use crate::error::InvalidCommand;
use crate::state::{DeviceState, SwitchState, Tenths};

/// Longest live state text a read can hand out.
pub const MAX_STATE_LEN: usize = 9;

/// Write payloads are truncated to this many bytes before decoding.
pub const MAX_COMMAND_LEN: usize = 15;

/// A decoded write command for a switch device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchCommand {
    On,
    Off,
}

impl From<SwitchCommand> for SwitchState {
    fn from(command: SwitchCommand) -> Self {
        match command {
            SwitchCommand::On => Self::On,
            SwitchCommand::Off => Self::Off,
        }
    }
}

/// Text form of a state, as handed out by reads.
#[must_use]
pub fn encode(state: &DeviceState) -> &str {
    match state {
        DeviceState::Switch(switch) => switch.as_str(),
        DeviceState::Sensor(value) => value.as_str(),
    }
}

/// Decode a write payload into a switch command.
///
/// Exactly one trailing newline is trimmed. The remaining bytes must be one
/// of `on`, `1`, `off`, `0`, compared case-sensitively.
///
/// # Errors
///
/// Returns [`InvalidCommand`] for any other payload.
pub fn decode_write_command(raw: &[u8]) -> Result<SwitchCommand, InvalidCommand> {
    let token = raw.strip_suffix(b"\n").unwrap_or(raw);
    match token {
        b"on" | b"1" => Ok(SwitchCommand::On),
        b"off" | b"0" => Ok(SwitchCommand::Off),
        other => Err(InvalidCommand::from_bytes(other)),
    }
}

/// Parse a stored reading back to tenths.
///
/// Accepts `<int>.<frac>`, scaled as `int * 10 + frac` (the fraction is
/// subtracted for negative integer parts), and a bare `<int>` scaled as
/// `int * 10`. Leading whitespace and an explicit sign are accepted on
/// each number, trailing text is ignored.
#[must_use]
pub fn parse_reading(text: &str) -> Option<Tenths> {
    let (int, rest) = scan_int(text)?;
    let frac = rest
        .strip_prefix('.')
        .and_then(scan_int)
        .map(|(frac, _)| frac);
    let scaled = int.checked_mul(10)?;
    let scaled = match frac {
        Some(frac) if int >= 0 => scaled.checked_add(frac)?,
        Some(frac) => scaled.checked_sub(frac)?,
        None => scaled,
    };
    Some(Tenths::new(scaled))
}

fn scan_int(text: &str) -> Option<(i32, &str)> {
    let text = text.trim_start();
    let sign_len = usize::from(text.starts_with(['+', '-']));
    let digits = text[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    let (number, rest) = text.split_at(sign_len + digits);
    number.parse().ok().map(|value| (value, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SensorValue;

    #[test]
    fn should_encode_switch_states() {
        assert_eq!(encode(&DeviceState::Switch(SwitchState::On)), "on");
        assert_eq!(encode(&DeviceState::Switch(SwitchState::Off)), "off");
    }

    #[test]
    fn should_encode_sensor_reading() {
        let state = DeviceState::Sensor(SensorValue::from_tenths(Tenths::new(225)));
        assert_eq!(encode(&state), "22.5");
    }

    #[test]
    fn should_decode_on_tokens() {
        assert_eq!(decode_write_command(b"on"), Ok(SwitchCommand::On));
        assert_eq!(decode_write_command(b"1"), Ok(SwitchCommand::On));
        assert_eq!(decode_write_command(b"on\n"), Ok(SwitchCommand::On));
    }

    #[test]
    fn should_decode_off_tokens() {
        assert_eq!(decode_write_command(b"off"), Ok(SwitchCommand::Off));
        assert_eq!(decode_write_command(b"0\n"), Ok(SwitchCommand::Off));
    }

    #[test]
    fn should_reject_other_payloads() {
        let payloads: [&[u8]; 10] = [
            b"ON",
            b"On",
            b" on",
            b"on ",
            b"on\n\n",
            b"on\r\n",
            b"",
            b"\n",
            b"2",
            b"toggle",
        ];
        for raw in payloads {
            assert!(decode_write_command(raw).is_err(), "{raw:?} should fail");
        }
    }

    #[test]
    fn should_parse_decimal_reading() {
        assert_eq!(parse_reading("22.5"), Some(Tenths::new(225)));
        assert_eq!(parse_reading("-5.2"), Some(Tenths::new(-52)));
        assert_eq!(parse_reading("+3.0"), Some(Tenths::new(30)));
    }

    #[test]
    fn should_parse_integer_only_reading() {
        assert_eq!(parse_reading("21"), Some(Tenths::new(210)));
        assert_eq!(parse_reading("21."), Some(Tenths::new(210)));
        assert_eq!(parse_reading("21.x"), Some(Tenths::new(210)));
    }

    #[test]
    fn should_add_multi_digit_fraction_as_is() {
        assert_eq!(parse_reading("22.55"), Some(Tenths::new(275)));
    }

    #[test]
    fn should_reject_unparsable_reading() {
        assert_eq!(parse_reading(""), None);
        assert_eq!(parse_reading("abc"), None);
        assert_eq!(parse_reading("-.5"), None);
        assert_eq!(parse_reading("99999999999.0"), None);
    }
}
