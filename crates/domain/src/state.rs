//! Device state: a switch position or a sensor reading.
//!
//! Readings are computed on [`Tenths`] and stored as their short text form,
//! which is what a read hands out byte by byte.

use std::fmt;

use crate::codec;
use crate::kind::DeviceKind;

/// Position of a switchable device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchState {
    On,
    #[default]
    Off,
}

impl SwitchState {
    /// Text form handed out by reads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A temperature in tenths of a degree (`225` is `22.5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tenths(i32);

impl Tenths {
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

/// Formats as `<v/10>.<|v%10|>`; the sign only appears on the integer part.
impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, (self.0 % 10).abs())
    }
}

/// Stored text of a sensor reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorValue(String);

impl SensorValue {
    #[must_use]
    pub fn from_tenths(value: Tenths) -> Self {
        Self(value.to_string())
    }

    /// Wrap arbitrary stored text, without validating it.
    ///
    /// Text that does not parse is recovered by the drift simulator on the
    /// next read.
    #[must_use]
    pub fn from_raw(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the stored text, `None` when it is not a reading.
    #[must_use]
    pub fn tenths(&self) -> Option<Tenths> {
        codec::parse_reading(&self.0)
    }
}

/// State held by a device entry. The variant always matches the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    Switch(SwitchState),
    Sensor(SensorValue),
}

impl DeviceState {
    /// Whether this variant is the one `kind` requires.
    #[must_use]
    pub fn matches(&self, kind: DeviceKind) -> bool {
        match self {
            Self::Switch(_) => !kind.is_sensor(),
            Self::Sensor(_) => kind.is_sensor(),
        }
    }
}
