//! Device kind: the closed set of simulated device types.

/// Type of a simulated device. Determines capability and state encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Light,
    Socket,
    TempSensor,
}

impl DeviceKind {
    /// Whether the device accepts write commands.
    ///
    /// Every kind is readable; only switch kinds are writable.
    #[must_use]
    pub fn is_writable(self) -> bool {
        matches!(self, Self::Light | Self::Socket)
    }

    /// Whether reads of this device run the drift simulator.
    #[must_use]
    pub fn is_sensor(self) -> bool {
        matches!(self, Self::TempSensor)
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Light => f.write_str("light"),
            Self::Socket => f.write_str("socket"),
            Self::TempSensor => f.write_str("sensor_temp"),
        }
    }
}
