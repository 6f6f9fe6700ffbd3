//! Static device catalog.
//!
//! | Index | Identity | Kind | Initial state |
//! |-------|----------|------|---------------|
//! | 0 | `light_livingroom` | Light | `off` |
//! | 1 | `light_bedroom` | Light | `off` |
//! | 2 | `socket_kitchen` | Socket | `off` |
//! | 3 | `sensor_temp_main` | `TempSensor` | `22.5` |

use crate::kind::DeviceKind;
use crate::state::{DeviceState, SensorValue, SwitchState, Tenths};

/// Number of devices in the catalog.
pub const DEVICE_COUNT: usize = 4;

/// Reading the temperature sensor starts at (22.5°).
pub const INITIAL_READING: Tenths = Tenths::new(225);

/// One declared device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub identity: &'static str,
    pub kind: DeviceKind,
}

impl CatalogEntry {
    /// The catalog default state for this entry's kind.
    #[must_use]
    pub fn initial_state(&self) -> DeviceState {
        if self.kind.is_sensor() {
            DeviceState::Sensor(SensorValue::from_tenths(INITIAL_READING))
        } else {
            DeviceState::Switch(SwitchState::Off)
        }
    }
}

/// Devices in declaration order.
pub const CATALOG: [CatalogEntry; DEVICE_COUNT] = [
    CatalogEntry {
        identity: "light_livingroom",
        kind: DeviceKind::Light,
    },
    CatalogEntry {
        identity: "light_bedroom",
        kind: DeviceKind::Light,
    },
    CatalogEntry {
        identity: "socket_kitchen",
        kind: DeviceKind::Socket,
    },
    CatalogEntry {
        identity: "sensor_temp_main",
        kind: DeviceKind::TempSensor,
    },
];
