use std::collections::BTreeMap;

/// The two independently heated bodies of water on a Pentair controller.
///
/// The zone address doubles as the device element carrying the heat mode
/// (`poolht`/`spaht`); the setpoint lives in a sibling element
/// (`poolsp`/`spasp`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneId {
    Pool,
    Spa,
}

impl ZoneId {
    pub const ALL: [ZoneId; 2] = [ZoneId::Pool, ZoneId::Spa];

    pub fn address(&self) -> &'static str {
        match self {
            ZoneId::Pool => "poolht",
            ZoneId::Spa => "spaht",
        }
    }

    pub fn setpoint_field(&self) -> &'static str {
        match self {
            ZoneId::Pool => "poolsp",
            ZoneId::Spa => "spasp",
        }
    }

    pub fn from_address(address: &str) -> Option<Self> {
        match address {
            "poolht" => Some(ZoneId::Pool),
            "spaht" => Some(ZoneId::Spa),
            _ => None,
        }
    }

    /// Bit in `htstatus` meaning the zone's heater is actively heating.
    pub(crate) fn heat_bit(&self) -> i32 {
        match self {
            ZoneId::Pool => 0b0001,
            ZoneId::Spa => 0b0010,
        }
    }

    /// Bit in `htstatus` meaning the zone is heated by the alternate
    /// source (solar).
    pub(crate) fn alt_bit(&self) -> i32 {
        match self {
            ZoneId::Pool => 0b0100,
            ZoneId::Spa => 0b1000,
        }
    }
}

/// Tri-state heating status of a zone, derived from `htstatus` on every
/// sync. Commands never write this; the next poll recomputes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoneStatus {
    #[default]
    Off,
    Heating,
    OtherActive,
}

impl ZoneStatus {
    pub fn as_index(&self) -> i32 {
        match self {
            ZoneStatus::Off => 0,
            ZoneStatus::Heating => 1,
            ZoneStatus::OtherActive => 2,
        }
    }

    pub fn from_index(value: i32) -> Option<Self> {
        match value {
            0 => Some(ZoneStatus::Off),
            1 => Some(ZoneStatus::Heating),
            2 => Some(ZoneStatus::OtherActive),
            _ => None,
        }
    }
}

/// Host-side driver slots, named for what they carry. `code()` gives the
/// ISY driver identifier the hub expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    RunState,
    OpMode,
    Freeze,
    WaterSensor,
    SolarSensor,
    AirSensor,
    AirTemp,
    SolarTemp,
    Status,
    HeatMode,
    Setpoint,
    CurrentTemp,
}

impl Driver {
    pub fn code(&self) -> &'static str {
        match self {
            Driver::RunState => "GV0",
            Driver::OpMode => "GV1",
            Driver::Freeze => "GV2",
            Driver::WaterSensor => "GV3",
            Driver::SolarSensor => "GV4",
            Driver::AirSensor => "GV5",
            Driver::AirTemp => "CLITEMP",
            Driver::SolarTemp => "GV9",
            Driver::Status => "ST",
            Driver::HeatMode => "CLIMD",
            Driver::Setpoint => "CLISPH",
            Driver::CurrentTemp => "CLITEMP",
        }
    }
}

/// Commands the host can send to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    On,
    Off,
    SetMode(i32),
    SetTemp(i32),
    Query,
}

/// Controller-level fields of a decoded status payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStatus {
    pub runstate: i32,
    pub opmode: i32,
    pub freeze: i32,
    pub water_sensor: i32,
    pub solar_sensor: i32,
    pub air_sensor: i32,
    pub air_temp: i32,
    pub solar_temp: i32,
}

impl ControllerStatus {
    /// Driver/value pairs in the host's reporting order.
    pub fn drivers(&self) -> [(Driver, i32); 8] {
        [
            (Driver::RunState, self.runstate),
            (Driver::OpMode, self.opmode),
            (Driver::Freeze, self.freeze),
            (Driver::WaterSensor, self.water_sensor),
            (Driver::SolarSensor, self.solar_sensor),
            (Driver::AirSensor, self.air_sensor),
            (Driver::AirTemp, self.air_temp),
            (Driver::SolarTemp, self.solar_temp),
        ]
    }
}

/// One zone's slice of a decoded status payload. The mode is the
/// device-defined small-integer heat setting, carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneReading {
    pub zone: ZoneId,
    pub status: ZoneStatus,
    pub mode: i32,
    pub setpoint: i32,
    pub current_temp: i32,
}

/// Normalized status payload: one controller record, exactly two zone
/// readings, and the on/off state of every equipment element that reported
/// a value. Equipment with empty text is absent, not zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    pub controller: ControllerStatus,
    pub zones: [ZoneReading; 2],
    pub equipment: BTreeMap<String, i32>,
    pub temp_units: String,
}
