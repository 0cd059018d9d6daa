use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{ControllerStatus, PoolStatus, ZoneId, ZoneReading, ZoneStatus};
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct RawStatus {
    system: Option<RawSystem>,
    equipment: Option<BTreeMap<String, String>>,
    temp: Option<RawTemp>,
}

#[derive(Debug, Deserialize)]
struct RawSystem {
    runstate: i32,
    opmode: i32,
    freeze: i32,
    sensor1: i32,
    sensor2: i32,
    sensor3: i32,
}

#[derive(Debug, Deserialize)]
struct RawTemp {
    tempunits: String,
    htstatus: i32,
    poolht: i32,
    poolsp: i32,
    pooltemp: i32,
    spaht: i32,
    spasp: i32,
    spatemp: i32,
    airtemp: i32,
    soltemp: i32,
}

/// Classify one zone from the composite `htstatus` bitmask. The "actively
/// heating" bit wins when both of the zone's bits are set.
pub fn resolve_zone_status(htstatus: i32, zone: ZoneId) -> ZoneStatus {
    if htstatus & zone.heat_bit() != 0 {
        ZoneStatus::Heating
    } else if htstatus & zone.alt_bit() != 0 {
        ZoneStatus::OtherActive
    } else {
        ZoneStatus::Off
    }
}

/// Decode a raw `/status.xml` payload into a normalized [`PoolStatus`].
///
/// Any missing section, missing required leaf, or non-integer value fails
/// the whole decode; callers must not partially apply a failed decode.
pub fn decode_status(xml: &str) -> Result<PoolStatus> {
    let raw: RawStatus =
        serde_xml_rs::from_str(xml).map_err(|e| Error::MalformedStatus(e.to_string()))?;

    let system = raw
        .system
        .ok_or_else(|| Error::MalformedStatus("missing <system> section".to_string()))?;
    let equipment = raw
        .equipment
        .ok_or_else(|| Error::MalformedStatus("missing <equipment> section".to_string()))?;
    let temp = raw
        .temp
        .ok_or_else(|| Error::MalformedStatus("missing <temp> section".to_string()))?;

    let controller = ControllerStatus {
        runstate: system.runstate,
        opmode: system.opmode,
        freeze: system.freeze,
        water_sensor: system.sensor1,
        solar_sensor: system.sensor2,
        air_sensor: system.sensor3,
        air_temp: temp.airtemp,
        solar_temp: temp.soltemp,
    };

    let zones = [
        ZoneReading {
            zone: ZoneId::Pool,
            status: resolve_zone_status(temp.htstatus, ZoneId::Pool),
            mode: temp.poolht,
            setpoint: temp.poolsp,
            current_temp: temp.pooltemp,
        },
        ZoneReading {
            zone: ZoneId::Spa,
            status: resolve_zone_status(temp.htstatus, ZoneId::Spa),
            mode: temp.spaht,
            setpoint: temp.spasp,
            current_temp: temp.spatemp,
        },
    ];

    // Blank elements are equipment that is not installed; skip them
    // entirely rather than treating them as zero.
    let mut states = BTreeMap::new();
    for (name, text) in &equipment {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let state: i32 = text.parse().map_err(|_| {
            Error::MalformedStatus(format!("equipment <{name}> has non-integer value {text:?}"))
        })?;
        states.insert(name.clone(), state);
    }

    Ok(PoolStatus {
        controller,
        zones,
        equipment: states,
        temp_units: temp.tempunits,
    })
}
