//! On-disk document model for the vehicle tables
//!
//! Mirrors the shape of the upstream data: per vehicle a list of fingerprint
//! alternatives (CAN ID -> payload length), a firmware table keyed by ECU
//! address, the DBC binding and the steering constants. JSON and TOML maps
//! require string keys, so CAN IDs are written as decimal or `0x`-prefixed
//! strings, and firmware ROM IDs as hex strings.

use crate::ConfigError;
use car_adapt_core::{EcuKind, SteerParams};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root document: vehicle signature string -> per-vehicle tables
///
/// Vehicles are kept as an ordered list of (name, entry) pairs rather than a
/// map: deserializing straight into a map would last-win on a duplicate key
/// and silently drop a vehicle's definition. Duplicates survive parsing here
/// and are rejected during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleTables {
    #[serde(with = "vehicles_as_map")]
    pub vehicles: Vec<(String, VehicleEntry)>,
}

impl VehicleTables {
    /// Find a vehicle's entry by signature string
    pub fn get(&self, name: &str) -> Option<&VehicleEntry> {
        self.vehicles
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, entry)| entry)
    }
}

/// Serde adapter: the document is a map, the in-memory form a pair list
mod vehicles_as_map {
    use super::VehicleEntry;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(
        vehicles: &[(String, VehicleEntry)],
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(vehicles.len()))?;
        for (name, entry) in vehicles {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, VehicleEntry)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MapVisitor;

        impl<'de> Visitor<'de> for MapVisitor {
            type Value = Vec<(String, VehicleEntry)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of vehicle signature to tables")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut vehicles = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(pair) = access.next_entry()? {
                    vehicles.push(pair);
                }
                Ok(vehicles)
            }
        }

        deserializer.deserialize_map(MapVisitor)
    }
}

/// All tables for one vehicle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleEntry {
    /// DBC file describing this vehicle's message layout
    #[serde(default)]
    pub dbc: Option<String>,

    /// Fingerprint alternatives; keys are CAN IDs as strings
    #[serde(default)]
    pub fingerprints: Vec<BTreeMap<String, u8>>,

    /// Accepted firmware ROM IDs per diagnostic ECU
    #[serde(default)]
    pub firmware: Vec<FirmwareEntry>,

    /// Steering limiter constants
    #[serde(default)]
    pub steer: Option<SteerParams>,

    /// Driver torque threshold for "driver is steering" detection
    #[serde(default)]
    pub steer_threshold: Option<i32>,

    /// True when the CAN fingerprint is not reliable on its own and the
    /// vehicle must be identified via firmware queries
    #[serde(default)]
    pub excluded_from_fingerprinting: bool,
}

/// Firmware versions accepted for one ECU address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirmwareEntry {
    pub ecu: EcuKind,
    /// Diagnostic request CAN address
    pub addr: u32,
    #[serde(default)]
    pub sub_addr: Option<u8>,
    /// Accepted ROM IDs, hex-encoded (e.g. "85c0d000")
    pub versions: Vec<String>,
}

/// Parse a CAN ID table key: decimal or 0x-prefixed hex
pub(crate) fn parse_can_id(vehicle: &str, key: &str) -> Result<u32, ConfigError> {
    let parsed = match key.strip_prefix("0x").or_else(|| key.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => key.parse(),
    };
    parsed.map_err(|_| ConfigError::InvalidCanId {
        vehicle: vehicle.to_string(),
        key: key.to_string(),
    })
}

/// Decode a hex-encoded firmware ROM ID
pub(crate) fn parse_rom_id(vehicle: &str, version: &str) -> Result<Vec<u8>, ConfigError> {
    let invalid = || ConfigError::InvalidHex {
        vehicle: vehicle.to_string(),
        version: version.to_string(),
    };
    if version.len() % 2 != 0 {
        return Err(invalid());
    }
    (0..version.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&version[i..i + 2], 16).map_err(|_| invalid()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_can_id_decimal_and_hex() {
        assert_eq!(parse_can_id("V", "290").unwrap(), 290);
        assert_eq!(parse_can_id("V", "0x122").unwrap(), 0x122);
        assert_eq!(parse_can_id("V", "0X7E0").unwrap(), 0x7E0);
        assert!(parse_can_id("V", "nope").is_err());
    }

    #[test]
    fn test_parse_rom_id() {
        assert_eq!(parse_rom_id("V", "85c0d000").unwrap(), vec![0x85, 0xC0, 0xD0, 0x00]);
        assert_eq!(parse_rom_id("V", "").unwrap(), Vec::<u8>::new());
        assert!(parse_rom_id("V", "abc").is_err()); // odd length
        assert!(parse_rom_id("V", "zz").is_err());
    }

    #[test]
    fn test_tables_json_roundtrip() {
        let json = r#"{
            "vehicles": {
                "SUBARU ASCENT LIMITED 2019": {
                    "dbc": "subaru_global_2017_generated",
                    "fingerprints": [{"2": 8, "1785": 5}],
                    "firmware": [
                        {"ecu": "eps", "addr": 1862, "versions": ["85c0d000"]}
                    ],
                    "steer": {
                        "max_torque": 2047,
                        "delta_up": 50,
                        "delta_down": 70,
                        "driver_allowance": 60,
                        "driver_multiplier": 10,
                        "driver_factor": 1,
                        "steer_step": 2
                    },
                    "steer_threshold": 80,
                    "excluded_from_fingerprinting": true
                }
            }
        }"#;

        let tables: VehicleTables = serde_json::from_str(json).unwrap();
        let entry = tables.get("SUBARU ASCENT LIMITED 2019").unwrap();
        assert_eq!(entry.fingerprints.len(), 1);
        assert_eq!(entry.firmware[0].ecu, EcuKind::Eps);
        assert_eq!(entry.firmware[0].addr, 0x746);
        assert!(entry.excluded_from_fingerprinting);
        assert_eq!(entry.steer.unwrap().max_torque, 2047);
    }

    #[test]
    fn test_tables_toml() {
        let toml_content = r#"
            [vehicles."SUBARU IMPREZA LIMITED 2019"]
            dbc = "subaru_global_2017_generated"
            steer_threshold = 80

            [[vehicles."SUBARU IMPREZA LIMITED 2019".fingerprints]]
            "2" = 8
            "1786" = 5

            [[vehicles."SUBARU IMPREZA LIMITED 2019".firmware]]
            ecu = "engine"
            addr = 2016
            versions = ["aa61667307"]

            [vehicles."SUBARU IMPREZA LIMITED 2019".steer]
            max_torque = 2047
            delta_up = 50
            delta_down = 70
            driver_allowance = 60
            driver_multiplier = 10
            driver_factor = 1
            steer_step = 2
        "#;

        let tables: VehicleTables = toml::from_str(toml_content).unwrap();
        let entry = tables.get("SUBARU IMPREZA LIMITED 2019").unwrap();
        assert_eq!(entry.firmware[0].addr, 0x7E0);
        assert!(!entry.excluded_from_fingerprinting);
    }

    #[test]
    fn test_duplicate_keys_survive_parsing() {
        // The pair-list representation must not collapse duplicates; that
        // is what lets validation reject them later
        let json = r#"{
            "vehicles": {
                "CAR A": {"dbc": "first_dbc"},
                "CAR A": {"dbc": "second_dbc"}
            }
        }"#;
        let tables: VehicleTables = serde_json::from_str(json).unwrap();
        assert_eq!(tables.vehicles.len(), 2);
        assert_eq!(tables.vehicles[0].0, "CAR A");
        assert_eq!(tables.vehicles[1].0, "CAR A");
    }
}
