//! File-backed ConfigAdapter implementation

use crate::tables::{parse_can_id, parse_rom_id, VehicleTables};
use crate::ConfigError;
use anyhow::Context;
use car_adapt_core::{
    CanFingerprint, ConfigAdapter, EcuAddress, FirmwareSignature, SteerParams, VehicleSignature,
};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Validated, immutable vehicle tables exposing the core's lookups
///
/// Built once at process start from a JSON or TOML document; read-only
/// afterwards, safe to share by reference across the control loop.
#[derive(Debug)]
pub struct StaticConfig {
    fingerprints: HashMap<VehicleSignature, Vec<CanFingerprint>>,
    firmware: HashMap<VehicleSignature, FirmwareSignature>,
    steer_params: HashMap<VehicleSignature, SteerParams>,
    dbc_names: HashMap<VehicleSignature, String>,
    steer_thresholds: HashMap<VehicleSignature, i32>,
    excluded: HashSet<VehicleSignature>,
}

impl StaticConfig {
    /// Load vehicle tables from a file, dispatching on the extension
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        log::info!("Loading vehicle tables: {:?}", path);
        let content = fs::read_to_string(path)
            .map_err(ConfigError::Io)
            .with_context(|| format!("Failed to read vehicle tables: {:?}", path))?;

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        let config = match extension.as_deref() {
            Some("json") => Self::from_json_str(&content)?,
            Some("toml") => Self::from_toml_str(&content)?,
            _ => return Err(ConfigError::UnsupportedFormat(format!("{:?}", extension)).into()),
        };

        log::info!(
            "Vehicle tables loaded: {} vehicles, {} excluded from CAN matching",
            config.num_vehicles(),
            config.excluded.len()
        );
        Ok(config)
    }

    /// Parse tables from a JSON document
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let tables: VehicleTables = serde_json::from_str(content)?;
        Self::from_tables(tables)
    }

    /// Parse tables from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let tables: VehicleTables = toml::from_str(content)?;
        Self::from_tables(tables)
    }

    /// Validate and index a parsed document
    pub fn from_tables(tables: VehicleTables) -> Result<Self, ConfigError> {
        let mut config = Self {
            fingerprints: HashMap::new(),
            firmware: HashMap::new(),
            steer_params: HashMap::new(),
            dbc_names: HashMap::new(),
            steer_thresholds: HashMap::new(),
            excluded: HashSet::new(),
        };

        let mut seen = HashSet::new();
        for (name, entry) in tables.vehicles {
            if !seen.insert(name.clone()) {
                return Err(ConfigError::DuplicateVehicle { vehicle: name });
            }
            let sig = VehicleSignature::from(name.as_str());

            let mut alternatives = Vec::with_capacity(entry.fingerprints.len());
            for alt in &entry.fingerprints {
                let mut pairs = Vec::with_capacity(alt.len());
                for (key, len) in alt {
                    pairs.push((parse_can_id(&name, key)?, *len));
                }
                alternatives.push(CanFingerprint::from_pairs(pairs));
            }
            if !alternatives.is_empty() {
                config.fingerprints.insert(sig.clone(), alternatives);
            }

            if !entry.firmware.is_empty() {
                let mut fw = FirmwareSignature::new();
                for fw_entry in &entry.firmware {
                    let ecu = EcuAddress {
                        kind: fw_entry.ecu,
                        addr: fw_entry.addr,
                        sub_addr: fw_entry.sub_addr,
                    };
                    for version in &fw_entry.versions {
                        fw.add_response(ecu, parse_rom_id(&name, version)?);
                    }
                }
                config.firmware.insert(sig.clone(), fw);
            }

            if let Some(params) = entry.steer {
                config.steer_params.insert(sig.clone(), params);
            }
            if let Some(dbc) = entry.dbc {
                config.dbc_names.insert(sig.clone(), dbc);
            }
            if let Some(threshold) = entry.steer_threshold {
                config.steer_thresholds.insert(sig.clone(), threshold);
            }
            if entry.excluded_from_fingerprinting {
                config.excluded.insert(sig);
            }
        }

        Ok(config)
    }

    /// Number of vehicles with any table data
    pub fn num_vehicles(&self) -> usize {
        self.signatures().len()
    }
}

impl ConfigAdapter for StaticConfig {
    fn signatures(&self) -> Vec<VehicleSignature> {
        let mut sigs: HashSet<VehicleSignature> = self.fingerprints.keys().cloned().collect();
        sigs.extend(self.firmware.keys().cloned());
        sigs.extend(self.steer_params.keys().cloned());
        let mut sigs: Vec<_> = sigs.into_iter().collect();
        sigs.sort();
        sigs
    }

    fn can_fingerprints(&self, sig: &VehicleSignature) -> &[CanFingerprint] {
        self.fingerprints.get(sig).map(Vec::as_slice).unwrap_or(&[])
    }

    fn firmware_signature(&self, sig: &VehicleSignature) -> Option<&FirmwareSignature> {
        self.firmware.get(sig)
    }

    fn steer_params(&self, sig: &VehicleSignature) -> Option<SteerParams> {
        self.steer_params.get(sig).copied()
    }

    fn dbc_name(&self, sig: &VehicleSignature) -> Option<&str> {
        self.dbc_names.get(sig).map(String::as_str)
    }

    fn steer_threshold(&self, sig: &VehicleSignature) -> Option<i32> {
        self.steer_thresholds.get(sig).copied()
    }

    fn excluded(&self) -> &HashSet<VehicleSignature> {
        &self.excluded
    }
}
