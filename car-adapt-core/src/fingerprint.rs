//! Fingerprint store
//!
//! Immutable index of per-vehicle CAN message fingerprints and ECU firmware
//! signatures, built once at startup from a [`ConfigAdapter`] and read-only
//! for the lifetime of the control loop.

use crate::config::ConfigAdapter;
use crate::types::{EcuAddress, VehicleSignature};
use std::collections::{BTreeSet, HashMap, HashSet};

/// One fingerprint alternative: CAN ID -> expected payload length
///
/// A vehicle owns an ordered list of alternatives (trim/year variants); the
/// vehicle matches if ANY alternative is consistent with the observation.
/// Within one alternative each CAN ID maps to exactly one length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanFingerprint {
    lengths: HashMap<u32, u8>,
}

impl CanFingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fingerprint from (CAN ID, payload length) pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, u8)>) -> Self {
        Self {
            lengths: pairs.into_iter().collect(),
        }
    }

    /// Expected payload length for a CAN ID, if this fingerprint defines it
    pub fn length_of(&self, can_id: u32) -> Option<u8> {
        self.lengths.get(&can_id).copied()
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Check this alternative against observed traffic
    ///
    /// Consistent means: for every CAN ID present in both the observation and
    /// this fingerprint, the lengths agree. IDs known to only one side impose
    /// no constraint, so partial observations match supersets and vice versa.
    pub fn is_consistent_with(&self, observed: &HashMap<u32, u8>) -> bool {
        observed
            .iter()
            .all(|(id, len)| match self.lengths.get(id) {
                Some(expected) => expected == len,
                None => true,
            })
    }
}

impl FromIterator<(u32, u8)> for CanFingerprint {
    fn from_iter<T: IntoIterator<Item = (u32, u8)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

/// Accepted firmware ROM identifiers per diagnostic ECU address
///
/// ROM IDs are opaque byte strings compared for exact equality only; a
/// vehicle may accept several per ECU (firmware revisions in the field).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirmwareSignature {
    responses: HashMap<EcuAddress, Vec<Vec<u8>>>,
}

impl FirmwareSignature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an accepted ROM ID for an ECU address
    pub fn add_response(&mut self, ecu: EcuAddress, rom_id: impl Into<Vec<u8>>) {
        self.responses.entry(ecu).or_default().push(rom_id.into());
    }

    /// True if this vehicle defines any accepted responses for `ecu`
    pub fn defines(&self, ecu: &EcuAddress) -> bool {
        self.responses.contains_key(ecu)
    }

    /// True if `rom_id` is an accepted response for `ecu`
    pub fn accepts(&self, ecu: &EcuAddress, rom_id: &[u8]) -> bool {
        self.responses
            .get(ecu)
            .map(|ids| ids.iter().any(|id| id == rom_id))
            .unwrap_or(false)
    }

    /// ECU addresses this signature defines responses for
    pub fn ecus(&self) -> impl Iterator<Item = &EcuAddress> {
        self.responses.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

impl FromIterator<(EcuAddress, Vec<Vec<u8>>)> for FirmwareSignature {
    fn from_iter<T: IntoIterator<Item = (EcuAddress, Vec<Vec<u8>>)>>(iter: T) -> Self {
        Self {
            responses: iter.into_iter().collect(),
        }
    }
}

/// Immutable in-memory index of all known vehicle fingerprints
///
/// Built once before the control loop starts; read-only afterwards, so it is
/// safe to share by reference without locking.
#[derive(Debug, Default)]
pub struct FingerprintStore {
    fingerprints: HashMap<VehicleSignature, Vec<CanFingerprint>>,
    firmware: HashMap<VehicleSignature, FirmwareSignature>,
    /// Vehicles whose CAN fingerprint is not reliable on its own; these are
    /// identified via firmware queries only. Authoritative policy data from
    /// the configuration source.
    excluded: HashSet<VehicleSignature>,
}

impl FingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the store from a configuration adapter
    pub fn from_adapter(adapter: &dyn ConfigAdapter) -> Self {
        let mut store = Self::new();
        for sig in adapter.signatures() {
            let alternatives = adapter.can_fingerprints(&sig);
            if !alternatives.is_empty() {
                store.insert_fingerprints(sig.clone(), alternatives.to_vec());
            }
            if let Some(fw) = adapter.firmware_signature(&sig) {
                store.insert_firmware(sig.clone(), fw.clone());
            }
        }
        for sig in adapter.excluded() {
            store.exclude(sig.clone());
        }
        log::info!(
            "fingerprint store built: {} vehicles, {} with firmware, {} excluded from CAN matching",
            store.fingerprints.len(),
            store.firmware.len(),
            store.excluded.len()
        );
        store
    }

    /// Register the fingerprint alternatives for a vehicle
    pub fn insert_fingerprints(
        &mut self,
        sig: VehicleSignature,
        alternatives: Vec<CanFingerprint>,
    ) {
        self.fingerprints.insert(sig, alternatives);
    }

    /// Register the firmware signature for a vehicle
    pub fn insert_firmware(&mut self, sig: VehicleSignature, firmware: FirmwareSignature) {
        self.firmware.insert(sig, firmware);
    }

    /// Exclude a vehicle from CAN-fingerprint matching
    pub fn exclude(&mut self, sig: VehicleSignature) {
        self.excluded.insert(sig);
    }

    /// Number of vehicles with at least one CAN fingerprint
    pub fn num_vehicles(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_excluded(&self, sig: &VehicleSignature) -> bool {
        self.excluded.contains(sig)
    }

    /// Find every vehicle whose CAN fingerprint is consistent with the
    /// observed (CAN ID -> payload length) traffic
    ///
    /// Alternatives under one signature are OR'd: any consistent alternative
    /// makes the vehicle a candidate, and it is reported once. Vehicles in
    /// the exclusion set are never returned. Absent data widens the result
    /// (fail open); this never errors.
    pub fn lookup_candidates(&self, observed: &HashMap<u32, u8>) -> BTreeSet<VehicleSignature> {
        self.fingerprints
            .iter()
            .filter(|(sig, _)| !self.excluded.contains(sig))
            .filter(|(_, alternatives)| {
                alternatives.iter().any(|fp| fp.is_consistent_with(observed))
            })
            .map(|(sig, _)| sig.clone())
            .collect()
    }

    /// Find every vehicle whose firmware signature accepts all observed
    /// ECU responses
    ///
    /// For every observed ECU address that a vehicle defines responses for,
    /// the observed ROM ID must be a member of the accepted set. ECUs known
    /// to only one side impose no constraint (fail open). The exclusion set
    /// does NOT apply here: excluded vehicles are identifiable by firmware.
    pub fn lookup_by_firmware(
        &self,
        observed: &HashMap<EcuAddress, Vec<u8>>,
    ) -> BTreeSet<VehicleSignature> {
        self.firmware
            .iter()
            .filter(|(_, fw)| {
                observed.iter().all(|(ecu, rom_id)| {
                    if fw.defines(ecu) {
                        fw.accepts(ecu, rom_id)
                    } else {
                        true
                    }
                })
            })
            .map(|(sig, _)| sig.clone())
            .collect()
    }
}
