//! Configuration adapter interface
//!
//! The core never owns the static vehicle tables; it reads them through this
//! trait. A file-backed implementation lives in the `car-adapt-config` crate,
//! and tests use small hand-built implementations. Adapters are loaded once
//! before the control loop starts and are read-only thereafter.

use crate::fingerprint::{CanFingerprint, FirmwareSignature};
use crate::limiter::SteerParams;
use crate::types::{AdaptError, Result, VehicleSignature};
use std::collections::HashSet;

/// Read-only lookups over the static per-vehicle tables
pub trait ConfigAdapter {
    /// All vehicle signatures the configuration knows about
    fn signatures(&self) -> Vec<VehicleSignature>;

    /// CAN fingerprint alternatives for a vehicle (empty slice if unknown)
    fn can_fingerprints(&self, sig: &VehicleSignature) -> &[CanFingerprint];

    /// Firmware signature for a vehicle, if any is defined
    fn firmware_signature(&self, sig: &VehicleSignature) -> Option<&FirmwareSignature>;

    /// Steering limiter parameters for a vehicle
    fn steer_params(&self, sig: &VehicleSignature) -> Option<SteerParams>;

    /// Name of the DBC file describing this vehicle's message layout
    fn dbc_name(&self, sig: &VehicleSignature) -> Option<&str>;

    /// Driver torque threshold above which the driver counts as steering
    fn steer_threshold(&self, sig: &VehicleSignature) -> Option<i32>;

    /// Vehicles excluded from CAN-fingerprint matching (firmware-only)
    fn excluded(&self) -> &HashSet<VehicleSignature>;
}

/// Everything a driving session needs once a vehicle is identified
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVehicle {
    pub signature: VehicleSignature,
    pub steer_params: SteerParams,
    /// DBC to load for message encoding/decoding (done downstream)
    pub dbc_name: Option<String>,
    pub steer_threshold: Option<i32>,
}

/// Bundle the per-vehicle session data for a resolved signature
///
/// A vehicle without steering parameters is a configuration defect: the
/// session cannot be enabled, reported as [`AdaptError::InvalidParams`].
pub fn resolve_vehicle(
    adapter: &dyn ConfigAdapter,
    sig: &VehicleSignature,
) -> Result<ResolvedVehicle> {
    let steer_params = adapter
        .steer_params(sig)
        .ok_or_else(|| AdaptError::InvalidParams(sig.clone()))?;
    Ok(ResolvedVehicle {
        signature: sig.clone(),
        steer_params,
        dbc_name: adapter.dbc_name(sig).map(str::to_string),
        steer_threshold: adapter.steer_threshold(sig),
    })
}
