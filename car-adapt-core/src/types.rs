//! Core types for the vehicle adaptation library
//!
//! This module defines the fundamental types shared by the fingerprint store,
//! the vehicle identifier and the steering limiter. The core is pure in-memory
//! logic - it performs no I/O and holds no mutable global state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used for bus records
pub type Timestamp = DateTime<Utc>;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, AdaptError>;

/// Identity key for a supported vehicle model
///
/// The signature string is defined by the configuration source at load time
/// (e.g. "SUBARU ASCENT LIMITED 2019") and is immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleSignature(String);

impl VehicleSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VehicleSignature {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for VehicleSignature {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Raw CAN frame as observed on the vehicle bus
///
/// This is what the identifier consumes during the collection phase,
/// before any signal decoding (which is out of scope for this core).
#[derive(Debug, Clone, PartialEq)]
pub struct BusFrame {
    /// Timestamp in nanoseconds since epoch
    pub timestamp_ns: u64,
    /// Bus number (e.g., 0 = powertrain, 2 = camera)
    pub bus: u8,
    /// CAN message ID (11-bit or 29-bit)
    pub can_id: u32,
    /// Frame data bytes (0-8 bytes for classic CAN, up to 64 for CAN-FD)
    pub data: Vec<u8>,
}

impl BusFrame {
    /// Convert timestamp from nanoseconds to DateTime<Utc>
    pub fn timestamp(&self) -> Timestamp {
        let secs = (self.timestamp_ns / 1_000_000_000) as i64;
        let nsecs = (self.timestamp_ns % 1_000_000_000) as u32;
        DateTime::from_timestamp(secs, nsecs).unwrap_or_else(Utc::now)
    }

    /// Get the data length code (DLC) - number of data bytes
    pub fn dlc(&self) -> usize {
        self.data.len()
    }
}

/// Diagnostic ECU roles that expose a firmware ROM identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EcuKind {
    /// Electronic stability program / brake controller
    Esp,
    /// Electric power steering
    Eps,
    Engine,
    Transmission,
    FwdCamera,
    FwdRadar,
    /// Airbag / restraint controller
    Srs,
}

impl fmt::Display for EcuKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EcuKind::Esp => "esp",
            EcuKind::Eps => "eps",
            EcuKind::Engine => "engine",
            EcuKind::Transmission => "transmission",
            EcuKind::FwdCamera => "fwdCamera",
            EcuKind::FwdRadar => "fwdRadar",
            EcuKind::Srs => "srs",
        };
        f.write_str(name)
    }
}

/// Diagnostic address of an ECU, used as the key for firmware queries
///
/// Some gateways multiplex several ECUs behind one address, hence the
/// optional sub-address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EcuAddress {
    pub kind: EcuKind,
    /// Diagnostic request CAN address (e.g. 0x7E0 for engine)
    pub addr: u32,
    #[serde(default)]
    pub sub_addr: Option<u8>,
}

impl EcuAddress {
    pub fn new(kind: EcuKind, addr: u32) -> Self {
        Self {
            kind,
            addr,
            sub_addr: None,
        }
    }

    pub fn with_sub_addr(kind: EcuKind, addr: u32, sub_addr: u8) -> Self {
        Self {
            kind,
            addr,
            sub_addr: Some(sub_addr),
        }
    }
}

impl fmt::Display for EcuAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub_addr {
            Some(sub) => write!(f, "{} @0x{:X}/{}", self.kind, self.addr, sub),
            None => write!(f, "{} @0x{:X}", self.kind, self.addr),
        }
    }
}

/// Errors surfaced by the identification and session-resolution path
///
/// The steering limiter itself never errors: it sits on the actuation path
/// and clamps defensively instead of propagating failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdaptError {
    /// More than one vehicle is consistent with the evidence. Non-fatal:
    /// the caller gets the full candidate set and applies its own policy.
    #[error("ambiguous vehicle: {} candidates remain", .0.len())]
    AmbiguousVehicle(Vec<VehicleSignature>),

    /// No vehicle matched before the identification deadline. The caller
    /// must keep steering actuation disabled.
    #[error("no vehicle identified before deadline")]
    UnidentifiedVehicle,

    /// A resolved vehicle has no steering parameters in the configuration.
    /// This is a configuration defect, fatal to the session.
    #[error("missing steering parameters for vehicle: {0}")]
    InvalidParams(VehicleSignature),
}
