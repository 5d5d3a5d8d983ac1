//! Static vehicle table configuration
//!
//! File-backed implementation of the core's `ConfigAdapter` trait. The
//! per-vehicle tables (CAN fingerprints, ECU firmware ROM IDs, DBC bindings,
//! steering constants) live in JSON or TOML documents; this crate
//! deserializes and validates them once at startup and exposes read-only
//! lookups.
//!
//! The core never sees this crate's document format - it only consumes the
//! [`car_adapt_core::ConfigAdapter`] trait.
//!
//! # Example Usage
//!
//! ```no_run
//! use car_adapt_config::StaticConfig;
//! use car_adapt_core::FingerprintStore;
//! use std::path::Path;
//!
//! let config = StaticConfig::load(Path::new("vehicles.json")).unwrap();
//! let store = FingerprintStore::from_adapter(&config);
//! ```

// Public modules
pub mod adapter;
pub mod tables;

// Re-export main types for convenience
pub use adapter::StaticConfig;
pub use tables::{FirmwareEntry, VehicleEntry, VehicleTables};

/// Errors that can occur while loading vehicle tables
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse JSON tables: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse TOML tables: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("duplicate vehicle definition: {vehicle}")]
    DuplicateVehicle { vehicle: String },

    #[error("vehicle {vehicle}: invalid CAN ID key {key:?}")]
    InvalidCanId { vehicle: String, key: String },

    #[error("vehicle {vehicle}: invalid hex firmware version {version:?}")]
    InvalidHex { vehicle: String, version: String },

    #[error("unsupported table format: {0:?} (expected .json or .toml)")]
    UnsupportedFormat(String),
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
