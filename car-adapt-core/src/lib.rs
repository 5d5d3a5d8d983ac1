//! Vehicle Adaptation Core
//!
//! Identification and safety-limited steering actuation for a vehicle
//! adaptation layer:
//! - Matches observed CAN bus traffic and ECU firmware responses against
//!   known-vehicle fingerprint tables to resolve a unique vehicle identity
//! - Rate-limits and clamps commanded steering torque against real-time
//!   driver input, enforcing hard safety envelopes per vehicle
//!
//! The core is intentionally minimal and focused:
//! - Pure in-memory logic driven from a single-threaded control loop
//! - Reads static vehicle tables through the [`ConfigAdapter`] trait
//! - Emits a bounded torque command for a downstream message encoder
//!
//! The core does NOT:
//! - Parse DBC files or decode message bit layouts
//! - Own the static data tables (see the car-adapt-config crate)
//! - Do longitudinal (speed/brake) control
//!
//! # Example Usage
//!
//! ```
//! use car_adapt_core::{
//!     BusFrame, FingerprintStore, IdentifyConfig, IdentifyState,
//!     SteerLimiter, SteerParams, VehicleIdentifier,
//! };
//! use std::time::Instant;
//!
//! // Store is normally built from a ConfigAdapter at startup
//! let store = FingerprintStore::new();
//! let mut identifier =
//!     VehicleIdentifier::new(&store, IdentifyConfig::new(), Instant::now());
//!
//! // Feed frames from the bus until the identifier settles
//! identifier.observe_frame(&BusFrame {
//!     timestamp_ns: 0,
//!     bus: 0,
//!     can_id: 0x122,
//!     data: vec![0; 8],
//! });
//! match identifier.poll(Instant::now()) {
//!     IdentifyState::Resolved(sig) => println!("identified: {}", sig),
//!     IdentifyState::Unresolved => println!("steering stays disabled"),
//!     _ => {}
//! }
//!
//! // Once resolved, run the limiter every control cycle
//! let mut limiter = SteerLimiter::new(SteerParams {
//!     max_torque: 2047,
//!     delta_up: 50,
//!     delta_down: 70,
//!     driver_allowance: 60,
//!     driver_multiplier: 10,
//!     driver_factor: 1,
//!     steer_step: 2,
//! });
//! let out = limiter.step(500, 0);
//! assert!(out.applied_torque.abs() <= 2047);
//! ```

// Public modules
pub mod config;
pub mod fingerprint;
pub mod identify;
pub mod limiter;
pub mod types;

// Re-export main types for convenience
pub use config::{resolve_vehicle, ConfigAdapter, ResolvedVehicle};
pub use fingerprint::{CanFingerprint, FingerprintStore, FirmwareSignature};
pub use identify::{IdentifyConfig, IdentifyState, VehicleIdentifier};
pub use limiter::{ControlCycleState, LimiterOutput, SteerLimiter, SteerParams};
pub use types::{AdaptError, BusFrame, EcuAddress, EcuKind, Result, Timestamp, VehicleSignature};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: ensure an empty store yields no candidates
        let store = FingerprintStore::new();
        assert_eq!(store.num_vehicles(), 0);
        let observed = std::collections::HashMap::new();
        assert!(store.lookup_candidates(&observed).is_empty());
    }
}
