//! Vehicle identification state machine
//!
//! Accumulates observed CAN traffic and optional ECU firmware responses,
//! then matches them against the fingerprint store to resolve a unique
//! vehicle. Runs inside the single-threaded control loop; the deadline is an
//! elapsed-time check against a monotonic clock, never a blocking wait.

use crate::fingerprint::FingerprintStore;
use crate::types::{AdaptError, BusFrame, EcuAddress, Result, VehicleSignature};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

/// Identification phase configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyConfig {
    /// Minimum number of distinct CAN IDs observed before an early resolve
    /// is allowed (guards against matching on the first handful of frames)
    #[serde(default = "default_min_distinct_ids")]
    pub min_distinct_ids: usize,

    /// Collection deadline in milliseconds; ambiguity and non-matches are
    /// only final once this has elapsed
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
}

fn default_min_distinct_ids() -> usize {
    10
}

fn default_deadline_ms() -> u64 {
    2000
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self {
            min_distinct_ids: default_min_distinct_ids(),
            deadline_ms: default_deadline_ms(),
        }
    }
}

impl IdentifyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the minimum distinct CAN IDs for an early resolve
    pub fn with_min_distinct_ids(mut self, count: usize) -> Self {
        self.min_distinct_ids = count;
        self
    }

    /// Builder method: set the collection deadline
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = deadline.as_millis() as u64;
        self
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

/// Identification outcome
///
/// `Resolved` is the only state that enables actuation. `Ambiguous` carries
/// the full candidate set so the caller can apply its own disambiguation
/// policy instead of the core silently guessing. `Unresolved` means zero
/// candidates within the deadline; the caller must refuse to enable steering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifyState {
    /// Still accumulating evidence
    Collecting,
    /// Exactly one vehicle is consistent with all evidence
    Resolved(VehicleSignature),
    /// Multiple vehicles remained consistent at the deadline
    Ambiguous(Vec<VehicleSignature>),
    /// No vehicle matched within the deadline
    Unresolved,
}

impl IdentifyState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IdentifyState::Collecting)
    }

    /// Convert to a `Result` for callers on the error-propagation path
    pub fn into_result(self) -> Result<VehicleSignature> {
        match self {
            IdentifyState::Resolved(sig) => Ok(sig),
            IdentifyState::Ambiguous(candidates) => {
                Err(AdaptError::AmbiguousVehicle(candidates))
            }
            IdentifyState::Unresolved | IdentifyState::Collecting => {
                Err(AdaptError::UnidentifiedVehicle)
            }
        }
    }
}

/// Matches live bus evidence against the fingerprint store
///
/// Lives for at most one identification attempt; a failed or ambiguous
/// attempt is terminal for the session. The session owner may `restart` it
/// from scratch (e.g. next ignition cycle).
pub struct VehicleIdentifier<'a> {
    store: &'a FingerprintStore,
    config: IdentifyConfig,
    started: Instant,
    observed: HashMap<u32, u8>,
    firmware: HashMap<EcuAddress, Vec<u8>>,
    state: IdentifyState,
}

impl<'a> VehicleIdentifier<'a> {
    pub fn new(store: &'a FingerprintStore, config: IdentifyConfig, started: Instant) -> Self {
        Self {
            store,
            config,
            started,
            observed: HashMap::new(),
            firmware: HashMap::new(),
            state: IdentifyState::Collecting,
        }
    }

    pub fn state(&self) -> &IdentifyState {
        &self.state
    }

    /// Number of distinct CAN IDs observed so far
    pub fn observed_ids(&self) -> usize {
        self.observed.len()
    }

    /// Record one observed bus frame (latest payload length wins)
    ///
    /// Ignored once the identifier has reached a terminal state.
    pub fn observe_frame(&mut self, frame: &BusFrame) {
        if self.state.is_terminal() {
            return;
        }
        self.observed.insert(frame.can_id, frame.dlc() as u8);
    }

    /// Record a firmware ROM ID returned by a diagnostic query
    pub fn record_firmware(&mut self, ecu: EcuAddress, rom_id: Vec<u8>) {
        if self.state.is_terminal() {
            return;
        }
        log::debug!("firmware response from {}: {} bytes", ecu, rom_id.len());
        self.firmware.insert(ecu, rom_id);
    }

    /// Run the matching step and return the current state
    ///
    /// Resolves early once a single candidate remains and enough distinct
    /// CAN IDs have been seen; classifies ambiguity and non-matches only at
    /// the deadline. Terminal states are sticky.
    pub fn poll(&mut self, now: Instant) -> &IdentifyState {
        if self.state.is_terminal() {
            return &self.state;
        }

        let deadline_hit = now.duration_since(self.started) >= self.config.deadline();
        let candidates = self.match_candidates();

        // Enough evidence for an early resolve: the distinguishing CAN ID
        // minimum, or any firmware response (ROM IDs are authoritative)
        let evidence_ready = self.observed.len() >= self.config.min_distinct_ids
            || !self.firmware.is_empty();

        if candidates.len() == 1 && (deadline_hit || evidence_ready) {
            let sig = candidates.into_iter().next().unwrap();
            log::info!("vehicle resolved: {}", sig);
            self.state = IdentifyState::Resolved(sig);
        } else if deadline_hit {
            if candidates.is_empty() {
                log::warn!(
                    "no vehicle matched within deadline ({} CAN IDs observed)",
                    self.observed.len()
                );
                self.state = IdentifyState::Unresolved;
            } else {
                let candidates: Vec<_> = candidates.into_iter().collect();
                log::warn!(
                    "ambiguous vehicle at deadline: {} candidates",
                    candidates.len()
                );
                self.state = IdentifyState::Ambiguous(candidates);
            }
        }

        &self.state
    }

    /// Abort the identification attempt (e.g. ignition off)
    ///
    /// Discards all accumulated observations; no partial state survives.
    pub fn abort(&mut self) {
        log::info!("identification aborted, observations discarded");
        self.observed.clear();
        self.firmware.clear();
        self.state = IdentifyState::Collecting;
    }

    /// Restart collection from scratch with a fresh deadline
    pub fn restart(&mut self, now: Instant) {
        self.abort();
        self.started = now;
    }

    /// Combine CAN and firmware evidence into the current candidate set
    ///
    /// Firmware results strictly narrow the CAN candidates. When firmware
    /// was queried and shares no candidate with the CAN evidence, the ROM
    /// IDs win outright: they are authoritative identity, message-length
    /// fingerprints are a heuristic.
    fn match_candidates(&self) -> BTreeSet<VehicleSignature> {
        let can_candidates = self.store.lookup_candidates(&self.observed);
        if self.firmware.is_empty() {
            return can_candidates;
        }

        let fw_candidates = self.store.lookup_by_firmware(&self.firmware);
        let combined: BTreeSet<_> = can_candidates
            .intersection(&fw_candidates)
            .cloned()
            .collect();
        if combined.is_empty() {
            log::debug!(
                "CAN and firmware evidence disjoint; trusting firmware ({} candidates)",
                fw_candidates.len()
            );
            fw_candidates
        } else {
            combined
        }
    }
}
