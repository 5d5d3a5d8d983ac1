//! Safety-bounded steering torque limiter
//!
//! Clamps and rate-limits a commanded steering torque against real-time
//! driver input, once per control cycle. The asymmetry between ramp-up and
//! ramp-down is deliberate: authority is lost fast and gained slowly.
//!
//! This code sits on the actuation path. It never errors and never panics;
//! out-of-range inputs are clamped and the loop continues.

use serde::{Deserialize, Serialize};

/// Per-vehicle steering limiter parameters, immutable once loaded
///
/// Units are the raw torque counts of the vehicle's EPS interface (e.g. a
/// 2017+ Subaru global platform uses max 2047 counts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteerParams {
    /// Maximum command magnitude, in torque counts
    pub max_torque: i32,
    /// Maximum magnitude increase per command cycle
    pub delta_up: i32,
    /// Minimum magnitude decrease per command cycle when ramping down
    pub delta_down: i32,
    /// Driver torque allowed before override limiting starts
    pub driver_allowance: i32,
    /// Weight applied to driver torque beyond the allowance
    pub driver_multiplier: i32,
    /// Scale between driver torque units and command units (from the DBC)
    pub driver_factor: i32,
    /// Command cadence: issue a new command every `steer_step` loop frames
    pub steer_step: u32,
}

impl SteerParams {
    /// Clamp constants to the non-negative ranges the limiter arithmetic
    /// assumes. A malformed table must degrade to zero authority, not
    /// invert a clamp range and panic.
    pub fn sanitized(self) -> Self {
        Self {
            max_torque: self.max_torque.max(0),
            delta_up: self.delta_up.max(0),
            delta_down: self.delta_down.max(0),
            driver_allowance: self.driver_allowance.max(0),
            driver_multiplier: self.driver_multiplier.max(0),
            driver_factor: self.driver_factor,
            steer_step: self.steer_step,
        }
    }
}

/// Result of one limiter cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterOutput {
    /// Torque command to hand to the downstream message encoder
    pub applied_torque: i32,
    /// True when driver torque beyond the allowance reduced our authority
    pub override_active: bool,
}

/// Mutable per-session limiter state
///
/// Created when a driving session starts, updated every cycle, discarded at
/// session end. Starts from zero applied torque so the first command is
/// bounded by one up-ramp step rather than jumping to max.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlCycleState {
    /// Torque applied on the previous cycle
    pub last_applied: i32,
    /// Cycles spent with driver override active, for diagnostics
    pub override_cycles: u64,
    /// Loop frame counter, drives the command cadence
    pub frame: u64,
}

/// The steering torque limiter
#[derive(Debug, Clone)]
pub struct SteerLimiter {
    params: SteerParams,
    state: ControlCycleState,
}

impl SteerLimiter {
    /// Create a limiter; constants are sanitized via [`SteerParams::sanitized`]
    pub fn new(params: SteerParams) -> Self {
        Self {
            params: params.sanitized(),
            state: ControlCycleState::default(),
        }
    }

    pub fn params(&self) -> &SteerParams {
        &self.params
    }

    pub fn state(&self) -> &ControlCycleState {
        &self.state
    }

    /// Discard session state (applied torque back to zero)
    pub fn reset(&mut self) {
        self.state = ControlCycleState::default();
    }

    /// True when the current loop frame should issue a steering command
    ///
    /// The steering message cadence is a divisor of the base loop rate
    /// (e.g. every 2nd frame of a 100 Hz loop for a 50 Hz command).
    pub fn wants_command(&self, frame: u64) -> bool {
        self.params.steer_step <= 1 || frame % self.params.steer_step as u64 == 0
    }

    /// Run one control cycle
    ///
    /// `desired_torque` is the controller's request; `driver_torque` is the
    /// torque the human is measured to apply at the wheel. Both are clamped
    /// defensively. The returned command never exceeds `max_torque` in
    /// magnitude and never moves faster than the ramp limits allow.
    pub fn step(&mut self, desired_torque: i32, driver_torque: i32) -> LimiterOutput {
        let p = self.params;
        let last = self.state.last_applied;

        let desired = desired_torque.clamp(-p.max_torque, p.max_torque);

        // Driver override: past the allowance, authority in the direction
        // opposing the driver shrinks proportionally, floored at zero. The
        // command may follow the driver's direction at full authority; it
        // may not fight them.
        let driver = driver_torque.saturating_mul(p.driver_factor);
        let over = driver.saturating_abs().saturating_sub(p.driver_allowance);
        let override_active = over > 0;
        let cut = over.saturating_mul(p.driver_multiplier);
        let (min_allowed, max_allowed) = if driver >= 0 {
            (((-p.max_torque).saturating_add(cut)).min(0), p.max_torque)
        } else {
            (-p.max_torque, (p.max_torque.saturating_sub(cut)).max(0))
        };
        let desired = desired.clamp(min_allowed, max_allowed);

        // Rate limit against the previous command: grow by at most delta_up,
        // shrink by at least delta_down, and cap the first step across zero
        // at delta_up so sign changes cannot slam the wheel.
        let applied = if last > 0 {
            desired.clamp(
                (last - p.delta_down).max(-p.delta_up),
                last + p.delta_up,
            )
        } else {
            desired.clamp(
                last - p.delta_up,
                (last + p.delta_down).min(p.delta_up),
            )
        };

        self.state.last_applied = applied;
        self.state.frame = self.state.frame.wrapping_add(1);
        if override_active {
            self.state.override_cycles += 1;
            log::debug!(
                "driver override: driver={} cut={} applied={}",
                driver_torque,
                cut,
                applied
            );
        }

        LimiterOutput {
            applied_torque: applied,
            override_active,
        }
    }
}
