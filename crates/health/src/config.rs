//! Health manager configuration.

use std::time::Duration;

/// Consecutive silent ticks after which a working validator is proposed
/// for removal.
pub const HEALTH_OUT: u32 = 180;

/// Minimum count of `Used` members. At or below this the committee is
/// at its minimum viable size and no switch proposals are emitted.
pub const MIN_VALIDATOR: usize = 2;

/// Advisory cap on consensus reproposals of a single switch.
pub const BLACK_DOOR_COUNT: u32 = 4;

/// Configuration for the health manager.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Silence threshold in ticks.
    pub silence_threshold: u32,
    /// Minimum viable count of `Used` members.
    pub min_validators: usize,
    /// Interval between health ticks.
    pub tick_interval: Duration,
    /// Globally enables health management. When disabled, committee
    /// updates still apply, but proposals, verification and result
    /// application are sentinel-error no-ops.
    pub enabled: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            silence_threshold: HEALTH_OUT,
            min_validators: MIN_VALIDATOR,
            tick_interval: Duration::from_secs(1),
            enabled: true,
        }
    }
}
