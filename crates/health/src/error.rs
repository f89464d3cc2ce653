//! Health manager errors.

use thiserror::Error;
use vigil_types::{MemberState, PublicKey};

/// Errors surfaced by health manager operations.
///
/// Nothing is retried internally. The tick loop logs and continues; the
/// only fatal condition is the shutdown signal.
#[derive(Debug, Error)]
pub enum HealthError {
    /// Health management is globally disabled.
    #[error("health management is disabled")]
    Disabled,

    /// A proposal names a validator absent from the roster.
    #[error("unknown member {public_key}")]
    UnknownMember { public_key: PublicKey },

    /// Removal or addition targets a record in an inadmissible state.
    #[error("wrong state for switch: remove is {remove_state} at tick {remove_tick}, add is {add_state:?}")]
    WrongState {
        remove_state: MemberState,
        remove_tick: u32,
        add_state: Option<MemberState>,
    },

    /// No standby validator could be claimed for promotion. Non-fatal:
    /// the switch proposal is still emitted without a promotion.
    #[error("no unused backup validator available")]
    NoBackupAvailable,

    /// Consensus-returned entries disagree with the pending proposal.
    /// Logged; application proceeds on the entries actually present.
    #[error("switch result entries disagree with the pending proposal")]
    Mismatch,
}
