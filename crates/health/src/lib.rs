//! Committee health tracking and validator rotation.
//!
//! This crate watches the liveness of every validator in an active
//! committee and rotates out the ones that go silent:
//!
//! - A 1 Hz ticker increments a per-record silence counter for every
//!   non-fixed `Used` member; any inbound message zeroes it.
//! - A counter crossing the threshold builds a switch proposal (remove
//!   the silent member, promote the first claimable backup) and
//!   publishes it to the consensus layer over the bridge.
//! - The consensus layer votes (using [`HealthManager::verify_switch`]
//!   as its admission check) and hands the sealed outcome back; the
//!   manager applies it to per-record state.
//! - If the silent member revives while its switch is still pending,
//!   a restore proposal cancels the switch.
//! - The election layer periodically delivers the authoritative
//!   committee; [`HealthManager::update_from_committee`] stores the
//!   delivered flags and discards any pending proposal the election
//!   already resolved.
//!
//! # Guarantees
//!
//! - At most one switch proposal is in flight per manager.
//! - Backup promotion is claimed by compare-and-swap: no two switches
//!   ever name the same backup.
//! - Fixed seed members are never ticked and never evicted; the local
//!   node never proposes itself for removal.
//! - No switch is proposed once the committee is at its minimum viable
//!   size; restores still go out.
//! - Proposal ids are strictly increasing within a committee, starting
//!   at `(committee_id << 32) | 100`.

mod bridge;
mod config;
mod error;
mod manager;
mod record;
mod roster;

pub use bridge::{ConsensusBridge, ShutdownHandle};
pub use config::{HealthConfig, BLACK_DOOR_COUNT, HEALTH_OUT, MIN_VALIDATOR};
pub use error::HealthError;
pub use manager::HealthManager;
pub use record::{HealthRecord, TransportInfo};
pub use roster::Roster;
