//! Committee member lifecycle flags and intake records.

use crate::PublicKey;
use sbor::prelude::*;
use std::fmt;

/// Lifecycle flag of a committee member.
///
/// The discriminants are the wire encoding shared with the consensus
/// layer. `Ord` follows the discriminants; the verification predicate
/// relies on `Used <= state <= Switching` for removal candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BasicSbor)]
#[repr(u32)]
pub enum MemberState {
    /// Standby, never promoted.
    Unused = 0,
    /// Actively expected to vote.
    Used = 1,
    /// Claimed by an in-flight switch.
    Switching = 2,
    /// Named as the promoted side of a switch proposal.
    Append = 3,
    /// Evicted from the committee.
    Removed = 4,
}

impl MemberState {
    /// Decode a wire flag.
    pub fn from_wire(flag: u32) -> Option<Self> {
        match flag {
            0 => Some(MemberState::Unused),
            1 => Some(MemberState::Used),
            2 => Some(MemberState::Switching),
            3 => Some(MemberState::Append),
            4 => Some(MemberState::Removed),
            _ => None,
        }
    }

    /// Encode as a wire flag.
    pub fn to_wire(self) -> u32 {
        self as u32
    }
}

impl Default for MemberState {
    fn default() -> Self {
        Self::Unused
    }
}

impl fmt::Display for MemberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberState::Unused => write!(f, "Unused"),
            MemberState::Used => write!(f, "Used"),
            MemberState::Switching => write!(f, "Switching"),
            MemberState::Append => write!(f, "Append"),
            MemberState::Removed => write!(f, "Removed"),
        }
    }
}

/// Role class of a committee member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BasicSbor)]
pub enum MemberRole {
    /// Member of the active working set.
    Working,
    /// Standby, promoted in roster order when a working member dies.
    Backup,
    /// Fixed seed member: immune to eviction and to silence ticks.
    Fixed,
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberRole::Working => write!(f, "Working"),
            MemberRole::Backup => write!(f, "Backup"),
            MemberRole::Fixed => write!(f, "Fixed"),
        }
    }
}

/// One entry of an authoritative post-election committee, as delivered
/// by the election layer.
#[derive(Debug, Clone, BasicSbor)]
pub struct CommitteeMember {
    pub public_key: PublicKey,
    pub flag: MemberState,
    pub role: MemberRole,
}

impl CommitteeMember {
    /// Create a committee entry.
    pub fn new(public_key: PublicKey, flag: MemberState, role: MemberRole) -> Self {
        Self {
            public_key,
            flag,
            role,
        }
    }
}
