//! Switch proposals and their wire representation.
//!
//! A switch proposal describes one membership change: remove a silent
//! working validator, promote a backup. The consensus layer votes on
//! proposals and hands the sealed outcome back as a result carrying the
//! same shape, possibly with `round` and `door_count` rewritten.

use crate::{Address, MemberState, PeerId, PublicKey};
use sbor::prelude::*;
use std::fmt;

/// Direction of a switch proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BasicSbor)]
#[repr(u32)]
pub enum SwitchDirection {
    /// Outgoing switch request.
    Request = 0,
    /// Cancellation of a pending switch after the target revived.
    Restore = 1,
}

impl fmt::Display for SwitchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchDirection::Request => write!(f, "Request"),
            SwitchDirection::Restore => write!(f, "Restore"),
        }
    }
}

/// Identity snapshot of a member carried inside a proposal.
///
/// Proposals never hold references into the roster; the manager resolves
/// these back to live records through `get_health` at result time.
#[derive(Debug, Clone, BasicSbor)]
pub struct MemberIdentity {
    pub peer_id: PeerId,
    pub public_key: PublicKey,
    pub address: Address,
}

impl MemberIdentity {
    /// Identity equality: transport id and public key.
    pub fn matches(&self, other: &MemberIdentity) -> bool {
        self.peer_id == other.peer_id && self.public_key == other.public_key
    }
}

impl fmt::Display for MemberIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id:{},addr:{}", self.peer_id, self.address)
    }
}

/// One `{public key, flag}` pair of a proposal's member snapshot.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct MembershipEntry {
    pub public_key: PublicKey,
    pub flag: MemberState,
}

impl MembershipEntry {
    /// Create a snapshot entry.
    pub fn new(public_key: PublicKey, flag: MemberState) -> Self {
        Self { public_key, flag }
    }
}

/// Round value of a proposal that has not been sealed by consensus.
pub const ROUND_UNSEALED: i64 = -1;

/// Immutable description of a proposed committee membership change.
///
/// `id` is unique within a committee: the high 32 bits carry the
/// committee id, the low 32 bits count up from the manager's base.
#[derive(Debug, Clone, BasicSbor)]
pub struct SwitchProposal {
    pub id: u64,
    pub committee_id: u64,
    /// The validator being removed.
    pub remove: MemberIdentity,
    /// The validator being promoted. `None` when no backup was
    /// available; the proposal then only records the removal attempt.
    pub add: Option<MemberIdentity>,
    /// Ordered member snapshot: the added validator first (flag
    /// `Append`) when present, then the removed one (flag `Removed`),
    /// then the remaining `Used` members in roster order.
    pub members: Vec<MembershipEntry>,
    /// Diagnostic tag.
    pub reason: String,
    pub direction: SwitchDirection,
    /// Consensus round this proposal was sealed on; [`ROUND_UNSEALED`]
    /// before sealing.
    pub round: i64,
    /// Reproposal counter owned by the consensus layer.
    pub door_count: u32,
}

impl SwitchProposal {
    /// Full equality: id, change set and member snapshot.
    ///
    /// `round`, `door_count` and `reason` are consensus-owned and never
    /// participate in equality.
    pub fn matches(&self, other: &SwitchProposal) -> bool {
        self.id == other.id && self.matches_ignoring_id(other)
    }

    /// Equality ignoring the id.
    pub fn matches_ignoring_id(&self, other: &SwitchProposal) -> bool {
        let add_matches = match (&self.add, &other.add) {
            (None, None) => true,
            (Some(a), Some(b)) => a.matches(b),
            _ => false,
        };
        self.committee_id == other.committee_id
            && self.remove.matches(&other.remove)
            && add_matches
            && self.members == other.members
    }

    /// Equality on the removed validator alone.
    pub fn matches_remove(&self, other: &SwitchProposal) -> bool {
        self.remove.matches(&other.remove)
    }

    /// Copy of this proposal with the direction flipped to restore.
    pub fn to_restore(&self) -> SwitchProposal {
        let mut restore = self.clone();
        restore.direction = SwitchDirection::Restore;
        restore
    }
}

impl fmt::Display for SwitchProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "switch[id:{},cid:{},dir:{},round:{},door:{},reason:{},remove:{}",
            self.id,
            self.committee_id,
            self.direction,
            self.round,
            self.door_count,
            self.reason,
            self.remove,
        )?;
        match &self.add {
            Some(add) => write!(f, ",add:{add}]"),
            None => write!(f, ",add:none]"),
        }
    }
}
