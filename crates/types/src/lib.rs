//! Core types for the Vigil committee health subsystem.
//!
//! This crate provides the foundational types used by the health manager
//! and the layers it talks to:
//!
//! - **Identity**: [`PeerId`], [`NetworkAddress`], [`PublicKey`], [`Address`]
//! - **Lifecycle**: [`MemberState`], [`MemberRole`]
//! - **Committee intake**: [`CommitteeMember`]
//! - **Switch proposals**: [`SwitchProposal`], [`MembershipEntry`], [`MemberIdentity`]
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not
//! depend on any other workspace crates, making it the foundation layer.
//! Key generation and message signing belong to the consensus layer; a
//! public key here is an opaque identity and an address is derived from it.

mod identifiers;
mod keys;
mod member;
mod proposal;

pub use identifiers::{NetworkAddress, PeerId};
pub use keys::{Address, PublicKey, ADDRESS_LEN, PUBLIC_KEY_LEN};
pub use member::{CommitteeMember, MemberRole, MemberState};
pub use proposal::{
    MemberIdentity, MembershipEntry, SwitchDirection, SwitchProposal, ROUND_UNSEALED,
};
