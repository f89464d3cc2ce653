//! Per-validator liveness records.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use vigil_types::{
    Address, MemberIdentity, MemberRole, MemberState, NetworkAddress, PeerId, PublicKey,
};

/// Transport-assigned fields of a record. They change together on
/// handshake, so they live under one lock.
#[derive(Debug, Clone)]
pub struct TransportInfo {
    pub peer_id: PeerId,
    pub address: NetworkAddress,
}

/// Per-validator liveness record.
///
/// `tick` and `state` are atomic-only fields: the transport hot path and
/// the tick loop touch them without taking any roster lock. Transport
/// identity sits under the record's own mutex. Everything else is
/// immutable after creation.
pub struct HealthRecord {
    transport: Mutex<TransportInfo>,
    public_key: PublicKey,
    address: Address,
    role: MemberRole,
    is_self: bool,
    tick: AtomicU32,
    state: AtomicU32,
}

impl HealthRecord {
    /// Create a record. The address is derived from the public key.
    pub fn new(
        peer_id: PeerId,
        address: NetworkAddress,
        public_key: PublicKey,
        role: MemberRole,
        state: MemberState,
        is_self: bool,
    ) -> Self {
        Self {
            transport: Mutex::new(TransportInfo { peer_id, address }),
            address: public_key.address(),
            public_key,
            role,
            is_self,
            tick: AtomicU32::new(0),
            state: AtomicU32::new(state.to_wire()),
        }
    }

    /// Current transport-assigned peer id.
    pub fn peer_id(&self) -> PeerId {
        self.transport.lock().unwrap().peer_id.clone()
    }

    /// Snapshot of the transport fields.
    pub fn transport(&self) -> TransportInfo {
        self.transport.lock().unwrap().clone()
    }

    /// Patch the transport fields after a handshake.
    pub fn set_transport(&self, peer_id: PeerId, address: NetworkAddress) {
        let mut transport = self.transport.lock().unwrap();
        transport.peer_id = peer_id;
        transport.address = address;
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn role(&self) -> MemberRole {
        self.role
    }

    /// True iff this record represents the local node.
    pub fn is_self(&self) -> bool {
        self.is_self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> MemberState {
        // Stores only ever go through `set_state` and the CAS helpers,
        // so the discriminant is always valid.
        MemberState::from_wire(self.state.load(Ordering::SeqCst)).unwrap_or(MemberState::Unused)
    }

    /// Store a lifecycle state.
    pub fn set_state(&self, state: MemberState) {
        self.state.store(state.to_wire(), Ordering::SeqCst);
    }

    /// Claim this record for promotion: CAS `Unused -> Switching`.
    /// At most one caller ever succeeds for a given claim window.
    pub fn try_promote(&self) -> bool {
        self.state
            .compare_exchange(
                MemberState::Unused.to_wire(),
                MemberState::Switching.to_wire(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Return a revived record to service: CAS `Switching -> Used`.
    pub fn restore_used(&self) -> bool {
        self.state
            .compare_exchange(
                MemberState::Switching.to_wire(),
                MemberState::Used.to_wire(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Increment the silence counter and return the new value.
    pub fn bump_tick(&self) -> u32 {
        self.tick.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current silence counter.
    pub fn tick(&self) -> u32 {
        self.tick.load(Ordering::Relaxed)
    }

    /// Zero the silence counter.
    pub fn reset_tick(&self) {
        self.tick.store(0, Ordering::Relaxed);
    }

    /// Identity equality: transport id and public key.
    pub fn matches(&self, other: &HealthRecord) -> bool {
        self.public_key == other.public_key && self.peer_id() == other.peer_id()
    }

    /// Identity equality against a proposal-carried identity copy.
    pub fn matches_identity(&self, identity: &MemberIdentity) -> bool {
        self.public_key == identity.public_key && self.peer_id() == identity.peer_id
    }

    /// Identity copy for embedding in a proposal.
    pub fn identity(&self) -> MemberIdentity {
        MemberIdentity {
            peer_id: self.peer_id(),
            public_key: self.public_key,
            address: self.address,
        }
    }
}

impl fmt::Debug for HealthRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthRecord")
            .field("peer_id", &self.peer_id())
            .field("address", &self.address)
            .field("role", &self.role)
            .field("is_self", &self.is_self)
            .field("tick", &self.tick())
            .field("state", &self.state())
            .finish()
    }
}

impl fmt::Display for HealthRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let transport = self.transport();
        write!(
            f,
            "health[id:{},net:{},tick:{},state:{},role:{},addr:{}]",
            transport.peer_id,
            transport.address,
            self.tick(),
            self.state(),
            self.role,
            self.address,
        )
    }
}
