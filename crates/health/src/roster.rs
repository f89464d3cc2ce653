//! The manager's three record collections.

use crate::record::HealthRecord;
use indexmap::IndexMap;
use std::sync::Arc;
use vigil_types::{MemberRole, MemberState, PeerId, PublicKey};

/// The three pairwise-disjoint collections of health records: the active
/// working set, the backup promotion queue and the fixed seed members.
///
/// Shape changes only at bootstrap; steady-state access goes through the
/// per-record atomics. Iteration order is stable: the working set keeps
/// insertion order, backups promote in insertion order.
#[derive(Default)]
pub struct Roster {
    working: IndexMap<PeerId, Arc<HealthRecord>>,
    backup: Vec<Arc<HealthRecord>>,
    seed: Vec<Arc<HealthRecord>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert into the working set, keyed by the record's current peer
    /// id. Returns false (and leaves the roster untouched) if a record
    /// with the same public key or peer id already exists anywhere.
    pub fn insert_working(&mut self, record: Arc<HealthRecord>) -> bool {
        let peer_id = record.peer_id();
        if self.contains_public_key(record.public_key()) || self.working.contains_key(&peer_id) {
            return false;
        }
        self.working.insert(peer_id, record);
        true
    }

    /// Insert a standby record: `Fixed` role routes to the seed
    /// sequence, anything else to the backup queue. Returns false on a
    /// duplicate public key.
    pub fn insert_standby(&mut self, record: Arc<HealthRecord>) -> bool {
        if self.contains_public_key(record.public_key()) {
            return false;
        }
        if record.role() == MemberRole::Fixed {
            self.seed.push(record);
        } else {
            self.backup.push(record);
        }
        true
    }

    /// True if any collection holds a record with this public key.
    pub fn contains_public_key(&self, public_key: &PublicKey) -> bool {
        self.get_by_public_key(public_key).is_some()
    }

    /// Working-set lookup by install-time peer id.
    pub fn get_working(&self, peer_id: &PeerId) -> Option<&Arc<HealthRecord>> {
        self.working.get(peer_id)
    }

    /// Lookup by public key, scanning working, then backup, then seed.
    pub fn get_by_public_key(&self, public_key: &PublicKey) -> Option<&Arc<HealthRecord>> {
        self.all().find(|r| r.public_key() == public_key)
    }

    /// Records of the working set, in insertion order.
    pub fn working(&self) -> impl Iterator<Item = &Arc<HealthRecord>> {
        self.working.values()
    }

    /// Backup records, in promotion order.
    pub fn backup(&self) -> impl Iterator<Item = &Arc<HealthRecord>> {
        self.backup.iter()
    }

    /// Fixed seed records.
    pub fn seed(&self) -> impl Iterator<Item = &Arc<HealthRecord>> {
        self.seed.iter()
    }

    /// Working then backup: the records whose silence is ticked.
    pub fn tracked(&self) -> impl Iterator<Item = &Arc<HealthRecord>> {
        self.working.values().chain(self.backup.iter())
    }

    /// Working, backup, then seed: the proposal snapshot order.
    pub fn all(&self) -> impl Iterator<Item = &Arc<HealthRecord>> {
        self.working
            .values()
            .chain(self.backup.iter())
            .chain(self.seed.iter())
    }

    /// Total number of records across all three collections.
    pub fn len(&self) -> usize {
        self.working.len() + self.backup.len() + self.seed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of records currently in the `Used` state.
    pub fn used_count(&self) -> usize {
        self.all().filter(|r| r.state() == MemberState::Used).count()
    }

    /// Claim a standby for promotion: the first record whose state CAS
    /// `Unused -> Switching` succeeds, backups in promotion order before
    /// seeds. The CAS guarantees no two callers ever claim the same
    /// record.
    pub fn pick_unused(&self) -> Option<Arc<HealthRecord>> {
        for record in self.backup.iter().chain(self.seed.iter()) {
            if record.try_promote() {
                return Some(Arc::clone(record));
            }
        }
        None
    }

    /// Canonical enumeration: every record, ordered by address bytes.
    pub fn ordered_by_address(&self) -> Vec<Arc<HealthRecord>> {
        let mut records: Vec<_> = self.all().cloned().collect();
        records.sort_by(|a, b| a.address().cmp(b.address()));
        records
    }
}
