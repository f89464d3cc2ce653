//! The health manager: owns the roster, drives the tick loop, emits
//! switch proposals and applies sealed results.
//!
//! # Event loop
//!
//! One long-lived task multiplexes three event sources: the periodic
//! health ticker, the inbound result channel and the shutdown signal.
//! Each tick increments the silence counter of every non-fixed `Used`
//! record; a counter crossing the threshold builds a switch proposal and
//! publishes it over the bridge. Sealed results come back on the inbound
//! channel and mutate per-record state.
//!
//! # Locking
//!
//! Fields are classified once and never straddle: `tick` and `state`
//! are atomic-only, the roster shape is behind one `RwLock` (the single
//! writer is the committee updater), and the pending-proposal slot has
//! its own mutex. The transport hot path (`update`, `update_transport`)
//! takes the roster read lock and touches per-record atomics only.

use crate::bridge::{ConsensusBridge, ShutdownHandle, BRIDGE_CAPACITY};
use crate::config::HealthConfig;
use crate::error::HealthError;
use crate::record::HealthRecord;
use crate::roster::Roster;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};
use vigil_types::{
    CommitteeMember, MemberRole, MemberState, MembershipEntry, NetworkAddress, PeerId, PublicKey,
    SwitchDirection, SwitchProposal, ROUND_UNSEALED,
};

/// Low 32 bits of the first proposal id a manager allocates.
const PROPOSAL_ID_BASE: u64 = 100;

/// Committee health manager.
///
/// Create one per committee, populate the roster with
/// [`put_working`](Self::put_working) / [`put_backup`](Self::put_backup),
/// hand the [`ConsensusBridge`] to the consensus layer, then
/// [`start`](Self::start) the loop.
pub struct HealthManager {
    committee_id: u64,
    config: HealthConfig,
    roster: RwLock<Roster>,
    /// At most one in-flight switch proposal.
    pending: Mutex<Option<SwitchProposal>>,
    next_id: AtomicU64,
    proposals_tx: mpsc::Sender<SwitchProposal>,
    proposals_rx: Mutex<Option<mpsc::Receiver<SwitchProposal>>>,
    results_tx: mpsc::Sender<SwitchProposal>,
    results_rx: Mutex<Option<mpsc::Receiver<SwitchProposal>>>,
}

impl HealthManager {
    /// Create a manager for one committee.
    pub fn new(committee_id: u64, config: HealthConfig) -> Self {
        let (proposals_tx, proposals_rx) = mpsc::channel(BRIDGE_CAPACITY);
        let (results_tx, results_rx) = mpsc::channel(BRIDGE_CAPACITY);
        let base = (committee_id << 32) | PROPOSAL_ID_BASE;
        info!(committee_id, base, "health manager created");
        Self {
            committee_id,
            config,
            roster: RwLock::new(Roster::new()),
            pending: Mutex::new(None),
            next_id: AtomicU64::new(base),
            proposals_tx,
            proposals_rx: Mutex::new(Some(proposals_rx)),
            results_tx,
            results_rx: Mutex::new(Some(results_rx)),
        }
    }

    pub fn committee_id(&self) -> u64 {
        self.committee_id
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Take the consensus-side endpoints of the bridge. Yields once;
    /// later calls return `None`.
    pub fn take_bridge(&self) -> Option<ConsensusBridge> {
        let proposals = self.proposals_rx.lock().unwrap().take()?;
        Some(ConsensusBridge {
            proposals,
            results: self.results_tx.clone(),
        })
    }

    /// Append a record to the working set. Bootstrap only, before the
    /// manager is started.
    pub fn put_working(&self, record: HealthRecord) {
        let record = Arc::new(record);
        if !self.roster.write().unwrap().insert_working(Arc::clone(&record)) {
            warn!(record = %record, "working record rejected, duplicate identity");
        }
    }

    /// Append a standby record; `Fixed` role routes to the seed set.
    /// Bootstrap only, before the manager is started.
    pub fn put_backup(&self, record: HealthRecord) {
        let record = Arc::new(record);
        if !self.roster.write().unwrap().insert_standby(Arc::clone(&record)) {
            warn!(record = %record, "standby record rejected, duplicate identity");
        }
    }

    /// Total number of records tracked.
    pub fn len(&self) -> usize {
        self.roster.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.read().unwrap().is_empty()
    }

    /// Transport intake: a message arrived from `peer_id`. Zeroes the
    /// matching non-fixed record's silence counter.
    pub fn update(&self, peer_id: &PeerId) {
        let roster = self.roster.read().unwrap();
        if let Some(record) = roster.get_working(peer_id) {
            if record.role() != MemberRole::Fixed {
                record.reset_tick();
            }
            return;
        }
        for record in roster.backup() {
            if &record.peer_id() == peer_id {
                if record.role() != MemberRole::Fixed {
                    record.reset_tick();
                }
                return;
            }
        }
    }

    /// Transport intake: handshake carrying fresh peer identity.
    /// Patches the transport fields of the record owning `public_key`;
    /// no-op if the key is unknown or the record was never introduced.
    pub fn update_transport(
        &self,
        peer_id: PeerId,
        address: NetworkAddress,
        public_key: &PublicKey,
    ) {
        let roster = self.roster.read().unwrap();
        if let Some(record) = roster.get_by_public_key(public_key) {
            if !record.peer_id().is_empty() {
                record.set_transport(peer_id, address);
                debug!(record = %record, "transport info updated");
            }
        }
    }

    /// Lookup by public key, scanning working, then backup, then seed.
    pub fn get_health(&self, public_key: &PublicKey) -> Option<Arc<HealthRecord>> {
        self.roster
            .read()
            .unwrap()
            .get_by_public_key(public_key)
            .cloned()
    }

    /// Copy of the pending proposal, if one is in flight.
    pub fn pending_proposal(&self) -> Option<SwitchProposal> {
        self.pending.lock().unwrap().clone()
    }

    /// Canonical address-ordered enumeration of every record.
    pub fn ordered_members(&self) -> Vec<Arc<HealthRecord>> {
        self.roster.read().unwrap().ordered_by_address()
    }

    // ───────────────────────────────────────────────────────────────────
    // Event loop
    // ───────────────────────────────────────────────────────────────────

    /// Spawn the manager loop. The returned handle stops it, also on
    /// drop. Any in-flight proposal is abandoned on shutdown.
    pub fn start(self: &Arc<Self>) -> ShutdownHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.run(shutdown_rx).await });
        ShutdownHandle::new(shutdown_tx)
    }

    async fn run(self: Arc<Self>, mut shutdown: oneshot::Receiver<()>) {
        let mut results_rx = match self.results_rx.lock().unwrap().take() {
            Some(rx) => rx,
            None => {
                warn!(
                    committee_id = self.committee_id,
                    "health manager started twice, loop not running"
                );
                return;
            }
        };

        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Latched after the one-time minimum-committee log line.
        let mut minimum_logged = false;

        info!(committee_id = self.committee_id, "health manager started");
        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!(committee_id = self.committee_id, "health manager stopped");
                    break;
                }

                Some(result) = results_rx.recv() => {
                    self.apply_switch_result(result);
                }

                _ = ticker.tick() => {
                    self.on_tick(&mut minimum_logged).await;
                }
            }
        }
    }

    /// One pass of the health ticker.
    async fn on_tick(&self, minimum_logged: &mut bool) {
        if !self.config.enabled {
            return;
        }

        let mut request = None;
        let mut restore = None;
        {
            let roster = self.roster.read().unwrap();
            let used = roster.used_count();
            let shift = used > self.config.min_validators;
            if !shift && !*minimum_logged {
                info!(
                    count = used,
                    committee_id = self.committee_id,
                    "switch proposals paused, committee at minimum size"
                );
                *minimum_logged = true;
            }

            for record in roster.tracked() {
                if record.state() != MemberState::Used
                    || record.role() == MemberRole::Fixed
                    || record.is_self()
                {
                    continue;
                }
                let tick = record.bump_tick();
                trace!(peer = %record.peer_id(), tick, "health tick");

                if shift
                    && tick > self.config.silence_threshold
                    && record.state() == MemberState::Used
                    && !record.is_self()
                {
                    let mut pending = self.pending.lock().unwrap();
                    if pending.is_none() {
                        record.set_state(MemberState::Switching);
                        let backup = roster.pick_unused();
                        if backup.is_none() {
                            warn!(
                                error = %HealthError::NoBackupAvailable,
                                remove = %record.peer_id(),
                                "switch proposed without promotion"
                            );
                        }
                        let proposal = self.build_proposal(
                            &roster,
                            record,
                            backup.as_ref(),
                            "silent validator",
                            SwitchDirection::Request,
                        );
                        info!(
                            committee_id = self.committee_id,
                            proposal = %proposal,
                            "switch validator proposed"
                        );
                        *pending = Some(proposal.clone());
                        request = Some(proposal);
                    }
                }
            }

            // Restore check, once per pass: a pending request whose
            // target revived is cancelled. The capacity-1 channel drops
            // the restore while the original request sits unconsumed.
            if request.is_none() {
                let pending = self.pending.lock().unwrap();
                if let Some(p) = pending.as_ref() {
                    if p.direction == SwitchDirection::Request {
                        let tick = roster
                            .get_by_public_key(&p.remove.public_key)
                            .map(|r| r.tick());
                        if tick.is_some_and(|t| t < self.config.silence_threshold) {
                            restore = Some(p.to_restore());
                        }
                    }
                }
            }
        }

        if let Some(proposal) = request {
            // Blocking here is the backpressure contract: the consensus
            // consumer must be actively receiving.
            if self.proposals_tx.send(proposal).await.is_err() {
                warn!(
                    committee_id = self.committee_id,
                    "consensus bridge closed, switch proposal dropped"
                );
            }
        } else if let Some(proposal) = restore {
            match self.proposals_tx.try_send(proposal) {
                Ok(()) => info!(committee_id = self.committee_id, "restore proposed"),
                Err(mpsc::error::TrySendError::Full(p)) => {
                    debug!(proposal = %p, "outbound slot busy, restore dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(
                        committee_id = self.committee_id,
                        "consensus bridge closed, restore dropped"
                    );
                }
            }
        }
    }

    /// Assemble a proposal: the promoted member first (flag `Append`)
    /// when present, the removed member (flag `Removed`), then every
    /// other `Used` record in roster order.
    fn build_proposal(
        &self,
        roster: &Roster,
        remove: &Arc<HealthRecord>,
        add: Option<&Arc<HealthRecord>>,
        reason: &str,
        direction: SwitchDirection,
    ) -> SwitchProposal {
        let mut members = Vec::new();
        if let Some(add) = add {
            members.push(MembershipEntry::new(*add.public_key(), MemberState::Append));
        }
        members.push(MembershipEntry::new(
            *remove.public_key(),
            MemberState::Removed,
        ));
        for record in roster.all() {
            if record.matches(remove) || add.is_some_and(|a| record.matches(a)) {
                continue;
            }
            let state = record.state();
            if state == MemberState::Used {
                members.push(MembershipEntry::new(*record.public_key(), state));
            }
        }

        SwitchProposal {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            committee_id: self.committee_id,
            remove: remove.identity(),
            add: add.map(|a| a.identity()),
            members,
            reason: reason.to_owned(),
            direction,
            round: ROUND_UNSEALED,
            door_count: 0,
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // Result handling
    // ───────────────────────────────────────────────────────────────────

    /// Apply a sealed switch result from the consensus layer.
    pub fn apply_switch_result(&self, result: SwitchProposal) {
        if !self.config.enabled {
            debug!(error = %HealthError::Disabled, "switch result ignored");
            return;
        }

        let mut outcome = "unmatched";
        let matched_pending = {
            let mut pending = self.pending.lock().unwrap();
            let matched = pending.as_ref().is_some_and(|p| {
                (result.direction == SwitchDirection::Restore && p.matches(&result))
                    || p.matches_ignoring_id(&result)
                    || p.matches_remove(&result)
            });
            if matched {
                *pending = None;
                outcome = "acknowledged";
            }
            matched
        };

        match result.direction {
            SwitchDirection::Restore => {
                // The revived validator leaves its in-flight switch
                // behind; the claimed backup keeps waiting for the next
                // committee update.
                if matched_pending {
                    let roster = self.roster.read().unwrap();
                    if let Some(record) = roster.get_by_public_key(&result.remove.public_key) {
                        if record.restore_used() {
                            outcome = "restored";
                        }
                    }
                }
            }
            SwitchDirection::Request => {
                if result.members.len() > 2 {
                    let roster = self.roster.read().unwrap();
                    let first = &result.members[0];
                    let second = &result.members[1];
                    let mut remove = None;
                    let mut add = None;
                    if first.flag == MemberState::Append {
                        add = roster.get_by_public_key(&first.public_key);
                        if second.flag == MemberState::Removed {
                            remove = roster.get_by_public_key(&second.public_key);
                        }
                    } else if first.flag == MemberState::Removed {
                        remove = roster.get_by_public_key(&first.public_key);
                    }

                    let remove_agrees =
                        remove.is_some_and(|r| r.matches_identity(&result.remove));
                    let add_agrees = match (&add, &result.add) {
                        (Some(record), Some(identity)) => record.matches_identity(identity),
                        (None, None) => true,
                        _ => false,
                    };
                    if !remove_agrees || !add_agrees {
                        warn!(
                            error = %HealthError::Mismatch,
                            committee_id = self.committee_id,
                            result = %result,
                            "applying switch result on the entries present"
                        );
                    }

                    if let Some(record) = remove {
                        record.set_state(MemberState::Removed);
                        record.reset_tick();
                        outcome = "switched";
                    }
                    if let Some(record) = add {
                        record.set_state(MemberState::Used);
                        record.reset_tick();
                    }
                }
            }
        }

        info!(
            committee_id = self.committee_id,
            outcome,
            result = %result,
            "switch result handled"
        );
    }

    // ───────────────────────────────────────────────────────────────────
    // Verification
    // ───────────────────────────────────────────────────────────────────

    /// Vote admission check for an incoming proposal.
    ///
    /// Accepts the manager's own pending proposal echoed back; otherwise
    /// the removed member must be `Used..=Switching` at or past the
    /// silence threshold, and the promoted member (when named) must not
    /// be `Used` or `Removed`.
    pub fn verify_switch(&self, proposal: &SwitchProposal) -> Result<(), HealthError> {
        if !self.config.enabled {
            return Err(HealthError::Disabled);
        }

        {
            let pending = self.pending.lock().unwrap();
            if pending.as_ref().is_some_and(|p| p.matches(proposal)) {
                debug!(proposal = %proposal, "verifying own pending proposal");
                return Ok(());
            }
        }

        let roster = self.roster.read().unwrap();
        let remove = roster
            .get_by_public_key(&proposal.remove.public_key)
            .ok_or(HealthError::UnknownMember {
                public_key: proposal.remove.public_key,
            })?;
        let remove_state = remove.state();
        let remove_tick = remove.tick();
        let remove_ok = remove_state >= MemberState::Used
            && remove_state <= MemberState::Switching
            && remove_tick >= self.config.silence_threshold;

        let add_state = match &proposal.add {
            Some(identity) => Some(
                roster
                    .get_by_public_key(&identity.public_key)
                    .ok_or(HealthError::UnknownMember {
                        public_key: identity.public_key,
                    })?
                    .state(),
            ),
            None => None,
        };
        let add_ok = match add_state {
            Some(state) => state != MemberState::Used && state != MemberState::Removed,
            None => true,
        };

        if remove_ok && add_ok {
            Ok(())
        } else {
            Err(HealthError::WrongState {
                remove_state,
                remove_tick,
                add_state,
            })
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // Committee updates
    // ───────────────────────────────────────────────────────────────────

    /// Apply an authoritative post-election committee: store each
    /// delivered flag into the matching record (by address), then
    /// reconcile the pending proposal against the delivered truth.
    ///
    /// Runs even when health management is disabled.
    pub fn update_from_committee(
        &self,
        members: &[CommitteeMember],
        backup_members: &[CommitteeMember],
    ) {
        {
            // Write lock: committee updates serialize against the tick loop.
            let roster = self.roster.write().unwrap();
            for member in members {
                let address = member.public_key.address();
                if let Some(record) = roster.working().find(|r| *r.address() == address) {
                    record.set_state(member.flag);
                }
            }
            for member in backup_members {
                let address = member.public_key.address();
                let record = match member.role {
                    MemberRole::Backup => roster.backup().find(|r| *r.address() == address),
                    MemberRole::Fixed => roster.seed().find(|r| *r.address() == address),
                    MemberRole::Working => None,
                };
                if let Some(record) = record {
                    record.set_state(member.flag);
                }
            }
        }
        self.reconcile_pending(members, backup_members);
    }

    /// Discard the pending proposal unless the delivered committee still
    /// shows its `remove` as `Used` and its `add` (when named) as
    /// `Unused` — otherwise the election has already resolved it.
    fn reconcile_pending(&self, members: &[CommitteeMember], backup_members: &[CommitteeMember]) {
        let mut pending = self.pending.lock().unwrap();
        let Some(p) = pending.as_ref() else {
            return;
        };

        let mut remove_ok = false;
        let mut add_ok = p.add.is_none();
        for member in members.iter().chain(backup_members.iter()) {
            let address = member.public_key.address();
            if address == p.remove.address && member.flag == MemberState::Used {
                remove_ok = true;
            }
            if let Some(add) = &p.add {
                if address == add.address && member.flag == MemberState::Unused {
                    add_ok = true;
                }
            }
        }
        if !(remove_ok && add_ok) {
            info!(
                committee_id = self.committee_id,
                proposal = %p,
                "pending switch resolved by committee update"
            );
            *pending = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn pk(seed: u8) -> PublicKey {
        PublicKey::from_bytes([seed; 32])
    }

    fn record(seed: u8, role: MemberRole, state: MemberState) -> HealthRecord {
        HealthRecord::new(
            PeerId::new(format!("peer-{seed}")),
            NetworkAddress::new("127.0.0.1", 30300 + seed as u16),
            pk(seed),
            role,
            state,
            false,
        )
    }

    fn test_config() -> HealthConfig {
        HealthConfig {
            silence_threshold: 3,
            min_validators: 2,
            tick_interval: Duration::from_millis(5),
            enabled: true,
        }
    }

    /// Four used working members (seeds 1..=4) and one unused backup (5).
    fn manager() -> HealthManager {
        let mgr = HealthManager::new(7, test_config());
        for seed in 1..=4u8 {
            mgr.put_working(record(seed, MemberRole::Working, MemberState::Used));
        }
        mgr.put_backup(record(5, MemberRole::Backup, MemberState::Unused));
        mgr
    }

    fn member(seed: u8, flag: MemberState, role: MemberRole) -> CommitteeMember {
        CommitteeMember::new(pk(seed), flag, role)
    }

    #[test]
    fn proposal_ids_increase_from_base() {
        let mgr = manager();
        let roster = mgr.roster.read().unwrap();
        let remove = roster.get_by_public_key(&pk(1)).unwrap().clone();
        let first = mgr.build_proposal(&roster, &remove, None, "t", SwitchDirection::Request);
        let second = mgr.build_proposal(&roster, &remove, None, "t", SwitchDirection::Request);
        assert_eq!(first.id, (7u64 << 32) | 100);
        assert_eq!(second.id, first.id + 1);
    }

    #[test]
    fn proposal_members_are_ordered() {
        let mgr = manager();
        let roster = mgr.roster.read().unwrap();
        let remove = roster.get_by_public_key(&pk(1)).unwrap().clone();
        let add = roster.pick_unused().expect("backup");
        let proposal =
            mgr.build_proposal(&roster, &remove, Some(&add), "t", SwitchDirection::Request);

        let flags: Vec<_> = proposal
            .members
            .iter()
            .map(|e| (e.public_key, e.flag))
            .collect();
        assert_eq!(
            flags,
            vec![
                (pk(5), MemberState::Append),
                (pk(1), MemberState::Removed),
                (pk(2), MemberState::Used),
                (pk(3), MemberState::Used),
                (pk(4), MemberState::Used),
            ]
        );
    }

    #[test]
    fn proposal_without_backup_lists_removal_first() {
        let mgr = manager();
        let roster = mgr.roster.read().unwrap();
        // Exhaust the only backup.
        roster.get_by_public_key(&pk(5)).unwrap().set_state(MemberState::Switching);
        assert!(roster.pick_unused().is_none());

        let remove = roster.get_by_public_key(&pk(1)).unwrap().clone();
        let proposal = mgr.build_proposal(&roster, &remove, None, "t", SwitchDirection::Request);
        assert!(proposal.add.is_none());
        assert_eq!(proposal.members[0].flag, MemberState::Removed);
        assert_eq!(proposal.members[0].public_key, pk(1));
        assert_eq!(proposal.members.len(), 4);
    }

    #[tokio::test]
    async fn tick_crossing_threshold_emits_one_proposal() {
        let mgr = manager();
        let mut bridge = mgr.take_bridge().expect("bridge");
        let mut latched = false;

        for _ in 0..4 {
            mgr.on_tick(&mut latched).await;
        }

        let proposal = bridge.proposals.try_recv().expect("proposal emitted");
        assert_eq!(proposal.direction, SwitchDirection::Request);
        assert_eq!(proposal.remove.public_key, pk(1));
        assert_eq!(proposal.add.as_ref().map(|a| a.public_key), Some(pk(5)));
        assert!(mgr.pending_proposal().is_some());

        // The pending slot gates any further proposal.
        mgr.on_tick(&mut latched).await;
        assert!(bridge.proposals.try_recv().is_err());
    }

    #[tokio::test]
    async fn no_proposal_at_minimum_committee() {
        let mgr = HealthManager::new(1, test_config());
        mgr.put_working(record(1, MemberRole::Working, MemberState::Used));
        mgr.put_working(record(2, MemberRole::Working, MemberState::Used));
        mgr.put_backup(record(3, MemberRole::Backup, MemberState::Unused));
        let mut bridge = mgr.take_bridge().expect("bridge");
        let mut latched = false;

        for _ in 0..10 {
            mgr.on_tick(&mut latched).await;
        }

        assert!(bridge.proposals.try_recv().is_err());
        assert!(mgr.pending_proposal().is_none());
        assert!(latched, "minimum-size pause should be logged once");
    }

    #[tokio::test]
    async fn fixed_member_never_ticks_or_leaves() {
        let mgr = HealthManager::new(1, test_config());
        for seed in 1..=3u8 {
            mgr.put_working(record(seed, MemberRole::Working, MemberState::Used));
        }
        mgr.put_working(record(9, MemberRole::Fixed, MemberState::Used));
        let mut bridge = mgr.take_bridge().expect("bridge");
        let mut latched = false;

        for _ in 0..10 {
            mgr.on_tick(&mut latched).await;
        }

        let fixed = mgr.get_health(&pk(9)).unwrap();
        assert_eq!(fixed.tick(), 0);
        let proposal = bridge.proposals.try_recv().expect("proposal emitted");
        assert_ne!(proposal.remove.public_key, pk(9));
    }

    #[tokio::test]
    async fn self_member_never_proposed() {
        let mgr = HealthManager::new(1, test_config());
        mgr.put_working(HealthRecord::new(
            PeerId::new("peer-0"),
            NetworkAddress::new("127.0.0.1", 30300),
            pk(0),
            MemberRole::Working,
            MemberState::Used,
            true,
        ));
        for seed in 1..=3u8 {
            mgr.put_working(record(seed, MemberRole::Working, MemberState::Used));
        }
        let mut bridge = mgr.take_bridge().expect("bridge");
        let mut latched = false;

        for _ in 0..10 {
            mgr.on_tick(&mut latched).await;
        }

        let local = mgr.get_health(&pk(0)).unwrap();
        assert_eq!(local.tick(), 0);
        let proposal = bridge.proposals.try_recv().expect("proposal emitted");
        assert_ne!(proposal.remove.public_key, pk(0));
    }

    #[tokio::test]
    async fn update_resets_tick_and_prevents_switch() {
        let mgr = manager();
        let mut bridge = mgr.take_bridge().expect("bridge");
        let mut latched = false;
        let peer_a = mgr.get_health(&pk(1)).unwrap().peer_id();

        for _ in 0..2 {
            mgr.on_tick(&mut latched).await;
        }
        mgr.update(&peer_a);
        assert_eq!(mgr.get_health(&pk(1)).unwrap().tick(), 0);
        for _ in 0..2 {
            mgr.on_tick(&mut latched).await;
        }

        // A is at 2 ticks, B..D at 4: B crosses first instead of A.
        let proposal = bridge.proposals.try_recv().expect("proposal emitted");
        assert_eq!(proposal.remove.public_key, pk(2));
    }

    #[tokio::test]
    async fn restore_emitted_and_applied_when_target_revives() {
        let mgr = manager();
        let mut bridge = mgr.take_bridge().expect("bridge");
        let mut latched = false;

        for _ in 0..4 {
            mgr.on_tick(&mut latched).await;
        }
        let request = bridge.proposals.try_recv().expect("switch request");
        assert_eq!(request.remove.public_key, pk(1));
        assert_eq!(
            mgr.get_health(&pk(1)).unwrap().state(),
            MemberState::Switching
        );

        // The silent validator revives before the switch seals.
        let peer_a = mgr.get_health(&pk(1)).unwrap().peer_id();
        mgr.update(&peer_a);
        mgr.on_tick(&mut latched).await;

        let restore = bridge.proposals.try_recv().expect("restore");
        assert_eq!(restore.direction, SwitchDirection::Restore);
        assert!(request.matches(&restore));

        mgr.apply_switch_result(restore);
        assert!(mgr.pending_proposal().is_none());
        assert_eq!(mgr.get_health(&pk(1)).unwrap().state(), MemberState::Used);
    }

    #[test]
    fn apply_result_switches_states() {
        let mgr = manager();
        let proposal = {
            let roster = mgr.roster.read().unwrap();
            let remove = roster.get_by_public_key(&pk(1)).unwrap().clone();
            let add = roster.pick_unused().expect("backup");
            mgr.build_proposal(&roster, &remove, Some(&add), "t", SwitchDirection::Request)
        };
        *mgr.pending.lock().unwrap() = Some(proposal.clone());

        mgr.apply_switch_result(proposal);

        let removed = mgr.get_health(&pk(1)).unwrap();
        let added = mgr.get_health(&pk(5)).unwrap();
        assert_eq!(removed.state(), MemberState::Removed);
        assert_eq!(removed.tick(), 0);
        assert_eq!(added.state(), MemberState::Used);
        assert_eq!(added.tick(), 0);
        assert!(mgr.pending_proposal().is_none());
    }

    #[test]
    fn committee_echo_of_applied_switch_is_idempotent() {
        let mgr = manager();
        let proposal = {
            let roster = mgr.roster.read().unwrap();
            let remove = roster.get_by_public_key(&pk(1)).unwrap().clone();
            let add = roster.pick_unused().expect("backup");
            mgr.build_proposal(&roster, &remove, Some(&add), "t", SwitchDirection::Request)
        };
        *mgr.pending.lock().unwrap() = Some(proposal.clone());
        mgr.apply_switch_result(proposal);

        // The election layer later echoes the same change.
        mgr.update_from_committee(
            &[
                member(1, MemberState::Removed, MemberRole::Working),
                member(2, MemberState::Used, MemberRole::Working),
                member(3, MemberState::Used, MemberRole::Working),
                member(4, MemberState::Used, MemberRole::Working),
            ],
            &[member(5, MemberState::Used, MemberRole::Backup)],
        );

        assert_eq!(mgr.get_health(&pk(1)).unwrap().state(), MemberState::Removed);
        assert_eq!(mgr.get_health(&pk(5)).unwrap().state(), MemberState::Used);
        assert!(mgr.pending_proposal().is_none());
    }

    #[test]
    fn committee_update_discards_resolved_pending() {
        let mgr = manager();
        let proposal = {
            let roster = mgr.roster.read().unwrap();
            let remove = roster.get_by_public_key(&pk(1)).unwrap().clone();
            let add = roster.pick_unused().expect("backup");
            mgr.build_proposal(&roster, &remove, Some(&add), "t", SwitchDirection::Request)
        };
        *mgr.pending.lock().unwrap() = Some(proposal);

        // The committee already shows the switch as done.
        mgr.update_from_committee(
            &[member(1, MemberState::Removed, MemberRole::Working)],
            &[member(5, MemberState::Used, MemberRole::Backup)],
        );
        assert!(mgr.pending_proposal().is_none());
    }

    #[test]
    fn committee_update_keeps_unresolved_pending() {
        let mgr = manager();
        let proposal = {
            let roster = mgr.roster.read().unwrap();
            let remove = roster.get_by_public_key(&pk(1)).unwrap().clone();
            let add = roster.pick_unused().expect("backup");
            mgr.build_proposal(&roster, &remove, Some(&add), "t", SwitchDirection::Request)
        };
        *mgr.pending.lock().unwrap() = Some(proposal);

        mgr.update_from_committee(
            &[member(1, MemberState::Used, MemberRole::Working)],
            &[member(5, MemberState::Unused, MemberRole::Backup)],
        );
        assert!(mgr.pending_proposal().is_some());
    }

    #[test]
    fn verify_accepts_own_pending_proposal() {
        let mgr = manager();
        let proposal = {
            let roster = mgr.roster.read().unwrap();
            let remove = roster.get_by_public_key(&pk(1)).unwrap().clone();
            mgr.build_proposal(&roster, &remove, None, "t", SwitchDirection::Request)
        };
        *mgr.pending.lock().unwrap() = Some(proposal.clone());
        // Admissible even though the target is not silent: it is ours.
        assert!(mgr.verify_switch(&proposal).is_ok());
    }

    #[test]
    fn verify_accepts_silent_removal_with_unused_addition() {
        let mgr = manager();
        let silent = mgr.get_health(&pk(1)).unwrap();
        for _ in 0..3 {
            silent.bump_tick();
        }
        let proposal = {
            let roster = mgr.roster.read().unwrap();
            let remove = roster.get_by_public_key(&pk(1)).unwrap().clone();
            let add = roster.get_by_public_key(&pk(5)).unwrap().clone();
            mgr.build_proposal(&roster, &remove, Some(&add), "t", SwitchDirection::Request)
        };
        assert!(mgr.verify_switch(&proposal).is_ok());
    }

    #[test]
    fn verify_rejects_live_removal() {
        let mgr = manager();
        let proposal = {
            let roster = mgr.roster.read().unwrap();
            let remove = roster.get_by_public_key(&pk(1)).unwrap().clone();
            mgr.build_proposal(&roster, &remove, None, "t", SwitchDirection::Request)
        };
        // Not pending, and the target has zero silent ticks.
        let err = mgr.verify_switch(&proposal).unwrap_err();
        assert!(matches!(err, HealthError::WrongState { remove_tick: 0, .. }));
    }

    #[test]
    fn verify_rejects_used_addition() {
        let mgr = manager();
        let silent = mgr.get_health(&pk(1)).unwrap();
        for _ in 0..3 {
            silent.bump_tick();
        }
        mgr.get_health(&pk(5)).unwrap().set_state(MemberState::Used);
        let proposal = {
            let roster = mgr.roster.read().unwrap();
            let remove = roster.get_by_public_key(&pk(1)).unwrap().clone();
            let add = roster.get_by_public_key(&pk(5)).unwrap().clone();
            mgr.build_proposal(&roster, &remove, Some(&add), "t", SwitchDirection::Request)
        };
        let err = mgr.verify_switch(&proposal).unwrap_err();
        assert!(matches!(
            err,
            HealthError::WrongState {
                add_state: Some(MemberState::Used),
                ..
            }
        ));
    }

    #[test]
    fn verify_rejects_unknown_member() {
        let mgr = manager();
        let mut proposal = {
            let roster = mgr.roster.read().unwrap();
            let remove = roster.get_by_public_key(&pk(1)).unwrap().clone();
            mgr.build_proposal(&roster, &remove, None, "t", SwitchDirection::Request)
        };
        proposal.remove.public_key = pk(42);
        let err = mgr.verify_switch(&proposal).unwrap_err();
        assert!(matches!(err, HealthError::UnknownMember { .. }));
    }

    #[tokio::test]
    async fn disabled_manager_is_inert_but_still_reconciles() {
        let mut config = test_config();
        config.enabled = false;
        let mgr = HealthManager::new(1, config);
        for seed in 1..=4u8 {
            mgr.put_working(record(seed, MemberRole::Working, MemberState::Used));
        }
        mgr.put_backup(record(5, MemberRole::Backup, MemberState::Unused));
        let mut bridge = mgr.take_bridge().expect("bridge");
        let mut latched = false;

        for _ in 0..10 {
            mgr.on_tick(&mut latched).await;
        }
        assert!(bridge.proposals.try_recv().is_err());
        assert_eq!(mgr.get_health(&pk(1)).unwrap().tick(), 0);

        let proposal = {
            let roster = mgr.roster.read().unwrap();
            let remove = roster.get_by_public_key(&pk(1)).unwrap().clone();
            mgr.build_proposal(&roster, &remove, None, "t", SwitchDirection::Request)
        };
        assert!(matches!(
            mgr.verify_switch(&proposal),
            Err(HealthError::Disabled)
        ));
        mgr.apply_switch_result(proposal);
        assert_eq!(mgr.get_health(&pk(1)).unwrap().state(), MemberState::Used);

        // Committee updates apply regardless.
        mgr.update_from_committee(&[member(1, MemberState::Removed, MemberRole::Working)], &[]);
        assert_eq!(mgr.get_health(&pk(1)).unwrap().state(), MemberState::Removed);
    }

    #[test]
    fn update_transport_patches_by_public_key() {
        let mgr = manager();
        mgr.update_transport(
            PeerId::new("peer-1-renamed"),
            NetworkAddress::new("10.0.0.9", 40000),
            &pk(1),
        );
        let record = mgr.get_health(&pk(1)).unwrap();
        assert_eq!(record.peer_id(), PeerId::new("peer-1-renamed"));
        assert_eq!(record.transport().address, NetworkAddress::new("10.0.0.9", 40000));

        // Unknown key is a no-op.
        mgr.update_transport(
            PeerId::new("ghost"),
            NetworkAddress::new("10.0.0.1", 1),
            &pk(42),
        );
        assert!(mgr.get_health(&pk(42)).is_none());
    }
}
