//! # Neighbor Statistics Table
//!
//! Per-protocol-instance record of every neighbor heard from: a 12-slot
//! reception window, the reverse count the neighbor last reported, and its
//! last kinematic snapshot. One table is owned by one routing instance and
//! driven from its event loop:
//!
//! - on every received probe: [`NeighborTable::record_probe`] (or
//!   [`NeighborTable::update`] directly),
//! - once per probe period: [`NeighborTable::advance_and_decay`],
//! - when building the next probe: [`NeighborTable::export_reception_counts`],
//! - during route processing: [`NeighborTable::hybrid_metric`].
//!
//! Records are never expired here; a neighbor that goes silent simply decays
//! to an empty window and an unreachable metric.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::etx::{self, ETX_MAX};
use crate::kinematics::Kinematics;
use crate::metric::HybridMetric;
use crate::stats::NeighborReport;
use crate::window::{ReceptionWindow, TimeSlot};
use crate::wire::LinkProbe;

/// What is known about one neighbor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NeighborRecord {
    /// Probes received from the neighbor, one bit per slot.
    pub window: ReceptionWindow,
    /// How many of our probes the neighbor last said it received.
    pub reverse: u8,
    /// Last snapshot the neighbor sent.
    pub kinematics: Kinematics,
}

/// Neighbor records plus the shared slot cursor.
#[derive(Debug, Clone, Default)]
pub struct NeighborTable {
    records: BTreeMap<Ipv4Addr, NeighborRecord>,
    cursor: TimeSlot,
    metric: HybridMetric,
}

impl NeighborTable {
    pub fn new(metric: HybridMetric) -> Self {
        NeighborTable {
            records: BTreeMap::new(),
            cursor: TimeSlot::default(),
            metric,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.hybrid_metric())
    }

    /// Current slot cursor.
    pub fn cursor(&self) -> TimeSlot {
        self.cursor
    }

    pub fn metric_model(&self) -> &HybridMetric {
        &self.metric
    }

    pub fn get(&self, addr: Ipv4Addr) -> Option<&NeighborRecord> {
        self.records.get(&addr)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn addresses(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.records.keys().copied()
    }

    /// Record a probe from `addr` in `slot`.
    ///
    /// Marks the slot in the window and overwrites the reverse count and
    /// kinematics with the supplied values; there is no ordering check, so
    /// an out-of-order update replaces newer data. Returns `true` on first
    /// contact.
    pub fn update(
        &mut self,
        addr: Ipv4Addr,
        slot: TimeSlot,
        reverse: u8,
        kinematics: Kinematics,
    ) -> bool {
        match self.records.get_mut(&addr) {
            Some(record) => {
                record.window.mark(slot);
                record.reverse = reverse;
                record.kinematics = kinematics;
                false
            }
            None => {
                debug!(neighbor = %addr, slot = slot.index(), reverse, "new neighbor");
                self.records.insert(
                    addr,
                    NeighborRecord {
                        window: ReceptionWindow::with_slot(slot),
                        reverse,
                        kinematics,
                    },
                );
                true
            }
        }
    }

    /// Apply a probe received by `local_addr`.
    ///
    /// The reverse count is the entry the sender listed for `local_addr`
    /// (0 when absent) and the slot is the local cursor. Probes that carry
    /// our own address as origin are ignored.
    pub fn record_probe(&mut self, local_addr: Ipv4Addr, probe: &LinkProbe) -> bool {
        if probe.origin == local_addr {
            return false;
        }
        let reverse = probe.count_for(local_addr).unwrap_or(0);
        self.update(probe.origin, self.cursor, reverse, probe.kinematics);
        true
    }

    /// Replace the kinematics of a known neighbor without touching its
    /// reception statistics. Returns whether the neighbor was known.
    pub fn refresh_kinematics(&mut self, addr: Ipv4Addr, kinematics: Kinematics) -> bool {
        match self.records.get_mut(&addr) {
            Some(record) => {
                record.kinematics = kinematics;
                true
            }
            None => false,
        }
    }

    /// Advance the cursor one slot and evict the slot after it from every
    /// record. Must run exactly once per probe period.
    pub fn advance_and_decay(&mut self) {
        self.cursor = self.cursor.next();
        let evict = self.cursor.next();
        for record in self.records.values_mut() {
            record.window.clear(evict);
        }
        trace!(cursor = self.cursor.index(), evicted = evict.index(), "slot advanced");
    }

    /// Settled reception count for `addr`; 0 for an unknown neighbor.
    pub fn reception_count(&self, addr: Ipv4Addr) -> u8 {
        self.records
            .get(&addr)
            .map_or(0, |r| etx::count_receptions(r.window, self.cursor))
    }

    /// Append `(neighbor, count)` to `probe` for every neighbor with a
    /// nonzero settled count.
    pub fn export_reception_counts(&self, probe: &mut LinkProbe) {
        for (&addr, record) in &self.records {
            let count = etx::count_receptions(record.window, self.cursor);
            if count > 0 && !probe.add_neighbor(addr, count) {
                debug!(neighbor = %addr, "probe neighbor list full");
            }
        }
    }

    /// Build the next outgoing probe with the current reception counts.
    pub fn build_probe(
        &self,
        id: u8,
        origin: Ipv4Addr,
        origin_seq: u32,
        local: Kinematics,
    ) -> LinkProbe {
        let mut probe = LinkProbe::new(id, origin, origin_seq, local);
        self.export_reception_counts(&mut probe);
        probe
    }

    /// ETX towards `addr`; [`ETX_MAX`] when unknown or without a usable estimate.
    pub fn etx(&self, addr: Ipv4Addr) -> u32 {
        match self.records.get(&addr) {
            Some(record) => etx::etx_for(record.window, record.reverse, self.cursor),
            None => ETX_MAX,
        }
    }

    /// Predicted LET towards `addr` from the local snapshot, if known.
    pub fn link_expiration(&self, addr: Ipv4Addr, local: &Kinematics) -> Option<f64> {
        self.records
            .get(&addr)
            .map(|r| self.metric.expiry.link_expiration_time(local, &r.kinematics))
    }

    /// Route metric towards `addr`: the ETX, or [`ETX_MAX`] when the
    /// neighbor is unknown or LET says the link is about to break.
    pub fn hybrid_metric(&self, addr: Ipv4Addr, local: &Kinematics) -> u32 {
        let Some(record) = self.records.get(&addr) else {
            return ETX_MAX;
        };
        let etx = etx::etx_for(record.window, record.reverse, self.cursor);
        let (metric, let_s) = self.metric.evaluate(etx, local, &record.kinematics);
        if metric != etx {
            debug!(neighbor = %addr, etx, let_s, "link expiring, metric forced to max");
        }
        metric
    }

    /// Per-neighbor summary from the point of view of `local`.
    pub fn reports(&self, local: &Kinematics) -> Vec<NeighborReport> {
        self.records
            .iter()
            .map(|(&addr, record)| {
                let etx = etx::etx_for(record.window, record.reverse, self.cursor);
                let (hybrid, let_s) = self.metric.evaluate(etx, local, &record.kinematics);
                NeighborReport {
                    address: addr,
                    window: record.window.bits(),
                    receptions: etx::count_receptions(record.window, self.cursor),
                    reverse: record.reverse,
                    etx,
                    let_s,
                    hybrid,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::ExpiryModel;
    use crate::kinematics::Vector3;
    use crate::window::WINDOW_SLOTS;

    fn addr(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, 0, last)
    }

    fn still() -> Kinematics {
        Kinematics::stationary(Vector3::ZERO)
    }

    /// Mark every slot for `a` with the given reverse count.
    fn fill_window(table: &mut NeighborTable, a: Ipv4Addr, reverse: u8) {
        for i in 0..WINDOW_SLOTS {
            table.update(a, TimeSlot::new(i), reverse, still());
        }
    }

    #[test]
    fn first_contact_creates_record() {
        let mut table = NeighborTable::default();
        assert!(table.update(addr(1), TimeSlot::new(3), 7, still()));
        let record = table.get(addr(1)).unwrap();
        assert_eq!(record.window.bits(), 1 << 3);
        assert_eq!(record.reverse, 7);
    }

    #[test]
    fn repeat_contact_merges_and_overwrites() {
        let mut table = NeighborTable::default();
        let moved = Kinematics::new(Vector3::new(5.0, 5.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        table.update(addr(1), TimeSlot::new(3), 7, still());
        assert!(!table.update(addr(1), TimeSlot::new(5), 2, moved));

        let record = table.get(addr(1)).unwrap();
        assert_eq!(record.window.bits(), (1 << 3) | (1 << 5));
        assert_eq!(record.reverse, 2);
        assert_eq!(record.kinematics, moved);
    }

    #[test]
    fn unknown_neighbor_is_sentinel() {
        let table = NeighborTable::default();
        assert_eq!(table.etx(addr(9)), ETX_MAX);
        assert_eq!(table.hybrid_metric(addr(9), &still()), ETX_MAX);
        assert_eq!(table.link_expiration(addr(9), &still()), None);
        assert_eq!(table.reception_count(addr(9)), 0);
    }

    #[test]
    fn full_window_best_etx() {
        let mut table = NeighborTable::default();
        fill_window(&mut table, addr(1), 10);
        assert_eq!(table.etx(addr(1)), 10_000);
    }

    #[test]
    fn zero_reverse_is_sentinel() {
        let mut table = NeighborTable::default();
        fill_window(&mut table, addr(1), 0);
        assert_eq!(table.etx(addr(1)), ETX_MAX);
    }

    #[test]
    fn advance_wraps_cursor() {
        let mut table = NeighborTable::default();
        for _ in 0..11 {
            table.advance_and_decay();
        }
        assert_eq!(table.cursor(), TimeSlot::new(11));
        table.advance_and_decay();
        assert_eq!(table.cursor(), TimeSlot::new(0));
    }

    #[test]
    fn advance_evicts_next_slot() {
        let mut table = NeighborTable::default();
        fill_window(&mut table, addr(1), 10);
        table.advance_and_decay();
        // cursor = 1, slot 2 evicted
        let bits = table.get(addr(1)).unwrap().window.bits();
        assert_eq!(bits, 0x0FFF & !(1 << 2));
    }

    #[test]
    fn full_rotation_clears_everything() {
        let mut table = NeighborTable::default();
        fill_window(&mut table, addr(1), 10);
        fill_window(&mut table, addr(2), 3);
        for _ in 0..WINDOW_SLOTS {
            table.advance_and_decay();
        }
        for a in [addr(1), addr(2)] {
            assert!(table.get(a).unwrap().window.is_empty());
            assert_eq!(table.etx(a), ETX_MAX);
        }
        // records stay, they are never expired here
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn export_skips_silent_neighbors() {
        let mut table = NeighborTable::default();
        fill_window(&mut table, addr(1), 10);
        // only the cursor slot: unsettled, count 0
        table.update(addr(2), table.cursor(), 10, still());

        let probe = table.build_probe(1, addr(100), 5, still());
        assert_eq!(probe.count_for(addr(1)), Some(10));
        assert_eq!(probe.count_for(addr(2)), None);
        assert_eq!(probe.neighbor_count(), 1);
    }

    #[test]
    fn record_probe_reads_our_entry() {
        let local = addr(100);
        let mut table = NeighborTable::default();

        let mut probe = LinkProbe::new(1, addr(1), 1, still());
        probe.add_neighbor(local, 6);
        probe.add_neighbor(addr(50), 9);
        assert!(table.record_probe(local, &probe));

        let record = table.get(addr(1)).unwrap();
        assert_eq!(record.reverse, 6);
        assert!(record.window.is_set(table.cursor()));
    }

    #[test]
    fn record_probe_without_our_entry_zeroes_reverse() {
        let local = addr(100);
        let mut table = NeighborTable::default();
        table.update(addr(1), TimeSlot::new(4), 9, still());

        let probe = LinkProbe::new(1, addr(1), 2, still());
        table.record_probe(local, &probe);
        assert_eq!(table.get(addr(1)).unwrap().reverse, 0);
    }

    #[test]
    fn own_probe_is_ignored() {
        let local = addr(100);
        let mut table = NeighborTable::default();
        let probe = LinkProbe::new(1, local, 1, still());
        assert!(!table.record_probe(local, &probe));
        assert!(table.is_empty());
    }

    #[test]
    fn refresh_kinematics_only_for_known() {
        let mut table = NeighborTable::default();
        let moved = Kinematics::stationary(Vector3::new(30.0, 0.0, 0.0));
        assert!(!table.refresh_kinematics(addr(1), moved));
        assert!(table.get(addr(1)).is_none());

        table.update(addr(1), TimeSlot::new(2), 4, still());
        assert!(table.refresh_kinematics(addr(1), moved));
        let record = table.get(addr(1)).unwrap();
        assert_eq!(record.kinematics, moved);
        assert_eq!(record.reverse, 4);
        assert_eq!(record.window.bits(), 1 << 2);
    }

    #[test]
    fn hybrid_breaking_link_is_sentinel() {
        let mut table = NeighborTable::default();
        fill_window(&mut table, addr(1), 10);
        // local flies off at 500 u/s from the same spot: LET = 0.5
        let local = Kinematics::new(Vector3::ZERO, Vector3::new(500.0, 0.0, 0.0));
        assert_eq!(table.link_expiration(addr(1), &local), Some(0.5));
        assert_eq!(table.hybrid_metric(addr(1), &local), ETX_MAX);
    }

    #[test]
    fn hybrid_stable_link_keeps_poor_etx() {
        let mut table = NeighborTable::default();
        table.update(addr(1), TimeSlot::new(5), 1, still());
        let poor = table.etx(addr(1));
        assert_eq!(poor, 1_000_000);
        // 0.5 u/s relative drift: LET = 500
        let local = Kinematics::new(Vector3::ZERO, Vector3::new(0.5, 0.0, 0.0));
        assert_eq!(table.link_expiration(addr(1), &local), Some(500.0));
        assert_eq!(table.hybrid_metric(addr(1), &local), poor);
    }

    #[test]
    fn hybrid_static_pair_is_raw_etx() {
        let mut table = NeighborTable::default();
        fill_window(&mut table, addr(1), 8);
        assert_eq!(table.link_expiration(addr(1), &still()), Some(1000.0));
        assert_eq!(table.hybrid_metric(addr(1), &still()), table.etx(addr(1)));
    }

    #[test]
    fn custom_range_changes_let() {
        let metric = HybridMetric::new(ExpiryModel::new(100.0, 1000.0), 1.0);
        let mut table = NeighborTable::new(metric);
        table.update(addr(1), TimeSlot::new(0), 1, still());
        let local = Kinematics::new(Vector3::ZERO, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(table.link_expiration(addr(1), &local), Some(100.0));
    }

    #[test]
    fn reports_cover_every_neighbor() {
        let mut table = NeighborTable::default();
        fill_window(&mut table, addr(2), 10);
        table.update(addr(1), TimeSlot::new(5), 3, still());

        let reports = table.reports(&still());
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].address, addr(1));
        assert_eq!(reports[0].receptions, 1);
        assert_eq!(reports[1].etx, 10_000);
        assert_eq!(reports[1].hybrid, 10_000);
        assert_eq!(reports[1].let_s, 1000.0);
    }
}
