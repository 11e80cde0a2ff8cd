//! # Routing Table
//!
//! Reactive-routing table whose entries carry the hybrid metric next to
//! the usual AODV bookkeeping. Route discovery owns the policy (when to
//! add, refresh or invalidate); this module only stores state and applies
//! the requested transitions.
//!
//! Time is simulated time since the protocol instance started and is
//! always passed in by the caller.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::debug;

use crate::etx::ETX_MAX;

/// Route validity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    Valid,
    Invalid,
    InSearch,
}

/// One destination.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingTableEntry {
    pub destination: Ipv4Addr,
    pub next_hop: Ipv4Addr,
    /// Local interface address the route leaves through.
    pub interface: Ipv4Addr,
    pub valid_seq: bool,
    pub seq: u32,
    pub hops: u16,
    pub state: RouteState,
    /// Route requests sent for this destination.
    pub rreq_count: u8,
    pub unidirectional: bool,
    /// Absolute time the blacklist mark lapses.
    pub blacklist_until: Duration,
    /// Hybrid metric computed for this route; lower is better.
    pub metric: u32,
    expires_at: Duration,
    precursors: BTreeSet<Ipv4Addr>,
}

impl RoutingTableEntry {
    /// Valid route to `destination` via `next_hop`, never expiring,
    /// without a known sequence number and with an unreachable metric.
    pub fn new(destination: Ipv4Addr, next_hop: Ipv4Addr, interface: Ipv4Addr) -> Self {
        RoutingTableEntry {
            destination,
            next_hop,
            interface,
            valid_seq: false,
            seq: 0,
            hops: 0,
            state: RouteState::Valid,
            rreq_count: 0,
            unidirectional: false,
            blacklist_until: Duration::ZERO,
            metric: ETX_MAX,
            expires_at: Duration::MAX,
            precursors: BTreeSet::new(),
        }
    }

    /// Set a known sequence number.
    pub fn with_seq(mut self, seq: u32) -> Self {
        self.valid_seq = true;
        self.seq = seq;
        self
    }

    pub fn with_hops(mut self, hops: u16) -> Self {
        self.hops = hops;
        self
    }

    pub fn with_metric(mut self, metric: u32) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_lifetime(mut self, now: Duration, lifetime: Duration) -> Self {
        self.set_lifetime(now, lifetime);
        self
    }

    pub fn set_lifetime(&mut self, now: Duration, lifetime: Duration) {
        self.expires_at = now.saturating_add(lifetime);
    }

    /// Remaining lifetime at `now`; zero once expired.
    pub fn lifetime(&self, now: Duration) -> Duration {
        self.expires_at.saturating_sub(now)
    }

    pub fn is_expired(&self, now: Duration) -> bool {
        self.expires_at <= now
    }

    pub fn insert_precursor(&mut self, id: Ipv4Addr) -> bool {
        self.precursors.insert(id)
    }

    pub fn lookup_precursor(&self, id: Ipv4Addr) -> bool {
        self.precursors.contains(&id)
    }

    pub fn delete_precursor(&mut self, id: Ipv4Addr) -> bool {
        self.precursors.remove(&id)
    }

    pub fn delete_all_precursors(&mut self) {
        self.precursors.clear();
    }

    pub fn is_precursor_list_empty(&self) -> bool {
        self.precursors.is_empty()
    }

    pub fn precursors(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.precursors.iter().copied()
    }

    /// Mark the route invalid and keep it around for `bad_link_lifetime`.
    /// No-op when already invalid.
    pub fn invalidate(&mut self, now: Duration, bad_link_lifetime: Duration) {
        if self.state == RouteState::Invalid {
            return;
        }
        self.state = RouteState::Invalid;
        self.rreq_count = 0;
        self.set_lifetime(now, bad_link_lifetime);
    }
}

/// Destination-keyed routing table of one protocol instance.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    entries: BTreeMap<Ipv4Addr, RoutingTableEntry>,
    bad_link_lifetime: Duration,
}

impl RoutingTable {
    pub fn new(bad_link_lifetime: Duration) -> Self {
        RoutingTable {
            entries: BTreeMap::new(),
            bad_link_lifetime,
        }
    }

    pub fn bad_link_lifetime(&self) -> Duration {
        self.bad_link_lifetime
    }

    pub fn set_bad_link_lifetime(&mut self, lifetime: Duration) {
        self.bad_link_lifetime = lifetime;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoutingTableEntry> {
        self.entries.values()
    }

    /// Insert a new route. Fails if the destination already has one.
    pub fn add_route(&mut self, entry: RoutingTableEntry) -> bool {
        if self.entries.contains_key(&entry.destination) {
            return false;
        }
        self.entries.insert(entry.destination, entry);
        true
    }

    pub fn delete_route(&mut self, dst: Ipv4Addr) -> bool {
        self.entries.remove(&dst).is_some()
    }

    pub fn lookup_route(&self, dst: Ipv4Addr) -> Option<&RoutingTableEntry> {
        self.entries.get(&dst)
    }

    pub fn lookup_route_mut(&mut self, dst: Ipv4Addr) -> Option<&mut RoutingTableEntry> {
        self.entries.get_mut(&dst)
    }

    pub fn lookup_valid_route(&self, dst: Ipv4Addr) -> Option<&RoutingTableEntry> {
        self.entries
            .get(&dst)
            .filter(|e| e.state == RouteState::Valid)
    }

    /// Replace an existing route. Fails if there is none.
    pub fn update(&mut self, entry: RoutingTableEntry) -> bool {
        match self.entries.get_mut(&entry.destination) {
            Some(slot) => {
                *slot = entry;
                true
            }
            None => false,
        }
    }

    pub fn set_entry_state(&mut self, dst: Ipv4Addr, state: RouteState) -> bool {
        match self.entries.get_mut(&dst) {
            Some(entry) => {
                entry.state = state;
                true
            }
            None => false,
        }
    }

    /// Overwrite the metric of the route to `dst`.
    pub fn update_metric(&mut self, dst: Ipv4Addr, metric: u32) -> bool {
        match self.entries.get_mut(&dst) {
            Some(entry) => {
                entry.metric = metric;
                true
            }
            None => false,
        }
    }

    /// Destinations (with their sequence numbers) routed through `next_hop`.
    pub fn destinations_with_next_hop(&self, next_hop: Ipv4Addr) -> BTreeMap<Ipv4Addr, u32> {
        self.entries
            .values()
            .filter(|e| e.next_hop == next_hop)
            .map(|e| (e.destination, e.seq))
            .collect()
    }

    /// Invalidate every valid route whose destination is in `unreachable`.
    pub fn invalidate_routes_with_dst(
        &mut self,
        unreachable: &BTreeMap<Ipv4Addr, u32>,
        now: Duration,
    ) {
        let bad_link_lifetime = self.bad_link_lifetime;
        for (dst, entry) in self.entries.iter_mut() {
            if entry.state == RouteState::Valid && unreachable.contains_key(dst) {
                debug!(destination = %dst, "route invalidated");
                entry.invalidate(now, bad_link_lifetime);
            }
        }
    }

    pub fn delete_all_routes_from_interface(&mut self, interface: Ipv4Addr) {
        self.entries.retain(|_, e| e.interface != interface);
    }

    /// Blacklist the route to `neighbor` as unidirectional until
    /// `now + blacklist_timeout`. Fails if there is no such route.
    pub fn mark_link_as_unidirectional(
        &mut self,
        neighbor: Ipv4Addr,
        blacklist_timeout: Duration,
        now: Duration,
    ) -> bool {
        match self.entries.get_mut(&neighbor) {
            Some(entry) => {
                entry.unidirectional = true;
                entry.blacklist_until = now.saturating_add(blacklist_timeout);
                entry.rreq_count = 0;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
