//! One simulated protocol instance: neighbor statistics, routing table and
//! current kinematics.

use std::net::Ipv4Addr;
use std::time::Duration;

use bytes::Bytes;
use letx_core::config::EngineConfig;
use letx_core::kinematics::Kinematics;
use letx_core::metric::is_unreachable;
use letx_core::neighbor::NeighborTable;
use letx_core::rtable::{RouteState, RoutingTable, RoutingTableEntry};
use letx_core::wire::Message;
use tracing::{debug, trace};

/// Route lifetime in probe periods; a neighbor that stops refreshing its
/// route lets it lapse after this many periods.
const ROUTE_LIFETIME_PERIODS: u32 = 3;

/// Outcome of one route refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteRefresh {
    pub stored: usize,
    pub invalidated: usize,
}

#[derive(Debug, Clone)]
pub struct SimNode {
    pub addr: Ipv4Addr,
    pub kinematics: Kinematics,
    pub neighbors: NeighborTable,
    pub routes: RoutingTable,
    probe_id: u8,
    seq: u32,
    route_lifetime: Duration,
}

/// Address of node `index`: `10.0.x.y` with both octets in 1..=254.
pub fn node_address(index: usize) -> Ipv4Addr {
    let hi = (index / 254) as u8;
    let lo = (index % 254) as u8;
    Ipv4Addr::new(10, 0, hi + 1, lo + 1)
}

impl SimNode {
    pub fn new(index: usize, kinematics: Kinematics, config: &EngineConfig) -> Self {
        SimNode {
            addr: node_address(index),
            kinematics,
            neighbors: NeighborTable::from_config(config),
            routes: RoutingTable::new(config.probe_interval * ROUTE_LIFETIME_PERIODS),
            probe_id: 0,
            seq: 0,
            route_lifetime: config.probe_interval * ROUTE_LIFETIME_PERIODS,
        }
    }

    /// Encode this period's link probe.
    pub fn probe(&mut self) -> Bytes {
        self.probe_id = self.probe_id.wrapping_add(1);
        self.seq = self.seq.wrapping_add(1);
        let probe = self
            .neighbors
            .build_probe(self.probe_id, self.addr, self.seq, self.kinematics);
        Message::Lpp(probe).encode().freeze()
    }

    /// Handle one frame received over the link from `from`. Returns whether
    /// it updated the engine.
    ///
    /// RREQ and RREP carry the kinematics of the node that transmitted this
    /// hop, so they refresh `from`, not the message's originator.
    pub fn receive(&mut self, from: Ipv4Addr, mut frame: Bytes) -> bool {
        match Message::decode(&mut frame) {
            Some(Message::Lpp(probe)) => self.neighbors.record_probe(self.addr, &probe),
            Some(Message::Rreq(rreq)) => self.neighbors.refresh_kinematics(from, rreq.kinematics),
            Some(Message::Rrep(rrep)) => self.neighbors.refresh_kinematics(from, rrep.kinematics),
            Some(other) => {
                trace!(node = %self.addr, kind = ?other.message_type(), "ignored");
                false
            }
            None => {
                debug!(node = %self.addr, "undecodable frame dropped");
                false
            }
        }
    }

    /// Rotate the reception windows; once per probe period.
    pub fn rotate(&mut self) {
        self.neighbors.advance_and_decay();
    }

    /// Store a one-hop route to every known neighbor with its hybrid
    /// metric, invalidating routes through neighbors whose metric is the
    /// sentinel.
    pub fn refresh_routes(&mut self, now: Duration) -> RouteRefresh {
        let mut refresh = RouteRefresh::default();
        let neighbors: Vec<Ipv4Addr> = self.neighbors.addresses().collect();

        for neighbor in neighbors {
            let metric = self.neighbors.hybrid_metric(neighbor, &self.kinematics);
            if is_unreachable(metric) {
                let via = self.routes.destinations_with_next_hop(neighbor);
                let live = via
                    .keys()
                    .filter(|dst| self.routes.lookup_valid_route(**dst).is_some())
                    .count();
                if live > 0 {
                    self.routes.invalidate_routes_with_dst(&via, now);
                    refresh.invalidated += live;
                }
                continue;
            }

            let entry = RoutingTableEntry::new(neighbor, neighbor, self.addr)
                .with_hops(1)
                .with_metric(metric)
                .with_lifetime(now, self.route_lifetime);
            if !self.routes.update(entry.clone()) {
                self.routes.add_route(entry);
            }
            refresh.stored += 1;
        }
        refresh
    }

    pub fn valid_routes(&self, now: Duration) -> usize {
        self.routes
            .iter()
            .filter(|e| e.state == RouteState::Valid && !e.is_expired(now))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use letx_core::etx::ETX_MAX;
    use letx_core::kinematics::Vector3;
    use letx_core::wire::{RouteReply, RouteRequest};

    fn node(index: usize, x: f64) -> SimNode {
        SimNode::new(
            index,
            Kinematics::stationary(Vector3::new(x, 0.0, 0.0)),
            &EngineConfig::default(),
        )
    }

    fn exchange(a: &mut SimNode, b: &mut SimNode, periods: usize) {
        for _ in 0..periods {
            let pa = a.probe();
            let pb = b.probe();
            b.receive(a.addr, pa);
            a.receive(b.addr, pb);
            a.rotate();
            b.rotate();
        }
    }

    #[test]
    fn addresses_are_unique_and_skip_zero() {
        assert_eq!(node_address(0), Ipv4Addr::new(10, 0, 1, 1));
        assert_eq!(node_address(253), Ipv4Addr::new(10, 0, 1, 254));
        assert_eq!(node_address(254), Ipv4Addr::new(10, 0, 2, 1));
    }

    #[test]
    fn own_probe_is_ignored() {
        let mut a = node(0, 0.0);
        let frame = a.probe();
        assert!(!a.receive(a.addr, frame));
        assert!(a.neighbors.is_empty());
    }

    #[test]
    fn garbage_frame_is_dropped() {
        let mut a = node(0, 0.0);
        assert!(!a.receive(node_address(7), Bytes::from_static(&[0xEE, 1, 2])));
    }

    #[test]
    fn route_refresh_stores_one_hop_routes() {
        let mut a = node(0, 0.0);
        let mut b = node(1, 50.0);
        exchange(&mut a, &mut b, 15);

        let now = Duration::from_secs(15);
        let refresh = a.refresh_routes(now);
        assert_eq!(refresh, RouteRefresh { stored: 1, invalidated: 0 });
        let route = a.routes.lookup_valid_route(b.addr).unwrap();
        assert_eq!(route.metric, 10_000);
        assert_eq!(route.hops, 1);
        assert_eq!(route.next_hop, b.addr);
        assert_eq!(a.valid_routes(now), 1);
        assert_eq!(a.valid_routes(now + Duration::from_secs(4)), 0);
    }

    #[test]
    fn rreq_kinematics_break_the_route() {
        let mut a = node(0, 0.0);
        let mut b = node(1, 50.0);
        exchange(&mut a, &mut b, 15);
        let now = Duration::from_secs(15);
        a.refresh_routes(now);

        // b reports it is racing away: (250 - 50) / 400 = 0.5
        let rreq = RouteRequest {
            origin: b.addr,
            kinematics: Kinematics::new(Vector3::new(50.0, 0.0, 0.0), Vector3::new(400.0, 0.0, 0.0)),
            ..Default::default()
        };
        assert!(a.receive(b.addr, Message::Rreq(rreq).encode().freeze()));

        let refresh = a.refresh_routes(now);
        assert_eq!(refresh, RouteRefresh { stored: 0, invalidated: 1 });
        let route = a.routes.lookup_route(b.addr).unwrap();
        assert_eq!(route.state, RouteState::Invalid);
        assert_eq!(a.neighbors.hybrid_metric(b.addr, &a.kinematics), ETX_MAX);

        // Already invalid: nothing more to do.
        assert_eq!(a.refresh_routes(now), RouteRefresh::default());
    }

    #[test]
    fn forwarded_rreq_refreshes_the_forwarder() {
        let mut nodes = vec![node(0, 0.0), node(1, 50.0), node(2, 100.0)];
        for _ in 0..15 {
            let frames: Vec<(Ipv4Addr, Bytes)> =
                nodes.iter_mut().map(|n| (n.addr, n.probe())).collect();
            for (from, frame) in &frames {
                for n in nodes.iter_mut().filter(|n| n.addr != *from) {
                    n.receive(*from, frame.clone());
                }
            }
            for n in &mut nodes {
                n.rotate();
            }
        }
        let (b_addr, c_addr) = (nodes[1].addr, nodes[2].addr);
        let a = &mut nodes[0];
        let c_before = *a.neighbors.get(c_addr).unwrap();

        // c's request relayed by b, stamped with b's own snapshot.
        let rreq = RouteRequest {
            origin: c_addr,
            hop_count: 1,
            kinematics: Kinematics::new(Vector3::new(50.0, 0.0, 0.0), Vector3::new(-400.0, 0.0, 0.0)),
            ..Default::default()
        };
        assert!(a.receive(b_addr, Message::Rreq(rreq).encode().freeze()));

        assert_eq!(a.neighbors.get(c_addr).unwrap().kinematics, c_before.kinematics);
        assert_eq!(a.neighbors.hybrid_metric(c_addr, &a.kinematics), 10_000);
        // (50 + 250) / 400 = 0.75
        assert_eq!(a.neighbors.link_expiration(b_addr, &a.kinematics), Some(0.75));
        assert_eq!(a.neighbors.hybrid_metric(b_addr, &a.kinematics), ETX_MAX);
    }

    #[test]
    fn rrep_from_unknown_node_is_ignored() {
        let mut a = node(0, 0.0);
        let rrep = RouteReply::hello(node_address(9), 1, Duration::from_secs(3));
        assert!(!a.receive(node_address(9), Message::Rrep(rrep).encode().freeze()));
    }
}
