//! # AODV Wire Format
//!
//! Route-control messages extended with a 32-bit metric and a kinematic
//! snapshot, plus the link probe (LPP) used for ETX measurement.
//! All integers are big-endian. Every message starts with a 1-byte type tag;
//! `encode` writes the tag, `decode` expects it already consumed
//! (see [`Message::decode`]).
//!
//! ## Link Probe (type 5), 33 + 5·n bytes after the tag
//!
//! ```text
//! | id u8 | origin u32 | origin seq u32 | kinematics (24) |
//! | neighbor u32 | count u8 | ...   (n entries, n implied by length)
//! ```
//!
//! ## RREQ (type 1), 51 bytes after the tag
//!
//! ```text
//! |J R G D U 0 0 0| reserved | hop count |
//! | request id u32 | dst u32 | dst seq u32 | origin u32 | origin seq u32 |
//! | etx u32 | kinematics (24) |
//! ```
//!
//! ## RREP (type 2), 47 bytes after the tag
//!
//! ```text
//! |R A 0 0 0 0 0 0| 0 0 0 prefix(5) | hop count |
//! | dst u32 | dst seq u32 | origin u32 | lifetime ms u32 | etx u32 | kinematics (24) |
//! ```

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use bytes::{Buf, BufMut, BytesMut};

use crate::kinematics::{Kinematics, KINEMATICS_WIRE_LEN};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Most neighbor entries a probe can carry.
pub const MAX_PROBE_NEIGHBORS: usize = u8::MAX as usize;

/// Most unreachable destinations a RERR can carry.
pub const MAX_RERR_DESTINATIONS: usize = u8::MAX as usize;

const PROBE_ENTRY_LEN: usize = 5;

fn put_addr(buf: &mut BytesMut, addr: Ipv4Addr) {
    buf.put_u32(u32::from(addr));
}

fn get_addr(buf: &mut impl Buf) -> Ipv4Addr {
    Ipv4Addr::from(buf.get_u32())
}

// ─── Message Type ────────────────────────────────────────────────────────────

/// Leading type tag of every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Rreq = 1,
    Rrep = 2,
    Rerr = 3,
    RrepAck = 4,
    Lpp = 5,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(MessageType::Rreq),
            2 => Some(MessageType::Rrep),
            3 => Some(MessageType::Rerr),
            4 => Some(MessageType::RrepAck),
            5 => Some(MessageType::Lpp),
            _ => None,
        }
    }
}

// ─── Link Probe ──────────────────────────────────────────────────────────────

/// Periodic link probe: identity, sequence, kinematics and the reception
/// counts the sender observed from each of its neighbors.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkProbe {
    pub id: u8,
    pub origin: Ipv4Addr,
    pub origin_seq: u32,
    pub kinematics: Kinematics,
    neighbors: BTreeMap<Ipv4Addr, u8>,
}

impl LinkProbe {
    pub const BASE_LEN: usize = 1 + 4 + 4 + KINEMATICS_WIRE_LEN;

    pub fn new(id: u8, origin: Ipv4Addr, origin_seq: u32, kinematics: Kinematics) -> Self {
        LinkProbe {
            id,
            origin,
            origin_seq,
            kinematics,
            neighbors: BTreeMap::new(),
        }
    }

    /// Add a (neighbor, reception count) entry. Fails on a duplicate
    /// address or when the list is full.
    pub fn add_neighbor(&mut self, neighbor: Ipv4Addr, count: u8) -> bool {
        if self.neighbors.len() >= MAX_PROBE_NEIGHBORS || self.neighbors.contains_key(&neighbor) {
            return false;
        }
        self.neighbors.insert(neighbor, count);
        true
    }

    /// Remove and return the lowest-addressed entry.
    pub fn pop_neighbor(&mut self) -> Option<(Ipv4Addr, u8)> {
        self.neighbors.pop_first()
    }

    pub fn clear_neighbors(&mut self) {
        self.neighbors.clear();
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Count the sender reported for `addr`, if listed.
    pub fn count_for(&self, addr: Ipv4Addr) -> Option<u8> {
        self.neighbors.get(&addr).copied()
    }

    pub fn neighbors(&self) -> impl Iterator<Item = (Ipv4Addr, u8)> + '_ {
        self.neighbors.iter().map(|(&a, &c)| (a, c))
    }

    pub fn encoded_len(&self) -> usize {
        1 + Self::BASE_LEN + PROBE_ENTRY_LEN * self.neighbors.len()
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(MessageType::Lpp as u8);
        buf.put_u8(self.id);
        put_addr(buf, self.origin);
        buf.put_u32(self.origin_seq);
        self.kinematics.encode(buf);
        for (&addr, &count) in &self.neighbors {
            put_addr(buf, addr);
            buf.put_u8(count);
        }
    }

    /// Decode a probe body. Consumes the rest of `buf`.
    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < Self::BASE_LEN {
            return None;
        }
        let id = buf.get_u8();
        let origin = get_addr(buf);
        let origin_seq = buf.get_u32();
        let kinematics = Kinematics::decode(buf)?;

        if buf.remaining() % PROBE_ENTRY_LEN != 0 {
            return None;
        }
        let entries = buf.remaining() / PROBE_ENTRY_LEN;
        if entries > MAX_PROBE_NEIGHBORS {
            return None;
        }
        let mut probe = LinkProbe::new(id, origin, origin_seq, kinematics);
        for _ in 0..entries {
            let addr = get_addr(buf);
            let count = buf.get_u8();
            if !probe.add_neighbor(addr, count) {
                return None;
            }
        }
        Some(probe)
    }
}

// ─── Route Request ───────────────────────────────────────────────────────────

/// Route request carrying the accumulated metric and the sender's kinematics.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub join: bool,
    pub repair: bool,
    pub gratuitous_rrep: bool,
    pub destination_only: bool,
    pub unknown_seqno: bool,
    pub hop_count: u8,
    pub request_id: u32,
    pub dst: Ipv4Addr,
    pub dst_seq: u32,
    pub origin: Ipv4Addr,
    pub origin_seq: u32,
    pub etx: u32,
    pub kinematics: Kinematics,
}

impl Default for RouteRequest {
    fn default() -> Self {
        RouteRequest {
            join: false,
            repair: false,
            gratuitous_rrep: false,
            destination_only: false,
            unknown_seqno: false,
            hop_count: 0,
            request_id: 0,
            dst: Ipv4Addr::UNSPECIFIED,
            dst_seq: 0,
            origin: Ipv4Addr::UNSPECIFIED,
            origin_seq: 0,
            etx: 0,
            kinematics: Kinematics::default(),
        }
    }
}

impl RouteRequest {
    pub const ENCODED_LEN: usize = 3 + 4 * 6 + KINEMATICS_WIRE_LEN;

    const FLAG_JOIN: u8 = 0x80;
    const FLAG_REPAIR: u8 = 0x40;
    const FLAG_GRATUITOUS: u8 = 0x20;
    const FLAG_DEST_ONLY: u8 = 0x10;
    const FLAG_UNKNOWN_SEQ: u8 = 0x08;

    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.join {
            flags |= Self::FLAG_JOIN;
        }
        if self.repair {
            flags |= Self::FLAG_REPAIR;
        }
        if self.gratuitous_rrep {
            flags |= Self::FLAG_GRATUITOUS;
        }
        if self.destination_only {
            flags |= Self::FLAG_DEST_ONLY;
        }
        if self.unknown_seqno {
            flags |= Self::FLAG_UNKNOWN_SEQ;
        }
        flags
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(MessageType::Rreq as u8);
        buf.put_u8(self.flags());
        buf.put_u8(0); // reserved
        buf.put_u8(self.hop_count);
        buf.put_u32(self.request_id);
        put_addr(buf, self.dst);
        buf.put_u32(self.dst_seq);
        put_addr(buf, self.origin);
        buf.put_u32(self.origin_seq);
        buf.put_u32(self.etx);
        self.kinematics.encode(buf);
    }

    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < Self::ENCODED_LEN {
            return None;
        }
        let flags = buf.get_u8();
        let _reserved = buf.get_u8();
        Some(RouteRequest {
            join: flags & Self::FLAG_JOIN != 0,
            repair: flags & Self::FLAG_REPAIR != 0,
            gratuitous_rrep: flags & Self::FLAG_GRATUITOUS != 0,
            destination_only: flags & Self::FLAG_DEST_ONLY != 0,
            unknown_seqno: flags & Self::FLAG_UNKNOWN_SEQ != 0,
            hop_count: buf.get_u8(),
            request_id: buf.get_u32(),
            dst: get_addr(buf),
            dst_seq: buf.get_u32(),
            origin: get_addr(buf),
            origin_seq: buf.get_u32(),
            etx: buf.get_u32(),
            kinematics: Kinematics::decode(buf)?,
        })
    }
}

// ─── Route Reply ─────────────────────────────────────────────────────────────

/// Route reply carrying the path metric and the sender's kinematics.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteReply {
    pub repair: bool,
    pub ack_required: bool,
    /// Only the low 5 bits are carried.
    pub prefix_size: u8,
    pub hop_count: u8,
    pub dst: Ipv4Addr,
    pub dst_seq: u32,
    pub origin: Ipv4Addr,
    /// Millisecond resolution on the wire.
    pub lifetime: Duration,
    pub etx: u32,
    pub kinematics: Kinematics,
}

impl Default for RouteReply {
    fn default() -> Self {
        RouteReply {
            repair: false,
            ack_required: false,
            prefix_size: 0,
            hop_count: 0,
            dst: Ipv4Addr::UNSPECIFIED,
            dst_seq: 0,
            origin: Ipv4Addr::UNSPECIFIED,
            lifetime: Duration::ZERO,
            etx: 0,
            kinematics: Kinematics::default(),
        }
    }
}

impl RouteReply {
    pub const ENCODED_LEN: usize = 3 + 4 * 5 + KINEMATICS_WIRE_LEN;

    const FLAG_REPAIR: u8 = 0x80;
    const FLAG_ACK_REQUIRED: u8 = 0x40;
    const PREFIX_MASK: u8 = 0x1F;

    /// Hello message: a reply about `src` itself with zero hops.
    pub fn hello(src: Ipv4Addr, src_seq: u32, lifetime: Duration) -> Self {
        RouteReply {
            dst: src,
            dst_seq: src_seq,
            origin: src,
            lifetime,
            ..Default::default()
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut flags = 0;
        if self.repair {
            flags |= Self::FLAG_REPAIR;
        }
        if self.ack_required {
            flags |= Self::FLAG_ACK_REQUIRED;
        }
        let lifetime_ms = self.lifetime.as_millis().min(u32::MAX as u128) as u32;

        buf.put_u8(MessageType::Rrep as u8);
        buf.put_u8(flags);
        buf.put_u8(self.prefix_size & Self::PREFIX_MASK);
        buf.put_u8(self.hop_count);
        put_addr(buf, self.dst);
        buf.put_u32(self.dst_seq);
        put_addr(buf, self.origin);
        buf.put_u32(lifetime_ms);
        buf.put_u32(self.etx);
        self.kinematics.encode(buf);
    }

    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < Self::ENCODED_LEN {
            return None;
        }
        let flags = buf.get_u8();
        Some(RouteReply {
            repair: flags & Self::FLAG_REPAIR != 0,
            ack_required: flags & Self::FLAG_ACK_REQUIRED != 0,
            prefix_size: buf.get_u8() & Self::PREFIX_MASK,
            hop_count: buf.get_u8(),
            dst: get_addr(buf),
            dst_seq: buf.get_u32(),
            origin: get_addr(buf),
            lifetime: Duration::from_millis(buf.get_u32() as u64),
            etx: buf.get_u32(),
            kinematics: Kinematics::decode(buf)?,
        })
    }
}

// ─── Route Reply ACK ─────────────────────────────────────────────────────────

/// RREP acknowledgement; a single reserved byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteReplyAck;

impl RouteReplyAck {
    pub const ENCODED_LEN: usize = 1;

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(MessageType::RrepAck as u8);
        buf.put_u8(0);
    }

    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < Self::ENCODED_LEN {
            return None;
        }
        buf.advance(1);
        Some(RouteReplyAck)
    }
}

// ─── Route Error ─────────────────────────────────────────────────────────────

/// Route error listing destinations that became unreachable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteError {
    pub no_delete: bool,
    unreachable: BTreeMap<Ipv4Addr, u32>,
}

impl RouteError {
    const FLAG_NO_DELETE: u8 = 0x80;

    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unreachable destination. Fails on a duplicate destination or
    /// when the list is full.
    pub fn add_unreachable(&mut self, dst: Ipv4Addr, seq: u32) -> bool {
        if self.unreachable.len() >= MAX_RERR_DESTINATIONS || self.unreachable.contains_key(&dst) {
            return false;
        }
        self.unreachable.insert(dst, seq);
        true
    }

    /// Remove and return the lowest-addressed destination.
    pub fn pop_unreachable(&mut self) -> Option<(Ipv4Addr, u32)> {
        self.unreachable.pop_first()
    }

    pub fn clear(&mut self) {
        self.unreachable.clear();
        self.no_delete = false;
    }

    pub fn dest_count(&self) -> u8 {
        self.unreachable.len() as u8
    }

    pub fn unreachable(&self) -> impl Iterator<Item = (Ipv4Addr, u32)> + '_ {
        self.unreachable.iter().map(|(&a, &s)| (a, s))
    }

    pub fn encoded_len(&self) -> usize {
        1 + 3 + 8 * self.unreachable.len()
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(MessageType::Rerr as u8);
        buf.put_u8(if self.no_delete { Self::FLAG_NO_DELETE } else { 0 });
        buf.put_u8(0); // reserved
        buf.put_u8(self.dest_count());
        for (&dst, &seq) in &self.unreachable {
            put_addr(buf, dst);
            buf.put_u32(seq);
        }
    }

    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < 3 {
            return None;
        }
        let flags = buf.get_u8();
        let _reserved = buf.get_u8();
        let count = buf.get_u8() as usize;
        if buf.remaining() < count * 8 {
            return None;
        }
        let mut rerr = RouteError {
            no_delete: flags & Self::FLAG_NO_DELETE != 0,
            unreachable: BTreeMap::new(),
        };
        for _ in 0..count {
            let dst = get_addr(buf);
            let seq = buf.get_u32();
            if !rerr.add_unreachable(dst, seq) {
                return None;
            }
        }
        Some(rerr)
    }
}

// ─── Decoded Message ─────────────────────────────────────────────────────────

/// A decoded message with its typed body.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Rreq(RouteRequest),
    Rrep(RouteReply),
    Rerr(RouteError),
    RrepAck(RouteReplyAck),
    Lpp(LinkProbe),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Rreq(_) => MessageType::Rreq,
            Message::Rrep(_) => MessageType::Rrep,
            Message::Rerr(_) => MessageType::Rerr,
            Message::RrepAck(_) => MessageType::RrepAck,
            Message::Lpp(_) => MessageType::Lpp,
        }
    }

    /// Serialize with the leading type tag.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        match self {
            Message::Rreq(m) => m.encode(&mut buf),
            Message::Rrep(m) => m.encode(&mut buf),
            Message::Rerr(m) => m.encode(&mut buf),
            Message::RrepAck(m) => m.encode(&mut buf),
            Message::Lpp(m) => m.encode(&mut buf),
        }
        buf
    }

    /// Decode a tagged message. The first byte is the type.
    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if !buf.has_remaining() {
            return None;
        }
        let tag = buf.get_u8();
        let Some(ty) = MessageType::from_byte(tag) else {
            tracing::trace!(tag, "unknown message type");
            return None;
        };
        let msg = match ty {
            MessageType::Rreq => RouteRequest::decode(buf).map(Message::Rreq),
            MessageType::Rrep => RouteReply::decode(buf).map(Message::Rrep),
            MessageType::Rerr => RouteError::decode(buf).map(Message::Rerr),
            MessageType::RrepAck => RouteReplyAck::decode(buf).map(Message::RrepAck),
            MessageType::Lpp => LinkProbe::decode(buf).map(Message::Lpp),
        };
        if msg.is_none() {
            tracing::trace!(?ty, "malformed message body");
        }
        msg
    }
}
