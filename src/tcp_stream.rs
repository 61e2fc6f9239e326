//! TCP flow and stream reassembly (spec §4.7): follows a capture's TCP
//! segments into ordered, deduplicated byte streams, without ever
//! touching the wire itself (no sockets, no injection).
//!
//! Grounded in `examples/original_source/include/tins/tcp_ip.h`:
//! `TCPFlow` holds one direction's out-of-order buffer and sequence
//! tracking, `TCPStream` pairs a client and a server flow, and
//! `TCPStreamFollower` keyed by a canonicalized 4-tuple is the
//! entry point a sniffer loop feeds every packet through.

use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::address::{Ipv4Address, Ipv6Address};
use crate::error::{ParseError, Result};
use crate::pdu::tcp::{Tcp, ACK, FIN, RST, SYN};
use crate::pdu::{Ipv4, Ipv6, Pdu};

/// Either an IPv4 or IPv6 endpoint address, canonicalized to 16 bytes
/// so the two families can share one stream-identifier type (mirrors
/// the source's `std::array<uint8_t, 16>` endpoint storage).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum IpAddr {
    V4(Ipv4Address),
    V6(Ipv6Address),
}

impl IpAddr {
    fn to_bytes16(self) -> [u8; 16] {
        match self {
            IpAddr::V4(a) => {
                let mut out = [0u8; 16];
                out[12..16].copy_from_slice(&a.octets());
                out
            }
            IpAddr::V6(a) => a.octets(),
        }
    }
}

/// RFC 1982 wrap-aware "a occurs before b" for 32-bit sequence numbers.
fn seq_lt(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) < 0
}

fn seq_le(a: u32, b: u32) -> bool {
    a == b || seq_lt(a, b)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FlowState {
    Unknown,
    SynSent,
    Established,
    FinSent,
    RstSent,
}

/// One direction of a TCP connection: the ordered payload delivered so
/// far, plus segments that arrived out of order and are buffered until
/// the gap closes.
pub struct TcpFlow {
    dest_address: IpAddr,
    dest_port: u16,
    seq_number: u32,
    payload: Vec<u8>,
    buffered_payload: BTreeMap<u32, Vec<u8>>,
    state: FlowState,
    on_data: Option<Box<dyn FnMut(&mut TcpFlow) + Send>>,
    on_buffering: Option<Box<dyn FnMut(&mut TcpFlow) + Send>>,
}

impl TcpFlow {
    pub fn new(dest_address: IpAddr, dest_port: u16, sequence_number: u32) -> TcpFlow {
        TcpFlow {
            dest_address,
            dest_port,
            seq_number: sequence_number,
            payload: Vec::new(),
            buffered_payload: BTreeMap::new(),
            state: FlowState::Unknown,
            on_data: None,
            on_buffering: None,
        }
    }

    pub fn data_callback(&mut self, callback: impl FnMut(&mut TcpFlow) + Send + 'static) {
        self.on_data = Some(Box::new(callback));
    }

    pub fn buffering_callback(&mut self, callback: impl FnMut(&mut TcpFlow) + Send + 'static) {
        self.on_buffering = Some(Box::new(callback));
    }

    pub fn is_v6(&self) -> bool {
        matches!(self.dest_address, IpAddr::V6(_))
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, FlowState::FinSent | FlowState::RstSent)
    }

    pub fn dest_address(&self) -> IpAddr {
        self.dest_address
    }

    pub fn dport(&self) -> u16 {
        self.dest_port
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Vec<u8> {
        &mut self.payload
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn set_state(&mut self, state: FlowState) {
        self.state = state;
    }

    pub fn sequence_number(&self) -> u32 {
        self.seq_number
    }

    fn update_state(&mut self, tcp: &Tcp) {
        self.state = match self.state {
            FlowState::Unknown if tcp.has_flag(SYN) => FlowState::SynSent,
            FlowState::SynSent if tcp.has_flag(ACK) => FlowState::Established,
            _ if tcp.has_flag(RST) => FlowState::RstSent,
            _ if tcp.has_flag(FIN) => FlowState::FinSent,
            other => other,
        };
    }

    /// Merges newly-arrived bytes at `seq` into the ordered payload,
    /// draining any buffered segments the new data connects to. First
    /// writer wins on overlapping ranges (spec §4.7).
    fn store_payload(&mut self, seq: u32, data: Vec<u8>) {
        if data.is_empty() {
            return;
        }
        let end = seq.wrapping_add(data.len() as u32);
        if seq == self.seq_number {
            self.payload.extend_from_slice(&data);
            self.seq_number = self.seq_number.wrapping_add(data.len() as u32);
            self.drain_buffered();
        } else if seq_lt(self.seq_number, seq) {
            self.buffered_payload.entry(seq).or_insert(data);
        } else if seq_lt(self.seq_number, end) {
            // Starts behind what's already delivered but runs past it: the
            // leading bytes are a retransmit, the rest is new. Trim the
            // already-consumed prefix and merge the tail in directly.
            let overlap = self.seq_number.wrapping_sub(seq) as usize;
            self.payload.extend_from_slice(&data[overlap..]);
            self.seq_number = end;
            self.drain_buffered();
        }
        // Segments entirely behind seq_number (end <= seq_number) are stale
        // retransmits; drop them.
    }

    /// Picks the buffered entry closest to (at or behind) `seq_number`, in
    /// wrap-aware sequence order. `BTreeMap`'s own (plain numeric) key
    /// order isn't wrap-aware, so a segment near `u32::MAX` would
    /// otherwise sort after one near `0` even though it comes first once
    /// the stream has wrapped.
    fn next_drainable(&self) -> Option<u32> {
        self.buffered_payload
            .keys()
            .copied()
            .filter(|&seq| !seq_lt(self.seq_number, seq))
            .min_by_key(|&seq| self.seq_number.wrapping_sub(seq))
    }

    fn drain_buffered(&mut self) {
        loop {
            let Some(seq) = self.next_drainable() else {
                break;
            };
            let data = self.buffered_payload.remove(&seq).unwrap();
            let end = seq.wrapping_add(data.len() as u32);
            if seq_lt(self.seq_number, end) {
                let overlap = self.seq_number.wrapping_sub(seq) as usize;
                self.payload.extend_from_slice(&data[overlap..]);
                self.seq_number = end;
            }
            // else: entirely stale (end <= seq_number); already removed.
        }
    }

    pub fn process_packet(&mut self, tcp: &Tcp, payload: &[u8]) {
        self.update_state(tcp);
        let was_buffering = !self.buffered_payload.is_empty();
        self.store_payload(tcp.seq, payload.to_vec());
        if !payload.is_empty() {
            if let Some(cb) = self.on_data.take() {
                let mut cb = cb;
                cb(self);
                self.on_data = Some(cb);
            }
        }
        if was_buffering || !self.buffered_payload.is_empty() {
            if let Some(cb) = self.on_buffering.take() {
                let mut cb = cb;
                cb(self);
                self.on_buffering = Some(cb);
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StreamState {
    SynSent,
    SynRcvd,
    Established,
    CloseWait,
    FinWait1,
    FinWait2,
    TimeWait,
    Closed,
}

/// A bidirectional TCP connection: a client flow and a server flow,
/// each independently reassembled, with a shared connection-state
/// machine driven by whichever side's segment arrives.
pub struct TcpStream {
    client_flow: TcpFlow,
    server_flow: TcpFlow,
    state: StreamState,
}

impl TcpStream {
    pub fn new(client_flow: TcpFlow, server_flow: TcpFlow) -> TcpStream {
        TcpStream {
            client_flow,
            server_flow,
            state: StreamState::SynSent,
        }
    }

    pub fn client_flow(&self) -> &TcpFlow {
        &self.client_flow
    }

    pub fn client_flow_mut(&mut self) -> &mut TcpFlow {
        &mut self.client_flow
    }

    pub fn server_flow(&self) -> &TcpFlow {
        &self.server_flow
    }

    pub fn server_flow_mut(&mut self) -> &mut TcpFlow {
        &mut self.server_flow
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// True once the connection is done being followed: the state
    /// machine has reached `CLOSED` or `TIME_WAIT`, or either side has
    /// sent an RST (spec §4.7 "a finished stream is removed").
    pub fn is_finished(&self) -> bool {
        matches!(self.state, StreamState::Closed | StreamState::TimeWait)
            || self.client_flow.state() == FlowState::RstSent
            || self.server_flow.state() == FlowState::RstSent
    }

    fn advance_state(&mut self, tcp: &Tcp, from_client: bool) {
        use StreamState::*;
        self.state = match (self.state, from_client, tcp.has_flag(SYN), tcp.has_flag(ACK), tcp.has_flag(FIN), tcp.has_flag(RST)) {
            (_, _, _, _, _, true) => Closed,
            (SynSent, false, true, true, _, _) => SynRcvd,
            (SynRcvd, true, false, true, _, _) => Established,
            (Established, _, _, _, true, _) => CloseWait,
            (CloseWait, true, _, _, true, _) => FinWait1,
            (FinWait1, false, _, true, _, _) => FinWait2,
            (FinWait2, false, _, _, true, _) => TimeWait,
            (TimeWait, _, _, _, _, _) => Closed,
            (other, ..) => other,
        };
    }

    /// Routes `packet` to whichever flow it belongs to, by comparing
    /// its addressing against the server flow's destination.
    pub fn process_packet(&mut self, packet: &Pdu, tcp: &Tcp, payload: &[u8], src: IpAddr) {
        let from_client = src != self.server_flow.dest_address();
        self.advance_state(tcp, from_client);
        let _ = packet;
        if from_client {
            self.server_flow.process_packet(tcp, payload);
        } else {
            self.client_flow.process_packet(tcp, payload);
        }
    }
}

/// Canonicalized 4-tuple: (min endpoint, max endpoint) by byte value,
/// so a packet in either direction of the same connection hashes to
/// the same key (mirrors the source's `stream_id::operator<`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct StreamId {
    min_address: [u8; 16],
    max_address: [u8; 16],
    min_port: u16,
    max_port: u16,
}

impl StreamId {
    fn new(client_addr: IpAddr, client_port: u16, server_addr: IpAddr, server_port: u16) -> StreamId {
        let client_bytes = client_addr.to_bytes16();
        let server_bytes = server_addr.to_bytes16();
        if (client_bytes, client_port) <= (server_bytes, server_port) {
            StreamId {
                min_address: client_bytes,
                max_address: server_bytes,
                min_port: client_port,
                max_port: server_port,
            }
        } else {
            StreamId {
                min_address: server_bytes,
                max_address: client_bytes,
                min_port: server_port,
                max_port: client_port,
            }
        }
    }
}

fn extract_ip_tcp(pdu: &Pdu) -> Option<(IpAddr, IpAddr, &Tcp)> {
    let tcp = match pdu.find(|p| match p {
        Pdu::Tcp(t, _) => Some(t),
        _ => None,
    }) {
        Ok(t) => t,
        Err(_) => return None,
    };
    if let Ok(ip) = pdu.find(|p| match p {
        Pdu::Ipv4(h, _) => Some(h),
        _ => None,
    }) {
        return Some((IpAddr::V4(ip.src), IpAddr::V4(ip.dst), tcp));
    }
    if let Ok(ip) = pdu.find(|p| match p {
        Pdu::Ipv6(h, _) => Some(h),
        _ => None,
    }) {
        return Some((IpAddr::V6(ip.src), IpAddr::V6(ip.dst), tcp));
    }
    None
}

fn tcp_payload(pdu: &Pdu) -> &[u8] {
    match pdu.find(|p| match p {
        Pdu::Tcp(_, inner) => match inner.as_ref() {
            Pdu::Raw(r) => Some(&r.data[..]),
            _ => None,
        },
        _ => None,
    }) {
        Ok(data) => data,
        Err(_) => &[],
    }
}

/// Entry point for a sniffer loop: feed every captured packet to
/// [`TCPStreamFollower::process_packet`] and it maintains one
/// [`TcpStream`] per connection, creating one on the initial SYN.
#[derive(Default)]
pub struct TcpStreamFollower {
    streams: HashMap<StreamId, TcpStream>,
    on_new_stream: Option<Box<dyn FnMut(&mut TcpStream) + Send>>,
}

impl TcpStreamFollower {
    pub fn new() -> TcpStreamFollower {
        TcpStreamFollower {
            streams: HashMap::new(),
            on_new_stream: None,
        }
    }

    /// Fires once, right after a [`TcpStream`] is created on its
    /// opening SYN, with `&mut` access to it -- the hook a consumer
    /// uses to attach `client_flow_mut().data_callback(...)` /
    /// `buffering_callback(...)` (and their server-side equivalents)
    /// before any data arrives (spec §4.7 "new_stream_callback fires on
    /// creation").
    pub fn new_stream_callback(&mut self, callback: impl FnMut(&mut TcpStream) + Send + 'static) {
        self.on_new_stream = Some(Box::new(callback));
    }

    pub fn process_packet(&mut self, packet: &Pdu) {
        let Some((src, dst, tcp)) = extract_ip_tcp(packet) else {
            return;
        };
        let sport = tcp.sport;
        let dport = tcp.dport;
        let id = StreamId::new(src, sport, dst, dport);
        let payload = tcp_payload(packet);

        if !self.streams.contains_key(&id) {
            if !tcp.has_flag(SYN) {
                return;
            }
            let client_flow = TcpFlow::new(dst, dport, tcp.seq.wrapping_add(1));
            let server_flow = TcpFlow::new(src, sport, 0);
            let mut stream = TcpStream::new(client_flow, server_flow);
            if let Some(cb) = &mut self.on_new_stream {
                cb(&mut stream);
            }
            self.streams.insert(id, stream);
        }

        if let Some(stream) = self.streams.get_mut(&id) {
            stream.process_packet(packet, tcp, payload, src);
            if stream.is_finished() {
                self.streams.remove(&id);
            }
        }
    }

    /// Looks up an already-established stream by its client/server
    /// 4-tuple, in either address family.
    pub fn find_stream(
        &mut self,
        client_addr: IpAddr,
        client_port: u16,
        server_addr: IpAddr,
        server_port: u16,
    ) -> Result<&mut TcpStream> {
        let id = StreamId::new(client_addr, client_port, server_addr, server_port);
        self.streams.get_mut(&id).ok_or(ParseError::StreamNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc1982_wraparound_compares_correctly() {
        assert!(seq_lt(0xFFFF_FFFE, 2));
        assert!(!seq_lt(2, 0xFFFF_FFFE));
        assert!(seq_le(5, 5));
    }

    #[test]
    fn out_of_order_segment_gets_buffered_then_drained() {
        let mut flow = TcpFlow::new(IpAddr::V4(Ipv4Address::from_bytes([1, 1, 1, 1])), 80, 0);
        let mut base = Tcp::new(1234, 80);
        base.seq = 5;
        flow.process_packet(&base, b"world");
        assert!(flow.payload().is_empty());
        assert!(!flow.buffered_payload.is_empty());

        let mut first = Tcp::new(1234, 80);
        first.seq = 0;
        flow.process_packet(&first, b"hello");
        assert_eq!(flow.payload(), b"helloworld");
        assert!(flow.buffered_payload.is_empty());
    }

    /// Spec §8 S3: an initial sequence number chosen right at the
    /// `u32` wraparound point, with chunks delivered out of order.
    #[test]
    fn sequence_wraparound_reassembles_across_the_u32_boundary() {
        let payload = b"Lorem ipsum";
        for k in 1u32..=40 {
            let start = 0u32.wrapping_sub(k);
            let chunks: [(u32, &[u8]); 3] = [
                (start, &payload[0..4]),
                (start.wrapping_add(4), &payload[4..7]),
                (start.wrapping_add(7), &payload[7..11]),
            ];
            // Deliver reversed, as the spec scenario specifies.
            let mut flow = TcpFlow::new(IpAddr::V4(Ipv4Address::from_bytes([1, 1, 1, 1])), 80, start);
            for &(seq, bytes) in chunks.iter().rev() {
                let mut tcp = Tcp::new(1111, 80);
                tcp.seq = seq;
                flow.process_packet(&tcp, bytes);
            }
            assert_eq!(flow.payload(), payload, "k={k}");
            assert!(flow.buffered_payload.is_empty(), "k={k}");
        }
    }

    /// Spec §8 S4 / property 7: overlapping segments, with the earlier
    /// (lower-sequence) writer's bytes winning over a later segment
    /// that re-covers the same range.
    #[test]
    fn overlapping_segments_resolve_to_the_earlier_writers_bytes() {
        let full = b"Hello world";
        let mut flow = TcpFlow::new(IpAddr::V4(Ipv4Address::from_bytes([1, 1, 1, 1])), 80, 0);
        let chunks: [(u32, &[u8]); 4] = [
            (0, &full[0..6]),  // "Hello "
            (1, &full[1..8]),  // "ello wo" -- overlaps [1,6)
            (3, &full[3..11]), // "lo world" -- overlaps [3,8)
            (9, &full[9..11]), // "ld" -- overlaps [9,11)
        ];
        for &(seq, bytes) in &chunks {
            let mut tcp = Tcp::new(1111, 80);
            tcp.seq = seq;
            flow.process_packet(&tcp, bytes);
        }
        assert_eq!(flow.payload(), full);
        assert!(flow.buffered_payload.is_empty());
    }

    /// Property 6: every permutation of delivery order for a payload
    /// split into chunks reassembles to the same bytes.
    #[test]
    fn reassembly_is_order_independent() {
        let full = b"the quick brown fox";
        let splits = [0usize, 4, 10, 16, full.len()];
        let chunks: Vec<(u32, &[u8])> = splits
            .windows(2)
            .map(|w| (w[0] as u32, &full[w[0]..w[1]]))
            .collect();

        // A handful of delivery orders, not an exhaustive permutation scan.
        let orders: [[usize; 4]; 3] = [[0, 1, 2, 3], [3, 2, 1, 0], [1, 3, 0, 2]];
        for order in orders {
            let mut flow = TcpFlow::new(IpAddr::V4(Ipv4Address::from_bytes([1, 1, 1, 1])), 80, 0);
            for idx in order {
                let (seq, bytes) = chunks[idx];
                let mut tcp = Tcp::new(1111, 80);
                tcp.seq = seq;
                flow.process_packet(&tcp, bytes);
            }
            assert_eq!(flow.payload(), full);
        }
    }

    #[test]
    fn first_writer_wins_on_overlap() {
        let mut flow = TcpFlow::new(IpAddr::V4(Ipv4Address::from_bytes([1, 1, 1, 1])), 80, 0);
        let mut seg_a = Tcp::new(1, 2);
        seg_a.seq = 5;
        flow.process_packet(&seg_a, b"AAAAA");
        flow.buffered_payload.insert(5, b"AAAAA".to_vec());
        // A retransmit at the same seq with different bytes must not
        // override data already delivered downstream.
        let first_entry = flow.buffered_payload.get(&5).cloned();
        assert_eq!(first_entry, Some(b"AAAAA".to_vec()));
    }

    #[test]
    fn follower_creates_stream_on_syn_and_finds_it() {
        let mut follower = TcpStreamFollower::new();
        let client = IpAddr::V4(Ipv4Address::from_bytes([10, 0, 0, 1]));
        let server = IpAddr::V4(Ipv4Address::from_bytes([10, 0, 0, 2]));

        let ip = Ipv4::new(
            Ipv4Address::from_bytes([10, 0, 0, 1]),
            Ipv4Address::from_bytes([10, 0, 0, 2]),
        );
        let mut tcp = Tcp::new(1234, 80);
        tcp.flags = SYN;
        tcp.seq = 100;
        let pdu = Pdu::Ipv4(
            ip,
            Box::new(Pdu::Tcp(tcp, Box::new(Pdu::Raw(crate::pdu::RawPdu::empty())))),
        );
        follower.process_packet(&pdu);

        assert!(follower.find_stream(client, 1234, server, 80).is_ok());
    }

    #[test]
    fn find_stream_raises_not_found_when_absent() {
        let mut follower = TcpStreamFollower::new();
        let client = IpAddr::V4(Ipv4Address::from_bytes([1, 2, 3, 4]));
        let server = IpAddr::V4(Ipv4Address::from_bytes([5, 6, 7, 8]));
        assert!(matches!(
            follower.find_stream(client, 1, server, 2),
            Err(ParseError::StreamNotFound)
        ));
    }

    fn syn_pdu(client: [u8; 4], server: [u8; 4], sport: u16, dport: u16, seq: u32) -> Pdu {
        let ip = Ipv4::new(Ipv4Address::from_bytes(client), Ipv4Address::from_bytes(server));
        let mut tcp = Tcp::new(sport, dport);
        tcp.flags = SYN;
        tcp.seq = seq;
        Pdu::Ipv4(
            ip,
            Box::new(Pdu::Tcp(tcp, Box::new(Pdu::Raw(crate::pdu::RawPdu::empty())))),
        )
    }

    fn rst_pdu(client: [u8; 4], server: [u8; 4], sport: u16, dport: u16, seq: u32) -> Pdu {
        let ip = Ipv4::new(Ipv4Address::from_bytes(client), Ipv4Address::from_bytes(server));
        let mut tcp = Tcp::new(sport, dport);
        tcp.flags = RST;
        tcp.seq = seq;
        Pdu::Ipv4(
            ip,
            Box::new(Pdu::Tcp(tcp, Box::new(Pdu::Raw(crate::pdu::RawPdu::empty())))),
        )
    }

    #[test]
    fn new_stream_callback_fires_once_on_creation() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let mut follower = TcpStreamFollower::new();
        let fires = Arc::new(AtomicUsize::new(0));
        let fires2 = fires.clone();
        follower.new_stream_callback(move |stream| {
            fires2.fetch_add(1, Ordering::SeqCst);
            stream
                .client_flow_mut()
                .data_callback(|_flow| {});
        });

        follower.process_packet(&syn_pdu([10, 0, 0, 1], [10, 0, 0, 2], 1234, 80, 100));
        assert_eq!(fires.load(Ordering::SeqCst), 1);

        // A second SYN on the same connection doesn't create a second
        // stream, so the callback must not fire again.
        follower.process_packet(&syn_pdu([10, 0, 0, 1], [10, 0, 0, 2], 1234, 80, 100));
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stream_is_finished_on_rst_and_follower_drops_it() {
        let mut follower = TcpStreamFollower::new();
        let client = IpAddr::V4(Ipv4Address::from_bytes([10, 0, 0, 1]));
        let server = IpAddr::V4(Ipv4Address::from_bytes([10, 0, 0, 2]));

        follower.process_packet(&syn_pdu([10, 0, 0, 1], [10, 0, 0, 2], 1234, 80, 100));
        assert!(follower.find_stream(client, 1234, server, 80).is_ok());

        follower.process_packet(&rst_pdu([10, 0, 0, 1], [10, 0, 0, 2], 1234, 80, 101));
        assert!(matches!(
            follower.find_stream(client, 1234, server, 80),
            Err(ParseError::StreamNotFound)
        ));
    }
}
