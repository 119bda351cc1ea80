use proptest::prelude::*;

use super::*;
use crate::Error;
use crate::wire::{
    ethernet_frame, ipv4_packet, tcp_packet,
    Checksum, EthernetAddress, EthernetProtocol, EthernetRepr, IpProtocol, Ipv4Address, Ipv4Repr,
    TcpRepr};

const MAC_CLIENT: EthernetAddress = EthernetAddress([0x00, 0x00, 0x5e, 0x00, 0x53, 0x01]);
const IP_CLIENT: Ipv4Address = Ipv4Address::new(192, 0, 2, 1);
const MAC_SERVER: EthernetAddress = EthernetAddress([0x00, 0x00, 0x5e, 0x00, 0x53, 0x02]);
const IP_SERVER: Ipv4Address = Ipv4Address::new(192, 0, 2, 2);

fn connection(client_isn: u32, server_isn: u32) -> Connection {
    Connection::new(
        Peer::with_addresses(MAC_CLIENT, IP_CLIENT, 40000, client_isn),
        Peer::with_addresses(MAC_SERVER, IP_SERVER, 80, server_isn))
}

/// A frame taken apart, with all checksums verified.
struct Decoded {
    ethernet: EthernetRepr,
    ipv4: Ipv4Repr,
    tcp: TcpRepr,
    payload: Vec<u8>,
}

fn decode(frame: &[u8]) -> Decoded {
    let eth = ethernet_frame::new_checked(frame).expect("ethernet header");
    let ethernet = EthernetRepr::parse(eth).unwrap();
    let ip = ipv4_packet::new_checked(eth.payload_slice()).expect("ipv4 header");
    let ipv4 = Ipv4Repr::parse(ip, Checksum::Manual).expect("valid ipv4 checksum");
    let segment = tcp_packet::new_checked(ip.payload_slice()).expect("tcp header");
    let tcp = TcpRepr::parse(segment, &ipv4.src_addr, &ipv4.dst_addr, Checksum::Manual)
        .expect("valid tcp checksum");
    Decoded {
        ethernet,
        ipv4,
        tcp,
        payload: segment.payload_slice().to_vec(),
    }
}

/// (flags, seq, ack, payload length) of every frame.
fn summary(packets: &PacketStore) -> Vec<(TcpFlags, u32, u32, usize)> {
    packets.iter()
        .map(decode)
        .map(|d| (d.tcp.flags, d.tcp.seq_number.to_u32(), d.tcp.ack_number.to_u32(), d.payload.len()))
        .collect()
}

const SYN: TcpFlags = TcpFlags::SYN;
const ACK: TcpFlags = TcpFlags::ACK;
const SYN_ACK: TcpFlags = TcpFlags(TcpFlags::SYN.0 | TcpFlags::ACK.0);
const FIN_ACK: TcpFlags = TcpFlags(TcpFlags::FIN.0 | TcpFlags::ACK.0);

#[test]
fn connect_handshake() {
    let mut conn = connection(100, 500);
    assert_eq!(conn.phase(), Phase::Idle);
    conn.connect().unwrap();

    assert_eq!(summary(conn.packets()), [
        (SYN, 100, 0, 0),
        (SYN_ACK, 500, 101, 0),
        (ACK, 101, 501, 0),
    ]);
    assert_eq!(conn.client().seq(), TcpSeqNumber(101));
    assert_eq!(conn.server().seq(), TcpSeqNumber(501));
    assert_eq!(conn.phase(), Phase::Established);
}

#[test]
fn frame_headers() {
    let mut conn = connection(100, 500);
    conn.connect().unwrap();

    let syn = decode(&conn.packets()[0]);
    assert_eq!(syn.ethernet.src_addr, MAC_CLIENT);
    assert_eq!(syn.ethernet.dst_addr, MAC_SERVER);
    assert_eq!(syn.ethernet.ethertype, EthernetProtocol::Ipv4);
    assert_eq!(syn.ipv4.src_addr, IP_CLIENT);
    assert_eq!(syn.ipv4.dst_addr, IP_SERVER);
    assert_eq!(syn.ipv4.protocol, IpProtocol::Tcp);
    assert_eq!(syn.ipv4.hop_limit, 64);
    assert_eq!(syn.ipv4.ident, 1);
    assert!(syn.ipv4.dont_frag);
    assert_eq!(syn.tcp.src_port, 40000);
    assert_eq!(syn.tcp.dst_port, 80);
    assert_eq!(syn.tcp.window_len, 64000);
    assert_eq!(syn.tcp.options, None);
    // Ethernet, IPv4 and bare TCP header, no link padding.
    assert_eq!(conn.packets()[0].len(), 14 + 20 + 20);

    let syn_ack = decode(&conn.packets()[1]);
    assert_eq!(syn_ack.ethernet.src_addr, MAC_SERVER);
    assert_eq!(syn_ack.ipv4.src_addr, IP_SERVER);
    assert_eq!(syn_ack.tcp.src_port, 80);
    assert_eq!(syn_ack.tcp.dst_port, 40000);
}

#[test]
fn send_exchange() {
    let mut conn = connection(100, 500);
    conn.connect().unwrap();
    conn.send(Side::Client, b"abc").unwrap();

    assert_eq!(conn.packets().len(), 5);
    let data = decode(&conn.packets()[3]);
    assert_eq!((data.tcp.flags, data.tcp.seq_number.to_u32(), data.tcp.ack_number.to_u32()),
               (ACK, 101, 501));
    assert_eq!(data.payload, b"abc");
    let ack = decode(&conn.packets()[4]);
    assert_eq!((ack.tcp.flags, ack.tcp.seq_number.to_u32(), ack.tcp.ack_number.to_u32()),
               (ACK, 501, 104));
    assert!(ack.payload.is_empty());
    assert_eq!(conn.client().seq(), TcpSeqNumber(104));
    assert_eq!(conn.server().seq(), TcpSeqNumber(501));
}

#[test]
fn send_from_server() {
    let mut conn = connection(100, 500);
    conn.connect().unwrap();
    conn.send(Side::Server, b"hello").unwrap();

    assert_eq!(summary(conn.packets())[3..], [
        (ACK, 501, 101, 5),
        (ACK, 101, 506, 0),
    ]);
    assert_eq!(conn.server().seq(), TcpSeqNumber(506));
}

#[test]
fn send_empty_payload() {
    let mut conn = connection(100, 500);
    conn.connect().unwrap();
    conn.send(Side::Client, &[]).unwrap();

    assert_eq!(summary(conn.packets())[3..], [
        (ACK, 101, 501, 0),
        (ACK, 501, 101, 0),
    ]);
    assert_eq!(conn.client().seq(), TcpSeqNumber(101));
}

#[test]
fn disconnect_close() {
    let mut conn = connection(100, 500);
    conn.connect().unwrap();
    conn.disconnect().unwrap();

    assert_eq!(summary(conn.packets())[3..], [
        (FIN_ACK, 101, 501, 0),
        (FIN_ACK, 501, 102, 0),
        (ACK, 102, 502, 0),
    ]);
    assert_eq!(conn.client().seq(), TcpSeqNumber(102));
    assert_eq!(conn.server().seq(), TcpSeqNumber(502));
    assert_eq!(conn.phase(), Phase::Closed);
}

#[test]
fn full_script_is_deterministic() {
    let run = || {
        let mut conn = connection(100, 500);
        conn.connect().unwrap();
        conn.send(Side::Client, b"abc").unwrap();
        conn.disconnect().unwrap();
        conn.into_packets()
    };

    let first = run();
    assert_eq!(summary(&first), [
        (SYN, 100, 0, 0),
        (SYN_ACK, 500, 101, 0),
        (ACK, 101, 501, 0),
        (ACK, 101, 501, 3),
        (ACK, 501, 104, 0),
        (FIN_ACK, 104, 501, 0),
        (FIN_ACK, 501, 105, 0),
        (ACK, 105, 502, 0),
    ]);
    assert_eq!(first, run());
}

#[test]
fn out_of_order_operations_still_run() {
    let mut conn = connection(100, 500);
    conn.send(Side::Client, b"x").unwrap();
    assert_eq!(conn.packets().len(), 2);
    assert_eq!(conn.phase(), Phase::Idle);
    conn.disconnect().unwrap();
    assert_eq!(conn.packets().len(), 5);
    assert_eq!(conn.phase(), Phase::Closed);
}

fn scoped_options() -> PhaseOptions {
    PhaseOptions {
        syn: Some(vec![
            TcpOption::MaxSegmentSize(1460),
            TcpOption::SackPermitted,
            TcpOption::WindowScale(7),
        ]),
        syn_ack: Some(vec![TcpOption::MaxSegmentSize(1400)]),
        ack: Some(vec![TcpOption::NoOperation, TcpOption::NoOperation,
                       TcpOption::Timestamps { value: 1, echo_reply: 2 }]),
    }
}

#[test]
fn option_scoping() {
    let options = scoped_options();
    let mut conn = connection(100, 500);
    *conn.options_mut() = options.clone();
    conn.connect().unwrap();
    conn.send(Side::Client, b"abc").unwrap();
    conn.disconnect().unwrap();

    let decoded: Vec<_> = conn.packets().iter().map(decode).collect();
    assert_eq!(decoded[0].tcp.options, options.syn);
    assert_eq!(decoded[1].tcp.options, options.syn_ack);
    for later in &decoded[2..] {
        assert_eq!(later.tcp.options, options.ack);
    }
    assert_eq!(conn.client().state().options, options.ack);
    assert_eq!(conn.server().state().options, options.ack);
}

#[test]
fn options_padded_to_word() {
    let mut conn = Connection::with_options(
        Peer::with_addresses(MAC_CLIENT, IP_CLIENT, 40000, 100),
        Peer::with_addresses(MAC_SERVER, IP_SERVER, 80, 500),
        PhaseOptions {
            syn: Some(vec![TcpOption::WindowScale(2)]),
            ..PhaseOptions::default()
        });
    conn.connect().unwrap();

    let syn = &conn.packets()[0];
    assert_eq!(syn.len(), 14 + 20 + 24);
    assert_eq!(&syn[54..58], &[0x03, 0x03, 0x02, 0x00]);
    assert_eq!(tcp_packet::new_checked(&syn[34..]).unwrap().header_len(), 24);
}

#[test]
fn empty_option_list_is_distinct_but_writes_nothing() {
    let mut with_empty = connection(100, 500);
    with_empty.options_mut().syn = Some(vec![]);
    with_empty.connect().unwrap();

    let mut without = connection(100, 500);
    without.connect().unwrap();

    assert_eq!(with_empty.packets(), without.packets());
    assert_ne!(with_empty.options(), without.options());
}

fn too_many_options() -> Option<Vec<TcpOption>> {
    Some(vec![TcpOption::Timestamps { value: 0, echo_reply: 0 }; 5])
}

#[test]
fn serialization_failure_on_syn() {
    let mut conn = connection(100, 500);
    conn.options_mut().syn = too_many_options();

    match conn.connect() {
        Err(Error::SerializationFailure(_)) => {},
        other => panic!("unexpected {:?}", other),
    }
    assert!(conn.packets().is_empty());
    assert_eq!(conn.client().seq(), TcpSeqNumber(100));
    assert_eq!(conn.client().generation(), 0);
    assert_eq!(conn.phase(), Phase::Handshaking);
}

#[test]
fn serialization_failure_keeps_earlier_frames() {
    let mut conn = connection(100, 500);
    conn.options_mut().ack = too_many_options();

    assert!(matches!(conn.connect(), Err(Error::SerializationFailure(_))));
    assert_eq!(summary(conn.packets()), [
        (SYN, 100, 0, 0),
        (SYN_ACK, 500, 101, 0),
    ]);
    assert_eq!(conn.client().seq(), TcpSeqNumber(101));
    assert_eq!(conn.client().state().flags, SYN);
}

#[test]
fn oversized_payload_fails() {
    let mut conn = connection(100, 500);
    conn.connect().unwrap();
    let payload = vec![0; 65536];

    assert!(matches!(conn.send(Side::Client, &payload), Err(Error::SerializationFailure(_))));
    assert_eq!(conn.packets().len(), 3);
    assert_eq!(conn.client().seq(), TcpSeqNumber(101));
}

#[test]
fn synthesize_uses_current_state() {
    let client = Peer::with_addresses(MAC_CLIENT, IP_CLIENT, 40000, 7);
    let server = Peer::with_addresses(MAC_SERVER, IP_SERVER, 80, 9);
    let mut store = PacketStore::new();
    synthesize(&client, &server, b"raw", &mut store).unwrap();

    let decoded = decode(&store[0]);
    assert_eq!(decoded.tcp.flags, TcpFlags::default());
    assert_eq!(decoded.tcp.seq_number, TcpSeqNumber(7));
    assert_eq!(decoded.payload, b"raw");
}

#[test]
fn sequence_wraps() {
    let mut conn = connection(u32::MAX, u32::MAX - 1);
    conn.connect().unwrap();
    conn.send(Side::Server, b"ab").unwrap();

    assert_eq!(summary(conn.packets()), [
        (SYN, u32::MAX, 0, 0),
        (SYN_ACK, u32::MAX - 1, 0, 0),
        (ACK, 0, u32::MAX, 0),
        (ACK, u32::MAX, 0, 2),
        (ACK, 0, 1, 0),
    ]);
}

fn exchange_strategy() -> impl Strategy<Value = (bool, Vec<u8>)> {
    (any::<bool>(), prop::collection::vec(any::<u8>(), 0..64))
}

proptest! {
    /// Every acknowledgment equals the sequence number of the other side right after its last
    /// advance, and every frame carries valid checksums.
    #[test]
    fn prop_acks_track_sequence(
        client_isn in any::<u32>(),
        server_isn in any::<u32>(),
        exchanges in prop::collection::vec(exchange_strategy(), 0..8),
    ) {
        let mut conn = connection(client_isn, server_isn);
        conn.connect().unwrap();
        let mut client_seq = client_isn.wrapping_add(1);
        let mut server_seq = server_isn.wrapping_add(1);

        for (from_client, payload) in &exchanges {
            let before = conn.packets().len();
            let side = if *from_client { Side::Client } else { Side::Server };
            conn.send(side, payload).unwrap();
            prop_assert_eq!(conn.packets().len(), before + 2);

            let data = decode(&conn.packets()[before]);
            let ack = decode(&conn.packets()[before + 1]);
            let (sender_seq, receiver_seq) = if *from_client {
                (&mut client_seq, server_seq)
            } else {
                (&mut server_seq, client_seq)
            };
            prop_assert_eq!(data.tcp.seq_number.to_u32(), *sender_seq);
            prop_assert_eq!(data.tcp.ack_number.to_u32(), receiver_seq);
            prop_assert_eq!(&data.payload, payload);
            *sender_seq = sender_seq.wrapping_add(payload.len() as u32);
            prop_assert_eq!(ack.tcp.ack_number.to_u32(), *sender_seq);
            prop_assert_eq!(ack.tcp.seq_number.to_u32(), receiver_seq);
        }

        prop_assert_eq!(conn.client().seq().to_u32(), client_seq);
        prop_assert_eq!(conn.server().seq().to_u32(), server_seq);

        conn.disconnect().unwrap();
        prop_assert_eq!(conn.packets().len(), 3 + 2 * exchanges.len() + 3);
        prop_assert_eq!(conn.client().seq().to_u32(), client_seq.wrapping_add(1));
        prop_assert_eq!(conn.server().seq().to_u32(), server_seq.wrapping_add(1));
    }
}
