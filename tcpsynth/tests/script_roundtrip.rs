//! A scripted connection written to a capture file and read back by the listener.
use std::fs::File;
use std::io::BufWriter;

use tcpsynth::capture::{pcap, Captured, Listener, TcpPortFilter};
use tcpsynth::wire::{
    ethernet_frame, ipv4_packet, tcp_packet, Checksum, Ipv4Repr, PrettyPrinter, TcpOption, TcpRepr};
use tcpsynth::{Connection, Peer, PhaseOptions, Side};

fn scripted() -> Connection {
    let client = Peer::new("00:00:5e:00:53:01", "192.0.2.1", 40000, 100).unwrap();
    let server = Peer::new("00:00:5e:00:53:02", "192.0.2.2", 80, 500).unwrap();
    let options = PhaseOptions {
        syn: Some(vec![TcpOption::MaxSegmentSize(1460), TcpOption::SackPermitted]),
        syn_ack: Some(vec![TcpOption::MaxSegmentSize(1400)]),
        ack: None,
    };
    let mut conn = Connection::with_options(client, server, options);
    conn.connect().unwrap();
    conn.send(Side::Client, b"GET / HTTP/1.0\r\n\r\n").unwrap();
    conn.send(Side::Server, b"HTTP/1.0 204 No Content\r\n\r\n").unwrap();
    conn.disconnect().unwrap();
    conn
}

fn tcp_repr(frame: &[u8]) -> TcpRepr {
    let eth = ethernet_frame::new_checked(frame).unwrap();
    let ip = ipv4_packet::new_checked(eth.payload_slice()).unwrap();
    let ipv4 = Ipv4Repr::parse(ip, Checksum::Manual).unwrap();
    let segment = tcp_packet::new_checked(ip.payload_slice()).unwrap();
    TcpRepr::parse(segment, &ipv4.src_addr, &ipv4.dst_addr, Checksum::Manual).unwrap()
}

#[test]
fn script_to_capture_and_back() {
    let conn = scripted();
    assert_eq!(conn.packets().len(), 3 + 2 + 2 + 3);

    let path = std::env::temp_dir()
        .join(format!("tcpsynth-roundtrip-{}.pcap", std::process::id()));
    let file = BufWriter::new(File::create(&path).unwrap());
    pcap::write_store(file, conn.packets()).unwrap();

    let mut captured: Vec<Captured> = Vec::new();
    let summary = Listener::file(&path)
        .filter(TcpPortFilter::new(80))
        .run(|packet: &Captured| captured.push(packet.clone()))
        .unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(summary.delivered, conn.packets().len());
    assert_eq!(summary.skipped, 0);
    for (packet, frame) in captured.iter().zip(conn.packets()) {
        assert_eq!(packet.data, frame);
        let dump = PrettyPrinter::<ethernet_frame>::new("", &packet.data).to_string();
        assert!(!dump.contains("checksum incorrect"), "{}", dump);
    }

    let syn = tcp_repr(&captured[0].data);
    assert_eq!(syn.options, Some(vec![TcpOption::MaxSegmentSize(1460), TcpOption::SackPermitted]));
    let response = tcp_repr(&captured[5].data);
    assert_eq!(response.seq_number.to_u32(), 501);
    assert_eq!(response.ack_number.to_u32(), 101 + 18);
    assert_eq!(response.payload_len, 27);
}
