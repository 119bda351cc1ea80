//! Command line front end of `tcpsynth`.
//!
//! `generate` scripts a connection, handshake then messages then close, and writes the frames
//! into a pcap file, onto an interface, or both. `listen` prints the frames of a capture file or a
//! live interface.
pub mod config;

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use thiserror::Error;

use tcpsynth::capture::{
    pcap, BpfFilter, Captured, Filter, Listener, Source, Summary, TcpPortFilter};
use tcpsynth::wire::{ethernet_frame, PrettyPrinter};
use tcpsynth::{Connection, PacketStore, Peer};

use config::{Generate, Listen};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Synth(#[from] tcpsynth::Error),

    #[error("cannot write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        source: io::Error,
    },

    #[error("cannot send on {interface}: {source}")]
    Inject {
        interface: String,
        source: io::Error,
    },

    #[error("sending frames requires a Linux raw socket")]
    InjectUnsupported,

    #[error("nothing to do, give an output file or an interface")]
    NoSink,
}

pub type Result<T> = core::result::Result<T, Error>;

/// Run the script described by the arguments.
pub fn script(args: &Generate) -> Result<PacketStore> {
    let client = Peer::new(&args.client_mac, &args.client_ip, args.client_port, args.client_isn)?;
    let server = Peer::new(&args.server_mac, &args.server_ip, args.server_port, args.server_isn)?;
    let mut conn = Connection::with_options(client, server, args.phase_options());

    conn.connect()?;
    for message in &args.messages {
        conn.send(message.side, &message.payload)?;
    }
    if !args.no_disconnect {
        conn.disconnect()?;
    }
    Ok(conn.into_packets())
}

/// Script the connection and put the frames wherever requested.
pub fn generate(args: &Generate) -> Result<PacketStore> {
    if args.output.is_none() && args.interface.is_none() {
        return Err(Error::NoSink);
    }

    let packets = script(args)?;
    tracing::info!(frames = packets.len(), "synthesized connection");

    if let Some(path) = &args.output {
        let output_err = |source| Error::Output { path: path.clone(), source };
        let file = File::create(path).map_err(output_err)?;
        pcap::write_store(BufWriter::new(file), &packets).map_err(output_err)?;
        tracing::info!(path = %path.display(), "wrote capture");
    }

    if let Some(interface) = &args.interface {
        inject(interface, &packets)?;
    }

    Ok(packets)
}

#[cfg(target_os = "linux")]
fn inject(interface: &str, packets: &PacketStore) -> Result<()> {
    let inject_err = |source| Error::Inject { interface: interface.to_string(), source };
    let mut socket = tcpsynth::nic::RawSocket::new(interface).map_err(inject_err)?;
    let sent = socket.send_all(packets).map_err(inject_err)?;
    tracing::info!(interface, sent, "injected frames");
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn inject(_: &str, _: &PacketStore) -> Result<()> {
    Err(Error::InjectUnsupported)
}

/// Build the listener described by the arguments.
///
/// Fails if the filter program does not compile. With both a port and a program a frame has to
/// pass both.
pub fn listener(args: &Listen) -> Result<Listener> {
    let source = match &args.file {
        Some(path) => Source::File(path.clone()),
        None => Source::Device(args.device.clone()),
    };

    let mut listener = Listener::new(source)
        .promiscuous(args.promisc)
        .snaplen(args.snaplen)
        .max_packets(args.max_packets);
    if let Some(timeout) = args.timeout() {
        listener = listener.read_timeout(timeout);
    }
    if let Some(max_time) = args.max_time() {
        listener = listener.max_time(max_time);
    }
    let program = args.bpf.as_deref().map(str::parse::<BpfFilter>).transpose()?;
    match (args.port.map(TcpPortFilter::new), program) {
        (Some(port), Some(program)) => {
            listener = listener
                .filter(move |frame: &[u8]| port.matches(frame) && program.matches(frame));
        }
        (Some(port), None) => listener = listener.filter(port),
        (None, Some(program)) => listener = listener.filter(program),
        (None, None) => {}
    }
    if let Some(period) = args.stats_period() {
        listener = listener
            .timer(period)
            .timer_handler(|elapsed: std::time::Duration| {
                tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "still listening");
            });
    }
    Ok(listener)
}

/// Print every frame the listener delivers.
pub fn listen(args: &Listen) -> Result<Summary> {
    let summary = listener(args)?.run(|packet: &Captured| {
        let timestamp = packet.timestamp;
        println!("{}.{:06} len={}",
                 timestamp.as_secs(), timestamp.subsec_micros(), packet.original_len);
        println!("{}", PrettyPrinter::<ethernet_frame>::new("  ", &packet.data));
    })?;
    Ok(summary)
}
