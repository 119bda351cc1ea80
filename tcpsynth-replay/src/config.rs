use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use structopt::StructOpt;
use thiserror::Error;

use tcpsynth::wire::TcpOption;
use tcpsynth::{PhaseOptions, Side};

#[derive(Clone, Debug, StructOpt)]
#[structopt(name = "tcpsynth-replay", about = "Scripted TCP connections as Ethernet frames")]
pub struct Config {
    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, StructOpt)]
pub enum Command {
    /// Synthesize a connection and write it to a capture file or an interface.
    #[structopt(name = "generate")]
    Generate(Generate),

    /// Print the frames of a capture file or a live interface.
    #[structopt(name = "listen")]
    Listen(Listen),
}

#[derive(Clone, Debug, StructOpt)]
pub struct Generate {
    #[structopt(long, default_value = "02:00:00:00:00:01")]
    pub client_mac: String,
    #[structopt(long, default_value = "10.0.0.1")]
    pub client_ip: String,
    #[structopt(long, default_value = "40000")]
    pub client_port: u16,
    /// Initial sequence number of the client.
    #[structopt(long, default_value = "100")]
    pub client_isn: u32,

    #[structopt(long, default_value = "02:00:00:00:00:02")]
    pub server_mac: String,
    #[structopt(long, default_value = "10.0.0.2")]
    pub server_ip: String,
    #[structopt(long, default_value = "80")]
    pub server_port: u16,
    /// Initial sequence number of the server.
    #[structopt(long, default_value = "500")]
    pub server_isn: u32,

    #[structopt(long)]
    pub syn_mss: Option<u16>,
    #[structopt(long)]
    pub syn_ws: Option<u8>,
    #[structopt(long)]
    pub syn_sack_perm: bool,
    #[structopt(long)]
    pub syn_ack_mss: Option<u16>,
    #[structopt(long)]
    pub syn_ack_ws: Option<u8>,
    #[structopt(long)]
    pub syn_ack_sack_perm: bool,
    #[structopt(long)]
    pub ack_mss: Option<u16>,
    #[structopt(long)]
    pub ack_ws: Option<u8>,
    #[structopt(long)]
    pub ack_sack_perm: bool,

    /// A payload exchanged after the handshake, `c:` or `s:` for the sender followed by text, or
    /// by `hex:` and hexadecimal octets.
    #[structopt(short = "m", long = "message")]
    pub messages: Vec<Message>,

    /// Leave the connection open at the end.
    #[structopt(long)]
    pub no_disconnect: bool,

    /// Write the frames into this pcap file.
    #[structopt(short = "o", long, parse(from_os_str))]
    pub output: Option<PathBuf>,

    /// Send the frames on this interface.
    #[structopt(short = "i", long)]
    pub interface: Option<String>,
}

#[derive(Clone, Debug, StructOpt)]
pub struct Listen {
    /// Read this pcap file instead of a live interface.
    #[structopt(short = "r", long, parse(from_os_str))]
    pub file: Option<PathBuf>,
    /// The interface to capture on, the first one that is up by default.
    #[structopt(short = "i", long)]
    pub device: Option<String>,
    #[structopt(long)]
    pub promisc: bool,
    #[structopt(long, default_value = "65535")]
    pub snaplen: usize,
    /// Read timeout of a live capture, in milliseconds.
    #[structopt(long)]
    pub timeout_ms: Option<u64>,
    /// Only show TCP frames from or to this port.
    #[structopt(long)]
    pub port: Option<u16>,
    /// Only show frames accepted by this classic BPF program, in `tcpdump -ddd` format with
    /// commas or newlines between instructions.
    #[structopt(long)]
    pub bpf: Option<String>,
    /// Stop after this many frames, 0 for no limit.
    #[structopt(short = "c", long, default_value = "0")]
    pub max_packets: usize,
    /// Stop after this many seconds.
    #[structopt(long)]
    pub max_time_secs: Option<u64>,
    /// Log capture statistics with this period, in milliseconds.
    #[structopt(long)]
    pub stats_ms: Option<u64>,
}

/// A payload sent by one side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub side: Side,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseMessageError {
    #[error("a message starts with `c:` or `s:`")]
    MissingSide,
    #[error("unknown sender {0:?}, expected `c` or `s`")]
    UnknownSide(String),
    #[error("invalid hex payload: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl FromStr for Message {
    type Err = ParseMessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (side, rest) = s.split_once(':').ok_or(ParseMessageError::MissingSide)?;
        let side = match side {
            "c" | "client" => Side::Client,
            "s" | "server" => Side::Server,
            other => return Err(ParseMessageError::UnknownSide(other.to_string())),
        };
        let payload = match rest.strip_prefix("hex:") {
            Some(digits) => hex::decode(digits)?,
            None => rest.as_bytes().to_vec(),
        };
        Ok(Message { side, payload })
    }
}

impl Config {
    pub fn from_args() -> Self {
        StructOpt::from_args()
    }
}

impl Generate {
    pub fn phase_options(&self) -> PhaseOptions {
        PhaseOptions {
            syn: phase(self.syn_mss, self.syn_ws, self.syn_sack_perm),
            syn_ack: phase(self.syn_ack_mss, self.syn_ack_ws, self.syn_ack_sack_perm),
            ack: phase(self.ack_mss, self.ack_ws, self.ack_sack_perm),
        }
    }
}

impl Listen {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn max_time(&self) -> Option<Duration> {
        self.max_time_secs.map(Duration::from_secs)
    }

    pub fn stats_period(&self) -> Option<Duration> {
        self.stats_ms.map(Duration::from_millis)
    }
}

/// The options of one phase, `None` when no option was requested.
fn phase(mss: Option<u16>, ws: Option<u8>, sack_perm: bool) -> Option<Vec<TcpOption>> {
    let mut options = Vec::new();
    if let Some(mss) = mss {
        options.push(TcpOption::MaxSegmentSize(mss));
    }
    if sack_perm {
        options.push(TcpOption::SackPermitted);
    }
    if let Some(ws) = ws {
        options.push(TcpOption::NoOperation);
        options.push(TcpOption::WindowScale(ws));
    }
    if options.is_empty() {
        None
    } else {
        Some(options)
    }
}
