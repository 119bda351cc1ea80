use core::fmt;

use crate::error::{AddressKind, Error, Result};
use crate::wire::{EthernetAddress, Ipv4Address, TcpFlags, TcpOption, TcpSeqNumber};

/// One endpoint of a synthesized connection.
///
/// The identity (hardware address, IPv4 address and port) is fixed at construction. The protocol
/// state is only ever replaced as a whole by the operations of a [`Connection`], each replacement
/// bumping the [`generation`].
///
/// [`Connection`]: struct.Connection.html
/// [`generation`]: #method.generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    hardware_addr: EthernetAddress,
    ip_addr: Ipv4Address,
    port: u16,
    state: PeerState,
    generation: u64,
}

/// The protocol state of a peer, as written into the next frame it sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerState {
    /// The sequence number of the next octet sent.
    pub seq: TcpSeqNumber,
    /// The acknowledgment field of the next segment.
    pub ack: TcpSeqNumber,
    /// The control flags of the next segment.
    pub flags: TcpFlags,
    /// The options of the next segment.
    ///
    /// `None` writes no options field at all while `Some(vec![])` is an explicitly empty list.
    /// Both serialize to the same bytes.
    pub options: Option<Vec<TcpOption>>,
}

impl Peer {
    /// Create a peer from textual addresses.
    ///
    /// The hardware address is six hexadecimal octets separated by `:` or `-`, the network
    /// address a dotted-quad IPv4 address. The peer starts with `initial_seq` as its sequence
    /// number, a zero acknowledgment, no flags and no options.
    pub fn new(hardware_addr: &str, ip_addr: &str, port: u16, initial_seq: u32) -> Result<Self> {
        let hardware: EthernetAddress = hardware_addr.parse()
            .map_err(|_| Error::InvalidAddress {
                kind: AddressKind::Hardware,
                input: hardware_addr.to_string(),
            })?;
        let ip: Ipv4Address = ip_addr.parse()
            .map_err(|_| Error::InvalidAddress {
                kind: AddressKind::Network,
                input: ip_addr.to_string(),
            })?;
        Ok(Peer::with_addresses(hardware, ip, port, initial_seq))
    }

    /// Create a peer from already parsed addresses.
    pub fn with_addresses(
        hardware_addr: EthernetAddress,
        ip_addr: Ipv4Address,
        port: u16,
        initial_seq: u32,
    ) -> Self {
        Peer {
            hardware_addr,
            ip_addr,
            port,
            state: PeerState::initial(initial_seq),
            generation: 0,
        }
    }

    /// The link layer address.
    pub fn hardware_addr(&self) -> EthernetAddress {
        self.hardware_addr
    }

    /// The network layer address.
    pub fn ip_addr(&self) -> Ipv4Address {
        self.ip_addr
    }

    /// The transport port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The current protocol state.
    pub fn state(&self) -> &PeerState {
        &self.state
    }

    /// The current sequence number.
    pub fn seq(&self) -> TcpSeqNumber {
        self.state.seq
    }

    /// The number of state replacements since construction.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn replace(&mut self, state: PeerState) {
        self.state = state;
        self.generation += 1;
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.ip_addr, self.port)
    }
}

impl PeerState {
    fn initial(seq: u32) -> Self {
        PeerState {
            seq: TcpSeqNumber::from(seq),
            ack: TcpSeqNumber(0),
            flags: TcpFlags::default(),
            options: None,
        }
    }

    /// The state for a segment with the given flags and acknowledgment, keeping sequence number
    /// and options.
    pub(crate) fn segment(&self, flags: TcpFlags, ack: TcpSeqNumber) -> Self {
        PeerState {
            flags,
            ack,
            ..self.clone()
        }
    }

    /// The same state with a different option list.
    pub(crate) fn with_options(self, options: Option<Vec<TcpOption>>) -> Self {
        PeerState { options, ..self }
    }

    /// The same state after `len` octets of sequence space were sent.
    pub(crate) fn advanced(self, len: usize) -> Self {
        PeerState { seq: self.seq + len, ..self }
    }
}
