//! Scripted TCP connections between two peers.
//!
//! A [`Connection`] drives two [`Peer`]s through the canonical life of a TCP connection. Nothing
//! is received or reacted to: each operation is a fixed sequence of steps, every step replaces
//! the protocol state of one peer and synthesizes the frame that peer would send in it.
//!
//! | operation    | frames                                            |
//! |--------------|---------------------------------------------------|
//! | `connect`    | SYN c→s, SYN-ACK s→c, ACK c→s                     |
//! | `send`       | data with ACK from the sender, ACK from the other |
//! | `disconnect` | FIN-ACK c→s, FIN-ACK s→c, ACK c→s                 |
//!
//! The acknowledgment of every frame is the sequence number of the other peer right after its
//! most recent advance, the SYN being the only exception with a zero acknowledgment. SYN and FIN
//! each take one unit of sequence space, data takes its length.
//!
//! ## Options
//!
//! Options are scoped by phase in [`PhaseOptions`]. The SYN carries the `syn` set and the SYN-ACK
//! the `syn_ack` set. Once the handshake reached its final ACK both peers switch to the `ack` set
//! and keep it for every later frame.
//!
//! ## Failure
//!
//! The only failure of an operation is a frame that does not serialize. The peer of the failing
//! step keeps its previous state and no frame is recorded for it, frames of earlier steps of the
//! same operation remain in the store.
//!
//! [`Connection`]: struct.Connection.html
//! [`Peer`]: struct.Peer.html
//! [`PhaseOptions`]: struct.PhaseOptions.html
mod peer;
mod store;
mod synth;

#[cfg(test)]
mod tests;

use crate::error::Result;
use crate::wire::{TcpFlags, TcpOption, TcpSeqNumber};

pub use self::peer::{Peer, PeerState};
pub use self::store::{Frames, PacketStore};
pub use self::synth::{synthesize, HOP_LIMIT, IDENT, WINDOW_LEN};

/// Options of the frames in each phase of a connection.
///
/// `None` writes no options, as opposed to `Some` list which is written verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseOptions {
    /// Options of the client's SYN.
    pub syn: Option<Vec<TcpOption>>,
    /// Options of the server's SYN-ACK.
    pub syn_ack: Option<Vec<TcpOption>>,
    /// Options of every frame after the handshake's SYN-ACK.
    pub ack: Option<Vec<TcpOption>>,
}

/// One of the two peers of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The peer that opens and closes the connection.
    Client,
    /// The peer that accepts the connection.
    Server,
}

/// Where in its life a connection is.
///
/// This is informational only. Operations never refuse to run because of the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing was sent yet.
    Idle,
    /// A handshake was started but did not complete.
    Handshaking,
    /// The handshake completed.
    Established,
    /// A close was started but did not complete.
    Closing,
    /// Both sides closed.
    Closed,
}

/// A scripted connection between a client and a server.
#[derive(Debug, Clone)]
pub struct Connection {
    client: Peer,
    server: Peer,
    options: PhaseOptions,
    packets: PacketStore,
    phase: Phase,
}

impl Side {
    /// The other side.
    pub fn opposite(self) -> Side {
        match self {
            Side::Client => Side::Server,
            Side::Server => Side::Client,
        }
    }
}

impl Connection {
    /// Create a connection without any options.
    pub fn new(client: Peer, server: Peer) -> Self {
        Connection::with_options(client, server, PhaseOptions::default())
    }

    /// Create a connection with options for each phase.
    pub fn with_options(client: Peer, server: Peer, options: PhaseOptions) -> Self {
        Connection {
            client,
            server,
            options,
            packets: PacketStore::new(),
            phase: Phase::Idle,
        }
    }

    /// The options used in each phase.
    pub fn options(&self) -> &PhaseOptions {
        &self.options
    }

    /// Change the options of phases that have not been reached yet.
    pub fn options_mut(&mut self) -> &mut PhaseOptions {
        &mut self.options
    }

    /// The peer opening the connection.
    pub fn client(&self) -> &Peer {
        &self.client
    }

    /// The peer accepting the connection.
    pub fn server(&self) -> &Peer {
        &self.server
    }

    /// The peer on one side.
    pub fn peer(&self, side: Side) -> &Peer {
        match side {
            Side::Client => &self.client,
            Side::Server => &self.server,
        }
    }

    /// The frames synthesized so far.
    pub fn packets(&self) -> &PacketStore {
        &self.packets
    }

    /// Consume the connection, keeping its frames.
    pub fn into_packets(self) -> PacketStore {
        self.packets
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Perform the three-way handshake.
    ///
    /// Records the client's SYN, the server's SYN-ACK and the client's ACK.
    pub fn connect(&mut self) -> Result<()> {
        if self.phase != Phase::Idle {
            net_debug!("connect in phase {:?}", self.phase);
        }
        self.phase = Phase::Handshaking;
        net_debug!(client = %self.client, server = %self.server, "connect");

        let syn = self.client.state()
            .segment(TcpFlags::SYN, TcpSeqNumber(0))
            .with_options(self.options.syn.clone());
        self.transmit(Side::Client, syn, &[], 1)?;

        let syn_ack = self.server.state()
            .segment(TcpFlags::SYN | TcpFlags::ACK, self.client.seq())
            .with_options(self.options.syn_ack.clone());
        self.transmit(Side::Server, syn_ack, &[], 1)?;

        for side in [Side::Client, Side::Server] {
            let options = self.options.ack.clone();
            let peer = self.peer_mut(side);
            let state = peer.state().clone().with_options(options);
            peer.replace(state);
        }

        let ack = self.client.state().segment(TcpFlags::ACK, self.server.seq());
        self.transmit(Side::Client, ack, &[], 0)?;

        self.phase = Phase::Established;
        Ok(())
    }

    /// Exchange `payload` from `sender` to the other side.
    ///
    /// Records the data segment and the acknowledgment of the other side. An empty payload still
    /// records both frames but does not advance any sequence number.
    pub fn send(&mut self, sender: Side, payload: &[u8]) -> Result<()> {
        if self.phase != Phase::Established {
            net_debug!("send in phase {:?}", self.phase);
        }
        let receiver = sender.opposite();
        net_debug!(sender = %self.peer(sender), len = payload.len(), "send");

        let data = self.peer(sender).state()
            .segment(TcpFlags::ACK, self.peer(receiver).seq());
        self.transmit(sender, data, payload, payload.len())?;

        let ack = self.peer(receiver).state()
            .segment(TcpFlags::ACK, self.peer(sender).seq());
        self.transmit(receiver, ack, &[], 0)
    }

    /// Close the connection from the client side.
    ///
    /// Records the client's FIN-ACK, the server's FIN-ACK and the client's final ACK.
    pub fn disconnect(&mut self) -> Result<()> {
        if self.phase != Phase::Established {
            net_debug!("disconnect in phase {:?}", self.phase);
        }
        self.phase = Phase::Closing;
        net_debug!(client = %self.client, server = %self.server, "disconnect");

        let fin = self.client.state()
            .segment(TcpFlags::FIN | TcpFlags::ACK, self.server.seq());
        self.transmit(Side::Client, fin, &[], 1)?;

        let fin = self.server.state()
            .segment(TcpFlags::FIN | TcpFlags::ACK, self.client.seq());
        self.transmit(Side::Server, fin, &[], 1)?;

        let ack = self.client.state().segment(TcpFlags::ACK, self.server.seq());
        self.transmit(Side::Client, ack, &[], 0)?;

        self.phase = Phase::Closed;
        Ok(())
    }

    fn peer_mut(&mut self, side: Side) -> &mut Peer {
        match side {
            Side::Client => &mut self.client,
            Side::Server => &mut self.server,
        }
    }

    /// Synthesize a frame of `side` in `state`, then commit the state advanced by `advance`.
    fn transmit(&mut self, side: Side, state: PeerState, payload: &[u8], advance: usize)
        -> Result<()>
    {
        let (sender, receiver) = match side {
            Side::Client => (&mut self.client, &self.server),
            Side::Server => (&mut self.server, &self.client),
        };
        let frame = synth::frame(sender, &state, receiver, payload)?;
        self.packets.push(frame);
        sender.replace(state.advanced(advance));
        Ok(())
    }
}
