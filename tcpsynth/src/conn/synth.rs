//! Assembly of single frames from peer state.
use super::{Peer, PeerState, PacketStore};
use crate::error::Result;
use crate::wire::{
    EthernetProtocol, EthernetRepr, IpProtocol, Ipv4Repr, Layers, TcpRepr};

/// The receive window advertised in every segment.
pub const WINDOW_LEN: u16 = 64000;

/// The time to live of every datagram.
pub const HOP_LIMIT: u8 = 64;

/// The identification of every datagram.
pub const IDENT: u16 = 1;

/// Serialize one frame from `sender` to `receiver` and append it to `store`.
///
/// The frame carries the sender's current protocol state. On error the store is left untouched.
pub fn synthesize(
    sender: &Peer,
    receiver: &Peer,
    payload: &[u8],
    store: &mut PacketStore,
) -> Result<()> {
    let frame = frame(sender, sender.state(), receiver, payload)?;
    store.push(frame);
    Ok(())
}

/// Serialize one frame as if `sender` was in `state`.
pub(crate) fn frame(
    sender: &Peer,
    state: &PeerState,
    receiver: &Peer,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let layers = Layers {
        ethernet: EthernetRepr {
            src_addr: sender.hardware_addr(),
            dst_addr: receiver.hardware_addr(),
            ethertype: EthernetProtocol::Ipv4,
        },
        ipv4: Ipv4Repr {
            src_addr: sender.ip_addr(),
            dst_addr: receiver.ip_addr(),
            protocol: IpProtocol::Tcp,
            payload_len: 0,
            hop_limit: HOP_LIMIT,
            ident: IDENT,
            dont_frag: true,
        },
        tcp: TcpRepr {
            src_port: sender.port(),
            dst_port: receiver.port(),
            flags: state.flags,
            seq_number: state.seq,
            ack_number: state.ack,
            window_len: WINDOW_LEN,
            options: state.options.clone(),
            payload_len: payload.len(),
        },
        payload,
    };

    let frame = layers.serialize()?;
    net_trace!(
        sender = %sender,
        receiver = %receiver,
        flags = %state.flags,
        seq = %state.seq,
        ack = %state.ack,
        len = payload.len(),
        "synthesized frame of {} octets", frame.len());
    Ok(frame)
}
