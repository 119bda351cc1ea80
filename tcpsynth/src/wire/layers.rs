use super::{
    ethernet_frame, ipv4_packet, tcp_packet,
    Checksum, Error, EthernetRepr, IpProtocol, Ipv4Repr, Result, TcpRepr};

/// A complete Ethernet/IPv4/TCP frame, one representation per layer plus the payload.
///
/// Serialization fixes up the length fields of the lower layers from the layers above them and
/// computes both checksums. The length and protocol fields of the given representations are
/// overwritten to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layers<'a> {
    /// The link layer header.
    pub ethernet: EthernetRepr,
    /// The network layer header.
    pub ipv4: Ipv4Repr,
    /// The transport layer header.
    pub tcp: TcpRepr,
    /// The application data carried by the segment.
    pub payload: &'a [u8],
}

impl Layers<'_> {
    /// The length of the serialized frame.
    ///
    /// Fails with `Exhausted` when the TCP options or the IPv4 total length overflow their
    /// fields.
    pub fn buffer_len(&self) -> Result<usize> {
        let tcp_len = self.tcp.header_len()? + self.payload.len();
        let ipv4 = self.ipv4_repr(tcp_len);
        let total_len = ipv4.total_len()?;
        Ok(self.ethernet.header_len() + usize::from(total_len))
    }

    /// Serialize all layers into a fresh buffer.
    ///
    /// Nothing is produced on error.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let len = self.buffer_len()?;
        let mut buffer = vec![0; len];
        self.emit(&mut buffer)?;
        Ok(buffer)
    }

    /// Serialize into a buffer of exactly [`buffer_len`] octets.
    ///
    /// [`buffer_len`]: #method.buffer_len
    pub fn emit(&self, buffer: &mut [u8]) -> Result<()> {
        if buffer.len() != self.buffer_len()? {
            return Err(Error::Truncated);
        }

        let mut ethernet = self.ethernet;
        ethernet.ethertype = super::EthernetProtocol::Ipv4;
        let frame = ethernet_frame::new_unchecked_mut(buffer);
        ethernet.emit(frame);

        let tcp_len = self.tcp.header_len()? + self.payload.len();
        let ipv4 = self.ipv4_repr(tcp_len);
        let packet = ipv4_packet::new_unchecked_mut(frame.payload_mut_slice());
        ipv4.emit(packet, Checksum::Manual);

        let segment = tcp_packet::new_unchecked_mut(packet.payload_mut_slice());
        let mut tcp = self.tcp.clone();
        tcp.payload_len = self.payload.len();
        tcp.emit(segment)?;
        segment.payload_mut_slice().copy_from_slice(self.payload);
        segment.fill_checksum(&ipv4.src_addr, &ipv4.dst_addr);
        Ok(())
    }

    fn ipv4_repr(&self, tcp_len: usize) -> Ipv4Repr {
        Ipv4Repr {
            protocol: IpProtocol::Tcp,
            payload_len: tcp_len,
            ..self.ipv4
        }
    }
}
