use core::{fmt, ops, cmp};
use byteorder::{ByteOrder, NetworkEndian};

use super::{Checksum, Error, IpProtocol, Ipv4Address, Result};
use super::ip::checksum;

/// The maximum number of octets of options a TCP header can carry.
///
/// The data offset field counts 32-bit words in four bits, so at most 60 octets of header of
/// which the fixed part takes 20.
pub const MAX_OPTIONS_LEN: usize = 40;

/// A TCP sequence number.
///
/// A sequence number is a monotonically advancing integer modulo 2<sup>32</sup>.
/// Sequence numbers do not have a discontiguity when compared pairwise across a signed overflow.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct SeqNumber(pub i32);

impl SeqNumber {
    /// The sequence number as it appears on the wire.
    pub fn to_u32(self) -> u32 {
        self.0 as u32
    }
}

impl From<u32> for SeqNumber {
    fn from(value: u32) -> Self {
        SeqNumber(value as i32)
    }
}

impl From<SeqNumber> for u32 {
    fn from(value: SeqNumber) -> Self {
        value.to_u32()
    }
}

impl fmt::Display for SeqNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0 as u32)
    }
}

impl ops::Add<usize> for SeqNumber {
    type Output = SeqNumber;

    /// Advance the sequence number, wrapping modulo 2<sup>32</sup>.
    ///
    /// # Panics
    /// Advancing by more than half the sequence space is not meaningful and panics.
    fn add(self, rhs: usize) -> SeqNumber {
        if rhs > i32::MAX as usize {
            panic!("attempt to add to sequence number with unsigned overflow")
        }
        SeqNumber(self.0.wrapping_add(rhs as i32))
    }
}

impl ops::AddAssign<usize> for SeqNumber {
    fn add_assign(&mut self, rhs: usize) {
        *self = *self + rhs;
    }
}

impl ops::Sub for SeqNumber {
    type Output = usize;

    /// The distance from `rhs` forward to `self`.
    ///
    /// # Panics
    /// When `rhs` is ahead of `self`.
    fn sub(self, rhs: SeqNumber) -> usize {
        let result = self.0.wrapping_sub(rhs.0);
        if result < 0 {
            panic!("attempt to subtract sequence numbers with underflow")
        }
        result as usize
    }
}

impl cmp::PartialOrd for SeqNumber {
    fn partial_cmp(&self, other: &SeqNumber) -> Option<cmp::Ordering> {
        self.0.wrapping_sub(other.0).partial_cmp(&0)
    }
}

/// A set of tcp control flags.
///
/// The flags are independent bits and can be combined freely, `SYN | ACK` being the most common
/// combination.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flags(pub u16);

byte_wrapper! {
    /// A byte sequence representing a TCP segment.
    #[derive(Debug, PartialEq, Eq)]
    pub struct tcp([u8]);
}

mod field {
    #![allow(non_snake_case)]

    use crate::wire::field::Field;

    pub(crate) const SRC_PORT: Field = 0..2;
    pub(crate) const DST_PORT: Field = 2..4;
    pub(crate) const SEQ_NUM:  Field = 4..8;
    pub(crate) const ACK_NUM:  Field = 8..12;
    pub(crate) const FLAGS:    Field = 12..14;
    pub(crate) const WIN_SIZE: Field = 14..16;
    pub(crate) const CHECKSUM: Field = 16..18;
    pub(crate) const URGENT:   Field = 18..20;

    pub(crate) fn OPTIONS(length: u8) -> Field {
        URGENT.end..(length as usize)
    }

    pub(crate) const FLG_MASK: u16 = 0x1ff;
    pub(crate) const FLG_FIN: u16 = 0x001;
    pub(crate) const FLG_SYN: u16 = 0x002;
    pub(crate) const FLG_RST: u16 = 0x004;
    pub(crate) const FLG_PSH: u16 = 0x008;
    pub(crate) const FLG_ACK: u16 = 0x010;
    pub(crate) const FLG_URG: u16 = 0x020;

    pub(crate) const OPT_END: u8 = 0x00;
    pub(crate) const OPT_NOP: u8 = 0x01;
    pub(crate) const OPT_MSS: u8 = 0x02;
    pub(crate) const OPT_WS:  u8 = 0x03;
    pub(crate) const OPT_SACKPERM: u8 = 0x04;
    pub(crate) const OPT_SACKRNG:  u8 = 0x05;
    pub(crate) const OPT_TSTAMP:   u8 = 0x08;
}

impl tcp {
    /// Imbue a raw octet buffer with TCP segment structure.
    pub fn new_unchecked(buffer: &[u8]) -> &tcp {
        Self::__from_macro_new_unchecked(buffer)
    }

    /// Imbue a mutable octet buffer with TCP segment structure.
    pub fn new_unchecked_mut(buffer: &mut [u8]) -> &mut tcp {
        Self::__from_macro_new_unchecked_mut(buffer)
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(data: &[u8]) -> Result<&tcp> {
        let packet = Self::new_unchecked(data);
        packet.check_len()?;
        Ok(packet)
    }

    /// View the segment as a raw byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Ensure that no header accessor method will panic if called.
    /// Returns `Err(Error::Truncated)` if the buffer is too short.
    /// Returns `Err(Error::Malformed)` if the header length field has a value smaller
    /// than the minimal header length.
    ///
    /// The result of this check is invalidated by calling [set_header_len].
    ///
    /// [set_header_len]: #method.set_header_len
    pub fn check_len(&self) -> Result<()> {
        let len = self.0.len();
        if len < field::URGENT.end {
            Err(Error::Truncated)
        } else if (self.header_len() as usize) < field::URGENT.end {
            Err(Error::Malformed)
        } else if len < self.header_len() as usize {
            Err(Error::Truncated)
        } else {
            Ok(())
        }
    }

    /// Return the source port field.
    #[inline]
    pub fn src_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::SRC_PORT])
    }

    /// Return the destination port field.
    #[inline]
    pub fn dst_port(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::DST_PORT])
    }

    /// Return the sequence number field.
    #[inline]
    pub fn seq_number(&self) -> SeqNumber {
        SeqNumber(NetworkEndian::read_i32(&self.0[field::SEQ_NUM]))
    }

    /// Return the acknowledgement number field.
    ///
    /// The field is returned even when the ACK flag is clear.
    #[inline]
    pub fn ack_number(&self) -> SeqNumber {
        SeqNumber(NetworkEndian::read_i32(&self.0[field::ACK_NUM]))
    }

    /// Return the control flags.
    #[inline]
    pub fn flags(&self) -> Flags {
        let raw = NetworkEndian::read_u16(&self.0[field::FLAGS]);
        Flags(raw & field::FLG_MASK)
    }

    /// Return the header length, in octets.
    #[inline]
    pub fn header_len(&self) -> u8 {
        let raw = NetworkEndian::read_u16(&self.0[field::FLAGS]);
        ((raw >> 12) * 4) as u8
    }

    /// Return the window size field.
    #[inline]
    pub fn window_len(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::WIN_SIZE])
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::CHECKSUM])
    }

    /// Return the urgent pointer field.
    #[inline]
    pub fn urgent_at(&self) -> u16 {
        NetworkEndian::read_u16(&self.0[field::URGENT])
    }

    /// Return the raw options, including any padding.
    #[inline]
    pub fn options(&self) -> &[u8] {
        &self.0[field::OPTIONS(self.header_len())]
    }

    /// Return the payload following the header.
    #[inline]
    pub fn payload_slice(&self) -> &[u8] {
        &self.0[self.header_len() as usize..]
    }

    /// Validate the segment checksum over the IPv4 pseudo header.
    pub fn verify_checksum(&self, src_addr: &Ipv4Address, dst_addr: &Ipv4Address) -> bool {
        checksum::combine(&[
            checksum::pseudo_header(src_addr, dst_addr, IpProtocol::Tcp, self.0.len() as u16),
            checksum::data(&self.0)
        ]) == !0
    }

    /// Set the source port field.
    #[inline]
    pub fn set_src_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::SRC_PORT], value)
    }

    /// Set the destination port field.
    #[inline]
    pub fn set_dst_port(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::DST_PORT], value)
    }

    /// Set the sequence number field.
    #[inline]
    pub fn set_seq_number(&mut self, value: SeqNumber) {
        NetworkEndian::write_i32(&mut self.0[field::SEQ_NUM], value.0)
    }

    /// Set the acknowledgement number field.
    #[inline]
    pub fn set_ack_number(&mut self, value: SeqNumber) {
        NetworkEndian::write_i32(&mut self.0[field::ACK_NUM], value.0)
    }

    /// Set the control flags, keeping the header length.
    #[inline]
    pub fn set_flags(&mut self, Flags(flags): Flags) {
        let raw = NetworkEndian::read_u16(&self.0[field::FLAGS]);
        let raw = (raw & !field::FLG_MASK) | (flags & field::FLG_MASK);
        NetworkEndian::write_u16(&mut self.0[field::FLAGS], raw)
    }

    /// Set the header length, in octets, keeping the control flags.
    ///
    /// The reserved bits between data offset and flags are cleared.
    #[inline]
    pub fn set_header_len(&mut self, value: u8) {
        let raw = NetworkEndian::read_u16(&self.0[field::FLAGS]);
        let raw = (raw & field::FLG_MASK) | (u16::from(value / 4) << 12);
        NetworkEndian::write_u16(&mut self.0[field::FLAGS], raw)
    }

    /// Set the window size field.
    #[inline]
    pub fn set_window_len(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::WIN_SIZE], value)
    }

    /// Set the checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::CHECKSUM], value)
    }

    /// Set the urgent pointer field.
    #[inline]
    pub fn set_urgent_at(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.0[field::URGENT], value)
    }

    /// Return a mutable pointer to the options.
    #[inline]
    pub fn options_mut(&mut self) -> &mut [u8] {
        let range = field::OPTIONS(self.header_len());
        &mut self.0[range]
    }

    /// Return a mutable pointer to the payload data.
    #[inline]
    pub fn payload_mut_slice(&mut self) -> &mut [u8] {
        let header_len = self.header_len() as usize;
        &mut self.0[header_len..]
    }

    /// Compute and fill in the checksum over the segment and the IPv4 pseudo header.
    ///
    /// The whole underlying buffer is treated as the segment, header and payload must already be
    /// in place.
    pub fn fill_checksum(&mut self, src_addr: &Ipv4Address, dst_addr: &Ipv4Address) {
        self.set_checksum(0);
        let checksum = {
            !checksum::combine(&[
                checksum::pseudo_header(src_addr, dst_addr, IpProtocol::Tcp,
                                        self.0.len() as u16),
                checksum::data(&self.0)
            ])
        };
        self.set_checksum(checksum)
    }
}

impl AsRef<[u8]> for tcp {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Flags {
    /// No more data from the sender.
    pub const FIN: Flags = Flags(field::FLG_FIN);
    /// Synchronize sequence numbers.
    pub const SYN: Flags = Flags(field::FLG_SYN);
    /// Reset the connection.
    pub const RST: Flags = Flags(field::FLG_RST);
    /// Push function.
    pub const PSH: Flags = Flags(field::FLG_PSH);
    /// The acknowledgment field is significant.
    pub const ACK: Flags = Flags(field::FLG_ACK);
    /// The urgent pointer field is significant.
    pub const URG: Flags = Flags(field::FLG_URG);

    /// Check that every flag of `other` is set.
    #[inline]
    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set or clear all flags of `other`.
    #[inline]
    pub fn set(&mut self, other: Flags, value: bool) {
        if value {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }

    /// Return the FIN flag.
    #[inline]
    pub fn fin(self) -> bool {
        self.contains(Flags::FIN)
    }

    /// Return the SYN flag.
    #[inline]
    pub fn syn(self) -> bool {
        self.contains(Flags::SYN)
    }

    /// Return the RST flag.
    #[inline]
    pub fn rst(self) -> bool {
        self.contains(Flags::RST)
    }

    /// Return the PSH flag.
    #[inline]
    pub fn psh(self) -> bool {
        self.contains(Flags::PSH)
    }

    /// Return the ACK flag.
    #[inline]
    pub fn ack(self) -> bool {
        self.contains(Flags::ACK)
    }

    /// Set the FIN flag.
    #[inline]
    pub fn set_fin(&mut self, value: bool) {
        self.set(Flags::FIN, value)
    }

    /// Set the SYN flag.
    #[inline]
    pub fn set_syn(&mut self, value: bool) {
        self.set(Flags::SYN, value)
    }

    /// Set the ACK flag.
    #[inline]
    pub fn set_ack(&mut self, value: bool) {
        self.set(Flags::ACK, value)
    }

    /// Return the length of a control flag, in terms of sequence space.
    pub fn sequence_len(self) -> usize {
        usize::from(self.syn()) + usize::from(self.fin())
    }
}

impl ops::BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Flags({})", self)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = [
            (Flags::SYN, "syn"),
            (Flags::ACK, "ack"),
            (Flags::FIN, "fin"),
            (Flags::RST, "rst"),
            (Flags::PSH, "psh"),
            (Flags::URG, "urg"),
        ];
        let mut first = true;
        for (flag, name) in names.iter() {
            if self.contains(*flag) {
                if !first { f.write_str("|")? }
                f.write_str(name)?;
                first = false;
            }
        }
        let other = self.0 & !0x3f;
        if other != 0 {
            if !first { f.write_str("|")? }
            write!(f, "0x{:03x}", other)?;
            first = false;
        }
        if first {
            f.write_str("-")?;
        }
        Ok(())
    }
}

/// A representation of a single TCP option.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum TcpOption {
    /// Marks the end of the option list, also used as padding.
    EndOfList,
    /// A single octet of alignment.
    NoOperation,
    /// The largest segment the sender is willing to receive.
    MaxSegmentSize(u16),
    /// The shift count of the window scaling.
    WindowScale(u8),
    /// Selective acknowledgments are supported by the sender.
    SackPermitted,
    /// Selectively acknowledged ranges, left and right edge each.
    SackRange(Vec<(u32, u32)>),
    /// RFC 7323 timestamps.
    Timestamps {
        /// The sender's timestamp clock.
        value: u32,
        /// The most recent timestamp received from the peer.
        echo_reply: u32,
    },
    /// Any other option, emitted as kind, length and the data as given.
    Unknown {
        /// The option kind.
        kind: u8,
        /// The option data, excluding kind and length octets.
        data: Vec<u8>,
    },
}

impl TcpOption {
    /// Parse one option from the front of `buffer`, returning the rest.
    pub fn parse(buffer: &[u8]) -> Result<(&[u8], TcpOption)> {
        let (length, option);
        match *buffer.first().ok_or(Error::Truncated)? {
            field::OPT_END => {
                length = 1;
                option = TcpOption::EndOfList;
            }
            field::OPT_NOP => {
                length = 1;
                option = TcpOption::NoOperation;
            }
            kind => {
                length = *buffer.get(1).ok_or(Error::Truncated)? as usize;
                if length < 2 {
                    return Err(Error::Malformed)
                }
                let data = buffer.get(2..length).ok_or(Error::Truncated)?;
                option = match (kind, length) {
                    (field::OPT_MSS, 4) =>
                        TcpOption::MaxSegmentSize(NetworkEndian::read_u16(data)),
                    (field::OPT_MSS, _) =>
                        return Err(Error::Malformed),
                    (field::OPT_WS, 3) =>
                        TcpOption::WindowScale(data[0]),
                    (field::OPT_WS, _) =>
                        return Err(Error::Malformed),
                    (field::OPT_SACKPERM, 2) =>
                        TcpOption::SackPermitted,
                    (field::OPT_SACKPERM, _) =>
                        return Err(Error::Malformed),
                    (field::OPT_SACKRNG, n) => {
                        if n < 10 || (n - 2) % 8 != 0 {
                            return Err(Error::Malformed)
                        }
                        // RFC 2018: Each contiguous block of data queued at the data receiver is
                        // defined in the SACK option by two 32-bit unsigned integers in network
                        // byte order[...]
                        let ranges = data
                            .chunks_exact(8)
                            .map(|block| (
                                NetworkEndian::read_u32(&block[..4]),
                                NetworkEndian::read_u32(&block[4..]),
                            ))
                            .collect();
                        TcpOption::SackRange(ranges)
                    },
                    (field::OPT_TSTAMP, 10) =>
                        TcpOption::Timestamps {
                            value: NetworkEndian::read_u32(&data[..4]),
                            echo_reply: NetworkEndian::read_u32(&data[4..]),
                        },
                    (field::OPT_TSTAMP, _) =>
                        return Err(Error::Malformed),
                    (_, _) =>
                        TcpOption::Unknown { kind, data: data.to_vec() },
                };
            }
        }
        Ok((&buffer[length..], option))
    }

    /// The number of octets this option occupies in the header.
    pub fn buffer_len(&self) -> usize {
        match self {
            TcpOption::EndOfList => 1,
            TcpOption::NoOperation => 1,
            TcpOption::MaxSegmentSize(_) => 4,
            TcpOption::WindowScale(_) => 3,
            TcpOption::SackPermitted => 2,
            TcpOption::SackRange(ranges) => ranges.len() * 8 + 2,
            TcpOption::Timestamps { .. } => 10,
            TcpOption::Unknown { data, .. } => 2 + data.len(),
        }
    }

    /// Check that the option can be written such that it parses back.
    ///
    /// Unknown options must not use the single octet kinds and no option may be longer than its
    /// one octet length field can describe.
    pub fn check(&self) -> Result<()> {
        match self {
            TcpOption::Unknown { kind: field::OPT_END, .. }
            | TcpOption::Unknown { kind: field::OPT_NOP, .. } => Err(Error::Malformed),
            _ if self.buffer_len() > usize::from(u8::MAX) => Err(Error::Exhausted),
            _ => Ok(()),
        }
    }

    /// Emit the option to the front of `buffer`, returning the rest.
    ///
    /// Fails with the error of [`check`], or with `Truncated` if `buffer` is shorter than
    /// [`buffer_len`]. Nothing is written on error.
    ///
    /// [`check`]: #method.check
    /// [`buffer_len`]: #method.buffer_len
    pub fn emit<'b>(&self, buffer: &'b mut [u8]) -> Result<&'b mut [u8]> {
        self.check()?;
        let length = self.buffer_len();
        if buffer.len() < length {
            return Err(Error::Truncated)
        }
        match self {
            TcpOption::EndOfList => buffer[0] = field::OPT_END,
            TcpOption::NoOperation => buffer[0] = field::OPT_NOP,
            TcpOption::MaxSegmentSize(value) => {
                buffer[0] = field::OPT_MSS;
                NetworkEndian::write_u16(&mut buffer[2..4], *value)
            }
            TcpOption::WindowScale(value) => {
                buffer[0] = field::OPT_WS;
                buffer[2] = *value;
            }
            TcpOption::SackPermitted => {
                buffer[0] = field::OPT_SACKPERM;
            }
            TcpOption::SackRange(ranges) => {
                buffer[0] = field::OPT_SACKRNG;
                for (i, (left, right)) in ranges.iter().enumerate() {
                    let pos = i * 8 + 2;
                    NetworkEndian::write_u32(&mut buffer[pos..pos + 4], *left);
                    NetworkEndian::write_u32(&mut buffer[pos + 4..pos + 8], *right);
                }
            }
            TcpOption::Timestamps { value, echo_reply } => {
                buffer[0] = field::OPT_TSTAMP;
                NetworkEndian::write_u32(&mut buffer[2..6], *value);
                NetworkEndian::write_u32(&mut buffer[6..10], *echo_reply);
            }
            TcpOption::Unknown { kind, data } => {
                buffer[0] = *kind;
                buffer[2..length].copy_from_slice(data)
            }
        }
        if length > 1 {
            buffer[1] = length as u8;
        }
        Ok(&mut buffer[length..])
    }
}

impl fmt::Display for TcpOption {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TcpOption::EndOfList => write!(f, "eol"),
            TcpOption::NoOperation => write!(f, "nop"),
            TcpOption::MaxSegmentSize(value) => write!(f, "mss={}", value),
            TcpOption::WindowScale(value) => write!(f, "ws={}", value),
            TcpOption::SackPermitted => write!(f, "sACK"),
            TcpOption::SackRange(ranges) => write!(f, "sACKr{:?}", ranges),
            TcpOption::Timestamps { value, echo_reply } =>
                write!(f, "ts={}/{}", value, echo_reply),
            TcpOption::Unknown { kind, .. } => write!(f, "opt({})", kind),
        }
    }
}

/// A high-level representation of a Transmission Control Protocol header.
///
/// Unlike a stack that derives the header from its connection state, every field is taken as
/// given: the flags are written verbatim and the acknowledgment field is emitted even when the
/// ACK flag is clear.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Repr {
    /// The sending port.
    pub src_port:     u16,
    /// The receiving port.
    pub dst_port:     u16,
    /// The control flags.
    pub flags:        Flags,
    /// The sequence number of the first octet of the segment.
    pub seq_number:   SeqNumber,
    /// The acknowledgment field.
    pub ack_number:   SeqNumber,
    /// The receive window.
    pub window_len:   u16,
    /// The options, in order, or `None` for a header without an options field.
    ///
    /// Parsing yields `None` for a header without options and stops at the first end-of-list
    /// option, which is not included.
    pub options:      Option<Vec<TcpOption>>,
    /// The length of the payload following the header.
    pub payload_len:  usize,
}

impl Repr {
    /// Parse a Transmission Control Protocol segment and return a high-level representation.
    ///
    /// The checksum is verified against the pseudo header of the given addresses when
    /// `checksum` is `Manual`.
    pub fn parse(
        packet: &tcp,
        src_addr: &Ipv4Address,
        dst_addr: &Ipv4Address,
        checksum: Checksum,
    ) -> Result<Repr> {
        packet.check_len()?;

        if checksum.manual() && !packet.verify_checksum(src_addr, dst_addr) {
            return Err(Error::WrongChecksum)
        }

        let options = if packet.header_len() as usize > field::URGENT.end {
            let mut list = Vec::new();
            let mut rest = packet.options();
            while !rest.is_empty() {
                let (next, option) = TcpOption::parse(rest)?;
                if option == TcpOption::EndOfList {
                    break;
                }
                list.push(option);
                rest = next;
            }
            Some(list)
        } else {
            None
        };

        Ok(Repr {
            src_port:     packet.src_port(),
            dst_port:     packet.dst_port(),
            flags:        packet.flags(),
            seq_number:   packet.seq_number(),
            ack_number:   packet.ack_number(),
            window_len:   packet.window_len(),
            options,
            payload_len:  packet.payload_slice().len(),
        })
    }

    /// Return the number of option octets, before padding.
    pub fn options_len(&self) -> usize {
        self.options
            .iter()
            .flatten()
            .map(TcpOption::buffer_len)
            .sum()
    }

    /// Return the length of a header that will be emitted from this high-level representation.
    ///
    /// The TCP header length is a multiple of 4. Returns `Err(Error::Exhausted)` when the options
    /// do not fit into the data offset and the error of [`TcpOption::check`] for an option that
    /// can not be written.
    ///
    /// [`TcpOption::check`]: enum.TcpOption.html#method.check
    pub fn header_len(&self) -> Result<usize> {
        for option in self.options.iter().flatten() {
            option.check()?;
        }
        let options_len = self.options_len();
        if options_len > MAX_OPTIONS_LEN {
            return Err(Error::Exhausted)
        }
        let padded = (options_len + 3) / 4 * 4;
        Ok(field::URGENT.end + padded)
    }

    /// Return the length of the segment, in terms of sequence space.
    pub fn sequence_len(&self) -> usize {
        self.payload_len + self.flags.sequence_len()
    }

    /// Emit a high-level representation into a Transmission Control Protocol header.
    ///
    /// Options are written in order and the rest of the options field is padded with
    /// end-of-list octets. The checksum is left zero, use [`fill_checksum`] once the payload is
    /// in place.
    ///
    /// [`fill_checksum`]: struct.tcp_packet.html#method.fill_checksum
    pub fn emit(&self, packet: &mut tcp) -> Result<()> {
        let header_len = self.header_len()?;
        if packet.as_bytes().len() < header_len {
            return Err(Error::Truncated)
        }
        packet.set_src_port(self.src_port);
        packet.set_dst_port(self.dst_port);
        packet.set_seq_number(self.seq_number);
        packet.set_ack_number(self.ack_number);
        packet.set_header_len(header_len as u8);
        packet.set_flags(self.flags);
        packet.set_window_len(self.window_len);
        packet.set_checksum(0);
        packet.set_urgent_at(0);

        let mut options = packet.options_mut();
        for option in self.options.iter().flatten() {
            let tmp = options; options = option.emit(tmp)?;
        }
        for padding in options.iter_mut() {
            *padding = field::OPT_END;
        }
        Ok(())
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TCP src={} dst={} [{}] seq={}",
               self.src_port, self.dst_port, self.flags, self.seq_number)?;
        if self.flags.ack() {
            write!(f, " ack={}", self.ack_number)?;
        }
        write!(f, " win={} len={}", self.window_len, self.payload_len)?;
        for option in self.options.iter().flatten() {
            write!(f, " {}", option)?;
        }
        Ok(())
    }
}
