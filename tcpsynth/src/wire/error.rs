use core::fmt;

/// The error type for parsing and emitting frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A packet could not be parsed because it was shorter than assumed.
    ///
    /// The packet may be shorter than the minimum length specified, a size longer than the actual
    /// payload. For variable length packets, this may be because some of its fields were out of
    /// bounds of the received data.
    Truncated,

    /// A packet had an incorrect checksum.
    WrongChecksum,

    /// A packet could not be recognized.
    ///
    /// E.g. an Ethernet frame with an EtherType other than IPv4, or an IPv4 packet not carrying
    /// TCP, when a TCP segment was expected.
    Unrecognized,

    /// A packet was recognized but was self-contradictory.
    ///
    /// Examples: a TCP option whose length field disagrees with its kind; an IPv4 header length
    /// larger than its total length.
    Malformed,

    /// The content of a packet does not fit into its length fields.
    ///
    /// Emitting TCP options longer than the 40 octets a data offset can describe, or an IPv4
    /// datagram longer than 65535 octets, fails with this.
    Exhausted,
}

/// The result type for the wire codecs.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Truncated     => write!(f, "truncated packet"),
            Error::WrongChecksum => write!(f, "checksum error"),
            Error::Unrecognized  => write!(f, "unrecognized packet"),
            Error::Malformed     => write!(f, "malformed packet"),
            Error::Exhausted     => write!(f, "header fields exhausted"),
        }
    }
}

impl std::error::Error for Error {}
