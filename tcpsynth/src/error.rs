use core::fmt;
use std::io;

use thiserror::Error;

use crate::wire;

/// Result type alias for connection synthesis.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced by peer construction, frame synthesis and the frame sinks.
///
/// The lifecycle operations of a connection can only fail through [`SerializationFailure`]. The
/// other variants belong to the transmission and capture collaborators.
///
/// [`SerializationFailure`]: #variant.SerializationFailure
#[derive(Error, Debug)]
pub enum Error {
    /// A hardware or network address given to a peer could not be parsed.
    #[error("invalid {kind} address {input:?}")]
    InvalidAddress {
        /// Which of the two addresses was rejected.
        kind: AddressKind,
        /// The rejected input, verbatim.
        input: String,
    },

    /// The header stack of a frame could not be assembled.
    #[error("frame serialization failed: {0}")]
    SerializationFailure(#[from] wire::Error),

    /// An operating system call of a frame sink or source failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// A capture was misconfigured or a capture file is not in a supported format.
    #[error("capture error: {0}")]
    Capture(String),
}

/// The address family of an [`Error::InvalidAddress`].
///
/// [`Error::InvalidAddress`]: enum.Error.html#variant.InvalidAddress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// A six-octet Ethernet address.
    Hardware,
    /// A dotted-quad IPv4 address.
    Network,
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AddressKind::Hardware => write!(f, "hardware"),
            AddressKind::Network => write!(f, "network"),
        }
    }
}
