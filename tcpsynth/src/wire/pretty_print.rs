//! Human readable dumps of raw frames.
//!
//! Each supported layer implements [`PrettyPrint`], printing its own header on one line and then
//! descending into the payload with an increased indentation. Errors of a layer are printed in
//! place of its header and end the dump.
//!
//! ```
//! use tcpsynth::wire::{ethernet_frame, PrettyPrinter};
//! # let frame = [0u8; 14];
//! let dump = PrettyPrinter::<ethernet_frame>::new("", &frame);
//! println!("{}", dump);
//! ```
//!
//! [`PrettyPrint`]: trait.PrettyPrint.html
use core::fmt;
use core::marker::PhantomData;

use super::{
    ethernet_frame, ipv4_packet, tcp_packet,
    Checksum, EthernetProtocol, EthernetRepr, IpProtocol, Ipv4Repr, TcpRepr};

/// Indentation state of a dump.
#[derive(Debug, Clone, Copy)]
pub struct PrettyIndent<'a> {
    prefix: &'a str,
    level: usize,
}

impl<'a> PrettyIndent<'a> {
    /// Create an indentation state with a prefix on every line.
    pub fn new(prefix: &'a str) -> Self {
        PrettyIndent { prefix, level: 0 }
    }

    /// Start a new line one level deeper.
    pub fn increase(self, f: &mut fmt::Formatter) -> Result<Self, fmt::Error> {
        writeln!(f)?;
        Ok(PrettyIndent { prefix: self.prefix, level: self.level + 1 })
    }
}

impl fmt::Display for PrettyIndent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.level == 0 {
            write!(f, "{}", self.prefix)
        } else {
            write!(f, "{}{:width$}\\ ", self.prefix, "", width = self.level * 2 - 2)
        }
    }
}

/// A layer that knows how to dump itself and its payload.
pub trait PrettyPrint {
    /// Write a description of the layer in `buffer`.
    fn pretty_print(buffer: &[u8], f: &mut fmt::Formatter, indent: PrettyIndent) -> fmt::Result;
}

/// Displays a buffer as the layer `T`.
pub struct PrettyPrinter<'a, T: PrettyPrint + ?Sized> {
    prefix: &'static str,
    buffer: &'a [u8],
    phantom: PhantomData<T>,
}

impl<'a, T: PrettyPrint + ?Sized> PrettyPrinter<'a, T> {
    /// Format `buffer` as `T`, every line starting with `prefix`.
    pub fn new(prefix: &'static str, buffer: &'a [u8]) -> Self {
        PrettyPrinter { prefix, buffer, phantom: PhantomData }
    }
}

impl<T: PrettyPrint + ?Sized> fmt::Display for PrettyPrinter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        T::pretty_print(self.buffer, f, PrettyIndent::new(self.prefix))
    }
}

fn format_checksum(f: &mut fmt::Formatter, correct: bool) -> fmt::Result {
    if !correct {
        write!(f, " (checksum incorrect)")
    } else {
        Ok(())
    }
}

impl PrettyPrint for ethernet_frame {
    fn pretty_print(buffer: &[u8], f: &mut fmt::Formatter, indent: PrettyIndent) -> fmt::Result {
        let frame = match ethernet_frame::new_checked(buffer) {
            Err(err) => return write!(f, "{}({})", indent, err),
            Ok(frame) => frame,
        };
        let repr = match EthernetRepr::parse(frame) {
            Err(err) => return write!(f, "{}({})", indent, err),
            Ok(repr) => repr,
        };
        write!(f, "{}{}", indent, repr)?;

        match repr.ethertype {
            EthernetProtocol::Ipv4 => {
                let indent = indent.increase(f)?;
                ipv4_packet::pretty_print(frame.payload_slice(), f, indent)
            }
            _ => Ok(()),
        }
    }
}

impl PrettyPrint for ipv4_packet {
    fn pretty_print(buffer: &[u8], f: &mut fmt::Formatter, indent: PrettyIndent) -> fmt::Result {
        let packet = match ipv4_packet::new_checked(buffer) {
            Err(err) => return write!(f, "{}({})", indent, err),
            Ok(packet) => packet,
        };
        let repr = match Ipv4Repr::parse(packet, Checksum::Ignored) {
            Err(err) => return write!(f, "{}({})", indent, err),
            Ok(repr) => repr,
        };
        write!(f, "{}{}", indent, repr)?;
        format_checksum(f, packet.verify_checksum())?;

        match repr.protocol {
            IpProtocol::Tcp => {
                let indent = indent.increase(f)?;
                let segment = match tcp_packet::new_checked(packet.payload_slice()) {
                    Err(err) => return write!(f, "{}({})", indent, err),
                    Ok(segment) => segment,
                };
                let tcp = TcpRepr::parse(segment, &repr.src_addr, &repr.dst_addr, Checksum::Ignored);
                match tcp {
                    Err(err) => write!(f, "{}({})", indent, err),
                    Ok(tcp) => {
                        write!(f, "{}{}", indent, tcp)?;
                        format_checksum(f, segment.verify_checksum(&repr.src_addr, &repr.dst_addr))
                    }
                }
            }
            _ => Ok(()),
        }
    }
}

impl PrettyPrint for tcp_packet {
    fn pretty_print(buffer: &[u8], f: &mut fmt::Formatter, indent: PrettyIndent) -> fmt::Result {
        let segment = match tcp_packet::new_checked(buffer) {
            Err(err) => return write!(f, "{}({})", indent, err),
            Ok(segment) => segment,
        };
        // Without addresses the checksum can not be checked.
        let unspecified = super::Ipv4Address::UNSPECIFIED;
        match TcpRepr::parse(segment, &unspecified, &unspecified, Checksum::Ignored) {
            Err(err) => write!(f, "{}({})", indent, err),
            Ok(repr) => write!(f, "{}{}", indent, repr),
        }
    }
}
