//! Synthesis of complete, scripted TCP connections as Ethernet frames.
//!
//! ## Table of contents
//!
//! 1. [Design](#design)
//! 2. [The wire module](wire/index.html)
//! 3. [Connections and peers](conn/index.html)
//! 4. [Sending frames on an interface](nic/index.html)
//! 5. [Capturing and recording frames](capture/index.html)
//!
//! ## Design
//!
//! Nothing in here runs a network stack. A [`Connection`] owns two [`Peer`]s and a script is a
//! sequence of calls to [`Connection::connect`], [`Connection::send`] and
//! [`Connection::disconnect`]. Each call advances the sequence and acknowledgment numbers of the
//! peers exactly as a well-behaved TCP implementation would and records one frame per protocol
//! event in a [`PacketStore`]. The frames are complete: Ethernet II, IPv4 and TCP headers with
//! correct lengths and checksums, followed by the payload if there is any.
//!
//! The result is deterministic. The same peers, options and script always produce the same bytes,
//! which makes the store suitable for injection through a raw socket, for writing into a pcap
//! file, or as a fixture in conformance tests of some other TCP implementation.
//!
//! ```
//! use tcpsynth::{Connection, Peer, Side};
//!
//! let client = Peer::new("00:00:5e:00:53:01", "192.0.2.1", 40000, 100)?;
//! let server = Peer::new("00:00:5e:00:53:02", "192.0.2.2", 80, 500)?;
//! let mut conn = Connection::new(client, server);
//!
//! conn.connect()?;
//! conn.send(Side::Client, b"abc")?;
//! conn.disconnect()?;
//!
//! assert_eq!(conn.packets().len(), 8);
//! # Ok::<(), tcpsynth::Error>(())
//! ```
//!
//! [`Connection`]: conn/struct.Connection.html
//! [`Connection::connect`]: conn/struct.Connection.html#method.connect
//! [`Connection::send`]: conn/struct.Connection.html#method.send
//! [`Connection::disconnect`]: conn/struct.Connection.html#method.disconnect
//! [`Peer`]: conn/struct.Peer.html
//! [`PacketStore`]: conn/struct.PacketStore.html
#![warn(missing_docs)]
#![warn(unreachable_pub)]

#[macro_use] mod macros;
pub mod capture;
pub mod conn;
mod error;
#[cfg(all(feature = "sys", target_os = "linux"))]
pub mod nic;
pub mod wire;

pub use self::conn::{Connection, Peer, PacketStore, PhaseOptions, Side};
pub use self::error::{AddressKind, Error, Result};
