//! Classic BPF programs as capture filters.
//!
//! Programs are compiled with the NetBSD bpfjit. They come either as the binary array of
//! `struct sock_filter` that `setsockopt(SO_ATTACH_FILTER)` takes, or as the decimal text printed by
//! `tcpdump -ddd`:
//!
//! ```text
//! 4
//! 40 0 0 12
//! 21 0 1 2054
//! 6 0 0 262144
//! 6 0 0 0
//! ```
//!
//! In the text form instructions are separated by newlines or commas and the leading instruction
//! count is optional.
use core::fmt;
use core::str::FromStr;

use bpfjit_sys::{BpfJit, Opcode};

use super::Filter;
use crate::error::{Error, Result};

/// Size of one `struct sock_filter`.
const OPCODE_SIZE: usize = 8;

/// A compiled classic BPF program.
///
/// A frame matches when the program returns a non-zero snap length for it.
#[derive(Clone)]
pub struct BpfFilter {
    jit: BpfJit,
}

impl BpfFilter {
    /// Compile a program from its instructions.
    pub fn from_opcodes(opcodes: &[Opcode]) -> Result<Self> {
        if opcodes.is_empty() {
            return Err(Error::Capture("empty filter program".into()));
        }
        let jit = BpfJit::raw(opcodes)
            .map_err(|err| Error::Capture(format!("invalid filter program: {}", err)))?;
        net_debug!("compiled filter program of {} instructions", opcodes.len());
        Ok(BpfFilter { jit })
    }

    /// Compile a native endian array of `(u16, u8, u8, u32)` instructions.
    pub fn from_binary(program: &[u8]) -> Result<Self> {
        if program.len() % OPCODE_SIZE != 0 {
            return Err(Error::Capture(format!(
                "filter program of {} octets is not a multiple of {}",
                program.len(), OPCODE_SIZE)));
        }

        let opcodes: Vec<Opcode> = program.chunks_exact(OPCODE_SIZE)
            .map(|raw| Opcode(
                u16::from_ne_bytes([raw[0], raw[1]]),
                raw[2],
                raw[3],
                u32::from_ne_bytes([raw[4], raw[5], raw[6], raw[7]])))
            .collect();
        Self::from_opcodes(&opcodes)
    }
}

fn parse_opcode(line: &str) -> Result<Opcode> {
    let invalid = || Error::Capture(format!("invalid filter instruction {:?}", line));
    let mut fields = line.split_whitespace();
    let mut next = || fields.next().ok_or_else(invalid);

    let code = next()?.parse::<u16>().map_err(|_| invalid())?;
    let jt = next()?.parse::<u8>().map_err(|_| invalid())?;
    let jf = next()?.parse::<u8>().map_err(|_| invalid())?;
    // `ret #-1` is printed with a sign by some tools.
    let k = next()?.parse::<i64>().map_err(|_| invalid())?;
    if fields.next().is_some() || k < i64::from(i32::MIN) || k > i64::from(u32::MAX) {
        return Err(invalid());
    }

    Ok(Opcode(code, jt, jf, k as u32))
}

impl FromStr for BpfFilter {
    type Err = Error;

    fn from_str(program: &str) -> Result<Self> {
        let mut lines: Vec<&str> = program.split(|c| c == ',' || c == '\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        if let Some(count) = lines.first().and_then(|line| line.parse::<usize>().ok()) {
            if count != lines.len() - 1 {
                return Err(Error::Capture(format!(
                    "filter program announces {} instructions but has {}",
                    count, lines.len() - 1)));
            }
            lines.remove(0);
        }

        let opcodes = lines.into_iter()
            .map(parse_opcode)
            .collect::<Result<Vec<_>>>()?;
        Self::from_opcodes(&opcodes)
    }
}

impl Filter for BpfFilter {
    fn matches(&self, frame: &[u8]) -> bool {
        self.jit.matches(frame.into())
    }
}

impl fmt::Debug for BpfFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BpfFilter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Connection, Peer, Side};

    /// `tcp port 80` for IPv4 over Ethernet, unfragmented.
    const TCP_PORT_80: &str = "\
        40 0 0 12,21 0 10 2048,48 0 0 23,21 0 8 6,40 0 0 20,69 6 0 8191,\
        177 0 0 14,72 0 0 14,21 2 0 80,72 0 0 16,21 0 1 80,6 0 0 262144,6 0 0 0";

    /// `arp`, as in the Linux socket filter documentation.
    const ARP: &str = "4\n40 0 0 12\n21 0 1 2054\n6 0 0 -1\n6 0 0 0\n";

    // An ARP request for 192.168.178.39 from 192.168.178.1.
    const ARP_FRAME: &[u8] = b"\
        \xff\xff\xff\xff\xff\xff\x02\x00\x00\x00\x00\x01\x08\x06\
        \x00\x01\x08\x00\x06\x04\x00\x01\x02\x00\x00\x00\x00\x01\xc0\xa8\
        \xb2\x01\x00\x00\x00\x00\x00\x00\xc0\xa8\xb2\x27";

    fn script(server_port: u16) -> Connection {
        let client = Peer::new("00:00:5e:00:53:01", "192.0.2.1", 40000, 100).unwrap();
        let server = Peer::new("00:00:5e:00:53:02", "192.0.2.2", server_port, 500).unwrap();
        let mut conn = Connection::new(client, server);
        conn.connect().unwrap();
        conn.send(Side::Client, b"abc").unwrap();
        conn.disconnect().unwrap();
        conn
    }

    #[test]
    fn port_program_keeps_script() {
        let filter: BpfFilter = TCP_PORT_80.parse().unwrap();
        let http = script(80);
        let https = script(443);

        for frame in http.packets().iter() {
            assert!(filter.matches(frame));
        }
        for frame in https.packets().iter() {
            assert!(!filter.matches(frame));
        }
        assert!(!filter.matches(ARP_FRAME));
        assert!(!filter.matches(&[]));
    }

    #[test]
    fn arp_program_with_count() {
        let filter: BpfFilter = ARP.parse().unwrap();
        assert!(filter.matches(ARP_FRAME));
        assert!(!filter.matches(&script(80).packets()[0]));
    }

    #[test]
    fn binary_program() {
        let mut program = Vec::new();
        let arp = [(0x28u16, 0u8, 0u8, 12u32), (0x15, 0, 1, 0x806), (0x06, 0, 0, 1), (0x06, 0, 0, 0)];
        for &(code, jt, jf, k) in &arp {
            program.extend_from_slice(&code.to_ne_bytes());
            program.extend_from_slice(&[jt, jf]);
            program.extend_from_slice(&k.to_ne_bytes());
        }
        let filter = BpfFilter::from_binary(&program).unwrap();
        assert!(filter.matches(ARP_FRAME));

        program.pop();
        assert!(matches!(BpfFilter::from_binary(&program), Err(Error::Capture(_))));
    }

    #[test]
    fn malformed_text() {
        for program in &["", "40 0 0", "40 0 0 12 7", "3\n6 0 0 0", "6 0 0 4294967296", "ret #0"] {
            assert!(
                matches!(program.parse::<BpfFilter>(), Err(Error::Capture(_))),
                "{:?} should be rejected", program);
        }
    }
}
