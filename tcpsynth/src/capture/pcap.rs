//! The classic libpcap file format.
//!
//! A file is a 24 octet global header followed by records, each a 16 octet header and the
//! captured octets. The byte order of the writer is chosen by the magic number, readers accept
//! both byte orders as well as microsecond and nanosecond timestamps. Only Ethernet captures are
//! supported.
use std::io::{self, Read, Write};
use std::time::Duration;

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

use super::Captured;
use crate::conn::PacketStore;
use crate::error::{Error, Result};

/// Magic number of files with microsecond timestamps.
pub const MAGIC_MICROS: u32 = 0xa1b2_c3d4;
/// Magic number of files with nanosecond timestamps.
pub const MAGIC_NANOS: u32 = 0xa1b2_3c4d;
/// The link type of Ethernet II frames.
pub const LINKTYPE_ETHERNET: u32 = 1;
/// The snap length recorded by the writer.
pub const DEFAULT_SNAPLEN: u32 = 65535;
/// The distance between synthetic timestamps of [`write_store`].
///
/// [`write_store`]: fn.write_store.html
pub const FRAME_INTERVAL: Duration = Duration::from_millis(1);

const GLOBAL_HEADER_LEN: usize = 24;
const RECORD_HEADER_LEN: usize = 16;
/// Larger records are assumed to be corruption.
const MAX_RECORD_LEN: u32 = 1 << 18;

/// Writes frames as a little endian, microsecond resolution capture.
#[derive(Debug)]
pub struct Writer<W: Write> {
    inner: W,
}

/// Reads the records of a capture file.
#[derive(Debug)]
pub struct Reader<R: Read> {
    inner: R,
    big_endian: bool,
    nanos: bool,
    snaplen: u32,
}

impl<W: Write> Writer<W> {
    /// Write the global header and wrap `inner`.
    pub fn new(mut inner: W) -> io::Result<Self> {
        inner.write_u32::<LittleEndian>(MAGIC_MICROS)?;
        inner.write_u16::<LittleEndian>(2)?;
        inner.write_u16::<LittleEndian>(4)?;
        // thiszone and sigfigs
        inner.write_i32::<LittleEndian>(0)?;
        inner.write_u32::<LittleEndian>(0)?;
        inner.write_u32::<LittleEndian>(DEFAULT_SNAPLEN)?;
        inner.write_u32::<LittleEndian>(LINKTYPE_ETHERNET)?;
        Ok(Writer { inner })
    }

    /// Append one record captured at `timestamp` since the epoch.
    ///
    /// Frames longer than the snap length are truncated, keeping their original length.
    pub fn write_packet(&mut self, timestamp: Duration, data: &[u8]) -> io::Result<()> {
        let incl_len = data.len().min(DEFAULT_SNAPLEN as usize);
        self.inner.write_u32::<LittleEndian>(timestamp.as_secs() as u32)?;
        self.inner.write_u32::<LittleEndian>(timestamp.subsec_micros())?;
        self.inner.write_u32::<LittleEndian>(incl_len as u32)?;
        self.inner.write_u32::<LittleEndian>(data.len() as u32)?;
        self.inner.write_all(&data[..incl_len])
    }

    /// Append a record read from a capture, keeping its original length.
    pub fn write_captured(&mut self, packet: &Captured) -> io::Result<()> {
        let incl_len = packet.data.len().min(DEFAULT_SNAPLEN as usize);
        self.inner.write_u32::<LittleEndian>(packet.timestamp.as_secs() as u32)?;
        self.inner.write_u32::<LittleEndian>(packet.timestamp.subsec_micros())?;
        self.inner.write_u32::<LittleEndian>(incl_len as u32)?;
        self.inner.write_u32::<LittleEndian>(packet.original_len.max(incl_len) as u32)?;
        self.inner.write_all(&packet.data[..incl_len])
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Write all frames of a store into a new capture.
///
/// The timestamps are synthetic, starting at the epoch and [`FRAME_INTERVAL`] apart, so the same
/// store always yields the same file.
///
/// [`FRAME_INTERVAL`]: constant.FRAME_INTERVAL.html
pub fn write_store<W: Write>(inner: W, packets: &PacketStore) -> io::Result<W> {
    let mut writer = Writer::new(inner)?;
    let mut timestamp = Duration::ZERO;
    for frame in packets {
        writer.write_packet(timestamp, frame)?;
        timestamp += FRAME_INTERVAL;
    }
    net_debug!(frames = packets.len(), "wrote capture");
    writer.into_inner()
}

impl<R: Read> Reader<R> {
    /// Read and validate the global header.
    pub fn new(mut inner: R) -> Result<Self> {
        let mut header = [0; GLOBAL_HEADER_LEN];
        if !read_full(&mut inner, &mut header)? {
            return Err(Error::Capture("empty capture file".into()));
        }

        let (big_endian, nanos) = match LittleEndian::read_u32(&header[0..4]) {
            MAGIC_MICROS => (false, false),
            MAGIC_NANOS => (false, true),
            _ => match BigEndian::read_u32(&header[0..4]) {
                MAGIC_MICROS => (true, false),
                MAGIC_NANOS => (true, true),
                other => return Err(Error::Capture(
                    format!("not a pcap file, magic {:#010x}", other))),
            },
        };

        let mut reader = Reader { inner, big_endian, nanos, snaplen: 0 };
        let major = reader.u16(&header[4..6]);
        if major != 2 {
            return Err(Error::Capture(format!("unsupported pcap version {}", major)));
        }
        reader.snaplen = reader.u32(&header[16..20]);
        let linktype = reader.u32(&header[20..24]);
        if linktype != LINKTYPE_ETHERNET {
            return Err(Error::Capture(format!("unsupported link type {}", linktype)));
        }
        Ok(reader)
    }

    /// The snap length recorded in the file.
    pub fn snaplen(&self) -> u32 {
        self.snaplen
    }

    /// Read the next record, `None` at the end of the file.
    pub fn next_packet(&mut self) -> Result<Option<Captured>> {
        let mut header = [0; RECORD_HEADER_LEN];
        if !read_full(&mut self.inner, &mut header)? {
            return Ok(None);
        }

        let secs = self.u32(&header[0..4]);
        let fraction = self.u32(&header[4..8]);
        let incl_len = self.u32(&header[8..12]);
        let orig_len = self.u32(&header[12..16]);
        if incl_len > MAX_RECORD_LEN {
            return Err(Error::Capture(format!("record of {} octets", incl_len)));
        }

        let nanos = if self.nanos { fraction } else { fraction.saturating_mul(1000) };
        let mut data = vec![0; incl_len as usize];
        if !read_full(&mut self.inner, &mut data)? && incl_len > 0 {
            return Err(Error::Capture("truncated record".into()));
        }

        Ok(Some(Captured {
            timestamp: Duration::new(secs.into(), nanos),
            data,
            original_len: orig_len as usize,
        }))
    }

    fn u16(&self, buf: &[u8]) -> u16 {
        if self.big_endian { BigEndian::read_u16(buf) } else { LittleEndian::read_u16(buf) }
    }

    fn u32(&self, buf: &[u8]) -> u32 {
        if self.big_endian { BigEndian::read_u32(buf) } else { LittleEndian::read_u32(buf) }
    }
}

impl<R: Read> Iterator for Reader<R> {
    type Item = Result<Captured>;

    fn next(&mut self) -> Option<Result<Captured>> {
        self.next_packet().transpose()
    }
}

/// Fill `buf` completely.
///
/// Returns `Ok(false)` if the reader was at its end before the first octet, fails if it ends
/// somewhere in between.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(Error::Capture("unexpected end of capture file".into())),
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn global_header_layout() {
        let file = Writer::new(Vec::new()).unwrap().into_inner().unwrap();
        assert_eq!(file, [
            0xd4, 0xc3, 0xb2, 0xa1,
            0x02, 0x00, 0x04, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0xff, 0xff, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
        ]);
    }

    #[test]
    fn write_then_read() {
        let mut writer = Writer::new(Vec::new()).unwrap();
        writer.write_packet(Duration::new(3, 4_000), &[1, 2, 3]).unwrap();
        writer.write_packet(Duration::new(5, 0), &[]).unwrap();
        let file = writer.into_inner().unwrap();
        assert_eq!(file.len(), 24 + 16 + 3 + 16);

        let mut reader = Reader::new(&file[..]).unwrap();
        assert_eq!(reader.snaplen(), DEFAULT_SNAPLEN);
        let first = reader.next_packet().unwrap().unwrap();
        assert_eq!(first.timestamp, Duration::new(3, 4_000));
        assert_eq!(first.data, [1, 2, 3]);
        assert_eq!(first.original_len, 3);
        let second = reader.next_packet().unwrap().unwrap();
        assert!(second.data.is_empty());
        assert!(reader.next_packet().unwrap().is_none());
    }

    #[test]
    fn big_endian_nanosecond_file() {
        let mut file = vec![
            0xa1, 0xb2, 0x3c, 0x4d,
            0x00, 0x02, 0x00, 0x04,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x40,
            0x00, 0x00, 0x00, 0x01,
        ];
        file.extend_from_slice(&[
            0x00, 0x00, 0x00, 0x07,
            0x00, 0x00, 0x00, 0x09,
            0x00, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x00, 0x05,
            0xaa, 0xbb,
        ]);
        let packets: Vec<_> = Reader::new(&file[..]).unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(packets, [Captured {
            timestamp: Duration::new(7, 9),
            data: vec![0xaa, 0xbb],
            original_len: 5,
        }]);
    }

    #[test]
    fn reject_bad_magic() {
        let file = [0u8; 24];
        assert!(matches!(Reader::new(&file[..]), Err(Error::Capture(_))));
    }

    #[test]
    fn reject_other_link_type() {
        let mut file = Writer::new(Vec::new()).unwrap().into_inner().unwrap();
        file[20] = 113; // Linux cooked capture
        assert!(matches!(Reader::new(&file[..]), Err(Error::Capture(_))));
    }

    #[test]
    fn truncated_record() {
        let mut writer = Writer::new(Vec::new()).unwrap();
        writer.write_packet(Duration::ZERO, &[1, 2, 3, 4]).unwrap();
        let file = writer.into_inner().unwrap();
        let mut reader = Reader::new(&file[..file.len() - 1]).unwrap();
        assert!(matches!(reader.next_packet(), Err(Error::Capture(_))));
    }

    #[test]
    fn store_timestamps_increase() {
        let client = crate::Peer::new("00:00:5e:00:53:01", "192.0.2.1", 40000, 100).unwrap();
        let server = crate::Peer::new("00:00:5e:00:53:02", "192.0.2.2", 80, 500).unwrap();
        let mut conn = crate::Connection::new(client, server);
        conn.connect().unwrap();

        let file = write_store(Vec::new(), conn.packets()).unwrap();
        let packets: Vec<_> = Reader::new(&file[..]).unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(packets.len(), 3);
        for (i, (packet, frame)) in packets.iter().zip(conn.packets()).enumerate() {
            assert_eq!(packet.timestamp, FRAME_INTERVAL * i as u32);
            assert_eq!(packet.data, frame);
            assert_eq!(packet.original_len, frame.len());
        }
    }
}
