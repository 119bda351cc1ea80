//! Reading frames back from capture files and live interfaces.
//!
//! A [`Listener`] opens a [`Source`], passes every frame that matches its [`Filter`] to a
//! [`PacketHandler`] and stops at the first of its bounds: a number of delivered frames, an
//! elapsed time, or the end of a file. A [`TimerHandler`] can additionally be called
//! periodically while the listener runs.
//!
//! Besides closures, frames can be selected by TCP port with [`TcpPortFilter`] or by a compiled
//! classic BPF program with `BpfFilter` when the `bpf` feature is enabled.
//!
//! ```no_run
//! use tcpsynth::capture::{Captured, Listener, TcpPortFilter};
//!
//! let summary = Listener::file("handshake.pcap")
//!     .filter(TcpPortFilter::new(80))
//!     .max_packets(3)
//!     .run(|packet: &Captured| println!("{} octets", packet.data.len()))?;
//! println!("{} frames", summary.delivered);
//! # Ok::<(), tcpsynth::Error>(())
//! ```
//!
//! [`Listener`]: struct.Listener.html
//! [`Source`]: enum.Source.html
//! [`Filter`]: trait.Filter.html
//! [`PacketHandler`]: trait.PacketHandler.html
//! [`TimerHandler`]: trait.TimerHandler.html
//! [`TcpPortFilter`]: struct.TcpPortFilter.html
#[cfg(feature = "bpf")]
mod bpf;
pub mod pcap;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::{Duration, Instant};
#[cfg(all(feature = "sys", target_os = "linux"))]
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::wire::{
    ethernet_frame, ipv4_packet, tcp_packet, EthernetProtocol, IpProtocol};

#[cfg(all(feature = "sys", target_os = "linux"))]
use crate::nic::{self, RawSocket};

#[cfg(feature = "bpf")]
pub use self::bpf::BpfFilter;

/// The snap length used for live captures unless configured otherwise.
pub const DEFAULT_SNAPLEN: usize = 65535;

/// One frame as it was captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    /// Time of capture, since the Unix epoch.
    pub timestamp: Duration,
    /// The captured octets, at most the snap length.
    pub data: Vec<u8>,
    /// The length of the frame on the wire.
    pub original_len: usize,
}

/// Receives every frame delivered by a [`Listener`].
///
/// [`Listener`]: struct.Listener.html
pub trait PacketHandler {
    /// Handle one frame.
    fn handle(&mut self, packet: &Captured);
}

/// Called periodically while a [`Listener`] runs.
///
/// [`Listener`]: struct.Listener.html
pub trait TimerHandler {
    /// The timer expired, `elapsed` after the listener started.
    fn tick(&mut self, elapsed: Duration);
}

/// Decides which frames are delivered.
pub trait Filter {
    /// Check if the frame should be delivered.
    fn matches(&self, frame: &[u8]) -> bool;
}

impl<F: FnMut(&Captured)> PacketHandler for F {
    fn handle(&mut self, packet: &Captured) {
        self(packet)
    }
}

impl<F: FnMut(Duration)> TimerHandler for F {
    fn tick(&mut self, elapsed: Duration) {
        self(elapsed)
    }
}

impl<F: Fn(&[u8]) -> bool> Filter for F {
    fn matches(&self, frame: &[u8]) -> bool {
        self(frame)
    }
}

/// Matches IPv4 TCP frames with the port as either source or destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpPortFilter {
    port: u16,
}

impl TcpPortFilter {
    /// Match frames from or to `port`.
    pub fn new(port: u16) -> Self {
        TcpPortFilter { port }
    }
}

impl Filter for TcpPortFilter {
    fn matches(&self, frame: &[u8]) -> bool {
        let frame = match ethernet_frame::new_checked(frame) {
            Ok(frame) if frame.ethertype() == EthernetProtocol::Ipv4 => frame,
            _ => return false,
        };
        let packet = match ipv4_packet::new_checked(frame.payload_slice()) {
            Ok(packet) if packet.protocol() == IpProtocol::Tcp => packet,
            _ => return false,
        };
        match tcp_packet::new_checked(packet.payload_slice()) {
            Ok(segment) => segment.src_port() == self.port || segment.dst_port() == self.port,
            Err(_) => false,
        }
    }
}

/// Where frames are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A pcap file.
    File(PathBuf),
    /// A live interface, the first one that is up and not a loopback if `None`.
    Device(Option<String>),
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Frames passed to the packet handler.
    pub delivered: usize,
    /// Frames rejected by the filter.
    pub skipped: usize,
    /// Calls of the timer handler.
    pub ticks: usize,
}

/// A configured capture.
pub struct Listener {
    source: Source,
    promiscuous: bool,
    snaplen: usize,
    read_timeout: Option<Duration>,
    filter: Option<Box<dyn Filter>>,
    max_packets: usize,
    max_time: Option<Duration>,
    timer: Option<Duration>,
    timer_handler: Option<Box<dyn TimerHandler>>,
}

enum Opened {
    File(pcap::Reader<BufReader<File>>),
    #[cfg(all(feature = "sys", target_os = "linux"))]
    Device {
        socket: RawSocket,
        buffer: Vec<u8>,
    },
}

enum Event {
    Packet(Captured),
    Timeout,
    End,
}

impl Listener {
    /// A listener on a source with default settings.
    ///
    /// No filter, no bounds, no timer, a snap length of [`DEFAULT_SNAPLEN`] and a non
    /// promiscuous interface.
    ///
    /// [`DEFAULT_SNAPLEN`]: constant.DEFAULT_SNAPLEN.html
    pub fn new(source: Source) -> Self {
        Listener {
            source,
            promiscuous: false,
            snaplen: DEFAULT_SNAPLEN,
            read_timeout: None,
            filter: None,
            max_packets: 0,
            max_time: None,
            timer: None,
            timer_handler: None,
        }
    }

    /// Read a pcap file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Listener::new(Source::File(path.into()))
    }

    /// Capture on a live interface, or the default one.
    pub fn device(name: Option<&str>) -> Self {
        Listener::new(Source::Device(name.map(str::to_string)))
    }

    /// Put a live interface into promiscuous mode.
    pub fn promiscuous(mut self, enable: bool) -> Self {
        self.promiscuous = enable;
        self
    }

    /// Truncate live frames to at most `snaplen` octets.
    pub fn snaplen(mut self, snaplen: usize) -> Self {
        self.snaplen = snaplen;
        self
    }

    /// Wake up at least this often while waiting for live frames.
    ///
    /// Without a timeout a quiet interface only ends the capture through `max_time`.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Only deliver frames matching `filter`.
    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Stop after delivering `count` frames, `0` for no limit.
    pub fn max_packets(mut self, count: usize) -> Self {
        self.max_packets = count;
        self
    }

    /// Stop after `duration` has elapsed.
    pub fn max_time(mut self, duration: Duration) -> Self {
        self.max_time = Some(duration);
        self
    }

    /// Call the timer handler every `period`.
    pub fn timer(mut self, period: Duration) -> Self {
        self.timer = Some(period);
        self
    }

    /// The handler of the timer.
    pub fn timer_handler(mut self, handler: impl TimerHandler + 'static) -> Self {
        self.timer_handler = Some(Box::new(handler));
        self
    }

    /// Run the capture until one of its bounds is reached.
    pub fn run(mut self, mut handler: impl PacketHandler) -> Result<Summary> {
        let mut timer = match (self.timer, self.timer_handler.take()) {
            (Some(period), _) if period == Duration::ZERO =>
                return Err(Error::Capture("timer period must not be zero".into())),
            (Some(period), Some(handler)) => Some((period, handler)),
            (Some(_), None) =>
                return Err(Error::Capture("timer set without a timer handler".into())),
            (None, _) => None,
        };

        let mut source = self.open()?;
        let start = Instant::now();
        let deadline = self.max_time.map(|max| start + max);
        let mut next_tick = timer.as_ref().map(|(period, _)| start + *period);
        let mut summary = Summary::default();

        loop {
            let now = Instant::now();
            if deadline.map_or(false, |deadline| now >= deadline) {
                net_debug!("capture time elapsed");
                break;
            }

            let wait = [
                self.read_timeout,
                next_tick.map(|tick| tick.saturating_duration_since(now)),
                deadline.map(|deadline| deadline.saturating_duration_since(now)),
            ].iter().flatten().min().copied();

            match source.next(wait)? {
                Event::End => break,
                Event::Timeout => {},
                Event::Packet(packet) => {
                    let matches = self.filter.as_ref()
                        .map_or(true, |filter| filter.matches(&packet.data));
                    if matches {
                        handler.handle(&packet);
                        summary.delivered += 1;
                    } else {
                        summary.skipped += 1;
                    }
                },
            }

            if let (Some((period, handler)), Some(tick)) = (timer.as_mut(), next_tick) {
                let now = Instant::now();
                if now >= tick {
                    handler.tick(now - start);
                    summary.ticks += 1;
                    next_tick = Some(tick + *period);
                }
            }

            if self.max_packets != 0 && summary.delivered >= self.max_packets {
                break;
            }
        }

        net_debug!(
            delivered = summary.delivered,
            skipped = summary.skipped,
            ticks = summary.ticks,
            "capture finished");
        Ok(summary)
    }

    fn open(&self) -> Result<Opened> {
        match &self.source {
            Source::File(path) => {
                let file = File::open(path)?;
                let reader = pcap::Reader::new(BufReader::new(file))?;
                net_debug!(path = %path.display(), "opened capture file");
                Ok(Opened::File(reader))
            },
            #[cfg(all(feature = "sys", target_os = "linux"))]
            Source::Device(name) => {
                let name = match name {
                    Some(name) => name.clone(),
                    None => nic::default_interface()?,
                };
                let mut socket = RawSocket::new(&name)?;
                if self.promiscuous {
                    socket.set_promiscuous(true)?;
                }
                Ok(Opened::Device {
                    socket,
                    buffer: vec![0; self.snaplen],
                })
            },
            #[cfg(not(all(feature = "sys", target_os = "linux")))]
            Source::Device(_) => {
                Err(Error::Capture("live capture is not supported on this platform".into()))
            },
        }
    }
}

impl Opened {
    /// The next frame, waiting at most `wait` for a live one.
    fn next(&mut self, wait: Option<Duration>) -> Result<Event> {
        match self {
            Opened::File(reader) => {
                let _ = wait;
                Ok(reader.next_packet()?.map_or(Event::End, Event::Packet))
            },
            #[cfg(all(feature = "sys", target_os = "linux"))]
            Opened::Device { socket, buffer } => {
                let original_len = match socket.recv_timeout(buffer, wait)? {
                    None => return Ok(Event::Timeout),
                    Some(len) => len,
                };
                let timestamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default();
                let len = original_len.min(buffer.len());
                Ok(Event::Packet(Captured {
                    timestamp,
                    data: buffer[..len].to_vec(),
                    original_len,
                }))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io::Write;
    use std::rc::Rc;

    use super::*;
    use crate::{Connection, Peer, Side};

    fn script() -> Connection {
        let client = Peer::new("00:00:5e:00:53:01", "192.0.2.1", 40000, 100).unwrap();
        let server = Peer::new("00:00:5e:00:53:02", "192.0.2.2", 80, 500).unwrap();
        let mut conn = Connection::new(client, server);
        conn.connect().unwrap();
        conn.send(Side::Client, b"abc").unwrap();
        conn.disconnect().unwrap();
        conn
    }

    fn capture_file(name: &str, frames: &[&[u8]]) -> PathBuf {
        let path = std::env::temp_dir()
            .join(format!("tcpsynth-{}-{}.pcap", name, std::process::id()));
        let mut writer = pcap::Writer::new(Vec::new()).unwrap();
        for frame in frames {
            writer.write_packet(Duration::ZERO, frame).unwrap();
        }
        let mut file = File::create(&path).unwrap();
        file.write_all(&writer.into_inner().unwrap()).unwrap();
        path
    }

    #[test]
    fn port_filter() {
        let conn = script();
        assert!(TcpPortFilter::new(80).matches(&conn.packets()[0]));
        assert!(TcpPortFilter::new(40000).matches(&conn.packets()[1]));
        assert!(!TcpPortFilter::new(443).matches(&conn.packets()[0]));
        assert!(!TcpPortFilter::new(80).matches(&[0; 20]));
    }

    #[test]
    fn reads_file_until_end() {
        let conn = script();
        let frames: Vec<&[u8]> = conn.packets().iter().collect();
        let path = capture_file("end", &frames);

        let mut seen = Vec::new();
        let summary = Listener::file(&path)
            .run(|packet: &Captured| seen.push(packet.data.clone()))
            .unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(summary.delivered, 8);
        assert_eq!(seen, conn.packets().as_slice());
    }

    #[test]
    fn max_packets_counts_delivered_only() {
        let conn = script();
        let mut frames: Vec<&[u8]> = vec![&[0xff; 60][..]];
        frames.extend(conn.packets().iter());
        let path = capture_file("max", &frames);

        let mut seen = 0;
        let summary = Listener::file(&path)
            .filter(TcpPortFilter::new(80))
            .max_packets(2)
            .run(|_: &Captured| seen += 1)
            .unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(seen, 2);
        assert_eq!(summary, Summary { delivered: 2, skipped: 1, ticks: 0 });
    }

    #[test]
    fn closure_filter() {
        let conn = script();
        let frames: Vec<&[u8]> = conn.packets().iter().collect();
        let path = capture_file("closure", &frames);

        let summary = Listener::file(&path)
            .filter(|frame: &[u8]| frame.len() > 54)
            .run(|_: &Captured| {})
            .unwrap();
        std::fs::remove_file(&path).unwrap();

        // Only the data segment carries a payload.
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.skipped, 7);
    }

    #[test]
    fn timer_without_handler() {
        let result = Listener::file("unused.pcap")
            .timer(Duration::from_millis(10))
            .run(|_: &Captured| {});
        assert!(matches!(result, Err(Error::Capture(_))));
    }

    #[test]
    fn timer_handler_called() {
        let conn = script();
        let frames: Vec<&[u8]> = conn.packets().iter().collect();
        let path = capture_file("timer", &frames);
        let ticks = Rc::new(Cell::new(0));
        let counter = ticks.clone();

        let summary = Listener::file(&path)
            .timer(Duration::from_nanos(1))
            .timer_handler(move |_: Duration| counter.set(counter.get() + 1))
            .run(|_: &Captured| {})
            .unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(summary.delivered, 8);
        assert_eq!(summary.ticks, ticks.get());
        assert!(summary.ticks >= 1);
    }

    #[test]
    fn missing_file() {
        let result = Listener::file("/nonexistent/capture.pcap").run(|_: &Captured| {});
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
