//! Putting frames on a Linux interface and taking them off again.
//!
//! A [`RawSocket`] is an `AF_PACKET` socket bound to one interface. Frames are sent exactly as
//! given, there is no routing, no neighbor discovery and no fragmentation. Use it to inject the
//! frames of a [`PacketStore`] or to capture live traffic for a [`Listener`].
//!
//! Opening a packet socket requires `CAP_NET_RAW`.
//!
//! [`RawSocket`]: struct.RawSocket.html
//! [`PacketStore`]: ../conn/struct.PacketStore.html
//! [`Listener`]: ../capture/struct.Listener.html
#![allow(unsafe_code)]
// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
//
// Applies to files in this folder unless otherwise noted. These are:
// * `linux.rs`
// * `mod.rs`
// * `raw_socket.rs`
use core::mem;
use std::{fs, io, ptr};
use std::os::unix::io::RawFd;
use std::time::Duration;

mod linux;
mod raw_socket;

pub use self::raw_socket::RawSocket;

/// Wait until given file descriptor becomes readable, but no longer than given timeout.
///
/// Returns `Ok(false)` when the timeout expired first.
pub fn wait(fd: RawFd, duration: Option<Duration>) -> Result<bool, Errno> {
    let mut readfds;

    unsafe {
        let mut readfds_init = mem::MaybeUninit::<libc::fd_set>::uninit();
        libc::FD_ZERO(readfds_init.as_mut_ptr());
        libc::FD_SET(fd, readfds_init.as_mut_ptr());
        readfds = readfds_init.assume_init();
    }

    let mut timeout = libc::timeval { tv_sec: 0, tv_usec: 0 };
    let timeout = duration.map(|duration| {
        timeout.tv_sec = duration.as_secs() as libc::time_t;
        timeout.tv_usec = duration.subsec_micros() as libc::suseconds_t;
        &mut timeout
    });

    let timeout_ptr = timeout
        .map(|reference| reference as *mut _)
        .unwrap_or_else(ptr::null_mut);

    let res = unsafe {
        libc::select(
            fd + 1,
            &mut readfds,
            ptr::null_mut(),
            ptr::null_mut(),
            timeout_ptr)
    };

    FdResult(res).errno()?;
    Ok(res > 0)
}

/// The name of the first interface that is up and not a loopback, by interface index.
pub fn default_interface() -> io::Result<String> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir("/sys/class/net")? {
        let entry = entry?;
        let path = entry.path();
        let flags = read_sys_number(&path.join("flags"))?;
        if flags & libc::IFF_LOOPBACK as u64 != 0 || flags & libc::IFF_UP as u64 == 0 {
            continue;
        }
        let index = read_sys_number(&path.join("ifindex"))?;
        if let Some(name) = entry.file_name().to_str() {
            candidates.push((index, name.to_string()));
        }
    }

    candidates.sort();
    candidates.into_iter()
        .next()
        .map(|(_, name)| name)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no capture device found"))
}

/// Read a decimal or `0x` prefixed hexadecimal attribute from sysfs.
fn read_sys_number(path: &std::path::Path) -> io::Result<u64> {
    let content = fs::read_to_string(path)?;
    let content = content.trim();
    let parsed = match content.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => content.parse(),
    };
    parsed.map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

/// An errno value.
///
/// This is used as the error representation of raw libc calls. It converts into a
/// `std::io::Error` which has much more extensive error information.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Errno(pub libc::c_int);

#[derive(Clone, Copy)]
struct FdResult(pub libc::c_int);

#[derive(Clone, Copy)]
struct IoLenResult(pub libc::ssize_t);

type IoctlResult = FdResult;
#[allow(non_snake_case)] // Emulate type alias also importing constructor.
fn IoctlResult(val: libc::c_int) -> IoctlResult { FdResult(val) }

/// Base for an if ioctl request.
///
/// Contains the name of the interface.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
struct ifreq {
    ifr_name: [libc::c_char; libc::IF_NAMESIZE],
}

/// Trait for interpreting integer return values.
///
/// Failure signals may vary between:
/// * `-1`
/// * arbitrary negative values
/// * non-zero
trait LibcResult: Copy {
    fn is_fail(self) -> bool;

    fn errno(self) -> Result<(), Errno> {
        if self.is_fail() {
            Err(Errno::new())
        } else {
            Ok(())
        }
    }
}

impl Errno {
    /// The errno of the last failed call on this thread.
    pub fn new() -> Errno {
        Errno(unsafe { *libc::__errno_location() })
    }
}

impl LibcResult for FdResult {
    fn is_fail(self) -> bool {
        self.0 == -1
    }
}

impl LibcResult for IoLenResult {
    fn is_fail(self) -> bool {
        self.0 == -1
    }
}

impl From<Errno> for io::Error {
    fn from(err: Errno) -> io::Error {
        io::Error::from_raw_os_error(err.0)
    }
}

impl ifreq {
    /// An interface request for `name`, which must leave room for the terminating nul.
    fn new(name: &str) -> Result<Self, Errno> {
        let mut ifr_name = [0; libc::IF_NAMESIZE];
        if name.len() >= ifr_name.len() || name.as_bytes().contains(&0) {
            return Err(Errno(libc::ENAMETOOLONG));
        }

        for (i, byte) in name.as_bytes().iter().enumerate() {
            ifr_name[i] = *byte as libc::c_char
        }

        Ok(ifreq {
            ifr_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_name_too_long() {
        assert_eq!(ifreq::new("an-interface-name-that-is-too-long").err(),
                   Some(Errno(libc::ENAMETOOLONG)));
        assert!(ifreq::new("eth0").is_ok());
    }

    #[test]
    fn errno_into_io_error() {
        let err: io::Error = Errno(libc::EPERM).into();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }
}
