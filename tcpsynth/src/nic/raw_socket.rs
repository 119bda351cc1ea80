// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
use std::{mem, io};
use std::os::unix::io::{RawFd, AsRawFd};
use std::time::Duration;

use super::{ifreq, linux, wait, FdResult, IoLenResult, LibcResult};
use super::linux::IfIndex;
use crate::conn::PacketStore;

/// A packet socket bound to a single interface.
///
/// The socket is closed on drop, which also ends promiscuous mode if it was enabled through it.
#[derive(Debug)]
pub struct RawSocket {
    lower: libc::c_int,
    ifindex: libc::c_int,
    name: String,
}

impl AsRawFd for RawSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.lower
    }
}

impl RawSocket {
    /// Open a socket on the interface `name` and bind it to that interface.
    pub fn new(name: &str) -> io::Result<RawSocket> {
        let mut ifreq = ifreq::new(name)?;

        let lower = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                linux::ETH_P_ALL.to_be() as i32)
        };

        FdResult(lower).errno()?;

        // Owned from here on, closed on any error below.
        let mut socket = RawSocket {
            lower,
            ifindex: 0,
            name: name.to_string(),
        };

        socket.ifindex = ifreq.get_if_index(socket.lower)?;
        socket.bind_interface()?;
        net_debug!(interface = name, ifindex = socket.ifindex, "opened raw socket");
        Ok(socket)
    }

    /// The name of the bound interface.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn bind_interface(&mut self) -> io::Result<()> {
        let sockaddr = libc::sockaddr_ll {
            sll_family:   libc::AF_PACKET as u16,
            sll_protocol: linux::ETH_P_ALL.to_be() as u16,
            sll_ifindex:  self.ifindex,
            sll_hatype:   1,
            sll_pkttype:  0,
            sll_halen:    6,
            sll_addr:     [0; 8],
        };

        let res = unsafe {
            libc::bind(
                self.lower,
                &sockaddr as *const libc::sockaddr_ll as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as u32)
        };

        FdResult(res).errno()?;
        Ok(())
    }

    /// Receive every frame seen on the interface, not only those addressed to it.
    pub fn set_promiscuous(&mut self, enable: bool) -> io::Result<()> {
        linux::set_promiscuous(self.lower, self.ifindex, enable)?;
        net_debug!(interface = %self.name, enable, "promiscuous mode");
        Ok(())
    }

    /// Receive one frame into `buffer`.
    ///
    /// Returns the length of the frame on the wire, which is larger than the buffer when the
    /// frame was truncated.
    pub fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let len = unsafe {
            libc::recv(
                self.lower,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
                libc::MSG_TRUNC)
        };
        IoLenResult(len).errno()?;
        Ok(len as usize)
    }

    /// Receive one frame, waiting at most `timeout` for it to arrive.
    ///
    /// Returns `Ok(None)` when the timeout expired.
    pub fn recv_timeout(&mut self, buffer: &mut [u8], timeout: Option<Duration>)
        -> io::Result<Option<usize>>
    {
        if !wait(self.lower, timeout)? {
            return Ok(None);
        }
        self.recv(buffer).map(Some)
    }

    /// Send one frame as is.
    pub fn send(&mut self, buffer: &[u8]) -> io::Result<usize> {
        let len = unsafe {
            libc::send(
                self.lower,
                buffer.as_ptr() as *const libc::c_void,
                buffer.len(),
                0)
        };
        IoLenResult(len).errno()?;
        Ok(len as usize)
    }

    /// Send every frame of `packets` in order.
    ///
    /// Stops at the first error, frames before it have been handed to the kernel. Returns the
    /// number of frames sent.
    pub fn send_all(&mut self, packets: &PacketStore) -> io::Result<usize> {
        for (count, frame) in packets.iter().enumerate() {
            if let Err(err) = self.send(frame) {
                net_debug!(interface = %self.name, sent = count, "send failed: {}", err);
                return Err(err);
            }
        }
        net_trace!(interface = %self.name, sent = packets.len(), "sent all frames");
        Ok(packets.len())
    }
}

impl Drop for RawSocket {
    fn drop(&mut self) {
        unsafe { libc::close(self.lower); }
    }
}
