// Copyright (C) 2016 whitequark@whitequark.org
// Copyright (C) 2019 Andreas Molzer <andreas.molzer@tum.de>
//
// in large parts from `smoltcp` originally distributed under 0-clause BSD
use core::mem;

use super::{ifreq, Errno, LibcResult, IoctlResult, FdResult};

pub(crate) const ETH_P_ALL:    libc::c_short = 0x0003;

pub(crate) const SOL_PACKET:             libc::c_int = 263;
pub(crate) const PACKET_ADD_MEMBERSHIP:  libc::c_int = 1;
pub(crate) const PACKET_DROP_MEMBERSHIP: libc::c_int = 2;
pub(crate) const PACKET_MR_PROMISC:      libc::c_ushort = 1;

/// Look up the index of the interface named in the request.
pub(crate) trait IfIndex {
    fn get_if_index(&mut self, fd: libc::c_int) -> Result<libc::c_int, Errno>;
}

impl ifreq {
    pub(crate) const SIOCGIFINDEX: libc::Ioctl = 0x8933;
}

impl IfIndex for ifreq {
    fn get_if_index(&mut self, fd: libc::c_int) -> Result<libc::c_int, Errno> {
        #[repr(C)]
        struct Request {
            interface: ifreq,
            ifr_ifindex: libc::c_int,
        }

        let mut request = Request {
            interface: *self,
            ifr_ifindex: 0,
        };

        let res = unsafe {
            libc::ioctl(fd, Self::SIOCGIFINDEX, &mut request as *mut _)
        };

        IoctlResult(res).errno()?;

        Ok(request.ifr_ifindex)
    }
}

/// `struct packet_mreq` of `<linux/if_packet.h>`.
#[repr(C)]
struct PacketMreq {
    mr_ifindex: libc::c_int,
    mr_type: libc::c_ushort,
    mr_alen: libc::c_ushort,
    mr_address: [libc::c_uchar; 8],
}

/// Enable or disable promiscuous mode of an interface for as long as `fd` is open.
///
/// The kernel counts memberships, leaving the interface as it was once the socket closes.
pub(crate) fn set_promiscuous(fd: libc::c_int, ifindex: libc::c_int, enable: bool)
    -> Result<(), Errno>
{
    let request = PacketMreq {
        mr_ifindex: ifindex,
        mr_type: PACKET_MR_PROMISC,
        mr_alen: 0,
        mr_address: [0; 8],
    };
    let option = if enable { PACKET_ADD_MEMBERSHIP } else { PACKET_DROP_MEMBERSHIP };

    let res = unsafe {
        libc::setsockopt(
            fd,
            SOL_PACKET,
            option,
            &request as *const PacketMreq as *const libc::c_void,
            mem::size_of::<PacketMreq>() as libc::socklen_t)
    };

    FdResult(res).errno()
}
