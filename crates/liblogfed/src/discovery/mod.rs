//! Multicast peer discovery: an Announcer that advertises this node and a
//! Listener that records advertisements from others into the Peer Table.

mod announcer;
mod listener;

pub use announcer::Announcer;
pub use listener::Listener;

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use anyhow::Context;

/// Options shared by the Announcer and Listener: which group/port to use.
#[derive(Debug, Clone)]
pub struct MulticastOptions {
    pub group: Ipv4Addr,
    pub port: u16,
}

/// Oversize datagrams may be truncated by a fixed-size receive buffer. The
/// source used 64 bytes (too small for any real hostname); raise it to a
/// safe bound per the redesign flag in the spec.
pub const RECV_BUFFER_LEN: usize = 1500;

fn multicast_addr(opts: &MulticastOptions) -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(opts.group, opts.port))
}

fn bind_multicast_receiver(opts: &MulticastOptions) -> anyhow::Result<socket2::Socket> {
    use socket2::{Domain, Protocol, Socket, Type};

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .context("error creating multicast receive socket")?;
    socket.set_reuse_address(true).ok();
    #[cfg(unix)]
    socket.set_reuse_port(true).ok();
    socket
        .bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, opts.port).into())
        .with_context(|| format!("error binding to multicast port {}", opts.port))?;
    socket
        .join_multicast_v4(&opts.group, &Ipv4Addr::UNSPECIFIED)
        .with_context(|| format!("error joining multicast group {}", opts.group))?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}
