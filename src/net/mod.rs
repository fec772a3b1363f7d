//! Socket construction helpers for the busy-wait I/O model.
//!
//! Every socket in the stack is non-blocking and owned by exactly one
//! thread; the worker loops poll them between queue drains. `socket2` is
//! used for the option dance (reuse-address before bind, multicast
//! membership), after which plain `std::net` types do the I/O.

use crate::error::ExchangeError;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener, TcpStream, UdpSocket};

/// Extracts the IPv4 group of a multicast endpoint, rejecting anything
/// outside the multicast range.
pub fn multicast_group(addr: SocketAddr) -> Result<Ipv4Addr, ExchangeError> {
    match addr {
        SocketAddr::V4(v4) if v4.ip().is_multicast() => Ok(*v4.ip()),
        other => Err(ExchangeError::NotMulticast { group: other.ip() }),
    }
}

/// A non-blocking UDP socket for publishing to a multicast group.
///
/// Loopback delivery is enabled so a co-located consumer sees the stream,
/// and the TTL is kept at 1: the feed is not meant to leave the segment.
pub fn multicast_sender(group: SocketAddr) -> Result<UdpSocket, ExchangeError> {
    multicast_group(group)?;
    let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))?;
    socket.set_multicast_loop_v4(true)?;
    socket.set_multicast_ttl_v4(1)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

/// A non-blocking UDP socket bound to `group`'s port and joined to the
/// group on all interfaces.
///
/// Reuse-address is set before bind so several consumers on one host can
/// listen to the same feed.
pub fn multicast_receiver(group: SocketAddr) -> Result<UdpSocket, ExchangeError> {
    let ip = multicast_group(group)?;
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, group.port()).into())?;
    socket.set_nonblocking(true)?;
    let socket: UdpSocket = socket.into();
    socket.join_multicast_v4(&ip, &Ipv4Addr::UNSPECIFIED)?;
    Ok(socket)
}

/// A non-blocking TCP listener for the order gateway.
pub fn tcp_listener(addr: SocketAddr) -> Result<TcpListener, ExchangeError> {
    let listener = TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;
    Ok(listener)
}

/// Connects to the exchange gateway, then switches the stream to
/// non-blocking with Nagle disabled.
pub fn tcp_connect(addr: SocketAddr) -> Result<TcpStream, ExchangeError> {
    let stream = TcpStream::connect(addr)?;
    stream.set_nodelay(true)?;
    stream.set_nonblocking(true)?;
    Ok(stream)
}
