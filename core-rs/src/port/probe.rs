/**
 * probe.rs
 * Bindability checks for candidate ports
 *
 * A port is "available" on an address when both a TCP listener and a UDP
 * socket can be bound to it at the same instant. Both sockets are dropped
 * before returning, so the answer is only valid at the moment of the check.
 */

use once_cell::sync::Lazy;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener};
use tracing::{debug, trace};

/// Listen backlog used for probe and floor sockets
const LISTEN_BACKLOG: i32 = 50;

/// Whether this host can open a dual-stack `[::]` socket
static DUAL_STACK: Lazy<bool> = Lazy::new(|| {
    let supported = bind_socket(
        SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
        Type::STREAM,
        Protocol::TCP,
        false,
    )
    .is_ok();
    debug!(supported, "dual-stack wildcard check");
    supported
});

/// Address used when no bind address is requested
///
/// `[::]` with IPv4 mapping enabled, so a port held on either family is
/// seen as busy. `0.0.0.0` when the host has no IPv6.
pub fn wildcard_address() -> IpAddr {
    if *DUAL_STACK {
        IpAddr::V6(Ipv6Addr::UNSPECIFIED)
    } else {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    }
}

fn socket_addr(address: Option<IpAddr>, port: u16) -> SocketAddr {
    SocketAddr::new(address.unwrap_or_else(wildcard_address), port)
}

fn bind_socket(addr: SocketAddr, ty: Type, protocol: Protocol, reuse: bool) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(addr), ty, Some(protocol))?;
    if addr.is_ipv6() && addr.ip().is_unspecified() {
        socket.set_only_v6(false)?;
    }
    if reuse {
        socket.set_reuse_address(true)?;
    }
    socket.bind(&addr.into())?;
    Ok(socket)
}

/// Open a TCP listener on `addr` with SO_REUSEADDR set before bind
pub(crate) fn bind_tcp(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = bind_socket(addr, Type::STREAM, Protocol::TCP, true)?;
    socket.listen(LISTEN_BACKLOG)?;
    Ok(socket.into())
}

/// Bind a UDP socket on `addr`
///
/// No SO_REUSEADDR: on Linux it would let the bind share a port with
/// another reuse-enabled socket that a plain caller bind cannot.
fn bind_udp(addr: SocketAddr) -> io::Result<Socket> {
    bind_socket(addr, Type::DGRAM, Protocol::UDP, false)
}

/// Check whether `port` can be bound for both TCP and UDP on `address`
///
/// # Arguments
/// * `port` - Candidate port
/// * `address` - Bind address, `None` for the wildcard address
///
/// # Returns
/// true if both binds succeeded, false on any I/O error
pub fn is_available(port: u16, address: Option<IpAddr>) -> bool {
    let addr = socket_addr(address, port);

    // Both sockets are closed before the probe returns
    let result = bind_tcp(addr).and_then(|listener| {
        let datagram = bind_udp(addr)?;
        drop(datagram);
        drop(listener);
        Ok(())
    });

    match result {
        Ok(()) => true,
        Err(e) => {
            trace!(%addr, error = %e, "port not available");
            false
        }
    }
}

/// Check whether `port` is available on at least one of `addresses`
///
/// Addresses are tried in order and the check stops at the first success.
/// An empty list is never available.
pub fn is_available_on_any(port: u16, addresses: &[Option<IpAddr>]) -> bool {
    addresses.iter().any(|address| is_available(port, *address))
}
