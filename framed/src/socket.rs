//! The DHCP client socket module.

use std::{
    collections::HashMap,
    io,
    net::{self, Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::Arc,
};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use dhcp_client::Transport;

/// Must be enough to receive the largest reply a server may send.
pub const BUFFER_READ_CAPACITY: usize = 8192;

/// Whether sockets can be tied to a device with `SO_BINDTODEVICE`.
const BINDS_TO_DEVICE: bool = cfg!(any(target_os = "android", target_os = "fuchsia", target_os = "linux"));

/// The socket of one interface, registered with tokio for receiving.
#[derive(Debug)]
struct Channel {
    /// A non-blocking handle of the same socket, so sending never waits for
    /// the reactor.
    sender: net::UdpSocket,
    receiver: Arc<UdpSocket>,
}

#[derive(Debug)]
struct Bound {
    local_port: u16,
    remote_port: u16,
    channels: HashMap<String, Channel>,
}

/// The `Transport` over tokio UDP sockets.
///
/// Every interface gets its own socket on the client port, bound to the
/// device, so that datagrams leave through the interface they are meant
/// for even while it has no address or route. The sockets are opened by the
/// first send through an interface and closed together by the last `unbind`.
/// They must be opened from within a tokio runtime.
///
/// Where the platform cannot bind to a device, all interfaces share one
/// socket and the routing table picks the way out.
#[derive(Debug, Default)]
pub struct UdpTransport {
    bound: Option<Bound>,
    /// Replaces the ports asked for by the client, for unprivileged runs.
    ports: Option<(u16, u16)>,
}

impl UdpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `local_port` and `remote_port` instead of 68 and 67.
    pub fn with_ports(local_port: u16, remote_port: u16) -> Self {
        UdpTransport {
            bound: None,
            ports: Some((local_port, remote_port)),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// The interfaces a socket has been opened for, sorted.
    pub fn interfaces(&self) -> Vec<&str> {
        let mut interfaces: Vec<&str> = self
            .bound
            .iter()
            .flat_map(|bound| bound.channels.keys())
            .map(String::as_str)
            .collect();
        interfaces.sort_unstable();
        interfaces
    }

    /// The sockets replies arrive on.
    pub fn sockets(&self) -> Vec<Arc<UdpSocket>> {
        self.bound
            .iter()
            .flat_map(|bound| bound.channels.values())
            .map(|channel| channel.receiver.clone())
            .collect()
    }

    fn open(interface: &str, local_port: u16) -> io::Result<Channel> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_broadcast(true)?;
        bind_device(&socket, interface)?;
        socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, local_port).into())?;
        socket.set_nonblocking(true)?;

        let sender = net::UdpSocket::from(socket);
        let receiver = UdpSocket::from_std(sender.try_clone()?)?;
        Ok(Channel {
            sender,
            receiver: Arc::new(receiver),
        })
    }
}

impl Transport for UdpTransport {
    fn bind(&mut self, local_port: u16, remote_port: u16) -> io::Result<()> {
        let (local_port, remote_port) = self.ports.unwrap_or((local_port, remote_port));
        info!("DHCP client sockets use port {}", local_port);
        self.bound = Some(Bound {
            local_port,
            remote_port,
            channels: HashMap::new(),
        });
        Ok(())
    }

    fn unbind(&mut self) {
        if let Some(bound) = self.bound.take() {
            info!("DHCP client sockets closed: {}", bound.channels.len());
        }
    }

    fn send(&mut self, payload: &[u8], destination: Ipv4Addr, interface: &str) -> io::Result<()> {
        let bound = self
            .bound
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "The DHCP socket is not bound"))?;

        let key = if BINDS_TO_DEVICE { interface } else { "" };
        if !bound.channels.contains_key(key) {
            let channel = Self::open(interface, bound.local_port)?;
            info!(
                "{}: DHCP client socket bound to {}",
                interface,
                channel.receiver.local_addr()?,
            );
            bound.channels.insert(key.to_owned(), channel);
        }
        let channel = bound
            .channels
            .get(key)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "The DHCP socket is gone"))?;

        let address = SocketAddr::new(destination.into(), bound.remote_port);
        let sent = channel.sender.send_to(payload, address)?;
        if sent != payload.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "Failed to write entire datagram to socket",
            ));
        }
        trace!("{}: sent {} bytes to {}", interface, sent, address);
        Ok(())
    }
}

#[cfg(any(target_os = "android", target_os = "fuchsia", target_os = "linux"))]
fn bind_device(socket: &Socket, interface: &str) -> io::Result<()> {
    socket.bind_device(Some(interface.as_bytes()))
}

#[cfg(not(any(target_os = "android", target_os = "fuchsia", target_os = "linux")))]
fn bind_device(_socket: &Socket, _interface: &str) -> io::Result<()> {
    Ok(())
}
