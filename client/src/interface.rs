//! The collaborator traits the engine is driven through.

use std::{fmt, io, net::Ipv4Addr};

use eui48::MacAddress;

/// Identifies an interface registered in a `Client`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceId(pub(crate) usize);

impl InterfaceId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A network interface managed by DHCP.
pub trait NetworkInterface: Send {
    fn name(&self) -> &str;

    fn hardware_address(&self) -> MacAddress;

    /// Administratively up.
    fn is_up(&self) -> bool;

    /// Ethernet framing with ARP.
    fn is_ethernet(&self) -> bool;

    fn is_link_up(&self) -> bool;

    fn mtu(&self) -> u16;

    /// The current address, `0.0.0.0` if there is none.
    fn address(&self) -> Ipv4Addr;

    /// Configures the interface. All zeros remove the address.
    fn set_address(&mut self, address: Ipv4Addr, netmask: Ipv4Addr, gateway: Ipv4Addr);

    /// Takes precedence over `Config::hostname`.
    fn hostname(&self) -> Option<&str> {
        None
    }

    fn set_dns_servers(&mut self, _servers: &[Ipv4Addr]) {}

    fn set_ntp_servers(&mut self, _servers: &[Ipv4Addr]) {}
}

/// The datagram service shared by all records.
///
/// `bind` is called when the first record needs it and `unbind` when the
/// last one lets it go.
pub trait Transport {
    fn bind(&mut self, local_port: u16, remote_port: u16) -> io::Result<()>;

    fn unbind(&mut self);

    /// Sends to `destination` on the server port, out of the named interface.
    fn send(&mut self, payload: &[u8], destination: Ipv4Addr, interface: &str) -> io::Result<()>;
}

/// Sends ARP requests for an offered address.
///
/// Replies are fed back through `Client::arp_reply`.
#[cfg(feature = "arp-check")]
pub trait ArpProbe: Send {
    fn probe(&mut self, interface: &str, candidate: Ipv4Addr) -> io::Result<()>;
}

/// Link-local (169.254/16) configuration running alongside discovery.
pub trait LinkLocal: Send {
    fn start(&mut self, interface: &str);

    fn stop(&mut self, interface: &str);
}
