//! The shared UDP endpoint module.

use std::{io, net::Ipv4Addr};

use dhcp_protocol::{DHCP_PORT_CLIENT, DHCP_PORT_SERVER};

use crate::interface::Transport;

/// A transport bound on the client port while at least one record uses it.
#[derive(Debug)]
pub struct SharedEndpoint<T> {
    transport: T,
    users: usize,
}

impl<T: Transport> SharedEndpoint<T> {
    pub fn new(transport: T) -> Self {
        SharedEndpoint {
            transport,
            users: 0,
        }
    }

    /// Binds the transport for the first user.
    ///
    /// # Errors
    /// The bind error, in which case the user is not counted.
    pub fn acquire(&mut self) -> io::Result<()> {
        if self.users == 0 {
            self.transport.bind(DHCP_PORT_CLIENT, DHCP_PORT_SERVER)?;
            debug!("Bound the DHCP endpoint to port {}", DHCP_PORT_CLIENT);
        }
        self.users += 1;
        Ok(())
    }

    /// Unbinds the transport after the last user.
    pub fn release(&mut self) {
        match self.users {
            0 => warn!("Releasing the DHCP endpoint without users"),
            1 => {
                self.users = 0;
                self.transport.unbind();
                debug!("Unbound the DHCP endpoint");
            }
            _ => self.users -= 1,
        }
    }

    pub fn users(&self) -> usize {
        self.users
    }

    pub fn send(&mut self, payload: &[u8], destination: Ipv4Addr, interface: &str) -> io::Result<()> {
        self.transport.send(payload, destination, interface)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
