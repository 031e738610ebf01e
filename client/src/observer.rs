//! Lease change notifications.

use crate::{interface::InterfaceId, lease::Lease};

/// What happened to the lease of an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseEvent {
    /// The interface has been configured.
    Bound(Lease),
    /// The server refused the lease and the address has been removed.
    Nak,
    /// The lease has been given back and the address has been removed.
    Released,
}

/// Receives lease changes of one record.
pub trait LeaseObserver: Send {
    fn on_lease_event(&mut self, interface: InterfaceId, event: &LeaseEvent);
}

impl<F> LeaseObserver for F
where
    F: FnMut(InterfaceId, &LeaseEvent) + Send,
{
    fn on_lease_event(&mut self, interface: InterfaceId, event: &LeaseEvent) {
        self(interface, event)
    }
}
