//! An embedded-style DHCPv4 client.
//!
//! The client is a passive state machine per interface, driven by two
//! periodic ticks and the replies it is given. Sockets, interfaces, ARP and
//! link-local configuration are supplied by the caller through traits.

#[macro_use]
extern crate log;

#[macro_use]
mod macros;
mod backoff;
mod builder;
mod client;
mod config;
mod endpoint;
mod error;
mod interface;
mod lease;
mod machine;
mod observer;
mod record;
mod state;

#[cfg(feature = "arp-check")]
pub use self::interface::ArpProbe;
pub use self::{
    backoff::Backoff,
    builder::MessageBuilder,
    client::Client,
    config::Config,
    endpoint::SharedEndpoint,
    error::{Error, Result},
    interface::{InterfaceId, LinkLocal, NetworkInterface, Transport},
    lease::{Expiry, Lease, LeaseTiming, INFINITE},
    observer::{LeaseEvent, LeaseObserver},
    record::Record,
    state::State,
};
