//! The per-interface client record module.

use std::{fmt, net::Ipv4Addr};

use crate::{
    lease::{Lease, LeaseTiming},
    observer::LeaseObserver,
    state::State,
};

/// The DHCP state of one interface.
///
/// A record is either allocated by `Client::start` or supplied up front with
/// `Client::set_record`. Lease fields are only meaningful while the state
/// supplies the address.
pub struct Record {
    pub(crate) state: State,
    pub(crate) tries: u8,
    /// Fine ticks until the state timeout.
    pub(crate) request_timeout: u16,
    pub(crate) transaction_id: u32,
    pub(crate) timing: LeaseTiming,

    pub(crate) offered_ip: Ipv4Addr,
    /// `None` until a server sends one or the bind computes it.
    pub(crate) offered_netmask: Option<Ipv4Addr>,
    pub(crate) offered_gateway: Option<Ipv4Addr>,
    pub(crate) server_id: Ipv4Addr,
    pub(crate) next_server: Ipv4Addr,
    pub(crate) boot_file_name: Option<String>,
    pub(crate) dns_servers: Vec<Ipv4Addr>,
    pub(crate) ntp_servers: Vec<Ipv4Addr>,

    /// Holds a reference of the shared endpoint.
    pub(crate) endpoint_attached: bool,
    pub(crate) link_local_active: bool,
    pub(crate) observer: Option<Box<dyn LeaseObserver>>,
}

impl Record {
    pub fn new() -> Self {
        Record {
            state: State::Off,
            tries: 0,
            request_timeout: 0,
            transaction_id: 0,
            timing: LeaseTiming::default(),
            offered_ip: Ipv4Addr::UNSPECIFIED,
            offered_netmask: None,
            offered_gateway: None,
            server_id: Ipv4Addr::UNSPECIFIED,
            next_server: Ipv4Addr::UNSPECIFIED,
            boot_file_name: None,
            dns_servers: Vec::new(),
            ntp_servers: Vec::new(),
            endpoint_attached: false,
            link_local_active: false,
            observer: None,
        }
    }

    /// Any state change restarts the retransmission count and timer.
    pub(crate) fn set_state(&mut self, state: State) {
        if state != self.state {
            info!("DHCP state {} -> {}", self.state, state);
            self.state = state;
            self.tries = 0;
            self.request_timeout = 0;
        }
    }

    pub(crate) fn bump_tries(&mut self) {
        self.tries = self.tries.saturating_add(1);
    }

    /// Zeroes everything but the observer.
    pub(crate) fn reset(&mut self) {
        let observer = self.observer.take();
        *self = Record::new();
        self.observer = observer;
    }

    /// Forgets the offer and stops the lease timers.
    pub(crate) fn clear_offer(&mut self) {
        self.offered_ip = Ipv4Addr::UNSPECIFIED;
        self.offered_netmask = None;
        self.offered_gateway = None;
        self.server_id = Ipv4Addr::UNSPECIFIED;
        self.next_server = Ipv4Addr::UNSPECIFIED;
        self.boot_file_name = None;
        self.dns_servers.clear();
        self.ntp_servers.clear();
        self.timing.clear();
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn tries(&self) -> u8 {
        self.tries
    }

    pub fn request_timeout(&self) -> u16 {
        self.request_timeout
    }

    pub fn transaction_id(&self) -> u32 {
        self.transaction_id
    }

    pub fn timing(&self) -> &LeaseTiming {
        &self.timing
    }

    pub fn offered_address(&self) -> Ipv4Addr {
        self.offered_ip
    }

    pub fn server_id(&self) -> Ipv4Addr {
        self.server_id
    }

    pub fn next_server(&self) -> Ipv4Addr {
        self.next_server
    }

    pub fn boot_file_name(&self) -> Option<&str> {
        self.boot_file_name.as_deref()
    }

    pub fn is_endpoint_attached(&self) -> bool {
        self.endpoint_attached
    }

    pub fn is_link_local_active(&self) -> bool {
        self.link_local_active
    }

    /// The lease as configured on the interface.
    pub fn lease(&self) -> Option<Lease> {
        if !self.state.supplies_address() {
            return None;
        }
        Some(self.snapshot())
    }

    pub(crate) fn snapshot(&self) -> Lease {
        Lease {
            address: self.offered_ip,
            netmask: self.offered_netmask.unwrap_or(Ipv4Addr::UNSPECIFIED),
            gateway: self.offered_gateway.unwrap_or(Ipv4Addr::UNSPECIFIED),
            server_id: self.server_id,
            lease_time: self.timing.offered_t0_lease,
            renewal_time: self.timing.offered_t1_renew,
            rebinding_time: self.timing.offered_t2_rebind,
            dns_servers: self.dns_servers.clone(),
            ntp_servers: self.ntp_servers.clone(),
            next_server: self.next_server,
            boot_file_name: self.boot_file_name.clone(),
        }
    }
}

impl Default for Record {
    fn default() -> Self {
        Record::new()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Record")
            .field("state", &self.state)
            .field("tries", &self.tries)
            .field("request_timeout", &self.request_timeout)
            .field("transaction_id", &format_args!("{:#010x}", self.transaction_id))
            .field("offered_ip", &self.offered_ip)
            .field("server_id", &self.server_id)
            .field("timing", &self.timing)
            .field("endpoint_attached", &self.endpoint_attached)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
