//! The DHCP client state machine.
//!
//! A `Session` borrows everything one record needs for a single event: the
//! record itself, its interface, the shared endpoint and the client-wide
//! collaborators. Every transition runs to completion within one call.

use std::{io, net::Ipv4Addr};

use bytes::BytesMut;
use rand::RngCore;

use dhcp_protocol::{Header, MessageType, OperationCode, ReplyOptions};

use crate::{
    backoff::Backoff,
    builder::MessageBuilder,
    config::Config,
    endpoint::SharedEndpoint,
    error::{Error, Result},
    interface::{InterfaceId, LinkLocal, NetworkInterface, Transport},
    lease::Expiry,
    observer::LeaseEvent,
    record::Record,
    state::State,
};
#[cfg(feature = "arp-check")]
use crate::interface::ArpProbe;

/// REQUESTs sent to verify a lease after a reboot before falling back to discovery.
const REBOOT_TRIES: u8 = 3;

/// SELECTING timeouts are retransmitted up to this many tries.
const REQUEST_TRIES: u8 = 5;

/// CHECKING probes the offered address this many times.
#[cfg(feature = "arp-check")]
const CHECK_TRIES: u8 = 1;

pub(crate) struct Session<'a, T> {
    pub config: &'a Config,
    pub endpoint: &'a mut SharedEndpoint<T>,
    pub rng: &'a mut Box<dyn RngCore + Send>,
    pub interface: &'a mut Box<dyn NetworkInterface>,
    pub record: &'a mut Record,
    pub id: InterfaceId,
    pub link_local: Option<&'a mut Box<dyn LinkLocal>>,
    #[cfg(feature = "arp-check")]
    pub arp: Option<&'a mut Box<dyn ArpProbe>>,
}

impl<'a, T: Transport> Session<'a, T> {
    /// Broadcasts a DISCOVER and waits in SELECTING.
    ///
    /// # Errors
    /// `OutOfMemory` if the message does not fit. The retransmission timer
    /// is armed anyway.
    pub fn discover(&mut self) -> Result<()> {
        self.record.offered_ip = Ipv4Addr::UNSPECIFIED;
        self.record.set_state(State::Selecting);

        let transaction_id = self.transaction_id(MessageType::DhcpDiscover);
        let message = self.builder().discover(transaction_id);
        let result = self.transmit(MessageType::DhcpDiscover, message, Ipv4Addr::BROADCAST);

        self.record.bump_tries();
        self.cooperate_link_local();
        self.arm_request(Backoff::Discover);
        result
    }

    /// Requests the offered address from the server that offered it.
    pub fn select(&mut self) -> Result<()> {
        self.record.set_state(State::Requesting);

        let transaction_id = self.transaction_id(MessageType::DhcpRequest);
        let message =
            self.builder()
                .request_selecting(transaction_id, self.record.offered_ip, self.record.server_id);
        let result = self.transmit(MessageType::DhcpRequest, message, Ipv4Addr::BROADCAST);

        self.record.bump_tries();
        self.arm_request(Backoff::Select);
        result
    }

    /// Probes the acknowledged address with ARP before binding it.
    #[cfg(feature = "arp-check")]
    pub fn check(&mut self) {
        self.record.set_state(State::Checking);

        match self.arp.as_mut() {
            Some(arp) => {
                if let Err(error) = arp.probe(self.interface.name(), self.record.offered_ip) {
                    warn!("{}: could not perform ARP query: {}", self.interface.name(), error);
                }
            }
            None => debug!("{}: no ARP probe is set, waiting out the check", self.interface.name()),
        }

        self.record.bump_tries();
        self.arm_request(Backoff::Check);
    }

    /// Tells the server the offered address is in use and backs off.
    #[cfg(feature = "arp-check")]
    pub fn decline(&mut self) -> Result<()> {
        self.record.set_state(State::BackingOff);

        let transaction_id = self.transaction_id(MessageType::DhcpDecline);
        let message = self.builder().decline(
            transaction_id,
            self.interface.address(),
            self.record.offered_ip,
            self.record.server_id,
        );
        let result = self.transmit(MessageType::DhcpDecline, message, Ipv4Addr::BROADCAST);

        self.record.bump_tries();
        self.arm_request(Backoff::Decline);
        result
    }

    /// Configures the interface with the acknowledged lease.
    pub fn bind(&mut self) {
        self.record.timing.arm(self.config.coarse_timer_secs);

        let address = self.record.offered_ip;
        let netmask = self
            .record
            .offered_netmask
            .unwrap_or_else(|| classful_netmask(address));
        let gateway = match self.record.offered_gateway {
            Some(gateway) if !gateway.is_unspecified() => gateway,
            _ => Ipv4Addr::from((u32::from(address) & u32::from(netmask)) | 1),
        };
        self.record.offered_netmask = Some(netmask);
        self.record.offered_gateway = Some(gateway);

        self.stop_link_local();
        info!(
            "{}: bound to {} netmask {} gateway {}",
            self.interface.name(),
            address,
            netmask,
            gateway,
        );
        self.interface.set_address(address, netmask, gateway);
        self.record.set_state(State::Bound);

        let lease = self.record.snapshot();
        self.notify(LeaseEvent::Bound(lease));
    }

    /// Unicasts a REQUEST to the leasing server.
    pub fn renew(&mut self) -> Result<()> {
        self.record.set_state(State::Renewing);

        let transaction_id = self.transaction_id(MessageType::DhcpRequest);
        let message = self
            .builder()
            .request_renewing(transaction_id, self.interface.address());
        let server_id = self.record.server_id;
        let result = self.transmit(MessageType::DhcpRequest, message, server_id);

        self.record.bump_tries();
        self.arm_request(Backoff::Renew);
        result
    }

    /// Broadcasts a REQUEST to any server able to extend the lease.
    pub fn rebind(&mut self) -> Result<()> {
        self.record.set_state(State::Rebinding);

        let transaction_id = self.transaction_id(MessageType::DhcpRequest);
        let message = self
            .builder()
            .request_renewing(transaction_id, self.interface.address());
        let result = self.transmit(MessageType::DhcpRequest, message, Ipv4Addr::BROADCAST);

        self.record.bump_tries();
        self.arm_request(Backoff::Rebind);
        result
    }

    /// Broadcasts a REQUEST verifying the previous lease.
    pub fn reboot(&mut self) -> Result<()> {
        self.record.set_state(State::Rebooting);

        let transaction_id = self.transaction_id(MessageType::DhcpRequest);
        let message = self
            .builder()
            .request_init_reboot(transaction_id, self.record.offered_ip);
        let result = self.transmit(MessageType::DhcpRequest, message, Ipv4Addr::BROADCAST);

        self.record.bump_tries();
        self.arm_request(Backoff::Reboot);
        result
    }

    /// Gives the lease back and goes OFF.
    ///
    /// The server only hears about it if the address came from a lease.
    /// Failing to send the RELEASE does not keep the lease.
    pub fn release(&mut self) {
        let server_id = self.record.server_id;
        let supplied = self.record.state.supplies_address();

        self.record.set_state(State::Off);
        self.record.clear_offer();
        if !supplied {
            return;
        }

        let transaction_id = self.transaction_id(MessageType::DhcpRelease);
        let message = self
            .builder()
            .release(transaction_id, self.interface.address(), server_id);
        if self.transmit(MessageType::DhcpRelease, message, server_id).is_err() {
            debug!("{}: the lease is released without telling the server", self.interface.name());
        }

        self.interface
            .set_address(Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED);
        self.notify(LeaseEvent::Released);
    }

    /// Goes OFF and lets the shared endpoint go. The interface keeps its address.
    pub fn stop(&mut self) {
        self.stop_link_local();
        self.record.set_state(State::Off);
        if self.record.endpoint_attached {
            self.endpoint.release();
            self.record.endpoint_attached = false;
        }
    }

    /// Sends an INFORM from a transient record.
    pub fn inform(&mut self, destination: Ipv4Addr) -> Result<()> {
        self.record.set_state(State::Informing);

        let transaction_id = self.transaction_id(MessageType::DhcpInform);
        let message = self.builder().inform(transaction_id, self.interface.address());
        self.transmit(MessageType::DhcpInform, message, destination)
    }

    /// Verifies the lease after the link came back, or restarts discovery.
    pub fn network_changed(&mut self) -> Result<()> {
        match self.record.state {
            State::Off => Ok(()),
            state if state.holds_lease() => {
                self.record.tries = 0;
                self.reboot()
            }
            _ => {
                self.stop_link_local();
                self.record.tries = 0;
                self.discover()
            }
        }
    }

    /// Declines the offer if another host answered for the offered address.
    #[cfg(feature = "arp-check")]
    pub fn arp_reply(&mut self, address: Ipv4Addr) {
        if self.record.state != State::Checking || address != self.record.offered_ip {
            return;
        }
        warn!("{}: {} is already in use, declining", self.interface.name(), address);
        let result = self.decline();
        self.report("decline", result);
    }

    pub fn coarse_tick(&mut self) {
        if self.record.state == State::Off {
            return;
        }

        let result = match self.record.timing.tick() {
            Some(Expiry::Lease) => {
                info!("{}: the lease of {} has expired", self.interface.name(), self.record.offered_ip);
                self.release();
                self.discover()
            }
            Some(Expiry::Rebind) => self.t2_timeout(),
            Some(Expiry::Renew) => self.t1_timeout(),
            None => Ok(()),
        };
        self.report("lease timer", result);
    }

    pub fn fine_tick(&mut self) {
        match self.record.request_timeout {
            0 => {}
            1 => {
                self.record.request_timeout = 0;
                let result = self.timeout();
                self.report("request timeout", result);
            }
            _ => self.record.request_timeout -= 1,
        }
    }

    /// Handles one datagram received on the client port.
    ///
    /// Anything that is not a well-formed reply to the current transaction
    /// of this interface is dropped silently.
    pub fn receive(&mut self, payload: &[u8]) {
        if !self.record.endpoint_attached {
            discard!(self.interface.name(), "DHCP is not running");
        }
        let header = match Header::parse(payload) {
            Ok(header) => header,
            Err(error) => discard!(self.interface.name(), "{}", error),
        };
        if header.operation_code != OperationCode::BootReply {
            discard!(self.interface.name(), "{} is not a reply", header.operation_code);
        }
        if header.client_hardware_address != self.interface.hardware_address() {
            discard!(
                self.interface.name(),
                "hardware address {} is not ours",
                header.client_hardware_address,
            );
        }
        if header.transaction_id != self.record.transaction_id {
            discard!(
                self.interface.name(),
                "transaction ID {:#010x} is not ours ({:#010x})",
                header.transaction_id,
                self.record.transaction_id,
            );
        }
        let options = match ReplyOptions::parse(payload, &self.config.option_limits()) {
            Ok(options) => options,
            Err(error) => discard!(self.interface.name(), "{}", error),
        };
        let message_type = match options.message_type {
            Some(message_type) => message_type,
            None => discard!(self.interface.name(), "no message type"),
        };

        let source = options.server_id.unwrap_or(header.server_ip_address);
        let state = self.record.state;
        let result = match (message_type, state) {
            (MessageType::DhcpAck, State::Requesting) => {
                log_receive!(self.interface.name(), message_type, source, state);
                self.handle_ack(&header, options);
                self.accept_acknowledged();
                Ok(())
            }
            (MessageType::DhcpAck, State::Rebooting)
            | (MessageType::DhcpAck, State::Rebinding)
            | (MessageType::DhcpAck, State::Renewing) => {
                log_receive!(self.interface.name(), message_type, source, state);
                self.handle_ack(&header, options);
                self.bind();
                Ok(())
            }
            (MessageType::DhcpNak, State::Rebooting)
            | (MessageType::DhcpNak, State::Requesting)
            | (MessageType::DhcpNak, State::Rebinding)
            | (MessageType::DhcpNak, State::Renewing) => {
                log_receive!(self.interface.name(), message_type, source, state);
                self.handle_nak()
            }
            (MessageType::DhcpOffer, State::Selecting) => {
                log_receive!(self.interface.name(), message_type, source, state);
                self.record.request_timeout = 0;
                self.handle_offer(&header, &options)
            }
            _ => {
                trace!("{}: ignoring {} in {}", self.interface.name(), message_type, state);
                Ok(())
            }
        };
        self.report("reply", result);
    }

    fn handle_offer(&mut self, header: &Header, options: &ReplyOptions) -> Result<()> {
        match options.server_id {
            Some(server_id) => {
                self.record.server_id = server_id;
                self.record.offered_ip = header.your_ip_address;
                debug!("{}: {} offered by {}", self.interface.name(), header.your_ip_address, server_id);
                self.select()
            }
            None => {
                warn!("{}: DHCPOFFER without a server identifier", self.interface.name());
                Ok(())
            }
        }
    }

    /// Takes the lease parameters from an ACK.
    fn handle_ack(&mut self, header: &Header, options: ReplyOptions) {
        let record = &mut *self.record;

        record.offered_netmask = options.subnet_mask;
        record.offered_gateway = options.router;
        record
            .timing
            .accept(options.lease_time, options.renewal_time, options.rebinding_time);
        record.offered_ip = header.your_ip_address;
        record.next_server = header.server_ip_address;
        record.boot_file_name = options.boot_file_name;
        if record.server_id.is_unspecified() {
            if let Some(server_id) = options.server_id {
                record.server_id = server_id;
            }
        }

        if let Some(servers) = options.dns_servers {
            self.interface.set_dns_servers(&servers);
            record.dns_servers = servers;
        }
        if let Some(servers) = options.ntp_servers {
            self.interface.set_ntp_servers(&servers);
            record.ntp_servers = servers;
        }
    }

    /// The address must no longer be used (RFC 2131 §3.2).
    fn handle_nak(&mut self) -> Result<()> {
        self.interface
            .set_address(Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED, Ipv4Addr::UNSPECIFIED);
        self.notify(LeaseEvent::Nak);
        self.record.set_state(State::BackingOff);
        self.discover()
    }

    #[cfg(feature = "arp-check")]
    fn accept_acknowledged(&mut self) {
        self.check();
    }

    #[cfg(not(feature = "arp-check"))]
    fn accept_acknowledged(&mut self) {
        self.bind();
    }

    /// The request timer of the current state has run out.
    fn timeout(&mut self) -> Result<()> {
        let tries = self.record.tries;
        match self.record.state {
            State::BackingOff | State::Selecting => self.discover(),
            State::Requesting if tries <= REQUEST_TRIES => self.select(),
            State::Requesting => {
                debug!("{}: no answer to the REQUEST, restarting", self.interface.name());
                self.release();
                self.discover()
            }
            #[cfg(feature = "arp-check")]
            State::Checking if tries <= CHECK_TRIES => {
                self.check();
                Ok(())
            }
            #[cfg(feature = "arp-check")]
            State::Checking => {
                self.bind();
                Ok(())
            }
            State::Rebooting if tries < REBOOT_TRIES => self.reboot(),
            State::Rebooting => self.discover(),
            _ => Ok(()),
        }
    }

    /// Renews, then schedules the next renew halfway to T2.
    fn t1_timeout(&mut self) -> Result<()> {
        match self.record.state {
            State::Requesting | State::Bound | State::Renewing => {
                debug!("{}: T1 has expired", self.interface.name());
                let result = self.renew();
                self.record.timing.rearm_renew(self.config.coarse_timer_secs);
                result
            }
            _ => Ok(()),
        }
    }

    /// Rebinds, then schedules the next rebind halfway to T0.
    fn t2_timeout(&mut self) -> Result<()> {
        match self.record.state {
            State::Requesting | State::Bound | State::Renewing | State::Rebinding => {
                debug!("{}: T2 has expired", self.interface.name());
                let result = self.rebind();
                self.record.timing.rearm_rebind(self.config.coarse_timer_secs);
                result
            }
            _ => Ok(()),
        }
    }

    /// A REQUEST continues the transaction of the DISCOVER that got the
    /// offer. Other messages start a new one unless retransmitted.
    fn transaction_id(&mut self, message_type: MessageType) -> u32 {
        if !message_type.reuses_transaction_id() && self.record.tries == 0 {
            self.record.transaction_id = self.rng.next_u32();
        }
        self.record.transaction_id
    }

    fn builder(&self) -> MessageBuilder<'_> {
        let hostname = self
            .interface
            .hostname()
            .or_else(|| self.config.hostname.as_deref());
        MessageBuilder::new(
            self.interface.hardware_address(),
            self.interface.mtu(),
            hostname,
            self.config.request_ntp_servers,
        )
    }

    /// Sending is best effort. Only a message that could not be built is an error.
    fn transmit(
        &mut self,
        message_type: MessageType,
        message: io::Result<BytesMut>,
        destination: Ipv4Addr,
    ) -> Result<()> {
        let message = match message {
            Ok(message) => message,
            Err(error) => {
                warn!("{}: could not build {}: {}", self.interface.name(), message_type, error);
                return Err(Error::OutOfMemory);
            }
        };

        log_send!(self.interface.name(), message_type, destination);
        if let Err(error) = self.endpoint.send(&message, destination, self.interface.name()) {
            warn!("{}: could not send {}: {}", self.interface.name(), message_type, error);
        }
        Ok(())
    }

    fn arm_request(&mut self, backoff: Backoff) {
        self.record.request_timeout = backoff.ticks(self.record.tries, self.config.fine_timer_msecs);
        debug!(
            "{}: {} try {}, timeout {} ms",
            self.interface.name(),
            self.record.state,
            self.record.tries,
            backoff.msecs(self.record.tries),
        );
    }

    fn cooperate_link_local(&mut self) {
        let limit = match self.config.autoip_coop_tries {
            Some(limit) => limit,
            None => return,
        };
        if self.record.tries < limit || self.record.link_local_active {
            return;
        }
        if let Some(link_local) = self.link_local.as_mut() {
            info!("{}: no DHCP server has answered, starting link-local", self.interface.name());
            link_local.start(self.interface.name());
            self.record.link_local_active = true;
        }
    }

    fn stop_link_local(&mut self) {
        if !self.record.link_local_active {
            return;
        }
        if let Some(link_local) = self.link_local.as_mut() {
            link_local.stop(self.interface.name());
        }
        self.record.link_local_active = false;
    }

    fn notify(&mut self, event: LeaseEvent) {
        if let Some(observer) = self.record.observer.as_mut() {
            observer.on_lease_event(self.id, &event);
        }
    }

    fn report(&self, event: &str, result: Result<()>) {
        if let Err(error) = result {
            warn!("{}: handling the {} failed: {}", self.interface.name(), event, error);
        }
    }
}

/// The netmask of the address class, for servers that do not send one.
fn classful_netmask(address: Ipv4Addr) -> Ipv4Addr {
    match address.octets()[0] {
        0..=127 => Ipv4Addr::new(255, 0, 0, 0),
        192..=255 => Ipv4Addr::new(255, 255, 255, 0),
        _ => Ipv4Addr::new(255, 255, 0, 0),
    }
}
