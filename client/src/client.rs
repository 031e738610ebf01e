//! Client module

use std::net::Ipv4Addr;

use rand::{rngs::StdRng, RngCore, SeedableRng};

use dhcp_protocol::Header;

use crate::{
    config::Config,
    endpoint::SharedEndpoint,
    error::{Error, Result},
    interface::{InterfaceId, LinkLocal, NetworkInterface, Transport},
    machine::Session,
    observer::LeaseObserver,
    record::Record,
    state::State,
};
#[cfg(feature = "arp-check")]
use crate::interface::ArpProbe;

/// A registered interface.
struct Slot {
    interface: Box<dyn NetworkInterface>,
    record: Option<Box<Record>>,
    /// The record was allocated by `start` and counts towards `Config::max_records`.
    allocated: bool,
}

/// The DHCP client of a host with several interfaces.
///
/// The client owns no timers and no sockets. It is driven by the caller,
/// which must invoke `fine_tick` every `Config::fine_timer_msecs`,
/// `coarse_tick` every `Config::coarse_timer_secs` and feed the datagrams
/// received on the client port to `dispatch` or `receive`.
pub struct Client<T> {
    config: Config,
    endpoint: SharedEndpoint<T>,
    rng: Box<dyn RngCore + Send>,
    slots: Vec<Option<Slot>>,
    link_local: Option<Box<dyn LinkLocal>>,
    #[cfg(feature = "arp-check")]
    arp: Option<Box<dyn ArpProbe>>,
}

impl<T: Transport> Client<T> {
    /// Creates a client with transaction IDs drawn from the OS entropy.
    pub fn new(config: Config, transport: T) -> Self {
        Self::with_rng(config, transport, StdRng::from_entropy())
    }

    /// Creates a client with a custom transaction ID source.
    pub fn with_rng<R>(config: Config, transport: T, rng: R) -> Self
    where
        R: RngCore + Send + 'static,
    {
        Client {
            config,
            endpoint: SharedEndpoint::new(transport),
            rng: Box::new(rng),
            slots: Vec::new(),
            link_local: None,
            #[cfg(feature = "arp-check")]
            arp: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers an interface. Freed identifiers are reused.
    pub fn add_interface(&mut self, interface: Box<dyn NetworkInterface>) -> InterfaceId {
        let slot = Slot {
            interface,
            record: None,
            allocated: false,
        };
        match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots[index] = Some(slot);
                InterfaceId(index)
            }
            None => {
                self.slots.push(Some(slot));
                InterfaceId(self.slots.len() - 1)
            }
        }
    }

    /// Stops DHCP on the interface and unregisters it.
    pub fn remove_interface(&mut self, id: InterfaceId) -> Option<Box<dyn NetworkInterface>> {
        self.stop(id);
        self.slots.get_mut(id.0)?.take().map(|slot| slot.interface)
    }

    pub fn interface(&self, id: InterfaceId) -> Option<&dyn NetworkInterface> {
        self.slots
            .get(id.0)?
            .as_ref()
            .map(|slot| slot.interface.as_ref())
    }

    pub fn interface_mut(&mut self, id: InterfaceId) -> Option<&mut (dyn NetworkInterface + 'static)> {
        self.slots
            .get_mut(id.0)?
            .as_mut()
            .map(|slot| slot.interface.as_mut())
    }

    /// Supplies the record of an interface instead of letting `start` allocate one.
    ///
    /// # Errors
    /// `InvalidArgument` if the interface is unknown or already has a record.
    pub fn set_record(&mut self, id: InterfaceId, record: Record) -> Result<()> {
        let slot = self.slot_mut(id)?;
        if slot.record.is_some() {
            return Err(Error::InvalidArgument("the interface already has a DHCP record"));
        }
        slot.record = Some(Box::new(record));
        slot.allocated = false;
        Ok(())
    }

    /// Stops DHCP on the interface and drops its record.
    pub fn cleanup(&mut self, id: InterfaceId) {
        self.stop(id);
        if let Ok(slot) = self.slot_mut(id) {
            slot.record = None;
            slot.allocated = false;
        }
    }

    /// Sets the lease observer of the interface record. The observer
    /// survives restarts of the record.
    ///
    /// # Errors
    /// `InvalidArgument` if the interface has no record yet.
    pub fn set_observer(&mut self, id: InterfaceId, observer: Option<Box<dyn LeaseObserver>>) -> Result<()> {
        let record = self
            .slot_mut(id)?
            .record
            .as_deref_mut()
            .ok_or(Error::InvalidArgument("the interface has no DHCP record"))?;
        record.observer = observer;
        Ok(())
    }

    pub fn set_link_local(&mut self, link_local: Option<Box<dyn LinkLocal>>) {
        self.link_local = link_local;
    }

    #[cfg(feature = "arp-check")]
    pub fn set_arp_probe(&mut self, arp: Option<Box<dyn ArpProbe>>) {
        self.arp = arp;
    }

    /// Starts or restarts DHCP on the interface.
    ///
    /// Discovery begins at once if the link is up, otherwise on the next
    /// `network_changed`.
    ///
    /// # Errors
    /// `InvalidArgument` if the interface is unknown, down, not Ethernet or
    /// has an MTU under 576 bytes.
    /// `OutOfMemory` if no record can be allocated or the DISCOVER cannot be built.
    /// `Endpoint` if the shared endpoint cannot be bound.
    pub fn start(&mut self, id: InterfaceId) -> Result<()> {
        let allocated_records = self.allocated_records();
        let max_records = self.config.max_records;

        let slot = self.slot_mut(id)?;
        if !slot.interface.is_up() {
            return Err(Error::InvalidArgument("the interface is down"));
        }
        if !slot.interface.is_ethernet() {
            return Err(Error::InvalidArgument("the interface is not Ethernet"));
        }
        if slot.interface.mtu() < dhcp_protocol::SIZE_MESSAGE_MINIMAL as u16 {
            return Err(Error::InvalidArgument("the interface MTU is too small"));
        }
        let allocated_now = slot.record.is_none();
        if allocated_now {
            if allocated_records >= max_records {
                return Err(Error::OutOfMemory);
            }
            slot.record = Some(Box::new(Record::new()));
            slot.allocated = true;
            debug!("{}: allocated a DHCP record", slot.interface.name());
        } else if let Some(mut session) = self.session(id) {
            session.stop();
        }

        if let Err(error) = self.endpoint.acquire() {
            self.abort_start(id, allocated_now);
            return Err(Error::Endpoint(error));
        }

        let mut session = self
            .session(id)
            .ok_or(Error::InvalidArgument("the interface has no DHCP record"))?;
        session.record.reset();
        session.record.endpoint_attached = true;
        session.record.set_state(State::Init);

        if !session.interface.is_link_up() {
            info!("{}: the link is down, waiting for it", session.interface.name());
            return Ok(());
        }
        if let Err(error) = session.discover() {
            self.abort_start(id, allocated_now);
            return Err(error);
        }
        Ok(())
    }

    /// Renews the lease ahead of T1.
    ///
    /// # Errors
    /// `InvalidState` if the record holds no lease to renew.
    pub fn renew(&mut self, id: InterfaceId) -> Result<()> {
        let mut session = self.started(id)?;
        match session.record.state {
            State::Requesting | State::Bound | State::Renewing => session.renew(),
            state => Err(Error::InvalidState(state)),
        }
    }

    /// Gives the lease back. The record stays attached and goes OFF.
    pub fn release(&mut self, id: InterfaceId) -> Result<()> {
        let mut session = self.started(id)?;
        session.release();
        Ok(())
    }

    /// Stops DHCP on the interface. Does nothing if it was never started.
    pub fn stop(&mut self, id: InterfaceId) {
        if let Some(mut session) = self.session(id) {
            session.stop();
        }
    }

    /// Asks for configuration parameters of a manually configured address.
    ///
    /// The INFORM goes to the known server, if any, and is broadcast otherwise.
    pub fn inform(&mut self, id: InterfaceId) -> Result<()> {
        let destination = match self.record(id) {
            Some(record) if !record.server_id.is_unspecified() => record.server_id,
            _ => Ipv4Addr::BROADCAST,
        };
        let slot = self
            .slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidArgument("unknown interface"))?;

        self.endpoint.acquire()?;
        let mut record = Record::new();
        let result = Session {
            config: &self.config,
            endpoint: &mut self.endpoint,
            rng: &mut self.rng,
            interface: &mut slot.interface,
            record: &mut record,
            id,
            link_local: self.link_local.as_mut(),
            #[cfg(feature = "arp-check")]
            arp: self.arp.as_mut(),
        }
        .inform(destination);
        self.endpoint.release();
        result
    }

    /// The link of the interface went up again, possibly elsewhere.
    pub fn network_changed(&mut self, id: InterfaceId) {
        if let Some(mut session) = self.session(id) {
            if let Err(error) = session.network_changed() {
                warn!("{}: could not restart DHCP: {}", session.interface.name(), error);
            }
        }
    }

    /// Feeds an ARP reply seen on the interface.
    #[cfg(feature = "arp-check")]
    pub fn arp_reply(&mut self, id: InterfaceId, address: Ipv4Addr) {
        if let Some(mut session) = self.session(id) {
            session.arp_reply(address);
        }
    }

    /// Handles a datagram received on the client port of the interface.
    pub fn receive(&mut self, id: InterfaceId, payload: &[u8]) {
        match self.session(id) {
            Some(mut session) => session.receive(payload),
            None => trace!("Discarding a reply for {} without a DHCP record", id),
        }
    }

    /// Routes a datagram to the interface owning its `chaddr`.
    pub fn dispatch(&mut self, payload: &[u8]) -> Option<InterfaceId> {
        let header = match Header::parse(payload) {
            Ok(header) => header,
            Err(error) => {
                trace!("Discarding a datagram: {}", error);
                return None;
            }
        };
        let id = self.slots.iter().enumerate().find_map(|(index, slot)| match slot {
            Some(slot)
                if slot.record.is_some()
                    && slot.interface.hardware_address() == header.client_hardware_address =>
            {
                Some(InterfaceId(index))
            }
            _ => None,
        });
        match id {
            Some(id) => {
                self.receive(id, payload);
                Some(id)
            }
            None => {
                trace!("Discarding a reply for {}", header.client_hardware_address);
                None
            }
        }
    }

    /// Advances the lease timers of every record.
    pub fn coarse_tick(&mut self) {
        for index in 0..self.slots.len() {
            if let Some(mut session) = self.session(InterfaceId(index)) {
                session.coarse_tick();
            }
        }
    }

    /// Advances the request timers of every record.
    pub fn fine_tick(&mut self) {
        for index in 0..self.slots.len() {
            if let Some(mut session) = self.session(InterfaceId(index)) {
                session.fine_tick();
            }
        }
    }

    /// Whether the interface address comes from a lease.
    pub fn supplied_address(&self, id: InterfaceId) -> bool {
        self.record(id)
            .map(|record| record.state.supplies_address())
            .unwrap_or(false)
    }

    pub fn record(&self, id: InterfaceId) -> Option<&Record> {
        self.slots.get(id.0)?.as_ref()?.record.as_deref()
    }

    pub fn state(&self, id: InterfaceId) -> Option<State> {
        self.record(id).map(Record::state)
    }

    /// The number of records holding the shared endpoint.
    pub fn endpoint_users(&self) -> usize {
        self.endpoint.users()
    }

    pub fn transport(&self) -> &T {
        self.endpoint.transport()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.endpoint.transport_mut()
    }

    /// Stops the record again and drops it if `start` has just allocated it.
    fn abort_start(&mut self, id: InterfaceId, allocated_now: bool) {
        if let Some(mut session) = self.session(id) {
            session.stop();
        }
        if allocated_now {
            if let Ok(slot) = self.slot_mut(id) {
                slot.record = None;
                slot.allocated = false;
            }
        }
    }

    fn allocated_records(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| slot.allocated && slot.record.is_some())
            .count()
    }

    fn slot_mut(&mut self, id: InterfaceId) -> Result<&mut Slot> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidArgument("unknown interface"))
    }

    fn started(&mut self, id: InterfaceId) -> Result<Session<'_, T>> {
        self.slot_mut(id)?;
        self.session(id)
            .ok_or(Error::InvalidArgument("DHCP has not been started on the interface"))
    }

    fn session(&mut self, id: InterfaceId) -> Option<Session<'_, T>> {
        let slot = self.slots.get_mut(id.0)?.as_mut()?;
        let record = slot.record.as_deref_mut()?;
        Some(Session {
            config: &self.config,
            endpoint: &mut self.endpoint,
            rng: &mut self.rng,
            interface: &mut slot.interface,
            record,
            id,
            link_local: self.link_local.as_mut(),
            #[cfg(feature = "arp-check")]
            arp: self.arp.as_mut(),
        })
    }
}
