//! A fake host for driving the client without sockets.

#![allow(dead_code)]

use std::{
    io,
    net::Ipv4Addr,
    sync::{Arc, Mutex},
};

use eui48::MacAddress;
use rand::{rngs::StdRng, SeedableRng};

use dhcp_client::{Client, Config, InterfaceId, LeaseEvent, NetworkInterface, State, Transport};
use dhcp_protocol::{MessageType, OptionIter, OptionTag, MAGIC_COOKIE, OFFSET_OPTIONS};

pub const CLIENT_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
pub const SERVER: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);
pub const OFFERED: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 100);
pub const NETMASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);
pub const ROUTER: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 254);

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// What the client did to the interface.
#[derive(Debug)]
pub struct InterfaceState {
    pub link_up: bool,
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub dns_servers: Vec<Ipv4Addr>,
    pub ntp_servers: Vec<Ipv4Addr>,
    pub configurations: usize,
}

impl Default for InterfaceState {
    fn default() -> Self {
        InterfaceState {
            link_up: false,
            address: Ipv4Addr::UNSPECIFIED,
            netmask: Ipv4Addr::UNSPECIFIED,
            gateway: Ipv4Addr::UNSPECIFIED,
            dns_servers: Vec::new(),
            ntp_servers: Vec::new(),
            configurations: 0,
        }
    }
}

pub struct FakeInterface {
    pub name: String,
    pub mac: MacAddress,
    pub up: bool,
    pub ethernet: bool,
    pub mtu: u16,
    pub hostname: Option<String>,
    pub state: Arc<Mutex<InterfaceState>>,
}

impl FakeInterface {
    pub fn new(name: &str, mac: [u8; 6]) -> Self {
        FakeInterface {
            name: name.to_owned(),
            mac: MacAddress::new(mac),
            up: true,
            ethernet: true,
            mtu: 1500,
            hostname: None,
            state: Arc::new(Mutex::new(InterfaceState {
                link_up: true,
                ..InterfaceState::default()
            })),
        }
    }
}

impl NetworkInterface for FakeInterface {
    fn name(&self) -> &str {
        &self.name
    }

    fn hardware_address(&self) -> MacAddress {
        self.mac
    }

    fn is_up(&self) -> bool {
        self.up
    }

    fn is_ethernet(&self) -> bool {
        self.ethernet
    }

    fn is_link_up(&self) -> bool {
        self.state.lock().unwrap().link_up
    }

    fn mtu(&self) -> u16 {
        self.mtu
    }

    fn address(&self) -> Ipv4Addr {
        self.state.lock().unwrap().address
    }

    fn set_address(&mut self, address: Ipv4Addr, netmask: Ipv4Addr, gateway: Ipv4Addr) {
        let mut state = self.state.lock().unwrap();
        state.address = address;
        state.netmask = netmask;
        state.gateway = gateway;
        state.configurations += 1;
    }

    fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    fn set_dns_servers(&mut self, servers: &[Ipv4Addr]) {
        self.state.lock().unwrap().dns_servers = servers.to_vec();
    }

    fn set_ntp_servers(&mut self, servers: &[Ipv4Addr]) {
        self.state.lock().unwrap().ntp_servers = servers.to_vec();
    }
}

/// A datagram handed to the transport.
#[derive(Debug, Clone)]
pub struct Sent {
    pub payload: Vec<u8>,
    pub destination: Ipv4Addr,
    pub interface: String,
}

impl Sent {
    pub fn message_type(&self) -> MessageType {
        self.option(OptionTag::DhcpMessageType)
            .map(|value| MessageType::from(value[0]))
            .unwrap_or(MessageType::Undefined)
    }

    pub fn transaction_id(&self) -> u32 {
        u32::from_be_bytes([self.payload[4], self.payload[5], self.payload[6], self.payload[7]])
    }

    pub fn client_ip_address(&self) -> Ipv4Addr {
        Ipv4Addr::new(self.payload[12], self.payload[13], self.payload[14], self.payload[15])
    }

    pub fn option(&self, tag: OptionTag) -> Option<Vec<u8>> {
        OptionIter::new(&self.payload[OFFSET_OPTIONS..])
            .find(|(code, _)| *code == tag as u8)
            .map(|(_, value)| value.to_vec())
    }

    pub fn address_option(&self, tag: OptionTag) -> Option<Ipv4Addr> {
        self.option(tag)
            .map(|value| Ipv4Addr::new(value[0], value[1], value[2], value[3]))
    }

    pub fn is_broadcast(&self) -> bool {
        self.destination == Ipv4Addr::BROADCAST
    }
}

#[derive(Debug, Default)]
pub struct FakeTransport {
    pub bound: bool,
    pub binds: usize,
    pub unbinds: usize,
    pub fail_bind: bool,
    pub fail_send: bool,
    pub sent: Vec<Sent>,
}

impl Transport for FakeTransport {
    fn bind(&mut self, local_port: u16, remote_port: u16) -> io::Result<()> {
        assert_eq!((local_port, remote_port), (68, 67));
        if self.fail_bind {
            return Err(io::Error::new(io::ErrorKind::AddrInUse, "port 68 is taken"));
        }
        assert!(!self.bound, "bound twice");
        self.bound = true;
        self.binds += 1;
        Ok(())
    }

    fn unbind(&mut self) {
        assert!(self.bound, "unbound twice");
        self.bound = false;
        self.unbinds += 1;
    }

    fn send(&mut self, payload: &[u8], destination: Ipv4Addr, interface: &str) -> io::Result<()> {
        if self.fail_send {
            return Err(io::Error::new(io::ErrorKind::Other, "no buffers"));
        }
        self.sent.push(Sent {
            payload: payload.to_vec(),
            destination,
            interface: interface.to_owned(),
        });
        Ok(())
    }
}

/// A server reply with options placed in the main area and optionally in
/// the overloaded `file` and `sname` fields.
pub struct Reply {
    pub transaction_id: u32,
    pub client_hardware_address: [u8; 6],
    pub your_ip_address: Ipv4Addr,
    pub server_ip_address: Ipv4Addr,
    pub options: Vec<(u8, Vec<u8>)>,
    pub file_options: Vec<(u8, Vec<u8>)>,
    pub sname_options: Vec<(u8, Vec<u8>)>,
    pub boot_file_name: Option<String>,
}

impl Reply {
    pub fn new(message_type: MessageType, transaction_id: u32, your_ip_address: Ipv4Addr) -> Self {
        Reply {
            transaction_id,
            client_hardware_address: CLIENT_MAC,
            your_ip_address,
            server_ip_address: Ipv4Addr::UNSPECIFIED,
            options: vec![(OptionTag::DhcpMessageType as u8, vec![message_type as u8])],
            file_options: Vec::new(),
            sname_options: Vec::new(),
            boot_file_name: None,
        }
    }

    /// Adds an option or replaces the value it already has.
    pub fn option(mut self, tag: OptionTag, value: Vec<u8>) -> Self {
        let tag = tag as u8;
        match self.options.iter_mut().find(|(code, _)| *code == tag) {
            Some(option) => option.1 = value,
            None => self.options.push((tag, value)),
        }
        self
    }

    pub fn without(mut self, tag: OptionTag) -> Self {
        self.options.retain(|(code, _)| *code != tag as u8);
        self
    }

    pub fn address(self, tag: OptionTag, address: Ipv4Addr) -> Self {
        self.option(tag, address.octets().to_vec())
    }

    pub fn time(self, tag: OptionTag, secs: u32) -> Self {
        self.option(tag, secs.to_be_bytes().to_vec())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = vec![0u8; OFFSET_OPTIONS];
        buffer[0] = 2; // BOOTREPLY
        buffer[1] = 1;
        buffer[2] = 6;
        buffer[4..8].copy_from_slice(&self.transaction_id.to_be_bytes());
        buffer[16..20].copy_from_slice(&self.your_ip_address.octets());
        buffer[20..24].copy_from_slice(&self.server_ip_address.octets());
        buffer[28..34].copy_from_slice(&self.client_hardware_address);
        if let Some(ref name) = self.boot_file_name {
            buffer[108..108 + name.len()].copy_from_slice(name.as_bytes());
        }
        Self::put_region(&mut buffer[108..236], &self.file_options);
        Self::put_region(&mut buffer[44..108], &self.sname_options);
        buffer[236..240].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());

        for (tag, value) in self.options.iter() {
            buffer.push(*tag);
            buffer.push(value.len() as u8);
            buffer.extend_from_slice(value);
        }
        buffer.push(OptionTag::End as u8);
        buffer.resize(300, 0);
        buffer
    }

    fn put_region(region: &mut [u8], options: &[(u8, Vec<u8>)]) {
        if options.is_empty() {
            return;
        }
        let mut offset = 0;
        for (tag, value) in options.iter() {
            region[offset] = *tag;
            region[offset + 1] = value.len() as u8;
            region[offset + 2..offset + 2 + value.len()].copy_from_slice(value);
            offset += 2 + value.len();
        }
        region[offset] = OptionTag::End as u8;
    }
}

pub fn offer(transaction_id: u32) -> Reply {
    Reply::new(MessageType::DhcpOffer, transaction_id, OFFERED)
        .address(OptionTag::DhcpServerId, SERVER)
        .time(OptionTag::AddressTime, 3600)
}

pub fn ack(transaction_id: u32) -> Reply {
    Reply::new(MessageType::DhcpAck, transaction_id, OFFERED)
        .address(OptionTag::DhcpServerId, SERVER)
        .time(OptionTag::AddressTime, 3600)
        .address(OptionTag::SubnetMask, NETMASK)
        .address(OptionTag::Routers, ROUTER)
}

pub fn nak(transaction_id: u32) -> Reply {
    Reply::new(MessageType::DhcpNak, transaction_id, Ipv4Addr::UNSPECIFIED)
        .address(OptionTag::DhcpServerId, SERVER)
}

/// One client with one interface and a recording observer.
pub struct Harness {
    pub client: Client<FakeTransport>,
    pub id: InterfaceId,
    pub interface: Arc<Mutex<InterfaceState>>,
    pub events: Arc<Mutex<Vec<LeaseEvent>>>,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        Self::with_interface(config, FakeInterface::new("eth0", CLIENT_MAC))
    }

    pub fn with_interface(config: Config, interface: FakeInterface) -> Self {
        init_logger();
        let state = interface.state.clone();
        let mut client = Client::with_rng(config, FakeTransport::default(), StdRng::seed_from_u64(7));
        let id = client.add_interface(Box::new(interface));
        Harness {
            client,
            id,
            interface: state,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Starts the client and records the lease events from then on.
    pub fn start(&mut self) {
        self.client.start(self.id).unwrap();
        let events = self.events.clone();
        self.client
            .set_observer(
                self.id,
                Some(Box::new(move |_: InterfaceId, event: &LeaseEvent| {
                    events.lock().unwrap().push(event.clone())
                })),
            )
            .unwrap();
    }

    pub fn started() -> Self {
        let mut harness = Self::new(Config::default());
        harness.start();
        harness
    }

    /// Runs DISCOVER, OFFER, REQUEST and ACK.
    pub fn bound() -> Self {
        let mut harness = Self::started();
        harness.deliver(&offer(harness.transaction_id()));
        harness.deliver(&ack(harness.transaction_id()));
        harness.settle();
        assert_eq!(harness.state(), State::Bound);
        harness
    }

    pub fn deliver(&mut self, reply: &Reply) {
        self.client.receive(self.id, &reply.encode());
    }

    /// Waits out the ARP check of an acknowledged address.
    #[cfg(feature = "arp-check")]
    pub fn settle(&mut self) {
        for _ in 0..4 {
            if self.state() != State::Checking {
                return;
            }
            self.client.fine_tick();
        }
    }

    #[cfg(not(feature = "arp-check"))]
    pub fn settle(&mut self) {}

    pub fn fine_ticks(&mut self, count: usize) {
        for _ in 0..count {
            self.client.fine_tick();
        }
    }

    pub fn coarse_ticks(&mut self, count: usize) {
        for _ in 0..count {
            self.client.coarse_tick();
        }
    }

    pub fn state(&self) -> State {
        self.client.state(self.id).unwrap()
    }

    pub fn transaction_id(&self) -> u32 {
        self.client.record(self.id).unwrap().transaction_id()
    }

    pub fn sent(&self) -> &[Sent] {
        &self.client.transport().sent
    }

    pub fn last_sent(&self) -> &Sent {
        self.sent().last().unwrap()
    }

    pub fn sent_types(&self) -> Vec<MessageType> {
        self.sent().iter().map(Sent::message_type).collect()
    }

    pub fn clear_sent(&mut self) {
        self.client.transport_mut().sent.clear();
    }

    pub fn address(&self) -> Ipv4Addr {
        self.interface.lock().unwrap().address
    }

    pub fn events(&self) -> Vec<LeaseEvent> {
        self.events.lock().unwrap().clone()
    }
}
