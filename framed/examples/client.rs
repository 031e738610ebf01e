//! Run this with administrator privileges where it is required
//! in order to bind the DHCP client socket to its port 68.
//!
//! The interface is not really configured: the leases are only logged.
//! Usage: `client [INTERFACE] [MAC]`

#[macro_use]
extern crate log;

use std::net::Ipv4Addr;

use eui48::MacAddress;
use tokio::signal;

use dhcp_client::{Client, Config, NetworkInterface};
use dhcp_framed::{Driver, UdpTransport};

struct LoggedInterface {
    name: String,
    hardware_address: MacAddress,
    address: Ipv4Addr,
}

impl NetworkInterface for LoggedInterface {
    fn name(&self) -> &str {
        &self.name
    }

    fn hardware_address(&self) -> MacAddress {
        self.hardware_address
    }

    fn is_up(&self) -> bool {
        true
    }

    fn is_ethernet(&self) -> bool {
        true
    }

    fn is_link_up(&self) -> bool {
        true
    }

    fn mtu(&self) -> u16 {
        1500
    }

    fn address(&self) -> Ipv4Addr {
        self.address
    }

    fn set_address(&mut self, address: Ipv4Addr, netmask: Ipv4Addr, gateway: Ipv4Addr) {
        info!("{}: address {} netmask {} gateway {}", self.name, address, netmask, gateway);
        self.address = address;
    }

    fn set_dns_servers(&mut self, servers: &[Ipv4Addr]) {
        info!("{}: DNS servers {:?}", self.name, servers);
    }
}

#[tokio::main]
async fn main() {
    std::env::set_var("RUST_LOG", "client=trace,dhcp_client=debug,dhcp_framed=trace");
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let name = args.get(1).cloned().unwrap_or_else(|| "eth0".to_owned());
    let hardware_address = args
        .get(2)
        .and_then(|mac| MacAddress::parse_str(mac).ok())
        .unwrap_or_else(|| MacAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]));

    let config = Config::default().with_system_hostname();
    let mut client = Client::new(config, UdpTransport::new());
    let id = client.add_interface(Box::new(LoggedInterface {
        name,
        hardware_address,
        address: Ipv4Addr::UNSPECIFIED,
    }));

    let (driver, handle) = Driver::new(client);
    let task = tokio::spawn(driver.run());

    if let Err(error) = handle.start(id).await {
        error!("Error: {}", error);
        return;
    }

    if let Err(error) = signal::ctrl_c().await {
        error!("Error: {}", error);
    }
    match handle.lease(id).await {
        Some(lease) => info!("Releasing {:?}", lease),
        None => info!("No lease to release"),
    }
    if let Err(error) = handle.release(id).await {
        warn!("Error: {}", error);
    }
    handle.stop(id).await;
    drop(handle);

    if task.await.is_err() {
        error!("The DHCP driver has panicked");
    }
}
