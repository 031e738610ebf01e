//! A builder for the DHCP client messages.

use std::{io, net::Ipv4Addr};

use bytes::BytesMut;
use eui48::MacAddress;

use dhcp_protocol::*;

/// The maximal message size sent while verifying a lease after a reboot.
const SIZE_MESSAGE_REBOOT: u16 = SIZE_MESSAGE_MINIMAL as u16;

/// Builds the client messages of one interface.
///
/// Every message starts with the message type and ends with the padded
/// trailer. `ciaddr` is only filled where RFC 2131 §4.3.6 requires it, so
/// callers pass the interface address to those builders alone.
pub struct MessageBuilder<'a> {
    /// Mandatory `MAC-48` address.
    client_hardware_address: MacAddress,
    /// Advertised as the maximal message size the client accepts.
    mtu: u16,
    /// The optional machine hostname.
    hostname: Option<&'a str>,
    /// Whether NTP servers are in the parameter request list.
    request_ntp_servers: bool,
}

impl<'a> MessageBuilder<'a> {
    pub fn new(
        client_hardware_address: MacAddress,
        mtu: u16,
        hostname: Option<&'a str>,
        request_ntp_servers: bool,
    ) -> Self {
        MessageBuilder {
            client_hardware_address,
            mtu,
            hostname,
            request_ntp_servers,
        }
    }

    /// Creates a `DHCPDISCOVER`.
    pub fn discover(&self, transaction_id: u32) -> io::Result<BytesMut> {
        let mut writer = self.writer(transaction_id, Ipv4Addr::UNSPECIFIED, MessageType::DhcpDiscover);
        writer.put_u16(OptionTag::DhcpMaxMessageSize, self.mtu)?;
        self.append_hostname(&mut writer)?;
        writer.put_bytes(OptionTag::ParameterList, &self.parameter_list())?;
        writer.finish()
    }

    /// Creates a `DHCPREQUEST` in `SELECTING` state.
    pub fn request_selecting(
        &self,
        transaction_id: u32,
        address_request: Ipv4Addr,
        dhcp_server_id: Ipv4Addr,
    ) -> io::Result<BytesMut> {
        let mut writer = self.writer(transaction_id, Ipv4Addr::UNSPECIFIED, MessageType::DhcpRequest);
        writer.put_u16(OptionTag::DhcpMaxMessageSize, self.mtu)?;
        writer.put_ipv4(OptionTag::AddressRequest, address_request)?;
        writer.put_ipv4(OptionTag::DhcpServerId, dhcp_server_id)?;
        writer.put_bytes(OptionTag::ParameterList, &self.parameter_list())?;
        self.append_hostname(&mut writer)?;
        writer.finish()
    }

    /// Creates a `DHCPREQUEST` in `RENEWING` or `REBINDING` state.
    ///
    /// The leased address goes into `ciaddr` and nowhere else.
    pub fn request_renewing(&self, transaction_id: u32, client_ip_address: Ipv4Addr) -> io::Result<BytesMut> {
        let mut writer = self.writer(transaction_id, client_ip_address, MessageType::DhcpRequest);
        writer.put_u16(OptionTag::DhcpMaxMessageSize, self.mtu)?;
        writer.put_bytes(OptionTag::ParameterList, &self.parameter_list())?;
        self.append_hostname(&mut writer)?;
        writer.finish()
    }

    /// Creates a `DHCPREQUEST` in `INIT-REBOOT` state.
    pub fn request_init_reboot(&self, transaction_id: u32, address_request: Ipv4Addr) -> io::Result<BytesMut> {
        let mut writer = self.writer(transaction_id, Ipv4Addr::UNSPECIFIED, MessageType::DhcpRequest);
        writer.put_u16(OptionTag::DhcpMaxMessageSize, SIZE_MESSAGE_REBOOT)?;
        writer.put_ipv4(OptionTag::AddressRequest, address_request)?;
        writer.put_bytes(OptionTag::ParameterList, &self.parameter_list())?;
        self.append_hostname(&mut writer)?;
        writer.finish()
    }

    /// Creates a `DHCPDECLINE` for an address found to be in use.
    pub fn decline(
        &self,
        transaction_id: u32,
        client_ip_address: Ipv4Addr,
        address_request: Ipv4Addr,
        dhcp_server_id: Ipv4Addr,
    ) -> io::Result<BytesMut> {
        let mut writer = self.writer(transaction_id, client_ip_address, MessageType::DhcpDecline);
        writer.put_ipv4(OptionTag::AddressRequest, address_request)?;
        writer.put_ipv4(OptionTag::DhcpServerId, dhcp_server_id)?;
        writer.finish()
    }

    /// Creates a `DHCPRELEASE`.
    pub fn release(
        &self,
        transaction_id: u32,
        client_ip_address: Ipv4Addr,
        dhcp_server_id: Ipv4Addr,
    ) -> io::Result<BytesMut> {
        let mut writer = self.writer(transaction_id, client_ip_address, MessageType::DhcpRelease);
        writer.put_ipv4(OptionTag::DhcpServerId, dhcp_server_id)?;
        writer.finish()
    }

    /// Creates a `DHCPINFORM` for a manually configured address.
    pub fn inform(&self, transaction_id: u32, client_ip_address: Ipv4Addr) -> io::Result<BytesMut> {
        let mut writer = self.writer(transaction_id, client_ip_address, MessageType::DhcpInform);
        writer.put_u16(OptionTag::DhcpMaxMessageSize, self.mtu)?;
        writer.finish()
    }

    fn writer(&self, transaction_id: u32, client_ip_address: Ipv4Addr, message_type: MessageType) -> MessageWriter {
        let header = Header::request(transaction_id, client_ip_address, self.client_hardware_address);
        MessageWriter::new(&header, message_type)
    }

    fn append_hostname(&self, writer: &mut MessageWriter) -> io::Result<()> {
        match self.hostname {
            Some(hostname) => writer.put_hostname(hostname),
            None => Ok(()),
        }
    }

    /// The parameters the client configures from a lease.
    fn parameter_list(&self) -> Vec<u8> {
        let mut list = vec![
            OptionTag::SubnetMask as u8,
            OptionTag::Routers as u8,
            OptionTag::BroadcastAddress as u8,
            OptionTag::DomainNameServers as u8,
        ];
        if self.request_ntp_servers {
            list.push(OptionTag::NtpServers as u8);
        }
        list
    }
}
