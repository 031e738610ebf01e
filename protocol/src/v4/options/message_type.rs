//! DHCP message type module.

use std::fmt;

/// DHCP message type (RFC 2132 §9.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Undefined = 0,
    DhcpDiscover = 1,
    DhcpOffer = 2,
    DhcpRequest = 3,
    DhcpDecline = 4,
    DhcpAck = 5,
    DhcpNak = 6,
    DhcpRelease = 7,
    DhcpInform = 8,
}

impl MessageType {
    /// Only a REQUEST continues the transaction of the DISCOVER before it.
    pub fn reuses_transaction_id(self) -> bool {
        self == MessageType::DhcpRequest
    }

    /// The RFC 2131 name.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::DhcpDiscover => "DHCPDISCOVER",
            MessageType::DhcpOffer => "DHCPOFFER",
            MessageType::DhcpRequest => "DHCPREQUEST",
            MessageType::DhcpDecline => "DHCPDECLINE",
            MessageType::DhcpAck => "DHCPACK",
            MessageType::DhcpNak => "DHCPNAK",
            MessageType::DhcpRelease => "DHCPRELEASE",
            MessageType::DhcpInform => "DHCPINFORM",
            MessageType::Undefined => "UNDEFINED",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<u8> for MessageType {
    fn from(value: u8) -> Self {
        const TYPES: [MessageType; 9] = [
            MessageType::Undefined,
            MessageType::DhcpDiscover,
            MessageType::DhcpOffer,
            MessageType::DhcpRequest,
            MessageType::DhcpDecline,
            MessageType::DhcpAck,
            MessageType::DhcpNak,
            MessageType::DhcpRelease,
            MessageType::DhcpInform,
        ];
        TYPES
            .get(value as usize)
            .copied()
            .unwrap_or(MessageType::Undefined)
    }
}
