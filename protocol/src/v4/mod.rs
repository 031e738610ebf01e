//! The DHCPv4 message module.

pub mod constants;
pub mod hardware_type;
pub mod operation_code;
pub mod options;

mod deserializer;
mod serializer;

use std::net::Ipv4Addr;

use eui48::MacAddress;

pub use self::{
    deserializer::{OptionIter, OptionLimits, ReplyOptions},
    hardware_type::HardwareType,
    operation_code::OperationCode,
    options::{MessageType, OptionTag, Overload},
    serializer::MessageWriter,
};

/// The fixed BOOTP header fields the client reads or writes.
///
/// `hops`, `secs`, `flags` and `giaddr` are always zero in client messages
/// and are ignored in replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub operation_code: OperationCode,
    pub transaction_id: u32,
    pub client_ip_address: Ipv4Addr,
    pub your_ip_address: Ipv4Addr,
    pub server_ip_address: Ipv4Addr,
    pub client_hardware_address: MacAddress,
}

impl Header {
    /// A client request header with the unused addresses zeroed.
    pub fn request(
        transaction_id: u32,
        client_ip_address: Ipv4Addr,
        client_hardware_address: MacAddress,
    ) -> Self {
        Header {
            operation_code: OperationCode::BootRequest,
            transaction_id,
            client_ip_address,
            your_ip_address: Ipv4Addr::UNSPECIFIED,
            server_ip_address: Ipv4Addr::UNSPECIFIED,
            client_hardware_address,
        }
    }
}
