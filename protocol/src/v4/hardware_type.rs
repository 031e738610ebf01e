//! DHCP message hardware type module.

/// BOOTP `htype` field.
///
/// Only 10Mb Ethernet (MAC-48) interfaces are managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareType {
    Undefined = 0,
    Ethernet = 1,
}

impl HardwareType {
    /// The `hlen` value written next to `htype`.
    pub fn address_length(self) -> u8 {
        match self {
            HardwareType::Ethernet => eui48::EUI48LEN as u8,
            HardwareType::Undefined => 0,
        }
    }
}

impl From<u8> for HardwareType {
    fn from(value: u8) -> Self {
        match value {
            1 => HardwareType::Ethernet,
            _ => HardwareType::Undefined,
        }
    }
}
