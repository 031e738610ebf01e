//! DHCP option tags module.

/// The option codes the client writes or understands.
///
/// Everything else is skipped by the parser as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionTag {
    Pad = 0,

    // RFC 1497 Vendor Extensions (RFC 2132 §3)
    SubnetMask = 1,
    Routers = 3,
    DomainNameServers = 6,
    Hostname = 12,
    // IP Layer Parameters per Interface (RFC 2132 §5)
    BroadcastAddress = 28,
    // Application and Service Parameters (RFC 2132 §8)
    NtpServers = 42,
    // DHCP Extensions (RFC 2132 §9)
    AddressRequest = 50,
    AddressTime = 51,
    Overload = 52,
    DhcpMessageType = 53,
    DhcpServerId = 54,
    ParameterList = 55,
    DhcpMaxMessageSize = 57,
    RenewalTime = 58,
    RebindingTime = 59,

    End = 255,

    /// Never written. The raw code stays available from `OptionIter`.
    Unknown = 256,
}

impl From<u8> for OptionTag {
    fn from(value: u8) -> Self {
        use self::OptionTag::*;
        match value {
            0 => Pad,
            1 => SubnetMask,
            3 => Routers,
            6 => DomainNameServers,
            12 => Hostname,
            28 => BroadcastAddress,
            42 => NtpServers,
            50 => AddressRequest,
            51 => AddressTime,
            52 => Overload,
            53 => DhcpMessageType,
            54 => DhcpServerId,
            55 => ParameterList,
            57 => DhcpMaxMessageSize,
            58 => RenewalTime,
            59 => RebindingTime,
            255 => End,

            _ => Unknown,
        }
    }
}
