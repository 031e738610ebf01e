//! DHCP reply deserialization module.

use std::net::Ipv4Addr;

use bytes::Buf;
use eui48::{MacAddress, EUI48LEN};

use super::{
    constants::*,
    options::{MessageType, OptionTag, Overload},
    Header,
};
use crate::ParseError;

/// Checks if the option value has exactly the width it is decoded with.
macro_rules! check_length(
    ($tag:expr, $value:expr, $correct:expr) => (
        if $value.len() != $correct {
            return Err(ParseError::InvalidLength { tag: $tag, length: $value.len() });
        }
    );
);

impl Header {
    /// Reads the fixed fields up to and including `chaddr`.
    ///
    /// # Errors
    /// `ParseError::TooShort` if the datagram is shorter than `SIZE_REPLY_MINIMAL`.
    pub fn parse(src: &[u8]) -> Result<Self, ParseError> {
        if src.len() < SIZE_REPLY_MINIMAL {
            return Err(ParseError::TooShort(src.len()));
        }

        let mut cursor = src;
        let operation_code = cursor.get_u8().into();
        cursor.advance(3); // htype, hlen, hops
        let transaction_id = cursor.get_u32();
        cursor.advance(4); // secs, flags
        let client_ip_address = Ipv4Addr::from(cursor.get_u32());
        let your_ip_address = Ipv4Addr::from(cursor.get_u32());
        let server_ip_address = Ipv4Addr::from(cursor.get_u32());
        cursor.advance(4); // giaddr
        let client_hardware_address = MacAddress::from_bytes(&cursor[..EUI48LEN])
            .map_err(|_| ParseError::TooShort(src.len()))?;

        Ok(Header {
            operation_code,
            transaction_id,
            client_ip_address,
            your_ip_address,
            server_ip_address,
            client_hardware_address,
        })
    }
}

/// Walks one options region, yielding `(code, value)` pairs.
///
/// PAD octets are skipped. The walk ends at END, at the end of the region,
/// or as soon as a length octet or a value would cross the region end, so a
/// region missing its END is never read past its bounds.
#[derive(Debug, Clone)]
pub struct OptionIter<'a> {
    region: &'a [u8],
}

impl<'a> OptionIter<'a> {
    pub fn new(region: &'a [u8]) -> Self {
        OptionIter { region }
    }
}

impl<'a> Iterator for OptionIter<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (&code, rest) = self.region.split_first()?;
            match OptionTag::from(code) {
                OptionTag::Pad => {
                    self.region = rest;
                    continue;
                }
                OptionTag::End => {
                    self.region = &[];
                    return None;
                }
                _ => {}
            }

            let (&length, rest) = match rest.split_first() {
                Some(split) => split,
                None => {
                    self.region = &[];
                    return None;
                }
            };
            let length = length as usize;
            if rest.len() < length {
                self.region = &[];
                return None;
            }

            let (value, rest) = rest.split_at(length);
            self.region = rest;
            return Some((code, value));
        }
    }
}

/// How many multi-valued servers are kept from a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionLimits {
    pub max_dns_servers: usize,
    pub max_ntp_servers: usize,
}

impl Default for OptionLimits {
    fn default() -> Self {
        OptionLimits {
            max_dns_servers: 2,
            max_ntp_servers: 1,
        }
    }
}

/// The options a client acts upon, decoded from one reply.
///
/// Only the first occurrence of each option counts.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplyOptions {
    pub message_type: Option<MessageType>,
    pub overload: Option<Overload>,
    pub server_id: Option<Ipv4Addr>,
    pub lease_time: Option<u32>,
    pub renewal_time: Option<u32>,
    pub rebinding_time: Option<u32>,
    pub subnet_mask: Option<Ipv4Addr>,
    /// The first router only.
    pub router: Option<Ipv4Addr>,
    pub dns_servers: Option<Vec<Ipv4Addr>>,
    pub ntp_servers: Option<Vec<Ipv4Addr>>,
    /// The `file` header field, unless it carries options.
    pub boot_file_name: Option<String>,
}

impl ReplyOptions {
    /// Decodes the options area and then every overloaded header field.
    ///
    /// # Errors
    /// `TooShort` without the options area, `MagicCookie` on a foreign
    /// cookie, `InvalidLength` if a recognized option has a width it cannot
    /// be decoded with.
    pub fn parse(src: &[u8], limits: &OptionLimits) -> Result<Self, ParseError> {
        if src.len() < OFFSET_OPTIONS {
            return Err(ParseError::TooShort(src.len()));
        }
        let cookie = (&src[OFFSET_MAGIC_COOKIE..OFFSET_OPTIONS]).get_u32();
        if cookie != MAGIC_COOKIE {
            return Err(ParseError::MagicCookie(cookie));
        }

        let mut options = ReplyOptions::default();
        options.append(&src[OFFSET_OPTIONS..], limits)?;

        let overload = options.overload.unwrap_or(Overload::Undefined);
        for region in overload.regions() {
            options.append(&src[region.clone()], limits)?;
        }

        if !overload.covers_file() {
            options.boot_file_name = Self::boot_file_name(&src[OFFSET_BOOT_FILENAME..OFFSET_MAGIC_COOKIE]);
        }
        Ok(options)
    }

    fn append(&mut self, region: &[u8], limits: &OptionLimits) -> Result<(), ParseError> {
        for (code, value) in OptionIter::new(region) {
            match OptionTag::from(code) {
                OptionTag::SubnetMask if self.subnet_mask.is_none() => {
                    check_length!(code, value, 4);
                    self.subnet_mask = Some(Self::ipv4(value));
                }
                OptionTag::Routers if self.router.is_none() => {
                    if value.len() < 4 {
                        return Err(ParseError::InvalidLength { tag: code, length: value.len() });
                    }
                    self.router = Some(Self::ipv4(value));
                }
                OptionTag::DomainNameServers if self.dns_servers.is_none() => {
                    let servers = value
                        .chunks_exact(4)
                        .take(limits.max_dns_servers)
                        .map(Self::ipv4)
                        .collect();
                    self.dns_servers = Some(servers);
                }
                OptionTag::NtpServers if self.ntp_servers.is_none() => {
                    if value.len() % 4 != 0 {
                        return Err(ParseError::InvalidLength { tag: code, length: value.len() });
                    }
                    let servers = value
                        .chunks_exact(4)
                        .take(limits.max_ntp_servers)
                        .map(Self::ipv4)
                        .collect();
                    self.ntp_servers = Some(servers);
                }
                OptionTag::AddressTime if self.lease_time.is_none() => {
                    check_length!(code, value, 4);
                    self.lease_time = Some((&value[..]).get_u32());
                }
                OptionTag::Overload if self.overload.is_none() => {
                    check_length!(code, value, 1);
                    self.overload = Some(Overload::from(value[0]));
                }
                OptionTag::DhcpMessageType if self.message_type.is_none() => {
                    check_length!(code, value, 1);
                    self.message_type = Some(MessageType::from(value[0]));
                }
                OptionTag::DhcpServerId if self.server_id.is_none() => {
                    check_length!(code, value, 4);
                    self.server_id = Some(Self::ipv4(value));
                }
                OptionTag::RenewalTime if self.renewal_time.is_none() => {
                    check_length!(code, value, 4);
                    self.renewal_time = Some((&value[..]).get_u32());
                }
                OptionTag::RebindingTime if self.rebinding_time.is_none() => {
                    check_length!(code, value, 4);
                    self.rebinding_time = Some((&value[..]).get_u32());
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Must be called with at least 4 bytes.
    fn ipv4(mut value: &[u8]) -> Ipv4Addr {
        Ipv4Addr::from(value.get_u32())
    }

    fn boot_file_name(field: &[u8]) -> Option<String> {
        let end = field.iter().position(|b| *b == 0).unwrap_or_else(|| field.len());
        if end == 0 {
            return None;
        }
        Some(String::from_utf8_lossy(&field[..end]).into_owned())
    }
}
