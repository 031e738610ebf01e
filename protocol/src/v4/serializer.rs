//! DHCP message serialization module.

use std::{io, net::Ipv4Addr};

use bytes::{BufMut, BytesMut};
use eui48::EUI48LEN;

use super::{
    constants::*,
    options::{MessageType, OptionTag},
    HardwareType,
    Header,
};

/// Checks if there is enough space in the options area to put a value.
macro_rules! check_remaining(
    ($writer:expr, $distance:expr) => (
        if $writer.remaining() < $distance {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "Options area is too small"));
        }
    )
);

/// Writes one outbound message.
///
/// The header, the magic cookie and the message type option are written on
/// construction, so the message type is always the first option. The options
/// area is limited to `SIZE_OPTIONS_MAXIMAL` bytes, which keeps the datagram
/// within the minimal size every server must accept.
#[derive(Debug)]
pub struct MessageWriter {
    buffer: BytesMut,
}

impl MessageWriter {
    pub fn new(header: &Header, message_type: MessageType) -> Self {
        let mut buffer = BytesMut::with_capacity(OFFSET_OPTIONS + SIZE_OPTIONS_MAXIMAL);
        buffer.put_u8(header.operation_code as u8);
        buffer.put_u8(HardwareType::Ethernet as u8);
        buffer.put_u8(HardwareType::Ethernet.address_length());
        buffer.put_u8(0); // hops
        buffer.put_u32(header.transaction_id);
        buffer.put_u16(0); // secs
        buffer.put_u16(0); // flags
        buffer.put_u32(u32::from(header.client_ip_address));
        buffer.put_u32(u32::from(header.your_ip_address));
        buffer.put_u32(u32::from(header.server_ip_address));
        buffer.put_u32(0); // giaddr
        buffer.put_slice(header.client_hardware_address.as_bytes());
        buffer.put_slice(&[0u8; SIZE_HARDWARE_ADDRESS - EUI48LEN]);
        buffer.put_slice(&[0u8; SIZE_SERVER_NAME]);
        buffer.put_slice(&[0u8; SIZE_BOOT_FILENAME]);
        buffer.put_u32(MAGIC_COOKIE);

        buffer.put_u8(OptionTag::DhcpMessageType as u8);
        buffer.put_u8(1);
        buffer.put_u8(message_type as u8);

        MessageWriter { buffer }
    }

    /// Bytes written after the magic cookie.
    pub fn options_len(&self) -> usize {
        self.buffer.len() - OFFSET_OPTIONS
    }

    /// Bytes left in the options area.
    pub fn remaining(&self) -> usize {
        SIZE_OPTIONS_MAXIMAL.saturating_sub(self.options_len())
    }

    pub fn put_u8(&mut self, tag: OptionTag, value: u8) -> io::Result<()> {
        self.put_prefix(tag, 1)?;
        self.buffer.put_u8(value);
        Ok(())
    }

    pub fn put_u16(&mut self, tag: OptionTag, value: u16) -> io::Result<()> {
        self.put_prefix(tag, 2)?;
        self.buffer.put_u16(value);
        Ok(())
    }

    pub fn put_u32(&mut self, tag: OptionTag, value: u32) -> io::Result<()> {
        self.put_prefix(tag, 4)?;
        self.buffer.put_u32(value);
        Ok(())
    }

    pub fn put_ipv4(&mut self, tag: OptionTag, value: Ipv4Addr) -> io::Result<()> {
        self.put_u32(tag, u32::from(value))
    }

    pub fn put_bytes(&mut self, tag: OptionTag, value: &[u8]) -> io::Result<()> {
        self.put_prefix(tag, value.len())?;
        self.buffer.put_slice(value);
        Ok(())
    }

    /// Appends the hostname, cut down to what fits before the END option.
    ///
    /// Nothing is written if there is no room for a single character.
    pub fn put_hostname(&mut self, hostname: &str) -> io::Result<()> {
        let available = self
            .remaining()
            .saturating_sub(SIZE_OPTION_PREFIX + 1)
            .min(u8::max_value() as usize);
        let length = hostname.len().min(available);
        if length == 0 {
            return Ok(());
        }
        self.put_bytes(OptionTag::Hostname, &hostname.as_bytes()[..length])
    }

    /// Terminates the options with END and pads them to at least
    /// `SIZE_OPTIONS_MINIMAL` bytes and a multiple of 4.
    pub fn finish(mut self) -> io::Result<BytesMut> {
        check_remaining!(self, 1);
        self.buffer.put_u8(OptionTag::End as u8);
        while self.options_len() < SIZE_OPTIONS_MINIMAL || self.options_len() % 4 != 0 {
            self.buffer.put_u8(OptionTag::Pad as u8);
        }
        Ok(self.buffer)
    }

    fn put_prefix(&mut self, tag: OptionTag, length: usize) -> io::Result<()> {
        if length > u8::max_value() as usize {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "Option value is too long"));
        }
        // one more octet is always kept for END
        check_remaining!(self, SIZE_OPTION_PREFIX + length + 1);
        self.buffer.put_u8(tag as u8);
        self.buffer.put_u8(length as u8);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v4::OperationCode;
    use eui48::MacAddress;

    fn writer(message_type: MessageType) -> MessageWriter {
        let header = Header::request(
            0xdeadbeef,
            Ipv4Addr::new(10, 0, 0, 5),
            MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]),
        );
        MessageWriter::new(&header, message_type)
    }

    #[test]
    fn header_layout() {
        let message = writer(MessageType::DhcpDiscover).finish().unwrap();

        assert_eq!(message[0], OperationCode::BootRequest as u8);
        assert_eq!(message[1], 1);
        assert_eq!(message[2], 6);
        assert_eq!(&message[4..8], &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(&message[12..16], &[10, 0, 0, 5]);
        assert_eq!(&message[28..34], &[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert!(message[34..OFFSET_MAGIC_COOKIE].iter().all(|b| *b == 0));
        assert_eq!(&message[OFFSET_MAGIC_COOKIE..OFFSET_OPTIONS], &[0x63, 0x82, 0x53, 0x63]);
        assert_eq!(&message[OFFSET_OPTIONS..OFFSET_OPTIONS + 3], &[53, 1, 1]);
    }

    #[test]
    fn trailer_is_padded_to_minimal_aligned_size() {
        let message = writer(MessageType::DhcpRelease).finish().unwrap();
        let options = &message[OFFSET_OPTIONS..];

        assert_eq!(options.len(), SIZE_OPTIONS_MINIMAL);
        assert_eq!(options[3], OptionTag::End as u8);
        assert!(options[4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn trailer_is_aligned_past_minimal_size() {
        let mut writer = writer(MessageType::DhcpRequest);
        writer.put_bytes(OptionTag::ParameterList, &[0u8; 70]).unwrap();
        let message = writer.finish().unwrap();

        // 3 + 72 + END = 76
        assert_eq!(message.len() - OFFSET_OPTIONS, 76);
    }

    #[test]
    fn hostname_is_truncated_to_the_free_space() {
        let mut writer = writer(MessageType::DhcpDiscover);
        writer.put_bytes(OptionTag::ParameterList, &[0u8; 255]).unwrap();
        writer.put_hostname(&"h".repeat(200)).unwrap();

        // 45 characters fit after the parameter list
        assert_eq!(writer.remaining(), 1);
        let message = writer.finish().unwrap();
        assert_eq!(message.len() - OFFSET_OPTIONS, SIZE_OPTIONS_MAXIMAL);
    }

    #[test]
    fn overflow_is_reported() {
        let mut writer = writer(MessageType::DhcpDiscover);
        writer.put_bytes(OptionTag::ParameterList, &[0u8; 255]).unwrap();
        let error = writer.put_bytes(OptionTag::ParameterList, &[0u8; 64]).unwrap_err();

        assert_eq!(error.kind(), io::ErrorKind::WriteZero);
    }
}
