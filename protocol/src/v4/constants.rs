//! DHCP message constants.

/// `client_hardware_address` size in bytes.
pub const SIZE_HARDWARE_ADDRESS: usize = 16;

/// `server_name` size in bytes.
pub const SIZE_SERVER_NAME: usize = 64;

/// `boot_filename` size in bytes.
pub const SIZE_BOOT_FILENAME: usize = 128;

/// The `client_hardware_address` field offset in bytes.
pub const OFFSET_CLIENT_HARDWARE_ADDRESS: usize = 28;

/// The `server_name` field offset in bytes.
pub const OFFSET_SERVER_NAME: usize = OFFSET_CLIENT_HARDWARE_ADDRESS + SIZE_HARDWARE_ADDRESS;

/// The `boot_filename` field offset in bytes.
pub const OFFSET_BOOT_FILENAME: usize = OFFSET_SERVER_NAME + SIZE_SERVER_NAME;

/// DHCP options magic cookie offset in bytes. Also the BOOTP header size.
pub const OFFSET_MAGIC_COOKIE: usize = OFFSET_BOOT_FILENAME + SIZE_BOOT_FILENAME;

/// DHCP options themselves offset in bytes.
pub const OFFSET_OPTIONS: usize = OFFSET_MAGIC_COOKIE + ::std::mem::size_of::<u32>();

/// Replies shorter than this cannot even carry the client hardware address.
pub const SIZE_REPLY_MINIMAL: usize = OFFSET_SERVER_NAME;

/// The magic number before the DHCP options.
pub const MAGIC_COOKIE: u32 = 0x63825363;

/// The size of the IP header without options.
pub const SIZE_HEADER_IP: usize = 20;

/// The size of the UDP header.
pub const SIZE_HEADER_UDP: usize = 8;

/// The minimal message size the client MUST be able to accept.
pub const SIZE_MESSAGE_MINIMAL: usize = 576;

/// The options area of an outbound message (RFC 2131 §2, 312 minus the cookie).
pub const SIZE_OPTIONS_MAXIMAL: usize =
    SIZE_MESSAGE_MINIMAL - SIZE_HEADER_IP - SIZE_HEADER_UDP - OFFSET_OPTIONS;

/// Outbound options are padded at least up to this size (BOOTP vendor area).
pub const SIZE_OPTIONS_MINIMAL: usize = 68;

/// The option tag and length octets.
pub const SIZE_OPTION_PREFIX: usize = 2;

/// The DHCP server UDP port.
pub const DHCP_PORT_SERVER: u16 = 67;

/// The DHCP client UDP port.
pub const DHCP_PORT_CLIENT: u16 = 68;
