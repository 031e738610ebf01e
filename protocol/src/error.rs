//! Reply parsing errors.

use thiserror::Error;

/// Why an inbound datagram was rejected by the parser.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("Message is too short: {0} bytes")]
    TooShort(usize),
    #[error("Invalid magic cookie: {0:#010x}")]
    MagicCookie(u32),
    #[error("Option {tag} has invalid length {length}")]
    InvalidLength { tag: u8, length: usize },
}
