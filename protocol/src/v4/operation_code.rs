//! BOOTP operation code module.

use std::fmt;

/// BOOTP `op` field. Clients send requests and only accept replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationCode {
    Undefined = 0,
    BootRequest = 1,
    BootReply = 2,
}

impl OperationCode {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationCode::BootRequest => "BOOTREQUEST",
            OperationCode::BootReply => "BOOTREPLY",
            OperationCode::Undefined => "UNDEFINED",
        }
    }
}

impl From<u8> for OperationCode {
    fn from(value: u8) -> Self {
        match value {
            1 => OperationCode::BootRequest,
            2 => OperationCode::BootReply,
            _ => OperationCode::Undefined,
        }
    }
}

impl fmt::Display for OperationCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
