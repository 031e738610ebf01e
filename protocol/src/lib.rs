//! DHCPv4 wire format shared by the client engine and its transports.
//!
//! Only the parts a client needs are here: a request writer and a reply parser.

mod error;
pub mod v4;

pub use self::{
    error::ParseError,
    v4::{
        constants::*,
        Header,
        HardwareType,
        MessageType,
        MessageWriter,
        OperationCode,
        OptionIter,
        OptionLimits,
        OptionTag,
        Overload,
        ReplyOptions,
    },
};
