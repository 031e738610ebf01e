//! DHCP options module.

mod message_type;
mod option_tag;
mod overload;

pub use self::{message_type::MessageType, option_tag::OptionTag, overload::Overload};
