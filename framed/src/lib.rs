//! Runs the DHCP client engine on tokio.
//!
//! `UdpTransport` is the client socket and `Driver` the task feeding the
//! engine its timer ticks and replies.

#[macro_use]
extern crate log;

mod driver;
mod socket;

pub use self::{
    driver::{Driver, Handle},
    socket::{UdpTransport, BUFFER_READ_CAPACITY},
};
