//! The DHCP client state module.

use std::fmt;

/// DHCP client states (RFC 2131 §4.4 with the lwIP-style additions).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Off,
    Init,
    Selecting,
    Requesting,
    /// Probing the offered address with ARP before binding it.
    #[cfg(feature = "arp-check")]
    Checking,
    Bound,
    Renewing,
    Rebinding,
    Rebooting,
    /// Waiting to restart discovery after a NAK or a DECLINE.
    BackingOff,
    /// Only transient INFORM records are in this state.
    Informing,
}

impl State {
    /// Whether the interface address was configured from a lease.
    pub fn supplies_address(self) -> bool {
        match self {
            State::Bound | State::Renewing | State::Rebinding => true,
            _ => false,
        }
    }

    /// Whether a link change should verify the lease instead of rediscovering.
    pub fn holds_lease(self) -> bool {
        self.supplies_address() || self == State::Rebooting
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::State::*;
        match self {
            Off => write!(f, "OFF"),
            Init => write!(f, "INIT"),
            Selecting => write!(f, "SELECTING"),
            Requesting => write!(f, "REQUESTING"),
            #[cfg(feature = "arp-check")]
            Checking => write!(f, "CHECKING"),
            Bound => write!(f, "BOUND"),
            Renewing => write!(f, "RENEWING"),
            Rebinding => write!(f, "REBINDING"),
            Rebooting => write!(f, "REBOOTING"),
            BackingOff => write!(f, "BACKING_OFF"),
            Informing => write!(f, "INFORMING"),
        }
    }
}
