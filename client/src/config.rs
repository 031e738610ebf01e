//! The client configuration module.

use dhcp_protocol::OptionLimits;

/// Client-wide settings.
///
/// The defaults match a typical embedded build: a one minute lease timer,
/// a half second request timer, two DNS servers and one NTP server.
#[derive(Debug, Clone)]
pub struct Config {
    /// The period of `Client::coarse_tick`.
    pub coarse_timer_secs: u32,
    /// The period of `Client::fine_tick`.
    pub fine_timer_msecs: u32,
    /// Sent when the interface does not provide its own hostname.
    pub hostname: Option<String>,
    /// Adds NTP servers to the parameter request list.
    pub request_ntp_servers: bool,
    pub max_dns_servers: usize,
    pub max_ntp_servers: usize,
    /// The number of records the client allocates by itself.
    pub max_records: usize,
    /// Start link-local configuration after this many unanswered DISCOVERs.
    pub autoip_coop_tries: Option<u8>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            coarse_timer_secs: 60,
            fine_timer_msecs: 500,
            hostname: None,
            request_ntp_servers: false,
            max_dns_servers: 2,
            max_ntp_servers: 1,
            max_records: 8,
            autoip_coop_tries: None,
        }
    }
}

impl Config {
    /// Uses the machine hostname if it can be read and is valid UTF-8.
    pub fn with_system_hostname(mut self) -> Self {
        self.hostname = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok());
        self
    }

    pub(crate) fn option_limits(&self) -> OptionLimits {
        OptionLimits {
            max_dns_servers: self.max_dns_servers,
            max_ntp_servers: self.max_ntp_servers,
        }
    }
}
