//! The retransmission backoff module.
//!
//! Every request sets a fine timer countdown computed from the number of
//! tries made in the current state. The table differs per message.

/// Which request the timeout is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// 0.5, 1, 2, 4, 8 seconds, then 15 seconds.
    Discover,
    /// 2, 4, 8, 16, 32 seconds, then 60 seconds.
    Select,
    /// A single ARP probe interval.
    Check,
    /// The pause after a DECLINE.
    Decline,
    /// Linear up to 20 seconds.
    Renew,
    /// Linear up to 10 seconds.
    Rebind,
    /// Linear up to 10 seconds.
    Reboot,
}

impl Backoff {
    /// The timeout after `tries` requests, the current one included.
    pub fn msecs(self, tries: u8) -> u32 {
        let tries = u32::from(tries);
        let exponential = if tries < 6 { 1 << tries } else { 60 };
        match self {
            Backoff::Discover => exponential * 250,
            Backoff::Select => exponential * 1000,
            Backoff::Check => 500,
            Backoff::Decline => 10 * 1000,
            Backoff::Renew => if tries < 10 { tries * 2000 } else { 20 * 1000 },
            Backoff::Rebind | Backoff::Reboot => if tries < 10 { tries * 1000 } else { 10 * 1000 },
        }
    }

    /// The same timeout in fine timer ticks, rounded up.
    pub fn ticks(self, tries: u8, fine_timer_msecs: u32) -> u16 {
        let fine_timer_msecs = fine_timer_msecs.max(1);
        let ticks = (self.msecs(tries) + fine_timer_msecs - 1) / fine_timer_msecs;
        ticks.min(u32::from(u16::max_value())) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_is_monotonic_and_capped() {
        let timeouts: Vec<u32> = (1..=12).map(|tries| Backoff::Discover.msecs(tries)).collect();

        assert_eq!(&timeouts[..6], &[500, 1000, 2000, 4000, 8000, 15000]);
        assert!(timeouts.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(timeouts.iter().all(|msecs| *msecs <= 15000));
    }

    #[test]
    fn select_uses_whole_seconds() {
        assert_eq!(Backoff::Select.msecs(1), 2000);
        assert_eq!(Backoff::Select.msecs(5), 32000);
        assert_eq!(Backoff::Select.msecs(200), 60000);
    }

    #[test]
    fn renew_and_rebind_grow_linearly() {
        assert_eq!(Backoff::Renew.msecs(3), 6000);
        assert_eq!(Backoff::Renew.msecs(10), 20000);
        assert_eq!(Backoff::Rebind.msecs(9), 9000);
        assert_eq!(Backoff::Reboot.msecs(255), 10000);
    }

    #[test]
    fn ticks_round_up() {
        assert_eq!(Backoff::Discover.ticks(1, 500), 1);
        assert_eq!(Backoff::Check.ticks(1, 300), 2);
        assert_eq!(Backoff::Decline.ticks(1, 500), 20);
    }
}
