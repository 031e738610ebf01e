//! The lease timing module.
//!
//! Server times are kept in seconds as received and mirrored in coarse timer
//! ticks once the lease is bound.

use std::net::Ipv4Addr;

/// The lease time value meaning "never expires" (RFC 2132 §9.2).
pub const INFINITE: u32 = 0xffff_ffff;

/// What a coarse tick has run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// T0, the lease itself.
    Lease,
    /// T2.
    Rebind,
    /// T1.
    Renew,
}

/// Lease times of one record.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LeaseTiming {
    /// Seconds, as offered.
    pub offered_t0_lease: u32,
    pub offered_t1_renew: u32,
    pub offered_t2_rebind: u32,

    /// Coarse ticks, computed on bind.
    pub t0_timeout: u16,
    pub t1_timeout: u16,
    pub t2_timeout: u16,

    /// Coarse ticks since bind.
    pub lease_used: u16,
    /// Coarse ticks left until the next renew.
    pub t1_renew_time: u16,
    /// Coarse ticks left until the next rebind.
    pub t2_rebind_time: u16,
}

impl LeaseTiming {
    /// Takes the times from an ACK.
    ///
    /// A missing lease time keeps the previous one. Missing T1 and T2
    /// default to 50% and 87.5% of the lease (RFC 2131 §4.4.5).
    pub fn accept(&mut self, lease_time: Option<u32>, renewal_time: Option<u32>, rebinding_time: Option<u32>) {
        if let Some(lease_time) = lease_time {
            self.offered_t0_lease = lease_time;
        }
        self.offered_t1_renew = renewal_time.unwrap_or(self.offered_t0_lease / 2);
        self.offered_t2_rebind =
            rebinding_time.unwrap_or((u64::from(self.offered_t0_lease) * 7 / 8) as u32);
    }

    /// Converts the offered times into coarse ticks and restarts the countdowns.
    pub fn arm(&mut self, coarse_timer_secs: u32) {
        self.lease_used = 0;

        self.t0_timeout = Self::to_ticks(self.offered_t0_lease, coarse_timer_secs);
        self.t1_timeout = Self::to_ticks(self.offered_t1_renew, coarse_timer_secs);
        self.t1_renew_time = self.t1_timeout;
        self.t2_timeout = Self::to_ticks(self.offered_t2_rebind, coarse_timer_secs);
        self.t2_rebind_time = self.t2_timeout;
        debug!(
            "Lease armed: T0 {} T1 {} T2 {} ticks of {} seconds",
            self.t0_timeout, self.t1_timeout, self.t2_timeout, coarse_timer_secs,
        );

        // a T1 not before T2 never triggers a renew of its own; the running
        // countdown is left as it is
        if self.t1_timeout >= self.t2_timeout && self.t2_timeout > 0 {
            self.t1_timeout = 0;
        }
    }

    pub fn clear(&mut self) {
        *self = LeaseTiming::default();
    }

    /// Advances the lease by one coarse tick.
    ///
    /// At most one expiry is reported per tick, the lease first, then T2,
    /// then T1. The T1 and T2 countdowns are decremented as long as the
    /// checks before them do not fire.
    pub fn tick(&mut self) -> Option<Expiry> {
        if self.tick_lease() {
            Some(Expiry::Lease)
        } else if self.tick_rebind() {
            Some(Expiry::Rebind)
        } else if self.tick_renew() {
            Some(Expiry::Renew)
        } else {
            None
        }
    }

    /// Schedules another renew halfway to T2, unless that is under a minute away.
    pub fn rearm_renew(&mut self, coarse_timer_secs: u32) {
        if let Some(half) = Self::half_remaining(self.t2_timeout, self.lease_used, coarse_timer_secs) {
            self.t1_renew_time = half;
        }
    }

    /// Schedules another rebind halfway to T0, unless that is under a minute away.
    pub fn rearm_rebind(&mut self, coarse_timer_secs: u32) {
        if let Some(half) = Self::half_remaining(self.t0_timeout, self.lease_used, coarse_timer_secs) {
            self.t2_rebind_time = half;
        }
    }

    fn tick_lease(&mut self) -> bool {
        if self.t0_timeout == 0 {
            return false;
        }
        self.lease_used = self.lease_used.wrapping_add(1);
        self.lease_used == self.t0_timeout
    }

    fn tick_rebind(&mut self) -> bool {
        if self.t2_rebind_time == 0 {
            return false;
        }
        self.t2_rebind_time -= 1;
        self.t2_rebind_time == 0
    }

    fn tick_renew(&mut self) -> bool {
        if self.t1_renew_time == 0 {
            return false;
        }
        self.t1_renew_time -= 1;
        self.t1_renew_time == 0
    }

    fn half_remaining(deadline: u16, lease_used: u16, coarse_timer_secs: u32) -> Option<u16> {
        if deadline <= lease_used {
            return None;
        }
        let half = (deadline - lease_used) / 2;
        let minute = (60 + coarse_timer_secs / 2) / coarse_timer_secs.max(1);
        if u32::from(half) >= minute {
            Some(half)
        } else {
            None
        }
    }

    /// Rounds to the nearest tick, at least 1 and at most 0xffff.
    /// The infinite lease has no timer.
    fn to_ticks(secs: u32, coarse_timer_secs: u32) -> u16 {
        if secs == INFINITE {
            return 0;
        }
        let coarse_timer_secs = coarse_timer_secs.max(1);
        let ticks = (u64::from(secs) + u64::from(coarse_timer_secs / 2)) / u64::from(coarse_timer_secs);
        ticks.max(1).min(0xffff) as u16
    }
}

/// A bound lease as reported to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub server_id: Ipv4Addr,
    /// Seconds, as offered.
    pub lease_time: u32,
    pub renewal_time: u32,
    pub rebinding_time: u32,
    pub dns_servers: Vec<Ipv4Addr>,
    pub ntp_servers: Vec<Ipv4Addr>,
    /// BOOTP `siaddr`.
    pub next_server: Ipv4Addr,
    pub boot_file_name: Option<String>,
}
