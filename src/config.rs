use crate::{
    codec::{HEADER_LEN, MAX_ENTRY_LEN, MAX_FRAME_LEN},
    error::{Error, Result},
};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 9999;

/// Tunables of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Lower bound of the jittered gossip interval.
    pub gossip_interval_min: Duration,
    /// Upper bound of the jittered gossip interval, inclusive.
    pub gossip_interval_max: Duration,
    /// Silence after which an online peer is presumed failed.
    pub failure_timeout: Duration,
    /// Bounded wait of a single transport receive.
    pub recv_timeout: Duration,
    /// How often the failure detector runs between gossip ticks.
    pub prune_interval: Duration,
    /// Largest datagram this node will send.
    pub max_frame_len: usize,
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            gossip_interval_min: Duration::from_secs(1),
            gossip_interval_max: Duration::from_secs(30),
            failure_timeout: Duration::from_secs(35),
            recv_timeout: Duration::from_secs(1),
            prune_interval: Duration::from_secs(1),
            max_frame_len: MAX_FRAME_LEN,
            event_capacity: 64,
        }
    }
}

impl Config {
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn gossip_interval(mut self, min: Duration, max: Duration) -> Self {
        self.gossip_interval_min = min;
        self.gossip_interval_max = max;
        self
    }

    pub fn failure_timeout(mut self, timeout: Duration) -> Self {
        self.failure_timeout = timeout;
        self
    }

    pub fn recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    pub fn prune_interval(mut self, interval: Duration) -> Self {
        self.prune_interval = interval;
        self
    }

    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Check the configuration for values a node cannot run with.
    ///
    /// The failure timeout must exceed the longest gossip interval, otherwise a
    /// healthy peer that happens to draw the maximum jitter gets pruned.
    pub fn validate(&self) -> Result<()> {
        if self.gossip_interval_min.is_zero() {
            return Err(Error::new_invalid_config("gossip interval must be positive"));
        }

        if self.gossip_interval_min > self.gossip_interval_max {
            return Err(Error::new_invalid_config(format!(
                "gossip interval min {:?} exceeds max {:?}",
                self.gossip_interval_min, self.gossip_interval_max
            )));
        }

        if self.failure_timeout <= self.gossip_interval_max {
            return Err(Error::new_invalid_config(format!(
                "failure timeout {:?} must exceed the gossip interval max {:?}",
                self.failure_timeout, self.gossip_interval_max
            )));
        }

        if self.recv_timeout.is_zero() || self.prune_interval.is_zero() {
            return Err(Error::new_invalid_config(
                "receive timeout and prune interval must be positive",
            ));
        }

        if self.max_frame_len < HEADER_LEN + MAX_ENTRY_LEN
            || self.max_frame_len > u16::MAX as usize
        {
            return Err(Error::new_invalid_config(format!(
                "frame length {} outside {}..={}",
                self.max_frame_len,
                HEADER_LEN + MAX_ENTRY_LEN,
                u16::MAX
            )));
        }

        if self.event_capacity == 0 {
            return Err(Error::new_invalid_config("event capacity must be positive"));
        }

        Ok(())
    }
}
