use crate::{membership::Membership, protocol::PeerAddress};
use std::time::{Duration, Instant};

/// Heartbeat silence based failure detector.
#[derive(Debug, Clone, Copy)]
pub struct Monitor {
    timeout: Duration,
}

impl Monitor {
    pub fn new(timeout: Duration) -> Self {
        Monitor { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns `true` if a peer last seen at `last_seen` is considered failed at `now`.
    ///
    /// A peer exactly `timeout` old is still alive.
    pub fn is_expired(&self, last_seen: Instant, now: Instant) -> bool {
        now.saturating_duration_since(last_seen) > self.timeout
    }

    /// Move every online peer silent for longer than the timeout to offline.
    ///
    /// Returns the peers that were just marked failed, in the order they were
    /// found. The caller is responsible for announcing them.
    pub fn prune(&self, membership: &mut Membership, now: Instant) -> Vec<PeerAddress> {
        let expired = membership
            .online()
            .filter(|(_, last_seen)| self.is_expired(**last_seen, now))
            .map(|(addr, _)| *addr)
            .collect::<Vec<_>>();

        for addr in &expired {
            membership.mark_offline(*addr);
        }

        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const TIMEOUT: Duration = Duration::from_secs(30);

    fn addr(last: u8) -> PeerAddress {
        Ipv4Addr::new(10, 0, 0, last).into()
    }

    #[test]
    fn silent_peer_is_pruned() {
        let monitor = Monitor::new(TIMEOUT);
        let mut membership = Membership::new();
        let now = Instant::now() + Duration::from_secs(60);

        membership.mark_online(addr(5), now - Duration::from_secs(40));

        assert_eq!(monitor.prune(&mut membership, now), vec![addr(5)]);
        assert!(membership.is_offline(&addr(5)));

        // Already offline, nothing more to report.
        assert!(monitor.prune(&mut membership, now).is_empty());
    }

    #[test]
    fn boundary_is_not_pruned() {
        let monitor = Monitor::new(TIMEOUT);
        let mut membership = Membership::new();
        let seen = Instant::now();

        membership.mark_online(addr(1), seen);

        assert!(monitor.prune(&mut membership, seen + TIMEOUT).is_empty());
        assert!(membership.is_online(&addr(1)));

        let pruned = monitor.prune(&mut membership, seen + TIMEOUT + Duration::from_nanos(1));
        assert_eq!(pruned, vec![addr(1)]);
    }

    #[test]
    fn only_silent_peers_are_pruned() {
        let monitor = Monitor::new(TIMEOUT);
        let mut membership = Membership::new();
        let now = Instant::now() + Duration::from_secs(120);

        membership.mark_online(addr(1), now - Duration::from_secs(31));
        membership.mark_online(addr(2), now - Duration::from_secs(5));
        membership.mark_online(addr(3), now - Duration::from_secs(90));
        membership.mark_offline(addr(4));

        assert_eq!(monitor.prune(&mut membership, now), vec![addr(1), addr(3)]);
        assert!(membership.is_online(&addr(2)));
        assert!(membership.is_offline(&addr(4)));
    }

    #[test]
    fn clock_behind_last_seen() {
        let monitor = Monitor::new(TIMEOUT);
        let mut membership = Membership::new();
        let now = Instant::now();

        membership.mark_online(addr(1), now + Duration::from_secs(10));

        assert!(monitor.prune(&mut membership, now).is_empty());
    }
}
