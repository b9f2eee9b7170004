use crate::protocol::{PeerAddress, PeerStatus};
use indexmap::{IndexMap, IndexSet};
use std::time::Instant;

/// The local view of which peers are online and which are offline.
///
/// A peer is in at most one of the two sets. A peer in neither has never been
/// observed. Both collections keep insertion order so that snapshots come out in a
/// stable order.
#[derive(Debug, Clone, Default)]
pub struct Membership {
    online: IndexMap<PeerAddress, Instant>,
    offline: IndexSet<PeerAddress>,
}

impl Membership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_online(&self, addr: &PeerAddress) -> bool {
        self.online.contains_key(addr)
    }

    pub fn is_offline(&self, addr: &PeerAddress) -> bool {
        self.offline.contains(addr)
    }

    /// Returns `true` if neither set holds `addr`.
    pub fn is_unknown(&self, addr: &PeerAddress) -> bool {
        !self.is_online(addr) && !self.is_offline(addr)
    }

    pub fn last_seen(&self, addr: &PeerAddress) -> Option<Instant> {
        self.online.get(addr).copied()
    }

    /// Record `addr` as online as of `now`, refreshing the timestamp if it already was.
    ///
    /// Returns `true` if the peer was not online before.
    pub fn mark_online(&mut self, addr: PeerAddress, now: Instant) -> bool {
        self.offline.shift_remove(&addr);
        self.online.insert(addr, now).is_none()
    }

    /// Record `addr` as offline.
    ///
    /// Returns `true` if the peer was not offline before.
    pub fn mark_offline(&mut self, addr: PeerAddress) -> bool {
        self.online.shift_remove(&addr);
        self.offline.insert(addr)
    }

    pub fn online(&self) -> impl Iterator<Item = (&PeerAddress, &Instant)> {
        self.online.iter()
    }

    pub fn offline(&self) -> impl Iterator<Item = &PeerAddress> {
        self.offline.iter()
    }

    /// Every known peer tagged `Online` or `Offline`, online peers first.
    pub fn snapshot(&self) -> Vec<(PeerAddress, PeerStatus)> {
        self.online
            .keys()
            .map(|addr| (*addr, PeerStatus::Online))
            .chain(self.offline.iter().map(|addr| (*addr, PeerStatus::Offline)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.online.len() + self.offline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn addr(last: u8) -> PeerAddress {
        Ipv4Addr::new(10, 0, 0, last).into()
    }

    #[test]
    fn unknown_by_default() {
        let membership = Membership::new();
        assert!(membership.is_unknown(&addr(1)));
        assert!(membership.is_empty());
    }

    #[test]
    fn online_then_offline() {
        let mut membership = Membership::new();
        let now = Instant::now();

        assert!(membership.mark_online(addr(1), now));
        assert!(membership.is_online(&addr(1)));
        assert!(!membership.is_offline(&addr(1)));

        assert!(membership.mark_offline(addr(1)));
        assert!(!membership.is_online(&addr(1)));
        assert!(membership.is_offline(&addr(1)));
        assert_eq!(membership.last_seen(&addr(1)), None);

        assert!(membership.mark_online(addr(1), now));
        assert!(!membership.is_offline(&addr(1)));
        assert_eq!(membership.len(), 1);
    }

    #[test]
    fn refresh_keeps_single_entry() {
        let mut membership = Membership::new();
        let now = Instant::now();
        let later = now + std::time::Duration::from_secs(5);

        assert!(membership.mark_online(addr(1), now));
        assert!(!membership.mark_online(addr(1), later));

        assert_eq!(membership.last_seen(&addr(1)), Some(later));
        assert_eq!(membership.len(), 1);
    }

    #[test]
    fn offline_is_idempotent() {
        let mut membership = Membership::new();

        assert!(membership.mark_offline(addr(2)));
        assert!(!membership.mark_offline(addr(2)));
        assert_eq!(membership.len(), 1);
    }

    #[test]
    fn snapshot_tags_each_peer_once() {
        let mut membership = Membership::new();
        let now = Instant::now();

        membership.mark_online(addr(1), now);
        membership.mark_online(addr(2), now);
        membership.mark_offline(addr(3));
        membership.mark_online(addr(2), now);

        assert_eq!(
            membership.snapshot(),
            vec![
                (addr(1), PeerStatus::Online),
                (addr(2), PeerStatus::Online),
                (addr(3), PeerStatus::Offline),
            ]
        );
    }
}
