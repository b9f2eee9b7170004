use crate::{
    event::Event,
    membership::Membership,
    monitor::Monitor,
    protocol::{Packet, PeerAddress, PeerStatus},
};
use parking_lot::Mutex;
use std::{collections::HashSet, time::Instant};
use tracing::{debug, info};
use tracing_attributes::instrument;

/// The result of applying one status to the membership view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    event: Event,
    announce: Option<PeerStatus>,
}

impl Transition {
    fn new(event: Event, announce: Option<PeerStatus>) -> Self {
        Transition { event, announce }
    }

    pub fn event(&self) -> Event {
        self.event
    }

    pub fn addr(&self) -> PeerAddress {
        self.event.addr()
    }

    /// The single entry status this node should broadcast, if any.
    pub fn announce(&self) -> Option<PeerStatus> {
        self.announce
    }
}

/// The membership state machine.
///
/// Both the receive path and the timer path go through this type. Every packet or
/// prune pass holds the membership lock for its whole read, decide and write, so
/// the other path never sees a peer halfway between online and offline.
#[derive(Debug)]
pub struct Gossip {
    membership: Mutex<Membership>,
    local: HashSet<PeerAddress>,
    monitor: Monitor,
}

impl Gossip {
    /// `local` holds this node's own addresses, which never take part in any transition.
    pub fn new(local: HashSet<PeerAddress>, monitor: Monitor) -> Self {
        Gossip {
            membership: Mutex::new(Membership::new()),
            local,
            monitor,
        }
    }

    pub fn is_local(&self, addr: &PeerAddress) -> bool {
        self.local.contains(addr)
    }

    /// Apply an inbound packet received from `sender`.
    ///
    /// The sender proved it is alive by transmitting, so it is refreshed first,
    /// independent of what the packet carries.
    #[instrument(level = "trace", skip(self, packet), fields(entries = packet.entries().len()))]
    pub fn handle_packet(
        &self,
        sender: PeerAddress,
        packet: &Packet,
        now: Instant,
    ) -> Vec<Transition> {
        let mut membership = self.membership.lock();
        let mut transitions = Vec::new();

        if !self.is_local(&sender) {
            transitions.extend(observe_sender(&mut membership, sender, now));
        }

        for &(addr, status) in packet.entries() {
            if self.is_local(&addr) {
                continue;
            }

            transitions.extend(apply(&mut membership, addr, status, now));
        }

        transitions
    }

    /// Run the failure detector, marking silent peers offline.
    pub fn prune(&self, now: Instant) -> Vec<Transition> {
        let expired = self.monitor.prune(&mut self.membership.lock(), now);

        expired
            .into_iter()
            .map(|addr| {
                info!(peer = %addr, "node assumed offline");
                Transition::new(Event::TimedOut(addr), Some(PeerStatus::Failed))
            })
            .collect()
    }

    /// The entries of a full gossip broadcast.
    pub fn snapshot(&self) -> Vec<(PeerAddress, PeerStatus)> {
        self.membership.lock().snapshot()
    }

    /// A copy of the current membership view.
    pub fn membership(&self) -> Membership {
        self.membership.lock().clone()
    }
}

fn observe_sender(
    membership: &mut Membership,
    sender: PeerAddress,
    now: Instant,
) -> Option<Transition> {
    if membership.is_online(&sender) {
        membership.mark_online(sender, now);
        return None;
    }

    apply(membership, sender, PeerStatus::Online, now)
}

/// The transition table.
///
/// | state   | status           | next    | announce |
/// |---------|------------------|---------|----------|
/// | unknown | New, Revived     | online  | New      |
/// | unknown | Online           | online  | -        |
/// | unknown | Offline, Failed  | offline | -        |
/// | offline | Online, Revived  | online  | Revived  |
/// | offline | New              | online  | Revived  |
/// | offline | Offline, Failed  | offline | -        |
/// | online  | Offline, Failed  | offline | Failed   |
/// | online  | Online, New, Revived | online | -     |
///
/// Entries about a peer that is already online do not refresh its timestamp, only
/// traffic from the peer itself does.
fn apply(
    membership: &mut Membership,
    addr: PeerAddress,
    status: PeerStatus,
    now: Instant,
) -> Option<Transition> {
    use PeerStatus::*;

    let online = membership.is_online(&addr);
    let offline = membership.is_offline(&addr);

    match status {
        New | Online | Revived if online => None,

        New | Online | Revived if offline => {
            membership.mark_online(addr, now);
            info!(peer = %addr, %status, "node revived");
            Some(Transition::new(Event::Revived(addr), Some(Revived)))
        }

        New | Revived => {
            membership.mark_online(addr, now);
            info!(peer = %addr, %status, "new node available");
            Some(Transition::new(Event::Joined(addr), Some(New)))
        }

        Online => {
            membership.mark_online(addr, now);
            info!(peer = %addr, "new node available");
            Some(Transition::new(Event::Joined(addr), None))
        }

        Offline | Failed if online => {
            membership.mark_offline(addr);
            info!(peer = %addr, %status, "node offline/failed");
            Some(Transition::new(Event::Failed(addr), Some(Failed)))
        }

        Offline | Failed => {
            if membership.mark_offline(addr) {
                debug!(peer = %addr, %status, "learned of offline node");
            }
            None
        }
    }
}

#[cfg(test)]
impl Gossip {
    /// Apply a single status for `addr`.
    pub fn handle_status(
        &self,
        addr: PeerAddress,
        status: PeerStatus,
        now: Instant,
    ) -> Option<Transition> {
        if self.is_local(&addr) {
            return None;
        }

        apply(&mut self.membership.lock(), addr, status, now)
    }
}
