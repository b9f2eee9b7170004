use crate::protocol::PeerAddress;
use std::fmt;

/// A change in the local membership view.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Event {
    /// A peer never seen before is now online.
    Joined(PeerAddress),
    /// A peer known to be offline is online again.
    Revived(PeerAddress),
    /// Another node reported an online peer as offline or failed.
    Failed(PeerAddress),
    /// The local failure detector gave up on a silent peer.
    TimedOut(PeerAddress),
}

impl Event {
    pub fn addr(&self) -> PeerAddress {
        match *self {
            Event::Joined(addr)
            | Event::Revived(addr)
            | Event::Failed(addr)
            | Event::TimedOut(addr) => addr,
        }
    }

    /// Returns `true` if the peer is online after this event.
    pub fn is_online(&self) -> bool {
        matches!(self, Event::Joined(_) | Event::Revived(_))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Event::Joined(addr) => write!(f, "{} joined", addr),
            Event::Revived(addr) => write!(f, "{} revived", addr),
            Event::Failed(addr) => write!(f, "{} reported failed", addr),
            Event::TimedOut(addr) => write!(f, "{} timed out", addr),
        }
    }
}
