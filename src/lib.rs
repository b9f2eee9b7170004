//! Node availability gossip over UDP.
//!
//! Every node keeps a view of which peers are online and which are offline,
//! periodically sends that view to a static list of peers, and announces changes
//! as soon as it observes them. A peer that stays silent past the failure timeout
//! is presumed failed.

mod builder;
pub mod codec;
mod config;
mod error;
mod event;
mod gossip;
mod handle;
mod list;
mod membership;
mod monitor;
mod node;
mod protocol;
mod transport;

#[cfg(test)]
mod test_utils;

pub use crate::{
    builder::Builder,
    config::{Config, DEFAULT_PORT},
    error::{Error, ErrorKind, Result},
    event::Event,
    handle::Handle,
    list::PeerList,
    membership::Membership,
    node::Node,
    protocol::{Packet, PeerAddress, PeerStatus, VERSION},
    transport::{Transport, UdpTransport},
};
