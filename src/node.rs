use crate::{
    codec,
    config::Config,
    error::{Error, Result},
    event::Event,
    gossip::{Gossip, Transition},
    handle::Handle,
    list::PeerList,
    membership::Membership,
    monitor::Monitor,
    protocol::PeerAddress,
    transport::Transport,
};
use bytes::Bytes;
use rand::Rng;
use std::{future::Future, net::SocketAddr, time::Duration};
use tokio::{sync::broadcast, time};
use tracing::{debug, error, trace, warn, Level};
use tracing_futures::Instrument;

/// Large enough for any datagram, whatever frame budget the sender runs with.
const RECV_BUFFER_LEN: usize = u16::MAX as usize;

/// A running member of the gossip group.
///
/// A node runs two loops against the same membership view. The receive loop
/// applies inbound packets. The gossip loop sends a full snapshot at a jittered
/// interval and runs the failure detector in between, announcing failures as soon
/// as they are found.
#[derive(Debug)]
pub struct Node<T> {
    transport: T,
    gossip: Gossip,
    peers: PeerList,
    config: Config,
    event_tx: broadcast::Sender<Event>,
}

impl<T: Transport> Node<T> {
    pub fn new(transport: T, peers: PeerList, config: Config) -> Result<Self> {
        config.validate()?;

        let local = transport
            .local_addresses()
            .map_err(|e| Error::new_local_addresses(Some(e.into())))?;

        let monitor = Monitor::new(config.failure_timeout);
        debug!(
            local = ?local,
            peers = peers.len(),
            timeout = ?monitor.timeout(),
            "starting node"
        );

        let (event_tx, _) = broadcast::channel(config.event_capacity);
        let gossip = Gossip::new(local, monitor);

        Ok(Node {
            transport,
            gossip,
            peers,
            config,
            event_tx,
        })
    }

    /// Subscribe to membership events.
    pub fn handle(&self) -> Handle {
        Handle::new(self.event_tx.subscribe())
    }

    pub fn membership(&self) -> Membership {
        self.gossip.membership()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let recv = self.recv_loop().instrument(tracing::info_span!("node.recv"));
        let gossip = self
            .gossip_loop()
            .instrument(tracing::info_span!("node.gossip"));

        tokio::select! {
            _ = recv => {}
            _ = gossip => {}
            _ = shutdown => debug!("shutting down"),
        }

        Ok(())
    }

    /// Run for the lifetime of the process.
    pub async fn run_forever(&self) -> Result<()> {
        self.run(futures::future::pending()).await
    }

    async fn recv_loop(&self) {
        let mut buf = vec![0u8; RECV_BUFFER_LEN];

        loop {
            match self
                .transport
                .recv_from(&mut buf, self.config.recv_timeout)
                .await
            {
                Ok(Some((n, from))) => self.process(&buf[..n], from).await,
                Ok(None) => trace!("receive timeout"),
                Err(e) => {
                    let err = Error::new_recv(Some(e.into()));
                    warn!(error = %err, "receive failed");
                }
            }
        }
    }

    async fn process(&self, bytes: &[u8], from: SocketAddr) {
        let packet = match codec::decode(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(%from, error = %e, "dropping malformed packet");
                return;
            }
        };

        trace!(
            %from,
            heartbeat = packet.is_heartbeat(),
            entries = packet.entries().len(),
            "received packet"
        );

        let transitions = self
            .gossip
            .handle_packet(PeerAddress::from(from.ip()), &packet, now());

        self.dispatch(transitions).await;

        if tracing::enabled!(Level::DEBUG) {
            let membership = self.gossip.membership();
            let online = membership
                .online()
                .map(|(addr, _)| addr.to_string())
                .collect::<Vec<_>>();
            let offline = membership
                .offline()
                .map(|addr| addr.to_string())
                .collect::<Vec<_>>();

            debug!(?online, ?offline, "membership");
        }
    }

    async fn gossip_loop(&self) {
        let mut prune = time::interval(self.config.prune_interval);
        prune.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        let next_tick = time::sleep(self.jitter());
        tokio::pin!(next_tick);

        // The first snapshot goes out right away so peers learn about us.
        self.broadcast_snapshot().await;

        loop {
            tokio::select! {
                _ = &mut next_tick => {
                    self.broadcast_snapshot().await;

                    let delay = self.jitter();
                    trace!(?delay, "next gossip tick");
                    next_tick.as_mut().reset(time::Instant::now() + delay);
                }
                _ = prune.tick() => {
                    let transitions = self.gossip.prune(now());
                    self.dispatch(transitions).await;
                }
            }
        }
    }

    fn jitter(&self) -> Duration {
        let min = self.config.gossip_interval_min;
        let max = self.config.gossip_interval_max;

        rand::thread_rng().gen_range(min..=max)
    }

    async fn broadcast_snapshot(&self) {
        let snapshot = self.gossip.snapshot();

        let frames = match codec::encode_split(&snapshot, true, self.config.max_frame_len) {
            Ok(frames) => frames,
            Err(e) => {
                error!(error = %e, "unable to encode snapshot");
                return;
            }
        };

        if frames.len() > 1 {
            warn!(
                entries = snapshot.len(),
                frames = frames.len(),
                "snapshot exceeds frame budget, splitting"
            );
        }

        debug!(entries = snapshot.len(), "sending heartbeat");

        for frame in &frames {
            self.broadcast(frame).await;
        }
    }

    async fn dispatch(&self, transitions: Vec<Transition>) {
        for transition in transitions {
            // No subscribers is fine.
            let _ = self.event_tx.send(transition.event());

            if let Some(status) = transition.announce() {
                let bytes = codec::encode_single(transition.addr(), status);
                self.broadcast(&bytes).await;
            }
        }
    }

    /// Send `bytes` to every peer, carrying on past peers that cannot be reached.
    async fn broadcast(&self, bytes: &Bytes) {
        for peer in &self.peers {
            if let Err(e) = self.transport.send_to(bytes, *peer).await {
                let err = Error::new_send(Some(e.into()));
                warn!(%peer, error = %err, "send failed");
            }
        }
    }
}

fn now() -> std::time::Instant {
    time::Instant::now().into_std()
}
