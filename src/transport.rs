use crate::{
    error::{Error, Result},
    protocol::PeerAddress,
};
use async_trait::async_trait;
use std::{
    collections::HashSet,
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};
use tokio::net::UdpSocket;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A connectionless datagram channel to the static peer set.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Error: Into<BoxError> + Send;

    async fn send_to(&self, buf: &[u8], dst: SocketAddr) -> std::result::Result<(), Self::Error>;

    /// Receive one datagram, waiting at most `timeout`.
    ///
    /// A timeout is not an error, it yields `Ok(None)`.
    async fn recv_from(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> std::result::Result<Option<(usize, SocketAddr)>, Self::Error>;

    /// Every address this node is reachable at, used to suppress self reports.
    fn local_addresses(&self) -> std::result::Result<HashSet<PeerAddress>, Self::Error>;
}

/// UDP transport bound to every interface.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub async fn bind(port: u16) -> Result<Self> {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
        Self::bind_addr(addr).await
    }

    pub async fn bind_addr(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| Error::new_bind(Some(e.into())))?;

        tracing::info!(addr = %addr, "bound udp socket");

        Ok(UdpTransport { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| Error::new_bind(Some(e.into())))
    }
}

#[async_trait]
impl Transport for UdpTransport {
    type Error = io::Error;

    async fn send_to(&self, buf: &[u8], dst: SocketAddr) -> io::Result<()> {
        let sent = self.socket.send_to(buf, dst).await?;

        if sent != buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("sent {} of {} bytes", sent, buf.len()),
            ));
        }

        Ok(())
    }

    async fn recv_from(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> io::Result<Option<(usize, SocketAddr)>> {
        match tokio::time::timeout(timeout, self.socket.recv_from(buf)).await {
            Ok(Ok((n, from))) => Ok(Some((n, canonical(from)))),
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => Ok(None),
        }
    }

    fn local_addresses(&self) -> io::Result<HashSet<PeerAddress>> {
        let mut addrs = if_addrs::get_if_addrs()?
            .into_iter()
            .map(|iface| PeerAddress::from(iface.ip()))
            .collect::<HashSet<_>>();

        let bound = self.socket.local_addr()?.ip();
        if !bound.is_unspecified() {
            addrs.insert(bound.into());
        }

        Ok(addrs)
    }
}

// A dual stack socket reports IPv4 senders as mapped IPv6 addresses.
fn canonical(addr: SocketAddr) -> SocketAddr {
    SocketAddr::new(addr.ip().to_canonical(), addr.port())
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use bytes::Bytes;
    use std::fmt;
    use tokio::sync::{mpsc, Mutex};

    pub type Datagram = (Bytes, SocketAddr);

    /// Channel backed transport.
    ///
    /// Datagrams pushed into the inbound sender are received by the node, every
    /// datagram the node sends shows up on the outbound receiver tagged with its
    /// destination.
    #[derive(Debug)]
    pub struct Mock {
        inbound: Mutex<mpsc::Receiver<Datagram>>,
        outbound: mpsc::UnboundedSender<Datagram>,
        local: HashSet<PeerAddress>,
        unreachable: HashSet<SocketAddr>,
    }

    #[derive(Debug)]
    pub struct MockError(&'static str);

    impl Mock {
        pub fn new(
            local: HashSet<PeerAddress>,
        ) -> (mpsc::Sender<Datagram>, mpsc::UnboundedReceiver<Datagram>, Self) {
            let (in_tx, in_rx) = mpsc::channel(1024);
            let (out_tx, out_rx) = mpsc::unbounded_channel();

            let mock = Mock {
                inbound: Mutex::new(in_rx),
                outbound: out_tx,
                local,
                unreachable: HashSet::new(),
            };

            (in_tx, out_rx, mock)
        }

        /// Sends to `addr` fail.
        pub fn unreachable(mut self, addr: SocketAddr) -> Self {
            self.unreachable.insert(addr);
            self
        }
    }

    #[async_trait]
    impl Transport for Mock {
        type Error = MockError;

        async fn send_to(&self, buf: &[u8], dst: SocketAddr) -> std::result::Result<(), MockError> {
            if self.unreachable.contains(&dst) {
                return Err(MockError("destination unreachable"));
            }

            self.outbound
                .send((Bytes::copy_from_slice(buf), dst))
                .map_err(|_| MockError("outbound closed"))
        }

        async fn recv_from(
            &self,
            buf: &mut [u8],
            timeout: Duration,
        ) -> std::result::Result<Option<(usize, SocketAddr)>, MockError> {
            let mut inbound = self.inbound.lock().await;

            match tokio::time::timeout(timeout, inbound.recv()).await {
                Ok(Some((bytes, from))) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(Some((n, from)))
                }
                Ok(None) => {
                    // Nothing will ever arrive, behave like an idle socket.
                    tokio::time::sleep(timeout).await;
                    Ok(None)
                }
                Err(_elapsed) => Ok(None),
            }
        }

        fn local_addresses(&self) -> std::result::Result<HashSet<PeerAddress>, MockError> {
            Ok(self.local.clone())
        }
    }

    impl fmt::Display for MockError {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "Mock {}", self.0)
        }
    }

    impl std::error::Error for MockError {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn udp_round_trip() {
        let a = UdpTransport::bind_addr("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let b = UdpTransport::bind_addr("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        a.send_to(&[1, 0, 4, 0], b.local_addr().unwrap())
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let (n, from) = b
            .recv_from(&mut buf, Duration::from_secs(5))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(&buf[..n], &[1, 0, 4, 0]);
        assert_eq!(from, a.local_addr().unwrap());
    }

    #[tokio::test]
    async fn udp_recv_timeout_is_not_an_error() {
        let a = UdpTransport::bind_addr("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let received = a
            .recv_from(&mut buf, Duration::from_millis(10))
            .await
            .unwrap();

        assert!(received.is_none());
    }

    #[tokio::test]
    async fn local_addresses_include_bound_address() {
        let a = UdpTransport::bind_addr("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        let local = a.local_addresses().unwrap();
        assert!(local.contains(&PeerAddress::from(Ipv4Addr::LOCALHOST)));
    }

    #[test]
    fn mapped_sender_is_canonical() {
        let mapped = SocketAddr::new(Ipv4Addr::new(10, 0, 0, 2).to_ipv6_mapped().into(), 9999);
        assert_eq!(canonical(mapped), "10.0.0.2:9999".parse().unwrap());
    }
}
