use crate::{
    config::Config,
    error::{Error, Result},
    list::PeerList,
    node::Node,
    transport::Transport,
};

#[derive(Debug, Clone)]
pub struct Builder<T> {
    transport: Option<T>,
    peers: PeerList,
    config: Config,
}

impl<T> Builder<T>
where
    T: Transport,
{
    pub fn new() -> Self {
        Builder {
            transport: None,
            peers: PeerList::default(),
            config: Config::default(),
        }
    }

    pub fn transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn peers(mut self, peers: impl Into<PeerList>) -> Self {
        self.peers = peers.into();
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn finish(self) -> Result<Node<T>> {
        let transport = self
            .transport
            .ok_or_else(|| Error::new_invalid_config("no transport configured"))?;

        Node::new(transport, self.peers, self.config)
    }
}

impl<T: Transport> Default for Builder<T> {
    fn default() -> Self {
        Builder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, transport::mock::Mock};
    use std::{collections::HashSet, time::Duration};

    #[test]
    fn missing_transport() {
        let err = Builder::<Mock>::new().finish().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[tokio::test]
    async fn finish_applies_config() {
        let (_inbound, _outbound, mock) = Mock::new(HashSet::new());
        let config = Config::default().failure_timeout(Duration::from_secs(60));

        let node = Builder::new()
            .transport(mock)
            .peers(vec!["10.0.0.2:9999".parse().unwrap()])
            .config(config.clone())
            .finish()
            .unwrap();

        assert_eq!(node.config(), &config);
        assert!(node.membership().is_empty());
    }
}
