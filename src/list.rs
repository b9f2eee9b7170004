use crate::error::{Error, Result};
use std::{fs, net::SocketAddr, path::Path, str::FromStr};

/// The static set of peers a node gossips to, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerList {
    list: Vec<SocketAddr>,
}

impl PeerList {
    pub fn new(list: Vec<SocketAddr>) -> Self {
        PeerList { list }
    }

    /// Read a peer file with one `host:port` per line.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::new_invalid_peer(format!("unable to read {}: {}", path.display(), e))
        })?;

        contents.parse()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SocketAddr> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl FromStr for PeerList {
    type Err = Error;

    /// Blank lines and lines starting with `#` are skipped. IPv6 peers are written
    /// as `[addr]:port`.
    fn from_str(s: &str) -> Result<Self> {
        let mut list = Vec::new();

        for (number, line) in s.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let addr = line.parse::<SocketAddr>().map_err(|e| {
                Error::new_invalid_peer(format!("line {}: {:?}: {}", number + 1, line, e))
            })?;

            list.push(addr);
        }

        Ok(PeerList { list })
    }
}

impl From<Vec<SocketAddr>> for PeerList {
    fn from(list: Vec<SocketAddr>) -> Self {
        PeerList::new(list)
    }
}

impl<'a> IntoIterator for &'a PeerList {
    type Item = &'a SocketAddr;
    type IntoIter = std::slice::Iter<'a, SocketAddr>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}
