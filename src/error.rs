use std::{error, fmt};

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) type Source = Box<dyn error::Error + Send + Sync + 'static>;

pub struct Error {
    kind: ErrorKind,
    source: Option<Source>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
    MalformedPacket,
    EncodeOverflow,

    TransportSend,
    TransportRecv,
    Bind,
    LocalAddresses,

    InvalidPeer,
    InvalidConfig,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub(crate) fn new(kind: ErrorKind, source: Option<Source>) -> Self {
        Self { kind, source }
    }

    pub(crate) fn new_malformed<S: Into<Source>>(reason: S) -> Self {
        Self::new(ErrorKind::MalformedPacket, Some(reason.into()))
    }

    pub(crate) fn new_encode_overflow(needed: usize, limit: usize) -> Self {
        let reason = format!("encoded size {} exceeds frame budget {}", needed, limit);
        Self::new(ErrorKind::EncodeOverflow, Some(reason.into()))
    }

    pub(crate) fn new_send(source: Option<Source>) -> Self {
        Self::new(ErrorKind::TransportSend, source)
    }

    pub(crate) fn new_recv(source: Option<Source>) -> Self {
        Self::new(ErrorKind::TransportRecv, source)
    }

    pub(crate) fn new_bind(source: Option<Source>) -> Self {
        Self::new(ErrorKind::Bind, source)
    }

    pub(crate) fn new_local_addresses(source: Option<Source>) -> Self {
        Self::new(ErrorKind::LocalAddresses, source)
    }

    pub(crate) fn new_invalid_peer<S: Into<Source>>(reason: S) -> Self {
        Self::new(ErrorKind::InvalidPeer, Some(reason.into()))
    }

    pub(crate) fn new_invalid_config<S: Into<Source>>(reason: S) -> Self {
        Self::new(ErrorKind::InvalidConfig, Some(reason.into()))
    }
}

impl From<ErrorKind> for Error {
    fn from(t: ErrorKind) -> Self {
        Error::new(t, None)
    }
}

impl From<(ErrorKind, Source)> for Error {
    fn from(t: (ErrorKind, Source)) -> Self {
        Error::new(t.0, Some(t.1))
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut f = f.debug_tuple("Error");
        f.field(&self.kind);
        if let Some(source) = &self.source {
            f.field(source);
        }
        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "{}: {}", self.kind, source)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| &**s as &(dyn error::Error + 'static))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
