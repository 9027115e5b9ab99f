use std::fmt;
use std::io;

use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

pub const DEFAULT_PORT: u16 = 6379;

/// Any duplex byte stream a connection can run over.
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> AsyncStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

pub type BoxStream = Box<dyn AsyncStream>;

/// Network address of one server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostAddr {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl HostAddr {
    /// Port `0` stands for the default port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port: if port == 0 { DEFAULT_PORT } else { port },
            tls: false,
        }
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Opens byte streams to server addresses.
pub trait Connector: Send + Sync + 'static {
    fn connect<'a>(&'a self, addr: &'a HostAddr) -> BoxFuture<'a, io::Result<BoxStream>>;
}

/// Plain TCP. Addresses flagged for TLS are refused; plug a TLS capable connector in instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect<'a>(&'a self, addr: &'a HostAddr) -> BoxFuture<'a, io::Result<BoxStream>> {
        Box::pin(async move {
            if addr.tls {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("{} requires tls, which the tcp connector does not provide", addr),
                ));
            }
            let stream = TcpStream::connect((addr.host.as_str(), addr.port)).await?;
            stream.set_nodelay(true)?;
            Ok(Box::new(stream) as BoxStream)
        })
    }
}
