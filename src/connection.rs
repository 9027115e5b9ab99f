use std::io;

use futures::{SinkExt, StreamExt};
use tokio_util::codec::Framed;
use tracing::debug;
use uuid::Uuid;

use crate::codec::RespCodec;
use crate::command::{Command, ReplyShape};
use crate::error::ProtocolError;
use crate::reply::Reply;
use crate::transport::{BoxStream, Connector, HostAddr};

/// One physical connection to one endpoint.
///
/// The transport is established lazily; a fresh connection only carries its address until
/// [`Connection::connect`] runs. A connection serves a single request at a time.
pub struct Connection {
    pub id: Uuid,
    addr: HostAddr,
    max_frame_size: usize,
    // Bytes read from the stream stay buffered inside the framed transport until the codec has
    // consumed them, so a reply spread over many reads is assembled in place.
    framed: Option<Framed<BoxStream, RespCodec>>,
}

impl Connection {
    pub fn new(addr: HostAddr, max_frame_size: usize) -> Connection {
        Connection {
            id: Uuid::new_v4(),
            addr,
            max_frame_size,
            framed: None,
        }
    }

    /// Wraps an already established stream.
    pub fn from_stream(addr: HostAddr, stream: BoxStream, max_frame_size: usize) -> Connection {
        let mut conn = Connection::new(addr, max_frame_size);
        conn.framed = Some(Framed::new(stream, RespCodec::new(max_frame_size)));
        conn
    }

    pub fn addr(&self) -> &HostAddr {
        &self.addr
    }

    pub fn is_connected(&self) -> bool {
        self.framed.is_some()
    }

    /// Opens the transport unless it is already open.
    pub async fn connect(&mut self, connector: &dyn Connector) -> io::Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let stream = connector.connect(&self.addr).await?;
        debug!(connection_id = %self.id, addr = %self.addr, "connection established");
        self.framed = Some(Framed::new(stream, RespCodec::new(self.max_frame_size)));
        Ok(())
    }

    /// Writes `command` as one frame, flushes, and reads one reply decoded against `shape`.
    pub async fn request(
        &mut self,
        command: &Command,
        shape: ReplyShape,
    ) -> Result<Reply, ProtocolError> {
        let framed = match self.framed.as_mut() {
            Some(framed) => framed,
            None => {
                return Err(io::Error::new(io::ErrorKind::NotConnected, "not connected").into())
            }
        };

        framed.codec_mut().begin(shape);
        framed.send(command).await?;

        match framed.next().await {
            Some(reply) => reply,
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by the server",
            )
            .into()),
        }
    }

    /// Drops the transport. The next [`Connection::connect`] opens a new one.
    pub fn close(&mut self) {
        self.framed = None;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .field("connected", &self.is_connected())
            .finish()
    }
}
