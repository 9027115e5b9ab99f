use std::io;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::command::{Command, ReplyShape};
use crate::decoder::ReplyDecoder;
use crate::encoder;
use crate::error::ProtocolError;
use crate::reply::Reply;

pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

/// Binds the request encoder and the incremental reply decoder to a framed stream.
///
/// Each connection owns one codec, so the scratch buffer and the decoder state are never shared
/// between concurrent requests.
#[derive(Debug)]
pub struct RespCodec {
    decoder: ReplyDecoder,
    scratch: Vec<u8>,
    max_frame_size: usize,
}

impl RespCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            decoder: ReplyDecoder::new(max_frame_size),
            scratch: Vec::new(),
            max_frame_size,
        }
    }

    /// Sets the shape the next reply is decoded against.
    pub fn begin(&mut self, shape: ReplyShape) {
        self.decoder.reset(shape);
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for RespCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for RespCodec {
    type Item = Reply;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Refuse to buffer without bound when a peer never terminates a frame.
        if src.len() > self.max_frame_size {
            return Err(ProtocolError::FrameTooLarge {
                size: src.len(),
                limit: self.max_frame_size,
            });
        }

        self.decoder.decode(src)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(reply) => Ok(Some(reply)),
            None if src.is_empty() && self.decoder.is_idle() => Ok(None),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before the reply was complete",
            )
            .into()),
        }
    }
}

impl Encoder<&Command> for RespCodec {
    type Error = ProtocolError;

    fn encode(&mut self, command: &Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encoder::encode(command, &mut self.scratch, dst)
    }
}
