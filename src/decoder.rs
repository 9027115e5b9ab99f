// https://redis.io/docs/reference/protocol-spec

use std::mem;
use std::str;

use bytes::{Buf, Bytes, BytesMut};

use crate::command::{ReadMode, ReplyShape, ValueKind};
use crate::error::ProtocolError;
use crate::reply::{Reply, ReplyItem, ReplyKind, Value};

static CRLF: &[u8; 2] = b"\r\n";

/// Most the input buffer grows ahead of a pending bulk body.
const MAX_RESERVE: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for a `<tag><payload>\r\n` line.
    Line,
    /// Waiting for a bulk body of the given length plus its CRLF.
    Body(usize),
}

/// An array below the top level that is still being filled.
#[derive(Debug)]
struct Level {
    remaining: usize,
    items: Vec<ReplyItem>,
}

/// Incremental reply decoder.
///
/// Bytes are consumed as soon as a complete line or bulk body is available, and the position
/// inside the reply (array counts, pending bulk length, nested arrays) is kept between calls, so
/// a reply split across many reads is never parsed twice. `decode` returns `Ok(None)` while the
/// reply is incomplete.
#[derive(Debug)]
pub struct ReplyDecoder {
    shape: ReplyShape,
    reply: Reply,
    state: State,
    in_array: bool,
    nested: Vec<Level>,
    max_body: usize,
}

impl ReplyDecoder {
    pub fn new(max_body: usize) -> Self {
        let mut decoder = Self {
            shape: ReplyShape::default(),
            reply: Reply::new(),
            state: State::Line,
            in_array: false,
            nested: Vec::new(),
            max_body,
        };
        decoder.reset(ReplyShape::default());
        decoder
    }

    /// Prepares the decoder for the next reply.
    pub fn reset(&mut self, shape: ReplyShape) {
        self.shape = shape;
        self.reply.begin();
        self.state = State::Line;
        self.in_array = false;
        self.nested.clear();
    }

    /// The reply decoded so far.
    pub fn reply(&self) -> &Reply {
        &self.reply
    }

    /// Whether no byte of the current reply has been consumed yet.
    pub fn is_idle(&self) -> bool {
        self.state == State::Line
            && !self.in_array
            && self.nested.is_empty()
            && self.reply.read_count == 0
    }

    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Reply>, ProtocolError> {
        loop {
            let done = match self.state {
                State::Line => {
                    let line = match take_line(src)? {
                        Some(line) => line,
                        None => return Ok(None),
                    };
                    self.on_line(&line)?
                }
                State::Body(len) => {
                    // Checked when the length line was read.
                    let needed = len.saturating_add(CRLF.len());
                    if src.len() < needed {
                        src.reserve((needed - src.len()).min(MAX_RESERVE));
                        return Ok(None);
                    }
                    let body = src.split_to(len).freeze();
                    if &src[..CRLF.len()] != CRLF {
                        return Err(ProtocolError::MissingCrlf);
                    }
                    src.advance(CRLF.len());
                    self.state = State::Line;
                    self.on_bulk(Some(body))
                }
            };

            if done {
                self.reply.complete();
                let reply = mem::take(&mut self.reply);
                self.reset(ReplyShape::default());
                return Ok(Some(reply));
            }
        }
    }

    fn on_line(&mut self, line: &[u8]) -> Result<bool, ProtocolError> {
        let (tag, payload) = match line.split_first() {
            Some(split) => split,
            None => return Err(ProtocolError::EmptyLine),
        };

        match tag {
            b'+' => {
                let text = String::from_utf8_lossy(payload).into_owned();
                Ok(self.place(ReplyItem::new(ReplyKind::Simple, Value::Text(text))))
            }
            b'-' => {
                let text = String::from_utf8_lossy(payload).into_owned();
                Ok(self.place(ReplyItem::new(ReplyKind::Error, Value::Text(text))))
            }
            b':' => {
                let integer = parse_integer(payload)
                    .ok_or_else(|| ProtocolError::InvalidInteger(lossy(payload)))?;
                Ok(self.place(ReplyItem::new(ReplyKind::Integer, Value::Integer(integer))))
            }
            // $<length>\r\n<data>\r\n
            b'$' => {
                let length = parse_length(payload)?;
                self.reply.body_length = Some(length);
                if length == -1 {
                    return Ok(self.on_bulk(None));
                }
                let length = usize::try_from(length)
                    .ok()
                    .filter(|length| length.checked_add(CRLF.len()).is_some())
                    .ok_or_else(|| ProtocolError::InvalidLength(lossy(payload)))?;
                if length > self.max_body {
                    return Err(ProtocolError::FrameTooLarge {
                        size: length,
                        limit: self.max_body,
                    });
                }
                self.state = State::Body(length);
                Ok(false)
            }
            // *<number-of-elements>\r\n<element-1>...<element-n>
            b'*' => {
                let count = parse_length(payload)?;
                if count == -1 {
                    return Ok(self.place(ReplyItem::null()));
                }
                Ok(self.open_array(count as usize))
            }
            byte => Err(ProtocolError::InvalidDataType(*byte)),
        }
    }

    fn open_array(&mut self, count: usize) -> bool {
        if !self.in_array && self.nested.is_empty() {
            self.in_array = true;
            self.reply.classify(ReplyKind::Array);
            self.reply.array_count = count;
            self.reply.array_read_count = 0;
            return count == 0;
        }

        if count == 0 {
            return self.place(ReplyItem::new(ReplyKind::Array, Value::Array(Vec::new())));
        }

        self.nested.push(Level {
            remaining: count,
            items: Vec::with_capacity(count.min(1024)),
        });
        false
    }

    fn on_bulk(&mut self, body: Option<Bytes>) -> bool {
        let item = match body {
            Some(body) => bulk_item(body, self.current_kind()),
            None => ReplyItem::null(),
        };
        self.place(item)
    }

    /// The value kind expected for the bulk being read.
    fn current_kind(&self) -> ValueKind {
        if !self.in_array {
            return self.shape.kind_at(0);
        }
        if !self.nested.is_empty() {
            return self.shape.kind_at(self.reply.array_read_count);
        }
        match self.shape.mode() {
            ReadMode::Standard => self.shape.kind_at(self.reply.array_read_count),
            ReadMode::AlternatingKeyValue if self.reply.read_count % 2 == 0 => ValueKind::Text,
            ReadMode::AlternatingKeyValue => self.shape.kind_at(self.reply.read_count / 2),
        }
    }

    /// Places a finished value. Returns whether the whole reply is complete.
    fn place(&mut self, item: ReplyItem) -> bool {
        if let Some(level) = self.nested.last_mut() {
            level.items.push(item);
            level.remaining -= 1;
            if level.remaining > 0 {
                return false;
            }
            return match self.nested.pop() {
                Some(level) => {
                    self.place(ReplyItem::new(ReplyKind::Array, Value::Array(level.items)))
                }
                None => false,
            };
        }

        let slot = self.reply.read_count;
        self.reply.read_count += 1;

        if self.in_array {
            self.reply.array_read_count += 1;
            let is_key_slot =
                self.shape.mode() == ReadMode::AlternatingKeyValue && slot % 2 == 0;
            if !is_key_slot {
                self.reply.push(item);
            }
            return self.reply.array_read_count == self.reply.array_count;
        }

        self.reply.classify(item.kind);
        match item.value {
            Value::Null => {}
            Value::Text(text) if matches!(item.kind, ReplyKind::Simple | ReplyKind::Error) => {
                self.reply.set_message(text)
            }
            value => self.reply.push(ReplyItem::new(item.kind, value)),
        }
        true
    }
}

fn bulk_item(body: Bytes, kind: ValueKind) -> ReplyItem {
    match kind {
        ValueKind::Text => match str::from_utf8(&body) {
            Ok(text) => ReplyItem::new(ReplyKind::String, Value::Text(text.to_owned())),
            Err(_) => ReplyItem::new(ReplyKind::Bulk, Value::Bytes(body)),
        },
        ValueKind::Bytes => ReplyItem::new(ReplyKind::Bulk, Value::Bytes(body)),
        ValueKind::Object => ReplyItem::new(ReplyKind::Object, Value::Object(body)),
    }
}

/// Splits off the next CRLF terminated line, without its terminator.
fn take_line(src: &mut BytesMut) -> Result<Option<BytesMut>, ProtocolError> {
    let end = match src.windows(2).position(|window| window == CRLF) {
        Some(end) => end,
        None => return Ok(None),
    };
    if end == 0 {
        return Err(ProtocolError::EmptyLine);
    }
    let line = src.split_to(end);
    src.advance(CRLF.len());
    Ok(Some(line))
}

fn parse_integer(payload: &[u8]) -> Option<i64> {
    str::from_utf8(payload).ok()?.parse::<i64>().ok()
}

/// Parses a bulk length or array count. `-1` is the null marker; other negatives are invalid.
fn parse_length(payload: &[u8]) -> Result<i64, ProtocolError> {
    match parse_integer(payload) {
        Some(n) if n >= -1 => Ok(n),
        _ => Err(ProtocolError::InvalidLength(lossy(payload))),
    }
}

fn lossy(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}
