//! Request encoding: `*<N>\r\n` followed by `N` times `$<len>\r\n<bytes>\r\n`.
//!
//! Length headers up to [`MAX_LENGTH_TABLE`] and the bulk frames of every catalog verb are built
//! once per process and only read afterwards.

use std::fmt::Write as _;
use std::io::Write as _;
use std::sync::OnceLock;

use bytes::{BufMut, Bytes, BytesMut};
use strum::{EnumCount, IntoEnumIterator};

use crate::command::{Command, Name, Parameter, Scalar, Verb};
use crate::error::ProtocolError;

pub const MAX_LENGTH_TABLE: usize = 32 * 1024;

/// Capacity of the per-connection scratch buffer scalars are rendered into.
pub const SCRATCH_CAPACITY: usize = 1024 * 1024;

static CRLF: &[u8; 2] = b"\r\n";

/// Ready made `<prefix><n>\r\n` headers for `n` in `0..=MAX_LENGTH_TABLE`, stored back to back.
struct HeaderTable {
    bytes: Vec<u8>,
    offsets: Vec<usize>,
}

impl HeaderTable {
    fn build(prefix: char) -> Self {
        let mut text = String::with_capacity((MAX_LENGTH_TABLE + 1) * 8);
        let mut offsets = Vec::with_capacity(MAX_LENGTH_TABLE + 2);
        for n in 0..=MAX_LENGTH_TABLE {
            offsets.push(text.len());
            // Writing into a String cannot fail.
            let _ = write!(text, "{}{}\r\n", prefix, n);
        }
        offsets.push(text.len());
        Self {
            bytes: text.into_bytes(),
            offsets,
        }
    }

    fn get(&self, n: usize) -> Option<&[u8]> {
        if n > MAX_LENGTH_TABLE {
            return None;
        }
        Some(&self.bytes[self.offsets[n]..self.offsets[n + 1]])
    }
}

struct Tables {
    array_headers: HeaderTable,
    bulk_headers: HeaderTable,
    verbs: Vec<Bytes>,
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();
    // The initializer must not call back into `tables()`.
    TABLES.get_or_init(|| {
        let bulk_headers = HeaderTable::build('$');
        let verbs = Verb::iter()
            .map(|verb| frame_name(&bulk_headers, verb.as_str()))
            .collect();
        Tables {
            array_headers: HeaderTable::build('*'),
            bulk_headers,
            verbs,
        }
    })
}

/// Builds the bulk frame of a verb: `$<len>\r\n<NAME>\r\n`.
pub fn frame_verb(name: &str) -> Bytes {
    frame_name(&tables().bulk_headers, name)
}

fn frame_name(bulk_headers: &HeaderTable, name: &str) -> Bytes {
    let mut frame = BytesMut::with_capacity(name.len() + 8);
    match bulk_headers.get(name.len()) {
        Some(header) => frame.put_slice(header),
        None => write_header(&mut frame, b'$', name.len()),
    }
    frame.put_slice(name.as_bytes());
    frame.put_slice(CRLF);
    frame.freeze()
}

/// The precomputed frame of a catalog verb.
pub fn verb_frame(verb: Verb) -> &'static [u8] {
    let tables = tables();
    debug_assert_eq!(tables.verbs.len(), Verb::COUNT);
    &tables.verbs[verb as usize]
}

pub fn write_array_header(dst: &mut BytesMut, count: usize) {
    match tables().array_headers.get(count) {
        Some(header) => dst.put_slice(header),
        None => write_header(dst, b'*', count),
    }
}

pub fn write_bulk_header(dst: &mut BytesMut, len: usize) {
    match tables().bulk_headers.get(len) {
        Some(header) => dst.put_slice(header),
        None => write_header(dst, b'$', len),
    }
}

/// Writes a complete bulk frame around `body`.
pub fn write_bulk(dst: &mut BytesMut, body: &[u8]) {
    dst.reserve(body.len() + 16);
    write_bulk_header(dst, body.len());
    dst.put_slice(body);
    dst.put_slice(CRLF);
}

fn write_header(dst: &mut BytesMut, prefix: u8, n: usize) {
    let mut writer = dst.writer();
    // Writing into a BytesMut cannot fail.
    let _ = write!(writer, "{}{}\r\n", prefix as char, n);
}

/// Encodes `command` onto `dst` as one request frame.
///
/// Scalars that are not already bytes are rendered into `scratch`, which is cleared per value
/// and never grows past [`SCRATCH_CAPACITY`]. On error `dst` is left exactly as it was, so a
/// half written frame never reaches the connection.
pub fn encode(
    command: &Command,
    scratch: &mut Vec<u8>,
    dst: &mut BytesMut,
) -> Result<(), ProtocolError> {
    let start = dst.len();
    let result = encode_frame(command, scratch, dst);
    if result.is_err() {
        dst.truncate(start);
    }
    result
}

fn encode_frame(
    command: &Command,
    scratch: &mut Vec<u8>,
    dst: &mut BytesMut,
) -> Result<(), ProtocolError> {
    write_array_header(dst, command.arity());

    match command.name() {
        Name::Known(verb) => dst.put_slice(verb_frame(*verb)),
        Name::Custom { frame, .. } => dst.put_slice(frame),
    }

    for param in command.params() {
        match param {
            Parameter::Object(frame) => dst.put_slice(frame),
            Parameter::Scalar(Scalar::Bytes(bytes)) => {
                check_scalar_len(bytes.len())?;
                write_bulk(dst, bytes);
            }
            Parameter::Scalar(scalar) => {
                scratch.clear();
                render(scalar, scratch);
                check_scalar_len(scratch.len())?;
                write_bulk(dst, scratch);
            }
        }
    }

    Ok(())
}

fn render(scalar: &Scalar, scratch: &mut Vec<u8>) {
    // Writing into a Vec cannot fail.
    let _ = match scalar {
        Scalar::Bytes(bytes) => scratch.write_all(bytes),
        Scalar::Int(i) => write!(scratch, "{}", i),
        Scalar::UInt(u) => write!(scratch, "{}", u),
        Scalar::Float(x) => write!(scratch, "{}", x),
    };
}

fn check_scalar_len(len: usize) -> Result<(), ProtocolError> {
    if len > SCRATCH_CAPACITY {
        return Err(ProtocolError::ScalarTooLarge {
            len,
            limit: SCRATCH_CAPACITY,
        });
    }
    Ok(())
}
