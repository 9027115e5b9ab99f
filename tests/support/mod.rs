#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// In-process server speaking enough of the protocol for the client tests.
///
/// Besides a small in-memory keyspace it understands two test verbs: `BADREPLY` answers with an
/// invalid type byte and `HALFREPLY` writes part of an array and closes the connection.
pub struct MockServer {
    pub port: u16,
    state: Arc<State>,
    accept: JoinHandle<()>,
}

#[derive(Default)]
struct Keyspace {
    strings: HashMap<String, Bytes>,
    lists: HashMap<String, VecDeque<Bytes>>,
    hashes: HashMap<String, Vec<(String, Bytes)>>,
    // Kept ordered by score, then member.
    zsets: HashMap<String, Vec<(String, f64)>>,
}

#[derive(Default)]
struct State {
    keyspace: Mutex<Keyspace>,
    delay: Mutex<Duration>,
    open: AtomicUsize,
    peak: AtomicUsize,
    accepted: AtomicUsize,
    requests: AtomicUsize,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl MockServer {
    pub async fn start() -> MockServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(State::default());

        let accept = {
            let state = state.clone();
            tokio::spawn(async move {
                while let Ok((socket, _)) = listener.accept().await {
                    state.accepted.fetch_add(1, Ordering::SeqCst);
                    let open = state.open.fetch_add(1, Ordering::SeqCst) + 1;
                    state.peak.fetch_max(open, Ordering::SeqCst);

                    let task = tokio::spawn(serve(socket, state.clone()));
                    state.tasks.lock().unwrap().push(task);
                }
            })
        };

        MockServer {
            port,
            state,
            accept,
        }
    }

    /// Delays every reply.
    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock().unwrap() = delay;
    }

    /// Most connections open at the same time.
    pub fn peak_connections(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    pub fn accepted_connections(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Stops accepting and drops every open connection.
    pub fn stop(&self) {
        self.accept.abort();
        for task in self.state.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn serve(mut socket: TcpStream, state: Arc<State>) {
    let mut buf = BytesMut::with_capacity(4096);

    'conn: loop {
        while let Some(args) = parse_request(&mut buf) {
            state.requests.fetch_add(1, Ordering::SeqCst);
            let delay = *state.delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let (reply, close) = execute(&state, args);
            if socket.write_all(&reply).await.is_err() || close {
                break 'conn;
            }
        }

        match socket.read_buf(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
    }

    state.open.fetch_sub(1, Ordering::SeqCst);
}

/// Pops one `*N\r\n$len\r\n...` request off `buf` once it is complete.
fn parse_request(buf: &mut BytesMut) -> Option<Vec<Bytes>> {
    let mut pos = 0;
    let count = read_header(buf, &mut pos, b'*')?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let len = read_header(buf, &mut pos, b'$')?;
        if buf.len() < pos + len + 2 {
            return None;
        }
        args.push(Bytes::copy_from_slice(&buf[pos..pos + len]));
        pos += len + 2;
    }
    buf.advance(pos);
    Some(args)
}

fn read_header(buf: &[u8], pos: &mut usize, tag: u8) -> Option<usize> {
    let rest = buf.get(*pos..)?;
    let end = rest.windows(2).position(|w| w == b"\r\n")?;
    assert_eq!(rest[0], tag, "malformed request");
    let n = std::str::from_utf8(&rest[1..end]).ok()?.parse().ok()?;
    *pos += end + 2;
    Some(n)
}

fn simple(s: &str) -> Vec<u8> {
    format!("+{}\r\n", s).into_bytes()
}

fn error(s: &str) -> Vec<u8> {
    format!("-{}\r\n", s).into_bytes()
}

fn integer(n: i64) -> Vec<u8> {
    format!(":{}\r\n", n).into_bytes()
}

fn bulk(value: Option<&[u8]>) -> Vec<u8> {
    match value {
        Some(value) => {
            let mut out = format!("${}\r\n", value.len()).into_bytes();
            out.extend_from_slice(value);
            out.extend_from_slice(b"\r\n");
            out
        }
        None => b"$-1\r\n".to_vec(),
    }
}

fn array(items: Vec<Vec<u8>>) -> Vec<u8> {
    let mut out = format!("*{}\r\n", items.len()).into_bytes();
    for item in items {
        out.extend_from_slice(&item);
    }
    out
}

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

fn text(arg: &Bytes) -> String {
    String::from_utf8_lossy(arg).into_owned()
}

fn execute(state: &State, args: Vec<Bytes>) -> (Vec<u8>, bool) {
    let name = text(&args[0]).to_uppercase();
    let args = &args[1..];
    let mut ks = state.keyspace.lock().unwrap();

    let reply = match name.as_str() {
        "PING" => simple("PONG"),
        "SELECT" | "FLUSHDB" => simple("OK"),
        "FLUSHALL" => {
            *ks = Keyspace::default();
            simple("OK")
        }
        "BADREPLY" => b"?oops\r\n".to_vec(),
        "HALFREPLY" => return (b"*2\r\n$1\r\na\r\n".to_vec(), true),
        "SET" => {
            let key = text(&args[0]);
            let exists = ks.strings.contains_key(&key);
            let nx = args.iter().any(|a| a.eq_ignore_ascii_case(b"NX"));
            let xx = args.iter().any(|a| a.eq_ignore_ascii_case(b"XX"));
            if (nx && exists) || (xx && !exists) {
                bulk(None)
            } else {
                ks.strings.insert(key, args[1].clone());
                simple("OK")
            }
        }
        "GET" => {
            let key = text(&args[0]);
            if ks.lists.contains_key(&key) {
                error(WRONGTYPE)
            } else {
                bulk(ks.strings.get(&key).map(|v| &v[..]))
            }
        }
        "DEL" => {
            let mut removed = 0;
            for key in args.iter().map(text) {
                if ks.strings.remove(&key).is_some()
                    | ks.lists.remove(&key).is_some()
                    | ks.hashes.remove(&key).is_some()
                    | ks.zsets.remove(&key).is_some()
                {
                    removed += 1;
                }
            }
            integer(removed)
        }
        "EXISTS" => integer(
            args.iter()
                .map(text)
                .filter(|k| ks.strings.contains_key(k) || ks.lists.contains_key(k))
                .count() as i64,
        ),
        "MGET" => array(
            args.iter()
                .map(|k| bulk(ks.strings.get(&text(k)).map(|v| &v[..])))
                .collect(),
        ),
        "MSET" => {
            for pair in args.chunks(2) {
                ks.strings.insert(text(&pair[0]), pair[1].clone());
            }
            simple("OK")
        }
        "INCR" | "INCRBY" => {
            let key = text(&args[0]);
            let by: i64 = args.get(1).map(|a| text(a).parse().unwrap()).unwrap_or(1);
            let current: i64 = ks
                .strings
                .get(&key)
                .map(|v| text(v).parse().unwrap())
                .unwrap_or(0);
            ks.strings
                .insert(key, Bytes::from((current + by).to_string()));
            integer(current + by)
        }
        "LPUSH" | "RPUSH" => {
            let list = ks.lists.entry(text(&args[0])).or_default();
            for value in &args[1..] {
                if name == "LPUSH" {
                    list.push_front(value.clone());
                } else {
                    list.push_back(value.clone());
                }
            }
            integer(list.len() as i64)
        }
        "LPOP" | "RPOP" => {
            let key = text(&args[0]);
            let value = ks.lists.get_mut(&key).and_then(|list| {
                if name == "LPOP" {
                    list.pop_front()
                } else {
                    list.pop_back()
                }
            });
            bulk(value.as_deref())
        }
        "LLEN" => integer(
            ks.lists
                .get(&text(&args[0]))
                .map(|l| l.len() as i64)
                .unwrap_or(0),
        ),
        "LRANGE" => {
            let list: Vec<Bytes> = ks
                .lists
                .get(&text(&args[0]))
                .map(|l| l.iter().cloned().collect())
                .unwrap_or_default();
            array(
                range(&list, &args[1], &args[2])
                    .iter()
                    .map(|v| bulk(Some(v)))
                    .collect(),
            )
        }
        // Never blocks: an empty set of lists answers like an expired timeout.
        "BLPOP" | "BRPOP" => {
            let keys = &args[..args.len() - 1];
            let mut served = None;
            for key in keys.iter().map(text) {
                let value = ks.lists.get_mut(&key).and_then(|list| {
                    if name == "BLPOP" {
                        list.pop_front()
                    } else {
                        list.pop_back()
                    }
                });
                if let Some(value) = value {
                    served = Some((key, value));
                    break;
                }
            }
            match served {
                Some((key, value)) => array(vec![bulk(Some(key.as_bytes())), bulk(Some(&value))]),
                None => b"*-1\r\n".to_vec(),
            }
        }
        "HSET" | "HMSET" => {
            let hash = ks.hashes.entry(text(&args[0])).or_default();
            let mut added = 0;
            for pair in args[1..].chunks(2) {
                if hash_put(hash, text(&pair[0]), pair[1].clone()) {
                    added += 1;
                }
            }
            if name == "HMSET" {
                simple("OK")
            } else {
                integer(added)
            }
        }
        "HSETNX" => {
            let hash = ks.hashes.entry(text(&args[0])).or_default();
            let field = text(&args[1]);
            if hash.iter().any(|(f, _)| *f == field) {
                integer(0)
            } else {
                hash.push((field, args[2].clone()));
                integer(1)
            }
        }
        "HGET" => bulk(hash_get(&ks, &args[0], &args[1]).as_deref()),
        "HMGET" => array(
            args[1..]
                .iter()
                .map(|field| bulk(hash_get(&ks, &args[0], field).as_deref()))
                .collect(),
        ),
        "HSTRLEN" => integer(
            hash_get(&ks, &args[0], &args[1])
                .map(|v| v.len() as i64)
                .unwrap_or(0),
        ),
        "HDEL" => {
            let mut removed = 0;
            if let Some(hash) = ks.hashes.get_mut(&text(&args[0])) {
                for field in args[1..].iter().map(text) {
                    let before = hash.len();
                    hash.retain(|(f, _)| *f != field);
                    removed += (before - hash.len()) as i64;
                }
            }
            integer(removed)
        }
        "HEXISTS" => integer(hash_get(&ks, &args[0], &args[1]).is_some() as i64),
        "HLEN" => integer(
            ks.hashes
                .get(&text(&args[0]))
                .map(|h| h.len() as i64)
                .unwrap_or(0),
        ),
        "HKEYS" | "HVALS" | "HGETALL" => {
            let hash = ks.hashes.get(&text(&args[0])).cloned().unwrap_or_default();
            array(
                hash.iter()
                    .flat_map(|(f, v)| match name.as_str() {
                        "HKEYS" => vec![bulk(Some(f.as_bytes()))],
                        "HVALS" => vec![bulk(Some(v))],
                        _ => vec![bulk(Some(f.as_bytes())), bulk(Some(v))],
                    })
                    .collect(),
            )
        }
        "HINCRBY" | "HINCRBYFLOAT" => {
            let current = hash_get(&ks, &args[0], &args[1])
                .map(|v| text(&v))
                .unwrap_or_else(|| "0".to_string());
            let hash = ks.hashes.entry(text(&args[0])).or_default();
            let updated = if name == "HINCRBY" {
                let n: i64 = current.parse().unwrap();
                let by: i64 = text(&args[2]).parse().unwrap();
                (n + by).to_string()
            } else {
                let x: f64 = current.parse().unwrap();
                let by: f64 = text(&args[2]).parse().unwrap();
                (x + by).to_string()
            };
            hash_put(hash, text(&args[1]), Bytes::from(updated.clone()));
            if name == "HINCRBY" {
                integer(updated.parse().unwrap())
            } else {
                bulk(Some(updated.as_bytes()))
            }
        }
        "ZADD" => {
            let zset = ks.zsets.entry(text(&args[0])).or_default();
            let mut added = 0;
            for pair in args[1..].chunks(2) {
                let member = text(&pair[1]);
                let score: f64 = text(&pair[0]).parse().unwrap();
                let before = zset.len();
                zset.retain(|(m, _)| *m != member);
                if zset.len() == before {
                    added += 1;
                }
                zset.push((member, score));
            }
            zset.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
            integer(added)
        }
        "ZINCRBY" => {
            let zset = ks.zsets.entry(text(&args[0])).or_default();
            let by: f64 = text(&args[1]).parse().unwrap();
            let member = text(&args[2]);
            let current = zset
                .iter()
                .find(|(m, _)| *m == member)
                .map(|(_, s)| *s)
                .unwrap_or(0.0);
            zset.retain(|(m, _)| *m != member);
            zset.push((member, current + by));
            zset.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
            bulk(Some((current + by).to_string().as_bytes()))
        }
        "ZSCORE" => {
            let member = text(&args[1]);
            let score = ks
                .zsets
                .get(&text(&args[0]))
                .and_then(|z| z.iter().find(|(m, _)| *m == member))
                .map(|(_, s)| s.to_string());
            bulk(score.as_deref().map(str::as_bytes))
        }
        "ZRANK" => {
            let member = text(&args[1]);
            match ks
                .zsets
                .get(&text(&args[0]))
                .and_then(|z| z.iter().position(|(m, _)| *m == member))
            {
                Some(rank) => integer(rank as i64),
                None => bulk(None),
            }
        }
        "ZCARD" => integer(
            ks.zsets
                .get(&text(&args[0]))
                .map(|z| z.len() as i64)
                .unwrap_or(0),
        ),
        "ZREM" => {
            let mut removed = 0;
            if let Some(zset) = ks.zsets.get_mut(&text(&args[0])) {
                for member in args[1..].iter().map(text) {
                    let before = zset.len();
                    zset.retain(|(m, _)| *m != member);
                    removed += (before - zset.len()) as i64;
                }
            }
            integer(removed)
        }
        "ZRANGE" => {
            let zset = ks.zsets.get(&text(&args[0])).cloned().unwrap_or_default();
            let members: Vec<Bytes> = zset.into_iter().map(|(m, _)| Bytes::from(m)).collect();
            array(
                range(&members, &args[1], &args[2])
                    .iter()
                    .map(|m| bulk(Some(m)))
                    .collect(),
            )
        }
        other => error(&format!("ERR unknown command '{}'", other)),
    };

    (reply, false)
}

fn hash_get(ks: &Keyspace, key: &Bytes, field: &Bytes) -> Option<Bytes> {
    let field = text(field);
    ks.hashes
        .get(&text(key))
        .and_then(|h| h.iter().find(|(f, _)| *f == field))
        .map(|(_, v)| v.clone())
}

/// Stores `value` under `field`; tells whether the field is new.
fn hash_put(hash: &mut Vec<(String, Bytes)>, field: String, value: Bytes) -> bool {
    match hash.iter_mut().find(|(f, _)| *f == field) {
        Some(entry) => {
            entry.1 = value;
            false
        }
        None => {
            hash.push((field, value));
            true
        }
    }
}

/// The items between `start` and `stop`, both inclusive, negative indexes counting from the end.
fn range(items: &[Bytes], start: &Bytes, stop: &Bytes) -> Vec<Bytes> {
    let len = items.len() as i64;
    let start: i64 = text(start).parse().unwrap();
    let stop: i64 = text(stop).parse().unwrap();
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    items
        .iter()
        .enumerate()
        .filter(|(i, _)| (*i as i64) >= start && (*i as i64) <= stop)
        .map(|(_, v)| v.clone())
        .collect()
}

/// A port nothing listens on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
