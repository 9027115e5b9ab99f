use tokio::sync::oneshot;
use tracing::{debug, field, instrument, warn, Span};

use crate::command::{Command, ReplyShape};
use crate::dispatch::{Completion, Dispatcher};
use crate::endpoint::Endpoint;
use crate::error::ProtocolError;
use crate::reply::Reply;
use crate::router::Router;

pub const SERVER_NOT_AVAILABLE: &str = "server is not available";
pub const POOL_EXHAUSTED: &str = "exceeding maximum number of connections";

/// Runs one command against the endpoint the router picks and returns its reply.
///
/// Never fails: routing, pool and transport failures come back as `NetError` or `DataError`
/// replies. Nothing is retried. The reply reaches the caller through the dispatcher.
#[instrument(
    name = "request",
    skip_all,
    fields(verb = command.name().as_str(), read_only = command.is_read_only(), endpoint)
)]
pub async fn execute(
    router: &Router,
    dispatcher: &Dispatcher,
    command: &Command,
    shape: ReplyShape,
) -> Reply {
    let reply = run(router, command, shape).await;

    let (tx, rx) = oneshot::channel();
    dispatcher.dispatch(Completion::new(tx, reply));
    match rx.await {
        Ok(reply) => reply,
        Err(_) => Reply::net_error("request was dropped before it completed"),
    }
}

async fn run(router: &Router, command: &Command, shape: ReplyShape) -> Reply {
    let endpoint = match router.route(command.is_read_only()) {
        Some(endpoint) => endpoint,
        None => {
            warn!("no endpoint available");
            return Reply::net_error(SERVER_NOT_AVAILABLE);
        }
    };
    Span::current().record("endpoint", field::display(endpoint.addr()));

    let mut conn = match endpoint.borrow() {
        Some(conn) => conn,
        None => return Reply::data_error(POOL_EXHAUSTED),
    };

    // Dropping `conn` without a release discards it, also when this future is cancelled.
    if let Err(reply) = endpoint.connect(&mut conn).await {
        return reply;
    }

    // The command decides how array elements are read.
    let shape = shape.with_mode(command.read_mode());

    let (reply, healthy) = match conn.request(command, shape).await {
        Ok(reply) => (reply, true),
        Err(err) => failed(&endpoint, err),
    };

    debug!(connection_id = %conn.id, kind = ?reply.kind(), "request completed");
    conn.release(healthy);
    reply
}

/// Maps a wire failure to its reply and tells whether the connection can be reused.
fn failed(endpoint: &Endpoint, err: ProtocolError) -> (Reply, bool) {
    warn!(addr = %endpoint.addr(), error = %err, "request failed");
    match err {
        // Rejected by the encoder before anything was written.
        ProtocolError::ScalarTooLarge { .. } => (Reply::data_error(err.to_string()), true),
        err if err.is_io() => (Reply::net_error(err.to_string()), false),
        // The position in the stream is unknown after a malformed reply.
        err => (Reply::data_error(err.to_string()), false),
    }
}
