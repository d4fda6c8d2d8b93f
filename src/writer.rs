//! Cross-thread, one-shot response handoff.
//!
//! Re-architected from `original_source`'s reference-counted session (where
//! a handler could hand a raw session pointer to another thread and later
//! call back into it) into a message-passing handle: `send` posts the
//! finished [`HttpResponse`](crate::response::HttpResponse) onto the
//! session's serialized execution lane through a
//! [`tokio::sync::oneshot`] channel, the channel primitive already present
//! in the teacher's dependency stack (`tokio` with the `sync` feature).
//! No lock is needed because exactly one task (the session's) ever reads
//! the `Receiver`, and exactly one call to `send` ever writes to the
//! `Sender`.

use crate::response::HttpResponse;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Thread-safe, consume-once handle through which a handler delivers its
/// response to the session that created the request.
///
/// `send` may be called from any thread, including one the handler spawned
/// itself. Calling it a second time is a documented no-op (§9 open question
/// (c)): the channel's `Sender` is consumed by the first call, so the
/// second response is silently dropped rather than panicking — a
/// worker-lane panic would take the whole connection task down, a
/// disproportionate failure mode for what is purely an embedder contract
/// violation with no effect on the network peer.
///
/// Dropping a writer without calling `send` is not treated as an error: the
/// session simply times out on its write deadline and closes, counted as a
/// `write_timeout` (§9 open question (b); no implicit 500 is synthesized).
#[derive(Clone)]
pub struct HttpResponseWriter {
    sender: Arc<Mutex<Option<oneshot::Sender<HttpResponse>>>>,
}

impl HttpResponseWriter {
    pub(crate) fn new() -> (Self, oneshot::Receiver<HttpResponse>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sender: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Delivers `response` to the originating session, triggering its
    /// Dispatching → Writing transition.
    ///
    /// The second and any later call on a clone of the same writer is a
    /// silent no-op.
    pub fn send(&self, response: HttpResponse) {
        if let Ok(mut guard) = self.sender.lock() {
            if let Some(sender) = guard.take() {
                // A `send` failure here means the session's receiver was
                // already dropped (connection closed/timed out); there is
                // nowhere left to report that, so it is silently ignored,
                // matching the "no cancellation of handlers" design note.
                let _ = sender.send(response);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StatusCode;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (writer, rx) = HttpResponseWriter::new();
        writer.send(HttpResponse::new(StatusCode::Ok, b"hi".to_vec(), "text/plain"));

        let response = rx.await.unwrap();
        assert_eq!(response.body(), b"hi");
    }

    #[tokio::test]
    async fn second_send_is_a_silent_no_op() {
        let (writer, rx) = HttpResponseWriter::new();
        writer.send(HttpResponse::new(StatusCode::Ok, b"first".to_vec(), "text/plain"));
        writer.send(HttpResponse::new(StatusCode::Ok, b"second".to_vec(), "text/plain"));

        let response = rx.await.unwrap();
        assert_eq!(response.body(), b"first");
    }

    #[tokio::test]
    async fn dropping_writer_without_send_closes_the_channel() {
        let (writer, rx) = HttpResponseWriter::new();
        drop(writer);

        assert!(rx.await.is_err());
    }
}
