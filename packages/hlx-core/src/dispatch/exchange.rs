//! Client-side request/response correlation: single outstanding exchange
//! per connection, FIFO, with timeout and bounded query retry.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::timeout;
use uuid::Uuid;

use crate::connection::Connection;
use crate::error::{HlxError, HlxResult};
use crate::protocol::catalog::{self, Verb};
use crate::protocol::framing::render_frame;

/// A frame the exchange manager couldn't attribute to the head-of-queue
/// request: either a genuine unsolicited notification, or a stray frame
/// that matched neither the expected response pattern nor any
/// notification pattern.
#[derive(Debug, Clone)]
pub struct Notification {
    pub verb: Verb,
    pub captures: Vec<String>,
}

struct PendingExchange {
    id: Uuid,
    expected: Verb,
    responder: oneshot::Sender<HlxResult<Vec<String>>>,
}

struct State {
    queue: VecDeque<(String, PendingExchange)>,
    in_flight: Option<PendingExchange>,
    disconnected: bool,
}

/// Queues requests for one connection, matches inbound frames to the
/// in-flight request or routes them as notifications, and enforces a
/// per-request timeout.
pub struct ExchangeManager {
    connection: Arc<dyn Connection>,
    state: Mutex<State>,
}

impl ExchangeManager {
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self {
            connection,
            state: Mutex::new(State {
                    queue: VecDeque::new(),
                    in_flight: None,
                    disconnected: false,
                }),
        }
    }

    /// Submits `body` (a rendered request frame body) and awaits the
    /// response matching `expected`, or `Timeout`/`Disconnected`.
    pub async fn submit(
        &self,
        body: String,
        expected: Verb,
        request_timeout: Duration,
    ) -> HlxResult<Vec<String>> {
        let (tx, rx) = oneshot::channel();
        let id = Uuid::new_v4();
        let exchange = PendingExchange {
            id,
            expected,
            responder: tx,
        };

        let send_now = {
            let mut state = self.state.lock();
            if state.disconnected {
                return Err(HlxError::Disconnected);
            }
            if state.in_flight.is_none() {
                state.in_flight = Some(exchange);
                true
            } else {
                state.queue.push_back((body.clone(), exchange));
                false
            }
        };

        if send_now {
            let _ = self.connection.send(&render_frame(&body)).await;
        }

        match timeout(request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(HlxError::Disconnected),
            Err(_) => {
                self.expire(id);
                Err(HlxError::Timeout)
            }
        }
    }

    /// Like [`ExchangeManager::submit`], but for read-only queries:
    /// retries up to 3 times with exponential backoff starting at 250ms
    /// on timeout. Mutating requests must use `submit`
    /// directly — retrying them could double-apply a side effect.
    pub async fn submit_query(
        &self,
        body: String,
        expected: Verb,
        request_timeout: Duration,
    ) -> HlxResult<Vec<String>> {
        let mut backoff = Duration::from_millis(250);
        let mut attempts = 0;
        loop {
            match self.submit(body.clone(), expected, request_timeout).await {
                Err(HlxError::Timeout) if attempts < 3 => {
                    attempts += 1;
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                other => return other,
            }
        }
    }

    /// Feeds one inbound frame body. Returns `Some(Notification)` if it
    /// didn't resolve the in-flight exchange (either a genuine
    /// notification, or a stray non-matching frame); `None` if it
    /// completed the in-flight request and the next queued request (if
    /// any) was sent.
    pub async fn on_frame(&self, body: &str) -> Option<Notification> {
        let matched = catalog::recognize(body);

        let (completed, next_body) = {
            let mut state = self.state.lock();
            let Some(in_flight) = state.in_flight.take() else {
                state.in_flight = None;
                drop(state);
                return matched.map(|m| Notification {
                        verb: m.verb,
                        captures: m.captures,
                    });
            };

            let is_error = matched.as_ref().map(|m| m.verb) == Some(Verb::Error);
            let is_expected_match = matched
                .as_ref()
                .map(|m| m.verb == in_flight.expected)
                .unwrap_or(false);

            if is_error {
                let _ = in_flight.responder.send(Err(HlxError::ProtocolError));
            } else if is_expected_match {
                let captures = matched.as_ref().unwrap().captures.clone();
                let _ = in_flight.responder.send(Ok(captures));
            } else {
                // Didn't resolve the head of queue: put it back and
                // surface this frame as a notification/drop candidate.
                state.in_flight = Some(in_flight);
                let notification = matched.map(|m| Notification {
                        verb: m.verb,
                        captures: m.captures,
                    });
                return notification;
            }

            let next = state.queue.pop_front();
            match next {
                Some((body, exchange)) => {
                    state.in_flight = Some(exchange);
                    (true, Some(body))
                }
                None => (true, None),
            }
        };

        if completed {
            if let Some(body) = next_body {
                let _ = self.connection.send(&render_frame(&body)).await;
            }
        }

        None
    }

    /// Fails every queued and in-flight exchange with `Disconnected` and
    /// discards the queue.
    pub fn disconnect(&self) {
        let mut state = self.state.lock();
        state.disconnected = true;
        if let Some(in_flight) = state.in_flight.take() {
            let _ = in_flight.responder.send(Err(HlxError::Disconnected));
        }
        for (_, exchange) in state.queue.drain(..) {
            let _ = exchange.responder.send(Err(HlxError::Disconnected));
        }
    }

    fn expire(&self, id: Uuid) {
        let (expired, next_body) = {
            let mut state = self.state.lock();
            match &state.in_flight {
                Some(ex) if ex.id == id => {
                    state.in_flight = None;
                    let next = state.queue.pop_front();
                    match next {
                        Some((body, exchange)) => {
                            state.in_flight = Some(exchange);
                            (true, Some(body))
                        }
                        None => (true, None),
                    }
                }
                _ => (false, None),
            }
        };
        if expired {
            if let Some(body) = next_body {
                let connection = self.connection.clone();
                tokio::spawn(async move {
                        let _ = connection.send(&render_frame(&body)).await;
                    });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_support::MemoryConnection;
    use std::time::Duration;

    #[tokio::test]
    async fn submit_sends_immediately_when_idle() {
        let conn = Arc::new(MemoryConnection::new());
        let mgr = ExchangeManager::new(conn.clone());

        let mgr = Arc::new(mgr);
        let mgr2 = mgr.clone();
        let task = tokio::spawn(async move {
                mgr2.submit("QZ3".into(), Verb::QueryZone, Duration::from_secs(1))
                    .await
            });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(conn.sent_bodies(), vec!["QZ3"]);

        mgr.on_frame("QZ3").await;
        let result = task.await.unwrap().unwrap();
        assert_eq!(result, vec!["3"]);
    }

    #[tokio::test]
    async fn second_submit_queues_until_first_completes() {
        let conn = Arc::new(MemoryConnection::new());
        let mgr = Arc::new(ExchangeManager::new(conn.clone()));

        let mgr_a = mgr.clone();
        let task_a =
        tokio::spawn(async move { mgr_a.submit("QZ1".into(), Verb::QueryZone, Duration::from_secs(1)).await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mgr_b = mgr.clone();
        let task_b =
        tokio::spawn(async move { mgr_b.submit("QZ2".into(), Verb::QueryZone, Duration::from_secs(1)).await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Only the first request should have gone out so far.
        assert_eq!(conn.sent_bodies(), vec!["QZ1"]);

        mgr.on_frame("QZ1").await;
        task_a.await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(conn.sent_bodies(), vec!["QZ1", "QZ2"]);

        mgr.on_frame("QZ2").await;
        task_b.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn error_frame_resolves_with_protocol_error() {
        let conn = Arc::new(MemoryConnection::new());
        let mgr = Arc::new(ExchangeManager::new(conn));

        let mgr2 = mgr.clone();
        let task = tokio::spawn(async move {
                mgr2.submit("QZ1".into(), Verb::QueryZone, Duration::from_secs(1))
                    .await
            });
        tokio::time::sleep(Duration::from_millis(10)).await;
        mgr.on_frame("ERROR").await;

        assert_eq!(task.await.unwrap(), Err(HlxError::ProtocolError));
    }

    #[tokio::test]
    async fn unrelated_frame_is_returned_as_notification() {
        let conn = Arc::new(MemoryConnection::new());
        let mgr = ExchangeManager::new(conn);
        let notification = mgr.on_frame("VU-40,3").await;
        assert!(notification.is_some());
        assert_eq!(notification.unwrap().verb, Verb::VolumeSet);
    }

    #[tokio::test]
    async fn disconnect_fails_in_flight_and_queued() {
        let conn = Arc::new(MemoryConnection::new());
        let mgr = Arc::new(ExchangeManager::new(conn));

        let mgr_a = mgr.clone();
        let task_a =
        tokio::spawn(async move { mgr_a.submit("QZ1".into(), Verb::QueryZone, Duration::from_secs(5)).await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mgr_b = mgr.clone();
        let task_b =
        tokio::spawn(async move { mgr_b.submit("QZ2".into(), Verb::QueryZone, Duration::from_secs(5)).await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        mgr.disconnect();

        assert_eq!(task_a.await.unwrap(), Err(HlxError::Disconnected));
        assert_eq!(task_b.await.unwrap(), Err(HlxError::Disconnected));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_expires_and_advances_queue() {
        let conn = Arc::new(MemoryConnection::new());
        let mgr = Arc::new(ExchangeManager::new(conn.clone()));

        let mgr_a = mgr.clone();
        let task_a = tokio::spawn(async move {
                mgr_a
                    .submit("QZ1".into(), Verb::QueryZone, Duration::from_millis(50))
                    .await
            });

        let mgr_b = mgr.clone();
        let task_b = tokio::spawn(async move {
                mgr_b
                    .submit("QZ2".into(), Verb::QueryZone, Duration::from_secs(5))
                    .await
            });

        assert_eq!(task_a.await.unwrap(), Err(HlxError::Timeout));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(conn.sent_bodies(), vec!["QZ1", "QZ2"]);

        mgr.on_frame("QZ2").await;
        assert_eq!(task_b.await.unwrap().unwrap(), vec!["2"]);
    }
}
