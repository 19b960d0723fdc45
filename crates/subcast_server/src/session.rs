use std::collections::HashMap;
use std::sync::Arc;

use subcast_broker::{BrokerError, Registry, Subscriber};
use subcast_client::Connection;
use subcast_protocol::{code, ClientFrame, ServerFrame};
use tracing::debug;

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Dispatcher for one socket session.
///
/// Reads are driven externally (see `websocket::handle_socket`); this type
/// owns the per-session `subscriptions` table mapping topic name to the
/// subscriber this session created there, so everything can be unregistered
/// on exit. Validation failures answer with `BAD_REQUEST` and leave all
/// broker state untouched.
pub struct Session {
    conn: Connection,
    registry: Arc<Registry>,
    queue_capacity: usize,
    subscriptions: HashMap<String, Arc<Subscriber>>,
}

impl Session {
    pub fn new(conn: Connection, registry: Arc<Registry>, queue_capacity: usize) -> Self {
        Self {
            conn,
            registry,
            queue_capacity,
            subscriptions: HashMap::new(),
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub async fn dispatch(&mut self, mut frame: ClientFrame) {
        let kind = std::mem::take(&mut frame.kind);
        match kind.as_str() {
            "ping" => self.send(ServerFrame::pong(frame.request_id)).await,
            "subscribe" => self.handle_subscribe(frame).await,
            "unsubscribe" => self.handle_unsubscribe(frame).await,
            "publish" => self.handle_publish(frame).await,
            other => {
                debug!(conn = %self.conn.id(), kind = other, "unknown frame type");
                self.send(ServerFrame::error(
                    frame.request_id,
                    code::BAD_REQUEST,
                    "unknown message type",
                ))
                .await;
            }
        }
    }

    async fn handle_subscribe(&mut self, frame: ClientFrame) {
        let (Some(topic_name), Some(client_id)) =
            (non_empty(frame.topic), non_empty(frame.client_id))
        else {
            self.send(ServerFrame::error(
                frame.request_id,
                code::BAD_REQUEST,
                "topic and client_id required",
            ))
            .await;
            return;
        };
        let topic = match self.registry.get_topic(&topic_name) {
            Ok(topic) => topic,
            Err(err) => {
                self.send(ServerFrame::error(
                    frame.request_id,
                    err.wire_code(),
                    err.to_string(),
                ))
                .await;
                return;
            }
        };

        let replay = usize::try_from(frame.last_n.unwrap_or(0)).unwrap_or(0);
        let sub = Subscriber::spawn(
            client_id,
            topic_name.clone(),
            self.queue_capacity,
            self.conn.clone(),
        );
        match topic.subscribe(Arc::clone(&sub), replay) {
            Ok(()) => {
                // One binding per topic per session: a displaced earlier
                // subscriber of ours must not linger on the topic.
                if let Some(prev) = self.subscriptions.insert(topic_name.clone(), sub) {
                    topic.remove_subscriber(&prev);
                }
                self.send(ServerFrame::ack(frame.request_id, topic_name)).await;
            }
            // Replay overflow: the subscriber was already closed with a
            // SLOW_CONSUMER frame, and no ack is owed.
            Err(BrokerError::SlowConsumer) => {}
            Err(err) => {
                self.send(ServerFrame::error(
                    frame.request_id,
                    err.wire_code(),
                    err.to_string(),
                ))
                .await;
            }
        }
    }

    async fn handle_unsubscribe(&mut self, frame: ClientFrame) {
        let (Some(topic_name), Some(client_id)) =
            (non_empty(frame.topic), non_empty(frame.client_id))
        else {
            self.send(ServerFrame::error(
                frame.request_id,
                code::BAD_REQUEST,
                "topic and client_id required",
            ))
            .await;
            return;
        };
        // Silent no-op when the topic is gone; the ack is owed either way.
        if let Ok(topic) = self.registry.get_topic(&topic_name) {
            topic.unregister(&client_id);
        }
        if self
            .subscriptions
            .get(&topic_name)
            .is_some_and(|sub| sub.client_id() == client_id)
        {
            self.subscriptions.remove(&topic_name);
        }
        self.send(ServerFrame::ack(frame.request_id, topic_name)).await;
    }

    async fn handle_publish(&mut self, frame: ClientFrame) {
        let (Some(topic_name), Some(message)) = (non_empty(frame.topic), frame.message) else {
            self.send(ServerFrame::error(
                frame.request_id,
                code::BAD_REQUEST,
                "topic and message required",
            ))
            .await;
            return;
        };
        match self.registry.get_topic(&topic_name) {
            Ok(topic) => {
                topic.publish(message);
                self.send(ServerFrame::ack(frame.request_id, topic_name)).await;
            }
            Err(err) => {
                self.send(ServerFrame::error(
                    frame.request_id,
                    err.wire_code(),
                    err.to_string(),
                ))
                .await;
            }
        }
    }

    /// Session exit: tear down every subscription this session created.
    /// A binding already replaced by another session is left in place.
    pub fn finish(&mut self) {
        for (name, sub) in self.subscriptions.drain() {
            match self.registry.get_topic(&name) {
                Ok(topic) => topic.remove_subscriber(&sub),
                Err(_) => sub.close(),
            }
        }
    }

    async fn send(&self, frame: ServerFrame) {
        // A failure here means the connection is gone; the read loop will
        // observe that and exit.
        let _ = self.conn.send(frame).await;
    }
}
