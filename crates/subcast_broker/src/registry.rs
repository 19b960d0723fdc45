use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::BrokerError;
use crate::topic::Topic;

/// One row of a `list_topics` snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub name: String,
    pub subscribers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub uptime_seconds: u64,
    pub topics: usize,
    pub subscribers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicStats {
    pub messages: u64,
    pub subscribers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub topics: HashMap<String, TopicStats>,
}

/// Process-wide map of topic name to topic.
///
/// Create and delete take the write lock; lookups and the observability
/// snapshots take the read lock. Topics are handed out as `Arc`s, so an
/// operation racing a delete either completes against the pre-deletion topic
/// or observes `TopicNotFound`.
#[derive(Debug)]
pub struct Registry {
    topics: RwLock<HashMap<String, Arc<Topic>>>,
    started_at: Instant,
    ring_capacity: usize,
}

impl Registry {
    /// `ring_capacity` sizes the replay buffer of every topic created through
    /// this registry.
    pub fn new(ring_capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            started_at: Instant::now(),
            ring_capacity,
        }
    }

    pub fn create_topic(&self, name: &str) -> Result<Arc<Topic>, BrokerError> {
        let mut topics = self.topics.write().unwrap();
        if topics.contains_key(name) {
            return Err(BrokerError::TopicExists);
        }
        let topic = Arc::new(Topic::new(name, self.ring_capacity));
        topics.insert(name.to_string(), Arc::clone(&topic));
        info!(topic = name, "topic created");
        Ok(topic)
    }

    pub fn get_topic(&self, name: &str) -> Result<Arc<Topic>, BrokerError> {
        self.topics
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or(BrokerError::TopicNotFound)
    }

    /// Remove the topic and close every subscriber registered on it at the
    /// moment of deletion.
    pub fn delete_topic(&self, name: &str) -> Result<(), BrokerError> {
        let topic = self
            .topics
            .write()
            .unwrap()
            .remove(name)
            .ok_or(BrokerError::TopicNotFound)?;
        topic.close_subscribers();
        info!(topic = name, "topic deleted");
        Ok(())
    }

    /// Point-in-time snapshot of all topics, sorted by name.
    pub fn list_topics(&self) -> Vec<TopicSummary> {
        let mut out: Vec<TopicSummary> = self
            .topics
            .read()
            .unwrap()
            .values()
            .map(|t| TopicSummary {
                name: t.name().to_string(),
                subscribers: t.subscriber_count(),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn health(&self) -> HealthSnapshot {
        let topics = self.topics.read().unwrap();
        HealthSnapshot {
            uptime_seconds: self.started_at.elapsed().as_secs(),
            topics: topics.len(),
            subscribers: topics.values().map(|t| t.subscriber_count()).sum(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        let topics = self.topics.read().unwrap();
        StatsSnapshot {
            topics: topics
                .values()
                .map(|t| {
                    (
                        t.name().to_string(),
                        TopicStats {
                            messages: t.message_count(),
                            subscribers: t.subscriber_count(),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Immediate close of every subscriber on every topic. Queued messages
    /// are abandoned.
    pub fn close_all(&self) {
        let topics: Vec<Arc<Topic>> = self.topics.read().unwrap().values().cloned().collect();
        for topic in topics {
            topic.close_subscribers();
        }
    }

    /// Graceful close: every subscriber stops accepting new messages at
    /// once, then each is given until the shared deadline to flush what is
    /// already queued before the hard close.
    pub async fn close_all_gracefully(&self, timeout: Duration) {
        let subs: Vec<_> = {
            let topics = self.topics.read().unwrap();
            topics
                .values()
                .flat_map(|t| t.subscribers_snapshot())
                .collect()
        };
        if subs.is_empty() {
            return;
        }
        info!(subscribers = subs.len(), "draining subscribers");
        for sub in &subs {
            sub.begin_drain();
        }
        let deadline = tokio::time::Instant::now() + timeout;
        for sub in subs {
            sub.close_gracefully(deadline).await;
        }
    }
}
