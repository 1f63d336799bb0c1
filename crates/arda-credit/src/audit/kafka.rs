use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::ClientBuilder;
use rskafka::record::Record;
use rskafka::BackoffConfig;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{encode_event, AuditError, AuditSink, LeastBytesBalancer};
use crate::config::AuditConfig;
use crate::credit::CreditDecision;

/// Kafka producer for the audit topic.
///
/// The broker connection is opened on first use and then reused for every
/// message. A transport failure discards it so the next message reconnects;
/// the failed message itself is not retried.
///
/// The client's backoff deadline is zero, so the first IO error on bootstrap,
/// metadata or produce is returned instead of re-sent.
pub struct KafkaAuditPublisher {
    brokers: Vec<String>,
    topic: String,
    connection: Mutex<Option<Arc<TopicConnection>>>,
    balancer: LeastBytesBalancer,
}

struct TopicConnection {
    partitions: BTreeMap<i32, PartitionClient>,
}

impl KafkaAuditPublisher {
    pub fn new(config: &AuditConfig) -> Self {
        Self {
            brokers: config.brokers.clone(),
            topic: config.topic.clone(),
            connection: Mutex::new(None),
            balancer: LeastBytesBalancer::new(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    async fn connection(&self) -> Result<Arc<TopicConnection>, AuditError> {
        let mut slot = self.connection.lock().await;
        if let Some(connection) = slot.as_ref() {
            return Ok(Arc::clone(connection));
        }

        let client = ClientBuilder::new(self.brokers.clone())
            .backoff_config(no_retry())
            .build()
            .await
            .map_err(transport)?;

        let topics = client.list_topics().await.map_err(transport)?;
        let partition_ids = partitions_of(
            topics.into_iter().map(|topic| (topic.name, topic.partitions)),
            &self.topic,
        )?;

        let mut partitions = BTreeMap::new();
        for partition in partition_ids {
            let partition_client = client
                .partition_client(self.topic.clone(), partition, UnknownTopicHandling::Error)
                .await
                .map_err(transport)?;
            partitions.insert(partition, partition_client);
        }

        info!(
            brokers = ?self.brokers,
            topic = %self.topic,
            partitions = partitions.len(),
            "audit publisher connected"
        );

        let connection = Arc::new(TopicConnection { partitions });
        *slot = Some(Arc::clone(&connection));
        Ok(connection)
    }

    async fn disconnect(&self) {
        self.connection.lock().await.take();
    }
}

#[async_trait]
impl AuditSink for KafkaAuditPublisher {
    async fn publish(&self, decision: &CreditDecision) -> Result<(), AuditError> {
        let (key, value) = encode_event(decision)?;
        let connection = self.connection().await?;

        let partition_ids: Vec<i32> = connection.partitions.keys().copied().collect();
        let size = (key.len() + value.len()) as u64;
        let partition = self
            .balancer
            .pick(&partition_ids, size)
            .ok_or_else(|| AuditError::NoPartitions(self.topic.clone()))?;
        let Some(partition_client) = connection.partitions.get(&partition) else {
            return Err(AuditError::NoPartitions(self.topic.clone()));
        };

        let record = Record {
            key: Some(key),
            value: Some(value),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };

        if let Err(err) = partition_client
            .produce(vec![record], Compression::NoCompression)
            .await
        {
            warn!(topic = %self.topic, partition, "dropping audit broker connection");
            self.disconnect().await;
            return Err(transport(err));
        }
        Ok(())
    }
}

impl std::fmt::Debug for KafkaAuditPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaAuditPublisher")
            .field("brokers", &self.brokers)
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

fn no_retry() -> BackoffConfig {
    BackoffConfig {
        deadline: Some(Duration::ZERO),
        ..BackoffConfig::default()
    }
}

fn partitions_of(
    topics: impl IntoIterator<Item = (String, BTreeSet<i32>)>,
    topic: &str,
) -> Result<Vec<i32>, AuditError> {
    let partitions: Vec<i32> = topics
        .into_iter()
        .find(|(name, _)| name == topic)
        .map(|(_, partitions)| partitions.into_iter().collect())
        .unwrap_or_default();
    if partitions.is_empty() {
        return Err(AuditError::NoPartitions(topic.to_string()));
    }
    Ok(partitions)
}

fn transport(err: impl std::fmt::Display) -> AuditError {
    AuditError::Transport(err.to_string())
}
