use crate::config::KafkaConfig;
use crate::error::PublishError;
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::debug;

/// Where a record landed in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// An open connection to a partitioned append-only log
#[async_trait]
pub trait LogClient: Send + Sync {
    /// Append one value and wait up to `timeout` for the broker's ack
    async fn send(
        &self,
        topic: &str,
        key: Option<&str>,
        value: &[u8],
        timeout: Duration,
    ) -> Result<DeliveryReceipt, PublishError>;

    /// Block until buffered sends are delivered or `timeout` passes
    async fn flush(&self, timeout: Duration) -> Result<(), PublishError>;

    /// Release the connection
    fn close(&self);
}

/// Opens [`LogClient`]s
#[async_trait]
pub trait LogConnector: Send + Sync {
    async fn connect(&self, config: &KafkaConfig) -> Result<Box<dyn LogClient>, PublishError>;
}

/// Connector backed by librdkafka
pub struct KafkaConnector;

/// Producer settings derived from the `[kafka]` section
pub(crate) fn producer_config(config: &KafkaConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", config.bootstrap())
        .set("acks", &config.acks)
        .set("retries", config.retries.to_string())
        .set(
            "max.in.flight.requests.per.connection",
            config.max_in_flight.to_string(),
        )
        .set(
            "message.timeout.ms",
            (config.send_timeout_secs * 1000).to_string(),
        );
    client_config
}

fn connect_error(bootstrap: &str, e: impl std::fmt::Display) -> PublishError {
    PublishError::Connect {
        bootstrap: bootstrap.to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl LogConnector for KafkaConnector {
    async fn connect(&self, config: &KafkaConfig) -> Result<Box<dyn LogClient>, PublishError> {
        let bootstrap = config.bootstrap();
        let producer: FutureProducer = producer_config(config)
            .create()
            .map_err(|e| connect_error(&bootstrap, e))?;

        // Producer creation is lazy; a metadata round trip proves the cluster is reachable
        let metadata_client = producer.clone();
        let timeout = config.send_timeout();
        tokio::task::spawn_blocking(move || {
            metadata_client
                .client()
                .fetch_metadata(None, timeout)
                .map(|metadata| metadata.brokers().len())
        })
        .await
        .map_err(|e| connect_error(&bootstrap, e))?
        .map(|brokers| debug!("Kafka metadata reports {} brokers", brokers))
        .map_err(|e| connect_error(&bootstrap, e))?;

        Ok(Box::new(KafkaClient { producer }))
    }
}

/// [`LogClient`] over an rdkafka [`FutureProducer`]
pub struct KafkaClient {
    producer: FutureProducer,
}

#[async_trait]
impl LogClient for KafkaClient {
    async fn send(
        &self,
        topic: &str,
        key: Option<&str>,
        value: &[u8],
        timeout: Duration,
    ) -> Result<DeliveryReceipt, PublishError> {
        let mut record = FutureRecord::<str, [u8]>::to(topic).payload(value);
        if let Some(key) = key {
            record = record.key(key);
        }

        let delivery =
            tokio::time::timeout(timeout, self.producer.send(record, Timeout::After(timeout)))
                .await
                .map_err(|_| PublishError::Send {
                    topic: topic.to_string(),
                    message: format!("no acknowledgment within {}s", timeout.as_secs()),
                })?;

        match delivery {
            Ok((partition, offset)) => Ok(DeliveryReceipt {
                topic: topic.to_string(),
                partition,
                offset,
            }),
            Err((e, _message)) => Err(PublishError::Send {
                topic: topic.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn flush(&self, timeout: Duration) -> Result<(), PublishError> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|e| PublishError::Flush(e.to_string()))?
            .map_err(|e| PublishError::Flush(e.to_string()))
    }

    fn close(&self) {
        // librdkafka tears the producer down when the last handle drops
        debug!("Kafka client released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_config_requests_full_acks_and_ordered_retries() {
        let client_config = producer_config(&KafkaConfig::default());
        assert_eq!(client_config.get("bootstrap.servers"), Some("localhost:9092"));
        assert_eq!(client_config.get("acks"), Some("all"));
        assert_eq!(client_config.get("retries"), Some("3"));
        assert_eq!(
            client_config.get("max.in.flight.requests.per.connection"),
            Some("1")
        );
        assert_eq!(client_config.get("message.timeout.ms"), Some("10000"));
    }
}
