use crate::config::KafkaConfig;
use crate::error::PublishError;
use crate::models::ListingRecord;
use crate::publisher::client::{LogClient, LogConnector};
use crate::retry::retry_with_delay;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Streams listing records to a topic, keyed by listing id
pub struct Publisher {
    client: Option<Box<dyn LogClient>>,
    topic: String,
    send_timeout: Duration,
    flush_timeout: Duration,
}

impl Publisher {
    /// Connect with the configured bounded retry.
    ///
    /// Returns the last connection error once every attempt has failed.
    pub async fn connect(
        connector: &dyn LogConnector,
        config: &KafkaConfig,
    ) -> Result<Self, PublishError> {
        let bootstrap = config.bootstrap();
        let client = retry_with_delay("Kafka connect", config.connect_policy(), |attempt| {
            debug!("Connecting to Kafka at {} (attempt {})", bootstrap, attempt);
            connector.connect(config)
        })
        .await?;

        info!("Connected to Kafka at {}", bootstrap);

        Ok(Self {
            client: Some(client),
            topic: config.topic.clone(),
            send_timeout: config.send_timeout(),
            flush_timeout: config.flush_timeout(),
        })
    }

    /// Send one record and wait for its acknowledgment.
    ///
    /// Any failure is logged and reported as `false`.
    pub async fn send(&self, record: &ListingRecord) -> bool {
        let Some(client) = self.client.as_deref() else {
            warn!("Publisher is closed, dropping listing {}", record.listing_id);
            return false;
        };

        let payload = match serde_json::to_vec(record) {
            Ok(payload) => payload,
            Err(source) => {
                let e = PublishError::Serialize {
                    listing_id: record.listing_id.clone(),
                    source,
                };
                error!("{}", e);
                return false;
            }
        };

        let key = Some(record.listing_id.as_str()).filter(|k| !k.is_empty());
        match client
            .send(&self.topic, key, &payload, self.send_timeout)
            .await
        {
            Ok(receipt) => {
                debug!(
                    "Sent listing {} to {} partition {} offset {}",
                    record.listing_id, receipt.topic, receipt.partition, receipt.offset
                );
                true
            }
            Err(e) => {
                error!("Failed to send listing {}: {}", record.listing_id, e);
                false
            }
        }
    }

    /// Send records one by one, then flush. Returns how many were acknowledged.
    pub async fn send_batch(&self, records: &[ListingRecord]) -> usize {
        let mut success_count = 0;
        for record in records {
            if self.send(record).await {
                success_count += 1;
            }
        }

        self.flush().await;
        info!(
            "Successfully sent {}/{} listings to {}",
            success_count,
            records.len(),
            self.topic
        );
        success_count
    }

    async fn flush(&self) {
        if let Some(client) = self.client.as_deref() {
            if let Err(e) = client.flush(self.flush_timeout).await {
                error!("Failed to flush {}: {}", self.topic, e);
            }
        }
    }

    /// Flush and release the connection. Safe to call more than once.
    pub async fn close(&mut self) {
        self.flush().await;
        if let Some(client) = self.client.take() {
            client.close();
            info!("Kafka producer closed");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::publisher::client::DeliveryReceipt;
    use crate::scrapers::normalize::normalize_summary;
    use crate::models::RawAd;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    /// What the fake broker saw
    #[derive(Default)]
    pub(crate) struct BrokerLog {
        pub sent: Mutex<Vec<(Option<String>, serde_json::Value)>>,
        pub flushes: AtomicUsize,
        pub closes: AtomicUsize,
    }

    pub(crate) struct FakeClient {
        log: Arc<BrokerLog>,
        reject: HashSet<String>,
    }

    #[async_trait]
    impl LogClient for FakeClient {
        async fn send(
            &self,
            topic: &str,
            key: Option<&str>,
            value: &[u8],
            _timeout: Duration,
        ) -> Result<DeliveryReceipt, PublishError> {
            if key.is_some_and(|k| self.reject.contains(k)) {
                return Err(PublishError::Send {
                    topic: topic.to_string(),
                    message: "broker unavailable".to_string(),
                });
            }
            let mut sent = self.log.sent.lock().unwrap();
            sent.push((
                key.map(str::to_string),
                serde_json::from_slice(value).unwrap(),
            ));
            Ok(DeliveryReceipt {
                topic: topic.to_string(),
                partition: 0,
                offset: sent.len() as i64 - 1,
            })
        }

        async fn flush(&self, _timeout: Duration) -> Result<(), PublishError> {
            self.log.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn close(&self) {
            self.log.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Fails the first `failures` connection attempts
    #[derive(Default)]
    pub(crate) struct FakeConnector {
        pub log: Arc<BrokerLog>,
        pub failures: u32,
        pub reject: HashSet<String>,
        pub attempts: AtomicU32,
    }

    impl FakeConnector {
        pub fn unreachable() -> Self {
            Self {
                failures: u32::MAX,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl LogConnector for FakeConnector {
        async fn connect(
            &self,
            config: &KafkaConfig,
        ) -> Result<Box<dyn LogClient>, PublishError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures {
                return Err(PublishError::Connect {
                    bootstrap: config.bootstrap(),
                    message: "connection refused".to_string(),
                });
            }
            Ok(Box::new(FakeClient {
                log: Arc::clone(&self.log),
                reject: self.reject.clone(),
            }))
        }
    }

    pub(crate) fn record(id: &str) -> ListingRecord {
        let ad = RawAd::from_value(json!({ "ad_id": id, "subject": "Volvo 240" })).unwrap();
        normalize_summary(&ad).unwrap()
    }

    #[tokio::test]
    async fn empty_batch_returns_zero_and_flushes() {
        let connector = FakeConnector::default();
        let publisher = Publisher::connect(&connector, &KafkaConfig::default())
            .await
            .unwrap();

        assert_eq!(publisher.send_batch(&[]).await, 0);
        assert_eq!(connector.log.flushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn partial_failures_are_counted_not_fatal() {
        let connector = FakeConnector {
            reject: ["2", "4"].iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        let publisher = Publisher::connect(&connector, &KafkaConfig::default())
            .await
            .unwrap();
        let records: Vec<_> = ["1", "2", "3", "4", "5"].iter().map(|id| record(id)).collect();

        assert_eq!(publisher.send_batch(&records).await, 3);

        let sent = connector.log.sent.lock().unwrap();
        let keys: Vec<_> = sent.iter().map(|(k, _)| k.clone().unwrap()).collect();
        assert_eq!(keys, vec!["1", "3", "5"]);
        assert_eq!(sent[0].1["url"], "https://www.blocket.se/1");
        assert_eq!(connector.log.flushes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_log_retries_three_times_then_fails() {
        let connector = FakeConnector::unreachable();
        let started = Instant::now();

        let result = Publisher::connect(&connector, &KafkaConfig::default()).await;

        assert!(matches!(result, Err(PublishError::Connect { .. })));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_when_a_later_attempt_connects() {
        let connector = FakeConnector {
            failures: 2,
            ..Default::default()
        };
        let publisher = Publisher::connect(&connector, &KafkaConfig::default()).await;

        assert!(publisher.is_ok());
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_later_sends_fail() {
        let connector = FakeConnector::default();
        let mut publisher = Publisher::connect(&connector, &KafkaConfig::default())
            .await
            .unwrap();

        publisher.close().await;
        publisher.close().await;

        assert_eq!(connector.log.closes.load(Ordering::SeqCst), 1);
        assert!(!publisher.send(&record("9")).await);
    }
}
