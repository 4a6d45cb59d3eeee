//! Ledger event broadcasting
//!
//! Publishes committed event records to NATS as CBOR messages for external
//! observers.

use async_nats::Client as NatsClient;

use crate::ledger::EventRecord;

#[derive(Clone)]
pub struct EventPublisher {
    nats_client: Option<NatsClient>,
    subject: String,
}

impl EventPublisher {
    pub fn new(nats_client: Option<NatsClient>, subject: String) -> Self {
        Self {
            nats_client,
            subject,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Publish one record. Failures are logged, never returned: the record
    /// is already committed and stays replayable from the log.
    pub async fn publish(&self, record: &EventRecord) {
        let kind = record.event.kind();
        let Some(ref client) = self.nats_client else {
            log::debug!(
                "NATS not available, skipping {} event #{}",
                kind,
                record.sequence
            );
            return;
        };
        match record.encode_message() {
            Ok(message) => {
                if let Err(e) = client.publish(self.subject.clone(), message.into()).await {
                    log::error!(
                        "Failed to publish {} event #{}: {}",
                        kind,
                        record.sequence,
                        e
                    );
                } else {
                    log::info!(
                        "Published {} event #{} for course {}",
                        kind,
                        record.sequence,
                        record.event.course_id()
                    );
                }
            }
            Err(e) => {
                log::error!("Failed to encode {} event #{}: {}", kind, record.sequence, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{EventLog, LedgerEvent};

    #[tokio::test]
    async fn test_publish_without_nats_is_noop() {
        let publisher = EventPublisher::new(None, "attendance.events".to_string());
        let mut log = EventLog::new();
        let record = log
            .append(
                LedgerEvent::CourseCreated {
                    course_id: 0,
                    name: "Intro".to_string(),
                },
                1,
            )
            .clone();

        publisher.publish(&record).await;
        assert_eq!(publisher.subject(), "attendance.events");
    }
}
