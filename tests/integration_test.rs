mod common;

use eventhub_typed_headers::headers::{HeaderType, HeaderValue, CATALOG};
use eventhub_typed_headers::payload::SyntheticPayload;
use eventhub_typed_headers::reader::EventReader;
use eventhub_typed_headers::transport::{KafkaEventProducer, KafkaEventSource};
use eventhub_typed_headers::writer::BatchingWriter;
use std::collections::HashSet;
use std::time::Duration;
use tracing::info;

#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored test_write_then_read_round_trip
async fn test_write_then_read_round_trip() {
    tracing_subscriber::fmt()
        .with_env_filter("eventhub_typed_headers=debug,rdkafka=info")
        .try_init()
        .ok();

    let config = common::get_test_config();
    let count = 5;

    let producer = KafkaEventProducer::new(&config).unwrap();
    let report = BatchingWriter::new(producer)
        .run(count, |flush| info!("Flushed batch of {}", flush.events))
        .await
        .unwrap();
    assert_eq!(report.sent, count);

    let source = KafkaEventSource::new(&config).unwrap();
    let mut received = Vec::new();
    let summary = EventReader::new(source)
        .run(tokio::time::sleep(Duration::from_secs(20)), |event| {
            received.push(event.clone())
        })
        .await
        .unwrap();

    assert!(summary.events >= count as u64);

    let mut ids = HashSet::new();
    for event in &received {
        let payload: SyntheticPayload = serde_json::from_slice(&event.body).unwrap();
        ids.insert(payload.message_id);

        for (name, expected) in CATALOG {
            let value = event
                .properties
                .get(name)
                .unwrap_or_else(|| panic!("missing header {}", name));
            assert_eq!(value.header_type(), expected, "type of {}", name);
        }
        assert_eq!(
            event.properties.get("header_ulong"),
            Some(&HeaderValue::U64(10_000_000_000))
        );
        assert_eq!(
            event.properties.get("header_timespan").map(HeaderValue::header_type),
            Some(HeaderType::Duration)
        );
    }
    assert!((1..=count as u64).all(|id| ids.contains(&id)));
}

#[tokio::test]
#[ignore] // Requires running Kafka
async fn test_producer_creation() {
    let config = common::get_test_config();
    let result = KafkaEventProducer::new(&config);

    // Should succeed even if the broker is not reachable yet (just creates the producer)
    assert!(result.is_ok());
}
