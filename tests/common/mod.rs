#![allow(dead_code)]

use bytes::Bytes;
use eventhub_typed_headers::config::{Config, ConsumerConfig, HubConfig, ProducerConfig};
use eventhub_typed_headers::event::{Properties, ReceivedEvent};
use std::env;

/// Get test configuration from environment variables
pub fn get_test_config() -> Config {
    // Use TEST_ prefix for test environment variables
    let hub = HubConfig {
        connection_string: env::var("TEST_EVENTHUB_CONNECTION_STRING").unwrap_or_else(|_| {
            "Endpoint=sb://localhost/;SharedAccessKeyName=test;SharedAccessKey=test".to_string()
        }),
        hub_name: env::var("TEST_EVENTHUB_NAME")
            .unwrap_or_else(|_| format!("test_hub_{}", std::process::id())),
        consumer_group: format!("test_group_{}", std::process::id()),
        // A local broker unless a real namespace is configured
        bootstrap_servers: match env::var("TEST_EVENTHUB_CONNECTION_STRING") {
            Ok(_) => None,
            Err(_) => Some(
                env::var("TEST_KAFKA_BROKERS")
                    .unwrap_or_else(|_| "localhost:9092".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            ),
        },
    };

    let producer = ProducerConfig {
        linger_ms: 0, // Immediate sending for tests
        message_timeout_ms: 10_000,
        ..ProducerConfig::default()
    };

    let consumer = ConsumerConfig {
        session_timeout_ms: 10_000,
        ..ConsumerConfig::default()
    };

    let mut config = Config {
        hub,
        producer,
        consumer,
    };
    config.validate().expect("test config should be valid");
    config
}

pub fn received(partition: i32, sequence_number: i64, body: &str) -> ReceivedEvent {
    ReceivedEvent {
        partition_id: partition.to_string(),
        sequence_number,
        enqueued_time_ms: 1_700_000_000_000 + sequence_number * 1_000,
        body: Bytes::from(body.to_string()),
        partition_key: Some(format!("key-{}", sequence_number)),
        offset: format!("{}", sequence_number * 512),
        properties: Properties::new(),
    }
}
