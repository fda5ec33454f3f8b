mod common;

use eventhub_typed_headers::reader::EventReader;
use eventhub_typed_headers::transport::InMemorySource;
use eventhub_typed_headers::Error;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_one_record_per_event() {
    let events: Vec<_> = (1..=5)
        .map(|seq| common::received(seq as i32 % 2, seq, &format!("{{\"MessageId\":{}}}", seq)))
        .collect();
    let source = InMemorySource::new(events.clone());

    let mut records = Vec::new();
    let summary = EventReader::new(source)
        .run(futures::future::pending::<()>(), |event| records.push(event.to_string()))
        .await
        .unwrap();

    assert_eq!(summary.events, 5);
    assert_eq!(records.len(), 5);

    for (record, event) in records.iter().zip(&events) {
        assert!(record.starts_with(&format!("Event received from partition {}:", event.partition_id)));
        assert!(record.contains(&format!("\tSequence number: {}\n", event.sequence_number)));
        assert!(record.contains(&format!("\tTime: {}\n", event.enqueued_time_ms)));
        assert!(record.contains(&format!("\tBody: {}\n", event.body_text())));
        assert!(record.contains(&format!("\tKey: {}\n", event.partition_key.as_deref().unwrap())));
        assert!(record.ends_with(&format!("\tOffset: {}", event.offset)));
    }
}

#[tokio::test]
async fn test_empty_stream() {
    let source = InMemorySource::new(Vec::new());
    let closed = source.closed_flag();

    let summary = EventReader::new(source)
        .run(futures::future::pending::<()>(), |_| panic!("no events expected"))
        .await
        .unwrap();

    assert_eq!(summary.events, 0);
    assert!(closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_transport_error_reported_after_delivered_events() {
    let source = InMemorySource::failing_after(
        vec![common::received(0, 1, "a"), common::received(0, 2, "b")],
        "connection reset",
    );
    let closed = source.closed_flag();

    let mut bodies = Vec::new();
    let err = EventReader::new(source)
        .run(futures::future::pending::<()>(), |event| {
            bodies.push(event.body_text().into_owned())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Connection(_)));
    assert_eq!(err.to_string(), "Connection error: connection reset");
    assert_eq!(bodies, vec!["a", "b"]);
    assert!(closed.load(Ordering::SeqCst));
}
