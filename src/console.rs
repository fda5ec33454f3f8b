//! Runs an operator's choice against a hub and reports on the console.
//!
//! Failures of the chosen operation are written to the console output and
//! logged; only failures to write that output are returned.

use std::future::Future;
use std::io::{self, BufRead, Write};

use tracing::{error, warn};

use crate::menu::{prompt_operation, Operation};
use crate::reader::EventReader;
use crate::transport::Connector;
use crate::writer::{BatchingWriter, FlushReport};
use crate::{Error, Result};

pub struct Console<C> {
    connector: C,
    show_headers: bool,
}

impl<C: Connector> Console<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            show_headers: false,
        }
    }

    /// Prints the decoded properties under every received record.
    pub fn show_headers(mut self, show: bool) -> Self {
        self.show_headers = show;
        self
    }

    /// Shows the menu, then runs the chosen operation.
    ///
    /// Invalid input is reported on `output` and nothing is opened on the hub.
    pub async fn interactive<R, W, Fut>(&self, input: &mut R, output: &mut W, shutdown: Fut) -> Result<()>
    where
        R: BufRead,
        W: Write,
        Fut: Future,
    {
        let operation = match prompt_operation(input, output) {
            Ok(operation) => operation,
            Err(Error::Io(e)) => return Err(Error::Io(e)),
            Err(e) => {
                warn!("{}", e);
                writeln!(output, "{}", e)?;
                return Ok(());
            }
        };

        self.execute(operation, output, shutdown).await
    }

    /// Runs `operation`; `shutdown` only interrupts a read.
    pub async fn execute<W, Fut>(&self, operation: Operation, output: &mut W, shutdown: Fut) -> Result<()>
    where
        W: Write,
        Fut: Future,
    {
        let outcome = match operation {
            Operation::Read => self.read(output, shutdown).await,
            Operation::Write { count } => self.write(count, output).await,
        };

        if let Err(e) = outcome {
            error!("{}", e);
            match operation {
                Operation::Read => writeln!(output, "Error reading events: {}", e)?,
                Operation::Write { .. } => writeln!(output, "Error: {}", e)?,
            }
        }
        Ok(())
    }

    async fn read<W, Fut>(&self, output: &mut W, shutdown: Fut) -> Result<()>
    where
        W: Write,
        Fut: Future,
    {
        writeln!(output, "Starting to read events...")?;
        output.flush()?;

        let source = self.connector.open_source()?;
        let show_headers = self.show_headers;
        let mut printed: io::Result<()> = Ok(());

        EventReader::new(source)
            .run(shutdown, |event| {
                if printed.is_err() {
                    return;
                }
                printed = writeln!(output, "{}", event).and_then(|()| {
                    if show_headers {
                        writeln!(output, "\tProperties: {}", event.properties_line())?;
                    }
                    output.flush()
                });
            })
            .await?;

        Ok(printed?)
    }

    async fn write<W: Write>(&self, count: usize, output: &mut W) -> Result<()> {
        writeln!(output, "Preparing to send {} messages with typed headers...", count)?;
        output.flush()?;

        let producer = self.connector.open_producer()?;
        let mut printed: io::Result<()> = Ok(());

        let report = BatchingWriter::new(producer)
            .run(count, |flush: &FlushReport| {
                if printed.is_err() {
                    return;
                }
                let line = if flush.is_final {
                    writeln!(output, "Sent final batch of {} messages", flush.events)
                } else {
                    writeln!(output, "Sent a batch of {} messages", flush.events)
                };
                printed = line.and_then(|()| output.flush());
            })
            .await?;
        printed?;

        writeln!(output, "Successfully sent {} messages with typed headers", report.sent)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryHub;
    use std::io::Cursor;

    async fn interactive(hub: &InMemoryHub, input: &str) -> String {
        let mut output = Vec::new();
        Console::new(hub.clone())
            .interactive(&mut Cursor::new(input), &mut output, futures::future::pending::<()>())
            .await
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_choice_opens_nothing() {
        let hub = InMemoryHub::new();
        let output = interactive(&hub, "7\n").await;

        assert!(output.contains("Invalid input: unknown operation '7'"));
        assert_eq!(hub.connections_opened(), 0);
        assert_eq!(hub.transport_calls(), 0);
    }

    #[tokio::test]
    async fn test_write_choice_sends_requested_count() {
        let hub = InMemoryHub::new();
        let output = interactive(&hub, "2\n3\n").await;

        assert!(output.contains("Preparing to send 3 messages with typed headers...\n"));
        assert!(output.contains("Sent final batch of 3 messages\n"));
        assert!(output.ends_with("Successfully sent 3 messages with typed headers\n"));
        assert_eq!(hub.sent_events(), 3);
        assert!(hub.producer_closed());
    }

    #[tokio::test]
    async fn test_read_prints_a_record_per_sent_event() {
        let hub = InMemoryHub::new();
        interactive(&hub, "2\n2\n").await;

        let mut output = Vec::new();
        Console::new(hub.clone())
            .show_headers(true)
            .execute(Operation::Read, &mut output, futures::future::pending::<()>())
            .await
            .unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.starts_with("Starting to read events...\n"));
        assert_eq!(output.matches("Event received from partition 0:").count(), 2);
        assert_eq!(output.matches("\tProperties: header_string:").count(), 2);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_not_returned() {
        let hub = InMemoryHub::new();
        hub.fail_send_at(1);

        let mut output = Vec::new();
        Console::new(hub.clone())
            .execute(Operation::Write { count: 2 }, &mut output, futures::future::pending::<()>())
            .await
            .unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("Error: Connection error: send #1 rejected by in-memory hub"));
        assert!(!output.contains("Successfully sent"));
    }
}
