//! NDJSON response writer.
//!
//! A producer task pulls one record at a time from the backend stream,
//! encodes it and pushes it onto a bounded channel. The receiving half is
//! handed to the HTTP layer as the response body. When the caller goes away
//! the channel closes, the producer drops the record stream, and the
//! backend resource is released.

use std::convert::Infallible;

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::normalizer::encode_record;
use crate::RecordStream;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson; charset=utf-8";

/// Encoded records buffered between producer and HTTP body.
pub const DEFAULT_BUFFER: usize = 16;

pub type NdjsonBody = ReceiverStream<Result<Bytes, Infallible>>;

/// Spawn the producer for `records` and return the body stream.
pub fn ndjson_body(records: RecordStream, capacity: usize) -> NdjsonBody {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(pump(records, tx));
    ReceiverStream::new(rx)
}

async fn pump(mut records: RecordStream, tx: mpsc::Sender<Result<Bytes, Infallible>>) {
    let mut emitted = 0usize;
    loop {
        // Watching `closed` while waiting on the backend lets a disconnect
        // interrupt a read that would otherwise never return.
        let next = tokio::select! {
            biased;
            _ = tx.closed() => {
                debug!(emitted, "caller disconnected; abandoning stream");
                break;
            }
            next = records.next() => next,
        };
        let Some(record) = next else {
            debug!(emitted, "stream complete");
            break;
        };
        let terminal = record.is_error();
        if tx.send(Ok(encode_record(&record))).await.is_err() {
            debug!(emitted, "caller disconnected; abandoning stream");
            break;
        }
        emitted += 1;
        if terminal {
            debug!(emitted, "stream ended with error record");
            break;
        }
    }
    drop(records);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::OutputRecord;
    use futures::stream;

    async fn collect_lines(body: NdjsonBody) -> Vec<String> {
        body.map(|chunk| match chunk {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(never) => match never {},
        })
        .collect()
        .await
    }

    #[tokio::test]
    async fn writes_one_line_per_record_in_order() {
        let records = stream::iter(vec![
            OutputRecord::response("a"),
            OutputRecord::response("b"),
        ])
        .boxed();
        let lines = collect_lines(ndjson_body(records, 1)).await;
        assert_eq!(lines, vec!["{\"response\":\"a\"}\n", "{\"response\":\"b\"}\n"]);
    }

    #[tokio::test]
    async fn nothing_follows_an_error_record() {
        let records = stream::iter(vec![
            OutputRecord::response("a"),
            OutputRecord::error("boom"),
            OutputRecord::response("late"),
        ])
        .boxed();
        let lines = collect_lines(ndjson_body(records, DEFAULT_BUFFER)).await;
        assert_eq!(lines, vec!["{\"response\":\"a\"}\n", "{\"error\":\"boom\"}\n"]);
    }

    #[tokio::test]
    async fn empty_stream_closes_body() {
        let lines = collect_lines(ndjson_body(stream::empty().boxed(), 4)).await;
        assert!(lines.is_empty());
    }
}
