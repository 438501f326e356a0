// Splits long replies into transport-sized chunks and delivers them in order.
//
// Discord rejects messages over its payload ceiling (2000 characters on the
// standard tier), so a long completion answer has to go out as several
// messages. Ordering matters: the chunks reconstruct one reply in the channel
// transcript, so each send waits for the previous one and a failure stops the
// rest rather than letting later chunks jump the queue.

use async_trait::async_trait;
use std::error::Error;
use thiserror::Error as ThisError;

/// Destination for reply chunks. The Discord adapter binds this to a channel;
/// tests record what was sent.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    async fn send(&self, chunk: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// A chunk failed to send. Everything before `index` was delivered; nothing
/// after it was attempted.
#[derive(Debug, ThisError)]
#[error("delivery failed at chunk {index} of {total}: {reason}")]
pub struct DeliveryError {
    pub index: usize,
    pub total: usize,
    pub reason: String,
}

/// Splits `text` into contiguous segments of at most `max_len` characters.
///
/// Segments preserve the original order and concatenate back to `text`
/// exactly. Boundaries fall on character boundaries, never inside a UTF-8
/// code point. Empty input yields no chunks; an input length that divides
/// `max_len` evenly yields only full chunks, with no trailing empty one.
///
/// `max_len` must be positive; the configuration layer validates this before
/// a chunker is ever built.
pub fn split(text: &str, max_len: usize) -> Vec<String> {
    assert!(max_len > 0, "chunk length must be positive");

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        // Byte offset just past the first `max_len` characters, or the whole
        // remainder if fewer are left.
        let split_at = remaining
            .char_indices()
            .nth(max_len)
            .map(|(offset, _)| offset)
            .unwrap_or(remaining.len());

        chunks.push(remaining[..split_at].to_string());
        remaining = &remaining[split_at..];
    }

    chunks
}

/// Sends `chunks` through `sink` strictly in order, each send starting only
/// after the previous one completed.
///
/// Stops at the first failure and reports which chunk failed; the remaining
/// chunks are not sent. Returns the number of chunks delivered.
pub async fn deliver(chunks: &[String], sink: &dyn ChunkSink) -> Result<usize, DeliveryError> {
    let total = chunks.len();

    for (index, chunk) in chunks.iter().enumerate() {
        sink.send(chunk).await.map_err(|err| DeliveryError {
            index,
            total,
            reason: err.to_string(),
        })?;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_split_empty_input_yields_no_chunks() {
        assert!(split("", 2000).is_empty());
    }

    #[test]
    fn test_split_short_input_is_one_chunk() {
        assert_eq!(split("hello", 2000), vec!["hello"]);
    }

    #[test]
    fn test_split_with_remainder() {
        assert_eq!(split("abcdefg", 3), vec!["abc", "def", "g"]);
    }

    #[test]
    fn test_split_exact_multiple_has_no_trailing_empty_chunk() {
        assert_eq!(split("abcdef", 3), vec!["abc", "def"]);
    }

    #[test]
    fn test_split_concatenation_reproduces_input() {
        let inputs = [
            "a".repeat(4999),
            "short".to_string(),
            "x".repeat(6000),
            "newlines\nand spaces included\n".repeat(100),
        ];

        for input in &inputs {
            for max_len in [1, 3, 2000] {
                let chunks = split(input, max_len);
                assert_eq!(chunks.concat(), *input);
                assert!(chunks.iter().all(|c| c.chars().count() <= max_len));
                // Only the last chunk may run short.
                for chunk in chunks.iter().rev().skip(1) {
                    assert_eq!(chunk.chars().count(), max_len);
                }
            }
        }
    }

    #[test]
    fn test_split_counts_characters_not_bytes() {
        // Each of these is multiple bytes in UTF-8.
        let text = "héllö wörld ✂️";
        let chunks = split(text, 4);

        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
    }

    /// Records sent chunks; fails the send at `fail_at` if set.
    struct RecordingSink {
        sent: Mutex<Vec<String>>,
        fail_at: Option<usize>,
    }

    impl RecordingSink {
        fn new(fail_at: Option<usize>) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_at,
            }
        }
    }

    #[async_trait]
    impl ChunkSink for RecordingSink {
        async fn send(&self, chunk: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_at == Some(sent.len()) {
                return Err("send rejected".into());
            }
            sent.push(chunk.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_deliver_sends_all_chunks_in_order() {
        let sink = RecordingSink::new(None);
        let chunks = vec!["one".to_string(), "two".to_string(), "three".to_string()];

        let sent = deliver(&chunks, &sink).await.unwrap();

        assert_eq!(sent, 3);
        assert_eq!(*sink.sent.lock().unwrap(), chunks);
    }

    #[tokio::test]
    async fn test_deliver_nothing_for_no_chunks() {
        let sink = RecordingSink::new(None);
        assert_eq!(deliver(&[], &sink).await.unwrap(), 0);
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deliver_stops_at_first_failure_and_reports_index() {
        let sink = RecordingSink::new(Some(1));
        let chunks = vec!["one".to_string(), "two".to_string(), "three".to_string()];

        let err = deliver(&chunks, &sink).await.unwrap_err();

        assert_eq!(err.index, 1);
        assert_eq!(err.total, 3);
        // The first chunk went out; nothing after the failure did.
        assert_eq!(*sink.sent.lock().unwrap(), vec!["one".to_string()]);
    }
}
