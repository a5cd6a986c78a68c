//! Fragment framing and decoding.
//!
//! Both backends are reduced to [`OutputRecord`]s here: Ollama's NDJSON body
//! is re-framed into lines by [`LineBuffer`] and decoded by
//! [`decode_fragment`]; CLI output lines go through [`cli_line_record`].
//! [`encode_record`] produces the outward wire unit. Nothing in this module
//! rewrites content, and every function preserves arrival order.

use bytes::{Bytes, BytesMut};
use serde_json::{Map, Value};
use tracing::trace;

use crate::OutputRecord;

/// Longest line [`LineBuffer`] will hold before discarding it.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// Re-frames an arbitrary chunked byte stream into `\n`-terminated lines.
///
/// Partial lines are held across chunk boundaries. Each byte is scanned for
/// a newline once. A line longer than the limit is dropped whole, like any
/// other malformed fragment.
#[derive(Debug)]
pub struct LineBuffer {
    pending: BytesMut,
    /// Prefix of `pending` already known to hold no `\n`.
    scanned: usize,
    max_line: usize,
    /// Inside an oversized line; bytes up to the next `\n` are dropped.
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_line: usize) -> Self {
        Self {
            pending: BytesMut::new(),
            scanned: 0,
            max_line: max_line.max(1),
            discarding: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Next complete line, without its `\n` (and `\r`, if any).
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            let Some(offset) = self.pending[self.scanned..].iter().position(|b| *b == b'\n')
            else {
                self.scanned = self.pending.len();
                if self.scanned > self.max_line {
                    trace!(len = self.scanned, "dropping oversized line");
                    self.pending.clear();
                    self.scanned = 0;
                    self.discarding = true;
                }
                return None;
            };
            let pos = self.scanned + offset;
            let mut line = self.pending.split_to(pos + 1);
            self.scanned = 0;
            if std::mem::take(&mut self.discarding) || pos > self.max_line {
                trace!(len = pos, "dropping oversized line");
                continue;
            }
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }
            return Some(String::from_utf8_lossy(&line).into_owned());
        }
    }

    /// Drain an unterminated trailing line once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        if std::mem::take(&mut self.discarding) || self.pending.is_empty() {
            self.pending.clear();
            return None;
        }
        let rest = self.pending.split();
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Outcome of decoding one Ollama body line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Blank keep-alive, a partial write, or anything that is not a JSON
    /// object. Dropped without surfacing.
    Noise,
    /// A well-formed fragment. `text` is `None` when it carried nothing to
    /// emit (e.g. the final stats object).
    Fragment { text: Option<String>, done: bool },
}

pub fn decode_fragment(line: &str) -> Decoded {
    let line = line.trim();
    if line.is_empty() {
        return Decoded::Noise;
    }
    let value = match serde_json::from_str::<Value>(line) {
        Ok(value) => value,
        Err(e) => {
            trace!(error = %e, len = line.len(), "dropping unparseable fragment");
            return Decoded::Noise;
        }
    };
    let Value::Object(fields) = value else {
        trace!("dropping non-object fragment");
        return Decoded::Noise;
    };
    Decoded::Fragment {
        text: fragment_text(&fields),
        done: fields.get("done").and_then(Value::as_bool).unwrap_or(false),
    }
}

/// `response` (generate endpoint) wins over `message.content` (chat
/// endpoint); empty strings count as absent.
fn fragment_text(fields: &Map<String, Value>) -> Option<String> {
    let non_empty = |v: &Value| v.as_str().filter(|s| !s.is_empty()).map(str::to_owned);

    if let Some(text) = fields.get("response").and_then(non_empty) {
        return Some(text);
    }
    fields
        .get("message")
        .and_then(Value::as_object)
        .and_then(|message| message.get("content"))
        .and_then(non_empty)
}

/// Non-empty CLI lines become response records; blank lines are skipped.
pub fn cli_line_record(line: String) -> Option<OutputRecord> {
    if line.is_empty() {
        None
    } else {
        Some(OutputRecord::Response(line))
    }
}

/// One JSON object followed by `\n`.
pub fn encode_record(record: &OutputRecord) -> Bytes {
    match serde_json::to_vec(record) {
        Ok(mut line) => {
            line.push(b'\n');
            Bytes::from(line)
        }
        // A two-variant enum of strings cannot fail to serialize.
        Err(_) => Bytes::from_static(b"{\"error\":\"record encoding failed\"}\n"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn line_buffer_joins_split_chunks() {
        let mut buf = LineBuffer::new();
        buf.push(b"{\"respo");
        assert_eq!(buf.next_line(), None);
        buf.push(b"nse\":\"a\"}\n{\"x\":1}\r\ntail");
        assert_eq!(buf.next_line().as_deref(), Some(r#"{"response":"a"}"#));
        assert_eq!(buf.next_line().as_deref(), Some(r#"{"x":1}"#));
        assert_eq!(buf.next_line(), None);
        assert_eq!(buf.finish().as_deref(), Some("tail"));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn line_buffer_keeps_multibyte_characters_intact_across_chunks() {
        let text = "{\"response\":\"héllo\"}\n".as_bytes();
        let (a, b) = text.split_at(15);
        let mut buf = LineBuffer::new();
        buf.push(a);
        buf.push(b);
        assert_eq!(buf.next_line().as_deref(), Some("{\"response\":\"héllo\"}"));
    }

    #[test]
    fn line_buffer_resumes_scan_across_many_small_chunks() {
        let line = format!("{{\"response\":\"{}\"}}", "x".repeat(4096));
        let mut buf = LineBuffer::new();
        for chunk in line.as_bytes().chunks(7) {
            buf.push(chunk);
            assert_eq!(buf.next_line(), None);
        }
        buf.push(b"\r\n{\"done\":true}\n");
        assert_eq!(buf.next_line(), Some(line));
        assert_eq!(buf.next_line().as_deref(), Some("{\"done\":true}"));
        assert_eq!(buf.next_line(), None);
    }

    #[test]
    fn line_buffer_drops_oversized_line_and_keeps_the_next() {
        let mut buf = LineBuffer::with_limit(16);
        buf.push(b"0123456789");
        assert_eq!(buf.next_line(), None);
        buf.push(b"0123456789");
        assert_eq!(buf.next_line(), None);
        buf.push(b"tail\nshort\n");
        assert_eq!(buf.next_line().as_deref(), Some("short"));
        assert_eq!(buf.next_line(), None);

        buf.push(b"this line is far too long\nok\n");
        assert_eq!(buf.next_line().as_deref(), Some("ok"));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn line_buffer_finish_discards_oversized_unterminated_line() {
        let mut buf = LineBuffer::with_limit(4);
        buf.push(b"abcdefgh");
        assert_eq!(buf.next_line(), None);
        buf.push(b"ij");
        assert_eq!(buf.finish(), None);
        buf.push(b"abc");
        assert_eq!(buf.finish().as_deref(), Some("abc"));
    }

    #[test]
    fn generate_fragment_yields_response_text() {
        assert_eq!(
            decode_fragment(r#"{"response":"a","done":false}"#),
            Decoded::Fragment { text: Some("a".into()), done: false }
        );
    }

    #[test]
    fn chat_fragment_yields_message_content() {
        assert_eq!(
            decode_fragment(r#"{"message":{"role":"assistant","content":"x"},"done":false}"#),
            Decoded::Fragment { text: Some("x".into()), done: false }
        );
    }

    #[test]
    fn empty_response_falls_through_to_message() {
        assert_eq!(
            decode_fragment(r#"{"response":"","message":{"content":"m"}}"#),
            Decoded::Fragment { text: Some("m".into()), done: false }
        );
    }

    #[test]
    fn done_fragment_without_content_still_terminates() {
        assert_eq!(
            decode_fragment(r#"{"response":"","done":true,"eval_count":12}"#),
            Decoded::Fragment { text: None, done: true }
        );
    }

    #[test]
    fn message_that_is_not_an_object_is_ignored() {
        assert_eq!(
            decode_fragment(r#"{"message":"plain","done":false}"#),
            Decoded::Fragment { text: None, done: false }
        );
    }

    #[test]
    fn malformed_and_non_object_lines_are_noise() {
        assert_eq!(decode_fragment("not json"), Decoded::Noise);
        assert_eq!(decode_fragment("{\"response\":"), Decoded::Noise);
        assert_eq!(decode_fragment("[1,2]"), Decoded::Noise);
        assert_eq!(decode_fragment("   "), Decoded::Noise);
    }

    #[test]
    fn blank_cli_lines_are_skipped() {
        assert_eq!(cli_line_record(String::new()), None);
        assert_eq!(
            cli_line_record("  indented".into()),
            Some(OutputRecord::response("  indented"))
        );
    }

    #[test]
    fn encoded_record_is_one_newline_terminated_json_object() {
        let bytes = encode_record(&OutputRecord::response("line\nbreak"));
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.matches('\n').count(), 1, "embedded newlines must be escaped");
        let parsed: OutputRecord = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(parsed, OutputRecord::response("line\nbreak"));
    }
}
