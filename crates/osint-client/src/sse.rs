//! Consumes one of the dispatcher's `text/event-stream` responses: a
//! buffering loop that accumulates bytes, splits on a blank line, and pulls
//! the `data:` lines out. Every data frame is one JSON value, and a bare
//! `: keepalive` comment line (no `data:` at all) carries nothing to yield.

use async_stream::try_stream;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio_stream::Stream;

use crate::error::OsintClientError;

/// Parses one buffered SSE event block (everything before a `\n\n`) into
/// its `data:` payload, if it has one. A keepalive block (just a `:
/// keepalive` comment) has none.
fn extract_data(block: &str) -> Option<String> {
    let mut data = String::new();
    for line in block.lines() {
        if let Some(value) = line.strip_prefix("data: ") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(value);
        }
    }
    if data.is_empty() {
        None
    } else {
        Some(data)
    }
}

/// Turns a streaming HTTP response into a stream of decoded events,
/// skipping keepalive frames entirely.
pub fn decode_events<T>(response: reqwest::Response) -> impl Stream<Item = Result<T, OsintClientError>>
where
    T: DeserializeOwned,
{
    try_stream! {
        let mut byte_stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(end) = buffer.find("\n\n") {
                let block = buffer[..end].to_string();
                buffer.drain(..end + 2);

                if let Some(data) = extract_data(&block) {
                    let value: T = serde_json::from_str(&data)?;
                    yield value;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_data_reads_the_payload_line() {
        let block = "event: message\ndata: {\"ok\":true}";
        assert_eq!(extract_data(block), Some("{\"ok\":true}".to_string()));
    }

    #[test]
    fn extract_data_ignores_keepalive_comments() {
        assert_eq!(extract_data(": keepalive"), None);
    }
}
