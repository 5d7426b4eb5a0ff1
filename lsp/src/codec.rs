//! Message transport for the editor channel.
//!
//! Each message is `Content-Length: N\r\n\r\n` followed by N bytes of UTF-8
//! JSON. [`MessageReader`] hands the server classified editor messages and
//! [`MessageWriter`] sends its responses and notifications. Both also expose
//! the raw body layer for whoever drives the server from the editor side.

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::protocol::{self, Incoming, Outgoing};

/// Full-text sync sends whole documents on every keystroke batch, so the
/// cap is sized for large bundles.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

const CONTENT_LENGTH: &str = "content-length";
const CONTENT_TYPE: &str = "content-type";

/// Header block of one message.
#[derive(Debug, Default)]
struct Header {
    content_length: Option<usize>,
}

impl Header {
    /// Fold one `Name: value` line into the header.
    fn apply(&mut self, line: &str) -> Result<()> {
        let Some((name, value)) = line.split_once(':') else {
            bail!("malformed header line {line:?}");
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            CONTENT_LENGTH => {
                let length: usize = value
                    .parse()
                    .with_context(|| format!("invalid Content-Length {value:?}"))?;
                if length > MAX_BODY_BYTES {
                    bail!("Content-Length {length} exceeds maximum {MAX_BODY_BYTES}");
                }
                self.content_length = Some(length);
            }
            CONTENT_TYPE => check_charset(value)?,
            other => tracing::trace!("Ignoring header {other}"),
        }
        Ok(())
    }
}

/// Bodies are always decoded as UTF-8; any other declared charset is refused.
fn check_charset(content_type: &str) -> Result<()> {
    let charset = content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"'));

    match charset {
        None => Ok(()),
        Some(charset) if charset.eq_ignore_ascii_case("utf-8") || charset.eq_ignore_ascii_case("utf8") => {
            Ok(())
        }
        Some(charset) => bail!("unsupported charset {charset:?}"),
    }
}

pub struct MessageReader<R> {
    reader: BufReader<R>,
    line: String,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line: String::new(),
        }
    }

    /// Next message body, unparsed.
    ///
    /// `Ok(None)` when the channel closes between messages.
    pub async fn read_body(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(length) = self.read_header().await? else {
            return Ok(None);
        };

        let mut body = vec![0u8; length];
        self.reader
            .read_exact(&mut body)
            .await
            .context("reading message body")?;
        Ok(Some(body))
    }

    /// Next request, notification or response from the editor.
    ///
    /// Well-formed JSON that is none of those is skipped.
    pub(crate) async fn read_message(&mut self) -> Result<Option<Incoming>> {
        while let Some(body) = self.read_body().await? {
            let value: Value =
                serde_json::from_slice(&body).context("parsing JSON-RPC message")?;
            if let Some(incoming) = protocol::parse_incoming(&value) {
                return Ok(Some(incoming));
            }
            tracing::debug!("Skipping JSON-RPC message with neither method nor result");
        }
        Ok(None)
    }

    async fn read_header(&mut self) -> Result<Option<usize>> {
        let mut header = Header::default();
        let mut lines = 0usize;

        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .await
                .context("reading header line")?;
            if read == 0 {
                if lines == 0 {
                    return Ok(None);
                }
                bail!("channel closed inside a message header");
            }
            lines += 1;

            let line = self.line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                break;
            }
            header.apply(line)?;
        }

        header
            .content_length
            .map(Some)
            .context("message without Content-Length header")
    }
}

pub struct MessageWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Frame and send an already-serialized body.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<()> {
        let mut frame = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
        frame.extend_from_slice(body);
        self.writer
            .write_all(&frame)
            .await
            .context("writing message")?;
        self.writer.flush().await.context("flushing message")
    }

    pub(crate) async fn write_message(&mut self, message: &Outgoing) -> Result<()> {
        let body = serde_json::to_vec(message).context("serializing JSON-RPC message")?;
        self.write_body(&body).await
    }
}
