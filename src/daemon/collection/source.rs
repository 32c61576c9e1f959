//! Focus events coming from the browser.
//!
//! The browser starts the tracker as a native messaging host: every message is a 32-bit
//! native-endian length followed by that many bytes of JSON. A JSON-lines reader exists for
//! driving the tracker by hand.

use anyhow::{anyhow, Result};
use futures::{stream::BoxStream, StreamExt};
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LengthDelimitedCodec, LinesCodec};

use super::tracker::FocusEvent;

/// Upper bound the browser places on a single message sent to a native host.
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

pub type FocusStream = BoxStream<'static, Result<FocusEvent>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceFormat {
    NativeMessaging,
    JsonLines,
}

pub fn focus_events(reader: impl AsyncRead + Send + 'static, format: SourceFormat) -> FocusStream {
    match format {
        SourceFormat::NativeMessaging => native_messaging_events(reader),
        SourceFormat::JsonLines => json_lines_events(reader),
    }
}

pub fn native_messaging_events(reader: impl AsyncRead + Send + 'static) -> FocusStream {
    let codec = LengthDelimitedCodec::builder()
        .length_field_length(4)
        .native_endian()
        .max_frame_length(MAX_MESSAGE_BYTES)
        .new_codec();

    FramedRead::new(reader, codec)
        .map(|frame| parse_event(&frame?))
        .boxed()
}

pub fn json_lines_events(reader: impl AsyncRead + Send + 'static) -> FocusStream {
    FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_MESSAGE_BYTES))
        .filter(|line| futures::future::ready(!matches!(line, Ok(line) if line.trim().is_empty())))
        .map(|line| parse_event(line?.as_bytes()))
        .boxed()
}

fn parse_event(message: &[u8]) -> Result<FocusEvent> {
    serde_json::from_slice(message).map_err(|e| {
        anyhow!(
            "Malformed focus message {:?}: {e}",
            String::from_utf8_lossy(message)
        )
    })
}
