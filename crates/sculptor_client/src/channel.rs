//! Progress channel consumer.
//!
//! One WebSocket per engine instance, shared by every entity the engine
//! tracks. Frames are demultiplexed by entity key downstream; this module
//! only turns raw frames into validated [`ProgressUpdate`]s and drops
//! everything else. There is no reconnect loop: a closed channel stays
//! closed until the owning view remounts, and the fallback poll carries the
//! display in the meantime.

use engine_logging::{engine_debug, engine_info, engine_trace, engine_warn};
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::dto::ChannelMessage;

/// A validated progress event, ready for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub key: String,
    pub percent: u8,
    pub status_text: String,
}

/// Failure to establish the channel. Never fatal to the engine: it falls
/// back to snapshot polling alone.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel connect failed: {0}")]
    Connect(String),
}

/// Source of progress updates for the engine loop.
///
/// `next_update` resolves with `None` once the channel is closed or broken;
/// the implementation must never return malformed data.
#[async_trait::async_trait]
pub trait ProgressFeed: Send {
    async fn next_update(&mut self) -> Option<ProgressUpdate>;
}

/// [`ProgressFeed`] over the backend's `/ws/logs` WebSocket.
pub struct WsProgressFeed {
    stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl WsProgressFeed {
    pub async fn connect(url: &str) -> Result<Self, ChannelError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|err| ChannelError::Connect(err.to_string()))?;
        engine_info!("progress channel connected: {url}");
        Ok(Self { stream })
    }
}

#[async_trait::async_trait]
impl ProgressFeed for WsProgressFeed {
    async fn next_update(&mut self) -> Option<ProgressUpdate> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if let Some(update) = decode_frame(&text) {
                        return Some(update);
                    }
                }
                Ok(Message::Binary(_)) => {
                    engine_trace!("ignoring binary channel frame");
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Handled by tungstenite itself.
                }
                Ok(Message::Close(frame)) => {
                    engine_info!("progress channel closed: {frame:?}");
                    return None;
                }
                Ok(Message::Frame(_)) => {}
                Err(err) => {
                    engine_warn!("progress channel receive error: {err}");
                    return None;
                }
            }
        }
        None
    }
}

/// Parses one text frame; `None` for anything that is not a well-formed
/// progress event (log lines, malformed JSON, out-of-range percents).
pub(crate) fn decode_frame(text: &str) -> Option<ProgressUpdate> {
    match serde_json::from_str::<ChannelMessage>(text) {
        Ok(ChannelMessage::Progress(frame)) => {
            if !(0..=100).contains(&frame.percent) {
                engine_warn!(
                    "discarding progress frame for '{}' with percent {}",
                    frame.alias,
                    frame.percent
                );
                return None;
            }
            Some(ProgressUpdate {
                key: frame.alias,
                percent: frame.percent as u8,
                status_text: frame.status,
            })
        }
        Ok(ChannelMessage::Log(frame)) => {
            // The backend shares the socket with its log stream.
            engine_trace!("backend log [{}]: {}", frame.level, frame.message);
            None
        }
        Err(err) => {
            engine_debug!("discarding malformed channel frame: {err}");
            None
        }
    }
}
