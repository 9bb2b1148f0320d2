use std::sync::Arc;

use serde::Serialize;

use super::{ChannelError, NotificationChannel};
use crate::workflows::transport::HttpTransport;

/// Smart-speaker announcements through an HTTP text-to-speech bridge.
///
/// The bridge owns device discovery and playback; this channel only posts
/// the phrase, the target device and the playback volume.
#[derive(Debug)]
pub struct SpeakerChannel {
    name: String,
    bridge_url: String,
    device: Option<String>,
    volume: f32,
    transport: Arc<HttpTransport>,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<&'a str>,
    volume: f32,
    text: &'a str,
}

impl SpeakerChannel {
    pub fn new(
        name: impl Into<String>,
        bridge_url: impl Into<String>,
        device: Option<String>,
        volume: f32,
        transport: Arc<HttpTransport>,
    ) -> Self {
        Self {
            name: name.into(),
            bridge_url: bridge_url.into(),
            device,
            volume: volume.clamp(0.0, 1.0),
            transport,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn request<'a>(&'a self, message: &'a str) -> SpeechRequest<'a> {
        SpeechRequest {
            device: self.device.as_deref(),
            volume: self.volume,
            text: message,
        }
    }
}

impl NotificationChannel for SpeakerChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, message: &str) -> Result<(), ChannelError> {
        if message.trim().is_empty() {
            return Err(ChannelError::Unavailable(
                "refusing to announce an empty phrase".to_string(),
            ));
        }
        self.transport
            .post_json(&self.bridge_url, &self.request(message))?;
        Ok(())
    }
}
