mod speaker;
mod webhook;

use std::fmt::Debug;

use crate::workflows::transport::TransportError;

pub use speaker::SpeakerChannel;
pub use webhook::WebhookChannel;

/// A destination an alert message can be delivered to.
pub trait NotificationChannel: Debug + Send + Sync {
    fn name(&self) -> &str;
    fn send(&self, message: &str) -> Result<(), ChannelError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("channel unavailable: {0}")]
    Unavailable(String),
}
