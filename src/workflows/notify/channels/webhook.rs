use std::sync::Arc;

use super::{ChannelError, NotificationChannel};
use crate::workflows::transport::{redact, HttpTransport};

/// Chat webhook that accepts a form-encoded `content` field.
pub struct WebhookChannel {
    name: String,
    url: String,
    transport: Arc<HttpTransport>,
}

impl WebhookChannel {
    pub fn new(name: impl Into<String>, url: impl Into<String>, transport: Arc<HttpTransport>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            transport,
        }
    }
}

impl std::fmt::Debug for WebhookChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookChannel")
            .field("name", &self.name)
            .field("target", &redact(&self.url))
            .finish_non_exhaustive()
    }
}

impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, message: &str) -> Result<(), ChannelError> {
        self.transport
            .post_form(&self.url, &[("content", message)])?;
        Ok(())
    }
}
