use std::sync::Arc;

use super::runner::{AlertRoute, MessageTemplate};
use crate::config::AppConfig;
use crate::workflows::notify::{
    FileHistoryStore, HistoryStore, NotificationGate, SpeakerChannel, WebhookChannel,
};
use crate::workflows::transport::HttpTransport;

pub const PLAIN_WEBHOOK: &str = "webhook";
pub const DEDUP_WEBHOOK: &str = "webhook_dedup";
pub const SPEAKER: &str = "speaker";

/// Alert routes for every channel that has an endpoint configured.
pub fn alert_routes(config: &AppConfig, transport: Arc<HttpTransport>) -> Vec<AlertRoute> {
    let mut routes = Vec::new();

    if let Some(url) = &config.webhook.plain_url {
        routes.push(AlertRoute::plain(
            Box::new(WebhookChannel::new(PLAIN_WEBHOOK, url.clone(), transport.clone())),
            MessageTemplate::Record,
        ));
    }

    if let Some(url) = &config.webhook.dedup_url {
        let store: Box<dyn HistoryStore> =
            Box::new(FileHistoryStore::for_channel(&config.history_dir, DEDUP_WEBHOOK));
        routes.push(AlertRoute::deduplicated(
            Box::new(WebhookChannel::new(DEDUP_WEBHOOK, url.clone(), transport.clone())),
            NotificationGate::new(DEDUP_WEBHOOK, store, config.webhook.window, config.webhook.digest),
            MessageTemplate::Record,
        ));
    }

    if let Some(url) = &config.speaker.bridge_url {
        let store: Box<dyn HistoryStore> =
            Box::new(FileHistoryStore::for_channel(&config.history_dir, SPEAKER));
        routes.push(AlertRoute::deduplicated(
            Box::new(SpeakerChannel::new(
                SPEAKER,
                url.clone(),
                config.speaker.device.clone(),
                config.speaker.volume,
                transport,
            )),
            NotificationGate::new(SPEAKER, store, config.speaker.window, config.speaker.digest),
            MessageTemplate::Fixed(config.speaker.phrase.clone()),
        ));
    }

    routes
}
