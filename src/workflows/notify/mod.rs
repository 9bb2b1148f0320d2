//! Deduplicated alert delivery.
//!
//! Each channel owns a [`NotificationGate`] configured with its own history
//! store, retention window and digest algorithm.

pub mod channels;
mod digest;
pub mod domain;
mod gate;
mod history;

pub use channels::{ChannelError, NotificationChannel, SpeakerChannel, WebhookChannel};
pub use digest::{DigestAlgorithm, UnknownDigest};
pub use domain::{DispatchOutcome, NotificationEntry};
pub use gate::NotificationGate;
pub use history::{FileHistoryStore, HistoryError, HistoryStore, InMemoryHistoryStore};
