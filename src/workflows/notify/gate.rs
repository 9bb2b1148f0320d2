use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use super::channels::ChannelError;
use super::digest::DigestAlgorithm;
use super::domain::{DispatchOutcome, NotificationEntry};
use super::history::{HistoryError, HistoryStore};

/// Per-channel deduplication of alert messages.
///
/// A message is suppressed while an entry with the same digest is younger
/// than the retention window. Every call that loads the history writes the
/// pruned history back, so expired entries never accumulate. Unreadable
/// history is treated as empty but never overwritten, so a transient read
/// error costs at most a duplicate alert.
#[derive(Debug)]
pub struct NotificationGate<S> {
    channel: String,
    store: S,
    retention: Duration,
    digest: DigestAlgorithm,
}

impl<S: HistoryStore> NotificationGate<S> {
    pub fn new(
        channel: impl Into<String>,
        store: S,
        retention: Duration,
        digest: DigestAlgorithm,
    ) -> Self {
        Self {
            channel: channel.into(),
            store,
            retention,
            digest,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn hash(&self, message: &str) -> String {
        self.digest.digest(message)
    }

    pub fn should_suppress(&self, message: &str) -> bool {
        self.should_suppress_at(message, Utc::now())
    }

    pub fn should_suppress_at(&self, message: &str, now: DateTime<Utc>) -> bool {
        let history = match self.load_pruned(now) {
            Ok(history) => {
                if let Err(err) = self.store.save(&history) {
                    warn!(channel = %self.channel, error = %err, "failed to persist pruned history");
                }
                history
            }
            Err(err) => {
                warn!(
                    channel = %self.channel,
                    error = %err,
                    "notification history unreadable, treating it as empty"
                );
                Vec::new()
            }
        };

        let hash = self.hash(message);
        match history.iter().find(|entry| entry.hash == hash) {
            Some(entry) => {
                let elapsed = now - entry.timestamp;
                info!(
                    channel = %self.channel,
                    hours = elapsed.num_hours(),
                    minutes = elapsed.num_minutes() % 60,
                    "identical alert already sent"
                );
                true
            }
            None => false,
        }
    }

    pub fn record_success(&self, message: &str) -> Result<(), HistoryError> {
        self.record_success_at(message, Utc::now())
    }

    pub fn record_success_at(&self, message: &str, now: DateTime<Utc>) -> Result<(), HistoryError> {
        let mut history = self.load_pruned(now)?;
        history.push(NotificationEntry {
            message: message.to_string(),
            timestamp: now,
            hash: self.hash(message),
        });
        self.store.save(&history)
    }

    pub fn dispatch_with_dedup<F>(&self, message: &str, send: F) -> DispatchOutcome
    where
        F: FnOnce(&str) -> Result<(), ChannelError>,
    {
        if self.should_suppress(message) {
            return DispatchOutcome::Suppressed;
        }
        self.finish_dispatch(message, send, Utc::now)
    }

    pub fn dispatch_with_dedup_at<F>(
        &self,
        message: &str,
        send: F,
        now: DateTime<Utc>,
    ) -> DispatchOutcome
    where
        F: FnOnce(&str) -> Result<(), ChannelError>,
    {
        if self.should_suppress_at(message, now) {
            return DispatchOutcome::Suppressed;
        }
        self.finish_dispatch(message, send, || now)
    }

    fn finish_dispatch<F, C>(&self, message: &str, send: F, clock: C) -> DispatchOutcome
    where
        F: FnOnce(&str) -> Result<(), ChannelError>,
        C: FnOnce() -> DateTime<Utc>,
    {
        if let Err(err) = send(message) {
            warn!(channel = %self.channel, error = %err, "alert delivery failed");
            return DispatchOutcome::SendFailed(err);
        }

        if let Err(err) = self.record_success_at(message, clock()) {
            warn!(
                channel = %self.channel,
                error = %err,
                "alert sent but history could not be recorded"
            );
        }
        info!(channel = %self.channel, "alert sent");
        DispatchOutcome::Sent
    }

    /// History younger than the retention window.
    ///
    /// A corrupt file counts as empty and may be overwritten. Any other load
    /// error is returned so callers leave the stored file alone.
    fn load_pruned(&self, now: DateTime<Utc>) -> Result<Vec<NotificationEntry>, HistoryError> {
        let cutoff = now
            .checked_sub_signed(self.retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let entries = match self.store.load() {
            Ok(entries) => entries,
            Err(err @ HistoryError::Corrupt { .. }) => {
                warn!(
                    channel = %self.channel,
                    error = %err,
                    "notification history corrupt, starting over"
                );
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        Ok(entries
            .into_iter()
            .filter(|entry| entry.timestamp > cutoff)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::notify::history::InMemoryHistoryStore;
    use chrono::TimeZone;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 24, 21, 0, 0).unwrap()
    }

    fn gate(entries: Vec<NotificationEntry>) -> NotificationGate<InMemoryHistoryStore> {
        NotificationGate::new(
            "webhook",
            InMemoryHistoryStore::with_entries(entries),
            Duration::hours(3),
            DigestAlgorithm::Sha256,
        )
    }

    fn entry_at(message: &str, timestamp: DateTime<Utc>) -> NotificationEntry {
        NotificationEntry {
            message: message.to_string(),
            timestamp,
            hash: DigestAlgorithm::Sha256.digest(message),
        }
    }

    #[test]
    fn second_dispatch_within_window_is_suppressed() {
        let gate = gate(Vec::new());
        let calls = Cell::new(0);
        let send = |_: &str| {
            calls.set(calls.get() + 1);
            Ok(())
        };

        let first = gate.dispatch_with_dedup_at("seat open", send, now());
        let second = gate.dispatch_with_dedup_at("seat open", send, now() + Duration::minutes(30));

        assert!(matches!(first, DispatchOutcome::Sent));
        assert!(matches!(second, DispatchOutcome::Suppressed));
        assert_eq!(calls.get(), 1);
        let entries = gate.store().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "seat open");
        assert_eq!(entries[0].timestamp, now());
    }

    #[test]
    fn window_boundary_is_exclusive_of_expired_entries() {
        let window = Duration::hours(3);
        let expired = gate(vec![entry_at(
            "seat open",
            now() - window - Duration::seconds(1),
        )]);
        assert!(!expired.should_suppress_at("seat open", now()));

        let fresh = gate(vec![entry_at(
            "seat open",
            now() - window + Duration::seconds(1),
        )]);
        assert!(fresh.should_suppress_at("seat open", now()));
    }

    #[test]
    fn failed_send_is_not_recorded() {
        let gate = gate(Vec::new());

        let first = gate.dispatch_with_dedup_at(
            "seat open",
            |_| Err(ChannelError::Unavailable("offline".to_string())),
            now(),
        );
        assert!(matches!(first, DispatchOutcome::SendFailed(_)));
        assert!(gate.store().entries().is_empty());

        let attempted = Cell::new(false);
        let second = gate.dispatch_with_dedup_at(
            "seat open",
            |_| {
                attempted.set(true);
                Ok(())
            },
            now() + Duration::minutes(1),
        );
        assert!(attempted.get());
        assert!(matches!(second, DispatchOutcome::Sent));
    }

    #[test]
    fn suppression_check_persists_pruned_history() {
        let stale = entry_at("old alert", now() - Duration::hours(5));
        let live = entry_at("seat open", now() - Duration::hours(1));
        let gate = gate(vec![stale, live.clone()]);

        assert!(gate.should_suppress_at("seat open", now()));
        assert_eq!(gate.store().entries(), vec![live]);
    }

    #[test]
    fn different_messages_do_not_suppress_each_other() {
        let gate = gate(vec![entry_at("seat open 2/4", now() - Duration::minutes(5))]);
        assert!(!gate.should_suppress_at("seat open 2/5", now()));
    }

    #[test]
    fn digest_choice_is_per_gate() {
        let md5_gate = NotificationGate::new(
            "speaker",
            InMemoryHistoryStore::default(),
            Duration::hours(12),
            DigestAlgorithm::Md5,
        );
        md5_gate
            .record_success_at("空席があります。", now())
            .expect("record");
        let entries = md5_gate.store().entries();
        assert_eq!(entries[0].hash, DigestAlgorithm::Md5.digest("空席があります。"));
        assert!(md5_gate.should_suppress_at("空席があります。", now() + Duration::hours(11)));
        assert!(!md5_gate.should_suppress_at("空席があります。", now() + Duration::hours(13)));
    }

    #[derive(Debug)]
    struct BrokenStore;

    impl HistoryStore for BrokenStore {
        fn load(&self) -> Result<Vec<NotificationEntry>, HistoryError> {
            Err(HistoryError::Unavailable("disk on fire".to_string()))
        }

        fn save(&self, _entries: &[NotificationEntry]) -> Result<(), HistoryError> {
            Err(HistoryError::Unavailable("disk on fire".to_string()))
        }
    }

    #[test]
    fn unreadable_history_fails_open() {
        let gate = NotificationGate::new(
            "webhook",
            BrokenStore,
            Duration::hours(3),
            DigestAlgorithm::Sha256,
        );

        assert!(!gate.should_suppress_at("seat open", now()));
        let outcome = gate.dispatch_with_dedup_at("seat open", |_| Ok(()), now());
        assert!(outcome.is_sent());
    }

    #[derive(Debug, Default)]
    struct UnreadableStore {
        saves: AtomicUsize,
    }

    impl HistoryStore for UnreadableStore {
        fn load(&self) -> Result<Vec<NotificationEntry>, HistoryError> {
            Err(HistoryError::Unavailable("permission denied".to_string()))
        }

        fn save(&self, _entries: &[NotificationEntry]) -> Result<(), HistoryError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn unreadable_history_is_never_overwritten() {
        let gate = NotificationGate::new(
            "webhook",
            UnreadableStore::default(),
            Duration::hours(3),
            DigestAlgorithm::Sha256,
        );

        assert!(!gate.should_suppress_at("seat open", now()));
        assert!(gate.dispatch_with_dedup_at("seat open", |_| Ok(()), now()).is_sent());
        assert!(gate.record_success_at("seat open", now()).is_err());
        assert_eq!(gate.store().saves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn corrupt_history_is_replaced() {
        #[derive(Debug, Default)]
        struct CorruptStore {
            saved: InMemoryHistoryStore,
        }

        impl HistoryStore for CorruptStore {
            fn load(&self) -> Result<Vec<NotificationEntry>, HistoryError> {
                let source = serde_json::from_str::<Vec<NotificationEntry>>("{")
                    .expect_err("truncated JSON");
                Err(HistoryError::Corrupt {
                    path: "history.json".into(),
                    source,
                })
            }

            fn save(&self, entries: &[NotificationEntry]) -> Result<(), HistoryError> {
                self.saved.save(entries)
            }
        }

        let gate = NotificationGate::new(
            "webhook",
            CorruptStore::default(),
            Duration::hours(3),
            DigestAlgorithm::Sha256,
        );
        assert!(gate.dispatch_with_dedup_at("seat open", |_| Ok(()), now()).is_sent());
        assert_eq!(gate.store().saved.entries().len(), 1);
    }

    #[test]
    fn oversized_retention_keeps_everything_without_panicking() {
        let ancient = entry_at("seat open", Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap());
        let gate = NotificationGate::new(
            "webhook",
            InMemoryHistoryStore::with_entries(vec![ancient]),
            Duration::hours(4_000_000_000),
            DigestAlgorithm::Sha256,
        );

        assert_eq!(gate.retention(), Duration::hours(4_000_000_000));
        assert!(gate.should_suppress_at("seat open", now()));
        gate.record_success_at("other", now()).expect("record");
        assert_eq!(gate.store().entries().len(), 2);
    }
}
