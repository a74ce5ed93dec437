//! The Notification Scheduler engine: one polling loop
//! shared by all four jobs (`tokio::time::interval` raced against a
//! `watch::Receiver<bool>` shutdown signal) but with no
//! `mark_missed_on_startup` pass, since these four jobs are fixed and
//! phrased against "now" rather than a persisted `next_run`.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use waypoint_core::transport::TransportSink;
use waypoint_store::Store;

use crate::bucket::TokenBucket;
use crate::jobs::{collect_event_reminders, collect_goal_deadlines, collect_motivation, collect_step_reminders, PendingNotification};

const TICK_INTERVAL_SECS: u64 = 60;

pub struct NotificationEngine {
    store: Arc<dyn Store>,
    transport: Arc<dyn TransportSink>,
    bucket: TokenBucket,
    queue: VecDeque<PendingNotification>,
}

impl NotificationEngine {
    pub fn new(store: Arc<dyn Store>, transport: Arc<dyn TransportSink>, rate_per_s: u32) -> Self {
        Self {
            store,
            transport,
            bucket: TokenBucket::new(rate_per_s),
            queue: VecDeque::new(),
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("notification engine started");
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(TICK_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("notification engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Runs the four jobs in a fixed order (not four independent tasks, so
    /// their relative tick order is deterministic), enqueues whatever each
    /// one decides to fire, then drains the queue under the rate limiter.
    async fn tick(&mut self) {
        let now = Utc::now();

        self.queue.extend(collect_event_reminders(self.store.as_ref(), now));
        self.queue.extend(collect_goal_deadlines(self.store.as_ref(), now));
        self.queue.extend(collect_step_reminders(self.store.as_ref(), now));
        self.queue.extend(collect_motivation(self.store.as_ref(), now));

        self.drain_queue().await;
    }

    async fn drain_queue(&mut self) {
        while let Some(pending) = self.queue.front() {
            if !self.bucket.try_acquire() {
                let deferred = self.queue.len();
                warn!(deferred, "notification engine: rate limit reached, deferring to next tick");
                break;
            }
            let pending = self.queue.pop_front().expect("front just checked Some");
            if let Err(e) = self
                .transport
                .send(&pending.chat_id, &pending.text, None)
                .await
            {
                error!(user_id = %pending.user_id, "notification send failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use waypoint_core::transport::{Button, TransportError};
    use waypoint_core::types::UserId;
    use waypoint_store::SqliteStore;

    struct RecordingSink {
        sent: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl TransportSink for RecordingSink {
        async fn send(
            &self,
            chat_id: &str,
            html_text: &str,
            _buttons: Option<Vec<Vec<Button>>>,
        ) -> std::result::Result<(), TransportError> {
            self.sent.lock().unwrap().push(format!("{chat_id}:{html_text}"));
            Ok(())
        }
    }

    #[test]
    fn bucket_blocks_the_queue_once_exhausted() {
        let mut bucket = TokenBucket::new(1);
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
    }

    #[tokio::test]
    async fn tick_sends_motivation_for_a_user_with_an_active_goal_at_the_target_hour() {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let user_id = UserId::from("u1");
        store
            .get_or_create_profile(&user_id, "chat-1", "Europe/Moscow")
            .unwrap();
        store
            .create_goal_with_steps(
                &user_id,
                waypoint_store::models::NewGoal {
                    title: "Выучить испанский".into(),
                    description: None,
                    target_date: None,
                    category: None,
                    priority: waypoint_core::types::Priority::Medium,
                },
                vec![],
            )
            .unwrap();

        let sink = Arc::new(RecordingSink {
            sent: StdMutex::new(Vec::new()),
        });
        let mut engine = NotificationEngine::new(Arc::clone(&store), sink.clone(), 30);

        // 08:00 UTC == 11:00 Europe/Moscow, not the 08:00-local motivation
        // window, so a fixed "now" at 05:00 UTC (08:00 Moscow) is used.
        let now = chrono::DateTime::parse_from_rfc3339("2026-07-27T05:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        engine.queue.extend(crate::jobs::collect_motivation(store.as_ref(), now));
        engine.drain_queue().await;

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("chat-1"));
    }
}
