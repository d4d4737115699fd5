use crate::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NotificationKind {
    Success,
    Failure,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Success,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Failure,
        }
    }
}

struct NotificationStoreRef {
    active: watch::Sender<Option<Notification>>,
    // Bumped by every send. Timers only clear the notification they were armed for.
    generation: AtomicU64,
    expiry: Duration,
}

/// A single slot holding the one user facing message currently shown.
///
/// Cloning is cheap; every clone shares the same slot.
#[derive(Clone)]
pub struct NotificationStore(Arc<NotificationStoreRef>);

impl NotificationStore {
    pub fn new(expiry: Duration) -> Self {
        let (active, _) = watch::channel(None);
        Self(Arc::new(NotificationStoreRef {
            active,
            generation: AtomicU64::new(0),
            expiry,
        }))
    }

    /// Replaces the active notification and arms a timer that clears it.
    ///
    /// Must be called from within a Tokio runtime. Timers armed by earlier
    /// sends keep running, but find a newer generation when they fire and
    /// leave the slot alone.
    pub fn send(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => info!("{}", notification.message),
            NotificationKind::Failure => warn!("{}", notification.message),
        }

        let generation = self.0.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.0.active.send_replace(Some(notification));

        let store = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(store.0.expiry).await;
            store.expire(generation);
        });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.send(Notification::success(message));
    }

    pub fn failure(&self, message: impl Into<String>) {
        self.send(Notification::failure(message));
    }

    pub fn active(&self) -> Option<Notification> {
        self.0.active.borrow().clone()
    }

    /// Dismisses the active notification.
    pub fn clear(&self) {
        self.0.active.send_replace(None);
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.0.active.subscribe()
    }

    fn expire(&self, generation: u64) {
        self.0.active.send_if_modified(|active| {
            if self.0.generation.load(Ordering::SeqCst) != generation || active.is_none() {
                return false;
            }
            *active = None;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPIRY: Duration = Duration::from_secs(15);

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    static_assertions::assert_impl_all!(NotificationStore: Send, Sync, Clone);

    #[tokio::test(start_paused = true)]
    async fn test_send_replaces_active() {
        let store = NotificationStore::new(EXPIRY);
        assert_eq!(store.active(), None);
        store.success("first");
        store.failure("second");
        assert_eq!(store.active(), Some(Notification::failure("second")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_clear() {
        let store = NotificationStore::new(EXPIRY);
        store.success("done");
        tokio::time::sleep(EXPIRY - Duration::from_secs(1)).await;
        settle().await;
        assert!(store.active().is_some());
        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(store.active(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_leaves_newer_notification() {
        let store = NotificationStore::new(EXPIRY);
        store.success("old");
        tokio::time::sleep(Duration::from_secs(10)).await;
        store.failure("new");
        // The first timer fires here.
        tokio::time::sleep(Duration::from_secs(6)).await;
        settle().await;
        assert_eq!(store.active(), Some(Notification::failure("new")));
        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(store.active(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_and_subscribe() {
        let store = NotificationStore::new(EXPIRY);
        let mut rx = store.subscribe();
        store.success("saved");
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Some(Notification::success("saved")));
        store.clear();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), None);
    }
}
