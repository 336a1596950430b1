//! User-facing notification sink
//!
//! Duplicate rejections and lookup failures surface to the user through
//! whatever toast/snackbar mechanism the embedding UI provides. The engine
//! only sees the [`NotificationSink`] trait; calls are fire-and-forget and
//! must never block.

use std::sync::Mutex;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Error,
}

/// Fire-and-forget sink for user-visible notices.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);
}

/// Default sink that routes notifications into the `tracing` pipeline.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Error => tracing::error!(target: "varcura::notify", "{message}"),
        }
    }
}

/// Sink that buffers every notification, for assertions in tests and for
/// embedders that drain notices on their own schedule.
#[derive(Debug, Default)]
pub struct BufferingNotifier {
    messages: Mutex<Vec<(NotificationKind, String)>>,
}

impl BufferingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn messages(&self) -> std::sync::MutexGuard<'_, Vec<(NotificationKind, String)>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drain all buffered notifications in arrival order.
    pub fn drain(&self) -> Vec<(NotificationKind, String)> {
        std::mem::take(&mut *self.messages())
    }

    pub fn len(&self) -> usize {
        self.messages().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NotificationSink for BufferingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        self.messages().push((kind, message.to_string()));
    }
}
