//! UI-thread affinity primitives.
//!
//! All user-visible state in voicepaste is owned by exactly one thread (the
//! "UI-affine thread"). This module provides the two mechanisms the rest of
//! the crate uses to respect that:
//!
//! * [`UiContext`] — the scheduler of the UI-affine thread itself, with the
//!   headless production implementation [`MainLoopContext`];
//! * [`UiQueue`] — the marshaling queue background threads enqueue into,
//!   drained in bounded FIFO batches by the UI-affine thread.
//!
//! The two are *independently ordered* delivery paths: a callback scheduled
//! directly on the context and one routed through the queue may interleave
//! in any order. Within the queue, FIFO order is guaranteed.

pub mod context;
pub mod main_loop;
pub mod queue;

pub use context::{ScheduleId, UiCallback, UiContext, UiContextError};
pub use main_loop::MainLoopContext;
pub use queue::UiQueue;

// test-only re-export so sibling modules can `use crate::ui::MockUiContext`.
#[cfg(test)]
pub use context::MockUiContext;

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Sink for user-facing notifications (auto-stop warnings, errors).
///
/// Called only from the UI-affine thread by the lifecycle machinery, but
/// `Send + Sync` so it can be held behind an `Arc<dyn Notifier>`.
pub trait Notifier: Send + Sync {
    fn show(&self, title: &str, message: &str);
}

// ---------------------------------------------------------------------------
// MockNotifier  (test-only)
// ---------------------------------------------------------------------------

/// Test double recording every notification.
#[cfg(test)]
pub struct MockNotifier {
    shown: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl MockNotifier {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            shown: std::sync::Mutex::new(Vec::new()),
        })
    }

    pub fn count(&self) -> usize {
        self.shown.lock().unwrap().len()
    }

    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Notifier for MockNotifier {
    fn show(&self, title: &str, message: &str) {
        self.shown
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}
