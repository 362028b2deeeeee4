//! The [`UiContext`] trait — the seam between the concurrency core and
//! whatever owns the UI-affine thread.
//!
//! The context provides three things the lifecycle machinery needs:
//!
//! 1. a liveness check ([`UiContext::is_open`]) so work can be skipped once
//!    the UI is being torn down,
//! 2. a delayed-callback scheduler ([`UiContext::schedule`] /
//!    [`UiContext::cancel`]) whose callbacks always execute on the UI-affine
//!    thread, and
//! 3. a few best-effort window affordances (raise, always-on-top toggle,
//!    quit request).
//!
//! Implementations must be `Send + Sync`: `schedule` is called from
//! background threads (e.g. a finished transcription delivering its result),
//! so the scheduler itself has to be thread-safe even though the *callbacks*
//! only ever run on the UI-affine thread.
//!
//! The production implementation is
//! [`MainLoopContext`](super::main_loop::MainLoopContext); tests use
//! [`MockUiContext`].

use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A deferred unit of work destined for the UI-affine thread.
pub type UiCallback = Box<dyn FnOnce() + Send + 'static>;

/// Opaque handle to a scheduled callback, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleId(pub(crate) u64);

/// Errors surfaced by a [`UiContext`] scheduler.
#[derive(Debug, Clone, Error)]
pub enum UiContextError {
    /// The UI context has been torn down; no further work is accepted.
    #[error("UI context has been torn down")]
    Closed,

    /// The scheduler rejected the request for an implementation-specific
    /// reason.
    #[error("scheduling failed: {0}")]
    Schedule(String),
}

// ---------------------------------------------------------------------------
// UiContext trait
// ---------------------------------------------------------------------------

/// Thread-safe interface to the UI-affine thread.
pub trait UiContext: Send + Sync {
    /// `true` while the UI-affine context still exists and accepts work.
    ///
    /// Callers treat any doubt as invalid (fail-closed); implementations
    /// must never panic here.
    fn is_open(&self) -> bool;

    /// Run `callback` on the UI-affine thread after `delay`.
    ///
    /// Safe to call from any thread. The returned [`ScheduleId`] can be
    /// passed to [`cancel`](Self::cancel) before the callback fires.
    fn schedule(&self, delay: Duration, callback: UiCallback)
        -> Result<ScheduleId, UiContextError>;

    /// Cancel a previously scheduled callback.
    ///
    /// Cancelling an id that already fired (or was already cancelled) is not
    /// an error.
    fn cancel(&self, id: ScheduleId) -> Result<(), UiContextError>;

    /// Best-effort: bring the application window to the front.
    fn raise_window(&self);

    /// Best-effort: toggle the window's always-on-top attribute.
    fn set_always_on_top(&self, on: bool);

    /// Ask the UI-affine thread to exit its loop.
    fn request_quit(&self);
}

// Compile-time assertion: Box<dyn UiContext> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn UiContext>) {}
};

// ---------------------------------------------------------------------------
// MockUiContext  (test-only)
// ---------------------------------------------------------------------------

/// Test double that records every scheduler interaction and lets tests fire
/// scheduled callbacks by hand instead of waiting for wall-clock time.
#[cfg(test)]
pub struct MockUiContext {
    open: std::sync::atomic::AtomicBool,
    quit_requested: std::sync::atomic::AtomicBool,
    raises: std::sync::atomic::AtomicUsize,
    schedule_calls: std::sync::atomic::AtomicUsize,
    cancel_calls: std::sync::atomic::AtomicUsize,
    topmost: std::sync::Mutex<Vec<bool>>,
    inner: std::sync::Mutex<MockInner>,
}

#[cfg(test)]
struct MockInner {
    next_id: u64,
    entries: Vec<MockEntry>,
}

#[cfg(test)]
struct MockEntry {
    id: u64,
    delay: Duration,
    callback: UiCallback,
}

#[cfg(test)]
impl MockUiContext {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            open: std::sync::atomic::AtomicBool::new(true),
            quit_requested: std::sync::atomic::AtomicBool::new(false),
            raises: std::sync::atomic::AtomicUsize::new(0),
            schedule_calls: std::sync::atomic::AtomicUsize::new(0),
            cancel_calls: std::sync::atomic::AtomicUsize::new(0),
            topmost: std::sync::Mutex::new(Vec::new()),
            inner: std::sync::Mutex::new(MockInner {
                next_id: 0,
                entries: Vec::new(),
            }),
        })
    }

    /// Simulate UI teardown: `is_open` becomes false.
    pub fn close(&self) {
        self.open.store(false, std::sync::atomic::Ordering::SeqCst);
    }

    /// Number of callbacks currently waiting to fire.
    pub fn pending(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// Delays of all currently pending callbacks, in schedule order.
    pub fn scheduled_delays(&self) -> Vec<Duration> {
        self.inner.lock().unwrap().entries.iter().map(|e| e.delay).collect()
    }

    /// Fire the oldest pending callback. Returns `false` when none is pending.
    pub fn fire_next(&self) -> bool {
        let callback = {
            let mut inner = self.inner.lock().unwrap();
            if inner.entries.is_empty() {
                return false;
            }
            inner.entries.remove(0).callback
        };
        callback();
        true
    }

    /// Fire a specific pending callback by id.
    pub fn fire_id(&self, id: u64) -> bool {
        let callback = {
            let mut inner = self.inner.lock().unwrap();
            let Some(pos) = inner.entries.iter().position(|e| e.id == id) else {
                return false;
            };
            inner.entries.remove(pos).callback
        };
        callback();
        true
    }

    /// Fire everything that is pending *right now*. Callbacks scheduled by
    /// the fired callbacks (e.g. a drain cycle re-arming itself) are left
    /// pending, which keeps self-rescheduling loops from spinning forever.
    pub fn fire_pending(&self) {
        let ids: Vec<u64> = {
            self.inner.lock().unwrap().entries.iter().map(|e| e.id).collect()
        };
        for id in ids {
            self.fire_id(id);
        }
    }

    /// Fire the oldest pending callback scheduled with exactly `delay`.
    pub fn fire_first_with_delay(&self, delay: Duration) -> bool {
        let id = {
            let inner = self.inner.lock().unwrap();
            inner.entries.iter().find(|e| e.delay == delay).map(|e| e.id)
        };
        match id {
            Some(id) => self.fire_id(id),
            None => false,
        }
    }

    pub fn raise_count(&self) -> usize {
        self.raises.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn schedule_call_count(&self) -> usize {
        self.schedule_calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn cancel_call_count(&self) -> usize {
        self.cancel_calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn topmost_toggles(&self) -> Vec<bool> {
        self.topmost.lock().unwrap().clone()
    }

    pub fn quit_was_requested(&self) -> bool {
        self.quit_requested.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl UiContext for MockUiContext {
    fn is_open(&self) -> bool {
        self.open.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn schedule(
        &self,
        delay: Duration,
        callback: UiCallback,
    ) -> Result<ScheduleId, UiContextError> {
        self.schedule_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if !self.is_open() {
            return Err(UiContextError::Closed);
        }
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push(MockEntry { id, delay, callback });
        Ok(ScheduleId(id))
    }

    fn cancel(&self, id: ScheduleId) -> Result<(), UiContextError> {
        self.cancel_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.inner.lock().unwrap().entries.retain(|e| e.id != id.0);
        Ok(())
    }

    fn raise_window(&self) {
        self.raises.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn set_always_on_top(&self, on: bool) {
        self.topmost.lock().unwrap().push(on);
    }

    fn request_quit(&self) {
        self.quit_requested
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }
}
