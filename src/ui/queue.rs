//! Event-marshaling queue — the only safe channel for background threads to
//! affect UI-affine state.
//!
//! [`UiQueue`] is a thread-safe FIFO mailbox of zero-argument callbacks. Any
//! thread may enqueue with [`UiQueue::schedule_callback`]; the UI-affine
//! thread drains the mailbox in a periodic cycle armed by
//! [`UiQueue::start`]. Each drain pops at most [`DRAIN_BATCH`] entries so a
//! backlog can never monopolize the UI-affine thread for a whole tick;
//! leftovers stay queued for the next cycle.
//!
//! The drain cycle reschedules itself from within — making
//! [`UiQueue::is_ui_valid`] the single gate that stops the loop cleanly when
//! the UI context disappears mid-flight — and stops quietly if the context
//! refuses the reschedule.
//!
//! [`UiQueue::shutdown`] sets a one-way flag: afterwards new callbacks are
//! silently dropped (logged) and the drain loop exits on its next tick.
//! There is no way to un-shutdown a queue.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use super::context::{UiCallback, UiContext, UiContextError};

/// Interval between drain cycles on the UI-affine thread.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

/// Maximum number of callbacks executed per drain cycle.
const DRAIN_BATCH: usize = 10;

// ---------------------------------------------------------------------------
// UiQueue
// ---------------------------------------------------------------------------

/// Single-consumer marshaling queue for the UI-affine thread.
pub struct UiQueue {
    ctx: Arc<dyn UiContext>,
    pending: Mutex<VecDeque<UiCallback>>,
    shutting_down: AtomicBool,
    weak: Weak<UiQueue>,
}

impl UiQueue {
    /// Create a queue bound to `ctx`. The drain cycle is not armed until
    /// [`start`](Self::start) is called.
    pub fn new(ctx: Arc<dyn UiContext>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            ctx,
            pending: Mutex::new(VecDeque::new()),
            shutting_down: AtomicBool::new(false),
            weak: weak.clone(),
        })
    }

    /// Arm the periodic drain cycle. No-op when the UI context is already
    /// invalid.
    pub fn start(&self) {
        if !self.is_ui_valid() {
            return;
        }
        if let Err(e) = self.schedule_drain() {
            log::error!("ui queue: failed to start drain cycle: {e}");
        }
    }

    fn schedule_drain(&self) -> Result<(), UiContextError> {
        let Some(queue) = self.weak.upgrade() else {
            return Ok(());
        };
        self.ctx
            .schedule(DRAIN_INTERVAL, Box::new(move || queue.process_queue()))
            .map(|_| ())
    }

    /// One drain cycle. Runs on the UI-affine thread only.
    fn process_queue(&self) {
        if self.shutting_down.load(Ordering::SeqCst) {
            return;
        }

        for _ in 0..DRAIN_BATCH {
            let callback = match self.pending.lock() {
                Ok(mut queue) => queue.pop_front(),
                Err(e) => {
                    log::error!("ui queue: pending lock poisoned: {e}");
                    break;
                }
            };
            let Some(callback) = callback else { break };

            // A single misbehaving callback must not take down the drain
            // cycle or starve the callbacks queued behind it.
            if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
                log::error!("ui queue: scheduled callback panicked");
            }
        }

        if !self.shutting_down.load(Ordering::SeqCst) && self.is_ui_valid() {
            if let Err(e) = self.schedule_drain() {
                log::warn!("ui queue: drain reschedule failed, stopping: {e}");
            }
        }
    }

    /// Enqueue `callback` to run on the UI-affine thread during a later
    /// drain cycle.
    ///
    /// Never blocks and never panics outward: during shutdown the callback
    /// is dropped with a debug log, and a failed enqueue is logged and
    /// swallowed.
    pub fn schedule_callback(&self, callback: impl FnOnce() + Send + 'static) {
        if self.shutting_down.load(Ordering::SeqCst) {
            log::debug!("ui queue: dropping callback scheduled during shutdown");
            return;
        }
        match self.pending.lock() {
            Ok(mut queue) => queue.push_back(Box::new(callback)),
            Err(e) => log::error!("ui queue: failed to enqueue callback: {e}"),
        }
    }

    /// `true` while the queue accepts work and the UI context is alive.
    ///
    /// Fail-closed: a shutdown flag or a closed context both yield `false`.
    pub fn is_ui_valid(&self) -> bool {
        !self.shutting_down.load(Ordering::SeqCst) && self.ctx.is_open()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Set the one-way shutdown flag. Subsequent [`schedule_callback`]
    /// calls and drain reschedules become no-ops.
    ///
    /// [`schedule_callback`]: Self::schedule_callback
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    /// Number of callbacks currently queued (0 when the lock is poisoned).
    pub fn pending_len(&self) -> usize {
        self.pending.lock().map(|queue| queue.len()).unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
