//! [`MainLoopContext`] — the production [`UiContext`].
//!
//! voicepaste has no widget toolkit; the "UI-affine thread" is simply the
//! main thread running [`MainLoopContext::run`]: a condvar-driven timer loop
//! that executes scheduled callbacks in due-time order. Background threads
//! call [`UiContext::schedule`] and the loop wakes up immediately.
//!
//! [`UiContext::request_quit`] closes the context: `run` returns, pending
//! callbacks are discarded, and further `schedule` calls fail with
//! [`UiContextError::Closed`]. There is no way to reopen a context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use super::context::{ScheduleId, UiCallback, UiContext, UiContextError};

// ---------------------------------------------------------------------------
// MainLoopContext
// ---------------------------------------------------------------------------

/// Condvar-driven scheduler loop for the main thread.
pub struct MainLoopContext {
    open: AtomicBool,
    inner: Mutex<LoopInner>,
    wakeup: Condvar,
}

struct LoopInner {
    next_id: u64,
    entries: Vec<TimerEntry>,
}

struct TimerEntry {
    id: u64,
    due: Instant,
    callback: UiCallback,
}

impl MainLoopContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            open: AtomicBool::new(true),
            inner: Mutex::new(LoopInner {
                next_id: 0,
                entries: Vec::new(),
            }),
            wakeup: Condvar::new(),
        })
    }

    /// Run the loop on the calling thread until [`request_quit`] is called.
    ///
    /// The calling thread becomes the UI-affine thread: every scheduled
    /// callback executes here, one at a time, in due-time order.
    ///
    /// [`request_quit`]: UiContext::request_quit
    pub fn run(&self) {
        loop {
            let mut inner = match self.inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };

            loop {
                if !self.open.load(Ordering::SeqCst) {
                    return;
                }

                let now = Instant::now();
                let next = inner
                    .entries
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, entry)| entry.due)
                    .map(|(index, entry)| (index, entry.due));

                match next {
                    Some((index, due)) if due <= now => {
                        let entry = inner.entries.remove(index);
                        drop(inner);
                        (entry.callback)();
                        break; // re-acquire the lock for the next round
                    }
                    Some((_, due)) => {
                        let wait = due - now;
                        inner = match self.wakeup.wait_timeout(inner, wait) {
                            Ok((guard, _)) => guard,
                            Err(poisoned) => poisoned.into_inner().0,
                        };
                    }
                    None => {
                        inner = match self.wakeup.wait(inner) {
                            Ok(guard) => guard,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                    }
                }
            }
        }
    }
}

impl UiContext for MainLoopContext {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn schedule(
        &self,
        delay: Duration,
        callback: UiCallback,
    ) -> Result<ScheduleId, UiContextError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(UiContextError::Closed);
        }
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push(TimerEntry {
            id,
            due: Instant::now() + delay,
            callback,
        });
        self.wakeup.notify_all();
        Ok(ScheduleId(id))
    }

    fn cancel(&self, id: ScheduleId) -> Result<(), UiContextError> {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.entries.retain(|entry| entry.id != id.0);
        self.wakeup.notify_all();
        Ok(())
    }

    fn raise_window(&self) {
        // Headless build: there is no window to raise. Kept as the hook a
        // windowing front-end would override.
        log::trace!("raise_window requested (headless: no-op)");
    }

    fn set_always_on_top(&self, on: bool) {
        log::trace!("set_always_on_top({on}) requested (headless: no-op)");
    }

    fn request_quit(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.wakeup.notify_all();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_callbacks_in_due_time_order() {
        let ctx = MainLoopContext::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        {
            let seen = Arc::clone(&seen);
            ctx.schedule(
                Duration::from_millis(20),
                Box::new(move || seen.lock().unwrap().push("late")),
            )
            .unwrap();
        }
        {
            let seen = Arc::clone(&seen);
            ctx.schedule(
                Duration::ZERO,
                Box::new(move || seen.lock().unwrap().push("early")),
            )
            .unwrap();
        }
        {
            let quit = Arc::clone(&ctx);
            ctx.schedule(Duration::from_millis(40), Box::new(move || quit.request_quit()))
                .unwrap();
        }

        ctx.run();
        assert_eq!(*seen.lock().unwrap(), vec!["early", "late"]);
    }

    #[test]
    fn cancelled_callback_never_runs() {
        let ctx = MainLoopContext::new();
        let fired = Arc::new(AtomicBool::new(false));

        let id = {
            let fired = Arc::clone(&fired);
            ctx.schedule(
                Duration::from_millis(10),
                Box::new(move || fired.store(true, Ordering::SeqCst)),
            )
            .unwrap()
        };
        ctx.cancel(id).unwrap();

        let quit = Arc::clone(&ctx);
        ctx.schedule(Duration::from_millis(30), Box::new(move || quit.request_quit()))
            .unwrap();

        ctx.run();
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[test]
    fn schedule_after_quit_fails_closed() {
        let ctx = MainLoopContext::new();
        ctx.request_quit();
        let result = ctx.schedule(Duration::ZERO, Box::new(|| {}));
        assert!(matches!(result, Err(UiContextError::Closed)));
        assert!(!ctx.is_open());
    }

    #[test]
    fn run_returns_promptly_on_quit_with_entries_pending() {
        let ctx = MainLoopContext::new();
        ctx.schedule(Duration::from_secs(3600), Box::new(|| {})).unwrap();

        let quit = Arc::clone(&ctx);
        ctx.schedule(Duration::ZERO, Box::new(move || quit.request_quit()))
            .unwrap();

        let started = Instant::now();
        ctx.run();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn schedule_from_background_thread_wakes_the_loop() {
        let ctx = MainLoopContext::new();
        let seen = Arc::new(AtomicBool::new(false));

        let bg_ctx = Arc::clone(&ctx);
        let bg_seen = Arc::clone(&seen);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            let quit = Arc::clone(&bg_ctx);
            bg_ctx
                .schedule(
                    Duration::ZERO,
                    Box::new(move || {
                        bg_seen.store(true, Ordering::SeqCst);
                        quit.request_quit();
                    }),
                )
                .unwrap();
        });

        ctx.run();
        handle.join().unwrap();
        assert!(seen.load(Ordering::SeqCst));
    }
}
