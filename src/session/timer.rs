//! Auto-stop deadline timer with a pre-expiry warning.
//!
//! [`AutoStopTimer`] arms two independent schedules per recording session:
//!
//! * a **countdown** on a background thread that, on natural expiry, hands
//!   the auto-stop action to the marshaling queue — the action itself always
//!   runs on the UI-affine thread, regardless of which thread the countdown
//!   fires on;
//! * a **warning** scheduled directly on the UI context scheduler, firing
//!   [`WARNING_LEAD_SECS`] before the deadline. `start()` runs on the
//!   UI-affine thread, so this schedule needs no marshaling.
//!
//! Both are cancellable independently, and [`AutoStopTimer::cancel`] cancels
//! both together. Re-arming after a natural fire is permitted (new session).
//!
//! When the configured window is shorter than the warning lead the warning
//! is disabled outright — a warning that fires the instant recording starts
//! carries no information.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::time::Duration;

use crate::config::AutoStopExit;
use crate::ui::{Notifier, ScheduleId, UiContext, UiQueue};

use super::SessionError;

/// Seconds before the deadline at which the warning fires.
const WARNING_LEAD_SECS: u64 = 5;

/// Delay between the auto-stop action and the scheduled application exit.
const EXIT_DELAY: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// Cancellable one-shot background countdown.
///
/// The thread parks on a condvar with a timeout; `cancel` flips the flag and
/// wakes it, so cancellation is immediate rather than waiting out the sleep.
/// Dropping a live countdown cancels it.
struct Countdown {
    signal: Arc<(Mutex<bool>, Condvar)>,
    _thread: Option<std::thread::JoinHandle<()>>,
}

impl Countdown {
    fn spawn(duration: Duration, on_fire: impl FnOnce() + Send + 'static) -> Self {
        let signal = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_signal = Arc::clone(&signal);

        let thread = std::thread::Builder::new()
            .name("auto-stop-timer".into())
            .spawn(move || {
                let (lock, cvar) = &*thread_signal;
                let guard = match lock.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                let (guard, timeout) = match cvar
                    .wait_timeout_while(guard, duration, |cancelled| !*cancelled)
                {
                    Ok(result) => result,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if timeout.timed_out() && !*guard {
                    drop(guard);
                    on_fire();
                }
            })
            .ok();

        if thread.is_none() {
            log::error!("auto-stop timer: failed to spawn countdown thread");
        }

        Self {
            signal,
            _thread: thread,
        }
    }

    fn cancel(&self) {
        let (lock, cvar) = &*self.signal;
        match lock.lock() {
            Ok(mut cancelled) => *cancelled = true,
            Err(poisoned) => *poisoned.into_inner() = true,
        }
        cvar.notify_all();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// AutoStopTimer
// ---------------------------------------------------------------------------

struct TimerInner {
    countdown: Option<Countdown>,
    warning: Option<ScheduleId>,
}

/// Deadline timer owned by the recording controller.
pub struct AutoStopTimer {
    ctx: Arc<dyn UiContext>,
    queue: Arc<UiQueue>,
    notifier: Arc<dyn Notifier>,
    is_recording: Box<dyn Fn() -> bool + Send + Sync>,
    on_auto_stop: Box<dyn Fn() -> Result<(), SessionError> + Send + Sync>,
    auto_stop_secs: u64,
    exit_policy: AutoStopExit,
    warning_shown: AtomicBool,
    inner: Mutex<TimerInner>,
    weak: Weak<AutoStopTimer>,
}

impl AutoStopTimer {
    /// Create an unarmed timer.
    ///
    /// * `is_recording`  — reads the recorder's authoritative flag.
    /// * `on_auto_stop`  — the stop action invoked (on the UI-affine
    ///   thread) when the deadline fires.
    pub fn new(
        ctx: Arc<dyn UiContext>,
        queue: Arc<UiQueue>,
        notifier: Arc<dyn Notifier>,
        auto_stop_secs: u64,
        exit_policy: AutoStopExit,
        is_recording: impl Fn() -> bool + Send + Sync + 'static,
        on_auto_stop: impl Fn() -> Result<(), SessionError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            ctx,
            queue,
            notifier,
            is_recording: Box::new(is_recording),
            on_auto_stop: Box::new(on_auto_stop),
            auto_stop_secs,
            exit_policy,
            warning_shown: AtomicBool::new(false),
            inner: Mutex::new(TimerInner {
                countdown: None,
                warning: None,
            }),
            weak: weak.clone(),
        })
    }

    /// Arm the countdown and (when the window allows it) the warning for a
    /// new recording session. Must be called on the UI-affine thread.
    pub fn start(&self) {
        let mut inner = self.inner.lock().unwrap();

        // A previous session's countdown may still be armed if start is
        // called again without an intervening cancel.
        if let Some(stale) = inner.countdown.take() {
            stale.cancel();
        }

        let weak = self.weak.clone();
        inner.countdown = Some(Countdown::spawn(
            Duration::from_secs(self.auto_stop_secs),
            move || {
                if let Some(timer) = weak.upgrade() {
                    let ui_timer = Arc::clone(&timer);
                    timer
                        .queue
                        .schedule_callback(move || ui_timer.auto_stop_ui());
                }
            },
        ));

        self.warning_shown.store(false, Ordering::SeqCst);

        if self.auto_stop_secs <= WARNING_LEAD_SECS {
            log::debug!(
                "auto-stop window {}s is within the {WARNING_LEAD_SECS}s warning lead; warning disabled",
                self.auto_stop_secs
            );
        } else if self.queue.is_ui_valid() {
            let delay = Duration::from_millis((self.auto_stop_secs - WARNING_LEAD_SECS) * 1000);
            let weak = self.weak.clone();
            match self.ctx.schedule(
                delay,
                Box::new(move || {
                    if let Some(timer) = weak.upgrade() {
                        timer.show_warning();
                    }
                }),
            ) {
                Ok(id) => inner.warning = Some(id),
                Err(e) => log::warn!("auto-stop timer: failed to schedule warning: {e}"),
            }
        }
    }

    /// Cancel both schedules. A no-op on a never-started timer.
    ///
    /// Failures cancelling the warning (e.g. the context is already torn
    /// down) are swallowed and logged; the handle is cleared regardless.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock().unwrap();

        if let Some(countdown) = inner.countdown.take() {
            countdown.cancel();
        }

        if let Some(id) = inner.warning.take() {
            if self.queue.is_ui_valid() {
                if let Err(e) = self.ctx.cancel(id) {
                    log::warn!("auto-stop timer: failed to cancel warning: {e}");
                }
            }
        }
    }

    /// Auto-stop action — runs on the UI-affine thread via the marshaling
    /// queue.
    fn auto_stop_ui(&self) {
        self.notifier
            .show("Auto-stop", "Recording time limit reached");

        let stopped = (self.on_auto_stop)();
        if let Err(e) = &stopped {
            log::error!("auto-stop: stop handler failed: {e}");
        }

        let quit = match self.exit_policy {
            AutoStopExit::Always => true,
            AutoStopExit::OnSuccess => stopped.is_ok(),
            AutoStopExit::Never => false,
        };

        if quit && self.queue.is_ui_valid() {
            let ctx = Arc::clone(&self.ctx);
            if let Err(e) = self
                .ctx
                .schedule(EXIT_DELAY, Box::new(move || ctx.request_quit()))
            {
                log::warn!("auto-stop: failed to schedule application exit: {e}");
            }
        }
    }

    /// Pre-expiry warning — runs on the UI-affine thread.
    ///
    /// Fires at most once per session; a no-op when recording already ended,
    /// the warning was already shown, or the UI is gone.
    fn show_warning(&self) {
        if !(self.is_recording)() || self.warning_shown.load(Ordering::SeqCst) {
            return;
        }
        if !self.queue.is_ui_valid() {
            return;
        }

        // Force the window to the top of the stack so the warning is seen.
        self.ctx.raise_window();
        self.ctx.set_always_on_top(true);
        self.ctx.set_always_on_top(false);

        self.notifier.show(
            "Auto-stop",
            &format!("Recording stops in {WARNING_LEAD_SECS} seconds"),
        );
        self.warning_shown.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
