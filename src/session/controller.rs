//! Recording lifecycle controller — the single UI-affine entry point for
//! all recording-related user actions.
//!
//! # State machine
//!
//! ```text
//! Idle ──toggle──▶ Recording ──toggle/auto-stop──▶ Stopping
//!                                                    │
//!                                       spawn transcription thread
//!                                                    ▼
//!                                              Transcribing ──poll──▶ Idle
//! any state ──error──▶ shared error handler ──▶ Idle
//! ```
//!
//! There is deliberately no mirrored "am I recording" field: the recorder's
//! own `is_recording()` flag is the single source of truth, so the
//! controller and the UI can never drift apart.
//!
//! The controller's primary correctness invariant is **single-flight
//! transcription**: [`RecordingController::start_recording`] fails fast with
//! [`SessionError::ProcessingInFlight`] while the previous processing thread
//! is still alive. This is the only error the controller re-raises to its
//! caller; every other failure is funneled into the shared error reporter,
//! which restores the idle affordances so the UI never sticks in a transient
//! label.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::audio::{self, Recorder};
use crate::config::{AppConfig, AppPaths};
use crate::stt::Transcriber;
use crate::text;
use crate::ui::{Notifier, UiContext, UiQueue};

use super::timer::AutoStopTimer;
use super::worker::TranscriptionWorker;
use super::{SessionError, UiAffordances};

/// Status label shown while a transcription thread is alive.
const PROCESSING_HINT: &str = "Transcribing…";

/// Status label shown while an ad-hoc audio file is processed.
const FILE_HINT: &str = "Processing audio file…";

/// Interval of the completion poll on the UI scheduler.
const COMPLETION_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Cleanup waits up to 50 × 100 ms for the transcription thread.
const CLEANUP_WAIT_POLLS: u32 = 50;
const CLEANUP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One final bounded join before the thread is abandoned.
const CLEANUP_FINAL_JOIN: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// ErrorReporter
// ---------------------------------------------------------------------------

/// Shared error handler used by every failure surface.
///
/// `report` is the thread-safety wrapper: callable from anywhere a callback
/// has already been marshaled onto the UI-affine thread, it degrades to a
/// log line when the UI context has become invalid (a legitimate state
/// during shutdown races, not an error).
pub(crate) struct ErrorReporter {
    queue: Arc<UiQueue>,
    notifier: Arc<dyn Notifier>,
    affordances: Arc<UiAffordances>,
    recorder: Arc<dyn Recorder>,
    idle_hint: String,
}

impl ErrorReporter {
    pub(crate) fn report(&self, message: &str) {
        if self.queue.is_ui_valid() {
            self.handle(message);
        } else {
            log::error!("error while UI unavailable: {message}");
        }
    }

    /// Notification + idle affordances + force-stop of a still-running
    /// recorder.
    fn handle(&self, message: &str) {
        self.notifier.show("Error", message);
        (self.affordances.status_label)(&self.idle_hint);
        (self.affordances.record_button)(false);

        if self.recorder.is_recording() {
            if let Err(e) = self.recorder.stop_recording() {
                log::error!("failed to force-stop recorder: {e}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingController
// ---------------------------------------------------------------------------

/// Top-level state machine owning the timer, the worker, and the session's
/// UI plumbing.
pub struct RecordingController {
    ctx: Arc<dyn UiContext>,
    queue: Arc<UiQueue>,
    recorder: Arc<dyn Recorder>,
    worker: Arc<TranscriptionWorker>,
    timer: Arc<AutoStopTimer>,
    affordances: Arc<UiAffordances>,
    notifier: Arc<dyn Notifier>,
    reporter: Arc<ErrorReporter>,
    temp_dir: PathBuf,
    cleanup_minutes: u64,
    paste_delay: Duration,
    idle_hint: String,
    recording_hint: String,
    weak: Weak<RecordingController>,
}

impl RecordingController {
    /// Wire up the session: starts the marshaling queue drain and purges
    /// stale temp artifacts. Must be called on the UI-affine thread.
    pub fn new(
        ctx: Arc<dyn UiContext>,
        config: &AppConfig,
        recorder: Arc<dyn Recorder>,
        client: Arc<dyn Transcriber>,
        replacements: HashMap<String, String>,
        affordances: UiAffordances,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        let temp_dir = config
            .paths
            .temp_dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().temp_dir);
        if let Err(e) = std::fs::create_dir_all(&temp_dir) {
            log::error!("cannot create temp dir {}: {e}", temp_dir.display());
        }

        let affordances = Arc::new(affordances);
        let queue = UiQueue::new(Arc::clone(&ctx));
        queue.start();

        let idle_hint = format!(
            "Press {} to start or stop dictation",
            config.keys.toggle_recording
        );
        let recording_hint = format!(
            "Recording… (press {} to stop)",
            config.keys.toggle_recording
        );

        let reporter = Arc::new(ErrorReporter {
            queue: Arc::clone(&queue),
            notifier: Arc::clone(&notifier),
            affordances: Arc::clone(&affordances),
            recorder: Arc::clone(&recorder),
            idle_hint: idle_hint.clone(),
        });

        let worker = Arc::new(TranscriptionWorker::new(
            Arc::clone(&ctx),
            Arc::clone(&queue),
            client,
            temp_dir.clone(),
            config.transcription.use_punctuation,
            replacements,
            config.clipboard.clone(),
        ));
        {
            let reporter = Arc::clone(&reporter);
            worker.set_error_callback(Arc::new(move |message| reporter.report(message)));
        }

        let controller = Arc::new_cyclic(|weak: &Weak<RecordingController>| {
            let timer = {
                let recorder = Arc::clone(&recorder);
                let weak = weak.clone();
                AutoStopTimer::new(
                    Arc::clone(&ctx),
                    Arc::clone(&queue),
                    Arc::clone(&notifier),
                    config.recording.auto_stop_secs,
                    config.recording.auto_stop_exit,
                    move || recorder.is_recording(),
                    move || match weak.upgrade() {
                        Some(controller) => controller.stop_recording_process(),
                        None => Ok(()),
                    },
                )
            };

            Self {
                ctx,
                queue,
                recorder,
                worker,
                timer,
                affordances,
                notifier,
                reporter,
                temp_dir,
                cleanup_minutes: config.paths.cleanup_minutes,
                paste_delay: Duration::from_millis(config.clipboard.paste_delay_ms),
                idle_hint,
                recording_hint,
                weak: weak.clone(),
            }
        });

        audio::purge_stale_wavs(&controller.temp_dir, controller.cleanup_minutes);
        controller
    }

    /// The marshaling queue, for wiring input sources (hotkeys) that live on
    /// other threads.
    pub fn queue(&self) -> Arc<UiQueue> {
        Arc::clone(&self.queue)
    }

    // -----------------------------------------------------------------------
    // Lifecycle operations (UI-affine thread)
    // -----------------------------------------------------------------------

    /// Start or stop based on the recorder's authoritative state.
    pub fn toggle_recording(&self) -> Result<(), SessionError> {
        if self.recorder.is_recording() {
            self.stop_recording();
            Ok(())
        } else {
            self.start_recording()
        }
    }

    /// Begin a new recording session.
    ///
    /// # Errors
    ///
    /// [`SessionError::ProcessingInFlight`] when the previous transcription
    /// thread is still alive — the recorder is left untouched.
    pub fn start_recording(&self) -> Result<(), SessionError> {
        if self.worker.is_processing() {
            return Err(SessionError::ProcessingInFlight);
        }

        self.worker.reset_cancel();
        self.recorder.start_recording()?;

        (self.affordances.record_button)(true);
        (self.affordances.status_label)(&self.recording_hint);

        // Capture thread: blocks in Recorder::record until stop clears the
        // flag. A capture failure is marshaled back as a regular error.
        let recorder = Arc::clone(&self.recorder);
        let ctx = Arc::clone(&self.ctx);
        let reporter = Arc::clone(&self.reporter);
        std::thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                if let Err(e) = recorder.record() {
                    log::error!("recording failed: {e}");
                    let message = format!("recording failed: {e}");
                    let _ = ctx.schedule(
                        Duration::ZERO,
                        Box::new(move || reporter.report(&message)),
                    );
                }
            })
            .map_err(|e| SessionError::Internal(format!("cannot spawn capture thread: {e}")))?;

        self.timer.start();
        Ok(())
    }

    /// User-initiated stop. Never raises: any failure in the stop sequence
    /// is funneled into the shared error reporter.
    pub fn stop_recording(&self) {
        self.timer.cancel();
        if let Err(e) = self.stop_recording_process() {
            self.reporter
                .report(&format!("failed to stop recording: {e}"));
        }
    }

    /// Stop sequence: drain the recorder, spawn the transcription thread,
    /// begin the completion poll. Also invoked by the auto-stop timer.
    fn stop_recording_process(&self) -> Result<(), SessionError> {
        let (frames, sample_rate) = self.recorder.stop_recording()?;
        log::info!(
            "captured audio retrieved ({} frames at {sample_rate} Hz)",
            frames.len()
        );

        (self.affordances.record_button)(false);
        (self.affordances.status_label)(PROCESSING_HINT);

        let worker = Arc::clone(&self.worker);
        let on_complete = {
            let weak = self.weak.clone();
            move |transcript: String| {
                if let Some(controller) = weak.upgrade() {
                    controller.deliver_transcript(transcript);
                }
            }
        };
        let on_error = {
            let reporter = Arc::clone(&self.reporter);
            move |message: String| reporter.report(&message)
        };

        let handle = std::thread::Builder::new()
            .name("transcription".into())
            .spawn(move || worker.transcribe_frames(frames, sample_rate, on_complete, on_error))
            .map_err(|e| {
                SessionError::Internal(format!("cannot spawn transcription thread: {e}"))
            })?;
        self.worker.set_processing_handle(handle);

        if self.queue.is_ui_valid() {
            self.schedule_completion_poll();
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Completion polling
    // -----------------------------------------------------------------------

    /// Re-check the transcription thread every 100 ms instead of blocking
    /// the UI-affine thread on its completion. The poll originates on the
    /// UI-affine thread, so it goes through the context scheduler directly.
    fn schedule_completion_poll(&self) {
        let Some(controller) = self.weak.upgrade() else {
            return;
        };
        if let Err(e) = self.ctx.schedule(
            COMPLETION_POLL_INTERVAL,
            Box::new(move || controller.check_processing_thread()),
        ) {
            log::warn!("completion poll not scheduled: {e}");
        }
    }

    fn check_processing_thread(&self) {
        if !self.worker.is_processing() {
            (self.affordances.status_label)(&self.idle_hint);
            self.worker.clear_processing_handle();
            return;
        }

        (self.affordances.status_label)(PROCESSING_HINT);
        if self.queue.is_ui_valid() {
            self.schedule_completion_poll();
        }
    }

    // -----------------------------------------------------------------------
    // Transcript delivery
    // -----------------------------------------------------------------------

    /// Schedule the clipboard paste for a finished transcript after the
    /// configured settle delay.
    fn deliver_transcript(&self, transcript: String) {
        if !self.queue.is_ui_valid() {
            log::warn!("UI unavailable, skipping transcript delivery");
            return;
        }

        let worker = Arc::clone(&self.worker);
        match self.ctx.schedule(
            self.paste_delay,
            Box::new(move || worker.copy_and_paste(transcript)),
        ) {
            Ok(_) => log::debug!("paste scheduled after {:?}", self.paste_delay),
            Err(e) => log::error!("failed to schedule paste: {e}"),
        }
    }

    // -----------------------------------------------------------------------
    // Ad-hoc file input
    // -----------------------------------------------------------------------

    /// Transcribe the audio file whose path is on the system clipboard.
    ///
    /// The idle status label is restored on every exit path.
    pub fn handle_audio_file(&self) {
        if let Err(message) = self.try_handle_audio_file() {
            self.notifier.show("Error", &message);
        }
        (self.affordances.status_label)(&self.idle_hint);
    }

    fn try_handle_audio_file(&self) -> Result<(), String> {
        let raw = text::clipboard_text().map_err(|e| e.to_string())?;
        let path = PathBuf::from(raw.trim());
        if !path.exists() {
            return Err("audio file not found".into());
        }

        (self.affordances.status_label)(FILE_HINT);

        let weak = self.weak.clone();
        let notifier = Arc::clone(&self.notifier);
        self.worker.handle_file(
            &path,
            move |transcript| {
                if let Some(controller) = weak.upgrade() {
                    controller.deliver_transcript(transcript);
                }
            },
            move |message| notifier.show("Error", &message),
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Ordered teardown. Never raises.
    ///
    /// 1. shut the marshaling queue (no new UI work),
    /// 2. set the worker's cancellation flag,
    /// 3. force-stop the recorder if still active,
    /// 4. wait up to 5 s (100 ms polls) for the transcription thread,
    /// 5. one final 1 s bounded join, then abandon the thread with a
    ///    warning — it is never killed,
    /// 6. cancel the deadline timer,
    /// 7. purge expired temp artifacts.
    pub fn cleanup(&self) {
        log::info!("recording controller cleanup started");

        self.queue.shutdown();
        self.worker.cancel();

        if self.recorder.is_recording() {
            self.stop_recording();
        }

        if self.worker.is_processing() {
            log::info!("waiting for transcription thread to finish");
            for _ in 0..CLEANUP_WAIT_POLLS {
                if !self.worker.is_processing() {
                    break;
                }
                std::thread::sleep(CLEANUP_POLL_INTERVAL);
            }

            if self.worker.is_processing()
                && !self.worker.wait_for_completion(CLEANUP_FINAL_JOIN)
            {
                log::warn!("transcription thread did not finish; abandoning it");
            }
        }

        self.timer.cancel();
        audio::purge_stale_wavs(&self.temp_dir, self.cleanup_minutes);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MockRecorder;
    use crate::config::AutoStopExit;
    use crate::stt::MockTranscriber;
    use crate::ui::{MockNotifier, MockUiContext};
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        ctx: Arc<MockUiContext>,
        recorder: Arc<MockRecorder>,
        client: Arc<MockTranscriber>,
        notifier: Arc<MockNotifier>,
        statuses: Arc<Mutex<Vec<String>>>,
        buttons: Arc<Mutex<Vec<bool>>>,
        _temp: TempDir,
    }

    fn controller_fixture(auto_stop_secs: u64) -> (Fixture, Arc<RecordingController>) {
        let ctx = MockUiContext::new();
        let recorder = MockRecorder::new();
        let client = MockTranscriber::ok("hello world");
        let notifier = MockNotifier::new();
        let temp = tempdir().unwrap();

        let statuses = Arc::new(Mutex::new(Vec::new()));
        let buttons = Arc::new(Mutex::new(Vec::new()));

        let mut config = AppConfig::default();
        config.recording.auto_stop_secs = auto_stop_secs;
        config.recording.auto_stop_exit = AutoStopExit::Never;
        config.paths.temp_dir = Some(temp.path().to_path_buf());

        let affordances = UiAffordances {
            record_button: {
                let buttons = Arc::clone(&buttons);
                Box::new(move |on| buttons.lock().unwrap().push(on))
            },
            status_label: {
                let statuses = Arc::clone(&statuses);
                Box::new(move |label| statuses.lock().unwrap().push(label.to_string()))
            },
        };

        let controller = RecordingController::new(
            ctx.clone() as Arc<dyn UiContext>,
            &config,
            recorder.clone() as Arc<dyn Recorder>,
            client.clone() as Arc<dyn Transcriber>,
            HashMap::new(),
            affordances,
            notifier.clone() as Arc<dyn Notifier>,
        );

        (
            Fixture {
                ctx,
                recorder,
                client,
                notifier,
                statuses,
                buttons,
                _temp: temp,
            },
            controller,
        )
    }

    #[test]
    fn start_fails_fast_while_processing_thread_alive() {
        let (fx, controller) = controller_fixture(60);

        let busy = std::thread::spawn(|| std::thread::sleep(Duration::from_millis(200)));
        controller.worker.set_processing_handle(busy);

        let result = controller.start_recording();
        assert!(matches!(result, Err(SessionError::ProcessingInFlight)));
        // Precondition violation leaves the recorder untouched.
        assert_eq!(fx.recorder.start_count(), 0);
        assert!(!fx.recorder.is_recording());

        controller.worker.wait_for_completion(Duration::from_secs(2));
    }

    #[test]
    fn start_updates_affordances_and_arms_timer() {
        let (fx, controller) = controller_fixture(60);

        controller.start_recording().unwrap();

        assert_eq!(fx.recorder.start_count(), 1);
        assert!(fx.recorder.is_recording());
        assert_eq!(*fx.buttons.lock().unwrap(), vec![true]);
        assert!(fx.statuses.lock().unwrap()[0].contains("Recording"));
        // Warning armed at (60 - 5) s on the context scheduler.
        assert!(fx
            .ctx
            .scheduled_delays()
            .contains(&Duration::from_millis(55_000)));
    }

    #[test]
    fn toggle_dispatches_on_recorder_state() {
        let (fx, controller) = controller_fixture(60);

        controller.toggle_recording().unwrap();
        assert!(fx.recorder.is_recording());

        controller.toggle_recording().unwrap();
        assert!(!fx.recorder.is_recording());
        assert_eq!(fx.recorder.stop_count(), 1);

        controller.worker.wait_for_completion(Duration::from_secs(2));
    }

    #[test]
    fn stop_runs_pipeline_and_schedules_paste() {
        let (fx, controller) = controller_fixture(60);

        controller.start_recording().unwrap();
        controller.stop_recording();

        // Affordances flip to the processing state immediately.
        assert_eq!(*fx.buttons.lock().unwrap(), vec![true, false]);
        assert!(fx
            .statuses
            .lock()
            .unwrap()
            .iter()
            .any(|s| s.contains("Transcribing")));

        // Wait for the transcription thread, then fire its zero-delay
        // completion delivery.
        assert!(controller.worker.wait_for_completion(Duration::from_secs(5)));
        assert_eq!(fx.client.call_count(), 1);
        assert!(fx.ctx.fire_first_with_delay(Duration::ZERO));

        // The completion handler scheduled the paste at the settle delay.
        assert!(fx
            .ctx
            .scheduled_delays()
            .contains(&Duration::from_millis(300)));
    }

    #[test]
    fn completion_poll_restores_idle_when_thread_finishes() {
        let (fx, controller) = controller_fixture(60);

        controller.start_recording().unwrap();
        controller.stop_recording();
        assert!(controller.worker.wait_for_completion(Duration::from_secs(5)));

        // Simulate one poll tick after completion.
        controller.check_processing_thread();

        assert!(!controller.worker.is_processing());
        assert!(fx
            .statuses
            .lock()
            .unwrap()
            .last()
            .unwrap()
            .contains("Press F8"));
    }

    #[test]
    fn completion_poll_keeps_processing_state_while_alive() {
        let (fx, controller) = controller_fixture(60);

        let busy = std::thread::spawn(|| std::thread::sleep(Duration::from_millis(200)));
        controller.worker.set_processing_handle(busy);

        let polls_before = fx.ctx.pending();
        controller.check_processing_thread();

        assert!(fx
            .statuses
            .lock()
            .unwrap()
            .last()
            .unwrap()
            .contains("Transcribing"));
        // The poll re-armed itself.
        assert_eq!(fx.ctx.pending(), polls_before + 1);

        controller.worker.wait_for_completion(Duration::from_secs(2));
    }

    #[test]
    fn stop_failure_is_reported_not_raised() {
        let (fx, controller) = controller_fixture(60);

        controller.start_recording().unwrap();
        fx.recorder.fail_next_stop();
        controller.stop_recording();

        let notifications = fx.notifier.shown();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].0, "Error");
        // Idle affordances restored.
        assert!(fx
            .statuses
            .lock()
            .unwrap()
            .last()
            .unwrap()
            .contains("Press F8"));
        assert_eq!(*fx.buttons.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn cleanup_is_orderly_and_idempotent_on_idle() {
        let (fx, controller) = controller_fixture(60);

        controller.cleanup();

        assert!(controller.queue.is_shutting_down());
        assert!(controller.worker.is_cancelled());

        // Post-shutdown scheduling is a no-op.
        controller.queue.schedule_callback(|| panic!("must not run"));
        assert_eq!(controller.queue.pending_len(), 0);
        drop(fx);
    }

    #[test]
    fn cleanup_stops_an_active_recording() {
        let (fx, controller) = controller_fixture(60);

        controller.start_recording().unwrap();
        assert!(fx.recorder.is_recording());

        controller.cleanup();

        assert!(!fx.recorder.is_recording());
        assert_eq!(fx.recorder.stop_count(), 1);
        // The final pipeline saw the cancellation flag: no transcription.
        assert!(controller.worker.wait_for_completion(Duration::from_secs(5)));
        assert_eq!(fx.client.call_count(), 0);
    }

    #[test]
    fn cleanup_waits_out_a_live_processing_thread() {
        let (_fx, controller) = controller_fixture(60);

        let busy = std::thread::spawn(|| std::thread::sleep(Duration::from_millis(300)));
        controller.worker.set_processing_handle(busy);

        controller.cleanup();
        assert!(!controller.worker.is_processing());
    }

    #[test]
    fn queue_accessor_hands_out_the_live_queue() {
        let (_fx, controller) = controller_fixture(60);
        let queue = controller.queue();
        queue.schedule_callback(|| {});
        assert_eq!(controller.queue.pending_len(), 1);
    }
}
