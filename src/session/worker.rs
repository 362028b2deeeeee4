//! Background transcription work unit.
//!
//! [`TranscriptionWorker`] runs the persist → transcribe → post-process
//! pipeline off the UI-affine thread. The cancellation flag is polled at
//! every step boundary:
//!
//! * cancelled before a step → return silently, **no terminal callback** —
//!   a cancelled operation produces no terminal event, even when a
//!   successful transcript is already in hand (the caller may have torn
//!   down the context expecting no further updates);
//! * any failure → exactly one `on_error`, delivered via the UI scheduler;
//! * success → exactly one `on_complete`, delivered via the UI scheduler
//!   with zero delay.
//!
//! Cancellation is cooperative only: a pipeline already blocked inside the
//! HTTP call cannot be interrupted mid-call — the flag merely prevents the
//! next step from starting and suppresses delivery of a late result.
//!
//! The worker also owns the paste hand-off ([`copy_and_paste`]), which runs
//! on a short-lived fire-and-forget thread per completed transcription.
//!
//! [`copy_and_paste`]: TranscriptionWorker::copy_and_paste

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::audio::{self, AudioError};
use crate::config::ClipboardConfig;
use crate::stt::{SttError, Transcriber};
use crate::text;
use crate::ui::{UiContext, UiQueue};

/// Polling interval used by [`TranscriptionWorker::wait_for_completion`].
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// WorkerError
// ---------------------------------------------------------------------------

/// Terminal failures of the transcription pipeline.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Persisting the captured audio failed.
    #[error("audio save failed: {0}")]
    Save(#[from] AudioError),

    /// The transcription service call failed.
    #[error("transcription failed: {0}")]
    Transcription(#[from] SttError),

    /// The service succeeded but returned nothing usable.
    #[error("transcription failed: service returned an empty transcript")]
    EmptyTranscript,
}

/// Callback invoked (through the marshaling queue) when a paste thread
/// fails.
pub type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

// ---------------------------------------------------------------------------
// TranscriptionWorker
// ---------------------------------------------------------------------------

/// Cancellable background pipeline: persist → transcribe → post-process.
pub struct TranscriptionWorker {
    ctx: Arc<dyn UiContext>,
    queue: Arc<UiQueue>,
    client: Arc<dyn Transcriber>,
    temp_dir: PathBuf,
    use_punctuation: bool,
    replacements: HashMap<String, String>,
    clipboard: ClipboardConfig,
    cancelled: AtomicBool,
    processing: Mutex<Option<JoinHandle<()>>>,
    error_callback: Mutex<Option<ErrorCallback>>,
}

impl TranscriptionWorker {
    pub fn new(
        ctx: Arc<dyn UiContext>,
        queue: Arc<UiQueue>,
        client: Arc<dyn Transcriber>,
        temp_dir: PathBuf,
        use_punctuation: bool,
        replacements: HashMap<String, String>,
        clipboard: ClipboardConfig,
    ) -> Self {
        Self {
            ctx,
            queue,
            client,
            temp_dir,
            use_punctuation,
            replacements,
            clipboard,
            cancelled: AtomicBool::new(false),
            processing: Mutex::new(None),
            error_callback: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Run the full pipeline for captured frames. Called on a dedicated
    /// transcription thread spawned by the controller.
    ///
    /// Exactly one of `on_complete` / `on_error` runs (via the UI-affine
    /// scheduler), or neither when the pipeline was cancelled. Delivery
    /// failures are swallowed — the UI being gone is not an error here.
    pub fn transcribe_frames(
        &self,
        frames: Vec<Vec<i16>>,
        sample_rate: u32,
        on_complete: impl FnOnce(String) + Send + 'static,
        on_error: impl FnOnce(String) + Send + 'static,
    ) {
        log::info!("transcription pipeline started ({} frames)", frames.len());

        match self.run_pipeline(&frames, sample_rate) {
            Ok(Some(transcript)) => {
                if let Err(e) = self
                    .ctx
                    .schedule(Duration::ZERO, Box::new(move || on_complete(transcript)))
                {
                    log::debug!("worker: completion delivery skipped: {e}");
                }
            }
            Ok(None) => log::info!("transcription pipeline cancelled"),
            Err(e) => {
                let message = e.to_string();
                log::error!("transcription pipeline failed: {message}");
                if let Err(e) = self
                    .ctx
                    .schedule(Duration::ZERO, Box::new(move || on_error(message)))
                {
                    log::debug!("worker: error delivery skipped: {e}");
                }
            }
        }
    }

    /// `Ok(None)` means the pipeline was cancelled at a step boundary.
    fn run_pipeline(
        &self,
        frames: &[Vec<i16>],
        sample_rate: u32,
    ) -> Result<Option<String>, WorkerError> {
        if self.is_cancelled() {
            return Ok(None);
        }

        let path = audio::save_frames(frames, sample_rate, &self.temp_dir)?;
        log::info!("audio saved to {}", path.display());

        if self.is_cancelled() {
            return Ok(None);
        }

        let transcript = self.client.transcribe(&path)?;
        if transcript.trim().is_empty() {
            return Err(WorkerError::EmptyTranscript);
        }

        let transcript = text::process_punctuation(&transcript, self.use_punctuation);

        if self.is_cancelled() {
            return Ok(None);
        }

        Ok(Some(transcript))
    }

    /// Synchronous variant for ad-hoc file input. Callbacks are invoked
    /// directly on the calling thread; spawning a background thread — if
    /// one is wanted — is the caller's responsibility.
    pub fn handle_file(
        &self,
        path: &Path,
        on_complete: impl FnOnce(String),
        on_error: impl FnOnce(String),
    ) {
        match self.client.transcribe(path) {
            Ok(transcript) if !transcript.trim().is_empty() => {
                on_complete(text::process_punctuation(&transcript, self.use_punctuation));
            }
            Ok(_) => on_error("audio file processing failed: empty transcript".into()),
            Err(e) => on_error(format!("audio file processing failed: {e}")),
        }
    }

    // -----------------------------------------------------------------------
    // Paste hand-off
    // -----------------------------------------------------------------------

    /// Spawn a fire-and-forget paste thread for a completed transcript.
    ///
    /// Called from the UI-affine thread. Skipped with a log line during
    /// shutdown or when the UI context is gone. A paste failure is routed to
    /// the injected error callback through the marshaling queue.
    pub fn copy_and_paste(&self, transcript: String) {
        if self.queue.is_shutting_down() {
            log::info!("skipping paste during shutdown");
            return;
        }
        if !self.queue.is_ui_valid() {
            log::warn!("skipping paste: UI unavailable");
            return;
        }

        let replacements = self.replacements.clone();
        let clipboard = self.clipboard.clone();
        let queue = Arc::clone(&self.queue);
        let error_callback = self.error_callback.lock().unwrap().clone();

        let spawned = std::thread::Builder::new()
            .name("copy-paste".into())
            .spawn(move || {
                if queue.is_shutting_down() {
                    return;
                }
                if let Err(e) =
                    text::copy_and_paste_transcription(&transcript, &replacements, &clipboard)
                {
                    log::error!("paste failed: {e}");
                    if let Some(callback) = error_callback {
                        let message = format!("copy and paste failed: {e}");
                        queue.schedule_callback(move || callback(&message));
                    }
                }
            });

        if let Err(e) = spawned {
            log::error!("failed to spawn copy-paste thread: {e}");
        }
    }

    /// Install the callback used to report paste failures.
    pub fn set_error_callback(&self, callback: ErrorCallback) {
        *self.error_callback.lock().unwrap() = Some(callback);
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    /// Set the cancellation flag. Idempotent; never cleared automatically.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clear the cancellation flag before starting a new session.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Processing-thread handle
    // -----------------------------------------------------------------------

    /// Record the handle of the transcription thread just spawned.
    ///
    /// The handle is set here (from the UI-affine thread, at stop-sequence
    /// start) and cleared by the completion poll — single-flight by
    /// construction.
    pub fn set_processing_handle(&self, handle: JoinHandle<()>) {
        *self.processing.lock().unwrap() = Some(handle);
    }

    /// `true` while a transcription thread is alive.
    pub fn is_processing(&self) -> bool {
        self.processing
            .lock()
            .map(|guard| guard.as_ref().map_or(false, |h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Drop the handle once the completion poll has observed termination.
    pub fn clear_processing_handle(&self) {
        if let Some(handle) = self.processing.lock().unwrap().take() {
            // The thread already terminated; reap it.
            let _ = handle.join();
        }
    }

    /// Block until the current transcription thread terminates or `timeout`
    /// elapses. Returns whether it terminated. Teardown only.
    pub fn wait_for_completion(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let finished = {
                let guard = self.processing.lock().unwrap();
                guard.as_ref().map_or(true, |h| h.is_finished())
            };
            if finished {
                self.clear_processing_handle();
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(JOIN_POLL_INTERVAL);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::MockTranscriber;
    use crate::ui::MockUiContext;
    use std::sync::Weak;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        ctx: Arc<MockUiContext>,
        _queue: Arc<UiQueue>,
        temp: TempDir,
        completions: Arc<Mutex<Vec<String>>>,
        errors: Arc<Mutex<Vec<String>>>,
    }

    fn worker_with(client: Arc<dyn Transcriber>, use_punctuation: bool) -> (Fixture, Arc<TranscriptionWorker>) {
        let ctx = MockUiContext::new();
        let queue = UiQueue::new(ctx.clone() as Arc<dyn UiContext>);
        let temp = tempdir().unwrap();

        let worker = Arc::new(TranscriptionWorker::new(
            ctx.clone() as Arc<dyn UiContext>,
            Arc::clone(&queue),
            client,
            temp.path().to_path_buf(),
            use_punctuation,
            HashMap::new(),
            ClipboardConfig::default(),
        ));

        (
            Fixture {
                ctx,
                _queue: queue,
                temp,
                completions: Arc::new(Mutex::new(Vec::new())),
                errors: Arc::new(Mutex::new(Vec::new())),
            },
            worker,
        )
    }

    fn run_frames(fx: &Fixture, worker: &TranscriptionWorker, frames: Vec<Vec<i16>>) {
        let completions = Arc::clone(&fx.completions);
        let errors = Arc::clone(&fx.errors);
        worker.transcribe_frames(
            frames,
            16_000,
            move |text| completions.lock().unwrap().push(text),
            move |message| errors.lock().unwrap().push(message),
        );
    }

    #[test]
    fn success_delivers_on_complete_once_at_zero_delay() {
        let client = MockTranscriber::ok("a.b,c");
        let (fx, worker) = worker_with(client.clone() as Arc<dyn Transcriber>, true);

        run_frames(&fx, &worker, vec![vec![100, 200], vec![300]]);

        // Delivered via the UI scheduler with zero delay.
        assert_eq!(fx.ctx.scheduled_delays(), vec![Duration::ZERO]);
        assert!(fx.ctx.fire_next());

        assert_eq!(*fx.completions.lock().unwrap(), vec!["a。b、c"]);
        assert!(fx.errors.lock().unwrap().is_empty());
        assert_eq!(client.call_count(), 1);

        // The WAV artifact was actually written under the temp dir.
        let saved = client.last_path().unwrap();
        assert!(saved.starts_with(fx.temp.path()));
        assert!(saved.exists());
    }

    #[test]
    fn empty_capture_reports_save_failure_and_skips_transcription() {
        let client = MockTranscriber::ok("never used");
        let (fx, worker) = worker_with(client.clone() as Arc<dyn Transcriber>, true);

        run_frames(&fx, &worker, Vec::new());

        assert!(fx.ctx.fire_next());
        let errors = fx.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("save failed"), "got: {}", errors[0]);
        assert!(fx.completions.lock().unwrap().is_empty());
        assert_eq!(client.call_count(), 0);
    }

    #[test]
    fn cancellation_before_start_produces_no_terminal_event() {
        let client = MockTranscriber::ok("never used");
        let (fx, worker) = worker_with(client.clone() as Arc<dyn Transcriber>, true);

        worker.cancel();
        run_frames(&fx, &worker, vec![vec![1, 2, 3]]);

        assert_eq!(fx.ctx.pending(), 0);
        assert!(fx.completions.lock().unwrap().is_empty());
        assert!(fx.errors.lock().unwrap().is_empty());
        assert_eq!(client.call_count(), 0);
        // No artifact was persisted either.
        assert_eq!(std::fs::read_dir(fx.temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn reset_cancel_rearms_the_pipeline() {
        let client = MockTranscriber::ok("hello");
        let (fx, worker) = worker_with(client.clone() as Arc<dyn Transcriber>, true);

        worker.cancel();
        assert!(worker.is_cancelled());
        worker.reset_cancel();
        assert!(!worker.is_cancelled());

        run_frames(&fx, &worker, vec![vec![1, 2, 3]]);
        assert!(fx.ctx.fire_next());
        assert_eq!(*fx.completions.lock().unwrap(), vec!["hello"]);
    }

    #[test]
    fn transcriber_failure_reports_transcription_error() {
        let client = MockTranscriber::err(SttError::Http("connection refused".into()));
        let (fx, worker) = worker_with(client as Arc<dyn Transcriber>, true);

        run_frames(&fx, &worker, vec![vec![1, 2, 3]]);

        assert!(fx.ctx.fire_next());
        let errors = fx.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("transcription failed"));
        assert!(fx.completions.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_transcript_is_a_failure() {
        let client = MockTranscriber::ok("   ");
        let (fx, worker) = worker_with(client as Arc<dyn Transcriber>, true);

        run_frames(&fx, &worker, vec![vec![1, 2, 3]]);

        assert!(fx.ctx.fire_next());
        let errors = fx.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("empty transcript"));
    }

    /// A transcriber that cancels the worker from within the service call —
    /// models a teardown racing the pipeline between steps.
    struct CancellingTranscriber {
        target: Mutex<Weak<TranscriptionWorker>>,
    }

    impl Transcriber for CancellingTranscriber {
        fn transcribe(&self, _audio_path: &Path) -> Result<String, SttError> {
            if let Some(worker) = self.target.lock().unwrap().upgrade() {
                worker.cancel();
            }
            Ok("a perfectly good transcript".into())
        }
    }

    #[test]
    fn cancellation_after_transcription_discards_the_result() {
        let client = Arc::new(CancellingTranscriber {
            target: Mutex::new(Weak::new()),
        });
        let (fx, worker) = worker_with(client.clone() as Arc<dyn Transcriber>, true);
        *client.target.lock().unwrap() = Arc::downgrade(&worker);

        run_frames(&fx, &worker, vec![vec![1, 2, 3]]);

        // Neither callback: the successful result is discarded by design.
        assert_eq!(fx.ctx.pending(), 0);
        assert!(fx.completions.lock().unwrap().is_empty());
        assert!(fx.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn handle_file_invokes_callbacks_on_the_calling_thread() {
        let client = MockTranscriber::ok("file text.");
        let (_fx, worker) = worker_with(client as Arc<dyn Transcriber>, true);

        let mut completed = None;
        worker.handle_file(
            Path::new("/tmp/whatever.wav"),
            |text| completed = Some(text),
            |_| panic!("unexpected error"),
        );
        assert_eq!(completed.as_deref(), Some("file text。"));
    }

    #[test]
    fn handle_file_empty_transcript_errors() {
        let client = MockTranscriber::ok("");
        let (_fx, worker) = worker_with(client as Arc<dyn Transcriber>, true);

        let mut error = None;
        worker.handle_file(
            Path::new("/tmp/whatever.wav"),
            |_| panic!("unexpected success"),
            |message| error = Some(message),
        );
        assert!(error.unwrap().contains("failed"));
    }

    #[test]
    fn wait_for_completion_times_out_then_succeeds() {
        let client = MockTranscriber::ok("unused");
        let (_fx, worker) = worker_with(client as Arc<dyn Transcriber>, true);

        let handle = std::thread::spawn(|| std::thread::sleep(Duration::from_millis(150)));
        worker.set_processing_handle(handle);

        assert!(worker.is_processing());
        assert!(!worker.wait_for_completion(Duration::from_millis(30)));
        assert!(worker.wait_for_completion(Duration::from_secs(2)));
        assert!(!worker.is_processing());
    }

    #[test]
    fn wait_for_completion_without_a_thread_returns_true() {
        let client = MockTranscriber::ok("unused");
        let (_fx, worker) = worker_with(client as Arc<dyn Transcriber>, true);
        assert!(worker.wait_for_completion(Duration::from_millis(10)));
    }
}
