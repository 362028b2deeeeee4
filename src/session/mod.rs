//! Recording session lifecycle.
//!
//! # Architecture
//!
//! ```text
//! RecordingController  (UI-affine entry point, state machine)
//!   ├── AutoStopTimer          countdown thread + pre-expiry warning
//!   ├── TranscriptionWorker    persist → transcribe → post-process pipeline
//!   └── Recorder               capture collaborator (audio module)
//! ```
//!
//! The controller is the only component the UI layer talks to. Everything
//! that happens off the UI-affine thread flows back through the marshaling
//! queue or the UI scheduler; see the `ui` module.

pub mod controller;
pub mod timer;
pub mod worker;

pub use controller::RecordingController;
pub use timer::AutoStopTimer;
pub use worker::{TranscriptionWorker, WorkerError};

use thiserror::Error;

use crate::audio::AudioError;

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Errors surfaced by the recording lifecycle.
///
/// Only [`SessionError::ProcessingInFlight`] is ever propagated to the
/// controller's caller; everything else is terminal-handled by the shared
/// error reporter.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A new recording was requested while the previous transcription is
    /// still running. The operation is aborted with no state change.
    #[error("previous transcription is still in progress")]
    ProcessingInFlight,

    /// The recorder collaborator failed.
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),

    /// Thread spawning or another internal operation failed.
    #[error("internal error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// UiAffordances
// ---------------------------------------------------------------------------

/// Injected UI update callbacks.
///
/// Both callbacks are invoked on the UI-affine thread only; they are boxed
/// `Send + Sync` closures so the controller can hold them behind an `Arc`
/// and hand clones of that `Arc` to its helpers.
pub struct UiAffordances {
    /// Reflect the recording state in the record button/indicator.
    pub record_button: Box<dyn Fn(bool) + Send + Sync>,
    /// Replace the status label text.
    pub status_label: Box<dyn Fn(&str) + Send + Sync>,
}
