//! voicepaste — press-a-key voice dictation.
//!
//! Records microphone audio on demand, sends it to an HTTP speech-to-text
//! service, and injects the resulting transcript at the caller's cursor via
//! clipboard + simulated paste.
//!
//! # Architecture
//!
//! ```text
//! hotkey thread ──▶ UiQueue ──▶ UI-affine thread (MainLoopContext)
//!                                   │
//!                                   ▼
//!                        RecordingController
//!                          ├─ audio-capture thread   (Recorder::record)
//!                          ├─ AutoStopTimer          (countdown thread)
//!                          └─ transcription thread   (TranscriptionWorker)
//!                                   │ save WAV → HTTP STT → post-process
//!                                   ▼
//!                        UI scheduler ──▶ copy-paste thread
//! ```
//!
//! Everything that touches UI-affine state runs on exactly one thread.
//! Background threads reach it only through [`ui::UiQueue`] or the
//! [`ui::UiContext`] scheduler.

pub mod audio;
pub mod config;
pub mod hotkey;
pub mod session;
pub mod stt;
pub mod text;
pub mod ui;
