//! cpal-backed microphone recorder.
//!
//! [`CpalRecorder`] implements [`Recorder`] against the system default input
//! device. The stream is created inside [`Recorder::record`] on the capture
//! thread (cpal streams are not `Send` on every platform) and torn down when
//! the recording flag is cleared by [`Recorder::stop_recording`].
//!
//! Incoming buffers are downmixed to mono and converted to `i16`, one chunk
//! per device callback, so the rest of the pipeline only ever sees
//! `Vec<Vec<i16>>` at the device sample rate.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::{AudioError, Recorder};

/// How often the capture loop re-checks the recording flag.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// CpalRecorder
// ---------------------------------------------------------------------------

/// Production recorder backed by the default cpal input device.
pub struct CpalRecorder {
    recording: Arc<AtomicBool>,
    frames: Arc<Mutex<Vec<Vec<i16>>>>,
    sample_rate: Arc<AtomicU32>,
}

impl CpalRecorder {
    pub fn new() -> Self {
        Self {
            recording: Arc::new(AtomicBool::new(false)),
            frames: Arc::new(Mutex::new(Vec::new())),
            sample_rate: Arc::new(AtomicU32::new(0)),
        }
    }
}

impl Default for CpalRecorder {
    fn default() -> Self {
        Self::new()
    }
}

fn downmix_f32(data: &[f32], channels: usize) -> Vec<i16> {
    data.chunks(channels)
        .map(|chunk| {
            let sum: f32 = chunk.iter().sum();
            let avg = sum / channels as f32;
            (avg.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
        })
        .collect()
}

fn downmix_i16(data: &[i16], channels: usize) -> Vec<i16> {
    data.chunks(channels)
        .map(|chunk| {
            let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

impl Recorder for CpalRecorder {
    fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    fn start_recording(&self) -> Result<(), AudioError> {
        if self.recording.swap(true, Ordering::SeqCst) {
            return Err(AudioError::AlreadyRecording);
        }
        self.frames.lock().unwrap().clear();
        Ok(())
    }

    fn record(&self) -> Result<(), AudioError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(AudioError::NoDevice)?;
        let supported = device
            .default_input_config()
            .map_err(|e| AudioError::Device(e.to_string()))?;

        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        self.sample_rate.store(config.sample_rate.0, Ordering::SeqCst);
        let channels = config.channels as usize;

        log::info!(
            "audio capture: {} Hz, {} ch, {sample_format:?}",
            config.sample_rate.0,
            channels
        );

        let err_fn = |e: cpal::StreamError| log::error!("audio stream error: {e}");

        let stream = match sample_format {
            cpal::SampleFormat::F32 => {
                let recording = Arc::clone(&self.recording);
                let frames = Arc::clone(&self.frames);
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if !recording.load(Ordering::SeqCst) {
                            return;
                        }
                        frames.lock().unwrap().push(downmix_f32(data, channels));
                    },
                    err_fn,
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let recording = Arc::clone(&self.recording);
                let frames = Arc::clone(&self.frames);
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        if !recording.load(Ordering::SeqCst) {
                            return;
                        }
                        frames.lock().unwrap().push(downmix_i16(data, channels));
                    },
                    err_fn,
                    None,
                )
            }
            other => {
                self.recording.store(false, Ordering::SeqCst);
                return Err(AudioError::Device(format!(
                    "unsupported sample format: {other:?}"
                )));
            }
        }
        .map_err(|e| AudioError::Device(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Device(e.to_string()))?;

        while self.recording.load(Ordering::SeqCst) {
            std::thread::sleep(STOP_POLL_INTERVAL);
        }
        drop(stream);
        Ok(())
    }

    fn stop_recording(&self) -> Result<(Vec<Vec<i16>>, u32), AudioError> {
        if !self.recording.swap(false, Ordering::SeqCst) {
            return Err(AudioError::NotRecording);
        }
        // One poll tick so the capture loop observes the cleared flag and
        // releases the stream before the buffer is drained.
        std::thread::sleep(STOP_POLL_INTERVAL);
        let frames = std::mem::take(&mut *self.frames.lock().unwrap());
        Ok((frames, self.sample_rate.load(Ordering::SeqCst)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // Device-level capture needs real hardware; these cover the state
    // machine and the downmix math, which don't.

    #[test]
    fn stop_without_start_is_not_recording_error() {
        let recorder = CpalRecorder::new();
        assert!(!recorder.is_recording());
        assert!(matches!(
            recorder.stop_recording(),
            Err(AudioError::NotRecording)
        ));
    }

    #[test]
    fn double_start_is_rejected() {
        let recorder = CpalRecorder::new();
        recorder.start_recording().unwrap();
        assert!(recorder.is_recording());
        assert!(matches!(
            recorder.start_recording(),
            Err(AudioError::AlreadyRecording)
        ));
        // stop clears the flag again
        let _ = recorder.stop_recording();
        assert!(!recorder.is_recording());
    }

    #[test]
    fn downmix_f32_averages_channels_and_clamps() {
        let stereo = [0.5f32, -0.5, 1.0, 1.0, -2.0, -2.0];
        let mono = downmix_f32(&stereo, 2);
        assert_eq!(mono.len(), 3);
        assert_eq!(mono[0], 0);
        assert_eq!(mono[1], i16::MAX);
        assert_eq!(mono[2], -i16::MAX);
    }

    #[test]
    fn downmix_i16_averages_channels() {
        let stereo = [100i16, 300, -50, -150];
        let mono = downmix_i16(&stereo, 2);
        assert_eq!(mono, vec![200, -100]);
    }

    #[test]
    fn downmix_mono_is_identity() {
        let data = [1i16, 2, 3];
        assert_eq!(downmix_i16(&data, 1), vec![1, 2, 3]);
    }
}
