//! WAV persistence for captured recordings, plus age-based purging of the
//! temp directory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::AudioError;

// Disambiguates files created within the same second.
static SAVE_COUNTER: AtomicU64 = AtomicU64::new(0);

fn unique_wav_name() -> String {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let counter = SAVE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("dictation-{}-{counter}.wav", stamp.as_secs())
}

/// Persist captured frames as a mono 16-bit PCM WAV file under `dir`.
///
/// Returns the path of the new file.
///
/// # Errors
///
/// - [`AudioError::EmptyRecording`] — every frame is empty (nothing was
///   captured).
/// - [`AudioError::Io`] / [`AudioError::Wav`] — directory creation or WAV
///   encoding failed.
pub fn save_frames(
    frames: &[Vec<i16>],
    sample_rate: u32,
    dir: &Path,
) -> Result<PathBuf, AudioError> {
    if frames.iter().all(|frame| frame.is_empty()) {
        return Err(AudioError::EmptyRecording);
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(unique_wav_name());

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    for frame in frames {
        for &sample in frame {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()?;

    Ok(path)
}

/// Delete `.wav` files under `dir` whose last modification is older than
/// `max_age_minutes`.
///
/// Best-effort: every failure is logged and skipped; this function never
/// returns an error.
pub fn purge_stale_wavs(dir: &Path, max_age_minutes: u64) {
    let max_age = Duration::from_secs(max_age_minutes * 60);

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::error!("temp cleanup: cannot read {}: {e}", dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("wav") {
            continue;
        }

        let stale = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .map_or(false, |age| age > max_age);

        if stale {
            match std::fs::remove_file(&path) {
                Ok(()) => log::info!("temp cleanup: removed stale recording {}", path.display()),
                Err(e) => {
                    log::error!("temp cleanup: failed to remove {}: {e}", path.display())
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_writes_a_readable_wav() {
        let dir = tempdir().unwrap();
        let frames = vec![vec![0, 1000, -1000], vec![32_000]];

        let path = save_frames(&frames, 16_000, dir.path()).unwrap();
        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("wav"));

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 1000, -1000, 32_000]);
    }

    #[test]
    fn save_empty_capture_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            save_frames(&[], 16_000, dir.path()),
            Err(AudioError::EmptyRecording)
        ));
        assert!(matches!(
            save_frames(&[Vec::new(), Vec::new()], 16_000, dir.path()),
            Err(AudioError::EmptyRecording)
        ));
    }

    #[test]
    fn consecutive_saves_do_not_collide() {
        let dir = tempdir().unwrap();
        let frames = vec![vec![1]];
        let a = save_frames(&frames, 16_000, dir.path()).unwrap();
        let b = save_frames(&frames, 16_000, dir.path()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn purge_removes_only_stale_wavs() {
        let dir = tempdir().unwrap();
        let stale = save_frames(&[vec![1]], 16_000, dir.path()).unwrap();
        let other = dir.path().join("keep.txt");
        std::fs::write(&other, "not audio").unwrap();

        // Zero-minute threshold: anything with measurable age is stale.
        std::thread::sleep(Duration::from_millis(20));
        purge_stale_wavs(dir.path(), 0);

        assert!(!stale.exists());
        assert!(other.exists());
    }

    #[test]
    fn purge_keeps_recent_wavs() {
        let dir = tempdir().unwrap();
        let recent = save_frames(&[vec![1]], 16_000, dir.path()).unwrap();
        purge_stale_wavs(dir.path(), 60);
        assert!(recent.exists());
    }

    #[test]
    fn purge_of_missing_dir_does_not_panic() {
        purge_stale_wavs(Path::new("/definitely/not/here"), 1);
    }
}
