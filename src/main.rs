//! Application entry point — voicepaste.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] and the replacements dictionary (defaults on first
//!    run).
//! 3. Create the [`MainLoopContext`] — the main thread is the UI-affine
//!    thread.
//! 4. Build the collaborators (cpal recorder, HTTP transcriber, console
//!    notifier/affordances) and wire the [`RecordingController`].
//! 5. Spawn the global hotkey listener; its events are marshaled onto the
//!    UI-affine thread through the controller's queue.
//! 6. Install a Ctrl+C handler that requests loop exit.
//! 7. Run the main loop — blocks until quit — then run the controller's
//!    ordered cleanup.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context as _;

use voicepaste::audio::{CpalRecorder, Recorder};
use voicepaste::config::{load_replacements, AppConfig, AppPaths};
use voicepaste::hotkey::{parse_key, HotkeyEvent, HotkeyListener};
use voicepaste::session::{RecordingController, UiAffordances};
use voicepaste::stt::{ApiTranscriber, Transcriber};
use voicepaste::ui::{MainLoopContext, Notifier, UiContext};

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voicepaste starting up");

    // 2. Configuration + replacements dictionary
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    let replacements = load_replacements(&AppPaths::new().replacements_file).unwrap_or_else(|e| {
        log::warn!("Failed to load replacements ({e}); continuing without");
        HashMap::new()
    });

    // 3. UI-affine context — the main thread runs the loop.
    let ctx = MainLoopContext::new();
    let ctx_dyn: Arc<dyn UiContext> = ctx.clone();

    // 4. Collaborators + controller
    let recorder: Arc<dyn Recorder> = Arc::new(CpalRecorder::new());
    let client: Arc<dyn Transcriber> = Arc::new(ApiTranscriber::from_config(&config.transcription)?);
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);

    let affordances = UiAffordances {
        record_button: Box::new(|recording| {
            log::info!("record indicator: {}", if recording { "●" } else { "○" });
        }),
        status_label: Box::new(|status| println!("{status}")),
    };

    let controller = RecordingController::new(
        Arc::clone(&ctx_dyn),
        &config,
        recorder,
        client,
        replacements,
        affordances,
        Arc::clone(&notifier),
    );

    println!(
        "Press {} to start or stop dictation; Ctrl+C to quit.",
        config.keys.toggle_recording
    );

    // 5. Hotkey listener — events are marshaled onto the UI-affine thread.
    let toggle_key = parse_key(&config.keys.toggle_recording).unwrap_or(rdev::Key::F8);
    let file_key = config
        .keys
        .transcribe_file
        .as_deref()
        .and_then(parse_key);

    let _listener = {
        let controller = Arc::clone(&controller);
        let notifier = Arc::clone(&notifier);
        let queue = controller.queue();
        HotkeyListener::start(toggle_key, file_key, move |event| {
            let controller = Arc::clone(&controller);
            let notifier = Arc::clone(&notifier);
            queue.schedule_callback(move || match event {
                HotkeyEvent::ToggleRecording => {
                    if let Err(e) = controller.toggle_recording() {
                        notifier.show("Error", &e.to_string());
                    }
                }
                HotkeyEvent::TranscribeClipboardFile => controller.handle_audio_file(),
            });
        })
    };

    // 6. Ctrl+C ends the main loop; cleanup runs afterwards on this thread.
    {
        let ctx = Arc::clone(&ctx);
        ctrlc::set_handler(move || {
            log::info!("interrupt received, shutting down");
            ctx.request_quit();
        })
        .context("failed to install Ctrl+C handler")?;
    }

    // 7. Run until quit, then tear down in order.
    ctx.run();
    controller.cleanup();
    log::info!("voicepaste stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// ConsoleNotifier — notification sink for the headless build
// ---------------------------------------------------------------------------

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn show(&self, title: &str, message: &str) {
        println!("[{title}] {message}");
        log::info!("notification: {title}: {message}");
    }
}
