//! Keyboard simulation backed by the `enigo` crate.
//!
//! Sends the OS-appropriate paste shortcut to the currently focused window:
//! ⌘V on macOS, Ctrl+V elsewhere.

use enigo::{Direction, Enigo, Key, Keyboard, Settings};

use super::PasteError;

/// Simulate the system paste shortcut in the currently focused window.
///
/// A new [`Enigo`] instance is created for each call because `Enigo` is not
/// `Send` and the handle is cheap to construct.
pub fn simulate_paste() -> Result<(), PasteError> {
    let mut enigo =
        Enigo::new(&Settings::default()).map_err(|e| PasteError::KeySimulation(e.to_string()))?;

    #[cfg(target_os = "macos")]
    let modifier = Key::Meta;
    #[cfg(not(target_os = "macos"))]
    let modifier = Key::Control;

    enigo
        .key(modifier, Direction::Press)
        .map_err(|e| PasteError::KeySimulation(e.to_string()))?;
    enigo
        .key(Key::Unicode('v'), Direction::Click)
        .map_err(|e| PasteError::KeySimulation(e.to_string()))?;
    enigo
        .key(modifier, Direction::Release)
        .map_err(|e| PasteError::KeySimulation(e.to_string()))?;

    Ok(())
}
