//! Global capture hotkey
//!
//! One process-wide shortcut (Ctrl+Shift+C, Cmd+Shift+C on macOS) that grabs
//! the primary display and drops the capture into the session, same as the
//! in-app default capture. Registration failure only logs a warning; the
//! hotkey is an extra entry point, not a required one.

use crate::session::Session;
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::sync::{Arc, Mutex};

pub fn spawn_listener(session: Arc<Mutex<Session>>) {
    let spawned = std::thread::Builder::new()
        .name("capture-hotkey".to_string())
        .spawn(move || listen(session));
    if let Err(e) = spawned {
        tracing::warn!("Could not start hotkey thread: {}", e);
    }
}

fn listen(session: Arc<Mutex<Session>>) {
    let manager = match GlobalHotKeyManager::new() {
        Ok(manager) => manager,
        Err(e) => {
            tracing::warn!("Global hotkey unavailable: {}", e);
            return;
        }
    };

    #[cfg(target_os = "macos")]
    let modifiers = Modifiers::SUPER | Modifiers::SHIFT;
    #[cfg(not(target_os = "macos"))]
    let modifiers = Modifiers::CONTROL | Modifiers::SHIFT;

    let hotkey = HotKey::new(Some(modifiers), Code::KeyC);
    if let Err(e) = manager.register(hotkey) {
        tracing::warn!("Could not register capture hotkey: {}", e);
        return;
    }
    tracing::info!("Capture hotkey registered (Ctrl/Cmd+Shift+C)");

    let receiver = GlobalHotKeyEvent::receiver();
    while let Ok(event) = receiver.recv() {
        if event.id() != hotkey.id() || event.state() != HotKeyState::Pressed {
            continue;
        }

        match super::capture_primary_blocking() {
            Ok(image) => {
                if let Ok(mut session) = session.lock() {
                    let capture = session.push(image);
                    tracing::info!(
                        "Hotkey capture added as history entry {} ({}x{})",
                        capture.id,
                        capture.image.width(),
                        capture.image.height()
                    );
                }
            }
            Err(e) => tracing::warn!("Hotkey capture failed: {}", e),
        }
    }
}
