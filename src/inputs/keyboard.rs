use std::collections::HashSet;

use crate::session::{NoteEvent, NoteSource, Session};

/// Reserved transposition command keys, consumed before note mapping.
pub const TRANSPOSE_DOWN_KEY: &str = "Digit1";
pub const TRANSPOSE_UP_KEY: &str = "Equal";

/// One key-down/key-up observation from the host keyboard listener, using
/// physical key codes ("KeyQ", "Digit2", ...).
#[derive(Debug, Clone, Default)]
pub struct KeyPress {
    pub code: String,
    /// Set by the host when the key event is an auto-repeat of a held key.
    pub repeat: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyPress {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            ..Self::default()
        }
    }
}

/// Base pitch for a physical key, before the transposition offset.
///
/// Two-row piano layout: QWERTY row as white keys from C4 with the digit
/// row as sharps, and the Z row an octave below spilling into the
/// punctuation keys. Unmapped codes return `None` and are ignored upstream.
pub fn base_pitch(code: &str) -> Option<i32> {
    let pitch = match code {
        // Lower octave, C3 upward.
        "KeyZ" => 48,
        "KeyS" => 49,
        "KeyX" => 50,
        "KeyD" => 51,
        "KeyC" => 52,
        "KeyV" => 53,
        "KeyG" => 54,
        "KeyB" => 55,
        "KeyH" => 56,
        "KeyN" => 57,
        "KeyJ" => 58,
        "KeyM" => 59,
        "Comma" => 60,
        "KeyL" => 61,
        "Period" => 62,
        "Semicolon" => 63,
        "Slash" => 64,
        // Upper octave, C4 upward.
        "KeyQ" => 60,
        "Digit2" => 61,
        "KeyW" => 62,
        "Digit3" => 63,
        "KeyE" => 64,
        "KeyR" => 65,
        "Digit5" => 66,
        "KeyT" => 67,
        "Digit6" => 68,
        "KeyY" => 69,
        "Digit7" => 70,
        "KeyU" => 71,
        "KeyI" => 72,
        "Digit9" => 73,
        "KeyO" => 74,
        "Digit0" => 75,
        "KeyP" => 76,
        "BracketLeft" => 77,
        "BracketRight" => 79,
        _ => return None,
    };
    Some(pitch)
}

/// Computer-keyboard note producer.
///
/// Synthesizes canonical note events (velocity 1 on press, 0 on release,
/// channel 0) through the same pitch mapping and table update as hardware
/// input. Keyboard events are never journaled; there is no wire message.
#[derive(Debug, Default)]
pub struct KeyboardAdapter {
    held: HashSet<String>,
}

impl KeyboardAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles a key-down. Transpose keys are consumed first and never
    /// reach note mapping; repeats, held keys, modifier combinations and
    /// unmapped codes are ignored.
    pub fn key_down(&mut self, session: &mut Session, key: &KeyPress) {
        if key.code == TRANSPOSE_DOWN_KEY {
            session.transpose_down();
            return;
        }
        if key.code == TRANSPOSE_UP_KEY {
            session.transpose_up();
            return;
        }
        if key.repeat || self.held.contains(&key.code) {
            return;
        }
        if key.ctrl || key.alt || key.meta {
            return;
        }
        let Some(base) = base_pitch(&key.code) else {
            return;
        };

        self.held.insert(key.code.clone());
        let pitch = session.transpose_offset().apply(base);
        let timestamp = session.now_micros();
        session.apply_note_event(NoteEvent {
            pitch,
            velocity: 1.0,
            channel: 0,
            timestamp,
            source: NoteSource::Keyboard,
        });
    }

    /// Handles a key-up for a mapped key, releasing its pitch at the offset
    /// current right now.
    pub fn key_up(&mut self, session: &mut Session, key: &KeyPress) {
        let Some(base) = base_pitch(&key.code) else {
            return;
        };

        self.held.remove(&key.code);
        let pitch = session.transpose_offset().apply(base);
        let timestamp = session.now_micros();
        session.apply_note_event(NoteEvent {
            pitch,
            velocity: 0.0,
            channel: 0,
            timestamp,
            source: NoteSource::Keyboard,
        });
    }
}
