/// Sharps spelling for the twelve pitch classes.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Semitones per transposition step.
const OCTAVE: i32 = 12;

/// Applies a transposition offset (in octaves) to a pitch number.
///
/// Offsets are prospective only: callers apply this at ingestion time, so
/// already-recorded pitches are never remapped.
pub fn transposed(pitch: i32, octaves: i32) -> i32 {
    pitch + OCTAVE * octaves
}

/// Converts a MIDI note number to its note name, e.g. 60 -> "C4".
pub fn note_name(pitch: i32) -> String {
    let class = pitch.rem_euclid(OCTAVE) as usize;
    let octave = pitch.div_euclid(OCTAVE) - 1;
    format!("{}{}", NOTE_NAMES[class], octave)
}

/// Parses a note name back to a MIDI note number, e.g. "C4" -> 60.
///
/// Accepts sharps ('#') and flats ('b') and negative octaves ("A#-1").
pub fn parse_note_name(name: &str) -> Option<i32> {
    let mut chars = name.chars();
    let letter = chars.next()?;
    let mut class: i32 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let rest = chars.as_str();
    let octave_str = match rest.chars().next() {
        Some('#') => {
            class += 1;
            &rest[1..]
        }
        Some('b') => {
            class -= 1;
            &rest[1..]
        }
        _ => rest,
    };
    let octave: i32 = octave_str.parse().ok()?;
    Some((octave + 1) * OCTAVE + class.rem_euclid(OCTAVE))
}

/// User-controlled octave shift, clamped to a fixed range.
///
/// Out-of-range requests are silently clamped rather than rejected, so the
/// increment/decrement commands can be wired straight to key bindings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transpose {
    octaves: i32,
}

impl Transpose {
    pub const MIN: i32 = -2;
    pub const MAX: i32 = 2;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn octaves(&self) -> i32 {
        self.octaves
    }

    pub fn up(&mut self) {
        self.octaves = (self.octaves + 1).min(Self::MAX);
    }

    pub fn down(&mut self) {
        self.octaves = (self.octaves - 1).max(Self::MIN);
    }

    /// Maps a raw pitch number through the current offset.
    pub fn apply(&self, pitch: i32) -> i32 {
        transposed(pitch, self.octaves)
    }
}
