use std::collections::BTreeSet;

use crate::pitch::{self, NOTE_NAMES};

/// Chord-name matching collaborator.
///
/// Takes note names (e.g. ["C4", "E4", "G4"]) and returns candidate chord
/// names, best guess first. Implementations must be pure: the engine calls
/// this on every read of the chord guess.
pub trait ChordNamer {
    fn detect(&self, notes: &[String]) -> Vec<String>;
}

/// Interval templates, tried in order for each candidate root.
const TEMPLATES: &[(&str, &[i32])] = &[
    ("", &[0, 4, 7]),
    ("m", &[0, 3, 7]),
    ("dim", &[0, 3, 6]),
    ("aug", &[0, 4, 8]),
    ("sus2", &[0, 2, 7]),
    ("sus4", &[0, 5, 7]),
    ("7", &[0, 4, 7, 10]),
    ("maj7", &[0, 4, 7, 11]),
    ("m7", &[0, 3, 7, 10]),
    ("m7b5", &[0, 3, 6, 10]),
    ("dim7", &[0, 3, 6, 9]),
    ("6", &[0, 4, 7, 9]),
    ("m6", &[0, 3, 7, 9]),
    ("5", &[0, 7]),
];

/// Default chord namer: exact pitch-class-set match against the interval
/// templates, every sounding pitch class tried as root.
///
/// Candidates rooted at the bass note come first, remaining roots follow in
/// ascending distance from the bass, so an inverted voicing still lists its
/// most likely name on top.
#[derive(Debug, Default)]
pub struct TemplateNamer;

impl TemplateNamer {
    pub fn new() -> Self {
        Self
    }
}

impl ChordNamer for TemplateNamer {
    fn detect(&self, notes: &[String]) -> Vec<String> {
        let pitches: Vec<i32> = notes
            .iter()
            .filter_map(|n| pitch::parse_note_name(n))
            .collect();
        let Some(&bass) = pitches.iter().min() else {
            return Vec::new();
        };

        let classes: BTreeSet<i32> = pitches.iter().map(|p| p.rem_euclid(12)).collect();
        let bass_class = bass.rem_euclid(12);

        // Roots ordered bass-first, then upward from the bass.
        let mut roots: Vec<i32> = classes.iter().copied().collect();
        roots.sort_by_key(|c| (c - bass_class).rem_euclid(12));

        let mut names = Vec::new();
        for root in roots {
            let intervals: BTreeSet<i32> =
                classes.iter().map(|c| (c - root).rem_euclid(12)).collect();
            for (suffix, template) in TEMPLATES {
                if intervals.len() == template.len()
                    && template.iter().all(|i| intervals.contains(i))
                {
                    names.push(format!("{}{}", NOTE_NAMES[root as usize], suffix));
                }
            }
        }
        names
    }
}
