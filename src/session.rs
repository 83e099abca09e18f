use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

#[cfg(test)]
use ringbuf::traits::Observer;
use ringbuf::{
    HeapRb,
    traits::{Consumer, RingBuffer},
};

use crate::chord::{ChordNamer, TemplateNamer};
use crate::pitch::{self, Transpose};
use crate::transport::{PortId, PortInfo, PortKind};

/// Raw-message journal capacity. Oldest entries are evicted on overflow.
pub const MESSAGE_LOG_CAP: usize = 100;

/// Where a canonical note event came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteSource {
    Port(PortId),
    Keyboard,
}

/// Canonical note event, one per ingested note-on/note-off.
///
/// `pitch` is the post-transposition pitch number and may leave 0..=127.
/// `velocity` is normalized to [0, 1]; 0 means release.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    pub pitch: i32,
    pub velocity: f32,
    pub channel: u8,
    /// Microseconds; hardware events carry the backend clock, keyboard
    /// events the session clock.
    pub timestamp: u64,
    pub source: NoteSource,
}

impl NoteEvent {
    /// Note name of the canonical pitch, e.g. "C4".
    pub fn name(&self) -> String {
        pitch::note_name(self.pitch)
    }
}

/// One raw-message journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEntry {
    pub timestamp: u64,
    pub bytes: Vec<u8>,
}

/// Registry record of a connected input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPort {
    pub name: String,
    pub manufacturer: String,
    pub last_message: Option<Vec<u8>>,
    pub playing: bool,
    pub stopped: bool,
}

/// Registry record of a connected output port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPort {
    pub name: String,
    pub manufacturer: String,
}

/// Transport-activation lifecycle. `Failed` is terminal and distinct from
/// `Enabled`; callers can warn without retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnableStatus {
    #[default]
    Uninitiated,
    Enabling,
    Enabled,
    Failed,
}

/// Shared session state: the active-pitch table, device registry, message
/// log, transposition offset and lifecycle status.
///
/// All mutation goes through the ingestion adapters and the offset commands
/// on a single thread; everything else reads.
pub struct Session {
    status: EnableStatus,
    active: BTreeMap<i32, f32>,
    last_note: Option<NoteEvent>,
    transpose: Transpose,
    log: HeapRb<MessageEntry>,
    inputs: HashMap<PortId, InputPort>,
    outputs: HashMap<PortId, OutputPort>,
    playing: bool,
    namer: Box<dyn ChordNamer>,
    started: Instant,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_namer(Box::new(TemplateNamer::new()))
    }

    /// Builds a session delegating chord naming to a custom collaborator.
    pub fn with_namer(namer: Box<dyn ChordNamer>) -> Self {
        Self {
            status: EnableStatus::default(),
            active: BTreeMap::new(),
            last_note: None,
            transpose: Transpose::new(),
            log: HeapRb::new(MESSAGE_LOG_CAP),
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            playing: false,
            namer,
            started: Instant::now(),
        }
    }

    pub fn status(&self) -> EnableStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: EnableStatus) {
        self.status = status;
    }

    /// Session clock in microseconds, used to stamp keyboard events.
    pub(crate) fn now_micros(&self) -> u64 {
        self.started.elapsed().as_micros() as u64
    }

    /// Records a canonical note event: last-write-wins per pitch key, and
    /// the event becomes the most recent note observation.
    pub(crate) fn apply_note_event(&mut self, event: NoteEvent) {
        self.active.insert(event.pitch, event.velocity);
        self.last_note = Some(event);
    }

    /// The active-pitch table. A pitch keyed with velocity 0.0 is released;
    /// keys are never required to be removed.
    pub fn active_notes(&self) -> &BTreeMap<i32, f32> {
        &self.active
    }

    /// Currently sounding pitches, ascending.
    pub fn held_pitches(&self) -> Vec<i32> {
        self.active
            .iter()
            .filter(|&(_, &v)| v > 0.0)
            .map(|(&p, _)| p)
            .collect()
    }

    /// Most recent canonical note event, `None` before the first one.
    pub fn last_note(&self) -> Option<&NoteEvent> {
        self.last_note.as_ref()
    }

    /// Best-effort chord names for the currently sounding pitches.
    ///
    /// Recomputed from scratch on every call; nothing is cached.
    pub fn guess_chords(&self) -> Vec<String> {
        let names: Vec<String> = self
            .held_pitches()
            .into_iter()
            .map(pitch::note_name)
            .collect();
        self.namer.detect(&names)
    }

    pub fn transpose(&self) -> i32 {
        self.transpose.octaves()
    }

    pub(crate) fn transpose_offset(&self) -> Transpose {
        self.transpose
    }

    pub fn transpose_up(&mut self) {
        self.transpose.up();
    }

    pub fn transpose_down(&mut self) {
        self.transpose.down();
    }

    /// Appends a raw hardware message to the journal and remembers it on
    /// the originating port's record.
    pub(crate) fn log_message(&mut self, port: &PortId, timestamp: u64, bytes: &[u8]) {
        let _ = self.log.push_overwrite(MessageEntry {
            timestamp,
            bytes: bytes.to_vec(),
        });
        if let Some(input) = self.inputs.get_mut(port) {
            input.last_message = Some(bytes.to_vec());
        }
    }

    /// Journal entries, newest first, at most [`MESSAGE_LOG_CAP`].
    pub fn messages(&self) -> Vec<MessageEntry> {
        self.log.iter().rev().cloned().collect()
    }

    pub fn inputs(&self) -> &HashMap<PortId, InputPort> {
        &self.inputs
    }

    pub fn outputs(&self) -> &HashMap<PortId, OutputPort> {
        &self.outputs
    }

    /// Inserts a fresh registry record for a discovered port. Re-insertion
    /// resets the record, matching a re-enumerated device.
    pub(crate) fn upsert_port(&mut self, info: &PortInfo) {
        match info.kind {
            PortKind::Input => {
                self.inputs.insert(
                    info.id.clone(),
                    InputPort {
                        name: info.name.clone(),
                        manufacturer: info.manufacturer.clone(),
                        last_message: None,
                        playing: false,
                        stopped: true,
                    },
                );
            }
            PortKind::Output => {
                self.outputs.insert(
                    info.id.clone(),
                    OutputPort {
                        name: info.name.clone(),
                        manufacturer: info.manufacturer.clone(),
                    },
                );
            }
        }
    }

    /// Drops a registry record. Unknown ids are a no-op.
    pub(crate) fn remove_port(&mut self, id: &PortId, kind: PortKind) {
        match kind {
            PortKind::Input => {
                self.inputs.remove(id);
            }
            PortKind::Output => {
                self.outputs.remove(id);
            }
        }
    }

    /// Updates a port's start/stop transport flags and the session mirror.
    pub(crate) fn set_port_playing(&mut self, id: &PortId, playing: bool) {
        if let Some(input) = self.inputs.get_mut(id) {
            input.playing = playing;
            input.stopped = !playing;
        }
        self.playing = playing;
    }

    /// True after a start signal from any input port, until a stop signal.
    pub fn playing(&self) -> bool {
        self.playing
    }
}
