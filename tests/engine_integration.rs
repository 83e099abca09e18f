use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use clavier::transport::{PortId, PortInfo, PortKind, Transport, TransportError, TransportEvent};
use clavier::{EnableStatus, Engine, KeyPress};

#[derive(Default)]
struct MockInner {
    fail_enable: bool,
    inputs: Vec<PortInfo>,
    outputs: Vec<PortInfo>,
    queue: VecDeque<TransportEvent>,
    attach_count: HashMap<PortId, usize>,
    attached: HashSet<PortId>,
    enable_calls: usize,
}

/// Scripted transport: tests hold a clone of the handle and feed events
/// while the engine owns the other clone.
#[derive(Clone, Default)]
struct MockTransport(Rc<RefCell<MockInner>>);

impl MockTransport {
    fn new() -> Self {
        Self::default()
    }

    fn failing() -> Self {
        let mock = Self::default();
        mock.0.borrow_mut().fail_enable = true;
        mock
    }

    fn input(id: &str, name: &str) -> PortInfo {
        PortInfo {
            id: id.to_string(),
            name: name.to_string(),
            manufacturer: "Mock Instruments".to_string(),
            kind: PortKind::Input,
        }
    }

    fn output(id: &str, name: &str) -> PortInfo {
        PortInfo {
            id: id.to_string(),
            name: name.to_string(),
            manufacturer: "Mock Instruments".to_string(),
            kind: PortKind::Output,
        }
    }

    /// Makes a port visible without announcing it, as if it were present
    /// before enable.
    fn seed_input(&self, info: PortInfo) {
        self.0.borrow_mut().inputs.push(info);
    }

    fn seed_output(&self, info: PortInfo) {
        self.0.borrow_mut().outputs.push(info);
    }

    /// Plugs a device in: visible on the next enumeration and announced on
    /// the next poll.
    fn connect_device(&self, info: PortInfo) {
        let mut inner = self.0.borrow_mut();
        inner.inputs.push(info.clone());
        inner.queue.push_back(TransportEvent::Connected(info));
    }

    fn disconnect_device(&self, id: &str) {
        let mut inner = self.0.borrow_mut();
        inner.inputs.retain(|p| p.id != id);
        inner.queue.push_back(TransportEvent::Disconnected {
            id: id.to_string(),
            kind: PortKind::Input,
        });
    }

    fn send(&self, port: &str, timestamp: u64, bytes: &[u8]) {
        self.0.borrow_mut().queue.push_back(TransportEvent::Message {
            port: port.to_string(),
            timestamp,
            bytes: bytes.to_vec(),
        });
    }

    fn attach_count(&self, port: &str) -> usize {
        *self.0.borrow().attach_count.get(port).unwrap_or(&0)
    }

    fn attached(&self, port: &str) -> bool {
        self.0.borrow().attached.contains(port)
    }

    fn enable_calls(&self) -> usize {
        self.0.borrow().enable_calls
    }
}

impl Transport for MockTransport {
    fn enable(&mut self) -> Result<(), TransportError> {
        let mut inner = self.0.borrow_mut();
        inner.enable_calls += 1;
        if inner.fail_enable {
            Err(TransportError::Init("no backend available".to_string()))
        } else {
            Ok(())
        }
    }

    fn inputs(&self) -> Vec<PortInfo> {
        self.0.borrow().inputs.clone()
    }

    fn outputs(&self) -> Vec<PortInfo> {
        self.0.borrow().outputs.clone()
    }

    fn attach(&mut self, port: &PortId) -> Result<(), TransportError> {
        let mut inner = self.0.borrow_mut();
        inner.attached.remove(port);
        inner.attached.insert(port.clone());
        *inner.attach_count.entry(port.clone()).or_insert(0) += 1;
        Ok(())
    }

    fn detach(&mut self, port: &PortId) {
        self.0.borrow_mut().attached.remove(port);
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        self.0.borrow_mut().queue.drain(..).collect()
    }
}

#[test]
fn test_enable_populates_registry_and_attaches_inputs() {
    let mock = MockTransport::new();
    mock.seed_input(MockTransport::input("in-1", "Mock Keys"));
    mock.seed_output(MockTransport::output("out-1", "Mock Synth"));

    let mut engine = Engine::new(mock.clone());
    assert_eq!(engine.session().status(), EnableStatus::Uninitiated);
    assert_eq!(engine.enable(), EnableStatus::Enabled);

    let session = engine.session();
    assert_eq!(session.inputs().len(), 1);
    assert_eq!(session.inputs().get("in-1").unwrap().name, "Mock Keys");
    assert_eq!(session.outputs().len(), 1);
    assert_eq!(mock.attach_count("in-1"), 1);
}

#[test]
fn test_enable_failure_is_a_distinct_terminal_state() {
    let mock = MockTransport::failing();
    let mut engine = Engine::new(mock.clone());

    assert_eq!(engine.enable(), EnableStatus::Failed);

    // The guard holds even after the backend recovers: no automatic retry.
    mock.0.borrow_mut().fail_enable = false;
    assert_eq!(engine.enable(), EnableStatus::Failed);
    assert_eq!(mock.enable_calls(), 1);
}

#[test]
fn test_enable_runs_once() {
    let mock = MockTransport::new();
    mock.seed_input(MockTransport::input("in-1", "Mock Keys"));

    let mut engine = Engine::new(mock.clone());
    assert_eq!(engine.enable(), EnableStatus::Enabled);
    assert_eq!(engine.enable(), EnableStatus::Enabled);

    assert_eq!(mock.enable_calls(), 1);
    assert_eq!(mock.attach_count("in-1"), 1);
}

#[test]
fn test_keyboard_is_inactive_until_enabled() {
    let mock = MockTransport::new();
    let mut engine = Engine::new(mock.clone());

    engine.key_down(&KeyPress::new("KeyQ"));
    assert!(engine.session().active_notes().is_empty());

    engine.enable();
    engine.key_down(&KeyPress::new("KeyQ"));
    assert_eq!(engine.session().active_notes().get(&60), Some(&1.0));
    engine.key_up(&KeyPress::new("KeyQ"));
    assert_eq!(engine.session().active_notes().get(&60), Some(&0.0));
}

#[test]
fn test_hardware_notes_flow_into_chord_guesses() {
    let mock = MockTransport::new();
    mock.seed_input(MockTransport::input("in-1", "Mock Keys"));

    let mut engine = Engine::new(mock.clone());
    engine.enable();

    mock.send("in-1", 1, &[0x90, 60, 100]);
    mock.send("in-1", 2, &[0x90, 64, 100]);
    mock.send("in-1", 3, &[0x90, 67, 100]);
    engine.pump();

    assert_eq!(engine.session().held_pitches(), vec![60, 64, 67]);
    assert_eq!(engine.session().guess_chords(), vec!["C"]);
    assert_eq!(engine.session().messages().len(), 3);

    mock.send("in-1", 4, &[0x80, 64, 0]);
    engine.pump();
    assert_eq!(engine.session().held_pitches(), vec![60, 67]);
    assert_eq!(engine.session().guess_chords(), vec!["C5"]);
}

#[test]
fn test_mixed_sources_share_one_table() {
    let mock = MockTransport::new();
    mock.seed_input(MockTransport::input("in-1", "Mock Keys"));

    let mut engine = Engine::new(mock.clone());
    engine.enable();

    engine.key_down(&KeyPress::new("KeyQ"));
    mock.send("in-1", 1, &[0x90, 64, 100]);
    mock.send("in-1", 2, &[0x90, 67, 100]);
    engine.pump();

    assert_eq!(engine.session().guess_chords(), vec!["C"]);
    // Keyboard events never reach the raw-message journal.
    assert_eq!(engine.session().messages().len(), 2);
}

#[test]
fn test_disconnect_removes_port_but_not_in_flight_events() {
    let mock = MockTransport::new();
    mock.seed_input(MockTransport::input("in-1", "Mock Keys"));

    let mut engine = Engine::new(mock.clone());
    engine.enable();

    // The note-on was already queued when the device vanished.
    mock.disconnect_device("in-1");
    mock.send("in-1", 1, &[0x90, 60, 100]);
    engine.pump();

    assert!(engine.session().inputs().is_empty());
    assert!(!mock.attached("in-1"));
    let velocity = *engine.session().active_notes().get(&60).unwrap();
    assert!((velocity - 100.0 / 127.0).abs() < f32::EPSILON);
}

#[test]
fn test_reconnect_rewires_without_duplicate_delivery() {
    let mock = MockTransport::new();
    mock.seed_input(MockTransport::input("in-1", "Mock Keys"));

    let mut engine = Engine::new(mock.clone());
    engine.enable();

    mock.send("in-1", 1, &[0xFA]);
    engine.pump();
    assert!(engine.session().inputs().get("in-1").unwrap().playing);

    mock.disconnect_device("in-1");
    engine.pump();
    assert!(engine.session().inputs().is_empty());

    mock.connect_device(MockTransport::input("in-1", "Mock Keys"));
    engine.pump();

    // Fresh record, fresh wiring.
    let record = engine.session().inputs().get("in-1").unwrap();
    assert!(!record.playing);
    assert!(record.last_message.is_none());
    assert_eq!(mock.attach_count("in-1"), 2);
    assert!(mock.attached("in-1"));

    // One note-on after reconnect updates the table exactly once.
    mock.send("in-1", 9, &[0x90, 72, 64]);
    engine.pump();
    assert_eq!(engine.session().held_pitches(), vec![72]);
    assert_eq!(engine.session().messages().len(), 2);
}

#[test]
fn test_transpose_commands_shift_future_events_only() {
    let mock = MockTransport::new();
    mock.seed_input(MockTransport::input("in-1", "Mock Keys"));

    let mut engine = Engine::new(mock.clone());
    engine.enable();

    mock.send("in-1", 1, &[0x90, 60, 100]);
    engine.pump();

    engine.transpose_up();
    engine.transpose_up();
    assert_eq!(engine.session().transpose(), 2);

    mock.send("in-1", 2, &[0x90, 60, 100]);
    engine.pump();

    let expected = 100.0 / 127.0;
    let notes = engine.session().active_notes();
    assert_eq!(notes.get(&60), Some(&expected));
    assert_eq!(notes.get(&84), Some(&expected));
}
