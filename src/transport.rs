use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput};

/// Stable identifier of a device port, as reported by the backend.
pub type PortId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Input,
    Output,
}

/// Port descriptor delivered on enumeration and on hot-plug notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub id: PortId,
    pub name: String,
    pub manufacturer: String,
    pub kind: PortKind,
}

/// Notifications delivered by a transport, drained via [`Transport::poll`].
///
/// Messages from a single port arrive in delivery order; no order is
/// guaranteed across ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected(PortInfo),
    Disconnected { id: PortId, kind: PortKind },
    Message {
        port: PortId,
        /// Microseconds, backend clock.
        timestamp: u64,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to initialize MIDI backend: {0}")]
    Init(String),
    #[error("MIDI port {port} unavailable: {reason}")]
    Port { port: PortId, reason: String },
}

/// Device-discovery and message-delivery collaborator.
///
/// The engine owns no backend specifics; everything it needs from the MIDI
/// stack goes through this trait, which also keeps the engine testable with
/// a scripted transport.
pub trait Transport {
    /// Activates the backend. Called once; failure is terminal for the
    /// session.
    fn enable(&mut self) -> Result<(), TransportError>;

    /// Currently visible input ports.
    fn inputs(&self) -> Vec<PortInfo>;

    /// Currently visible output ports.
    fn outputs(&self) -> Vec<PortInfo>;

    /// Subscribes to an input port's messages. Implementations must detach
    /// any prior subscription on the same port first, so repeated attach is
    /// idempotent and never duplicates delivery.
    fn attach(&mut self, port: &PortId) -> Result<(), TransportError>;

    /// Drops the subscription on a port. Unknown ids are a no-op.
    fn detach(&mut self, port: &PortId);

    /// Drains pending notifications. Hot-plug events precede queued
    /// messages within one call.
    fn poll(&mut self) -> Vec<TransportEvent>;
}

type EventQueue = Arc<Mutex<VecDeque<TransportEvent>>>;

/// midir-backed transport.
///
/// midir callbacks run on backend threads; they only push raw events into a
/// shared queue, and [`poll`](Transport::poll) drains that queue on the
/// caller's thread. Hot-plug is detected by re-enumerating the backend's
/// ports on each poll and diffing against the last seen set. midir reports
/// no manufacturer string, so that field stays empty here.
pub struct MidirTransport {
    client_name: String,
    enabled: bool,
    queue: EventQueue,
    connections: HashMap<PortId, MidiInputConnection<()>>,
    known_inputs: HashMap<PortId, PortInfo>,
    known_outputs: HashMap<PortId, PortInfo>,
}

impl MidirTransport {
    pub fn new(client_name: &str) -> Self {
        Self {
            client_name: client_name.to_string(),
            enabled: false,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            connections: HashMap::new(),
            known_inputs: HashMap::new(),
            known_outputs: HashMap::new(),
        }
    }

    fn enumerate_inputs(&self) -> Vec<PortInfo> {
        let Ok(midi_in) = MidiInput::new(&self.client_name) else {
            return Vec::new();
        };
        midi_in
            .ports()
            .iter()
            .map(|port| PortInfo {
                id: port.id(),
                name: midi_in
                    .port_name(port)
                    .unwrap_or_else(|_| "unknown".to_string()),
                manufacturer: String::new(),
                kind: PortKind::Input,
            })
            .collect()
    }

    fn enumerate_outputs(&self) -> Vec<PortInfo> {
        let Ok(midi_out) = MidiOutput::new(&self.client_name) else {
            return Vec::new();
        };
        midi_out
            .ports()
            .iter()
            .map(|port| PortInfo {
                id: port.id(),
                name: midi_out
                    .port_name(port)
                    .unwrap_or_else(|_| "unknown".to_string()),
                manufacturer: String::new(),
                kind: PortKind::Output,
            })
            .collect()
    }

    /// Diffs one port direction against its last seen set, pushing
    /// connect/disconnect events and returning the fresh set.
    fn diff_ports(
        known: &mut HashMap<PortId, PortInfo>,
        current: Vec<PortInfo>,
        kind: PortKind,
        events: &mut Vec<TransportEvent>,
        connections: &mut HashMap<PortId, MidiInputConnection<()>>,
    ) {
        let fresh: HashMap<PortId, PortInfo> =
            current.into_iter().map(|p| (p.id.clone(), p)).collect();

        for id in known.keys() {
            if !fresh.contains_key(id) {
                connections.remove(id);
                events.push(TransportEvent::Disconnected {
                    id: id.clone(),
                    kind,
                });
            }
        }
        for (id, info) in &fresh {
            if !known.contains_key(id) {
                events.push(TransportEvent::Connected(info.clone()));
            }
        }
        *known = fresh;
    }
}

impl Transport for MidirTransport {
    fn enable(&mut self) -> Result<(), TransportError> {
        MidiInput::new(&self.client_name).map_err(|e| TransportError::Init(e.to_string()))?;
        // Snapshot the visible ports so the first poll does not replay the
        // initial enumeration as hot-plug events.
        self.known_inputs = self
            .enumerate_inputs()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        self.known_outputs = self
            .enumerate_outputs()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        self.enabled = true;
        Ok(())
    }

    fn inputs(&self) -> Vec<PortInfo> {
        self.enumerate_inputs()
    }

    fn outputs(&self) -> Vec<PortInfo> {
        self.enumerate_outputs()
    }

    fn attach(&mut self, port: &PortId) -> Result<(), TransportError> {
        self.detach(port);

        let mut midi_in =
            MidiInput::new(&self.client_name).map_err(|e| TransportError::Init(e.to_string()))?;
        midi_in.ignore(Ignore::None);

        let target = midi_in
            .ports()
            .into_iter()
            .find(|p| p.id() == *port)
            .ok_or_else(|| TransportError::Port {
                port: port.clone(),
                reason: "port not found".to_string(),
            })?;

        let queue = Arc::clone(&self.queue);
        let id = port.clone();
        let connection = midi_in
            .connect(
                &target,
                &self.client_name,
                move |timestamp, bytes, _| {
                    queue.lock().unwrap().push_back(TransportEvent::Message {
                        port: id.clone(),
                        timestamp,
                        bytes: bytes.to_vec(),
                    });
                },
                (),
            )
            .map_err(|e| TransportError::Port {
                port: port.clone(),
                reason: e.to_string(),
            })?;

        log::info!("attached MIDI input port {}", port);
        self.connections.insert(port.clone(), connection);
        Ok(())
    }

    fn detach(&mut self, port: &PortId) {
        if self.connections.remove(port).is_some() {
            log::debug!("detached MIDI input port {}", port);
        }
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        if !self.enabled {
            return Vec::new();
        }

        let mut events = Vec::new();
        let inputs = self.enumerate_inputs();
        Self::diff_ports(
            &mut self.known_inputs,
            inputs,
            PortKind::Input,
            &mut events,
            &mut self.connections,
        );
        let outputs = self.enumerate_outputs();
        Self::diff_ports(
            &mut self.known_outputs,
            outputs,
            PortKind::Output,
            &mut events,
            &mut self.connections,
        );

        let mut queue = self.queue.lock().unwrap();
        events.extend(queue.drain(..));
        events
    }
}
