pub mod chord;
pub mod config;
pub mod inputs;
pub mod pitch;
pub mod session;
pub mod transport;

pub use crate::config::Config;
pub use crate::inputs::{KeyPress, KeyboardAdapter};
pub use crate::session::{EnableStatus, NoteEvent, NoteSource, Session};
pub use crate::transport::{MidirTransport, Transport, TransportEvent};

/// Ties a [`Session`] to a [`Transport`] and the keyboard adapter.
///
/// Everything runs on the caller's thread: [`enable`](Engine::enable) once,
/// then [`pump`](Engine::pump) from the host loop to drain transport
/// notifications, and forward keyboard events to
/// [`key_down`](Engine::key_down)/[`key_up`](Engine::key_up).
pub struct Engine<T: Transport> {
    session: Session,
    transport: T,
    keyboard: KeyboardAdapter,
}

impl<T: Transport> Engine<T> {
    pub fn new(transport: T) -> Self {
        Self::with_session(Session::new(), transport)
    }

    /// Builds an engine around a preconfigured session, e.g. one with a
    /// custom chord namer.
    pub fn with_session(session: Session, transport: T) -> Self {
        Self {
            session,
            transport,
            keyboard: KeyboardAdapter::new(),
        }
    }

    /// Activates the transport and performs the first port enumeration.
    ///
    /// Runs at most once per session: any state other than `Uninitiated`
    /// returns immediately. Activation failure is terminal (`Failed`) and
    /// is never retried here.
    pub fn enable(&mut self) -> EnableStatus {
        if self.session.status() != EnableStatus::Uninitiated {
            return self.session.status();
        }
        self.session.set_status(EnableStatus::Enabling);
        match self.transport.enable() {
            Ok(()) => {
                inputs::midi::sync_ports(&mut self.session, &mut self.transport);
                self.session.set_status(EnableStatus::Enabled);
            }
            Err(e) => {
                log::warn!("MIDI transport unavailable: {}", e);
                self.session.set_status(EnableStatus::Failed);
            }
        }
        self.session.status()
    }

    /// Drains pending transport notifications and applies them to the
    /// session. A no-op unless the engine is enabled.
    pub fn pump(&mut self) {
        if self.session.status() != EnableStatus::Enabled {
            return;
        }
        for event in self.transport.poll() {
            match event {
                TransportEvent::Connected(info) => {
                    log::info!("device connected: {}", info.name);
                    inputs::midi::sync_ports(&mut self.session, &mut self.transport);
                }
                TransportEvent::Disconnected { id, kind } => {
                    log::info!("device disconnected: {}", id);
                    self.transport.detach(&id);
                    self.session.remove_port(&id, kind);
                }
                TransportEvent::Message {
                    port,
                    timestamp,
                    bytes,
                } => {
                    inputs::midi::handle_message(&mut self.session, &port, timestamp, &bytes);
                }
            }
        }
    }

    /// Forwards a keyboard key-down. Inactive until the engine is enabled.
    pub fn key_down(&mut self, key: &KeyPress) {
        if self.session.status() != EnableStatus::Enabled {
            return;
        }
        self.keyboard.key_down(&mut self.session, key);
    }

    /// Forwards a keyboard key-up. Inactive until the engine is enabled.
    pub fn key_up(&mut self, key: &KeyPress) {
        if self.session.status() != EnableStatus::Enabled {
            return;
        }
        self.keyboard.key_up(&mut self.session, key);
    }

    pub fn transpose_up(&mut self) {
        self.session.transpose_up();
    }

    pub fn transpose_down(&mut self) {
        self.session.transpose_down();
    }

    /// Read access to the shared session state.
    pub fn session(&self) -> &Session {
        &self.session
    }
}
