use crate::session::{NoteEvent, NoteSource, Session};
use crate::transport::{PortId, Transport};

// System real-time status bytes.
const START: u8 = 0xFA;
const CONTINUE: u8 = 0xFB;
const STOP: u8 = 0xFC;
const TIMING_CLOCK: u8 = 0xF8;
const TICK: u8 = 0xF9;
const ACTIVE_SENSING: u8 = 0xFE;

// Channel voice status nibbles.
const NOTE_ON: u8 = 0x90;
const NOTE_OFF: u8 = 0x80;

/// (Re)populates the device registry from the transport's current port
/// lists and wires up message delivery for every input port.
///
/// Safe to call again on every hot-plug notification: records are inserted
/// fresh and [`Transport::attach`] replaces any prior subscription, so a
/// reconnected device never delivers events twice.
pub fn sync_ports(session: &mut Session, transport: &mut dyn Transport) {
    for info in transport.inputs() {
        session.upsert_port(&info);
        if let Err(e) = transport.attach(&info.id) {
            log::warn!("failed to attach input port {}: {}", info.name, e);
        }
    }
    for info in transport.outputs() {
        session.upsert_port(&info);
    }
}

/// Ingests one raw message from a hardware port.
///
/// Clock-style noise is discarded outright. Everything else lands in the
/// message journal; start/stop update the port's transport flags, and
/// note-on/note-off become canonical note events with the transposition
/// offset applied at this moment. Malformed messages mutate nothing beyond
/// the journal.
pub fn handle_message(session: &mut Session, port: &PortId, timestamp: u64, bytes: &[u8]) {
    let Some(&status) = bytes.first() else {
        return;
    };
    if matches!(status, TIMING_CLOCK | TICK | ACTIVE_SENSING) {
        return;
    }

    session.log_message(port, timestamp, bytes);

    match status {
        START | CONTINUE => {
            session.set_port_playing(port, true);
            return;
        }
        STOP => {
            session.set_port_playing(port, false);
            return;
        }
        _ => {}
    }

    if bytes.len() < 3 {
        return;
    }
    let (data1, data2) = (bytes[1], bytes[2]);
    if data1 > 0x7F || data2 > 0x7F {
        return;
    }

    match status & 0xF0 {
        NOTE_ON | NOTE_OFF => {
            let released = status & 0xF0 == NOTE_OFF || data2 == 0;
            let velocity = if released { 0.0 } else { data2 as f32 / 127.0 };
            let pitch = session.transpose_offset().apply(data1 as i32);
            session.apply_note_event(NoteEvent {
                pitch,
                velocity,
                channel: (status & 0x0F) + 1,
                timestamp,
                source: NoteSource::Port(port.clone()),
            });
        }
        _ => {}
    }
}
