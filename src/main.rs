use std::path::Path;
use std::time::Duration;

use clap::Parser;
use clavier::{Config, EnableStatus, Engine, MidirTransport};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Input configuration file.
    #[arg(value_name = "FILE")]
    config_file: Option<String>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config_file {
        Some(path) => Config::from_file(Path::new(path)).unwrap(),
        None => Config::default(),
    };
    if !config.midi_enabled() {
        eprintln!("MIDI input is disabled in the configuration");
        return;
    }

    let mut engine = Engine::new(MidirTransport::new(config.client_name()));
    match engine.enable() {
        EnableStatus::Enabled => {
            let inputs = engine.session().inputs();
            if inputs.is_empty() {
                println!("No MIDI input ports connected; waiting for devices");
            }
            for input in inputs.values() {
                println!("Listening on: {}", input.name);
            }
        }
        status => {
            eprintln!("Could not enable MIDI input ({:?})", status);
            return;
        }
    }

    let mut seen = None;
    loop {
        engine.pump();

        let note = engine.session().last_note().cloned();
        if note != seen {
            if let Some(note) = &note {
                let state = if note.velocity > 0.0 { "on" } else { "off" };
                let chords = engine.session().guess_chords();
                if chords.is_empty() {
                    println!("{:>4} {} (velocity {:.2})", note.name(), state, note.velocity);
                } else {
                    println!(
                        "{:>4} {} (velocity {:.2})  chord: {}",
                        note.name(),
                        state,
                        note.velocity,
                        chords.join(", ")
                    );
                }
            }
            seen = note;
        }

        std::thread::sleep(Duration::from_millis(10));
    }
}
