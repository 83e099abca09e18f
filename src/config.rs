use std::path::Path;

use serde::Deserialize;

const DEFAULT_CLIENT_NAME: &str = "clavier";

#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
pub struct Config {
    pub midi: Option<MidiConfig>,
    pub keyboard: Option<KeyboardConfig>,
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct MidiConfig {
    pub enabled: bool,
    pub client_name: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
pub struct KeyboardConfig {
    pub enabled: bool,
}

impl Config {
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let toml_str = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let config = Self::from_toml(&toml_str).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(midi) = &self.midi {
            if let Some(client_name) = &midi.client_name {
                if client_name.is_empty() {
                    return Err("MIDI client_name cannot be empty".to_string());
                }
            }
        }
        Ok(())
    }

    /// Hardware MIDI input defaults to on when the section is omitted.
    pub fn midi_enabled(&self) -> bool {
        self.midi.as_ref().map(|m| m.enabled).unwrap_or(true)
    }

    /// Keyboard note emulation defaults to on when the section is omitted.
    pub fn keyboard_enabled(&self) -> bool {
        self.keyboard.map(|k| k.enabled).unwrap_or(true)
    }

    /// Client name announced to the MIDI backend.
    pub fn client_name(&self) -> &str {
        self.midi
            .as_ref()
            .and_then(|m| m.client_name.as_deref())
            .unwrap_or(DEFAULT_CLIENT_NAME)
    }
}
