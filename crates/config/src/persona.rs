//! Persona registry: maps the closed `Persona` tag set to the asset/style
//! bundle the orchestrator resolves at request time.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use videogen_core::Persona;

#[derive(Error, Debug)]
pub enum PersonaRegistryError {
    #[error("failed to read persona registry at {0}: {1}")]
    Read(String, std::io::Error),

    #[error("failed to parse persona registry: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("persona registry is missing an entry for {0}")]
    MissingEntry(String),
}

/// The asset/style bundle a persona resolves to: reference voice and
/// portrait paths, an LLM system-prompt style hint, and a default
/// `StyleProfile` preset name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaEntry {
    pub reference_audio_path: String,
    pub reference_image_path: String,
    pub llm_style_hint: String,
    pub default_style_profile: String,
    /// Average pause (seconds) and emphasis density the persona's LLM style
    /// instructions aim for; used as a default sampling hint by `videogen-llm`
    /// rather than enforced downstream.
    #[serde(default = "default_avg_pause")]
    pub avg_pause_after: f32,
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
}

fn default_avg_pause() -> f32 {
    0.3
}
fn default_temperature() -> f32 {
    0.7
}

/// A closed-set lookup from `Persona` to its `PersonaEntry`, loaded from a
/// YAML file at `Settings::persona_registry_path`.
#[derive(Debug, Clone, Default)]
pub struct PersonaRegistry {
    entries: HashMap<Persona, PersonaEntry>,
}

impl PersonaRegistry {
    pub fn from_entries(entries: HashMap<Persona, PersonaEntry>) -> Self {
        Self { entries }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PersonaRegistryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PersonaRegistryError::Read(path.display().to_string(), e))?;
        let entries: HashMap<Persona, PersonaEntry> = serde_yaml::from_str(&raw)?;
        Ok(Self { entries })
    }

    /// Built-in defaults used when no registry file is present, so the
    /// orchestrator always has something to resolve against in tests and in
    /// a bare checkout without `config/personas.yaml`.
    pub fn builtin() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            Persona::Mkbhd,
            PersonaEntry {
                reference_audio_path: "assets/personas/mkbhd/voice.wav".to_string(),
                reference_image_path: "assets/personas/mkbhd/portrait.png".to_string(),
                llm_style_hint:
                    "Write like a calm, technically precise tech reviewer. Measured pacing, \
                     occasional understated emphasis on spec numbers."
                        .to_string(),
                default_style_profile: "calm_tech".to_string(),
                avg_pause_after: 0.3,
                default_temperature: 0.6,
            },
        );
        entries.insert(
            Persona::IJustine,
            PersonaEntry {
                reference_audio_path: "assets/personas/ijustine/voice.wav".to_string(),
                reference_image_path: "assets/personas/ijustine/portrait.png".to_string(),
                llm_style_hint:
                    "Write in an upbeat, energetic, conversational voice. Frequent emphasis on \
                     exciting details, short punchy sentences."
                        .to_string(),
                default_style_profile: "energetic".to_string(),
                avg_pause_after: 0.2,
                default_temperature: 0.85,
            },
        );
        Self { entries }
    }

    pub fn resolve(&self, persona: Persona) -> Result<&PersonaEntry, PersonaRegistryError> {
        self.entries
            .get(&persona)
            .ok_or_else(|| PersonaRegistryError::MissingEntry(persona.to_string()))
    }
}
