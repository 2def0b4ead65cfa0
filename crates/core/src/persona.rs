//! Persona: a tag selecting LLM style instructions, reference voice/portrait,
//! and a default style profile. Closed set per the external interface.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    #[serde(rename = "mkbhd")]
    Mkbhd,
    #[serde(rename = "ijustine")]
    IJustine,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Mkbhd => "mkbhd",
            Persona::IJustine => "ijustine",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a prompt names a persona tag outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown persona: {0}")]
pub struct InvalidPersona(pub String);

impl FromStr for Persona {
    type Err = InvalidPersona;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mkbhd" => Ok(Persona::Mkbhd),
            "ijustine" => Ok(Persona::IJustine),
            other => Err(InvalidPersona(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_personas_case_insensitively() {
        assert_eq!("MKBHD".parse::<Persona>().unwrap(), Persona::Mkbhd);
        assert_eq!("ijustine".parse::<Persona>().unwrap(), Persona::IJustine);
    }

    #[test]
    fn rejects_unknown_persona() {
        assert!("nobody".parse::<Persona>().is_err());
    }
}
