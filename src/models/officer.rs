//! Identidad del agente de campo
//!
//! El identificador se normaliza una sola vez en la frontera (trim +
//! mayúsculas), de modo que la igualdad es insensible a mayúsculas y
//! espacios sin repetir la normalización en cada llamada.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identificador normalizado de un agente (officer)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OfficerId(String);

impl OfficerId {
    /// Construye el identificador; devuelve `None` si queda vacío tras normalizar
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OfficerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for OfficerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        OfficerId::parse(&raw).ok_or_else(|| serde::de::Error::custom("officer id cannot be empty"))
    }
}
