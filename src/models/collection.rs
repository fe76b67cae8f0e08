//! Modelo de CollectionEvent
//!
//! Registro append-only del resultado de una visita. El estado "actual" de
//! una parada es siempre el del evento más reciente.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CollectionStatus {
    Collected,
    Skipped,
}

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Collected => "Collected",
            CollectionStatus::Skipped => "Skipped",
        }
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "collected" => Ok(CollectionStatus::Collected),
            "skipped" => Ok(CollectionStatus::Skipped),
            other => Err(format!("unknown collection status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionEvent {
    pub id: Uuid,
    pub stop_id: Uuid,
    pub fill_level: i32,
    pub status: CollectionStatus,
    pub recorded_at: DateTime<Utc>,
    pub issue_log: Option<String>,
    pub confirmation_token: Option<String>,
}

impl CollectionEvent {
    pub fn is_collected(&self) -> bool {
        self.status == CollectionStatus::Collected
    }
}

/// Evento más reciente por `recorded_at`
pub fn latest_event<'a, I>(events: I) -> Option<&'a CollectionEvent>
where
    I: IntoIterator<Item = &'a CollectionEvent>,
{
    events.into_iter().max_by_key(|e| e.recorded_at)
}
