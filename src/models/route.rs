//! Modelo de RoutePlan
//!
//! Este módulo contiene la ruta planificada para una fecha, sus paradas
//! ordenadas y la asignación a un agente.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::officer::OfficerId;

/// Estado agregado de la ruta. Solo avanza: Scheduled → InProgress → Completed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum RouteStatus {
    #[serde(rename = "Scheduled", alias = "Pending")]
    Scheduled,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Scheduled => "Scheduled",
            RouteStatus::InProgress => "In Progress",
            RouteStatus::Completed => "Completed",
        }
    }

    /// Devuelve el estado más avanzado entre `self` y `next`
    pub fn advance_to(self, next: RouteStatus) -> RouteStatus {
        self.max(next)
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', " ").as_str() {
            "scheduled" | "pending" => Ok(RouteStatus::Scheduled),
            "in progress" | "inprogress" => Ok(RouteStatus::InProgress),
            "completed" => Ok(RouteStatus::Completed),
            other => Err(format!("unknown route status '{}'", other)),
        }
    }
}

/// Ruta planificada para una fecha de recogida
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutePlan {
    pub id: Uuid,
    pub planned_date: NaiveDate,
    pub status: RouteStatus,
    pub created_by: String,
    pub route_key: String,
    pub created_at: DateTime<Utc>,
}

/// Parada ordenada dentro de una ruta
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteStop {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub bin_id: String,
    pub sequence: i32,
    pub planned_time: Option<DateTime<Utc>>,
    pub issue_log: Option<String>,
}

/// Asignación de una ruta a un agente (una por ruta)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteAssignment {
    pub plan_id: Uuid,
    pub assigned_to: OfficerId,
    pub assigned_by: String,
    pub assigned_at: DateTime<Utc>,
}
