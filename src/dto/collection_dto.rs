use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::dto::route_dto::StopLocation;
use crate::models::{CollectionStatus, RouteStatus};

/// Datos para confirmar la recogida de una parada
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ConfirmCollectionRequest {
    #[validate(range(min = 0, max = 100))]
    pub fill_level: i32,

    #[validate(length(max = 2000))]
    pub remarks: Option<String>,

    /// Clave de idempotencia del cliente (reintentos de red)
    #[validate(length(min = 1, max = 128))]
    pub confirmation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NextStopsQuery {
    pub limit: Option<usize>,
}

/// Datos de la parada antes de confirmar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfirmationView {
    pub stop_id: Uuid,
    pub plan_id: Uuid,
    pub sequence: i32,
    #[serde(flatten)]
    pub location: StopLocation,
    pub planned_time: Option<DateTime<Utc>>,
    pub last_fill_level: Option<i32>,
    pub last_status: Option<CollectionStatus>,
    pub last_recorded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NextStopView {
    pub stop_id: Uuid,
    pub sequence: i32,
    #[serde(flatten)]
    pub location: StopLocation,
    pub planned_time: Option<DateTime<Utc>>,
}

/// Resultado de una confirmación
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfirmationOutcome {
    pub stop_id: Uuid,
    pub event_id: Uuid,
    pub plan_status: RouteStatus,
    /// `true` si el token ya se había usado y no se añadió evento
    pub duplicate: bool,
    pub next_stop: Option<NextStopView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NextStopsView {
    pub plan_id: Uuid,
    pub pending_count: usize,
    pub stops: Vec<NextStopView>,
}
