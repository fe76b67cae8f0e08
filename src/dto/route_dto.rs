use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Bin, CollectionStatus, RouteStatus};

/// Ubicación de la parada (datos del contenedor)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StopLocation {
    pub bin_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub region: Option<String>,
    pub address: Option<String>,
}

impl StopLocation {
    /// Ubicación para un contenedor que puede no existir ya en el catálogo
    pub fn for_bin(bin_id: &str, bin: Option<&Bin>) -> Self {
        Self {
            bin_id: bin_id.to_string(),
            latitude: bin.and_then(|b| b.latitude),
            longitude: bin.and_then(|b| b.longitude),
            region: bin.and_then(|b| b.region.clone()),
            address: bin.and_then(|b| b.address.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteStopView {
    pub stop_id: Uuid,
    pub sequence: i32,
    #[serde(flatten)]
    pub location: StopLocation,
    pub planned_time: Option<DateTime<Utc>>,
    pub collection_status: Option<CollectionStatus>,
    pub fill_level: Option<i32>,
    /// Minutos desde la parada anterior según horas previstas (0 en la primera)
    pub minutes_from_previous: i64,
    pub issue_log: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteView {
    pub plan_id: Uuid,
    pub planned_date: NaiveDate,
    pub status: RouteStatus,
    pub total_stops: usize,
    pub collected_stops: usize,
    pub stops: Vec<RouteStopView>,
}

/// Ruta del día de un agente; `NoRoute` cuando no tiene ninguna asignada
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DailyRoute {
    Assigned(RouteView),
    NoRoute,
}

impl DailyRoute {
    pub fn route(&self) -> Option<&RouteView> {
        match self {
            DailyRoute::Assigned(view) => Some(view),
            DailyRoute::NoRoute => None,
        }
    }
}
