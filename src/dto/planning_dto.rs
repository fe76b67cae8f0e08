use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::OfficerId;
use crate::services::route_planner::PlannedStop;
use crate::services::route_reconciler::ReconcileSummary;

/// Guardar el resultado de una planificación
#[derive(Debug, Clone, Deserialize)]
pub struct SavePlannedRoutesRequest {
    /// Clave de ruta → paradas. Una clave puede ser el id de una ruta ya guardada.
    #[serde(default)]
    pub stops: BTreeMap<String, Vec<PlannedStop>>,

    #[serde(default)]
    pub assignments: BTreeMap<String, OfficerId>,

    /// Fecha de recogida; por defecto hoy
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanRouteResponse {
    pub total_stops: usize,
    pub routes: BTreeMap<String, Vec<PlannedStop>>,
    pub degenerate_bins: Vec<String>,
}

impl PlanRouteResponse {
    pub fn from_stops(stops: &[PlannedStop]) -> Self {
        Self {
            total_stops: stops.len(),
            routes: crate::services::route_planner::group_by_route_key(stops),
            degenerate_bins: stops
                .iter()
                .filter(|s| s.degenerate_location)
                .map(|s| s.bin_id.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SavePlannedRoutesResponse {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub summary: ReconcileSummary,
}
