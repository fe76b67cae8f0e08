//! Route Reconciler
//!
//! Persiste el resultado de una planificación para una fecha. Cada clave de
//! ruta se resuelve contra lo ya guardado:
//!
//! * clave sin ruta existente → se crean ruta, paradas y asignación;
//! * clave con ruta existente (id persistido, o misma clave ya guardada para
//!   esa fecha) → solo se actualiza la asignación; las paradas no se tocan.
//!
//! Todo el lote se aplica en una sola transacción.

use chrono::{Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::ValidationErrors;

use crate::models::{OfficerId, RouteAssignment, RoutePlan, RouteStatus, RouteStop};
use crate::repositories::{NewRoutePlan, ReconcileBatch, RouteRepository};
use crate::services::clock::Clock;
use crate::services::route_planner::PlannedStop;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::validate_coordinates;

/// Horario con el que se calculan las horas previstas de las paradas
#[derive(Debug, Clone, PartialEq)]
pub struct StopSchedule {
    /// Hora local de inicio del turno
    pub shift_start: NaiveTime,
    pub minutes_per_stop: i64,
    /// Desfase de la hora local (el mismo con el que se calcula "hoy")
    pub utc_offset: FixedOffset,
}

impl Default for StopSchedule {
    fn default() -> Self {
        Self {
            shift_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            minutes_per_stop: 15,
            utc_offset: Utc.fix(),
        }
    }
}

impl StopSchedule {
    /// Hora prevista (UTC) de la parada `sequence` (desde 1) en `date` local
    pub fn planned_time(&self, date: NaiveDate, sequence: i32) -> chrono::DateTime<Utc> {
        let local_start = date.and_time(self.shift_start);
        let utc_start = local_start - Duration::seconds(i64::from(self.utc_offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc_start)
            + Duration::minutes(self.minutes_per_stop * i64::from(sequence.max(1) - 1))
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ReconcileSummary {
    /// Clave de ruta → id de la ruta persistida
    pub plan_ids: BTreeMap<String, Uuid>,
    pub plans_created: usize,
    pub stops_created: usize,
    pub assignments_upserted: usize,
}

/// Rechaza el lote entero si alguna parada trae coordenadas fuera de rango
fn validate_planned_stops(stops: &BTreeMap<String, Vec<PlannedStop>>) -> AppResult<()> {
    for (key, key_stops) in stops {
        for stop in key_stops {
            if let Err(mut error) = validate_coordinates(stop.latitude, stop.longitude) {
                warn!("⚠️ Parada {} de '{}' con coordenadas inválidas", stop.bin_id, key);
                error.add_param("bin_id".into(), &stop.bin_id);
                let mut errors = ValidationErrors::new();
                errors.add("stops", error);
                return Err(AppError::Validation(errors));
            }
        }
    }
    Ok(())
}

pub struct RouteReconciler {
    repository: Arc<dyn RouteRepository>,
    clock: Arc<dyn Clock>,
    schedule: StopSchedule,
}

impl RouteReconciler {
    pub fn new(repository: Arc<dyn RouteRepository>, clock: Arc<dyn Clock>, schedule: StopSchedule) -> Self {
        Self {
            repository,
            clock,
            schedule,
        }
    }

    async fn resolve_existing(&self, key: &str, date: NaiveDate) -> AppResult<Option<RoutePlan>> {
        if let Ok(plan_id) = Uuid::parse_str(key) {
            if let Some(plan) = self.repository.find_plan(plan_id).await? {
                return Ok(Some(plan));
            }
        }
        self.repository.find_plan_by_key(date, key).await
    }

    pub async fn save_planned_routes(
        &self,
        stops: &BTreeMap<String, Vec<PlannedStop>>,
        assignments: &BTreeMap<String, OfficerId>,
        actor: &str,
        date: NaiveDate,
    ) -> AppResult<ReconcileSummary> {
        validate_planned_stops(stops)?;

        let now = self.clock.now();
        let keys: BTreeSet<&String> = stops.keys().chain(assignments.keys()).collect();

        let mut batch = ReconcileBatch::default();
        let mut summary = ReconcileSummary::default();

        for key in keys {
            let officer = assignments.get(key);
            let key_stops = stops.get(key).map(Vec::as_slice).unwrap_or(&[]);

            if let Some(existing) = self.resolve_existing(key, date).await? {
                if !key_stops.is_empty() {
                    debug!(
                        "Ruta {} ya existe; se ignoran {} paradas recibidas para '{}'",
                        existing.id,
                        key_stops.len(),
                        key
                    );
                }
                if let Some(officer) = officer {
                    batch.assignment_upserts.push(RouteAssignment {
                        plan_id: existing.id,
                        assigned_to: officer.clone(),
                        assigned_by: actor.to_string(),
                        assigned_at: now,
                    });
                    summary.assignments_upserted += 1;
                }
                summary.plan_ids.insert(key.clone(), existing.id);
                continue;
            }

            if key_stops.is_empty() {
                warn!("⚠️ Clave de ruta '{}' sin paradas ni ruta existente, se ignora", key);
                continue;
            }

            let plan_id = Uuid::new_v4();
            let mut ordered: Vec<&PlannedStop> = key_stops.iter().collect();
            ordered.sort_by_key(|s| s.stop_number);

            let route_stops: Vec<RouteStop> = ordered
                .into_iter()
                .enumerate()
                .map(|(index, planned)| {
                    let sequence = index as i32 + 1;
                    RouteStop {
                        id: Uuid::new_v4(),
                        plan_id,
                        bin_id: planned.bin_id.clone(),
                        sequence,
                        planned_time: Some(self.schedule.planned_time(date, sequence)),
                        issue_log: None,
                    }
                })
                .collect();

            let assignment = officer.map(|officer| RouteAssignment {
                plan_id,
                assigned_to: officer.clone(),
                assigned_by: actor.to_string(),
                assigned_at: now,
            });

            summary.plans_created += 1;
            summary.stops_created += route_stops.len();
            if assignment.is_some() {
                summary.assignments_upserted += 1;
            }
            summary.plan_ids.insert(key.clone(), plan_id);

            batch.new_plans.push(NewRoutePlan {
                plan: RoutePlan {
                    id: plan_id,
                    planned_date: date,
                    status: RouteStatus::Scheduled,
                    created_by: actor.to_string(),
                    route_key: key.clone(),
                    created_at: now,
                },
                stops: route_stops,
                assignment,
            });
        }

        if !batch.is_empty() {
            self.repository.apply_reconciliation(batch).await?;
        }

        info!(
            "💾 Rutas guardadas para {}: {} nuevas, {} paradas, {} asignaciones",
            date, summary.plans_created, summary.stops_created, summary.assignments_upserted
        );
        Ok(summary)
    }
}
