//! Collection Lifecycle
//!
//! Máquina de estados de un agente recorriendo su ruta del día:
//!
//! * cada confirmación añade un `CollectionEvent` (nunca se modifican);
//! * la ruta avanza `Scheduled → In Progress → Completed` y no retrocede;
//! * una ruta está `Completed` cuando todas sus paradas tienen al menos un
//!   evento `Collected`.
//!
//! Una parada de otro agente y una parada inexistente dan el mismo resultado
//! (`None`), nunca un error.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dto::collection_dto::{ConfirmationOutcome, ConfirmationView, NextStopView, NextStopsView};
use crate::dto::route_dto::{DailyRoute, RouteStopView, RouteView, StopLocation};
use crate::models::collection::latest_event;
use crate::models::{
    Bin, CollectionEvent, CollectionStatus, OfficerId, RoutePlan, RouteStatus, RouteStop,
};
use crate::repositories::RouteRepository;
use crate::services::clock::Clock;
use crate::utils::errors::{validation_error, AppResult};
use crate::utils::validation::validate_fill_level;

/// Límite por defecto de `get_next_stops`
pub const DEFAULT_NEXT_STOPS_LIMIT: usize = 5;

/// Paradas con al menos un evento `Collected`
pub fn collected_stop_ids(events: &[CollectionEvent]) -> HashSet<Uuid> {
    events
        .iter()
        .filter(|e| e.is_collected())
        .map(|e| e.stop_id)
        .collect()
}

/// Estado agregado de una ruta a partir de sus paradas recogidas
pub fn aggregate_status(stops: &[RouteStop], collected: &HashSet<Uuid>) -> RouteStatus {
    let done = stops.iter().filter(|s| collected.contains(&s.id)).count();
    if !stops.is_empty() && done == stops.len() {
        RouteStatus::Completed
    } else if done > 0 {
        RouteStatus::InProgress
    } else {
        RouteStatus::Scheduled
    }
}

/// Primera parada sin recoger por delante de `after_sequence`. Las paradas
/// anteriores que se saltaron no cuentan (siguen en `get_next_stops`).
pub fn next_pending_stop<'a>(
    stops: &'a [RouteStop],
    collected: &HashSet<Uuid>,
    after_sequence: i32,
) -> Option<&'a RouteStop> {
    stops
        .iter()
        .filter(|s| s.sequence > after_sequence && !collected.contains(&s.id))
        .min_by_key(|s| s.sequence)
}

struct OwnedStop {
    stop: RouteStop,
    plan: RoutePlan,
}

pub struct CollectionService {
    repository: Arc<dyn RouteRepository>,
    clock: Arc<dyn Clock>,
}

impl CollectionService {
    pub fn new(repository: Arc<dyn RouteRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Parada cuya ruta está asignada a `officer`; con `today_only` además
    /// la ruta tiene que ser de hoy
    async fn owned_stop(
        &self,
        stop_id: Uuid,
        officer: &OfficerId,
        today_only: bool,
    ) -> AppResult<Option<OwnedStop>> {
        let Some(stop) = self.repository.find_stop(stop_id).await? else {
            return Ok(None);
        };
        let Some(plan) = self.repository.find_plan(stop.plan_id).await? else {
            return Ok(None);
        };
        if today_only && plan.planned_date != self.clock.today() {
            return Ok(None);
        }
        match self.repository.find_assignment(plan.id).await? {
            Some(assignment) if &assignment.assigned_to == officer => Ok(Some(OwnedStop { stop, plan })),
            _ => Ok(None),
        }
    }

    async fn bins_by_id(&self, stops: &[RouteStop]) -> AppResult<HashMap<String, Bin>> {
        let ids: Vec<String> = stops.iter().map(|s| s.bin_id.clone()).collect();
        Ok(self
            .repository
            .find_bins(&ids)
            .await?
            .into_iter()
            .map(|b| (b.id.clone(), b))
            .collect())
    }

    async fn today_plans(&self, officer: &OfficerId) -> AppResult<Vec<RoutePlan>> {
        self.repository
            .find_assigned_plans(officer, Some(self.clock.today()))
            .await
    }

    fn next_stop_view(stop: &RouteStop, bins: &HashMap<String, Bin>) -> NextStopView {
        NextStopView {
            stop_id: stop.id,
            sequence: stop.sequence,
            location: StopLocation::for_bin(&stop.bin_id, bins.get(&stop.bin_id)),
            planned_time: stop.planned_time,
        }
    }

    /// Ruta de hoy del agente, o `DailyRoute::NoRoute`
    pub async fn get_daily_route(&self, officer: &OfficerId) -> AppResult<DailyRoute> {
        let Some(plan) = self.today_plans(officer).await?.into_iter().next() else {
            debug!("Agente {} sin ruta para hoy", officer);
            return Ok(DailyRoute::NoRoute);
        };

        let stops = self.repository.find_stops(plan.id).await?;
        let stop_ids: Vec<Uuid> = stops.iter().map(|s| s.id).collect();
        let events = self.repository.find_events(&stop_ids).await?;
        let bins = self.bins_by_id(&stops).await?;
        let collected = collected_stop_ids(&events);

        let mut previous_time: Option<DateTime<Utc>> = None;
        let views: Vec<RouteStopView> = stops
            .iter()
            .map(|stop| {
                let latest = latest_event(events.iter().filter(|e| e.stop_id == stop.id));
                let minutes_from_previous = match (previous_time, stop.planned_time) {
                    (Some(prev), Some(current)) => (current - prev).num_minutes(),
                    _ => 0,
                };
                previous_time = stop.planned_time;
                RouteStopView {
                    stop_id: stop.id,
                    sequence: stop.sequence,
                    location: StopLocation::for_bin(&stop.bin_id, bins.get(&stop.bin_id)),
                    planned_time: stop.planned_time,
                    collection_status: latest.map(|e| e.status),
                    fill_level: latest.map(|e| e.fill_level),
                    minutes_from_previous,
                    issue_log: stop.issue_log.clone(),
                }
            })
            .collect();

        Ok(DailyRoute::Assigned(RouteView {
            plan_id: plan.id,
            planned_date: plan.planned_date,
            status: plan.status,
            total_stops: stops.len(),
            collected_stops: stops.iter().filter(|s| collected.contains(&s.id)).count(),
            stops: views,
        }))
    }

    /// Datos para la pantalla de confirmación; `None` si la parada no es del agente
    pub async fn get_collection_confirmation(
        &self,
        stop_id: Uuid,
        officer: &OfficerId,
    ) -> AppResult<Option<ConfirmationView>> {
        let Some(OwnedStop { stop, plan }) = self.owned_stop(stop_id, officer, false).await? else {
            return Ok(None);
        };

        let events = self.repository.find_events(&[stop.id]).await?;
        let latest = latest_event(&events);
        let bins = self.bins_by_id(std::slice::from_ref(&stop)).await?;

        Ok(Some(ConfirmationView {
            stop_id: stop.id,
            plan_id: plan.id,
            sequence: stop.sequence,
            location: StopLocation::for_bin(&stop.bin_id, bins.get(&stop.bin_id)),
            planned_time: stop.planned_time,
            last_fill_level: latest.map(|e| e.fill_level),
            last_status: latest.map(|e| e.status),
            last_recorded_at: latest.map(|e| e.recorded_at),
        }))
    }

    /// Estado actual tras una confirmación ya registrada con `event_id`.
    /// Sin `plan_status` se relee la ruta.
    async fn outcome_for(
        &self,
        stop: &RouteStop,
        plan_id: Uuid,
        event_id: Uuid,
        duplicate: bool,
        plan_status: Option<RouteStatus>,
    ) -> AppResult<ConfirmationOutcome> {
        let stops = self.repository.find_stops(plan_id).await?;
        let stop_ids: Vec<Uuid> = stops.iter().map(|s| s.id).collect();
        let collected = collected_stop_ids(&self.repository.find_events(&stop_ids).await?);
        let plan_status = match plan_status {
            Some(status) => status,
            None => self
                .repository
                .find_plan(plan_id)
                .await?
                .map(|p| p.status)
                .unwrap_or_else(|| aggregate_status(&stops, &collected)),
        };
        let bins = self.bins_by_id(&stops).await?;

        Ok(ConfirmationOutcome {
            stop_id: stop.id,
            event_id,
            plan_status,
            duplicate,
            next_stop: next_pending_stop(&stops, &collected, stop.sequence)
                .map(|next| Self::next_stop_view(next, &bins)),
        })
    }

    /// Registra la recogida de una parada de la ruta de hoy del agente.
    ///
    /// `None` si la parada no existe, no es del agente o no es de hoy. Un
    /// `token` ya usado para la misma parada devuelve el resultado actual sin
    /// añadir otro evento.
    pub async fn confirm_collection(
        &self,
        stop_id: Uuid,
        fill_level: i32,
        remarks: Option<String>,
        officer: &OfficerId,
        token: Option<String>,
    ) -> AppResult<Option<ConfirmationOutcome>> {
        if validate_fill_level(fill_level).is_err() {
            return Err(validation_error("fill_level", "must be between 0 and 100"));
        }

        let Some(OwnedStop { stop, plan }) = self.owned_stop(stop_id, officer, true).await? else {
            warn!("⚠️ Confirmación rechazada: parada {} no encontrada para {}", stop_id, officer);
            return Ok(None);
        };

        let token = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        if let Some(token) = token.as_deref() {
            if let Some(prior) = self.repository.find_event_by_token(stop.id, token).await? {
                debug!("Token {} ya usado en la parada {}", token, stop.id);
                return self.outcome_for(&stop, plan.id, prior.id, true, None).await.map(Some);
            }
        }

        let event = CollectionEvent {
            id: Uuid::new_v4(),
            stop_id: stop.id,
            fill_level,
            status: CollectionStatus::Collected,
            recorded_at: self.clock.now(),
            issue_log: remarks.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            confirmation_token: token.clone(),
        };
        let event_id = event.id;

        let Some(plan_status) = self.repository.record_collection(event, plan.id).await? else {
            // Otra petición con el mismo token se adelantó
            if let Some(prior) = match token.as_deref() {
                Some(token) => self.repository.find_event_by_token(stop.id, token).await?,
                None => None,
            } {
                return self.outcome_for(&stop, plan.id, prior.id, true, None).await.map(Some);
            }
            return Ok(None);
        };

        let outcome = self
            .outcome_for(&stop, plan.id, event_id, false, Some(plan_status))
            .await?;

        info!(
            "✅ Parada {} (#{}) recogida por {}: ruta {} → {}",
            stop.id, stop.sequence, officer, plan.id, plan_status
        );
        Ok(Some(outcome))
    }

    /// Próximas paradas sin recoger de la ruta de hoy no completada
    pub async fn get_next_stops(
        &self,
        officer: &OfficerId,
        limit: usize,
    ) -> AppResult<Option<NextStopsView>> {
        let Some(plan) = self
            .today_plans(officer)
            .await?
            .into_iter()
            .find(|p| p.status != RouteStatus::Completed)
        else {
            return Ok(None);
        };

        let stops = self.repository.find_stops(plan.id).await?;
        let stop_ids: Vec<Uuid> = stops.iter().map(|s| s.id).collect();
        let collected = collected_stop_ids(&self.repository.find_events(&stop_ids).await?);

        let pending: Vec<RouteStop> = stops
            .into_iter()
            .filter(|s| !collected.contains(&s.id))
            .collect();
        let bins = self.bins_by_id(&pending).await?;

        Ok(Some(NextStopsView {
            plan_id: plan.id,
            pending_count: pending.len(),
            stops: pending
                .iter()
                .take(limit)
                .map(|s| Self::next_stop_view(s, &bins))
                .collect(),
        }))
    }
}
