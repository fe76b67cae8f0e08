//! Repositorio en memoria
//!
//! Mismo contrato que el repositorio PostgreSQL. Un único `RwLock` serializa
//! las escrituras, lo que da la misma atomicidad que una transacción.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ReconcileBatch, RouteRepository};
use crate::models::{
    Bin, CollectionEvent, OfficerId, RouteAssignment, RoutePlan, RouteStatus, RouteStop,
};
use crate::utils::errors::{AppError, AppResult};

#[derive(Debug, Default)]
struct Store {
    bins: BTreeMap<String, Bin>,
    plans: HashMap<Uuid, RoutePlan>,
    stops: HashMap<Uuid, RouteStop>,
    assignments: HashMap<Uuid, RouteAssignment>,
    events: Vec<CollectionEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRouteRepository {
    inner: Arc<RwLock<Store>>,
}

impl InMemoryRouteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alta o reemplazo de un contenedor (el CRUD real vive fuera del núcleo)
    pub async fn upsert_bin(&self, bin: Bin) {
        self.inner.write().await.bins.insert(bin.id.clone(), bin);
    }

    /// Repositorio precargado con un array JSON de contenedores
    pub async fn with_bins_json(json: &str) -> Result<Self, serde_json::Error> {
        let bins: Vec<Bin> = serde_json::from_str(json)?;
        let repository = Self::new();
        {
            let mut store = repository.inner.write().await;
            for bin in bins {
                store.bins.insert(bin.id.clone(), bin);
            }
        }
        Ok(repository)
    }

    pub async fn bin_count(&self) -> usize {
        self.inner.read().await.bins.len()
    }

    pub async fn plan_count(&self) -> usize {
        self.inner.read().await.plans.len()
    }

    pub async fn stop_count(&self) -> usize {
        self.inner.read().await.stops.len()
    }

    pub async fn event_count(&self) -> usize {
        self.inner.read().await.events.len()
    }
}

#[async_trait]
impl RouteRepository for InMemoryRouteRepository {
    async fn list_active_bins(&self) -> AppResult<Vec<Bin>> {
        let store = self.inner.read().await;
        Ok(store.bins.values().filter(|b| b.is_active()).cloned().collect())
    }

    async fn find_bins(&self, ids: &[String]) -> AppResult<Vec<Bin>> {
        let store = self.inner.read().await;
        Ok(ids.iter().filter_map(|id| store.bins.get(id).cloned()).collect())
    }

    async fn find_plan(&self, plan_id: Uuid) -> AppResult<Option<RoutePlan>> {
        Ok(self.inner.read().await.plans.get(&plan_id).cloned())
    }

    async fn find_plan_by_key(&self, date: NaiveDate, route_key: &str) -> AppResult<Option<RoutePlan>> {
        let store = self.inner.read().await;
        Ok(store
            .plans
            .values()
            .find(|p| p.planned_date == date && p.route_key == route_key)
            .cloned())
    }

    async fn find_assigned_plans(
        &self,
        officer: &OfficerId,
        date: Option<NaiveDate>,
    ) -> AppResult<Vec<RoutePlan>> {
        let store = self.inner.read().await;
        let mut plans: Vec<RoutePlan> = store
            .assignments
            .values()
            .filter(|a| &a.assigned_to == officer)
            .filter_map(|a| store.plans.get(&a.plan_id))
            .filter(|p| date.map_or(true, |d| p.planned_date == d))
            .cloned()
            .collect();
        plans.sort_by(|a, b| {
            b.planned_date
                .cmp(&a.planned_date)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(plans)
    }

    async fn find_assignment(&self, plan_id: Uuid) -> AppResult<Option<RouteAssignment>> {
        Ok(self.inner.read().await.assignments.get(&plan_id).cloned())
    }

    async fn find_stops(&self, plan_id: Uuid) -> AppResult<Vec<RouteStop>> {
        let store = self.inner.read().await;
        let mut stops: Vec<RouteStop> = store
            .stops
            .values()
            .filter(|s| s.plan_id == plan_id)
            .cloned()
            .collect();
        stops.sort_by_key(|s| s.sequence);
        Ok(stops)
    }

    async fn find_stop(&self, stop_id: Uuid) -> AppResult<Option<RouteStop>> {
        Ok(self.inner.read().await.stops.get(&stop_id).cloned())
    }

    async fn find_events(&self, stop_ids: &[Uuid]) -> AppResult<Vec<CollectionEvent>> {
        let store = self.inner.read().await;
        let mut events: Vec<CollectionEvent> = store
            .events
            .iter()
            .filter(|e| stop_ids.contains(&e.stop_id))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.recorded_at);
        Ok(events)
    }

    async fn find_event_by_token(&self, stop_id: Uuid, token: &str) -> AppResult<Option<CollectionEvent>> {
        let store = self.inner.read().await;
        Ok(store
            .events
            .iter()
            .find(|e| e.stop_id == stop_id && e.confirmation_token.as_deref() == Some(token))
            .cloned())
    }

    async fn apply_reconciliation(&self, batch: ReconcileBatch) -> AppResult<()> {
        let mut store = self.inner.write().await;

        // Validar todo antes de escribir para no dejar el store a medias
        for new_plan in &batch.new_plans {
            let plan = &new_plan.plan;
            if store.plans.contains_key(&plan.id)
                || store
                    .plans
                    .values()
                    .any(|p| p.planned_date == plan.planned_date && p.route_key == plan.route_key)
            {
                return Err(AppError::Internal(format!(
                    "route plan for key '{}' on {} already exists",
                    plan.route_key, plan.planned_date
                )));
            }
        }
        for upsert in &batch.assignment_upserts {
            if !store.plans.contains_key(&upsert.plan_id) {
                return Err(AppError::NotFound(format!("route plan {}", upsert.plan_id)));
            }
        }

        for new_plan in batch.new_plans {
            for stop in new_plan.stops {
                store.stops.insert(stop.id, stop);
            }
            if let Some(assignment) = new_plan.assignment {
                store.assignments.insert(assignment.plan_id, assignment);
            }
            store.plans.insert(new_plan.plan.id, new_plan.plan);
        }
        for upsert in batch.assignment_upserts {
            store.assignments.insert(upsert.plan_id, upsert);
        }
        Ok(())
    }

    async fn record_collection(
        &self,
        event: CollectionEvent,
        plan_id: Uuid,
    ) -> AppResult<Option<RouteStatus>> {
        let mut store = self.inner.write().await;

        if let Some(token) = event.confirmation_token.as_deref() {
            let duplicate = store
                .events
                .iter()
                .any(|e| e.stop_id == event.stop_id && e.confirmation_token.as_deref() == Some(token));
            if duplicate {
                return Ok(None);
            }
        }
        if !store.plans.contains_key(&plan_id) {
            return Err(AppError::NotFound(format!("route plan {}", plan_id)));
        }

        store.events.push(event);

        // Con el guard de escritura tomado, el estado se calcula sobre todo
        // lo confirmado hasta ahora
        let collected: HashSet<Uuid> = store
            .events
            .iter()
            .filter(|e| e.is_collected())
            .map(|e| e.stop_id)
            .collect();
        let all_collected = store
            .stops
            .values()
            .filter(|s| s.plan_id == plan_id)
            .all(|s| collected.contains(&s.id));
        let target = if all_collected {
            RouteStatus::Completed
        } else {
            RouteStatus::InProgress
        };

        let plan = store
            .plans
            .get_mut(&plan_id)
            .ok_or_else(|| AppError::NotFound(format!("route plan {}", plan_id)))?;
        plan.status = plan.status.advance_to(target);
        Ok(Some(plan.status))
    }

    async fn update_stop_issue_log(&self, stop_id: Uuid, issue_log: &str) -> AppResult<()> {
        let mut store = self.inner.write().await;
        let stop = store
            .stops
            .get_mut(&stop_id)
            .ok_or_else(|| AppError::NotFound(format!("route stop {}", stop_id)))?;
        stop.issue_log = Some(issue_log.to_string());
        Ok(())
    }

    async fn update_event_issue_log(&self, event_id: Uuid, issue_log: &str) -> AppResult<()> {
        let mut store = self.inner.write().await;
        let event = store
            .events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(|| AppError::NotFound(format!("collection event {}", event_id)))?;
        event.issue_log = Some(issue_log.to_string());
        Ok(())
    }
}
