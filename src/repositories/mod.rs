//! Repositorios
//!
//! `RouteRepository` es la frontera con el almacén relacional. Los
//! servicios solo conocen el trait; `PgRouteRepository` lo implementa sobre
//! PostgreSQL y `InMemoryRouteRepository` en memoria (tests y arranque sin
//! base de datos).

pub mod memory_repository;
pub mod postgres_repository;

pub use memory_repository::InMemoryRouteRepository;
pub use postgres_repository::PgRouteRepository;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    Bin, CollectionEvent, OfficerId, RouteAssignment, RoutePlan, RouteStatus, RouteStop,
};
use crate::utils::errors::AppResult;

/// Ruta nueva con sus paradas y, opcionalmente, su asignación
#[derive(Debug, Clone)]
pub struct NewRoutePlan {
    pub plan: RoutePlan,
    pub stops: Vec<RouteStop>,
    pub assignment: Option<RouteAssignment>,
}

/// Cambios de una reconciliación, aplicados en una sola transacción
#[derive(Debug, Clone, Default)]
pub struct ReconcileBatch {
    pub new_plans: Vec<NewRoutePlan>,
    pub assignment_upserts: Vec<RouteAssignment>,
}

impl ReconcileBatch {
    pub fn is_empty(&self) -> bool {
        self.new_plans.is_empty() && self.assignment_upserts.is_empty()
    }
}

#[async_trait]
pub trait RouteRepository: Send + Sync {
    /// Contenedores activos
    async fn list_active_bins(&self) -> AppResult<Vec<Bin>>;

    async fn find_bins(&self, ids: &[String]) -> AppResult<Vec<Bin>>;

    async fn find_plan(&self, plan_id: Uuid) -> AppResult<Option<RoutePlan>>;

    async fn find_plan_by_key(&self, date: NaiveDate, route_key: &str) -> AppResult<Option<RoutePlan>>;

    /// Rutas asignadas al agente; `date = None` devuelve todo el histórico.
    /// Orden: fecha descendente, luego creación ascendente.
    async fn find_assigned_plans(
        &self,
        officer: &OfficerId,
        date: Option<NaiveDate>,
    ) -> AppResult<Vec<RoutePlan>>;

    async fn find_assignment(&self, plan_id: Uuid) -> AppResult<Option<RouteAssignment>>;

    /// Paradas de una ruta ordenadas por secuencia
    async fn find_stops(&self, plan_id: Uuid) -> AppResult<Vec<RouteStop>>;

    async fn find_stop(&self, stop_id: Uuid) -> AppResult<Option<RouteStop>>;

    /// Eventos de las paradas dadas, en orden cronológico
    async fn find_events(&self, stop_ids: &[Uuid]) -> AppResult<Vec<CollectionEvent>>;

    async fn find_event_by_token(&self, stop_id: Uuid, token: &str) -> AppResult<Option<CollectionEvent>>;

    /// Crea rutas/paradas/asignaciones y actualiza asignaciones existentes
    async fn apply_reconciliation(&self, batch: ReconcileBatch) -> AppResult<()>;

    /// Inserta el evento y, en la misma transacción, recalcula el estado de
    /// la ruta: `Completed` si todas sus paradas tienen un `Collected`, si no
    /// `In Progress` (nunca retrocede). Devuelve el estado resultante, o
    /// `None` si el token de confirmación ya existía.
    async fn record_collection(
        &self,
        event: CollectionEvent,
        plan_id: Uuid,
    ) -> AppResult<Option<RouteStatus>>;

    async fn update_stop_issue_log(&self, stop_id: Uuid, issue_log: &str) -> AppResult<()>;

    async fn update_event_issue_log(&self, event_id: Uuid, issue_log: &str) -> AppResult<()>;
}
