use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{ReconcileBatch, RouteRepository};
use crate::models::{
    Bin, CollectionEvent, OfficerId, RouteAssignment, RoutePlan, RouteStatus, RouteStop,
};
use crate::utils::errors::{AppError, AppResult};

// Structs de fila: el schema guarda los enums como TEXT

#[derive(Debug, sqlx::FromRow)]
struct BinRow {
    id: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    status: String,
    capacity: i32,
    region: Option<String>,
    address: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    planned_date: NaiveDate,
    status: String,
    created_by: String,
    route_key: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct StopRow {
    id: Uuid,
    plan_id: Uuid,
    bin_id: String,
    sequence: i32,
    planned_time: Option<DateTime<Utc>>,
    issue_log: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct AssignmentRow {
    plan_id: Uuid,
    assigned_to: String,
    assigned_by: String,
    assigned_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    stop_id: Uuid,
    fill_level: i32,
    status: String,
    recorded_at: DateTime<Utc>,
    issue_log: Option<String>,
    confirmation_token: Option<String>,
}

impl TryFrom<BinRow> for Bin {
    type Error = AppError;

    fn try_from(row: BinRow) -> Result<Self, Self::Error> {
        Ok(Bin {
            status: row.status.parse().map_err(AppError::Internal)?,
            id: row.id,
            latitude: row.latitude,
            longitude: row.longitude,
            capacity: row.capacity,
            region: row.region,
            address: row.address,
        })
    }
}

impl TryFrom<PlanRow> for RoutePlan {
    type Error = AppError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        Ok(RoutePlan {
            status: row.status.parse().map_err(AppError::Internal)?,
            id: row.id,
            planned_date: row.planned_date,
            created_by: row.created_by,
            route_key: row.route_key,
            created_at: row.created_at,
        })
    }
}

impl From<StopRow> for RouteStop {
    fn from(row: StopRow) -> Self {
        RouteStop {
            id: row.id,
            plan_id: row.plan_id,
            bin_id: row.bin_id,
            sequence: row.sequence,
            planned_time: row.planned_time,
            issue_log: row.issue_log,
        }
    }
}

impl TryFrom<AssignmentRow> for RouteAssignment {
    type Error = AppError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        let assigned_to = OfficerId::parse(&row.assigned_to).ok_or_else(|| {
            AppError::Internal(format!("empty officer on assignment for plan {}", row.plan_id))
        })?;
        Ok(RouteAssignment {
            plan_id: row.plan_id,
            assigned_to,
            assigned_by: row.assigned_by,
            assigned_at: row.assigned_at,
        })
    }
}

impl TryFrom<EventRow> for CollectionEvent {
    type Error = AppError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(CollectionEvent {
            status: row.status.parse().map_err(AppError::Internal)?,
            id: row.id,
            stop_id: row.stop_id,
            fill_level: row.fill_level,
            recorded_at: row.recorded_at,
            issue_log: row.issue_log,
            confirmation_token: row.confirmation_token,
        })
    }
}

/// Estado de la ruta tras insertar un evento, calculado con la fila de la
/// ruta bloqueada. Nunca baja de `Completed`.
const ADVANCE_PLAN_STATUS: &str = r#"
    UPDATE route_plans p
    SET status = CASE
        WHEN p.status = 'Completed' THEN 'Completed'
        WHEN NOT EXISTS (
            SELECT 1 FROM route_stops s
            WHERE s.plan_id = p.id
              AND NOT EXISTS (
                  SELECT 1 FROM collection_events e
                  WHERE e.stop_id = s.id AND e.status = 'Collected'
              )
        ) THEN 'Completed'
        ELSE 'In Progress'
    END
    WHERE p.id = $1
    RETURNING p.status
"#;

const PLAN_COLUMNS: &str = "p.id, p.planned_date, p.status, p.created_by, p.route_key, p.created_at";
const STOP_COLUMNS: &str = "id, plan_id, bin_id, sequence, planned_time, issue_log";
const EVENT_COLUMNS: &str =
    "id, stop_id, fill_level, status, recorded_at, issue_log, confirmation_token";

pub struct PgRouteRepository {
    pool: PgPool,
}

impl PgRouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert_assignment(
        tx: &mut Transaction<'_, Postgres>,
        assignment: &RouteAssignment,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO route_assignments (plan_id, assigned_to, assigned_by, assigned_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (plan_id)
            DO UPDATE SET assigned_to = EXCLUDED.assigned_to,
                          assigned_by = EXCLUDED.assigned_by,
                          assigned_at = EXCLUDED.assigned_at
            "#,
        )
        .bind(assignment.plan_id)
        .bind(assignment.assigned_to.as_str())
        .bind(&assignment.assigned_by)
        .bind(assignment.assigned_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl RouteRepository for PgRouteRepository {
    async fn list_active_bins(&self) -> AppResult<Vec<Bin>> {
        let rows = sqlx::query_as::<_, BinRow>(
            "SELECT id, latitude, longitude, status, capacity, region, address FROM bins WHERE status = 'active' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Bin::try_from).collect()
    }

    async fn find_bins(&self, ids: &[String]) -> AppResult<Vec<Bin>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, BinRow>(
            "SELECT id, latitude, longitude, status, capacity, region, address FROM bins WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Bin::try_from).collect()
    }

    async fn find_plan(&self, plan_id: Uuid) -> AppResult<Option<RoutePlan>> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {} FROM route_plans p WHERE p.id = $1",
            PLAN_COLUMNS
        ))
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(RoutePlan::try_from).transpose()
    }

    async fn find_plan_by_key(&self, date: NaiveDate, route_key: &str) -> AppResult<Option<RoutePlan>> {
        let row = sqlx::query_as::<_, PlanRow>(&format!(
            "SELECT {} FROM route_plans p WHERE p.planned_date = $1 AND p.route_key = $2",
            PLAN_COLUMNS
        ))
        .bind(date)
        .bind(route_key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(RoutePlan::try_from).transpose()
    }

    async fn find_assigned_plans(
        &self,
        officer: &OfficerId,
        date: Option<NaiveDate>,
    ) -> AppResult<Vec<RoutePlan>> {
        let rows = sqlx::query_as::<_, PlanRow>(&format!(
            r#"
            SELECT {}
            FROM route_plans p
            JOIN route_assignments a ON a.plan_id = p.id
            WHERE a.assigned_to = $1
              AND ($2::date IS NULL OR p.planned_date = $2)
            ORDER BY p.planned_date DESC, p.created_at ASC
            "#,
            PLAN_COLUMNS
        ))
        .bind(officer.as_str())
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RoutePlan::try_from).collect()
    }

    async fn find_assignment(&self, plan_id: Uuid) -> AppResult<Option<RouteAssignment>> {
        let row = sqlx::query_as::<_, AssignmentRow>(
            "SELECT plan_id, assigned_to, assigned_by, assigned_at FROM route_assignments WHERE plan_id = $1",
        )
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(RouteAssignment::try_from).transpose()
    }

    async fn find_stops(&self, plan_id: Uuid) -> AppResult<Vec<RouteStop>> {
        let rows = sqlx::query_as::<_, StopRow>(&format!(
            "SELECT {} FROM route_stops WHERE plan_id = $1 ORDER BY sequence",
            STOP_COLUMNS
        ))
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RouteStop::from).collect())
    }

    async fn find_stop(&self, stop_id: Uuid) -> AppResult<Option<RouteStop>> {
        let row = sqlx::query_as::<_, StopRow>(&format!(
            "SELECT {} FROM route_stops WHERE id = $1",
            STOP_COLUMNS
        ))
        .bind(stop_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RouteStop::from))
    }

    async fn find_events(&self, stop_ids: &[Uuid]) -> AppResult<Vec<CollectionEvent>> {
        if stop_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM collection_events WHERE stop_id = ANY($1) ORDER BY recorded_at",
            EVENT_COLUMNS
        ))
        .bind(stop_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CollectionEvent::try_from).collect()
    }

    async fn find_event_by_token(&self, stop_id: Uuid, token: &str) -> AppResult<Option<CollectionEvent>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM collection_events WHERE stop_id = $1 AND confirmation_token = $2",
            EVENT_COLUMNS
        ))
        .bind(stop_id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CollectionEvent::try_from).transpose()
    }

    async fn apply_reconciliation(&self, batch: ReconcileBatch) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        for new_plan in &batch.new_plans {
            let plan = &new_plan.plan;
            sqlx::query(
                r#"
                INSERT INTO route_plans (id, planned_date, status, created_by, route_key, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(plan.id)
            .bind(plan.planned_date)
            .bind(plan.status.as_str())
            .bind(&plan.created_by)
            .bind(&plan.route_key)
            .bind(plan.created_at)
            .execute(&mut *tx)
            .await?;

            for stop in &new_plan.stops {
                sqlx::query(
                    r#"
                    INSERT INTO route_stops (id, plan_id, bin_id, sequence, planned_time, issue_log)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(stop.id)
                .bind(stop.plan_id)
                .bind(&stop.bin_id)
                .bind(stop.sequence)
                .bind(stop.planned_time)
                .bind(&stop.issue_log)
                .execute(&mut *tx)
                .await?;
            }

            if let Some(assignment) = &new_plan.assignment {
                Self::upsert_assignment(&mut tx, assignment).await?;
            }
        }

        for assignment in &batch.assignment_upserts {
            Self::upsert_assignment(&mut tx, assignment).await?;
        }

        tx.commit().await?;
        log::debug!(
            "💾 Reconciliación aplicada: {} rutas nuevas, {} asignaciones actualizadas",
            batch.new_plans.len(),
            batch.assignment_upserts.len()
        );
        Ok(())
    }

    async fn record_collection(
        &self,
        event: CollectionEvent,
        plan_id: Uuid,
    ) -> AppResult<Option<RouteStatus>> {
        let mut tx = self.pool.begin().await?;

        // Bloquea la ruta: la confirmación concurrente espera aquí y después
        // ve el evento de esta transacción
        let locked: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM route_plans WHERE id = $1 FOR UPDATE")
                .bind(plan_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("route plan {}", plan_id)));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO collection_events (id, stop_id, fill_level, status, recorded_at, issue_log, confirmation_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (stop_id, confirmation_token) WHERE confirmation_token IS NOT NULL DO NOTHING
            "#,
        )
        .bind(event.id)
        .bind(event.stop_id)
        .bind(event.fill_level)
        .bind(event.status.as_str())
        .bind(event.recorded_at)
        .bind(&event.issue_log)
        .bind(&event.confirmation_token)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            log::info!("🔁 Confirmación duplicada para parada {}, se ignora", event.stop_id);
            tx.rollback().await?;
            return Ok(None);
        }

        let (status,): (String,) = sqlx::query_as(ADVANCE_PLAN_STATUS)
            .bind(plan_id)
            .fetch_one(&mut *tx)
            .await?;
        let status: RouteStatus = status.parse().map_err(AppError::Internal)?;

        tx.commit().await?;
        Ok(Some(status))
    }

    async fn update_stop_issue_log(&self, stop_id: Uuid, issue_log: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE route_stops SET issue_log = $2 WHERE id = $1")
            .bind(stop_id)
            .bind(issue_log)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("route stop {}", stop_id)));
        }
        Ok(())
    }

    async fn update_event_issue_log(&self, event_id: Uuid, issue_log: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE collection_events SET issue_log = $2 WHERE id = $1")
            .bind(event_id)
            .bind(issue_log)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("collection event {}", event_id)));
        }
        Ok(())
    }
}
