//! Issue Lifecycle
//!
//! Incidencias reportadas en campo sobre una parada. Cada incidencia sigue
//! `Open → In Progress → Resolved`, independiente del estado de recogida.
//! Solo se transiciona la entrada más reciente del log elegido.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::dto::issue_dto::{
    IssueCounts, IssueQuery, IssueRecord, IssueSource, IssueView, SelectableBin,
};
use crate::models::collection::latest_event;
use crate::models::issue::{MAX_DESCRIPTION_LEN, MAX_ISSUE_TYPE_LEN};
use crate::models::{
    Bin, IssueEntry, IssueLog, IssueSeverity, IssueStatus, OfficerId, RoutePlan, RouteStop,
};
use crate::repositories::RouteRepository;
use crate::services::clock::Clock;
use crate::utils::errors::{bad_request_error, validation_error, AppResult};

pub const MSG_ALREADY_RESOLVED: &str = "Issue is already resolved.";
pub const MSG_STOP_NOT_FOUND: &str = "Stop not found.";
pub const MSG_NO_ISSUE: &str = "No issue reported for this stop.";

/// Filtro exacto; vacío o "All" no filtra. `Err` si el valor no es válido.
fn parse_filter<T: FromStr>(value: Option<&str>) -> Result<Option<T>, ()> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("all") => Ok(None),
        Some(v) => v.parse::<T>().map(Some).map_err(|_| ()),
    }
}

fn matches_search(record: &IssueRecord, needle: &str) -> bool {
    let contains = |value: &str| value.to_lowercase().contains(needle);
    contains(&record.issue_type)
        || contains(&record.description)
        || contains(&record.bin_id)
        || record.location.as_deref().is_some_and(contains)
        || record.address.as_deref().is_some_and(contains)
}

/// Aplica búsqueda libre y filtros de estado y severidad
pub fn filter_issues(records: Vec<IssueRecord>, query: &IssueQuery) -> Vec<IssueRecord> {
    let status = parse_filter::<IssueStatus>(query.status.as_deref());
    let severity = parse_filter::<IssueSeverity>(query.priority.as_deref());
    let (Ok(status), Ok(severity)) = (status, severity) else {
        return Vec::new();
    };
    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    records
        .into_iter()
        .filter(|r| status.map_or(true, |s| r.status == s))
        .filter(|r| severity.map_or(true, |s| r.severity == s))
        .filter(|r| needle.as_deref().map_or(true, |n| matches_search(r, n)))
        .collect()
}

pub struct IssueService {
    repository: Arc<dyn RouteRepository>,
    clock: Arc<dyn Clock>,
}

impl IssueService {
    pub fn new(repository: Arc<dyn RouteRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
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

    fn record(
        entry: &IssueEntry,
        stop: &RouteStop,
        plan: &RoutePlan,
        bin: Option<&Bin>,
        source: IssueSource,
    ) -> IssueRecord {
        IssueRecord {
            stop_id: stop.id,
            plan_id: plan.id,
            planned_date: plan.planned_date,
            bin_id: stop.bin_id.clone(),
            location: bin.and_then(|b| b.region.clone()),
            address: bin.and_then(|b| b.address.clone()),
            issue_type: entry.issue_type.clone(),
            severity: entry.severity,
            status: entry.status,
            description: entry.description.clone(),
            reported_at: entry.reported_at,
            inferred: entry.inferred,
            source,
        }
    }

    /// Contenedores de hoy para reportar y el histórico de incidencias del agente
    pub async fn get_report_issue_view(
        &self,
        officer: &OfficerId,
        query: &IssueQuery,
    ) -> AppResult<IssueView> {
        let today = self.clock.today();
        let plans = self.repository.find_assigned_plans(officer, None).await?;

        let mut stops_by_plan: Vec<(RoutePlan, Vec<RouteStop>)> = Vec::with_capacity(plans.len());
        for plan in plans {
            let stops = self.repository.find_stops(plan.id).await?;
            stops_by_plan.push((plan, stops));
        }

        let all_stops: Vec<RouteStop> = stops_by_plan
            .iter()
            .flat_map(|(_, stops)| stops.iter().cloned())
            .collect();
        let bins = self.bins_by_id(&all_stops).await?;
        let stop_ids: Vec<Uuid> = all_stops.iter().map(|s| s.id).collect();
        let events = self.repository.find_events(&stop_ids).await?;

        let mut bins_today = Vec::new();
        let mut records = Vec::new();
        for (plan, stops) in &stops_by_plan {
            for stop in stops {
                let bin = bins.get(&stop.bin_id);
                if plan.planned_date == today {
                    bins_today.push(SelectableBin {
                        stop_id: stop.id,
                        bin_id: stop.bin_id.clone(),
                        sequence: stop.sequence,
                        location: bin.and_then(|b| b.region.clone()),
                        address: bin.and_then(|b| b.address.clone()),
                    });
                }

                let stop_log = IssueLog::from_optional(stop.issue_log.as_deref());
                records.extend(
                    stop_log
                        .entries()
                        .iter()
                        .map(|e| Self::record(e, stop, plan, bin, IssueSource::Stop)),
                );

                // En los eventos solo cuentan entradas estructuradas; el resto son observaciones
                for event in events.iter().filter(|e| e.stop_id == stop.id) {
                    let event_log = IssueLog::from_optional(event.issue_log.as_deref());
                    records.extend(
                        event_log
                            .entries()
                            .iter()
                            .filter(|e| e.is_structured())
                            .map(|e| Self::record(e, stop, plan, bin, IssueSource::CollectionEvent)),
                    );
                }
            }
        }

        records.sort_by(|a, b| {
            b.planned_date
                .cmp(&a.planned_date)
                .then(b.reported_at.cmp(&a.reported_at))
        });
        let issues = filter_issues(records, query);
        let counts = IssueCounts::tally(&issues);

        debug!(
            "Vista de incidencias para {}: {} contenedores hoy, {} incidencias",
            officer,
            bins_today.len(),
            counts.total
        );
        Ok(IssueView {
            bins: bins_today,
            issues,
            counts,
        })
    }

    /// Añade una incidencia abierta a la parada del contenedor en la ruta de
    /// hoy. `false` si el contenedor no está en la ruta de hoy del agente.
    pub async fn submit_issue(
        &self,
        bin_id: &str,
        issue_type: &str,
        severity: IssueSeverity,
        description: &str,
        officer: &OfficerId,
    ) -> AppResult<bool> {
        if issue_type.trim().is_empty() {
            return Err(bad_request_error("issue type is required"));
        }
        if issue_type.trim().chars().count() > MAX_ISSUE_TYPE_LEN {
            return Err(validation_error("issue_type", "must be at most 100 characters"));
        }
        if description.trim().chars().count() > MAX_DESCRIPTION_LEN {
            return Err(validation_error("description", "must be at most 1000 characters"));
        }

        let bin_id = bin_id.trim();
        let plans = self
            .repository
            .find_assigned_plans(officer, Some(self.clock.today()))
            .await?;

        let mut target = None;
        for plan in &plans {
            let stops = self.repository.find_stops(plan.id).await?;
            if let Some(stop) = stops.into_iter().find(|s| s.bin_id == bin_id) {
                target = Some(stop);
                break;
            }
        }

        let Some(stop) = target else {
            debug!("Contenedor {} no está en la ruta de hoy de {}", bin_id, officer);
            return Ok(false);
        };

        let mut log = IssueLog::from_optional(stop.issue_log.as_deref());
        log.push(IssueEntry::open(issue_type, severity, description, self.clock.now()));
        self.repository
            .update_stop_issue_log(stop.id, &log.render())
            .await?;

        info!(
            "🚩 Incidencia '{}' ({}) reportada por {} en el contenedor {}",
            issue_type.trim(),
            severity,
            officer,
            bin_id
        );
        Ok(true)
    }

    /// Avanza la incidencia más reciente de la parada y devuelve el nuevo
    /// estado o un mensaje fijo (`MSG_*`).
    pub async fn start_issue_work(&self, stop_id: Uuid, officer: &OfficerId) -> AppResult<String> {
        let Some(stop) = self.repository.find_stop(stop_id).await? else {
            return Ok(MSG_STOP_NOT_FOUND.to_string());
        };
        let owned = match self.repository.find_assignment(stop.plan_id).await? {
            Some(assignment) => &assignment.assigned_to == officer,
            None => false,
        };
        if !owned {
            return Ok(MSG_STOP_NOT_FOUND.to_string());
        }

        // El log del último evento manda si trae una incidencia
        let events = self.repository.find_events(&[stop.id]).await?;
        let event_log = latest_event(&events).and_then(|event| {
            let log = IssueLog::from_optional(event.issue_log.as_deref());
            log.has_structured_issue().then_some((event.id, log))
        });

        let (event_id, mut log) = match event_log {
            Some((event_id, log)) => (Some(event_id), log),
            None => (None, IssueLog::from_optional(stop.issue_log.as_deref())),
        };

        let Some(entry) = log.latest_mut() else {
            return Ok(MSG_NO_ISSUE.to_string());
        };
        let Some(next) = entry.status.next() else {
            return Ok(MSG_ALREADY_RESOLVED.to_string());
        };
        entry.set_status(next);

        let rendered = log.render();
        match event_id {
            Some(event_id) => self.repository.update_event_issue_log(event_id, &rendered).await?,
            None => self.repository.update_stop_issue_log(stop.id, &rendered).await?,
        }

        info!("🔧 Incidencia de la parada {} → {} ({})", stop.id, next, officer);
        Ok(next.as_str().to_string())
    }
}
