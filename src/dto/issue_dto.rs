use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{IssueSeverity, IssueStatus};

/// Alta de una incidencia sobre un contenedor de la ruta de hoy
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitIssueRequest {
    #[validate(custom = "crate::utils::validation::validate_not_empty")]
    pub bin_id: String,

    #[validate(length(min = 1, max = 100))]
    pub issue_type: String,

    pub severity: IssueSeverity,

    #[validate(length(max = 1000))]
    pub description: String,
}

/// Filtros de la vista de incidencias; "All" o vacío no filtra
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

/// De qué log sale la incidencia
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueSource {
    Stop,
    CollectionEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueRecord {
    pub stop_id: Uuid,
    pub plan_id: Uuid,
    pub planned_date: NaiveDate,
    pub bin_id: String,
    pub location: Option<String>,
    pub address: Option<String>,
    pub issue_type: String,
    pub severity: IssueSeverity,
    pub status: IssueStatus,
    pub description: String,
    pub reported_at: Option<DateTime<Utc>>,
    pub inferred: bool,
    pub source: IssueSource,
}

/// Contenedor de la ruta de hoy sobre el que se puede reportar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectableBin {
    pub stop_id: Uuid,
    pub bin_id: String,
    pub sequence: i32,
    pub location: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueCounts {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub resolved: usize,
}

impl IssueCounts {
    pub fn tally<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a IssueRecord>,
    {
        records.into_iter().fold(Self::default(), |mut counts, record| {
            counts.total += 1;
            match record.status {
                IssueStatus::Open => counts.open += 1,
                IssueStatus::InProgress => counts.in_progress += 1,
                IssueStatus::Resolved => counts.resolved += 1,
            }
            counts
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueView {
    pub bins: Vec<SelectableBin>,
    pub issues: Vec<IssueRecord>,
    pub counts: IssueCounts,
}
