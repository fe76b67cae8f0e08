//! Modelo de incidencias (Issue)
//!
//! Las incidencias se guardan como texto en el `issue_log` de una parada o
//! de un evento de recogida, una entrada por línea, la más reciente al
//! final:
//!
//! ```text
//! type: Damaged; severity: High; status: Open; description: lid broken; reported: 2024-05-01T08:00:00+00:00
//! ```
//!
//! Aquí se trabajan como registros tipados (`IssueEntry` dentro de un
//! `IssueLog`). Hay dos caminos de lectura, separados a propósito:
//!
//! * [`parse_structured`]: campos `clave: valor` reconocidos por regex.
//! * [`infer_legacy`]: texto libre antiguo, donde estado y severidad se
//!   deducen por palabras clave ("resolved", "progress", "high", "low").

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longitud máxima (bytes) de una entrada que se somete a las regex
pub const MAX_ENTRY_LEN: usize = 8_000;

/// Longitud máxima (caracteres) de la descripción de una incidencia nueva.
/// Con el tipo y el resto de campos la línea queda dentro de `MAX_ENTRY_LEN`.
pub const MAX_DESCRIPTION_LEN: usize = 1_000;

/// Longitud máxima (caracteres) del tipo de incidencia
pub const MAX_ISSUE_TYPE_LEN: usize = 100;

/// Límite de tamaño compilado para cada regex de campo
const REGEX_SIZE_LIMIT: usize = 1 << 16;

/// Tipo usado cuando una entrada legacy no declara `type:`
pub const UNKNOWN_ISSUE_TYPE: &str = "General";

lazy_static! {
    static ref TYPE_RE: Regex = field_regex("type");
    static ref SEVERITY_RE: Regex = field_regex("severity");
    static ref STATUS_RE: Regex = field_regex("status");
    static ref DESCRIPTION_RE: Regex = field_regex("description");
    static ref REPORTED_RE: Regex = field_regex("reported");
}

fn field_regex(key: &str) -> Regex {
    RegexBuilder::new(&format!(r"(?i)\b{}\s*:\s*([^;\n]*)", key))
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .unwrap_or_else(|e| panic!("invalid issue field regex for '{}': {}", key, e))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IssueStatus {
    #[serde(rename = "Open")]
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Resolved")]
    Resolved,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Open => "Open",
            IssueStatus::InProgress => "In Progress",
            IssueStatus::Resolved => "Resolved",
        }
    }

    /// Siguiente estado del ciclo; `None` cuando ya está resuelta
    pub fn next(self) -> Option<IssueStatus> {
        match self {
            IssueStatus::Open => Some(IssueStatus::InProgress),
            IssueStatus::InProgress => Some(IssueStatus::Resolved),
            IssueStatus::Resolved => None,
        }
    }

    /// Deducción por palabras clave ("resolved" gana a "progress")
    pub fn infer(text: &str) -> IssueStatus {
        let lower = text.to_lowercase();
        if lower.contains("resolved") {
            IssueStatus::Resolved
        } else if lower.contains("progress") {
            IssueStatus::InProgress
        } else {
            IssueStatus::Open
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "open" => Ok(IssueStatus::Open),
            "in progress" | "inprogress" => Ok(IssueStatus::InProgress),
            "resolved" => Ok(IssueStatus::Resolved),
            other => Err(format!("unknown issue status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
}

impl IssueSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueSeverity::Low => "Low",
            IssueSeverity::Medium => "Medium",
            IssueSeverity::High => "High",
        }
    }

    pub fn infer(text: &str) -> IssueSeverity {
        let lower = text.to_lowercase();
        if lower.contains("high") {
            IssueSeverity::High
        } else if lower.contains("low") {
            IssueSeverity::Low
        } else {
            IssueSeverity::Medium
        }
    }
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(IssueSeverity::Low),
            "medium" => Ok(IssueSeverity::Medium),
            "high" => Ok(IssueSeverity::High),
            other => Err(format!("unknown issue severity '{}'", other)),
        }
    }
}

/// Una incidencia reportada
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssueEntry {
    pub issue_type: String,
    pub severity: IssueSeverity,
    pub status: IssueStatus,
    pub description: String,
    pub reported_at: Option<DateTime<Utc>>,
    /// `true` si algún campo se dedujo del texto en vez de leerse
    pub inferred: bool,
    #[serde(skip)]
    raw: Option<String>,
}

impl IssueEntry {
    /// Nueva incidencia abierta
    pub fn open(
        issue_type: &str,
        severity: IssueSeverity,
        description: &str,
        reported_at: DateTime<Utc>,
    ) -> Self {
        Self {
            issue_type: issue_type.trim().to_string(),
            severity,
            status: IssueStatus::Open,
            description: description.trim().to_string(),
            reported_at: Some(reported_at),
            inferred: false,
            raw: None,
        }
    }

    /// Cambia el estado; la entrada pasa a serializarse en formato estructurado.
    /// Una línea más larga que `MAX_ENTRY_LEN` no se leyó entera, así que se
    /// conserva y solo se reescribe su campo `status:`.
    pub fn set_status(&mut self, status: IssueStatus) {
        self.status = status;
        self.raw = match self.raw.take() {
            Some(raw) if raw.len() > MAX_ENTRY_LEN => Some(replace_status(&raw, status)),
            _ => None,
        };
    }

    /// `false` si la entrada viene de texto libre sin campos reconocibles
    pub fn is_structured(&self) -> bool {
        self.raw
            .as_deref()
            .map(|raw| parse_structured(raw).is_some())
            .unwrap_or(true)
    }

    /// Línea en formato estructurado (o el texto original si no se modificó)
    pub fn to_line(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        let mut line = format!(
            "type: {}; severity: {}; status: {}; description: {}",
            sanitize(&self.issue_type),
            self.severity,
            self.status,
            sanitize(&self.description)
        );
        if let Some(at) = self.reported_at {
            line.push_str(&format!("; reported: {}", at.to_rfc3339()));
        }
        line
    }
}

fn sanitize(value: &str) -> String {
    value.replace([';', '\n', '\r'], ",").trim().to_string()
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

fn replace_status(raw: &str, status: IssueStatus) -> String {
    match STATUS_RE.captures(bounded(raw)).and_then(|c| c.get(1)) {
        Some(m) => format!("{}{}{}", &raw[..m.start()], status, &raw[m.end()..]),
        None => format!("status: {}; {}", status, raw),
    }
}

/// Recorta la entrada a `MAX_ENTRY_LEN` respetando límites de carácter
fn bounded(line: &str) -> &str {
    if line.len() <= MAX_ENTRY_LEN {
        return line;
    }
    let mut end = MAX_ENTRY_LEN;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

/// Camino estructurado: `None` si la línea no declara `type:` ni `status:`.
/// Los campos que falten o no se reconozcan se completan por deducción.
pub fn parse_structured(line: &str) -> Option<IssueEntry> {
    let text = bounded(line);
    let issue_type = capture(&TYPE_RE, text);
    let status_raw = capture(&STATUS_RE, text);
    if issue_type.is_none() && status_raw.is_none() {
        return None;
    }

    let mut inferred = false;
    let status = match status_raw.as_deref().map(IssueStatus::from_str) {
        Some(Ok(status)) => status,
        _ => {
            inferred = true;
            IssueStatus::infer(text)
        }
    };
    let severity = match capture(&SEVERITY_RE, text).as_deref().map(IssueSeverity::from_str) {
        Some(Ok(severity)) => severity,
        _ => {
            inferred = true;
            IssueSeverity::infer(text)
        }
    };
    let reported_at = capture(&REPORTED_RE, text)
        .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Some(IssueEntry {
        issue_type: issue_type.unwrap_or_else(|| UNKNOWN_ISSUE_TYPE.to_string()),
        severity,
        status,
        description: capture(&DESCRIPTION_RE, text).unwrap_or_default(),
        reported_at,
        inferred,
        raw: Some(line.to_string()),
    })
}

/// Camino legacy: texto libre sin campos reconocibles
pub fn infer_legacy(line: &str) -> IssueEntry {
    let text = bounded(line);
    IssueEntry {
        issue_type: UNKNOWN_ISSUE_TYPE.to_string(),
        severity: IssueSeverity::infer(text),
        status: IssueStatus::infer(text),
        description: text.trim().to_string(),
        reported_at: None,
        inferred: true,
        raw: Some(line.to_string()),
    }
}

/// Lista de incidencias de un log, la más reciente al final
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueLog {
    entries: Vec<IssueEntry>,
}

impl IssueLog {
    /// Interpreta un log completo; nunca falla
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| parse_structured(line).unwrap_or_else(|| infer_legacy(line)))
            .collect();
        Self { entries }
    }

    pub fn from_optional(raw: Option<&str>) -> Self {
        raw.map(Self::parse).unwrap_or_default()
    }

    pub fn entries(&self) -> &[IssueEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` si al menos una entrada declara campos estructurados
    pub fn has_structured_issue(&self) -> bool {
        self.entries.iter().any(IssueEntry::is_structured)
    }

    pub fn latest(&self) -> Option<&IssueEntry> {
        self.entries.last()
    }

    pub fn latest_mut(&mut self) -> Option<&mut IssueEntry> {
        self.entries.last_mut()
    }

    pub fn push(&mut self, entry: IssueEntry) {
        self.entries.push(entry);
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(IssueEntry::to_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
