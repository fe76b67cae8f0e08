//! Modelos del sistema
//!
//! Este módulo contiene los modelos de dominio del núcleo de recogida:
//! contenedores, rutas, eventos de recogida e incidencias.

pub mod bin;
pub mod collection;
pub mod issue;
pub mod officer;
pub mod route;

pub use bin::{Bin, BinPriority, BinStatus};
pub use collection::{CollectionEvent, CollectionStatus};
pub use issue::{IssueEntry, IssueLog, IssueSeverity, IssueStatus};
pub use officer::OfficerId;
pub use route::{RouteAssignment, RoutePlan, RouteStatus, RouteStop};
