//! Services module
//! 
//! Este módulo contiene la lógica de negocio del núcleo de recogida:
//! planificación, reconciliación de rutas, ciclo de recogida e incidencias.
//! Los servicios solo dependen de `RouteRepository`, `PriorityFeed` y `Clock`.

pub mod clock;
pub mod collection_service;
pub mod geo;
pub mod issue_service;
pub mod route_planner;
pub mod route_reconciler;

pub use clock::{Clock, FixedClock, SystemClock};
pub use collection_service::CollectionService;
pub use issue_service::IssueService;
pub use route_planner::{PartitionStrategy, PlannedStop, PlanningPolicy, RoutePlanner};
pub use route_reconciler::{ReconcileSummary, RouteReconciler, StopSchedule};
