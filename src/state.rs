//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::clients::PriorityFeed;
use crate::config::environment::EnvironmentConfig;
use crate::repositories::RouteRepository;
use crate::services::{
    Clock, CollectionService, IssueService, RoutePlanner, RouteReconciler,
};

#[derive(Clone)]
pub struct AppState {
    pub clock: Arc<dyn Clock>,
    pub planner: Arc<RoutePlanner>,
    pub reconciler: Arc<RouteReconciler>,
    pub collection: Arc<CollectionService>,
    pub issues: Arc<IssueService>,
}

impl AppState {
    pub fn new(
        config: &EnvironmentConfig,
        repository: Arc<dyn RouteRepository>,
        feed: Arc<dyn PriorityFeed>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            planner: Arc::new(RoutePlanner::new(
                feed,
                repository.clone(),
                config.planning.clone(),
            )),
            reconciler: Arc::new(RouteReconciler::new(
                repository.clone(),
                clock.clone(),
                config.schedule.clone(),
            )),
            collection: Arc::new(CollectionService::new(repository.clone(), clock.clone())),
            issues: Arc::new(IssueService::new(repository, clock.clone())),
            clock,
        }
    }
}
