#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use bin_collection_routing::models::{Bin, BinStatus, OfficerId};
use bin_collection_routing::repositories::InMemoryRouteRepository;
use bin_collection_routing::services::route_planner::PlannedStop;
use bin_collection_routing::services::{Clock, FixedClock, RouteReconciler, StopSchedule};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

pub fn today() -> NaiveDate {
    now().date_naive()
}

pub fn officer(raw: &str) -> OfficerId {
    OfficerId::parse(raw).unwrap()
}

pub fn bin(id: &str, lat: f64, lon: f64) -> Bin {
    Bin {
        id: id.to_string(),
        latitude: Some(lat),
        longitude: Some(lon),
        status: BinStatus::Active,
        capacity: 240,
        region: Some("Central".to_string()),
        address: Some(format!("{} Orchard Road", id)),
    }
}

pub fn planned(bin_id: &str, bucket: u32, stop_number: u32) -> PlannedStop {
    PlannedStop {
        bin_id: bin_id.to_string(),
        route_bucket: bucket,
        stop_number,
        latitude: 0.0,
        longitude: 0.0,
        degenerate_location: false,
    }
}

pub struct Fixture {
    pub repository: Arc<InMemoryRouteRepository>,
    pub clock: Arc<FixedClock>,
}

impl Fixture {
    pub async fn new(bins: &[&str]) -> Self {
        let repository = Arc::new(InMemoryRouteRepository::new());
        for (i, id) in bins.iter().enumerate() {
            repository
                .upsert_bin(bin(id, 1.30 + i as f64 * 0.01, 103.80 + i as f64 * 0.01))
                .await;
        }
        Self {
            repository,
            clock: Arc::new(FixedClock::new(now())),
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn reconciler(&self) -> RouteReconciler {
        RouteReconciler::new(self.repository.clone(), self.clock(), StopSchedule::default())
    }

    /// Guarda una ruta `key` para `date` con los contenedores en orden y la asigna
    pub async fn seed_route(&self, key: &str, date: NaiveDate, bins: &[&str], assignee: &str) -> uuid::Uuid {
        let stops: BTreeMap<String, Vec<PlannedStop>> = [(
            key.to_string(),
            bins.iter()
                .enumerate()
                .map(|(i, b)| planned(b, 1, i as u32 + 1))
                .collect(),
        )]
        .into_iter()
        .collect();
        let assignments: BTreeMap<String, OfficerId> =
            [(key.to_string(), officer(assignee))].into_iter().collect();

        let summary = self
            .reconciler()
            .save_planned_routes(&stops, &assignments, "PLANNER", date)
            .await
            .unwrap();
        summary.plan_ids[key]
    }
}
