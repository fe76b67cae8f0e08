//! Route Planner
//!
//! Convierte la señal de prioridad en paradas ordenadas y repartidas entre
//! agentes:
//!
//! 1. se quedan los contenedores activos con `days_to_threshold <= umbral`;
//! 2. se construye un único recorrido vecino-más-cercano desde el depósito;
//! 3. el recorrido se reparte en `bucket_count` rutas según la
//!    [`PartitionStrategy`] configurada, numerando las paradas desde 1.
//!
//! No pretende ser óptimo (no es un TSP).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::PriorityFeed;
use crate::models::Bin;
use crate::repositories::RouteRepository;
use crate::services::geo::haversine_km;
use crate::utils::errors::AppResult;

/// Cómo se reparte el recorrido entre las rutas de los agentes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStrategy {
    /// Segmentos consecutivos del recorrido; tamaños que difieren como mucho en uno
    Contiguous,
    /// La parada i va a la ruta (i mod k) + 1
    RoundRobin,
}

impl FromStr for PartitionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "contiguous" => Ok(PartitionStrategy::Contiguous),
            "round_robin" | "roundrobin" => Ok(PartitionStrategy::RoundRobin),
            other => Err(format!("unknown partition strategy '{}'", other)),
        }
    }
}

/// Política de planificación
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningPolicy {
    /// Depósito (lat, lon) desde el que empieza el recorrido
    pub depot: (f64, f64),
    /// Umbral de "alta prioridad" en días hasta desborde
    pub priority_threshold_days: f64,
    pub bucket_count: usize,
    pub partition: PartitionStrategy,
}

impl Default for PlanningPolicy {
    fn default() -> Self {
        Self {
            depot: (1.3521, 103.8198),
            priority_threshold_days: 1.0,
            bucket_count: 3,
            partition: PartitionStrategy::Contiguous,
        }
    }
}

/// Parada planificada (aún sin persistir)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedStop {
    pub bin_id: String,
    pub route_bucket: u32,
    pub stop_number: u32,
    pub latitude: f64,
    pub longitude: f64,
    /// Coordenadas ausentes, tratadas como (0, 0)
    pub degenerate_location: bool,
}

impl PlannedStop {
    pub fn route_key(&self) -> String {
        bucket_route_key(self.route_bucket)
    }
}

/// Clave de ruta de una sesión de planificación
pub fn bucket_route_key(bucket: u32) -> String {
    format!("bucket-{}", bucket)
}

/// Agrupa las paradas por clave de ruta, ordenadas por número de parada
pub fn group_by_route_key(stops: &[PlannedStop]) -> BTreeMap<String, Vec<PlannedStop>> {
    let mut grouped: BTreeMap<String, Vec<PlannedStop>> = BTreeMap::new();
    for stop in stops {
        grouped.entry(stop.route_key()).or_default().push(stop.clone());
    }
    for stops in grouped.values_mut() {
        stops.sort_by_key(|s| s.stop_number);
    }
    grouped
}

/// Recorrido vecino-más-cercano desde `origin`. Devuelve índices de `points`.
/// Empates por distancia se resuelven por índice.
pub fn nearest_neighbor_tour(origin: (f64, f64), points: &[(f64, f64)]) -> Vec<usize> {
    let mut visited = vec![false; points.len()];
    let mut tour = Vec::with_capacity(points.len());
    let mut current = origin;

    while tour.len() < points.len() {
        let next = points
            .iter()
            .enumerate()
            .filter(|(i, _)| !visited[*i])
            .map(|(i, p)| (i, haversine_km(current, *p)))
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        match next {
            Some((index, _)) => {
                visited[index] = true;
                tour.push(index);
                current = points[index];
            }
            None => break,
        }
    }

    tour
}

/// (bucket, stop_number) para cada posición del recorrido, ambos desde 1
pub fn partition_tour(len: usize, bucket_count: usize, strategy: PartitionStrategy) -> Vec<(u32, u32)> {
    let k = bucket_count.max(1);
    let mut counters = vec![0u32; k];
    let mut result = Vec::with_capacity(len);

    match strategy {
        PartitionStrategy::RoundRobin => {
            for position in 0..len {
                let bucket = position % k;
                counters[bucket] += 1;
                result.push((bucket as u32 + 1, counters[bucket]));
            }
        }
        PartitionStrategy::Contiguous => {
            let base = len / k;
            let extra = len % k;
            for bucket in 0..k {
                let size = base + usize::from(bucket < extra);
                for stop in 0..size {
                    result.push((bucket as u32 + 1, stop as u32 + 1));
                }
            }
        }
    }

    result
}

pub struct RoutePlanner {
    feed: Arc<dyn PriorityFeed>,
    repository: Arc<dyn RouteRepository>,
    policy: PlanningPolicy,
}

impl RoutePlanner {
    pub fn new(
        feed: Arc<dyn PriorityFeed>,
        repository: Arc<dyn RouteRepository>,
        policy: PlanningPolicy,
    ) -> Self {
        Self {
            feed,
            repository,
            policy,
        }
    }

    pub fn policy(&self) -> &PlanningPolicy {
        &self.policy
    }

    /// Planifica las paradas de hoy. Lista vacía si no hay nada que recoger.
    pub async fn plan_route(&self) -> AppResult<Vec<PlannedStop>> {
        let priorities = self.feed.priorities().await?;

        // Un contenedor repetido en el feed se queda con su valor más urgente
        let mut urgent: HashMap<String, f64> = HashMap::new();
        for p in priorities
            .into_iter()
            .filter(|p| p.days_to_threshold <= self.policy.priority_threshold_days)
        {
            urgent
                .entry(p.bin_id)
                .and_modify(|d| *d = d.min(p.days_to_threshold))
                .or_insert(p.days_to_threshold);
        }

        let mut candidates: Vec<Bin> = self
            .repository
            .list_active_bins()
            .await?
            .into_iter()
            .filter(|b| urgent.contains_key(&b.id))
            .collect();
        candidates.sort_by(|a, b| a.id.cmp(&b.id));

        if candidates.len() < urgent.len() {
            debug!(
                "{} contenedores urgentes no están activos o no existen",
                urgent.len() - candidates.len()
            );
        }

        // Con el depósito como único punto no hay ruta
        if candidates.is_empty() {
            info!("📭 Sin contenedores de alta prioridad, no hay rutas que planificar");
            return Ok(Vec::new());
        }

        for bin in candidates.iter().filter(|b| b.has_missing_location()) {
            warn!(
                "⚠️ Contenedor {} sin coordenadas, se planifica en (0, 0)",
                bin.id
            );
        }

        let points: Vec<(f64, f64)> = candidates.iter().map(Bin::coordinates).collect();
        let tour = nearest_neighbor_tour(self.policy.depot, &points);
        let slots = partition_tour(tour.len(), self.policy.bucket_count, self.policy.partition);

        let mut planned: Vec<PlannedStop> = tour
            .into_iter()
            .zip(slots)
            .map(|(index, (bucket, stop_number))| {
                let bin = &candidates[index];
                let (latitude, longitude) = bin.coordinates();
                PlannedStop {
                    bin_id: bin.id.clone(),
                    route_bucket: bucket,
                    stop_number,
                    latitude,
                    longitude,
                    degenerate_location: bin.has_missing_location(),
                }
            })
            .collect();
        planned.sort_by_key(|s| (s.route_bucket, s.stop_number));

        info!(
            "🗺️ Planificadas {} paradas en {} rutas ({:?})",
            planned.len(),
            self.policy.bucket_count.max(1),
            self.policy.partition
        );
        Ok(planned)
    }
}
