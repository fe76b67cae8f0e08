//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.
//! Todas las variables tienen valor por defecto salvo las URLs externas, que
//! son opcionales.

use anyhow::{anyhow, Context, Result};
use chrono::{FixedOffset, NaiveTime};
use std::env;

use crate::config::database::DatabaseConfig;
use crate::services::route_planner::{PartitionStrategy, PlanningPolicy};
use crate::services::route_reconciler::StopSchedule;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub log_level: String,
    /// Sin URL se usa un feed vacío
    pub priority_feed_url: Option<String>,
    /// Sin `DATABASE_URL` se usa el repositorio en memoria
    pub database: Option<DatabaseConfig>,
    /// JSON de contenedores con el que se precarga el repositorio en memoria
    pub bins_file: Option<String>,
    pub planning: PlanningPolicy,
    pub schedule: StopSchedule,
    /// Desfase horario con el que se calcula "hoy"
    pub utc_offset: FixedOffset,
}

impl EnvironmentConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::from_lookup(|key| env::var(key).ok())?;
        config.database = DatabaseConfig::from_env();
        Ok(config)
    }

    /// Construye la configuración con una función de lectura de variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let parse = |key: &str, default: f64| -> Result<f64> {
            match get(key) {
                Some(v) => v.parse().with_context(|| format!("{} must be a number", key)),
                None => Ok(default),
            }
        };

        let defaults = PlanningPolicy::default();
        let planning = PlanningPolicy {
            depot: (
                parse("DEPOT_LAT", defaults.depot.0)?,
                parse("DEPOT_LON", defaults.depot.1)?,
            ),
            priority_threshold_days: parse("PRIORITY_THRESHOLD_DAYS", defaults.priority_threshold_days)?,
            bucket_count: match get("ROUTE_BUCKETS") {
                Some(v) => v.parse().context("ROUTE_BUCKETS must be a positive integer")?,
                None => defaults.bucket_count,
            },
            partition: match get("ROUTE_PARTITION") {
                Some(v) => v.parse::<PartitionStrategy>().map_err(|e| anyhow!(e))?,
                None => defaults.partition,
            },
        };
        if planning.bucket_count == 0 {
            return Err(anyhow!("ROUTE_BUCKETS must be greater than zero"));
        }

        let offset_minutes: i32 = match get("UTC_OFFSET_MINUTES") {
            Some(v) => v.parse().context("UTC_OFFSET_MINUTES must be an integer")?,
            None => 0,
        };
        let utc_offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| anyhow!("UTC_OFFSET_MINUTES out of range: {}", offset_minutes))?;

        let default_schedule = StopSchedule::default();
        let schedule = StopSchedule {
            shift_start: match get("SHIFT_START") {
                Some(v) => NaiveTime::parse_from_str(&v, "%H:%M")
                    .with_context(|| format!("SHIFT_START '{}' must be HH:MM", v))?,
                None => default_schedule.shift_start,
            },
            minutes_per_stop: match get("MINUTES_PER_STOP") {
                Some(v) => v.parse().context("MINUTES_PER_STOP must be an integer")?,
                None => default_schedule.minutes_per_stop,
            },
            utc_offset,
        };

        Ok(Self {
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            port: match get("PORT") {
                Some(v) => v.parse().context("PORT must be a valid number")?,
                None => 3000,
            },
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            cors_origins: get("CORS_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                .unwrap_or_default(),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "debug".to_string()),
            priority_feed_url: get("PRIORITY_FEED_URL"),
            database: None,
            bins_file: get("BINS_FILE"),
            planning,
            schedule,
            utc_offset,
        })
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
