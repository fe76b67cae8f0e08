//! Modelo de Bin
//!
//! Punto físico de recogida. El núcleo solo lo lee: el alta y baja de
//! contenedores pertenece al CRUD administrativo.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Estado del contenedor - mapea a la columna bins.status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BinStatus {
    Active,
    Inactive,
}

impl BinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinStatus::Active => "active",
            BinStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for BinStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(BinStatus::Active),
            "inactive" => Ok(BinStatus::Inactive),
            other => Err(format!("unknown bin status '{}'", other)),
        }
    }
}

/// Contenedor de residuos
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bin {
    pub id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: BinStatus,
    pub capacity: i32,
    pub region: Option<String>,
    pub address: Option<String>,
}

impl Bin {
    /// Coordenadas (lat, lon); las ausentes se tratan como (0, 0)
    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude.unwrap_or(0.0), self.longitude.unwrap_or(0.0))
    }

    /// `true` si falta alguna coordenada y el punto es el (0, 0) degenerado
    pub fn has_missing_location(&self) -> bool {
        self.latitude.is_none() || self.longitude.is_none()
    }

    pub fn is_active(&self) -> bool {
        self.status == BinStatus::Active
    }
}

/// Señal de prioridad por contenedor (días hasta el umbral de desborde)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BinPriority {
    pub bin_id: String,
    pub days_to_threshold: f64,
}
