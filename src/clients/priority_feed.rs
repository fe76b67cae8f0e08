//! Cliente del Priority Feed
//!
//! Fuente externa que estima, por contenedor, los días que faltan para
//! alcanzar el umbral de desborde. El núcleo la trata como dato opaco.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::models::BinPriority;
use crate::utils::errors::{AppError, AppResult};

#[async_trait]
pub trait PriorityFeed: Send + Sync {
    async fn priorities(&self) -> AppResult<Vec<BinPriority>>;
}

/// Feed HTTP: `GET <url>` devuelve `[{"binId": "...", "daysToThreshold": 0.4}, ...]`
pub struct HttpPriorityFeed {
    client: Client,
    url: String,
}

impl HttpPriorityFeed {
    pub fn new(url: String) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl PriorityFeed for HttpPriorityFeed {
    async fn priorities(&self) -> AppResult<Vec<BinPriority>> {
        log::info!("📡 Consultando priority feed: {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header("User-Agent", "BinCollectionRouting/1.0")
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("priority feed unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "priority feed error {}: {}",
                status, body
            )));
        }

        let priorities: Vec<BinPriority> = response
            .json()
            .await
            .map_err(|e| AppError::ExternalApi(format!("invalid priority feed payload: {}", e)))?;

        log::info!("✅ Priority feed devolvió {} contenedores", priorities.len());
        Ok(priorities)
    }
}

/// Feed fijo en memoria (tests y arranque sin servicio de predicción)
#[derive(Debug, Clone, Default)]
pub struct StaticPriorityFeed {
    priorities: Vec<BinPriority>,
}

impl StaticPriorityFeed {
    pub fn new(priorities: Vec<BinPriority>) -> Self {
        Self { priorities }
    }
}

#[async_trait]
impl PriorityFeed for StaticPriorityFeed {
    async fn priorities(&self) -> AppResult<Vec<BinPriority>> {
        Ok(self.priorities.clone())
    }
}
