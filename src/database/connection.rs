//! Configuración de conexión a PostgreSQL
//!
//! Este módulo maneja el pool de conexiones y la creación idempotente del
//! schema del núcleo de recogida.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::info;

use crate::config::database::DatabaseConfig;
use crate::database::schema::SCHEMA_STATEMENTS;

/// Conexión a la base de datos (pool compartido)
#[derive(Clone)]
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    /// Conectar usando la configuración dada y asegurar el schema
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("🗄️ Conectando a {}", mask_database_url(&config.url));
        let pool = config
            .create_pool()
            .await
            .context("no se pudo crear el pool de PostgreSQL")?;

        run_migrations(&pool)
            .await
            .context("no se pudo crear el schema")?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Ejecutar las sentencias del schema (todas son `IF NOT EXISTS`)
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("✅ Schema verificado ({} sentencias)", SCHEMA_STATEMENTS.len());
    Ok(())
}

/// Función helper para enmascarar la URL de la base de datos en logs
fn mask_database_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if url[..at_pos].rfind(':').is_some() {
            let protocol = &url[..url.find("://").map(|p| p + 3).unwrap_or(0)];
            let host = &url[at_pos + 1..];
            format!("{}***:***@{}", protocol, host)
        } else {
            url.to_string()
        }
    } else {
        url.to_string()
    }
}
