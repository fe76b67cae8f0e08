use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use bin_collection_routing::clients::{HttpPriorityFeed, PriorityFeed, StaticPriorityFeed};
use bin_collection_routing::config::environment::EnvironmentConfig;
use bin_collection_routing::database::DatabaseConnection;
use bin_collection_routing::repositories::{
    InMemoryRouteRepository, PgRouteRepository, RouteRepository,
};
use bin_collection_routing::routes::create_router;
use bin_collection_routing::services::SystemClock;
use bin_collection_routing::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();
    let config = EnvironmentConfig::from_env()?;

    // Configurar logging
    let level = config
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::DEBUG);
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("🚛 Bin Collection Routing - API");
    info!("================================");

    // Inicializar almacenamiento
    let repository: Arc<dyn RouteRepository> = match &config.database {
        Some(db_config) => match DatabaseConnection::connect(db_config).await {
            Ok(conn) => Arc::new(PgRouteRepository::new(conn.pool().clone())),
            Err(e) => {
                error!("❌ Error conectando a la base de datos: {:#}", e);
                return Err(e);
            }
        },
        None => {
            warn!("⚠️ DATABASE_URL no definida, usando repositorio en memoria");
            Arc::new(in_memory_repository(config.bins_file.as_deref()).await?)
        }
    };

    let feed: Arc<dyn PriorityFeed> = match &config.priority_feed_url {
        Some(url) => Arc::new(HttpPriorityFeed::new(url.clone())?),
        None => {
            warn!("⚠️ PRIORITY_FEED_URL no definida, el planificador no tendrá contenedores");
            Arc::new(StaticPriorityFeed::default())
        }
    };

    let clock = Arc::new(SystemClock::new(config.utc_offset));
    let app_state = AppState::new(&config, repository, feed, clock);
    let app = create_router(app_state, &config.cors_origins);

    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health");
    info!("🗺️ Planificación:");
    info!("   GET  /api/planning/plan - Planificar rutas de hoy");
    info!("   POST /api/planning/routes - Guardar rutas y asignaciones");
    info!("🚛 Recogida:");
    info!("   GET  /api/collection/route - Ruta del día");
    info!("   GET  /api/collection/stops/:stop_id/confirmation - Datos de confirmación");
    info!("   POST /api/collection/stops/:stop_id/confirm - Confirmar recogida");
    info!("   GET  /api/collection/next-stops - Próximas paradas");
    info!("🚩 Incidencias:");
    info!("   GET  /api/issues - Vista de incidencias");
    info!("   POST /api/issues - Reportar incidencia");
    info!("   POST /api/issues/stops/:stop_id/progress - Avanzar incidencia");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Repositorio en memoria, precargado desde `BINS_FILE` si está definida
async fn in_memory_repository(bins_file: Option<&str>) -> Result<InMemoryRouteRepository> {
    let Some(path) = bins_file else {
        warn!("⚠️ BINS_FILE no definida: no hay contenedores y la planificación devolverá rutas vacías");
        return Ok(InMemoryRouteRepository::new());
    };

    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("No se pudo leer BINS_FILE '{}'", path))?;
    let repository = InMemoryRouteRepository::with_bins_json(&json)
        .await
        .with_context(|| format!("BINS_FILE '{}' no es un array JSON de contenedores", path))?;
    info!("📦 {} contenedores cargados desde {}", repository.bin_count().await, path);
    Ok(repository)
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
