//! Bin Collection Routing
//!
//! Núcleo de logística de recogida de contenedores: planificación de rutas
//! por prioridad, reconciliación con lo ya guardado, ciclo de recogida del
//! agente e incidencias en campo.

pub mod clients;
pub mod config;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
