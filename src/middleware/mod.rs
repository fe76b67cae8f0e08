//! Middleware del sistema
//! 
//! Este módulo contiene el middleware de identidad del agente y CORS.

pub mod cors;
pub mod officer;

pub use cors::cors_layer;
pub use officer::{officer_middleware, OFFICER_HEADER};
