//! Middleware de identidad del agente
//!
//! La autenticación queda fuera del servicio: el gateway que tenga delante
//! reenvía el agente en `X-Officer-Id`. El valor se normaliza una sola vez
//! a `OfficerId` y se inyecta en la request.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::models::OfficerId;
use crate::utils::errors::AppError;

pub const OFFICER_HEADER: &str = "x-officer-id";

/// Exige `X-Officer-Id` y lo deja como `Extension<OfficerId>`
pub async fn officer_middleware(mut request: Request, next: Next) -> Result<Response, AppError> {
    let officer = request
        .headers()
        .get(OFFICER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(OfficerId::parse)
        .ok_or_else(|| AppError::Unauthorized("Cabecera X-Officer-Id requerida".to_string()))?;

    request.extensions_mut().insert(officer);
    Ok(next.run(request).await)
}
