//! Utilidades de validación
//!
//! Funciones helper usadas por los DTOs (`#[validate(custom = ...)]`) y por
//! los servicios antes de tocar el repositorio.

use validator::ValidationError;

/// Nivel de llenado máximo aceptado (porcentaje)
pub const MAX_FILL_LEVEL: i32 = 100;

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar el porcentaje de llenado observado por el agente
pub fn validate_fill_level(value: i32) -> Result<(), ValidationError> {
    if !(0..=MAX_FILL_LEVEL).contains(&value) {
        let mut error = ValidationError::new("fill_level");
        error.add_param("value".into(), &value);
        error.add_param("range".into(), &"0 to 100".to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar coordenadas GPS de una parada planificada
pub fn validate_coordinates(lat: f64, lng: f64) -> Result<(), ValidationError> {
    if !(-90.0..=90.0).contains(&lat) {
        let mut error = ValidationError::new("latitude");
        error.add_param("value".into(), &lat);
        error.add_param("range".into(), &"-90.0 to 90.0".to_string());
        return Err(error);
    }

    if !(-180.0..=180.0).contains(&lng) {
        let mut error = ValidationError::new("longitude");
        error.add_param("value".into(), &lng);
        error.add_param("range".into(), &"-180.0 to 180.0".to_string());
        return Err(error);
    }

    Ok(())
}
