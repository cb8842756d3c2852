//! Taxonomía de errores del núcleo y su mapeo a respuestas HTTP.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Errores que el núcleo expone a sus llamantes. Las funciones de derivación
/// (grafo, búsqueda, insights) nunca fallan con entrada vacía; estos errores
/// provienen del almacén de registros y de los colaboradores externos.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Campos obligatorios ausentes o malformados.
    #[error("registro inválido: {0}")]
    Validation(String),

    /// Operación sobre un id que ya no existe.
    #[error("registro no encontrado: {0}")]
    NotFound(String),

    /// Fallo de transporte o de un servicio externo.
    #[error("error de red: {0}")]
    Network(String),
}

impl CoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            CoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Network(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
