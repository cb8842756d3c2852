//! Modelos de dominio: registros de diario persistidos y las vistas
//! derivadas (nodos, aristas, timeline, resultados de búsqueda).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unidad de persistencia: una entrada de diario.
///
/// `feel` es un vocabulario abierto de etiquetas de ánimo; la lista fija de
/// cinco valores del generador es sólo un conjunto de sugerencias de UI,
/// nunca una restricción de validación.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub feel: Vec<String>,
    pub content: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

pub fn default_user_id() -> String {
    "default".to_string()
}

impl Record {
    /// Instante ordenable del registro. Las fechas sin hora degradan a las
    /// 12:00 para que registros del mismo día sigan siendo ordenables sin
    /// chocar a medianoche.
    pub fn timestamp(&self) -> NaiveDateTime {
        // 12:00:00 siempre es una hora válida de calendario
        self.date.and_hms_opt(12, 0, 0).unwrap_or_default()
    }
}

/// Nodo derivado de un registro. Efímero: se recalcula en bloque cada vez
/// que cambia el conjunto de registros.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordNode {
    pub id: String,
    pub label: String,
    pub timestamp: NaiveDateTime,
    /// Primera etiqueta de `feel`, si existe.
    pub primary_emotion: Option<String>,
    pub feel: Vec<String>,
    pub body: String,
}

/// Arista derivada entre dos nodos. La única relación siempre presente es la
/// adyacencia temporal entre nodos consecutivos.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub relation_type: String,
    pub label: String,
}

/// Evento de la vista de línea temporal, uno por nodo.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    pub date: NaiveDate,
    pub label: String,
    pub node_ids: Vec<String>,
    pub summary: String,
}

/// Resultado de una evaluación de búsqueda. No se persiste: el siguiente
/// resultado lo reemplaza.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub query: String,
    pub central_node_id: Option<String>,
    pub node_ids: Vec<String>,
    pub edge_ids: Vec<String>,
}
