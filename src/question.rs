//! Flujo de preguntas en lenguaje natural sobre el diario.
//!
//! El núcleo sólo tiene dos responsabilidades alrededor del servicio de
//! razonamiento externo: construir un SearchResult a partir de los ids que
//! devuelve (si los devuelve), y degradar a la búsqueda local por subcadena
//! cuando el servicio falla o no aporta ids. Las respuestas obsoletas se
//! descartan con un contador de generación de peticiones.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::{GraphEdge, Record, RecordNode, SearchResult};
use crate::search;

/// Contador de generación: sólo la respuesta que coincide con la última
/// generación emitida puede actualizar el estado visible. Una búsqueda nueva
/// no aborta la petición anterior en vuelo; simplemente invalida su resultado.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

impl RequestTracker {
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == generation
    }
}

/// Preselección de contexto para el LLM: registros cuyo texto contiene algún
/// token de la pregunta, los más recientes primero, acotados a `limit`. Si
/// nada coincide se usan los más recientes sin filtrar.
pub fn select_context_records(records: &[Record], text: &str, limit: usize) -> Vec<Record> {
    let tokens: Vec<String> = text
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().count() >= 2)
        .collect();

    let mut candidates: Vec<Record> = records
        .iter()
        .filter(|r| {
            let hay = format!("{} {} {}", r.title, r.content, r.feel.join(" ")).to_lowercase();
            tokens.iter().any(|t| hay.contains(t))
        })
        .cloned()
        .collect();

    if candidates.is_empty() {
        candidates = records.to_vec();
    }

    candidates.sort_by(|a, b| b.date.cmp(&a.date));
    candidates.truncate(limit);
    candidates
}

/// Formatea los registros de contexto como texto plano para el prompt.
pub fn format_context(records: &[Record]) -> String {
    records
        .iter()
        .map(|r| {
            format!(
                "[id: {}] ({}) {} — ánimo: [{}]\n{}",
                r.id,
                r.date,
                r.title,
                r.feel.join(", "),
                r.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Construye el SearchResult del flujo de preguntas.
///
/// Si el servicio aportó ids relacionados y alguno existe, el resultado se
/// construye directamente con ellos (sin pasar por el motor de búsqueda). En
/// caso contrario, degradación: búsqueda por subcadena sobre el mismo texto.
pub fn resolve_search_result(
    related_record_ids: &[String],
    query: &str,
    nodes: &[RecordNode],
    edges: &[GraphEdge],
) -> SearchResult {
    let node_ids: Vec<String> = nodes
        .iter()
        .filter(|n| related_record_ids.contains(&n.id))
        .map(|n| n.id.clone())
        .collect();

    if node_ids.is_empty() {
        return search::build_search_result(query, nodes, edges);
    }

    let edge_ids: Vec<String> = edges
        .iter()
        .filter(|e| node_ids.contains(&e.source) && node_ids.contains(&e.target))
        .map(|e| e.id.clone())
        .collect();

    SearchResult {
        query: query.trim().to_string(),
        central_node_id: node_ids.first().cloned(),
        node_ids,
        edge_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{derive_edges, derive_nodes};
    use chrono::{NaiveDate, Utc};

    fn record(id: &str, date: &str, title: &str, content: &str) -> Record {
        Record {
            id: id.to_string(),
            title: title.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            feel: vec![],
            content: content.to_string(),
            user_id: "default".to_string(),
            created_at: Utc::now(),
        }
    }

    fn fixture() -> Vec<Record> {
        vec![
            record("r1", "2026-01-01", "야근", "퇴사를 고민했다"),
            record("r2", "2026-01-02", "산책", "공원에서 쉬었다"),
            record("r3", "2026-01-03", "회의", "퇴사 이야기가 또 나왔다"),
        ]
    }

    #[test]
    fn ids_relacionados_construyen_el_resultado_directamente() {
        let records = fixture();
        let nodes = derive_nodes(&records);
        let edges = derive_edges(&nodes);

        let result = resolve_search_result(
            &["r2".to_string(), "r3".to_string()],
            "퇴사",
            &nodes,
            &edges,
        );
        assert_eq!(result.node_ids, vec!["r2".to_string(), "r3".to_string()]);
        assert_eq!(result.central_node_id.as_deref(), Some("r2"));
        // r2 y r3 son adyacentes: su arista entra en el resultado
        assert_eq!(result.edge_ids, vec!["e-r2-r3".to_string()]);
    }

    #[test]
    fn sin_ids_el_resultado_es_el_de_la_busqueda_local() {
        let records = fixture();
        let nodes = derive_nodes(&records);
        let edges = derive_edges(&nodes);

        let via_fallback = resolve_search_result(&[], "퇴사", &nodes, &edges);
        let via_search = search::build_search_result("퇴사", &nodes, &edges);
        assert_eq!(via_fallback, via_search);
    }

    #[test]
    fn ids_desconocidos_tambien_degradan() {
        let records = fixture();
        let nodes = derive_nodes(&records);
        let edges = derive_edges(&nodes);

        let result = resolve_search_result(&["zz".to_string()], "산책", &nodes, &edges);
        assert_eq!(result, search::build_search_result("산책", &nodes, &edges));
    }

    #[test]
    fn preseleccion_de_contexto_prioriza_recientes() {
        let records = fixture();
        let selected = select_context_records(&records, "퇴사", 5);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].id, "r3");
        assert_eq!(selected[1].id, "r1");
    }

    #[test]
    fn preseleccion_sin_coincidencias_usa_los_recientes() {
        let records = fixture();
        let selected = select_context_records(&records, "qqqq", 2);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].id, "r3");
    }

    #[test]
    fn solo_la_ultima_generacion_es_vigente() {
        let tracker = RequestTracker::default();
        let first = tracker.begin();
        assert!(tracker.is_current(first));
        let second = tracker.begin();
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }
}
