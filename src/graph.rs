//! Derivación del grafo: la lista plana de registros se proyecta en nodos,
//! aristas de adyacencia temporal y eventos de timeline. Todo es puro y se
//! recalcula en bloque; no hay parcheo incremental.

use crate::models::{GraphEdge, Record, RecordNode, TimelineEvent};

pub const TIME_ADJACENT: &str = "time_adjacent";

/// Un nodo por registro, en el orden de la lista de entrada.
pub fn derive_nodes(records: &[Record]) -> Vec<RecordNode> {
    records
        .iter()
        .map(|r| RecordNode {
            id: r.id.clone(),
            label: r.title.clone(),
            timestamp: r.timestamp(),
            primary_emotion: r.feel.first().cloned(),
            feel: r.feel.clone(),
            body: r.content.clone(),
        })
        .collect()
}

/// Aristas cronológicas: exactamente una entre cada par de nodos consecutivos
/// en orden ascendente de timestamp (N nodos → N−1 aristas; 0 si N ≤ 1).
/// Empates de timestamp: orden estable según la lista de entrada.
pub fn derive_edges(nodes: &[RecordNode]) -> Vec<GraphEdge> {
    let mut sorted: Vec<&RecordNode> = nodes.iter().collect();
    // sort_by_key es estable: conserva el orden de inserción en empates
    sorted.sort_by_key(|n| n.timestamp);

    sorted
        .windows(2)
        .map(|pair| GraphEdge {
            id: format!("e-{}-{}", pair[0].id, pair[1].id),
            source: pair[0].id.clone(),
            target: pair[1].id.clone(),
            relation_type: TIME_ADJACENT.to_string(),
            label: "시간순".to_string(),
        })
        .collect()
}

/// Un evento de timeline por nodo, con un resumen truncado del cuerpo.
pub fn derive_timeline(nodes: &[RecordNode]) -> Vec<TimelineEvent> {
    nodes
        .iter()
        .map(|n| TimelineEvent {
            id: format!("tl-{}", n.id),
            date: n.timestamp.date(),
            label: n.label.clone(),
            node_ids: vec![n.id.clone()],
            summary: truncate_chars(&n.body, 80),
        })
        .collect()
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use std::collections::HashSet;

    fn record(id: &str, date: &str) -> Record {
        Record {
            id: id.to_string(),
            title: format!("título {id}"),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            feel: vec![],
            content: "cuerpo".to_string(),
            user_id: "default".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn n_nodos_producen_n_menos_1_aristas() {
        for n in 0..6usize {
            let records: Vec<Record> = (0..n)
                .map(|i| record(&format!("r{i}"), &format!("2026-01-{:02}", i + 1)))
                .collect();
            let nodes = derive_nodes(&records);
            let edges = derive_edges(&nodes);
            assert_eq!(edges.len(), n.saturating_sub(1));
        }
    }

    #[test]
    fn aristas_enlazan_adyacentes_cronologicos() {
        // Entrada desordenada a propósito
        let records = vec![
            record("b", "2026-01-02"),
            record("c", "2026-01-03"),
            record("a", "2026-01-01"),
        ];
        let edges = derive_edges(&derive_nodes(&records));
        assert_eq!(edges.len(), 2);
        assert_eq!((edges[0].source.as_str(), edges[0].target.as_str()), ("a", "b"));
        assert_eq!((edges[1].source.as_str(), edges[1].target.as_str()), ("b", "c"));
    }

    #[test]
    fn sin_bucles_ni_duplicados() {
        let records = vec![
            record("a", "2026-01-01"),
            record("b", "2026-01-01"),
            record("c", "2026-01-02"),
        ];
        let edges = derive_edges(&derive_nodes(&records));
        let mut seen = HashSet::new();
        for e in &edges {
            assert_ne!(e.source, e.target);
            assert!(seen.insert((e.source.clone(), e.target.clone())));
        }
    }

    #[test]
    fn empate_de_timestamp_respeta_orden_de_entrada() {
        // Mismo día → misma hora (12:00); el orden de inserción decide
        let records = vec![record("x", "2026-01-05"), record("y", "2026-01-05")];
        let edges = derive_edges(&derive_nodes(&records));
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, "x");
        assert_eq!(edges[0].target, "y");
    }

    #[test]
    fn timeline_trunca_el_resumen() {
        let mut r = record("a", "2026-01-01");
        r.content = "x".repeat(200);
        let timeline = derive_timeline(&derive_nodes(&[r]));
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].summary.chars().count(), 83); // 80 + "..."
        assert_eq!(timeline[0].id, "tl-a");
    }
}
