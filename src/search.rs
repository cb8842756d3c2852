//! Motor de búsqueda por subcadena sobre los nodos derivados.
//!
//! Sin tokenización, stemming ni ranking: una comprobación de contención,
//! insensible a mayúsculas, determinista y síncrona. Una consulta vacía es la
//! búsqueda identidad (todos los nodos).

use crate::models::{GraphEdge, RecordNode, SearchResult};

/// ¿Contiene el texto buscable del nodo la consulta (recortada, en
/// minúsculas) como subcadena?
pub fn node_matches(node: &RecordNode, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }

    let mut haystack = String::new();
    haystack.push_str(&node.label);
    haystack.push(' ');
    haystack.push_str(&node.timestamp.to_string());
    haystack.push(' ');
    haystack.push_str(&node.body);
    if let Some(emotion) = &node.primary_emotion {
        haystack.push(' ');
        haystack.push_str(emotion);
    }
    for tag in &node.feel {
        haystack.push(' ');
        haystack.push_str(tag);
    }

    haystack.to_lowercase().contains(&q)
}

/// Evalúa una búsqueda completa: subconjunto de nodos coincidentes, nodo
/// central y las aristas cuyos dos extremos coinciden.
///
/// Nodo central: la primera coincidencia en el orden de la lista; si no hay
/// coincidencias, el primer nodo; si la lista está vacía, ninguno.
pub fn build_search_result(
    query: &str,
    nodes: &[RecordNode],
    edges: &[GraphEdge],
) -> SearchResult {
    let matches: Vec<&RecordNode> = nodes.iter().filter(|n| node_matches(n, query)).collect();

    let central_node_id = matches
        .first()
        .map(|n| n.id.clone())
        .or_else(|| nodes.first().map(|n| n.id.clone()));

    let node_ids: Vec<String> = matches.iter().map(|n| n.id.clone()).collect();
    let edge_ids: Vec<String> = edges
        .iter()
        .filter(|e| node_ids.contains(&e.source) && node_ids.contains(&e.target))
        .map(|e| e.id.clone())
        .collect();

    SearchResult {
        query: query.trim().to_string(),
        central_node_id,
        node_ids,
        edge_ids,
    }
}
