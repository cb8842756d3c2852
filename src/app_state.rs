use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::{
    config::AppConfig, llm::LlmManager, models::SearchResult, question::RequestTracker,
    store::RecordStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<RecordStore>,
    pub llm_manager: LlmManager,
    pub status: Arc<Mutex<Status>>,
    /// Generaciones de petición del flujo de búsqueda/preguntas.
    pub requests: Arc<RequestTracker>,
    /// Último resultado de búsqueda vigente; sólo lo escribe la respuesta
    /// cuya generación sigue siendo la última emitida.
    pub last_search: Arc<Mutex<Option<SearchResult>>>,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Status {
    pub is_busy: bool,
    pub message: String,
    pub progress: f32, // Valor entre 0.0 y 1.0
}
