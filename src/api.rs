use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::spawn;
use tracing::{info, warn};

use crate::{
    app_state::{AppState, Status},
    document::{self, Block},
    errors::CoreError,
    generator, graph,
    insight::{self, CountEntry, HeatmapCell, PeriodUnit},
    models::{GraphEdge, Record, RecordNode, SearchResult, TimelineEvent},
    question, search,
    store::{RecordInput, RecordUpdate},
};

// --- Payloads y Respuestas de la API ---

/// Forma de cable de un registro: POST/PUT la envían sin `id`.
#[derive(Serialize)]
pub struct RecordView {
    id: String,
    title: String,
    date: NaiveDate,
    feel: Vec<String>,
    content: String,
}

impl From<Record> for RecordView {
    fn from(r: Record) -> Self {
        Self {
            id: r.id,
            title: r.title,
            date: r.date,
            feel: r.feel,
            content: r.content,
        }
    }
}

/// El cuerpo puede llegar como texto plano (`content`) o como árbol de
/// bloques del editor (`document`), que se proyecta a texto plano.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordPayload {
    title: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    document: Option<Vec<Block>>,
    #[serde(default)]
    feel: Vec<String>,
    date: NaiveDate,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordPayload {
    title: Option<String>,
    content: Option<String>,
    document: Option<Vec<Block>>,
    feel: Option<Vec<String>>,
    date: Option<NaiveDate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPayload {
    #[serde(default)]
    user_id: Option<String>,
    text: String,
}

#[derive(Serialize)]
pub struct GraphSnapshot {
    node_count: usize,
    edge_count: usize,
}

#[derive(Serialize)]
pub struct ReasoningPath {
    summary: String,
    records: Vec<String>,
    graph_snapshot: GraphSnapshot,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    answer: String,
    reasoning_path: ReasoningPath,
    confidence: f64,
    search_result: SearchResult,
}

#[derive(Serialize)]
pub struct GraphData {
    nodes: Vec<RecordNode>,
    edges: Vec<GraphEdge>,
    timeline: Vec<TimelineEvent>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
pub struct InsightParams {
    /// Ventana del conteo diario: 7 o 30 días.
    #[serde(default = "default_days")]
    days: u32,
}

fn default_days() -> u32 {
    7
}

#[derive(Serialize)]
pub struct BucketCount {
    date: NaiveDate,
    count: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsResponse {
    total_records: usize,
    streak: u32,
    top_emotion: Option<String>,
    emotion_counts: Vec<CountEntry>,
    daily_counts: Vec<BucketCount>,
    weekly_counts: Vec<BucketCount>,
    monthly_counts: Vec<BucketCount>,
    heatmap: Vec<Vec<HeatmapCell>>,
    word_counts: Vec<CountEntry>,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/v1/records", get(list_records_handler).post(create_record_handler))
        .route(
            "/api/v1/records/:id",
            put(update_record_handler).delete(delete_record_handler),
        )
        .route("/api/v1/question", post(question_handler))
        .route("/api/graph-data", get(graph_data_handler))
        .route("/api/search", get(search_handler))
        .route("/api/search-session", get(search_session_handler))
        .route("/api/insights", get(insights_handler))
        .route("/api/status", get(status_handler))
        .route("/api/seed", post(seed_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .with_state(app_state)
}

// --- Handlers de registros ---

#[axum::debug_handler]
async fn list_records_handler(State(state): State<AppState>) -> Json<Vec<RecordView>> {
    let records = state.store.list();
    Json(records.into_iter().map(RecordView::from).collect())
}

#[axum::debug_handler]
async fn create_record_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateRecordPayload>,
) -> Result<impl IntoResponse, CoreError> {
    let content = resolve_content(payload.content, payload.document)?;
    let record = state.store.create(RecordInput {
        title: payload.title,
        content,
        feel: payload.feel,
        date: payload.date,
        user_id: payload.user_id,
    })?;
    Ok((StatusCode::CREATED, Json(RecordView::from(record))))
}

#[axum::debug_handler]
async fn update_record_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateRecordPayload>,
) -> Result<Json<RecordView>, CoreError> {
    let content = match (payload.content, payload.document) {
        (None, None) => None,
        (content, document) => Some(resolve_content(content, document)?),
    };
    let record = state.store.update(
        &id,
        RecordUpdate {
            title: payload.title,
            content,
            feel: payload.feel,
            date: payload.date,
        },
    )?;
    Ok(Json(RecordView::from(record)))
}

#[axum::debug_handler]
async fn delete_record_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, CoreError> {
    state.store.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// El árbol de bloques tiene prioridad: si llega, el texto plano almacenado
/// es su proyección.
fn resolve_content(
    content: Option<String>,
    doc: Option<Vec<Block>>,
) -> Result<String, CoreError> {
    match (doc, content) {
        (Some(blocks), _) => Ok(document::to_plain_text(&blocks)),
        (None, Some(content)) => Ok(content),
        (None, None) => Err(CoreError::Validation(
            "se requiere content o document".to_string(),
        )),
    }
}

// --- Handler de preguntas ---

#[axum::debug_handler]
async fn question_handler(
    State(state): State<AppState>,
    Json(payload): Json<QuestionPayload>,
) -> Result<Json<QuestionResponse>, (StatusCode, Json<serde_json::Value>)> {
    if payload.text.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": "la pregunta no puede estar vacía"})),
        ));
    }

    let generation = state.requests.begin();

    let user_id = payload
        .user_id
        .unwrap_or_else(|| state.config.default_user_id.clone());

    // El flujo de preguntas opera sólo sobre los registros del usuario.
    let records: Vec<Record> = state
        .store
        .list()
        .into_iter()
        .filter(|r| r.user_id == user_id)
        .collect();
    let nodes = graph::derive_nodes(&records);
    let edges = graph::derive_edges(&nodes);

    let context_records = question::select_context_records(&records, &payload.text, 5);
    let context = question::format_context(&context_records);

    // En caso de fallo del servicio de razonamiento no se devuelve un 5xx:
    // degradación a la búsqueda local por subcadena sobre el mismo texto.
    let (answer, search_result) = match state
        .llm_manager
        .answer_question(&payload.text, &context)
        .await
    {
        Ok(answer) => {
            let result = question::resolve_search_result(
                &answer.related_record_ids,
                &payload.text,
                &nodes,
                &edges,
            );
            (answer, result)
        }
        Err(err) => {
            warn!("Fallo del servicio de razonamiento, usando búsqueda local: {err}");
            let result = search::build_search_result(&payload.text, &nodes, &edges);
            (
                crate::llm::LlmAnswer {
                    answer: "일기 검색 결과만 표시합니다. (추론 서비스에 연결할 수 없습니다)"
                        .to_string(),
                    ..Default::default()
                },
                result,
            )
        }
    };

    // Guardia de respuestas obsoletas: sólo la última generación emitida
    // puede actualizar el estado visible de la sesión.
    if state.requests.is_current(generation) {
        *state.last_search.lock().unwrap() = Some(search_result.clone());
    }

    Ok(Json(QuestionResponse {
        answer: answer.answer,
        reasoning_path: ReasoningPath {
            summary: answer.reasoning_summary,
            records: answer.related_record_ids,
            graph_snapshot: GraphSnapshot {
                node_count: search_result.node_ids.len(),
                edge_count: search_result.edge_ids.len(),
            },
        },
        confidence: answer.confidence,
        search_result,
    }))
}

// --- Handlers de derivación ---

#[axum::debug_handler]
async fn graph_data_handler(State(state): State<AppState>) -> Json<GraphData> {
    let records = state.store.list();
    let nodes = graph::derive_nodes(&records);
    let edges = graph::derive_edges(&nodes);
    let timeline = graph::derive_timeline(&nodes);
    Json(GraphData { nodes, edges, timeline })
}

#[axum::debug_handler]
async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResult> {
    let generation = state.requests.begin();

    let records = state.store.list();
    let nodes = graph::derive_nodes(&records);
    let edges = graph::derive_edges(&nodes);
    let result = search::build_search_result(&params.q, &nodes, &edges);

    if state.requests.is_current(generation) {
        *state.last_search.lock().unwrap() = Some(result.clone());
    }

    Json(result)
}

#[axum::debug_handler]
async fn search_session_handler(
    State(state): State<AppState>,
) -> Json<Option<SearchResult>> {
    Json(state.last_search.lock().unwrap().clone())
}

#[axum::debug_handler]
async fn insights_handler(
    State(state): State<AppState>,
    Query(params): Query<InsightParams>,
) -> Json<InsightsResponse> {
    let records = state.store.list();
    let today = Local::now().date_naive();
    let days = if params.days == 30 { 30 } else { 7 };

    let daily_from = today - Duration::days((days - 1) as i64);
    let daily_counts = insight::bucket_counts(&records, PeriodUnit::Day, daily_from, today);

    let weekly_from = today - Duration::days(7 * 11);
    let weekly_counts = insight::bucket_counts(&records, PeriodUnit::Week, weekly_from, today);

    let monthly_counts = match records.iter().map(|r| r.date).min() {
        Some(oldest) => insight::bucket_counts(&records, PeriodUnit::Month, oldest, today),
        None => Vec::new(),
    };

    let emotion_counts = insight::emotion_counts(&records);
    let top_emotion = emotion_counts.first().map(|e| e.label.clone());

    Json(InsightsResponse {
        total_records: records.len(),
        streak: insight::write_streak(&records, today),
        top_emotion,
        emotion_counts,
        daily_counts: to_bucket_views(daily_counts),
        weekly_counts: to_bucket_views(weekly_counts),
        monthly_counts: to_bucket_views(monthly_counts),
        heatmap: insight::heatmap_grid(&records, today),
        word_counts: insight::word_counts(&records),
    })
}

fn to_bucket_views(buckets: Vec<(NaiveDate, u32)>) -> Vec<BucketCount> {
    buckets
        .into_iter()
        .map(|(date, count)| BucketCount { date, count })
        .collect()
}

// --- Handlers de estado, seeding y apagado ---

#[axum::debug_handler]
async fn status_handler(State(state): State<AppState>) -> Json<Status> {
    Json(state.status.lock().unwrap().clone())
}

#[axum::debug_handler]
async fn seed_handler(
    State(state): State<AppState>,
) -> Result<StatusCode, (StatusCode, Json<serde_json::Value>)> {
    {
        let status = state.status.lock().unwrap();
        if status.is_busy {
            return Err((
                StatusCode::CONFLICT,
                Json(json!({"error": "Ya hay una generación en curso."})),
            ));
        }
    }

    spawn(async move {
        {
            let mut status = state.status.lock().unwrap();
            status.is_busy = true;
            status.message = "Iniciando generación de diarios sintéticos...".to_string();
            status.progress = 0.0;
        }

        let result =
            generator::generate_all(&state.llm_manager, &state.config, state.status.clone())
                .await;

        let mut status = state.status.lock().unwrap();
        status.is_busy = false;
        status.progress = 0.0;
        match result {
            Ok((summary, diaries)) => {
                let records =
                    generator::to_records(diaries, &state.config.default_user_id);
                match state.store.replace_all(records) {
                    Ok(n) => {
                        status.message =
                            format!("¡Seeding completado! {summary} {n} registros en el almacén.");
                    }
                    Err(err) => {
                        status.message = format!("Error persistiendo el seeding: {err}");
                    }
                }
            }
            Err(err) => {
                status.message = format!("Error en la generación: {err}");
            }
        }
    });

    Ok(StatusCode::ACCEPTED)
}

#[axum::debug_handler]
async fn shutdown_handler(State(state): State<AppState>) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    if let Some(sender) = state.shutdown_sender.lock().unwrap().take() {
        let _ = sender.send(());
    }
    StatusCode::OK
}
