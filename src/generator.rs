//! Generador de diarios sintéticos para demos: un bucle por lotes sobre el
//! LLM que produce entradas en coreano contra un esquema JSON (schemars) y
//! las valida antes de sembrar el almacén.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate, Utc};
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::app_state::Status;
use crate::config::AppConfig;
use crate::errors::CoreError;
use crate::llm::LlmManager;
use crate::models::Record;

/// Vocabulario de sugerencia del generador. Es una restricción del contenido
/// sintético, no del modelo de datos: el almacén acepta etiquetas libres.
pub const FEEL_VOCABULARY: [&str; 5] = ["기쁨", "평온", "보통", "피곤", "슬픔"];

pub const MIN_CONTENT_CHARS: usize = 420;
pub const MIN_SENTENCES: usize = 10;

/// Una entrada generada, aún sin id ni metadatos de almacén.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedDiary {
    pub title: String,
    /// Fecha en formato YYYY-MM-DD.
    pub date: String,
    pub feel: Vec<String>,
    pub content: String,
}

/// El nivel superior del esquema debe ser un objeto, no un array.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedBatch {
    pub diaries: Vec<GeneratedDiary>,
}

/// Resumen de una operación de seeding.
#[derive(Debug, Default)]
pub struct SeedSummary {
    pub batches_total: u32,
    pub batches_failed: u32,
    pub diaries_generated: usize,
}

impl std::fmt::Display for SeedSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Resumen: {} lotes ({} fallidos), {} diarios generados.",
            self.batches_total, self.batches_failed, self.diaries_generated
        )
    }
}

/// Fechas desde `start` hasta `end` inclusive, cada `step_days` días.
pub fn dates_every_n_days(
    start: NaiveDate,
    end: NaiveDate,
    step_days: u32,
) -> Result<Vec<NaiveDate>> {
    if end < start {
        return Err(anyhow!("la fecha final debe ser >= la inicial"));
    }
    if step_days == 0 {
        return Err(anyhow!("step_days debe ser > 0"));
    }

    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        dates.push(current);
        current = current + Duration::days(step_days as i64);
    }
    Ok(dates)
}

/// Cuenta frases con una heurística simple sobre . ! ? — una racha de signos
/// de cierre termina una frase y el texto final sin cierre cuenta como una.
pub fn count_sentences(text: &str) -> usize {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return 0;
    }

    let mut count = 0;
    let mut prev_terminator = false;
    for ch in cleaned.chars() {
        let terminator = matches!(ch, '.' | '!' | '?');
        if terminator && !prev_terminator {
            count += 1;
        }
        prev_terminator = terminator;
    }
    if !prev_terminator {
        count += 1;
    }
    count
}

/// Validación de un lote generado: campos obligatorios, fecha dentro del
/// rango, `feel` no vacío y dentro del vocabulario, longitud y número de
/// frases mínimos del cuerpo.
pub fn validate_batch(
    entries: &[GeneratedDiary],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), CoreError> {
    for (idx, entry) in entries.iter().enumerate() {
        if entry.title.trim().is_empty() {
            return Err(CoreError::Validation(format!("entrada {idx}: title vacío")));
        }
        if entry.content.trim().is_empty() {
            return Err(CoreError::Validation(format!("entrada {idx}: content vacío")));
        }

        let date = NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d").map_err(|_| {
            CoreError::Validation(format!("entrada {idx}: fecha inválida '{}'", entry.date))
        })?;
        if date < start || date > end {
            return Err(CoreError::Validation(format!(
                "entrada {idx}: fecha fuera de rango: {date}"
            )));
        }

        if entry.feel.is_empty() {
            return Err(CoreError::Validation(format!(
                "entrada {idx}: feel debe ser una lista no vacía"
            )));
        }
        for f in &entry.feel {
            if !FEEL_VOCABULARY.contains(&f.as_str()) {
                return Err(CoreError::Validation(format!(
                    "entrada {idx}: feel inválido \"{f}\""
                )));
            }
        }

        let chars = entry.content.chars().count();
        if chars < MIN_CONTENT_CHARS {
            return Err(CoreError::Validation(format!(
                "entrada {idx}: content demasiado corto ({chars} caracteres, mínimo {MIN_CONTENT_CHARS})"
            )));
        }
        let sentences = count_sentences(&entry.content);
        if sentences < MIN_SENTENCES {
            return Err(CoreError::Validation(format!(
                "entrada {idx}: content debe tener >= {MIN_SENTENCES} frases, tiene {sentences}"
            )));
        }
    }
    Ok(())
}

fn build_prompt(batch_dates: &[NaiveDate]) -> Result<(String, String)> {
    let schema = schema_for!(GeneratedBatch);
    let schema_json = serde_json::to_string_pretty(&schema)?;

    let preamble = format!(
        r#"
Eres un escritor de diarios personales en coreano.
Generas entradas de diario verosímiles de una persona trabajadora: rutina,
trabajo, paseos, cansancio, pequeñas alegrías.

Reglas:
- "feel" es una lista no vacía con valores de: {feels}.
- "content" tiene al menos 10 frases y al menos {min_chars} caracteres.
- "date" usa exactamente la fecha asignada a cada entrada.
- La salida DEBE ser un único objeto JSON válido conforme a este esquema:

{schema}

No incluyas explicaciones, solo el JSON.
"#,
        feels = FEEL_VOCABULARY.join(", "),
        min_chars = MIN_CONTENT_CHARS,
        schema = schema_json,
    );

    let date_list = batch_dates
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let prompt = format!(
        "Genera exactamente {} entradas de diario, una por cada una de estas fechas: {}",
        batch_dates.len(),
        date_list
    );

    Ok((preamble, prompt))
}

/// Bucle de generación por lotes con informe de progreso. Un lote fallido se
/// omite y la generación continúa con el resto.
pub async fn generate_all(
    llm: &LlmManager,
    cfg: &AppConfig,
    status_arc: Arc<Mutex<Status>>,
) -> Result<(SeedSummary, Vec<GeneratedDiary>)> {
    let dates = dates_every_n_days(cfg.seed_start_date, cfg.seed_end_date, cfg.seed_step_days)?;
    let batch_size = cfg.seed_batch_size.max(1);
    let batches: Vec<&[NaiveDate]> = dates.chunks(batch_size).collect();
    let total = batches.len();

    let mut summary = SeedSummary::default();
    let mut diaries = Vec::new();

    for (index, batch) in batches.into_iter().enumerate() {
        summary.batches_total += 1;
        {
            let mut status = status_arc.lock().unwrap();
            status.message = format!(
                "[{}/{}] Generando diarios para {} fechas...",
                index + 1,
                total,
                batch.len()
            );
            status.progress = (index + 1) as f32 / total as f32;
        }

        match generate_batch(llm, cfg, batch).await {
            Ok(mut batch_diaries) => {
                diaries.append(&mut batch_diaries);
            }
            Err(err) => {
                summary.batches_failed += 1;
                error!("Error generando el lote {}: {err}", index + 1);
            }
        }
    }

    summary.diaries_generated = diaries.len();
    info!("{summary}");
    Ok((summary, diaries))
}

async fn generate_batch(
    llm: &LlmManager,
    cfg: &AppConfig,
    batch_dates: &[NaiveDate],
) -> Result<Vec<GeneratedDiary>> {
    let (preamble, prompt) = build_prompt(batch_dates)?;
    let raw = llm.prompt_json(&preamble, &prompt).await?;
    let batch: GeneratedBatch = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("respuesta del LLM no es un lote válido: {e}"))?;
    validate_batch(&batch.diaries, cfg.seed_start_date, cfg.seed_end_date)?;
    Ok(batch.diaries)
}

/// Convierte los diarios generados en registros listos para el almacén.
pub fn to_records(diaries: Vec<GeneratedDiary>, user_id: &str) -> Vec<Record> {
    diaries
        .into_iter()
        .filter_map(|d| {
            let date = NaiveDate::parse_from_str(&d.date, "%Y-%m-%d").ok()?;
            Some(Record {
                id: Uuid::new_v4().to_string(),
                title: d.title,
                date,
                feel: d.feel,
                content: d.content,
                user_id: user_id.to_string(),
                created_at: Utc::now(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn valid_entry(date: &str) -> GeneratedDiary {
        // 14 frases, > 420 caracteres
        let sentence = "오늘은 평범한 하루였지만 기록할 만한 일이 있었다고 생각한다. ";
        GeneratedDiary {
            title: "하루 기록".to_string(),
            date: date.to_string(),
            feel: vec!["보통".to_string()],
            content: sentence.repeat(14),
        }
    }

    #[test]
    fn fechas_cada_n_dias_incluyen_el_final() {
        let dates = dates_every_n_days(d("2025-10-01"), d("2025-10-07"), 2).unwrap();
        assert_eq!(
            dates,
            vec![d("2025-10-01"), d("2025-10-03"), d("2025-10-05"), d("2025-10-07")]
        );
        assert!(dates_every_n_days(d("2025-10-07"), d("2025-10-01"), 2).is_err());
    }

    #[test]
    fn conteo_de_frases() {
        assert_eq!(count_sentences(""), 0);
        assert_eq!(count_sentences("Una frase sin cierre"), 1);
        assert_eq!(count_sentences("Una. Dos! Tres?"), 3);
        // Los puntos suspensivos cuentan como un solo cierre
        assert_eq!(count_sentences("Espera... y llegó."), 2);
        assert_eq!(count_sentences("Cierra. Y un resto"), 2);
    }

    #[test]
    fn lote_valido_pasa() {
        let entries = vec![valid_entry("2025-10-01"), valid_entry("2025-10-03")];
        assert!(validate_batch(&entries, d("2025-10-01"), d("2026-02-01")).is_ok());
    }

    #[test]
    fn valida_fecha_fuera_de_rango() {
        let entries = vec![valid_entry("2026-03-01")];
        assert!(matches!(
            validate_batch(&entries, d("2025-10-01"), d("2026-02-01")),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn valida_feel_fuera_de_vocabulario() {
        let mut entry = valid_entry("2025-10-01");
        entry.feel = vec!["분노".to_string()];
        assert!(validate_batch(&[entry], d("2025-10-01"), d("2026-02-01")).is_err());

        let mut entry = valid_entry("2025-10-01");
        entry.feel.clear();
        assert!(validate_batch(&[entry], d("2025-10-01"), d("2026-02-01")).is_err());
    }

    #[test]
    fn valida_longitud_y_frases_minimas() {
        let mut entry = valid_entry("2025-10-01");
        entry.content = "짧다.".to_string();
        assert!(validate_batch(&[entry], d("2025-10-01"), d("2026-02-01")).is_err());

        // Largo pero con pocas frases
        let mut entry = valid_entry("2025-10-01");
        entry.content = format!("{}.", "가".repeat(500));
        assert!(validate_batch(&[entry], d("2025-10-01"), d("2026-02-01")).is_err());
    }

    #[test]
    fn conversion_a_registros() {
        let records = to_records(vec![valid_entry("2025-10-01")], "default");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, d("2025-10-01"));
        assert!(!records[0].id.is_empty());
    }

    #[test]
    fn el_prompt_incorpora_el_esquema_y_las_fechas() {
        let (preamble, prompt) = build_prompt(&[d("2025-10-01"), d("2025-10-03")]).unwrap();
        assert!(preamble.contains("\"diaries\""));
        assert!(preamble.contains("기쁨"));
        assert!(prompt.contains("2025-10-01"));
        assert!(prompt.contains("exactamente 2"));
    }
}
