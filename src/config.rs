//! Carga y gestión de configuración de la aplicación (servidor + LLM + datos).

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;

#[derive(Clone, Debug)]
pub enum LlmProvider {
    OpenAI,
    Gemini,
    Ollama,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(anyhow::anyhow!("Proveedor LLM no soportado: {other}")),
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,
    /// Fichero JSON donde se persiste el almacén de registros.
    pub data_file: PathBuf,
    pub default_user_id: String,

    pub llm_provider: LlmProvider,
    pub llm_chat_model: String,

    // Rango inclusivo y cadencia del generador de diarios sintéticos.
    pub seed_start_date: NaiveDate,
    pub seed_end_date: NaiveDate,
    pub seed_step_days: u32,
    pub seed_batch_size: usize,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        let server_addr =
            env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:3323".to_string());

        let data_file = match env::var("DATA_FILE") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_data_file(),
        };

        let default_user_id =
            env::var("DEFAULT_USER_ID").unwrap_or_else(|_| "default".to_string());

        let llm_provider_str =
            env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let llm_provider = LlmProvider::from_str(&llm_provider_str)?;
        let llm_chat_model =
            env::var("LLM_CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let seed_start_date = parse_date_var("SEED_START_DATE", "2025-10-01")?;
        let seed_end_date = parse_date_var("SEED_END_DATE", "2026-02-01")?;
        if seed_end_date < seed_start_date {
            return Err(anyhow::anyhow!(
                "SEED_END_DATE debe ser >= SEED_START_DATE"
            ));
        }

        let seed_step_days = env::var("SEED_STEP_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);
        if seed_step_days == 0 {
            return Err(anyhow::anyhow!("SEED_STEP_DAYS debe ser > 0"));
        }

        let seed_batch_size = env::var("SEED_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            server_addr,
            data_file,
            default_user_id,
            llm_provider,
            llm_chat_model,
            seed_start_date,
            seed_end_date,
            seed_step_days,
            seed_batch_size,
        })
    }
}

fn parse_date_var(name: &str, default: &str) -> Result<NaiveDate> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("{name} inválida ({raw}): {e}"))
}

fn default_data_file() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("diary_memory").join("records.json"))
        .unwrap_or_else(|| PathBuf::from("data/records.json"))
}
