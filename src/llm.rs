//! Abstracción sobre Rig para trabajar con distintos proveedores de LLM.
//! De momento se implementa OpenAI; Gemini/Ollama quedan preparados para el
//! futuro.

use crate::config::{AppConfig, LlmProvider};
use anyhow::{anyhow, Result};
use rig::completion::Prompt;
use serde::Deserialize;
use tracing::warn;

/// Respuesta estructurada del servicio de razonamiento sobre el diario.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmAnswer {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub reasoning_summary: String,
    /// Ids de los registros en los que se apoya la respuesta.
    #[serde(default)]
    pub related_record_ids: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
}

/// Gestor de LLMs.
#[derive(Debug, Clone)]
pub struct LlmManager {
    pub provider: LlmProvider,
    pub chat_model: String,
}

impl LlmManager {
    /// Construye el manager a partir de la configuración.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        Ok(Self {
            provider: cfg.llm_provider.clone(),
            chat_model: cfg.llm_chat_model.clone(),
        })
    }

    /// Responde una pregunta sobre el diario usando el contexto suministrado
    /// (los registros preseleccionados, formateados como texto).
    pub async fn answer_question(&self, question: &str, context: &str) -> Result<LlmAnswer> {
        match self.provider {
            LlmProvider::OpenAI => self.answer_with_openai(question, context).await,
            ref other => Err(anyhow!(
                "Proveedor LLM {:?} aún no implementado para chat",
                other
            )),
        }
    }

    async fn answer_with_openai(&self, question: &str, context: &str) -> Result<LlmAnswer> {
        use rig::client::CompletionClient as _;
        use rig::providers::openai;

        const SYSTEM_PROMPT: &str = r#"
Eres un asistente que responde preguntas sobre el diario personal del usuario.
Sólo puedes usar la información del contexto: una lista de entradas de diario,
cada una con su id, fecha, título, etiquetas de ánimo y texto.
Si el contexto no contiene la respuesta, dilo explícitamente.

La salida DEBE ser un único objeto JSON válido con estas claves:
- "answer": la respuesta en el idioma de la pregunta.
- "reasoning_summary": una frase sobre cómo llegaste a la respuesta.
- "related_record_ids": lista con los ids de las entradas usadas (puede ser vacía).
- "confidence": número entre 0 y 1.

No incluyas explicaciones fuera del JSON.
"#;

        let client = openai::Client::from_env();
        let model_name = if self.chat_model.is_empty() {
            "gpt-4o-mini"
        } else {
            self.chat_model.as_str()
        };

        let full_context = format!(
            "Entradas del diario:\n{}\n\nPregunta del usuario:\n{}",
            context, question
        );

        let agent = client
            .agent(model_name)
            .preamble(SYSTEM_PROMPT)
            .context(&full_context)
            .build();

        let response = agent.prompt(question).await?;
        Ok(parse_answer(&response))
    }

    /// Lanza un prompt de generación y devuelve el texto JSON limpio. Lo usa
    /// el generador de diarios sintéticos.
    pub async fn prompt_json(&self, preamble: &str, prompt: &str) -> Result<String> {
        match self.provider {
            LlmProvider::OpenAI => {
                use rig::client::CompletionClient as _;
                use rig::providers::openai;

                let client = openai::Client::from_env();
                let model_name = if self.chat_model.is_empty() {
                    "gpt-4o-mini"
                } else {
                    self.chat_model.as_str()
                };

                let agent = client.agent(model_name).preamble(preamble).build();
                let response = agent.prompt(prompt).await?;
                Ok(strip_fences(&response).to_string())
            }
            ref other => Err(anyhow!(
                "Proveedor LLM {:?} aún no implementado para generación",
                other
            )),
        }
    }
}

/// Limpia la respuesta del LLM para quedarse sólo con el JSON.
fn strip_fences(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_end_matches("```")
        .trim()
}

/// Parseo tolerante: si el modelo no devolvió el JSON esperado, el texto
/// completo pasa a ser la respuesta con confianza 0.
fn parse_answer(response: &str) -> LlmAnswer {
    let json_response = strip_fences(response);
    match serde_json::from_str::<LlmAnswer>(json_response) {
        Ok(answer) => answer,
        Err(e) => {
            warn!("No se pudo parsear el JSON de la respuesta del LLM: {e}");
            LlmAnswer {
                answer: response.trim().to_string(),
                ..Default::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsea_respuesta_estructurada() {
        let raw = r#"```json
        {"answer": "sí", "reasoning_summary": "dos entradas", "related_record_ids": ["r1", "r2"], "confidence": 0.8}
        ```"#;
        let parsed = parse_answer(raw);
        assert_eq!(parsed.answer, "sí");
        assert_eq!(parsed.related_record_ids, vec!["r1", "r2"]);
        assert!((parsed.confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn respuesta_no_json_degrada_a_texto() {
        let parsed = parse_answer("No tengo ni idea.");
        assert_eq!(parsed.answer, "No tengo ni idea.");
        assert!(parsed.related_record_ids.is_empty());
        assert_eq!(parsed.confidence, 0.0);
    }

    #[test]
    fn quita_vallas_de_codigo() {
        assert_eq!(strip_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_fences("  {} "), "{}");
    }
}
