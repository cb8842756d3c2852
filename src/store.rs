//! Almacén de registros en memoria, de escritor único, con persistencia a un
//! fichero JSON. La lista se reemplaza en bloque (refresh/seed); nunca hay
//! más de un escritor porque todas las escrituras llegan serializadas desde
//! la UI.

use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::models::Record;

/// Campos de entrada para crear un registro. El `id` lo asigna el almacén.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordInput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub feel: Vec<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Actualización parcial: sólo los campos presentes se modifican.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub feel: Option<Vec<String>>,
    pub date: Option<NaiveDate>,
}

pub struct RecordStore {
    records: RwLock<Vec<Record>>,
    data_file: Option<PathBuf>,
    default_user_id: String,
}

impl RecordStore {
    /// Crea un almacén vacío sin persistencia (tests y derivaciones puras).
    pub fn in_memory() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            data_file: None,
            default_user_id: "default".to_string(),
        }
    }

    /// Crea el almacén cargando el fichero de datos si existe.
    pub fn open(data_file: PathBuf, default_user_id: &str) -> Self {
        let records = match fs::read_to_string(&data_file) {
            Ok(raw) => match serde_json::from_str::<Vec<Record>>(&raw) {
                Ok(records) => {
                    info!("Cargados {} registros desde {}", records.len(), data_file.display());
                    records
                }
                Err(e) => {
                    warn!("Fichero de datos ilegible ({e}), arrancando vacío");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        Self {
            records: RwLock::new(records),
            data_file: Some(data_file),
            default_user_id: default_user_id.to_string(),
        }
    }

    /// Copia de la lista completa, las creadas más recientemente primero.
    pub fn list(&self) -> Vec<Record> {
        let records = self.records.read().unwrap();
        let mut out: Vec<Record> = records.clone();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out
    }

    pub fn get(&self, id: &str) -> Option<Record> {
        let records = self.records.read().unwrap();
        records.iter().find(|r| r.id == id).cloned()
    }

    pub fn create(&self, input: RecordInput) -> Result<Record, CoreError> {
        if input.title.trim().is_empty() {
            return Err(CoreError::Validation("title vacío".to_string()));
        }
        if input.content.trim().is_empty() {
            return Err(CoreError::Validation("content vacío".to_string()));
        }

        let record = Record {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            date: input.date,
            feel: input.feel,
            content: input.content,
            user_id: input
                .user_id
                .unwrap_or_else(|| self.default_user_id.clone()),
            created_at: Utc::now(),
        };

        // Se prepara la lista nueva y sólo se publica si la escritura a
        // disco tuvo éxito: un fallo deja la lista en memoria intacta.
        let mut records = self.records.write().unwrap();
        let mut staged = records.clone();
        staged.push(record.clone());
        self.persist(&staged)?;
        *records = staged;
        Ok(record)
    }

    pub fn update(&self, id: &str, update: RecordUpdate) -> Result<Record, CoreError> {
        if matches!(&update.title, Some(t) if t.trim().is_empty()) {
            return Err(CoreError::Validation("title vacío".to_string()));
        }
        if matches!(&update.content, Some(c) if c.trim().is_empty()) {
            return Err(CoreError::Validation("content vacío".to_string()));
        }

        let mut records = self.records.write().unwrap();
        let mut staged = records.clone();
        let record = staged
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;

        if let Some(title) = update.title {
            record.title = title;
        }
        if let Some(content) = update.content {
            record.content = content;
        }
        if let Some(feel) = update.feel {
            record.feel = feel;
        }
        if let Some(date) = update.date {
            record.date = date;
        }

        let updated = record.clone();
        self.persist(&staged)?;
        *records = staged;
        Ok(updated)
    }

    pub fn delete(&self, id: &str) -> Result<(), CoreError> {
        let mut records = self.records.write().unwrap();
        let mut staged = records.clone();
        let before = staged.len();
        staged.retain(|r| r.id != id);
        if staged.len() == before {
            return Err(CoreError::NotFound(id.to_string()));
        }
        self.persist(&staged)?;
        *records = staged;
        Ok(())
    }

    /// Operación de refresco: reemplaza la lista completa (p. ej. tras el
    /// seeding sintético).
    pub fn replace_all(&self, new_records: Vec<Record>) -> Result<usize, CoreError> {
        let mut records = self.records.write().unwrap();
        self.persist(&new_records)?;
        *records = new_records;
        Ok(records.len())
    }

    fn persist(&self, records: &[Record]) -> Result<(), CoreError> {
        let Some(path) = &self.data_file else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CoreError::Network(format!("creando {}: {e}", parent.display())))?;
        }
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| CoreError::Network(format!("serializando registros: {e}")))?;
        fs::write(path, json)
            .map_err(|e| CoreError::Network(format!("escribiendo {}: {e}", path.display())))
    }
}
