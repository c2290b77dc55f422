// Prompt history: prompts and the transformations produced from them

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

use super::{now_timestamp, Database};
use crate::error::StoreError;

/// A saved user prompt with its transformations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptRecord {
    pub id: String,
    pub title: Option<String>,
    pub content: String,
    pub framework: String,
    pub model: String,
    pub created_at: String,
    pub transformations: Vec<TransformationRecord>,
}

/// One transformation result; `prompt_id` must reference an existing prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformationRecord {
    pub id: String,
    pub prompt_id: String,
    pub transformed_content: String,
    pub provider: String,
    pub model_used: String,
    pub processing_time: Option<i64>,
    pub created_at: String,
}

/// Persists transformation requests and responses
pub trait HistoryStore: Send + Sync {
    fn save(
        &self,
        content: &str,
        framework: &str,
        model: &str,
        title: Option<&str>,
    ) -> Result<PromptRecord, StoreError>;

    fn save_transformation(
        &self,
        prompt_id: &str,
        transformed_content: &str,
        provider: &str,
        model_used: &str,
        processing_time_ms: Option<i64>,
    ) -> Result<TransformationRecord, StoreError>;

    /// Delete a prompt and its transformations
    fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Newest prompt first; transformations oldest first
    fn list(&self) -> Result<Vec<PromptRecord>, StoreError>;
}

/// SQLite-backed history store
#[derive(Clone)]
pub struct SqliteHistoryStore {
    db: Database,
}

impl SqliteHistoryStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// "Prompt - 2025-01-31"
fn default_title(now: DateTime<Utc>) -> String {
    format!("Prompt - {}", now.format("%Y-%m-%d"))
}

fn prompt_exists(conn: &Connection, id: &str) -> Result<bool, StoreError> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM prompts WHERE id = ?", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

fn transformation_from_row(row: &Row<'_>) -> rusqlite::Result<TransformationRecord> {
    Ok(TransformationRecord {
        id: row.get(0)?,
        prompt_id: row.get(1)?,
        transformed_content: row.get(2)?,
        provider: row.get(3)?,
        model_used: row.get(4)?,
        processing_time: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl HistoryStore for SqliteHistoryStore {
    fn save(
        &self,
        content: &str,
        framework: &str,
        model: &str,
        title: Option<&str>,
    ) -> Result<PromptRecord, StoreError> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_title(Utc::now()));

        let record = PromptRecord {
            id: Uuid::new_v4().to_string(),
            title: Some(title),
            content: content.to_string(),
            framework: framework.to_string(),
            model: model.to_string(),
            created_at: now_timestamp(),
            transformations: Vec::new(),
        };

        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO prompts (id, title, content, framework, model, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.title,
                record.content,
                record.framework,
                record.model,
                record.created_at
            ],
        )?;
        tracing::debug!(prompt_id = %record.id, "Saved prompt");
        Ok(record)
    }

    fn save_transformation(
        &self,
        prompt_id: &str,
        transformed_content: &str,
        provider: &str,
        model_used: &str,
        processing_time_ms: Option<i64>,
    ) -> Result<TransformationRecord, StoreError> {
        let conn = self.db.lock()?;
        if !prompt_exists(&conn, prompt_id)? {
            return Err(StoreError::NotFound(format!("prompt {}", prompt_id)));
        }

        let record = TransformationRecord {
            id: Uuid::new_v4().to_string(),
            prompt_id: prompt_id.to_string(),
            transformed_content: transformed_content.to_string(),
            provider: provider.to_string(),
            model_used: model_used.to_string(),
            processing_time: processing_time_ms,
            created_at: now_timestamp(),
        };

        conn.execute(
            "INSERT INTO transformations
                (id, prompt_id, transformed_content, provider, model_used, processing_time, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.prompt_id,
                record.transformed_content,
                record.provider,
                record.model_used,
                record.processing_time,
                record.created_at
            ],
        )?;
        tracing::debug!(
            prompt_id = %record.prompt_id,
            transformation_id = %record.id,
            "Saved transformation"
        );
        Ok(record)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.db.lock()?;
        let removed = conn.execute("DELETE FROM prompts WHERE id = ?", [id])?;
        if removed == 0 {
            return Err(StoreError::NotFound(format!("prompt {}", id)));
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<PromptRecord>, StoreError> {
        let conn = self.db.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, title, content, framework, model, created_at
             FROM prompts ORDER BY created_at DESC, rowid DESC",
        )?;
        let mut prompts = stmt
            .query_map([], |row| {
                Ok(PromptRecord {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                    framework: row.get(3)?,
                    model: row.get(4)?,
                    created_at: row.get(5)?,
                    transformations: Vec::new(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT id, prompt_id, transformed_content, provider, model_used, processing_time, created_at
             FROM transformations WHERE prompt_id = ? ORDER BY created_at ASC, rowid ASC",
        )?;
        for prompt in &mut prompts {
            prompt.transformations = stmt
                .query_map([&prompt.id], transformation_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
        }

        Ok(prompts)
    }
}
