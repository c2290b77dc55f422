// Named custom system instructions

use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

use super::{now_timestamp, Database};
use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInstruction {
    pub id: String,
    pub name: String,
    pub content: String,
    pub created_at: String,
}

/// SQLite-backed store of reusable system instructions
#[derive(Clone)]
pub struct SqliteInstructionStore {
    db: Database,
}

fn normalize<'a>(name: &'a str, content: &'a str) -> Result<(&'a str, &'a str), StoreError> {
    let (name, content) = (name.trim(), content.trim());
    if name.is_empty() || content.is_empty() {
        return Err(StoreError::Invalid(
            "instruction name and content are required".to_string(),
        ));
    }
    Ok((name, content))
}

impl SqliteInstructionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn add(&self, name: &str, content: &str) -> Result<SystemInstruction, StoreError> {
        let (name, content) = normalize(name, content)?;
        let instruction = SystemInstruction {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            content: content.to_string(),
            created_at: now_timestamp(),
        };

        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO system_instructions (id, name, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                instruction.id,
                instruction.name,
                instruction.content,
                instruction.created_at
            ],
        )?;
        Ok(instruction)
    }

    pub fn update(
        &self,
        id: &str,
        name: &str,
        content: &str,
    ) -> Result<SystemInstruction, StoreError> {
        let (name, content) = normalize(name, content)?;
        {
            let conn = self.db.lock()?;
            let changed = conn.execute(
                "UPDATE system_instructions SET name = ?1, content = ?2 WHERE id = ?3",
                params![name, content, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("instruction {}", id)));
            }
        }
        self.get(id)?
            .ok_or_else(|| StoreError::NotFound(format!("instruction {}", id)))
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.db.lock()?;
        let removed = conn.execute("DELETE FROM system_instructions WHERE id = ?", [id])?;
        if removed == 0 {
            return Err(StoreError::NotFound(format!("instruction {}", id)));
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<SystemInstruction>, StoreError> {
        let conn = self.db.lock()?;
        let found = conn
            .query_row(
                "SELECT id, name, content, created_at FROM system_instructions WHERE id = ?",
                [id],
                |row| {
                    Ok(SystemInstruction {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        content: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }

    /// Insertion order
    pub fn list(&self) -> Result<Vec<SystemInstruction>, StoreError> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, content, created_at FROM system_instructions ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SystemInstruction {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    content: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
