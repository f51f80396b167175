/// Notes
///
/// A note belongs to its creator. Leads can see and edit every note.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{check_non_blank, double_option, push_scope, RECENCY_ORDER};
use crate::auth::policy::{Ownership, ReadScope};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "note_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    #[default]
    General,
    Meeting,
    Decision,
    Idea,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub note_type: NoteType,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn ownership(&self) -> Ownership {
        Ownership {
            created_by: self.created_by,
            assignee: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_create_note"))]
pub struct CreateNote {
    #[validate(
        required(message = "title is required"),
        length(max = 255, message = "title must be at most 255 characters")
    )]
    pub title: Option<String>,
    pub content: Option<String>,
    pub note_type: Option<NoteType>,
}

fn validate_create_note(input: &CreateNote) -> Result<(), ValidationError> {
    check_non_blank("title", input.title.as_deref())
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_note_patch"))]
pub struct NotePatch {
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub content: Option<Option<String>>,
    pub note_type: Option<NoteType>,
}

fn validate_note_patch(patch: &NotePatch) -> Result<(), ValidationError> {
    if patch.title.is_some() {
        check_non_blank("title", patch.title.as_deref())?;
    }
    Ok(())
}

const NOTE_COLUMNS: &str = "id, title, content, note_type, created_by, created_at, updated_at";

impl Note {
    pub async fn list<'e>(
        executor: impl PgExecutor<'e>,
        scope: ReadScope,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {NOTE_COLUMNS} FROM notes"));
        push_scope(&mut qb, scope);
        qb.push(RECENCY_ORDER);

        qb.build_query_as::<Note>().fetch_all(executor).await
    }

    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        created_by: Uuid,
        input: CreateNote,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Note>(&format!(
            r#"
            INSERT INTO notes (title, content, note_type, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING {NOTE_COLUMNS}
            "#
        ))
        .bind(input.title.unwrap_or_default().trim().to_string())
        .bind(input.content)
        .bind(input.note_type.unwrap_or_default())
        .bind(created_by)
        .fetch_one(executor)
        .await
    }

    pub async fn find_for_update<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Note>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn update<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        patch: NotePatch,
    ) -> Result<Self, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE notes SET updated_at = NOW()");

        if let Some(title) = patch.title {
            qb.push(", title = ").push_bind(title.trim().to_string());
        }
        if let Some(content) = patch.content {
            qb.push(", content = ").push_bind(content);
        }
        if let Some(note_type) = patch.note_type {
            qb.push(", note_type = ").push_bind(note_type);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {NOTE_COLUMNS}"));

        qb.build_query_as::<Note>().fetch_one(executor).await
    }

    pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_type_default_and_format() {
        assert_eq!(NoteType::default(), NoteType::General);
        assert_eq!(serde_json::to_string(&NoteType::Decision).unwrap(), r#""decision""#);
    }

    #[test]
    fn test_create_note_validation() {
        let ok: CreateNote =
            serde_json::from_str(r#"{"title": "Standup", "note_type": "meeting"}"#).unwrap();
        assert!(ok.validate().is_ok());

        let missing: CreateNote = serde_json::from_str(r#"{"content": "body"}"#).unwrap();
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_note_patch_clears_content() {
        let patch: NotePatch = serde_json::from_str(r#"{"content": null}"#).unwrap();
        assert_eq!(patch.content, Some(None));
        assert!(patch.validate().is_ok());

        assert!(serde_json::from_str::<NotePatch>(r#"{"created_by": null}"#).is_err());
    }
}
