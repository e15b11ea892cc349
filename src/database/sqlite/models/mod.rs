
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::str::FromStr;
use uuid::Uuid;

use crate::vector::Vector;
use crate::{IndexError, Result};

/// Logical partition of a user's chunks; each (user, namespace) pair is one shard
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type,
)]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Namespace {
    Profile,
    EditedSection,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Profile, Namespace::EditedSection];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match *self {
            Namespace::Profile => "profile",
            Namespace::EditedSection => "edited-section",
        }
    }
}

impl std::fmt::Display for Namespace {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = IndexError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "profile" => Ok(Namespace::Profile),
            "edited-section" => Ok(Namespace::EditedSection),
            other => Err(IndexError::InvalidRequest(format!(
                "Unknown namespace '{other}' (expected 'profile' or 'edited-section')"
            ))),
        }
    }
}

/// A stored text fragment. Immutable once written.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub chunk_id: String,
    pub user_id: String,
    pub namespace: Namespace,
    pub section_id: Option<String>,
    pub source_type: String,
    pub source_id: String,
    pub text: String,
    pub embedding: Vector,
    pub created_at: NaiveDateTime,
}

/// Write-side shape of a chunk; the store assigns `created_at`
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunk {
    pub chunk_id: String,
    pub user_id: String,
    pub namespace: Namespace,
    pub section_id: Option<String>,
    pub source_type: String,
    pub source_id: String,
    pub text: String,
    pub embedding: Vector,
}

impl NewChunk {
    /// New chunk with a freshly generated UUID v4 id
    #[inline]
    pub fn new(
        user_id: impl Into<String>,
        namespace: Namespace,
        source_type: impl Into<String>,
        source_id: impl Into<String>,
        text: impl Into<String>,
        embedding: Vector,
    ) -> Self {
        Self {
            chunk_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            namespace,
            section_id: None,
            source_type: source_type.into(),
            source_id: source_id.into(),
            text: text.into(),
            embedding,
        }
    }

    #[inline]
    pub fn with_section(mut self, section_id: impl Into<String>) -> Self {
        self.section_id = Some(section_id.into());
        self
    }

    #[inline]
    pub fn into_chunk(self, created_at: NaiveDateTime) -> Chunk {
        Chunk {
            chunk_id: self.chunk_id,
            user_id: self.user_id,
            namespace: self.namespace,
            section_id: self.section_id,
            source_type: self.source_type,
            source_id: self.source_id,
            text: self.text,
            embedding: self.embedding,
            created_at,
        }
    }
}

/// Raw `chunks` row with the embedding still encoded
#[derive(Debug, Clone, FromRow)]
pub struct ChunkRow {
    pub chunk_id: String,
    pub user_id: String,
    pub namespace: Namespace,
    pub section_id: Option<String>,
    pub source_type: String,
    pub source_id: String,
    pub text: String,
    pub embedding: Vec<u8>,
    pub created_at: NaiveDateTime,
}

impl TryFrom<ChunkRow> for Chunk {
    type Error = IndexError;

    #[inline]
    fn try_from(row: ChunkRow) -> Result<Self> {
        let embedding = Vector::from_bytes(&row.embedding).map_err(|e| {
            IndexError::StoreUnavailable(format!(
                "Corrupt embedding for chunk {}: {}",
                row.chunk_id, e
            ))
        })?;

        Ok(Chunk {
            chunk_id: row.chunk_id,
            user_id: row.user_id,
            namespace: row.namespace,
            section_id: row.section_id,
            source_type: row.source_type,
            source_id: row.source_id,
            text: row.text,
            embedding,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserMarker {
    pub user_id: String,
    pub last_indexed_at: NaiveDateTime,
}

/// Number of stored rows for one (user, namespace) shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ShardCount {
    pub user_id: String,
    pub namespace: Namespace,
    pub count: i64,
}
