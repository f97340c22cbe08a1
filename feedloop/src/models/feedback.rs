use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Metadata;
use crate::error::{FeedloopError, Result};

pub const META_ID: &str = "id";
pub const META_QUERY: &str = "query";
pub const META_RESPONSE: &str = "response";
pub const META_UPDATED_RESPONSE: &str = "updated_response";
pub const META_USER_ROLE: &str = "user_role";
pub const META_CREATED_AT: &str = "created_at";

/// Role of the person submitting a correction or asking a question.
///
/// Ordered by authority: `Driver < Manager < Owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Driver,
    Manager,
    Owner,
}

impl UserRole {
    pub const ALL: [UserRole; 3] = [UserRole::Driver, UserRole::Manager, UserRole::Owner];

    /// Dominant ranking key for feedback.
    pub const fn weight(self) -> u8 {
        match self {
            Self::Driver => 1,
            Self::Manager => 2,
            Self::Owner => 3,
        }
    }

    /// Additive bonus applied on top of vector similarity.
    pub const fn boost(self) -> f32 {
        match self {
            Self::Driver => 0.0,
            Self::Manager => 0.3,
            Self::Owner => 0.6,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Manager => "manager",
            Self::Owner => "owner",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "driver" => Ok(Self::Driver),
            "manager" => Ok(Self::Manager),
            "owner" => Ok(Self::Owner),
            _ => Err(format!("Unknown user role: {s}")),
        }
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|_| {
            de::Error::custom(format!(
                "Invalid userRole '{raw}'. Valid roles: driver, manager, owner"
            ))
        })
    }
}

/// A correction submitted by a user. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub id: Uuid,
    pub query: String,
    pub response: String,
    pub updated_response: String,
    pub user_role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl FeedbackEntry {
    pub fn new(
        query: impl Into<String>,
        response: impl Into<String>,
        updated_response: impl Into<String>,
        user_role: UserRole,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.into(),
            response: response.into(),
            updated_response: updated_response.into(),
            user_role,
            created_at: Utc::now(),
        }
    }

    /// Metadata stored next to the entry's vector in the feedback index.
    pub fn projection_metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert(META_ID.to_string(), self.id.to_string());
        metadata.insert(META_QUERY.to_string(), self.query.clone());
        metadata.insert(META_RESPONSE.to_string(), self.response.clone());
        metadata.insert(
            META_UPDATED_RESPONSE.to_string(),
            self.updated_response.clone(),
        );
        metadata.insert(META_USER_ROLE.to_string(), self.user_role.to_string());
        metadata.insert(
            META_CREATED_AT.to_string(),
            self.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        );
        metadata
    }

    /// Rebuild an entry from its vector projection.
    ///
    /// `content` is the embedded text (the updated response) and is used when
    /// the metadata lacks `updated_response`.
    pub fn from_projection(content: &str, metadata: &Metadata) -> Result<Self> {
        let field = |key: &str| {
            metadata.get(key).ok_or_else(|| {
                FeedloopError::VectorStore(format!("Feedback projection is missing '{key}'"))
            })
        };

        let id = Uuid::parse_str(field(META_ID)?).map_err(|e| {
            FeedloopError::VectorStore(format!("Invalid feedback id in projection: {e}"))
        })?;
        let user_role = field(META_USER_ROLE)?
            .parse::<UserRole>()
            .map_err(FeedloopError::VectorStore)?;
        let created_at = DateTime::parse_from_rfc3339(field(META_CREATED_AT)?)
            .map_err(|e| {
                FeedloopError::VectorStore(format!("Invalid created_at in projection: {e}"))
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id,
            query: field(META_QUERY)?.clone(),
            response: metadata.get(META_RESPONSE).cloned().unwrap_or_default(),
            updated_response: metadata
                .get(META_UPDATED_RESPONSE)
                .cloned()
                .unwrap_or_else(|| content.to_string()),
            user_role,
            created_at,
        })
    }
}

/// A feedback entry scored against the current query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedFeedback {
    pub entry: FeedbackEntry,
    pub score: f32,
    pub weight: u8,
}

/// Flattened view of [`RetrievedFeedback`] handed to callers and to the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSnippet {
    pub id: Uuid,
    pub query: String,
    pub response: String,
    pub updated_response: String,
    pub user_role: UserRole,
    pub score: f32,
    pub weight: u8,
    pub created_at: DateTime<Utc>,
}

impl From<RetrievedFeedback> for FeedbackSnippet {
    fn from(item: RetrievedFeedback) -> Self {
        let RetrievedFeedback {
            entry,
            score,
            weight,
        } = item;
        Self {
            id: entry.id,
            query: entry.query,
            response: entry.response,
            updated_response: entry.updated_response,
            user_role: entry.user_role,
            score,
            weight,
            created_at: entry.created_at,
        }
    }
}
