// profiles/ — Student profile types and storage backends.
//
// Profiles are immutable once stored: embeddings are computed at creation and
// never recomputed on read. There is no update path: delete and create again.

pub mod memory_store;
pub mod sqlite_store;
pub mod store;

use anyhow::bail;
use serde::{Deserialize, Serialize};

pub use memory_store::MemoryProfileStore;
pub use sqlite_store::SqliteProfileStore;
pub use store::ProfileStore;

/// Profile as submitted by a client, before embedding.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub id: String,
    pub name: String,
    pub strengths: String,
    pub weaknesses: String,
    #[serde(default)]
    pub preferences: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewProfile {
    /// Trim id and name and reject blanks. Strength/weakness text may be blank.
    pub fn validated(mut self) -> anyhow::Result<Self> {
        self.id = self.id.trim().to_string();
        self.name = self.name.trim().to_string();
        if self.id.is_empty() {
            bail!("profile id must not be empty");
        }
        if self.name.is_empty() {
            bail!("profile name must not be empty");
        }
        Ok(self)
    }
}

/// Stored profile with both embeddings populated.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub strengths: String,
    pub weaknesses: String,
    pub preferences: String,
    pub description: String,
    pub strengths_vector: Vec<f32>,
    pub weaknesses_vector: Vec<f32>,
    pub created_ms: i64,
}

impl Profile {
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            strengths: self.strengths.clone(),
            weaknesses: self.weaknesses.clone(),
            preferences: self.preferences.clone(),
            description: self.description.clone(),
        }
    }
}

/// Outward view of a profile, without vectors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub id: String,
    pub name: String,
    pub strengths: String,
    pub weaknesses: String,
    pub preferences: String,
    pub description: String,
}

#[cfg(test)]
pub fn fixture(id: &str, strengths_vector: Vec<f32>, weaknesses_vector: Vec<f32>) -> Profile {
    Profile {
        id: id.to_string(),
        name: format!("Student {id}"),
        strengths: String::new(),
        weaknesses: String::new(),
        preferences: String::new(),
        description: String::new(),
        strengths_vector,
        weaknesses_vector,
        created_ms: 0,
    }
}
