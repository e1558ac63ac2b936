// service.rs — Profile lifecycle and match requests over a ProfileStore.
//
// This is where "not found" and "not enough profiles" are decided; the ranking
// function itself is tolerant and just returns an empty list.

use std::sync::Arc;

use serde::Serialize;

use crate::config;
use crate::embeddings::EmbeddingProvider;
use crate::errors::MatchError;
use crate::matching::{find_best_matches, MatchResult};
use crate::profiles::{NewProfile, Profile, ProfileStore, ProfileSummary};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    pub student_id: String,
    pub student_name: String,
    pub total_matches: usize,
    pub matches: Vec<MatchResult>,
}

/// Ids are trimmed on create and on every lookup.
pub struct MatchService {
    store: Box<dyn ProfileStore>,
    embeddings: Arc<EmbeddingProvider>,
}

impl MatchService {
    pub fn new(store: Box<dyn ProfileStore>, embeddings: Arc<EmbeddingProvider>) -> Self {
        Self { store, embeddings }
    }

    /// Embed and store a new profile. Nothing is stored if either embedding fails.
    pub fn create_profile(&mut self, new: NewProfile) -> Result<ProfileSummary, MatchError> {
        let new = new
            .validated()
            .map_err(|e| MatchError::InvalidInput(format!("{e}")))?;

        if self.store.contains(&new.id).map_err(MatchError::Storage)? {
            return Err(MatchError::AlreadyExists(new.id));
        }

        log::info!("Creating profile for student: {}", new.id);

        let strengths_vector = self.embed_field(&new.id, "strengths", &new.strengths)?;
        let weaknesses_vector = self.embed_field(&new.id, "weaknesses", &new.weaknesses)?;

        let profile = Profile {
            id: new.id,
            name: new.name,
            strengths: new.strengths,
            weaknesses: new.weaknesses,
            preferences: new.preferences.unwrap_or_default(),
            description: new.description.unwrap_or_default(),
            strengths_vector,
            weaknesses_vector,
            created_ms: chrono::Utc::now().timestamp_millis(),
        };
        let summary = profile.summary();

        if !self.store.put(profile).map_err(MatchError::Storage)? {
            return Err(MatchError::AlreadyExists(summary.id));
        }

        log::info!("Profile created successfully for {}", summary.id);
        Ok(summary)
    }

    fn embed_field(&self, id: &str, field: &str, text: &str) -> Result<Vec<f32>, MatchError> {
        self.embeddings.embed(text).map_err(|e| {
            log::error!("Error generating {} embedding for {}: {:?}", field, id, e);
            MatchError::Embedding(e)
        })
    }

    pub fn list_profiles(&self) -> Result<Vec<ProfileSummary>, MatchError> {
        let profiles = self.store.list().map_err(MatchError::Storage)?;
        Ok(profiles.iter().map(Profile::summary).collect())
    }

    pub fn get_profile(&self, id: &str) -> Result<ProfileSummary, MatchError> {
        let id = id.trim();
        self.store
            .get(id)
            .map_err(MatchError::Storage)?
            .map(|p| p.summary())
            .ok_or_else(|| MatchError::NotFound(id.to_string()))
    }

    pub fn delete_profile(&mut self, id: &str) -> Result<(), MatchError> {
        let id = id.trim();
        if !self.store.delete(id).map_err(MatchError::Storage)? {
            return Err(MatchError::NotFound(id.to_string()));
        }
        log::info!("Profile deleted: {}", id);
        Ok(())
    }

    pub fn profile_count(&self) -> Result<usize, MatchError> {
        self.store.count().map_err(MatchError::Storage)
    }

    pub fn clear_profiles(&mut self) -> Result<usize, MatchError> {
        let removed = self.store.clear().map_err(MatchError::Storage)?;
        log::warn!("All profiles cleared ({} removed)", removed);
        Ok(removed)
    }

    /// Best `top_k` peers for `student_id`. `top_k` is capped at `MAX_TOP_K`.
    pub fn find_matches(&self, student_id: &str, top_k: usize) -> Result<MatchOutcome, MatchError> {
        let student_id = student_id.trim();
        if top_k == 0 {
            return Err(MatchError::InvalidInput("topK must be at least 1".into()));
        }
        let top_k = top_k.min(config::matching::MAX_TOP_K);

        // One snapshot per request; the store is not consulted again while ranking.
        let pool = self.store.list().map_err(MatchError::Storage)?;

        let Some(target) = pool.iter().find(|p| p.id == student_id) else {
            return Err(MatchError::NotFound(student_id.to_string()));
        };
        if pool.len() < config::matching::MIN_PROFILES_FOR_MATCH {
            return Err(MatchError::InsufficientProfiles {
                have: pool.len(),
                need: config::matching::MIN_PROFILES_FOR_MATCH,
            });
        }
        let student_name = target.name.clone();

        log::info!("Finding top {} matches for student: {}", top_k, student_id);
        let matches = find_best_matches(student_id, &pool, top_k);
        log::info!("Found {} matches for {}", matches.len(), student_id);

        Ok(MatchOutcome {
            student_id: student_id.to_string(),
            student_name,
            total_matches: matches.len(),
            matches,
        })
    }
}
