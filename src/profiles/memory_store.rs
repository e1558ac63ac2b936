use super::{Profile, ProfileStore};

/// Process-local store, insertion ordered. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: Vec<Profile>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.profiles.iter().position(|p| p.id == id)
    }
}

impl ProfileStore for MemoryProfileStore {
    fn get(&self, id: &str) -> anyhow::Result<Option<Profile>> {
        Ok(self.position(id).map(|i| self.profiles[i].clone()))
    }

    fn list(&self) -> anyhow::Result<Vec<Profile>> {
        Ok(self.profiles.clone())
    }

    fn put(&mut self, profile: Profile) -> anyhow::Result<bool> {
        if self.position(&profile.id).is_some() {
            return Ok(false);
        }
        self.profiles.push(profile);
        Ok(true)
    }

    fn delete(&mut self, id: &str) -> anyhow::Result<bool> {
        match self.position(id) {
            Some(i) => {
                self.profiles.remove(i);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn count(&self) -> anyhow::Result<usize> {
        Ok(self.profiles.len())
    }

    fn clear(&mut self) -> anyhow::Result<usize> {
        let n = self.profiles.len();
        self.profiles.clear();
        Ok(n)
    }
}
