use super::Profile;

/// Keyed profile storage. The matcher only ever reads through this; writes
/// come from the profile service.
pub trait ProfileStore: Send {
    fn get(&self, id: &str) -> anyhow::Result<Option<Profile>>;

    /// All profiles in insertion order.
    fn list(&self) -> anyhow::Result<Vec<Profile>>;

    /// Insert a new profile. Returns `false` and writes nothing if the id exists.
    fn put(&mut self, profile: Profile) -> anyhow::Result<bool>;

    /// Returns `false` if no profile had this id.
    fn delete(&mut self, id: &str) -> anyhow::Result<bool>;

    fn count(&self) -> anyhow::Result<usize>;

    /// Remove every profile, returning how many were removed.
    fn clear(&mut self) -> anyhow::Result<usize>;

    fn contains(&self, id: &str) -> anyhow::Result<bool> {
        Ok(self.get(id)?.is_some())
    }
}
