// sqlite_store.rs — Durable profile store on a single SQLite file.
//
// Vectors are stored as little-endian f32 BLOBs whatever the host byte order.
// Their length is checked on every read so a DB written with a different
// embedding model fails loudly instead of scoring garbage.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use rusqlite::{params, Connection, OptionalExtension, Row};
use zerocopy::byteorder::little_endian::F32;
use zerocopy::{FromBytes, IntoBytes};

use super::{Profile, ProfileStore};
use crate::config;

pub struct SqliteProfileStore {
    db_path: Option<PathBuf>,
    conn: Connection,
    dims: usize,
}

const SELECT_COLUMNS: &str = "id, name, strengths, weaknesses, preferences, description, \
                              strengthsVec, weaknessesVec, createdMs";

/// Per-connection settings; run on every open, not only when the schema is created.
fn apply_pragmas(conn: &Connection) -> anyhow::Result<()> {
    // PRAGMA statements do not accept bound parameters; values come from config.
    conn.execute_batch(&format!(
        "\
PRAGMA journal_mode = WAL;\n\
PRAGMA synchronous = NORMAL;\n\
PRAGMA cache_size = {cache_size};\n\
PRAGMA busy_timeout = {busy_timeout};\n\
",
        cache_size = config::sqlite::PRAGMA_CACHE_SIZE_KIB_NEG,
        busy_timeout = config::sqlite::PRAGMA_BUSY_TIMEOUT_MS,
    ))?;
    Ok(())
}

pub fn init_database(conn: &Connection) -> anyhow::Result<()> {
    log::info!("Initializing profile database schema (version {})", config::SCHEMA_VERSION);

    conn.execute_batch(&format!("PRAGMA user_version = {};", config::SCHEMA_VERSION))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            rowid INTEGER PRIMARY KEY,
            id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            strengths TEXT NOT NULL,
            weaknesses TEXT NOT NULL,
            preferences TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            strengthsVec BLOB NOT NULL,
            weaknessesVec BLOB NOT NULL,
            createdMs INTEGER NOT NULL
        );
        "#,
    )?;

    log::info!("Profile database schema initialized");
    Ok(())
}

impl SqliteProfileStore {
    /// Open `<data_dir>/profiles.db`, creating the schema on first use.
    pub fn open(data_dir: &Path, dims: usize) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
        let db_path = data_dir.join(config::sqlite::DB_FILE_NAME);

        log::info!("Opening profile database");
        log::info!("  DB Path: {}", db_path.display());

        let conn = Connection::open(&db_path).with_context(|| format!("open db {}", db_path.display()))?;
        let store = Self::from_connection(Some(db_path), conn, dims)?;
        log::info!("Profile database ready: {} profiles", store.count()?);
        Ok(store)
    }

    #[cfg(test)]
    pub fn open_in_memory(dims: usize) -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory db")?;
        Self::from_connection(None, conn, dims)
    }

    fn from_connection(db_path: Option<PathBuf>, conn: Connection, dims: usize) -> anyhow::Result<Self> {
        apply_pragmas(&conn)?;

        let exists: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type='table' AND name='profiles'",
                [],
                |r| r.get(0),
            )
            .optional()?;

        if exists.is_none() {
            log::info!("Creating new profile database schema");
            init_database(&conn)?;
        } else {
            let version: u32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
            if version != config::SCHEMA_VERSION {
                bail!(
                    "profile database schema version {} does not match {}; clear the store and re-create profiles",
                    version,
                    config::SCHEMA_VERSION
                );
            }
            log::info!("Using existing profile database schema");
        }

        Ok(Self { db_path, conn, dims })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn row_to_profile(&self, r: &Row<'_>) -> rusqlite::Result<(Profile, Vec<u8>, Vec<u8>)> {
        let profile = Profile {
            id: r.get(0)?,
            name: r.get(1)?,
            strengths: r.get(2)?,
            weaknesses: r.get(3)?,
            preferences: r.get(4)?,
            description: r.get(5)?,
            strengths_vector: Vec::new(),
            weaknesses_vector: Vec::new(),
            created_ms: r.get(8)?,
        };
        Ok((profile, r.get(6)?, r.get(7)?))
    }

    fn decode(&self, (mut profile, s, w): (Profile, Vec<u8>, Vec<u8>)) -> anyhow::Result<Profile> {
        profile.strengths_vector = decode_vector(&s, self.dims)
            .with_context(|| format!("strengths vector of profile {}", profile.id))?;
        profile.weaknesses_vector = decode_vector(&w, self.dims)
            .with_context(|| format!("weaknesses vector of profile {}", profile.id))?;
        Ok(profile)
    }
}

impl ProfileStore for SqliteProfileStore {
    fn get(&self, id: &str) -> anyhow::Result<Option<Profile>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM profiles WHERE id = ?1"),
                params![id],
                |r| self.row_to_profile(r),
            )
            .optional()?;
        raw.map(|r| self.decode(r)).transpose()
    }

    fn list(&self) -> anyhow::Result<Vec<Profile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {SELECT_COLUMNS} FROM profiles ORDER BY rowid ASC"))?;
        let rows = stmt.query_map([], |r| self.row_to_profile(r))?;

        let mut out = Vec::new();
        for r in rows {
            out.push(self.decode(r?)?);
        }
        Ok(out)
    }

    fn put(&mut self, profile: Profile) -> anyhow::Result<bool> {
        if profile.strengths_vector.len() != self.dims || profile.weaknesses_vector.len() != self.dims {
            bail!(
                "profile {} has vectors of {}/{} dims, store expects {}",
                profile.id,
                profile.strengths_vector.len(),
                profile.weaknesses_vector.len(),
                self.dims
            );
        }

        let changed = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO profiles
                (id, name, strengths, weaknesses, preferences, description,
                 strengthsVec, weaknessesVec, createdMs)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                profile.id,
                profile.name,
                profile.strengths,
                profile.weaknesses,
                profile.preferences,
                profile.description,
                encode_vector(&profile.strengths_vector),
                encode_vector(&profile.weaknesses_vector),
                profile.created_ms,
            ],
        )?;
        if changed == 0 {
            log::debug!("Skipping duplicate profile id: {}", profile.id);
        }
        Ok(changed > 0)
    }

    fn delete(&mut self, id: &str) -> anyhow::Result<bool> {
        let changed = self.conn.execute("DELETE FROM profiles WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn count(&self) -> anyhow::Result<usize> {
        let n: i64 = self.conn.query_row("SELECT COUNT(*) FROM profiles", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    fn clear(&mut self) -> anyhow::Result<usize> {
        let removed = self.conn.execute("DELETE FROM profiles", [])?;
        // Give the pages back; a cleared store is usually about to be repopulated.
        self.conn.execute_batch("VACUUM;")?;
        log::info!("Cleared {} profiles", removed);
        Ok(removed)
    }
}

fn encode_vector(v: &[f32]) -> Vec<u8> {
    let le: Vec<F32> = v.iter().map(|&x| F32::new(x)).collect();
    le.as_slice().as_bytes().to_vec()
}

fn decode_vector(bytes: &[u8], dims: usize) -> anyhow::Result<Vec<f32>> {
    let width = std::mem::size_of::<F32>();
    if bytes.len() != dims * width {
        bail!(
            "stored vector is {} bytes, expected {} ({} dims)",
            bytes.len(),
            dims * width,
            dims
        );
    }
    bytes
        .chunks_exact(width)
        .map(|chunk| {
            F32::read_from_bytes(chunk)
                .map(F32::get)
                .map_err(|_| anyhow::anyhow!("bad f32 chunk"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::fixture;

    fn store() -> SqliteProfileStore {
        SqliteProfileStore::open_in_memory(3).unwrap()
    }

    #[test]
    fn test_put_get_roundtrips_vectors_and_text() {
        let mut s = store();
        let mut p = fixture("stu001", vec![0.25, -1.5, 3.0], vec![0.0, 0.0, 0.0]);
        p.strengths = "Mathematics".into();
        p.preferences = "Evenings".into();
        p.created_ms = 1_700_000_000_000;
        assert!(s.put(p.clone()).unwrap());
        assert_eq!(s.get("stu001").unwrap(), Some(p));
        assert_eq!(s.get("missing").unwrap(), None);
    }

    #[test]
    fn test_duplicate_id_is_not_written() {
        let mut s = store();
        assert!(s.put(fixture("S1", vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0])).unwrap());
        assert!(!s.put(fixture("S1", vec![0.0, 0.0, 1.0], vec![0.0, 1.0, 0.0])).unwrap());
        assert_eq!(s.count().unwrap(), 1);
        assert_eq!(s.get("S1").unwrap().unwrap().strengths_vector, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_wrong_dims_rejected_on_put() {
        let mut s = store();
        assert!(s.put(fixture("S1", vec![1.0], vec![0.0, 1.0, 0.0])).is_err());
        assert_eq!(s.count().unwrap(), 0);
    }

    #[test]
    fn test_list_in_insertion_order_then_delete_and_clear() {
        let mut s = store();
        for id in ["c", "a", "b"] {
            s.put(fixture(id, vec![0.0; 3], vec![0.0; 3])).unwrap();
        }
        let ids: Vec<String> = s.list().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        assert!(s.delete("a").unwrap());
        assert!(!s.delete("a").unwrap());
        assert_eq!(s.count().unwrap(), 2);

        assert_eq!(s.clear().unwrap(), 2);
        assert!(s.list().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut s = SqliteProfileStore::open(dir.path(), 3).unwrap();
            s.put(fixture("S1", vec![1.0, 2.0, 3.0], vec![3.0, 2.0, 1.0])).unwrap();
            assert!(s.db_path().unwrap().exists());
        }
        let s = SqliteProfileStore::open(dir.path(), 3).unwrap();
        assert_eq!(s.get("S1").unwrap().unwrap().weaknesses_vector, vec![3.0, 2.0, 1.0]);
        assert_eq!(s.db_path().unwrap(), dir.path().join(config::sqlite::DB_FILE_NAME));
    }

    #[test]
    fn test_reopen_with_other_dims_fails_on_read() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut s = SqliteProfileStore::open(dir.path(), 3).unwrap();
            s.put(fixture("S1", vec![1.0, 2.0, 3.0], vec![3.0, 2.0, 1.0])).unwrap();
        }
        let s = SqliteProfileStore::open(dir.path(), 4).unwrap();
        assert!(s.get("S1").is_err());
        assert!(s.list().is_err());
    }

    #[test]
    fn test_schema_version_mismatch_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        {
            let s = SqliteProfileStore::open(dir.path(), 3).unwrap();
            s.conn
                .execute_batch(&format!("PRAGMA user_version = {};", config::SCHEMA_VERSION + 1))
                .unwrap();
        }
        assert!(SqliteProfileStore::open(dir.path(), 3).is_err());
    }

    #[test]
    fn test_vectors_are_little_endian_on_disk() {
        let bytes = encode_vector(&[1.0, -2.5]);
        let mut expected = 1.0f32.to_le_bytes().to_vec();
        expected.extend_from_slice(&(-2.5f32).to_le_bytes());
        assert_eq!(bytes, expected);
        assert_eq!(decode_vector(&expected, 2).unwrap(), vec![1.0, -2.5]);
    }

    #[test]
    fn test_pragmas_applied_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        drop(SqliteProfileStore::open(dir.path(), 3).unwrap());

        let s = SqliteProfileStore::open(dir.path(), 3).unwrap();
        let busy: i64 = s.conn.query_row("PRAGMA busy_timeout", [], |r| r.get(0)).unwrap();
        let cache: i64 = s.conn.query_row("PRAGMA cache_size", [], |r| r.get(0)).unwrap();
        let sync: i64 = s.conn.query_row("PRAGMA synchronous", [], |r| r.get(0)).unwrap();
        assert_eq!(busy, config::sqlite::PRAGMA_BUSY_TIMEOUT_MS);
        assert_eq!(cache, config::sqlite::PRAGMA_CACHE_SIZE_KIB_NEG);
        // NORMAL
        assert_eq!(sync, 1);
    }

    #[test]
    fn test_decode_vector_checks_length() {
        let bytes = encode_vector(&[1.0, 2.0]);
        assert_eq!(decode_vector(&bytes, 2).unwrap(), vec![1.0, 2.0]);
        assert!(decode_vector(&bytes, 3).is_err());
        assert!(decode_vector(&bytes[..7], 2).is_err());
    }
}
