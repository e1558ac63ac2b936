// download.rs — Model file download with SHA256 verification.
//
// Fetches all-MiniLM-L6-v2 on first use and caches it at ~/.peer_matcher/models/.
// A directory given via PEER_MATCHER_MODEL_DIR is used as-is and never downloaded into.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use sha2::{Digest, Sha256};

use crate::config;

const MODEL_FILES: [(&str, &str); 3] = [
    ("model.safetensors", config::embedding::MODEL_SAFETENSORS_SHA256),
    ("tokenizer.json", config::embedding::TOKENIZER_JSON_SHA256),
    ("config.json", config::embedding::CONFIG_JSON_SHA256),
];

/// Pre-seeded model directory from the environment, if any.
pub fn model_dir_override() -> Option<PathBuf> {
    std::env::var(config::embedding::MODEL_DIR_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Returns the local model directory path (~/.peer_matcher/models/all-MiniLM-L6-v2/).
pub fn model_dir() -> anyhow::Result<PathBuf> {
    if let Some(dir) = model_dir_override() {
        return Ok(dir);
    }
    let home = crate::logging::home_dir()
        .context("cannot determine home directory (neither HOME nor USERPROFILE is set)")?;
    Ok(home.join(config::embedding::MODEL_DIR_REL))
}

/// Check if all required model files exist in `dir`.
pub fn model_files_exist(dir: &Path) -> bool {
    MODEL_FILES.iter().all(|(name, _)| dir.join(name).exists())
}

/// Download all model files if not already cached. Returns the model directory path.
pub fn ensure_model_files() -> anyhow::Result<PathBuf> {
    let dir = model_dir()?;

    if model_files_exist(&dir) {
        log::info!("Model files already cached at {}", dir.display());
        return Ok(dir);
    }

    if model_dir_override().is_some() {
        bail!(
            "{} is set to {} but model.safetensors, tokenizer.json or config.json is missing",
            config::embedding::MODEL_DIR_ENV,
            dir.display()
        );
    }

    log::info!("Downloading embedding model to {}", dir.display());
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create model dir {}", dir.display()))?;

    let base = config::embedding::MODEL_CDN_BASE;
    for (name, sha256) in MODEL_FILES {
        let dest = dir.join(name);
        if dest.exists() {
            continue;
        }
        download_and_verify(&format!("{base}/{name}"), &dest, sha256)?;
    }

    log::info!("Model download complete");
    Ok(dir)
}

/// Download a file from URL and verify its SHA256 hash.
fn download_and_verify(url: &str, dest: &Path, expected_sha256: &str) -> anyhow::Result<()> {
    let filename = dest.file_name().unwrap_or_default().to_string_lossy();
    log::info!("Downloading {} from {}", filename, url);

    let resp = ureq::get(url)
        .timeout(std::time::Duration::from_secs(config::embedding::DOWNLOAD_TIMEOUT_SECS))
        .call()
        .with_context(|| format!("failed to download {url}"))?;

    let status = resp.status();
    if status != 200 {
        bail!("HTTP {status} downloading {url}");
    }

    // Model is ~87 MB, fits in RAM.
    let mut body = Vec::new();
    resp.into_reader()
        .read_to_end(&mut body)
        .with_context(|| format!("failed to read response body for {url}"))?;

    store_verified(&body, dest, expected_sha256)
}

/// Write `body` to `dest` only if it hashes to `expected_sha256`. The file
/// appears under its final name by rename, so readers never see a partial one.
fn store_verified(body: &[u8], dest: &Path, expected_sha256: &str) -> anyhow::Result<()> {
    let filename = dest.file_name().unwrap_or_default().to_string_lossy();
    let actual_hash = sha256_hex(body);
    if actual_hash != expected_sha256 {
        bail!(
            "SHA256 mismatch for {}: expected {}, got {} (upstream file changed? update the pinned hash)",
            filename,
            expected_sha256,
            actual_hash
        );
    }

    log::info!("SHA256 verified for {} ({})", filename, &actual_hash[..12]);

    let tmp_path = dest.with_extension("tmp");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;
    file.write_all(body)?;
    file.flush()?;
    drop(file);

    fs::rename(&tmp_path, dest)
        .with_context(|| format!("failed to rename {} -> {}", tmp_path.display(), dest.display()))?;

    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
