// IMPORTANT:
// Keep ALL numeric values centralized here (repo rule: no hardcoded numeric values scattered around).

// NOTE: HOST_VERSION must stay in sync with the `version` field in Cargo.toml.
pub const HOST_VERSION: &str = "0.3.0";

/// Schema version: bump ONLY when the profile table layout or the embedding model changes.
/// Stored vectors from another model are meaningless to cosine scoring.
pub const SCHEMA_VERSION: u32 = 1;

pub mod logging {
    pub const LOG_DIR_REL: &str = ".peer_matcher/logs";
    pub const LOG_FILE_NAME: &str = "peer_matcher.log";
    pub const LOG_DIR_ENV: &str = "PEER_MATCHER_LOG_DIR";

    pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
    pub const LOG_ROTATE_KEEP_FILES: usize = 5;
}

pub mod wire {
    pub const MAX_MESSAGE_SIZE_BYTES: u32 = 16 * 1024 * 1024;
}

pub mod sqlite {
    // Default data directory (relative to home) when `init` gives no dataDir.
    pub const DATA_DIR_REL: &str = ".peer_matcher/data";
    pub const DB_FILE_NAME: &str = "profiles.db";

    pub const PRAGMA_BUSY_TIMEOUT_MS: i64 = 2000;
    pub const PRAGMA_CACHE_SIZE_KIB_NEG: i64 = -16000;
}

pub mod embedding {
    pub const EMBEDDING_DIMS: usize = 384;
    pub const EMBEDDING_MODEL_NAME: &str = "all-MiniLM-L6-v2";

    // Max word-piece tokens for all-MiniLM-L6-v2 (model context limit is 256).
    pub const MAX_TOKENS: usize = 256;

    // Tracks the `main` branch, not a fixed commit. If upstream republishes a
    // file its hash stops matching and the download is refused; update the
    // hashes below, or pre-seed the files via MODEL_DIR_ENV.
    pub const MODEL_CDN_BASE: &str =
        "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main";

    // SHA256 hashes for integrity verification
    pub const MODEL_SAFETENSORS_SHA256: &str =
        "53aa51172d142c89d9012cce15ae4d6cc0ca6895895114379cacb4fab128d9db";
    pub const TOKENIZER_JSON_SHA256: &str =
        "be50c3628f2bf5bb5e3a7f17b1f74611b2561a3a27eeab05e5aa30f411572037";
    pub const CONFIG_JSON_SHA256: &str =
        "953f9c0d463486b10a6871cc2fd59f223b2c70184f49815e7efbcab5d8908b41";

    pub const DOWNLOAD_TIMEOUT_SECS: u64 = 90;

    // Local model storage directory (relative to home)
    pub const MODEL_DIR_REL: &str = ".peer_matcher/models/all-MiniLM-L6-v2";

    // Pre-seeded model directory; when set, nothing is downloaded.
    pub const MODEL_DIR_ENV: &str = "PEER_MATCHER_MODEL_DIR";
}

pub mod matching {
    pub const DEFAULT_TOP_K: usize = 3;
    pub const MAX_TOP_K: usize = 50;

    // Scores leave the matcher rounded to this many decimal digits.
    pub const SCORE_DECIMALS: i32 = 4;

    // A match needs the target plus at least one candidate.
    pub const MIN_PROFILES_FOR_MATCH: usize = 2;
}
