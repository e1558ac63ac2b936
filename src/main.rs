mod config;
mod embeddings;
mod errors;
mod logging;
mod matching;
mod profiles;
mod protocol;
mod service;
mod wire;

use std::io::{stdin, stdout};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;

use crate::embeddings::EmbeddingProvider;
use crate::errors::MatchError;
use crate::profiles::{MemoryProfileStore, NewProfile, ProfileStore, SqliteProfileStore};
use crate::protocol::{Request, ResponseErr, ResponseOk};
use crate::service::MatchService;

struct AppState {
    embeddings: Arc<EmbeddingProvider>,
    service: Option<MatchService>,
    db_path: Option<PathBuf>,
}

impl AppState {
    fn new() -> Self {
        Self {
            embeddings: Arc::new(EmbeddingProvider::local()),
            service: None,
            db_path: None,
        }
    }
}

fn main() {
    if let Err(e) = real_main() {
        eprintln!("[Peer Matcher] fatal error: {e:?}");
        log::error!("Fatal error: {:?}", e);
        std::process::exit(1);
    }
}

fn real_main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--version") {
        println!("peer_matcher {}", config::HOST_VERSION);
        return Ok(());
    }

    logging::init_logging()?;

    // Pre-fetch and load the model, then exit. Used at deploy time so the
    // first profile creation does not pay for the download.
    if args.iter().any(|a| a == "--fetch-model") {
        let state = AppState::new();
        state.embeddings.warm_up().context("failed to fetch embedding model")?;
        println!("embedding model ready ({})", config::embedding::EMBEDDING_MODEL_NAME);
        return Ok(());
    }

    log::info!("=== Peer Matcher Started ===");
    log::info!("Waiting for requests on stdin...");

    let mut state = AppState::new();
    let mut in_stream = stdin();
    let mut out_stream = stdout();

    let mut message_count: u64 = 0;
    loop {
        let payload = match wire::read_frame(&mut in_stream) {
            Ok(Some(p)) => p,
            Ok(None) => {
                log::info!("No more requests after {} messages, exiting", message_count);
                break;
            }
            Err(e) => {
                log::error!("Error reading request: {:?}", e);
                break;
            }
        };
        message_count += 1;

        let resp = match wire::decode_request(&payload) {
            Ok(req) => {
                log::info!(
                    "Processing request #{}: {} (id: {})",
                    message_count,
                    req.method,
                    req.id
                );
                dispatch(&mut state, &req)?
            }
            Err(bad) => {
                log::warn!("Rejecting malformed request #{} (id: {:?}): {}", message_count, bad.id, bad.reason);
                let err = MatchError::InvalidInput(bad.reason);
                serde_json::to_value(ResponseErr::new(&bad.id, err.code(), err.to_string()))?
            }
        };
        if let Err(e) = wire::write_json(&mut out_stream, &resp) {
            log::error!("Error sending response: {:?}", e);
            break;
        }
    }

    log::info!("=== Peer Matcher Stopped ===");
    Ok(())
}

/// Run one request and turn any failure into an error response.
fn dispatch(state: &mut AppState, req: &Request) -> anyhow::Result<Value> {
    match handle_request(state, &req.method, &req.id, &req.params) {
        Ok(v) => Ok(v),
        Err(e) => {
            let code = e.downcast_ref::<MatchError>().map(MatchError::code).unwrap_or("internal");
            if code == "internal" {
                log::error!("Handler error: {:?}", e);
            } else {
                log::warn!("Request {} rejected ({}): {}", req.id, code, e);
            }
            Ok(serde_json::to_value(ResponseErr::new(&req.id, code, format!("{e:#}")))?)
        }
    }
}

fn handle_request(state: &mut AppState, method: &str, msg_id: &str, params: &Value) -> anyhow::Result<Value> {
    match method {
        "hello" => handle_hello(state, msg_id),
        "init" => handle_init(state, msg_id, params),
        "warmUp" => handle_warm_up(state, msg_id),
        "createProfile" => handle_create_profile(state, msg_id, params),
        "listProfiles" => handle_list_profiles(state, msg_id),
        "getProfile" => handle_get_profile(state, msg_id, params),
        "deleteProfile" => handle_delete_profile(state, msg_id, params),
        "match" => handle_match(state, msg_id, params),
        "stats" => handle_stats(state, msg_id),
        "clear" => handle_clear(state, msg_id),
        _ => Err(MatchError::InvalidInput(format!("Unknown method: {method}")).into()),
    }
}

fn respond(msg_id: &str, result: Value) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(ResponseOk::new(msg_id, result))?)
}

fn require_service(state: &AppState) -> anyhow::Result<&MatchService> {
    state.service.as_ref().context("Profile store not initialized. Call 'init' first.")
}

fn require_service_mut(state: &mut AppState) -> anyhow::Result<&mut MatchService> {
    state.service.as_mut().context("Profile store not initialized. Call 'init' first.")
}

fn require_str<'a>(params: &'a Value, key: &str) -> anyhow::Result<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| MatchError::InvalidInput(format!("{key} parameter is required and must be a string")).into())
}

fn handle_hello(state: &mut AppState, msg_id: &str) -> anyhow::Result<Value> {
    let total_profiles = match state.service.as_ref() {
        Some(svc) => Some(svc.profile_count()?),
        None => None,
    };
    respond(
        msg_id,
        serde_json::json!({
            "status": "online",
            "message": "Peer Learning Matcher",
            "hostVersion": config::HOST_VERSION,
            "embeddingModel": config::embedding::EMBEDDING_MODEL_NAME,
            "modelLoaded": state.embeddings.is_loaded(),
            "initialized": state.service.is_some(),
            "totalProfiles": total_profiles
        }),
    )
}

fn handle_init(state: &mut AppState, msg_id: &str, params: &Value) -> anyhow::Result<Value> {
    let in_memory = params.get("inMemory").and_then(|v| v.as_bool()).unwrap_or(false);
    let dims = state.embeddings.dims();

    let store: Box<dyn ProfileStore> = if in_memory {
        log::info!("Using in-memory profile store (nothing persists)");
        state.db_path = None;
        Box::new(MemoryProfileStore::new())
    } else {
        let data_dir = match params.get("dataDir").and_then(|v| v.as_str()) {
            Some(p) => PathBuf::from(p),
            None => logging::home_dir()
                .context("cannot determine home directory for data")?
                .join(config::sqlite::DATA_DIR_REL),
        };
        let store = SqliteProfileStore::open(&data_dir, dims)?;
        state.db_path = store.db_path().map(PathBuf::from);
        Box::new(store)
    };

    let svc = MatchService::new(store, Arc::clone(&state.embeddings));
    let profiles = svc.profile_count()?;
    state.service = Some(svc);

    // Optional eager load; a failure here is reported, not fatal, and the
    // next non-blank embed will retry.
    let warm_up = params.get("warmUp").and_then(|v| v.as_bool()).unwrap_or(false);
    if warm_up {
        if let Err(e) = state.embeddings.warm_up() {
            log::warn!("Embedding model warm-up failed (will retry lazily): {:?}", e);
        }
    }

    respond(
        msg_id,
        serde_json::json!({
            "ok": true,
            "persistent": !in_memory,
            "dbPath": state.db_path.as_ref().map(|p| p.to_string_lossy().to_string()),
            "profiles": profiles,
            "modelLoaded": state.embeddings.is_loaded()
        }),
    )
}

fn handle_warm_up(state: &mut AppState, msg_id: &str) -> anyhow::Result<Value> {
    state.embeddings.warm_up().map_err(MatchError::Embedding)?;
    respond(msg_id, serde_json::json!({ "ok": true, "modelLoaded": true }))
}

fn handle_create_profile(state: &mut AppState, msg_id: &str, params: &Value) -> anyhow::Result<Value> {
    let new: NewProfile = serde_json::from_value(params.clone())
        .map_err(|e| MatchError::InvalidInput(format!("invalid profile: {e}")))?;
    let svc = require_service_mut(state)?;
    let summary = svc.create_profile(new)?;
    respond(
        msg_id,
        serde_json::json!({
            "message": "Profile created successfully",
            "studentId": summary.id,
            "name": summary.name
        }),
    )
}

fn handle_list_profiles(state: &mut AppState, msg_id: &str) -> anyhow::Result<Value> {
    let profiles = require_service(state)?.list_profiles()?;
    respond(
        msg_id,
        serde_json::json!({ "total": profiles.len(), "profiles": profiles }),
    )
}

fn handle_get_profile(state: &mut AppState, msg_id: &str, params: &Value) -> anyhow::Result<Value> {
    let student_id = require_str(params, "studentId")?;
    let profile = require_service(state)?.get_profile(student_id)?;
    respond(msg_id, serde_json::to_value(profile)?)
}

fn handle_delete_profile(state: &mut AppState, msg_id: &str, params: &Value) -> anyhow::Result<Value> {
    let student_id = require_str(params, "studentId")?;
    require_service_mut(state)?.delete_profile(student_id)?;
    respond(
        msg_id,
        serde_json::json!({ "message": "Profile deleted successfully", "studentId": student_id.trim() }),
    )
}

fn handle_match(state: &mut AppState, msg_id: &str, params: &Value) -> anyhow::Result<Value> {
    let student_id = require_str(params, "studentId")?;
    let top_k = match params.get("topK") {
        None | Some(Value::Null) => config::matching::DEFAULT_TOP_K,
        Some(v) => v
            .as_u64()
            .map(|k| k as usize)
            .ok_or_else(|| MatchError::InvalidInput("topK must be a non-negative integer".into()))?,
    };
    let outcome = require_service(state)?.find_matches(student_id, top_k)?;
    respond(msg_id, serde_json::to_value(outcome)?)
}

fn handle_stats(state: &mut AppState, msg_id: &str) -> anyhow::Result<Value> {
    let profiles = require_service(state)?.profile_count()?;
    let db_bytes = state
        .db_path
        .as_ref()
        .and_then(|p| std::fs::metadata(p).ok().map(|m| m.len()))
        .unwrap_or(0);
    respond(
        msg_id,
        serde_json::json!({
            "ok": true,
            "profiles": profiles,
            "dbBytes": db_bytes,
            "modelLoaded": state.embeddings.is_loaded(),
            "embeddingDims": state.embeddings.dims()
        }),
    )
}

fn handle_clear(state: &mut AppState, msg_id: &str) -> anyhow::Result<Value> {
    let removed = require_service_mut(state)?.clear_profiles()?;
    respond(msg_id, serde_json::json!({ "ok": true, "removed": removed }))
}
