use std::env;
use std::path::PathBuf;

fn normalize_env_path(value: Option<String>) -> Option<PathBuf> {
    let raw = value?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

fn resolve_state_dir() -> PathBuf {
    if let Some(path) = normalize_env_path(env::var("XDG_STATE_HOME").ok()) {
        return path.join("toolcall");
    }
    if let Ok(home) = env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("state")
            .join("toolcall");
    }
    env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".toolcall")
}

pub fn resolve_audit_path() -> PathBuf {
    if let Some(path) = normalize_env_path(env::var("TOOLCALL_AUDIT_PATH").ok()) {
        return path;
    }
    resolve_state_dir().join("audit.jsonl")
}

pub fn resolve_tokens_path() -> PathBuf {
    if let Some(path) = normalize_env_path(env::var("TOOLCALL_TOKENS_PATH").ok()) {
        return path;
    }
    resolve_state_dir().join("tokens.json")
}
