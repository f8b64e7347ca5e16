use axum::http::HeaderMap;

use crate::config::BoardConfig;
use crate::error::{AppError, AppResult};

pub const SYNC_KEY_HEADER: &str = "x-tick-key";

/// Check the shared sync secret. With no key configured every call is refused.
pub fn require_sync_key(headers: &HeaderMap, config: &BoardConfig) -> AppResult<()> {
    let expected = match config.sync_key.as_deref() {
        Some(key) if !key.is_empty() => key,
        _ => {
            tracing::warn!("Sync key not configured, refusing authenticated call");
            return Err(AppError::Unauthorized);
        }
    };

    let provided = headers
        .get(SYNC_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if key == expected => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

/// Ledger mutations are open unless `board.protect_world_writes` is set
pub fn require_world_write(headers: &HeaderMap, config: &BoardConfig) -> AppResult<()> {
    if config.protect_world_writes {
        require_sync_key(headers, config)
    } else {
        Ok(())
    }
}
