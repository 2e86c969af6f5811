//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use tracing::{debug, warn};

/// Ensure the data directory exists, creating it when missing.
pub async fn ensure_env(data_dir: &str) -> anyhow::Result<()> {
    if tokio::fs::metadata(data_dir).await.is_err() {
        warn!(%data_dir, "data directory not found; creating it");
    }
    tokio::fs::create_dir_all(data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {data_dir}: {e}"))?;
    debug!(%data_dir, "data directory ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_nested_dirs() -> anyhow::Result<()> {
        let base = std::env::temp_dir().join(format!("kvstore_env_{}", std::process::id()));
        let nested = base.join("a").join("b");
        let nested_str = nested.to_string_lossy().to_string();
        ensure_env(&nested_str).await?;
        assert!(tokio::fs::metadata(&nested).await?.is_dir());
        // idempotent
        ensure_env(&nested_str).await?;
        let _ = tokio::fs::remove_dir_all(&base).await;
        Ok(())
    }
}
