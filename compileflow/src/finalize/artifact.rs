//! Moving and copying compiler output.

use crate::errors::FinalizeError;
use std::path::Path;
use tracing::debug;

/// Moves `from` to `to`, replacing any existing file.
///
/// Falls back to copy-then-remove when a rename is impossible, e.g.
/// across filesystems.
pub async fn move_artifact(from: &Path, to: &Path) -> Result<(), FinalizeError> {
    if !tokio::fs::try_exists(from).await.unwrap_or(false) {
        return Err(FinalizeError::MissingArtifact(from.to_path_buf()));
    }

    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(from = %from.display(), to = %to.display(), error = %e, "Rename failed, copying");
            copy_artifact(from, to).await?;
            tokio::fs::remove_file(from)
                .await
                .map_err(|source| transfer(from, to, source))
        }
    }
}

/// Copies `from` to `to`, replacing any existing file.
pub async fn copy_artifact(from: &Path, to: &Path) -> Result<(), FinalizeError> {
    tokio::fs::copy(from, to)
        .await
        .map(|_| ())
        .map_err(|source| transfer(from, to, source))
}

fn transfer(from: &Path, to: &Path, source: std::io::Error) -> FinalizeError {
    FinalizeError::Transfer {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    }
}
