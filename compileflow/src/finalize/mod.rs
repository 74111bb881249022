//! Action-specific finalization routines.
//!
//! A routine runs once, after every stage of a build classified as ok. It
//! talks to the surrounding application only through [`FinalizeHost`].

mod artifact;
mod host;

pub use artifact::{copy_artifact, move_artifact};
pub use host::{FinalizeHost, NoOpFinalizeHost, SaveRequest};

use crate::context::ProjectContext;
use crate::core::BuildAction;
use crate::errors::FinalizeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What to do after the last stage succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "routine", rename_all = "snake_case")]
pub enum Finalization {
    /// Refresh the index views and bring them to the front.
    RefreshIndex,
    /// Launch the story, replaying inputs, then refresh the views.
    Launch {
        /// Player input replayed after launch.
        replay: Vec<String>,
    },
    /// Save the debug story file where the user chooses.
    SaveDebugBuild,
    /// Save the release artifact where the packager or the user says.
    Release,
    /// Copy the bibliographic record where the user chooses.
    ExportIFiction,
}

/// Runs a finalization routine.
///
/// Returns the location a file was saved to, if any. A cancelled save
/// prompt is not an error.
pub async fn finalize(
    finalization: &Finalization,
    action: BuildAction,
    ctx: &ProjectContext,
    copy_destination: Option<&Path>,
    host: &dyn FinalizeHost,
) -> Result<Option<PathBuf>, FinalizeError> {
    debug!(project = %ctx.id, ?finalization, "Finalizing");
    match finalization {
        Finalization::RefreshIndex => {
            refresh(host, true).await?;
            Ok(None)
        }
        Finalization::Launch { replay } => {
            let story = ctx.story_file();
            if !story.is_file() {
                return Err(FinalizeError::MissingArtifact(story));
            }
            host.launch(&story, replay)
                .await
                .map_err(|e| FinalizeError::host("launch", e))?;
            refresh(host, false).await?;
            Ok(None)
        }
        Finalization::SaveDebugBuild => {
            let saved = save_output(ctx, action, None, "Save debug build", host).await?;
            refresh(host, false).await?;
            Ok(saved)
        }
        Finalization::Release => {
            let saved =
                save_output(ctx, action, copy_destination, "Save the game for release", host)
                    .await?;
            refresh(host, false).await?;
            Ok(saved)
        }
        Finalization::ExportIFiction => export_ifiction(ctx, host).await,
    }
}

async fn refresh(host: &dyn FinalizeHost, show: bool) -> Result<(), FinalizeError> {
    host.refresh_index(show)
        .await
        .map_err(|e| FinalizeError::host("refresh index", e))
}

async fn save_output(
    ctx: &ProjectContext,
    action: BuildAction,
    reported: Option<&Path>,
    title: &str,
    host: &dyn FinalizeHost,
) -> Result<Option<PathBuf>, FinalizeError> {
    let artifact = ctx.release_artifact(action);
    let destination = match reported {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let extension = artifact
                .extension()
                .map_or_else(String::new, |e| e.to_string_lossy().into_owned());
            let (filter, patterns) = ctx.format.file_filter();
            let request = SaveRequest::new(title, format!("{}.{}", ctx.display_name(), extension))
                .with_filter(filter, patterns);
            host.choose_save_location(&request)
                .await
                .map_err(|e| FinalizeError::host("choose save location", e))?
        }
    };

    let Some(destination) = destination else {
        info!(project = %ctx.id, "Save cancelled");
        return Ok(None);
    };
    move_artifact(&artifact, &destination).await?;
    info!(project = %ctx.id, to = %destination.display(), "Saved compiler output");
    Ok(Some(destination))
}

async fn export_ifiction(
    ctx: &ProjectContext,
    host: &dyn FinalizeHost,
) -> Result<Option<PathBuf>, FinalizeError> {
    let record = ctx.ifiction_record();
    if !record.is_file() {
        return Err(FinalizeError::MissingIFiction(record));
    }

    let request = SaveRequest::new(
        "Save iFiction record",
        format!("{}.iFiction", ctx.display_name()),
    )
    .with_filter("iFiction records (.iFiction)", &["*.iFiction"]);
    let chosen = host
        .choose_save_location(&request)
        .await
        .map_err(|e| FinalizeError::host("choose save location", e))?;

    match chosen {
        Some(destination) => {
            copy_artifact(&record, &destination).await?;
            Ok(Some(destination))
        }
        None => Ok(None),
    }
}
