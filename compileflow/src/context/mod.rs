//! Project context for builds.
//!
//! This module provides:
//! - `ProjectId` for routing output to the owning project
//! - `ProjectContext`, the immutable build inputs, with derived file paths

mod identity;
mod project;

pub use identity::ProjectId;
pub use project::{
    ProjectContext, BUILD_DIR, DEBUG_LOG, IFICTION_RECORD, INTERMEDIATE_CODE, PACKAGER_REPORT,
    PROBLEMS_REPORT, RELEASE_MANIFEST, UUID_FILE,
};
