//! Stage result classification.
//!
//! [`classify`] is a pure function of the stage, its exit code and its
//! captured output. [`diagnose`] adds the parts that depend on the project
//! and the installation: which report or help page to show, and the
//! packager's copy destination.

mod patterns;
mod progress;

pub use patterns::{copy_destination, last_error_line, match_template, ERROR_MARKER};
pub use progress::{parse_progress, CompilerPulseObserver, TranslatorProgressObserver};

use crate::config::ToolchainConfig;
use crate::context::ProjectContext;
use crate::core::{Diagnostic, DiagnosticKind, DiagnosticResource, KnownPattern, StageKind};
use std::path::{Path, PathBuf};

/// Help page for a bytecode compiler failure with no better match.
pub const COMPILER_ERROR_PAGE: &str = "ErrorI6.html";

/// Classifies a finished stage.
///
/// Identical inputs always produce identical results.
#[must_use]
pub fn classify(stage: StageKind, exit_code: i32, output: &str) -> DiagnosticKind {
    match stage {
        StageKind::Translate => classify_translator(exit_code),
        StageKind::Compile => classify_compiler(exit_code, output),
        StageKind::Package => {
            if exit_code == 0 {
                DiagnosticKind::Ok
            } else {
                DiagnosticKind::GenericError
            }
        }
    }
}

fn classify_translator(exit_code: i32) -> DiagnosticKind {
    match exit_code {
        0 => DiagnosticKind::Ok,
        // The translator explains these in its own problems report
        code if code <= 1 => DiagnosticKind::GenericError,
        10 => DiagnosticKind::KnownError {
            pattern: KnownPattern::TranslatorError10,
        },
        11 => DiagnosticKind::KnownError {
            pattern: KnownPattern::TranslatorError11,
        },
        _ => DiagnosticKind::KnownError {
            pattern: KnownPattern::TranslatorInternal,
        },
    }
}

fn classify_compiler(exit_code: i32, output: &str) -> DiagnosticKind {
    if exit_code == 0 {
        return DiagnosticKind::Ok;
    }
    last_error_line(output)
        .and_then(match_template)
        .map_or(DiagnosticKind::GenericError, |pattern| {
            DiagnosticKind::KnownError { pattern }
        })
}

/// Answers whether a generated file exists.
pub trait ArtifactProbe {
    /// Returns true if `path` names an existing file.
    fn exists(&self, path: &Path) -> bool;
}

/// Probes the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl ArtifactProbe for FsProbe {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

impl<F> ArtifactProbe for F
where
    F: Fn(&Path) -> bool,
{
    fn exists(&self, path: &Path) -> bool {
        self(path)
    }
}

/// The files [`diagnose`] can point the user at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLocations {
    /// The translator's generated problems report.
    pub problems_report: PathBuf,
    /// The packager's generated status report.
    pub packager_report: PathBuf,
    /// Directory of the built-in help pages.
    pub pages_dir: PathBuf,
}

impl ReportLocations {
    /// Locations for one project built with one toolchain.
    #[must_use]
    pub fn new(ctx: &ProjectContext, config: &ToolchainConfig) -> Self {
        Self {
            problems_report: ctx.problems_report(),
            packager_report: ctx.packager_report(),
            pages_dir: config.pages_dir(),
        }
    }

    fn page_exists(&self, page: &str, probe: &dyn ArtifactProbe) -> bool {
        probe.exists(&self.pages_dir.join(page))
    }
}

/// A classification together with everything derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageVerdict {
    /// The classification.
    pub kind: DiagnosticKind,
    /// What to show the user, if anything.
    pub resource: Option<DiagnosticResource>,
    /// Where the packager says it already copied its result.
    pub copy_destination: Option<PathBuf>,
}

impl StageVerdict {
    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.kind.is_ok()
    }

    /// Converts into the caller-facing diagnostic.
    #[must_use]
    pub fn to_diagnostic(&self, stage: StageKind, exit_code: i32) -> Diagnostic {
        Diagnostic::new(stage, self.kind, exit_code).with_resource(self.resource.clone())
    }
}

/// Classifies a finished stage and picks the resource to surface.
///
/// The translator's problems report is offered after exit codes 0 and 1 if
/// it exists. An unexpected translator exit code shows `Error<code>.html`
/// when that page ships, else the generic translator page. The packager's
/// own status report is offered whatever its exit code.
#[must_use]
pub fn diagnose(
    stage: StageKind,
    exit_code: i32,
    output: &str,
    reports: &ReportLocations,
    probe: &dyn ArtifactProbe,
) -> StageVerdict {
    let kind = classify(stage, exit_code, output);
    let mut copy_dest = None;

    let resource = match (stage, kind) {
        (
            StageKind::Translate,
            DiagnosticKind::KnownError {
                pattern: KnownPattern::TranslatorInternal,
            },
        ) => {
            let specific = format!("Error{exit_code}.html");
            if reports.page_exists(&specific, probe) {
                Some(DiagnosticResource::page(specific))
            } else {
                Some(DiagnosticResource::page(KnownPattern::TranslatorInternal.page()))
            }
        }
        (_, DiagnosticKind::KnownError { pattern }) => Some(DiagnosticResource::page(pattern.page())),
        (StageKind::Translate, _) => probe
            .exists(&reports.problems_report)
            .then(|| DiagnosticResource::ProjectReport(reports.problems_report.clone())),
        (StageKind::Compile, DiagnosticKind::Ok) => None,
        (StageKind::Compile, _) => Some(DiagnosticResource::page(COMPILER_ERROR_PAGE)),
        (StageKind::Package, kind) => {
            if kind.is_ok() {
                copy_dest = copy_destination(output);
            }
            Some(DiagnosticResource::ProjectReport(reports.packager_report.clone()))
        }
    };

    StageVerdict {
        kind,
        resource,
        copy_destination: copy_dest,
    }
}

/// The verdict for a stage whose process could not be started.
#[must_use]
pub fn spawn_failure() -> StageVerdict {
    StageVerdict {
        kind: DiagnosticKind::SpawnFailure,
        resource: None,
        copy_destination: None,
    }
}
