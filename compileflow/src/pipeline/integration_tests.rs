//! Integration tests driving whole builds through scripted compilers.

use crate::classify::COMPILER_ERROR_PAGE;
use crate::config::ToolchainConfig;
use crate::context::{ProjectContext, UUID_FILE};
use crate::core::{
    BuildAction, BuildArtifactKind, DiagnosticKind, DiagnosticResource, KnownPattern, StageKind,
    StatusUpdate,
};
use crate::events::CollectingStatusReporter;
use crate::pipeline::{AbortReason, BuildOutcome, BuildPipeline, BuildServices, PipelinePhase};
use crate::process::BufferSink;
use crate::testing::{HostCall, ProjectFixture, RecordingHost, Script, ScriptedRunner};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const MEMORY_ERROR: &str =
    "auto.inf(120): Error: The memory setting MAX_FOO has been exceeded.\nCompiled with 1 error\n";

struct Harness {
    _dir: TempDir,
    fixture: ProjectFixture,
    runner: Arc<ScriptedRunner>,
    reporter: Arc<CollectingStatusReporter>,
    host: Arc<RecordingHost>,
    sink: Arc<BufferSink>,
    config: ToolchainConfig,
}

impl Harness {
    fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fixture = ProjectFixture::create(dir.path(), "Cloak").unwrap();
        Self {
            _dir: dir,
            fixture,
            runner: Arc::new(ScriptedRunner::with_scripts(scripts)),
            reporter: Arc::new(CollectingStatusReporter::new()),
            host: Arc::new(RecordingHost::new()),
            sink: Arc::new(BufferSink::new()),
            config: ToolchainConfig::default(),
        }
    }

    fn with_host(mut self, host: RecordingHost) -> Self {
        self.host = Arc::new(host);
        self
    }

    fn with_config(mut self, config: ToolchainConfig) -> Self {
        self.config = config;
        self
    }

    fn services(&self) -> BuildServices {
        BuildServices::new(self.config.clone())
            .with_runner(self.runner.clone())
            .with_reporter(self.reporter.clone())
            .with_host(self.host.clone())
    }

    fn pipeline(&self, action: BuildAction, ctx: ProjectContext) -> BuildPipeline {
        BuildPipeline::new(action, ctx, self.sink.clone(), &self.services())
    }

    async fn run(&self, action: BuildAction) -> BuildOutcome {
        self.run_with(action, self.fixture.context()).await
    }

    async fn run_with(&self, action: BuildAction, ctx: ProjectContext) -> BuildOutcome {
        self.pipeline(action, ctx).run().await
    }

    fn programs(&self) -> Vec<String> {
        self.runner
            .invocations()
            .iter()
            .map(|i| i.program().to_string())
            .collect()
    }

    fn updates(&self) -> Vec<StatusUpdate> {
        self.reporter.events().into_iter().map(|e| e.update).collect()
    }

    fn count(&self, event_type: &str) -> usize {
        self.reporter.events_of_type(event_type).len()
    }
}

fn translated() -> Script {
    Script::exit(0).creating("Problems.html", "<html>No problems</html>")
}

fn compiled() -> Script {
    Script::exit(0)
        .stdout("Inform 6.41\n#####\n")
        .creating("output.z5", "story")
}

fn failed_diagnostic(outcome: &BuildOutcome) -> &crate::core::Diagnostic {
    match outcome {
        BuildOutcome::Failed { diagnostic } => diagnostic,
        other => panic!("expected a failed build, got {other:?}"),
    }
}

#[tokio::test]
async fn test_refresh_index_finalizes_after_translation() {
    let harness = Harness::new([translated()]);

    let outcome = harness.run(BuildAction::RefreshIndex).await;

    assert!(outcome.is_success());
    assert_eq!(harness.programs(), vec!["ni"]);
    assert_eq!(harness.host.calls(), vec![HostCall::RefreshIndex { show: true }]);

    let finished = harness.reporter.events_of_type("stage.finished");
    let StatusUpdate::StageFinished { ref diagnostic } = finished[0].update else {
        panic!("expected a stage result");
    };
    assert_eq!(diagnostic.kind, DiagnosticKind::Ok);
    assert_eq!(
        diagnostic.resource,
        Some(DiagnosticResource::ProjectReport(
            harness.fixture.context().problems_report()
        ))
    );
}

#[tokio::test]
async fn test_run_proceeds_to_compiler_and_launches() {
    let harness = Harness::new([translated(), compiled()]);
    let ctx = harness.fixture.context();

    let outcome = harness.run_with(BuildAction::Run, ctx.clone()).await;

    assert!(outcome.is_success());
    assert_eq!(harness.programs(), vec!["ni", "inform6"]);
    assert_eq!(
        harness.host.calls(),
        vec![
            HostCall::Launch {
                story_file: ctx.story_file(),
                replay: Vec::new(),
            },
            HostCall::RefreshIndex { show: false },
        ]
    );
    assert_eq!(
        harness.reporter.event_types().last().copied(),
        Some("build.succeeded")
    );
}

#[tokio::test]
async fn test_test_me_replays_test_command() {
    let harness = Harness::new([translated(), compiled()]);

    harness.run(BuildAction::TestMe).await;

    let launches: Vec<_> = harness
        .host
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            HostCall::Launch { replay, .. } => Some(replay),
            _ => None,
        })
        .collect();
    assert_eq!(launches, vec![vec!["test me".to_string()]]);
}

#[tokio::test]
async fn test_translator_error_10_aborts_before_compiler() {
    let harness = Harness::new([Script::exit(10), compiled()]);
    let pipeline = harness.pipeline(BuildAction::Run, harness.fixture.context());
    let control = pipeline.control();

    let outcome = pipeline.run().await;

    let diagnostic = failed_diagnostic(&outcome);
    assert_eq!(
        diagnostic.kind,
        DiagnosticKind::KnownError {
            pattern: KnownPattern::TranslatorError10
        }
    );
    assert_eq!(
        diagnostic.resource,
        Some(DiagnosticResource::page("Error10.html"))
    );
    assert_eq!(diagnostic.exit_code, 10);
    assert_eq!(harness.runner.call_count(), 1);
    assert!(matches!(
        control.phase(),
        PipelinePhase::Aborted(AbortReason::StageFailed(_))
    ));
    assert!(harness.host.calls().is_empty());
    assert_eq!(harness.count("build.failed"), 1);
    assert_eq!(harness.count("build.succeeded"), 0);
}

#[tokio::test]
async fn test_translator_exit_1_points_at_problems_report() {
    let harness = Harness::new([Script::exit(1).creating("Problems.html", "<p>Problem</p>")]);
    let ctx = harness.fixture.context();

    let outcome = harness.run_with(BuildAction::Run, ctx.clone()).await;

    let diagnostic = failed_diagnostic(&outcome);
    assert_eq!(diagnostic.kind, DiagnosticKind::GenericError);
    assert_eq!(
        diagnostic.resource,
        Some(DiagnosticResource::ProjectReport(ctx.problems_report()))
    );
    assert_eq!(harness.runner.call_count(), 1);
}

#[tokio::test]
async fn test_compiler_memory_error_is_recognized() {
    let harness = Harness::new([translated(), Script::exit(1).stderr(MEMORY_ERROR)]);

    let outcome = harness.run(BuildAction::Run).await;

    let diagnostic = failed_diagnostic(&outcome);
    assert_eq!(diagnostic.stage, StageKind::Compile);
    assert_eq!(
        diagnostic.kind,
        DiagnosticKind::KnownError {
            pattern: KnownPattern::MemorySettingExceeded
        }
    );
    assert_ne!(
        diagnostic.resource,
        Some(DiagnosticResource::page(COMPILER_ERROR_PAGE))
    );
    assert!(harness.sink.text().contains("Compiler finished with code 1"));
}

#[tokio::test]
async fn test_compiler_generic_failure() {
    let harness = Harness::new([translated(), Script::exit(1).stdout("Error: No such constant\n")]);

    let outcome = harness.run(BuildAction::SaveDebugBuild).await;

    let diagnostic = failed_diagnostic(&outcome);
    assert_eq!(diagnostic.kind, DiagnosticKind::GenericError);
    assert_eq!(
        diagnostic.resource,
        Some(DiagnosticResource::page(COMPILER_ERROR_PAGE))
    );
    assert!(harness.host.save_requests().is_empty());
}

#[tokio::test]
async fn test_stop_during_compiler_is_final() {
    let harness = Harness::new([translated(), Script::hang().stdout("Inform 6.41\n")]);
    let pipeline = harness.pipeline(BuildAction::Run, harness.fixture.context());
    let control = pipeline.control();
    let build = tokio::spawn(pipeline.run());

    while harness.runner.call_count() < 2 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(control.current_stage(), Some(StageKind::Compile));

    assert!(control.stop("user"));
    // Aborted before the killed process has reported anything
    assert_eq!(
        control.phase(),
        PipelinePhase::Aborted(AbortReason::Stopped("user".to_string()))
    );
    assert!(!control.stop("again"));

    let outcome = build.await.unwrap();
    assert_eq!(
        outcome,
        BuildOutcome::Stopped {
            reason: "user".to_string()
        }
    );
    assert_eq!(
        control.phase(),
        PipelinePhase::Aborted(AbortReason::Stopped("user".to_string()))
    );
    assert_eq!(harness.runner.call_count(), 2);
    assert_eq!(harness.count("build.stopped"), 1);
    assert_eq!(harness.count("build.failed"), 0);
    assert_eq!(harness.count("stage.finished"), 1);
    assert!(harness.host.calls().is_empty());
}

#[tokio::test]
async fn test_stop_during_translation_skips_later_stages() {
    let harness = Harness::new([Script::exit(0).after(Duration::from_secs(30)), compiled()]);
    let pipeline = harness.pipeline(BuildAction::Run, harness.fixture.context());
    let control = pipeline.control();
    let build = tokio::spawn(pipeline.run());

    while harness.runner.call_count() < 1 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(control.stop("user"));

    let outcome = build.await.unwrap();
    assert!(matches!(outcome, BuildOutcome::Stopped { .. }));
    assert_eq!(harness.programs(), vec!["ni"]);
}

#[tokio::test]
async fn test_stop_before_start_runs_nothing() {
    let harness = Harness::new([]);
    let pipeline = harness.pipeline(BuildAction::Run, harness.fixture.context());
    assert!(pipeline.control().stop("early"));

    let outcome = pipeline.run().await;

    assert_eq!(
        outcome,
        BuildOutcome::Stopped {
            reason: "early".to_string()
        }
    );
    assert_eq!(harness.runner.call_count(), 0);
}

#[tokio::test]
async fn test_release_without_blorb_skips_packager() {
    let harness = Harness::new([translated(), compiled()]);
    let ctx = harness.fixture.context().with_blorb(false);
    let destination = harness.fixture.root().with_file_name("Cloak.z5");
    let harness = harness.with_host(RecordingHost::new().with_save_location(Some(destination.clone())));

    let outcome = harness.run_with(BuildAction::Release, ctx.clone()).await;

    assert_eq!(harness.programs(), vec!["ni", "inform6"]);
    assert_eq!(
        outcome,
        BuildOutcome::Succeeded {
            action: BuildAction::Release,
            saved_to: Some(destination.clone()),
            finalize_error: None,
        }
    );
    assert!(destination.is_file());
    assert!(!ctx.story_file().exists());

    let requests = harness.host.save_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].suggested_name, "Cloak.z5");
    assert!(harness.runner.invocations()[0]
        .argv
        .contains(&"-release".to_string()));
}

#[tokio::test]
async fn test_release_with_blorb_uses_reported_destination() {
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("Cloak.zblorb");
    let packaged = Script::exit(0)
        .stdout(format!("Copy blorb to: [[{}]]\n", destination.display()))
        .creating("Build/output.zblorb", "blorb");
    let harness = Harness::new([translated(), compiled(), packaged]);
    let ctx = harness.fixture.context().with_blorb(true);

    let outcome = harness.run_with(BuildAction::Release, ctx.clone()).await;

    assert_eq!(harness.programs(), vec!["ni", "inform6", "cBlorb"]);
    assert_eq!(
        outcome,
        BuildOutcome::Succeeded {
            action: BuildAction::Release,
            saved_to: Some(destination.clone()),
            finalize_error: None,
        }
    );
    assert!(harness.host.save_requests().is_empty());
    assert_eq!(std::fs::read_to_string(&destination).unwrap(), "blorb");

    let cwds: Vec<PathBuf> = harness
        .runner
        .invocations()
        .into_iter()
        .map(|i| i.cwd)
        .collect();
    assert_eq!(cwds, vec![ctx.build_dir(), ctx.build_dir(), ctx.root.clone()]);
}

#[tokio::test]
async fn test_packager_failure_aborts_release() {
    let harness = Harness::new([translated(), compiled(), Script::exit(2)]);
    let ctx = harness.fixture.context().with_blorb(true);

    let outcome = harness.run_with(BuildAction::Release, ctx.clone()).await;

    let diagnostic = failed_diagnostic(&outcome);
    assert_eq!(diagnostic.stage, StageKind::Package);
    assert_eq!(
        diagnostic.resource,
        Some(DiagnosticResource::ProjectReport(ctx.packager_report()))
    );
    assert!(harness.host.calls().is_empty());
}

#[tokio::test]
async fn test_spawn_failure_is_a_failed_build() {
    let harness = Harness::new([Script::SpawnFail]);

    let outcome = harness.run(BuildAction::Run).await;

    let diagnostic = failed_diagnostic(&outcome);
    assert_eq!(diagnostic.kind, DiagnosticKind::SpawnFailure);
    assert_eq!(diagnostic.exit_code, -1);
    assert!(diagnostic.message.as_deref().unwrap().contains("ni"));
    assert_eq!(harness.runner.call_count(), 1);
}

#[tokio::test]
async fn test_failure_at_any_stage_stops_the_sequence() {
    for failing in 0..3 {
        let mut scripts = vec![translated(), compiled(), Script::exit(0)];
        scripts[failing] = Script::exit(12);
        let harness = Harness::new(scripts);
        let ctx = harness.fixture.context().with_blorb(true);

        let outcome = harness.run_with(BuildAction::Release, ctx).await;

        assert!(!outcome.is_success(), "stage {failing} should fail the build");
        assert_eq!(harness.runner.call_count(), failing + 1);
    }
}

#[tokio::test]
async fn test_missing_story_file_is_a_finalize_error() {
    let harness = Harness::new([translated(), Script::exit(0)]);

    let outcome = harness.run(BuildAction::Run).await;

    let BuildOutcome::Succeeded { finalize_error, .. } = outcome else {
        panic!("finalization errors do not fail the build");
    };
    assert!(finalize_error.is_some());
    assert_eq!(harness.count("finalize.failed"), 1);
    assert_eq!(harness.count("build.succeeded"), 1);
}

#[tokio::test]
async fn test_save_ifiction_copies_record() {
    let harness = Harness::new([translated()]);
    harness
        .fixture
        .write("Metadata.iFiction", "<ifindex/>")
        .unwrap();
    let destination: PathBuf = harness.fixture.root().with_file_name("Cloak.iFiction");
    let harness = harness.with_host(RecordingHost::new().with_save_location(Some(destination.clone())));

    let outcome = harness.run(BuildAction::SaveIFiction).await;

    assert_eq!(harness.programs(), vec!["ni"]);
    assert!(outcome.is_success());
    assert_eq!(std::fs::read_to_string(destination).unwrap(), "<ifindex/>");
    // The record stays in the project
    assert!(harness.fixture.context().ifiction_record().is_file());
}

#[tokio::test]
async fn test_debug_artifacts_published_after_translation() {
    let translated_with_logs = translated()
        .creating("Debug log.txt", "log")
        .creating("auto.inf", "code");
    let harness = Harness::new([translated_with_logs])
        .with_config(ToolchainConfig::default().with_debug_log(true));

    harness.run(BuildAction::RefreshIndex).await;

    let artifacts: Vec<_> = harness
        .updates()
        .into_iter()
        .filter_map(|update| match update {
            StatusUpdate::ArtifactLoaded { artifact, contents } => Some((artifact, contents)),
            _ => None,
        })
        .collect();
    assert_eq!(
        artifacts,
        vec![
            (BuildArtifactKind::DebugLog, "log".to_string()),
            (BuildArtifactKind::IntermediateCode, "code".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_debug_artifacts_off_by_default() {
    let harness = Harness::new([translated().creating("auto.inf", "code")]);

    harness.run(BuildAction::RefreshIndex).await;

    assert_eq!(harness.count("artifact.loaded"), 0);
}

#[tokio::test]
async fn test_project_uuid_created_once() {
    let harness = Harness::new([translated(), translated()]);
    let uuid_file = harness.fixture.root().join(UUID_FILE);

    harness.run(BuildAction::RefreshIndex).await;
    let first = std::fs::read_to_string(&uuid_file).unwrap();
    assert!(uuid::Uuid::parse_str(&first).is_ok());

    harness.run(BuildAction::RefreshIndex).await;
    assert_eq!(std::fs::read_to_string(&uuid_file).unwrap(), first);
}

#[tokio::test]
async fn test_missing_project_directory_fails_setup() {
    let harness = Harness::new([]);
    let ctx = ProjectContext::new(harness.fixture.root().join("missing.inform"));

    let outcome = harness.run_with(BuildAction::Run, ctx).await;

    let diagnostic = failed_diagnostic(&outcome);
    assert!(diagnostic.message.as_deref().unwrap().contains(UUID_FILE));
    assert_eq!(harness.runner.call_count(), 0);
}

#[tokio::test]
async fn test_progress_and_pulses_reported() {
    let harness = Harness::new([
        translated()
            .stdout(" ++ 20% (Reading text)\n")
            .stdout(" ++ 80% (Generating code)\n"),
        compiled(),
    ]);

    harness.run(BuildAction::Run).await;

    let fractions: Vec<f64> = harness
        .updates()
        .into_iter()
        .filter_map(|update| match update {
            StatusUpdate::Progress { fraction, .. } => Some(fraction),
            _ => None,
        })
        .collect();
    assert_eq!(fractions, vec![0.2, 0.8]);
    assert!(harness.count("stage.pulse") >= 1);
}

#[tokio::test]
async fn test_sink_receives_echo_and_output() {
    let harness = Harness::new([translated().stdout("Inform 7 build\n"), compiled()]);

    harness.run(BuildAction::Run).await;

    let text = harness.sink.text();
    assert!(text.contains("\nni \\\n\t-internal"));
    assert!(text.contains("Inform 7 build"));
    assert!(text.contains("Compiler finished with code 0"));
    let echo = text.find("\ninform6 \\").unwrap();
    let translator_output = text.find("Inform 7 build").unwrap();
    assert!(translator_output < echo);
}

#[tokio::test]
async fn test_stage_messages_in_order() {
    let harness = Harness::new([translated(), compiled()]);

    harness.run(BuildAction::Run).await;

    let messages: Vec<String> = harness
        .updates()
        .into_iter()
        .filter_map(|update| match update {
            StatusUpdate::StageStarted { message, .. } => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(
        messages,
        vec!["Running Natural Inform...", "Running Inform 6..."]
    );
}
