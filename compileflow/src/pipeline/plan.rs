//! Mapping from a build action to its stages and finalization.

use super::StageSpec;
use crate::config::ToolchainConfig;
use crate::context::{ProjectContext, INTERMEDIATE_CODE, RELEASE_MANIFEST};
use crate::core::{BuildAction, StageKind, StoryFormat};
use crate::finalize::Finalization;
use crate::process::census_argv;
use std::path::Path;

/// Input the translator replays for the `TestMe` action.
pub const TEST_ME_INPUT: &str = "test me";

/// The ordered stages and the finalization routine for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    /// The requested action.
    pub action: BuildAction,
    /// Stages in execution order; never empty.
    pub stages: Vec<StageSpec>,
    /// What to do after the last stage succeeds.
    pub finalization: Finalization,
}

impl BuildPlan {
    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false; every plan has at least the translator stage.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage kinds in execution order.
    #[must_use]
    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind).collect()
    }
}

/// Builds the plan for an action.
///
/// A pure function of its inputs: the same action, context and toolchain
/// always give the same argument vectors.
#[must_use]
pub fn plan_for(action: BuildAction, ctx: &ProjectContext, config: &ToolchainConfig) -> BuildPlan {
    let mut stages = vec![translator_stage(action, ctx, config)];
    if action.needs_bytecode() {
        stages.push(compiler_stage(action, ctx, config));
    }
    if ctx.packages(action) {
        stages.push(packager_stage(ctx, config));
    }

    BuildPlan {
        action,
        stages,
        finalization: finalization_for(action, ctx),
    }
}

fn finalization_for(action: BuildAction, ctx: &ProjectContext) -> Finalization {
    match action {
        BuildAction::RefreshIndex => Finalization::RefreshIndex,
        BuildAction::Run => Finalization::Launch {
            replay: ctx.replay_inputs.clone(),
        },
        BuildAction::TestMe => Finalization::Launch {
            replay: vec![TEST_ME_INPUT.to_string()],
        },
        BuildAction::Release => Finalization::Release,
        BuildAction::SaveDebugBuild => Finalization::SaveDebugBuild,
        BuildAction::SaveIFiction => Finalization::ExportIFiction,
    }
}

/// Stage 1: translate the source into intermediate code, inside `Build`.
#[must_use]
pub fn translator_stage(
    action: BuildAction,
    ctx: &ProjectContext,
    config: &ToolchainConfig,
) -> StageSpec {
    let spec = StageSpec::new(StageKind::Translate, &config.natural_compiler, ctx.build_dir())
        .arg("-internal")
        .path_arg(&config.rules_dir)
        .arg(format!("-format={}", ctx.format.extension()))
        .arg("-project")
        .path_arg(&ctx.root);

    // Release omits not-for-release material; it never uses the fixed seed
    if action.is_release() {
        spec.arg("-release")
    } else if ctx.alternate_rng {
        spec.arg("-rng")
    } else {
        spec
    }
}

/// Stage 2: compile intermediate code to bytecode, inside `Build`.
#[must_use]
pub fn compiler_stage(
    action: BuildAction,
    ctx: &ProjectContext,
    config: &ToolchainConfig,
) -> StageSpec {
    let mut spec = StageSpec::new(StageKind::Compile, &config.inform6_compiler, ctx.build_dir())
        .arg(compiler_switches(action, ctx.format));
    if let Some(ref library) = config.library_dir {
        spec = spec.arg(format!("+{}", library.to_string_lossy()));
    }
    spec.arg(config.memory_setting.clone())
        .arg(INTERMEDIATE_CODE)
        .arg(ctx.story_file_name())
}

/// Stage 3: package the bytecode with the release manifest.
#[must_use]
pub fn packager_stage(ctx: &ProjectContext, config: &ToolchainConfig) -> StageSpec {
    let blorb = Path::new(crate::context::BUILD_DIR).join(ctx.blorb_file_name());
    StageSpec::new(StageKind::Package, &config.packager, &ctx.root)
        .args(config.packager_flags.iter().cloned())
        .arg(RELEASE_MANIFEST)
        .path_arg(&blorb)
}

/// Switches string for the bytecode compiler.
///
/// Strict mode and debugging are on for everything except release builds.
#[must_use]
pub fn compiler_switches(action: BuildAction, format: StoryFormat) -> String {
    let debug = if action.is_release() { "~S~D" } else { "kSD" };
    format!("-wE2{}{}x", debug, format.compiler_switch())
}

/// The extension census, as a stage specification run from `cwd`.
///
/// Never part of a build plan.
#[must_use]
pub fn census_spec(config: &ToolchainConfig, cwd: &Path) -> StageSpec {
    let argv = census_argv(config);
    StageSpec::new(StageKind::Translate, &config.natural_compiler, cwd).args(argv.into_iter().skip(1))
}
