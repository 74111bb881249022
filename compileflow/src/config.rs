//! Toolchain configuration.

use crate::core::DiagnosticResource;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the external compilers and their support files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Stage 1 executable.
    #[serde(default = "default_natural_compiler")]
    pub natural_compiler: PathBuf,
    /// Stage 2 executable.
    #[serde(default = "default_inform6_compiler")]
    pub inform6_compiler: PathBuf,
    /// Stage 3 executable.
    #[serde(default = "default_packager")]
    pub packager: PathBuf,
    /// Rules and extensions directory passed to stage 1.
    #[serde(default = "default_rules_dir")]
    pub rules_dir: PathBuf,
    /// Optional include path for stage 2.
    #[serde(default)]
    pub library_dir: Option<PathBuf>,
    /// Root of the built-in documentation.
    #[serde(default = "default_documentation_dir")]
    pub documentation_dir: PathBuf,
    /// Memory setting passed to stage 2.
    #[serde(default = "default_memory_setting")]
    pub memory_setting: String,
    /// Fixed flags passed to stage 3.
    #[serde(default = "default_packager_flags")]
    pub packager_flags: Vec<String>,
    /// Publish the debug log and intermediate code after stage 1.
    #[serde(default)]
    pub show_debug_log: bool,
}

fn default_natural_compiler() -> PathBuf {
    PathBuf::from("ni")
}

fn default_inform6_compiler() -> PathBuf {
    PathBuf::from("inform6")
}

fn default_packager() -> PathBuf {
    PathBuf::from("cBlorb")
}

fn default_rules_dir() -> PathBuf {
    PathBuf::from("Inform7").join("Extensions")
}

fn default_documentation_dir() -> PathBuf {
    PathBuf::from("Documentation")
}

fn default_memory_setting() -> String {
    "$huge".to_string()
}

fn default_packager_flags() -> Vec<String> {
    vec!["-unix".to_string()]
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            natural_compiler: default_natural_compiler(),
            inform6_compiler: default_inform6_compiler(),
            packager: default_packager(),
            rules_dir: default_rules_dir(),
            library_dir: None,
            documentation_dir: default_documentation_dir(),
            memory_setting: default_memory_setting(),
            packager_flags: default_packager_flags(),
            show_debug_log: false,
        }
    }
}

impl ToolchainConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file.
    ///
    /// Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `COMPILEFLOW_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var_os(key).map(PathBuf::from))
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<PathBuf>) -> Self {
        let apply = |key: &str, slot: &mut PathBuf| {
            if let Some(value) = lookup(key) {
                debug!(key, value = %value.display(), "Toolchain override");
                *slot = value;
            }
        };
        apply("COMPILEFLOW_NI", &mut self.natural_compiler);
        apply("COMPILEFLOW_INFORM6", &mut self.inform6_compiler);
        apply("COMPILEFLOW_CBLORB", &mut self.packager);
        apply("COMPILEFLOW_RULES_DIR", &mut self.rules_dir);
        apply("COMPILEFLOW_DOCS_DIR", &mut self.documentation_dir);
        if let Some(dir) = lookup("COMPILEFLOW_LIBRARY_DIR") {
            self.library_dir = Some(dir);
        }
        self
    }

    /// Sets the stage 1 executable.
    #[must_use]
    pub fn with_natural_compiler(mut self, path: impl Into<PathBuf>) -> Self {
        self.natural_compiler = path.into();
        self
    }

    /// Sets the stage 2 executable.
    #[must_use]
    pub fn with_inform6_compiler(mut self, path: impl Into<PathBuf>) -> Self {
        self.inform6_compiler = path.into();
        self
    }

    /// Sets the stage 3 executable.
    #[must_use]
    pub fn with_packager(mut self, path: impl Into<PathBuf>) -> Self {
        self.packager = path.into();
        self
    }

    /// Sets the stage 2 include path.
    #[must_use]
    pub fn with_library_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_dir = Some(path.into());
        self
    }

    /// Sets the documentation root.
    #[must_use]
    pub fn with_documentation_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.documentation_dir = path.into();
        self
    }

    /// Enables publishing the debug log after stage 1.
    #[must_use]
    pub fn with_debug_log(mut self, enabled: bool) -> Self {
        self.show_debug_log = enabled;
        self
    }

    /// Directory holding the built-in help pages.
    #[must_use]
    pub fn pages_dir(&self) -> PathBuf {
        self.documentation_dir.join("Sections")
    }

    /// Maps a diagnostic resource to the file to display.
    #[must_use]
    pub fn resolve(&self, resource: &DiagnosticResource) -> PathBuf {
        match resource {
            DiagnosticResource::Documentation(page) => self.pages_dir().join(page),
            DiagnosticResource::ProjectReport(path) => path.clone(),
        }
    }
}
