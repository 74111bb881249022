//! Project fixtures for pipeline testing.

use crate::context::{ProjectContext, BUILD_DIR};
use std::io;
use std::path::{Path, PathBuf};

/// A project bundle laid out on disk, with its `Build` directory.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    root: PathBuf,
}

impl ProjectFixture {
    /// Creates `<base>/<name>.inform/Build`.
    pub fn create(base: &Path, name: &str) -> io::Result<Self> {
        let root = base.join(format!("{name}.inform"));
        std::fs::create_dir_all(root.join(BUILD_DIR))?;
        Ok(Self { root })
    }

    /// The bundle directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A default context for this project.
    #[must_use]
    pub fn context(&self) -> ProjectContext {
        ProjectContext::new(&self.root)
    }

    /// Writes a file relative to the bundle directory.
    pub fn write(&self, relative: impl AsRef<Path>, contents: &str) -> io::Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Writes a file inside `Build`.
    pub fn write_build_file(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        self.write(Path::new(BUILD_DIR).join(name), contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = ProjectFixture::create(dir.path(), "Cloak").unwrap();

        assert!(fixture.root().join("Build").is_dir());
        assert_eq!(fixture.context().display_name(), "Cloak");

        let report = fixture.write_build_file("Problems.html", "<html/>").unwrap();
        assert_eq!(report, fixture.context().problems_report());
        assert!(report.is_file());
    }
}
