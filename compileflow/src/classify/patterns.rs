//! Text patterns recognized in compiler output.

use crate::core::KnownPattern;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Marker shared by "Error:" and "Fatal error:" lines.
pub const ERROR_MARKER: &str = "rror:";

const COPY_DESTINATION_OPEN: &str = "Copy blorb to: [[";
const COPY_DESTINATION_CLOSE: &str = "]]";

/// Bytecode compiler messages with dedicated help pages, in match order.
fn templates() -> &'static [(KnownPattern, Regex)] {
    static TEMPLATES: OnceLock<Vec<(KnownPattern, Regex)>> = OnceLock::new();
    TEMPLATES.get_or_init(|| {
        vec![
            (
                KnownPattern::MemorySettingExceeded,
                Regex::new(r"The memory setting .+ has been exceeded\.")
                    .expect("Invalid memory setting regex"),
            ),
            (
                KnownPattern::ReadableMemoryExceeded,
                Regex::new(r"overflowed the maximum readable-memory size of the ")
                    .expect("Invalid readable memory regex"),
            ),
            (
                KnownPattern::StoryFileTooBig,
                Regex::new(r"The story file exceeds ").expect("Invalid story size regex"),
            ),
        ]
    })
}

/// Returns the last line of `output` containing [`ERROR_MARKER`].
#[must_use]
pub fn last_error_line(output: &str) -> Option<&str> {
    output.lines().rev().find(|line| line.contains(ERROR_MARKER))
}

/// Matches an error line against the known bytecode compiler messages.
#[must_use]
pub fn match_template(line: &str) -> Option<KnownPattern> {
    templates()
        .iter()
        .find(|(_, re)| re.is_match(line))
        .map(|(pattern, _)| *pattern)
}

/// Extracts the path the packager reports having copied its result to.
///
/// The packager prints `Copy blorb to: [[/some/path]]` when the release
/// manifest names a destination.
#[must_use]
pub fn copy_destination(output: &str) -> Option<PathBuf> {
    let start = output.find(COPY_DESTINATION_OPEN)? + COPY_DESTINATION_OPEN.len();
    let rest = &output[start..];
    let end = rest.find(COPY_DESTINATION_CLOSE)?;
    let path = rest[..end].trim();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_error_line_scans_backward() {
        let output = "Error: first\nsome text\nFatal error: second\ntrailer\n";
        assert_eq!(last_error_line(output), Some("Fatal error: second"));
        assert_eq!(last_error_line("all fine\n"), None);
    }

    #[test]
    fn test_match_template() {
        assert_eq!(
            match_template("auto.inf(12): Error: The memory setting MAX_STATIC_DATA (which is 10000 at present) has been exceeded."),
            Some(KnownPattern::MemorySettingExceeded)
        );
        assert_eq!(
            match_template("Fatal error: This program has overflowed the maximum readable-memory size of the Z-machine format."),
            Some(KnownPattern::ReadableMemoryExceeded)
        );
        assert_eq!(
            match_template("Fatal error: The story file exceeds version-5 limit (256K) by 1024 bytes"),
            Some(KnownPattern::StoryFileTooBig)
        );
        assert_eq!(match_template("Error: No such constant as \"foo\""), None);
    }

    #[test]
    fn test_story_size_matches_any_wording_after_prefix() {
        assert_eq!(
            match_template("Fatal error: The story file exceeds the Glulx maximum of 2GB"),
            Some(KnownPattern::StoryFileTooBig)
        );
        assert_eq!(
            match_template("Error: The story file exceeds "),
            Some(KnownPattern::StoryFileTooBig)
        );
    }

    #[test]
    fn test_copy_destination() {
        let output = "! Completed: wrote blorb file\nCopy blorb to: [[/home/me/Cloak.zblorb]]\n";
        assert_eq!(
            copy_destination(output),
            Some(PathBuf::from("/home/me/Cloak.zblorb"))
        );
        assert_eq!(copy_destination("Copy blorb to: [[unterminated"), None);
        assert_eq!(copy_destination("Copy blorb to: [[]]"), None);
        assert_eq!(copy_destination("nothing here"), None);
    }
}
