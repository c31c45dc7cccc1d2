//! Stable lesson identifiers.
//!
//! A lesson's key is `"<section dir>/<file name>"` built from the names on
//! disk only, so the same folder yields the same keys across sessions no
//! matter which grant or handle was used to read it. Progress, completion
//! caches and watch stats are all keyed by it.

use std::sync::LazyLock;

use regex::Regex;

pub const SEPARATOR: char = '/';

static NUMERIC_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\s+").expect("numeric prefix pattern is valid"));

pub fn path_key(section: &str, file_name: &str) -> String {
    format!("{section}{SEPARATOR}{file_name}")
}

pub fn section_of(path: &str) -> &str {
    path.split_once(SEPARATOR).map_or(path, |(section, _)| section)
}

/// Lower-cased extension after the last dot, if any.
pub fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Human-readable lesson title: extension dropped, then at most one leading
/// `digits + whitespace` ordering prefix stripped ("01 Intro.mp4" -> "Intro").
pub fn display_name(file_name: &str) -> String {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    let stripped = NUMERIC_PREFIX.replace(stem, "");
    if stripped.trim().is_empty() {
        stem.to_string()
    } else {
        stripped.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_keeps_original_file_name() {
        assert_eq!(path_key("Basics", "01 Intro.mp4"), "Basics/01 Intro.mp4");
    }

    #[test]
    fn section_of_key() {
        assert_eq!(section_of("Advanced/1 Deep.mp4"), "Advanced");
        assert_eq!(section_of("orphan"), "orphan");
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension("Clip.MP4").as_deref(), Some("mp4"));
        assert_eq!(extension("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension("README"), None);
        assert_eq!(extension("trailing."), None);
    }

    #[test]
    fn display_name_strips_prefix_and_extension() {
        assert_eq!(display_name("01 Intro.mp4"), "Intro");
        assert_eq!(display_name("10   Wrap up.webm"), "Wrap up");
        assert_eq!(display_name("Setup.pdf"), "Setup");
    }

    #[test]
    fn display_name_strips_only_the_leading_group() {
        assert_eq!(display_name("1 2 Three.mp4"), "2 Three");
        assert_eq!(display_name("Part 2 Details.mp4"), "Part 2 Details");
    }

    #[test]
    fn display_name_needs_whitespace_after_digits() {
        assert_eq!(display_name("2024.mp4"), "2024");
        assert_eq!(display_name("3-intro.mp4"), "3-intro");
    }

    #[test]
    fn display_name_never_empty() {
        assert_eq!(display_name("01 .mp4"), "01 ");
        assert_eq!(display_name(".hidden"), ".hidden");
    }
}
