//! Deterministic file names for downloaded videos
//!
//! The same lesson/video/resolution always maps to the same name, which is
//! what lets a rerun skip files that are already on disk.

use std::path::Path;
use url::Url;

/// Characters removed from every generated name.
pub const INVALID_CHARS: [char; 9] = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Strip invalid characters, trim, and turn doubled spaces into single ones.
pub fn sanitize(name: &str) -> String {
    let stripped: String = name.chars().filter(|c| !INVALID_CHARS.contains(c)).collect();
    stripped.trim().replace("  ", " ")
}

/// Extension of the URL path including the dot, or empty when there is none.
pub fn url_extension(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    Path::new(parsed.path())
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// `"{lesson} - {subtitle} - Video {index:02} - {title} ({resolution})"`,
/// sanitized, followed by the URL's extension.
pub fn build_filename(
    lesson: &str,
    subtitle: &str,
    index: usize,
    title: &str,
    resolution: Option<&str>,
    url: &str,
) -> String {
    let base = format!(
        "{} - {} - Video {:02} - {} ({})",
        lesson,
        subtitle,
        index,
        title,
        resolution.unwrap_or("unknown")
    );
    sanitize(&base) + &url_extension(url)
}
