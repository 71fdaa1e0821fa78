//! Google Drive source resolution.
//!
//! A share link comes in many shapes; the resolver tries a fixed list of
//! patterns in priority order and keeps the first captured file id.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::PipelineError;

/// Recognised reference shapes, highest priority first
static PATTERNS: LazyLock<[(&'static str, Regex); 3]> = LazyLock::new(|| {
    [
        ("file path", Regex::new(r"/file/d/([A-Za-z0-9_-]+)").unwrap()),
        ("id query", Regex::new(r"id=([A-Za-z0-9_-]+)").unwrap()),
        ("open query", Regex::new(r"/open\?id=([A-Za-z0-9_-]+)").unwrap()),
    ]
});

/// Stable identifier of a hosted file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceId(String);

impl SourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns share links into file ids and file ids into direct download URLs
#[derive(Debug, Clone)]
pub struct SourceResolver {
    export_url: String,
}

impl SourceResolver {
    pub fn new(export_url: impl Into<String>) -> Self {
        Self {
            export_url: export_url.into(),
        }
    }

    /// Extract the file id from a share link
    pub fn resolve(&self, reference: &str) -> Result<SourceId, PipelineError> {
        PATTERNS
            .iter()
            .find_map(|(name, pattern)| {
                pattern.captures(reference).map(|caps| {
                    tracing::debug!(pattern = *name, "Matched source reference");
                    SourceId(caps[1].to_string())
                })
            })
            .ok_or_else(|| {
                PipelineError::Resolution(
                    "Could not extract file ID from Google Drive URL".to_string(),
                )
            })
    }

    /// Direct download URL for a file id
    pub fn build_fetch_url(&self, source_id: &SourceId) -> String {
        format!("{}{}", self.export_url, source_id.as_str())
    }
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::new(crate::config::Config::default().source.export_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(reference: &str) -> Result<SourceId, PipelineError> {
        SourceResolver::default().resolve(reference)
    }

    #[test]
    fn test_file_path_link() {
        let id = resolve("https://drive.google.com/file/d/ABC123/view").unwrap();
        assert_eq!(id.as_str(), "ABC123");
    }

    #[test]
    fn test_id_query_link() {
        let id = resolve("https://drive.google.com/uc?export=download&id=1a-B_c").unwrap();
        assert_eq!(id.as_str(), "1a-B_c");
    }

    #[test]
    fn test_open_link() {
        let id = resolve("https://drive.google.com/open?id=XYZ_789").unwrap();
        assert_eq!(id.as_str(), "XYZ_789");
    }

    #[test]
    fn test_path_pattern_wins_over_query() {
        let id = resolve("https://drive.google.com/file/d/PATH1/view?resourcekey=1&id=QUERY2").unwrap();
        assert_eq!(id.as_str(), "PATH1");
    }

    #[test]
    fn test_id_stops_at_unrecognised_characters() {
        let id = resolve("https://drive.google.com/file/d/ABC123?usp=sharing").unwrap();
        assert_eq!(id.as_str(), "ABC123");
    }

    #[test]
    fn test_unrecognised_reference_fails() {
        for reference in ["", "https://example.com/video.mp4", "https://drive.google.com/drive/folders"] {
            match resolve(reference) {
                Err(PipelineError::Resolution(msg)) => {
                    assert_eq!(msg, "Could not extract file ID from Google Drive URL")
                }
                other => panic!("expected resolution error for {:?}, got {:?}", reference, other),
            }
        }
    }

    #[test]
    fn test_build_fetch_url() {
        let resolver = SourceResolver::default();
        let id = resolver.resolve("https://drive.google.com/file/d/ABC123/view").unwrap();
        assert_eq!(
            resolver.build_fetch_url(&id),
            "https://drive.google.com/uc?export=download&id=ABC123"
        );
        assert_eq!(resolver.build_fetch_url(&id), resolver.build_fetch_url(&id));
    }

    #[test]
    fn test_custom_export_url() {
        let resolver = SourceResolver::new("http://127.0.0.1:9000/download?id=");
        let id = resolver.resolve("https://drive.google.com/open?id=Q1").unwrap();
        assert_eq!(resolver.build_fetch_url(&id), "http://127.0.0.1:9000/download?id=Q1");
    }
}
