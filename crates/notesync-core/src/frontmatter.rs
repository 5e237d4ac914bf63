//! Frontmatter parsing and serialization carrying the file-side version marker.
//!
//! Exported files start with a YAML frontmatter block whose `version` key
//! records the note's version counter at export time:
//!
//! ```markdown
//! ---
//! version: 12
//! ---
//!
//! # Content here
//! ```
//!
//! The marker lets the comparator catch note edits that arrived through
//! channels that never touched the local checksum (e.g. the host account's
//! own remote sync). A negative or non-integer marker means the file header
//! was hand-edited or corrupted and the file can no longer be trusted for
//! automatic merging.

use crate::compare::FileMeta;
use std::collections::HashMap;

/// Parsed markdown file: version marker plus body text.
#[derive(Debug, Clone)]
pub struct ParsedNote {
    pub meta: FileMeta,
    /// Markdown body (everything after frontmatter)
    pub body: String,
}

/// Parse a markdown file into its version marker and body.
///
/// Files without a leading `---` block, or with a block that lacks a
/// `version` key, yield `FileMeta::Absent`. A block whose `version` value is
/// negative or not an integer yields `FileMeta::Unreadable`.
pub fn parse(content: &str) -> ParsedNote {
    if !content.starts_with("---") {
        return ParsedNote {
            meta: FileMeta::Absent,
            body: content.to_string(),
        };
    }

    let rest = &content[3..];
    let Some(pos) = rest.find("\n---") else {
        // No closing delimiter, treat entire content as body
        return ParsedNote {
            meta: FileMeta::Absent,
            body: content.to_string(),
        };
    };

    let yaml_content = rest[..pos].trim();
    let body_start = pos + 4; // Skip "\n---"
    let body = rest[body_start..].trim_start_matches('\n').to_string();

    let meta = match serde_yaml::from_str::<HashMap<String, serde_yaml::Value>>(yaml_content) {
        Ok(fm) => match fm.get("version") {
            Some(serde_yaml::Value::Number(n)) => match n.as_i64() {
                Some(v) if v >= 0 => FileMeta::Version(v),
                _ => FileMeta::Unreadable,
            },
            Some(_) => FileMeta::Unreadable,
            None => FileMeta::Absent,
        },
        Err(_) => FileMeta::Unreadable,
    };

    ParsedNote { meta, body }
}

/// Serialize a version marker and body back to markdown.
pub fn serialize(version: i64, body: &str) -> String {
    format!("---\nversion: {}\n---\n\n{}", version, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_version_marker() {
        let content = "---\nversion: 7\n---\n\n# Hello World\n\nThis is the body.";
        let parsed = parse(content);
        assert_eq!(parsed.meta, FileMeta::Version(7));
        assert!(parsed.body.starts_with("# Hello World"));
    }

    #[test]
    fn test_parse_without_frontmatter() {
        let content = "# Just a heading\n\nSome content.";
        let parsed = parse(content);
        assert_eq!(parsed.meta, FileMeta::Absent);
        assert_eq!(parsed.body, content);
    }

    #[test]
    fn test_parse_frontmatter_without_version_key() {
        let content = "---\ntitle: My Note\n---\n\nBody.";
        let parsed = parse(content);
        assert_eq!(parsed.meta, FileMeta::Absent);
        assert_eq!(parsed.body, "Body.");
    }

    #[test]
    fn test_negative_version_is_unreadable() {
        let content = "---\nversion: -1\n---\n\nBody.";
        assert_eq!(parse(content).meta, FileMeta::Unreadable);
    }

    #[test]
    fn test_non_integer_version_is_unreadable() {
        let content = "---\nversion: soon\n---\n\nBody.";
        assert_eq!(parse(content).meta, FileMeta::Unreadable);
    }

    #[test]
    fn test_invalid_yaml_is_unreadable() {
        let content = "---\nversion: [unclosed\n---\n\nBody.";
        assert_eq!(parse(content).meta, FileMeta::Unreadable);
    }

    #[test]
    fn test_missing_closing_delimiter_is_body() {
        let content = "--- not actually frontmatter";
        let parsed = parse(content);
        assert_eq!(parsed.meta, FileMeta::Absent);
        assert_eq!(parsed.body, content);
    }

    #[test]
    fn test_roundtrip() {
        let body = "# Content\n\nParagraph.";
        let serialized = serialize(42, body);
        let parsed = parse(&serialized);
        assert_eq!(parsed.meta, FileMeta::Version(42));
        assert_eq!(parsed.body, body);
    }
}
