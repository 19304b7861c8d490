//! # Parser
//!
//! Extracts the container chain from a distinguished-name-style path.
//!
//! ## Grammar
//!
//! - Components are separated by `,` or `;`
//! - Each component is `TAG=value`; tags are matched case-insensitively
//! - Only `OU` components are containers; `CN`, `DC` and any other tags are
//!   dropped (the leaf object and the domain root are not part of the chain)
//! - Values may contain RFC 4514 escapes (`\,`, `\2C`)
//!
//! Containers come out leaf-first, in the order written. Use
//! [`HierarchicalPath::root_first`] before provisioning.
//!
//! ## Malformed components
//!
//! [`ParseMode::Lenient`] skips malformed components (a missing `=`, an empty
//! value, a stray delimiter). [`ParseMode::Strict`] rejects the whole path
//! with a [`MalformedSegmentError`].

use crate::constants::CONTAINER_TAG;
use crate::dn::{unescape_value, EmptySegmentError, EscapeError, Segment};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// RFC 4514 attributeType: a keyword or a numeric OID
static ATTRIBUTE_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z][A-Za-z0-9-]*|[0-9]+(?:\.[0-9]+)*)$")
        .expect("attribute type pattern is a valid regex")
});

/// How to treat components that cannot be parsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Skip malformed components and keep going
    #[default]
    Lenient,
    /// Fail on the first malformed component
    Strict,
}

/// Why a component was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("empty component (stray delimiter)")]
    EmptyComponent,
    #[error("missing '='")]
    MissingEquals,
    #[error("missing attribute type before '='")]
    EmptyTag,
    #[error("'{0}' is not a valid attribute type")]
    InvalidTag(String),
    #[error("empty value")]
    EmptyValue,
    #[error("bad escape: {0}")]
    BadEscape(#[from] EscapeError),
}

/// A path component that could not be parsed in strict mode
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed path component #{index} '{component}': {reason}")]
pub struct MalformedSegmentError {
    /// Zero-based position of the component in the expression
    pub index: usize,
    /// Component text as written
    pub component: String,
    pub reason: MalformedReason,
}

/// Container segments of a path, leaf-first as written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchicalPath {
    segments: Vec<Segment>,
}

impl HierarchicalPath {
    /// Segments leaf-first
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments root-first, the order containers must be created in
    pub fn root_first(&self) -> Vec<Segment> {
        self.segments.iter().rev().cloned().collect()
    }

    pub fn into_leaf_first(self) -> Vec<Segment> {
        self.segments
    }
}

/// Parse leniently, skipping malformed components
pub fn parse(raw: &str) -> HierarchicalPath {
    let mut segments = Vec::new();
    for (index, component) in split_components(raw).into_iter().enumerate() {
        match parse_component(component, ParseMode::Lenient) {
            Ok(Some(segment)) => segments.push(segment),
            Ok(None) => {}
            Err(reason) => {
                debug!(index, component, %reason, "Skipping malformed path component");
            }
        }
    }
    HierarchicalPath { segments }
}

/// Parse with an explicit malformed-component policy
///
/// # Errors
///
/// In [`ParseMode::Strict`], returns the first malformed component.
pub fn parse_with_mode(
    raw: &str,
    mode: ParseMode,
) -> Result<HierarchicalPath, MalformedSegmentError> {
    if mode == ParseMode::Lenient {
        return Ok(parse(raw));
    }

    let mut segments = Vec::new();
    for (index, component) in split_components(raw).into_iter().enumerate() {
        match parse_component(component, mode) {
            Ok(Some(segment)) => segments.push(segment),
            Ok(None) => {}
            Err(reason) => {
                return Err(MalformedSegmentError {
                    index,
                    component: component.to_string(),
                    reason,
                });
            }
        }
    }
    Ok(HierarchicalPath { segments })
}

/// Split on `,` / `;` that are not escaped
fn split_components(raw: &str) -> Vec<&str> {
    let mut components = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, c) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            ',' | ';' => {
                components.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    // A trailing delimiter does not open an empty component
    let tail = &raw[start..];
    if !tail.trim_matches(' ').is_empty() {
        components.push(tail);
    }
    components
}

/// Returns `Some(segment)` for containers, `None` for other component kinds
fn parse_component(
    component: &str,
    mode: ParseMode,
) -> Result<Option<Segment>, MalformedReason> {
    let component = trim_unescaped_end(component.trim_start_matches(' '));
    if component.is_empty() {
        return Err(MalformedReason::EmptyComponent);
    }

    let (tag, value) = component
        .split_once('=')
        .ok_or(MalformedReason::MissingEquals)?;
    let tag = tag.trim_matches(' ');
    let value = value.trim_start_matches(' ');

    if tag.is_empty() {
        return Err(MalformedReason::EmptyTag);
    }
    if !ATTRIBUTE_TYPE.is_match(tag) {
        return Err(MalformedReason::InvalidTag(tag.to_string()));
    }
    if value.is_empty() {
        return Err(MalformedReason::EmptyValue);
    }

    if !tag.eq_ignore_ascii_case(CONTAINER_TAG) {
        if mode == ParseMode::Strict {
            unescape_value(value)?;
        }
        return Ok(None);
    }

    let name = unescape_value(value)?;
    Segment::new(name)
        .map(Some)
        .map_err(|EmptySegmentError| MalformedReason::EmptyValue)
}

/// Trim trailing spaces unless the last one is escaped (`OU=x\ `)
///
/// Only ASCII space is insignificant around RFC 4514 values; other
/// whitespace belongs to the name.
fn trim_unescaped_end(s: &str) -> &str {
    let mut end = s.len();
    while s[..end].ends_with(' ') {
        let backslashes = s[..end - 1]
            .bytes()
            .rev()
            .take_while(|b| *b == b'\\')
            .count();
        if backslashes % 2 == 1 {
            break;
        }
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(path: &HierarchicalPath) -> Vec<&str> {
        path.segments().iter().map(Segment::as_str).collect()
    }

    #[test]
    fn test_split_components_honours_escapes() {
        assert_eq!(
            split_components("OU=a\\,b,OU=c;DC=d"),
            vec!["OU=a\\,b", "OU=c", "DC=d"]
        );
    }

    #[test]
    fn test_split_components_drops_single_trailing_delimiter() {
        assert_eq!(split_components("OU=a,OU=b,"), vec!["OU=a", "OU=b"]);
        assert_eq!(split_components("OU=a"), vec!["OU=a"]);
        assert!(split_components("").is_empty());
    }

    #[test]
    fn test_split_components_keeps_inner_empty_components() {
        assert_eq!(split_components("OU=a,,OU=b"), vec!["OU=a", "", "OU=b"]);
    }

    #[test]
    fn test_parse_component_kinds() {
        assert_eq!(
            parse_component("OU=Staff", ParseMode::Strict),
            Ok(Some(Segment::new("Staff").unwrap()))
        );
        assert_eq!(parse_component("CN=Test User", ParseMode::Strict), Ok(None));
        assert_eq!(parse_component("DC=Com", ParseMode::Strict), Ok(None));
        assert_eq!(
            parse_component("2.5.4.11=x", ParseMode::Strict),
            Ok(None),
            "numeric OIDs are valid attribute types but not the OU keyword"
        );
    }

    #[test]
    fn test_parse_component_reasons() {
        assert_eq!(
            parse_component("OU", ParseMode::Strict),
            Err(MalformedReason::MissingEquals)
        );
        assert_eq!(
            parse_component("=Staff", ParseMode::Strict),
            Err(MalformedReason::EmptyTag)
        );
        assert_eq!(
            parse_component("OU=", ParseMode::Strict),
            Err(MalformedReason::EmptyValue)
        );
        assert_eq!(
            parse_component("O U=x", ParseMode::Strict),
            Err(MalformedReason::InvalidTag("O U".to_string()))
        );
        assert_eq!(
            parse_component("OU=bad\\", ParseMode::Strict),
            Err(MalformedReason::BadEscape(EscapeError::TrailingBackslash))
        );
    }

    #[test]
    fn test_lenient_ignores_bad_escape_outside_containers() {
        assert_eq!(parse_component("CN=bad\\", ParseMode::Lenient), Ok(None));
        assert!(parse_component("CN=bad\\", ParseMode::Strict).is_err());
    }

    #[test]
    fn test_trim_keeps_escaped_trailing_space() {
        assert_eq!(trim_unescaped_end("OU=x\\  "), "OU=x\\ ");
        assert_eq!(trim_unescaped_end("OU=x\\\\ "), "OU=x\\\\");
        assert_eq!(trim_unescaped_end("OU=x  "), "OU=x");
        assert_eq!(
            parse_component("OU=pad\\ ", ParseMode::Strict),
            Ok(Some(Segment::new("pad ").unwrap()))
        );
    }

    #[test]
    fn test_only_ascii_space_is_trimmed() {
        assert_eq!(trim_unescaped_end("OU=a\u{3000}"), "OU=a\u{3000}");
        assert_eq!(
            parse_component("OU=\u{3000}b\t", ParseMode::Strict),
            Ok(Some(Segment::new("\u{3000}b\t").unwrap()))
        );
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let path = parse(" OU = Men , ou=Staff ;DC=Domain");
        assert_eq!(names(&path), vec!["Men", "Staff"]);
    }
}
