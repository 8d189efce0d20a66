//! Segment-kind detection for route templates.
//!
//! A route template such as `/users/:id/files/*` is split on `/` and every
//! piece is classified, first match wins:
//!
//! | Text            | Kind       | Notes                                        |
//! |-----------------|------------|----------------------------------------------|
//! | `:name`         | `Param`    | captures one segment under `name`            |
//! | `:name(re)`     | `Regex`    | captures under `name` if `re` matches        |
//! | `*`             | `Wildcard` | one segment, or the rest when last           |
//! | `(re)`          | `Regex`    | constrains the segment, captures nothing     |
//! | anything else   | `Static`   | exact match                                  |

use std::fmt;

use regex::Regex;
use serde::Serialize;

use super::error::RouteError;

/// Path separator for route templates and request paths
pub const SEPARATOR: char = '/';
/// Prefix that introduces a named parameter
pub const PARAM_SIGIL: char = ':';
/// Segment text that denotes a wildcard
pub const WILDCARD: &str = "*";

/// Kind of a segment node in the route tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    /// Literal text matched by equality
    Static,
    /// Named placeholder capturing one segment
    Param,
    /// Catch-all placeholder
    Wildcard,
    /// Placeholder constrained by a compiled pattern
    Regex,
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SegmentType::Static => "static",
            SegmentType::Param => "parameter",
            SegmentType::Wildcard => "wildcard",
            SegmentType::Regex => "regex",
        };
        f.write_str(label)
    }
}

/// One classified segment of a route template
#[derive(Debug, Clone)]
pub(crate) enum Segment<'a> {
    Static(&'a str),
    Param(&'a str),
    Wildcard,
    Regex {
        name: Option<&'a str>,
        pattern: &'a str,
        regex: Regex,
    },
}

impl Segment<'_> {
    pub(crate) fn segment_type(&self) -> SegmentType {
        match self {
            Segment::Static(_) => SegmentType::Static,
            Segment::Param(_) => SegmentType::Param,
            Segment::Wildcard => SegmentType::Wildcard,
            Segment::Regex { .. } => SegmentType::Regex,
        }
    }
}

/// Classify a single, non-empty segment of a route template.
pub(crate) fn parse_segment(text: &str) -> Result<Segment<'_>, RouteError> {
    if let Some(rest) = text.strip_prefix(PARAM_SIGIL) {
        return parse_param(text, rest);
    }
    if text == WILDCARD {
        return Ok(Segment::Wildcard);
    }
    if text.len() >= 2 && text.starts_with('(') && text.ends_with(')') {
        let pattern = &text[1..text.len() - 1];
        let regex = compile_segment_pattern(pattern)?;
        return Ok(Segment::Regex {
            name: None,
            pattern,
            regex,
        });
    }
    Ok(Segment::Static(text))
}

fn parse_param<'a>(text: &'a str, rest: &'a str) -> Result<Segment<'a>, RouteError> {
    let invalid = || RouteError::InvalidParam {
        segment: text.to_string(),
    };
    match rest.find('(') {
        Some(open) => {
            let name = &rest[..open];
            if name.is_empty() || !rest.ends_with(')') || rest.len() < open + 2 {
                return Err(invalid());
            }
            let pattern = &rest[open + 1..rest.len() - 1];
            let regex = compile_segment_pattern(pattern)?;
            Ok(Segment::Regex {
                name: Some(name),
                pattern,
                regex,
            })
        }
        None if rest.is_empty() || rest.contains(')') => Err(invalid()),
        None => Ok(Segment::Param(rest)),
    }
}

/// Compile a segment constraint. The pattern must match the whole segment.
pub(crate) fn compile_segment_pattern(pattern: &str) -> Result<Regex, RouteError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| RouteError::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Validate a route template and split it into its segments.
///
/// The root path `/` yields no segments.
pub(crate) fn split_route_path(path: &str) -> Result<Vec<&str>, RouteError> {
    if path.is_empty() {
        return Err(RouteError::EmptyPath);
    }
    let Some(rest) = path.strip_prefix(SEPARATOR) else {
        return Err(RouteError::MissingLeadingSlash {
            path: path.to_string(),
        });
    };
    if rest.is_empty() {
        return Ok(Vec::new());
    }
    if rest.ends_with(SEPARATOR) {
        return Err(RouteError::TrailingSlash {
            path: path.to_string(),
        });
    }
    let segments: Vec<&str> = rest.split(SEPARATOR).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(RouteError::EmptySegment {
            path: path.to_string(),
        });
    }
    Ok(segments)
}
