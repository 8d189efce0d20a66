use std::fmt;

use http::Method;

use super::segment::SegmentType;

/// Route registration error
///
/// Returned by `Router::add_route()` when a path is malformed or collides with
/// a route that is already registered. These errors describe a broken route
/// table: callers are expected to abort startup rather than continue with a
/// partially built router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The path is the empty string
    EmptyPath,
    /// The path does not start with `/`
    MissingLeadingSlash {
        /// The offending path
        path: String,
    },
    /// The path ends with `/` and is not the root path
    TrailingSlash {
        /// The offending path
        path: String,
    },
    /// The path contains `//`
    EmptySegment {
        /// The offending path
        path: String,
    },
    /// A handler is already registered for this method and path
    DuplicateRoute {
        /// HTTP method of the registration
        method: Method,
        /// The path that was registered twice
        path: String,
    },
    /// A parameter, wildcard or regex segment was registered next to a
    /// sibling of a different dynamic kind
    ConflictingSegment {
        /// The path being registered
        path: String,
        /// Kind of the dynamic child already present
        existing: SegmentType,
        /// Kind of the segment that was rejected
        attempted: SegmentType,
    },
    /// A parameter at this position is already registered under another name
    ParamNameMismatch {
        /// The path being registered
        path: String,
        /// Name already bound at this position
        existing: String,
        /// Name that was rejected
        attempted: String,
    },
    /// A regex segment at this position is already registered with another pattern
    RegexPatternMismatch {
        /// The path being registered
        path: String,
        /// Pattern already bound at this position
        existing: String,
        /// Pattern that was rejected
        attempted: String,
    },
    /// A `:name` segment is missing its name or has an unbalanced constraint
    InvalidParam {
        /// The offending segment text
        segment: String,
    },
    /// A regex segment failed to compile
    InvalidRegex {
        /// The raw pattern
        pattern: String,
        /// Compiler diagnostic
        message: String,
    },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::EmptyPath => write!(f, "route path must not be empty"),
            RouteError::MissingLeadingSlash { path } => {
                write!(f, "route path '{}' must start with '/'", path)
            }
            RouteError::TrailingSlash { path } => {
                write!(f, "route path '{}' must not end with '/'", path)
            }
            RouteError::EmptySegment { path } => {
                write!(f, "route path '{}' must not contain '//'", path)
            }
            RouteError::DuplicateRoute { method, path } => {
                write!(f, "route conflict: {} {} is already registered", method, path)
            }
            RouteError::ConflictingSegment {
                path,
                existing,
                attempted,
            } => write!(
                f,
                "route conflict in '{}': cannot register a {} segment next to an existing {} segment",
                path, attempted, existing
            ),
            RouteError::ParamNameMismatch {
                path,
                existing,
                attempted,
            } => write!(
                f,
                "route conflict in '{}': parameter ':{}' clashes with existing parameter ':{}'",
                path, attempted, existing
            ),
            RouteError::RegexPatternMismatch {
                path,
                existing,
                attempted,
            } => write!(
                f,
                "route conflict in '{}': pattern ({}) clashes with existing pattern ({})",
                path, attempted, existing
            ),
            RouteError::InvalidParam { segment } => {
                write!(f, "invalid parameter segment '{}'", segment)
            }
            RouteError::InvalidRegex { pattern, message } => {
                write!(f, "invalid regex pattern ({}): {}", pattern, message)
            }
        }
    }
}

impl std::error::Error for RouteError {}
