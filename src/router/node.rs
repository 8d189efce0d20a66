//! Segment node of the per-method route tree.
//!
//! Every node owns a map of static children plus at most one dynamic child.
//! The dynamic child's own `kind` is the tag that says whether it is a
//! parameter, wildcard or regex slot, so the three kinds can never coexist
//! under one parent.

use std::collections::HashMap;

use regex::Regex;
use smallvec::SmallVec;

use super::error::RouteError;
use super::segment::{Segment, SegmentType, WILDCARD};
use crate::middleware::{Handler, Middleware};

/// Node in the route tree
pub(crate) struct SegmentNode {
    /// Literal text, parameter name, raw pattern or `*` depending on `kind`
    pub(crate) segment: String,
    pub(crate) kind: SegmentType,
    /// Name under which a matched segment is captured (param and named regex nodes)
    pub(crate) param_name: Option<String>,
    /// Present only on regex nodes
    pub(crate) regex: Option<Regex>,
    pub(crate) static_children: HashMap<String, SegmentNode>,
    pub(crate) dynamic_child: Option<Box<SegmentNode>>,
    pub(crate) handler: Option<Handler>,
    /// Registration path, set together with `handler`
    pub(crate) route: Option<String>,
    pub(crate) middleware: Vec<Middleware>,
}

/// Children of one node that accept a request segment, in precedence order
pub(crate) type Candidates<'t> = SmallVec<[&'t SegmentNode; 2]>;

impl SegmentNode {
    pub(crate) fn root() -> Self {
        Self::with_kind("/".to_string(), SegmentType::Static)
    }

    fn with_kind(segment: String, kind: SegmentType) -> Self {
        Self {
            segment,
            kind,
            param_name: None,
            regex: None,
            static_children: HashMap::new(),
            dynamic_child: None,
            handler: None,
            route: None,
            middleware: Vec::new(),
        }
    }

    fn from_segment(segment: &Segment<'_>) -> Self {
        match segment {
            Segment::Static(text) => Self::with_kind((*text).to_string(), SegmentType::Static),
            Segment::Param(name) => {
                let mut node = Self::with_kind((*name).to_string(), SegmentType::Param);
                node.param_name = Some((*name).to_string());
                node
            }
            Segment::Wildcard => Self::with_kind(WILDCARD.to_string(), SegmentType::Wildcard),
            Segment::Regex {
                name,
                pattern,
                regex,
            } => {
                let mut node = Self::with_kind((*pattern).to_string(), SegmentType::Regex);
                node.param_name = name.map(str::to_string);
                node.regex = Some(regex.clone());
                node
            }
        }
    }

    /// Check whether `segment` can be attached below this node.
    ///
    /// Returns the existing child that would be reused, or `None` when a new
    /// child would be created.
    pub(crate) fn check_child(
        &self,
        segment: &Segment<'_>,
        path: &str,
    ) -> Result<Option<&SegmentNode>, RouteError> {
        if let Segment::Static(text) = segment {
            return Ok(self.static_children.get(*text));
        }
        let Some(existing) = self.dynamic_child.as_deref() else {
            return Ok(None);
        };
        let attempted = segment.segment_type();
        if existing.kind != attempted {
            return Err(RouteError::ConflictingSegment {
                path: path.to_string(),
                existing: existing.kind,
                attempted,
            });
        }
        match segment {
            Segment::Param(name) if existing.param_name.as_deref() != Some(*name) => {
                Err(RouteError::ParamNameMismatch {
                    path: path.to_string(),
                    existing: existing.segment.clone(),
                    attempted: (*name).to_string(),
                })
            }
            Segment::Regex { pattern, .. } if existing.segment != *pattern => {
                Err(RouteError::RegexPatternMismatch {
                    path: path.to_string(),
                    existing: existing.segment.clone(),
                    attempted: (*pattern).to_string(),
                })
            }
            Segment::Regex { name, .. } if existing.param_name.as_deref() != *name => {
                Err(RouteError::ParamNameMismatch {
                    path: path.to_string(),
                    existing: existing.param_name.clone().unwrap_or_default(),
                    attempted: name.unwrap_or_default().to_string(),
                })
            }
            _ => Ok(Some(existing)),
        }
    }

    /// Select or create the child for `segment`.
    ///
    /// Callers must have run [`SegmentNode::check_child`] for the same segment.
    pub(crate) fn child_or_create(&mut self, segment: &Segment<'_>) -> &mut SegmentNode {
        if let Segment::Static(text) = segment {
            return self
                .static_children
                .entry((*text).to_string())
                .or_insert_with(|| SegmentNode::from_segment(segment));
        }
        self.dynamic_child
            .get_or_insert_with(|| Box::new(SegmentNode::from_segment(segment)))
    }

    /// Children accepting the request segment `seg`: the static child first,
    /// then the dynamic child if it accepts the segment.
    pub(crate) fn matching_children<'t>(&'t self, seg: &str) -> Candidates<'t> {
        let mut out = Candidates::new();
        if let Some(child) = self.static_children.get(seg) {
            out.push(child);
        }
        if let Some(child) = self.dynamic_child.as_deref() {
            if child.accepts(seg) {
                out.push(child);
            }
        }
        out
    }

    /// Whether this dynamic node matches the request segment `seg`.
    /// A param or regex segment rejects an empty `seg`; only a wildcard takes it.
    fn accepts(&self, seg: &str) -> bool {
        match self.kind {
            SegmentType::Static => self.segment == seg,
            SegmentType::Param => !seg.is_empty(),
            SegmentType::Wildcard => true,
            SegmentType::Regex => {
                !seg.is_empty() && self.regex.as_ref().is_some_and(|re| re.is_match(seg))
            }
        }
    }

    pub(crate) fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Collect the route template of every handler-bearing node in this subtree.
    pub(crate) fn collect_routes<'t>(&'t self, out: &mut Vec<&'t str>) {
        if let Some(route) = self.route.as_deref() {
            out.push(route);
        }
        let mut keys: Vec<&String> = self.static_children.keys().collect();
        keys.sort();
        for key in keys {
            if let Some(child) = self.static_children.get(key) {
                child.collect_routes(out);
            }
        }
        if let Some(child) = self.dynamic_child.as_deref() {
            child.collect_routes(out);
        }
    }
}
