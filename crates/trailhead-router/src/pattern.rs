//! Path pattern compilation
//!
//! Turns a file-system-relative route path such as `(app)/blog/[slug]` into a
//! named regular expression, the capture-group to parameter mapping, and the
//! ordered list of dynamic segment descriptors.
//!
//! All functions are pure: same input, same output, no side effects.
//!
//! # Segment syntax
//!
//! | Segment        | Meaning                                   | Regex fragment            |
//! |----------------|-------------------------------------------|---------------------------|
//! | `about`        | static text                               | `/about`                  |
//! | `(group)`      | grouping, matches with or without itself  | `(?:/\(group\))?`         |
//! | `[id]`         | one dynamic segment                       | `/(?<id>[^/]+?)`          |
//! | `[...rest]`    | catch-all, one or more segments           | `/(?<rest>.+?)`           |
//! | `[[...rest]]`  | optional catch-all, zero or more segments | `(?:/(?<rest>.+?))?`      |
//! | `+not-found`   | reserved not-found leaf                   | `/(?<notfound>.+?)`       |
//!
//! # Examples
//!
//! ```
//! use trailhead_router::pattern::compile_route_path;
//!
//! let compiled = compile_route_path("(app)/blog/[slug]").unwrap();
//! assert_eq!(compiled.named_regex, r"^(?:/\(app\))?/blog/(?<slug>[^/]+?)(?:/)?$");
//! assert_eq!(compiled.route_keys.get("slug").map(String::as_str), Some("slug"));
//! ```

use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PatternError;

/// Reserved leaf name for not-found routes.
pub const NOT_FOUND_SEGMENT: &str = "+not-found";

const MAX_GROUP_NAME_LEN: usize = 30;

/// One component of a route path
///
/// Sum type over every segment shape the compiler understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteSegment {
    /// Literal text
    Static(String),
    /// `(name)` or `(a,b)`: never required in the matched URL
    Group(Vec<String>),
    /// `[name]`
    Dynamic(String),
    /// `[...name]`
    CatchAll(String),
    /// `[[...name]]`
    OptionalCatchAll(String),
    /// `+not-found` in leaf position
    NotFound,
}

impl RouteSegment {
    /// Parameter name bound by this segment, if any
    pub fn param_name(&self) -> Option<&str> {
        match self {
            RouteSegment::Dynamic(name)
            | RouteSegment::CatchAll(name)
            | RouteSegment::OptionalCatchAll(name) => Some(name),
            RouteSegment::NotFound => Some(NOT_FOUND_SEGMENT),
            RouteSegment::Static(_) | RouteSegment::Group(_) => None,
        }
    }

    fn is_deep(&self) -> bool {
        matches!(
            self,
            RouteSegment::CatchAll(_) | RouteSegment::OptionalCatchAll(_) | RouteSegment::NotFound
        )
    }
}

/// Describes one dynamic segment of a route, outer to inner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicDescriptor {
    pub name: String,
    pub deep: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub not_found: bool,
}

impl DynamicDescriptor {
    pub fn new(name: impl Into<String>, deep: bool) -> Self {
        Self {
            name: name.into(),
            deep,
            not_found: false,
        }
    }

    pub fn not_found() -> Self {
        Self {
            name: NOT_FOUND_SEGMENT.to_string(),
            deep: true,
            not_found: true,
        }
    }
}

/// Output of [`compile_route_path`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPattern {
    /// Anchored regex source with one named group per dynamic segment
    pub named_regex: String,
    /// Capture-group name → logical parameter name
    pub route_keys: BTreeMap<String, String>,
    /// `None` when the route is fully static
    pub dynamic: Option<Vec<DynamicDescriptor>>,
}

/// Classifies a single segment
///
/// `is_last` decides whether `+not-found` is the reserved leaf or plain text.
///
/// # Examples
///
/// ```
/// use trailhead_router::pattern::{classify_segment, RouteSegment};
///
/// assert_eq!(
///     classify_segment("blog/[id]", "[id]", true).unwrap(),
///     RouteSegment::Dynamic("id".into())
/// );
/// assert!(classify_segment("blog/[id", "[id", true).is_err());
/// ```
pub fn classify_segment(
    path: &str,
    segment: &str,
    is_last: bool,
) -> Result<RouteSegment, PatternError> {
    let unbalanced = || PatternError::UnbalancedBrackets {
        path: path.to_string(),
        segment: segment.to_string(),
    };
    let empty = || PatternError::EmptyParam {
        path: path.to_string(),
        segment: segment.to_string(),
    };

    if segment == NOT_FOUND_SEGMENT && is_last {
        return Ok(RouteSegment::NotFound);
    }

    // Optional catch-all: [[...name]]
    if let Some(inner) = segment.strip_prefix("[[") {
        let inner = inner.strip_suffix("]]").ok_or_else(unbalanced)?;
        if inner.contains(['[', ']']) {
            return Err(unbalanced());
        }
        let name = inner
            .strip_prefix("...")
            .ok_or_else(|| PatternError::UnsupportedOptional {
                path: path.to_string(),
                segment: segment.to_string(),
            })?;
        if name.is_empty() {
            return Err(empty());
        }
        return Ok(RouteSegment::OptionalCatchAll(name.to_string()));
    }

    if let Some(inner) = segment.strip_prefix('[') {
        let inner = inner.strip_suffix(']').ok_or_else(unbalanced)?;
        if inner.contains(['[', ']']) {
            return Err(unbalanced());
        }
        return match inner.strip_prefix("...") {
            Some("") => Err(empty()),
            Some(name) => Ok(RouteSegment::CatchAll(name.to_string())),
            None if inner.is_empty() => Err(empty()),
            None => Ok(RouteSegment::Dynamic(inner.to_string())),
        };
    }

    if segment.contains(['[', ']']) {
        return Err(unbalanced());
    }

    if let Some(inner) = segment.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        let names = inner
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        return Ok(RouteSegment::Group(names));
    }

    Ok(RouteSegment::Static(segment.to_string()))
}

/// Splits and classifies a route path, enforcing the per-path rules
///
/// * dynamic names are unique within the path
/// * a catch-all is only followed by a trailing `index`
pub fn parse_segments(path: &str) -> Result<Vec<RouteSegment>, PatternError> {
    let raw: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut seen = HashSet::new();
    let mut segments = Vec::with_capacity(raw.len());

    for (idx, segment) in raw.iter().enumerate() {
        let classified = classify_segment(path, segment, idx + 1 == raw.len())?;

        if let Some(previous) = segments.last().filter(|s: &&RouteSegment| s.is_deep()) {
            if !is_index_segment(segment) {
                return Err(PatternError::CatchAllNotLast {
                    path: path.to_string(),
                    segment: segment_text(previous),
                });
            }
        }

        if let Some(name) = classified.param_name() {
            if !seen.insert(name.to_string()) {
                return Err(PatternError::DuplicateParam {
                    path: path.to_string(),
                    name: name.to_string(),
                });
            }
        }

        segments.push(classified);
    }

    Ok(segments)
}

/// Dynamic descriptors in outer-to-inner order, `None` for static routes
pub fn dynamic_descriptors(segments: &[RouteSegment]) -> Option<Vec<DynamicDescriptor>> {
    let dynamic: Vec<DynamicDescriptor> = segments
        .iter()
        .filter_map(|segment| match segment {
            RouteSegment::Dynamic(name) => Some(DynamicDescriptor::new(name.as_str(), false)),
            RouteSegment::CatchAll(name) | RouteSegment::OptionalCatchAll(name) => {
                Some(DynamicDescriptor::new(name.as_str(), true))
            }
            RouteSegment::NotFound => Some(DynamicDescriptor::not_found()),
            RouteSegment::Static(_) | RouteSegment::Group(_) => None,
        })
        .collect();

    (!dynamic.is_empty()).then_some(dynamic)
}

/// Compiles a route path into `{named_regex, route_keys, dynamic}`
pub fn compile_route_path(path: &str) -> Result<CompiledPattern, PatternError> {
    let segments = parse_segments(path)?;
    let dynamic = dynamic_descriptors(&segments);

    let state = segments
        .iter()
        .enumerate()
        .filter(|(idx, segment)| {
            // A trailing `index` addresses its directory.
            !(*idx + 1 == segments.len() && matches!(segment, RouteSegment::Static(s) if s == "index"))
        })
        .fold(RegexState::default(), |state, (_, segment)| {
            state.with_segment(segment)
        })
        .finalize();

    Regex::new(&state.source).map_err(|e| PatternError::InvalidRegex {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    Ok(CompiledPattern {
        named_regex: state.source,
        route_keys: state.route_keys,
        dynamic,
    })
}

/// Fold accumulator for regex construction
#[derive(Default)]
struct RegexState {
    source: String,
    route_keys: BTreeMap<String, String>,
    safe_key_counter: usize,
}

impl RegexState {
    fn with_segment(mut self, segment: &RouteSegment) -> Self {
        match segment {
            RouteSegment::Static(text) => {
                self.source.push('/');
                self.source.push_str(&regex::escape(text));
            }
            RouteSegment::Group(names) => {
                let alternatives: Vec<String> =
                    names.iter().map(|name| regex::escape(name)).collect();
                if alternatives.len() > 1 {
                    self.source
                        .push_str(&format!(r"(?:/\((?:{})\))?", alternatives.join("|")));
                } else {
                    self.source
                        .push_str(&format!(r"(?:/\({}\))?", alternatives.concat()));
                }
            }
            RouteSegment::Dynamic(name) => {
                let key = self.register_key(name);
                self.source.push_str(&format!("/(?<{key}>[^/]+?)"));
            }
            RouteSegment::CatchAll(name) => {
                let key = self.register_key(name);
                self.source.push_str(&format!("/(?<{key}>.+?)"));
            }
            RouteSegment::OptionalCatchAll(name) => {
                let key = self.register_key(name);
                self.source.push_str(&format!("(?:/(?<{key}>.+?))?"));
            }
            RouteSegment::NotFound => {
                let key = self.register_key(NOT_FOUND_SEGMENT);
                self.source.push_str(&format!("/(?<{key}>.+?)"));
            }
        }
        self
    }

    /// Picks a regex-safe capture-group name for `name` and records it
    fn register_key(&mut self, name: &str) -> String {
        let cleaned: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();

        let invalid = cleaned.is_empty()
            || cleaned.len() > MAX_GROUP_NAME_LEN
            || cleaned.starts_with(|c: char| c.is_ascii_digit())
            || self.route_keys.contains_key(&cleaned);

        let key = if invalid { self.next_safe_key() } else { cleaned };
        self.route_keys.insert(key.clone(), name.to_string());
        key
    }

    /// `a`, `b`, ... `z`, `aa`, `bb`, ...
    fn next_safe_key(&mut self) -> String {
        loop {
            let n = self.safe_key_counter;
            self.safe_key_counter += 1;
            let letter = char::from(b'a' + (n % 26) as u8);
            let key = letter.to_string().repeat(n / 26 + 1);
            if !self.route_keys.contains_key(&key) {
                return key;
            }
        }
    }

    fn finalize(mut self) -> Self {
        if self.source.is_empty() {
            self.source.push('/');
        }
        self.source = format!("^{}(?:/)?$", self.source);
        self
    }
}

fn is_index_segment(segment: &str) -> bool {
    segment == "index"
}

fn segment_text(segment: &RouteSegment) -> String {
    match segment {
        RouteSegment::Static(text) => text.clone(),
        RouteSegment::Group(names) => format!("({})", names.join(",")),
        RouteSegment::Dynamic(name) => format!("[{name}]"),
        RouteSegment::CatchAll(name) => format!("[...{name}]"),
        RouteSegment::OptionalCatchAll(name) => format!("[[...{name}]]"),
        RouteSegment::NotFound => NOT_FOUND_SEGMENT.to_string(),
    }
}
