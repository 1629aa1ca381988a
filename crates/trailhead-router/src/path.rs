//! Context key and route path utilities
//!
//! Pure helpers that move between the three spellings of a route:
//!
//! - **context key**: `./(app)/blog/[slug].tsx`, the module id in a [`ModuleContext`](crate::ModuleContext)
//! - **route path**: `(app)/blog/[slug]`, the key without prefix and extension
//! - **matched path**: `/blog/[]`, what a URL actually has to look like; used to
//!   detect routes that would be ambiguous at request time

use std::borrow::Cow;

/// Checks if a context key is already in canonical `./a/b.ext` form
///
/// # Examples
///
/// ```
/// use trailhead_router::path::is_canonical_key;
///
/// assert!(is_canonical_key("./about.tsx"));
/// assert!(!is_canonical_key("about.tsx"));
/// assert!(!is_canonical_key(".//about.tsx"));
/// assert!(!is_canonical_key(".\\about.tsx"));
/// ```
pub fn is_canonical_key(key: &str) -> bool {
    key.starts_with("./")
        && key.len() > 2
        && !key.contains('\\')
        && !key[2..].contains("//")
        && !key[2..].starts_with('/')
        && !key.ends_with('/')
}

/// Normalizes a module id to `./segment/segment` form
///
/// Returns `Cow::Borrowed` when the key is already canonical.
///
/// # Examples
///
/// ```
/// use trailhead_router::path::normalize_context_key;
///
/// assert_eq!(normalize_context_key("./about.tsx"), "./about.tsx");
/// assert_eq!(normalize_context_key("old/[slug]"), "./old/[slug]");
/// assert_eq!(normalize_context_key("/blog//post"), "./blog/post");
/// assert_eq!(normalize_context_key(".\\users\\[id].ts"), "./users/[id].ts");
/// ```
pub fn normalize_context_key(key: &str) -> Cow<'_, str> {
    if is_canonical_key(key) {
        return Cow::Borrowed(key);
    }

    let replaced = key.replace('\\', "/");
    let trimmed = replaced.strip_prefix("./").unwrap_or(&replaced);
    let joined = trimmed
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    Cow::Owned(format!("./{joined}"))
}

/// Strips a trailing file extension from the last segment
///
/// Only a plain alphanumeric suffix counts as an extension, so the dots of
/// `[...slug]` are left alone.
pub fn strip_extension(path: &str) -> &str {
    let last_segment_start = path.rfind('/').map_or(0, |idx| idx + 1);
    let last = &path[last_segment_start..];

    match last.rfind('.') {
        Some(dot) if dot > 0 => {
            let ext = &last[dot + 1..];
            let before = &last[..dot];
            if !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && !before.ends_with('.')
            {
                &path[..last_segment_start + dot]
            } else {
                path
            }
        }
        _ => path,
    }
}

/// Route path of a context key: no `./` prefix, no extension
///
/// # Examples
///
/// ```
/// use trailhead_router::path::route_path_for_key;
///
/// assert_eq!(route_path_for_key("./(app)/index.tsx"), "(app)/index");
/// assert_eq!(route_path_for_key("./docs/[...slug].ts"), "docs/[...slug]");
/// assert_eq!(route_path_for_key("./docs/[...slug]"), "docs/[...slug]");
/// assert_eq!(route_path_for_key("./hello+api.ts"), "hello+api");
/// ```
pub fn route_path_for_key(key: &str) -> String {
    let normalized = normalize_context_key(key);
    let without_prefix = normalized.strip_prefix("./").unwrap_or(&normalized);
    strip_extension(without_prefix).to_string()
}

/// Normalizes a user-written rule path (`/old/[slug]`, `old/`, `/`) to route-path form
///
/// # Examples
///
/// ```
/// use trailhead_router::path::normalize_rule_path;
///
/// assert_eq!(normalize_rule_path("/old/[slug]"), "old/[slug]");
/// assert_eq!(normalize_rule_path("./about/"), "about");
/// assert_eq!(normalize_rule_path("/"), "index");
/// ```
pub fn normalize_rule_path(path: &str) -> String {
    let route = route_path_for_key(path);
    if route.is_empty() {
        "index".to_string()
    } else {
        route
    }
}

/// Whether a segment is a `(group)`
pub fn is_group_segment(segment: &str) -> bool {
    segment.len() > 2 && segment.starts_with('(') && segment.ends_with(')')
}

/// Joins a parent route path and a child route path
pub fn join_route(parent: &str, child: &str) -> String {
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{parent}/{child}"),
    }
}

/// URL shape a route path matches, for ambiguity detection
///
/// Groups and a trailing `index` are dropped and dynamic names erased,
/// so `(a)/users/[id]` and `(b)/users/[userId]/index` collide.
///
/// # Examples
///
/// ```
/// use trailhead_router::path::matched_path;
///
/// assert_eq!(matched_path("(a)/users/[id]"), "/users/[]");
/// assert_eq!(matched_path("(b)/users/[userId]/index"), "/users/[]");
/// assert_eq!(matched_path("(app)/index"), "/");
/// assert_eq!(matched_path("docs/[[...rest]]"), "/docs/[[...]]");
/// ```
pub fn matched_path(route: &str) -> String {
    let segments: Vec<&str> = route
        .split('/')
        .filter(|s| !s.is_empty() && !is_group_segment(s))
        .collect();

    let visible = match segments.split_last() {
        Some((&"index", rest)) => rest,
        _ => &segments[..],
    };

    let erased: Vec<&str> = visible
        .iter()
        .map(|segment| {
            if segment.starts_with("[[...") {
                "[[...]]"
            } else if segment.starts_with("[...") {
                "[...]"
            } else if segment.starts_with('[') {
                "[]"
            } else {
                segment
            }
        })
        .collect();

    format!("/{}", erased.join("/"))
}

/// Route path without group segments or trailing `index`, keeping param names
///
/// This is the client-visible form of a destination.
pub fn visible_route(route: &str) -> String {
    let segments: Vec<&str> = route
        .split('/')
        .filter(|s| !s.is_empty() && !is_group_segment(s))
        .collect();

    match segments.split_last() {
        Some((&"index", rest)) => rest.join("/"),
        _ => segments.join("/"),
    }
}
