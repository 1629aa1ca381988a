//! Manifest flattener
//!
//! Walks a [`RouteTree`] in pre-order and produces the ordered arrays the
//! request dispatcher matches against. Array order is match precedence.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::error::{PatternError, Result, RouteError};
use crate::node::{NodeKind, RouteNode};
use crate::pattern::compile_route_path;
use crate::tree::RouteTree;

/// Compiled regex that serializes as its pattern source
#[derive(Clone)]
pub struct NamedRegex(Regex);

impl NamedRegex {
    pub fn new(source: &str) -> std::result::Result<Self, regex::Error> {
        Regex::new(source).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn regex(&self) -> &Regex {
        &self.0
    }
}

impl fmt::Debug for NamedRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamedRegex").field(&self.as_str()).finish()
    }
}

impl PartialEq for NamedRegex {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for NamedRegex {}

impl Serialize for NamedRegex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NamedRegex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        NamedRegex::new(&source).map_err(serde::de::Error::custom)
    }
}

/// One manifest entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledRoute {
    /// Context key of the module behind the entry (the destination's for rules)
    pub file: String,
    /// Full route path; for redirects and rewrites, the destination's
    pub page: String,
    /// Capture-group name → parameter name
    pub route_keys: BTreeMap<String, String>,
    pub named_regex: NamedRegex,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,
}

impl CompiledRoute {
    pub fn is_match(&self, path: &str) -> bool {
        self.named_regex.regex().is_match(path)
    }

    /// Captured parameters keyed by logical name, or `None` if `path` does not match
    ///
    /// # Examples
    ///
    /// ```
    /// use trailhead_router::{get_routes, get_server_manifest, InMemoryContext, RoutesOptions};
    ///
    /// let ctx = InMemoryContext::pages(["./blog/[slug].tsx"]);
    /// let tree = get_routes(&ctx, &RoutesOptions::new().with_skip_generated(true)).unwrap();
    /// let manifest = get_server_manifest(&tree).unwrap();
    ///
    /// let params = manifest.html_routes[0].params("/blog/hello").unwrap();
    /// assert_eq!(params.get("slug").map(String::as_str), Some("hello"));
    /// assert!(manifest.html_routes[0].params("/about").is_none());
    /// ```
    pub fn params(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let captures = self.named_regex.regex().captures(path)?;
        Some(
            self.route_keys
                .iter()
                .filter_map(|(group, name)| {
                    captures
                        .name(group)
                        .map(|value| (name.clone(), value.as_str().to_string()))
                })
                .collect(),
        )
    }

    /// Whether the entry applies to `method`; entries without `methods` apply to all
    pub fn allows_method(&self, method: &str) -> bool {
        self.methods.as_ref().map_or(true, |methods| {
            methods
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(method))
        })
    }

    pub fn is_generated(&self) -> bool {
        self.generated.unwrap_or(false)
    }
}

/// Root `+middleware` module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiddlewareEntry {
    pub file: String,
}

/// Flattened, ordered route manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub redirects: Vec<CompiledRoute>,
    #[serde(default)]
    pub rewrites: Vec<CompiledRoute>,
    #[serde(default)]
    pub html_routes: Vec<CompiledRoute>,
    #[serde(default)]
    pub api_routes: Vec<CompiledRoute>,
    #[serde(default)]
    pub not_found_routes: Vec<CompiledRoute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middleware: Option<MiddlewareEntry>,
}

impl Manifest {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Flattens a route tree into a [`Manifest`]
///
/// Layouts contribute no entries of their own. Redirect and rewrite entries
/// match on their source path and carry the destination's path as `page`.
pub fn get_server_manifest(tree: &RouteTree) -> Result<Manifest> {
    let mut manifest = Manifest {
        middleware: tree
            .middleware
            .as_ref()
            .map(|file| MiddlewareEntry { file: file.clone() }),
        ..Manifest::default()
    };

    for (full_route, node) in tree.iter() {
        if node.is_layout() {
            continue;
        }

        let compiled = compile_route_path(&full_route).map_err(|source| RouteError::Pattern {
            context_key: node.context_key.clone(),
            source,
        })?;
        let named_regex =
            NamedRegex::new(&compiled.named_regex).map_err(|err| RouteError::Pattern {
                context_key: node.context_key.clone(),
                source: PatternError::InvalidRegex {
                    path: full_route.clone(),
                    reason: err.to_string(),
                },
            })?;

        let mut entry = CompiledRoute {
            file: node.context_key.clone(),
            page: format!("/{full_route}"),
            route_keys: compiled.route_keys,
            named_regex,
            generated: node.generated.then_some(true),
            permanent: None,
            methods: None,
        };

        match &node.kind {
            NodeKind::Layout => {}
            NodeKind::Route if node.is_not_found() => manifest.not_found_routes.push(entry),
            NodeKind::Route => manifest.html_routes.push(entry),
            NodeKind::Api => manifest.api_routes.push(entry),
            NodeKind::Redirect {
                permanent, methods, ..
            } => {
                let Some((page, file)) = destination(tree, node) else {
                    continue;
                };
                entry.page = page;
                entry.file = file;
                entry.permanent = Some(*permanent);
                entry.methods = methods.clone();
                manifest.redirects.push(entry);
            }
            NodeKind::Rewrite { methods, .. } => {
                let Some((page, file)) = destination(tree, node) else {
                    continue;
                };
                entry.page = page;
                entry.file = file;
                entry.methods = methods.clone();
                manifest.rewrites.push(entry);
            }
        }
    }

    debug!(
        redirects = manifest.redirects.len(),
        rewrites = manifest.rewrites.len(),
        html = manifest.html_routes.len(),
        api = manifest.api_routes.len(),
        not_found = manifest.not_found_routes.len(),
        "flattened route manifest"
    );

    Ok(manifest)
}

/// Page and module key of a rule's destination
fn destination(tree: &RouteTree, node: &RouteNode) -> Option<(String, String)> {
    tree.resolve_destination(node)
        .map(|(full_route, target)| (format!("/{full_route}"), target.context_key.clone()))
}
