//! Route tree builder
//!
//! Turns the keys of a [`ModuleContext`] plus configured redirect and rewrite
//! rules into a [`RouteTree`].
//!
//! # Build steps
//!
//! 1. Classify every module key (layout, page, API, ignored special file)
//! 2. Compile each route path; invalid files are skipped with a diagnostic
//! 3. Turn rules into virtual entries, dropping those whose destination is
//!    missing or whose source is already an authored route
//! 4. Reject routes that would match the same URL
//! 5. Nest entries under the directory holding the nearest `_layout`
//! 6. Append framework-generated entries
//!
//! Insertion order is preserved at every step because the manifest uses it as
//! match precedence.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::context::{ModuleContext, RouteModule, DEFAULT_EXPORT, LOADER_EXPORT};
use crate::error::{PatternError, Result, RouteError};
use crate::node::{NodeKind, RouteNode};
use crate::path::{
    join_route, matched_path, normalize_context_key, normalize_rule_path, route_path_for_key,
    visible_route,
};
use crate::pattern::{compile_route_path, dynamic_descriptors, parse_segments};

/// Context key of the generated root layout
pub const GENERATED_LAYOUT_KEY: &str = "trailhead/views/navigator";
/// Context key of the generated sitemap page
pub const GENERATED_SITEMAP_KEY: &str = "trailhead/views/sitemap";
/// Context key of the generated not-found page
pub const GENERATED_NOT_FOUND_KEY: &str = "trailhead/views/not-found";

const LAYOUT_FILE: &str = "_layout";
const SITEMAP_ROUTE: &str = "_sitemap";
const NOT_FOUND_ROUTE: &str = "+not-found";
const API_SUFFIX: &str = "+api";
const MIDDLEWARE_FILE: &str = "+middleware";
const IGNORED_FILES: [&str; 2] = ["+html", "+native-intent"];

/// Whether modules are loaded while building
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Resolve every module up front; enables export validation
    Sync,
    /// Never resolve modules during the build
    #[default]
    Lazy,
}

/// Internal path substitution rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    pub source: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,
}

impl RewriteRule {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            methods: None,
        }
    }
}

/// Client-visible redirect rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectRule {
    pub source: String,
    pub destination: String,
    #[serde(default)]
    pub permanent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,
}

impl RedirectRule {
    pub fn new(source: impl Into<String>, destination: impl Into<String>, permanent: bool) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            permanent,
            methods: None,
        }
    }
}

/// Route tree build configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesOptions {
    /// Suppress framework-synthesized entries
    pub skip_generated: bool,
    pub import_mode: ImportMode,
    pub rewrites: Vec<RewriteRule>,
    pub redirects: Vec<RedirectRule>,
    /// Keep rewrite nodes instead of resolving them into aliases; redirects are always kept
    pub preserve_redirect_and_rewrites: bool,
    /// Check module exports in sync mode (development builds)
    pub validate_exports: bool,
    /// Skip modules that fail to resolve in sync mode
    pub ignore_require_errors: bool,
    /// Fail the build on invalid route syntax instead of skipping the file
    pub strict: bool,
}

impl RoutesOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_generated(mut self, skip: bool) -> Self {
        self.skip_generated = skip;
        self
    }

    pub fn with_import_mode(mut self, mode: ImportMode) -> Self {
        self.import_mode = mode;
        self
    }

    pub fn with_rewrite(mut self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        self.rewrites.push(RewriteRule::new(source, destination));
        self
    }

    pub fn with_redirect(
        mut self,
        source: impl Into<String>,
        destination: impl Into<String>,
        permanent: bool,
    ) -> Self {
        self.redirects
            .push(RedirectRule::new(source, destination, permanent));
        self
    }

    pub fn with_preserved_rules(mut self, preserve: bool) -> Self {
        self.preserve_redirect_and_rewrites = preserve;
        self
    }

    pub fn with_export_validation(mut self, validate: bool) -> Self {
        self.validate_exports = validate;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Which kind of configured rule a diagnostic is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Redirect,
    Rewrite,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleKind::Redirect => f.write_str("redirect"),
            RuleKind::Rewrite => f.write_str("rewrite"),
        }
    }
}

/// Non-fatal build findings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("skipped `{context_key}`: {error}")]
    InvalidPattern {
        context_key: String,
        error: PatternError,
    },

    #[error("{kind} `{pattern}` dropped: destination `{destination}` does not exist")]
    DanglingRule {
        kind: RuleKind,
        pattern: String,
        destination: String,
    },

    #[error("{kind} `{pattern}` dropped: `{context_key}` already defines that route")]
    ShadowedRule {
        kind: RuleKind,
        pattern: String,
        context_key: String,
    },

    #[error("{kind} `{pattern}` dropped: an earlier rule already uses that source")]
    DuplicateRule { kind: RuleKind, pattern: String },

    #[error("skipped `{context_key}`: {reason}")]
    SkippedModule { context_key: String, reason: String },
}

/// Output of a build: the immutable tree plus what was dropped along the way
#[derive(Debug, Clone)]
pub struct RouteTree {
    pub root: RouteNode,
    /// Context key of the root `+middleware` file
    pub middleware: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RouteTree {
    /// Pre-order walk yielding each node with its full route path
    pub fn iter(&self) -> std::vec::IntoIter<(String, &RouteNode)> {
        fn walk<'a>(node: &'a RouteNode, parent: &str, out: &mut Vec<(String, &'a RouteNode)>) {
            let full = join_route(parent, &node.route);
            out.push((full.clone(), node));
            for child in &node.children {
                walk(child, &full, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.root, "", &mut out);
        out.into_iter()
    }

    /// Finds the authored node backing a context key, with its full route path
    ///
    /// Rule nodes are skipped; when aliases share a key the authored node wins.
    pub fn find_by_context_key(&self, key: &str) -> Option<(String, &RouteNode)> {
        let key = normalize_context_key(key);
        let mut candidates = self
            .iter()
            .filter(|(_, node)| !node.kind.is_rule() && (node.context_key == key));
        let first = candidates.next()?;
        if !first.1.generated {
            return Some(first);
        }
        candidates
            .find(|(_, node)| !node.generated)
            .or(Some(first))
    }

    /// Looks up the destination of a redirect or rewrite node
    pub fn resolve_destination(&self, node: &RouteNode) -> Option<(String, &RouteNode)> {
        node.destination_key()
            .and_then(|key| self.find_by_context_key(key))
    }
}

/// Builds the route tree for a module context
///
/// # Examples
///
/// ```
/// use trailhead_router::{get_routes, InMemoryContext, RoutesOptions};
///
/// let ctx = InMemoryContext::pages(["./index.tsx", "./blog/[slug].tsx"]);
/// let tree = get_routes(&ctx, &RoutesOptions::new().with_skip_generated(true)).unwrap();
///
/// let routes: Vec<&str> = tree.root.children.iter().map(|n| n.route.as_str()).collect();
/// assert_eq!(routes, vec!["index", "blog/[slug]"]);
/// ```
pub fn get_routes<C: ModuleContext + ?Sized>(ctx: &C, options: &RoutesOptions) -> Result<RouteTree> {
    RouteTreeBuilder::new(options).build(ctx)
}

/// What a classified entry will become
#[derive(Debug, Clone)]
enum EntryKind {
    Layout,
    Page,
    Api,
    Rule(NodeKind),
}

#[derive(Debug, Clone)]
struct FileEntry {
    context_key: String,
    /// Full route path from the app root; for layouts, the directory path
    route: String,
    kind: EntryKind,
    module: Option<RouteModule>,
    generated: bool,
}

impl FileEntry {
    fn is_leaf_route(&self) -> bool {
        matches!(self.kind, EntryKind::Page | EntryKind::Api)
    }

    fn node_kind(&self) -> NodeKind {
        match &self.kind {
            EntryKind::Layout => NodeKind::Layout,
            EntryKind::Page => NodeKind::Route,
            EntryKind::Api => NodeKind::Api,
            EntryKind::Rule(kind) => kind.clone(),
        }
    }
}

#[derive(Default)]
struct Directory {
    layout: Option<FileEntry>,
    files: Vec<(String, FileEntry)>,
    subdirectories: Vec<(String, Directory)>,
}

impl Directory {
    fn insert(&mut self, dirs: &[&str], name: &str, entry: FileEntry) -> Result<()> {
        match dirs.split_first() {
            None if matches!(entry.kind, EntryKind::Layout) => {
                if let Some(first) = &self.layout {
                    return Err(RouteError::DuplicateRoute {
                        path: join_route(&entry.route, LAYOUT_FILE),
                        first: first.context_key.clone(),
                        second: entry.context_key,
                    });
                }
                self.layout = Some(entry);
                Ok(())
            }
            None => {
                self.files.push((name.to_string(), entry));
                Ok(())
            }
            Some((head, rest)) => {
                let position = self
                    .subdirectories
                    .iter()
                    .position(|(dir, _)| dir == head)
                    .unwrap_or_else(|| {
                        self.subdirectories
                            .push((head.to_string(), Directory::default()));
                        self.subdirectories.len() - 1
                    });
                self.subdirectories[position].1.insert(rest, name, entry)
            }
        }
    }
}

/// Single-pass builder; create one per build
pub struct RouteTreeBuilder<'a> {
    options: &'a RoutesOptions,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> RouteTreeBuilder<'a> {
    pub fn new(options: &'a RoutesOptions) -> Self {
        Self {
            options,
            diagnostics: Vec::new(),
        }
    }

    pub fn build<C: ModuleContext + ?Sized>(mut self, ctx: &C) -> Result<RouteTree> {
        let (mut entries, middleware) = self.classify_modules(ctx)?;

        let rules = self.rule_entries(&entries)?;
        let rules = if self.options.preserve_redirect_and_rewrites {
            rules
        } else {
            resolve_rules_into_aliases(rules, &entries)
        };
        entries.extend(rules);

        ensure_unambiguous(&entries)?;

        let mut tree = Directory::default();
        for entry in entries {
            let route = match entry.kind {
                EntryKind::Layout => join_route(&entry.route, LAYOUT_FILE),
                _ => entry.route.clone(),
            };
            let segments: Vec<&str> = route.split('/').filter(|s| !s.is_empty()).collect();
            if let Some((name, dirs)) = segments.split_last() {
                tree.insert(dirs, name, entry)?;
            }
        }

        let root_layout = tree.layout.take();
        let mut children = Vec::new();
        flatten(tree, "", &mut children)?;

        if !self.options.skip_generated {
            append_generated(&mut children);
        }
        ensure_unique_siblings(&children)?;

        let root = match root_layout {
            Some(layout) => RouteNode::new(NodeKind::Layout, "", layout.context_key)
                .with_module(layout.module),
            None => RouteNode::new(NodeKind::Layout, "", GENERATED_LAYOUT_KEY).generated(),
        }
        .with_children(children);

        debug!(
            nodes = root.children.len(),
            diagnostics = self.diagnostics.len(),
            "built route tree"
        );

        Ok(RouteTree {
            root,
            middleware,
            diagnostics: self.diagnostics,
        })
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) {
        warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    /// Turns module keys into entries, in key order
    fn classify_modules<C: ModuleContext + ?Sized>(
        &mut self,
        ctx: &C,
    ) -> Result<(Vec<FileEntry>, Option<String>)> {
        let mut entries: Vec<FileEntry> = Vec::new();
        let mut middleware = None;
        let mut seen_keys = HashSet::new();

        for raw_key in ctx.keys() {
            let context_key = normalize_context_key(&raw_key).into_owned();
            if !seen_keys.insert(context_key.clone()) {
                continue;
            }

            let route = route_path_for_key(&context_key);
            let (dir, file_name) = match route.rsplit_once('/') {
                Some((dir, name)) => (dir.to_string(), name.to_string()),
                None => (String::new(), route.clone()),
            };

            if file_name == MIDDLEWARE_FILE {
                if dir.is_empty() {
                    middleware = Some(context_key);
                } else {
                    debug!(%context_key, "ignoring nested middleware file");
                }
                continue;
            }
            if IGNORED_FILES.contains(&file_name.as_str()) {
                continue;
            }

            let module = match self.load_module(ctx, &context_key)? {
                Some(module) => Some(module),
                None if self.options.import_mode == ImportMode::Sync => continue,
                None => None,
            };

            let is_layout = file_name == LAYOUT_FILE;
            let named_api = file_name.ends_with(API_SUFFIX);
            let kind = if is_layout {
                EntryKind::Layout
            } else if named_api || module.as_ref().is_some_and(RouteModule::is_api) {
                EntryKind::Api
            } else {
                EntryKind::Page
            };

            if let Some(module) = &module {
                self.validate_exports(&context_key, &kind, module)?;
            }

            let route = match kind {
                EntryKind::Layout => dir,
                _ if named_api => route
                    .strip_suffix(API_SUFFIX)
                    .unwrap_or(&route)
                    .to_string(),
                _ => route,
            };

            if let Err(error) = compile_route_path(&route) {
                if self.options.strict {
                    return Err(RouteError::Pattern {
                        context_key,
                        source: error,
                    });
                }
                self.diagnose(Diagnostic::InvalidPattern { context_key, error });
                continue;
            }

            entries.push(FileEntry {
                context_key,
                route,
                kind,
                module,
                generated: false,
            });
        }

        Ok((entries, middleware))
    }

    /// Resolves a module in sync mode; `Ok(None)` means skipped
    fn load_module<C: ModuleContext + ?Sized>(
        &mut self,
        ctx: &C,
        context_key: &str,
    ) -> Result<Option<RouteModule>> {
        if self.options.import_mode != ImportMode::Sync {
            return Ok(None);
        }

        match ctx.resolve(context_key) {
            Ok(module) => Ok(Some(module)),
            Err(err) if self.options.ignore_require_errors => {
                self.diagnose(Diagnostic::SkippedModule {
                    context_key: context_key.to_string(),
                    reason: format!("{err:#}"),
                });
                Ok(None)
            }
            Err(err) => Err(RouteError::ModuleResolve {
                context_key: context_key.to_string(),
                reason: format!("{err:#}"),
            }),
        }
    }

    fn validate_exports(
        &self,
        context_key: &str,
        kind: &EntryKind,
        module: &RouteModule,
    ) -> Result<()> {
        if !self.options.validate_exports {
            return Ok(());
        }

        if module
            .export(LOADER_EXPORT)
            .is_some_and(|export| !export.is_callable())
        {
            return Err(RouteError::RouteExport {
                context_key: context_key.to_string(),
                export: LOADER_EXPORT.to_string(),
            });
        }

        if matches!(kind, EntryKind::Page | EntryKind::Layout)
            && module.export(DEFAULT_EXPORT).is_none()
        {
            return Err(RouteError::MissingDefaultExport {
                context_key: context_key.to_string(),
            });
        }

        Ok(())
    }

    /// Virtual entries for redirects then rewrites, in declaration order
    fn rule_entries(&mut self, authored: &[FileEntry]) -> Result<Vec<FileEntry>> {
        let redirects = self.options.redirects.iter().map(|rule| {
            (
                RuleKind::Redirect,
                rule.source.as_str(),
                rule.destination.as_str(),
                rule.methods.as_deref(),
                rule.permanent,
            )
        });
        let rewrites = self.options.rewrites.iter().map(|rule| {
            (
                RuleKind::Rewrite,
                rule.source.as_str(),
                rule.destination.as_str(),
                rule.methods.as_deref(),
                false,
            )
        });
        let rules: Vec<_> = redirects.chain(rewrites).collect();

        let mut used_sources = HashSet::new();
        let mut out = Vec::new();

        for (kind, source, destination, methods, permanent) in rules {
            let source_route = normalize_rule_path(source);
            let context_key = format!("./{source_route}");

            if let Err(error) = compile_route_path(&source_route) {
                if self.options.strict {
                    return Err(RouteError::Pattern {
                        context_key,
                        source: error,
                    });
                }
                self.diagnose(Diagnostic::InvalidPattern { context_key, error });
                continue;
            }

            if let Some(literal) = authored
                .iter()
                .find(|entry| entry.is_leaf_route() && entry.route == source_route)
            {
                self.diagnose(Diagnostic::ShadowedRule {
                    kind,
                    pattern: source.to_string(),
                    context_key: literal.context_key.clone(),
                });
                continue;
            }

            if !used_sources.insert(source_route.clone()) {
                self.diagnose(Diagnostic::DuplicateRule {
                    kind,
                    pattern: source.to_string(),
                });
                continue;
            }

            let Some(target) = resolve_destination(authored, destination) else {
                self.diagnose(Diagnostic::DanglingRule {
                    kind,
                    pattern: source.to_string(),
                    destination: destination.to_string(),
                });
                continue;
            };

            let destination_context_key = target.context_key.clone();
            let methods = methods.map(|methods| {
                methods
                    .iter()
                    .map(|method| method.to_ascii_uppercase())
                    .collect()
            });
            let node_kind = match kind {
                RuleKind::Redirect => NodeKind::Redirect {
                    destination_context_key,
                    permanent,
                    methods,
                },
                RuleKind::Rewrite => NodeKind::Rewrite {
                    destination_context_key,
                    methods,
                },
            };

            out.push(FileEntry {
                context_key,
                route: source_route,
                kind: EntryKind::Rule(node_kind),
                module: None,
                generated: true,
            });
        }

        Ok(out)
    }
}

/// Finds the authored page or API entry a rule destination names
///
/// Tries the exact route, then its `index`, then the group-free spelling.
fn resolve_destination<'e>(authored: &'e [FileEntry], destination: &str) -> Option<&'e FileEntry> {
    let wanted = normalize_rule_path(destination);
    let wanted_index = if wanted == "index" {
        wanted.clone()
    } else {
        format!("{wanted}/index")
    };
    let wanted_visible = visible_route(&wanted);

    let leaves = || authored.iter().filter(|entry| entry.is_leaf_route());

    leaves()
        .find(|entry| entry.route == wanted)
        .or_else(|| leaves().find(|entry| entry.route == wanted_index))
        .or_else(|| leaves().find(|entry| visible_route(&entry.route) == wanted_visible))
}

/// Without preserved rules, a rewrite source becomes an alias of its destination
///
/// Redirects stay rule entries; they must reach the client as redirects.
fn resolve_rules_into_aliases(rules: Vec<FileEntry>, authored: &[FileEntry]) -> Vec<FileEntry> {
    let by_key: HashMap<&str, &FileEntry> = authored
        .iter()
        .map(|entry| (entry.context_key.as_str(), entry))
        .collect();

    rules
        .into_iter()
        .filter_map(|rule| {
            let EntryKind::Rule(NodeKind::Rewrite {
                destination_context_key,
                ..
            }) = &rule.kind
            else {
                return Some(rule);
            };
            let target = by_key.get(destination_context_key.as_str())?;
            Some(FileEntry {
                context_key: target.context_key.clone(),
                route: rule.route,
                kind: target.kind.clone(),
                module: target.module.clone(),
                generated: true,
            })
        })
        .collect()
}

/// Rejects authored routes that match the same URLs
fn ensure_unambiguous(entries: &[FileEntry]) -> Result<()> {
    let mut claimed: HashMap<String, &str> = HashMap::new();

    for entry in entries.iter().filter(|e| e.is_leaf_route() && !e.generated) {
        let shape = matched_path(&entry.route);
        if let Some(first) = claimed.insert(shape.clone(), &entry.context_key) {
            return Err(RouteError::DuplicateRoute {
                path: shape,
                first: first.to_string(),
                second: entry.context_key.clone(),
            });
        }
    }

    Ok(())
}

fn ensure_unique_siblings(nodes: &[RouteNode]) -> Result<()> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for node in nodes {
        if let Some(first) = seen.insert(&node.route, &node.context_key) {
            return Err(RouteError::DuplicateRoute {
                path: node.route.clone(),
                first: first.to_string(),
                second: node.context_key.clone(),
            });
        }
    }
    Ok(())
}

/// Files first, then subdirectories; a directory with a layout becomes a layout node
fn flatten(dir: Directory, prefix: &str, out: &mut Vec<RouteNode>) -> Result<()> {
    for (name, entry) in dir.files {
        let route = join_route(prefix, &name);
        out.push(entry_node(entry, route));
    }

    for (name, mut sub) in dir.subdirectories {
        let sub_prefix = join_route(prefix, &name);
        match sub.layout.take() {
            Some(layout) => {
                let mut children = Vec::new();
                flatten(sub, "", &mut children)?;
                ensure_unique_siblings(&children)?;
                out.push(entry_node(layout, sub_prefix).with_children(children));
            }
            None => flatten(sub, &sub_prefix, out)?,
        }
    }

    Ok(())
}

fn entry_node(entry: FileEntry, route: String) -> RouteNode {
    let dynamic = parse_segments(&route)
        .ok()
        .and_then(|segments| dynamic_descriptors(&segments));
    let node = RouteNode::new(entry.node_kind(), route, entry.context_key)
        .with_dynamic(dynamic)
        .with_module(entry.module);
    if entry.generated {
        node.generated()
    } else {
        node
    }
}

/// Sitemap and root not-found pages, unless the app defines them
fn append_generated(children: &mut Vec<RouteNode>) {
    let defines = |route: &str| {
        children
            .iter()
            .any(|node| !node.is_layout() && node.route == route)
    };

    let needs_sitemap = !defines(SITEMAP_ROUTE);
    let needs_not_found = !defines(NOT_FOUND_ROUTE);

    if needs_sitemap {
        children.push(RouteNode::new(NodeKind::Route, SITEMAP_ROUTE, GENERATED_SITEMAP_KEY).generated());
    }
    if needs_not_found {
        let dynamic = parse_segments(NOT_FOUND_ROUTE)
            .ok()
            .and_then(|segments| dynamic_descriptors(&segments));
        children.push(
            RouteNode::new(NodeKind::Route, NOT_FOUND_ROUTE, GENERATED_NOT_FOUND_KEY)
                .with_dynamic(dynamic)
                .generated(),
        );
    }
}
