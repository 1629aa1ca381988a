//! # Trailhead Router
//!
//! A file-based route compiler. Given the module ids of an app directory it
//! produces a typed route tree and, from that, a flat server manifest that a
//! request dispatcher can match against.
//!
//! Supported file conventions:
//! - Static routes (`about.tsx`)
//! - Dynamic segments (`users/[id].tsx`)
//! - Catch-all and optional catch-all segments (`docs/[...slug].tsx`, `[[...rest]].tsx`)
//! - Groups that never appear in URLs (`(app)/index.tsx`, `(a,b)/home.tsx`)
//! - Nested layouts (`_layout.tsx`)
//! - API routes (`hello+api.ts`, or modules exporting HTTP method handlers)
//! - Not-found pages (`+not-found.tsx`)
//! - Configured redirects and rewrites
//!
//! ## Pipeline
//!
//! ```text
//! ModuleContext ──get_routes──▶ RouteTree ──get_server_manifest──▶ Manifest
//! ```
//!
//! Everything here is synchronous and pure apart from what the
//! [`ModuleContext`] does to list and load modules.
//!
//! ## Example
//!
//! ```
//! use trailhead_router::{get_routes, get_server_manifest, InMemoryContext, RoutesOptions};
//!
//! let ctx = InMemoryContext::pages(["./index.tsx", "./(app)/users/[id].tsx"]);
//! let options = RoutesOptions::new().with_redirect("/people/[id]", "/users/[id]", true);
//!
//! let tree = get_routes(&ctx, &options).unwrap();
//! let manifest = get_server_manifest(&tree).unwrap();
//!
//! assert_eq!(manifest.html_routes[1].page, "/(app)/users/[id]");
//! assert_eq!(manifest.redirects.len(), 1);
//! assert_eq!(manifest.redirects[0].page, "/(app)/users/[id]");
//! assert_eq!(manifest.redirects[0].permanent, Some(true));
//!
//! let params = manifest.html_routes[1].params("/users/42").unwrap();
//! assert_eq!(params.get("id").map(String::as_str), Some("42"));
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod context;
pub mod error;
pub mod manifest;
pub mod node;
pub mod path;
pub mod pattern;
pub mod tree;

pub use context::{Export, ExportFn, FsContext, InMemoryContext, ModuleContext, RouteModule};
pub use error::{PatternError, RouteError};
pub use manifest::{get_server_manifest, CompiledRoute, Manifest, MiddlewareEntry, NamedRegex};
pub use node::{NodeKind, RouteNode};
pub use pattern::{compile_route_path, CompiledPattern, DynamicDescriptor, RouteSegment};
pub use tree::{
    get_routes, Diagnostic, ImportMode, RedirectRule, RewriteRule, RouteTree, RouteTreeBuilder,
    RoutesOptions, RuleKind,
};
