//! Module context capability
//!
//! The route tree builder never touches the filesystem directly. It asks a
//! [`ModuleContext`] for the list of module ids and, in sync import mode, for
//! the exports of each module. Tests use [`InMemoryContext`]; the reference
//! server walks an app directory with [`FsContext`].

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use serde_json::Value;
use walkdir::WalkDir;

use crate::path::normalize_context_key;

/// HTTP method export names recognised on API modules
pub const HTTP_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Name of the data loader export
pub const LOADER_EXPORT: &str = "loader";

/// Name of the static params generator export
pub const STATIC_PARAMS_EXPORT: &str = "generateStaticParams";

/// Name of the component export every page and layout needs
pub const DEFAULT_EXPORT: &str = "default";

/// Callable module export
///
/// Takes a JSON argument (route params for loaders, parent params for
/// static-params generators) and returns JSON.
pub type ExportFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// A single named export of a route module
#[derive(Clone)]
pub enum Export {
    Function(ExportFn),
    Value(Value),
}

impl Export {
    pub fn is_callable(&self) -> bool {
        matches!(self, Export::Function(_))
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Export::Function(_) => f.write_str("Function(..)"),
            Export::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// The exports of one loaded route module
#[derive(Debug, Clone, Default)]
pub struct RouteModule {
    exports: BTreeMap<String, Export>,
}

impl RouteModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page or layout module: only a callable `default` export
    pub fn page() -> Self {
        Self::new().with_function(DEFAULT_EXPORT, |_| Ok(Value::Null))
    }

    pub fn with_export(mut self, name: impl Into<String>, export: Export) -> Self {
        self.exports.insert(name.into(), export);
        self
    }

    pub fn with_function<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.with_export(name, Export::Function(Arc::new(f)))
    }

    pub fn with_value(self, name: impl Into<String>, value: Value) -> Self {
        self.with_export(name, Export::Value(value))
    }

    pub fn export(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }

    pub fn export_names(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }

    /// Exported HTTP method handlers, in `HTTP_METHODS` order
    pub fn http_methods(&self) -> impl Iterator<Item = &'static str> + '_ {
        HTTP_METHODS
            .into_iter()
            .filter(|method| self.exports.get(*method).is_some_and(Export::is_callable))
    }

    pub fn is_api(&self) -> bool {
        self.http_methods().next().is_some()
    }

    /// Calls the `loader` export
    ///
    /// A non-callable loader fails here, at call time, when export
    /// validation was skipped during the build.
    pub fn call_loader(&self, params: &Value) -> Result<Option<Value>> {
        self.call_export(LOADER_EXPORT, params)
    }

    /// Calls `generateStaticParams`
    pub fn generate_static_params(&self, params: &Value) -> Result<Option<Value>> {
        self.call_export(STATIC_PARAMS_EXPORT, params)
    }

    fn call_export(&self, name: &str, arg: &Value) -> Result<Option<Value>> {
        match self.exports.get(name) {
            None => Ok(None),
            Some(Export::Function(f)) => f(arg).map(Some),
            Some(Export::Value(_)) => bail!("export `{name}` is not a function"),
        }
    }
}

/// Enumerable id → module capability
pub trait ModuleContext {
    /// Module ids in registration order
    fn keys(&self) -> Vec<String>;

    /// Loads a module's exports
    fn resolve(&self, key: &str) -> Result<RouteModule>;
}

/// In-memory module context for tests and programmatic route sets
///
/// # Examples
///
/// ```
/// use trailhead_router::{InMemoryContext, ModuleContext, RouteModule};
///
/// let ctx = InMemoryContext::new()
///     .with_module("./index.tsx", RouteModule::page())
///     .with_module("about", RouteModule::page());
///
/// assert_eq!(ctx.keys(), vec!["./index.tsx", "./about"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryContext {
    modules: Vec<(String, RouteModule)>,
}

impl InMemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context where every key is a plain page module
    pub fn pages<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter()
            .fold(Self::new(), |ctx, key| ctx.with_module(key.as_ref(), RouteModule::page()))
    }

    pub fn with_module(mut self, key: &str, module: RouteModule) -> Self {
        self.modules
            .push((normalize_context_key(key).into_owned(), module));
        self
    }
}

impl ModuleContext for InMemoryContext {
    fn keys(&self) -> Vec<String> {
        self.modules.iter().map(|(key, _)| key.clone()).collect()
    }

    fn resolve(&self, key: &str) -> Result<RouteModule> {
        let key = normalize_context_key(key);
        match self.modules.iter().find(|(k, _)| *k == key) {
            Some((_, module)) => Ok(module.clone()),
            None => bail!("module `{key}` is not registered"),
        }
    }
}

/// Directory-backed module context
///
/// Lists route files under a root directory. The filesystem cannot tell what a
/// file exports, so [`FsContext::resolve`] reports a page module; use it with
/// lazy import mode and the `+api` naming convention.
#[derive(Debug, Clone)]
pub struct FsContext {
    root: PathBuf,
    extensions: Vec<String>,
}

impl FsContext {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: ["tsx", "ts", "jsx", "js", "html"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_route_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

/// Static names first, then `[x]`, `[...x]` and `[[...x]]`; key order is match precedence
fn specificity_rank(name: &OsStr) -> u8 {
    let name = name.to_string_lossy();
    if name.starts_with("[[...") {
        3
    } else if name.starts_with("[...") {
        2
    } else if name.starts_with('[') {
        1
    } else {
        0
    }
}

impl ModuleContext for FsContext {
    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = WalkDir::new(&self.root)
            .sort_by_key(|entry| (specificity_rank(entry.file_name()), entry.file_name().to_owned()))
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && self.is_route_file(entry.path()))
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.root)
                    .ok()
                    .map(|relative| relative.to_string_lossy().replace('\\', "/"))
            })
            .map(|relative| normalize_context_key(&relative).into_owned())
            .collect();
        keys.dedup();
        keys
    }

    fn resolve(&self, key: &str) -> Result<RouteModule> {
        let relative = normalize_context_key(key);
        let path = self.root.join(relative.trim_start_matches("./"));
        if !path.is_file() {
            bail!("route file {} does not exist", path.display());
        }
        Ok(RouteModule::page())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_detection() {
        let module = RouteModule::new()
            .with_function("GET", |_| Ok(Value::Null))
            .with_value("POST", json!("not a handler"));
        assert!(module.is_api());
        assert_eq!(module.http_methods().collect::<Vec<_>>(), vec!["GET"]);
        assert!(!RouteModule::page().is_api());
    }

    #[test]
    fn test_loader_called_lazily() {
        let good = RouteModule::page().with_function(LOADER_EXPORT, |params| {
            Ok(json!({ "echo": params }))
        });
        assert_eq!(
            good.call_loader(&json!({"id": "1"})).unwrap(),
            Some(json!({"echo": {"id": "1"}}))
        );

        let bad = RouteModule::page().with_value(LOADER_EXPORT, json!("not a function"));
        assert!(bad.call_loader(&Value::Null).is_err());

        assert_eq!(RouteModule::page().call_loader(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_fs_keys_put_static_files_first() {
        let dir = tempfile::TempDir::new().unwrap();
        for file in [
            "[[...all]].tsx",
            "[...rest].tsx",
            "[slug].tsx",
            "about.tsx",
            "blog/index.tsx",
            "notes.md",
        ] {
            let path = dir.path().join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "export default function Page() {}").unwrap();
        }

        let ctx = FsContext::new(dir.path());
        assert_eq!(
            ctx.keys(),
            vec![
                "./about.tsx",
                "./blog/index.tsx",
                "./[slug].tsx",
                "./[...rest].tsx",
                "./[[...all]].tsx",
            ]
        );
        assert!(ctx.resolve("./about.tsx").is_ok());
        assert!(ctx.resolve("./missing.tsx").is_err());
    }

    #[test]
    fn test_in_memory_resolve() {
        let ctx = InMemoryContext::pages(["./a.tsx", "b"]);
        assert!(ctx.resolve("a.tsx").is_ok());
        assert!(ctx.resolve("./b").is_ok());
        assert!(ctx.resolve("./c").is_err());
    }
}
