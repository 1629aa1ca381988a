//! Build-time error types for the route compiler.

use thiserror::Error;

/// Malformed route syntax in a single file or rule source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("segment `{segment}` in `{path}` has unbalanced brackets")]
    UnbalancedBrackets { path: String, segment: String },

    #[error("segment `{segment}` in `{path}` declares an empty parameter name")]
    EmptyParam { path: String, segment: String },

    #[error("segment `{segment}` in `{path}` is optional but not a catch-all; use `[[...name]]`")]
    UnsupportedOptional { path: String, segment: String },

    #[error("catch-all segment `{segment}` in `{path}` must be the last segment")]
    CatchAllNotLast { path: String, segment: String },

    #[error("parameter `{name}` appears more than once in `{path}`")]
    DuplicateParam { path: String, name: String },

    #[error("route `{path}` produced an invalid pattern: {reason}")]
    InvalidRegex { path: String, reason: String },
}

/// Errors that abort a route tree build.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route file `{context_key}`: {source}")]
    Pattern {
        context_key: String,
        #[source]
        source: PatternError,
    },

    /// A module export has the wrong shape (e.g. a non-callable `loader`).
    #[error("Route \"{context_key}\" exports a {export} that is not a function.")]
    RouteExport { context_key: String, export: String },

    #[error("Route \"{context_key}\" is missing the required default export.")]
    MissingDefaultExport { context_key: String },

    #[error("failed to load route module `{context_key}`: {reason}")]
    ModuleResolve { context_key: String, reason: String },

    /// Two routes resolve to the same URL, so requests would be ambiguous.
    #[error("routes `{first}` and `{second}` both match `{path}`")]
    DuplicateRoute {
        path: String,
        first: String,
        second: String,
    },
}

pub type Result<T> = std::result::Result<T, RouteError>;
