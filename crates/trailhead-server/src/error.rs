//! Request-time error types

use axum::http::Method;
use thiserror::Error;

/// Failures handed to [`RouteHost::handle_route_error`](crate::RouteHost::handle_route_error)
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("API route module {page} could not be loaded")]
    ModuleLoad { page: String },

    #[error("API route {method} handler {page} resolved to a non-response result")]
    InvalidHandlerResult { method: Method, page: String },

    #[error("HTML route file {page}.html could not be loaded")]
    HtmlNotLoaded { page: String },

    #[error("rewrite of `{path}` produced an invalid URI: {reason}")]
    InvalidRewrite { path: String, reason: String },

    /// Error raised by the host itself
    #[error(transparent)]
    Host(#[from] anyhow::Error),
}

/// Body access on a [`MiddlewareRequest`](crate::MiddlewareRequest)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Property '{property}' is not supported in middleware")]
pub struct AccessError {
    pub property: &'static str,
}

impl AccessError {
    pub(crate) fn new(property: &'static str) -> Self {
        Self { property }
    }
}
