//! Read-only request view handed to middleware

use axum::http::{request::Parts, HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;

use crate::error::AccessError;

/// Request without its body
///
/// Middleware runs before routing and must not consume the body the route
/// handler will read, so every body accessor fails with [`AccessError`].
#[derive(Debug, Clone)]
pub struct MiddlewareRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

impl MiddlewareRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
        }
    }

    pub fn from_parts(parts: &Parts) -> Self {
        Self::new(parts.method.clone(), parts.uri.clone(), parts.headers.clone())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn body(&self) -> Result<(), AccessError> {
        Err(AccessError::new("body"))
    }

    pub fn bytes(&self) -> Result<Vec<u8>, AccessError> {
        Err(AccessError::new("bytes"))
    }

    pub fn text(&self) -> Result<String, AccessError> {
        Err(AccessError::new("text"))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AccessError> {
        Err(AccessError::new("json"))
    }

    /// Copies the view; the copy is just as body-less
    pub fn try_clone(&self) -> Result<Self, AccessError> {
        Ok(self.clone())
    }
}
