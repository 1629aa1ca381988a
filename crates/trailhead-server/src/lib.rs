//! # Trailhead Server
//!
//! Request dispatching over a compiled routes [`Manifest`](trailhead_router::Manifest).
//!
//! The dispatcher decides which manifest entry handles a request. Content
//! comes from a [`RouteHost`]: [`DistHost`] serves an exported app from disk,
//! tests and embedders implement the trait themselves.
//!
//! ```ignore
//! let host = Arc::new(DistHost::from_config(&config, ApiRegistry::new())?);
//! let handler = RequestHandler::new(host);
//! let response = handler.handle(request).await;
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod host;
pub mod location;
pub mod middleware;
pub mod response;
pub mod static_host;
pub mod views;

pub use config::Config;
pub use error::{AccessError, DispatchError};
pub use handler::{dispatch, RequestHandler, MAX_REWRITE_DEPTH};
pub use host::{ApiHandler, ApiModule, ApiModuleSource, HtmlContent, Params, RouteHost};
pub use middleware::MiddlewareRequest;
pub use static_host::{ApiRegistry, DistHost, MiddlewareFn};
