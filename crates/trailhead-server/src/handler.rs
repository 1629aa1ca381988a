//! Manifest-driven request dispatcher
//!
//! Phases run strictly in order and the first match within a phase wins:
//!
//! 1. Manifest lookup (`404 text/plain` when there is none)
//! 2. Middleware, when the manifest names one
//! 3. Redirects
//! 4. Rewrites, chained
//! 5. HTML routes (GET and HEAD)
//! 6. API routes (any method)
//! 7. Not-found routes (GET and HEAD)
//! 8. `404 text/plain`

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, Method, Request, StatusCode};
use axum::response::Response;
use tracing::{debug, warn};
use trailhead_router::Manifest;

use crate::error::DispatchError;
use crate::host::{ApiModuleSource, HtmlContent, RouteHost};
use crate::location::{parse_params, redirect_location, rewrite_uri, rule_target};
use crate::middleware::MiddlewareRequest;
use crate::response;

/// Upper bound on chained rewrites in one dispatch
pub const MAX_REWRITE_DEPTH: usize = 8;

/// Shareable dispatcher bound to one host
///
/// Holds no per-request state; clone it into every connection.
pub struct RequestHandler<H: ?Sized> {
    host: Arc<H>,
}

impl<H: ?Sized> Clone for RequestHandler<H> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
        }
    }
}

impl<H: RouteHost + ?Sized> RequestHandler<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub async fn handle(&self, request: Request<Body>) -> Response {
        dispatch(self.host.as_ref(), request).await
    }
}

/// Routes one request through the manifest phases
pub async fn dispatch<H: RouteHost + ?Sized>(host: &H, request: Request<Body>) -> Response {
    let manifest = match host.get_routes_manifest().await {
        Ok(Some(manifest)) => manifest,
        Ok(None) => {
            debug!("no routes manifest, responding 404");
            return response::not_found();
        }
        Err(err) => return host.handle_route_error(DispatchError::Host(err)).await,
    };

    dispatch_with_manifest(host, &manifest, request).await
}

async fn dispatch_with_manifest<H: RouteHost + ?Sized>(
    host: &H,
    manifest: &Manifest,
    request: Request<Body>,
) -> Response {
    let (mut parts, body) = request.into_parts();
    debug!(method = %parts.method, path = parts.uri.path(), "dispatching");

    if let Some(entry) = &manifest.middleware {
        let view = MiddlewareRequest::from_parts(&parts);
        match host.middleware(&view, entry).await {
            Ok(Some(response)) => {
                debug!(file = %entry.file, "middleware short-circuited");
                return response;
            }
            Ok(None) => {}
            Err(err) => return host.handle_route_error(DispatchError::Host(err)).await,
        }
    }

    let method = parts.method.clone();

    for route in &manifest.redirects {
        if !route.allows_method(method.as_str()) {
            continue;
        }
        let Some(target) = rule_target(route, &parts.uri) else {
            continue;
        };

        let location = redirect_location(&parts, &target);
        let status = response::redirect_status(&method, route.permanent.unwrap_or(false));
        debug!(from = parts.uri.path(), to = %location, %status, "redirect");

        return match HeaderValue::from_str(&location) {
            Ok(location) => response::redirect(status, location),
            Err(err) => {
                host.handle_route_error(DispatchError::InvalidRewrite {
                    path: parts.uri.path().to_string(),
                    reason: err.to_string(),
                })
                .await
            }
        };
    }

    let mut fired = vec![false; manifest.rewrites.len()];
    for depth in 0..=MAX_REWRITE_DEPTH {
        let next = manifest.rewrites.iter().enumerate().find_map(|(idx, route)| {
            if fired[idx] || !route.allows_method(method.as_str()) {
                return None;
            }
            rule_target(route, &parts.uri).map(|target| (idx, target))
        });
        let Some((idx, target)) = next else {
            break;
        };
        if depth == MAX_REWRITE_DEPTH {
            warn!(path = parts.uri.path(), "rewrite chain stopped after {MAX_REWRITE_DEPTH} hops");
            break;
        }

        match rewrite_uri(&parts, &target) {
            Ok(uri) => {
                debug!(from = parts.uri.path(), to = %uri, "rewrite");
                parts.uri = uri;
            }
            Err(err) => return host.handle_route_error(err).await,
        }
        fired[idx] = true;
    }

    let path = parts.uri.path().to_string();
    let renders_html = method == Method::GET || method == Method::HEAD;

    if renders_html {
        if let Some(route) = manifest.html_routes.iter().find(|route| route.is_match(&path)) {
            debug!(page = %route.page, "html route");
            return match host.get_html(&parts, route).await {
                Ok(Some(HtmlContent::Html(html))) => response::html(StatusCode::OK, html),
                Ok(Some(HtmlContent::Response(response))) => response,
                Ok(None) => {
                    host.handle_route_error(DispatchError::HtmlNotLoaded {
                        page: route.page.clone(),
                    })
                    .await
                }
                Err(err) => host.handle_route_error(DispatchError::Host(err)).await,
            };
        }
    }

    if let Some(route) = manifest.api_routes.iter().find(|route| route.is_match(&path)) {
        debug!(page = %route.page, "api route");
        let module = match host.get_api_route(route).await {
            Ok(Some(ApiModuleSource::Module(module))) => module,
            Ok(Some(ApiModuleSource::Response(response))) => return response,
            Ok(None) => {
                return host
                    .handle_route_error(DispatchError::ModuleLoad {
                        page: route.page.clone(),
                    })
                    .await
            }
            Err(err) => return host.handle_route_error(DispatchError::Host(err)).await,
        };

        let Some(handler) = module.handler(&method) else {
            return response::method_not_allowed();
        };

        let params = parse_params(route, &path);
        return match handler(Request::from_parts(parts, body), params).await {
            Ok(Some(response)) => response,
            Ok(None) => {
                host.handle_route_error(DispatchError::InvalidHandlerResult {
                    method,
                    page: route.page.clone(),
                })
                .await
            }
            Err(err) => host.handle_route_error(DispatchError::Host(err)).await,
        };
    }

    if renders_html {
        for route in manifest.not_found_routes.iter().filter(|route| route.is_match(&path)) {
            match host.get_html(&parts, route).await {
                Ok(Some(HtmlContent::Html(html))) => {
                    debug!(page = %route.page, "not-found route");
                    return response::html(StatusCode::NOT_FOUND, html);
                }
                Ok(Some(HtmlContent::Response(response))) => return response,
                Ok(None) => {
                    warn!(page = %route.page, "not-found page has no HTML, trying next");
                }
                Err(err) => {
                    warn!(page = %route.page, error = %err, "not-found page failed, trying next");
                }
            }
        }
    }

    debug!(path = %path, "no route matched");
    response::not_found()
}
