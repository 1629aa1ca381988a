//! Parameter extraction and redirect/rewrite target construction

use axum::http::{header, request::Parts, Uri};
use trailhead_router::CompiledRoute;

use crate::error::DispatchError;
use crate::host::Params;

/// Route parameters for `path`, percent-decoded
///
/// Empty when the route does not match.
pub fn parse_params(route: &CompiledRoute, path: &str) -> Params {
    route
        .params(path)
        .unwrap_or_default()
        .into_iter()
        .map(|(name, raw)| (name, decode(&raw)))
        .collect()
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|value| value.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Builds the path and query a redirect or rewrite rule sends `uri` to
///
/// Dynamic segments of the rule's `page` are filled from the captured values,
/// groups and a trailing `index` are dropped. The original query is kept and
/// captured values the destination did not use are appended to it.
///
/// # Examples
///
/// ```
/// use axum::http::Uri;
/// use trailhead_router::{get_routes, get_server_manifest, InMemoryContext, RoutesOptions};
/// use trailhead_server::location::rule_target;
///
/// let ctx = InMemoryContext::pages(["./(app)/posts/[id].tsx"]);
/// let options = RoutesOptions::new()
///     .with_preserved_rules(true)
///     .with_redirect("/p/[id]/[tab]", "/(app)/posts/[id]", false);
/// let manifest = get_server_manifest(&get_routes(&ctx, &options).unwrap()).unwrap();
///
/// let uri: Uri = "/p/7/comments?ref=home".parse().unwrap();
/// assert_eq!(
///     rule_target(&manifest.redirects[0], &uri).as_deref(),
///     Some("/posts/7?ref=home&tab=comments")
/// );
/// ```
pub fn rule_target(route: &CompiledRoute, uri: &Uri) -> Option<String> {
    let mut captured = route.params(uri.path())?;

    let segments: Vec<String> = route
        .page
        .split('/')
        .filter(|segment| !segment.is_empty() && !is_group(segment))
        .filter_map(|segment| match param_name(segment) {
            Some(name) => captured.remove(name),
            None => Some(segment.to_string()),
        })
        .collect();

    let segments = match segments.split_last() {
        Some((last, rest)) if last == "index" => rest,
        _ => &segments[..],
    };

    let mut target = format!("/{}", segments.join("/"));

    let mut query: Vec<String> = uri
        .query()
        .filter(|query| !query.is_empty())
        .map(|query| vec![query.to_string()])
        .unwrap_or_default();
    query.extend(
        captured
            .iter()
            .map(|(name, raw)| format!("{}={}", urlencoding::encode(name), urlencoding::encode(&decode(raw)))),
    );
    if !query.is_empty() {
        target.push('?');
        target.push_str(&query.join("&"));
    }

    Some(target)
}

/// Rebuilds `parts.uri` with a new path and query, keeping scheme and authority
pub fn rewrite_uri(parts: &Parts, target: &str) -> Result<Uri, DispatchError> {
    let invalid = |reason: String| DispatchError::InvalidRewrite {
        path: parts.uri.path().to_string(),
        reason,
    };

    match (parts.uri.scheme(), parts.uri.authority()) {
        (Some(scheme), Some(authority)) => Uri::builder()
            .scheme(scheme.clone())
            .authority(authority.clone())
            .path_and_query(target)
            .build()
            .map_err(|err| invalid(err.to_string())),
        _ => target.parse::<Uri>().map_err(|err| invalid(err.to_string())),
    }
}

/// Absolute `Location` value when the origin is known, otherwise the bare target
pub fn redirect_location(parts: &Parts, target: &str) -> String {
    if let (Some(scheme), Some(authority)) = (parts.uri.scheme_str(), parts.uri.authority()) {
        return format!("{scheme}://{authority}{target}");
    }

    parts
        .headers
        .get(header::HOST)
        .and_then(|host| host.to_str().ok())
        .map(|host| format!("http://{host}{target}"))
        .unwrap_or_else(|| target.to_string())
}

fn is_group(segment: &str) -> bool {
    segment.len() > 2 && segment.starts_with('(') && segment.ends_with(')')
}

fn param_name(segment: &str) -> Option<&str> {
    let inner = segment
        .strip_prefix("[[...")
        .and_then(|s| s.strip_suffix("]]"))
        .or_else(|| segment.strip_prefix("[...").and_then(|s| s.strip_suffix(']')))
        .or_else(|| segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')))?;
    (!inner.is_empty()).then_some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use pretty_assertions::assert_eq;
    use trailhead_router::{get_routes, get_server_manifest, InMemoryContext, Manifest, RoutesOptions};

    fn manifest(options: RoutesOptions, keys: &[&str]) -> Manifest {
        let tree = get_routes(&InMemoryContext::pages(keys), &options.with_preserved_rules(true)).unwrap();
        get_server_manifest(&tree).unwrap()
    }

    fn parts(uri: &str) -> Parts {
        let (parts, _) = Request::get(uri)
            .header(header::HOST, "example.com")
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_param_name() {
        assert_eq!(param_name("[id]"), Some("id"));
        assert_eq!(param_name("[...rest]"), Some("rest"));
        assert_eq!(param_name("[[...rest]]"), Some("rest"));
        assert_eq!(param_name("about"), None);
        assert_eq!(param_name("[]"), None);
    }

    #[test]
    fn test_parse_params_decodes() {
        let manifest = manifest(RoutesOptions::new(), &["./users/[name].tsx"]);
        let params = parse_params(&manifest.html_routes[0], "/users/J%C3%BCrgen%20K");
        assert_eq!(params.get("name").map(String::as_str), Some("Jürgen K"));
        assert!(parse_params(&manifest.html_routes[0], "/nope").is_empty());
    }

    #[test]
    fn test_target_for_group_index() {
        let manifest = manifest(
            RoutesOptions::new().with_rewrite("/old", "/(app)/index"),
            &["./(app)/index.tsx"],
        );
        let uri: Uri = "/old".parse().unwrap();
        assert_eq!(rule_target(&manifest.rewrites[0], &uri).as_deref(), Some("/"));
    }

    #[test]
    fn test_target_fills_catch_all() {
        let manifest = manifest(
            RoutesOptions::new().with_redirect("/legacy/[...path]", "/docs/[...path]", true),
            &["./docs/[...path].tsx"],
        );
        let uri: Uri = "/legacy/guides/intro".parse().unwrap();
        assert_eq!(
            rule_target(&manifest.redirects[0], &uri).as_deref(),
            Some("/docs/guides/intro")
        );
    }

    #[test]
    fn test_redirect_location_uses_host() {
        assert_eq!(redirect_location(&parts("/b"), "/b"), "http://example.com/b");
        assert_eq!(
            redirect_location(&parts("https://app.test/a"), "/b"),
            "https://app.test/b"
        );
    }

    #[test]
    fn test_rewrite_uri_keeps_origin() {
        let uri = rewrite_uri(&parts("https://app.test/old?x=1"), "/new?x=1").unwrap();
        assert_eq!(uri.to_string(), "https://app.test/new?x=1");

        let uri = rewrite_uri(&parts("/old"), "/new").unwrap();
        assert_eq!(uri.to_string(), "/new");
    }
}
