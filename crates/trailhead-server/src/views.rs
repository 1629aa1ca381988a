//! Built-in pages for generated routes and development errors

use maud::{html, Markup, DOCTYPE};
use trailhead_router::Manifest;

use crate::error::DispatchError;

fn page(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
            }
            body { (body) }
        }
    }
}

/// Links to every static page route
pub fn sitemap(manifest: &Manifest) -> Markup {
    let links: Vec<(&str, String)> = manifest
        .html_routes
        .iter()
        .filter(|route| !route.is_generated() && route.route_keys.is_empty())
        .map(|route| (route.page.as_str(), visible_path(&route.page)))
        .collect();

    page(
        "Sitemap",
        html! {
            h1 { "Sitemap" }
            ul {
                @for (page, href) in &links {
                    li { a href=(href) { (href) } " " small { code { (page) } } }
                }
            }
        },
    )
}

pub fn not_found(path: &str) -> Markup {
    page(
        "Not found",
        html! {
            h1 { "Unmatched route" }
            p { "Page could not be found: " code { (path) } }
            a href="/_sitemap" { "Sitemap" }
        },
    )
}

/// Development error page with the full cause chain
pub fn route_error(error: &DispatchError) -> Markup {
    let causes: Vec<String> = std::iter::successors(
        Some(error as &(dyn std::error::Error + 'static)),
        |err| err.source(),
    )
    .skip(1)
    .map(ToString::to_string)
    .collect();

    page(
        "Route error",
        html! {
            h1 { "Route error" }
            pre { (error) }
            @if !causes.is_empty() {
                h2 { "Caused by" }
                ol {
                    @for cause in &causes {
                        li { pre { (cause) } }
                    }
                }
            }
        },
    )
}

/// URL path a static page is served at
fn visible_path(page: &str) -> String {
    let segments: Vec<&str> = page
        .split('/')
        .filter(|s| !s.is_empty() && !(s.starts_with('(') && s.ends_with(')')))
        .collect();
    let segments = match segments.split_last() {
        Some((&"index", rest)) => rest,
        _ => &segments[..],
    };
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailhead_router::{get_routes, get_server_manifest, InMemoryContext, RoutesOptions};

    #[test]
    fn test_sitemap_lists_static_pages() {
        let ctx = InMemoryContext::pages(["./(app)/index.tsx", "./about.tsx", "./users/[id].tsx"]);
        let tree = get_routes(&ctx, &RoutesOptions::new()).unwrap();
        let manifest = get_server_manifest(&tree).unwrap();

        let html = sitemap(&manifest).into_string();
        assert!(html.contains(r#"<a href="/about">"#));
        assert!(html.contains(r#"<a href="/">"#));
        assert!(!html.contains("users"));
        assert!(!html.contains("_sitemap\">"));
    }

    #[test]
    fn test_error_page_escapes_message() {
        let error = DispatchError::HtmlNotLoaded {
            page: "/<script>".into(),
        };
        let html = route_error(&error).into_string();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("Caused by"));
    }
}
