//! Integration tests for manifest flattening

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use trailhead_router::*;

fn manifest_for(keys: &[&str], options: &RoutesOptions) -> Manifest {
    let tree = get_routes(&InMemoryContext::pages(keys), options).unwrap();
    get_server_manifest(&tree).unwrap()
}

fn pages(routes: &[CompiledRoute]) -> Vec<&str> {
    routes.iter().map(|route| route.page.as_str()).collect()
}

#[test]
fn test_arrays_preserve_tree_order() {
    let manifest = manifest_for(
        &[
            "./index.tsx",
            "./(shop)/_layout.tsx",
            "./(shop)/cart.tsx",
            "./(shop)/+not-found.tsx",
            "./hello+api.ts",
            "./about.tsx",
            "./docs/[...path].tsx",
        ],
        &RoutesOptions::new(),
    );

    assert_eq!(
        pages(&manifest.html_routes),
        vec!["/index", "/about", "/(shop)/cart", "/docs/[...path]", "/_sitemap"]
    );
    assert_eq!(pages(&manifest.api_routes), vec!["/hello"]);
    assert_eq!(
        pages(&manifest.not_found_routes),
        vec!["/(shop)/+not-found", "/+not-found"]
    );
    assert!(manifest.html_routes[4].is_generated());
    assert!(!manifest.html_routes[0].is_generated());
}

#[test]
fn test_compiled_route_shape() {
    let manifest = manifest_for(
        &["./(app)/blog/[slug].tsx"],
        &RoutesOptions::new().with_skip_generated(true),
    );

    assert_eq!(
        serde_json::to_value(&manifest).unwrap(),
        json!({
            "redirects": [],
            "rewrites": [],
            "htmlRoutes": [{
                "file": "./(app)/blog/[slug].tsx",
                "page": "/(app)/blog/[slug]",
                "routeKeys": { "slug": "slug" },
                "namedRegex": r"^(?:/\(app\))?/blog/(?<slug>[^/]+?)(?:/)?$",
            }],
            "apiRoutes": [],
            "notFoundRoutes": [],
        })
    );
}

#[test]
fn test_manifest_json_reloads_regexes() {
    let manifest = manifest_for(&["./users/[id].tsx"], &RoutesOptions::new());
    let json = manifest.to_json_pretty().unwrap();

    let reloaded = Manifest::from_json(&json).unwrap();
    assert_eq!(reloaded, manifest);
    assert!(reloaded.html_routes[0].is_match("/users/7"));
}

#[test]
fn test_preserved_rules_point_at_destination_page() {
    let ctx = InMemoryContext::pages(["./(app)/[slug].tsx", "./new.tsx"]);
    let options = RoutesOptions::new()
        .with_skip_generated(true)
        .with_preserved_rules(true)
        .with_rewrite("/old/[slug]", "/(app)/[slug]")
        .with_redirect("/legacy", "/new", true);

    let manifest = get_server_manifest(&get_routes(&ctx, &options).unwrap()).unwrap();

    assert_eq!(manifest.redirects.len(), 1);
    let redirect = &manifest.redirects[0];
    assert_eq!(redirect.page, "/new");
    assert_eq!(redirect.file, "./new.tsx");
    assert_eq!(redirect.permanent, Some(true));
    assert!(redirect.is_match("/legacy"));

    assert_eq!(manifest.rewrites.len(), 1);
    let rewrite = &manifest.rewrites[0];
    assert_eq!(rewrite.page, "/(app)/[slug]");
    assert_eq!(rewrite.file, "./(app)/[slug].tsx");
    assert_eq!(
        rewrite.params("/old/hello").unwrap().get("slug").map(String::as_str),
        Some("hello")
    );

    assert_eq!(pages(&manifest.html_routes), vec!["/new", "/(app)/[slug]"]);
}

#[test]
fn test_dangling_rewrite_has_no_entry() {
    let manifest = manifest_for(
        &["./index.tsx"],
        &RoutesOptions::new()
            .with_preserved_rules(true)
            .with_rewrite("/gone", "/nowhere"),
    );
    assert!(manifest.rewrites.is_empty());
}

#[test]
fn test_aliases_become_html_routes() {
    let manifest = manifest_for(
        &["./about.tsx"],
        &RoutesOptions::new()
            .with_skip_generated(true)
            .with_rewrite("/info", "/about"),
    );

    assert!(manifest.rewrites.is_empty());
    assert_eq!(pages(&manifest.html_routes), vec!["/about", "/info"]);
    assert_eq!(manifest.html_routes[1].file, "./about.tsx");
    assert_eq!(manifest.html_routes[1].generated, Some(true));
}

#[test]
fn test_middleware_entry() {
    let manifest = manifest_for(&["./+middleware.ts", "./index.tsx"], &RoutesOptions::new());
    assert_eq!(
        manifest.middleware,
        Some(MiddlewareEntry {
            file: "./+middleware.ts".into()
        })
    );
}

#[rstest]
#[case("/", false)]
#[case("/docs", true)]
#[case("/docs/", true)]
#[case("/docs/a/b/c", true)]
#[case("/doc", false)]
fn test_optional_catch_all_matching(#[case] path: &str, #[case] matches: bool) {
    let manifest = manifest_for(
        &["./docs/[[...rest]].tsx"],
        &RoutesOptions::new().with_skip_generated(true),
    );
    let route = &manifest.html_routes[0];
    assert_eq!(route.is_match(path), matches);
}

#[test]
fn test_catch_all_params() {
    let manifest = manifest_for(
        &["./docs/[...path].tsx"],
        &RoutesOptions::new().with_skip_generated(true),
    );
    let params = manifest.html_routes[0].params("/docs/guides/routing").unwrap();
    assert_eq!(params.get("path").map(String::as_str), Some("guides/routing"));
    assert!(manifest.html_routes[0].params("/docs").is_none());
}
