//! Integration tests for the route tree builder
//!
//! Trees are compared through their JSON serialization, which is the shape
//! export tooling consumes.

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{json, Value};
use trailhead_router::*;

fn preserved() -> RoutesOptions {
    RoutesOptions::new()
        .with_skip_generated(true)
        .with_preserved_rules(true)
}

fn tree_json(ctx: &InMemoryContext, options: &RoutesOptions) -> Value {
    let tree = get_routes(ctx, options).unwrap();
    serde_json::to_value(&tree.root).unwrap()
}

fn generated_root(children: Value) -> Value {
    json!({
        "type": "layout",
        "route": "",
        "contextKey": "trailhead/views/navigator",
        "dynamic": null,
        "generated": true,
        "children": children,
    })
}

#[test]
fn test_rewrite_to_group_index() {
    let ctx = InMemoryContext::pages(["./(app)/index.tsx"]);
    let options = preserved().with_rewrite("/old", "/(app)/index");

    assert_eq!(
        tree_json(&ctx, &options),
        generated_root(json!([
            {
                "type": "rewrite",
                "destinationContextKey": "./(app)/index.tsx",
                "route": "old",
                "contextKey": "./old",
                "dynamic": null,
                "generated": true,
                "children": [],
            },
            {
                "type": "route",
                "route": "(app)/index",
                "contextKey": "./(app)/index.tsx",
                "dynamic": null,
                "children": [],
            },
        ]))
    );
}

#[test]
fn test_rewrites_follow_sibling_routes() {
    let ctx = InMemoryContext::pages(["./index.tsx", "./about.tsx", "./contact.tsx"]);
    let options = preserved()
        .with_rewrite("/info", "/about")
        .with_rewrite("/reach-us", "/contact");

    let tree = get_routes(&ctx, &options).unwrap();
    let routes: Vec<(&str, Option<&str>)> = tree
        .root
        .children
        .iter()
        .map(|node| (node.route.as_str(), node.destination_key()))
        .collect();

    assert_eq!(
        routes,
        vec![
            ("index", None),
            ("about", None),
            ("contact", None),
            ("info", Some("./about.tsx")),
            ("reach-us", Some("./contact.tsx")),
        ]
    );
}

#[test]
fn test_two_rewrites_share_one_destination() {
    let ctx = InMemoryContext::pages(["./(app)/index.tsx"]);
    let options = preserved()
        .with_rewrite("/info", "/(app)/index")
        .with_rewrite("/news", "/(app)/index");

    let tree = get_routes(&ctx, &options).unwrap();
    let rewrites: Vec<&RouteNode> = tree
        .root
        .children
        .iter()
        .filter(|node| matches!(node.kind, NodeKind::Rewrite { .. }))
        .collect();
    let destinations = tree
        .root
        .children
        .iter()
        .filter(|node| node.context_key == "./(app)/index.tsx")
        .count();

    assert_eq!(rewrites.len(), 2);
    assert_eq!(destinations, 1);
    assert!(rewrites
        .iter()
        .all(|node| node.destination_key() == Some("./(app)/index.tsx")));
}

#[test]
fn test_dynamic_rewrite_keeps_descriptors() {
    let ctx = InMemoryContext::pages(["./(app)/index.tsx", "./(app)/[slug].tsx"]);
    let options = preserved().with_rewrite("/old/[slug]", "/(app)/[slug]");

    let root = tree_json(&ctx, &options);
    assert_eq!(
        root["children"][2],
        json!({
            "type": "rewrite",
            "destinationContextKey": "./(app)/[slug].tsx",
            "route": "old/[slug]",
            "contextKey": "./old/[slug]",
            "dynamic": [{ "name": "slug", "deep": false }],
            "generated": true,
            "children": [],
        })
    );
}

#[test]
fn test_literal_route_wins_over_rewrite() {
    let ctx = InMemoryContext::pages(["./(app)/index.tsx", "./(app)/[slug].tsx", "old/[slug]"]);
    let options = preserved().with_rewrite("old/[slug]", "/(app)/[slug]");

    let tree = get_routes(&ctx, &options).unwrap();
    let literal = &tree.root.children[2];
    assert_eq!(literal.kind, NodeKind::Route);
    assert_eq!(literal.route, "old/[slug]");
    assert_eq!(literal.context_key, "./old/[slug]");
    assert!(!literal.generated);
    assert_eq!(tree.root.children.len(), 3);
    assert!(matches!(
        tree.diagnostics.as_slice(),
        [Diagnostic::ShadowedRule { kind: RuleKind::Rewrite, .. }]
    ));
}

#[test]
fn test_rewrite_onto_authored_not_found() {
    let ctx = InMemoryContext::pages(["./+not-found.tsx", "./legacy.tsx"]);
    let options = preserved().with_rewrite("/404", "/+not-found");

    assert_eq!(
        tree_json(&ctx, &options)["children"],
        json!([
            {
                "type": "route",
                "route": "+not-found",
                "contextKey": "./+not-found.tsx",
                "dynamic": [{ "name": "+not-found", "deep": true, "notFound": true }],
                "children": [],
            },
            {
                "type": "route",
                "route": "legacy",
                "contextKey": "./legacy.tsx",
                "dynamic": null,
                "children": [],
            },
            {
                "type": "rewrite",
                "destinationContextKey": "./+not-found.tsx",
                "route": "404",
                "contextKey": "./404",
                "dynamic": null,
                "generated": true,
                "children": [],
            },
        ])
    );
}

#[test]
fn test_dangling_rewrite_is_dropped() {
    let ctx = InMemoryContext::pages(["./index.tsx"]);
    let options = preserved().with_rewrite("/old", "/missing");

    let tree = get_routes(&ctx, &options).unwrap();
    assert_eq!(tree.root.children.len(), 1);
    assert!(matches!(
        tree.diagnostics.as_slice(),
        [Diagnostic::DanglingRule { destination, .. }] if destination == "/missing"
    ));
}

#[test]
fn test_duplicate_rule_source_is_dropped() {
    let ctx = InMemoryContext::pages(["./a.tsx", "./b.tsx"]);
    let options = preserved()
        .with_rewrite("/x", "/a")
        .with_rewrite("/x/", "/b");

    let tree = get_routes(&ctx, &options).unwrap();
    let rules: Vec<_> = tree.root.children.iter().filter(|n| n.kind.is_rule()).collect();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].destination_key(), Some("./a.tsx"));
    assert!(matches!(
        tree.diagnostics.as_slice(),
        [Diagnostic::DuplicateRule { .. }]
    ));
}

#[test]
fn test_redirect_node_serialization() {
    let ctx = InMemoryContext::pages(["./new.tsx"]);
    let mut options = preserved().with_redirect("/old", "/new", true);
    options.redirects[0].methods = Some(vec!["get".into(), "head".into()]);

    assert_eq!(
        tree_json(&ctx, &options)["children"][1],
        json!({
            "type": "redirect",
            "destinationContextKey": "./new.tsx",
            "permanent": true,
            "methods": ["GET", "HEAD"],
            "route": "old",
            "contextKey": "./old",
            "dynamic": null,
            "generated": true,
            "children": [],
        })
    );
}

#[rstest]
#[case::exact("/(app)/about", "./(app)/about.tsx")]
#[case::group_free("/about", "./(app)/about.tsx")]
#[case::index("/blog", "./blog/index.tsx")]
#[case::root("/", "./index.tsx")]
#[case::dynamic("/users/[id]", "./(app)/users/[id].tsx")]
fn test_destination_resolution(#[case] destination: &str, #[case] expected: &str) {
    let ctx = InMemoryContext::pages([
        "./index.tsx",
        "./(app)/about.tsx",
        "./blog/index.tsx",
        "./(app)/users/[id].tsx",
    ]);
    let options = preserved().with_rewrite("/alias", destination);

    let tree = get_routes(&ctx, &options).unwrap();
    let rule = tree
        .root
        .children
        .iter()
        .find(|node| node.route == "alias")
        .unwrap();

    assert_eq!(rule.destination_key(), Some(expected));
    assert_eq!(tree.resolve_destination(rule).unwrap().1.context_key, expected);
}

#[test]
fn test_layouts_nest_and_directories_fold() {
    let ctx = InMemoryContext::pages([
        "./_layout.tsx",
        "./index.tsx",
        "./(tabs)/_layout.tsx",
        "./(tabs)/feed.tsx",
        "./(tabs)/profile/[user].tsx",
        "./settings/account.tsx",
        "./settings/[[...rest]].tsx",
    ]);

    assert_eq!(
        tree_json(&ctx, &RoutesOptions::new()),
        json!({
            "type": "layout",
            "route": "",
            "contextKey": "./_layout.tsx",
            "dynamic": null,
            "children": [
                {
                    "type": "route",
                    "route": "index",
                    "contextKey": "./index.tsx",
                    "dynamic": null,
                    "children": [],
                },
                {
                    "type": "layout",
                    "route": "(tabs)",
                    "contextKey": "./(tabs)/_layout.tsx",
                    "dynamic": null,
                    "children": [
                        {
                            "type": "route",
                            "route": "feed",
                            "contextKey": "./(tabs)/feed.tsx",
                            "dynamic": null,
                            "children": [],
                        },
                        {
                            "type": "route",
                            "route": "profile/[user]",
                            "contextKey": "./(tabs)/profile/[user].tsx",
                            "dynamic": [{ "name": "user", "deep": false }],
                            "children": [],
                        },
                    ],
                },
                {
                    "type": "route",
                    "route": "settings/account",
                    "contextKey": "./settings/account.tsx",
                    "dynamic": null,
                    "children": [],
                },
                {
                    "type": "route",
                    "route": "settings/[[...rest]]",
                    "contextKey": "./settings/[[...rest]].tsx",
                    "dynamic": [{ "name": "rest", "deep": true }],
                    "children": [],
                },
                {
                    "type": "route",
                    "route": "_sitemap",
                    "contextKey": "trailhead/views/sitemap",
                    "dynamic": null,
                    "generated": true,
                    "children": [],
                },
                {
                    "type": "route",
                    "route": "+not-found",
                    "contextKey": "trailhead/views/not-found",
                    "dynamic": [{ "name": "+not-found", "deep": true, "notFound": true }],
                    "generated": true,
                    "children": [],
                },
            ],
        })
    );
}

#[test]
fn test_tree_iter_yields_full_paths() {
    let ctx = InMemoryContext::pages([
        "./index.tsx",
        "./[org]/_layout.tsx",
        "./[org]/repos.tsx",
        "./[org]/[repo]/issues.tsx",
    ]);
    let tree = get_routes(&ctx, &RoutesOptions::new().with_skip_generated(true)).unwrap();

    let paths: Vec<String> = tree.iter().map(|(full, _)| full).collect();
    assert_eq!(
        paths,
        vec!["", "index", "[org]", "[org]/repos", "[org]/[repo]/issues"]
    );

    let (full, node) = tree.find_by_context_key("[org]/repos.tsx").unwrap();
    assert_eq!(full, "[org]/repos");
    assert_eq!(node.dynamic, None);

    let (_, layout) = tree.find_by_context_key("./[org]/_layout.tsx").unwrap();
    assert_eq!(layout.dynamic, Some(vec![DynamicDescriptor::new("org", false)]));
}

#[test]
fn test_sync_mode_validates_loader_exports() {
    let ctx = InMemoryContext::new().with_module(
        "./(app)/index.js",
        RouteModule::page().with_value("loader", json!("not a function")),
    );
    let options = RoutesOptions::new()
        .with_import_mode(ImportMode::Sync)
        .with_export_validation(true);

    let err = get_routes(&ctx, &options).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"Route "./(app)/index.js" exports a loader that is not a function."#
    );

    // Without the flag the build succeeds and the loader fails when called.
    let tree = get_routes(&ctx, &options.clone().with_export_validation(false)).unwrap();
    let module = tree.root.children[0].module.as_ref().unwrap();
    assert!(module.call_loader(&Value::Null).is_err());
}

#[test]
fn test_sync_mode_requires_default_export() {
    let ctx = InMemoryContext::new()
        .with_module("./about.tsx", RouteModule::new().with_value("title", json!("About")));
    let options = RoutesOptions::new()
        .with_import_mode(ImportMode::Sync)
        .with_export_validation(true);

    assert!(matches!(
        get_routes(&ctx, &options),
        Err(RouteError::MissingDefaultExport { ref context_key }) if context_key == "./about.tsx"
    ));
}

#[test]
fn test_static_params_module_is_exposed() {
    let ctx = InMemoryContext::new().with_module(
        "./posts/[id].tsx",
        RouteModule::page().with_function("generateStaticParams", |_| {
            Ok(json!([{ "id": "1" }, { "id": "2" }]))
        }),
    );
    let options = RoutesOptions::new()
        .with_skip_generated(true)
        .with_import_mode(ImportMode::Sync);

    let tree = get_routes(&ctx, &options).unwrap();
    let module = tree.root.children[0].static_params_module().unwrap();
    assert_eq!(
        module.generate_static_params(&json!({})).unwrap(),
        Some(json!([{ "id": "1" }, { "id": "2" }]))
    );
}
