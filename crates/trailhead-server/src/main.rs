use anyhow::Context;
use axum::{
    body::Body,
    http::{Method, Request},
    response::{IntoResponse, Json},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trailhead_server::{ApiModule, ApiRegistry, Config, DistHost, RequestHandler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loaded = Config::load_default();
    let log_level = loaded
        .as_ref()
        .map(|config| config.dev.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("trailhead_server={log_level},trailhead_router={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = loaded.unwrap_or_else(|e| {
        error!("Failed to load config: {e:#}, using defaults");
        Config::default()
    });

    info!(
        project = %config.project.name,
        app_dir = %config.routing.app_dir,
        dev = config.dev.enabled,
        "trailhead-server starting"
    );

    let host = DistHost::from_config(&config, builtin_api())?;
    if host.manifest().is_none() {
        info!("No routes manifest; every request will get 404");
    }

    let handler = RequestHandler::new(Arc::new(host));
    let app = Router::new().fallback(move |request: Request<Body>| {
        let handler = handler.clone();
        async move { handler.handle(request).await }
    });

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// API handlers compiled into the reference server
fn builtin_api() -> ApiRegistry {
    ApiRegistry::new().with_route(
        "/api/health",
        ApiModule::new().with_handler(Method::GET, |_request, _params| async {
            Ok(Some(Json(json!({ "status": "ok" })).into_response()))
        }),
    )
}
