//! HTTP transport for itemstore.
//!
//! Exposes every item type under its plural name:
//!
//! - `POST /{types}` create, `GET /{types}` list
//! - `GET`, `PUT`, `PATCH`, `DELETE` on `/{types}/{name}`
//!
//! The patch format is taken from the `Content-Type` header. Errors are
//! returned as `application/problem+json`.

pub mod config;
pub mod problem;

pub use config::ServerConfig;
pub use problem::{ApiError, PROBLEM_MEDIA_TYPE, Problem};

use anyhow::Result;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use itemstore_core::{Item, ItemList, ItemRepository, ItemService, StoreError};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Server state shared across handlers.
struct AppState<R> {
    service: ItemService<R>,
    expose_internal_errors: bool,
}

impl<R> AppState<R> {
    fn fail(&self, err: StoreError) -> ApiError {
        ApiError::new(err, self.expose_internal_errors)
    }
}

/// Build the router for `service`.
pub fn router<R>(service: ItemService<R>, config: &ServerConfig) -> Router
where
    R: ItemRepository + 'static,
{
    let service = match config.repository_timeout {
        Some(timeout) => service.with_call_timeout(timeout),
        None => service,
    };

    let state = Arc::new(AppState {
        service,
        expose_internal_errors: config.expose_internal_errors,
    });

    let app = Router::new()
        .route("/health", get(health))
        .route(
            "/{type_plural}",
            get(list_items::<R>).post(create_item::<R>),
        )
        .route(
            "/{type_plural}/{name}",
            get(read_item::<R>)
                .put(replace_item::<R>)
                .patch(patch_item::<R>)
                .delete(delete_item::<R>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if config.cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Start the server and run until Ctrl-C.
///
/// # Errors
/// Returns error if binding fails or server encounters an error.
pub async fn serve<R>(service: ItemService<R>, config: &ServerConfig) -> Result<()>
where
    R: ItemRepository + 'static,
{
    let app = router(service, config);

    let addr = config.address();
    info!(address = %addr, "Starting item server");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Item server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// --- Response types ---

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

// --- Handlers ---

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn create_item<R: ItemRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(type_plural): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .service
        .create(&type_plural, &body)
        .await
        .map_err(|e| state.fail(e))?;

    let location = HeaderValue::from_str(&format!("/{type_plural}/{}", item.name)).ok();
    let mut response = (StatusCode::CREATED, Json(item)).into_response();
    if let Some(location) = location {
        response.headers_mut().insert(header::LOCATION, location);
    }

    Ok(response)
}

async fn list_items<R: ItemRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(type_plural): Path<String>,
) -> Result<Json<ItemList>, ApiError> {
    let items = state
        .service
        .list(&type_plural)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(ItemList { items }))
}

async fn read_item<R: ItemRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path((type_plural, name)): Path<(String, String)>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .service
        .read(&type_plural, &name)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(item))
}

async fn replace_item<R: ItemRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path((type_plural, name)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .service
        .replace(&type_plural, &name, &body)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(item))
}

async fn patch_item<R: ItemRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path((type_plural, name)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Item>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let item = state
        .service
        .patch(&type_plural, &name, content_type, &body)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(item))
}

async fn delete_item<R: ItemRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path((type_plural, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .delete(&type_plural, &name)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use itemstore_core::MemoryRepository;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> (Router, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        let router = router(ItemService::new(Arc::clone(&repo)), &ServerConfig::default());
        (router, repo)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            request = request.header(header::CONTENT_TYPE, ct);
        }
        let request = request.body(Body::from(body.to_string())).unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, value)
    }

    async fn create(app: &Router, body: &str) -> (StatusCode, HeaderMap, Value) {
        send(app, Method::POST, "/widgets", Some("application/json"), body).await
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let (status, _, body) = send(&app, Method::GET, "/health", None, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("ok"));
    }

    #[tokio::test]
    async fn test_create_read_conflict() {
        let (app, _) = app();

        let (status, headers, body) = create(&app, r#"{"name":"a1","data":{"x":1}}"#).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(headers[header::LOCATION], "/widgets/a1");
        assert_eq!(body["type"], json!("widget"));
        assert_eq!(body["created_at"], body["updated_at"]);

        let (status, _, fetched) = send(&app, Method::GET, "/widgets/a1", None, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, body);

        let (status, headers, problem) = create(&app, r#"{"name":"a1"}"#).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(headers[header::CONTENT_TYPE], PROBLEM_MEDIA_TYPE);
        assert_eq!(problem["category"], json!("conflict"));
        assert_eq!(problem["status"], json!(409));
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let (app, _) = app();

        let (status, _, problem) = send(&app, Method::GET, "/widget", None, "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(problem["category"], json!("validation"));

        let (status, _, problem) = create(&app, "{nope").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(problem["error"].is_string());

        let (status, _, _) = create(&app, r#"{"data":1}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, _) = send(&app, Method::GET, "/widgets/-a", None, "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_empty_and_filled() {
        let (app, _) = app();

        let (status, _, body) = send(&app, Method::GET, "/widgets", None, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"items": []}));

        create(&app, r#"{"name":"a"}"#).await;
        create(&app, r#"{"name":"b"}"#).await;
        let (_, _, body) = send(&app, Method::GET, "/widgets", None, "").await;
        assert_eq!(body["items"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_replace_and_delete() {
        let (app, _) = app();
        let (_, _, created) = create(&app, r#"{"name":"a1","data":{"x":1}}"#).await;

        let (status, _, replaced) = send(
            &app,
            Method::PUT,
            "/widgets/a1",
            Some("application/json"),
            r#"{"id":"forged","data":{"x":2}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replaced["data"], json!({"x": 2}));
        assert_eq!(replaced["id"], created["id"]);
        assert_eq!(replaced["created_at"], created["created_at"]);

        let (status, _, body) = send(&app, Method::DELETE, "/widgets/a1", None, "").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _, problem) = send(&app, Method::GET, "/widgets/a1", None, "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(problem["category"], json!("not_found"));
    }

    #[tokio::test]
    async fn test_patch_formats() {
        let (app, _) = app();
        create(&app, r#"{"name":"a1","data":{"y":5,"z":6}}"#).await;

        let (status, _, merged) = send(
            &app,
            Method::PATCH,
            "/widgets/a1",
            Some("application/merge-patch+json"),
            r#"{"name":"forged","data":{"y":null}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(merged["data"], json!({"z": 6}));
        assert_eq!(merged["name"], json!("a1"));

        let (status, _, patched) = send(
            &app,
            Method::PATCH,
            "/widgets/a1",
            Some("application/json-patch+json"),
            r#"[{"op":"add","path":"/data/y","value":7}]"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["data"], json!({"y": 7, "z": 6}));

        let (status, _, _) = send(
            &app,
            Method::PATCH,
            "/widgets/a1",
            Some("application/json-patch+json"),
            r#"[{"op":"test","path":"/data/y","value":99}]"#,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _, _) = send(
            &app,
            Method::PATCH,
            "/widgets/a1",
            Some("application/json-patch+json"),
            r#"{"op":"add"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, problem) = send(
            &app,
            Method::PATCH,
            "/widgets/a1",
            Some("application/json"),
            "this is not parsed",
        )
        .await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(problem["category"], json!("validation"));

        let (_, _, stored) = send(&app, Method::GET, "/widgets/a1", None, "").await;
        assert_eq!(stored["data"], json!({"y": 7, "z": 6}));
    }

    #[tokio::test]
    async fn test_internal_errors_hide_cause() {
        let (app, repo) = app();
        create(&app, r#"{"name":"a1"}"#).await;
        repo.set_simulate_write_error(true);

        let (status, _, problem) = send(&app, Method::DELETE, "/widgets/a1", None, "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(problem["category"], json!("internal"));
        assert_eq!(problem["detail"], json!("error on delete"));
        assert!(problem.get("error").is_none());
    }
}
