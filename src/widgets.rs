//! Widgets service served by the demo binary.
//!
//! # Routes
//! - `POST /widgets` → 201 with the created widget, 422 on `ValidationError`
//! - `GET /widgets?min_quantity=N` → 200 with matching widgets
//! - `GET /widgets/{id}` → 200, or 404 / 400 written by `WidgetError` itself
//! - `DELETE /widgets/{id}` → 204
//! - `GET /health` → 200, untyped

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use either_routing::config::DispatchConfig;
use either_routing::{AnyFailure, Call, Effect, EitherRouting, Failure, Respondable};

#[derive(Debug, Clone, Serialize)]
pub struct Widget {
    pub id: Uuid,
    pub name: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct NewWidget {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: u32,
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(default)]
    min_quantity: u32,
}

/// In-memory widget storage shared by all handlers.
#[derive(Debug, Clone, Default)]
pub struct WidgetStore {
    widgets: Arc<RwLock<BTreeMap<Uuid, Widget>>>,
}

impl WidgetStore {
    async fn insert(&self, widget: Widget) {
        self.widgets.write().await.insert(widget.id, widget);
    }

    async fn get(&self, id: Uuid) -> Option<Widget> {
        self.widgets.read().await.get(&id).cloned()
    }

    async fn list(&self, min_quantity: u32) -> Vec<Widget> {
        self.widgets
            .read()
            .await
            .values()
            .filter(|w| w.quantity >= min_quantity)
            .cloned()
            .collect()
    }

    async fn remove(&self, id: Uuid) -> Option<Widget> {
        self.widgets.write().await.remove(&id)
    }
}

/// Rejected widget input, answered by the registered 422 responder.
#[derive(Debug)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Failure for ValidationError {
    fn payload(&self) -> Value {
        json!({ "message": self.message })
    }
}

/// Lookup failures. These write their own responses.
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("widget {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    BadRequest(String),
}

impl From<QueryRejection> for WidgetError {
    fn from(rejection: QueryRejection) -> Self {
        WidgetError::BadRequest(rejection.body_text())
    }
}

impl From<uuid::Error> for WidgetError {
    fn from(err: uuid::Error) -> Self {
        WidgetError::BadRequest(format!("invalid widget id: {err}"))
    }
}

impl Failure for WidgetError {
    fn payload(&self) -> Value {
        json!({ "message": self.to_string() })
    }

    fn as_respondable(&self) -> Option<&dyn Respondable> {
        Some(self)
    }
}

impl Respondable for WidgetError {
    fn respond(&self, call: &Call) -> Response {
        let status = match self {
            WidgetError::NotFound(_) => StatusCode::NOT_FOUND,
            WidgetError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        let body = json!({ "error": self.to_string(), "path": call.path() });
        (status, Json(body)).into_response()
    }
}

/// Build the widgets routing tree.
pub fn routing(config: &DispatchConfig) -> EitherRouting<WidgetStore> {
    EitherRouting::from_config(config).configure(|routing| {
        routing.responder(|_, e: ValidationError| (StatusCode::UNPROCESSABLE_ENTITY, e.message));
        routing.trace(|trace| tracing::trace!(trace = %trace, "Route resolved"));

        routing.route("/widgets", |widgets| {
            widgets.post_json("", create_widget);
            widgets.get("", list_widgets);
            widgets.get("{id}", get_widget);
            widgets.delete("{id}", delete_widget);
        });
        routing.get("/health", |_: Effect<WidgetStore>| async { Ok::<_, AnyFailure>("ok") });
    })
}

async fn create_widget(
    ctx: Effect<WidgetStore, ValidationError>,
    new: NewWidget,
) -> Result<(StatusCode, Json<Widget>), ValidationError> {
    let name = new.name.trim().to_string();
    ctx.ensure(!name.is_empty(), || ValidationError::new("name required"))?;
    ctx.ensure(name.len() <= 64, || ValidationError::new("name too long"))?;

    let widget = Widget {
        id: Uuid::new_v4(),
        name,
        quantity: new.quantity,
    };
    ctx.state().insert(widget.clone()).await;
    tracing::info!(widget_id = %widget.id, request_id = ?ctx.request_id(), "Widget created");

    Ok((StatusCode::CREATED, Json(widget)))
}

async fn list_widgets(ctx: Effect<WidgetStore, WidgetError>) -> Result<Json<Vec<Widget>>, WidgetError> {
    let query: ListQuery = ctx.bind(ctx.query())?;
    Ok(Json(ctx.state().list(query.min_quantity).await))
}

async fn get_widget(ctx: Effect<WidgetStore, WidgetError>) -> Result<Json<Widget>, WidgetError> {
    let id = widget_id(&ctx)?;
    let widget = ctx.bind_option(ctx.state().get(id).await, || WidgetError::NotFound(id))?;
    Ok(Json(widget))
}

async fn delete_widget(ctx: Effect<WidgetStore, WidgetError>) -> Result<StatusCode, WidgetError> {
    let id = widget_id(&ctx)?;
    ctx.bind_option(ctx.state().remove(id).await, || WidgetError::NotFound(id))?;
    Ok(StatusCode::NO_CONTENT)
}

fn widget_id<S>(ctx: &Effect<S, WidgetError>) -> Result<Uuid, WidgetError> {
    let raw = ctx.bind_option(ctx.path_param("id"), || {
        WidgetError::BadRequest("missing widget id".to_string())
    })?;
    ctx.bind(raw.parse::<Uuid>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::extract::Request;

    async fn send(routing: &either_routing::Routing, request: Request) -> (StatusCode, Vec<u8>) {
        let response = routing.interceptor(request).await;
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn post(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/widgets")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_fetch_widget() {
        let routing = routing(&DispatchConfig::default()).with_state(WidgetStore::default());

        let (status, body) = send(&routing, post(r#"{"name":"sprocket","quantity":3}"#)).await;
        assert_eq!(status, StatusCode::CREATED);
        let created: Value = serde_json::from_slice(&body).unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let get = Request::builder().uri(format!("/widgets/{id}")).body(Body::empty()).unwrap();
        let (status, body) = send(&routing, get).await;
        assert_eq!(status, StatusCode::OK);
        let fetched: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(fetched["name"], "sprocket");
    }

    #[tokio::test]
    async fn test_missing_name_is_unprocessable() {
        let routing = routing(&DispatchConfig::default()).with_state(WidgetStore::default());
        let (status, body) = send(&routing, post(r#"{"quantity":3}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, b"name required");
    }

    #[tokio::test]
    async fn test_unknown_widget_responds_itself() {
        let routing = routing(&DispatchConfig::default()).with_state(WidgetStore::default());

        let uri = format!("/widgets/{}", Uuid::new_v4());
        let (status, _) = send(&routing, Request::builder().uri(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let request = Request::builder().uri("/widgets/not-a-uuid").body(Body::empty()).unwrap();
        let (status, body) = send(&routing, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["path"], "/widgets/not-a-uuid");
    }

    #[tokio::test]
    async fn test_list_filters_by_quantity() {
        let routing = routing(&DispatchConfig::default()).with_state(WidgetStore::default());
        send(&routing, post(r#"{"name":"a","quantity":1}"#)).await;
        send(&routing, post(r#"{"name":"b","quantity":10}"#)).await;

        let request = Request::builder().uri("/widgets?min_quantity=5").body(Body::empty()).unwrap();
        let (status, body) = send(&routing, request).await;
        assert_eq!(status, StatusCode::OK);
        let widgets: Vec<Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(widgets.len(), 1);
        assert_eq!(widgets[0]["name"], "b");

        let request = Request::builder().uri("/widgets?min_quantity=lots").body(Body::empty()).unwrap();
        let (status, _) = send(&routing, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
