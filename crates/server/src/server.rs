use axum::{
    Router,
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};

use std::sync::Arc;

use crate::{balances, expenses, settlements};
use engine::Engine;

static USER_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("x-user-id");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// The user a request acts on behalf of.
#[derive(Clone, Debug)]
pub struct Viewer(pub String);

/// `TypedHeader` for the caller's user id.
///
/// Every request must contain a non-blank "x-user-id" entry in the header.
#[derive(Debug)]
struct UserHeader(String);

impl Header for UserHeader {
    fn name() -> &'static axum::http::HeaderName {
        &USER_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(AxumError::invalid());
        }

        Ok(UserHeader(value.to_string()))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        match axum::http::HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-user-id header"),
        }
    }
}

async fn identify(
    user_header: Option<TypedHeader<UserHeader>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(UserHeader(user_id))) = user_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(Viewer(user_id));
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/expenses", post(expenses::expense_new))
        .route("/settlements", post(settlements::settlement_new))
        .route(
            "/settlements/{id}/complete",
            post(settlements::settlement_complete),
        )
        .route(
            "/settlements/{id}/cancel",
            post(settlements::settlement_cancel),
        )
        .route("/balances", get(balances::get))
        .route_layer(middleware::from_fn(identify))
        .with_state(state)
}

pub async fn run(engine: Engine, bind: &str, port: u16) {
    let listener = match tokio::net::TcpListener::bind((bind, port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {bind}:{port}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request},
    };
    use http_body_util::BodyExt;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    async fn app() -> Router {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder().database(db).build().await.unwrap();
        router(ServerState {
            engine: Arc::new(engine),
        })
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn dinner(app: &Router) {
        let (status, body) = call(
            app,
            Method::POST,
            "/expenses",
            Some("u1"),
            Some(json!({
                "group_id": "trip",
                "description": "dinner",
                "payers": [{ "user_id": "u1", "amount": 300.0 }],
                "split": { "kind": "equal", "participants": ["u1", "u2", "u3"] }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["id"].is_string());
    }

    #[tokio::test]
    async fn missing_user_header_is_unauthorized() {
        let app = app().await;
        let (status, _) = call(&app, Method::GET, "/balances", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, Method::GET, "/balances", Some("  "), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn equal_split_expense_shows_up_in_balances() {
        let app = app().await;
        dinner(&app).await;

        let (status, body) = call(&app, Method::GET, "/balances", Some("u2"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["you_owe_minor"], 10_000);
        assert_eq!(body["you_are_owed_minor"], 0);
        assert_eq!(
            body["simplified_transactions"],
            json!([
                { "from_user_id": "u2", "to_user_id": "u1", "amount_minor": 10_000 },
                { "from_user_id": "u3", "to_user_id": "u1", "amount_minor": 10_000 }
            ])
        );
        assert_eq!(
            body["balances"],
            json!({ "u1": 20_000, "u2": -10_000, "u3": -10_000 })
        );

        let (_, body) = call(&app, Method::GET, "/balances", Some("u1"), None).await;
        assert_eq!(body["you_are_owed_minor"], 20_000);
        assert_eq!(body["you_owe_minor"], 0);
    }

    #[tokio::test]
    async fn settlement_clears_the_payer() {
        let app = app().await;
        dinner(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/settlements",
            Some("u2"),
            Some(json!({ "to_user_id": "u1", "amount": 100.0, "group_id": "trip" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["from_user_id"], "u2");
        assert_eq!(body["amount_minor"], 10_000);

        let (_, body) = call(
            &app,
            Method::GET,
            "/balances?group_id=trip",
            Some("u1"),
            None,
        )
        .await;
        assert_eq!(
            body["simplified_transactions"],
            json!([{ "from_user_id": "u3", "to_user_id": "u1", "amount_minor": 10_000 }])
        );
        assert_eq!(body["you_are_owed_minor"], 10_000);
    }

    #[tokio::test]
    async fn pending_settlement_counts_after_completion() {
        let app = app().await;
        dinner(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/settlements",
            Some("u3"),
            Some(json!({ "to_user_id": "u1", "amount": 100.0, "group_id": "trip", "pending": true })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "pending");
        let id = body["id"].as_str().unwrap().to_string();

        let (_, body) = call(&app, Method::GET, "/balances", Some("u3"), None).await;
        assert_eq!(body["you_owe_minor"], 10_000);

        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/settlements/{id}/complete"),
            Some("u2"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/settlements/{id}/complete"),
            Some("u1"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");

        let (_, body) = call(&app, Method::GET, "/balances", Some("u3"), None).await;
        assert_eq!(body["you_owe_minor"], 0);

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/settlements/{id}/cancel"),
            Some("u3"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "cancelled");

        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/settlements/{id}/complete"),
            Some("u3"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn invalid_records_are_rejected() {
        let app = app().await;

        let (status, _) = call(
            &app,
            Method::POST,
            "/settlements",
            Some("u1"),
            Some(json!({ "to_user_id": "u1", "amount": 10.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(
            &app,
            Method::POST,
            "/expenses",
            Some("u1"),
            Some(json!({
                "description": "taxi",
                "payers": [{ "user_id": "u1", "amount": 30.0 }],
                "split": { "kind": "exact", "shares": [{ "user_id": "u2", "amount": 20.0 }] }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/settlements/{}/cancel", uuid::Uuid::new_v4()),
            Some("u1"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn overflowing_expense_total_is_rejected() {
        let app = app().await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/expenses",
            Some("u1"),
            Some(json!({
                "description": "yacht",
                "payers": [
                    { "user_id": "u1", "amount": 5e16 },
                    { "user_id": "u2", "amount": 5e16 }
                ],
                "split": { "kind": "equal", "participants": ["u1", "u2"] }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("too large"));
    }

    #[tokio::test]
    async fn empty_ledger_gives_empty_report() {
        let app = app().await;
        let (status, body) = call(&app, Method::GET, "/balances", Some("u9"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "you_owe_minor": 0,
                "you_are_owed_minor": 0,
                "simplified_transactions": [],
                "balances": {}
            })
        );
    }
}
