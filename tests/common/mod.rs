#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use base64ct::{Base64, Encoding};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use enrolld::{
    app::build_app,
    config::{AppConfig, SmtpConfig},
    mailer::Mailer,
    state::AppState,
};

pub const EMAIL: &str = "user@example.com";
pub const PASSWORD: &str = "Secure@pass123";

/// Mailer double: records deliveries, optionally fails every send.
#[derive(Default)]
pub struct StubMailer {
    pub fail: bool,
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Mailer for StubMailer {
    async fn send_activation_code(&self, to_email: &str, code: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("smtp relay unavailable");
        }
        self.sent
            .lock()
            .unwrap()
            .push((to_email.to_string(), code.to_string()));
        Ok(())
    }
}

pub fn test_app(pool: PgPool) -> Router {
    test_app_with_mailer(pool, Arc::new(StubMailer::default()))
}

pub fn test_app_with_mailer(pool: PgPool, mailer: Arc<StubMailer>) -> Router {
    let config = Arc::new(AppConfig {
        database_url: String::new(),
        smtp: SmtpConfig {
            host: "localhost".into(),
            port: 1025,
        },
    });
    build_app(AppState::from_parts(pool, config, mailer))
}

pub fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn basic_auth(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        Base64::encode_string(format!("{username}:{password}").as_bytes())
    )
}

pub fn activate_request(code: &str, email: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/users/activate")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, basic_auth(email, password))
        .body(Body::from(json!({ "code": code }).to_string()))
        .unwrap()
}

pub async fn register(app: &Router) -> Response {
    app.clone()
        .oneshot(json_request(
            "/users",
            json!({ "email": EMAIL, "password": PASSWORD }),
        ))
        .await
        .unwrap()
}

pub async fn latest_code(pool: &PgPool) -> String {
    sqlx::query_scalar::<_, String>(
        "SELECT code FROM activation_codes ORDER BY created_at DESC LIMIT 1",
    )
    .fetch_one(pool)
    .await
    .expect("no activation code issued")
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
