use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use httpmock::prelude::*;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use paksa_api::app::{AppServices, build_app_with, build_services};
use paksa_auth::{TokenClaims, TokenKind, UserCreate, UserRecord, UserRole, hash_password};
use paksa_config::Settings;
use paksa_infra::LogMailer;
use paksa_license::{LicenseManager, current_hardware_id, encode_key, hardware_signature};

const JWT_SECRET: &str = "test-secret";
const LICENSE_SECRET: &str = "test-license-secret";
const PREFIX: &str = "/api/v1";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    mailer: Arc<LogMailer>,
    handle: tokio::task::JoinHandle<()>,
}

fn test_settings(overrides: &[(&str, &str)]) -> Settings {
    let mut map: HashMap<String, String> = [
        ("APP_ENV", "test"),
        ("JWT_SECRET_KEY", JWT_SECRET),
        ("LICENSE_SECRET", LICENSE_SECRET),
        ("RATE_LIMIT", "10000"),
        ("RATE_LIMIT_PERIOD", "60"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        map.insert(k.to_string(), v.to_string());
    }
    Settings::from_map(&map).expect("test settings must be valid")
}

impl TestServer {
    async fn spawn(overrides: &[(&str, &str)]) -> Self {
        // Same router as prod, in-memory backends, ephemeral port.
        let mut services = build_services(test_settings(overrides))
            .await
            .expect("failed to build services");
        let mailer = Arc::new(LogMailer::new("noreply@paksa.test"));
        services.mailer = mailer.clone();
        let services = Arc::new(services);

        let app = build_app_with(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .unwrap();
        });

        Self {
            base_url,
            services,
            mailer,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, PREFIX, path)
    }

    /// Insert an account directly, bypassing the API.
    async fn insert_user(&self, username: &str, role: UserRole, disabled: bool) -> UserRecord {
        let req = UserCreate {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            full_name: None,
            disabled,
            role,
            password: "Secret123".to_string(),
        };
        let hashed = hash_password(&req.password).unwrap();
        self.services
            .users
            .insert(UserRecord::from_create(&req, hashed, Utc::now()))
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user: &UserRecord) -> String {
    let claims = TokenClaims::new(
        TokenKind::Access,
        &user.username,
        user.id,
        user.role,
        Utc::now(),
        ChronoDuration::minutes(10),
    )
    .unwrap();
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn valid_license_key(features: Option<serde_json::Value>) -> String {
    let issuer = LicenseManager::new(
        None,
        LICENSE_SECRET,
        hardware_signature(&current_hardware_id()),
    );
    let features = features.map(|f| serde_json::from_value(f).unwrap());
    let data = issuer
        .generate_license("Acme", "ops@acme.test", 30, 5, features, Utc::now())
        .unwrap();
    encode_key(&data).unwrap()
}

async fn register(client: &reqwest::Client, srv: &TestServer, username: &str) -> reqwest::Response {
    client
        .post(srv.url("/users"))
        .json(&json!({
            "email": format!("{username}@example.com"),
            "username": username,
            "full_name": "Test User",
            "password": "Secret123",
        }))
        .send()
        .await
        .unwrap()
}

async fn login(
    client: &reqwest::Client,
    srv: &TestServer,
    username: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(srv.url("/auth/token"))
        .form(&[("username", username), ("password", password)])
        .send()
        .await
        .unwrap()
}

async fn access_token(client: &reqwest::Client, srv: &TestServer, username: &str) -> String {
    let res = login(client, srv, username, "Secret123").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_and_welcome() {
    let srv = TestServer::spawn(&[]).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "Paksa AI Assistant");

    for path in ["/", ""] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "path {path:?}");
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["message"], "Welcome to Paksa AI Assistant API");
        assert_eq!(body["documentation"], "/docs");
    }
}

#[tokio::test]
async fn register_login_and_read_profile() {
    let srv = TestServer::spawn(&[]).await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv, "alice").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    assert_eq!(created["role"], "customer");
    assert!(created.get("hashed_password").is_none());

    let res = login(&client, &srv, "alice", "Secret123").await;
    assert_eq!(res.status(), StatusCode::OK);
    let token: serde_json::Value = res.json().await.unwrap();
    assert_eq!(token["token_type"], "bearer");
    assert_eq!(token["expires_in"], 30 * 60);
    let access = token["access_token"].as_str().unwrap();

    for path in ["/users/me", "/users/me/"] {
        let res = client
            .get(srv.url(path))
            .bearer_auth(access)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "path {path}");
        let me: serde_json::Value = res.json().await.unwrap();
        assert_eq!(me["username"], "alice");
        assert_eq!(me["id"], created["id"]);
        assert!(!me["last_login"].is_null());
    }
}

#[tokio::test]
async fn bad_credentials_are_rejected_with_challenge() {
    let srv = TestServer::spawn(&[]).await;
    let client = reqwest::Client::new();
    register(&client, &srv, "alice").await;

    for (user, pass) in [("alice", "Wrong1234"), ("nobody", "Secret123")] {
        let res = login(&client, &srv, user, pass).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()["www-authenticate"], "Bearer");
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "unauthorized");
        assert_eq!(body["message"], "Incorrect username or password");
    }
}

#[tokio::test]
async fn disabled_user_cannot_log_in() {
    let srv = TestServer::spawn(&[]).await;
    let client = reqwest::Client::new();
    srv.insert_user("frozen", UserRole::Customer, true).await;

    let res = login(&client, &srv, "frozen", "Secret123").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Inactive user");
}

#[tokio::test]
async fn registration_validation_and_conflicts() {
    let srv = TestServer::spawn(&[]).await;
    let client = reqwest::Client::new();

    assert_eq!(register(&client, &srv, "alice").await.status(), StatusCode::CREATED);
    let res = register(&client, &srv, "alice").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .post(srv.url("/users/"))
        .json(&json!({"email": "bob@example.com", "username": "bob", "password": "secret123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(
        body["message"],
        "Password must contain at least one uppercase letter"
    );

    let res = client
        .post(srv.url("/users"))
        .json(&json!({"email": "invalid-email", "username": "bob", "password": "Secret123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn staff_accounts_need_a_granting_role() {
    let srv = TestServer::spawn(&[]).await;
    let client = reqwest::Client::new();
    let agent_body = json!({
        "email": "agent@example.com",
        "username": "agent1",
        "password": "Secret123",
        "role": "agent",
    });

    // Anonymous.
    let res = client.post(srv.url("/users")).json(&agent_body).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Customer lacks users.create.
    let customer = srv.insert_user("carol", UserRole::Customer, false).await;
    let res = client
        .post(srv.url("/users"))
        .bearer_auth(mint_jwt(&customer))
        .json(&agent_body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Manager may create agents but not admins.
    let manager = srv.insert_user("mona", UserRole::Manager, false).await;
    let res = client
        .post(srv.url("/users"))
        .bearer_auth(mint_jwt(&manager))
        .json(&json!({
            "email": "root@example.com",
            "username": "root2",
            "password": "Secret123",
            "role": "admin",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(mint_jwt(&manager))
        .json(&agent_body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["role"], "agent");

    // A garbage token is rejected even on the open route.
    let res = client
        .post(srv.url("/users"))
        .bearer_auth("not-a-token")
        .json(&agent_body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_valid_tokens() {
    let srv = TestServer::spawn(&[]).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/users/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["www-authenticate"], "Bearer");

    // Signed with another secret.
    let user = srv.insert_user("alice", UserRole::Customer, false).await;
    let claims = TokenClaims::new(
        TokenKind::Access,
        &user.username,
        user.id,
        user.role,
        Utc::now(),
        ChronoDuration::minutes(10),
    )
    .unwrap();
    let forged = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"someone-else"),
    )
    .unwrap();
    let res = client
        .get(srv.url("/users/me"))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_issues_new_tokens_and_rejects_access_tokens() {
    let srv = TestServer::spawn(&[]).await;
    let client = reqwest::Client::new();
    register(&client, &srv, "alice").await;

    let res = login(&client, &srv, "alice", "Secret123").await;
    let token: serde_json::Value = res.json().await.unwrap();

    let res = client
        .post(srv.url("/auth/refresh"))
        .json(&json!({"refresh_token": token["refresh_token"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let refreshed: serde_json::Value = res.json().await.unwrap();
    let access = refreshed["access_token"].as_str().unwrap();

    let res = client
        .get(srv.url("/users/me"))
        .bearer_auth(access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url("/auth/refresh"))
        .json(&json!({"refresh_token": token["access_token"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_updates() {
    let srv = TestServer::spawn(&[]).await;
    let client = reqwest::Client::new();
    register(&client, &srv, "alice").await;
    let access = access_token(&client, &srv, "alice").await;

    // Prime the cache, then make sure the update is visible.
    client.get(srv.url("/users/me")).bearer_auth(&access).send().await.unwrap();

    let res = client
        .patch(srv.url("/users/me"))
        .bearer_auth(&access)
        .json(&json!({"full_name": "Alice Smith"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let me: serde_json::Value = client
        .get(srv.url("/users/me"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["full_name"], "Alice Smith");

    let res = client
        .patch(srv.url("/users/me"))
        .bearer_auth(&access)
        .json(&json!({"disabled": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .patch(srv.url("/users/me"))
        .bearer_auth(&access)
        .json(&json!({"email": "not-an-email"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn password_reset_flow() {
    let srv = TestServer::spawn(&[]).await;
    let client = reqwest::Client::new();
    register(&client, &srv, "alice").await;
    let before_reset: serde_json::Value = login(&client, &srv, "alice", "Secret123")
        .await
        .json()
        .await
        .unwrap();

    // Unknown addresses look the same from outside.
    let res = client
        .post(srv.url("/auth/password-reset/request"))
        .json(&json!({"email": "ghost@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    assert!(srv.mailer.sent().is_empty());

    let res = client
        .post(srv.url("/auth/password-reset/request"))
        .json(&json!({"email": "Alice@Example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);

    let sent = srv.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice@example.com");
    let reset_token = sent[0]
        .body
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap()
        .to_string();

    let weak = client
        .post(srv.url("/auth/password-reset"))
        .json(&json!({"token": reset_token, "new_password": "short"}))
        .send()
        .await
        .unwrap();
    assert_eq!(weak.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/auth/password-reset"))
        .json(&json!({"token": reset_token, "new_password": "NewSecret456"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert_eq!(
        login(&client, &srv, "alice", "Secret123").await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        login(&client, &srv, "alice", "NewSecret456").await.status(),
        StatusCode::OK
    );

    // Refresh tokens issued before the reset are revoked.
    let res = client
        .post(srv.url("/auth/refresh"))
        .json(&json!({"refresh_token": before_reset["refresh_token"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let after_reset: serde_json::Value = login(&client, &srv, "alice", "NewSecret456")
        .await
        .json()
        .await
        .unwrap();
    let res = client
        .post(srv.url("/auth/refresh"))
        .json(&json!({"refresh_token": after_reset["refresh_token"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Tokens are single-use: the password they were issued against is gone.
    let res = client
        .post(srv.url("/auth/password-reset"))
        .json(&json!({"token": reset_token, "new_password": "Another789X"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Invalid or expired reset token");
}

#[tokio::test]
async fn license_validation_endpoint() {
    let client = reqwest::Client::new();

    let srv = TestServer::spawn(&[]).await;
    let res = client.get(srv.url("/license/validate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "license_invalid");
    assert_eq!(body["message"], "No license key provided");

    let key = valid_license_key(None);
    let srv = TestServer::spawn(&[("LICENSE_KEY", key.as_str())]).await;
    let res = client.get(srv.url("/license/validate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "valid");
    assert_eq!(body["message"], "License is valid");
}

#[tokio::test]
async fn chat_goes_through_license_and_model() {
    let model = MockServer::start_async().await;
    let completion = model
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test");
            then.status(200).json_body(json!({
                "model": "gpt-3.5-turbo",
                "choices": [{"message": {"role": "assistant", "content": "Your order ships tomorrow."}}]
            }));
        })
        .await;

    let key = valid_license_key(None);
    let base = model.url("/v1");
    let srv = TestServer::spawn(&[
        ("LICENSE_KEY", key.as_str()),
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_BASE_URL", base.as_str()),
    ])
    .await;
    let client = reqwest::Client::new();
    let user = srv.insert_user("alice", UserRole::Customer, false).await;

    let res = client
        .post(srv.url("/chat"))
        .bearer_auth(mint_jwt(&user))
        .json(&json!({"message": "Where is my order?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["reply"], "Your order ships tomorrow.");
    assert_eq!(body["model"], "gpt-3.5-turbo");
    completion.assert_async().await;

    let res = client
        .post(srv.url("/chat"))
        .bearer_auth(mint_jwt(&user))
        .json(&json!({"message": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = client
        .delete(srv.url("/chat/history"))
        .bearer_auth(mint_jwt(&user))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn chat_is_refused_without_license_feature_or_model() {
    let client = reqwest::Client::new();

    // No license at all.
    let srv = TestServer::spawn(&[("OPENAI_API_KEY", "sk-test")]).await;
    let user = srv.insert_user("alice", UserRole::Customer, false).await;
    let res = client
        .post(srv.url("/chat"))
        .bearer_auth(mint_jwt(&user))
        .json(&json!({"message": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "feature_disabled");

    // Licensed, but no model configured.
    let key = valid_license_key(Some(json!({"ai_chat": true})));
    let srv = TestServer::spawn(&[("LICENSE_KEY", key.as_str())]).await;
    let user = srv.insert_user("alice", UserRole::Customer, false).await;
    let res = client
        .post(srv.url("/chat"))
        .bearer_auth(mint_jwt(&user))
        .json(&json!({"message": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn chat_requires_an_active_account() {
    let key = valid_license_key(None);
    let srv = TestServer::spawn(&[("LICENSE_KEY", key.as_str()), ("OPENAI_API_KEY", "sk-test")]).await;
    let client = reqwest::Client::new();

    let disabled = srv.insert_user("dora", UserRole::Customer, true).await;
    let token = mint_jwt(&disabled);
    let res = client
        .post(srv.url("/chat"))
        .bearer_auth(&token)
        .json(&json!({"message": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Inactive user");

    let res = client
        .delete(srv.url("/chat/history"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // A token for an account that no longer exists.
    let ghost = UserRecord::from_create(
        &UserCreate {
            email: "ghost@example.com".into(),
            username: "ghost".into(),
            full_name: None,
            disabled: false,
            role: UserRole::Customer,
            password: "Secret123".into(),
        },
        "hash".into(),
        Utc::now(),
    );
    let res = client
        .post(srv.url("/chat"))
        .bearer_auth(mint_jwt(&ghost))
        .json(&json!({"message": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn revoked_license_blocks_chat() {
    let license_server = MockServer::start_async().await;
    let revocation = license_server
        .mock_async(|when, then| {
            when.method(POST).path("/validate");
            then.status(200)
                .json_body(json!({"valid": false, "message": "License revoked"}));
        })
        .await;
    let model = MockServer::start_async().await;
    let completion = model
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({
                "model": "gpt-3.5-turbo",
                "choices": [{"message": {"role": "assistant", "content": "hello"}}]
            }));
        })
        .await;

    let key = valid_license_key(None);
    let validation_url = license_server.url("/validate");
    let base = model.url("/v1");
    let srv = TestServer::spawn(&[
        ("LICENSE_KEY", key.as_str()),
        ("LICENSE_VALIDATION_URL", validation_url.as_str()),
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_BASE_URL", base.as_str()),
    ])
    .await;
    let client = reqwest::Client::new();
    let user = srv.insert_user("alice", UserRole::Customer, false).await;

    let res = client
        .post(srv.url("/chat"))
        .bearer_auth(mint_jwt(&user))
        .json(&json!({"message": "Where is my order?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "feature_disabled");

    let res = client.get(srv.url("/license/validate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "license_invalid");
    assert_eq!(body["message"], "License revoked");

    // The verdict is reused instead of asking the server on every request.
    revocation.assert_hits_async(1).await;
    completion.assert_hits_async(0).await;
}

#[tokio::test]
async fn clients_are_rate_limited() {
    let srv = TestServer::spawn(&[("RATE_LIMIT", "2"), ("RATE_LIMIT_PERIOD", "60")]).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let res = client.get(srv.url("/")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
    let res = client.get(srv.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = res.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!(retry_after >= 1);

    // Health checks are not limited.
    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
