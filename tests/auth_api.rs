use actix_web::dev::ServiceResponse;
use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use roleauth_server::auth::Claims;
use roleauth_server::{AppState, Settings};
use serde_json::{json, Value};
use uuid::Uuid;

macro_rules! init_app {
    () => {{
        let config = Settings::new_for_test().expect("Failed to load test config");
        let state = AppState::new(config).await.expect("Failed to build app state");
        test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(roleauth_server::configure),
        )
        .await
    }};
}

fn register_request(body: Value) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(body)
}

fn login_request(username: &str, password: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": username, "password": password }))
}

fn authorized_get(uri: &str, token: &str) -> test::TestRequest {
    test::TestRequest::get()
        .uri(uri)
        .insert_header(("Authorization", format!("Bearer {}", token)))
}

async fn read_token(response: ServiceResponse) -> String {
    assert_eq!(response.status(), 200);
    let body: Value = test::read_body_json(response).await;
    body["token"].as_str().expect("token in login response").to_string()
}

fn signed_token(sub: &str, exp: i64, secret: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp,
        iat: Utc::now().timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[actix_web::test]
async fn test_register_and_login() {
    let app = init_app!();

    let response = register_request(json!({ "username": "alice", "password": "secret1" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 201);
    let user: Value = test::read_body_json(response).await;
    assert_eq!(user["username"], "alice");
    assert_ne!(user["password"], "secret1");
    assert_eq!(user["roles"], json!([]));

    let response = login_request("alice", "secret1").send_request(&app).await;
    assert_eq!(response.status(), 200);
    let body: Value = test::read_body_json(response).await;
    assert!(body["token"].is_string());
}

#[actix_web::test]
async fn test_duplicate_registration() {
    let app = init_app!();
    let body = json!({ "username": "alice", "password": "secret1" });

    assert_eq!(register_request(body.clone()).send_request(&app).await.status(), 201);

    let response = register_request(body).send_request(&app).await;
    assert_eq!(response.status(), 400);
    let error: Value = test::read_body_json(response).await;
    assert!(error["error"].as_str().unwrap().contains("Duplicate"));
}

#[actix_web::test]
async fn test_invalid_registration() {
    let app = init_app!();

    let response = register_request(json!({ "username": "alice", "password": "" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);

    let response = register_request(json!({ "username": "alice" })).send_request(&app).await;
    assert_eq!(response.status(), 400);
    let error: Value = test::read_body_json(response).await;
    assert!(error["error"].is_string());
}

#[actix_web::test]
async fn test_invalid_login_shapes_match() {
    let app = init_app!();
    register_request(json!({ "username": "alice", "password": "secret1" }))
        .send_request(&app)
        .await;

    let wrong_password = login_request("alice", "wrong").send_request(&app).await;
    assert_eq!(wrong_password.status(), 400);
    let wrong_password: Value = test::read_body_json(wrong_password).await;

    let unknown_user = login_request("nonexistent", "wrong").send_request(&app).await;
    assert_eq!(unknown_user.status(), 400);
    let unknown_user: Value = test::read_body_json(unknown_user).await;

    assert_eq!(wrong_password, json!({ "error": "Invalid credentials" }));
    assert_eq!(wrong_password, unknown_user);
}

#[actix_web::test]
async fn test_profile_with_login_token() {
    let app = init_app!();
    let response = register_request(
        json!({ "username": "alice", "password": "secret1", "roles": ["User"] }),
    )
    .send_request(&app)
    .await;
    let created: Value = test::read_body_json(response).await;
    let token = read_token(login_request("alice", "secret1").send_request(&app).await).await;

    let response = authorized_get("/api/user/profile", &token).send_request(&app).await;
    assert_eq!(response.status(), 200);
    let profile: Value = test::read_body_json(response).await;
    assert_eq!(profile["id"], created["id"]);
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["roles"][0]["name"], "User");
}

#[actix_web::test]
async fn test_profile_rejects_missing_and_bad_tokens() {
    let app = init_app!();
    register_request(json!({ "username": "alice", "password": "secret1" }))
        .send_request(&app)
        .await;
    let token = read_token(login_request("alice", "secret1").send_request(&app).await).await;

    let response = test::TestRequest::get()
        .uri("/api/user/profile")
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);

    let (payload, signature) = token.rsplit_once('.').unwrap();
    let swapped = if signature.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{}.{}{}", payload, swapped, &signature[1..]);
    let response = authorized_get("/api/user/profile", &tampered).send_request(&app).await;
    assert_eq!(response.status(), 401);
    let error: Value = test::read_body_json(response).await;
    assert_eq!(error, json!({ "error": "Invalid token" }));
}

#[actix_web::test]
async fn test_expired_token_rejected() {
    let app = init_app!();
    let response = register_request(json!({ "username": "alice", "password": "secret1" }))
        .send_request(&app)
        .await;
    let created: Value = test::read_body_json(response).await;
    let user_id = created["id"].as_str().unwrap();

    let expired = signed_token(
        user_id,
        (Utc::now() - Duration::minutes(1)).timestamp(),
        "test_secret",
    );
    let response = authorized_get("/api/user/profile", &expired).send_request(&app).await;
    assert_eq!(response.status(), 401);
    let error: Value = test::read_body_json(response).await;
    assert_eq!(error, json!({ "error": "Token expired" }));

    let fresh = signed_token(
        user_id,
        (Utc::now() + Duration::minutes(5)).timestamp(),
        "test_secret",
    );
    let response = authorized_get("/api/user/profile", &fresh).send_request(&app).await;
    assert_eq!(response.status(), 200);
}

#[actix_web::test]
async fn test_token_for_unknown_user_rejected() {
    let app = init_app!();
    let token = signed_token(
        &Uuid::new_v4().to_string(),
        (Utc::now() + Duration::hours(1)).timestamp(),
        "test_secret",
    );

    let response = authorized_get("/api/user/profile", &token).send_request(&app).await;
    assert_eq!(response.status(), 401);
}

#[actix_web::test]
async fn test_admin_only_access() {
    let app = init_app!();
    register_request(json!({ "username": "nobody", "password": "pw" })).send_request(&app).await;
    register_request(json!({ "username": "member", "password": "pw", "roles": ["User"] }))
        .send_request(&app)
        .await;
    register_request(json!({ "username": "lower", "password": "pw", "roles": ["admin"] }))
        .send_request(&app)
        .await;
    register_request(json!({ "username": "boss", "password": "pw", "roles": ["User", "Admin"] }))
        .send_request(&app)
        .await;

    for username in ["nobody", "member", "lower"] {
        let token = read_token(login_request(username, "pw").send_request(&app).await).await;
        let response = authorized_get("/api/user/admin-only", &token).send_request(&app).await;
        assert_eq!(response.status(), 403, "{} must be denied", username);
        let error: Value = test::read_body_json(response).await;
        assert_eq!(error, json!({ "error": "Access denied" }));
    }

    let token = read_token(login_request("boss", "pw").send_request(&app).await).await;
    let response = authorized_get("/api/user/admin-only", &token).send_request(&app).await;
    assert_eq!(response.status(), 200);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body, json!({ "message": "Welcome Admin" }));
}

#[actix_web::test]
async fn test_admin_only_requires_token() {
    let app = init_app!();
    let response = test::TestRequest::get()
        .uri("/api/user/admin-only")
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);
}

#[actix_web::test]
async fn test_change_password() {
    let app = init_app!();
    register_request(json!({ "username": "alice", "password": "secret1" }))
        .send_request(&app)
        .await;
    let token = read_token(login_request("alice", "secret1").send_request(&app).await).await;

    let response = test::TestRequest::put()
        .uri("/api/user/password")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "password": "secret2" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);

    assert_eq!(login_request("alice", "secret1").send_request(&app).await.status(), 400);
    assert_eq!(login_request("alice", "secret2").send_request(&app).await.status(), 200);

    let response = test::TestRequest::put()
        .uri("/api/user/password")
        .set_json(json!({ "password": "secret3" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);
}
