//! Integration tests per gli endpoints di autenticazione
//!
//! Test per:
//! - POST /api/auth/register
//! - POST /api/auth/login
//! - POST /api/auth/student-login
//! - POST /api/auth/coordinator-login
//! - GET /api/auth/me
//! - POST /api/auth/logout
//!
//! I test usano il backend in memoria: ogni test parte da uno stato vuoto.

mod common;

#[cfg(test)]
mod auth_tests {
    use super::common::*;
    use axum::http::{HeaderValue, StatusCode, header};
    use naf_contabil::entities::Role;
    use serde_json::{Value, json};

    // ============================================================
    // Test per POST /api/auth/register - register_user
    // ============================================================

    #[tokio::test]
    async fn test_register_creates_client() {
        let state = create_test_state();
        let server = create_test_server(state.clone());

        let response = server
            .post("/api/auth/register")
            .json(&json!({
                "name": "Maria Souza",
                "email": "Maria@Example.com",
                "password": "Senha12345"
            }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["email"], "maria@example.com");
        assert_eq!(body["role"], "Client");
        assert_eq!(body["active"], true);
        assert!(body.get("password").is_none(), "Password must never be returned");
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflict() {
        let state = create_test_state();
        seed_user(&state, "Ana", "ana@example.com", Role::Client).await;
        let server = create_test_server(state.clone());

        let response = server
            .post("/api/auth/register")
            .json(&json!({
                "name": "Outra Ana",
                "email": "ANA@example.com",
                "password": "Senha12345"
            }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_register_validation_errors() {
        let state = create_test_state();
        let server = create_test_server(state.clone());

        let bad_email = server
            .post("/api/auth/register")
            .json(&json!({ "name": "Maria", "email": "maria", "password": "Senha12345" }))
            .await;
        bad_email.assert_status(StatusCode::BAD_REQUEST);

        let short_password = server
            .post("/api/auth/register")
            .json(&json!({ "name": "Maria", "email": "maria@example.com", "password": "123" }))
            .await;
        short_password.assert_status(StatusCode::BAD_REQUEST);

        let missing_name = server
            .post("/api/auth/register")
            .json(&json!({ "email": "maria@example.com", "password": "Senha12345" }))
            .await;
        missing_name.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = missing_name.json();
        assert!(body["error"].is_string());
    }

    // ============================================================
    // Test per POST /api/auth/login - login_user
    // ============================================================

    #[tokio::test]
    async fn test_login_success_sets_cookie_and_header() {
        let state = create_test_state();
        let user = seed_user(&state, "João", "joao@example.com", Role::Client).await;
        let server = create_test_server(state.clone());

        let response = server
            .post("/api/auth/login")
            .json(&json!({ "email": "joao@example.com", "password": PASSWORD }))
            .await;

        response.assert_status_ok();

        let headers = response.headers();
        let cookie = headers
            .get("set-cookie")
            .expect("Set-Cookie header should be present")
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("token="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=86400"));

        let auth_header = headers
            .get("authorization")
            .expect("Authorization header should be present")
            .to_str()
            .unwrap();
        assert!(auth_header.starts_with("Bearer "));

        let body: Value = response.json();
        assert_eq!(body["user"]["user_id"], user.user_id);
        assert_eq!(format!("Bearer {}", body["token"].as_str().unwrap()), auth_header);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let state = create_test_state();
        seed_user(&state, "João", "joao@example.com", Role::Client).await;
        let server = create_test_server(state.clone());

        let response = server
            .post("/api/auth/login")
            .json(&json!({ "email": "joao@example.com", "password": "errada123" }))
            .await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_login_nonexistent_user() {
        let state = create_test_state();
        let server = create_test_server(state.clone());

        let response = server
            .post("/api/auth/login")
            .json(&json!({ "email": "ninguem@example.com", "password": PASSWORD }))
            .await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_login_deactivated_user() {
        let state = create_test_state();
        let coordinator = seed_user(&state, "Coord", "coord@naf.br", Role::Coordinator).await;
        let user = seed_user(&state, "João", "joao@example.com", Role::Client).await;
        let server = create_test_server(state.clone());

        server
            .delete(&format!("/api/users/{}", user.user_id))
            .authorization_bearer(create_test_jwt(&coordinator))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let response = server
            .post("/api/auth/login")
            .json(&json!({ "email": "joao@example.com", "password": PASSWORD }))
            .await;
        response.assert_status_unauthorized();
    }

    // ============================================================
    // Test per POST /api/auth/student-login e coordinator-login
    // ============================================================

    #[tokio::test]
    async fn test_student_login_by_registration() {
        let state = create_test_state();
        seed_user_with_registration(
            &state,
            "Pedro",
            "pedro@naf.br",
            Role::Student,
            Some("2024001".to_string()),
        )
        .await;
        let server = create_test_server(state.clone());

        let response = server
            .post("/api/auth/student-login")
            .json(&json!({ "registration": "2024001", "password": PASSWORD }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["user"]["role"], "Student");

        let wrong = server
            .post("/api/auth/student-login")
            .json(&json!({ "registration": "2024999", "password": PASSWORD }))
            .await;
        wrong.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_coordinator_login_rejects_other_roles() {
        let state = create_test_state();
        seed_user(&state, "Coord", "coord@naf.br", Role::Coordinator).await;
        seed_user(&state, "Prof", "prof@naf.br", Role::Teacher).await;
        let server = create_test_server(state.clone());

        server
            .post("/api/auth/coordinator-login")
            .json(&json!({ "email": "coord@naf.br", "password": PASSWORD }))
            .await
            .assert_status_ok();

        server
            .post("/api/auth/coordinator-login")
            .json(&json!({ "email": "prof@naf.br", "password": PASSWORD }))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    // ============================================================
    // Test per GET /api/auth/me e POST /api/auth/logout
    // ============================================================

    #[tokio::test]
    async fn test_me_with_bearer_and_cookie() {
        let state = create_test_state();
        let user = seed_user(&state, "Ana", "ana@example.com", Role::Client).await;
        let server = create_test_server(state.clone());
        let token = create_test_jwt(&user);

        let response = server.get("/api/auth/me").authorization_bearer(&token).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["email"], "ana@example.com");

        let response = server
            .get("/api/auth/me")
            .add_header(
                header::COOKIE,
                HeaderValue::from_str(&format!("token={token}")).unwrap(),
            )
            .await;
        response.assert_status_ok();
    }

    #[tokio::test]
    async fn test_me_without_or_with_invalid_token() {
        let state = create_test_state();
        let server = create_test_server(state.clone());

        server.get("/api/auth/me").await.assert_status_unauthorized();
        server
            .get("/api/auth/me")
            .authorization_bearer("not-a-jwt")
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let state = create_test_state();
        let server = create_test_server(state.clone());

        let response = server.post("/api/auth/logout").await;
        response.assert_status_ok();
        let cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let state = create_test_state();
        let server = create_test_server(state);

        let response = server.get("/").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "NAF Contábil API is running");
    }
}
