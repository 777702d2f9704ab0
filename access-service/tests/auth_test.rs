//! Signup, verification, login/logout and password recovery over HTTP.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::Duration;
use common::{TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_signup_verify_login_flow() {
    let app = TestApp::spawn().await;

    let res = app.signup("New.User@Example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.message(), "User created successfully. Please verify your email.");

    let token = app.verification_token("new.user@example.com").expect("verification email sent");

    let res = app.login("new.user@example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.message(), "Please verify your email.");

    let res = app.get(&format!("/auth/verify-email?token={}", token), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Email verified successfully.");

    let res = app.login("NEW.USER@example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Logged in successfully");
    assert!(res.body["role"].is_null());
    assert!(res.body["accessToken"].as_str().is_some_and(|t| !t.is_empty()));

    let cookie = res.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("accessToken="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/"));
}

#[tokio::test]
async fn test_signup_rejections() {
    let app = TestApp::spawn().await;

    let res = app
        .post(
            "/auth/signup",
            None,
            json!({"email": "a@x.com", "name": "A", "password": "weak", "repeatPassword": "other"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Passwords do not match.");

    let res = app.signup("a@x.com", "alllowercase1!").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.message().starts_with("Password must contain at least 8 characters"));

    let res = app
        .post(
            "/auth/signup",
            None,
            json!({"email": "not-an-email", "name": "A", "password": PASSWORD, "repeatPassword": PASSWORD}),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid request body.");

    let res = app.post("/auth/signup", None, json!({"email": "a@x.com"})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signup_over_unverified_account_replaces_it() {
    let app = TestApp::spawn().await;

    app.signup("dup@x.com", PASSWORD).await;
    let first = app.verification_token("dup@x.com").unwrap();
    app.signup("dup@x.com", "An0ther!Pass").await;
    let second = app.verification_token("dup@x.com").unwrap();
    assert_ne!(first, second);

    let res = app.get(&format!("/auth/verify-email?token={}", first), None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid or expired token.");

    let res = app.get(&format!("/auth/verify-email?token={}", second), None).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.login("dup@x.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    let res = app.login("dup@x.com", "An0ther!Pass").await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.signup("dup@x.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Email already registered and verified.");
}

#[tokio::test]
async fn test_signup_succeeds_when_mail_delivery_fails() {
    let app = TestApp::spawn().await;
    app.mail.set_failing(true);

    let res = app.signup("offline@x.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_verification_token_is_single_use() {
    let app = TestApp::spawn().await;

    let res = app.get("/auth/verify-email", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Token is required.");

    app.signup("once@x.com", PASSWORD).await;
    let token = app.verification_token("once@x.com").unwrap();
    let uri = format!("/auth/verify-email?token={}", token);

    assert_eq!(app.get(&uri, None).await.status, StatusCode::OK);
    let res = app.get(&uri, None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid or expired token.");
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_share_a_message() {
    let app = TestApp::spawn().await;
    app.create_user("known@x.com", None).await;

    let wrong = app.login("known@x.com", "Wr0ng!Pass").await;
    let unknown = app.login("ghost@x.com", PASSWORD).await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.message(), "Invalid email or password.");
    assert_eq!(wrong.message(), unknown.message());
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::spawn().await;
    app.create_user("forgetful@x.com", None).await;

    let res = app.post("/auth/forgot-password", None, json!({"email": "nobody@x.com"})).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.message(), "No user found with that email address.");

    let res = app.post("/auth/forgot-password", None, json!({"email": "forgetful@x.com"})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Password reset email sent.");
    let token = app.reset_token("forgetful@x.com").unwrap();

    let res = app
        .post(
            "/auth/reset-password",
            None,
            json!({"token": token, "newPassword": "N3w!Password", "confirmNewPassword": "N3w!Passw0rd"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Passwords do not match.");

    let reset = json!({"token": token, "newPassword": "N3w!Password", "confirmNewPassword": "N3w!Password"});
    let res = app.post("/auth/reset-password", None, reset.clone()).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Password reset successfully.");

    assert_eq!(app.login("forgetful@x.com", PASSWORD).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.login("forgetful@x.com", "N3w!Password").await.status, StatusCode::OK);

    let res = app.post("/auth/reset-password", None, reset).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid or expired token.");
}

#[tokio::test]
async fn test_reset_token_expires_after_one_hour() {
    let app = TestApp::spawn().await;
    app.create_user("late@x.com", None).await;

    app.post("/auth/forgot-password", None, json!({"email": "late@x.com"})).await;
    let token = app.reset_token("late@x.com").unwrap();

    app.clock.advance(Duration::hours(1) + Duration::seconds(1));
    let res = app
        .post(
            "/auth/reset-password",
            None,
            json!({"token": token, "newPassword": "N3w!Password", "confirmNewPassword": "N3w!Password"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.message(), "Invalid or expired token.");
    assert_eq!(app.login("late@x.com", PASSWORD).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_requires_a_credential_and_clears_cookie() {
    let app = TestApp::spawn().await;

    let res = app.request(Method::POST, "/auth/logout", None, None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "Not authenticated");

    let (_, token) = app.user_with_session("bye@x.com", None).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/logout")
        .header(header::COOKIE, format!("accessToken={}", token))
        .body(Body::empty())
        .unwrap();
    let res = app.send(request).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Logged out successfully");

    let cookie = res.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("accessToken="));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_superseded_bearer_credential_cannot_log_out() {
    let app = TestApp::spawn().await;
    let (_, first) = app.user_with_session("stale@x.com", None).await;
    let second = app.login_token("stale@x.com", PASSWORD).await;

    let res = app.request(Method::POST, "/auth/logout", Some(&first), None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.message(), "Not authenticated");

    let res = app.request(Method::POST, "/auth/logout", Some(&second), None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.message(), "Logged out successfully");
}
