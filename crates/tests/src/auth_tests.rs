use serde_json::Value;

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn health_check_returns_ok() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn login_with_host_password_grants_host_power() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/login"))
        .json(&serde_json::json!({ "password": "host-pw" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["power"], "host");
    assert!(json["key"].is_string());
}

#[tokio::test]
async fn login_with_admin_password_grants_admin_power() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/login"))
        .json(&serde_json::json!({ "password": "admin-pw" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["power"], "admin");
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/login"))
        .json(&serde_json::json!({ "password": "nope" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn login_requesting_role_above_granted_power_is_forbidden() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/login"))
        .json(&serde_json::json!({ "password": "host-pw", "role": "admin" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn validate_reports_whether_key_meets_required_power() {
    let app = TestApp::spawn().await;

    let login: Value = app
        .client
        .post(app.url("/login"))
        .json(&serde_json::json!({ "password": "host-pw" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let key = login["key"].as_str().unwrap();

    let resp: Value = app
        .client
        .post(app.url("/validate"))
        .json(&serde_json::json!({ "key": key, "required": "host" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["valid"], true);

    let resp: Value = app
        .client
        .post(app.url("/validate"))
        .json(&serde_json::json!({ "key": key, "required": "admin" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["valid"], false);
}

#[tokio::test]
async fn auth_reports_the_power_granted_to_a_key() {
    let app = TestApp::spawn().await;

    let login: Value = app
        .client
        .post(app.url("/login"))
        .json(&serde_json::json!({ "password": "admin-pw" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let key = login["key"].as_str().unwrap();

    let resp = app
        .client
        .post(app.url("/auth"))
        .json(&serde_json::json!({ "key": key }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "valid");
    assert_eq!(body["power"], "admin");
}

#[tokio::test]
async fn auth_fails_for_an_unknown_key() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/auth"))
        .json(&serde_json::json!({ "key": "does-not-exist" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 503);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn validate_rejects_unknown_key() {
    let app = TestApp::spawn().await;

    let resp: Value = app
        .client
        .post(app.url("/validate"))
        .json(&serde_json::json!({ "key": "does-not-exist", "required": "host" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["valid"], false);
}
