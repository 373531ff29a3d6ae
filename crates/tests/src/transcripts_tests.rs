use serde_json::Value;

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn transcript_list_is_empty_when_no_rooms_have_recorded() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/transcript_list"))
        .json(&serde_json::json!({ "key": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let rooms: Vec<Value> = resp.json().await.unwrap();
    assert!(rooms.is_empty());
}

#[tokio::test]
async fn fetching_transcript_for_unknown_room_is_not_found() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/room/does-not-exist/transcript/en"))
        .json(&serde_json::json!({ "key": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn room_list_always_includes_the_dev_room() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/room_list")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    let rooms = body["rooms"].as_array().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["id"], app.settings.schedule.dev_room_id);
    assert_eq!(rooms[0]["active"], false);
}

#[tokio::test]
async fn closing_a_room_without_admin_power_is_forbidden() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/room/talk-1/close"))
        .json(&serde_json::json!({ "key": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn closing_a_room_with_host_key_is_forbidden() {
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

    let resp = app
        .client
        .post(app.url("/room/does-not-exist/close"))
        .json(&serde_json::json!({ "key": key }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn closing_a_room_with_admin_key_but_unknown_room_is_not_found() {
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
        .post(app.url("/room/does-not-exist/close"))
        .json(&serde_json::json!({ "key": key }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}
