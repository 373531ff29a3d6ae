use std::collections::HashMap;

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn add_vote_then_list_reflects_the_tally() {
    let app = TestApp::spawn().await;
    app.seed_event("talk-1");

    let count: u64 = app
        .client
        .get(app.url("/vote/talk-1/add"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count, 1);

    let tallies: HashMap<String, u64> = app
        .client
        .get(app.url("/vote"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tallies.get("talk-1"), Some(&1));
}

#[tokio::test]
async fn remove_vote_decrements_the_tally() {
    let app = TestApp::spawn().await;
    app.seed_event("talk-1");

    app.client
        .get(app.url("/vote/talk-1/add"))
        .send()
        .await
        .unwrap();
    app.client
        .get(app.url("/vote/talk-1/add"))
        .send()
        .await
        .unwrap();

    let count: u64 = app
        .client
        .get(app.url("/vote/talk-1/remove"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn removing_from_a_seeded_but_unvoted_event_is_conflict() {
    let app = TestApp::spawn().await;
    app.seed_event("talk-1");

    let resp = app
        .client
        .get(app.url("/vote/talk-1/remove"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn voting_for_an_unseeded_event_is_not_found() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/vote/never-scheduled/add"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}
