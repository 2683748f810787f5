mod common;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde_json::json;

#[tokio::test]
async fn content_is_required() {
    let app = common::spawn_app().await;
    let (alice, _) = common::create_user(&app, "alice", "user").await;
    let ticket_id = common::create_ticket(&app, &alice, "Mouse double-clicks").await;

    for body in [json!({}), json!({ "content": "   " })] {
        let (status, response) = common::post(
            &app,
            &format!("/api/tickets/{ticket_id}/comments"),
            Some(&alice),
            body,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["message"], "Comment content is required");
    }
}

#[tokio::test]
async fn internal_flag_is_coerced_for_regular_users() {
    let app = common::spawn_app().await;
    let (alice, _) = common::create_user(&app, "alice", "user").await;
    let (agent, _) = common::create_user(&app, "carol", "agent").await;
    let ticket_id = common::create_ticket(&app, &alice, "Mouse double-clicks").await;
    let path = format!("/api/tickets/{ticket_id}/comments");

    let (status, body) = common::post(
        &app,
        &path,
        Some(&alice),
        json!({ "content": "happens every day", "is_internal": true }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Comment added successfully");
    assert_eq!(body["comment"]["is_internal"], false);
    assert_eq!(body["comment"]["author"]["username"], "alice");

    let (_, body) = common::post(
        &app,
        &path,
        Some(&agent),
        json!({ "content": "known hardware fault, batch 7", "is_internal": true }),
    )
    .await;
    assert_eq!(body["comment"]["is_internal"], true);
    assert_eq!(body["comment"]["author"]["role"], "agent");
}

#[tokio::test]
async fn internal_comments_are_hidden_from_regular_users() {
    let app = common::spawn_app().await;
    let (alice, _) = common::create_user(&app, "alice", "user").await;
    let (agent, _) = common::create_user(&app, "carol", "agent").await;
    let ticket_id = common::create_ticket(&app, &alice, "Mouse double-clicks").await;
    let path = format!("/api/tickets/{ticket_id}/comments");

    common::post(&app, &path, Some(&alice), json!({ "content": "first" })).await;
    common::post(
        &app,
        &path,
        Some(&agent),
        json!({ "content": "internal note", "is_internal": true }),
    )
    .await;
    common::post(&app, &path, Some(&agent), json!({ "content": "public reply" })).await;

    let (_, body) = common::get(&app, &path, Some(&alice)).await;
    let visible: Vec<&str> = body["comments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["content"].as_str().unwrap())
        .collect();
    assert_eq!(visible, vec!["first", "public reply"]);

    // Staff see the full thread in creation order
    let (_, body) = common::get(&app, &path, Some(&agent)).await;
    let all: Vec<&str> = body["comments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["content"].as_str().unwrap())
        .collect();
    assert_eq!(all, vec!["first", "internal note", "public reply"]);

    // The detail view applies the same filtering
    let (_, body) = common::get(&app, &format!("/api/tickets/{ticket_id}"), Some(&alice)).await;
    assert_eq!(body["ticket"]["comments"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn commenting_bumps_the_ticket() {
    let app = common::spawn_app().await;
    let (alice, _) = common::create_user(&app, "alice", "user").await;
    let ticket_id = common::create_ticket(&app, &alice, "Mouse double-clicks").await;

    let (_, body) = common::get(&app, &format!("/api/tickets/{ticket_id}"), Some(&alice)).await;
    let before: DateTime<Utc> = body["ticket"]["updated_at"].as_str().unwrap().parse().unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    common::post(
        &app,
        &format!("/api/tickets/{ticket_id}/comments"),
        Some(&alice),
        json!({ "content": "any update?" }),
    )
    .await;

    let (_, body) = common::get(&app, &format!("/api/tickets/{ticket_id}"), Some(&alice)).await;
    let after: DateTime<Utc> = body["ticket"]["updated_at"].as_str().unwrap().parse().unwrap();
    assert!(after > before);
}

#[tokio::test]
async fn creator_is_notified_of_foreign_public_comments_only() {
    let app = common::spawn_app().await;
    let (alice, _) = common::create_user(&app, "alice", "user").await;
    let (agent, _) = common::create_user(&app, "carol", "agent").await;
    let ticket_id = common::create_ticket(&app, &alice, "Mouse double-clicks").await;
    let path = format!("/api/tickets/{ticket_id}/comments");

    // Own comment: no notification
    let before = app.outbox_len();
    common::post(&app, &path, Some(&alice), json!({ "content": "me again" })).await;
    assert_eq!(app.outbox_len(), before);

    // Internal note: no notification
    common::post(
        &app,
        &path,
        Some(&agent),
        json!({ "content": "internal", "is_internal": true }),
    )
    .await;
    assert_eq!(app.outbox_len(), before);

    // Foreign public comment: creator gets mail
    common::post(&app, &path, Some(&agent), json!({ "content": "try a new mouse" })).await;
    assert_eq!(app.outbox_len(), before + 1);
    let mail = app.last_mail();
    assert_eq!(mail.to, "alice@example.com");
    assert_eq!(mail.subject, "New Comment on Ticket: Mouse double-clicks");
    assert!(mail.body.contains("Comment by: carol"));
    assert!(mail.body.contains("try a new mouse"));
}

#[tokio::test]
async fn comment_access_follows_ticket_visibility() {
    let app = common::spawn_app().await;
    let (alice, _) = common::create_user(&app, "alice", "user").await;
    let (bob, _) = common::create_user(&app, "bob", "user").await;
    let ticket_id = common::create_ticket(&app, &alice, "Private matter").await;

    let (status, body) = common::post(
        &app,
        &format!("/api/tickets/{ticket_id}/comments"),
        Some(&bob),
        json!({ "content": "let me in" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied");

    let (status, _) =
        common::get(&app, &format!("/api/tickets/{ticket_id}/comments"), Some(&bob)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
