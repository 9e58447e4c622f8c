// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API client and session tests against a mock server.

use exam_prep_tracker::client::{
    ClientError, MemoryTokenStore, Session, TokenStore, TrackerClient,
};
use exam_prep_tracker::models::{Subject, TopicStatus, Unit};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_with_token(
    server: &MockServer,
    token: Option<&str>,
) -> (TrackerClient, Arc<MemoryTokenStore>) {
    let store = Arc::new(match token {
        Some(t) => MemoryTokenStore::with_token(t),
        None => MemoryTokenStore::new(),
    });
    (TrackerClient::new(server.uri(), store.clone()), store)
}

fn status_updated() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "message": "Status updated" }))
}

#[tokio::test]
async fn test_bearer_token_attached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subjects"))
        .and(header("authorization", "Bearer abc123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": 1, "name": "Math" }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_with_token(&server, Some("abc123"));
    let subjects = client.list_subjects().await.unwrap();

    assert_eq!(
        subjects,
        vec![Subject {
            id: 1,
            name: "Math".to_string()
        }]
    );
}

#[tokio::test]
async fn test_unauthorized_clears_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subjects"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid_token" })))
        .mount(&server)
        .await;

    let (client, store) = client_with_token(&server, Some("stale"));
    let err = client.list_subjects().await.unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized));
    assert_eq!(err.status(), Some(401));
    assert_eq!(store.get(), None);
    assert!(!client.is_logged_in());
}

#[tokio::test]
async fn test_api_error_details_surface() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/subjects"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "bad_request",
            "details": "Subject name is required"
        })))
        .mount(&server)
        .await;

    let (client, store) = client_with_token(&server, Some("tok"));
    let err = client.create_subject("x").await.unwrap_err();

    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Subject name is required");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Only 401 drops the token
    assert_eq!(store.get().as_deref(), Some("tok"));
}

#[tokio::test]
async fn test_non_json_error_body_used_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subjects"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let (client, _) = client_with_token(&server, Some("tok"));
    let err = client.list_subjects().await.unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert!(err.to_string().contains("Bad Gateway"));
}

#[tokio::test]
async fn test_login_stores_token_and_logout_clears() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "email": "ada@example.com", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "fresh" })))
        .mount(&server)
        .await;

    let (client, store) = client_with_token(&server, None);
    client.login("ada@example.com", "pw").await.unwrap();
    assert_eq!(store.get().as_deref(), Some("fresh"));

    client.logout().unwrap();
    assert_eq!(store.get(), None);
}

#[tokio::test]
async fn test_base_url_trailing_slash_trimmed() {
    let store = Arc::new(MemoryTokenStore::new());
    let client = TrackerClient::new("http://localhost:5000/", store);
    assert_eq!(client.base_url(), "http://localhost:5000");
}

#[tokio::test]
async fn test_session_blank_input_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _) = client_with_token(&server, Some("tok"));
    let mut session = Session::new(client);

    assert_eq!(session.add_subject("   ").await.unwrap(), None);
    // No subject or unit selected yet
    assert_eq!(session.add_unit("Algebra").await.unwrap(), None);
    assert_eq!(session.add_topic("Vectors").await.unwrap(), None);
    assert_eq!(session.add_note("remember").await.unwrap(), None);
}

#[tokio::test]
async fn test_session_toggle_topic_refreshes_progress() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/units/5/topics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 10, "name": "Limits", "status": "Not Started" },
            { "id": 11, "name": "Series", "status": "Completed" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/units/5/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/topics/10/status"))
        .and(body_json(json!({ "status": "Completed" })))
        .respond_with(status_updated())
        .expect(1)
        .mount(&server)
        .await;
    // First progress fetch on selection, second after the toggle
    Mock::given(method("GET"))
        .and(path("/units/5/progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "progress": 50 })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/units/5/progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "progress": 100 })))
        .mount(&server)
        .await;

    let (client, _) = client_with_token(&server, Some("tok"));
    let mut session = Session::new(client);
    session
        .select_unit(Unit {
            id: 5,
            name: "Calculus I".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(session.unit_progress().percent(), 50);
    assert!(!session.unit_complete());

    let status = session.toggle_topic(10).await.unwrap();
    assert_eq!(status, Some(TopicStatus::Completed));
    assert_eq!(session.unit_progress().percent(), 100);
    assert_eq!(session.local_progress().percent(), 100);
    assert!(session.unit_complete());

    // Unknown topic is a no-op
    assert_eq!(session.toggle_topic(999).await.unwrap(), None);
}

#[tokio::test]
async fn test_session_set_unit_complete_failure_leaves_state() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/units/5/topics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 10, "name": "Limits", "status": "Not Started" },
            { "id": 11, "name": "Series", "status": "Not Started" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/units/5/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/units/5/progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "progress": 0 })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/topics/10/status"))
        .respond_with(status_updated())
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/topics/11/status"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "internal_error" })),
        )
        .mount(&server)
        .await;

    let (client, _) = client_with_token(&server, Some("tok"));
    let mut session = Session::new(client);
    session
        .select_unit(Unit {
            id: 5,
            name: "Calculus I".to_string(),
        })
        .await
        .unwrap();

    let err = session.set_unit_complete(true).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(session
        .topics()
        .iter()
        .all(|t| t.status == TopicStatus::NotStarted));
}

/// Subject 1 with unit 5 (topics 10, 11) and unit 6 (topic 20).
async fn mount_two_unit_subject(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/subjects/1/units"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 5,
                "name": "Unit A",
                "topics": [
                    { "id": 10, "name": "Limits", "status": "Not Started" },
                    { "id": 11, "name": "Series", "status": "Not Started" }
                ]
            },
            {
                "id": 6,
                "name": "Unit B",
                "topics": [{ "id": 20, "name": "Integrals", "status": "Not Started" }]
            }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/subjects/1/progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "progress": 0 })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/units/5/topics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 10, "name": "Limits", "status": "Not Started" },
            { "id": 11, "name": "Series", "status": "Not Started" }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/units/5/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/units/5/progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "progress": 0 })))
        .mount(server)
        .await;
}

fn subject(id: i64, name: &str) -> Subject {
    Subject {
        id,
        name: name.to_string(),
    }
}

#[tokio::test]
async fn test_session_set_unit_complete_only_touches_selected_unit() {
    let server = MockServer::start().await;
    mount_two_unit_subject(&server).await;
    for topic_id in [10, 11] {
        Mock::given(method("PUT"))
            .and(path(format!("/topics/{}/status", topic_id)))
            .respond_with(status_updated())
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("PUT"))
        .and(path("/topics/20/status"))
        .respond_with(status_updated())
        .expect(0)
        .mount(&server)
        .await;

    let (client, _) = client_with_token(&server, Some("tok"));
    let mut session = Session::new(client);
    session.select_subject(subject(1, "Calculus")).await.unwrap();
    let unit_a = session.units()[0].unit();
    session.select_unit(unit_a).await.unwrap();

    session.set_unit_complete(true).await.unwrap();

    assert!(session.unit_complete());
    assert!(session.units()[0]
        .topics
        .iter()
        .all(|t| t.status == TopicStatus::Completed));
    assert_eq!(session.units()[1].topics[0].status, TopicStatus::NotStarted);
}

#[tokio::test]
async fn test_session_failed_subject_load_keeps_new_selection() {
    let server = MockServer::start().await;
    mount_two_unit_subject(&server).await;
    Mock::given(method("GET"))
        .and(path("/subjects/2/units"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "database_error" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/subjects/2/progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "progress": 0 })))
        .mount(&server)
        .await;

    let (client, _) = client_with_token(&server, Some("tok"));
    let mut session = Session::new(client);
    session.select_subject(subject(1, "Calculus")).await.unwrap();
    assert_eq!(session.units().len(), 2);

    let err = session.select_subject(subject(2, "Biology")).await.unwrap_err();
    assert_eq!(err.status(), Some(500));

    assert_eq!(session.selected_subject(), Some(&subject(2, "Biology")));
    assert!(session.units().is_empty());
    assert!(session.selected_unit().is_none());
}

#[tokio::test]
async fn test_session_failed_unit_load_keeps_new_selection() {
    let server = MockServer::start().await;
    mount_two_unit_subject(&server).await;
    Mock::given(method("GET"))
        .and(path("/units/6/topics"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "database_error" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/units/6/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/units/6/progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "progress": 0 })))
        .mount(&server)
        .await;

    let (client, _) = client_with_token(&server, Some("tok"));
    let mut session = Session::new(client);
    session.select_subject(subject(1, "Calculus")).await.unwrap();
    let unit_a = session.units()[0].unit();
    let unit_b = session.units()[1].unit();
    session.select_unit(unit_a).await.unwrap();
    assert_eq!(session.topics().len(), 2);

    assert!(session.select_unit(unit_b.clone()).await.is_err());
    assert_eq!(session.selected_unit(), Some(&unit_b));
    assert!(session.topics().is_empty());
    assert!(session.notes().is_empty());
}
