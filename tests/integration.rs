//! Full-stack integration: session, transport and data context against a
//! mock service.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use forceql::orm::{field, Entity, EntityMetadata, WireType};
use forceql::{DataContext, ImpersonationParams, Instance, Session, TrackingState};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Account {
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "Name", default)]
    name: Option<String>,
}

impl Entity for Account {
    fn metadata() -> &'static EntityMetadata {
        static META: std::sync::LazyLock<EntityMetadata> = std::sync::LazyLock::new(|| {
            EntityMetadata::builder("Account")
                .field("id", "Id", WireType::Id)
                .field("name", "Name", WireType::Text)
                .build()
        });
        &META
    }

    fn record_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_record_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

fn session_for(server: &MockServer) -> Arc<Session> {
    Arc::new(Session::new(ImpersonationParams::new(
        "client_id",
        "client_secret",
        "user@mail.com",
        "pw",
        "sectok",
        Instance::Named(server.uri()),
    )))
}

async fn mock_token(server: &MockServer, token: &str, times: Option<u64>) {
    let mock = Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "instance_url": server.uri(),
            "token_type": "Bearer"
        })));
    match times {
        Some(n) => mock.up_to_n_times(n).mount(server).await,
        None => mock.mount(server).await,
    }
}

#[tokio::test]
async fn query_mutate_commit_round_trip() {
    let server = MockServer::start().await;
    mock_token(&server, "tok-1", None).await;

    Mock::given(method("GET"))
        .and(path("/services/data/v62.0/query"))
        .and(query_param(
            "q",
            "SELECT Id, Name FROM Account WHERE Name LIKE '%cool%' LIMIT 1",
        ))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 1,
            "done": true,
            "records": [{
                "attributes": {"type": "Account", "url": "/services/data/v62.0/sobjects/Account/001"},
                "Id": "001",
                "Name": "cool co"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Only the changed field is submitted.
    Mock::given(method("PATCH"))
        .and(path("/services/data/v62.0/sobjects/Account/001"))
        .and(body_json(json!({"Name": "cool co (reviewed)"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = DataContext::new(session_for(&server)).unwrap();

    let account = ctx
        .table::<Account>()
        .filter(field("Name").contains("cool"))
        .first()
        .await
        .unwrap()
        .expect("one account");

    assert_eq!(account.id().as_deref(), Some("001"));
    account.edit(|a| a.name = Some("cool co (reviewed)".into()));
    assert_eq!(account.state(), TrackingState::Modified);

    ctx.commit().await.unwrap();
    assert_eq!(account.state(), TrackingState::Unmodified);
}

#[tokio::test]
async fn insert_flushes_as_create_and_assigns_identity() {
    let server = MockServer::start().await;
    mock_token(&server, "tok-1", None).await;

    Mock::given(method("POST"))
        .and(path("/services/data/v62.0/sobjects/Account"))
        .and(body_json(json!({"Name": "New Co"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "001NEW",
            "success": true,
            "errors": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = DataContext::new(session_for(&server)).unwrap();
    let account = ctx
        .insert(Account {
            name: Some("New Co".into()),
            ..Default::default()
        })
        .unwrap();

    ctx.commit().await.unwrap();
    assert_eq!(account.id().as_deref(), Some("001NEW"));
}

#[tokio::test]
async fn expired_token_triggers_one_reauth_and_retry() {
    let server = MockServer::start().await;
    mock_token(&server, "tok-1", Some(1)).await;
    mock_token(&server, "tok-2", None).await;

    Mock::given(method("GET"))
        .and(path("/services/data/v62.0/query"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!([
            {"message": "Session expired or invalid", "errorCode": "INVALID_SESSION_ID"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/services/data/v62.0/query"))
        .and(header("authorization", "Bearer tok-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 1,
            "done": true,
            "records": [{"Id": "001", "Name": "still here"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = DataContext::new(session_for(&server)).unwrap();
    let accounts = ctx.table::<Account>().load().await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(
        accounts[0].read(|a| a.name.clone()).as_deref(),
        Some("still here")
    );
}

#[tokio::test]
async fn rejected_credentials_surface_as_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "authentication failure"
        })))
        .mount(&server)
        .await;

    let ctx = DataContext::new(session_for(&server)).unwrap();
    let err = ctx.table::<Account>().load().await.unwrap_err();

    match err {
        forceql::orm::Error::Auth(auth_err) => {
            assert!(auth_err.is_grant_rejected());
            assert!(auth_err.to_string().contains("invalid_grant"));
        }
        other => panic!("expected an authentication error, got {other}"),
    }
}
