//! Session tests against a scripted in-memory transport.

mod common;

use cloudsite_link::transport::TransportResponse;
use cloudsite_link::{
    GetStatement, LinkError, Method, Statement, StatementState, TransportError,
};
use common::{
    initialized_session, schema_document, session_with, MockTransport, ANN_EID, PERSONS_ID,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn ann() -> serde_json::Value {
    json!({"eid": ANN_EID, "firstName": "Ann", "pk": "A", "ck": "B"})
}

// ==================== Init ====================

#[tokio::test]
async fn test_init_loads_schema() {
    let (session, transport) = initialized_session().await;
    assert!(session.is_initialized());
    assert_eq!(session.application_names().unwrap(), vec!["crm"]);

    let init = transport.last_request();
    assert_eq!(init.method, Method::Get);
    assert_eq!(init.url, "https://site.example.com/api/v1/init");
    assert_eq!(init.header("customer-id"), Some(common::CUSTOMER_ID));
    assert_eq!(init.header("site-id"), Some(common::SITE_ID));
    assert_eq!(init.header("accept"), Some("application/json"));
    assert_eq!(init.header("Authorization"), None);
}

#[tokio::test]
async fn test_init_requires_200() {
    let transport = MockTransport::new();
    transport.respond(204, schema_document());
    let session = session_with(Arc::clone(&transport));

    let err = session.init().await.unwrap_err();
    assert_eq!(err.status_code(), Some(204));
    assert!(!session.is_initialized());
}

#[tokio::test]
async fn test_init_rejects_malformed_schema() {
    let transport = MockTransport::new();
    transport.respond(200, json!({"crm": {"resources": [{"name": "persons"}]}}));
    let session = session_with(Arc::clone(&transport));

    let err = session.init().await.unwrap_err();
    assert!(matches!(err, LinkError::SchemaParse(_)), "got {:?}", err);
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_unreachable_site_fails_init() {
    let transport = MockTransport::new();
    transport.fail(TransportError::Unreachable("connection refused".into()));
    let session = session_with(Arc::clone(&transport));

    let err = session.init().await.unwrap_err();
    assert!(matches!(err, LinkError::Execution { status: None, .. }));
}

#[tokio::test]
async fn test_execute_before_init() {
    let transport = MockTransport::new();
    let session = session_with(Arc::clone(&transport));

    // resources are only reachable through the schema, so build one by hand
    let model = cloudsite_link::schema::load(&schema_document()).unwrap();
    let persons = model.resource("crm", "persons").unwrap();
    let mut read = persons.get();

    assert!(matches!(
        session.execute(&mut read).await,
        Err(LinkError::NotInitialized(_))
    ));
    assert!(matches!(
        session.execute_async(persons.get()),
        Err(LinkError::NotInitialized(_))
    ));
    assert_eq!(transport.request_count(), 0);
    assert_eq!(read.state(), StatementState::Building);
}

// ==================== Execution ====================

#[tokio::test]
async fn test_create_persons_scenario() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();

    let mut create = persons.create();
    create
        .with_param("firstName", "Ann")
        .unwrap()
        .with_param("pk", "A")
        .unwrap()
        .with_param("ck", "B")
        .unwrap();

    transport.respond(201, ann());
    let mut result = session.execute(&mut create).await.unwrap();

    assert_eq!(transport.request_count(), 2);
    let request = transport.last_request();
    assert_eq!(request.method, Method::Post);
    assert_eq!(
        request.url,
        format!("https://site.example.com/api/v1/resources/{}", PERSONS_ID)
    );
    assert_eq!(request.body, Some(json!({"firstName": "Ann", "pk": "A", "ck": "B"})));
    assert!(request.query.is_empty());
    assert_eq!(request.header("Authorization"), Some("site-key"));

    assert!(result.was_applied());
    assert_eq!(result.remaining(), 1);
    let row = result.one().unwrap();
    assert_eq!(row.get_string("firstName").unwrap().as_deref(), Some("Ann"));
    assert!(result.is_exhausted());
    assert_eq!(create.state(), StatementState::Executed);
}

#[tokio::test]
async fn test_execute_twice_needs_reset() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();

    let mut create = persons.create();
    create.with_param("firstName", "Ann").unwrap();
    transport.respond(201, ann());
    session.execute(&mut create).await.unwrap();

    assert!(matches!(
        session.execute(&mut create).await,
        Err(LinkError::AlreadyExecuted)
    ));
    assert!(matches!(
        create.with_param("age", 31),
        Err(LinkError::AlreadyExecuted)
    ));
    assert_eq!(transport.request_count(), 2);

    create.reset();
    create.with_param("firstName", "Bob").unwrap();
    transport.respond(201, json!({"firstName": "Bob"}));
    let mut result = session.execute(&mut create).await.unwrap();
    assert_eq!(
        result.one().unwrap().get_string("firstName").unwrap().as_deref(),
        Some("Bob")
    );
    assert_eq!(transport.last_request().body, Some(json!({"firstName": "Bob"})));
}

async fn assert_single_shot<S: Statement>(
    session: &cloudsite_link::Session,
    transport: &MockTransport,
    statement: &mut S,
    response: serde_json::Value,
) {
    transport.respond(200, response);
    session.execute(statement).await.unwrap();
    let sent = transport.request_count();

    assert!(matches!(
        session.execute(statement).await,
        Err(LinkError::AlreadyExecuted)
    ));
    assert_eq!(transport.request_count(), sent);

    statement.reset();
    assert_eq!(statement.state(), StatementState::Building);
}

#[tokio::test]
async fn test_every_statement_kind_is_single_shot() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();

    let mut read = persons.get();
    read.with_param("pk", "A").unwrap();
    assert_single_shot(&session, &transport, &mut read, json!({"entities": [ann()]})).await;

    let mut save = persons.save();
    save.with_params([("pk", "A"), ("ck", "B"), ("firstName", "Ann")])
        .unwrap();
    assert_single_shot(&session, &transport, &mut save, ann()).await;

    let mut delete = persons.delete();
    delete.with_param("eid", ANN_EID).unwrap();
    assert_single_shot(&session, &transport, &mut delete, ann()).await;
}

#[tokio::test]
async fn test_execution_error_carries_status_and_body() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();

    let mut create = persons.create();
    create.with_param("firstName", "Ann").unwrap();
    transport.fail(TransportError::Status {
        status: 409,
        body: "{\"message\":\"entity already exists\"}".into(),
    });

    let err = session.execute(&mut create).await.unwrap_err();
    assert_eq!(err.status_code(), Some(409));
    assert!(err.to_string().contains("entity already exists"));
    assert!(err.is_recoverable());
    assert_eq!(create.state(), StatementState::Failed);

    // a failed statement is retried only through an explicit new attempt
    assert!(matches!(
        session.execute(&mut create).await,
        Err(LinkError::AlreadyExecuted)
    ));
    create.reset();
    create.with_param("firstName", "Ann").unwrap();
    transport.respond(201, ann());
    assert!(session.execute(&mut create).await.is_ok());
}

#[tokio::test]
async fn test_non_success_status_fails_statement() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();
    let mut read = persons.get();

    transport.respond(302, json!({"location": "elsewhere"}));
    let err = session.execute(&mut read).await.unwrap_err();
    assert_eq!(err.status_code(), Some(302));
    assert_eq!(read.state(), StatementState::Failed);
    assert!(!read.has_more_pages());
}

#[tokio::test]
async fn test_save_requires_primary_key_before_sending() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();

    let mut save = persons.save();
    save.with_param("firstName", "Ann").unwrap().with_param("pk", "A").unwrap();
    let err = session.execute(&mut save).await.unwrap_err();
    assert!(matches!(err, LinkError::InvalidParam { ref param, .. } if param == "ck"));
    assert_eq!(transport.request_count(), 1);
    assert_eq!(save.state(), StatementState::Building);

    save.with_param("ck", "B").unwrap();
    transport.respond(200, ann());
    session.execute(&mut save).await.unwrap();
    assert_eq!(transport.last_request().method, Method::Put);
}

#[tokio::test]
async fn test_delete_sends_query_parameters() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();

    let mut delete = persons.delete();
    delete.with_param("eid", ANN_EID).unwrap();
    transport.respond(200, json!({}));
    let result = session.execute(&mut delete).await.unwrap();

    let request = transport.last_request();
    assert_eq!(request.method, Method::Delete);
    assert_eq!(request.body, None);
    assert_eq!(request.query, vec![("eid".to_string(), ANN_EID.to_string())]);
    assert!(result.is_exhausted());
}

#[tokio::test]
async fn test_view_read_targets_view_path() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();

    let mut read = persons.get_view("byPk").unwrap();
    read.with_param("pk", "A").unwrap();
    transport.respond(200, json!({"entities": [ann()]}));
    let result = session.execute(&mut read).await.unwrap();

    assert_eq!(
        transport.last_request().url,
        format!(
            "https://site.example.com/api/v1/resources/{}/views/byPk",
            PERSONS_ID
        )
    );
    assert_eq!(result.column_names(), vec!["pk", "firstName", "ck", "eid"]);
}

// ==================== Pagination ====================

#[tokio::test]
async fn test_paged_read() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();

    let mut read: GetStatement = persons.get();
    read.with_param("pk", "A").unwrap().limit(1).unwrap();

    transport.respond(
        200,
        json!({"entities": [ann()], "metadata": {"pageState": "cursor-1"}}),
    );
    let first = session.execute(&mut read).await.unwrap();
    assert_eq!(first.page_state(), Some("cursor-1"));
    assert!(read.has_more_pages());

    read.next_page().unwrap();
    assert_eq!(read.state(), StatementState::Building);
    transport.respond(200, json!({"entities": [{"firstName": "Bob", "pk": "A", "ck": "C"}]}));
    let mut second = session.execute(&mut read).await.unwrap();

    let query = transport.last_request().query;
    assert!(query.contains(&("pageState".to_string(), "cursor-1".to_string())));
    assert!(query.contains(&("_limit".to_string(), "1".to_string())));
    assert!(query.contains(&("pk".to_string(), "A".to_string())));
    assert_eq!(
        second.one().unwrap().get_string("firstName").unwrap().as_deref(),
        Some("Bob")
    );

    assert!(!read.has_more_pages());
    assert!(matches!(read.next_page(), Err(LinkError::Execution { .. })));
}

// ==================== Async execution ====================

#[tokio::test]
async fn test_execute_async_hands_statement_back() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();

    let mut create = persons.create();
    create.with_param("firstName", "Ann").unwrap();
    transport.respond(201, ann());

    let handle = session.execute_async(create).unwrap();
    let (create, result) = handle.await.unwrap().into_parts();
    let mut result = result.unwrap();
    assert_eq!(create.state(), StatementState::Executed);
    assert_eq!(
        result.one().unwrap().get_string("firstName").unwrap().as_deref(),
        Some("Ann")
    );
}

#[tokio::test]
async fn test_execute_async_rejects_cursor_continuation() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();

    let mut read = persons.get();
    read.page("cursor-1").unwrap();
    let err = session.execute_async(read).unwrap_err();
    assert!(matches!(err, LinkError::InvalidParam { ref param, .. } if param == "pageState"));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_execute_async_with_cookies() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();
    transport.respond(200, json!({"entities": []}));

    let cookies = vec!["access_token=abc".to_string(), "refresh_token=def".to_string()];
    let done = session
        .execute_async_with_cookies(persons.get(), &cookies)
        .unwrap()
        .await
        .unwrap();
    assert!(done.result.unwrap().is_exhausted());

    let request = transport.last_request();
    assert_eq!(request.header("Cookie"), Some("access_token=abc; refresh_token=def"));
    assert_eq!(request.header("Authorization"), None);
}

#[tokio::test]
async fn test_cancelled_execution() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();
    transport.set_delay(Duration::from_secs(30));

    let handle = session.execute_async(persons.get()).unwrap();
    handle.cancel();
    assert!(matches!(handle.await, Err(LinkError::Cancelled)));
}

// ==================== Shutdown ====================

#[tokio::test]
async fn test_close_waits_for_submitted_work() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();
    transport.set_delay(Duration::from_millis(20));
    transport.respond(200, json!({"entities": [ann()]}));

    let handle = session.execute_async(persons.get()).unwrap();
    assert!(session.close(Duration::from_secs(5)).await);
    assert!(session.is_closed());

    let done = handle.await.unwrap();
    assert_eq!(done.result.unwrap().remaining(), 1);

    assert!(matches!(
        session.execute_async(persons.get()),
        Err(LinkError::SessionClosed)
    ));
}

#[tokio::test]
async fn test_init_reopens_closed_session() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();
    assert!(session.close(Duration::from_secs(1)).await);
    assert!(matches!(
        session.execute_async(persons.get()),
        Err(LinkError::SessionClosed)
    ));

    transport.respond(200, schema_document());
    session.init().await.unwrap();
    assert!(!session.is_closed());

    transport.respond(200, json!({"entities": [ann()]}));
    let persons = session.resource("crm", "persons").unwrap();
    let done = session.execute_async(persons.get()).unwrap().await.unwrap();
    assert_eq!(done.result.unwrap().remaining(), 1);
}

#[tokio::test]
async fn test_close_times_out_and_aborts() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();
    transport.set_delay(Duration::from_secs(30));

    let handle = session.execute_async(persons.get()).unwrap();
    assert!(!session.close(Duration::from_millis(50)).await);
    assert!(matches!(handle.await, Err(LinkError::Cancelled)));
}

#[tokio::test]
async fn test_close_now_aborts_outstanding_work() {
    let (session, transport) = initialized_session().await;
    let persons = session.resource("crm", "persons").unwrap();
    transport.set_delay(Duration::from_secs(30));

    let first = session.execute_async(persons.get()).unwrap();
    let second = session.execute_async(persons.get()).unwrap();
    assert_eq!(session.close_now(), 2);
    assert!(matches!(first.await, Err(LinkError::Cancelled)));
    assert!(matches!(second.await, Err(LinkError::Cancelled)));
}

// ==================== User flows ====================

#[tokio::test]
async fn test_login_execute_logout() {
    let (session, transport) = initialized_session().await;
    transport.respond_with(
        TransportResponse::new(200, json!({}))
            .with_header("Set-Cookie", "access_token=abc; Path=/; HttpOnly")
            .with_header("Set-Cookie", "refresh_token=def; Path=/users/refresh"),
    );

    let cookies = session.login("ann@example.com", "pw").await.unwrap();
    assert_eq!(cookies, vec!["access_token=abc", "refresh_token=def"]);
    let login = transport.last_request();
    assert_eq!(login.url, "https://site.example.com/api/v1/users/login");
    assert_eq!(login.body, Some(json!({"email": "ann@example.com", "password": "pw"})));

    let persons = session.resource("crm", "persons").unwrap();
    let mut read = persons.get();
    transport.respond(200, json!({"entities": []}));
    session.execute_with_cookies(&mut read, &cookies).await.unwrap();
    assert_eq!(
        transport.last_request().header("cookie"),
        Some("access_token=abc; refresh_token=def")
    );

    transport.respond(200, serde_json::Value::Null);
    session.logout(&cookies).await.unwrap();
    let logout = transport.last_request();
    assert_eq!(logout.url, "https://site.example.com/api/v1/users/logout");
    assert_eq!(logout.body, None);
    assert_eq!(logout.header("Cookie"), Some("access_token=abc; refresh_token=def"));
}

#[tokio::test]
async fn test_refresh_and_register() {
    let (session, transport) = initialized_session().await;

    transport.respond(201, serde_json::Value::Null);
    session.register("bob@example.com", "pw").await.unwrap();
    assert_eq!(
        transport.last_request().url,
        "https://site.example.com/api/v1/users/register"
    );

    transport.respond_with(
        TransportResponse::new(200, serde_json::Value::Null)
            .with_header("set-cookie", "access_token=new; Path=/"),
    );
    let refreshed = session
        .refresh(&["refresh_token=def".to_string()])
        .await
        .unwrap();
    assert_eq!(refreshed, vec!["access_token=new"]);
}

#[tokio::test]
async fn test_failed_login_surfaces_service_message() {
    let (session, transport) = initialized_session().await;
    transport.fail(TransportError::Status {
        status: 401,
        body: "bad credentials".into(),
    });

    let err = session.login("ann@example.com", "nope").await.unwrap_err();
    assert_eq!(err.status_code(), Some(401));
    assert!(err.to_string().contains("bad credentials"));
}
