use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use hyper::header::CONTENT_TYPE;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use opa_client::{Error, FailureKind, OpaClient, OpaConfig};
use serde_json::{Value, json};

#[derive(Clone, Debug)]
struct SeenRequest {
    method: String,
    path: String,
    content_type: Option<String>,
    body: String,
}

type Log = Arc<Mutex<Vec<SeenRequest>>>;
type Script = Arc<Mutex<VecDeque<(StatusCode, &'static str)>>>;

/// Starts a server answering requests with `replies`, in order.
fn serve(replies: Vec<(StatusCode, &'static str)>) -> (u16, Log) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    let log: Log = Arc::default();
    let script: Script = Arc::new(Mutex::new(replies.into()));

    let seen = Arc::clone(&log);
    let make_svc = make_service_fn(move |_conn| {
        let seen = Arc::clone(&seen);
        let script = Arc::clone(&script);
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                respond(req, Arc::clone(&seen), Arc::clone(&script))
            }))
        }
    });
    let server = Server::from_tcp(listener).expect("server").serve(make_svc);
    tokio::spawn(server);

    (port, log)
}

async fn respond(
    req: Request<Body>,
    seen: Log,
    script: Script,
) -> Result<Response<Body>, hyper::Error> {
    let method = req.method().to_string();
    let path = req.uri().path().to_owned();
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let body = hyper::body::to_bytes(req.into_body()).await?;
    seen.lock().unwrap().push(SeenRequest {
        method,
        path,
        content_type,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let (status, reply) = script.lock().unwrap().pop_front().unwrap_or((
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"message":"unscripted request"}"#,
    ));
    let mut response = Response::builder().status(status);
    if !reply.is_empty() {
        response = response.header(CONTENT_TYPE, "application/json");
    }
    Ok(response.body(Body::from(reply)).expect("response"))
}

fn client_for(port: u16) -> OpaClient {
    let config = OpaConfig::new("127.0.0.1")
        .and_then(|cfg| cfg.with_port(port))
        .expect("valid config");
    OpaClient::new(config).expect("client")
}

#[tokio::test]
async fn policy_and_document_lifecycle_over_http() {
    let (port, log) = serve(vec![
        (StatusCode::OK, "{}"),
        (StatusCode::NO_CONTENT, ""),
        (StatusCode::NO_CONTENT, ""),
        (StatusCode::NO_CONTENT, ""),
        (
            StatusCode::OK,
            r#"{"result":{"users":[{"alice":1},{"bob":2}],"x":5}}"#,
        ),
        (StatusCode::OK, "{}"),
    ]);
    let client = client_for(port);

    let policy = client
        .create_policy("authz/http", "data.users[_].alice == 1", ["users"])
        .await
        .expect("policy created");
    let mut data = client
        .create_base_document("users", r#"{"users":[{"alice":1},{"bob":2}]}"#)
        .await
        .expect("document created");

    let added = data.add_path("/x", 5).await.expect("added");
    assert_eq!(added.message(), "Added successfully");
    let removed = data.remove_path("/tmp").await.expect("removed");
    assert_eq!(removed.message(), "Removed successfully");

    let snapshot = data.refresh().await.expect("refreshed").to_owned();
    assert_eq!(
        serde_json::from_str::<Value>(&snapshot).unwrap(),
        json!({"users": [{"alice": 1}, {"bob": 2}], "x": 5})
    );

    let deleted = policy.delete().await.expect("deleted");
    assert!(deleted.success());
    assert_eq!(deleted.message(), "Policy Deleted");

    let seen = log.lock().unwrap().clone();
    let summary: Vec<(&str, &str)> = seen
        .iter()
        .map(|r| (r.method.as_str(), r.path.as_str()))
        .collect();
    assert_eq!(
        summary,
        [
            ("PUT", "/v1/policies/authz/http"),
            ("PUT", "/v1/data/users"),
            ("PATCH", "/v1/data/users/x"),
            ("PATCH", "/v1/data/users/tmp"),
            ("GET", "/v1/data/users"),
            ("DELETE", "/v1/policies/authz/http"),
        ]
    );

    assert_eq!(seen[0].content_type.as_deref(), Some("text/plain"));
    assert!(seen[0].body.starts_with("package authz.http\nimport data.users\n"));
    assert_eq!(seen[1].content_type.as_deref(), Some("application/json"));
    assert_eq!(seen[1].body, r#"{"users":[{"alice":1},{"bob":2}]}"#);
    assert_eq!(
        serde_json::from_str::<Value>(&seen[2].body).unwrap(),
        json!([{"op": "add", "path": "/x", "value": 5}])
    );
    assert_eq!(
        serde_json::from_str::<Value>(&seen[3].body).unwrap(),
        json!([{"op": "remove", "path": "/tmp"}])
    );
}

#[tokio::test]
async fn non_ok_delete_carries_server_message() {
    let (port, _log) = serve(vec![
        (StatusCode::OK, "{}"),
        (
            StatusCode::NOT_FOUND,
            r#"{"code":"resource_not_found","message":"storage_not_found_error: policy id \"authz\""}"#,
        ),
    ]);
    let client = client_for(port);

    let policy = client
        .create_policy("authz", "true", Vec::<String>::new())
        .await
        .expect("policy created");
    let err = policy.delete().await.expect_err("server said 404");

    match err {
        Error::Http { status, message } => {
            assert_eq!(status.map(|s| s.as_u16()), Some(404));
            assert_eq!(message, "storage_not_found_error: policy id \"authz\"");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn refused_connection_is_a_request_failure() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("local addr").port()
    };
    let client = client_for(port);

    let err = client
        .create_base_document("users", "{}")
        .await
        .expect_err("nothing is listening");
    assert_eq!(err.failure_kind(), Some(FailureKind::Request));

    let rendered = err.to_rest_return();
    assert!(!rendered.success());
    assert!(rendered.http_status().is_none());
}
