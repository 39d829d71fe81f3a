//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port and drives a real
//! `Client` over `UreqTransport`, so request building, body encoding,
//! status policy and response wrapping are checked together.

use hyperhttp::{Client, Config, ContentType, Error, HeaderSet, Part, TransportErrorKind};
use mock_server::{Book, Echo};
use serde_json::json;

/// Start the mock server on a random port and return its base URI.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn client() -> Client {
    Client::from_config(Config::new().with_base_uri(start_server()).with_timeout(10.0))
}

#[test]
fn book_lifecycle() {
    let client = client();

    // create
    let response = client
        .post_json("/books", json!({"title": "Emma", "author": "Jane Austen"}))
        .send()
        .unwrap();
    assert_eq!(response.status(), 201);
    assert!(response.is_json());
    let created: Book = response.json().unwrap();
    let id = created.id;

    // read through the structured view
    let response = client.get(&format!("books/{id}")).send().unwrap();
    assert_eq!(response.get("title"), Some(&json!("Emma")));
    assert!(!response.has("year"));

    // patch and replace
    let response = client
        .patch(&format!("/books/{id}"), json!({"year": 1815}))
        .send()
        .unwrap();
    assert_eq!(response.get("year"), Some(&json!(1815)));
    let response = client
        .put(&format!("/books/{id}"), json!({"title": "Persuasion", "author": "Jane Austen"}))
        .send()
        .unwrap();
    assert_eq!(response.get("title"), Some(&json!("Persuasion")));

    // list
    let response = client.get("/books").send().unwrap();
    assert!(response.data().is_collection());
    assert_eq!(response.data().pluck("title"), vec![json!("Persuasion")]);

    // delete
    let response = client.delete(&format!("/books/{id}")).send().unwrap();
    assert_eq!(response.status(), 204);
    assert!(response.body().is_empty());

    // gone
    let err = client.get(&format!("/books/{id}")).send().unwrap_err();
    assert!(err.is_server_response());
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.response_value()["error"], "book not found");
}

#[test]
fn server_errors_follow_the_status_policy() {
    let client = client();

    let err = client.get("/status/500").send().unwrap_err();
    match &err {
        Error::ServerResponse { request, response } => {
            assert!(request.uri.ends_with("/status/500"));
            assert_eq!(response.status(), 500);
            assert_eq!(response.get("status"), Some(&json!(500)));
        }
        other => panic!("expected server response, got {other:?}"),
    }

    let response = client.get("/status/503").http_errors(false).send().unwrap();
    assert_eq!(response.status(), 503);
    assert_eq!(response.reason_phrase(), "Service Unavailable");
}

#[test]
fn form_fields_are_url_encoded_on_the_wire() {
    let client = client();
    let response = client
        .post_form("/echo", [("first_name", "Walter White"), ("age", "50")])
        .send()
        .unwrap();

    let echo: Echo = response.json().unwrap();
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.headers["content-type"], "application/x-www-form-urlencoded");
    assert_eq!(echo.body, "first_name=Walter+White&age=50");
    assert_eq!(
        response.request().unwrap().form_data().unwrap().get("first_name"),
        Some("Walter White")
    );
}

#[test]
fn multipart_parts_reach_the_server() {
    let client = client();
    let response = client
        .post_multipart_form(
            "/echo",
            vec![
                Part::text("name", "Walter"),
                Part::file("notes", "notes.txt", b"chemistry".to_vec()),
            ],
        )
        .send()
        .unwrap();

    let echo: Echo = response.json().unwrap();
    let content_type = &echo.headers["content-type"];
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    assert!(echo.body.contains("name=\"name\"\r\n\r\nWalter\r\n"));
    assert!(echo.body.contains("filename=\"notes.txt\""));
    assert!(echo.body.contains("chemistry"));
}

#[test]
fn query_headers_and_methods_reach_the_server() {
    let mut client = client();
    client.set_header("X-Api-Key", "secret");

    let echo: Echo = client
        .get("/echo/search")
        .query(&json!({"page": 2, "tags": ["a", "b"]}))
        .headers(&HeaderSet::from([("X-Trace", "t-1")]))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(echo.path, "/echo/search");
    assert_eq!(echo.query.as_deref(), Some("page=2&tags%5B0%5D=a&tags%5B1%5D=b"));
    assert_eq!(echo.headers["x-api-key"], "secret");
    assert_eq!(echo.headers["x-trace"], "t-1");

    let echo: Echo = client.call("purge", "/echo").send().unwrap().json().unwrap();
    assert_eq!(echo.method, "PURGE");
}

#[test]
fn json_variants_send_json_headers() {
    let client = client();
    let echo: Echo = client.get_json("/echo").send().unwrap().json().unwrap();
    assert_eq!(echo.headers["accept"], "application/json");
    assert_eq!(echo.headers["content-type"], "application/json");

    let echo: Echo = client.get("/echo").send().unwrap().json().unwrap();
    assert!(!echo.headers.contains_key("content-type"));
}

#[test]
fn plain_text_has_an_empty_structured_view() {
    let client = client();
    let response = client.get("/text").send().unwrap();
    assert!(!response.is_json());
    assert_eq!(response.to_value(), json!({}));
    assert_eq!(response.to_string(), "Hello world!");
}

#[test]
fn large_bodies_are_read_in_full() {
    // Past ureq's own 10 MiB default.
    let len = 11 * 1024 * 1024;
    let client = client();
    let response = client.get(&format!("/bytes/{len}")).send().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.body().len(), len);

    let mut config = Config::new().with_base_uri(client.base_uri().unwrap());
    config.transport.max_body_size = Some(1024);
    let limited = Client::from_config(config);
    let err = limited.get("/bytes/4096").send().unwrap_err();
    assert!(err.is_transport_failure());
}

#[test]
fn connection_refused_is_a_transport_failure() {
    // Bind then drop to find a port nobody is listening on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let client = Client::from_config(Config::new().with_base_uri(format!("http://{addr}")));

    let err = client.get("/books").send().unwrap_err();
    match err {
        Error::TransportFailure { request, kind, .. } => {
            assert_ne!(kind, TransportErrorKind::InvalidRequest);
            assert_eq!(request.unwrap().uri, format!("http://{addr}/books"));
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
}
