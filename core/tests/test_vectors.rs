//! Check URI resolution, curl rendering and content-type detection against
//! the JSON vectors stored in `test-vectors/`.
//!
//! The vectors are plain data so other implementations of the same façade
//! can be held to the same expectations.

use hyperhttp::builder::resolve_uri;
use hyperhttp::http::media_type;
use hyperhttp::{ContentType, HeaderSet, Request, Response};
use serde_json::Value;

fn cases(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

#[test]
fn resolve_test_vectors() {
    for case in cases(include_str!("../../test-vectors/resolve.json")) {
        let name = case["name"].as_str().unwrap();
        let base = case["base"].as_str();
        let uri = case["uri"].as_str().unwrap();
        assert_eq!(resolve_uri(base, uri), case["expected"].as_str().unwrap(), "{name}");
    }
}

#[test]
fn curl_test_vectors() {
    for case in cases(include_str!("../../test-vectors/curl.json")) {
        let name = case["name"].as_str().unwrap();
        let mut request = Request::new(case["method"].as_str().unwrap(), case["uri"].as_str().unwrap());
        for header in case["headers"].as_array().unwrap() {
            let pair = header.as_array().unwrap();
            request.headers.append(pair[0].as_str().unwrap(), pair[1].as_str().unwrap());
        }
        if let Some(body) = case["body"].as_str() {
            request = request.with_body(body);
        }

        assert_eq!(request.to_curl(), case["expected"].as_str().unwrap(), "{name}");
    }
}

#[test]
fn content_type_test_vectors() {
    for case in cases(include_str!("../../test-vectors/content_type.json")) {
        let header = case["header"].as_str();
        let headers: HeaderSet = header.map(|value| ("Content-Type", value)).into_iter().collect();
        let response = Response::new(200, headers, "{}");

        assert_eq!(response.content_type(), case["media_type"].as_str(), "{header:?}: media type");
        assert_eq!(response.is_json(), case["is_json"].as_bool().unwrap(), "{header:?}: is_json");
        if let Some(header) = header {
            assert_eq!(Some(media_type(header)), case["media_type"].as_str(), "{header}: media_type()");
        }
    }
}
