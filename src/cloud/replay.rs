// src/cloud/replay.rs

//! Canned HTTP responses for driving the SDK clients offline.

use aws_smithy_runtime::client::http::test_util::{ReplayEvent, StaticReplayClient};
use aws_smithy_runtime_api::client::orchestrator::{HttpRequest, HttpResponse};
use aws_smithy_runtime_api::http::StatusCode;
use aws_smithy_types::body::SdkBody;

pub(crate) const REGION: &str = "us-east-1";

/// One response, answered to whatever request comes next.
pub(crate) fn respond(status: u16, body: &str) -> ReplayEvent {
    let status = StatusCode::try_from(status).expect("valid status code");
    ReplayEvent::new(
        HttpRequest::new(SdkBody::empty()),
        HttpResponse::new(status, SdkBody::from(body)),
    )
}

/// Error document in the awsJson shape used by Glue and Athena.
pub(crate) fn json_error(status: u16, kind: &str, message: &str) -> ReplayEvent {
    respond(
        status,
        &serde_json::json!({ "__type": kind, "Message": message }).to_string(),
    )
}

/// Error document in the XML shape used by S3.
pub(crate) fn xml_error(status: u16, code: &str) -> ReplayEvent {
    respond(
        status,
        &format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <Error><Code>{}</Code><Message>{}</Message><RequestId>req</RequestId></Error>",
            code, code
        ),
    )
}

/// `X-Amz-Target` of each request the client actually sent.
pub(crate) fn targets(http: &StaticReplayClient) -> Vec<String> {
    http.actual_requests()
        .map(|r| r.headers().get("x-amz-target").unwrap_or_default().to_string())
        .collect()
}

/// HTTP method of each request the client actually sent.
pub(crate) fn methods(http: &StaticReplayClient) -> Vec<String> {
    http.actual_requests()
        .map(|r| r.method().to_string())
        .collect()
}

/// Body of the n-th request, as text.
pub(crate) fn request_body(http: &StaticReplayClient, n: usize) -> String {
    http.actual_requests()
        .nth(n)
        .and_then(|r| r.body().bytes())
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_default()
}
