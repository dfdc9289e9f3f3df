//! Mapping of HTTP outcomes to store errors
//!
//! Non-success responses become `StoreError::Remote` with the status, the
//! store's error code and message, and the diagnostic headers it sent.
//! Transport failures become `Timeout` or `Unavailable`.

use reqwest::header::HeaderMap;
use reqwest::Response;
use serde::Deserialize;
use std::time::Duration;

use docdb_kernel::StoreError;

pub(crate) const SUB_STATUS_HEADER: &str = "x-ms-substatus";
pub(crate) const ACTIVITY_ID_HEADER: &str = "x-ms-activity-id";
pub(crate) const RETRY_AFTER_HEADER: &str = "x-ms-retry-after-ms";

/// Error body returned by the store, e.g. `{"code":"NotFound","message":"..."}`
#[derive(Debug, Deserialize)]
struct FaultBody {
    code: Option<String>,
    message: Option<String>,
}

fn header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Converts a non-success response into the store's fault
pub(crate) async fn fault_from_response(response: Response) -> StoreError {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();

    fault_from_parts(status.as_u16(), status.canonical_reason(), &headers, &body)
}

pub(crate) fn fault_from_parts(
    status: u16,
    reason: Option<&str>,
    headers: &HeaderMap,
    body: &str,
) -> StoreError {
    let parsed = serde_json::from_str::<FaultBody>(body).ok();
    let (code, message) = match parsed {
        Some(fault) => (fault.code, fault.message),
        None => (None, None),
    };

    let message = message
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .or_else(|| reason.map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status));

    StoreError::Remote {
        status,
        sub_status: header(headers, SUB_STATUS_HEADER),
        code,
        message,
        activity_id: header(headers, ACTIVITY_ID_HEADER),
        retry_after_ms: header(headers, RETRY_AFTER_HEADER),
    }
}

/// Converts a transport failure for `operation` into a store error
pub(crate) fn fault_from_transport(
    error: reqwest::Error,
    operation: &str,
    timeout: Duration,
) -> StoreError {
    if error.is_timeout() {
        return StoreError::timeout(operation, timeout);
    }

    StoreError::Unavailable {
        message: format!("{} failed: {}", operation, error),
        source: Some(Box::new(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_store_fault_body_is_parsed() {
        let mut headers = HeaderMap::new();
        headers.insert(SUB_STATUS_HEADER, HeaderValue::from_static("1002"));
        headers.insert(ACTIVITY_ID_HEADER, HeaderValue::from_static("a1b2"));

        let error = fault_from_parts(
            404,
            Some("Not Found"),
            &headers,
            r#"{"code":"NotFound","message":"Entity with the specified id does not exist in the system."}"#,
        );

        match error {
            StoreError::Remote { status, sub_status, code, message, activity_id, retry_after_ms } => {
                assert_eq!(status, 404);
                assert_eq!(sub_status, Some(1002));
                assert_eq!(code.as_deref(), Some("NotFound"));
                assert!(message.starts_with("Entity with the specified id"));
                assert_eq!(activity_id.as_deref(), Some("a1b2"));
                assert_eq!(retry_after_ms, None);
            }
            other => panic!("Expected Remote, got {other:?}"),
        }
    }

    #[test]
    fn test_throttle_carries_retry_hint() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER_HEADER, HeaderValue::from_static("250"));

        let error = fault_from_parts(429, Some("Too Many Requests"), &headers, "");
        assert!(error.is_throttled());
        match error {
            StoreError::Remote { retry_after_ms, message, .. } => {
                assert_eq!(retry_after_ms, Some(250));
                assert_eq!(message, "Too Many Requests");
            }
            other => panic!("Expected Remote, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_text_body_becomes_message() {
        let error = fault_from_parts(503, None, &HeaderMap::new(), "gateway down");
        match error {
            StoreError::Remote { code, message, .. } => {
                assert_eq!(code, None);
                assert_eq!(message, "gateway down");
            }
            other => panic!("Expected Remote, got {other:?}"),
        }
    }
}
