//! Shared HTTP error classification
//!
//! Backend errors are classified here, at the component boundary closest to
//! the backend, so the serving layer only decides retry vs. degrade vs. fail.

use reqwest::StatusCode;

/// Statuses worth retrying: rate limiting and server-side failures
pub(crate) fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Transport-level failures that indicate the backend is unreachable
pub(crate) fn is_transient_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Trim a response body for inclusion in an error message
pub(crate) fn short_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() > 200 {
        let cut = trimmed
            .char_indices()
            .take_while(|(i, _)| *i < 200)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &trimmed[..cut])
    } else {
        trimmed.to_string()
    }
}
