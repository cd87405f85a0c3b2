use chrono::Utc;

use crate::gateway::{GatewayError, is_throttled, rate_limit_reset};
use crate::http::HttpResponse;

use super::types::ApiErrorBody;

/// Map a non-success response to a [`GatewayError`].
///
/// `resource` names what was requested and ends up in `NotFound`.
pub(crate) fn error_for_status(response: &HttpResponse, resource: &str) -> GatewayError {
    match response.status {
        401 => GatewayError::AuthRequired,
        403 | 429 if is_throttled(response) => GatewayError::RateLimited {
            reset_at: rate_limit_reset(response).unwrap_or_else(Utc::now),
        },
        404 => GatewayError::not_found(resource),
        status => GatewayError::api(status, api_message(response)),
    }
}

fn api_message(response: &HttpResponse) -> String {
    if let Ok(body) = serde_json::from_slice::<ApiErrorBody>(&response.body) {
        return body.message;
    }
    let text = String::from_utf8_lossy(&response.body);
    let text = text.trim();
    if text.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        text.to_string()
    }
}
