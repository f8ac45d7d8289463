//! Response checks shared by every Nessie request.

use serde::Deserialize;

use crate::error::CatalogError;

/// Error body the Nessie server returns for non-success statuses.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NessieErrorBody {
    pub status: u16,
    pub reason: String,
    pub message: String,
    pub error_code: String,
}

/// Check a response for error statuses.
///
/// Returns the response unchanged on success. Otherwise:
/// - **404** → [`CatalogError::NotFound`]
/// - **409** → [`CatalogError::Conflict`]
/// - anything else → [`CatalogError::Api`] with the server's error code
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let body = parse_error_body(&text);
    let message = if body.message.is_empty() {
        text
    } else {
        body.message
    };

    Err(match status.as_u16() {
        404 => CatalogError::NotFound(message),
        409 => CatalogError::Conflict(message),
        code => CatalogError::Api {
            status: code,
            code: if body.error_code.is_empty() {
                body.reason
            } else {
                body.error_code
            },
            message,
        },
    })
}

fn parse_error_body(text: &str) -> NessieErrorBody {
    serde_json::from_str(text).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_nessie_error_body() {
        let body = parse_error_body(
            r#"{"status":409,"reason":"Conflict","message":"Key 'table1' already exists","errorCode":"REFERENCE_CONFLICT"}"#,
        );
        assert_eq!(body.status, 409);
        assert_eq!(body.error_code, "REFERENCE_CONFLICT");
        assert_eq!(body.message, "Key 'table1' already exists");
    }

    #[test]
    fn non_json_body_falls_back_to_defaults() {
        let body = parse_error_body("<html>Bad Gateway</html>");
        assert_eq!(body.status, 0);
        assert!(body.message.is_empty());
    }
}
