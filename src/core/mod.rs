pub mod config;
pub mod middleware;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Errors returned by account and instance operations.
///
/// Remote responses are classified in a fixed order: transport failure,
/// then HTTP status, then a structured `error` field, then a `success: false`
/// flag. Local preconditions (deleted instance, unknown token) are checked
/// before any request is sent.
#[derive(Error, Debug)]
pub enum Error {
    /// The request never produced a response.
    #[error("HTTP Request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),
    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(#[from] reqwest::Error),
    /// The response, or JSON embedded in it, did not parse.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// The server answered with a non-success status code.
    #[error("unexpected HTTP status: {0}")]
    HttpStatus(StatusCode),
    /// The server reported a structured error.
    #[error("API error: {message}")]
    Remote {
        message: String,
        code: Option<String>,
    },
    /// A legacy endpoint answered `success: false` without further detail.
    #[error("bad credentials or server error")]
    CredentialOrServer,
    /// Logging in with email and password failed.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// The instance was already deleted by this account.
    #[error("database {0} has already been deleted")]
    AlreadyDeleted(String),
    /// The instance has been deleted and can no longer be used.
    #[error("database {0} has been deleted")]
    DeletedInstance(String),
    /// The token is not one of the instance's known auth tokens.
    #[error("no such auth token: {0}")]
    UnknownToken(String),
    /// A successful response did not carry an expected token field.
    #[error("expected {0} in response")]
    MissingToken(&'static str),
    /// A successful response did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// A configured endpoint is not a valid URL.
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// A configured endpoint cannot have path segments appended to it.
    #[error("endpoint {0} cannot be extended with a path")]
    CannotBeBase(String),
}

/// Reads a JSON body from a response with any 2xx status and checks it for
/// an error envelope.
pub(crate) async fn read_json(response: reqwest::Response) -> Result<Value, Error> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::HttpStatus(status));
    }
    parse_body(response).await
}

/// Like [`read_json`], but the provisioning endpoints only count `200 OK`
/// as success.
pub(crate) async fn read_json_ok(response: reqwest::Response) -> Result<Value, Error> {
    let status = response.status();
    if status != StatusCode::OK {
        return Err(Error::HttpStatus(status));
    }
    parse_body(response).await
}

async fn parse_body(response: reqwest::Response) -> Result<Value, Error> {
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    let body: Value = serde_json::from_str(&text)?;
    check_envelope(&body)?;
    Ok(body)
}

/// Maps the two error shapes the service uses onto [`Error`].
///
/// The admin endpoints report `{"error": "message"}`; the Simple Login
/// endpoints nest it as `{"error": {"message": "...", "code": "..."}}`.
pub(crate) fn check_envelope(body: &Value) -> Result<(), Error> {
    match body.get("error") {
        None | Some(Value::Null) => {}
        Some(Value::String(message)) => {
            return Err(Error::Remote {
                message: message.clone(),
                code: None,
            })
        }
        Some(Value::Object(details)) => {
            let message = details
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(details.clone()).to_string());
            let code = details.get("code").and_then(|code| match code {
                Value::String(code) => Some(code.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            });
            return Err(Error::Remote { message, code });
        }
        Some(other) => {
            return Err(Error::Remote {
                message: other.to_string(),
                code: None,
            })
        }
    }

    if body.get("success") == Some(&Value::Bool(false)) {
        return Err(Error::CredentialOrServer);
    }

    Ok(())
}

/// Extracts a non-empty string field from a successful response.
pub(crate) fn token_field(body: &Value, field: &'static str) -> Result<String, Error> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or(Error::MissingToken(field))
}

/// Encodes an `application/x-www-form-urlencoded` body.
pub(crate) fn form(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Appends one percent-encoded path segment.
pub(crate) fn push_segment(mut url: Url, segment: &str) -> Result<Url, Error> {
    if url.cannot_be_a_base() {
        return Err(Error::CannotBeBase(url.to_string()));
    }
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(segment);
    }
    Ok(url)
}

pub(crate) fn with_query(mut url: Url, pairs: &[(&str, &str)]) -> Url {
    url.query_pairs_mut().extend_pairs(pairs);
    url
}
