//! Request transport: the seam between the typed API facade and the wire.

use crate::api::error::ApiError;
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Path prefix of every API resource
pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Patch => "PATCH",
      Method::Delete => "DELETE",
    };
    f.write_str(name)
  }
}

impl From<Method> for reqwest::Method {
  fn from(method: Method) -> Self {
    match method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
      Method::Patch => reqwest::Method::PATCH,
      Method::Delete => reqwest::Method::DELETE,
    }
  }
}

/// A single API call, relative to `/api/v1`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  pub path: String,
  pub query: Vec<(String, String)>,
  pub body: Option<Value>,
}

impl ApiRequest {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      query: Vec::new(),
      body: None,
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::Get, path)
  }

  pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
    self.query = query;
    self
  }

  pub fn with_body(mut self, body: Value) -> Self {
    self.body = Some(body);
    self
  }

  /// Path split into non-empty segments
  pub fn segments(&self) -> Vec<&str> {
    self.path.split('/').filter(|s| !s.is_empty()).collect()
  }

  pub fn query_param(&self, name: &str) -> Option<&str> {
    self
      .query
      .iter()
      .find(|(k, _)| k == name)
      .map(|(_, v)| v.as_str())
  }
}

/// Something that can execute an [`ApiRequest`].
///
/// Resolves to the parsed JSON body, `None` for "no content", or an
/// [`ApiError`] for transport failures and non-2xx responses.
pub trait Transport: Send + Sync {
  fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Option<Value>, ApiError>>;
}

/// HTTP transport backed by reqwest.
pub struct HttpTransport {
  client: reqwest::Client,
  base: Url,
}

impl HttpTransport {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
    let base = Url::parse(base_url)
      .map_err(|e| ApiError::transport(format!("invalid base url {}: {}", base_url, e)))?;
    if base.cannot_be_a_base() {
      return Err(ApiError::transport(format!(
        "invalid base url {}: not a hierarchical url",
        base_url
      )));
    }

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| ApiError::transport(format!("failed to build http client: {}", e)))?;

    Ok(Self { client, base })
  }

  /// Resolve a request path against `{base}/api/v1`.
  fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
    let mut url = self.base.clone();
    {
      let mut segments = url
        .path_segments_mut()
        .map_err(|_| ApiError::transport("base url cannot carry a path"))?;
      segments.pop_if_empty();
      segments.extend(API_PREFIX.split('/').filter(|s| !s.is_empty()));
      segments.extend(request.segments());
    }
    if !request.query.is_empty() {
      url.query_pairs_mut().extend_pairs(request.query.iter());
    }
    Ok(url)
  }

  async fn execute(&self, request: ApiRequest) -> Result<Option<Value>, ApiError> {
    let url = self.url_for(&request)?;
    debug!(method = %request.method, %url, "api request");

    let mut builder = self.client.request(request.method.into(), url);
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder.send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
      return Err(ApiError::from_status(
        status.as_u16(),
        error_message(&text, status),
      ));
    }

    if text.trim().is_empty() {
      return Ok(None);
    }

    serde_json::from_str(&text)
      .map(Some)
      .map_err(ApiError::decode)
  }
}

impl Transport for HttpTransport {
  fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<Option<Value>, ApiError>> {
    Box::pin(self.execute(request))
  }
}

/// Pull a human readable message out of an error body.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
  if let Ok(value) = serde_json::from_str::<Value>(body) {
    for field in ["error", "message"] {
      if let Some(msg) = value.get(field).and_then(Value::as_str) {
        return msg.to_string();
      }
    }
  }

  let trimmed = body.trim();
  if !trimmed.is_empty() {
    return trimmed.to_string();
  }

  status
    .canonical_reason()
    .unwrap_or("request failed")
    .to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::error::ErrorKind;
  use wiremock::matchers::{method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn transport(server: &MockServer) -> HttpTransport {
    HttpTransport::new(&server.uri(), Duration::from_secs(2)).unwrap()
  }

  #[test]
  fn test_url_for_joins_prefix_and_query() {
    let t = HttpTransport::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
    let req = ApiRequest::get("/bookings/stats")
      .with_query(vec![("user_id".to_string(), "u 1".to_string())]);
    assert_eq!(
      t.url_for(&req).unwrap().as_str(),
      "http://localhost:8080/api/v1/bookings/stats?user_id=u+1"
    );

    let bare = ApiRequest::get("/health");
    assert_eq!(
      t.url_for(&bare).unwrap().as_str(),
      "http://localhost:8080/api/v1/health"
    );
  }

  #[test]
  fn test_invalid_base_url() {
    let err = HttpTransport::new("not a url", Duration::from_secs(1))
      .err()
      .unwrap();
    assert_eq!(err.kind, ErrorKind::Transport);
  }

  #[tokio::test]
  async fn test_success_body_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/users"))
      .and(query_param("limit", "10"))
      .and(query_param("offset", "20"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": [], "total": 0})),
      )
      .mount(&server)
      .await;

    let req = ApiRequest::get("/users").with_query(vec![
      ("limit".to_string(), "10".to_string()),
      ("offset".to_string(), "20".to_string()),
    ]);
    let body = transport(&server).send(req).await.unwrap();
    assert_eq!(body, Some(serde_json::json!({"data": [], "total": 0})));
  }

  #[tokio::test]
  async fn test_no_content_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
      .and(path("/api/v1/vehicles/v-1"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&server)
      .await;

    let req = ApiRequest::new(Method::Delete, "/vehicles/v-1");
    assert_eq!(transport(&server).send(req).await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_client_error_uses_json_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/v1/users"))
      .respond_with(
        ResponseTemplate::new(422).set_body_json(serde_json::json!({"error": "email taken"})),
      )
      .mount(&server)
      .await;

    let req = ApiRequest::new(Method::Post, "/users").with_body(serde_json::json!({}));
    let err = transport(&server).send(req).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Client);
    assert_eq!(err.status, Some(422));
    assert_eq!(err.message, "email taken");
  }

  #[tokio::test]
  async fn test_server_error_falls_back_to_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/health"))
      .respond_with(ResponseTemplate::new(503).set_body_string("maintenance window"))
      .mount(&server)
      .await;

    let err = transport(&server)
      .send(ApiRequest::get("/health"))
      .await
      .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Server);
    assert_eq!(err.message, "maintenance window");
  }

  #[tokio::test]
  async fn test_malformed_success_body_is_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/health"))
      .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
      .mount(&server)
      .await;

    let err = transport(&server)
      .send(ApiRequest::get("/health"))
      .await
      .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Server);
    assert!(err.message.starts_with("invalid response body"));
  }

  #[tokio::test]
  async fn test_unreachable_host_is_transport_error() {
    // Port 9 (discard) on localhost is almost never listening
    let t = HttpTransport::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
    let err = t.send(ApiRequest::get("/health")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Transport);
  }
}
