use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::session::Session;

use super::envelope::Envelope;
use super::error::ApiError;
use super::types::{FormPart, Payload};

/// A fully resolved outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
  pub method: Method,
  pub url: Url,
  pub query: Vec<(String, String)>,
  pub headers: Vec<(String, String)>,
  pub body: Option<Payload>,
}

/// Raw response: status plus undecoded body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

/// Sends requests over the wire.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Production transport over reqwest.
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new(timeout: Duration) -> Result<Self, ApiError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!("fsadmin/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { client })
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
    let mut builder = self.client.request(request.method, request.url);
    if !request.query.is_empty() {
      builder = builder.query(&request.query);
    }
    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }

    builder = match request.body {
      Some(Payload::Json(body)) => builder.json(&body),
      Some(Payload::Multipart(parts)) => builder.multipart(build_form(parts)),
      None => builder,
    };

    let response = builder.send().await?;
    let status = response.status().as_u16();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse { status, body })
  }
}

fn build_form(parts: Vec<FormPart>) -> Form {
  parts.into_iter().fold(Form::new(), |form, part| match part {
    FormPart::Text { name, value } => form.text(name, value),
    FormPart::File {
      name,
      file_name,
      bytes,
    } => form.part(name, Part::bytes(bytes).file_name(file_name)),
  })
}

/// Optional pieces of a request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
  pub params: Vec<(String, String)>,
  pub body: Option<Payload>,
  pub headers: Vec<(String, String)>,
}

impl RequestOptions {
  pub fn params(params: Vec<(String, String)>) -> Self {
    Self {
      params,
      ..Default::default()
    }
  }

  pub fn body(body: Payload) -> Self {
    Self {
      body: Some(body),
      ..Default::default()
    }
  }
}

/// Authenticated JSON client for the admin API.
///
/// Adds the bearer token from the session to every request and tears the
/// session down when the server answers 401.
#[derive(Clone)]
pub struct HttpClient {
  transport: Arc<dyn Transport>,
  base_url: String,
  session: Session,
}

impl HttpClient {
  pub fn new(config: &Config, session: Session) -> Result<Self, ApiError> {
    let transport = ReqwestTransport::new(Duration::from_secs(config.api.timeout_secs))?;
    Ok(Self::with_transport(
      Arc::new(transport),
      &config.api.base_url,
      session,
    ))
  }

  pub fn with_transport(transport: Arc<dyn Transport>, base_url: &str, session: Session) -> Self {
    Self {
      transport,
      base_url: base_url.trim_end_matches('/').to_string(),
      session,
    }
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  fn url(&self, path: &str) -> Result<Url, ApiError> {
    let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
    Url::parse(&joined).map_err(|e| ApiError::Network(format!("invalid URL {}: {}", joined, e)))
  }

  /// Issue a request and decode the JSON envelope.
  pub async fn request(
    &self,
    method: Method,
    path: &str,
    options: RequestOptions,
  ) -> Result<Envelope, ApiError> {
    let url = self.url(path)?;
    let mut headers = options.headers;
    if let Some(token) = self.session.token() {
      headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
    }

    debug!(
      method = %method,
      url = %url,
      has_token = self.session.is_authenticated(),
      "API request"
    );

    let request = HttpRequest {
      method: method.clone(),
      url: url.clone(),
      query: options.params,
      headers,
      body: options.body,
    };

    let response = match self.transport.send(request).await {
      Ok(response) => response,
      Err(e) => {
        warn!(method = %method, url = %url, error = %e, "API request failed");
        return Err(e);
      }
    };

    let body = decode_body(&response.body);

    if response.status == 401 {
      warn!(url = %url, "Unauthorized, clearing session");
      self.session.expire();
      return Err(ApiError::Unauthorized { body: body.ok() });
    }

    if !(200..300).contains(&response.status) {
      warn!(status = response.status, url = %url, "API response error");
      return Err(ApiError::Http {
        status: response.status,
        body: body.ok(),
      });
    }

    let value = body.map_err(|e| ApiError::Decode(e.to_string()))?;
    debug!(status = response.status, url = %url, "API response");
    Ok(Envelope::new(value))
  }

  pub async fn get(&self, path: &str, params: Vec<(String, String)>) -> Result<Envelope, ApiError> {
    self
      .request(Method::GET, path, RequestOptions::params(params))
      .await
  }

  pub async fn post(&self, path: &str, body: Option<Payload>) -> Result<Envelope, ApiError> {
    let options = body.map(RequestOptions::body).unwrap_or_default();
    self.request(Method::POST, path, options).await
  }

  pub async fn put(&self, path: &str, body: Option<Payload>) -> Result<Envelope, ApiError> {
    let options = body.map(RequestOptions::body).unwrap_or_default();
    self.request(Method::PUT, path, options).await
  }

  pub async fn delete(&self, path: &str) -> Result<Envelope, ApiError> {
    self
      .request(Method::DELETE, path, RequestOptions::default())
      .await
  }
}

/// Empty bodies decode to `null`.
fn decode_body(body: &[u8]) -> serde_json::Result<Value> {
  if body.iter().all(u8::is_ascii_whitespace) {
    Ok(Value::Null)
  } else {
    serde_json::from_slice(body)
  }
}

#[cfg(test)]
pub(crate) mod testing {
  //! Scripted transport for exercising the client stack without a network.

  use super::*;
  use std::collections::{HashMap, VecDeque};
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  /// A canned reply for one request.
  #[derive(Debug, Clone)]
  pub enum Reply {
    Json(u16, Value),
    Fail(ApiError),
  }

  /// Transport that answers from per-route queues and records every request.
  ///
  /// Routes are keyed by `"<METHOD> <path>"`. The last reply of a queue is
  /// repeated once the queue drains.
  #[derive(Default)]
  pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    log: Mutex<Vec<HttpRequest>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
  }

  impl ScriptedTransport {
    pub fn new() -> Self {
      Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
      self.delay = Some(delay);
      self
    }

    pub fn on(self, route: &str, reply: Reply) -> Self {
      self
        .routes
        .lock()
        .unwrap()
        .entry(route.to_string())
        .or_default()
        .push_back(reply);
      self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
      self.log.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, route: &str) -> usize {
      self
        .requests()
        .iter()
        .filter(|r| route_key(r) == route)
        .count()
    }
  }

  /// `"<METHOD> <path relative to /api/v1>"`.
  pub fn route_key(request: &HttpRequest) -> String {
    let path = request.url.path();
    let path = path.strip_prefix("/api/v1").unwrap_or(path);
    format!("{} {}", request.method, path)
  }

  #[async_trait]
  impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      let key = route_key(&request);
      self.log.lock().unwrap().push(request);

      if let Some(delay) = self.delay {
        tokio::time::sleep(delay).await;
      }

      let reply = {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&key) {
          Some(queue) if queue.len() > 1 => queue.pop_front(),
          Some(queue) => queue.front().cloned(),
          None => None,
        }
      };

      match reply {
        Some(Reply::Json(status, body)) => Ok(HttpResponse {
          status,
          body: serde_json::to_vec(&body).unwrap(),
        }),
        Some(Reply::Fail(e)) => Err(e),
        None => Ok(HttpResponse {
          status: 404,
          body: serde_json::to_vec(&serde_json::json!({ "message": "no route" })).unwrap(),
        }),
      }
    }
  }

  pub const BASE_URL: &str = "https://shop.test/api/v1";

  pub fn client(transport: Arc<ScriptedTransport>, session: Session) -> HttpClient {
    HttpClient::with_transport(transport, BASE_URL, session)
  }
}

#[cfg(test)]
mod tests {
  use super::testing::{client, Reply, ScriptedTransport};
  use super::*;
  use crate::session::SessionEvent;
  use serde_json::json;

  #[tokio::test]
  async fn test_attaches_bearer_token() {
    let transport = Arc::new(
      ScriptedTransport::new().on("GET /admin/getProfile", Reply::Json(200, json!({ "data": {} }))),
    );
    let session = Session::ephemeral();
    session.sign_in("tok123".into(), json!({})).unwrap();

    client(transport.clone(), session)
      .get("/admin/getProfile", vec![])
      .await
      .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0]
      .headers
      .contains(&("Authorization".to_string(), "Bearer tok123".to_string())));
    assert_eq!(requests[0].url.as_str(), "https://shop.test/api/v1/admin/getProfile");
  }

  #[tokio::test]
  async fn test_no_token_no_header() {
    let transport =
      Arc::new(ScriptedTransport::new().on("GET /admin/getOrders", Reply::Json(200, json!([]))));
    client(transport.clone(), Session::ephemeral())
      .get("/admin/getOrders", vec![("page".into(), "1".into())])
      .await
      .unwrap();

    let request = &transport.requests()[0];
    assert!(request.headers.is_empty());
    assert_eq!(request.query, vec![("page".to_string(), "1".to_string())]);
  }

  #[tokio::test]
  async fn test_unauthorized_clears_session_and_requests_login() {
    let transport = Arc::new(ScriptedTransport::new().on(
      "GET /admin/getAllUsers",
      Reply::Json(401, json!({ "message": "jwt expired" })),
    ));
    let session = Session::ephemeral();
    session.sign_in("old".into(), json!({})).unwrap();
    let mut events = session.subscribe();

    let err = client(transport, session.clone())
      .get("/admin/getAllUsers", vec![])
      .await
      .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(err.message(), Some("jwt expired"));
    assert!(session.token().is_none());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::LoginRequired);
  }

  #[tokio::test]
  async fn test_server_error_carries_status_and_body() {
    let transport = Arc::new(ScriptedTransport::new().on(
      "DELETE /admin/deleteUser/7",
      Reply::Json(500, json!({ "message": "boom" })),
    ));
    let err = client(transport, Session::ephemeral())
      .delete("/admin/deleteUser/7")
      .await
      .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(err.message(), Some("boom"));
  }

  #[tokio::test]
  async fn test_transport_failure_passes_through() {
    let transport = Arc::new(
      ScriptedTransport::new().on("GET /admin/getDashboard", Reply::Fail(ApiError::Timeout)),
    );
    let err = client(transport, Session::ephemeral())
      .get("/admin/getDashboard", vec![])
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Timeout));
  }

  #[test]
  fn test_decode_empty_body_is_null() {
    assert_eq!(decode_body(b"").unwrap(), Value::Null);
    assert_eq!(decode_body(b"  \n").unwrap(), Value::Null);
    assert!(decode_body(b"<html>").is_err());
  }
}
