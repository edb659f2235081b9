//! Resource operations over the HTTP client.
//!
//! `ResourceService` executes the catalog in [`super::resources`]: it turns
//! list/get/create/update/delete on a [`ResourceDef`] into HTTP calls and
//! applies the route fallback policy.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use tracing::{debug, warn};

use super::client::HttpClient;
use super::endpoints as ep;
use super::envelope::{classify, Envelope, Listing, Shape};
use super::error::ApiError;
use super::resources::{ResourceDef, Route};
use super::types::{Credentials, ListParams, LoginResponse, Payload};

/// Auto-dealership landing section a bulk upload targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
  Data,
  Promoted,
  Everything,
}

impl Section {
  pub fn path(self) -> &'static str {
    match self {
      Section::Data => ep::ADD_DATA_IN_DATA,
      Section::Promoted => ep::ADD_DATA_IN_PROMOTED,
      Section::Everything => ep::ADD_DATA_IN_EVERYTHING,
    }
  }
}

impl FromStr for Section {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "data" => Ok(Section::Data),
      "promoted" => Ok(Section::Promoted),
      "everything" => Ok(Section::Everything),
      other => Err(format!(
        "unknown section '{}', expected data, promoted or everything",
        other
      )),
    }
  }
}

impl fmt::Display for Section {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Section::Data => "data",
      Section::Promoted => "promoted",
      Section::Everything => "everything",
    };
    f.write_str(name)
  }
}

#[derive(Clone)]
pub struct ResourceService {
  client: HttpClient,
}

impl ResourceService {
  pub fn new(client: HttpClient) -> Self {
    Self { client }
  }

  pub fn client(&self) -> &HttpClient {
    &self.client
  }

  /// Fetch one page of `resource` and normalize it.
  pub async fn list(&self, resource: &ResourceDef, params: &ListParams) -> Result<Listing, ApiError> {
    let query = params.to_query();
    let client = &self.client;

    let envelope = with_fallback(resource.name, resource.list, |path| {
      let query = query.clone();
      async move { client.get(&path, query).await }
    })
    .await?;

    if let Shape::Unknown = classify(&envelope, resource.envelope_fields) {
      debug!(resource = resource.name, "unrecognized list envelope, treating as empty");
    }
    Ok(Listing::from_envelope(&envelope, resource.envelope_fields))
  }

  /// Fetch a single entity.
  pub async fn get(&self, resource: &ResourceDef, id: &str) -> Result<Envelope, ApiError> {
    let route = supported(resource, resource.detail, "get")?;
    let client = &self.client;
    with_fallback(resource.name, route, |path| async move {
      client.get(&Route::path_for(&path, id), Vec::new()).await
    })
    .await
  }

  /// Create an entity. Required fields are checked before anything is sent.
  pub async fn create(&self, resource: &ResourceDef, payload: Payload) -> Result<Envelope, ApiError> {
    let route = supported(resource, resource.create, "create")?;
    validate(resource, &payload)?;

    let client = &self.client;
    with_fallback(resource.name, route, |path| {
      let payload = payload.clone();
      async move { client.post(&path, Some(payload)).await }
    })
    .await
  }

  pub async fn update(
    &self,
    resource: &ResourceDef,
    id: &str,
    payload: Payload,
  ) -> Result<Envelope, ApiError> {
    let route = supported(resource, resource.update, "update")?;
    let client = &self.client;
    with_fallback(resource.name, route, |path| {
      let payload = payload.clone();
      async move { client.put(&Route::path_for(&path, id), Some(payload)).await }
    })
    .await
  }

  pub async fn delete(&self, resource: &ResourceDef, id: &str) -> Result<Envelope, ApiError> {
    let route = supported(resource, resource.delete, "delete")?;
    let client = &self.client;
    with_fallback(resource.name, route, |path| async move {
      client.delete(&Route::path_for(&path, id)).await
    })
    .await
  }

  /// Flip a user between active and blocked.
  pub async fn toggle_user_status(&self, id: &str) -> Result<Envelope, ApiError> {
    self
      .client
      .put(&Route::path_for(ep::BLOCK_USER, id), None)
      .await
  }

  /// Upload entries into one of the auto-dealership landing sections.
  pub async fn dealership_section(&self, section: Section, payload: Payload) -> Result<Envelope, ApiError> {
    self.client.post(section.path(), Some(payload)).await
  }

  pub async fn send_notification(&self, payload: Payload) -> Result<Envelope, ApiError> {
    self.client.post(ep::SEND_NOTIFICATION, Some(payload)).await
  }

  pub async fn update_settings(&self, payload: Payload) -> Result<Envelope, ApiError> {
    self.client.post(ep::UPDATE_SETTINGS, Some(payload)).await
  }

  /// Exchange credentials for an access token. Does not touch the session.
  pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
    let body = serde_json::to_value(credentials).map_err(|e| ApiError::Decode(e.to_string()))?;
    let envelope = self.client.post(ep::LOGIN, Some(Payload::Json(body))).await?;
    serde_json::from_value(envelope.into_value()).map_err(|e| ApiError::Decode(e.to_string()))
  }

  pub async fn profile(&self) -> Result<Envelope, ApiError> {
    self.client.get(ep::PROFILE, Vec::new()).await
  }

  pub async fn dashboard(&self) -> Result<Envelope, ApiError> {
    self.client.get(ep::DASHBOARD, Vec::new()).await
  }

  /// Graph series, e.g. `graph_data("year", "2025")`.
  pub async fn graph_data(&self, filter_type: &str, value: &str) -> Result<Envelope, ApiError> {
    let params = vec![
      ("filterType".to_string(), filter_type.to_string()),
      ("value".to_string(), value.to_string()),
    ];
    self.client.get(ep::GRAPH_DATA, params).await
  }
}

fn supported(
  resource: &ResourceDef,
  route: Option<Route>,
  operation: &'static str,
) -> Result<Route, ApiError> {
  route.ok_or(ApiError::Unsupported {
    resource: resource.name,
    operation,
  })
}

fn validate(resource: &ResourceDef, payload: &Payload) -> Result<(), ApiError> {
  match resource
    .required_fields
    .iter()
    .find(|field| !payload.has_field(field))
  {
    Some(field) => Err(ApiError::Validation(format!("{} is required", field))),
    None => Ok(()),
  }
}

/// Call the primary path; on failure, try the fallback once.
///
/// A 401 is final: the session is already gone, so the fallback would fail
/// the same way.
async fn with_fallback<F, Fut>(resource: &str, route: Route, call: F) -> Result<Envelope, ApiError>
where
  F: Fn(String) -> Fut,
  Fut: Future<Output = Result<Envelope, ApiError>>,
{
  match call(route.primary.to_string()).await {
    Ok(envelope) => Ok(envelope),
    Err(e @ ApiError::Unauthorized { .. }) => Err(e),
    Err(e) => match route.fallback {
      Some(fallback) => {
        warn!(
          resource,
          primary = route.primary,
          fallback,
          error = %e,
          "Primary route failed, trying fallback"
        );
        call(fallback.to_string()).await
      }
      None => Err(e),
    },
  }
}

/// Server message of an envelope, or a generic confirmation.
pub fn confirmation(envelope: &Envelope, fallback: &str) -> String {
  envelope
    .message()
    .map(str::to_string)
    .unwrap_or_else(|| fallback.to_string())
}
