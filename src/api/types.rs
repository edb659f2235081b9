//! Request payloads, list filters and typed views over dashboard envelopes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::envelope::Envelope;

/// Filters shared by every list screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
  pub search: Option<String>,
  pub status: Option<String>,
  pub category: Option<String>,
  pub page: Option<u32>,
  pub limit: Option<u32>,
  /// Endpoint-specific filters (e.g. `filterType`).
  pub extra: Vec<(String, String)>,
}

impl ListParams {
  pub fn with_status(mut self, status: impl Into<String>) -> Self {
    self.status = Some(status.into());
    self
  }

  pub fn with_search(mut self, search: impl Into<String>) -> Self {
    self.search = Some(search.into());
    self
  }

  pub fn with_page(mut self, page: u32, limit: u32) -> Self {
    self.page = Some(page);
    self.limit = Some(limit);
    self
  }

  /// Query pairs in the API's parameter names. Empty values are skipped and
  /// each name appears once, keeping its first non-empty value.
  pub fn to_query(&self) -> Vec<(String, String)> {
    let mut query: Vec<(String, String)> = Vec::new();
    let mut push = |name: &str, value: Option<String>| {
      let Some(v) = value.filter(|v| !v.is_empty()) else {
        return;
      };
      if query.iter().any(|(existing, _)| existing == name) {
        return;
      }
      query.push((name.to_string(), v));
    };

    push("search", self.search.clone());
    push("status", self.status.clone());
    push("category", self.category.clone());
    push("page", self.page.map(|p| p.to_string()));
    push("limit", self.limit.map(|l| l.to_string()));
    for (k, v) in &self.extra {
      push(k.as_str(), Some(v.clone()));
    }

    query
  }
}

/// One multipart form part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
  Text {
    name: String,
    value: String,
  },
  File {
    name: String,
    file_name: String,
    bytes: Vec<u8>,
  },
}

impl FormPart {
  pub fn name(&self) -> &str {
    match self {
      FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
    }
  }

  fn is_filled(&self) -> bool {
    match self {
      FormPart::Text { value, .. } => !value.trim().is_empty(),
      FormPart::File { bytes, .. } => !bytes.is_empty(),
    }
  }
}

/// Request body for create/update calls, passed to the transport as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
  Json(Value),
  Multipart(Vec<FormPart>),
}

impl Payload {
  /// Build a payload from text fields, as JSON or multipart.
  pub fn from_fields(fields: Vec<(String, String)>, files: Vec<FormPart>, multipart: bool) -> Self {
    if multipart || !files.is_empty() {
      let mut parts: Vec<FormPart> = fields
        .into_iter()
        .map(|(name, value)| FormPart::Text { name, value })
        .collect();
      parts.extend(files);
      Payload::Multipart(parts)
    } else {
      let map: Map<String, Value> = fields
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
      Payload::Json(Value::Object(map))
    }
  }

  /// Whether `field` is present with a non-empty value.
  pub fn has_field(&self, field: &str) -> bool {
    match self {
      Payload::Json(value) => match value.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
      },
      Payload::Multipart(parts) => parts.iter().any(|p| p.name() == field && p.is_filled()),
    }
  }
}

/// Login request body.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
  pub email: String,
  pub password: String,
}

/// Login response: `{ accessToken, data: <user> }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
  pub access_token: Option<String>,
  #[serde(default)]
  pub data: Value,
  pub message: Option<String>,
}

/// Headline metrics from the dashboard endpoint.
///
/// Values and changes are kept as raw JSON: the server sends numbers or
/// preformatted strings for either.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
  pub active_users: Option<Value>,
  pub active_users_change: Option<Value>,
  pub total_buyers: Option<Value>,
  pub total_buyers_change: Option<Value>,
  pub total_sellers: Option<Value>,
  pub total_sellers_change: Option<Value>,
  pub total_sales: Option<Value>,
  pub total_sales_change: Option<Value>,
}

impl DashboardStats {
  pub fn from_envelope(envelope: &Envelope) -> Self {
    serde_json::from_value(envelope.payload().clone()).unwrap_or_default()
  }

  /// Rows of `(label, value, change)`, skipping metrics the server omitted.
  pub fn rows(&self) -> Vec<(&'static str, String, Option<String>)> {
    [
      ("Active users", &self.active_users, &self.active_users_change),
      ("Total buyers", &self.total_buyers, &self.total_buyers_change),
      ("Total sellers", &self.total_sellers, &self.total_sellers_change),
      ("Total sales", &self.total_sales, &self.total_sales_change),
    ]
    .into_iter()
    .filter_map(|(label, value, change)| {
      let value = display(value.as_ref()?)?;
      Some((label, value, change.as_ref().and_then(display)))
    })
    .collect()
  }
}

fn display(value: &Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::String(s) => Some(s.clone()),
    other => Some(other.to_string()),
  }
}

const MONTHS: [&str; 12] = [
  "january",
  "february",
  "march",
  "april",
  "may",
  "june",
  "july",
  "august",
  "september",
  "october",
  "november",
  "december",
];

/// Monthly sales series from the graph endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphSeries {
  /// `(month, sales)` for each month the server reported.
  pub monthly_sales: Vec<(String, f64)>,
  /// Optional `revenue` series, passed through unchanged.
  pub revenue: Option<Value>,
}

impl GraphSeries {
  pub fn from_envelope(envelope: &Envelope) -> Self {
    let data = envelope.payload();
    let monthly_sales = MONTHS
      .iter()
      .filter_map(|m| data.get(*m).and_then(Value::as_f64).map(|v| (m.to_string(), v)))
      .collect();

    Self {
      monthly_sales,
      revenue: data.get("revenue").cloned(),
    }
  }
}
