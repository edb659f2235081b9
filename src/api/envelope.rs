//! Response envelopes and the collection normalizer.
//!
//! The Free Shops API nests list results under different keys depending on
//! the endpoint (`data`, `data.docs`, `data.products`, `result`, ...). The
//! normalizer walks a fixed, priority-ordered table of extraction rules and
//! returns the first array it finds, or an empty collection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw JSON body returned by the API, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(Value);

impl Envelope {
  pub fn new(value: Value) -> Self {
    Self(value)
  }

  pub fn as_value(&self) -> &Value {
    &self.0
  }

  pub fn into_value(self) -> Value {
    self.0
  }

  /// The `data` member, or the whole body when there is none.
  pub fn payload(&self) -> &Value {
    self.0.get("data").unwrap_or(&self.0)
  }

  /// Top-level `message` string, if the server sent one.
  pub fn message(&self) -> Option<&str> {
    self.0.get("message").and_then(Value::as_str)
  }
}

impl From<Value> for Envelope {
  fn from(value: Value) -> Self {
    Self(value)
  }
}

/// One extraction rule of the normalizer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction<'a> {
  /// The envelope itself is an array.
  Root,
  /// `envelope.data` is an array.
  Data,
  /// `envelope.data.<field>` is an array.
  DataField(&'a str),
  /// `envelope.<field>` is an array.
  Field(&'a str),
  /// `envelope.result` is an array.
  Result,
}

impl<'a> Extraction<'a> {
  /// Select the array this rule points at, if present.
  pub fn select<'v>(&self, value: &'v Value) -> Option<&'v Vec<Value>> {
    let target = match self {
      Extraction::Root => Some(value),
      Extraction::Data => value.get("data"),
      Extraction::DataField(field) => value.get("data").and_then(|d| d.get(*field)),
      Extraction::Field(field) => value.get(*field),
      Extraction::Result => value.get("result"),
    };
    target.and_then(Value::as_array)
  }
}

/// Build the ordered rule table for a resource's field-name hints.
pub fn rules<'a>(hints: &[&'a str]) -> Vec<Extraction<'a>> {
  let mut table = Vec::with_capacity(hints.len() * 2 + 3);
  table.push(Extraction::Root);
  table.push(Extraction::Data);
  table.extend(hints.iter().map(|h| Extraction::DataField(*h)));
  table.extend(hints.iter().map(|h| Extraction::Field(*h)));
  table.push(Extraction::Result);
  table
}

/// Outcome of matching an envelope against the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape<'a> {
  Recognized(Extraction<'a>),
  Unknown,
}

/// Find the first rule that matches the envelope.
pub fn classify<'a>(envelope: &Envelope, hints: &[&'a str]) -> Shape<'a> {
  rules(hints)
    .into_iter()
    .find(|rule| rule.select(envelope.as_value()).is_some())
    .map_or(Shape::Unknown, Shape::Recognized)
}

/// Extract the canonical collection from an envelope.
///
/// Total: envelopes of unknown shape yield an empty collection.
pub fn normalize(envelope: &Envelope, hints: &[&str]) -> Vec<Record> {
  match classify(envelope, hints) {
    Shape::Recognized(rule) => rule
      .select(envelope.as_value())
      .map(|items| items.iter().cloned().map(Record).collect())
      .unwrap_or_default(),
    Shape::Unknown => Vec::new(),
  }
}

/// A single entity as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Value);

impl Record {
  /// Entity id: `_id`, falling back to `id`.
  pub fn id(&self) -> Option<String> {
    ["_id", "id"].iter().find_map(|field| match self.0.get(field)? {
      Value::String(s) => Some(s.clone()),
      Value::Number(n) => Some(n.to_string()),
      _ => None,
    })
  }

  /// String field, if present.
  pub fn str_field(&self, field: &str) -> Option<&str> {
    self.0.get(field).and_then(Value::as_str)
  }

  /// Best-effort display label used by list output.
  pub fn label(&self) -> Option<&str> {
    ["name", "title", "fullName", "productName", "email", "orderId"]
      .iter()
      .find_map(|f| self.str_field(f))
  }

  pub fn as_value(&self) -> &Value {
    &self.0
  }
}

/// Paging metadata reported alongside a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
  pub total_pages: u64,
  pub total_docs: u64,
}

impl Pagination {
  /// Read `data.totalPages` / `data.totalDocs`, defaulting to a single page
  /// holding `count` records.
  pub fn from_envelope(envelope: &Envelope, count: usize) -> Self {
    let data = envelope.as_value().get("data");
    let total_pages = data
      .and_then(|d| d.get("totalPages"))
      .and_then(Value::as_u64)
      .filter(|p| *p > 0);

    match total_pages {
      Some(total_pages) => Self {
        total_pages,
        total_docs: data
          .and_then(|d| d.get("totalDocs"))
          .and_then(Value::as_u64)
          .unwrap_or(0),
      },
      None => Self {
        total_pages: 1,
        total_docs: count as u64,
      },
    }
  }
}

/// Normalized list result, as stored in the query cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
  pub records: Vec<Record>,
  pub pagination: Pagination,
}

impl Listing {
  pub fn from_envelope(envelope: &Envelope, hints: &[&str]) -> Self {
    let records = normalize(envelope, hints);
    let pagination = Pagination::from_envelope(envelope, records.len());
    Self {
      records,
      pagination,
    }
  }

  pub fn ids(&self) -> Vec<String> {
    self.records.iter().filter_map(Record::id).collect()
  }
}
