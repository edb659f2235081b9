//! Cache addresses.

use std::collections::BTreeMap;
use std::fmt;

use crate::api::types::ListParams;

/// Address of a cached query: resource name plus filter parameters.
///
/// Parameters are kept sorted and empty values are dropped, so two logically
/// identical requests always land on the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
  resource: String,
  params: BTreeMap<String, String>,
}

impl ResourceKey {
  pub fn new(resource: impl Into<String>) -> Self {
    Self {
      resource: resource.into(),
      params: BTreeMap::new(),
    }
  }

  /// Key for a filtered list.
  pub fn list(resource: &str, params: &ListParams) -> Self {
    params
      .to_query()
      .into_iter()
      .fold(Self::new(resource), |key, (k, v)| key.with_param(k, v))
  }

  /// Key for a single entity of `resource`.
  pub fn detail(resource: &str, id: &str) -> Self {
    Self::new(resource).with_param("id", id)
  }

  pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    let value = value.into();
    if !value.is_empty() {
      self.params.insert(name.into(), value);
    }
    self
  }

  pub fn resource(&self) -> &str {
    &self.resource
  }
}

impl fmt::Display for ResourceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.resource)?;
    for (i, (k, v)) in self.params.iter().enumerate() {
      let sep = if i == 0 { '?' } else { '&' };
      write!(f, "{}{}={}", sep, k, v)?;
    }
    Ok(())
  }
}

/// Which cached keys an invalidation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelector {
  /// One exact key.
  Exact(ResourceKey),
  /// Every key of a resource, whatever its parameters.
  Resource(String),
}

impl KeySelector {
  pub fn resource(name: impl Into<String>) -> Self {
    KeySelector::Resource(name.into())
  }

  pub fn matches(&self, key: &ResourceKey) -> bool {
    match self {
      KeySelector::Exact(exact) => exact == key,
      KeySelector::Resource(name) => key.resource() == name,
    }
  }
}

impl From<ResourceKey> for KeySelector {
  fn from(key: ResourceKey) -> Self {
    KeySelector::Exact(key)
  }
}

impl fmt::Display for KeySelector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      KeySelector::Exact(key) => write!(f, "{}", key),
      KeySelector::Resource(name) => write!(f, "{}:*", name),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_param_order_does_not_matter() {
    let a = ResourceKey::new("products")
      .with_param("status", "Pending")
      .with_param("page", "1");
    let b = ResourceKey::new("products")
      .with_param("page", "1")
      .with_param("status", "Pending");
    assert_eq!(a, b);
    assert_eq!(a.to_string(), "products?page=1&status=Pending");
  }

  #[test]
  fn test_empty_values_are_dropped() {
    let params = ListParams {
      search: Some(String::new()),
      status: Some("Pending".into()),
      ..Default::default()
    };
    assert_eq!(
      ResourceKey::list("products", &params),
      ResourceKey::new("products").with_param("status", "Pending")
    );
    assert_eq!(
      ResourceKey::list("users", &ListParams::default()),
      ResourceKey::new("users")
    );
  }

  #[test]
  fn test_duplicate_extra_params_match_query() {
    let params = ListParams {
      extra: vec![
        ("value".into(), "2024".into()),
        ("value".into(), "2025".into()),
      ],
      ..Default::default()
    };
    let key = ResourceKey::list("graph", &params);
    assert_eq!(key, ResourceKey::new("graph").with_param("value", "2024"));
    assert_eq!(params.to_query().len(), 1);
  }

  #[test]
  fn test_resource_selector() {
    let selector = KeySelector::resource("products");
    assert!(selector.matches(&ResourceKey::new("products")));
    assert!(selector.matches(&ResourceKey::detail("products", "1")));
    assert!(!selector.matches(&ResourceKey::new("users")));
    assert_eq!(selector.to_string(), "products:*");
  }

  #[test]
  fn test_exact_selector() {
    let key = ResourceKey::new("products").with_param("page", "2");
    let selector = KeySelector::from(key.clone());
    assert!(selector.matches(&key));
    assert!(!selector.matches(&ResourceKey::new("products")));
  }
}
