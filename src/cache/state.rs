//! Observable state of a cached query.

use chrono::{DateTime, Utc};

use crate::api::error::ApiError;

/// The state of a query, as seen by subscribers.
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(ApiError),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn status(&self) -> EntryStatus {
    match self {
      QueryState::Idle => EntryStatus::Idle,
      QueryState::Loading => EntryStatus::Pending,
      QueryState::Success(_) => EntryStatus::Success,
      QueryState::Error(_) => EntryStatus::Error,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
  Idle,
  Pending,
  Success,
  Error,
}

/// Point-in-time copy of a cache entry.
///
/// `value` is the last successful result. It survives a later failed fetch,
/// so an `Error` entry may still carry data.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
  pub status: EntryStatus,
  pub value: Option<T>,
  pub error: Option<ApiError>,
  pub last_fetched_at: Option<DateTime<Utc>>,
  pub stale: bool,
}
