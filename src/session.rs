//! Authenticated admin session.
//!
//! The session is an explicit object handed to the HTTP client and the admin
//! facade. It is initialized from the persisted store at startup and torn
//! down on logout or when the server answers 401. Interested parties learn
//! about transitions through [`Session::subscribe`].

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::db::Database;

const TOKEN_KEY: &str = "adminToken";
const USER_KEY: &str = "adminUser";

/// Token and user as persisted between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
  pub access_token: String,
  pub user: Value,
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
  SignedIn,
  SignedOut,
  /// The server rejected the token; the user has to log in again.
  LoginRequired,
}

/// Persistence backend for session state.
pub trait SessionStore: Send + Sync {
  fn load(&self) -> Result<Option<StoredSession>>;
  fn save(&self, session: &StoredSession) -> Result<()>;
  fn clear(&self) -> Result<()>;
}

impl SessionStore for Database {
  fn load(&self) -> Result<Option<StoredSession>> {
    let Some(access_token) = self.get(TOKEN_KEY)? else {
      return Ok(None);
    };
    let user = match self.get(USER_KEY)? {
      Some(raw) => serde_json::from_str(&raw)
        .map_err(|e| eyre!("Failed to parse stored user: {}", e))?,
      None => Value::Null,
    };
    Ok(Some(StoredSession { access_token, user }))
  }

  fn save(&self, session: &StoredSession) -> Result<()> {
    let user = session.user.to_string();
    self.set_many(&[
      (TOKEN_KEY, session.access_token.as_str()),
      (USER_KEY, user.as_str()),
    ])
  }

  fn clear(&self) -> Result<()> {
    self.remove(&[TOKEN_KEY, USER_KEY])
  }
}

/// Store that keeps nothing across runs.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore;

#[cfg(test)]
impl SessionStore for MemoryStore {
  fn load(&self) -> Result<Option<StoredSession>> {
    Ok(None)
  }

  fn save(&self, _session: &StoredSession) -> Result<()> {
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    Ok(())
  }
}

struct SessionInner {
  store: Box<dyn SessionStore>,
  current: RwLock<Option<StoredSession>>,
  events: broadcast::Sender<SessionEvent>,
}

/// Shared handle to the current admin session.
#[derive(Clone)]
pub struct Session {
  inner: Arc<SessionInner>,
}

impl Session {
  /// Load any persisted session from `store`.
  pub fn init(store: impl SessionStore + 'static) -> Result<Self> {
    let current = store.load()?;
    let (events, _) = broadcast::channel(16);

    Ok(Self {
      inner: Arc::new(SessionInner {
        store: Box::new(store),
        current: RwLock::new(current),
        events,
      }),
    })
  }

  /// A session that starts signed out and persists nothing.
  #[cfg(test)]
  pub fn ephemeral() -> Self {
    let (events, _) = broadcast::channel(16);
    Self {
      inner: Arc::new(SessionInner {
        store: Box::new(MemoryStore),
        current: RwLock::new(None),
        events,
      }),
    }
  }

  pub fn token(&self) -> Option<String> {
    self.read().as_ref().map(|s| s.access_token.clone())
  }

  pub fn user(&self) -> Option<Value> {
    self.read().as_ref().map(|s| s.user.clone())
  }

  pub fn is_authenticated(&self) -> bool {
    self.read().is_some()
  }

  pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
    self.inner.events.subscribe()
  }

  /// Persist a fresh login.
  pub fn sign_in(&self, access_token: String, user: Value) -> Result<()> {
    let session = StoredSession { access_token, user };
    self.inner.store.save(&session)?;
    *self.write() = Some(session);
    self.notify(SessionEvent::SignedIn);
    Ok(())
  }

  /// Explicit logout.
  pub fn sign_out(&self) -> Result<()> {
    self.inner.store.clear()?;
    *self.write() = None;
    self.notify(SessionEvent::SignedOut);
    Ok(())
  }

  /// Tear down after the server rejected the token.
  ///
  /// Never fails: a store error is logged and the in-memory session is
  /// cleared regardless.
  pub fn expire(&self) {
    info!("Session rejected by server, clearing credentials");
    if let Err(e) = self.inner.store.clear() {
      warn!("Failed to clear persisted session: {}", e);
    }
    *self.write() = None;
    self.notify(SessionEvent::LoginRequired);
  }

  fn notify(&self, event: SessionEvent) {
    // no receivers is fine
    let _ = self.inner.events.send(event);
  }

  fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<StoredSession>> {
    self
      .inner
      .current
      .read()
      .unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<StoredSession>> {
    self
      .inner
      .current
      .write()
      .unwrap_or_else(PoisonError::into_inner)
  }
}

impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("authenticated", &self.is_authenticated())
      .finish_non_exhaustive()
  }
}
