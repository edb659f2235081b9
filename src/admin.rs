//! Admin client that wraps ResourceService with the query cache.
//!
//! Reads go through the cache; writes go through `mutate` so the resources
//! they affect are refetched on the next read.

use color_eyre::{eyre::eyre, Result};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::envelope::{Envelope, Listing};
use crate::api::error::ApiError;
use crate::api::resources::{self, ResourceDef, AUTO_DEALERSHIPS, NOTIFICATIONS, USERS};
use crate::api::service::{ResourceService, Section};
use crate::api::types::{Credentials, ListParams, LoginResponse, Payload};
use crate::api::HttpClient;
use crate::cache::{CacheConfig, CacheEntry, KeySelector, QueryCache, QueryState, ResourceKey};
use crate::config::Config;
use crate::session::Session;

/// Outcome of a bulk delete. Each id either made it or carries its error.
#[derive(Debug, Default)]
pub struct BulkDeleteReport {
  pub deleted: Vec<String>,
  pub failed: Vec<(String, ApiError)>,
}

impl BulkDeleteReport {
  pub fn is_complete(&self) -> bool {
    self.failed.is_empty()
  }
}

/// Admin API client with transparent caching.
#[derive(Clone)]
pub struct AdminClient {
  service: ResourceService,
  lists: QueryCache<Arc<Listing>>,
  documents: QueryCache<Arc<Envelope>>,
}

impl AdminClient {
  pub fn new(config: &Config, session: Session) -> Result<Self> {
    let client = HttpClient::new(config, session)?;
    Ok(Self::with_service(
      ResourceService::new(client),
      config.cache.to_cache_config()?,
    ))
  }

  pub fn with_service(service: ResourceService, cache: CacheConfig) -> Self {
    Self {
      service,
      lists: QueryCache::new(cache),
      documents: QueryCache::new(cache),
    }
  }

  pub fn session(&self) -> &Session {
    self.service.client().session()
  }

  /// One page of `resource`, from cache when fresh.
  pub async fn list(&self, resource: &ResourceDef, params: &ListParams) -> Result<Arc<Listing>, ApiError> {
    let key = ResourceKey::list(resource.name, params);
    let result = self.lists.read(&key, self.list_fetcher(resource, params)).await;
    self.guard(result)
  }

  /// Like [`list`](Self::list) but always goes to the server, dropping any
  /// cached page first.
  pub async fn refresh_list(
    &self,
    resource: &ResourceDef,
    params: &ListParams,
  ) -> Result<Arc<Listing>, ApiError> {
    let key = ResourceKey::list(resource.name, params);
    let result = self
      .lists
      .hard_refresh(&key, self.list_fetcher(resource, params))
      .await;
    self.guard(result)
  }

  fn list_fetcher(
    &self,
    resource: &ResourceDef,
    params: &ListParams,
  ) -> impl Fn() -> BoxFuture<'static, Result<Arc<Listing>, ApiError>> + Send + Sync + 'static {
    let service = self.service.clone();
    let resource = *resource;
    let params = params.clone();

    move || {
      let service = service.clone();
      let params = params.clone();
      async move { service.list(&resource, &params).await.map(Arc::new) }.boxed()
    }
  }

  pub fn watch_list(
    &self,
    resource: &ResourceDef,
    params: &ListParams,
  ) -> watch::Receiver<QueryState<Arc<Listing>>> {
    self.lists.subscribe(&ResourceKey::list(resource.name, params))
  }

  pub fn list_entry(&self, resource: &ResourceDef, params: &ListParams) -> Option<CacheEntry<Arc<Listing>>> {
    self.lists.entry(&ResourceKey::list(resource.name, params))
  }

  /// A single entity, from cache when fresh.
  pub async fn show(&self, resource: &ResourceDef, id: &str) -> Result<Arc<Envelope>, ApiError> {
    let key = ResourceKey::detail(resource.name, id);
    let service = self.service.clone();
    let resource = *resource;
    let id = id.to_string();

    let result = self
      .documents
      .read(&key, move || {
        let service = service.clone();
        let id = id.clone();
        async move { service.get(&resource, &id).await.map(Arc::new) }
      })
      .await;
    self.guard(result)
  }

  pub async fn create(&self, resource: &ResourceDef, payload: Payload) -> Result<Envelope, ApiError> {
    self
      .write(resource, self.service.create(resource, payload))
      .await
  }

  pub async fn update(&self, resource: &ResourceDef, id: &str, payload: Payload) -> Result<Envelope, ApiError> {
    self
      .write(resource, self.service.update(resource, id, payload))
      .await
  }

  pub async fn delete(&self, resource: &ResourceDef, id: &str) -> Result<Envelope, ApiError> {
    self.write(resource, self.service.delete(resource, id)).await
  }

  /// Delete every id concurrently.
  ///
  /// Failures are reported per id and nothing is rolled back. The cache is
  /// invalidated once if at least one delete went through.
  pub async fn bulk_delete(&self, resource: &ResourceDef, ids: &[String]) -> BulkDeleteReport {
    let results = join_all(ids.iter().map(|id| async move {
      let result = self.service.delete(resource, id).await;
      (id.clone(), result)
    }))
    .await;

    let mut report = BulkDeleteReport::default();
    for (id, result) in results {
      match result {
        Ok(_) => report.deleted.push(id),
        Err(e) => {
          warn!(resource = resource.name, id = %id, error = %e, "Delete failed");
          report.failed.push((id, e));
        }
      }
    }

    if !report.deleted.is_empty() {
      for selector in dependents(resource) {
        self.invalidate(&selector);
      }
    }
    if report
      .failed
      .iter()
      .any(|(_, e)| matches!(e, ApiError::Unauthorized { .. }))
    {
      self.clear();
    }

    info!(
      resource = resource.name,
      deleted = report.deleted.len(),
      failed = report.failed.len(),
      "Bulk delete finished"
    );
    report
  }

  pub async fn toggle_user(&self, id: &str) -> Result<Envelope, ApiError> {
    self.write(&USERS, self.service.toggle_user_status(id)).await
  }

  pub async fn dealership_section(&self, section: Section, payload: Payload) -> Result<Envelope, ApiError> {
    self
      .write(
        &AUTO_DEALERSHIPS,
        self.service.dealership_section(section, payload),
      )
      .await
  }

  pub async fn send_notification(&self, payload: Payload) -> Result<Envelope, ApiError> {
    self
      .write(&NOTIFICATIONS, self.service.send_notification(payload))
      .await
  }

  /// Site settings are not cached, so nothing needs invalidating.
  pub async fn update_settings(&self, payload: Payload) -> Result<Envelope, ApiError> {
    let result = self.service.update_settings(payload).await;
    self.guard(result)
  }

  pub async fn dashboard(&self) -> Result<Arc<Envelope>, ApiError> {
    let service = self.service.clone();
    let result = self
      .documents
      .read(&ResourceKey::new(resources::DASHBOARD), move || {
        let service = service.clone();
        async move { service.dashboard().await.map(Arc::new) }
      })
      .await;
    self.guard(result)
  }

  /// Monthly graph series for `year`.
  pub async fn graph(&self, year: i32) -> Result<Arc<Envelope>, ApiError> {
    let key = ResourceKey::new(resources::GRAPH)
      .with_param("filterType", "year")
      .with_param("value", year.to_string());
    let service = self.service.clone();

    let result = self
      .documents
      .read(&key, move || {
        let service = service.clone();
        async move {
          service
            .graph_data("year", &year.to_string())
            .await
            .map(Arc::new)
        }
      })
      .await;
    self.guard(result)
  }

  pub async fn profile(&self) -> Result<Arc<Envelope>, ApiError> {
    let service = self.service.clone();
    let result = self
      .documents
      .read(&ResourceKey::new(resources::PROFILE), move || {
        let service = service.clone();
        async move { service.profile().await.map(Arc::new) }
      })
      .await;
    self.guard(result)
  }

  /// Log in and persist the session. Anything cached for a previous
  /// session is dropped.
  pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
    let credentials = Credentials {
      email: email.to_string(),
      password: password.to_string(),
    };
    let response = self.service.login(&credentials).await?;

    let token = response.access_token.clone().ok_or_else(|| {
      eyre!(
        "Login failed: {}",
        response.message.as_deref().unwrap_or("no access token in response")
      )
    })?;

    self.session().sign_in(token, response.data.clone())?;
    self.clear();
    info!(email, "Logged in");
    Ok(response)
  }

  pub fn logout(&self) -> Result<()> {
    self.session().sign_out()?;
    self.clear();
    info!("Logged out");
    Ok(())
  }

  /// Invalidate matching entries in every cache.
  pub fn invalidate(&self, selector: &KeySelector) -> usize {
    self.lists.invalidate(selector) + self.documents.invalidate(selector)
  }

  fn clear(&self) {
    self.lists.clear();
    self.documents.clear();
  }

  /// A 401 means the session is gone; nothing cached under it may be
  /// served afterwards.
  fn guard<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
    if let Err(ApiError::Unauthorized { .. }) = &result {
      warn!("Session rejected, dropping cached data");
      self.clear();
    }
    result
  }

  async fn write<Fut>(&self, resource: &ResourceDef, op: Fut) -> Result<Envelope, ApiError>
  where
    Fut: Future<Output = Result<Envelope, ApiError>>,
  {
    let dependents = dependents(resource);
    let result = self.lists.mutate(&dependents, op).await;
    if result.is_ok() {
      for selector in &dependents {
        self.documents.invalidate(selector);
      }
    }
    self.guard(result)
  }
}

fn dependents(resource: &ResourceDef) -> Vec<KeySelector> {
  resource
    .invalidates()
    .into_iter()
    .map(KeySelector::resource)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::testing::{client, Reply, ScriptedTransport};
  use crate::api::resources::{CONDITIONS, PRODUCTS};
  use crate::session::SessionEvent;
  use serde_json::json;
  use std::time::Duration;

  fn admin(transport: ScriptedTransport) -> (AdminClient, Arc<ScriptedTransport>, Session) {
    let transport = Arc::new(transport);
    let session = Session::ephemeral();
    session.sign_in("tok".into(), json!({})).unwrap();
    let service = ResourceService::new(client(transport.clone(), session.clone()));
    (
      AdminClient::with_service(service, CacheConfig::default()),
      transport,
      session,
    )
  }

  fn products(ids: &[&str]) -> Reply {
    let docs: Vec<_> = ids.iter().map(|id| json!({ "_id": id })).collect();
    Reply::Json(200, json!({ "data": { "products": docs } }))
  }

  #[tokio::test]
  async fn test_concurrent_lists_share_one_request() {
    let (admin, transport, _) = admin(
      ScriptedTransport::new()
        .with_delay(Duration::from_millis(20))
        .on("GET /user/allProduct", products(&["a"])),
    );
    let params = ListParams::default().with_status("Pending");

    let (first, second) = tokio::join!(admin.list(&PRODUCTS, &params), admin.list(&PRODUCTS, &params));

    assert_eq!(first.unwrap().ids(), vec!["a"]);
    assert_eq!(second.unwrap().ids(), vec!["a"]);
    assert_eq!(transport.calls(), 1);
  }

  #[tokio::test]
  async fn test_bulk_delete_reports_partial_failure() {
    let (admin, transport, _) = admin(
      ScriptedTransport::new()
        .on("GET /user/allProduct", products(&["a", "b", "c"]))
        .on("GET /user/allProduct", products(&["b"]))
        .on("DELETE /admin/deleteProduct/a", Reply::Json(200, json!({})))
        .on(
          "DELETE /admin/deleteProduct/b",
          Reply::Json(500, json!({ "message": "locked" })),
        )
        .on("DELETE /admin/deleteProduct/c", Reply::Json(200, json!({}))),
    );
    let params = ListParams::default();

    assert_eq!(admin.list(&PRODUCTS, &params).await.unwrap().ids().len(), 3);

    let ids: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    let report = admin.bulk_delete(&PRODUCTS, &ids).await;

    assert_eq!(report.deleted, vec!["a", "c"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "b");
    assert_eq!(report.failed[0].1.status(), Some(500));
    assert!(!report.is_complete());

    let remaining = admin.list(&PRODUCTS, &params).await.unwrap();
    assert_eq!(remaining.ids(), vec!["b"]);
    assert_eq!(transport.calls_to("GET /user/allProduct"), 2);
  }

  #[tokio::test]
  async fn test_bulk_delete_all_failed_keeps_cache() {
    let (admin, transport, _) = admin(
      ScriptedTransport::new()
        .on("GET /user/allProduct", products(&["a"]))
        .on("DELETE /admin/deleteProduct/a", Reply::Fail(ApiError::Timeout)),
    );
    let params = ListParams::default();
    admin.list(&PRODUCTS, &params).await.unwrap();

    let report = admin.bulk_delete(&PRODUCTS, &["a".to_string()]).await;
    assert!(report.deleted.is_empty());

    admin.list(&PRODUCTS, &params).await.unwrap();
    assert_eq!(transport.calls_to("GET /user/allProduct"), 1);
  }

  #[tokio::test]
  async fn test_update_falls_back_and_invalidates() {
    let (admin, transport, _) = admin(
      ScriptedTransport::new()
        .on("GET /user/allProduct", products(&["p1"]))
        .on(
          "PUT /admin/updateProduct/p1",
          Reply::Json(404, json!({ "message": "not found" })),
        )
        .on(
          "PUT /admin/updateProduct/p1",
          Reply::Json(200, json!({ "message": "Product updated" })),
        ),
    );
    let params = ListParams::default();
    admin.list(&PRODUCTS, &params).await.unwrap();

    let envelope = admin
      .update(&PRODUCTS, "p1", Payload::Json(json!({ "status": "Approved" })))
      .await
      .unwrap();

    assert_eq!(envelope.message(), Some("Product updated"));
    assert!(admin.list_entry(&PRODUCTS, &params).unwrap().stale);
    admin.list(&PRODUCTS, &params).await.unwrap();
    assert_eq!(transport.calls_to("GET /user/allProduct"), 2);
  }

  #[tokio::test]
  async fn test_failed_write_leaves_cache_fresh() {
    let (admin, transport, _) = admin(
      ScriptedTransport::new()
        .on("GET /admin/Condition/allCondition", Reply::Json(200, json!({ "data": [] })))
        .on(
          "DELETE /admin/Condition/deleteCondition/c1",
          Reply::Json(400, json!({ "message": "in use" })),
        ),
    );
    let params = ListParams::default();
    admin.list(&CONDITIONS, &params).await.unwrap();

    let err = admin.delete(&CONDITIONS, "c1").await.unwrap_err();
    assert_eq!(err.message(), Some("in use"));

    admin.list(&CONDITIONS, &params).await.unwrap();
    assert_eq!(transport.calls_to("GET /admin/Condition/allCondition"), 1);
  }

  #[tokio::test]
  async fn test_product_write_invalidates_dashboard() {
    let (admin, transport, _) = admin(
      ScriptedTransport::new()
        .on(
          "GET /admin/getDashboard",
          Reply::Json(200, json!({ "data": { "activeUsers": 4 } })),
        )
        .on("DELETE /admin/deleteProduct/p1", Reply::Json(200, json!({}))),
    );

    admin.dashboard().await.unwrap();
    admin.dashboard().await.unwrap();
    assert_eq!(transport.calls_to("GET /admin/getDashboard"), 1);

    admin.delete(&PRODUCTS, "p1").await.unwrap();
    admin.dashboard().await.unwrap();
    assert_eq!(transport.calls_to("GET /admin/getDashboard"), 2);
  }

  #[tokio::test]
  async fn test_unauthorized_read_ends_session() {
    let (admin, _, session) = admin(
      ScriptedTransport::new().on("GET /admin/getOrders", Reply::Json(401, json!({}))),
    );
    let mut events = session.subscribe();

    let err = admin
      .list(&crate::api::resources::ORDERS, &ListParams::default())
      .await
      .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert!(!session.is_authenticated());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::LoginRequired);
  }

  #[tokio::test]
  async fn test_unauthorized_drops_cached_data() {
    let (admin, transport, session) = admin(
      ScriptedTransport::new()
        .on("GET /user/allProduct", products(&["secret"]))
        .on("GET /admin/getDashboard", Reply::Json(200, json!({ "data": {} })))
        .on("GET /admin/getOrders", Reply::Json(401, json!({}))),
    );
    let params = ListParams::default();
    admin.list(&PRODUCTS, &params).await.unwrap();
    admin.dashboard().await.unwrap();
    assert!(admin.list_entry(&PRODUCTS, &params).is_some());

    let err = admin
      .list(&crate::api::resources::ORDERS, &params)
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert!(!session.is_authenticated());
    assert!(admin.list_entry(&PRODUCTS, &params).is_none());

    admin.list(&PRODUCTS, &params).await.unwrap();
    admin.dashboard().await.unwrap();
    assert_eq!(transport.calls_to("GET /user/allProduct"), 2);
    assert_eq!(transport.calls_to("GET /admin/getDashboard"), 2);
  }

  #[tokio::test]
  async fn test_unauthorized_write_drops_cached_data() {
    let (admin, _, _) = admin(
      ScriptedTransport::new()
        .on("GET /user/allProduct", products(&["a"]))
        .on("DELETE /admin/Condition/deleteCondition/c1", Reply::Json(401, json!({}))),
    );
    let params = ListParams::default();
    admin.list(&PRODUCTS, &params).await.unwrap();

    let report = admin.bulk_delete(&CONDITIONS, &["c1".to_string()]).await;

    assert_eq!(report.failed.len(), 1);
    assert!(admin.list_entry(&PRODUCTS, &params).is_none());
  }

  #[tokio::test]
  async fn test_notification_invalidates_notification_list() {
    let (admin, transport, _) = admin(
      ScriptedTransport::new()
        .on(
          "GET /admin/notification/allNotification",
          Reply::Json(200, json!({ "data": [{ "_id": "n1", "title": "Hi" }] })),
        )
        .on(
          "POST /admin/notification/sendNotification",
          Reply::Json(200, json!({ "message": "Sent" })),
        ),
    );
    let params = ListParams::default();
    admin.list(&NOTIFICATIONS, &params).await.unwrap();

    let payload = Payload::from_fields(vec![("title".into(), "Sale".into())], vec![], true);
    let envelope = admin.send_notification(payload).await.unwrap();

    assert_eq!(envelope.message(), Some("Sent"));
    assert!(admin.list_entry(&NOTIFICATIONS, &params).unwrap().stale);
    admin.list(&NOTIFICATIONS, &params).await.unwrap();
    assert_eq!(transport.calls_to("GET /admin/notification/allNotification"), 2);
    assert!(matches!(
      transport.requests()[1].body,
      Some(Payload::Multipart(ref parts)) if parts.len() == 1
    ));
  }

  #[tokio::test]
  async fn test_dealership_section_invalidates_dealerships() {
    let (admin, transport, _) = admin(
      ScriptedTransport::new()
        .on(
          "GET /admin/AutoDealerShip/allAutoDealerShip",
          Reply::Json(200, json!({ "data": [] })),
        )
        .on(
          "POST /admin/AutoDealerShip/addDataInPromotedPlacement",
          Reply::Json(200, json!({})),
        ),
    );
    let params = ListParams::default();
    admin.list(&AUTO_DEALERSHIPS, &params).await.unwrap();

    let payload = Payload::from_fields(vec![("title".into(), "Deals".into())], vec![], true);
    admin
      .dealership_section(Section::Promoted, payload)
      .await
      .unwrap();

    assert!(admin.list_entry(&AUTO_DEALERSHIPS, &params).unwrap().stale);
    assert_eq!(
      transport.calls_to("POST /admin/AutoDealerShip/addDataInPromotedPlacement"),
      1
    );
  }

  #[tokio::test]
  async fn test_settings_update_leaves_lists_cached() {
    let (admin, transport, _) = admin(
      ScriptedTransport::new()
        .on("GET /user/allProduct", products(&["a"]))
        .on("POST /admin/updateSettings", Reply::Json(200, json!({ "message": "Saved" }))),
    );
    let params = ListParams::default();
    admin.list(&PRODUCTS, &params).await.unwrap();

    let payload = Payload::from_fields(vec![("siteName".into(), "Free Shops".into())], vec![], true);
    admin.update_settings(payload).await.unwrap();

    admin.list(&PRODUCTS, &params).await.unwrap();
    assert_eq!(transport.calls_to("GET /user/allProduct"), 1);
  }

  #[tokio::test]
  async fn test_login_and_logout() {
    let (admin, _, session) = admin(ScriptedTransport::new().on(
      "POST /admin/login",
      Reply::Json(200, json!({ "accessToken": "fresh", "data": { "email": "a@b.c" } })),
    ));
    session.sign_out().unwrap();

    admin.login("a@b.c", "pw").await.unwrap();
    assert_eq!(session.token().as_deref(), Some("fresh"));
    assert_eq!(session.user(), Some(json!({ "email": "a@b.c" })));

    admin.logout().unwrap();
    assert!(!session.is_authenticated());
  }

  #[tokio::test]
  async fn test_login_without_token_fails() {
    let (admin, _, session) = admin(ScriptedTransport::new().on(
      "POST /admin/login",
      Reply::Json(200, json!({ "message": "Invalid credentials" })),
    ));
    session.sign_out().unwrap();

    let err = admin.login("a@b.c", "bad").await.unwrap_err();
    assert!(err.to_string().contains("Invalid credentials"));
    assert!(!session.is_authenticated());
  }

  #[tokio::test]
  async fn test_watchers_see_refetch_after_write() {
    let (admin, _, _) = admin(
      ScriptedTransport::new()
        .on("GET /user/allProduct", products(&["a", "b"]))
        .on("GET /user/allProduct", products(&["b"]))
        .on("DELETE /admin/deleteProduct/a", Reply::Json(200, json!({}))),
    );
    let params = ListParams::default();
    let mut rx = admin.watch_list(&PRODUCTS, &params);

    admin.list(&PRODUCTS, &params).await.unwrap();
    assert_eq!(rx.borrow_and_update().data().map(|l| l.ids().len()), Some(2));

    admin.delete(&PRODUCTS, "a").await.unwrap();
    assert!(rx.borrow_and_update().is_loading());

    admin.refresh_list(&PRODUCTS, &params).await.unwrap();
    assert_eq!(rx.borrow_and_update().data().map(|l| l.ids()), Some(vec!["b".to_string()]));
  }

  #[tokio::test]
  async fn test_graph_is_keyed_by_year() {
    let (admin, transport, _) = admin(
      ScriptedTransport::new().on("GET /admin/getGraphData", Reply::Json(200, json!({ "data": {} }))),
    );

    admin.graph(2024).await.unwrap();
    admin.graph(2025).await.unwrap();
    admin.graph(2025).await.unwrap();

    assert_eq!(transport.calls_to("GET /admin/getGraphData"), 2);
  }
}
