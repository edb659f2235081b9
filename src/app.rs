use chrono::Datelike;
use color_eyre::{eyre::eyre, Result};
use std::io::Write;
use tracing::debug;

use crate::admin::AdminClient;
use crate::api::envelope::Envelope;
use crate::api::resources::{self, ResourceDef, NOTIFICATIONS};
use crate::api::service::confirmation;
use crate::api::types::{DashboardStats, GraphSeries};
use crate::cli::{Command, ListArgs};
use crate::config::Config;
use crate::db::Database;
use crate::output;
use crate::session::Session;

/// Executes one CLI command against the admin API.
pub struct App {
  admin: AdminClient,
}

impl App {
  pub fn new(config: &Config) -> Result<Self> {
    let db = Database::open(config.session.path.as_deref())?;
    let session = Session::init(db)?;
    debug!(authenticated = session.is_authenticated(), "Session loaded");

    Ok(Self::with_admin(AdminClient::new(config, session)?))
  }

  pub fn with_admin(admin: AdminClient) -> Self {
    Self { admin }
  }

  pub async fn run<W: Write>(&self, command: Command, out: &mut W) -> Result<()> {
    if command.requires_session() {
      self.require_session()?;
    }

    match command {
      Command::Login { email, password } => {
        let password = password
          .or_else(Config::password_from_env)
          .ok_or_else(|| eyre!("Password required: pass --password or set FSADMIN_PASSWORD"))?;
        let response = self.admin.login(&email, &password).await?;
        let name = response
          .data
          .get("fullName")
          .and_then(|v| v.as_str())
          .unwrap_or(email.as_str());
        writeln!(out, "Logged in as {}", name)?;
      }

      Command::Logout => {
        self.admin.logout()?;
        writeln!(out, "Logged out")?;
      }

      Command::Whoami => match self.admin.session().user() {
        Some(user) => output::json(out, &user)?,
        None => writeln!(out, "Not logged in")?,
      },

      Command::Resources => output::resources(out, resources::RESOURCES)?,

      Command::Profile => {
        let profile = self.admin.profile().await?;
        output::json(out, profile.payload())?;
      }

      Command::List {
        resource,
        filters,
        json,
      } => {
        let resource = resolve(&resource)?;
        self.print_list(out, resource, &filters, json).await?;
      }

      Command::Show { resource, id } => {
        let resource = resolve(&resource)?;
        let entity = self.admin.show(resource, &id).await?;
        output::json(out, entity.payload())?;
      }

      Command::Create { resource, payload } => {
        let resource = resolve(&resource)?;
        let payload = payload.into_payload(resource.multipart)?;
        let envelope = self.admin.create(resource, payload).await?;
        report(out, &envelope, "Created")?;
      }

      Command::Update {
        resource,
        id,
        payload,
      } => {
        let resource = resolve(&resource)?;
        let payload = payload.into_payload(resource.multipart)?;
        let envelope = self.admin.update(resource, &id, payload).await?;
        report(out, &envelope, "Updated")?;
      }

      Command::Delete { resource, ids } => {
        let resource = resolve(&resource)?;
        self.delete(out, resource, ids).await?;
      }

      Command::ToggleUser { id } => {
        let envelope = self.admin.toggle_user(&id).await?;
        report(out, &envelope, "User status updated")?;
      }

      Command::DealershipSection { section, payload } => {
        let envelope = self
          .admin
          .dealership_section(section, payload.into_payload(true)?)
          .await?;
        report(out, &envelope, &format!("Added to {} section", section))?;
      }

      Command::Notify { payload } => {
        let envelope = self
          .admin
          .send_notification(payload.into_payload(true)?)
          .await?;
        report(out, &envelope, "Notification sent")?;
      }

      Command::Notifications { filters, json } => {
        self.print_list(out, &NOTIFICATIONS, &filters, json).await?;
      }

      Command::Settings { payload } => {
        let envelope = self
          .admin
          .update_settings(payload.into_payload(true)?)
          .await?;
        report(out, &envelope, "Settings updated")?;
      }

      Command::Dashboard { year, json } => {
        let year = year.unwrap_or_else(|| chrono::Utc::now().year());
        let (dashboard, graph) = tokio::try_join!(self.admin.dashboard(), self.admin.graph(year))?;
        let stats = DashboardStats::from_envelope(&dashboard);
        let series = GraphSeries::from_envelope(&graph);

        if json {
          output::json(
            out,
            &serde_json::json!({ "stats": stats, "year": year, "graph": series }),
          )?;
        } else {
          output::dashboard(out, &stats, &series)?;
        }
      }
    }
    Ok(())
  }

  async fn print_list<W: Write>(
    &self,
    out: &mut W,
    resource: &ResourceDef,
    filters: &ListArgs,
    json: bool,
  ) -> Result<()> {
    let params = filters.to_params();
    let listing = if filters.refresh {
      self.admin.refresh_list(resource, &params).await?
    } else {
      self.admin.list(resource, &params).await?
    };
    if json {
      output::json(out, &*listing)
    } else {
      output::listing(out, &listing)
    }
  }

  /// One id deletes directly. Several ids run as a bulk delete, then the
  /// list is read again to show what is left.
  async fn delete<W: Write>(&self, out: &mut W, resource: &ResourceDef, ids: Vec<String>) -> Result<()> {
    if let [id] = ids.as_slice() {
      let envelope = self.admin.delete(resource, id).await?;
      return report(out, &envelope, "Deleted");
    }

    let outcome = self.admin.bulk_delete(resource, &ids).await;
    output::bulk_report(out, &outcome)?;

    writeln!(out)?;
    self
      .print_list(out, resource, &ListArgs::default(), false)
      .await?;

    if outcome.is_complete() {
      Ok(())
    } else {
      Err(eyre!(
        "{} of {} deletes failed",
        outcome.failed.len(),
        ids.len()
      ))
    }
  }

  fn require_session(&self) -> Result<()> {
    if self.admin.session().is_authenticated() {
      Ok(())
    } else {
      Err(eyre!("Not logged in. Run `fsadmin login --email <email>` first."))
    }
  }
}

fn resolve(input: &str) -> Result<&'static ResourceDef> {
  resources::resolve(input)
    .ok_or_else(|| eyre!("Unknown resource '{}'. Run `fsadmin resources` to see them all.", input))
}

fn report<W: Write>(out: &mut W, envelope: &Envelope, fallback: &str) -> Result<()> {
  writeln!(out, "{}", confirmation(envelope, fallback))?;
  Ok(())
}
