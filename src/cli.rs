//! Command-line surface.

use clap::{ArgAction, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::api::service::Section;
use crate::api::types::{FormPart, ListParams, Payload};

#[derive(Parser, Debug)]
#[command(name = "fsadmin")]
#[command(about = "Command-line admin client for the Free Shops marketplace")]
#[command(version)]
pub struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/fsadmin/config.yaml)
  #[arg(short, long, global = true)]
  pub config: Option<PathBuf>,

  /// API base URL, overriding config and FSADMIN_BASE_URL
  #[arg(long, global = true)]
  pub base_url: Option<String>,

  /// Increase log verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = ArgAction::Count, global = true)]
  pub verbose: u8,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Log in and store the session
  Login {
    #[arg(long)]
    email: String,
    /// Password (default: FSADMIN_PASSWORD)
    #[arg(long)]
    password: Option<String>,
  },
  /// Forget the stored session
  Logout,
  /// Show the logged-in admin
  Whoami,
  /// Fetch the admin profile from the server
  Profile,
  /// List the resources this client knows about
  Resources,
  /// List entities of a resource
  List {
    resource: String,
    #[command(flatten)]
    filters: ListArgs,
    /// Print raw JSON
    #[arg(long)]
    json: bool,
  },
  /// Show a single entity
  Show { resource: String, id: String },
  /// Create an entity
  Create {
    resource: String,
    #[command(flatten)]
    payload: PayloadArgs,
  },
  /// Update an entity
  Update {
    resource: String,
    id: String,
    #[command(flatten)]
    payload: PayloadArgs,
  },
  /// Delete one or more entities
  Delete {
    resource: String,
    #[arg(required = true)]
    ids: Vec<String>,
  },
  /// Block or unblock a user
  ToggleUser { id: String },
  /// Upload entries into an auto-dealership section (data, promoted, everything)
  DealershipSection {
    section: Section,
    #[command(flatten)]
    payload: PayloadArgs,
  },
  /// Send a push notification
  Notify {
    #[command(flatten)]
    payload: PayloadArgs,
  },
  /// List sent notifications
  Notifications {
    #[command(flatten)]
    filters: ListArgs,
    #[arg(long)]
    json: bool,
  },
  /// Update site settings
  Settings {
    #[command(flatten)]
    payload: PayloadArgs,
  },
  /// Dashboard metrics and monthly sales
  Dashboard {
    /// Year of the sales series (default: current year)
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    json: bool,
  },
}

impl Command {
  /// Commands that talk to the API on behalf of a logged-in admin.
  pub fn requires_session(&self) -> bool {
    !matches!(
      self,
      Command::Login { .. } | Command::Logout | Command::Whoami | Command::Resources
    )
  }
}

#[derive(clap::Args, Debug, Default)]
pub struct ListArgs {
  #[arg(long)]
  pub search: Option<String>,
  #[arg(long)]
  pub status: Option<String>,
  #[arg(long)]
  pub category: Option<String>,
  #[arg(long)]
  pub page: Option<u32>,
  #[arg(long)]
  pub limit: Option<u32>,
  /// Drop any cached page and fetch from the server
  #[arg(long)]
  pub refresh: bool,
}

impl ListArgs {
  pub fn to_params(&self) -> ListParams {
    ListParams {
      search: self.search.clone(),
      status: self.status.clone(),
      category: self.category.clone(),
      page: self.page,
      limit: self.limit,
      extra: Vec::new(),
    }
  }
}

#[derive(clap::Args, Debug, Default)]
pub struct PayloadArgs {
  /// Text field as key=value (repeatable)
  #[arg(short = 'f', long = "field", value_parser = parse_key_value)]
  pub fields: Vec<(String, String)>,

  /// File part as key=path (repeatable); forces multipart
  #[arg(long = "file", value_parser = parse_key_value)]
  pub files: Vec<(String, String)>,

  /// Raw JSON object body; cannot be combined with --field/--file
  #[arg(long)]
  pub json: Option<String>,
}

impl PayloadArgs {
  /// Build the request body. `multipart` selects form encoding for plain
  /// fields; file parts always use it.
  pub fn into_payload(self, multipart: bool) -> Result<Payload> {
    if let Some(raw) = self.json {
      if !self.fields.is_empty() || !self.files.is_empty() {
        return Err(eyre!("--json cannot be combined with --field or --file"));
      }
      let value: Value =
        serde_json::from_str(&raw).map_err(|e| eyre!("Invalid --json body: {}", e))?;
      if !value.is_object() {
        return Err(eyre!("--json body must be a JSON object"));
      }
      return Ok(Payload::Json(value));
    }

    let files = self
      .files
      .into_iter()
      .map(|(name, path)| read_file_part(name, Path::new(&path)))
      .collect::<Result<Vec<_>>>()?;

    Ok(Payload::from_fields(self.fields, files, multipart))
  }
}

fn read_file_part(name: String, path: &Path) -> Result<FormPart> {
  let bytes =
    std::fs::read(path).map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
  let file_name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .ok_or_else(|| eyre!("Not a file: {}", path.display()))?;
  Ok(FormPart::File {
    name,
    file_name,
    bytes,
  })
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
  match s.split_once('=') {
    Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
    _ => Err(format!("expected key=value, got '{}'", s)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::CommandFactory;
  use serde_json::json;

  #[test]
  fn test_cli_definition_is_valid() {
    Args::command().debug_assert();
  }

  #[test]
  fn test_parse_list_with_filters() {
    let args = Args::try_parse_from([
      "fsadmin", "list", "products", "--status", "Pending", "--page", "2", "--json", "-vv",
    ])
    .unwrap();

    assert_eq!(args.verbose, 2);
    match args.command {
      Command::List {
        resource,
        filters,
        json,
      } => {
        assert_eq!(resource, "products");
        assert!(json);
        let params = filters.to_params();
        assert_eq!(params.status.as_deref(), Some("Pending"));
        assert_eq!(params.page, Some(2));
        assert!(!filters.refresh);
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_parse_list_refresh() {
    let args = Args::try_parse_from(["fsadmin", "notifications", "--refresh"]).unwrap();
    match args.command {
      Command::Notifications { filters, .. } => assert!(filters.refresh),
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_parse_bulk_delete() {
    let args = Args::try_parse_from(["fsadmin", "delete", "p", "a", "b", "c"]).unwrap();
    match args.command {
      Command::Delete { resource, ids } => {
        assert_eq!(resource, "p");
        assert_eq!(ids, vec!["a", "b", "c"]);
      }
      other => panic!("unexpected command {:?}", other),
    }
    assert!(Args::try_parse_from(["fsadmin", "delete", "p"]).is_err());
  }

  #[test]
  fn test_parse_dealership_section() {
    let args =
      Args::try_parse_from(["fsadmin", "dealership-section", "promoted", "-f", "title=Deals"]).unwrap();
    match args.command {
      Command::DealershipSection { section, payload } => {
        assert_eq!(section, Section::Promoted);
        assert_eq!(payload.fields, vec![("title".to_string(), "Deals".to_string())]);
      }
      other => panic!("unexpected command {:?}", other),
    }
    assert!(Args::try_parse_from(["fsadmin", "dealership-section", "sideways"]).is_err());
  }

  #[test]
  fn test_session_requirement() {
    let login = Args::try_parse_from(["fsadmin", "login", "--email", "a@b.c"]).unwrap();
    assert!(!login.command.requires_session());
    let show = Args::try_parse_from(["fsadmin", "show", "users", "u1"]).unwrap();
    assert!(show.command.requires_session());
  }

  #[test]
  fn test_parse_key_value() {
    assert_eq!(
      parse_key_value("name=a=b"),
      Ok(("name".to_string(), "a=b".to_string()))
    );
    assert_eq!(parse_key_value("empty="), Ok(("empty".to_string(), String::new())));
    assert!(parse_key_value("novalue").is_err());
    assert!(parse_key_value("=x").is_err());
  }

  #[test]
  fn test_json_payload() {
    let args = PayloadArgs {
      json: Some(r#"{"status":"Approved"}"#.into()),
      ..Default::default()
    };
    assert_eq!(
      args.into_payload(true).unwrap(),
      Payload::Json(json!({ "status": "Approved" }))
    );

    let mixed = PayloadArgs {
      fields: vec![("a".into(), "b".into())],
      json: Some("{}".into()),
      ..Default::default()
    };
    assert!(mixed.into_payload(false).is_err());

    let array = PayloadArgs {
      json: Some("[1]".into()),
      ..Default::default()
    };
    assert!(array.into_payload(false).is_err());
  }

  #[test]
  fn test_file_parts_are_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logo.png");
    std::fs::write(&path, b"png").unwrap();

    let args = PayloadArgs {
      fields: vec![("title".into(), "Logo".into())],
      files: vec![("image".into(), path.display().to_string())],
      json: None,
    };

    match args.into_payload(false).unwrap() {
      Payload::Multipart(parts) => {
        assert_eq!(parts.len(), 2);
        assert_eq!(
          parts[1],
          FormPart::File {
            name: "image".into(),
            file_name: "logo.png".into(),
            bytes: b"png".to_vec(),
          }
        );
      }
      other => panic!("expected multipart, got {:?}", other),
    }
  }
}
