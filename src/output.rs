//! Plain-text and JSON rendering for command output.

use color_eyre::Result;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

use crate::admin::BulkDeleteReport;
use crate::api::envelope::{Listing, Record};
use crate::api::resources::ResourceDef;
use crate::api::types::{DashboardStats, GraphSeries};

const MAX_CELL: usize = 40;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Left-aligned table with a header row.
pub fn table<W: Write>(out: &mut W, headers: &[&str], rows: &[Vec<String>]) -> Result<()> {
  let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
  for row in rows {
    for (i, cell) in row.iter().enumerate() {
      if let Some(w) = widths.get_mut(i) {
        *w = (*w).max(cell.chars().count());
      }
    }
  }

  let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
  write_row(out, &header, &widths)?;
  for row in rows {
    write_row(out, row, &widths)?;
  }
  Ok(())
}

fn write_row<W: Write>(out: &mut W, cells: &[String], widths: &[usize]) -> Result<()> {
  let line = cells
    .iter()
    .zip(widths)
    .map(|(cell, width)| format!("{:<width$}", cell, width = width))
    .collect::<Vec<_>>()
    .join("  ");
  writeln!(out, "{}", line.trim_end())?;
  Ok(())
}

pub fn json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
  serde_json::to_writer_pretty(&mut *out, value)?;
  writeln!(out)?;
  Ok(())
}

fn cell(record: &Record, field: &str) -> String {
  match record.as_value().get(field) {
    None | Some(Value::Null) => "-".to_string(),
    Some(Value::String(s)) => truncate(s, MAX_CELL),
    Some(Value::Bool(b)) => b.to_string(),
    Some(Value::Number(n)) => n.to_string(),
    Some(_) => "...".to_string(),
  }
}

pub fn listing<W: Write>(out: &mut W, listing: &Listing) -> Result<()> {
  if listing.records.is_empty() {
    writeln!(out, "No records.")?;
    return Ok(());
  }

  let rows: Vec<Vec<String>> = listing
    .records
    .iter()
    .map(|record| {
      vec![
        record.id().unwrap_or_else(|| "-".to_string()),
        truncate(record.label().unwrap_or("-"), MAX_CELL),
        cell(record, "status"),
        cell(record, "createdAt"),
      ]
    })
    .collect();

  table(out, &["ID", "NAME", "STATUS", "CREATED"], &rows)?;
  writeln!(
    out,
    "\n{} shown, {} total, {} page(s)",
    listing.records.len(),
    listing.pagination.total_docs,
    listing.pagination.total_pages
  )?;
  Ok(())
}

fn operations(resource: &ResourceDef) -> String {
  let mut ops = vec!["list"];
  for (name, supported) in [
    ("show", resource.detail.is_some()),
    ("create", resource.create.is_some()),
    ("update", resource.update.is_some()),
    ("delete", resource.delete.is_some()),
  ] {
    if supported {
      ops.push(name);
    }
  }
  ops.join(",")
}

pub fn resources<W: Write>(out: &mut W, resources: &[ResourceDef]) -> Result<()> {
  let rows: Vec<Vec<String>> = resources
    .iter()
    .map(|r| {
      vec![
        r.name.to_string(),
        r.aliases.join(","),
        operations(r),
        r.description.to_string(),
      ]
    })
    .collect();
  table(out, &["NAME", "ALIASES", "OPERATIONS", "DESCRIPTION"], &rows)
}

pub fn bulk_report<W: Write>(out: &mut W, report: &BulkDeleteReport) -> Result<()> {
  for id in &report.deleted {
    writeln!(out, "deleted  {}", id)?;
  }
  for (id, error) in &report.failed {
    let reason = error.message().map(str::to_string).unwrap_or_else(|| error.to_string());
    writeln!(out, "failed   {}: {}", id, reason)?;
  }
  Ok(())
}

pub fn dashboard<W: Write>(out: &mut W, stats: &DashboardStats, graph: &GraphSeries) -> Result<()> {
  let rows: Vec<Vec<String>> = stats
    .rows()
    .into_iter()
    .map(|(label, value, change)| {
      vec![
        label.to_string(),
        value,
        change.unwrap_or_default(),
      ]
    })
    .collect();
  table(out, &["METRIC", "VALUE", "CHANGE"], &rows)?;

  if !graph.monthly_sales.is_empty() {
    writeln!(out)?;
    let rows: Vec<Vec<String>> = graph
      .monthly_sales
      .iter()
      .map(|(month, sales)| vec![month.clone(), sales.to_string()])
      .collect();
    table(out, &["MONTH", "SALES"], &rows)?;
  }
  Ok(())
}
