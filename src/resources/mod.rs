//! The four managed resources and everything a list view needs to know
//! about each: columns, filters, stats, row actions and forms.

mod bookings;
mod notifications;
mod users;
mod vehicles;

use crate::api::types::{ListParams, Page};
use crate::api::{ApiClient, ApiError};
use crate::mutation::Mutation;
use crate::table::{ColumnDescriptor, Row, RowAction, Tone};
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::str::FromStr;

/// A server-side filter a list view can set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterField {
  pub name: &'static str,
  pub label: &'static str,
  /// Allowed values; empty for free text
  pub choices: Vec<&'static str>,
}

impl FilterField {
  pub fn text(name: &'static str, label: &'static str) -> Self {
    Self {
      name,
      label,
      choices: Vec::new(),
    }
  }

  pub fn choice(name: &'static str, label: &'static str, choices: Vec<&'static str>) -> Self {
    Self {
      name,
      label,
      choices,
    }
  }

  pub fn is_choice(&self) -> bool {
    !self.choices.is_empty()
  }
}

/// One labelled input of a create/edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
  pub name: &'static str,
  pub label: &'static str,
  pub value: String,
}

impl FormField {
  pub fn new(name: &'static str, label: &'static str, value: impl Into<String>) -> Self {
    Self {
      name,
      label,
      value: value.into(),
    }
  }
}

/// Submitted form values by field name
pub type FormValues = BTreeMap<&'static str, String>;

/// A resource the dashboard can list and mutate.
pub trait Resource: Row + Clone + Send + Sync + 'static {
  /// Aggregate shown above the table
  type Stats: Clone + Send + Sync + 'static;

  /// Cache resource name of list pages
  const NAME: &'static str;
  /// Cache resource name of the stats record
  const STATS: &'static str;
  const TITLE: &'static str;
  const EMPTY_MESSAGE: &'static str;

  fn columns() -> Vec<ColumnDescriptor<Self>>;

  fn filters() -> Vec<FilterField> {
    Vec::new()
  }

  fn fetch_page(
    api: ApiClient,
    params: ListParams,
  ) -> BoxFuture<'static, Result<Page<Self>, ApiError>>;

  fn fetch_one(api: ApiClient, id: String) -> BoxFuture<'static, Result<Self, ApiError>>;

  fn fetch_stats(api: ApiClient) -> BoxFuture<'static, Result<Self::Stats, ApiError>>;

  fn stats_line(stats: &Self::Stats) -> String;

  /// Actions offered on `row`, in display order
  fn row_actions(row: &Self) -> Vec<RowAction>;

  /// Mutation for an action that needs no further input (delete, cancel, mark read).
  fn action_mutation(_row: &Self, _action: RowAction) -> Option<Mutation> {
    None
  }

  /// Values offered by the status picker for `row`
  fn status_choices(_row: &Self) -> Vec<&'static str> {
    Vec::new()
  }

  fn status_mutation(_row: &Self, _choice: &str) -> Result<Mutation, String> {
    Err(format!("{} have no status to change", Self::TITLE.to_lowercase()))
  }

  /// Resource-wide action, e.g. sending pending notifications
  fn bulk_mutation() -> Option<Mutation> {
    None
  }

  fn create_form() -> Option<Vec<FormField>> {
    None
  }

  fn build_create(_values: &FormValues) -> Result<Mutation, String> {
    Err(format!("{} cannot be created here", Self::TITLE.to_lowercase()))
  }

  fn edit_form(_row: &Self) -> Option<Vec<FormField>> {
    None
  }

  fn build_edit(_row: &Self, _values: &FormValues) -> Result<Mutation, String> {
    Err(format!("{} cannot be edited here", Self::TITLE.to_lowercase()))
  }

  /// Label/value pairs of the detail screen
  fn detail(row: &Self) -> Vec<(&'static str, String)>;
}

// ============================================================================
// Form parsing helpers
// ============================================================================

fn value<'a>(values: &'a FormValues, name: &str) -> &'a str {
  values.get(name).map(|v| v.trim()).unwrap_or("")
}

fn required(values: &FormValues, name: &str) -> Result<String, String> {
  let v = value(values, name);
  if v.is_empty() {
    return Err(format!("{} is required", name));
  }
  Ok(v.to_string())
}

fn optional(values: &FormValues, name: &str) -> Option<String> {
  let v = value(values, name);
  (!v.is_empty()).then(|| v.to_string())
}

fn parse<T>(values: &FormValues, name: &str) -> Result<T, String>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  let v = required(values, name)?;
  v.parse().map_err(|e| format!("{}: {}", name, e))
}

fn parse_bool(values: &FormValues, name: &str) -> Result<bool, String> {
  match value(values, name).to_lowercase().as_str() {
    "yes" | "y" | "true" => Ok(true),
    "no" | "n" | "false" => Ok(false),
    other => Err(format!("{}: expected yes or no, got '{}'", name, other)),
  }
}

/// `YYYY-MM-DD` at midnight UTC
fn parse_date(values: &FormValues, name: &str) -> Result<DateTime<Utc>, String> {
  let v = required(values, name)?;
  NaiveDate::parse_from_str(&v, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|d| d.and_utc())
    .ok_or_else(|| format!("{}: expected YYYY-MM-DD", name))
}

/// `Some(new)` only when it differs from the current value.
fn changed<T: PartialEq>(new: T, current: &T) -> Option<T> {
  (new != *current).then_some(new)
}

fn yes_no(value: bool) -> &'static str {
  if value {
    "yes"
  } else {
    "no"
  }
}

fn role_tone(role: &str) -> Tone {
  match role {
    "admin" => Tone::Accent,
    "operator" => Tone::Warning,
    _ => Tone::Normal,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn values(pairs: &[(&'static str, &str)]) -> FormValues {
    pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
  }

  #[test]
  fn test_required_and_optional() {
    let v = values(&[("email", "  a@b.c "), ("phone", " ")]);
    assert_eq!(required(&v, "email"), Ok("a@b.c".to_string()));
    assert_eq!(optional(&v, "phone"), None);
    assert_eq!(required(&v, "name"), Err("name is required".to_string()));
  }

  #[test]
  fn test_parse_errors_name_the_field() {
    let v = values(&[("year", "soon")]);
    let err = parse::<u16>(&v, "year").unwrap_err();
    assert!(err.starts_with("year: "));
  }

  #[test]
  fn test_parse_date() {
    let v = values(&[("start", "2024-05-01"), ("end", "01/05/2024")]);
    assert_eq!(
      parse_date(&v, "start").unwrap().to_rfc3339(),
      "2024-05-01T00:00:00+00:00"
    );
    assert!(parse_date(&v, "end").is_err());
  }

  #[test]
  fn test_parse_bool_and_changed() {
    let v = values(&[("active", "Yes")]);
    assert_eq!(parse_bool(&v, "active"), Ok(true));
    assert_eq!(changed(3, &3), None);
    assert_eq!(changed(4, &3), Some(4));
  }
}
