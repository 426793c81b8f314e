//! Query keys: the identity of one cached server query.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical serialization of a filter map.
///
/// Pairs are sorted by name and empty values are dropped, so two filter
/// maps with the same meaningful content always produce the same snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterSnapshot(String);

impl FilterSnapshot {
  pub fn from_filters(filters: &BTreeMap<String, String>) -> Self {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in filters {
      let value = value.trim();
      if !value.is_empty() {
        serializer.append_pair(name, value);
      }
    }
    Self(serializer.finish())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// `(resource, filters, page, page size)` - uniquely identifies one server query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
  pub resource: String,
  pub filters: FilterSnapshot,
  pub page: u32,
  pub limit: u32,
}

impl QueryKey {
  pub fn new(resource: impl Into<String>, filters: FilterSnapshot, page: u32, limit: u32) -> Self {
    Self {
      resource: resource.into(),
      filters,
      page,
      limit,
    }
  }

  /// Key for an unpaginated, unfiltered query (stats, health aggregates).
  pub fn resource(resource: impl Into<String>) -> Self {
    Self::new(resource, FilterSnapshot::default(), 0, 0)
  }

  /// Whether invalidating `prefix` affects this key.
  ///
  /// Matches the whole resource name, or a `/`-separated sub-resource of it:
  /// `bookings` matches `bookings` and `bookings/active`, not `booking-stats`.
  pub fn matches_prefix(&self, prefix: &str) -> bool {
    match self.resource.strip_prefix(prefix) {
      Some(rest) => rest.is_empty() || rest.starts_with('/'),
      None => false,
    }
  }

  /// Short, stable hash of the key for log fields.
  pub fn fingerprint(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..12].to_string()
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.resource)?;
    if !self.filters.is_empty() {
      write!(f, "?{}", self.filters.as_str())?;
    }
    if self.limit > 0 {
      write!(f, "#{}x{}", self.page, self.limit)?;
    }
    Ok(())
  }
}
