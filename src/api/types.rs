//! Wire and domain types for the rental platform REST API.
//!
//! The backend speaks snake_case JSON; the same structs are used for
//! deserialization and for rendering, since the API already returns the
//! shape the dashboard needs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declare a string-valued status enum with its wire names.
///
/// Generates `ALL`, `as_str`, `Display` and `FromStr` alongside the serde
/// derives so filter pickers and forms can enumerate and parse values.
macro_rules! wire_enum {
  ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum $name {
      $(#[serde(rename = $wire)] $variant),+
    }

    impl $name {
      pub const ALL: &'static [$name] = &[$($name::$variant),+];

      pub fn as_str(&self) -> &'static str {
        match self {
          $($name::$variant => $wire),+
        }
      }
    }

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
      }
    }

    impl std::str::FromStr for $name {
      type Err = String;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        $name::ALL
          .iter()
          .copied()
          .find(|v| v.as_str() == needle)
          .ok_or_else(|| {
            let options: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
            format!("expected one of: {}", options.join(", "))
          })
      }
    }
  };
}

wire_enum!(
  /// Platform role of a user account
  UserRole {
    Customer => "customer",
    Operator => "operator",
    Admin => "admin",
  }
);

wire_enum!(VehicleType {
  Car => "car",
  Van => "van",
  Truck => "truck",
  Motorcycle => "motorcycle",
  Scooter => "scooter",
});

wire_enum!(
  /// Fleet availability of a vehicle
  VehicleStatus {
    Available => "available",
    Rented => "rented",
    Maintenance => "maintenance",
    Retired => "retired",
  }
);

wire_enum!(BookingStatus {
  Pending => "pending",
  Confirmed => "confirmed",
  Active => "active",
  Completed => "completed",
  Cancelled => "cancelled",
});

wire_enum!(NotificationChannel {
  Email => "email",
  Sms => "sms",
  Push => "push",
});

wire_enum!(NotificationStatus {
  Pending => "pending",
  Sent => "sent",
  Failed => "failed",
});

impl BookingStatus {
  /// Whether the booking can still be cancelled
  pub fn is_open(&self) -> bool {
    matches!(
      self,
      BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Active
    )
  }
}

fn default_true() -> bool {
  true
}

// ============================================================================
// Pagination
// ============================================================================

/// One page of a list endpoint: `{data, total, limit, offset}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
  pub data: Vec<T>,
  pub total: u64,
  #[serde(default)]
  pub limit: u32,
  #[serde(default)]
  pub offset: u64,
}

impl<T> Page<T> {
  /// Wrap a single non-list value (e.g. a stats record) as a one-row page.
  pub fn single(value: T) -> Self {
    Self {
      data: vec![value],
      total: 1,
      limit: 1,
      offset: 0,
    }
  }

  /// Wrap an unpaginated list response.
  pub fn from_rows(rows: Vec<T>) -> Self {
    let total = rows.len() as u64;
    Self {
      limit: rows.len() as u32,
      data: rows,
      total,
      offset: 0,
    }
  }
}

/// Query parameters for a list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
  pub limit: u32,
  pub offset: u64,
  pub filters: BTreeMap<String, String>,
}

impl ListParams {
  pub fn new(limit: u32, offset: u64) -> Self {
    Self {
      limit,
      offset,
      filters: BTreeMap::new(),
    }
  }

  #[cfg(test)]
  pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.filters.insert(name.into(), value.into());
    self
  }

  /// Query string pairs: non-empty filters first (sorted), then limit and offset.
  pub fn to_query(&self) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = self
      .filters
      .iter()
      .filter(|(_, v)| !v.is_empty())
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect();
    pairs.push(("limit".to_string(), self.limit.to_string()));
    pairs.push(("offset".to_string(), self.offset.to_string()));
    pairs
  }

  pub fn filter(&self, name: &str) -> Option<&str> {
    self.filters.get(name).map(String::as_str)
  }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  #[serde(default)]
  pub phone: Option<String>,
  pub role: UserRole,
  #[serde(default = "default_true")]
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

impl User {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  pub role: UserRole,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub first_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub role: Option<UserRole>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
  #[serde(default)]
  pub total_users: u64,
  #[serde(default)]
  pub active_users: u64,
  #[serde(default)]
  pub admins: u64,
}

// ============================================================================
// Vehicles
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
  pub id: String,
  pub make: String,
  pub model: String,
  pub year: u16,
  pub license_plate: String,
  pub vehicle_type: VehicleType,
  pub status: VehicleStatus,
  pub daily_rate: f64,
  #[serde(default)]
  pub location: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVehicle {
  pub make: String,
  pub model: String,
  pub year: u16,
  pub license_plate: String,
  pub vehicle_type: VehicleType,
  pub daily_rate: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub make: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub model: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub year: Option<u16>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub license_plate: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub daily_rate: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
}

/// Body of `PATCH /vehicles/{id}/status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleStatusChange {
  pub status: VehicleStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleStats {
  #[serde(default)]
  pub total: u64,
  #[serde(default)]
  pub available: u64,
  #[serde(default)]
  pub rented: u64,
  #[serde(default)]
  pub maintenance: u64,
  #[serde(default)]
  pub retired: u64,
}

// ============================================================================
// Bookings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
  pub id: String,
  pub user_id: String,
  pub vehicle_id: String,
  pub start_date: DateTime<Utc>,
  pub end_date: DateTime<Utc>,
  pub status: BookingStatus,
  pub total_amount: f64,
  #[serde(default)]
  pub notes: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_date: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end_date: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<BookingStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingStats {
  #[serde(default)]
  pub total: u64,
  #[serde(default)]
  pub pending: u64,
  #[serde(default)]
  pub active: u64,
  #[serde(default)]
  pub completed: u64,
  #[serde(default)]
  pub cancelled: u64,
  #[serde(default)]
  pub revenue: f64,
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  pub id: String,
  pub user_id: String,
  pub channel: NotificationChannel,
  pub subject: String,
  pub message: String,
  pub status: NotificationStatus,
  #[serde(default)]
  pub read_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
  pub user_id: String,
  pub channel: NotificationChannel,
  pub subject: String,
  pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationStats {
  #[serde(default)]
  pub total: u64,
  #[serde(default)]
  pub pending: u64,
  #[serde(default)]
  pub sent: u64,
  #[serde(default)]
  pub failed: u64,
  #[serde(default)]
  pub unread: u64,
}

/// Response of `POST /notifications/send-pending`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendPendingResult {
  #[serde(default)]
  pub sent: u64,
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
  pub status: String,
  #[serde(default)]
  pub version: Option<String>,
  #[serde(default)]
  pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
  pub service: String,
  pub status: String,
  #[serde(default)]
  pub latency_ms: Option<u64>,
  #[serde(default)]
  pub message: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_wire_enum_round_trips_names() {
    assert_eq!(VehicleStatus::Maintenance.as_str(), "maintenance");
    assert_eq!("Rented".parse::<VehicleStatus>(), Ok(VehicleStatus::Rented));
    assert!("flying".parse::<VehicleStatus>().is_err());
    assert_eq!(
      serde_json::to_value(BookingStatus::Cancelled).unwrap(),
      serde_json::json!("cancelled")
    );
  }

  #[test]
  fn test_list_params_query_skips_empty_filters() {
    let params = ListParams::new(20, 40)
      .with_filter("status", "active")
      .with_filter("user_id", "");
    assert_eq!(
      params.to_query(),
      vec![
        ("status".to_string(), "active".to_string()),
        ("limit".to_string(), "20".to_string()),
        ("offset".to_string(), "40".to_string()),
      ]
    );
  }

  #[test]
  fn test_page_deserializes_list_response() {
    let body = serde_json::json!({
      "data": [{
        "id": "u-1",
        "email": "ada@example.com",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "role": "admin",
        "created_at": "2024-03-01T10:00:00Z"
      }],
      "total": 25,
      "limit": 10,
      "offset": 0
    });
    let page: Page<User> = serde_json::from_value(body).unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.data[0].full_name(), "Ada Lovelace");
    assert!(page.data[0].is_active);
    assert_eq!(page.data[0].phone, None);
  }

  #[test]
  fn test_update_payload_omits_unset_fields() {
    let update = UserUpdate {
      is_active: Some(false),
      ..Default::default()
    };
    assert_eq!(
      serde_json::to_value(update).unwrap(),
      serde_json::json!({"is_active": false})
    );
  }

  #[test]
  fn test_booking_open_states() {
    assert!(BookingStatus::Pending.is_open());
    assert!(BookingStatus::Active.is_open());
    assert!(!BookingStatus::Completed.is_open());
    assert!(!BookingStatus::Cancelled.is_open());
  }
}
