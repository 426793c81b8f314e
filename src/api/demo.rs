//! In-memory backend implementing the REST contract.
//!
//! Used by `--demo` to run the dashboard without a server, and by the test
//! suite as a stateful stand-in for the real API.

use crate::api::error::ApiError;
use crate::api::transport::{ApiRequest, Method, Transport};
use crate::api::types::{
  Booking, BookingStats, BookingStatus, BookingUpdate, HealthStatus, NewNotification, NewUser,
  NewVehicle, Notification, NotificationChannel, NotificationStats, NotificationStatus, Page,
  SendPendingResult, ServiceHealth, User, UserRole, UserStats, UserUpdate, Vehicle,
  VehicleStats, VehicleStatus, VehicleStatusChange, VehicleType, VehicleUpdate,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

type Response = Result<Option<Value>, ApiError>;

const FIRST_NAMES: &[&str] = &[
  "Ada", "Grace", "Alan", "Linus", "Margaret", "Dennis", "Barbara", "Ken", "Frances", "John",
  "Radia", "Edsger",
];
const LAST_NAMES: &[&str] = &[
  "Lovelace", "Hopper", "Turing", "Torvalds", "Hamilton", "Ritchie", "Liskov", "Thompson",
  "Allen", "Backus", "Perlman", "Dijkstra",
];
const MODELS: &[(&str, &str, VehicleType)] = &[
  ("Toyota", "Corolla", VehicleType::Car),
  ("Ford", "Transit", VehicleType::Van),
  ("Volvo", "FH16", VehicleType::Truck),
  ("Honda", "CB500", VehicleType::Motorcycle),
  ("Vespa", "Primavera", VehicleType::Scooter),
  ("Tesla", "Model 3", VehicleType::Car),
];
const CITIES: &[&str] = &["Lisbon", "Porto", "Madrid", "Lyon", "Berlin"];

#[derive(Debug, Default)]
struct DemoState {
  users: Vec<User>,
  vehicles: Vec<Vehicle>,
  bookings: Vec<Booking>,
  notifications: Vec<Notification>,
  next_id: u64,
}

impl DemoState {
  fn next_id(&mut self, prefix: &str) -> String {
    self.next_id += 1;
    format!("{}-{:04}", prefix, self.next_id)
  }
}

/// Stateful in-memory implementation of [`Transport`].
#[derive(Default)]
pub struct DemoBackend {
  state: Mutex<DemoState>,
  requests: AtomicUsize,
  fail_next: Mutex<Option<ApiError>>,
}

impl DemoBackend {
  /// Backend pre-populated with a small, deterministic fleet.
  pub fn seeded() -> Self {
    let backend = Self::default();
    {
      let mut state = backend.lock();
      seed(&mut state);
    }
    backend
  }

  /// Number of requests served so far
  #[cfg(test)]
  pub fn request_count(&self) -> usize {
    self.requests.load(Ordering::SeqCst)
  }

  /// Make the next request fail with `error` without touching state.
  #[cfg(test)]
  pub fn fail_next(&self, error: ApiError) {
    if let Ok(mut slot) = self.fail_next.lock() {
      *slot = Some(error);
    }
  }

  fn lock(&self) -> MutexGuard<'_, DemoState> {
    // A poisoned demo store is still usable; the data is plain values.
    self.state.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn take_failure(&self) -> Option<ApiError> {
    self.fail_next.lock().ok().and_then(|mut slot| slot.take())
  }

  fn handle(&self, request: &ApiRequest) -> Response {
    let mut state = self.lock();
    let segments = request.segments();

    match (request.method, segments.as_slice()) {
      // Users
      (Method::Get, ["users"]) => {
        let users: Vec<&User> = state.users.iter().rev().collect();
        paginate(request, users)
      }
      (Method::Get, ["users", "stats"]) => json(&UserStats {
        total_users: state.users.len() as u64,
        active_users: state.users.iter().filter(|u| u.is_active).count() as u64,
        admins: state
          .users
          .iter()
          .filter(|u| u.role == UserRole::Admin)
          .count() as u64,
      }),
      (Method::Get, ["users", id]) => json(find(&state.users, |u| u.id == *id, "user", id)?),
      (Method::Post, ["users"]) => {
        let new: NewUser = body(request)?;
        if state.users.iter().any(|u| u.email == new.email) {
          return Err(ApiError::from_status(409, "email already registered"));
        }
        let user = User {
          id: state.next_id("usr"),
          email: new.email,
          first_name: new.first_name,
          last_name: new.last_name,
          phone: new.phone,
          role: new.role,
          is_active: true,
          created_at: Utc::now(),
        };
        state.users.push(user.clone());
        json(&user)
      }
      (Method::Put, ["users", id]) => {
        let update: UserUpdate = body(request)?;
        let user = find_mut(&mut state.users, |u| u.id == *id, "user", id)?;
        apply(&mut user.email, update.email);
        apply(&mut user.first_name, update.first_name);
        apply(&mut user.last_name, update.last_name);
        apply(&mut user.role, update.role);
        apply(&mut user.is_active, update.is_active);
        if update.phone.is_some() {
          user.phone = update.phone;
        }
        json(&*user)
      }
      (Method::Delete, ["users", id]) => {
        remove(&mut state.users, |u| u.id == *id, "user", id)?;
        Ok(None)
      }

      // Vehicles
      (Method::Get, ["vehicles"]) => {
        let vehicles: Vec<&Vehicle> = state.vehicles.iter().rev().collect();
        paginate(request, vehicles)
      }
      (Method::Get, ["vehicles", "stats"]) => {
        let count = |s: VehicleStatus| state.vehicles.iter().filter(|v| v.status == s).count();
        json(&VehicleStats {
          total: state.vehicles.len() as u64,
          available: count(VehicleStatus::Available) as u64,
          rented: count(VehicleStatus::Rented) as u64,
          maintenance: count(VehicleStatus::Maintenance) as u64,
          retired: count(VehicleStatus::Retired) as u64,
        })
      }
      (Method::Get, ["vehicles", id]) => {
        json(find(&state.vehicles, |v| v.id == *id, "vehicle", id)?)
      }
      (Method::Post, ["vehicles"]) => {
        let new: NewVehicle = body(request)?;
        let vehicle = Vehicle {
          id: state.next_id("veh"),
          make: new.make,
          model: new.model,
          year: new.year,
          license_plate: new.license_plate,
          vehicle_type: new.vehicle_type,
          status: VehicleStatus::Available,
          daily_rate: new.daily_rate,
          location: new.location,
          created_at: Utc::now(),
        };
        state.vehicles.push(vehicle.clone());
        json(&vehicle)
      }
      (Method::Put, ["vehicles", id]) => {
        let update: VehicleUpdate = body(request)?;
        let vehicle = find_mut(&mut state.vehicles, |v| v.id == *id, "vehicle", id)?;
        apply(&mut vehicle.make, update.make);
        apply(&mut vehicle.model, update.model);
        apply(&mut vehicle.year, update.year);
        apply(&mut vehicle.license_plate, update.license_plate);
        apply(&mut vehicle.daily_rate, update.daily_rate);
        if update.location.is_some() {
          vehicle.location = update.location;
        }
        json(&*vehicle)
      }
      (Method::Patch, ["vehicles", id, "status"]) => {
        let change: VehicleStatusChange = body(request)?;
        let vehicle = find_mut(&mut state.vehicles, |v| v.id == *id, "vehicle", id)?;
        vehicle.status = change.status;
        json(&*vehicle)
      }
      (Method::Delete, ["vehicles", id]) => {
        remove(&mut state.vehicles, |v| v.id == *id, "vehicle", id)?;
        Ok(None)
      }

      // Bookings
      (Method::Get, ["bookings"]) => {
        let status = request.query_param("status");
        let user_id = request.query_param("user_id");
        let vehicle_id = request.query_param("vehicle_id");
        let bookings: Vec<&Booking> = state
          .bookings
          .iter()
          .rev()
          .filter(|b| status.map_or(true, |s| b.status.as_str() == s))
          .filter(|b| user_id.map_or(true, |u| b.user_id == u))
          .filter(|b| vehicle_id.map_or(true, |v| b.vehicle_id == v))
          .collect();
        paginate(request, bookings)
      }
      (Method::Get, ["bookings", "stats"]) => {
        let user_id = request.query_param("user_id");
        let scoped: Vec<&Booking> = state
          .bookings
          .iter()
          .filter(|b| user_id.map_or(true, |u| b.user_id == u))
          .collect();
        let count = |s: BookingStatus| scoped.iter().filter(|b| b.status == s).count() as u64;
        json(&BookingStats {
          total: scoped.len() as u64,
          pending: count(BookingStatus::Pending),
          active: count(BookingStatus::Active),
          completed: count(BookingStatus::Completed),
          cancelled: count(BookingStatus::Cancelled),
          revenue: scoped
            .iter()
            .filter(|b| b.status != BookingStatus::Cancelled)
            .map(|b| b.total_amount)
            .sum(),
        })
      }
      (Method::Get, ["bookings", "active"]) => {
        let active: Vec<&Booking> = state
          .bookings
          .iter()
          .filter(|b| b.status == BookingStatus::Active)
          .collect();
        json(&active)
      }
      (Method::Get, ["bookings", id]) => {
        json(find(&state.bookings, |b| b.id == *id, "booking", id)?)
      }
      (Method::Put, ["bookings", id]) => {
        let update: BookingUpdate = body(request)?;
        let booking = find_mut(&mut state.bookings, |b| b.id == *id, "booking", id)?;
        apply(&mut booking.start_date, update.start_date);
        apply(&mut booking.end_date, update.end_date);
        apply(&mut booking.status, update.status);
        if update.notes.is_some() {
          booking.notes = update.notes;
        }
        if booking.end_date < booking.start_date {
          return Err(ApiError::from_status(422, "end_date precedes start_date"));
        }
        json(&*booking)
      }
      (Method::Post, ["bookings", id, "cancel"]) => {
        let booking = find_mut(&mut state.bookings, |b| b.id == *id, "booking", id)?;
        if !booking.status.is_open() {
          return Err(ApiError::from_status(
            409,
            format!("booking is already {}", booking.status),
          ));
        }
        booking.status = BookingStatus::Cancelled;
        let booking = booking.clone();
        if let Some(vehicle) = state
          .vehicles
          .iter_mut()
          .find(|v| v.id == booking.vehicle_id && v.status == VehicleStatus::Rented)
        {
          vehicle.status = VehicleStatus::Available;
        }
        json(&booking)
      }

      // Notifications
      (Method::Get, ["notifications"]) => {
        let user_id = request.query_param("user_id");
        let notifications: Vec<&Notification> = state
          .notifications
          .iter()
          .rev()
          .filter(|n| user_id.map_or(true, |u| n.user_id == u))
          .collect();
        paginate(request, notifications)
      }
      (Method::Get, ["notifications", "stats"]) => {
        let user_id = request.query_param("user_id");
        let scoped: Vec<&Notification> = state
          .notifications
          .iter()
          .filter(|n| user_id.map_or(true, |u| n.user_id == u))
          .collect();
        let count =
          |s: NotificationStatus| scoped.iter().filter(|n| n.status == s).count() as u64;
        json(&NotificationStats {
          total: scoped.len() as u64,
          pending: count(NotificationStatus::Pending),
          sent: count(NotificationStatus::Sent),
          failed: count(NotificationStatus::Failed),
          unread: scoped.iter().filter(|n| n.read_at.is_none()).count() as u64,
        })
      }
      (Method::Post, ["notifications", "send-pending"]) => {
        let mut sent = 0;
        for notification in state.notifications.iter_mut() {
          if notification.status == NotificationStatus::Pending {
            notification.status = NotificationStatus::Sent;
            sent += 1;
          }
        }
        json(&SendPendingResult { sent })
      }
      (Method::Get, ["notifications", id]) => json(find(
        &state.notifications,
        |n| n.id == *id,
        "notification",
        id,
      )?),
      (Method::Post, ["notifications"]) => {
        let new: NewNotification = body(request)?;
        if !state.users.iter().any(|u| u.id == new.user_id) {
          return Err(ApiError::from_status(
            422,
            format!("unknown user {}", new.user_id),
          ));
        }
        let notification = Notification {
          id: state.next_id("ntf"),
          user_id: new.user_id,
          channel: new.channel,
          subject: new.subject,
          message: new.message,
          status: NotificationStatus::Pending,
          read_at: None,
          created_at: Utc::now(),
        };
        state.notifications.push(notification.clone());
        json(&notification)
      }
      (Method::Post, ["notifications", id, "read"]) => {
        let notification = find_mut(
          &mut state.notifications,
          |n| n.id == *id,
          "notification",
          id,
        )?;
        if notification.read_at.is_none() {
          notification.read_at = Some(Utc::now());
        }
        json(&*notification)
      }

      // Health
      (Method::Get, ["health"]) => json(&HealthStatus {
        status: "ok".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        timestamp: Some(Utc::now()),
      }),
      (Method::Get, ["services", service, "health"]) => json(&ServiceHealth {
        service: service.to_string(),
        status: "ok".to_string(),
        latency_ms: Some(1),
        message: None,
      }),

      _ => Err(ApiError::from_status(
        404,
        format!("no route for {} {}", request.method, request.path),
      )),
    }
  }
}

impl Transport for DemoBackend {
  fn send(&self, request: ApiRequest) -> BoxFuture<'_, Response> {
    Box::pin(async move {
      self.requests.fetch_add(1, Ordering::SeqCst);
      debug!(method = %request.method, path = %request.path, "demo request");
      if let Some(err) = self.take_failure() {
        return Err(err);
      }
      self.handle(&request)
    })
  }
}

fn json<T: Serialize + ?Sized>(value: &T) -> Response {
  serde_json::to_value(value)
    .map(Some)
    .map_err(|e| ApiError::from_status(500, e.to_string()))
}

fn body<T: DeserializeOwned>(request: &ApiRequest) -> Result<T, ApiError> {
  let value = request
    .body
    .clone()
    .ok_or_else(|| ApiError::from_status(400, "missing request body"))?;
  serde_json::from_value(value).map_err(|e| ApiError::from_status(400, e.to_string()))
}

fn apply<T>(field: &mut T, value: Option<T>) {
  if let Some(v) = value {
    *field = v;
  }
}

fn find<'a, T>(
  items: &'a [T],
  pred: impl Fn(&T) -> bool,
  what: &str,
  id: &str,
) -> Result<&'a T, ApiError> {
  items
    .iter()
    .find(|item| pred(item))
    .ok_or_else(|| ApiError::not_found(format!("{} {}", what, id)))
}

fn find_mut<'a, T>(
  items: &'a mut [T],
  pred: impl Fn(&T) -> bool,
  what: &str,
  id: &str,
) -> Result<&'a mut T, ApiError> {
  items
    .iter_mut()
    .find(|item| pred(item))
    .ok_or_else(|| ApiError::not_found(format!("{} {}", what, id)))
}

fn remove<T>(
  items: &mut Vec<T>,
  pred: impl Fn(&T) -> bool,
  what: &str,
  id: &str,
) -> Result<T, ApiError> {
  let index = items
    .iter()
    .position(|item| pred(item))
    .ok_or_else(|| ApiError::not_found(format!("{} {}", what, id)))?;
  Ok(items.remove(index))
}

/// Slice `items` by the request's `limit`/`offset` into a list envelope.
fn paginate<T: Serialize>(request: &ApiRequest, items: Vec<&T>) -> Response {
  let limit = request
    .query_param("limit")
    .and_then(|v| v.parse::<u32>().ok())
    .unwrap_or(10);
  let offset = request
    .query_param("offset")
    .and_then(|v| v.parse::<u64>().ok())
    .unwrap_or(0);
  let total = items.len() as u64;
  let data: Vec<&T> = items
    .into_iter()
    .skip(offset as usize)
    .take(limit as usize)
    .collect();
  json(&Page {
    data,
    total,
    limit,
    offset,
  })
}

fn epoch() -> DateTime<Utc> {
  // 2024-01-01T00:00:00Z
  DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default()
}

fn seed(state: &mut DemoState) {
  let start = epoch();

  for (i, (first, last)) in FIRST_NAMES.iter().zip(LAST_NAMES).enumerate() {
    let id = state.next_id("usr");
    state.users.push(User {
      id,
      email: format!("{}.{}@example.com", first, last).to_lowercase(),
      first_name: first.to_string(),
      last_name: last.to_string(),
      phone: (i % 3 != 0).then(|| format!("+351 91{:07}", i * 7919)),
      role: match i % 6 {
        0 => UserRole::Admin,
        1 => UserRole::Operator,
        _ => UserRole::Customer,
      },
      is_active: i % 5 != 4,
      created_at: start + ChronoDuration::days(i as i64),
    });
  }

  for i in 0..25 {
    let (make, model, vehicle_type) = MODELS[i % MODELS.len()];
    let id = state.next_id("veh");
    state.vehicles.push(Vehicle {
      id,
      make: make.to_string(),
      model: model.to_string(),
      year: 2018 + (i % 7) as u16,
      license_plate: format!(
        "{:02}-{}{}-{:02}",
        i + 10,
        (b'A' + (i % 26) as u8) as char,
        (b'K' + (i % 13) as u8) as char,
        90 - i
      ),
      vehicle_type,
      status: match i % 8 {
        0 | 3 => VehicleStatus::Rented,
        5 => VehicleStatus::Maintenance,
        7 => VehicleStatus::Retired,
        _ => VehicleStatus::Available,
      },
      daily_rate: 25.0 + (i % 5) as f64 * 15.0,
      location: Some(CITIES[i % CITIES.len()].to_string()),
      created_at: start + ChronoDuration::hours(i as i64 * 5),
    });
  }

  let statuses = BookingStatus::ALL;
  for i in 0..30 {
    let user = &state.users[i % state.users.len()];
    let vehicle = &state.vehicles[(i * 3) % state.vehicles.len()];
    let begins = start + ChronoDuration::days(30 + i as i64 * 2);
    let days = 1 + (i % 6) as i64;
    let booking = Booking {
      id: String::new(),
      user_id: user.id.clone(),
      vehicle_id: vehicle.id.clone(),
      start_date: begins,
      end_date: begins + ChronoDuration::days(days),
      status: statuses[i % statuses.len()],
      total_amount: vehicle.daily_rate * days as f64,
      notes: (i % 4 == 0).then(|| "child seat requested".to_string()),
      created_at: begins - ChronoDuration::days(7),
    };
    let id = state.next_id("bkg");
    state.bookings.push(Booking { id, ..booking });
  }

  let channels = NotificationChannel::ALL;
  for i in 0..15 {
    let user_id = state.users[(i * 5) % state.users.len()].id.clone();
    let id = state.next_id("ntf");
    let created_at = start + ChronoDuration::days(40 + i as i64);
    state.notifications.push(Notification {
      id,
      user_id,
      channel: channels[i % channels.len()],
      subject: match i % 3 {
        0 => "Booking confirmed".to_string(),
        1 => "Pick-up reminder".to_string(),
        _ => "Invoice available".to_string(),
      },
      message: format!("Automated message #{}", i + 1),
      status: match i % 4 {
        0 => NotificationStatus::Pending,
        3 => NotificationStatus::Failed,
        _ => NotificationStatus::Sent,
      },
      read_at: (i % 2 == 1).then(|| created_at + ChronoDuration::hours(3)),
      created_at,
    });
  }
}
