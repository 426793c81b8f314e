//! Write operations and the executor that runs them against the API.
//!
//! Every mutation declares which cache prefixes it affects. The executor
//! performs exactly one API call and invalidates those prefixes only when
//! the call succeeded. Destructive mutations must pass through an explicit
//! confirmation step before they can be executed.

use crate::api::types::{
  Booking, BookingUpdate, NewNotification, NewUser, NewVehicle, Notification, User, UserUpdate,
  Vehicle, VehicleStatus, VehicleUpdate,
};
use crate::api::{ApiClient, ApiError};
use crate::cache::QueryCache;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// A write against the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
  CreateUser(NewUser),
  UpdateUser { id: String, update: UserUpdate },
  DeleteUser { id: String },
  CreateVehicle(NewVehicle),
  UpdateVehicle { id: String, update: VehicleUpdate },
  SetVehicleStatus { id: String, status: VehicleStatus },
  DeleteVehicle { id: String },
  UpdateBooking { id: String, update: BookingUpdate },
  CancelBooking { id: String },
  CreateNotification(NewNotification),
  MarkNotificationRead { id: String },
  SendPendingNotifications,
}

/// Which operation a mutation is and what it invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationDescriptor {
  pub operation: &'static str,
  pub resource: &'static str,
  pub affects: &'static [&'static str],
}

const USERS: &[&str] = &["users", "user-stats"];
const VEHICLES: &[&str] = &["vehicles", "vehicle-stats"];
const BOOKINGS: &[&str] = &["bookings", "booking-stats", "active-bookings"];
// Cancelling frees the rented vehicle
const BOOKING_CANCEL: &[&str] = &[
  "bookings",
  "booking-stats",
  "active-bookings",
  "vehicles",
  "vehicle-stats",
];
const NOTIFICATIONS: &[&str] = &["notifications", "notification-stats"];

impl Mutation {
  pub fn descriptor(&self) -> MutationDescriptor {
    let (operation, resource, affects) = match self {
      Mutation::CreateUser(_) => ("create", "users", USERS),
      Mutation::UpdateUser { .. } => ("update", "users", USERS),
      Mutation::DeleteUser { .. } => ("delete", "users", USERS),
      Mutation::CreateVehicle(_) => ("create", "vehicles", VEHICLES),
      Mutation::UpdateVehicle { .. } => ("update", "vehicles", VEHICLES),
      Mutation::SetVehicleStatus { .. } => ("set-status", "vehicles", VEHICLES),
      Mutation::DeleteVehicle { .. } => ("delete", "vehicles", VEHICLES),
      Mutation::UpdateBooking { .. } => ("update", "bookings", BOOKINGS),
      Mutation::CancelBooking { .. } => ("cancel", "bookings", BOOKING_CANCEL),
      Mutation::CreateNotification(_) => ("create", "notifications", NOTIFICATIONS),
      Mutation::MarkNotificationRead { .. } => ("mark-read", "notifications", NOTIFICATIONS),
      Mutation::SendPendingNotifications => ("send-pending", "notifications", NOTIFICATIONS),
    };
    MutationDescriptor {
      operation,
      resource,
      affects,
    }
  }

  /// Id of the targeted entity, if the mutation targets one
  pub fn target_id(&self) -> Option<&str> {
    match self {
      Mutation::UpdateUser { id, .. }
      | Mutation::DeleteUser { id }
      | Mutation::UpdateVehicle { id, .. }
      | Mutation::SetVehicleStatus { id, .. }
      | Mutation::DeleteVehicle { id }
      | Mutation::UpdateBooking { id, .. }
      | Mutation::CancelBooking { id }
      | Mutation::MarkNotificationRead { id } => Some(id),
      Mutation::CreateUser(_)
      | Mutation::CreateVehicle(_)
      | Mutation::CreateNotification(_)
      | Mutation::SendPendingNotifications => None,
    }
  }

  /// Deletes and cancellations need an explicit confirmation.
  pub fn is_destructive(&self) -> bool {
    matches!(
      self,
      Mutation::DeleteUser { .. } | Mutation::DeleteVehicle { .. } | Mutation::CancelBooking { .. }
    )
  }

  /// First step of running a mutation.
  pub fn submit(self) -> Submission {
    if !self.is_destructive() {
      return Submission::Ready(self);
    }
    let prompt = match &self {
      Mutation::DeleteUser { id } => format!("Delete user {}?", id),
      Mutation::DeleteVehicle { id } => format!("Delete vehicle {}?", id),
      Mutation::CancelBooking { id } => format!("Cancel booking {}?", id),
      other => format!("Run {}?", other.descriptor().operation),
    };
    Submission::NeedsConfirmation(PendingConfirmation {
      mutation: self,
      prompt,
    })
  }
}

/// Result of [`Mutation::submit`]
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
  Ready(Mutation),
  NeedsConfirmation(PendingConfirmation),
}

/// A destructive mutation waiting for the operator's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConfirmation {
  mutation: Mutation,
  prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Confirm,
  Reject,
}

impl PendingConfirmation {
  pub fn prompt(&self) -> &str {
    &self.prompt
  }

  /// The mutation to execute, or nothing when rejected.
  pub fn decide(self, decision: Decision) -> Option<Mutation> {
    match decision {
      Decision::Confirm => Some(self.mutation),
      Decision::Reject => {
        info!(operation = self.mutation.descriptor().operation, "mutation rejected");
        None
      }
    }
  }
}

/// What a successful mutation returned
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
  /// Created or updated user; `None` when the write answered with no content
  User(Option<User>),
  Vehicle(Option<Vehicle>),
  Booking(Option<Booking>),
  Notification(Option<Notification>),
  Deleted(String),
  Sent(u64),
}

impl MutationOutcome {
  /// One-line description for the status line.
  pub fn summary(&self) -> String {
    match self {
      MutationOutcome::User(Some(user)) => format!("Saved user {}", user.id),
      MutationOutcome::Vehicle(Some(vehicle)) => format!("Saved vehicle {}", vehicle.id),
      MutationOutcome::Booking(Some(booking)) => {
        format!("Booking {} is now {}", booking.id, booking.status)
      }
      MutationOutcome::Notification(Some(n)) => format!("Saved notification {}", n.id),
      MutationOutcome::User(None)
      | MutationOutcome::Vehicle(None)
      | MutationOutcome::Booking(None)
      | MutationOutcome::Notification(None) => "Saved".to_string(),
      MutationOutcome::Deleted(id) => format!("Deleted {}", id),
      MutationOutcome::Sent(count) => format!("Sent {} pending notifications", count),
    }
  }

  /// Id of the entity the outcome describes
  #[cfg(test)]
  pub fn entity_id(&self) -> Option<&str> {
    match self {
      MutationOutcome::User(user) => user.as_ref().map(|u| u.id.as_str()),
      MutationOutcome::Vehicle(vehicle) => vehicle.as_ref().map(|v| v.id.as_str()),
      MutationOutcome::Booking(booking) => booking.as_ref().map(|b| b.id.as_str()),
      MutationOutcome::Notification(n) => n.as_ref().map(|n| n.id.as_str()),
      MutationOutcome::Deleted(id) => Some(id),
      MutationOutcome::Sent(_) => None,
    }
  }
}

/// Runs mutations and keeps the cache consistent with them.
#[derive(Clone)]
pub struct MutationExecutor {
  api: ApiClient,
  cache: QueryCache,
}

impl MutationExecutor {
  pub fn new(api: ApiClient, cache: QueryCache) -> Self {
    Self { api, cache }
  }

  /// Perform `mutation` with one API call.
  ///
  /// On success every affected prefix is invalidated. On failure the error
  /// is returned unchanged and the cache is left alone.
  pub async fn execute(&self, mutation: Mutation) -> Result<MutationOutcome, ApiError> {
    let descriptor = mutation.descriptor();
    info!(
      operation = descriptor.operation,
      resource = descriptor.resource,
      target = mutation.target_id().unwrap_or("-"),
      "executing mutation"
    );

    match self.perform(mutation).await {
      Ok(outcome) => {
        for prefix in descriptor.affects {
          self.cache.invalidate(prefix);
        }
        Ok(outcome)
      }
      Err(error) => {
        warn!(
          operation = descriptor.operation,
          resource = descriptor.resource,
          %error,
          "mutation failed"
        );
        Err(error)
      }
    }
  }

  /// Run `mutation` in the background; poll the handle from the UI tick.
  pub fn spawn(&self, mutation: Mutation) -> MutationHandle {
    let (tx, rx) = oneshot::channel();
    let executor = self.clone();
    let descriptor = mutation.descriptor();
    tokio::spawn(async move {
      let result = executor.execute(mutation).await;
      let _ = tx.send(result);
    });
    MutationHandle { descriptor, rx }
  }

  async fn perform(&self, mutation: Mutation) -> Result<MutationOutcome, ApiError> {
    let api = &self.api;
    match mutation {
      Mutation::CreateUser(new) => api.create_user(&new).await.map(MutationOutcome::User),
      Mutation::UpdateUser { id, update } => api
        .update_user(&id, &update)
        .await
        .map(MutationOutcome::User),
      Mutation::DeleteUser { id } => {
        api.delete_user(&id).await?;
        Ok(MutationOutcome::Deleted(id))
      }
      Mutation::CreateVehicle(new) => api
        .create_vehicle(&new)
        .await
        .map(MutationOutcome::Vehicle),
      Mutation::UpdateVehicle { id, update } => api
        .update_vehicle(&id, &update)
        .await
        .map(MutationOutcome::Vehicle),
      Mutation::SetVehicleStatus { id, status } => api
        .update_vehicle_status(&id, status)
        .await
        .map(MutationOutcome::Vehicle),
      Mutation::DeleteVehicle { id } => {
        api.delete_vehicle(&id).await?;
        Ok(MutationOutcome::Deleted(id))
      }
      Mutation::UpdateBooking { id, update } => api
        .update_booking(&id, &update)
        .await
        .map(MutationOutcome::Booking),
      Mutation::CancelBooking { id } => api.cancel_booking(&id).await.map(MutationOutcome::Booking),
      Mutation::CreateNotification(new) => api
        .create_notification(&new)
        .await
        .map(MutationOutcome::Notification),
      Mutation::MarkNotificationRead { id } => api
        .mark_notification_read(&id)
        .await
        .map(MutationOutcome::Notification),
      Mutation::SendPendingNotifications => api
        .send_pending_notifications()
        .await
        .map(|r| MutationOutcome::Sent(r.sent)),
    }
  }
}

/// A mutation running in the background.
#[derive(Debug)]
pub struct MutationHandle {
  descriptor: MutationDescriptor,
  rx: oneshot::Receiver<Result<MutationOutcome, ApiError>>,
}

impl MutationHandle {
  pub fn descriptor(&self) -> MutationDescriptor {
    self.descriptor
  }

  /// The result once the mutation finished, without blocking.
  pub fn poll(&mut self) -> Option<Result<MutationOutcome, ApiError>> {
    match self.rx.try_recv() {
      Ok(result) => Some(result),
      Err(oneshot::error::TryRecvError::Empty) => None,
      Err(oneshot::error::TryRecvError::Closed) => {
        Some(Err(ApiError::transport("mutation task ended without a result")))
      }
    }
  }
}
