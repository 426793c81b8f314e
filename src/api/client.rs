use crate::api::error::ApiError;
use crate::api::transport::{ApiRequest, HttpTransport, Method, Transport};
use crate::api::types::{
  Booking, BookingStats, BookingUpdate, HealthStatus, ListParams, NewNotification, NewUser,
  NewVehicle, Notification, NotificationStats, Page, SendPendingResult, ServiceHealth, User,
  UserStats, UserUpdate, Vehicle, VehicleStats, VehicleStatus, VehicleStatusChange,
  VehicleUpdate,
};
use crate::config::Config;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Typed facade over the rental platform REST API.
///
/// One method per endpoint; every method performs exactly one request.
/// Writes that come back with no content return `None`.
#[derive(Clone)]
pub struct ApiClient {
  transport: Arc<dyn Transport>,
}

impl ApiClient {
  /// Client talking HTTP to the configured backend
  pub fn new(config: &Config) -> Result<Self, ApiError> {
    let transport = HttpTransport::new(
      &config.api.base_url,
      Duration::from_secs(config.api.timeout_secs),
    )?;
    Ok(Self::with_transport(Arc::new(transport)))
  }

  pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
    Self { transport }
  }

  async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
    self
      .call_optional(request)
      .await?
      .ok_or_else(|| ApiError::decode("expected a body, got no content"))
  }

  async fn call_optional<T: DeserializeOwned>(
    &self,
    request: ApiRequest,
  ) -> Result<Option<T>, ApiError> {
    match self.transport.send(request).await? {
      Some(Value::Null) | None => Ok(None),
      Some(value) => serde_json::from_value(value)
        .map(Some)
        .map_err(ApiError::decode),
    }
  }

  async fn call_unit(&self, request: ApiRequest) -> Result<(), ApiError> {
    self.transport.send(request).await.map(|_| ())
  }

  fn json_body<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body)
      .map_err(|e| ApiError::from_status(400, format!("failed to encode request: {}", e)))
  }

  fn list_request(path: &str, params: &ListParams) -> ApiRequest {
    ApiRequest::get(path).with_query(params.to_query())
  }

  fn stats_request(path: &str, user_id: Option<&str>) -> ApiRequest {
    let query = user_id
      .map(|id| vec![("user_id".to_string(), id.to_string())])
      .unwrap_or_default();
    ApiRequest::get(path).with_query(query)
  }

  // ==========================================================================
  // Users
  // ==========================================================================

  pub async fn list_users(&self, params: &ListParams) -> Result<Page<User>, ApiError> {
    self.call(Self::list_request("/users", params)).await
  }

  pub async fn get_user(&self, id: &str) -> Result<User, ApiError> {
    self.call(ApiRequest::get(format!("/users/{}", id))).await
  }

  /// Create a user. `None` when the backend answers with no content.
  pub async fn create_user(&self, user: &NewUser) -> Result<Option<User>, ApiError> {
    let request = ApiRequest::new(Method::Post, "/users").with_body(Self::json_body(user)?);
    self.call_optional(request).await
  }

  pub async fn update_user(
    &self,
    id: &str,
    update: &UserUpdate,
  ) -> Result<Option<User>, ApiError> {
    let request =
      ApiRequest::new(Method::Put, format!("/users/{}", id)).with_body(Self::json_body(update)?);
    self.call_optional(request).await
  }

  pub async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
    self
      .call_unit(ApiRequest::new(Method::Delete, format!("/users/{}", id)))
      .await
  }

  pub async fn user_stats(&self) -> Result<UserStats, ApiError> {
    self.call(ApiRequest::get("/users/stats")).await
  }

  // ==========================================================================
  // Vehicles
  // ==========================================================================

  pub async fn list_vehicles(&self, params: &ListParams) -> Result<Page<Vehicle>, ApiError> {
    self.call(Self::list_request("/vehicles", params)).await
  }

  pub async fn get_vehicle(&self, id: &str) -> Result<Vehicle, ApiError> {
    self.call(ApiRequest::get(format!("/vehicles/{}", id))).await
  }

  pub async fn create_vehicle(&self, vehicle: &NewVehicle) -> Result<Option<Vehicle>, ApiError> {
    let request =
      ApiRequest::new(Method::Post, "/vehicles").with_body(Self::json_body(vehicle)?);
    self.call_optional(request).await
  }

  pub async fn update_vehicle(
    &self,
    id: &str,
    update: &VehicleUpdate,
  ) -> Result<Option<Vehicle>, ApiError> {
    let request = ApiRequest::new(Method::Put, format!("/vehicles/{}", id))
      .with_body(Self::json_body(update)?);
    self.call_optional(request).await
  }

  pub async fn delete_vehicle(&self, id: &str) -> Result<(), ApiError> {
    self
      .call_unit(ApiRequest::new(Method::Delete, format!("/vehicles/{}", id)))
      .await
  }

  pub async fn update_vehicle_status(
    &self,
    id: &str,
    status: VehicleStatus,
  ) -> Result<Option<Vehicle>, ApiError> {
    let request = ApiRequest::new(Method::Patch, format!("/vehicles/{}/status", id))
      .with_body(Self::json_body(&VehicleStatusChange { status })?);
    self.call_optional(request).await
  }

  pub async fn vehicle_stats(&self) -> Result<VehicleStats, ApiError> {
    self.call(ApiRequest::get("/vehicles/stats")).await
  }

  // ==========================================================================
  // Bookings
  // ==========================================================================

  pub async fn list_bookings(&self, params: &ListParams) -> Result<Page<Booking>, ApiError> {
    self.call(Self::list_request("/bookings", params)).await
  }

  pub async fn get_booking(&self, id: &str) -> Result<Booking, ApiError> {
    self.call(ApiRequest::get(format!("/bookings/{}", id))).await
  }

  pub async fn update_booking(
    &self,
    id: &str,
    update: &BookingUpdate,
  ) -> Result<Option<Booking>, ApiError> {
    let request = ApiRequest::new(Method::Put, format!("/bookings/{}", id))
      .with_body(Self::json_body(update)?);
    self.call_optional(request).await
  }

  pub async fn cancel_booking(&self, id: &str) -> Result<Option<Booking>, ApiError> {
    let request = ApiRequest::new(Method::Post, format!("/bookings/{}/cancel", id));
    self.call_optional(request).await
  }

  pub async fn booking_stats(&self, user_id: Option<&str>) -> Result<BookingStats, ApiError> {
    self
      .call(Self::stats_request("/bookings/stats", user_id))
      .await
  }

  /// Currently running bookings. The endpoint may answer with a bare array
  /// or with a list envelope; both are accepted.
  pub async fn active_bookings(&self) -> Result<Vec<Booking>, ApiError> {
    let value: Value = self.call(ApiRequest::get("/bookings/active")).await?;
    let rows = match value {
      Value::Object(mut map) => map
        .remove("data")
        .ok_or_else(|| ApiError::decode("active bookings envelope has no `data` field"))?,
      other => other,
    };
    serde_json::from_value(rows).map_err(ApiError::decode)
  }

  // ==========================================================================
  // Notifications
  // ==========================================================================

  pub async fn list_notifications(
    &self,
    params: &ListParams,
  ) -> Result<Page<Notification>, ApiError> {
    self.call(Self::list_request("/notifications", params)).await
  }

  pub async fn get_notification(&self, id: &str) -> Result<Notification, ApiError> {
    self
      .call(ApiRequest::get(format!("/notifications/{}", id)))
      .await
  }

  pub async fn create_notification(
    &self,
    notification: &NewNotification,
  ) -> Result<Option<Notification>, ApiError> {
    let request =
      ApiRequest::new(Method::Post, "/notifications").with_body(Self::json_body(notification)?);
    self.call_optional(request).await
  }

  pub async fn mark_notification_read(
    &self,
    id: &str,
  ) -> Result<Option<Notification>, ApiError> {
    let request = ApiRequest::new(Method::Post, format!("/notifications/{}/read", id));
    self.call_optional(request).await
  }

  pub async fn send_pending_notifications(&self) -> Result<SendPendingResult, ApiError> {
    let request = ApiRequest::new(Method::Post, "/notifications/send-pending");
    Ok(self.call_optional(request).await?.unwrap_or_default())
  }

  pub async fn notification_stats(
    &self,
    user_id: Option<&str>,
  ) -> Result<NotificationStats, ApiError> {
    self
      .call(Self::stats_request("/notifications/stats", user_id))
      .await
  }

  // ==========================================================================
  // Health
  // ==========================================================================

  pub async fn health(&self) -> Result<HealthStatus, ApiError> {
    self.call(ApiRequest::get("/health")).await
  }

  pub async fn service_health(&self, service: &str) -> Result<ServiceHealth, ApiError> {
    self
      .call(ApiRequest::get(format!("/services/{}/health", service)))
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::error::ErrorKind;
  use wiremock::matchers::{body_json, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client(server: &MockServer) -> ApiClient {
    let transport = HttpTransport::new(&server.uri(), Duration::from_secs(2)).unwrap();
    ApiClient::with_transport(Arc::new(transport))
  }

  fn vehicle_json(status: &str) -> Value {
    serde_json::json!({
      "id": "v-1",
      "make": "Toyota",
      "model": "Corolla",
      "year": 2021,
      "license_plate": "AB-123-CD",
      "vehicle_type": "car",
      "status": status,
      "daily_rate": 45.0,
      "created_at": "2024-01-01T00:00:00Z"
    })
  }

  #[tokio::test]
  async fn test_list_bookings_sends_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/bookings"))
      .and(query_param("status", "active"))
      .and(query_param("limit", "20"))
      .and(query_param("offset", "0"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "data": [], "total": 0, "limit": 20, "offset": 0
      })))
      .expect(1)
      .mount(&server)
      .await;

    let params = ListParams::new(20, 0).with_filter("status", "active");
    let page = client(&server).list_bookings(&params).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(page.data.is_empty());
  }

  #[tokio::test]
  async fn test_vehicle_status_patch_body() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
      .and(path("/api/v1/vehicles/v-1/status"))
      .and(body_json(serde_json::json!({"status": "maintenance"})))
      .respond_with(ResponseTemplate::new(200).set_body_json(vehicle_json("maintenance")))
      .mount(&server)
      .await;

    let vehicle = client(&server)
      .update_vehicle_status("v-1", VehicleStatus::Maintenance)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(vehicle.status, VehicleStatus::Maintenance);
  }

  #[tokio::test]
  async fn test_update_without_content_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
      .and(path("/api/v1/vehicles/v-1"))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(500))
      .expect(0)
      .mount(&server)
      .await;

    let update = VehicleUpdate {
      daily_rate: Some(50.0),
      ..Default::default()
    };
    let vehicle = client(&server).update_vehicle("v-1", &update).await.unwrap();
    assert_eq!(vehicle, None);
  }

  #[tokio::test]
  async fn test_active_bookings_envelope_without_data_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/bookings/active"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"total": 0})))
      .mount(&server)
      .await;

    let err = client(&server).active_bookings().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Server);
    assert!(err.message.contains("data"));
  }

  #[tokio::test]
  async fn test_stats_user_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/notifications/stats"))
      .and(query_param("user_id", "u-7"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"total": 3, "unread": 2})),
      )
      .mount(&server)
      .await;

    let stats = client(&server)
      .notification_stats(Some("u-7"))
      .await
      .unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.unread, 2);
    assert_eq!(stats.sent, 0);
  }

  #[tokio::test]
  async fn test_active_bookings_accepts_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/bookings/active"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": [], "total": 0})),
      )
      .mount(&server)
      .await;

    let active = client(&server).active_bookings().await.unwrap();
    assert!(active.is_empty());
  }

  #[tokio::test]
  async fn test_get_missing_user_is_client_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/v1/users/nope"))
      .respond_with(
        ResponseTemplate::new(404).set_body_json(serde_json::json!({"message": "not found"})),
      )
      .mount(&server)
      .await;

    let err = client(&server).get_user("nope").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Client);
    assert!(err.is_not_found());
  }

  #[tokio::test]
  async fn test_send_pending_without_body_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/v1/notifications/send-pending"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&server)
      .await;

    let result = client(&server).send_pending_notifications().await.unwrap();
    assert_eq!(result.sent, 0);
  }
}
