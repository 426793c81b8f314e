use super::{parse, required, FilterField, FormField, FormValues, Resource};
use crate::api::types::{
  ListParams, NewNotification, Notification, NotificationChannel, NotificationStats, Page,
};
use crate::api::{ApiClient, ApiError};
use crate::mutation::Mutation;
use crate::table::{Cell, CellRender, ColumnDescriptor, FieldValue, Row, RowAction, Tone};
use futures::future::{BoxFuture, FutureExt};

impl Row for Notification {
  fn field(&self, key: &str) -> Option<FieldValue> {
    match key {
      "id" => Some(self.id.as_str().into()),
      "user_id" => Some(self.user_id.as_str().into()),
      "channel" => Some(self.channel.as_str().into()),
      "subject" => Some(self.subject.as_str().into()),
      "message" => Some(self.message.as_str().into()),
      "status" => Some(self.status.as_str().into()),
      "read_at" => self.read_at.map(FieldValue::from),
      "created_at" => Some(self.created_at.into()),
      _ => None,
    }
  }

  fn row_key(&self) -> String {
    self.id.clone()
  }
}

pub fn notification_tone(status: &str) -> Tone {
  match status {
    "pending" => Tone::Warning,
    "sent" => Tone::Good,
    "failed" => Tone::Bad,
    _ => Tone::Normal,
  }
}

fn read_cell(value: Option<&FieldValue>, _notification: &Notification) -> Cell {
  match value {
    Some(FieldValue::DateTime(at)) => Cell::toned(at.format("%Y-%m-%d").to_string(), Tone::Muted),
    _ => Cell::toned("unread", Tone::Accent),
  }
}

fn actions(notification: &Notification) -> Vec<RowAction> {
  if notification.read_at.is_none() {
    vec![RowAction::MarkRead]
  } else {
    Vec::new()
  }
}

impl Resource for Notification {
  type Stats = NotificationStats;

  const NAME: &'static str = "notifications";
  const STATS: &'static str = "notification-stats";
  const TITLE: &'static str = "Notifications";
  const EMPTY_MESSAGE: &'static str = "No notifications.";

  fn columns() -> Vec<ColumnDescriptor<Self>> {
    vec![
      ColumnDescriptor::field("id", "ID", 10),
      ColumnDescriptor::field("user_id", "User", 10),
      ColumnDescriptor::field("channel", "Channel", 7),
      ColumnDescriptor::field("subject", "Subject", 30).with_render(CellRender::Truncate(30)),
      ColumnDescriptor::field("status", "Status", 8)
        .with_render(CellRender::Badge(notification_tone)),
      ColumnDescriptor::field("read_at", "Read", 10).with_render(CellRender::Custom(read_cell)),
      ColumnDescriptor::field("created_at", "Created", 16).with_render(CellRender::DateTime),
      ColumnDescriptor::actions(actions, 8),
    ]
  }

  fn filters() -> Vec<FilterField> {
    vec![FilterField::text("user_id", "User")]
  }

  fn fetch_page(
    api: ApiClient,
    params: ListParams,
  ) -> BoxFuture<'static, Result<Page<Self>, ApiError>> {
    async move { api.list_notifications(&params).await }.boxed()
  }

  fn fetch_one(api: ApiClient, id: String) -> BoxFuture<'static, Result<Self, ApiError>> {
    async move { api.get_notification(&id).await }.boxed()
  }

  fn fetch_stats(api: ApiClient) -> BoxFuture<'static, Result<Self::Stats, ApiError>> {
    async move { api.notification_stats(None).await }.boxed()
  }

  fn stats_line(stats: &NotificationStats) -> String {
    format!(
      "total {}  pending {}  sent {}  failed {}  unread {}",
      stats.total, stats.pending, stats.sent, stats.failed, stats.unread
    )
  }

  fn row_actions(notification: &Self) -> Vec<RowAction> {
    actions(notification)
  }

  fn action_mutation(notification: &Self, action: RowAction) -> Option<Mutation> {
    match action {
      // Marking an already-read notification is harmless
      RowAction::MarkRead => Some(Mutation::MarkNotificationRead {
        id: notification.id.clone(),
      }),
      _ => None,
    }
  }

  fn bulk_mutation() -> Option<Mutation> {
    Some(Mutation::SendPendingNotifications)
  }

  fn create_form() -> Option<Vec<FormField>> {
    Some(vec![
      FormField::new("user_id", "User ID", ""),
      FormField::new("channel", "Channel", NotificationChannel::Email.as_str()),
      FormField::new("subject", "Subject", ""),
      FormField::new("message", "Message", ""),
    ])
  }

  fn build_create(values: &FormValues) -> Result<Mutation, String> {
    Ok(Mutation::CreateNotification(NewNotification {
      user_id: required(values, "user_id")?,
      channel: parse(values, "channel")?,
      subject: required(values, "subject")?,
      message: required(values, "message")?,
    }))
  }

  fn detail(notification: &Self) -> Vec<(&'static str, String)> {
    vec![
      ("ID", notification.id.clone()),
      ("User", notification.user_id.clone()),
      ("Channel", notification.channel.to_string()),
      ("Subject", notification.subject.clone()),
      ("Message", notification.message.clone()),
      ("Status", notification.status.to_string()),
      (
        "Read",
        notification
          .read_at
          .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
          .unwrap_or_else(|| "unread".to_string()),
      ),
      (
        "Created",
        notification.created_at.format("%Y-%m-%d %H:%M").to_string(),
      ),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::NotificationStatus;
  use chrono::Utc;

  fn notification(read: bool) -> Notification {
    Notification {
      id: "ntf-0070".to_string(),
      user_id: "usr-0002".to_string(),
      channel: NotificationChannel::Sms,
      subject: "Your booking starts tomorrow".to_string(),
      message: "Pick up at the Lisbon depot".to_string(),
      status: NotificationStatus::Sent,
      read_at: read.then(Utc::now),
      created_at: Utc::now(),
    }
  }

  #[test]
  fn test_read_column() {
    let columns = Notification::columns();
    let read = &columns[5];
    assert_eq!(read.cell(&notification(false)), Cell::toned("unread", Tone::Accent));
    assert_eq!(read.cell(&notification(true)).tone, Tone::Muted);
  }

  #[test]
  fn test_mark_read_only_offered_when_unread() {
    assert_eq!(Notification::row_actions(&notification(false)), vec![RowAction::MarkRead]);
    assert!(Notification::row_actions(&notification(true)).is_empty());
    assert_eq!(
      Notification::bulk_mutation(),
      Some(Mutation::SendPendingNotifications)
    );
  }

  #[test]
  fn test_create_requires_message() {
    let mut values: FormValues = Notification::create_form()
      .unwrap()
      .into_iter()
      .map(|f| (f.name, f.value))
      .collect();
    values.insert("user_id", "usr-0001".to_string());
    values.insert("subject", "Hello".to_string());
    assert_eq!(
      Notification::build_create(&values),
      Err("message is required".to_string())
    );
  }
}
