use super::{parse, parse_date, FilterField, FormField, FormValues, Resource};
use crate::api::types::{Booking, BookingStats, BookingStatus, BookingUpdate, ListParams, Page};
use crate::api::{ApiClient, ApiError};
use crate::mutation::Mutation;
use crate::table::{CellRender, ColumnDescriptor, FieldValue, Row, RowAction, Tone};
use futures::future::{BoxFuture, FutureExt};

impl Row for Booking {
  fn field(&self, key: &str) -> Option<FieldValue> {
    match key {
      "id" => Some(self.id.as_str().into()),
      "user_id" => Some(self.user_id.as_str().into()),
      "vehicle_id" => Some(self.vehicle_id.as_str().into()),
      "start_date" => Some(self.start_date.into()),
      "end_date" => Some(self.end_date.into()),
      "status" => Some(self.status.as_str().into()),
      "total_amount" => Some(self.total_amount.into()),
      "notes" => self.notes.as_deref().map(FieldValue::from),
      "created_at" => Some(self.created_at.into()),
      _ => None,
    }
  }

  fn row_key(&self) -> String {
    self.id.clone()
  }
}

pub fn booking_tone(status: &str) -> Tone {
  match status {
    "pending" => Tone::Warning,
    "confirmed" => Tone::Accent,
    "active" => Tone::Good,
    "cancelled" => Tone::Bad,
    "completed" => Tone::Muted,
    _ => Tone::Normal,
  }
}

fn actions(booking: &Booking) -> Vec<RowAction> {
  if booking.status.is_open() {
    vec![RowAction::Edit, RowAction::Cancel]
  } else {
    vec![RowAction::Edit]
  }
}

impl Resource for Booking {
  type Stats = BookingStats;

  const NAME: &'static str = "bookings";
  const STATS: &'static str = "booking-stats";
  const TITLE: &'static str = "Bookings";
  const EMPTY_MESSAGE: &'static str = "No bookings match the current filters.";

  fn columns() -> Vec<ColumnDescriptor<Self>> {
    vec![
      ColumnDescriptor::field("id", "ID", 10),
      ColumnDescriptor::field("user_id", "User", 10),
      ColumnDescriptor::field("vehicle_id", "Vehicle", 10),
      ColumnDescriptor::field("start_date", "Start", 10).with_render(CellRender::Date),
      ColumnDescriptor::field("end_date", "End", 10).with_render(CellRender::Date),
      ColumnDescriptor::field("status", "Status", 10).with_render(CellRender::Badge(booking_tone)),
      ColumnDescriptor::field("total_amount", "Amount", 10).with_render(CellRender::Money),
      ColumnDescriptor::field("notes", "Notes", 18).with_render(CellRender::Truncate(18)),
      ColumnDescriptor::actions(actions, 16),
    ]
  }

  fn filters() -> Vec<FilterField> {
    vec![
      FilterField::choice(
        "status",
        "Status",
        BookingStatus::ALL.iter().map(|s| s.as_str()).collect(),
      ),
      FilterField::text("user_id", "User"),
      FilterField::text("vehicle_id", "Vehicle"),
    ]
  }

  fn fetch_page(
    api: ApiClient,
    params: ListParams,
  ) -> BoxFuture<'static, Result<Page<Self>, ApiError>> {
    async move { api.list_bookings(&params).await }.boxed()
  }

  fn fetch_one(api: ApiClient, id: String) -> BoxFuture<'static, Result<Self, ApiError>> {
    async move { api.get_booking(&id).await }.boxed()
  }

  fn fetch_stats(api: ApiClient) -> BoxFuture<'static, Result<Self::Stats, ApiError>> {
    async move { api.booking_stats(None).await }.boxed()
  }

  fn stats_line(stats: &BookingStats) -> String {
    format!(
      "total {}  pending {}  active {}  completed {}  cancelled {}  revenue ${:.2}",
      stats.total, stats.pending, stats.active, stats.completed, stats.cancelled, stats.revenue
    )
  }

  fn row_actions(booking: &Self) -> Vec<RowAction> {
    actions(booking)
  }

  fn action_mutation(booking: &Self, action: RowAction) -> Option<Mutation> {
    match action {
      RowAction::Cancel if booking.status.is_open() => Some(Mutation::CancelBooking {
        id: booking.id.clone(),
      }),
      _ => None,
    }
  }

  fn edit_form(booking: &Self) -> Option<Vec<FormField>> {
    Some(vec![
      FormField::new(
        "start_date",
        "Start (YYYY-MM-DD)",
        booking.start_date.format("%Y-%m-%d").to_string(),
      ),
      FormField::new(
        "end_date",
        "End (YYYY-MM-DD)",
        booking.end_date.format("%Y-%m-%d").to_string(),
      ),
      FormField::new("status", "Status", booking.status.as_str()),
      FormField::new("notes", "Notes", booking.notes.clone().unwrap_or_default()),
    ])
  }

  fn build_edit(booking: &Self, values: &FormValues) -> Result<Mutation, String> {
    let start = parse_date(values, "start_date")?;
    let end = parse_date(values, "end_date")?;
    let status: BookingStatus = parse(values, "status")?;
    let notes = values
      .get("notes")
      .map(|n| n.trim().to_string())
      .unwrap_or_default();

    // Compare by day; the form only shows dates
    let same_day = |a: &chrono::DateTime<chrono::Utc>, b: &chrono::DateTime<chrono::Utc>| {
      a.date_naive() == b.date_naive()
    };
    let update = BookingUpdate {
      start_date: (!same_day(&start, &booking.start_date)).then_some(start),
      end_date: (!same_day(&end, &booking.end_date)).then_some(end),
      status: (status != booking.status).then_some(status),
      notes: (notes != booking.notes.clone().unwrap_or_default()).then_some(notes),
    };
    Ok(Mutation::UpdateBooking {
      id: booking.id.clone(),
      update,
    })
  }

  fn detail(booking: &Self) -> Vec<(&'static str, String)> {
    vec![
      ("ID", booking.id.clone()),
      ("User", booking.user_id.clone()),
      ("Vehicle", booking.vehicle_id.clone()),
      ("Start", booking.start_date.format("%Y-%m-%d").to_string()),
      ("End", booking.end_date.format("%Y-%m-%d").to_string()),
      ("Status", booking.status.to_string()),
      ("Amount", format!("${:.2}", booking.total_amount)),
      (
        "Notes",
        booking.notes.clone().unwrap_or_else(|| "-".to_string()),
      ),
      ("Created", booking.created_at.format("%Y-%m-%d %H:%M").to_string()),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};

  fn booking(status: BookingStatus) -> Booking {
    Booking {
      id: "bkg-0040".to_string(),
      user_id: "usr-0003".to_string(),
      vehicle_id: "veh-0015".to_string(),
      start_date: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
      end_date: Utc.with_ymd_and_hms(2024, 6, 4, 9, 0, 0).unwrap(),
      status,
      total_amount: 240.0,
      notes: None,
      created_at: Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap(),
    }
  }

  #[test]
  fn test_cancel_only_offered_while_open() {
    let open = booking(BookingStatus::Confirmed);
    assert_eq!(Booking::row_actions(&open), vec![RowAction::Edit, RowAction::Cancel]);
    assert!(Booking::action_mutation(&open, RowAction::Cancel).is_some());

    let done = booking(BookingStatus::Completed);
    assert_eq!(Booking::row_actions(&done), vec![RowAction::Edit]);
    assert_eq!(Booking::action_mutation(&done, RowAction::Cancel), None);
  }

  #[test]
  fn test_filters() {
    let filters = Booking::filters();
    assert_eq!(filters[0].name, "status");
    assert!(filters[0].is_choice());
    assert_eq!(filters[0].choices.len(), 5);
    assert!(!filters[1].is_choice());
  }

  #[test]
  fn test_edit_detects_date_and_status_changes() {
    let b = booking(BookingStatus::Pending);
    let mut values: FormValues = Booking::edit_form(&b)
      .unwrap()
      .into_iter()
      .map(|f| (f.name, f.value))
      .collect();

    let Mutation::UpdateBooking { update, .. } = Booking::build_edit(&b, &values).unwrap() else {
      panic!("expected an update");
    };
    assert_eq!(update, BookingUpdate::default());

    values.insert("end_date", "2024-06-06".to_string());
    values.insert("status", "confirmed".to_string());
    let Mutation::UpdateBooking { update, .. } = Booking::build_edit(&b, &values).unwrap() else {
      panic!("expected an update");
    };
    assert_eq!(
      update.end_date,
      Some(Utc.with_ymd_and_hms(2024, 6, 6, 0, 0, 0).unwrap())
    );
    assert_eq!(update.status, Some(BookingStatus::Confirmed));
    assert_eq!(update.start_date, None);
  }

  #[test]
  fn test_amount_and_dates_render() {
    let b = booking(BookingStatus::Active);
    let cells: Vec<String> = Booking::columns().iter().map(|c| c.cell(&b).text).collect();
    assert_eq!(cells[3], "2024-06-01");
    assert_eq!(cells[6], "$240.00");
    assert_eq!(cells[7], "-");
  }
}
