use chrono::{DateTime, Utc};
use std::fmt;

/// A raw field value pulled out of a row by name.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  Text(String),
  Int(i64),
  Float(f64),
  Bool(bool),
  DateTime(DateTime<Utc>),
}

impl fmt::Display for FieldValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FieldValue::Text(s) => f.write_str(s),
      FieldValue::Int(n) => write!(f, "{}", n),
      FieldValue::Float(n) => write!(f, "{}", n),
      FieldValue::Bool(b) => write!(f, "{}", b),
      FieldValue::DateTime(t) => write!(f, "{}", t.to_rfc3339()),
    }
  }
}

impl From<&str> for FieldValue {
  fn from(value: &str) -> Self {
    FieldValue::Text(value.to_string())
  }
}

impl From<String> for FieldValue {
  fn from(value: String) -> Self {
    FieldValue::Text(value)
  }
}

impl From<i64> for FieldValue {
  fn from(value: i64) -> Self {
    FieldValue::Int(value)
  }
}

impl From<f64> for FieldValue {
  fn from(value: f64) -> Self {
    FieldValue::Float(value)
  }
}

impl From<bool> for FieldValue {
  fn from(value: bool) -> Self {
    FieldValue::Bool(value)
  }
}

impl From<DateTime<Utc>> for FieldValue {
  fn from(value: DateTime<Utc>) -> Self {
    FieldValue::DateTime(value)
  }
}

/// A record the table can display.
///
/// The table only ever asks for the fields its columns name.
pub trait Row {
  /// Value of the named field, `None` when the row has no such field or it is unset
  fn field(&self, key: &str) -> Option<FieldValue>;

  /// Stable identity of the row (the entity id)
  fn row_key(&self) -> String;
}

/// What a column reads from the row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKey {
  Field(&'static str),
  /// Not a field: per-row action hints
  Actions,
}

/// Visual emphasis of a cell, mapped to colors by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
  #[default]
  Normal,
  Muted,
  Accent,
  Good,
  Warning,
  Bad,
}

/// One displayable table cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
  pub text: String,
  pub tone: Tone,
}

impl Cell {
  pub fn new(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      tone: Tone::Normal,
    }
  }

  pub fn toned(text: impl Into<String>, tone: Tone) -> Self {
    Self {
      text: text.into(),
      tone,
    }
  }

  /// Placeholder for an absent value
  pub fn dash() -> Self {
    Self::toned("-", Tone::Muted)
  }
}

/// Action available on a row, shown in the actions column and bound to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
  Edit,
  Delete,
  ChangeStatus,
  Cancel,
  MarkRead,
}

impl RowAction {
  pub fn key(&self) -> char {
    match self {
      RowAction::Edit => 'e',
      RowAction::Delete => 'd',
      RowAction::ChangeStatus => 's',
      RowAction::Cancel => 'c',
      RowAction::MarkRead => 'm',
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      RowAction::Edit => "edit",
      RowAction::Delete => "delete",
      RowAction::ChangeStatus => "status",
      RowAction::Cancel => "cancel",
      RowAction::MarkRead => "read",
    }
  }
}

/// How a column turns `(field value, row)` into a cell.
///
/// Columns without one show the raw value as text.
pub enum CellRender<R> {
  /// Raw value as text, cut to the given width
  Truncate(usize),
  /// Amount with two decimals and a currency sign
  Money,
  /// `YYYY-MM-DD`
  Date,
  /// `YYYY-MM-DD HH:MM`
  DateTime,
  YesNo,
  /// Text colored by value
  Badge(fn(&str) -> Tone),
  /// Action hints for the row
  Actions(fn(&R) -> Vec<RowAction>),
  /// Anything else
  Custom(fn(Option<&FieldValue>, &R) -> Cell),
}

// Manual impls: the variants hold fn pointers, R itself need not be Clone.
impl<R> Clone for CellRender<R> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<R> Copy for CellRender<R> {}

impl<R> fmt::Debug for CellRender<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      CellRender::Truncate(_) => "Truncate",
      CellRender::Money => "Money",
      CellRender::Date => "Date",
      CellRender::DateTime => "DateTime",
      CellRender::YesNo => "YesNo",
      CellRender::Badge(_) => "Badge",
      CellRender::Actions(_) => "Actions",
      CellRender::Custom(_) => "Custom",
    };
    f.write_str(name)
  }
}

impl<R> CellRender<R> {
  pub fn apply(&self, value: Option<&FieldValue>, row: &R) -> Cell {
    match self {
      CellRender::Actions(actions) => {
        let hints: Vec<String> = actions(row)
          .iter()
          .map(|a| format!("{}:{}", a.key(), a.label()))
          .collect();
        if hints.is_empty() {
          Cell::dash()
        } else {
          Cell::toned(hints.join(" "), Tone::Muted)
        }
      }
      CellRender::Custom(render) => render(value, row),
      _ => match value {
        Some(value) => self.format_value(value),
        None => Cell::dash(),
      },
    }
  }

  fn format_value(&self, value: &FieldValue) -> Cell {
    match (self, value) {
      (CellRender::Truncate(width), v) => Cell::new(truncate(&v.to_string(), *width)),
      (CellRender::Money, FieldValue::Float(n)) => Cell::new(format!("${:.2}", n)),
      (CellRender::Money, FieldValue::Int(n)) => Cell::new(format!("${}.00", n)),
      (CellRender::Date, FieldValue::DateTime(t)) => Cell::new(t.format("%Y-%m-%d").to_string()),
      (CellRender::DateTime, FieldValue::DateTime(t)) => {
        Cell::new(t.format("%Y-%m-%d %H:%M").to_string())
      }
      (CellRender::YesNo, FieldValue::Bool(b)) => {
        if *b {
          Cell::toned("yes", Tone::Good)
        } else {
          Cell::toned("no", Tone::Muted)
        }
      }
      (CellRender::Badge(tone), v) => {
        let text = v.to_string();
        let tone = tone(&text);
        Cell::toned(text, tone)
      }
      (_, v) => Cell::new(v.to_string()),
    }
  }
}

/// Cut `s` to `max_len` characters, ending in "..." when shortened.
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Static configuration of one table column.
pub struct ColumnDescriptor<R> {
  pub key: ColumnKey,
  pub header: &'static str,
  pub render: Option<CellRender<R>>,
  /// Preferred width in terminal cells
  pub width: u16,
}

impl<R> Clone for ColumnDescriptor<R> {
  fn clone(&self) -> Self {
    Self {
      key: self.key,
      header: self.header,
      render: self.render,
      width: self.width,
    }
  }
}

impl<R> fmt::Debug for ColumnDescriptor<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ColumnDescriptor")
      .field("key", &self.key)
      .field("header", &self.header)
      .field("render", &self.render)
      .field("width", &self.width)
      .finish()
  }
}

impl<R> ColumnDescriptor<R> {
  /// Column showing a field with the default rendering.
  pub fn field(key: &'static str, header: &'static str, width: u16) -> Self {
    Self {
      key: ColumnKey::Field(key),
      header,
      render: None,
      width,
    }
  }

  /// The per-row actions column.
  pub fn actions(actions: fn(&R) -> Vec<RowAction>, width: u16) -> Self {
    Self {
      key: ColumnKey::Actions,
      header: "Actions",
      render: Some(CellRender::Actions(actions)),
      width,
    }
  }

  pub fn with_render(mut self, render: CellRender<R>) -> Self {
    self.render = Some(render);
    self
  }

  /// Cell for `row` in this column.
  pub fn cell(&self, row: &R) -> Cell
  where
    R: Row,
  {
    let value = match self.key {
      ColumnKey::Field(name) => row.field(name),
      ColumnKey::Actions => None,
    };
    match &self.render {
      Some(render) => render.apply(value.as_ref(), row),
      None => value.map(|v| Cell::new(v.to_string())).unwrap_or_else(Cell::dash),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  struct Car {
    id: &'static str,
    plate: Option<&'static str>,
    rate: f64,
    rented: bool,
  }

  impl Row for Car {
    fn field(&self, key: &str) -> Option<FieldValue> {
      match key {
        "plate" => self.plate.map(FieldValue::from),
        "rate" => Some(self.rate.into()),
        "rented" => Some(self.rented.into()),
        _ => None,
      }
    }

    fn row_key(&self) -> String {
      self.id.to_string()
    }
  }

  fn car() -> Car {
    Car {
      id: "veh-1",
      plate: Some("AA-00-BB"),
      rate: 42.5,
      rented: false,
    }
  }

  #[test]
  fn test_default_render_is_raw_value() {
    let column = ColumnDescriptor::<Car>::field("plate", "Plate", 10);
    assert_eq!(column.cell(&car()).text, "AA-00-BB");
  }

  #[test]
  fn test_absent_field_is_dash() {
    let column = ColumnDescriptor::<Car>::field("plate", "Plate", 10);
    let no_plate = Car {
      plate: None,
      ..car()
    };
    assert_eq!(column.cell(&no_plate), Cell::dash());

    let unknown =
      ColumnDescriptor::<Car>::field("color", "Color", 10).with_render(CellRender::Money);
    assert_eq!(unknown.cell(&car()).text, "-");
  }

  #[test]
  fn test_money_and_yes_no() {
    let rate = ColumnDescriptor::<Car>::field("rate", "Rate", 8).with_render(CellRender::Money);
    assert_eq!(rate.cell(&car()).text, "$42.50");

    let rented =
      ColumnDescriptor::<Car>::field("rented", "Rented", 6).with_render(CellRender::YesNo);
    assert_eq!(rented.cell(&car()), Cell::toned("no", Tone::Muted));
  }

  #[test]
  fn test_badge_uses_tone_fn() {
    fn tone(value: &str) -> Tone {
      if value.starts_with("AA") {
        Tone::Accent
      } else {
        Tone::Normal
      }
    }
    let column =
      ColumnDescriptor::<Car>::field("plate", "Plate", 10).with_render(CellRender::Badge(tone));
    assert_eq!(column.cell(&car()).tone, Tone::Accent);
  }

  #[test]
  fn test_actions_column_reads_row() {
    fn actions(car: &Car) -> Vec<RowAction> {
      if car.rented {
        vec![RowAction::Edit]
      } else {
        vec![RowAction::Edit, RowAction::Delete]
      }
    }
    let column = ColumnDescriptor::<Car>::actions(actions, 16);
    assert_eq!(column.key, ColumnKey::Actions);
    assert_eq!(column.cell(&car()).text, "e:edit d:delete");
  }

  #[test]
  fn test_custom_receives_value_and_row() {
    fn plate_with_id(value: Option<&FieldValue>, car: &Car) -> Cell {
      Cell::new(format!("{}/{}", car.id, value.map(|v| v.to_string()).unwrap_or_default()))
    }
    let column = ColumnDescriptor::<Car>::field("plate", "Plate", 10)
      .with_render(CellRender::Custom(plate_with_id));
    assert_eq!(column.cell(&car()).text, "veh-1/AA-00-BB");
  }

  #[test]
  fn test_date_formats() {
    let t = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
    let value = FieldValue::DateTime(t);
    let date: CellRender<Car> = CellRender::Date;
    let datetime: CellRender<Car> = CellRender::DateTime;
    assert_eq!(date.apply(Some(&value), &car()).text, "2024-03-09");
    assert_eq!(datetime.apply(Some(&value), &car()).text, "2024-03-09 14:05");
  }

  #[test]
  fn test_truncate() {
    assert_eq!(truncate("hello", 10), "hello");
    assert_eq!(truncate("hello", 5), "hello");
    assert_eq!(truncate("hello world", 8), "hello...");
    assert_eq!(truncate("çàéèüö", 5), "çà...");
  }
}
