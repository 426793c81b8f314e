use super::column::{Cell, ColumnDescriptor, Row};

/// One row of a populated table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
  /// Position in the page
  pub index: usize,
  /// Entity id of the row
  pub key: String,
  pub cells: Vec<Cell>,
}

/// What the table shows for a given input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TablePresentation {
  Loading,
  Empty(String),
  Rows {
    headers: Vec<&'static str>,
    widths: Vec<u16>,
    rows: Vec<RenderedRow>,
  },
}

impl TablePresentation {
  pub fn row_count(&self) -> usize {
    match self {
      TablePresentation::Rows { rows, .. } => rows.len(),
      _ => 0,
    }
  }

  /// Position of the row with entity id `key`
  pub fn position_of(&self, key: &str) -> Option<usize> {
    match self {
      TablePresentation::Rows { rows, .. } => rows.iter().position(|r| r.key == key),
      _ => None,
    }
  }

  /// Entity id of the row at position `index`
  pub fn key_at(&self, index: usize) -> Option<&str> {
    match self {
      TablePresentation::Rows { rows, .. } => rows
        .iter()
        .find(|r| r.index == index)
        .map(|r| r.key.as_str()),
      _ => None,
    }
  }
}

/// Lay out `rows` through `columns`.
///
/// Loading wins over everything, then the empty message, then one rendered
/// row per input row with one cell per column.
pub fn render_table<R: Row>(
  rows: &[R],
  columns: &[ColumnDescriptor<R>],
  loading: bool,
  empty_message: &str,
) -> TablePresentation {
  if loading {
    return TablePresentation::Loading;
  }
  if rows.is_empty() {
    return TablePresentation::Empty(empty_message.to_string());
  }

  let rendered = rows
    .iter()
    .enumerate()
    .map(|(index, row)| RenderedRow {
      index,
      key: row.row_key(),
      cells: columns.iter().map(|column| column.cell(row)).collect(),
    })
    .collect();

  TablePresentation::Rows {
    headers: columns.iter().map(|c| c.header).collect(),
    widths: columns.iter().map(|c| c.width).collect(),
    rows: rendered,
  }
}
