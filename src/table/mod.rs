//! Generic table: column descriptors plus a renderer that knows nothing
//! about the row type beyond the fields its columns name.

mod column;
mod render;

pub use column::{
  truncate, Cell, CellRender, ColumnDescriptor, ColumnKey, FieldValue, Row, RowAction, Tone,
};
pub use render::{render_table, TablePresentation};
