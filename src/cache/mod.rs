//! In-memory query cache shared by every dashboard view.
//!
//! Results are keyed by resource, filters, page and page size. Mutations
//! invalidate by resource prefix so every view of that resource refetches.

mod entry;
mod key;
mod store;

pub use entry::Snapshot;
pub use key::{FilterSnapshot, QueryKey};
pub use store::{Observer, QueryCache};
