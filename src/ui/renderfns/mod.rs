pub mod filter_bar;
pub mod footer;
pub mod header;
pub mod table;
pub mod utils;

pub use filter_bar::draw_filter_bar;
pub use footer::draw_footer;
pub use header::draw_header;
pub use table::draw_table;
pub use utils::state_suffix;
