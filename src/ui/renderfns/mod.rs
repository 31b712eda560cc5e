mod footer;
mod header;
mod utils;

pub use footer::draw_footer;
pub use header::draw_header;
pub use utils::{format_amount, format_date, format_trend, status_color, truncate};
