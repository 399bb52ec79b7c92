pub mod format;

pub use format::{format_duration_months, format_inr, format_inr_compact, format_percentage};
