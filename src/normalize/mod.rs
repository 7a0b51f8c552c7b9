//! Pure cleaners for the free-text `name`, `phone` and `notes` columns.
//!
//! Nothing in here touches the store; the repair jobs decide what to write.

pub mod companion;
pub mod notes;
pub mod phone;
pub mod suffix;

pub use companion::{format_companion_note, parse_companion_annotation, Companion, ParsedName};
pub use notes::append_note;
pub use phone::{is_canonical, normalize_phone, strip_phone_formatting};
pub use suffix::{remove_as_marker, remove_visit_suffix, AsCleaned};
