pub mod harness;
pub mod json_compact;

pub use harness::{HarnessDocument, HarnessFormatter};
pub use json_compact::JsonCompactFormatter;
