//! Cross-cutting helpers shared by the library and binary crates:
//! logging initialization and progress-bar construction.

pub mod logger;
pub mod progress;

pub use logger::init_logger;
pub use progress::{spinner, topic_bar};
