//! Thread persistence.

mod sqlite;

pub use sqlite::{ThreadInfo, ThreadStore};
