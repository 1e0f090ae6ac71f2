//! Pure planning for masking jobs: splitting a range into windows and rendering one
//! update statement per (table, window) pair. Nothing here performs I/O.

pub mod interval;
pub mod statement;

pub use interval::plan;
pub use statement::{build, statements};
