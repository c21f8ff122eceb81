//! Append-only record of completed runs.

pub mod logger;
