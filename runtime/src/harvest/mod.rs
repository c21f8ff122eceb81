//! Concurrent harvest of every configured department.

pub mod pipeline;
pub mod rate_limiter;
