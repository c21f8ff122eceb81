//! Remote data acquisition: HTTP client, institution directory, and
//! articulation agreements.

pub mod articulation;
pub mod directory;
pub mod http_client;
pub mod payload;
