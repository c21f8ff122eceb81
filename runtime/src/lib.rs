//! Harvests community-college course articulations from the ASSIST API and
//! aggregates them into a map keyed by target course.
//!
//! The flow is: load [`config::InitialData`], fetch the sending-institution
//! directory, run one articulation fetch per department concurrently
//! ([`harvest::pipeline::HarvestPipeline`]), merge the partial maps, and write
//! the result with [`persist::write_transfers`].

pub mod acquisition;
pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod harvest;
pub mod model;
pub mod persist;
