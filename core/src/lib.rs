//! Household relocation core.
//!
//! Year by year, decides whether and where households move within a
//! region, injects and removes migrants to meet population targets, and
//! counts every demand the housing market failed to satisfy.

pub mod config;
pub mod development;
pub mod employment;
pub mod engine;
pub mod error;
pub mod event;
pub mod fixtures;
pub mod handler;
pub mod issues;
pub mod migration;
pub mod model;
pub mod relocation;
pub mod repository;
pub mod rng;
pub mod rules;
pub mod scheduler;
pub mod selection;
pub mod store;
pub mod travel;
pub mod types;
pub mod utility;

pub use engine::{RelocationEngine, YearReport};
pub use error::{SimError, SimResult};
