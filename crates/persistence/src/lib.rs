//! Persistence layer for the game night booking backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - PostgreSQL implementations of the domain store traits
//! - SQL migrations (`src/migrations`)

pub mod db;
pub mod entities;
mod error;
pub mod metrics;
pub mod repositories;

pub use repositories::{InvitationRepository, ProfileRepository, ReservationRepository};
