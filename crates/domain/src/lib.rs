//! Domain layer for the game night table booking backend.
//!
//! This crate contains:
//! - Domain models (game modes, tables, game night schedule, reservations,
//!   invitations, profiles, occupancy)
//! - Store traits and an in-memory implementation
//! - The reservation allocator, invitation workflow and role policy
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::{BookingError, StoreError};
