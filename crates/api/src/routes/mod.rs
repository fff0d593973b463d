//! HTTP route handlers.

pub mod game_night;
pub mod health;
pub mod invitations;
pub mod profiles;
pub mod reservations;
