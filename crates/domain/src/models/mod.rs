//! Domain models for the game night club.

pub mod game_mode;
pub mod invitation;
pub mod occupancy;
pub mod profile;
pub mod reservation;
pub mod schedule;
pub mod table;

pub use game_mode::GameMode;
pub use invitation::{Invitation, InvitationStatus};
pub use occupancy::{OccupancyCache, OccupancySnapshot, TableOccupancy};
pub use profile::{Profile, Role, Session};
pub use reservation::Reservation;
pub use schedule::{GameNight, GameNightSchedule, TimeRange};
pub use table::TableId;
