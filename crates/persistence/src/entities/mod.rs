//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod invitation;
pub mod profile;
pub mod reservation;

pub use invitation::{InvitationEntity, InvitationStatusDb};
pub use profile::{ProfileEntity, RoleDb};
pub use reservation::{GameModeDb, OccupantEntity, ReservationEntity};
