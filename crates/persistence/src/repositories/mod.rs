//! Repository implementations of the domain store traits.

pub mod invitation;
pub mod profile;
pub mod reservation;

pub use invitation::InvitationRepository;
pub use profile::ProfileRepository;
pub use reservation::ReservationRepository;
