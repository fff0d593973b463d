//! Domain services for the game night club.
//!
//! Services hold the booking rules and talk to storage only through the
//! traits in [`stores`].

pub mod allocator;
pub mod change_feed;
pub mod club_state;
pub mod clock;
pub mod invitation;
pub mod profiles;
pub mod stores;

pub use allocator::ReservationAllocator;
pub use change_feed::{ChangeFeed, ChangeKind, ReservationChanged};
pub use club_state::ClubState;
pub use clock::{Clock, FixedClock, SystemClock};
pub use invitation::{InvitationSettings, InvitationWorkflow};
pub use profiles::{ProfileService, RolePolicy};
pub use stores::{InMemoryStore, InvitationStore, ProfileStore, ReservationStore, SeatGuard};
