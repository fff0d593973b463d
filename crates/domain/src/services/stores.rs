//! Storage seams for reservations, invitations and profiles.
//!
//! The booking services only talk to these traits. `persistence` provides
//! the PostgreSQL implementations; [`InMemoryStore`] backs tests and the
//! in-memory development mode.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::invitation::NewInvitation;
use crate::models::reservation::{NewReservation, OccupantRow};
use crate::models::{
    GameMode, Invitation, InvitationStatus, Profile, Reservation, Role, TableId, TimeRange,
};

/// Constraints a store must re-check atomically with a seat insert.
///
/// All rows whose start falls inside `occupancy_range` belong to the same
/// night: the new seat is rejected if the user already sits anywhere in
/// that range, if the table is locked to another mode, or if the table's
/// effective capacity is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatGuard {
    pub occupancy_range: TimeRange,
}

impl SeatGuard {
    pub fn new(occupancy_range: TimeRange) -> Self {
        Self { occupancy_range }
    }

    /// Decides whether one more seat fits, given the rows already at the
    /// table (oldest first) and whether the user is seated elsewhere.
    pub fn check(
        &self,
        table_modes: &[GameMode],
        user_already_seated: bool,
        requested: GameMode,
    ) -> Result<(), StoreError> {
        let locked = table_modes.first().copied();
        if let Some(locked) = locked {
            if locked != requested {
                return Err(StoreError::ModeConflict { locked });
            }
        }
        if user_already_seated {
            return Err(StoreError::AlreadySeated);
        }
        if table_modes.len() >= locked.unwrap_or(requested).capacity() {
            return Err(StoreError::CapacityExceeded);
        }
        Ok(())
    }
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Inserts a seat after re-checking the guard atomically.
    async fn insert_guarded(
        &self,
        new: NewReservation,
        guard: SeatGuard,
    ) -> Result<Reservation, StoreError>;

    /// Deletes the user's seat at a table within a range. Returns rows removed.
    async fn delete_for_user(
        &self,
        table_id: TableId,
        user_id: Uuid,
        range: TimeRange,
    ) -> Result<u64, StoreError>;

    /// All seats starting within the range, with occupant names, oldest first.
    async fn list_in_range(&self, range: TimeRange) -> Result<Vec<OccupantRow>, StoreError>;

    async fn find_for_user(
        &self,
        user_id: Uuid,
        range: TimeRange,
    ) -> Result<Option<Reservation>, StoreError>;

    async fn find_at_table(
        &self,
        table_id: TableId,
        user_id: Uuid,
        range: TimeRange,
    ) -> Result<Option<Reservation>, StoreError>;
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    async fn insert(&self, new: NewInvitation) -> Result<Invitation, StoreError>;

    async fn find_by_token_hash(&self, token_hash: &str)
        -> Result<Option<Invitation>, StoreError>;

    /// Moves an invitation from `expected` to `new`, only if it is still in
    /// `expected` and addressed to `invitee_id`. Returns false when nothing
    /// matched.
    async fn transition(
        &self,
        id: Uuid,
        invitee_id: Uuid,
        expected: InvitationStatus,
        new: InvitationStatus,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;

    /// Returns the profile, creating a guest profile if none exists yet.
    async fn ensure(&self, id: Uuid) -> Result<Profile, StoreError>;

    async fn update_role(&self, id: Uuid, role: Role) -> Result<bool, StoreError>;

    /// Fails with `StoreError::Conflict` when the name is taken
    /// (case-insensitive).
    async fn update_username(&self, id: Uuid, username: &str) -> Result<bool, StoreError>;

    /// Case-insensitive substring search on usernames.
    async fn search(
        &self,
        query: &str,
        exclude: Uuid,
        limit: usize,
    ) -> Result<Vec<Profile>, StoreError>;
}

#[derive(Debug, Default)]
struct Inner {
    reservations: Vec<Reservation>,
    invitations: Vec<Invitation>,
    profiles: HashMap<Uuid, Profile>,
    #[cfg(any(test, feature = "test-util"))]
    failing_users: std::collections::HashSet<Uuid>,
}

/// All three stores in one process-local structure.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_profile(&self, id: Uuid, username: Option<&str>, role: Role) -> Profile {
        let profile = Profile {
            id,
            username: username.map(str::to_string),
            role,
            created_at: Utc::now(),
        };
        self.inner.lock().await.profiles.insert(id, profile.clone());
        profile
    }

    /// Makes every later seat insert for `user_id` fail with a backend error.
    #[cfg(any(test, feature = "test-util"))]
    pub async fn fail_inserts_for(&self, user_id: Uuid) {
        self.inner.lock().await.failing_users.insert(user_id);
    }

    pub async fn reservations(&self) -> Vec<Reservation> {
        self.inner.lock().await.reservations.clone()
    }

    pub async fn invitations(&self) -> Vec<Invitation> {
        self.inner.lock().await.invitations.clone()
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn insert_guarded(
        &self,
        new: NewReservation,
        guard: SeatGuard,
    ) -> Result<Reservation, StoreError> {
        let mut inner = self.inner.lock().await;

        #[cfg(any(test, feature = "test-util"))]
        if inner.failing_users.contains(&new.user_id) {
            return Err(StoreError::Backend("insert rejected".to_string()));
        }

        let range = guard.occupancy_range;
        let in_range = inner
            .reservations
            .iter()
            .filter(|r| range.contains(r.starts_at));

        let mut table_modes = Vec::new();
        let mut seated = false;
        for r in in_range {
            if r.user_id == new.user_id {
                seated = true;
            }
            if r.table_id == new.table_id {
                table_modes.push(r.game_mode);
            }
        }
        guard.check(&table_modes, seated, new.game_mode)?;

        let reservation = Reservation {
            id: Uuid::new_v4(),
            table_id: new.table_id,
            user_id: new.user_id,
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            game_mode: new.game_mode,
            created_at: Utc::now(),
        };
        inner.reservations.push(reservation.clone());
        Ok(reservation)
    }

    async fn delete_for_user(
        &self,
        table_id: TableId,
        user_id: Uuid,
        range: TimeRange,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.reservations.len();
        inner.reservations.retain(|r| {
            !(r.table_id == table_id && r.user_id == user_id && range.contains(r.starts_at))
        });
        Ok((before - inner.reservations.len()) as u64)
    }

    async fn list_in_range(&self, range: TimeRange) -> Result<Vec<OccupantRow>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .reservations
            .iter()
            .filter(|r| range.contains(r.starts_at))
            .map(|r| OccupantRow {
                table_id: r.table_id,
                user_id: r.user_id,
                game_mode: r.game_mode,
                username: inner
                    .profiles
                    .get(&r.user_id)
                    .and_then(|p| p.username.clone()),
                created_at: r.created_at,
            })
            .collect())
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        range: TimeRange,
    ) -> Result<Option<Reservation>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .reservations
            .iter()
            .find(|r| r.user_id == user_id && range.contains(r.starts_at))
            .cloned())
    }

    async fn find_at_table(
        &self,
        table_id: TableId,
        user_id: Uuid,
        range: TimeRange,
    ) -> Result<Option<Reservation>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .reservations
            .iter()
            .find(|r| r.table_id == table_id && r.user_id == user_id && range.contains(r.starts_at))
            .cloned())
    }
}

#[async_trait]
impl InvitationStore for InMemoryStore {
    async fn insert(&self, new: NewInvitation) -> Result<Invitation, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner
            .invitations
            .iter()
            .any(|i| i.token_hash == new.token_hash)
        {
            return Err(StoreError::Conflict("token already in use".to_string()));
        }

        let invitation = Invitation {
            id: Uuid::new_v4(),
            inviter_id: new.inviter_id,
            invitee_id: new.invitee_id,
            table_id: new.table_id,
            game_date: new.game_date,
            status: InvitationStatus::Pending,
            token_hash: new.token_hash,
            created_at: new.created_at,
        };
        inner.invitations.push(invitation.clone());
        Ok(invitation)
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Invitation>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .invitations
            .iter()
            .find(|i| i.token_hash == token_hash)
            .cloned())
    }

    async fn transition(
        &self,
        id: Uuid,
        invitee_id: Uuid,
        expected: InvitationStatus,
        new: InvitationStatus,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner
            .invitations
            .iter_mut()
            .find(|i| i.id == id && i.invitee_id == invitee_id && i.status == expected)
        {
            Some(invitation) => {
                invitation.status = new;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn find(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.inner.lock().await.profiles.get(&id).cloned())
    }

    async fn ensure(&self, id: Uuid) -> Result<Profile, StoreError> {
        let mut inner = self.inner.lock().await;
        let profile = inner.profiles.entry(id).or_insert_with(|| Profile {
            id,
            username: None,
            role: Role::Guest,
            created_at: Utc::now(),
        });
        Ok(profile.clone())
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.profiles.get_mut(&id) {
            Some(profile) => {
                profile.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_username(&self, id: Uuid, username: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let taken = inner.profiles.values().any(|p| {
            p.id != id
                && p.username
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(username))
        });
        if taken {
            return Err(StoreError::Conflict("username already taken".to_string()));
        }

        match inner.profiles.get_mut(&id) {
            Some(profile) => {
                profile.username = Some(username.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn search(
        &self,
        query: &str,
        exclude: Uuid,
        limit: usize,
    ) -> Result<Vec<Profile>, StoreError> {
        let needle = query.to_lowercase();
        let inner = self.inner.lock().await;
        let mut matches: Vec<Profile> = inner
            .profiles
            .values()
            .filter(|p| p.id != exclude)
            .filter(|p| {
                p.username
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.username.cmp(&b.username));
        matches.truncate(limit);
        Ok(matches)
    }
}
