//! Profile management: role changes, member search and renames.

use std::sync::Arc;
use uuid::Uuid;

use shared::validation::{normalize_search_query, validate_username};

use crate::error::BookingError;
use crate::models::profile::ProfileSummary;
use crate::models::{GameNightSchedule, Profile, Role, Session};
use crate::services::clock::Clock;
use crate::services::stores::{ProfileStore, ReservationStore};

/// Maximum number of profiles returned by a member search.
pub const SEARCH_LIMIT: usize = 5;

/// Who may change whose role.
///
/// The owner may do anything. Admins may promote guests to members and
/// back, but may neither grant admin nor touch an existing admin.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePolicy {
    owner_id: Option<Uuid>,
}

impl RolePolicy {
    pub fn new(owner_id: Option<Uuid>) -> Self {
        Self { owner_id }
    }

    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_id == Some(user_id)
    }

    pub fn check_change(
        &self,
        actor: &Profile,
        target: &Profile,
        new_role: Role,
    ) -> Result<(), BookingError> {
        if self.is_owner(actor.id) {
            return Ok(());
        }
        if !actor.role.is_admin() {
            return Err(BookingError::Forbidden);
        }
        if new_role.is_admin() || target.role.is_admin() || self.is_owner(target.id) {
            return Err(BookingError::Forbidden);
        }
        Ok(())
    }
}

pub struct ProfileService {
    profiles: Arc<dyn ProfileStore>,
    reservations: Arc<dyn ReservationStore>,
    clock: Arc<dyn Clock>,
    schedule: GameNightSchedule,
    policy: RolePolicy,
}

impl ProfileService {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        reservations: Arc<dyn ReservationStore>,
        clock: Arc<dyn Clock>,
        schedule: GameNightSchedule,
        policy: RolePolicy,
    ) -> Self {
        Self {
            profiles,
            reservations,
            clock,
            schedule,
            policy,
        }
    }

    pub fn policy(&self) -> &RolePolicy {
        &self.policy
    }

    /// The caller's profile, created as a guest on first sight.
    pub async fn me(&self, session: Option<&Session>) -> Result<Profile, BookingError> {
        let session = session.ok_or(BookingError::Unauthenticated)?;
        Ok(self.profiles.ensure(session.user_id).await?)
    }

    pub async fn change_role(
        &self,
        session: Option<&Session>,
        target_id: Uuid,
        new_role: Role,
    ) -> Result<Profile, BookingError> {
        let session = session.ok_or(BookingError::Unauthenticated)?;
        let actor = self.profiles.ensure(session.user_id).await?;
        let mut target = self
            .profiles
            .find(target_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Profile"))?;

        if let Err(err) = self.policy.check_change(&actor, &target, new_role) {
            tracing::warn!(
                actor_id = %actor.id,
                target_id = %target_id,
                role = %new_role,
                "Role change refused"
            );
            return Err(err);
        }

        if !self.profiles.update_role(target_id, new_role).await? {
            return Err(BookingError::not_found("Profile"));
        }

        tracing::info!(
            actor_id = %actor.id,
            target_id = %target_id,
            from = %target.role,
            to = %new_role,
            "Role changed"
        );
        target.role = new_role;
        Ok(target)
    }

    /// Case-insensitive username search for partner and invitee pickers.
    /// Each hit carries the table the member already sits at tonight.
    pub async fn search_members(
        &self,
        session: Option<&Session>,
        query: &str,
    ) -> Result<Vec<ProfileSummary>, BookingError> {
        let session = session.ok_or(BookingError::Unauthenticated)?;
        let Some(query) = normalize_search_query(query) else {
            return Ok(Vec::new());
        };

        let profiles = self
            .profiles
            .search(&query, session.user_id, SEARCH_LIMIT)
            .await?;

        let night = self.schedule.next_game_night(self.clock.now());
        let range = self.schedule.occupancy_range(&night);
        let mut results = Vec::with_capacity(profiles.len());
        for profile in profiles {
            let seat = self.reservations.find_for_user(profile.id, range).await?;
            let mut summary = ProfileSummary::from(profile);
            summary.seated_at = seat.map(|r| r.table_id.get());
            results.push(summary);
        }
        Ok(results)
    }

    pub async fn rename(
        &self,
        session: Option<&Session>,
        username: &str,
    ) -> Result<Profile, BookingError> {
        let session = session.ok_or(BookingError::Unauthenticated)?;
        let username = username.trim();
        validate_username(username).map_err(|e| {
            BookingError::Validation(
                e.message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Invalid username".to_string()),
            )
        })?;

        let mut profile = self.profiles.ensure(session.user_id).await?;
        self.profiles
            .update_username(session.user_id, username)
            .await?;

        tracing::info!(user_id = %session.user_id, "Username changed");
        profile.username = Some(username.to_string());
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::models::reservation::NewReservation;
    use crate::models::{GameMode, TableId};
    use crate::services::clock::FixedClock;
    use crate::services::stores::{InMemoryStore, SeatGuard};

    struct Fixture {
        store: Arc<InMemoryStore>,
        service: ProfileService,
        owner: Session,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let owner = Uuid::new_v4();
        store.insert_profile(owner, Some("warboss"), Role::Admin).await;
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 10, 12, 10, 0, 0).unwrap(),
        ));
        let service = ProfileService::new(
            store.clone(),
            store.clone(),
            clock,
            GameNightSchedule::default(),
            RolePolicy::new(Some(owner)),
        );
        Fixture {
            store,
            service,
            owner: Session::new(owner),
        }
    }

    async fn profile(f: &Fixture, name: &str, role: Role) -> Session {
        let id = Uuid::new_v4();
        f.store.insert_profile(id, Some(name), role).await;
        Session::new(id)
    }

    #[tokio::test]
    async fn test_admin_cannot_grant_admin() {
        let f = fixture().await;
        let admin = profile(&f, "admin", Role::Admin).await;
        let user = profile(&f, "user", Role::Member).await;

        assert_eq!(
            f.service
                .change_role(Some(&admin), user.user_id, Role::Admin)
                .await
                .unwrap_err(),
            BookingError::Forbidden
        );
        let unchanged = f.store.find(user.user_id).await.unwrap().unwrap();
        assert_eq!(unchanged.role, Role::Member);
    }

    #[tokio::test]
    async fn test_admin_can_promote_guest() {
        let f = fixture().await;
        let admin = profile(&f, "admin", Role::Admin).await;
        let guest = profile(&f, "newbie", Role::Guest).await;

        let updated = f
            .service
            .change_role(Some(&admin), guest.user_id, Role::Member)
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Member);
    }

    #[tokio::test]
    async fn test_admin_cannot_demote_admin() {
        let f = fixture().await;
        let admin = profile(&f, "admin", Role::Admin).await;
        let other = profile(&f, "other", Role::Admin).await;

        assert_eq!(
            f.service
                .change_role(Some(&admin), other.user_id, Role::Member)
                .await
                .unwrap_err(),
            BookingError::Forbidden
        );
        assert_eq!(
            f.service
                .change_role(Some(&admin), f.owner.user_id, Role::Guest)
                .await
                .unwrap_err(),
            BookingError::Forbidden
        );
    }

    #[tokio::test]
    async fn test_owner_can_do_anything() {
        let f = fixture().await;
        let admin = profile(&f, "admin", Role::Admin).await;
        let user = profile(&f, "user", Role::Member).await;

        assert!(f
            .service
            .change_role(Some(&f.owner), user.user_id, Role::Admin)
            .await
            .is_ok());
        assert!(f
            .service
            .change_role(Some(&f.owner), admin.user_id, Role::Guest)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_member_cannot_change_roles() {
        let f = fixture().await;
        let member = profile(&f, "member", Role::Member).await;
        let guest = profile(&f, "guest", Role::Guest).await;

        assert_eq!(
            f.service
                .change_role(Some(&member), guest.user_id, Role::Member)
                .await
                .unwrap_err(),
            BookingError::Forbidden
        );
        assert!(matches!(
            f.service
                .change_role(Some(&f.owner), Uuid::new_v4(), Role::Member)
                .await,
            Err(BookingError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_marks_seated_members() {
        let f = fixture().await;
        let me = profile(&f, "orknob", Role::Member).await;
        let seated = profile(&f, "orkboy", Role::Member).await;
        profile(&f, "orkette", Role::Member).await;

        let schedule = GameNightSchedule::default();
        let night = schedule.next_game_night(Utc.with_ymd_and_hms(2026, 10, 12, 10, 0, 0).unwrap());
        f.store
            .insert_guarded(
                NewReservation::for_night(
                    TableId::new(4).unwrap(),
                    seated.user_id,
                    &night,
                    GameMode::KillTeam,
                ),
                SeatGuard::new(schedule.occupancy_range(&night)),
            )
            .await
            .unwrap();

        let results = f.service.search_members(Some(&me), "ORK").await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|p| p.id != me.user_id));
        let boy = results.iter().find(|p| p.id == seated.user_id).unwrap();
        assert_eq!(boy.seated_at, Some(4));

        assert!(f
            .service
            .search_members(Some(&me), " o ")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_rename() {
        let f = fixture().await;
        let me = profile(&f, "oldname", Role::Member).await;

        let renamed = f.service.rename(Some(&me), "  newname  ").await.unwrap();
        assert_eq!(renamed.username.as_deref(), Some("newname"));

        assert!(matches!(
            f.service.rename(Some(&me), "x").await,
            Err(BookingError::Validation(_))
        ));
        assert!(matches!(
            f.service.rename(Some(&me), "WARBOSS").await,
            Err(BookingError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_me_creates_guest() {
        let f = fixture().await;
        let session = Session::new(Uuid::new_v4());
        let me = f.service.me(Some(&session)).await.unwrap();
        assert_eq!(me.role, Role::Guest);
        assert_eq!(f.service.me(None).await.unwrap_err(), BookingError::Unauthenticated);
    }
}
