//! Shared occupancy state for the active game night.
//!
//! Wraps the allocator with an [`OccupancyCache`]: local bookings show up in
//! the view immediately, and every authoritative read replaces the view.
//! Watchers get the latest view through a `watch` channel.

use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::BookingError;
use crate::models::reservation::ReservationOutcome;
use crate::models::{GameMode, OccupancyCache, OccupancySnapshot, Session, TableId};
use crate::services::allocator::ReservationAllocator;

pub struct ClubState {
    allocator: Arc<ReservationAllocator>,
    cache: Mutex<OccupancyCache>,
    updates: watch::Sender<OccupancySnapshot>,
}

impl ClubState {
    pub fn new(allocator: Arc<ReservationAllocator>) -> Self {
        let empty = OccupancySnapshot::empty(allocator.active_night());
        let (updates, _) = watch::channel(empty.clone());
        Self {
            allocator,
            cache: Mutex::new(OccupancyCache::new(empty)),
            updates,
        }
    }

    pub fn allocator(&self) -> &Arc<ReservationAllocator> {
        &self.allocator
    }

    /// Latest view, including unconfirmed local changes.
    pub async fn view(&self) -> OccupancySnapshot {
        self.cache.lock().await.view().clone()
    }

    pub fn watch(&self) -> watch::Receiver<OccupancySnapshot> {
        self.updates.subscribe()
    }

    /// Re-reads occupancy for the active night and replaces the view.
    pub async fn refresh(&self) -> Result<OccupancySnapshot, BookingError> {
        let night = self.allocator.active_night();
        let snapshot = self.allocator.occupancy(&night).await?;

        let mut cache = self.cache.lock().await;
        cache.reconcile(snapshot.clone());
        self.updates.send_replace(snapshot.clone());
        Ok(snapshot)
    }

    pub async fn reserve(
        &self,
        session: Option<&Session>,
        table_id: TableId,
        mode: GameMode,
        partner: Option<Uuid>,
    ) -> Result<ReservationOutcome, BookingError> {
        if let Some(session) = session {
            let mut cache = self.cache.lock().await;
            cache.apply_reserved(table_id, session.user_id, None, mode);
            if let Some(partner_id) = partner {
                cache.apply_reserved(table_id, partner_id, None, mode);
            }
            self.updates.send_replace(cache.view().clone());
        }

        let result = self
            .allocator
            .reserve(session, table_id, mode, partner)
            .await;
        self.settle().await;
        result
    }

    pub async fn cancel(
        &self,
        session: Option<&Session>,
        table_id: TableId,
    ) -> Result<(), BookingError> {
        if let Some(session) = session {
            let mut cache = self.cache.lock().await;
            cache.apply_cancelled(table_id, session.user_id);
            self.updates.send_replace(cache.view().clone());
        }

        let result = self.allocator.cancel(session, table_id).await;
        self.settle().await;
        result
    }

    /// Refreshes after a write. If the read fails the optimistic view stays
    /// until the next successful refresh.
    async fn settle(&self) {
        if let Err(err) = self.refresh().await {
            tracing::warn!(error = %err, "Occupancy refresh failed, keeping local view");
        }
    }

    /// Refreshes the view whenever the allocator's change feed fires, so
    /// writes made elsewhere (accepted invitations, other instances sharing
    /// the feed) reach watchers.
    pub fn spawn_refresher(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::clone(self);
        let mut events = self.allocator.feed().subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => state.settle().await,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::models::{GameNightSchedule, Role};
    use crate::services::change_feed::ChangeFeed;
    use crate::services::clock::FixedClock;
    use crate::services::stores::InMemoryStore;

    async fn setup() -> (Arc<InMemoryStore>, Arc<ClubState>) {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 10, 12, 10, 0, 0).unwrap(),
        ));
        let allocator = Arc::new(ReservationAllocator::new(
            store.clone(),
            store.clone(),
            clock,
            GameNightSchedule::default(),
            ChangeFeed::default(),
        ));
        (store, Arc::new(ClubState::new(allocator)))
    }

    fn table(n: i16) -> TableId {
        TableId::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_reserve_updates_view_with_confirmed_state() {
        let (store, state) = setup().await;
        let user = Uuid::new_v4();
        store.insert_profile(user, Some("alice"), Role::Member).await;

        state
            .reserve(Some(&Session::new(user)), table(1), GameMode::KillTeam, None)
            .await
            .unwrap();

        let view = state.view().await;
        assert_eq!(view.table(table(1)).occupant_names, vec!["alice"]);
        assert_eq!(*state.watch().borrow(), view);
    }

    #[tokio::test]
    async fn test_rejected_reserve_rolls_back_view() {
        let (store, state) = setup().await;
        let guest = Uuid::new_v4();
        store.insert_profile(guest, Some("guest"), Role::Guest).await;

        let err = state
            .reserve(Some(&Session::new(guest)), table(2), GameMode::KillTeam, None)
            .await
            .unwrap_err();

        assert_eq!(err, BookingError::Forbidden);
        assert_eq!(state.view().await.table(table(2)).count, 0);
    }

    #[tokio::test]
    async fn test_cancel_clears_view() {
        let (store, state) = setup().await;
        let user = Uuid::new_v4();
        store.insert_profile(user, Some("alice"), Role::Member).await;
        let session = Session::new(user);

        state
            .reserve(Some(&session), table(3), GameMode::KillTeam, None)
            .await
            .unwrap();
        state.cancel(Some(&session), table(3)).await.unwrap();

        let view = state.view().await;
        assert_eq!(view.total_occupants(), 0);
        assert_eq!(view.table(table(3)).locked_mode(), None);
    }

    #[tokio::test]
    async fn test_refresh_sees_writes_made_elsewhere() {
        let (store, state) = setup().await;
        let user = Uuid::new_v4();
        store.insert_profile(user, Some("bob"), Role::Member).await;

        state
            .allocator()
            .reserve(Some(&Session::new(user)), table(6), GameMode::Warhammer40k, None)
            .await
            .unwrap();
        assert_eq!(state.view().await.total_occupants(), 0);

        let snapshot = state.refresh().await.unwrap();
        assert_eq!(snapshot.table(table(6)).count, 1);
        assert_eq!(state.view().await, snapshot);
    }

    #[tokio::test]
    async fn test_refresher_follows_change_feed() {
        let (store, state) = setup().await;
        let user = Uuid::new_v4();
        store.insert_profile(user, Some("carol"), Role::Member).await;
        let mut watcher = state.watch();
        let handle = state.spawn_refresher();

        state
            .allocator()
            .reserve(Some(&Session::new(user)), table(4), GameMode::KillTeam, None)
            .await
            .unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), watcher.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(watcher.borrow().table(table(4)).count, 1);
        handle.abort();
    }
}
