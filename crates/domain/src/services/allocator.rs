//! Reservation allocator.
//!
//! Decides whether a member may take a seat at a table for the active game
//! night, and records or removes that seat. All checks run before any write;
//! the store re-checks the seat constraints atomically with the insert so
//! concurrent bookings cannot overfill a table.

use std::sync::Arc;
use uuid::Uuid;

use crate::error::BookingError;
use crate::models::reservation::{NewReservation, ReservationOutcome};
use crate::models::{
    GameMode, GameNight, GameNightSchedule, OccupancySnapshot, Reservation, Session, TableId,
};
use crate::services::change_feed::{ChangeFeed, ChangeKind, ReservationChanged};
use crate::services::clock::Clock;
use crate::services::stores::{ProfileStore, ReservationStore, SeatGuard};

pub struct ReservationAllocator {
    reservations: Arc<dyn ReservationStore>,
    profiles: Arc<dyn ProfileStore>,
    clock: Arc<dyn Clock>,
    schedule: GameNightSchedule,
    feed: ChangeFeed,
}

impl ReservationAllocator {
    pub fn new(
        reservations: Arc<dyn ReservationStore>,
        profiles: Arc<dyn ProfileStore>,
        clock: Arc<dyn Clock>,
        schedule: GameNightSchedule,
        feed: ChangeFeed,
    ) -> Self {
        Self {
            reservations,
            profiles,
            clock,
            schedule,
            feed,
        }
    }

    pub fn schedule(&self) -> &GameNightSchedule {
        &self.schedule
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// The game night bookings currently target.
    pub fn active_night(&self) -> GameNight {
        self.schedule.next_game_night(self.clock.now())
    }

    pub fn is_booking_open(&self) -> bool {
        let now = self.clock.now();
        self.schedule
            .is_booking_open(now, &self.schedule.next_game_night(now))
    }

    /// Current occupancy of every table for `night`.
    pub async fn occupancy(&self, night: &GameNight) -> Result<OccupancySnapshot, BookingError> {
        let rows = self
            .reservations
            .list_in_range(self.schedule.occupancy_range(night))
            .await?;
        Ok(OccupancySnapshot::from_rows(*night, rows))
    }

    /// The caller's seat for the active night, if any.
    pub async fn my_reservation(
        &self,
        session: Option<&Session>,
    ) -> Result<Option<Reservation>, BookingError> {
        let session = session.ok_or(BookingError::Unauthenticated)?;
        let night = self.active_night();
        Ok(self
            .reservations
            .find_for_user(session.user_id, self.schedule.occupancy_range(&night))
            .await?)
    }

    /// Seats the caller (and optionally a partner) at `table_id`.
    pub async fn reserve(
        &self,
        session: Option<&Session>,
        table_id: TableId,
        mode: GameMode,
        partner: Option<Uuid>,
    ) -> Result<ReservationOutcome, BookingError> {
        let session = session.ok_or(BookingError::Unauthenticated)?;
        let user_id = session.user_id;

        let role = self
            .profiles
            .find(user_id)
            .await?
            .map(|p| p.role)
            .unwrap_or_default();
        if !role.can_reserve() {
            return Err(rejected(user_id, table_id, BookingError::Forbidden));
        }

        let now = self.clock.now();
        let night = self.schedule.next_game_night(now);
        if !self.schedule.is_booking_open(now, &night) {
            let window = self.schedule.booking_window(&night);
            return Err(rejected(
                user_id,
                table_id,
                BookingError::WindowClosed {
                    opens_at: window.from,
                    closes_at: window.to,
                },
            ));
        }

        let snapshot = self.occupancy(&night).await?;
        let table = snapshot.table(table_id);
        let capacity = table.effective_capacity(mode);

        if let Some(locked) = table.locked_mode() {
            if locked != mode {
                return Err(rejected(
                    user_id,
                    table_id,
                    BookingError::ModeConflict {
                        locked,
                        requested: mode,
                    },
                ));
            }
        }
        if snapshot.seat_of(user_id).is_some() {
            return Err(rejected(user_id, table_id, BookingError::AlreadyReserved));
        }
        if table.count >= capacity {
            return Err(rejected(user_id, table_id, BookingError::TableFull { capacity }));
        }

        if let Some(partner_id) = partner {
            if partner_id == user_id {
                return Err(rejected(
                    user_id,
                    table_id,
                    BookingError::Validation("You cannot book yourself as your partner".into()),
                ));
            }
            if self.profiles.find(partner_id).await?.is_none() {
                return Err(rejected(user_id, table_id, BookingError::not_found("Partner")));
            }
            if snapshot.seat_of(partner_id).is_some() {
                return Err(rejected(user_id, table_id, BookingError::PartnerUnavailable));
            }
            if table.count + 2 > capacity {
                return Err(rejected(user_id, table_id, BookingError::TableFull { capacity }));
            }
        }

        let guard = SeatGuard::new(self.schedule.occupancy_range(&night));
        let reservation = self
            .reservations
            .insert_guarded(
                NewReservation::for_night(table_id, user_id, &night, mode),
                guard,
            )
            .await
            .map_err(|e| rejected(user_id, table_id, BookingError::from_seat_rejection(e, mode)))?;

        let partner_reservation = match partner {
            Some(partner_id) => Some(
                self.seat_partner(&reservation, partner_id, &night, guard)
                    .await?,
            ),
            None => None,
        };

        self.publish(&reservation, ChangeKind::Created);
        if let Some(partner_reservation) = &partner_reservation {
            self.publish(partner_reservation, ChangeKind::Created);
        }

        tracing::info!(
            user_id = %user_id,
            table_id = %table_id,
            mode = %mode,
            partner_id = ?partner,
            game_night = %night.date,
            "Reservation created"
        );

        Ok(ReservationOutcome {
            game_night: night,
            reservation,
            partner_reservation,
        })
    }

    /// Inserts the partner's seat; on failure removes the requester's seat
    /// again so no half-booked pair survives.
    async fn seat_partner(
        &self,
        own: &Reservation,
        partner_id: Uuid,
        night: &GameNight,
        guard: SeatGuard,
    ) -> Result<Reservation, BookingError> {
        let new = NewReservation::for_night(own.table_id, partner_id, night, own.game_mode);
        match self.reservations.insert_guarded(new, guard).await {
            Ok(reservation) => Ok(reservation),
            Err(err) => {
                let reason = BookingError::from_seat_rejection(err, own.game_mode).to_string();
                match self
                    .reservations
                    .delete_for_user(own.table_id, own.user_id, guard.occupancy_range)
                    .await
                {
                    Ok(_) => tracing::warn!(
                        user_id = %own.user_id,
                        partner_id = %partner_id,
                        table_id = %own.table_id,
                        reason = %reason,
                        "Partner booking failed, requester seat released"
                    ),
                    Err(cleanup) => tracing::error!(
                        user_id = %own.user_id,
                        partner_id = %partner_id,
                        table_id = %own.table_id,
                        error = %cleanup,
                        "Partner booking failed and requester seat could not be released"
                    ),
                }
                Err(BookingError::PartnerBookingFailed { reason })
            }
        }
    }

    /// Frees the caller's seat at `table_id` for the active night.
    pub async fn cancel(
        &self,
        session: Option<&Session>,
        table_id: TableId,
    ) -> Result<(), BookingError> {
        let session = session.ok_or(BookingError::Unauthenticated)?;
        let night = self.active_night();

        let removed = self
            .reservations
            .delete_for_user(
                table_id,
                session.user_id,
                self.schedule.occupancy_range(&night),
            )
            .await?;

        if removed == 0 {
            tracing::debug!(
                user_id = %session.user_id,
                table_id = %table_id,
                "Nothing to cancel"
            );
            return Err(BookingError::not_found("Reservation"));
        }

        self.feed.publish(ReservationChanged {
            table_id,
            user_id: session.user_id,
            kind: ChangeKind::Cancelled,
            at: self.clock.now(),
        });

        tracing::info!(
            user_id = %session.user_id,
            table_id = %table_id,
            game_night = %night.date,
            "Reservation cancelled"
        );

        Ok(())
    }

    fn publish(&self, reservation: &Reservation, kind: ChangeKind) {
        self.feed.publish(ReservationChanged {
            table_id: reservation.table_id,
            user_id: reservation.user_id,
            kind,
            at: reservation.created_at,
        });
    }
}

fn rejected(user_id: Uuid, table_id: TableId, err: BookingError) -> BookingError {
    tracing::info!(
        user_id = %user_id,
        table_id = %table_id,
        reason = err.code(),
        "Reservation rejected"
    );
    err
}
