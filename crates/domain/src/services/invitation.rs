//! Invitation workflow: a seated member invites another member to their
//! table through a one-time link.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use shared::crypto::{generate_invitation_token, is_well_formed_token, sha256_hex};

use crate::error::BookingError;
use crate::models::invitation::{
    invitation_link, AcceptedInvitation, CreatedInvitation, InvitationPreview, NewInvitation,
};
use crate::models::reservation::NewReservation;
use crate::models::{
    GameNight, GameNightSchedule, Invitation, InvitationStatus, OccupancySnapshot, Session,
    TableId,
};
use crate::services::change_feed::{ChangeFeed, ChangeKind, ReservationChanged};
use crate::services::clock::Clock;
use crate::services::stores::{InvitationStore, ProfileStore, ReservationStore, SeatGuard};

/// Default lifetime of an invitation link.
pub const DEFAULT_INVITATION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct InvitationSettings {
    pub ttl: Duration,
    /// Public origin of the web app, used to build links.
    pub base_url: String,
}

impl Default for InvitationSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(DEFAULT_INVITATION_TTL_HOURS),
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

pub struct InvitationWorkflow {
    reservations: Arc<dyn ReservationStore>,
    invitations: Arc<dyn InvitationStore>,
    profiles: Arc<dyn ProfileStore>,
    clock: Arc<dyn Clock>,
    schedule: GameNightSchedule,
    feed: ChangeFeed,
    settings: InvitationSettings,
}

impl InvitationWorkflow {
    pub fn new(
        reservations: Arc<dyn ReservationStore>,
        invitations: Arc<dyn InvitationStore>,
        profiles: Arc<dyn ProfileStore>,
        clock: Arc<dyn Clock>,
        schedule: GameNightSchedule,
        feed: ChangeFeed,
        settings: InvitationSettings,
    ) -> Self {
        Self {
            reservations,
            invitations,
            profiles,
            clock,
            schedule,
            feed,
            settings,
        }
    }

    /// Invites `invitee_id` to the caller's table for the night starting at
    /// `game_date`. The plain token is only ever returned here.
    pub async fn create_invitation(
        &self,
        session: Option<&Session>,
        invitee_id: Uuid,
        table_id: TableId,
        game_date: DateTime<Utc>,
    ) -> Result<CreatedInvitation, BookingError> {
        let session = session.ok_or(BookingError::Unauthenticated)?;
        let inviter_id = session.user_id;

        if invitee_id == inviter_id {
            return Err(BookingError::Validation(
                "You cannot invite yourself".to_string(),
            ));
        }
        if self.profiles.find(invitee_id).await?.is_none() {
            return Err(BookingError::not_found("Invitee"));
        }

        let seated = self
            .reservations
            .find_at_table(table_id, inviter_id, self.schedule.range_around(game_date))
            .await?;
        if seated.is_none() {
            return Err(BookingError::InviterNotSeated);
        }

        let token = generate_invitation_token();
        let invitation = self
            .invitations
            .insert(NewInvitation {
                inviter_id,
                invitee_id,
                table_id,
                game_date,
                token_hash: sha256_hex(&token),
                created_at: self.clock.now(),
            })
            .await?;

        tracing::info!(
            invitation_id = %invitation.id,
            inviter_id = %inviter_id,
            invitee_id = %invitee_id,
            table_id = %table_id,
            "Invitation created"
        );

        Ok(CreatedInvitation {
            link: invitation_link(&self.settings.base_url, &token),
            invitation,
            token,
        })
    }

    /// Accepts an invitation and seats the invitee at the inviter's table.
    pub async fn accept_invitation(
        &self,
        session: Option<&Session>,
        token: &str,
    ) -> Result<AcceptedInvitation, BookingError> {
        let session = session.ok_or(BookingError::Unauthenticated)?;
        let user_id = session.user_id;
        let mut invitation = self.lookup(token).await?;
        let now = self.clock.now();

        if now > self.expires_at(&invitation) {
            self.mark_expired(&invitation).await;
            return Err(BookingError::Expired);
        }
        if !invitation.status.is_pending() {
            return Err(BookingError::AlreadyProcessed);
        }
        if invitation.invitee_id != user_id {
            return Err(BookingError::WrongRecipient);
        }

        let day = self.schedule.day_range(invitation.game_date);
        if self.reservations.find_for_user(user_id, day).await?.is_some() {
            return Err(self.rejection(token, BookingError::DuplicateBooking).await);
        }

        let range = self.schedule.range_around(invitation.game_date);
        let inviter_seat = self
            .reservations
            .find_at_table(invitation.table_id, invitation.inviter_id, range)
            .await?
            .ok_or(BookingError::InviterNotSeated)?;
        let mode = inviter_seat.game_mode;

        let night = self.night_of(&invitation);
        let snapshot =
            OccupancySnapshot::from_rows(night, self.reservations.list_in_range(range).await?);
        let table = snapshot.table(invitation.table_id);
        let capacity = table.effective_capacity(mode);
        if table.count >= capacity {
            return Err(self
                .rejection(token, BookingError::TableFull { capacity })
                .await);
        }

        let moved = self
            .invitations
            .transition(
                invitation.id,
                user_id,
                InvitationStatus::Pending,
                InvitationStatus::Accepted,
            )
            .await?;
        if !moved {
            return Err(BookingError::AlreadyProcessed);
        }

        let new = NewReservation {
            table_id: invitation.table_id,
            user_id,
            starts_at: invitation.game_date,
            ends_at: night.ends_at,
            game_mode: mode,
        };
        let reservation = match self
            .reservations
            .insert_guarded(new, SeatGuard::new(range))
            .await
        {
            Ok(reservation) => reservation,
            Err(err) => {
                self.reopen(&invitation).await;
                return Err(BookingError::from_seat_rejection(err, mode));
            }
        };

        self.feed.publish(ReservationChanged {
            table_id: reservation.table_id,
            user_id,
            kind: ChangeKind::Created,
            at: reservation.created_at,
        });

        tracing::info!(
            invitation_id = %invitation.id,
            invitee_id = %user_id,
            table_id = %invitation.table_id,
            mode = %mode,
            "Invitation accepted"
        );

        invitation.status = InvitationStatus::Accepted;
        Ok(AcceptedInvitation {
            invitation,
            reservation,
        })
    }

    pub async fn decline_invitation(
        &self,
        session: Option<&Session>,
        token: &str,
    ) -> Result<Invitation, BookingError> {
        let session = session.ok_or(BookingError::Unauthenticated)?;
        let mut invitation = self.lookup(token).await?;

        if invitation.invitee_id != session.user_id {
            return Err(BookingError::WrongRecipient);
        }
        if !invitation.status.is_pending() {
            return Err(BookingError::AlreadyProcessed);
        }

        let moved = self
            .invitations
            .transition(
                invitation.id,
                session.user_id,
                InvitationStatus::Pending,
                InvitationStatus::Declined,
            )
            .await?;
        if !moved {
            return Err(BookingError::AlreadyProcessed);
        }

        tracing::info!(invitation_id = %invitation.id, "Invitation declined");
        invitation.status = InvitationStatus::Declined;
        Ok(invitation)
    }

    /// Public view of an invitation for the landing page.
    pub async fn preview_invitation(&self, token: &str) -> Result<InvitationPreview, BookingError> {
        let invitation = self.lookup(token).await?;
        let expires_at = self.expires_at(&invitation);

        let inviter_name = self
            .profiles
            .find(invitation.inviter_id)
            .await?
            .and_then(|p| p.username);
        let inviter_seat = self
            .reservations
            .find_at_table(
                invitation.table_id,
                invitation.inviter_id,
                self.schedule.range_around(invitation.game_date),
            )
            .await?;

        let can_accept = invitation.status.is_pending()
            && self.clock.now() <= expires_at
            && inviter_seat.is_some();

        Ok(InvitationPreview {
            inviter_name,
            table_id: invitation.table_id,
            game_date: invitation.game_date,
            status: invitation.status,
            game_mode: inviter_seat.map(|r| r.game_mode),
            expires_at,
            can_accept,
        })
    }

    /// Earlier of the link lifetime and the start of the game night.
    pub fn expires_at(&self, invitation: &Invitation) -> DateTime<Utc> {
        let ttl_end = invitation.created_at + self.settings.ttl;
        let cutoff = self.schedule.invitation_cutoff(invitation.game_date);
        ttl_end.min(cutoff)
    }

    async fn lookup(&self, token: &str) -> Result<Invitation, BookingError> {
        if !is_well_formed_token(token) {
            return Err(BookingError::not_found("Invitation"));
        }
        self.invitations
            .find_by_token_hash(&sha256_hex(token))
            .await?
            .ok_or_else(|| BookingError::not_found("Invitation"))
    }

    /// A concurrent accept may have seated the invitee between our status
    /// check and the seat checks; report that as `AlreadyProcessed`.
    async fn rejection(&self, token: &str, err: BookingError) -> BookingError {
        match self.lookup(token).await {
            Ok(current) if !current.status.is_pending() => BookingError::AlreadyProcessed,
            Ok(_) => err,
            Err(lookup_err) => lookup_err,
        }
    }

    fn night_of(&self, invitation: &Invitation) -> GameNight {
        let night = self
            .schedule
            .game_night_on(self.schedule.local_date(invitation.game_date));
        GameNight {
            starts_at: invitation.game_date,
            ..night
        }
    }

    async fn mark_expired(&self, invitation: &Invitation) {
        if !invitation.status.is_pending() {
            return;
        }
        if let Err(err) = self
            .invitations
            .transition(
                invitation.id,
                invitation.invitee_id,
                InvitationStatus::Pending,
                InvitationStatus::Expired,
            )
            .await
        {
            tracing::warn!(invitation_id = %invitation.id, error = %err, "Could not mark invitation expired");
        }
    }

    /// Puts an accepted invitation back to pending after the seat insert
    /// failed, so the invitee can retry.
    async fn reopen(&self, invitation: &Invitation) {
        match self
            .invitations
            .transition(
                invitation.id,
                invitation.invitee_id,
                InvitationStatus::Accepted,
                InvitationStatus::Pending,
            )
            .await
        {
            Ok(true) => tracing::warn!(
                invitation_id = %invitation.id,
                "Seat insert failed, invitation reopened"
            ),
            Ok(false) => tracing::error!(
                invitation_id = %invitation.id,
                "Seat insert failed and invitation was no longer accepted"
            ),
            Err(err) => tracing::error!(
                invitation_id = %invitation.id,
                error = %err,
                "Seat insert failed and invitation could not be reopened"
            ),
        }
    }
}
