//! Domain error taxonomy.
//!
//! `BookingError` is what allocator and invitation operations return;
//! `StoreError` is what the storage traits return. Every booking error has
//! a stable machine code for clients and metrics labels.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::GameMode;

/// Failures reported by a store implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The guarded insert found the table at capacity.
    #[error("Table is at capacity")]
    CapacityExceeded,

    /// The guarded insert found the table locked to another mode.
    #[error("Table is locked to {locked}")]
    ModeConflict { locked: GameMode },

    /// The user already holds a seat in the guarded range.
    #[error("User already holds a seat for this night")]
    AlreadySeated,

    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Failures of reservation, invitation and profile operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("You must be signed in")]
    Unauthenticated,

    #[error("You are not allowed to do that")]
    Forbidden,

    #[error("Booking is closed (window {opens_at} to {closes_at})")]
    WindowClosed {
        opens_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
    },

    #[error("Table is set to {locked}, cannot book {requested}")]
    ModeConflict {
        locked: GameMode,
        requested: GameMode,
    },

    #[error("You already have a reservation for this game night")]
    AlreadyReserved,

    #[error("Table is full ({capacity} seats)")]
    TableFull { capacity: usize },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invitation has expired")]
    Expired,

    #[error("Invitation has already been processed")]
    AlreadyProcessed,

    #[error("This invitation is for someone else")]
    WrongRecipient,

    #[error("You already have a booking on that day")]
    DuplicateBooking,

    #[error("Inviter no longer holds a seat at that table")]
    InviterNotSeated,

    #[error("Partner already has a reservation for this game night")]
    PartnerUnavailable,

    #[error("Partner could not be booked: {reason}")]
    PartnerBookingFailed { reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),
}

impl BookingError {
    /// Stable identifier used in API bodies and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::Unauthenticated => "unauthenticated",
            BookingError::Forbidden => "forbidden",
            BookingError::WindowClosed { .. } => "window_closed",
            BookingError::ModeConflict { .. } => "mode_conflict",
            BookingError::AlreadyReserved => "already_reserved",
            BookingError::TableFull { .. } => "table_full",
            BookingError::NotFound(_) => "not_found",
            BookingError::Expired => "expired",
            BookingError::AlreadyProcessed => "already_processed",
            BookingError::WrongRecipient => "wrong_recipient",
            BookingError::DuplicateBooking => "duplicate_booking",
            BookingError::InviterNotSeated => "inviter_not_seated",
            BookingError::PartnerUnavailable => "partner_unavailable",
            BookingError::PartnerBookingFailed { .. } => "partner_booking_failed",
            BookingError::Validation(_) => "validation_error",
            BookingError::Conflict(_) => "conflict",
            BookingError::Store(_) => "store_error",
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        BookingError::NotFound(what.into())
    }

    /// Maps a guarded-insert rejection to the error a caller would have
    /// seen had the pre-check caught it.
    pub fn from_seat_rejection(err: StoreError, requested: GameMode) -> Self {
        match err {
            StoreError::CapacityExceeded => BookingError::TableFull {
                capacity: requested.capacity(),
            },
            StoreError::ModeConflict { locked } => BookingError::ModeConflict { locked, requested },
            StoreError::AlreadySeated => BookingError::AlreadyReserved,
            other => BookingError::from(other),
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => BookingError::Conflict(msg),
            other => BookingError::Store(other),
        }
    }
}
