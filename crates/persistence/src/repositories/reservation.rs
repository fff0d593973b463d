//! Reservation repository for database operations.

use async_trait::async_trait;
use domain::models::reservation::{NewReservation, OccupantRow};
use domain::models::{GameMode, Reservation, TableId, TimeRange};
use domain::services::{ReservationStore, SeatGuard};
use domain::StoreError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GameModeDb, OccupantEntity, ReservationEntity};
use crate::error::{backend, is_unique_violation};
use crate::metrics::QueryTimer;

/// Advisory lock namespaces; the second key is the table number or a hash
/// of the user id.
const TABLE_LOCK_NAMESPACE: i32 = 1;
const USER_LOCK_NAMESPACE: i32 = 2;

/// Repository for reservation-related database operations.
#[derive(Clone)]
pub struct ReservationRepository {
    pool: PgPool,
}

impl ReservationRepository {
    /// Creates a new ReservationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_locked(
        &self,
        new: &NewReservation,
        guard: SeatGuard,
    ) -> Result<Result<ReservationEntity, StoreError>, sqlx::Error> {
        let range = guard.occupancy_range;
        let mut tx = self.pool.begin().await?;

        // User first, then table: every insert takes locks in this order.
        sqlx::query("SELECT pg_advisory_xact_lock($1, hashtext($2::text))")
            .bind(USER_LOCK_NAMESPACE)
            .bind(new.user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1, $2::int)")
            .bind(TABLE_LOCK_NAMESPACE)
            .bind(new.table_id.get())
            .execute(&mut *tx)
            .await?;

        let table_modes: Vec<GameModeDb> = sqlx::query_scalar(
            r#"
            SELECT game_mode
            FROM reservations
            WHERE table_id = $1 AND starts_at BETWEEN $2 AND $3
            ORDER BY created_at, id
            "#,
        )
        .bind(new.table_id.get())
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&mut *tx)
        .await?;

        let seated: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations
                WHERE user_id = $1 AND starts_at BETWEEN $2 AND $3
            )
            "#,
        )
        .bind(new.user_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_one(&mut *tx)
        .await?;

        let modes: Vec<GameMode> = table_modes.into_iter().map(GameMode::from).collect();
        if let Err(rejection) = guard.check(&modes, seated, new.game_mode) {
            return Ok(Err(rejection));
        }

        let entity = sqlx::query_as::<_, ReservationEntity>(
            r#"
            INSERT INTO reservations (table_id, user_id, starts_at, ends_at, game_mode)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, table_id, user_id, starts_at, ends_at, game_mode, created_at
            "#,
        )
        .bind(new.table_id.get())
        .bind(new.user_id)
        .bind(new.starts_at)
        .bind(new.ends_at)
        .bind(GameModeDb::from(new.game_mode))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Ok(entity))
    }
}

#[async_trait]
impl ReservationStore for ReservationRepository {
    async fn insert_guarded(
        &self,
        new: NewReservation,
        guard: SeatGuard,
    ) -> Result<Reservation, StoreError> {
        let timer = QueryTimer::new("insert_reservation_guarded");
        let result = self.insert_locked(&new, guard).await;
        timer.record();

        match result {
            Ok(Ok(entity)) => entity.try_into(),
            Ok(Err(rejection)) => Err(rejection),
            Err(err) if is_unique_violation(&err) => Err(StoreError::AlreadySeated),
            Err(err) => Err(backend(err)),
        }
    }

    async fn delete_for_user(
        &self,
        table_id: TableId,
        user_id: Uuid,
        range: TimeRange,
    ) -> Result<u64, StoreError> {
        let timer = QueryTimer::new("delete_reservation_for_user");
        let result = sqlx::query(
            r#"
            DELETE FROM reservations
            WHERE table_id = $1 AND user_id = $2 AND starts_at BETWEEN $3 AND $4
            "#,
        )
        .bind(table_id.get())
        .bind(user_id)
        .bind(range.from)
        .bind(range.to)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result.map_err(backend)?.rows_affected())
    }

    async fn list_in_range(&self, range: TimeRange) -> Result<Vec<OccupantRow>, StoreError> {
        let timer = QueryTimer::new("list_reservations_in_range");
        let result = sqlx::query_as::<_, OccupantEntity>(
            r#"
            SELECT r.table_id, r.user_id, r.game_mode, p.username, r.created_at
            FROM reservations r
            LEFT JOIN profiles p ON p.id = r.user_id
            WHERE r.starts_at BETWEEN $1 AND $2
            ORDER BY r.created_at, r.id
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        result
            .map_err(backend)?
            .into_iter()
            .map(OccupantRow::try_from)
            .collect()
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        range: TimeRange,
    ) -> Result<Option<Reservation>, StoreError> {
        let timer = QueryTimer::new("find_reservation_for_user");
        let result = sqlx::query_as::<_, ReservationEntity>(
            r#"
            SELECT id, table_id, user_id, starts_at, ends_at, game_mode, created_at
            FROM reservations
            WHERE user_id = $1 AND starts_at BETWEEN $2 AND $3
            ORDER BY starts_at
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result.map_err(backend)?.map(Reservation::try_from).transpose()
    }

    async fn find_at_table(
        &self,
        table_id: TableId,
        user_id: Uuid,
        range: TimeRange,
    ) -> Result<Option<Reservation>, StoreError> {
        let timer = QueryTimer::new("find_reservation_at_table");
        let result = sqlx::query_as::<_, ReservationEntity>(
            r#"
            SELECT id, table_id, user_id, starts_at, ends_at, game_mode, created_at
            FROM reservations
            WHERE table_id = $1 AND user_id = $2 AND starts_at BETWEEN $3 AND $4
            LIMIT 1
            "#,
        )
        .bind(table_id.get())
        .bind(user_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        result.map_err(backend)?.map(Reservation::try_from).transpose()
    }
}
