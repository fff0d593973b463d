//! Common helpers for repository tests against a real PostgreSQL database.
//!
//! Tests connect through `TEST_DATABASE_URL` and are skipped when it is not
//! set. Every test works on its own game night date and its own profiles,
//! so tests can share one database and run in parallel.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use domain::models::{GameNight, GameNightSchedule, Profile, Role, TableId};
use domain::services::ProfileStore;
use persistence::ProfileRepository;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

/// Connects and migrates, or returns `None` when no test database is set.
pub async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping PostgreSQL test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./src/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// A game night on a random date far in the future, so concurrent tests
/// never see each other's seats.
pub fn unique_night() -> GameNight {
    let base = NaiveDate::from_ymd_opt(2100, 1, 7).expect("valid date");
    let offset = (Uuid::new_v4().as_u128() % 300_000) as i64;
    GameNightSchedule::default().game_night_on(base + Duration::days(offset * 7))
}

/// Short random tag that keeps usernames unique across runs.
pub fn tag() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

/// Creates a profile with a unique username.
pub async fn profile(repo: &ProfileRepository, prefix: &str, role: Role) -> Profile {
    let id = Uuid::new_v4();
    repo.ensure(id).await.expect("ensure profile");
    let username = format!("{}_{}", prefix, tag());
    assert!(repo.update_username(id, &username).await.expect("rename"));
    assert!(repo.update_role(id, role).await.expect("set role"));
    repo.find(id).await.expect("find").expect("profile exists")
}

pub fn table(n: i16) -> TableId {
    TableId::new(n).expect("valid table")
}
