use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use domain::services::{
    ChangeFeed, ClubState, Clock, InMemoryStore, InvitationStore, InvitationWorkflow,
    ProfileService, ProfileStore, ReservationAllocator, ReservationStore, RolePolicy,
};
use persistence::{InvitationRepository, ProfileRepository, ReservationRepository};
use shared::jwt::JwtConfig;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id, user_auth};
use crate::routes::{game_night, health, invitations, profiles, reservations};

/// The three stores every service is built from.
#[derive(Clone)]
pub struct Stores {
    pub reservations: Arc<dyn ReservationStore>,
    pub invitations: Arc<dyn InvitationStore>,
    pub profiles: Arc<dyn ProfileStore>,
}

impl Stores {
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            reservations: Arc::new(ReservationRepository::new(pool.clone())),
            invitations: Arc::new(InvitationRepository::new(pool.clone())),
            profiles: Arc::new(ProfileRepository::new(pool.clone())),
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            reservations: store.clone(),
            invitations: store.clone(),
            profiles: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    /// Present only with the postgres storage backend.
    pub pool: Option<PgPool>,
    pub club: Arc<ClubState>,
    pub invitations: Arc<InvitationWorkflow>,
    pub profiles: Arc<ProfileService>,
}

impl AppState {
    /// Wires the booking services over `stores`. All of them share one
    /// change feed, so an accepted invitation reaches SSE subscribers and
    /// the occupancy refresher just like a direct reservation.
    pub fn new(
        config: Config,
        stores: Stores,
        clock: Arc<dyn Clock>,
        pool: Option<PgPool>,
    ) -> anyhow::Result<Self> {
        let schedule = config.club.schedule()?;
        let jwt = config.jwt.verifier()?;
        let feed = ChangeFeed::default();

        let allocator = Arc::new(ReservationAllocator::new(
            stores.reservations.clone(),
            stores.profiles.clone(),
            clock.clone(),
            schedule,
            feed.clone(),
        ));
        let invitations = Arc::new(InvitationWorkflow::new(
            stores.reservations.clone(),
            stores.invitations.clone(),
            stores.profiles.clone(),
            clock.clone(),
            schedule,
            feed,
            config.club.invitation_settings(),
        ));
        let profiles = Arc::new(ProfileService::new(
            stores.profiles,
            stores.reservations,
            clock,
            schedule,
            RolePolicy::new(config.club.owner_id),
        ));

        Ok(Self {
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            pool,
            club: Arc::new(ClubState::new(allocator)),
            invitations,
            profiles,
        })
    }

    pub fn allocator(&self) -> &Arc<ReservationAllocator> {
        self.club.allocator()
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = if state.config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = state
            .config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let api_routes = Router::new()
        .route("/api/v1/game-night", get(game_night::current))
        .route(
            "/api/v1/reservations",
            post(reservations::create_reservation),
        )
        .route(
            "/api/v1/reservations/occupancy",
            get(reservations::get_occupancy),
        )
        .route("/api/v1/reservations/me", get(reservations::my_reservation))
        .route(
            "/api/v1/reservations/tables/:table_id",
            delete(reservations::cancel_reservation),
        )
        .route(
            "/api/v1/reservations/events",
            get(reservations::reservation_events),
        )
        .route("/api/v1/invitations", post(invitations::create_invitation))
        .route(
            "/api/v1/invitations/:token",
            get(invitations::preview_invitation),
        )
        .route(
            "/api/v1/invitations/:token/accept",
            post(invitations::accept_invitation),
        )
        .route(
            "/api/v1/invitations/:token/decline",
            post(invitations::decline_invitation),
        )
        .route(
            "/api/v1/profiles/me",
            get(profiles::get_me).patch(profiles::rename),
        )
        .route("/api/v1/profiles/search", get(profiles::search))
        .route("/api/v1/profiles/:user_id/role", put(profiles::change_role))
        .route_layer(middleware::from_fn_with_state(state.clone(), user_auth));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
