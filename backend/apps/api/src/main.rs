//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors. Request errors are rendered by the
//! `auth` and `market` crates themselves.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use auth::{
    AuthAppState, AuthConfig, InMemoryUserRepository, PgUserRepository, SessionStore,
    admin_users_router, auth_router, domain::repository::UserRepository,
};
use axum::{
    Router, http,
    http::{Method, header},
};
use base64::Engine;
use base64::engine::general_purpose;
use market::{
    InMemoryMarketRepository, MarketAppState, MarketConfig, MarketRepository, PgMarketRepository,
    market_admin_router, market_router,
};
use platform::crypto::KEY_LEN;
use platform::presence::{PresenceConfig, PresenceTracker};
use platform::rate_limit::FixedWindowRateLimiter;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Process-wide state shared by every router
struct Shared {
    auth_config: Arc<AuthConfig>,
    market_config: Arc<MarketConfig>,
    sessions: Arc<SessionStore>,
    limiter: Arc<FixedWindowRateLimiter>,
    presence: Arc<PresenceTracker>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,market=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let production = env::var("APP_ENV").is_ok_and(|v| v.eq_ignore_ascii_case("production"));
    let auth_config = Arc::new(auth_config(production)?);

    let shared = Shared {
        sessions: Arc::new(SessionStore::new(&auth_config)),
        auth_config,
        market_config: Arc::new(MarketConfig::default()),
        limiter: Arc::new(FixedWindowRateLimiter::new()),
        presence: Arc::new(PresenceTracker::new(PresenceConfig::default())),
    };
    spawn_maintenance(shared.limiter.clone(), shared.presence.clone());

    let app = match env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;

            tracing::info!("Connected to database");

            // Run migrations
            sqlx::migrate!("../../../database/migrations")
                .run(&pool)
                .await?;

            tracing::info!("Migrations completed");

            build_app(
                &shared,
                PgUserRepository::new(pool.clone()),
                PgMarketRepository::new(pool),
            )
        }
        Err(_) if !production => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage (data is lost on restart)");
            build_app(&shared, InMemoryUserRepository::new(), InMemoryMarketRepository::new())
        }
        Err(_) => anyhow::bail!("DATABASE_URL must be set in production"),
    };

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer());

    // Start server
    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:31113".to_string())
        .parse()
        .context("BIND_ADDR must be a socket address")?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn auth_config(production: bool) -> anyhow::Result<AuthConfig> {
    if !production {
        return Ok(AuthConfig::development());
    }

    let secret_b64 =
        env::var("SESSION_SECRET").context("SESSION_SECRET must be set in production")?;
    let secret_bytes = Engine::decode(&general_purpose::STANDARD, secret_b64.trim())?;
    let session_secret: [u8; KEY_LEN] = secret_bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("SESSION_SECRET must decode to {KEY_LEN} bytes"))?;

    Ok(AuthConfig {
        session_secret,
        password_pepper: env::var("PASSWORD_PEPPER").ok().map(String::into_bytes),
        ..AuthConfig::default()
    })
}

fn build_app<U, M>(shared: &Shared, users: U, market: M) -> Router
where
    U: UserRepository + Send + Sync + 'static,
    M: MarketRepository,
{
    let auth_state = AuthAppState::new(
        users,
        shared.auth_config.clone(),
        shared.sessions.clone(),
        shared.limiter.clone(),
    );
    let market_state = MarketAppState::new(
        market,
        shared.market_config.clone(),
        shared.sessions.clone(),
        shared.limiter.clone(),
        shared.presence.clone(),
    );

    Router::new()
        .nest("/api/auth", auth_router(auth_state.clone()))
        .nest(
            "/api/admin",
            admin_users_router(auth_state).merge(market_admin_router(market_state.clone())),
        )
        .nest("/api", market_router(market_state))
}

fn cors_layer() -> CorsLayer {
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([header::CONTENT_TYPE, header::ACCEPT]))
        .allow_credentials(true)
}

/// Drop idle rate-limit buckets and stale presence entries
fn spawn_maintenance(limiter: Arc<FixedWindowRateLimiter>, presence: Arc<PresenceTracker>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
        loop {
            interval.tick().await;
            let buckets = limiter.prune_idle();
            let visitors = presence.prune();
            if buckets > 0 || visitors > 0 {
                tracing::debug!(buckets, visitors, "Pruned idle in-memory state");
            }
        }
    });
}
