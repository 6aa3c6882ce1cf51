use std::net::SocketAddr;
use std::sync::Arc;

use drivehub_api::{
    app,
    chat::ChatRegistry,
    state::{AppState, AuthConfig},
};
use drivehub_domain::{BookingEngine, BookingQueries};
use drivehub_store::{DbClient, PgBookingStore, PgCarStore, PgUserStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "drivehub_api=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = drivehub_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting DriveHub API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let users = Arc::new(PgUserStore::new(db.pool.clone()));
    let cars = Arc::new(PgCarStore::new(db.pool.clone()));
    let bookings = Arc::new(PgBookingStore::new(db.pool.clone()));

    let engine = Arc::new(BookingEngine::new(
        users.clone(),
        cars.clone(),
        bookings.clone(),
    ));
    let queries = Arc::new(BookingQueries::new(users, cars, bookings));

    let app_state = AppState {
        engine,
        queries,
        chat: ChatRegistry::new(),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
