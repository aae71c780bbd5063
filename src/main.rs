mod auth;
mod availability;
mod booking;
mod clock;
mod config;
mod middleware;
mod schedule;
mod store;

mod db;
mod error;
mod models;
mod routes;

use std::sync::Arc;

use crate::{
    booking::BookingService, clock::SystemClock, config::Config, db::PgStore, models::AppState,
    schedule::ScheduleConfig, store::AppointmentStore,
};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let pool = db::connect_pg(&cfg).await?;

    let store: Arc<dyn AppointmentStore> = Arc::new(PgStore::new(pool, cfg.storage_timeout));
    let schedule = ScheduleConfig::default();
    tracing::info!(
        "working day {}-{} every {} min, blackout {:?}",
        schedule.start,
        schedule.end,
        schedule.step_min,
        schedule.blackout
    );

    let state = AppState {
        booking: BookingService::new(store.clone(), Arc::new(SystemClock), schedule),
        store,
    };

    // Browser clients call the API from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
