//! Lending store tests against PostgreSQL

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use hwlab_server::{
    clock::SystemClock,
    models::{hardware_type::CreateHardwareType, policy::LendingPolicy},
    repository::PgLendingStore,
    services::Services,
};

use crate::common::{race_for_pick_up, race_for_units};

/// Services on the database named by `DATABASE_URL`
async fn pg_services() -> Services {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    Services::new(
        Arc::new(PgLendingStore::new(pool)),
        Arc::new(SystemClock),
        LendingPolicy::default(),
        None,
    )
}

fn unique_name(prefix: &str) -> String {
    format!("{} {}", prefix, chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Run with: DATABASE_URL=... cargo test -- --ignored
async fn test_concurrent_requests_allocate_last_unit_once() {
    let services = pg_services().await;
    let hardware = services
        .inventory
        .create(&CreateHardwareType {
            name: unique_name("Race unit"),
            description: String::new(),
            image: None,
            total_count: 1,
        })
        .await
        .expect("Failed to create hardware type");

    let allocated = race_for_units(&services, hardware.id, 16).await;
    let summary = services.inventory.get(hardware.id).await.expect("Failed to count");
    services.inventory.delete(hardware.id).await.expect("Failed to clean up");

    assert_eq!(allocated, 1);
    assert_eq!(summary.available_count, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_pick_ups_never_exceed_total() {
    let services = pg_services().await;

    let (type_id, picked_up) = race_for_pick_up(&services, &unique_name("Race pickup"), 8).await;
    let summary = services.inventory.get(type_id).await.expect("Failed to count");
    services.inventory.delete(type_id).await.expect("Failed to clean up");

    assert_eq!(picked_up, 1);
    assert_eq!(summary.active_count, 1);
    assert!(summary.active_count <= summary.total_count as i64);
}
