//! Shared fixtures: services on the in-memory store with a manual clock

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use hwlab_server::{
    clock::ManualClock,
    config::AppConfig,
    models::{
        hardware_type::{CreateHardwareType, HardwareType, UpdateHardwareType},
        policy::LendingPolicy,
        user::UserClaims,
    },
    repository::MemoryLendingStore,
    services::Services,
    AppError, AppState, LendingError,
};

pub const HACKER: i32 = 7;
pub const ORGANIZER: i32 = 1;

pub fn event_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 9, 0, 0).unwrap()
}

pub struct Lab {
    pub store: Arc<MemoryLendingStore>,
    pub clock: Arc<ManualClock>,
    pub services: Services,
}

impl Lab {
    pub fn new(policy: LendingPolicy) -> Self {
        let store = Arc::new(MemoryLendingStore::new());
        let clock = Arc::new(ManualClock::new(event_start()));
        let services = Services::new(store.clone(), clock.clone(), policy, None);
        Self {
            store,
            clock,
            services,
        }
    }

    pub async fn hardware(&self, name: &str, total_count: i32) -> HardwareType {
        self.services
            .inventory
            .create(&CreateHardwareType {
                name: name.to_string(),
                description: format!("{} for the event", name),
                image: None,
                total_count,
            })
            .await
            .unwrap()
    }

    pub fn state(&self, config: AppConfig) -> AppState {
        AppState {
            config: Arc::new(config),
            services: Arc::new(self.services.clone()),
        }
    }
}

pub fn token(config: &AppConfig, user_id: i32, is_organizer: bool) -> String {
    let now = Utc::now().timestamp();
    UserClaims {
        sub: format!("user-{}", user_id),
        user_id,
        is_organizer,
        exp: now + 3600,
        iat: now,
    }
    .create_token(&config.auth.jwt_secret)
    .unwrap()
}

/// Fire `contenders` concurrent requests for one type, return how many got a unit
pub async fn race_for_units(services: &Services, type_id: i32, contenders: i32) -> usize {
    let handles: Vec<_> = (0..contenders)
        .map(|offset| {
            let services = services.clone();
            tokio::spawn(async move { services.inventory.request(type_id, HACKER + offset).await })
        })
        .collect();

    let mut allocated = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_some() {
            allocated += 1;
        }
    }
    allocated
}

/// Two pending requests on a type shrunk to one unit, each picked up
/// `rounds` times concurrently. Returns the type id and the number of
/// successful pickups.
pub async fn race_for_pick_up(services: &Services, name: &str, rounds: usize) -> (i32, usize) {
    let hardware = services
        .inventory
        .create(&CreateHardwareType {
            name: name.to_string(),
            description: String::new(),
            image: None,
            total_count: 2,
        })
        .await
        .unwrap();
    let first = services.inventory.request(hardware.id, HACKER).await.unwrap().unwrap();
    let second = services
        .inventory
        .request(hardware.id, HACKER + 1)
        .await
        .unwrap()
        .unwrap();
    services
        .inventory
        .update(
            hardware.id,
            &UpdateHardwareType {
                total_count: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let handles: Vec<_> = [first.id, second.id]
        .into_iter()
        .cycle()
        .take(2 * rounds)
        .map(|request_id| {
            let services = services.clone();
            tokio::spawn(async move { services.requests.pick_up(request_id, ORGANIZER).await })
        })
        .collect();

    let mut picked_up = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => picked_up += 1,
            Err(AppError::Lending(LendingError::NoItemsAvailable))
            | Err(AppError::Lending(LendingError::AlreadyPickedUp)) => {}
            Err(e) => panic!("unexpected pickup error: {}", e),
        }
    }
    (hardware.id, picked_up)
}
