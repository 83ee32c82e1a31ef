//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use crate::auth::AuthConfig;
use crate::config::ApiConfig;
use crate::db::DbClient;
use crate::macros::impl_from_ref;
use crate::services::{
    AddressService, CircleService, CollectiveService, ContactService, EncounterService,
    FriendService, UserService,
};

/// Built once at startup and cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DbClient,
    pub api_config: Arc<ApiConfig>,
    pub auth_config: Arc<AuthConfig>,
    pub users: UserService,
    pub contacts: ContactService,
    pub friends: FriendService,
    pub circles: CircleService,
    pub collectives: CollectiveService,
    pub encounters: EncounterService,
    pub address: AddressService,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(db: DbClient, api_config: ApiConfig, auth_config: AuthConfig) -> Self {
        Self {
            users: UserService::new(db.clone()),
            contacts: ContactService::new(db.clone()),
            friends: FriendService::new(db.clone()),
            circles: CircleService::new(db.clone()),
            collectives: CollectiveService::new(db.clone()),
            encounters: EncounterService::new(db.clone()),
            address: AddressService::new(db.clone()),
            db,
            api_config: Arc::new(api_config),
            auth_config: Arc::new(auth_config),
            start_time: Instant::now(),
        }
    }
}

impl_from_ref! {
    db: DbClient,
    api_config: Arc<ApiConfig>,
    users: UserService,
    contacts: ContactService,
    friends: FriendService,
    circles: CircleService,
    collectives: CollectiveService,
    encounters: EncounterService,
    address: AddressService,
    start_time: Instant,
}
