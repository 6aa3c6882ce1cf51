use std::sync::Arc;

use drivehub_domain::{BookingEngine, BookingQueries};

use crate::chat::ChatRegistry;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine>,
    pub queries: Arc<BookingQueries>,
    pub chat: ChatRegistry,
    pub auth: AuthConfig,
}
