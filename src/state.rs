//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::config::Config;
use crate::publisher::EventPublisher;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<Config>,
    pub events: EventPublisher,
}

impl AppState {
    pub fn new(store: Store, config: Config, events: EventPublisher) -> Self {
        Self { store, config: Arc::new(config), events }
    }

    /// In-memory store, no event bus.
    pub fn in_memory(config: Config) -> Self {
        Self::new(Store::in_memory(), config, EventPublisher::default())
    }
}
