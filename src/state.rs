use std::sync::Arc;

use crate::notifier::Notifier;
use crate::store::RateStore;

/// Shared handler state. Both collaborators are stateless from the handlers' point of
/// view; nothing here is mutated per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RateStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(store: RateStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store: Arc::new(store),
            notifier,
        }
    }
}
