use std::sync::Arc;

use crate::config::AuthConfig;
use crate::session::SessionStore;

/// Shared handler state: the session store and the immutable auth config.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub config: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(store: Arc<SessionStore>, config: AuthConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
