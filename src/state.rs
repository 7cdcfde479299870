/*
 * Responsibility
 * - shared context wired into the router (AppState)
 * - cheap to clone (Arc inside)
 */
use std::sync::Arc;

use crate::middleware::Dispatcher;
use crate::services::auth::AuthService;

#[derive(Clone, Debug)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>, dispatcher: Dispatcher) -> Self {
        Self { auth, dispatcher }
    }
}
