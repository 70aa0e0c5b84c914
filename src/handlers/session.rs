//! Mocked login/logout endpoints
//!
//! There are no real sessions. Each call only moves the `active_users` gauge.

use axum::extract::State;

use crate::handlers::AppState;

pub const LOGGED_IN: &str = "User logged in";
pub const LOGGED_OUT: &str = "User logged out";

/// `GET /login`: increment `active_users`
pub async fn login(State(state): State<AppState>) -> &'static str {
    state.metrics().user_logged_in();
    tracing::debug!(active_users = state.metrics().active_users(), "Mock login");
    LOGGED_IN
}

/// `GET /logout`: decrement `active_users`
///
/// Nothing stops the gauge from going below zero.
pub async fn logout(State(state): State<AppState>) -> &'static str {
    state.metrics().user_logged_out();
    tracing::debug!(active_users = state.metrics().active_users(), "Mock logout");
    LOGGED_OUT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::metrics::Metrics;
    use std::sync::Arc;

    fn create_test_state() -> AppState {
        AppState::new(Arc::new(Config::default()), Metrics::new().unwrap())
    }

    #[tokio::test]
    async fn test_login_then_logout_returns_to_zero() {
        let state = create_test_state();

        assert_eq!(login(State(state.clone())).await, "User logged in");
        assert_eq!(state.metrics().active_users(), 1);

        assert_eq!(logout(State(state.clone())).await, "User logged out");
        assert_eq!(state.metrics().active_users(), 0);
    }

    #[tokio::test]
    async fn test_logout_without_login_goes_negative() {
        let state = create_test_state();

        logout(State(state.clone())).await;
        logout(State(state.clone())).await;

        assert_eq!(state.metrics().active_users(), -2);
    }
}
