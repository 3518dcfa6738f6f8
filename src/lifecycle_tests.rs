// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for server lifecycle state.

#[cfg(test)]
mod tests {
    use crate::errors::ServerError;
    use crate::lifecycle::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_starts_stopped() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.current(), ServerState::Stopped);
    }

    #[test]
    fn test_full_cycle() {
        let lifecycle = Lifecycle::default();

        lifecycle
            .transition(ServerState::Stopped, ServerState::Starting)
            .unwrap();
        lifecycle
            .transition(ServerState::Starting, ServerState::Serving)
            .unwrap();
        lifecycle
            .transition(ServerState::Serving, ServerState::Draining)
            .unwrap();
        assert_eq!(lifecycle.current(), ServerState::Draining);
        lifecycle
            .transition(ServerState::Draining, ServerState::Stopped)
            .unwrap();

        assert_eq!(lifecycle.current(), ServerState::Stopped);
    }

    #[test]
    fn test_transition_from_wrong_state_rejected() {
        let lifecycle = Lifecycle::new();

        let err = lifecycle
            .transition(ServerState::Serving, ServerState::Draining)
            .unwrap_err();

        assert!(matches!(
            err,
            ServerError::InvalidTransition {
                expected: ServerState::Serving,
                found: ServerState::Stopped,
            }
        ));
        assert_eq!(lifecycle.current(), ServerState::Stopped);
    }

    #[test]
    fn test_only_one_concurrent_start_wins() {
        let lifecycle = Lifecycle::new();

        let first = lifecycle.transition(ServerState::Stopped, ServerState::Starting);
        let second = lifecycle.transition(ServerState::Stopped, ServerState::Starting);

        assert!(first.is_ok());
        assert!(second.is_err());
    }

    #[test]
    fn test_stop_from_any_state() {
        let lifecycle = Lifecycle::new();
        lifecycle
            .transition(ServerState::Stopped, ServerState::Starting)
            .unwrap();

        lifecycle.stop();

        assert_eq!(lifecycle.current(), ServerState::Stopped);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ServerState::Draining.to_string(), "Draining");
        assert_eq!(ServerState::Serving.to_string(), "Serving");
    }

    #[tokio::test]
    async fn test_subscribers_observe_transitions() {
        let lifecycle = Lifecycle::new();
        let mut rx = lifecycle.subscribe();

        lifecycle
            .transition(ServerState::Stopped, ServerState::Starting)
            .unwrap();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), ServerState::Starting);
    }

    #[tokio::test]
    async fn test_wait_for_target_state() {
        let lifecycle = Arc::new(Lifecycle::new());
        let waiter = {
            let lifecycle = Arc::clone(&lifecycle);
            tokio::spawn(async move { lifecycle.wait_for(ServerState::Serving).await })
        };

        lifecycle
            .transition(ServerState::Stopped, ServerState::Starting)
            .unwrap();
        lifecycle
            .transition(ServerState::Starting, ServerState::Serving)
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
    }
}
