//! Integration tests for connection state transitions and lifecycle.

use feedsock::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use std::sync::Arc;
use std::thread;

#[test]
fn test_connection_state_full_lifecycle() {
    let state = AtomicConnectionState::new(ConnectionState::Disconnected);

    assert!(state.is_disconnected());

    state.set(ConnectionState::Connecting);
    assert!(state.is_connecting());

    state.set(ConnectionState::Connected);
    assert!(state.is_connected());

    // Protocol layer drives subscription states
    state.set(ConnectionState::Subscribing);
    assert!(state.is_connected());
    assert!(!state.is_active());

    state.set(ConnectionState::Active);
    assert!(state.is_active());

    state.set(ConnectionState::ShuttingDown);
    assert!(state.is_shutting_down());

    state.set(ConnectionState::Disconnected);
    assert!(state.is_disconnected());
}

#[test]
fn test_connection_state_reconnection_cycle() {
    let state = AtomicConnectionState::new(ConnectionState::Active);
    let metrics = AtomicMetrics::new();

    for _ in 0..3 {
        // Lost transport
        state.set(ConnectionState::Reconnecting);
        assert!(state.is_connecting());
        assert!(!state.is_active());

        metrics.increment_reconnects();

        state.set(ConnectionState::Connected);
        state.set(ConnectionState::Active);
        assert!(state.is_active());
    }

    assert_eq!(metrics.reconnect_count(), 3);
}

#[test]
fn test_concurrent_state_access() {
    let state = Arc::new(AtomicConnectionState::new(ConnectionState::Disconnected));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for _ in 0..1000 {
                    if i % 2 == 0 {
                        state.set(ConnectionState::Connected);
                    } else {
                        let _ = state.get();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Writers only ever store Connected
    assert!(matches!(
        state.get(),
        ConnectionState::Disconnected | ConnectionState::Connected
    ));
}
