//! Heartbeat mechanism for WebSocket connections.
//!
//! A dedicated Tokio task ticks on a fixed interval and pushes the ping
//! payload into an unbounded channel; the main message loop drains that
//! channel and writes the ping to the socket. Timing is therefore
//! independent of consumer pace, and the main loop never blocks on the
//! heartbeat.

use crate::traits::WsMessage;
use crossbeam_channel::{Receiver, Sender};
use std::time::Duration;
use tracing::debug;

/// Heartbeat task that emits the ping payload at regular intervals.
///
/// The task skips the immediate first tick, then on each tick sends the
/// payload through the channel until a shutdown signal arrives or the
/// channel closes.
pub async fn heartbeat_task(
    interval: Duration,
    payload: WsMessage,
    heartbeat_tx: Sender<WsMessage>,
    shutdown_rx: Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    // Skip the first immediate tick - wait for the first interval
    ticker.tick().await;
    // If we miss ticks due to slow processing, skip them rather than bursting
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    debug!("Heartbeat task started with interval: {:?}", interval);

    loop {
        match shutdown_rx.try_recv() {
            Ok(_) | Err(crossbeam_channel::TryRecvError::Disconnected) => {
                debug!("Heartbeat task shutting down");
                break;
            }
            Err(crossbeam_channel::TryRecvError::Empty) => {}
        }

        ticker.tick().await;

        if heartbeat_tx.send(payload.clone()).is_err() {
            debug!("Heartbeat channel closed, shutting down heartbeat task");
            break;
        }
    }

    debug!("Heartbeat task exiting");
}

/// Spawn a heartbeat task.
///
/// Returns the task handle, a shutdown sender, and the channel the main
/// loop reads pings from.
pub fn spawn_heartbeat(
    interval: Duration,
    payload: WsMessage,
) -> (
    tokio::task::JoinHandle<()>,
    Sender<()>,
    Receiver<WsMessage>,
) {
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    let (heartbeat_tx, heartbeat_rx) = crossbeam_channel::unbounded();

    let handle = tokio::spawn(async move {
        heartbeat_task(interval, payload, heartbeat_tx, shutdown_rx).await;
    });

    (handle, shutdown_tx, heartbeat_rx)
}
