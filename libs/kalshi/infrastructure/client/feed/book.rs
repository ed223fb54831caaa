//! Streaming order-book reconstruction.
//!
//! [`OrderbookManager`] consumes the decoded feed in arrival order and
//! maintains an authoritative book per market. A snapshot replaces the
//! book wholesale; a delta must carry exactly the next sequence number.
//! Any gap or replay marks that market's book stale, and a stale book
//! refuses queries instead of returning silently-wrong data. Snapshots
//! keep being accepted while stale, so the book self-heals as soon as the
//! venue resends one (every reconnect produces a fresh snapshot).
//!
//! The manager has no network awareness: it is a state machine driven by
//! whatever messages it is handed, which makes it testable from a literal
//! message sequence. It is single-writer; wrap it in a lock to query from
//! other threads.

use super::types::{BookDelta, BookSnapshot, FeedMessage};
use crate::domain::orderbook::OrderBook;
use crate::error::{KalshiError, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
struct StaleInfo {
    expected: u64,
    received: u64,
}

#[derive(Debug)]
struct TrackedBook {
    book: OrderBook,
    last_seq: u64,
    stale: Option<StaleInfo>,
}

/// Maintains one order book per market from snapshot/delta messages.
#[derive(Debug, Default)]
pub struct OrderbookManager {
    books: HashMap<String, TrackedBook>,
}

impl OrderbookManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one feed message. Non-book messages are ignored.
    pub fn apply(&mut self, message: &FeedMessage) {
        match message {
            FeedMessage::Snapshot(snapshot) => self.apply_snapshot(snapshot),
            FeedMessage::Delta(delta) => self.apply_delta(delta),
            _ => {}
        }
    }

    fn apply_snapshot(&mut self, snapshot: &BookSnapshot) {
        debug!(
            "Book snapshot for {} at seq {} ({} yes / {} no levels)",
            snapshot.market_ticker,
            snapshot.seq,
            snapshot.yes.len(),
            snapshot.no.len()
        );
        self.books.insert(
            snapshot.market_ticker.clone(),
            TrackedBook {
                book: OrderBook::from_snapshot(&snapshot.yes, &snapshot.no),
                last_seq: snapshot.seq,
                stale: None,
            },
        );
    }

    fn apply_delta(&mut self, delta: &BookDelta) {
        let Some(entry) = self.books.get_mut(&delta.market_ticker) else {
            // No snapshot yet; nothing authoritative to update
            debug!(
                "Delta for {} before any snapshot, ignoring",
                delta.market_ticker
            );
            return;
        };

        if entry.stale.is_some() {
            // Already waiting for a fresh snapshot
            return;
        }

        let expected = entry.last_seq + 1;
        if delta.seq != expected {
            warn!(
                "Sequence gap on {}: expected {}, received {}; marking book stale",
                delta.market_ticker, expected, delta.seq
            );
            entry.stale = Some(StaleInfo {
                expected,
                received: delta.seq,
            });
            return;
        }

        match entry.book.side_mut(delta.side).apply_delta(delta.price, delta.delta) {
            Ok(()) => entry.last_seq = delta.seq,
            Err(result) => {
                warn!(
                    "Delta on {} drove level {}@{} negative ({}); marking book stale",
                    delta.market_ticker,
                    delta.side.as_str(),
                    delta.price,
                    result
                );
                entry.stale = Some(StaleInfo {
                    expected,
                    received: delta.seq,
                });
            }
        }
    }

    /// Query the current book for a market.
    ///
    /// - `Ok(Some(book))`: live, gap-free book
    /// - `Ok(None)`: no snapshot received yet ("no data" is not "no
    ///   liquidity")
    /// - `Err(StaleBook)`: a sequence gap was observed; not authoritative
    ///   until a fresh snapshot arrives
    pub fn book(&self, ticker: &str) -> Result<Option<&OrderBook>> {
        match self.books.get(ticker) {
            None => Ok(None),
            Some(entry) => match entry.stale {
                Some(info) => Err(KalshiError::StaleBook {
                    ticker: ticker.to_string(),
                    expected: info.expected,
                    received: info.received,
                }),
                None => Ok(Some(&entry.book)),
            },
        }
    }

    /// Last applied sequence number for a market
    pub fn last_seq(&self, ticker: &str) -> Option<u64> {
        self.books.get(ticker).map(|entry| entry.last_seq)
    }

    pub fn is_stale(&self, ticker: &str) -> bool {
        self.books
            .get(ticker)
            .map(|entry| entry.stale.is_some())
            .unwrap_or(false)
    }

    /// Discard a market's book. Books are never evicted automatically.
    pub fn remove(&mut self, ticker: &str) -> Option<OrderBook> {
        self.books.remove(ticker).map(|entry| entry.book)
    }

    /// Tickers with a tracked book
    pub fn tracked(&self) -> impl Iterator<Item = &str> {
        self.books.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::enums::Side;

    const TICKER: &str = "KXBTC-25DEC31";

    fn snapshot(seq: u64, yes: Vec<(i64, i64)>, no: Vec<(i64, i64)>) -> FeedMessage {
        FeedMessage::Snapshot(BookSnapshot {
            seq,
            market_ticker: TICKER.to_string(),
            yes,
            no,
        })
    }

    fn delta(seq: u64, side: Side, price: i64, change: i64) -> FeedMessage {
        FeedMessage::Delta(BookDelta {
            seq,
            market_ticker: TICKER.to_string(),
            price,
            delta: change,
            side,
        })
    }

    #[test]
    fn unknown_market_is_absent_not_empty() {
        let manager = OrderbookManager::new();
        assert!(manager.book(TICKER).unwrap().is_none());
    }

    #[test]
    fn snapshot_then_in_sequence_delta() {
        let mut manager = OrderbookManager::new();
        manager.apply(&snapshot(10, vec![(50, 100)], vec![(40, 80)]));
        manager.apply(&delta(11, Side::Yes, 50, -40));

        let book = manager.book(TICKER).unwrap().unwrap();
        assert_eq!(book.side(Side::Yes).quantity_at(50), 60);
        assert_eq!(book.side(Side::No).quantity_at(40), 80);
        assert_eq!(manager.last_seq(TICKER), Some(11));
    }

    #[test]
    fn delta_to_zero_removes_level() {
        let mut manager = OrderbookManager::new();
        manager.apply(&snapshot(10, vec![(50, 100)], vec![]));
        manager.apply(&delta(11, Side::Yes, 50, -100));

        let book = manager.book(TICKER).unwrap().unwrap();
        assert!(book.side(Side::Yes).is_empty());
    }

    #[test]
    fn sequence_gap_marks_stale_until_fresh_snapshot() {
        let mut manager = OrderbookManager::new();
        manager.apply(&snapshot(10, vec![(50, 100)], vec![(40, 80)]));
        manager.apply(&delta(11, Side::Yes, 50, -40));
        // Seq 12 never arrives
        manager.apply(&delta(13, Side::Yes, 50, -10));

        assert!(manager.is_stale(TICKER));
        match manager.book(TICKER) {
            Err(KalshiError::StaleBook {
                ticker,
                expected,
                received,
            }) => {
                assert_eq!(ticker, TICKER);
                assert_eq!((expected, received), (12, 13));
            }
            other => panic!("expected StaleBook, got {:?}", other),
        }

        // Deltas while stale are not applied
        manager.apply(&delta(14, Side::Yes, 50, -10));
        assert!(manager.book(TICKER).is_err());

        // A fresh snapshot heals the book
        manager.apply(&snapshot(20, vec![(51, 30)], vec![(40, 80)]));
        let book = manager.book(TICKER).unwrap().unwrap();
        assert_eq!(book.best_bid(Side::Yes), Some(51));
        assert_eq!(manager.last_seq(TICKER), Some(20));
    }

    #[test]
    fn replayed_sequence_also_marks_stale() {
        let mut manager = OrderbookManager::new();
        manager.apply(&snapshot(10, vec![(50, 100)], vec![]));
        manager.apply(&delta(10, Side::Yes, 50, -40));
        assert!(manager.is_stale(TICKER));
    }

    #[test]
    fn negative_quantity_marks_stale() {
        let mut manager = OrderbookManager::new();
        manager.apply(&snapshot(10, vec![(50, 10)], vec![]));
        manager.apply(&delta(11, Side::Yes, 50, -25));
        assert!(manager.is_stale(TICKER));
    }

    #[test]
    fn snapshot_replaces_wholesale() {
        let mut manager = OrderbookManager::new();
        manager.apply(&snapshot(10, vec![(50, 100), (45, 60)], vec![(40, 80)]));
        manager.apply(&snapshot(30, vec![(52, 10)], vec![]));

        let book = manager.book(TICKER).unwrap().unwrap();
        assert_eq!(book.side(Side::Yes).len(), 1);
        assert_eq!(book.best_bid(Side::Yes), Some(52));
        assert!(book.side(Side::No).is_empty());
    }

    #[test]
    fn delta_before_snapshot_is_ignored() {
        let mut manager = OrderbookManager::new();
        manager.apply(&delta(5, Side::Yes, 50, 10));
        assert!(manager.book(TICKER).unwrap().is_none());
    }

    #[test]
    fn remove_is_the_only_eviction() {
        let mut manager = OrderbookManager::new();
        manager.apply(&snapshot(10, vec![(50, 100)], vec![]));
        assert_eq!(manager.len(), 1);

        let book = manager.remove(TICKER).unwrap();
        assert_eq!(book.best_bid(Side::Yes), Some(50));
        assert!(manager.is_empty());
        assert!(manager.book(TICKER).unwrap().is_none());
    }

    #[test]
    fn non_book_messages_are_ignored() {
        let mut manager = OrderbookManager::new();
        manager.apply(&FeedMessage::Ticker(super::super::types::TickerUpdate {
            market_ticker: TICKER.to_string(),
            yes_bid: Some(50),
            yes_ask: Some(52),
            price: Some(51),
            volume: None,
            open_interest: None,
            ts: None,
        }));
        assert!(manager.is_empty());
    }
}
