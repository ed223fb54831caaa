//! Order book for one market.
//!
//! Both sides are bid books: the market uses complementary yes/no pricing,
//! so the ask on one side is derived from the best bid on the other
//! (`ask = 100 - opposite_bid`) rather than kept as a separate book.
//! Prices are integer cents in 1..=99, quantities are contracts, and each
//! side holds at most one level per price.
//!
//! Analytics are pure functions computed on demand from the current
//! levels; nothing here is cached.

use super::enums::Side;
use std::collections::BTreeMap;

/// One side of a book: price -> quantity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideBook {
    levels: BTreeMap<i64, i64>,
}

impl SideBook {
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Build a side from `(price, quantity)` pairs, skipping empty levels
    pub fn from_levels(levels: &[(i64, i64)]) -> Self {
        let mut side = Self::new();
        side.replace(levels);
        side
    }

    /// Replace the entire side with snapshot data
    pub fn replace(&mut self, levels: &[(i64, i64)]) {
        self.levels.clear();
        for &(price, quantity) in levels {
            if quantity > 0 {
                self.levels.insert(price, quantity);
            }
        }
    }

    /// Apply a signed quantity change to one price level.
    ///
    /// A level that reaches zero is removed. A change that would drive the
    /// quantity negative is refused without mutating the book and the
    /// resulting quantity is returned as the error.
    pub fn apply_delta(&mut self, price: i64, delta: i64) -> Result<(), i64> {
        let current = self.levels.get(&price).copied().unwrap_or(0);
        let updated = current + delta;
        if updated < 0 {
            return Err(updated);
        }
        if updated == 0 {
            self.levels.remove(&price);
        } else {
            self.levels.insert(price, updated);
        }
        Ok(())
    }

    /// Best (highest) price on this side
    #[inline]
    pub fn best(&self) -> Option<i64> {
        self.levels.keys().next_back().copied()
    }

    /// Quantity resting at a price, zero if no level
    pub fn quantity_at(&self, price: i64) -> i64 {
        self.levels.get(&price).copied().unwrap_or(0)
    }

    /// Total quantity at prices >= `through_price`
    pub fn depth(&self, through_price: i64) -> i64 {
        self.levels.range(through_price..).map(|(_, q)| q).sum()
    }

    /// Total quantity across all levels
    pub fn total(&self) -> i64 {
        self.levels.values().sum()
    }

    /// Levels in ascending price order
    pub fn levels(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.levels.iter().map(|(&p, &q)| (p, q))
    }

    /// Levels best-first (descending price order)
    pub fn levels_desc(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.levels.iter().rev().map(|(&p, &q)| (p, q))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Complete order book for one market
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBook {
    yes: SideBook,
    no: SideBook,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a book from snapshot levels for both sides
    pub fn from_snapshot(yes: &[(i64, i64)], no: &[(i64, i64)]) -> Self {
        Self {
            yes: SideBook::from_levels(yes),
            no: SideBook::from_levels(no),
        }
    }

    pub fn side(&self, side: Side) -> &SideBook {
        match side {
            Side::Yes => &self.yes,
            Side::No => &self.no,
        }
    }

    pub(crate) fn side_mut(&mut self, side: Side) -> &mut SideBook {
        match side {
            Side::Yes => &mut self.yes,
            Side::No => &mut self.no,
        }
    }

    /// Highest bid on a side, or None if that side is empty
    pub fn best_bid(&self, side: Side) -> Option<i64> {
        self.side(side).best()
    }

    /// Best ask for a side, derived from the opposite side's best bid
    /// (`100 - opposite_bid`)
    pub fn best_ask(&self, side: Side) -> Option<i64> {
        self.best_bid(side.opposite()).map(|price| 100 - price)
    }

    /// Bid-ask spread in cents, None without a two-sided market
    pub fn spread(&self) -> Option<i64> {
        Some(self.best_ask(Side::Yes)? - self.best_bid(Side::Yes)?)
    }

    /// Mid price in cents, None without a two-sided market
    pub fn mid(&self) -> Option<f64> {
        let bid = self.best_bid(Side::Yes)?;
        let ask = self.best_ask(Side::Yes)?;
        Some((bid + ask) as f64 / 2.0)
    }

    /// Spread as basis points of mid
    pub fn spread_bps(&self) -> Option<f64> {
        let spread = self.spread()?;
        let mid = self.mid()?;
        if mid == 0.0 {
            return None;
        }
        Some(spread as f64 / mid * 10_000.0)
    }

    /// Total quantity on a side at prices >= `through_price`
    pub fn depth(&self, side: Side, through_price: i64) -> i64 {
        self.side(side).depth(through_price)
    }

    /// Order imbalance: `(yes_total - no_total) / (yes_total + no_total)`,
    /// in [-1, 1]. None when both sides are empty.
    pub fn imbalance(&self) -> Option<f64> {
        let yes_total = self.yes.total();
        let no_total = self.no.total();
        let total = yes_total + no_total;
        if total == 0 {
            return None;
        }
        Some((yes_total - no_total) as f64 / total as f64)
    }

    /// Volume-weighted average price to buy `size` contracts of `side`.
    ///
    /// Buying a side lifts the *opposite* side's resting bids, best price
    /// first, at `100 - price` cents per contract. Returns None when the
    /// opposite side cannot fill the full size: insufficient liquidity is
    /// all-or-nothing, not a partial answer.
    pub fn vwap_to_fill(&self, side: Side, size: i64) -> Option<f64> {
        if size <= 0 {
            return None;
        }

        let mut remaining = size;
        let mut cost: i64 = 0;
        for (price, quantity) in self.side(side.opposite()).levels_desc() {
            let take = remaining.min(quantity);
            cost += take * (100 - price);
            remaining -= take;
            if remaining == 0 {
                break;
            }
        }

        if remaining > 0 {
            return None;
        }
        Some(cost as f64 / size as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_book_snapshot_keeps_one_level_per_price() {
        let side = SideBook::from_levels(&[(45, 100), (40, 50), (45, 30), (38, 0)]);
        // Later duplicate wins, empty level skipped
        assert_eq!(side.len(), 2);
        assert_eq!(side.quantity_at(45), 30);
        assert_eq!(side.best(), Some(45));
    }

    #[test]
    fn apply_delta_updates_inserts_and_removes() {
        let mut side = SideBook::from_levels(&[(50, 100)]);

        side.apply_delta(50, -40).unwrap();
        assert_eq!(side.quantity_at(50), 60);

        side.apply_delta(52, 25).unwrap();
        assert_eq!(side.best(), Some(52));

        side.apply_delta(52, -25).unwrap();
        assert_eq!(side.quantity_at(52), 0);
        assert_eq!(side.len(), 1);
    }

    #[test]
    fn apply_delta_refuses_negative_quantity() {
        let mut side = SideBook::from_levels(&[(50, 10)]);
        assert_eq!(side.apply_delta(50, -11), Err(-1));
        // Book untouched after the refused delta
        assert_eq!(side.quantity_at(50), 10);
    }

    #[test]
    fn best_bid_ask_spread_mid() {
        let book = OrderBook::from_snapshot(&[(45, 100)], &[(50, 80)]);

        assert_eq!(book.best_bid(Side::Yes), Some(45));
        assert_eq!(book.best_bid(Side::No), Some(50));
        assert_eq!(book.best_ask(Side::Yes), Some(50));
        assert_eq!(book.best_ask(Side::No), Some(55));
        assert_eq!(book.spread(), Some(5));
        assert_eq!(book.mid(), Some(47.5));
    }

    #[test]
    fn one_sided_market_has_no_spread() {
        let book = OrderBook::from_snapshot(&[(45, 100)], &[]);
        assert_eq!(book.best_bid(Side::Yes), Some(45));
        assert_eq!(book.best_ask(Side::Yes), None);
        assert_eq!(book.spread(), None);
        assert_eq!(book.mid(), None);
        assert_eq!(book.spread_bps(), None);
    }

    #[test]
    fn spread_bps_relative_to_mid() {
        let book = OrderBook::from_snapshot(&[(45, 100)], &[(50, 80)]);
        let bps = book.spread_bps().unwrap();
        assert!((bps - 5.0 / 47.5 * 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn depth_sums_at_or_above_price() {
        let book = OrderBook::from_snapshot(&[(45, 100), (40, 50), (35, 25)], &[]);
        assert_eq!(book.depth(Side::Yes, 40), 150);
        assert_eq!(book.depth(Side::Yes, 46), 0);
        assert_eq!(book.depth(Side::Yes, 1), 175);
    }

    #[test]
    fn imbalance_range_and_absence() {
        let book = OrderBook::from_snapshot(&[(45, 70)], &[(50, 30)]);
        assert_eq!(book.imbalance(), Some(0.4));

        let empty = OrderBook::new();
        assert_eq!(empty.imbalance(), None);
    }

    #[test]
    fn vwap_walks_opposite_side_best_first() {
        // Buying YES lifts NO bids: 30 @ (100-60) then 20 @ (100-55)
        let book = OrderBook::from_snapshot(&[], &[(60, 30), (55, 40)]);
        let vwap = book.vwap_to_fill(Side::Yes, 50).unwrap();
        assert!((vwap - 42.0).abs() < 1e-9);
    }

    #[test]
    fn vwap_is_all_or_nothing() {
        let book = OrderBook::from_snapshot(&[], &[(60, 30)]);
        assert_eq!(book.vwap_to_fill(Side::Yes, 50), None);
        assert_eq!(book.vwap_to_fill(Side::Yes, 0), None);
    }
}
