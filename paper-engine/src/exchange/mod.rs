use log::debug;
use paper_api::{Order, OrderBookSnapshot, Side, QTY_EPSILON};

pub mod fees;

/// One fill against a single book level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub price: f64,
    pub quantity: f64,
}

/// True when a level at `level_price` is marketable for an order of `side` limited at `limit`.
pub fn crosses(side: Side, level_price: f64, limit: f64) -> bool {
    match side {
        Side::Buy => level_price <= limit,
        Side::Sell => level_price >= limit,
    }
}

/// Sweeps `order` once through the opposing side of `snapshot`.
///
/// Levels are taken in the snapshot's order. Each eligible level yields one
/// fill of `min(remaining, volume)` at the level price, and the sweep stops
/// as soon as the order is complete. Unusable levels (no price or no
/// volume) and levels beyond the limit are skipped. Terminal orders get no
/// fills.
pub fn sweep(order: &Order, snapshot: &OrderBookSnapshot) -> Vec<Fill> {
    let mut fills = Vec::new();
    if !order.is_working() {
        return fills;
    }

    let mut remaining = order.remaining();
    if remaining <= QTY_EPSILON {
        return fills;
    }

    for level in snapshot.levels_against(order.side()) {
        if !level.is_usable() || !crosses(order.side(), level.price, order.price()) {
            continue;
        }

        let quantity = remaining.min(level.volume);
        debug!(
            "Order {} takes {} @ {} (level volume {})",
            order.id(),
            quantity,
            level.price,
            level.volume
        );
        fills.push(Fill {
            price: level.price,
            quantity,
        });

        remaining -= quantity;
        if remaining <= QTY_EPSILON {
            break;
        }
    }

    fills
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper_api::{BookLevel, OrderId, Symbol};

    fn order(side: Side, quantity: f64, price: f64) -> Order {
        Order::limit(OrderId::new(1), Symbol::new("TEST"), side, quantity, price, 0)
    }

    fn book(bids: &[(f64, f64)], asks: &[(f64, f64)]) -> OrderBookSnapshot {
        let levels = |raw: &[(f64, f64)]| -> Vec<BookLevel> {
            raw.iter().map(|&(p, v)| BookLevel::new(p, v)).collect()
        };
        OrderBookSnapshot::new(levels(bids), levels(asks))
    }

    #[test]
    fn test_buy_sweeps_asks_until_filled() {
        let snapshot = book(&[], &[(10.0, 3.0), (10.01, 3.0), (10.02, 100.0)]);
        let fills = sweep(&order(Side::Buy, 5.0, 10.05), &snapshot);

        assert_eq!(
            fills,
            vec![
                Fill {
                    price: 10.0,
                    quantity: 3.0
                },
                Fill {
                    price: 10.01,
                    quantity: 2.0
                },
            ]
        );
    }

    #[test]
    fn test_sell_reads_bids_and_respects_limit() {
        let snapshot = book(&[(10.0, 2.0), (9.99, 2.0), (9.5, 50.0)], &[(10.5, 100.0)]);
        let fills = sweep(&order(Side::Sell, 10.0, 9.99), &snapshot);

        let filled: f64 = fills.iter().map(|f| f.quantity).sum();
        assert_eq!(fills.len(), 2);
        assert_eq!(filled, 4.0);
        assert!(fills.iter().all(|f| f.price >= 9.99));
    }

    #[test]
    fn test_non_marketable_order_gets_nothing() {
        let snapshot = book(&[(9.0, 10.0)], &[(11.0, 10.0)]);
        assert!(sweep(&order(Side::Buy, 1.0, 10.0), &snapshot).is_empty());
        assert!(sweep(&order(Side::Sell, 1.0, 10.0), &snapshot).is_empty());
    }

    #[test]
    fn test_unusable_levels_are_skipped() {
        let snapshot = book(&[], &[(0.0, 5.0), (10.0, 0.0), (f64::NAN, 1.0), (10.0, 1.0)]);
        let fills = sweep(&order(Side::Buy, 5.0, 10.0), &snapshot);
        assert_eq!(
            fills,
            vec![Fill {
                price: 10.0,
                quantity: 1.0
            }]
        );
    }

    #[test]
    fn test_terminal_order_is_not_matched() {
        let snapshot = book(&[], &[(10.0, 10.0)]);
        let mut canceled = order(Side::Buy, 1.0, 10.0);
        canceled.cancel();
        assert!(sweep(&canceled, &snapshot).is_empty());

        let mut partially = order(Side::Buy, 4.0, 10.0);
        partially.record_fill(3.0);
        let fills = sweep(&partially, &snapshot);
        assert_eq!(fills[0].quantity, 1.0);
    }
}
